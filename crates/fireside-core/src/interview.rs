//! Interview session state, verdicts, and the finished-interview snapshot.

use crate::question::Question;
use serde::Serialize;
use std::collections::HashMap;

/// Interview lifecycle states.
///
/// `WaitingForStart` describes a user with no session record yet; stored
/// sessions begin at `GettingNameAge`. `Completed` is terminal except for
/// identity questions, which never change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewState {
    WaitingForStart,
    GettingNameAge,
    AskingQuestion,
    FollowingUp,
    Completed,
}

impl InterviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewState::WaitingForStart => "waiting_for_start",
            InterviewState::GettingNameAge => "getting_name_age",
            InterviewState::AskingQuestion => "asking_question",
            InterviewState::FollowingUp => "following_up",
            InterviewState::Completed => "completed",
        }
    }
}

/// Per-user interview progress record.
///
/// Owned by the session store; lives for the process lifetime unless the
/// caller resets it. `current_question_index` only ever moves forward and is
/// bounded by the question-sequence length.
#[derive(Debug, Clone)]
pub struct InterviewSession {
    pub state: InterviewState,
    pub current_question_index: usize,
    pub name: Option<String>,
    pub age: Option<u32>,
    /// Accumulated answer text per question id, newline-joined in arrival order.
    pub answers: HashMap<String, String>,
    /// Follow-up rounds consumed per question id; reset when the question completes.
    pub follow_up_counts: HashMap<String, u32>,
}

impl InterviewSession {
    /// A fresh session, created in response to a user's first message.
    pub fn new() -> Self {
        Self {
            state: InterviewState::GettingNameAge,
            current_question_index: 0,
            name: None,
            age: None,
            answers: HashMap::new(),
            follow_up_counts: HashMap::new(),
        }
    }

    /// Append a reply to the accumulated answer for `question_id`.
    pub fn append_answer(&mut self, question_id: &str, reply: &str) {
        let entry = self.answers.entry(question_id.to_string()).or_default();
        if !entry.is_empty() {
            entry.push('\n');
        }
        entry.push_str(reply);
    }

    pub fn accumulated_answer(&self, question_id: &str) -> &str {
        self.answers.get(question_id).map(String::as_str).unwrap_or("")
    }

    pub fn follow_up_count(&self, question_id: &str) -> u32 {
        self.follow_up_counts.get(question_id).copied().unwrap_or(0)
    }

    /// Record one more follow-up round for `question_id`; returns the new count.
    pub fn bump_follow_up(&mut self, question_id: &str) -> u32 {
        let count = self.follow_up_counts.entry(question_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Reset the follow-up counter when a question is marked complete.
    pub fn clear_follow_ups(&mut self, question_id: &str) {
        self.follow_up_counts.insert(question_id.to_string(), 0);
    }

    /// Advance past the current question. Entering the index one past the last
    /// question completes the interview; the index never moves backwards.
    pub fn advance(&mut self, total_questions: usize) {
        self.current_question_index = (self.current_question_index + 1).min(total_questions);
        if self.current_question_index >= total_questions {
            self.state = InterviewState::Completed;
        } else {
            self.state = InterviewState::AskingQuestion;
        }
    }

    /// Count of questions with a non-blank accumulated answer.
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| !a.trim().is_empty()).count()
    }
}

impl Default for InterviewSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one sufficiency judgment. Consumed immediately by the state
/// machine; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisVerdict {
    pub is_complete: bool,
    pub missing_elements: Vec<String>,
    pub feedback: String,
}

/// One question's accumulated answer inside an [`InterviewResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub text: String,
}

/// Immutable snapshot derived when a session reaches `Completed`.
///
/// Holds one entry per bank question in bank order; questions the session
/// never answered appear as empty strings (the validator flags them).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterviewResult {
    pub name: String,
    pub age: u32,
    pub answers: Vec<AnswerRecord>,
}

impl InterviewResult {
    pub fn from_session(session: &InterviewSession, questions: &[Question]) -> Self {
        Self {
            name: session.name.clone().unwrap_or_default(),
            age: session.age.unwrap_or(0),
            answers: questions
                .iter()
                .map(|q| AnswerRecord {
                    question_id: q.id.clone(),
                    text: session.accumulated_answer(&q.id).to_string(),
                })
                .collect(),
        }
    }

    pub fn answer(&self, question_id: &str) -> Option<&str> {
        self.answers
            .iter()
            .find(|a| a.question_id == question_id)
            .map(|a| a.text.as_str())
    }
}

/// Introspection snapshot of a session's progress through the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// 1-based ordinal of the question currently in play.
    pub current_question: usize,
    pub total_questions: usize,
    pub progress_percent: u8,
    pub answered_count: usize,
    pub state: InterviewState,
}

impl ProgressSnapshot {
    pub fn of(session: &InterviewSession, total_questions: usize) -> Self {
        let index = session.current_question_index.min(total_questions);
        let percent = if total_questions == 0 {
            0
        } else {
            (index * 100 / total_questions) as u8
        };
        Self {
            current_question: (index + 1).min(total_questions),
            total_questions,
            progress_percent: percent,
            answered_count: session.answered_count(),
            state: session.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::question_bank;

    #[test]
    fn append_answer_joins_replies_in_arrival_order() {
        let mut session = InterviewSession::new();
        session.append_answer("q1", "first part");
        session.append_answer("q1", "second part");
        assert_eq!(session.accumulated_answer("q1"), "first part\nsecond part");
    }

    #[test]
    fn follow_up_counter_bumps_and_clears() {
        let mut session = InterviewSession::new();
        assert_eq!(session.follow_up_count("q1"), 0);
        assert_eq!(session.bump_follow_up("q1"), 1);
        assert_eq!(session.bump_follow_up("q1"), 2);
        session.clear_follow_ups("q1");
        assert_eq!(session.follow_up_count("q1"), 0);
    }

    #[test]
    fn advance_completes_exactly_at_sequence_end() {
        let mut session = InterviewSession::new();
        session.state = InterviewState::AskingQuestion;
        for expected in 1..3 {
            session.advance(3);
            assert_eq!(session.current_question_index, expected);
            assert_eq!(session.state, InterviewState::AskingQuestion);
        }
        session.advance(3);
        assert_eq!(session.current_question_index, 3);
        assert_eq!(session.state, InterviewState::Completed);

        // Advancing a completed session never moves the index past the end.
        session.advance(3);
        assert_eq!(session.current_question_index, 3);
        assert_eq!(session.state, InterviewState::Completed);
    }

    #[test]
    fn result_has_one_entry_per_bank_question() {
        let questions = question_bank();
        let mut session = InterviewSession::new();
        session.name = Some("Alex".to_string());
        session.age = Some(10);
        session.append_answer(&questions[0].id, "building model rockets");

        let result = InterviewResult::from_session(&session, questions);
        assert_eq!(result.answers.len(), questions.len());
        assert_eq!(result.answer(&questions[0].id), Some("building model rockets"));
        assert_eq!(result.answer(&questions[1].id), Some(""));
    }

    #[test]
    fn progress_snapshot_tracks_index_and_answers() {
        let mut session = InterviewSession::new();
        session.state = InterviewState::AskingQuestion;
        session.current_question_index = 2;
        session.append_answer("q1", "something");
        session.append_answer("q2", "something else");

        let progress = ProgressSnapshot::of(&session, 7);
        assert_eq!(progress.current_question, 3);
        assert_eq!(progress.total_questions, 7);
        assert_eq!(progress.progress_percent, 28);
        assert_eq!(progress.answered_count, 2);
        assert_eq!(progress.state, InterviewState::AskingQuestion);
    }
}
