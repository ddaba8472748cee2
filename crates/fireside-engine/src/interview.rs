//! Interview state machine and per-user session store.
//!
//! One turn in: intent pre-emption first, then the state-specific transition.
//! Sufficiency judgments are delegated to the [`ResponseAnalyzer`]; name/age
//! capture runs local extraction before asking the model.

use crate::analyzer::ResponseAnalyzer;
use crate::llm::parse::{parse_name_age, NameAgeWire};
use crate::llm::prompts::{name_age_prompt, PERSONA_SYSTEM};
use crate::llm::CompletionClient;
use crate::persona;
use fireside_core::{
    question_bank, InterviewResult, InterviewSession, InterviewState, ProgressSnapshot, Question,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Plausible age range for the local extraction pass.
const AGE_MIN: u32 = 3;
const AGE_MAX: u32 = 20;

/// Words near an age number that can't be a name.
const NAME_STOPWORDS: &[&str] = &[
    "and", "the", "i'm", "im", "am", "was", "age", "aged", "name", "old", "year", "years",
    "turn", "turned", "i've", "ive",
];

/// Reply produced by one turn of the state machine.
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub message: String,
    pub state: InterviewState,
    pub is_complete: bool,
    /// Present when the interview is finished; re-derived on demand for
    /// post-completion queries.
    pub result: Option<InterviewResult>,
    /// True only on the turn that transitioned the session into `Completed`.
    pub newly_completed: bool,
}

impl TurnReply {
    fn mid_interview(message: String, state: InterviewState) -> Self {
        Self {
            message,
            state,
            is_complete: false,
            result: None,
            newly_completed: false,
        }
    }
}

type SessionHandle = Arc<tokio::sync::Mutex<InterviewSession>>;

/// Session store keyed by opaque user id.
///
/// The outer lock is held only to fetch or insert an entry; each session has
/// its own async lock, so turns for different users proceed in parallel.
#[derive(Debug, Default)]
struct SessionStore {
    inner: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    fn get(&self, user_id: &str) -> Option<SessionHandle> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(user_id).cloned()
    }

    fn create(&self, user_id: &str) -> SessionHandle {
        let handle: SessionHandle = Arc::new(tokio::sync::Mutex::new(InterviewSession::new()));
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(user_id.to_string(), Arc::clone(&handle));
        handle
    }

    fn remove(&self, user_id: &str) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(user_id);
    }
}

/// Drives the ask → judge → follow-up-or-advance loop for every user.
pub struct InterviewFlow {
    analyzer: ResponseAnalyzer,
    client: CompletionClient,
    questions: &'static [Question],
    sessions: SessionStore,
}

impl InterviewFlow {
    pub fn new(client: CompletionClient) -> Self {
        Self {
            analyzer: ResponseAnalyzer::new(client.clone()),
            client,
            questions: question_bank(),
            sessions: SessionStore::default(),
        }
    }

    /// Start (or restart) an interview, returning the introduction text.
    pub fn start(&self, user_id: &str) -> String {
        self.sessions.remove(user_id);
        self.sessions.create(user_id);
        persona::INTRODUCTION.to_string()
    }

    /// Delete the user's session outright; the next message starts fresh.
    pub fn reset(&self, user_id: &str) {
        self.sessions.remove(user_id);
    }

    pub async fn progress(&self, user_id: &str) -> Option<ProgressSnapshot> {
        let handle = self.sessions.get(user_id)?;
        let session = handle.lock().await;
        Some(ProgressSnapshot::of(&session, self.questions.len()))
    }

    /// Process one user turn.
    pub async fn handle_message(&self, user_id: &str, message: &str) -> TurnReply {
        // Identity questions pre-empt every state, including Completed.
        if persona::is_who_are_you(message) {
            return self.identity_reply(user_id, persona::WHO_ARE_YOU_RESPONSE).await;
        }
        if persona::is_about_system(message) {
            return self.identity_reply(user_id, persona::ABOUT_SYSTEM_RESPONSE).await;
        }

        let Some(handle) = self.sessions.get(user_id) else {
            self.sessions.create(user_id);
            return TurnReply::mid_interview(
                persona::INTRODUCTION.to_string(),
                InterviewState::GettingNameAge,
            );
        };

        let mut session = handle.lock().await;
        match session.state {
            InterviewState::WaitingForStart => {
                session.state = InterviewState::GettingNameAge;
                TurnReply::mid_interview(
                    persona::INTRODUCTION.to_string(),
                    InterviewState::GettingNameAge,
                )
            }
            InterviewState::GettingNameAge => self.capture_name_age(&mut session, message).await,
            InterviewState::AskingQuestion => self.answer_turn(&mut session, message, false).await,
            InterviewState::FollowingUp => self.answer_turn(&mut session, message, true).await,
            InterviewState::Completed => TurnReply {
                message: persona::ALREADY_FINISHED_MESSAGE.to_string(),
                state: InterviewState::Completed,
                is_complete: true,
                result: Some(self.result_of(&session)),
                newly_completed: false,
            },
        }
    }

    async fn identity_reply(&self, user_id: &str, canned: &str) -> TurnReply {
        let (state, result) = match self.sessions.get(user_id) {
            Some(handle) => {
                let session = handle.lock().await;
                let result =
                    (session.state == InterviewState::Completed).then(|| self.result_of(&session));
                (session.state, result)
            }
            None => (InterviewState::WaitingForStart, None),
        };
        TurnReply {
            message: canned.to_string(),
            state,
            is_complete: state == InterviewState::Completed,
            result,
            newly_completed: false,
        }
    }

    async fn capture_name_age(
        &self,
        session: &mut InterviewSession,
        message: &str,
    ) -> TurnReply {
        let (mut name, mut age) = extract_name_age_local(message);

        if name.is_none() || age.is_none() {
            if let Some(wire) = self.extract_name_age_model(message).await {
                if name.is_none() {
                    name = wire
                        .name
                        .as_deref()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string);
                }
                if age.is_none() {
                    age = wire.age();
                }
            }
        }

        match (name, age) {
            (Some(name), Some(age)) => {
                // Both resolved: capture once, immutable from here on.
                session.name = Some(name.clone());
                session.age = Some(age);
                session.state = InterviewState::AskingQuestion;
                session.current_question_index = 0;
                let first = &self.questions[0];
                TurnReply::mid_interview(
                    format!("Great to meet you, {}! 😊 Let's dive in.\n\n{}", name, first.text),
                    InterviewState::AskingQuestion,
                )
            }
            (name, age) => {
                let mut missing = Vec::new();
                if name.is_none() {
                    missing.push("name");
                }
                if age.is_none() {
                    missing.push("age");
                }
                TurnReply::mid_interview(
                    format!(
                        "Could you tell me your {}? For example: \"I'm Alex and I'm 10\".",
                        missing.join(" and ")
                    ),
                    InterviewState::GettingNameAge,
                )
            }
        }
    }

    async fn extract_name_age_model(&self, message: &str) -> Option<NameAgeWire> {
        match self
            .client
            .complete(&name_age_prompt(message), None, Some(PERSONA_SYSTEM))
            .await
        {
            Ok(text) => parse_name_age(&text),
            Err(err) => {
                tracing::debug!(error = %err, "name/age extraction call failed");
                None
            }
        }
    }

    /// Shared answer handling for `AskingQuestion` and `FollowingUp`.
    ///
    /// In `FollowingUp` the counter is bumped before judging, so the reply
    /// being analyzed counts as an additional round; in `AskingQuestion` it is
    /// bumped only when the verdict comes back incomplete.
    async fn answer_turn(
        &self,
        session: &mut InterviewSession,
        message: &str,
        pre_increment: bool,
    ) -> TurnReply {
        let question = &self.questions[session.current_question_index];
        session.append_answer(&question.id, message);

        let follow_ups = if pre_increment {
            session.bump_follow_up(&question.id)
        } else {
            session.follow_up_count(&question.id)
        };

        let answer = session.accumulated_answer(&question.id).to_string();
        let verdict = self.analyzer.analyze(question, &answer, follow_ups).await;

        if verdict.is_complete {
            session.clear_follow_ups(&question.id);
            session.advance(self.questions.len());

            if session.state == InterviewState::Completed {
                return TurnReply {
                    message: persona::COMPLETION_MESSAGE.to_string(),
                    state: InterviewState::Completed,
                    is_complete: true,
                    result: Some(self.result_of(session)),
                    newly_completed: true,
                };
            }

            let next = &self.questions[session.current_question_index];
            return TurnReply::mid_interview(
                format!(
                    "{}\n\n{}",
                    persona::motivational_transition(session.current_question_index),
                    next.text
                ),
                InterviewState::AskingQuestion,
            );
        }

        if !pre_increment {
            session.bump_follow_up(&question.id);
        }
        session.state = InterviewState::FollowingUp;
        TurnReply::mid_interview(verdict.feedback, InterviewState::FollowingUp)
    }

    fn result_of(&self, session: &InterviewSession) -> InterviewResult {
        InterviewResult::from_session(session, self.questions)
    }
}

/// Local name/age extraction: line-oriented `name:`/`age:` scanning, then a
/// token scan for a standalone number in the plausible age range with a
/// nearby word as the candidate name.
fn extract_name_age_local(message: &str) -> (Option<String>, Option<u32>) {
    let mut name = None;
    let mut age = None;

    for line in message.lines() {
        let lower = line.to_lowercase();
        if let Some((_, value)) = line.split_once(':') {
            let value = value.trim();
            if lower.contains("name") && name.is_none() && !value.is_empty() {
                name = Some(value.to_string());
            } else if lower.contains("age") && age.is_none() {
                if let Ok(n) = value.parse::<u32>() {
                    age = Some(n);
                }
            }
        }
    }

    if name.is_some() && age.is_some() {
        return (name, age);
    }

    let words: Vec<&str> = message.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        let token = word.trim_matches(|c: char| !c.is_alphanumeric());
        if let Ok(n) = token.parse::<u32>() {
            if (AGE_MIN..=AGE_MAX).contains(&n) {
                if age.is_none() {
                    age = Some(n);
                }
                if name.is_none() {
                    name = nearby_name(&words, i);
                }
            }
        }
    }

    (name, age)
}

/// Closest plausible name token around index `i`, searching outward.
fn nearby_name(words: &[&str], i: usize) -> Option<String> {
    let candidate = |word: &str| -> Option<String> {
        let cleaned = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
        if cleaned.chars().count() <= 2 {
            return None;
        }
        if cleaned.parse::<u32>().is_ok() {
            return None;
        }
        if NAME_STOPWORDS.contains(&cleaned.to_lowercase().as_str()) {
            return None;
        }
        Some(cleaned.to_string())
    };

    for offset in [-1i64, 1, -2, 2, -3, 3] {
        let idx = i as i64 + offset;
        if idx < 0 || idx as usize >= words.len() {
            continue;
        }
        if let Some(found) = candidate(words[idx as usize]) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> InterviewFlow {
        InterviewFlow::new(CompletionClient::disabled())
    }

    /// An answer that covers the first `n` elements of `question` via their
    /// keyword sets and clears the heuristic length floor.
    fn covering_answer(question: &Question, n: usize) -> String {
        let mut answer = question
            .elements
            .iter()
            .take(n)
            .map(|e| e.keywords[0].clone())
            .collect::<Vec<_>>()
            .join(" and then ");
        while answer.chars().count() < 40 {
            answer.push_str(" okay okay");
        }
        answer
    }

    async fn start_and_identify(flow: &InterviewFlow, user: &str) {
        flow.handle_message(user, "hello").await;
        let reply = flow.handle_message(user, "Alex 10").await;
        assert_eq!(reply.state, InterviewState::AskingQuestion);
    }

    #[test]
    fn local_extraction_handles_plain_and_structured_forms() {
        assert_eq!(
            extract_name_age_local("Alex 10"),
            (Some("Alex".to_string()), Some(10))
        );
        assert_eq!(
            extract_name_age_local("name: Sam\nage: 12"),
            (Some("Sam".to_string()), Some(12))
        );
        assert_eq!(
            extract_name_age_local("I'm Alex and I'm 10"),
            (Some("Alex".to_string()), Some(10))
        );
        // Numbers outside the plausible age range are ignored.
        assert_eq!(extract_name_age_local("Alex 42"), (None, None));
        assert_eq!(extract_name_age_local("just rambling"), (None, None));
    }

    #[tokio::test]
    async fn first_message_from_unseen_user_returns_the_introduction() {
        let flow = flow();
        let reply = flow.handle_message("u1", "hi there").await;
        assert_eq!(reply.message, persona::INTRODUCTION);
        assert_eq!(reply.state, InterviewState::GettingNameAge);
        assert!(!reply.is_complete);
    }

    #[tokio::test]
    async fn name_and_age_in_one_message_reach_the_first_question() {
        let flow = flow();
        flow.handle_message("u1", "hello").await;

        let reply = flow.handle_message("u1", "Alex 10").await;
        assert_eq!(reply.state, InterviewState::AskingQuestion);
        assert!(reply.message.contains("Alex"));
        assert!(reply.message.contains(&question_bank()[0].text));

        let progress = flow.progress("u1").await.unwrap();
        assert_eq!(progress.current_question, 1);
        assert_eq!(progress.answered_count, 0);
    }

    #[tokio::test]
    async fn service_outage_during_name_age_keeps_asking_for_missing_fields() {
        let flow = flow(); // disabled client: the model path yields nothing
        flow.handle_message("u1", "hello").await;

        let reply = flow.handle_message("u1", "well hello again").await;
        assert_eq!(reply.state, InterviewState::GettingNameAge);
        assert!(reply.message.contains("name and age"));

        // Partial capture is not persisted: the next message must still carry both.
        let reply = flow.handle_message("u1", "I'm 10").await;
        assert_eq!(reply.state, InterviewState::GettingNameAge);
        assert!(reply.message.contains("name"));
    }

    #[tokio::test]
    async fn full_first_answer_advances_with_zero_follow_ups() {
        let flow = flow();
        start_and_identify(&flow, "u1").await;

        let q1 = &question_bank()[0];
        let reply = flow
            .handle_message("u1", &covering_answer(q1, q1.elements.len()))
            .await;
        assert_eq!(reply.state, InterviewState::AskingQuestion);
        assert!(reply.message.contains(&question_bank()[1].text));

        let handle = flow.sessions.get("u1").unwrap();
        let session = handle.lock().await;
        assert_eq!(session.current_question_index, 1);
        assert_eq!(session.follow_up_count(&q1.id), 0);
    }

    #[tokio::test]
    async fn thin_answers_walk_through_the_follow_up_loop() {
        let flow = flow();
        start_and_identify(&flow, "u1").await;

        let q1 = &question_bank()[0];
        assert_eq!(q1.elements.len(), 3);

        // First answer covers 1/3: incomplete, one follow-up consumed.
        let partial = covering_answer(q1, 1);
        let reply = flow.handle_message("u1", &partial).await;
        assert_eq!(reply.state, InterviewState::FollowingUp);
        {
            let handle = flow.sessions.get("u1").unwrap();
            let session = handle.lock().await;
            assert_eq!(session.follow_up_count(&q1.id), 1);
        }

        // Second reply adds nothing new: still incomplete at count 2.
        let reply = flow.handle_message("u1", "hmm let me think about it more").await;
        assert_eq!(reply.state, InterviewState::FollowingUp);
        {
            let handle = flow.sessions.get("u1").unwrap();
            let session = handle.lock().await;
            assert_eq!(session.follow_up_count(&q1.id), 2);
        }

        // Third reply raises coverage to 2/3 with count 3: the lenient bar
        // (60%) flips the verdict to complete.
        let second_element = &q1.elements[1].keywords[0];
        let reply = flow
            .handle_message("u1", &format!("also {} was a big part of it", second_element))
            .await;
        assert_eq!(reply.state, InterviewState::AskingQuestion);
        {
            let handle = flow.sessions.get("u1").unwrap();
            let session = handle.lock().await;
            assert_eq!(session.current_question_index, 1);
            assert_eq!(session.follow_up_count(&q1.id), 0);
        }
    }

    #[tokio::test]
    async fn identity_question_preempts_and_leaves_the_session_untouched() {
        let flow = flow();
        start_and_identify(&flow, "u1").await;

        let q1 = &question_bank()[0];
        flow.handle_message("u1", &covering_answer(q1, 1)).await; // now FollowingUp

        let before = {
            let handle = flow.sessions.get("u1").unwrap();
            let session = handle.lock().await;
            session.clone()
        };

        let reply = flow.handle_message("u1", "wait, who are you?").await;
        assert_eq!(reply.message, persona::WHO_ARE_YOU_RESPONSE);
        assert_eq!(reply.state, InterviewState::FollowingUp);

        let handle = flow.sessions.get("u1").unwrap();
        let session = handle.lock().await;
        assert_eq!(session.state, before.state);
        assert_eq!(session.current_question_index, before.current_question_index);
        assert_eq!(session.answers, before.answers);
        assert_eq!(session.follow_up_counts, before.follow_up_counts);
    }

    #[tokio::test]
    async fn completing_every_question_yields_a_valid_result_exactly_once() {
        let flow = flow();
        start_and_identify(&flow, "u1").await;

        let questions = question_bank();
        let mut final_reply = None;
        for question in questions {
            let reply = flow
                .handle_message("u1", &covering_answer(question, question.elements.len()))
                .await;
            final_reply = Some(reply);
        }

        let reply = final_reply.unwrap();
        assert_eq!(reply.state, InterviewState::Completed);
        assert!(reply.is_complete);
        assert!(reply.newly_completed);
        assert_eq!(reply.message, persona::COMPLETION_MESSAGE);

        let result = reply.result.unwrap();
        assert_eq!(result.name, "Alex");
        assert_eq!(result.age, 10);
        // Completed iff every question has a non-blank entry.
        assert!(result.answers.iter().all(|a| !a.text.trim().is_empty()));
        assert!(fireside_core::validate::check_completion(&result).is_valid);

        // Further messages: still complete, but never "newly" again.
        let reply = flow.handle_message("u1", "hello again").await;
        assert_eq!(reply.message, persona::ALREADY_FINISHED_MESSAGE);
        assert!(reply.is_complete);
        assert!(!reply.newly_completed);
        assert!(reply.result.is_some());
    }

    #[tokio::test]
    async fn reset_deletes_the_session_and_restarts_from_scratch() {
        let flow = flow();
        start_and_identify(&flow, "u1").await;

        flow.reset("u1");
        assert!(flow.progress("u1").await.is_none());

        let reply = flow.handle_message("u1", "hi again").await;
        assert_eq!(reply.message, persona::INTRODUCTION);
        assert_eq!(reply.state, InterviewState::GettingNameAge);
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_user() {
        let flow = flow();
        start_and_identify(&flow, "u1").await;

        let reply = flow.handle_message("u2", "hello").await;
        assert_eq!(reply.state, InterviewState::GettingNameAge);

        let p1 = flow.progress("u1").await.unwrap();
        let p2 = flow.progress("u2").await.unwrap();
        assert_eq!(p1.state, InterviewState::AskingQuestion);
        assert_eq!(p2.state, InterviewState::GettingNameAge);
    }
}
