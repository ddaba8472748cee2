//! Interview data validation.
//!
//! Pure, stateless checks over a finished [`InterviewResult`]. Completeness
//! gates report generation; quality concerns are advisory and never block.

use crate::interview::InterviewResult;
use crate::question::question_bank;
use std::ops::RangeInclusive;

/// Answers shorter than this are flagged as a quality concern.
pub const MIN_ANSWER_CHARS: usize = 10;
/// Names shorter than this are flagged as a quality concern.
pub const MIN_NAME_CHARS: usize = 2;
/// Ages outside this range are flagged as a quality concern.
pub const PLAUSIBLE_AGE: RangeInclusive<u32> = 3..=20;

/// Outcome of the structural completeness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCheck {
    pub is_valid: bool,
    /// Names of the fields that are absent or blank.
    pub missing_fields: Vec<String>,
}

/// Outcome of the advisory quality check. Always acceptable; the warnings are
/// for the supervising recipient, not for gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityReport {
    pub warnings: Vec<String>,
}

impl QualityReport {
    pub fn is_acceptable(&self) -> bool {
        true
    }
}

/// Check that every required field is present and every answer is non-blank.
pub fn check_completion(result: &InterviewResult) -> CompletionCheck {
    let mut missing = Vec::new();

    if result.name.trim().is_empty() {
        missing.push("name".to_string());
    }
    if result.age == 0 {
        missing.push("age".to_string());
    }
    for question in question_bank() {
        match result.answer(&question.id) {
            Some(answer) if !answer.trim().is_empty() => {}
            _ => missing.push(question.id.clone()),
        }
    }

    CompletionCheck {
        is_valid: missing.is_empty(),
        missing_fields: missing,
    }
}

/// Question ids with no non-blank answer yet.
pub fn missing_question_ids(result: &InterviewResult) -> Vec<String> {
    question_bank()
        .iter()
        .filter(|q| {
            result
                .answer(&q.id)
                .map(|a| a.trim().is_empty())
                .unwrap_or(true)
        })
        .map(|q| q.id.clone())
        .collect()
}

/// Count of questions answered non-blank.
pub fn answered_count(result: &InterviewResult) -> usize {
    question_bank().len() - missing_question_ids(result).len()
}

/// Flag data-quality concerns: very short answers, a too-short name, an
/// implausible age. Never blocks processing.
pub fn check_quality(result: &InterviewResult) -> QualityReport {
    let mut warnings = Vec::new();

    for record in &result.answers {
        let answer = record.text.trim();
        if !answer.is_empty() && answer.chars().count() < MIN_ANSWER_CHARS {
            warnings.push(format!("{} has a very short answer", record.question_id));
        }
    }

    if !result.name.trim().is_empty() && result.name.trim().chars().count() < MIN_NAME_CHARS {
        warnings.push("name is very short".to_string());
    }

    if result.age != 0 && !PLAUSIBLE_AGE.contains(&result.age) {
        warnings.push(format!("age ({}) is outside the usual range", result.age));
    }

    QualityReport { warnings }
}
