//! The interview question bank.
//!
//! Questions are configuration data, not logic: the sequence ships as embedded
//! TOML and is parsed once. The core never mutates a question.

use serde::Deserialize;
use std::sync::OnceLock;

/// A fact an answer must contain to count as sufficient for its question.
#[derive(Debug, Clone, Deserialize)]
pub struct RequiredElement {
    /// Natural-language description used in judgment prompts.
    pub label: String,
    /// Keyword set used by the heuristic analyzer when the model is unavailable.
    pub keywords: Vec<String>,
    /// Simplified phrasing used when naming the element back to the subject.
    pub hint: String,
}

/// Immutable interview question configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub id: String,
    /// Short topic label used in reports.
    pub label: String,
    /// The question as asked to the subject.
    pub text: String,
    /// Ordered facts a sufficient answer must cover.
    pub elements: Vec<RequiredElement>,
}

#[derive(Deserialize)]
struct QuestionBankFile {
    questions: Vec<Question>,
}

const QUESTION_BANK_TOML: &str = include_str!("../assets/questions.toml");

static QUESTION_BANK: OnceLock<Vec<Question>> = OnceLock::new();

/// The fixed interview question sequence.
pub fn question_bank() -> &'static [Question] {
    QUESTION_BANK.get_or_init(|| {
        let file: QuestionBankFile =
            toml::from_str(QUESTION_BANK_TOML).expect("embedded question bank should parse");
        file.questions
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn bank_parses_with_seven_questions() {
        assert_eq!(question_bank().len(), 7);
    }

    #[test]
    fn question_ids_are_unique_and_ordered() {
        let ids: Vec<&str> = question_bank().iter().map(|q| q.id.as_str()).collect();
        let unique: HashSet<&&str> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(ids[0], "q1");
        assert_eq!(ids[6], "q7");
    }

    #[test]
    fn every_element_carries_keywords_and_a_hint() {
        for question in question_bank() {
            assert!(!question.elements.is_empty(), "{} has no elements", question.id);
            assert!(!question.text.trim().is_empty());
            for element in &question.elements {
                assert!(!element.keywords.is_empty(), "{}: {} has no keywords", question.id, element.label);
                assert!(!element.hint.trim().is_empty());
            }
        }
    }
}
