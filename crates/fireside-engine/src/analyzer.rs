//! Response sufficiency analysis.
//!
//! The analyzer asks the model whether an accumulated answer covers its
//! question's required elements, recovers a structured verdict from whatever
//! text comes back, and degrades to the deterministic heuristic when it
//! can't. Every failure path resolves to a verdict; nothing here surfaces an
//! error to the state machine.

use crate::heuristic::{heuristic_verdict, LeniencyPolicy};
use crate::llm::parse::{infer_completion, parse_verdict, salvage_feedback};
use crate::llm::prompts::{judgment_prompt, LeniencyTier, PERSONA_SYSTEM};
use crate::llm::CompletionClient;
use crate::tone::normalize_feedback;
use fireside_core::{AnalysisVerdict, Question};

#[derive(Debug, Clone)]
pub struct ResponseAnalyzer {
    client: CompletionClient,
    policy: LeniencyPolicy,
}

impl ResponseAnalyzer {
    pub fn new(client: CompletionClient) -> Self {
        Self {
            client,
            policy: LeniencyPolicy::default(),
        }
    }

    pub fn with_policy(client: CompletionClient, policy: LeniencyPolicy) -> Self {
        Self { client, policy }
    }

    /// Judge whether `accumulated_answer` is complete enough for `question`.
    pub async fn analyze(
        &self,
        question: &Question,
        accumulated_answer: &str,
        follow_up_count: u32,
    ) -> AnalysisVerdict {
        let prompt = judgment_prompt(
            question,
            accumulated_answer,
            LeniencyTier::for_follow_ups(follow_up_count),
        );

        match self.client.complete(&prompt, None, Some(PERSONA_SYSTEM)).await {
            Ok(text) => {
                self.digest_model_output(question, accumulated_answer, follow_up_count, &text)
            }
            Err(err) => {
                tracing::warn!(
                    question = %question.id,
                    error = %err,
                    "completion failed; using heuristic analysis"
                );
                heuristic_verdict(question, accumulated_answer, follow_up_count, &self.policy)
            }
        }
    }

    /// Turn raw model text into a verdict, layering the fallbacks: structured
    /// parse, bare-feedback salvage, then the heuristic analyzer.
    fn digest_model_output(
        &self,
        question: &Question,
        accumulated_answer: &str,
        follow_up_count: u32,
        text: &str,
    ) -> AnalysisVerdict {
        if let Some(wire) = parse_verdict(text) {
            return AnalysisVerdict {
                is_complete: wire.is_complete,
                missing_elements: wire.missing_elements,
                feedback: normalize_feedback(&wire.feedback, accumulated_answer),
            };
        }

        if let Some(feedback) = salvage_feedback(text) {
            let is_complete = infer_completion(text);
            let missing = if is_complete {
                Vec::new()
            } else {
                question.elements.iter().map(|e| e.label.clone()).collect()
            };
            return AnalysisVerdict {
                is_complete,
                missing_elements: missing,
                feedback: normalize_feedback(&feedback, accumulated_answer),
            };
        }

        tracing::warn!(question = %question.id, "unparseable judge output; using heuristic analysis");
        heuristic_verdict(question, accumulated_answer, follow_up_count, &self.policy)
    }
}
