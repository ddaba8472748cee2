//! Workflow supervision.
//!
//! Composes the interview flow, the data validator, and the learning analyst
//! behind one turn-level interface. Validation gates report triggering only;
//! the user-facing reply is never blocked by it.

use crate::interview::{InterviewFlow, TurnReply};
use crate::llm::CompletionClient;
use crate::report::Analyst;
use fireside_core::{validate, InterviewResult, InterviewState, ProgressSnapshot};

/// Outcome of one user turn, as exposed to the transport layer.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply_text: String,
    pub state: InterviewState,
    pub is_complete: bool,
    /// True only when the interview finished this turn and its data passed
    /// the completeness check.
    pub should_trigger_analysis: bool,
    /// The finished record, present exactly when analysis should run.
    pub interview_data: Option<InterviewResult>,
    /// Internal validation status for logging/ops; not shown to the subject.
    pub validation_note: Option<String>,
}

/// Coordinates the interview agent and the analyst.
pub struct Supervisor {
    flow: InterviewFlow,
    analyst: Analyst,
}

impl Supervisor {
    pub fn new(client: CompletionClient) -> Self {
        Self {
            flow: InterviewFlow::new(client.clone()),
            analyst: Analyst::new(client),
        }
    }

    /// Handle one user turn and decide whether report generation should fire.
    pub async fn handle_turn(&self, user_id: &str, message: &str) -> TurnOutcome {
        let TurnReply {
            message: reply_text,
            state,
            is_complete,
            result,
            newly_completed,
        } = self.flow.handle_message(user_id, message).await;

        let mut should_trigger = false;
        let mut validation_note = None;

        if newly_completed {
            if let Some(result) = result.as_ref() {
                let check = validate::check_completion(result);
                if check.is_valid {
                    let quality = validate::check_quality(result);
                    for warning in &quality.warnings {
                        tracing::warn!(user = user_id, %warning, "data quality concern");
                    }
                    should_trigger = true;
                    validation_note = Some("interview complete and valid".to_string());
                } else {
                    tracing::error!(
                        user = user_id,
                        missing = ?check.missing_fields,
                        "completed interview failed validation"
                    );
                    validation_note = Some(format!(
                        "validation failed: missing {}",
                        check.missing_fields.join(", ")
                    ));
                }
            }
        }

        TurnOutcome {
            reply_text,
            state,
            is_complete,
            should_trigger_analysis: should_trigger,
            interview_data: if should_trigger { result } else { None },
            validation_note,
        }
    }

    /// Generate the analyst report for a finished interview.
    ///
    /// Re-validates first; invalid data yields a validation-error message
    /// instead of a model call. Never fails.
    pub async fn generate_report(&self, data: &InterviewResult) -> String {
        let check = validate::check_completion(data);
        if !check.is_valid {
            return format!(
                "⚠️ Can't build the report: missing {}",
                check.missing_fields.join(", ")
            );
        }
        self.analyst.generate(data).await
    }

    /// Start (or restart) an interview, returning the introduction text.
    pub fn start(&self, user_id: &str) -> String {
        self.flow.start(user_id)
    }

    /// Drop the user's session; the next message starts over.
    pub fn reset(&self, user_id: &str) {
        self.flow.reset(user_id)
    }

    pub async fn progress(&self, user_id: &str) -> Option<ProgressSnapshot> {
        self.flow.progress(user_id).await
    }
}
