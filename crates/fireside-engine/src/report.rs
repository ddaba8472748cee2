//! Learning-profile report generation.
//!
//! Thin layer over one completion call: a validated transcript goes in, a
//! narrative report comes out. A model failure degrades to a deterministic
//! summary built from the raw answers; this never returns an error.

use crate::llm::prompts::{report_prompt, ANALYST_SYSTEM};
use crate::llm::CompletionClient;
use fireside_core::{question_bank, validate, InterviewResult};

/// Default transport chunk size (characters), matching common chat limits.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 4096;

/// Answer preview length in the fallback report.
const PREVIEW_CHARS: usize = 100;

/// Turns a finished interview into a narrative report for the supervising
/// recipient.
pub struct Analyst {
    client: CompletionClient,
}

impl Analyst {
    pub fn new(client: CompletionClient) -> Self {
        Self { client }
    }

    /// Produce the report. Falls back to the deterministic summary when the
    /// data is incomplete or the model call fails.
    pub async fn generate(&self, result: &InterviewResult) -> String {
        let check = validate::check_completion(result);
        if !check.is_valid {
            tracing::warn!(missing = ?check.missing_fields, "analysis requested for incomplete data");
            return fallback_report(result);
        }

        let prompt = report_prompt(&result.name, result.age, &labeled_answers(result));
        match self.client.complete(&prompt, None, Some(ANALYST_SYSTEM)).await {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(error = %err, "report generation failed; using fallback");
                fallback_report(result)
            }
        }
    }
}

/// (question label, accumulated answer) pairs in bank order.
fn labeled_answers(result: &InterviewResult) -> Vec<(String, String)> {
    question_bank()
        .iter()
        .map(|q| {
            (
                q.label.clone(),
                result.answer(&q.id).unwrap_or("").to_string(),
            )
        })
        .collect()
}

/// Deterministic report used when the narrative pass is unavailable: the raw
/// fields with truncated answer previews.
pub fn fallback_report(result: &InterviewResult) -> String {
    let mut lines = vec![
        format!("Learning profile — {} (age {})", result.name, result.age),
        String::new(),
        "The full analysis is unavailable right now; the raw interview answers follow. Please review them manually.".to_string(),
        String::new(),
    ];

    for (label, answer) in labeled_answers(result) {
        let answer = answer.trim().to_string();
        let preview = if answer.is_empty() {
            "(no answer)".to_string()
        } else if answer.chars().count() > PREVIEW_CHARS {
            format!("{}...", answer.chars().take(PREVIEW_CHARS).collect::<String>())
        } else {
            answer
        };
        lines.push(format!("- {}: {}", label, preview));
    }

    lines.join("\n")
}

/// Header prepended to a delivered report.
pub fn report_header(name: &str, age: u32, user_id: &str) -> String {
    format!(
        "📊 Learning profile report\n\n👤 Subject: {} (age {})\n🆔 User: {}\n🕒 Generated: {}\n\n{}\n\n",
        name,
        age,
        user_id,
        chrono::Local::now().format("%Y-%m-%d %H:%M"),
        "=".repeat(50),
    )
}

/// Split an outbound message for a transport with a size cap, breaking on
/// line boundaries (section markers start their own lines) rather than
/// mid-sentence. A single line longer than the cap is hard-wrapped.
pub fn split_message(message: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 || message.chars().count() <= max_chars {
        return vec![message.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for line in message.split('\n') {
        let mut line = line.to_string();

        // Hard-wrap oversize single lines first.
        while line.chars().count() > max_chars {
            if current_chars > 0 {
                chunks.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            let head: String = line.chars().take(max_chars).collect();
            line = line.chars().skip(max_chars).collect();
            chunks.push(head);
        }

        let needed = line.chars().count() + usize::from(current_chars > 0);
        if current_chars + needed > max_chars && current_chars > 0 {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if current_chars > 0 {
            current.push('\n');
            current_chars += 1;
        }
        current.push_str(&line);
        current_chars += line.chars().count();
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
