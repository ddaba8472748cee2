//! Engine implementation and LLM orchestration for Fireside.
//!
//! The interview state machine, the response-sufficiency judge, and the
//! workflow supervisor live here; domain types come from `fireside-core`.

pub mod analyzer;
mod heuristic;
pub mod interview;
pub mod llm;
pub mod persona;
pub mod report;
pub mod supervisor;
mod tone;

pub use analyzer::ResponseAnalyzer;
pub use heuristic::LeniencyPolicy;
pub use interview::{InterviewFlow, TurnReply};
pub use llm::client::CompletionClient;
pub use report::{split_message, Analyst};
pub use supervisor::{Supervisor, TurnOutcome};
