//! Core domain model and contracts for Fireside.

pub mod interview;
pub mod question;
pub mod validate;

pub use interview::{
    AnalysisVerdict, AnswerRecord, InterviewResult, InterviewSession, InterviewState,
    ProgressSnapshot,
};
pub use question::{question_bank, Question, RequiredElement};
