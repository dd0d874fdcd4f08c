//! Shared domain types.

pub mod exam;
pub mod id;

pub use exam::{ClientInfo, ExamSummary, StudentProfile};
pub use id::{ExamId, InstructorId, StudentId, TransportSessionId};
