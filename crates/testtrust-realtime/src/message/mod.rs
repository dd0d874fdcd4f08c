//! Real-time event definitions and constructors.

pub mod builder;
pub mod types;

pub use types::{
    DisconnectReason, ExamEndAction, ExamPayload, InboundMessage, OutboundMessage, StartAction,
    StatusAction,
};
