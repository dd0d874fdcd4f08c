//! HTTP and WebSocket request handlers.

pub mod exams;
pub mod health;
pub mod students;
pub mod ws;
