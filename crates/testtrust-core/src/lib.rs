//! # testtrust-core
//!
//! Core crate for the TestTrust live session server. Contains configuration
//! schemas, typed identifiers, the exam lookup collaborator trait, the clock
//! abstraction, and the unified error system.
//!
//! This crate has **no** internal dependencies on other TestTrust crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
