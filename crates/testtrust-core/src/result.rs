//! Convenience result type alias for TestTrust.

use crate::error::AppError;

/// A specialized `Result` type for TestTrust operations.
pub type AppResult<T> = Result<T, AppError>;
