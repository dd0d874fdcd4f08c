//! Trait definitions for the collaborators the session core depends on.

pub mod clock;
pub mod directory;

pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::ExamDirectory;
