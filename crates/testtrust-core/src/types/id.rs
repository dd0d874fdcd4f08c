//! Newtype wrappers for the identifiers that flow through the session core.
//!
//! Exam, student, and instructor identifiers come from the exam
//! administration service as opaque strings. Transport session identifiers
//! are minted by this server, one per WebSocket connection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a newtype key wrapper around an external string identifier.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is blank.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_key!(
    /// Identifier of a student, stable across reconnects.
    StudentId
);

define_key!(
    /// Identifier of an exam.
    ExamId
);

define_key!(
    /// Identifier of the instructor issuing a command.
    InstructorId
);

/// Identifier of one transport (WebSocket) session.
///
/// A fresh value is minted on every connect, so a reconnecting student
/// always presents a new `TransportSessionId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransportSessionId(pub Uuid);

impl TransportSessionId {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return the inner UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for TransportSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransportSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransportSessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for TransportSessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_serializes_transparently() {
        let id = StudentId::new("64f1c0ffee");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"64f1c0ffee\"");
        let back: StudentId = serde_json::from_str("\"64f1c0ffee\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_blank_detection() {
        assert!(ExamId::new("   ").is_blank());
        assert!(!ExamId::new("exam-1").is_blank());
    }

    #[test]
    fn test_transport_session_ids_are_unique() {
        assert_ne!(TransportSessionId::new(), TransportSessionId::new());
    }
}
