//! Identifier newtypes
//!
//! All entities are addressed by opaque string identifiers. `generate()`
//! produces a fresh UUIDv4-backed value; `new()` wraps an existing one
//! (foreign keys handed in by collaborators, fixtures in tests).

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

id_type! {
    /// A monitored project
    ProjectId
}

id_type! {
    /// A weighted milestone within a project
    MilestoneId
}

id_type! {
    /// A field-reported submission under review
    SubmissionId
}

id_type! {
    /// A user known to the external user directory
    UserId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = ProjectId::generate();
        let b = ProjectId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_roundtrip() {
        let id = MilestoneId::new("m-1");
        assert_eq!(id.to_string(), "m-1");
        assert_eq!(id.as_str(), "m-1");
    }

    #[test]
    fn test_serde_is_transparent_enough() {
        let id = UserId::new("u-7");
        let json = serde_json::to_string(&id).unwrap();
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
