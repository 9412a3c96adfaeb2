//! Opaque identifiers for objects, containers, views and templates.
//!
//! Ids are minted client-side with no central allocator: 72 random bits
//! rendered as 12 base64url characters. Uniqueness is probabilistic.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Random bytes per generated id.
pub const ID_ENTROPY_BYTES: usize = 9;
/// Length of a generated id in characters.
pub const ID_LEN: usize = 12;

/// Source of raw id entropy.
///
/// Documents own their source, so tests can swap in [`SequentialIds`]
/// without touching process-wide state.
pub trait IdSource {
    /// Fill `bytes` with fresh entropy.
    fn fill(&mut self, bytes: &mut [u8; ID_ENTROPY_BYTES]);

    /// Produce the next id string.
    fn next_id(&mut self) -> String {
        let mut bytes = [0u8; ID_ENTROPY_BYTES];
        self.fill(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

/// Ids drawn from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn fill(&mut self, bytes: &mut [u8; ID_ENTROPY_BYTES]) {
        rand::rng().fill_bytes(bytes);
    }
}

/// Deterministic ids from a counter. Useful for tests and replay.
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting at `start`.
    pub fn starting_at(start: u64) -> Self {
        Self { next: start }
    }
}

impl IdSource for SequentialIds {
    fn fill(&mut self, bytes: &mut [u8; ID_ENTROPY_BYTES]) {
        let n = self.next;
        self.next = self.next.wrapping_add(1);
        bytes[0] = 0;
        bytes[1..].copy_from_slice(&n.to_be_bytes());
    }
}

/// Whether `s` has the shape of a generated id.
pub fn is_canonical_id(s: &str) -> bool {
    s.len() == ID_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing id string (e.g. one read from a stored document).
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Mint a new id from `source`.
            pub fn generate(source: &mut dyn IdSource) -> Self {
                Self(source.next_id())
            }

            /// Mint a new id from the thread RNG.
            pub fn random() -> Self {
                Self::generate(&mut RandomIds)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether this id has the generated 12-character shape.
            pub fn is_canonical(&self) -> bool {
                is_canonical_id(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

define_id!(
    /// Identifier of a drawable object.
    ObjectId
);
define_id!(
    /// Identifier of a container (group / layer).
    ContainerId
);
define_id!(
    /// Identifier of a view (page, slide or frame).
    ViewId
);
define_id!(
    /// Identifier of a slide/page template.
    TemplateId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_ids_are_canonical() {
        let id = ObjectId::random();
        assert_eq!(id.as_str().len(), ID_LEN);
        assert!(id.is_canonical());
    }

    #[test]
    fn test_random_ids_differ() {
        let ids: HashSet<ObjectId> = (0..1000).map(|_| ObjectId::random()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_sequential_ids_are_deterministic() {
        let mut a = SequentialIds::new();
        let mut b = SequentialIds::new();
        let first = ContainerId::generate(&mut a);
        assert_eq!(first, ContainerId::generate(&mut b));
        assert_ne!(first, ContainerId::generate(&mut a));
        assert!(first.is_canonical());
    }

    #[test]
    fn test_foreign_ids_are_accepted() {
        let id = ViewId::new("slide-1");
        assert_eq!(id.to_string(), "slide-1");
        assert!(!id.is_canonical());
    }

    #[test]
    fn test_serde_transparent() {
        let id = TemplateId::new("abc");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"abc\"");
    }
}
