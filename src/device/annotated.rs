//! Replica-annotated device identifiers.
//!
//! One physical GPU is advertised to the kubelet as several replicas. Each
//! replica carries the physical ID plus a replica index, encoded as
//! `"<id>::<replica>"`. The string form only exists at the plugin-protocol
//! boundary; inside the crate an annotated ID is an [`AnnotatedId`] value.
//!
//! The free functions here are lenient: an unparseable replica suffix is read
//! as replica 0. [`AnnotatedId::parse_strict`] reports it instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnnotatedIdError;

/// Separator between the physical ID and the replica index.
pub const REPLICA_DELIMITER: &str = "::";

/// A device ID together with its replica index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotatedId {
    /// Physical device ID (e.g. a GPU UUID).
    pub id: String,

    /// Replica index, 0 for unannotated IDs.
    pub replica: u64,
}

impl AnnotatedId {
    pub fn new(id: impl Into<String>, replica: u64) -> Self {
        Self {
            id: id.into(),
            replica,
        }
    }

    /// Parse leniently: a missing or malformed replica suffix yields replica 0.
    pub fn parse(raw: &str) -> Self {
        let (id, replica) = split(raw);
        Self::new(id, replica)
    }

    /// Parse, rejecting a replica suffix that is not a non-negative integer.
    ///
    /// Unannotated IDs are accepted as replica 0.
    pub fn parse_strict(raw: &str) -> Result<Self, AnnotatedIdError> {
        match raw.split_once(REPLICA_DELIMITER) {
            None => Ok(Self::new(raw, 0)),
            Some((id, suffix)) => {
                let replica = suffix
                    .parse::<u64>()
                    .map_err(|_| AnnotatedIdError::InvalidReplica {
                        id: raw.to_string(),
                        replica: suffix.to_string(),
                    })?;
                Ok(Self::new(id, replica))
            }
        }
    }
}

impl fmt::Display for AnnotatedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.id, REPLICA_DELIMITER, self.replica)
    }
}

impl FromStr for AnnotatedId {
    type Err = AnnotatedIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_strict(s)
    }
}

/// Encode `id` and `replica` as `"<id>::<replica>"`.
///
/// `id` must not itself contain [`REPLICA_DELIMITER`].
pub fn new_annotated_id(id: &str, replica: u64) -> String {
    format!("{id}{REPLICA_DELIMITER}{replica}")
}

/// Whether `id` carries a replica annotation.
pub fn has_annotations(id: &str) -> bool {
    id.split_once(REPLICA_DELIMITER).is_some()
}

/// Split `id` into its physical ID and replica index.
///
/// Unannotated IDs, and IDs whose suffix is not a valid replica index,
/// yield replica 0.
pub fn split(id: &str) -> (&str, u64) {
    match id.split_once(REPLICA_DELIMITER) {
        Some((base, suffix)) => (base, suffix.parse().unwrap_or(0)),
        None => (id, 0),
    }
}

/// The physical ID part of `id`.
pub fn get_id(id: &str) -> &str {
    split(id).0
}

/// Whether at least one of `ids` carries a replica annotation.
pub fn any_has_annotations<S: AsRef<str>>(ids: &[S]) -> bool {
    ids.iter().any(|id| has_annotations(id.as_ref()))
}

/// The physical ID of each of `ids`, in the same order.
pub fn get_ids<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    ids.iter().map(|id| get_id(id.as_ref()).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(new_annotated_id("GPU-abc", 2), "GPU-abc::2");
        assert_eq!(AnnotatedId::new("GPU-abc", 2).to_string(), "GPU-abc::2");
    }

    #[test]
    fn test_split_round_trip() {
        for (id, replica) in [("GPU-abc", 0), ("GPU-abc", 7), ("MIG-1c2d", 31)] {
            let encoded = new_annotated_id(id, replica);
            assert!(has_annotations(&encoded));
            assert_eq!(split(&encoded), (id, replica));
        }
    }

    #[test]
    fn test_plain_id() {
        assert!(!has_annotations("GPU-abc"));
        assert_eq!(split("GPU-abc"), ("GPU-abc", 0));
        assert_eq!(get_id("GPU-abc"), "GPU-abc");
        assert_eq!(split(""), ("", 0));
    }

    #[test]
    fn test_malformed_replica_defaults_to_zero() {
        assert_eq!(split("GPU-abc::bogus"), ("GPU-abc", 0));
        assert_eq!(split("GPU-abc::"), ("GPU-abc", 0));
        assert_eq!(split("GPU-abc::-3"), ("GPU-abc", 0));
        assert!(has_annotations("GPU-abc::bogus"));
    }

    #[test]
    fn test_replica_above_u32_range() {
        assert_eq!(split("GPU-abc::4294967296"), ("GPU-abc", 4_294_967_296));

        let encoded = new_annotated_id("GPU-abc", u64::MAX);
        assert_eq!(split(&encoded), ("GPU-abc", u64::MAX));
        assert_eq!(AnnotatedId::parse_strict(&encoded).unwrap().replica, u64::MAX);

        // One past u64::MAX no longer fits.
        assert_eq!(split("GPU-abc::18446744073709551616"), ("GPU-abc", 0));
    }

    #[test]
    fn test_split_keeps_trailing_delimiters_in_suffix() {
        // At most two parts: everything after the first delimiter is the suffix.
        assert_eq!(split("GPU-abc::1::2"), ("GPU-abc", 0));
    }

    #[test]
    fn test_parse_strict() {
        assert_eq!(
            "GPU-abc::3".parse::<AnnotatedId>().unwrap(),
            AnnotatedId::new("GPU-abc", 3)
        );
        assert_eq!(
            AnnotatedId::parse_strict("GPU-abc").unwrap(),
            AnnotatedId::new("GPU-abc", 0)
        );

        let err = AnnotatedId::parse_strict("GPU-abc::bogus").unwrap_err();
        assert_eq!(
            err,
            AnnotatedIdError::InvalidReplica {
                id: "GPU-abc::bogus".to_string(),
                replica: "bogus".to_string(),
            }
        );

        let err = AnnotatedId::parse_strict("GPU-abc::-3").unwrap_err();
        assert_eq!(
            err,
            AnnotatedIdError::InvalidReplica {
                id: "GPU-abc::-3".to_string(),
                replica: "-3".to_string(),
            }
        );
        assert_eq!(AnnotatedId::parse("GPU-abc::-3"), AnnotatedId::new("GPU-abc", 0));

        assert_eq!(AnnotatedId::parse("GPU-abc::bogus"), AnnotatedId::new("GPU-abc", 0));
    }

    #[test]
    fn test_bulk() {
        let plain = vec!["GPU-a", "GPU-b"];
        assert!(!any_has_annotations(&plain));
        assert_eq!(get_ids(&plain), vec!["GPU-a", "GPU-b"]);

        let mixed = vec!["GPU-a".to_string(), "GPU-b::1".to_string(), "GPU-a::4".to_string()];
        assert!(any_has_annotations(&mixed));
        assert_eq!(get_ids(&mixed), vec!["GPU-a", "GPU-b", "GPU-a"]);

        let empty: Vec<&str> = Vec::new();
        assert!(!any_has_annotations(&empty));
        assert!(get_ids(&empty).is_empty());
    }
}
