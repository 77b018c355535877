//! Consistency levels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Requested guarantee strength for a read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    Serial,
    LocalSerial,
    #[default]
    LocalOne,
    /// Reads may be served by any up replica; replicas are shuffled
    ConsistentPrefix,
}

impl ConsistencyLevel {
    /// Levels whose quorum must span localities.
    ///
    /// Locality filtering is bypassed for these when ordering replicas.
    pub fn is_strong(&self) -> bool {
        matches!(
            self,
            ConsistencyLevel::Quorum
                | ConsistencyLevel::All
                | ConsistencyLevel::EachQuorum
                | ConsistencyLevel::Serial
        )
    }

    /// Levels that permit reordering replicas for load distribution
    pub fn is_relaxed(&self) -> bool {
        matches!(self, ConsistencyLevel::ConsistentPrefix)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Any => "ANY",
            ConsistencyLevel::One => "ONE",
            ConsistencyLevel::Two => "TWO",
            ConsistencyLevel::Three => "THREE",
            ConsistencyLevel::Quorum => "QUORUM",
            ConsistencyLevel::All => "ALL",
            ConsistencyLevel::LocalQuorum => "LOCAL_QUORUM",
            ConsistencyLevel::EachQuorum => "EACH_QUORUM",
            ConsistencyLevel::Serial => "SERIAL",
            ConsistencyLevel::LocalSerial => "LOCAL_SERIAL",
            ConsistencyLevel::LocalOne => "LOCAL_ONE",
            ConsistencyLevel::ConsistentPrefix => "CONSISTENT_PREFIX",
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown consistency level: {0}")]
pub struct ParseConsistencyError(pub String);

impl FromStr for ConsistencyLevel {
    type Err = ParseConsistencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "ANY" => ConsistencyLevel::Any,
            "ONE" => ConsistencyLevel::One,
            "TWO" => ConsistencyLevel::Two,
            "THREE" => ConsistencyLevel::Three,
            "QUORUM" => ConsistencyLevel::Quorum,
            "ALL" => ConsistencyLevel::All,
            "LOCAL_QUORUM" => ConsistencyLevel::LocalQuorum,
            "EACH_QUORUM" => ConsistencyLevel::EachQuorum,
            "SERIAL" => ConsistencyLevel::Serial,
            "LOCAL_SERIAL" => ConsistencyLevel::LocalSerial,
            "LOCAL_ONE" => ConsistencyLevel::LocalOne,
            "CONSISTENT_PREFIX" => ConsistencyLevel::ConsistentPrefix,
            _ => return Err(ParseConsistencyError(s.to_string())),
        };
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_levels() {
        assert!(ConsistencyLevel::Quorum.is_strong());
        assert!(ConsistencyLevel::All.is_strong());
        assert!(ConsistencyLevel::EachQuorum.is_strong());
        assert!(ConsistencyLevel::Serial.is_strong());

        assert!(!ConsistencyLevel::LocalOne.is_strong());
        assert!(!ConsistencyLevel::LocalQuorum.is_strong());
        assert!(!ConsistencyLevel::ConsistentPrefix.is_strong());
    }

    #[test]
    fn test_only_consistent_prefix_is_relaxed() {
        assert!(ConsistencyLevel::ConsistentPrefix.is_relaxed());
        assert!(!ConsistencyLevel::One.is_relaxed());
        assert!(!ConsistencyLevel::Quorum.is_relaxed());
    }

    #[test]
    fn test_parse() {
        assert_eq!("quorum".parse(), Ok(ConsistencyLevel::Quorum));
        assert_eq!("local-one".parse(), Ok(ConsistencyLevel::LocalOne));
        assert_eq!(
            "CONSISTENT_PREFIX".parse(),
            Ok(ConsistencyLevel::ConsistentPrefix)
        );
        assert!("strongest".parse::<ConsistencyLevel>().is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let json = serde_json::to_string(&ConsistencyLevel::LocalQuorum).unwrap();
        assert_eq!(json, "\"LOCAL_QUORUM\"");
        let back: ConsistencyLevel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ConsistencyLevel::LocalQuorum);
    }
}
