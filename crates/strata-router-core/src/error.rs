//! Routing error types

use strata_types::ColumnType;
use thiserror::Error;

/// Reasons a statement cannot be mapped to a partition key.
///
/// None of these fail a query: the partition-aware policy turns every one of
/// them into a fallback to its child policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("Unsupported partition-key column type: {0}")]
    UnsupportedColumnType(ColumnType),

    #[error("Type mismatch: column is {expected}, value is {actual}")]
    TypeMismatch {
        expected: ColumnType,
        actual: &'static str,
    },

    #[error("Invalid {column_type} encoding: {reason}")]
    InvalidEncoding {
        column_type: ColumnType,
        reason: String,
    },

    #[error("Statement has no routing columns")]
    NoRoutingColumns,

    #[error("Routing index {index} out of range for {len} bound values")]
    RoutingIndexOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, RoutingError>;
