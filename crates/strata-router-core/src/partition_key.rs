//! Partition-key derivation
//!
//! The partition key is a 16-bit bucket of the 64-bit hash of the
//! concatenated routing-column encodings:
//!
//! ```text
//! h   = hash64(encode(col[i0]) ++ encode(col[i1]) ++ ..., 97)
//! key = ((h >> 48) ^ 3*(h >> 32) ^ 5*(h >> 16) ^ 7*(h & 0xffff)) & 0xffff
//! ```

use strata_types::{BoundStatement, ColumnType, Value};
use tracing::debug;

use crate::codec;
use crate::error::{Result, RoutingError};
use crate::hash::hash64;

/// Seed the server-side partitioner hashes with
pub const PARTITION_HASH_SEED: u64 = 97;

/// Exclusive upper bound of the partition-key space
pub const PARTITION_KEY_SPACE: i32 = 1 << 16;

/// Fold an already-encoded routing key into its 16-bit partition key
pub fn key_from_bytes(routing_key: &[u8]) -> u16 {
    let h = hash64(routing_key, PARTITION_HASH_SEED);
    let h1 = h >> 48;
    let h2 = (h >> 32).wrapping_mul(3);
    let h3 = (h >> 16).wrapping_mul(5);
    let h4 = (h & 0xffff).wrapping_mul(7);
    ((h1 ^ h2 ^ h3 ^ h4) & 0xffff) as u16
}

/// Encode the routing columns, in index order, into one buffer
pub fn routing_key_bytes(
    routing_indexes: &[usize],
    column_types: &[ColumnType],
    values: &[Value],
) -> Result<Vec<u8>> {
    if routing_indexes.is_empty() {
        return Err(RoutingError::NoRoutingColumns);
    }

    let mut buf = Vec::with_capacity(routing_indexes.len() * 8);
    for &index in routing_indexes {
        let column_type = column_types
            .get(index)
            .ok_or(RoutingError::RoutingIndexOutOfRange {
                index,
                len: column_types.len(),
            })?;
        let value = values.get(index).ok_or(RoutingError::RoutingIndexOutOfRange {
            index,
            len: values.len(),
        })?;
        codec::encode(*column_type, value, &mut buf)?;
    }
    Ok(buf)
}

/// Derive the partition key, reporting why derivation failed
pub fn try_partition_key(
    routing_indexes: &[usize],
    column_types: &[ColumnType],
    values: &[Value],
) -> Result<u16> {
    let routing_key = routing_key_bytes(routing_indexes, column_types, values)?;
    Ok(key_from_bytes(&routing_key))
}

/// Best-effort derivation: `None` means the values are not routable
pub fn partition_key(
    routing_indexes: &[usize],
    column_types: &[ColumnType],
    values: &[Value],
) -> Option<u16> {
    match try_partition_key(routing_indexes, column_types, values) {
        Ok(key) => Some(key),
        Err(e) => {
            debug!(error = %e, "Statement is not routable");
            None
        }
    }
}

/// Partition key of a bound statement
pub fn bound_statement_key(statement: &BoundStatement) -> Option<u16> {
    let prepared = &statement.prepared;
    partition_key(
        &prepared.routing_indexes,
        &prepared.column_types(),
        &statement.values,
    )
}
