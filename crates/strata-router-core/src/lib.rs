//! Strata Router Core - Partition Key Routing Primitives
//!
//! Maps the bound values of a statement to the partition that owns them.
//!
//! ```text
//! (column type, value) pairs
//!     │  codec::encode, in routing-index order
//!     ▼
//! routing key bytes
//!     │  hash::hash64(seed = 97), folded to 16 bits
//!     ▼
//! partition key (0..65536)
//!     │  TableSplitMetadata::lookup
//!     ▼
//! PartitionMetadata { start_key, end_key, hosts (leader first) }
//! ```
//!
//! Everything here is pure and allocation-bounded; choosing which of the
//! replicas to contact is left to `strata-router`.

pub mod codec;
pub mod error;
pub mod hash;
pub mod partition;
pub mod partition_key;

pub use codec::{decode, encode, encode_to_vec, is_partition_key_type};
pub use error::{Result, RoutingError};
pub use hash::hash64;
pub use partition::{PartitionMetadata, TableSplitMetadata};
pub use partition_key::{
    bound_statement_key, key_from_bytes, partition_key, routing_key_bytes, try_partition_key,
    PARTITION_HASH_SEED, PARTITION_KEY_SPACE,
};
