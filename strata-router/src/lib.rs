//! Strata Router - Load-balancing policies
//!
//! Produces the ordered list of hosts a request is tried against.
//!
//! # Architecture
//!
//! ```text
//! Statement
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │  PartitionAwarePolicy   │  Owning partition's replicas first
//! │   (Which partition?)    │  (ClusterView split metadata)
//! └───────────┬─────────────┘
//!             │ fallback / tail of plan
//!             ▼
//! ┌─────────────────────────┐
//! │  RoundRobinPolicy or    │  Generic ordering and host distance
//! │  DcAwareRoundRobinPolicy│
//! └─────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_router::{ClusterMetadata, HostRegistry, RouterConfig};
//!
//! let config = RouterConfig::from_env();
//! let registry = Arc::new(HostRegistry::new());
//! let cluster = Arc::new(ClusterMetadata::new(registry.clone(), config.default_consistency));
//! let policy = config.build_policy(registry, cluster)?;
//!
//! for host in policy.new_query_plan(Some("ks"), Some(&statement)) {
//!     // try host
//! }
//! ```

mod cluster;
mod config;
mod dc_aware;
mod host_registry;
mod partition_aware;
mod policy;
mod round_robin;

// Re-exports: Policy trait
pub use policy::{HostDistance, LoadBalancingPolicy, QueryPlan};

// Re-exports: Policies
pub use dc_aware::DcAwareRoundRobinPolicy;
pub use partition_aware::PartitionAwarePolicy;
pub use round_robin::RoundRobinPolicy;

// Re-exports: Cluster state
pub use cluster::{ClusterMetadata, ClusterView, ParseReplicaRoleError, PartitionRow, ReplicaRole};
pub use host_registry::HostRegistry;

// Re-exports: Configuration
pub use config::RouterConfig;
