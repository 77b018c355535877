//! Load-balancing policy trait

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strata_types::{Host, Statement};

/// Locality of a host relative to this client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostDistance {
    /// Preferred; same datacenter
    Local,
    /// Usable as a fallback
    Remote,
    /// Never contacted
    Ignored,
}

/// Lazily produced, finite, non-restartable sequence of hosts to try.
///
/// Callers pull hosts one at a time and may stop after the first success.
pub type QueryPlan<'a> = Box<dyn Iterator<Item = Arc<Host>> + Send + 'a>;

/// Decides which hosts a request is sent to, and in which order.
///
/// Policies compose by delegation: a wrapping policy holds a child and
/// consults it for distances and fallback plans.
pub trait LoadBalancingPolicy: Send + Sync {
    /// Locality classification of `host`
    fn distance(&self, host: &Host) -> HostDistance;

    /// Hosts to try for `statement`. A `None` statement asks for the
    /// policy's default ordering.
    fn new_query_plan<'a>(
        &'a self,
        keyspace: Option<&'a str>,
        statement: Option<&'a Statement>,
    ) -> QueryPlan<'a>;

    /// Whether the driver must fetch and maintain per-table partition maps
    /// for this policy to work
    fn requires_partition_map(&self) -> bool {
        false
    }
}
