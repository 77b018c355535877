//! Datacenter-aware round-robin policy

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strata_types::{Host, Statement};

use crate::host_registry::HostRegistry;
use crate::policy::{HostDistance, LoadBalancingPolicy, QueryPlan};
use crate::round_robin::rotated;

/// Round-robin over the local datacenter, then a bounded number of hosts
/// from each remote datacenter.
///
/// Hosts of `local_dc` are `Local`. In every other datacenter the first
/// `used_hosts_per_remote_dc` hosts (address order) are `Remote` and the
/// rest are `Ignored`. Down hosts are left out of plans.
pub struct DcAwareRoundRobinPolicy {
    registry: Arc<HostRegistry>,
    local_dc: String,
    used_hosts_per_remote_dc: usize,
    round_robin_counter: AtomicUsize,
}

impl DcAwareRoundRobinPolicy {
    pub fn new(registry: Arc<HostRegistry>, local_dc: impl Into<String>) -> Self {
        Self::with_remote_hosts(registry, local_dc, 0)
    }

    pub fn with_remote_hosts(
        registry: Arc<HostRegistry>,
        local_dc: impl Into<String>,
        used_hosts_per_remote_dc: usize,
    ) -> Self {
        Self {
            registry,
            local_dc: local_dc.into(),
            used_hosts_per_remote_dc,
            round_robin_counter: AtomicUsize::new(0),
        }
    }

    pub fn local_dc(&self) -> &str {
        &self.local_dc
    }

    /// Remote hosts eligible for plans, datacenter by datacenter
    fn remote_hosts(&self) -> Vec<Arc<Host>> {
        if self.used_hosts_per_remote_dc == 0 {
            return Vec::new();
        }
        self.registry
            .datacenters()
            .into_iter()
            .filter(|dc| *dc != self.local_dc)
            .flat_map(|dc| {
                self.registry
                    .in_datacenter(&dc)
                    .into_iter()
                    .take(self.used_hosts_per_remote_dc)
            })
            .collect()
    }
}

impl LoadBalancingPolicy for DcAwareRoundRobinPolicy {
    fn distance(&self, host: &Host) -> HostDistance {
        if host.datacenter() == self.local_dc {
            return HostDistance::Local;
        }
        if self.used_hosts_per_remote_dc == 0 {
            return HostDistance::Ignored;
        }
        let eligible = self
            .registry
            .in_datacenter(host.datacenter())
            .iter()
            .take(self.used_hosts_per_remote_dc)
            .any(|h| h.address() == host.address());
        if eligible {
            HostDistance::Remote
        } else {
            HostDistance::Ignored
        }
    }

    fn new_query_plan<'a>(
        &'a self,
        _keyspace: Option<&'a str>,
        _statement: Option<&'a Statement>,
    ) -> QueryPlan<'a> {
        let local = self.registry.in_datacenter(&self.local_dc);
        let start = if local.is_empty() {
            0
        } else {
            self.round_robin_counter.fetch_add(1, Ordering::Relaxed) % local.len()
        };

        // Remote hosts are only computed once the local ones are exhausted
        let remote = std::iter::once(()).flat_map(move |_| self.remote_hosts());

        Box::new(
            rotated(local, start)
                .chain(remote)
                .filter(|h| h.is_up()),
        )
    }
}
