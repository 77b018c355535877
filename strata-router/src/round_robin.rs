//! Round-robin policy

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strata_types::{Host, Statement};

use crate::host_registry::HostRegistry;
use crate::policy::{HostDistance, LoadBalancingPolicy, QueryPlan};

/// Treats every host as local and rotates the starting host per plan.
///
/// Down hosts are still listed; filtering on liveness is left to the caller
/// (or to a wrapping policy).
pub struct RoundRobinPolicy {
    registry: Arc<HostRegistry>,
    round_robin_counter: AtomicUsize,
}

impl RoundRobinPolicy {
    pub fn new(registry: Arc<HostRegistry>) -> Self {
        Self {
            registry,
            round_robin_counter: AtomicUsize::new(0),
        }
    }
}

/// Iterate `hosts` once, starting at `start`
pub(crate) fn rotated(hosts: Vec<Arc<Host>>, start: usize) -> impl Iterator<Item = Arc<Host>> {
    let len = hosts.len();
    (0..len).map(move |i| hosts[(start + i) % len].clone())
}

impl LoadBalancingPolicy for RoundRobinPolicy {
    fn distance(&self, _host: &Host) -> HostDistance {
        HostDistance::Local
    }

    fn new_query_plan<'a>(
        &'a self,
        _keyspace: Option<&'a str>,
        _statement: Option<&'a Statement>,
    ) -> QueryPlan<'a> {
        let hosts = self.registry.all();
        if hosts.is_empty() {
            return Box::new(std::iter::empty());
        }
        let start = self.round_robin_counter.fetch_add(1, Ordering::Relaxed) % hosts.len();
        Box::new(rotated(hosts, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn registry_with(n: u8) -> Arc<HostRegistry> {
        let registry = Arc::new(HostRegistry::new());
        for i in 1..=n {
            registry.add(Host::with_ip(
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, i)),
                "dc1",
                "rack1",
            ));
        }
        registry
    }

    fn plan(policy: &RoundRobinPolicy) -> Vec<String> {
        policy
            .new_query_plan(None, None)
            .map(|h| h.to_string())
            .collect()
    }

    #[test]
    fn test_round_robin() {
        let policy = RoundRobinPolicy::new(registry_with(3));

        let p1 = plan(&policy);
        let p2 = plan(&policy);
        let p3 = plan(&policy);
        let p4 = plan(&policy);

        assert_eq!(p1, vec!["10.0.0.1:9042", "10.0.0.2:9042", "10.0.0.3:9042"]);
        assert_eq!(p2, vec!["10.0.0.2:9042", "10.0.0.3:9042", "10.0.0.1:9042"]);
        assert_eq!(p3, vec!["10.0.0.3:9042", "10.0.0.1:9042", "10.0.0.2:9042"]);
        assert_eq!(p4, p1); // Wraps around
    }

    #[test]
    fn test_all_hosts_local() {
        let registry = registry_with(1);
        let policy = RoundRobinPolicy::new(registry.clone());
        let host = registry.all().remove(0);
        assert_eq!(policy.distance(&host), HostDistance::Local);
        assert!(!policy.requires_partition_map());
    }

    #[test]
    fn test_no_hosts() {
        let policy = RoundRobinPolicy::new(Arc::new(HostRegistry::new()));
        assert_eq!(policy.new_query_plan(None, None).count(), 0);
    }
}
