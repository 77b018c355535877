//! Partition-aware policy
//!
//! Sends a statement straight to the replicas of the partition that owns its
//! key, falling back to a child policy whenever that partition cannot be
//! determined.
//!
//! ```text
//! Statement
//!     │ bound (or first routable bound statement of a batch)
//!     ▼
//! partition key ──► TableSplitMetadata::lookup ──► replicas (leader first)
//!     │                                                │ shuffled for
//!     │ not routable / no metadata / below range       │ CONSISTENT_PREFIX
//!     ▼                                                ▼
//! child plan                     up replicas ++ child plan minus replicas
//! ```
//!
//! Routing never fails a query. Every problem (type mismatch, unsupported
//! key type, missing metadata) only downgrades the plan to the child's.

use rand::seq::SliceRandom;
use std::sync::Arc;
use strata_router_core::partition_key::bound_statement_key;
use strata_types::{BoundStatement, ConsistencyLevel, Host, Statement};
use tracing::debug;

use crate::cluster::ClusterView;
use crate::policy::{HostDistance, LoadBalancingPolicy, QueryPlan};

/// Replica set chosen for one statement
struct RoutedReplicas {
    replicas: Vec<Arc<Host>>,
    strong: bool,
}

/// Wraps a generic policy and prefers the replicas owning a statement's
/// partition
pub struct PartitionAwarePolicy {
    child: Arc<dyn LoadBalancingPolicy>,
    cluster: Arc<dyn ClusterView>,
}

impl PartitionAwarePolicy {
    pub fn new(child: Arc<dyn LoadBalancingPolicy>, cluster: Arc<dyn ClusterView>) -> Self {
        Self { child, cluster }
    }

    pub fn child(&self) -> &Arc<dyn LoadBalancingPolicy> {
        &self.child
    }

    fn route(&self, keyspace: Option<&str>, statement: &Statement) -> Option<RoutedReplicas> {
        match statement {
            Statement::Bound(bound) => self.route_bound(keyspace, bound, None),
            Statement::Batch(batch) => batch.statements.iter().find_map(|inner| match inner {
                Statement::Bound(bound) => self.route_bound(keyspace, bound, batch.consistency),
                _ => None,
            }),
            Statement::Simple(_) => None,
        }
    }

    fn route_bound(
        &self,
        keyspace: Option<&str>,
        statement: &BoundStatement,
        batch_consistency: Option<ConsistencyLevel>,
    ) -> Option<RoutedReplicas> {
        let prepared = &statement.prepared;
        if prepared.columns.is_empty() {
            debug!(query = %prepared.query, "Statement has no bind markers");
            return None;
        }

        let key = bound_statement_key(statement)?;

        let Some(table) = prepared.full_table_name(keyspace) else {
            debug!(table = %prepared.table, "No keyspace to qualify table name");
            return None;
        };

        let Some(split) = self.cluster.table_split_metadata(&table) else {
            debug!(table = %table, "No split metadata for table");
            return None;
        };

        let Some(partition) = split.lookup(i32::from(key)) else {
            debug!(table = %table, key, "Key precedes every partition");
            return None;
        };
        if partition.hosts.is_empty() {
            debug!(table = %table, key, "Partition has no known replicas");
            return None;
        }

        let consistency = statement
            .consistency
            .or(batch_consistency)
            .unwrap_or_else(|| self.cluster.default_consistency_level());

        let mut replicas = partition.hosts.clone();
        if consistency.is_relaxed() {
            replicas.shuffle(&mut rand::thread_rng());
        }

        debug!(
            table = %table,
            key,
            start_key = partition.start_key,
            end_key = partition.end_key,
            consistency = %consistency,
            replicas = replicas.len(),
            "Routing to partition replicas"
        );

        Some(RoutedReplicas {
            replicas,
            strong: consistency.is_strong(),
        })
    }
}

impl LoadBalancingPolicy for PartitionAwarePolicy {
    fn distance(&self, host: &Host) -> HostDistance {
        self.child.distance(host)
    }

    fn new_query_plan<'a>(
        &'a self,
        keyspace: Option<&'a str>,
        statement: Option<&'a Statement>,
    ) -> QueryPlan<'a> {
        match statement.and_then(|s| self.route(keyspace, s)) {
            Some(routed) => Box::new(PartitionAwarePlan {
                child: &*self.child,
                keyspace,
                replicas: routed.replicas,
                strong: routed.strong,
                next_replica: 0,
                fallback: None,
            }),
            None => self.child.new_query_plan(keyspace, statement),
        }
    }

    fn requires_partition_map(&self) -> bool {
        true
    }
}

/// Up replicas first, then the child's default plan without them.
///
/// The child plan is only requested once every replica has been offered.
struct PartitionAwarePlan<'a> {
    child: &'a dyn LoadBalancingPolicy,
    keyspace: Option<&'a str>,
    replicas: Vec<Arc<Host>>,
    strong: bool,
    next_replica: usize,
    fallback: Option<QueryPlan<'a>>,
}

/// Strong levels ignore locality; everything else stays local
fn eligible(child: &dyn LoadBalancingPolicy, strong: bool, host: &Host) -> bool {
    host.is_up() && (strong || child.distance(host) == HostDistance::Local)
}

impl Iterator for PartitionAwarePlan<'_> {
    type Item = Arc<Host>;

    fn next(&mut self) -> Option<Arc<Host>> {
        while let Some(host) = self.replicas.get(self.next_replica) {
            self.next_replica += 1;
            if eligible(self.child, self.strong, host) {
                return Some(host.clone());
            }
        }

        let child = self.child;
        let keyspace = self.keyspace;
        let strong = self.strong;
        let replicas = &self.replicas;
        let fallback = self
            .fallback
            .get_or_insert_with(|| child.new_query_plan(keyspace, None));

        fallback.find(|host| !replicas.contains(host) && eligible(child, strong, host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterMetadata;
    use crate::host_registry::HostRegistry;
    use crate::round_robin::RoundRobinPolicy;
    use std::net::{IpAddr, Ipv4Addr};
    use strata_router_core::{PartitionMetadata, TableSplitMetadata, PARTITION_KEY_SPACE};
    use strata_types::{ColumnType, PreparedStatement, SimpleStatement, Value};

    // Int values whose partition keys are 81 and 4624
    const LOW_KEY_VALUE: i32 = 967;
    const HIGH_KEY_VALUE: i32 = 1;

    struct Fixture {
        registry: Arc<HostRegistry>,
        cluster: Arc<ClusterMetadata>,
        policy: PartitionAwarePolicy,
    }

    fn fixture(default_consistency: ConsistencyLevel) -> Fixture {
        let registry = Arc::new(HostRegistry::new());
        let hosts: Vec<Arc<Host>> = (1..=5)
            .map(|i| {
                registry.add(Host::with_ip(
                    IpAddr::V4(Ipv4Addr::new(10, 0, 0, i)),
                    "dc1",
                    "rack1",
                ))
            })
            .collect();
        let cluster = Arc::new(ClusterMetadata::new(registry.clone(), default_consistency));
        cluster.update_table(
            "ks.t",
            TableSplitMetadata::new(vec![
                PartitionMetadata::new(100, PARTITION_KEY_SPACE, vec![hosts[2].clone(), hosts[3].clone()]),
                PartitionMetadata::new(0, 100, vec![hosts[0].clone(), hosts[1].clone()]),
            ]),
        );
        let child: Arc<dyn LoadBalancingPolicy> = Arc::new(RoundRobinPolicy::new(registry.clone()));
        let policy = PartitionAwarePolicy::new(child, cluster.clone());
        Fixture {
            registry,
            cluster,
            policy,
        }
    }

    fn bound(value: Value) -> Statement {
        let prepared = Arc::new(
            PreparedStatement::new("SELECT v FROM t WHERE k = ?", Some("ks"), "t")
                .with_column("k", ColumnType::Int)
                .with_routing_indexes(vec![0]),
        );
        Statement::Bound(BoundStatement::new(prepared, vec![value]))
    }

    fn plan(policy: &PartitionAwarePolicy, statement: Option<&Statement>) -> Vec<u8> {
        policy
            .new_query_plan(None, statement)
            .map(|h| match h.ip() {
                IpAddr::V4(ip) => ip.octets()[3],
                IpAddr::V6(_) => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_routes_to_leader_first() {
        let f = fixture(ConsistencyLevel::Quorum);
        let statement = bound(Value::Int(LOW_KEY_VALUE));
        assert_eq!(plan(&f.policy, Some(&statement)), vec![1, 2, 3, 4, 5]);

        let statement = bound(Value::Int(HIGH_KEY_VALUE));
        let hosts = plan(&f.policy, Some(&statement));
        assert_eq!(&hosts[..2], &[3, 4]);
        assert_eq!(hosts.len(), 5);
    }

    #[test]
    fn test_skips_down_replicas() {
        let f = fixture(ConsistencyLevel::Quorum);
        let leader = f.registry.all()[0].clone();
        leader.set_down();

        let statement = bound(Value::Int(LOW_KEY_VALUE));
        let hosts = plan(&f.policy, Some(&statement));
        assert_eq!(hosts[0], 2);
        assert!(!hosts.contains(&1));
    }

    #[test]
    fn test_fallback_has_no_duplicates() {
        let f = fixture(ConsistencyLevel::LocalOne);
        let statement = bound(Value::Int(LOW_KEY_VALUE));
        let mut hosts = plan(&f.policy, Some(&statement));
        assert_eq!(&hosts[..2], &[1, 2]);
        hosts.sort();
        hosts.dedup();
        assert_eq!(hosts.len(), 5);
    }

    #[test]
    fn test_type_mismatch_falls_back_to_child() {
        let f = fixture(ConsistencyLevel::Quorum);
        let statement = bound(Value::from("not an int"));
        let hosts = plan(&f.policy, Some(&statement));
        let mut sorted = hosts.clone();
        sorted.sort();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_missing_metadata_falls_back_to_child() {
        let f = fixture(ConsistencyLevel::Quorum);
        f.cluster.remove_table("ks.t");
        let statement = bound(Value::Int(LOW_KEY_VALUE));
        assert_eq!(plan(&f.policy, Some(&statement)).len(), 5);
    }

    #[test]
    fn test_key_below_first_partition_falls_back() {
        let f = fixture(ConsistencyLevel::Quorum);
        let hosts = f.registry.all();
        f.cluster.update_table(
            "ks.t",
            TableSplitMetadata::new(vec![PartitionMetadata::new(
                200,
                PARTITION_KEY_SPACE,
                vec![hosts[4].clone()],
            )]),
        );
        // Key 81 precedes the only partition, so the child's rotation applies
        let statement = bound(Value::Int(LOW_KEY_VALUE));
        let first = plan(&f.policy, Some(&statement));
        let second = plan(&f.policy, Some(&statement));
        assert_ne!(first[0], second[0]);
    }

    #[test]
    fn test_simple_and_missing_statements_use_child() {
        let f = fixture(ConsistencyLevel::Quorum);
        let simple = Statement::Simple(SimpleStatement::new("SELECT now() FROM system.local"));
        assert_eq!(plan(&f.policy, Some(&simple)).len(), 5);
        assert_eq!(plan(&f.policy, None).len(), 5);
    }

    #[test]
    fn test_statement_without_bind_markers_uses_child() {
        let f = fixture(ConsistencyLevel::Quorum);
        let prepared = Arc::new(
            PreparedStatement::new("SELECT v FROM t WHERE k = 1", Some("ks"), "t")
                .with_routing_indexes(vec![0]),
        );
        let statement = Statement::Bound(BoundStatement::new(prepared, vec![]));
        assert!(f.policy.route(None, &statement).is_none());
    }

    #[test]
    fn test_keyspace_argument_qualifies_table() {
        let f = fixture(ConsistencyLevel::Quorum);
        let prepared = Arc::new(
            PreparedStatement::new("SELECT v FROM t WHERE k = ?", None, "t")
                .with_column("k", ColumnType::Int)
                .with_routing_indexes(vec![0]),
        );
        let statement = Statement::Bound(BoundStatement::new(prepared, vec![Value::Int(LOW_KEY_VALUE)]));
        assert!(f.policy.route(None, &statement).is_none());
        assert!(f.policy.route(Some("ks"), &statement).is_some());
    }

    #[test]
    fn test_statement_consistency_overrides_default() {
        let f = fixture(ConsistencyLevel::LocalOne);
        let Statement::Bound(b) = bound(Value::Int(LOW_KEY_VALUE)) else {
            unreachable!()
        };
        let statement = Statement::Bound(b.with_consistency(ConsistencyLevel::All));
        assert!(f.policy.route(None, &statement).unwrap().strong);

        let statement = bound(Value::Int(LOW_KEY_VALUE));
        assert!(!f.policy.route(None, &statement).unwrap().strong);
    }

    #[test]
    fn test_requires_partition_map() {
        let f = fixture(ConsistencyLevel::Quorum);
        assert!(f.policy.requires_partition_map());
        assert!(!f.policy.child().requires_partition_map());
    }
}
