//! Cluster metadata snapshot consumed by the partition-aware policy
//!
//! Per-table partition maps are published as `Arc<TableSplitMetadata>` and
//! replaced wholesale on refresh. Readers clone the `Arc` under a short read
//! lock and never observe a half-built index.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use strata_router_core::{PartitionMetadata, TableSplitMetadata};
use strata_types::{ConsistencyLevel, Host};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::host_registry::HostRegistry;

/// Read-only view of cluster metadata needed for routing
pub trait ClusterView: Send + Sync {
    /// Partition map of `keyspace.table`, if one has been fetched
    fn table_split_metadata(&self, full_table_name: &str) -> Option<Arc<TableSplitMetadata>>;

    /// Consistency used when a statement does not set one
    fn default_consistency_level(&self) -> ConsistencyLevel;
}

/// Role of a replica within a partition's raft group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicaRole {
    Leader,
    Follower,
    ReadReplica,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown replica role: {0}")]
pub struct ParseReplicaRoleError(pub String);

impl FromStr for ReplicaRole {
    type Err = ParseReplicaRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LEADER" => Ok(ReplicaRole::Leader),
            "FOLLOWER" => Ok(ReplicaRole::Follower),
            "READ_REPLICA" => Ok(ReplicaRole::ReadReplica),
            _ => Err(ParseReplicaRoleError(s.to_string())),
        }
    }
}

impl fmt::Display for ReplicaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicaRole::Leader => f.write_str("LEADER"),
            ReplicaRole::Follower => f.write_str("FOLLOWER"),
            ReplicaRole::ReadReplica => f.write_str("READ_REPLICA"),
        }
    }
}

/// One row of the server's partitions system table
#[derive(Debug, Clone)]
pub struct PartitionRow {
    pub keyspace: String,
    pub table: String,
    /// 2-byte big-endian start key; empty for the first partition
    pub start_key: Vec<u8>,
    /// 2-byte big-endian end key; empty for the last partition
    pub end_key: Vec<u8>,
    pub replicas: Vec<(IpAddr, ReplicaRole)>,
}

impl PartitionRow {
    pub fn full_table_name(&self) -> String {
        format!("{}.{}", self.keyspace, self.table)
    }
}

/// In-memory cluster metadata store
pub struct ClusterMetadata {
    registry: Arc<HostRegistry>,
    tables: RwLock<HashMap<String, Arc<TableSplitMetadata>>>,
    default_consistency: ConsistencyLevel,
}

impl ClusterMetadata {
    pub fn new(registry: Arc<HostRegistry>, default_consistency: ConsistencyLevel) -> Self {
        Self {
            registry,
            tables: RwLock::new(HashMap::new()),
            default_consistency,
        }
    }

    pub fn registry(&self) -> &Arc<HostRegistry> {
        &self.registry
    }

    /// Publish the partition map of one table, replacing any previous one
    pub fn update_table(&self, full_table_name: impl Into<String>, split: TableSplitMetadata) {
        let name = full_table_name.into();
        info!(
            table = %name,
            partitions = split.len(),
            "Publishing table split metadata"
        );
        self.tables.write().insert(name, Arc::new(split));
    }

    /// Drop the partition map of one table
    pub fn remove_table(&self, full_table_name: &str) -> Option<Arc<TableSplitMetadata>> {
        self.tables.write().remove(full_table_name)
    }

    /// Names of tables with a published partition map, sorted
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Rebuild every table's partition map from a full scan of the
    /// partitions system table. Tables missing from `rows` are dropped.
    ///
    /// Returns the number of tables published.
    pub fn refresh_partitions(&self, rows: &[PartitionRow]) -> usize {
        let mut grouped: HashMap<String, Vec<PartitionMetadata>> = HashMap::new();

        for row in rows {
            let name = row.full_table_name();
            let partition = PartitionMetadata::from_key_bytes(
                &row.start_key,
                &row.end_key,
                self.resolve_replicas(&name, &row.replicas),
            );
            if !partition.is_valid() {
                warn!(
                    table = %name,
                    start_key = %hex_key(&row.start_key),
                    end_key = %hex_key(&row.end_key),
                    "Skipping partition with malformed key range"
                );
                continue;
            }
            grouped.entry(name).or_default().push(partition);
        }

        let tables: HashMap<String, Arc<TableSplitMetadata>> = grouped
            .into_iter()
            .map(|(name, partitions)| {
                let split = TableSplitMetadata::new(partitions);
                debug!(table = %name, partitions = split.len(), "Built table split metadata");
                (name, Arc::new(split))
            })
            .collect();

        let count = tables.len();
        *self.tables.write() = tables;
        info!(tables = count, rows = rows.len(), "Refreshed partition metadata");
        count
    }

    /// Map replica addresses to registered hosts, leader first
    fn resolve_replicas(&self, table: &str, replicas: &[(IpAddr, ReplicaRole)]) -> Vec<Arc<Host>> {
        let mut leader = None;
        let mut others = Vec::with_capacity(replicas.len());

        for (ip, role) in replicas {
            let Some(host) = self.registry.get_by_ip(*ip) else {
                warn!(table = %table, address = %ip, role = %role, "Partition replica is not a known host");
                continue;
            };
            if *role == ReplicaRole::Leader && leader.is_none() {
                leader = Some(host);
            } else {
                others.push(host);
            }
        }

        leader.into_iter().chain(others).collect()
    }
}

fn hex_key(key: &[u8]) -> String {
    if key.is_empty() {
        "<empty>".to_string()
    } else {
        hex::encode(key)
    }
}

impl ClusterView for ClusterMetadata {
    fn table_split_metadata(&self, full_table_name: &str) -> Option<Arc<TableSplitMetadata>> {
        self.tables.read().get(full_table_name).cloned()
    }

    fn default_consistency_level(&self) -> ConsistencyLevel {
        self.default_consistency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last_octet: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last_octet))
    }

    fn cluster_with_hosts(n: u8) -> ClusterMetadata {
        let registry = Arc::new(HostRegistry::new());
        for i in 1..=n {
            registry.add(Host::with_ip(ip(i), "dc1", "rack1"));
        }
        ClusterMetadata::new(registry, ConsistencyLevel::LocalOne)
    }

    fn row(table: &str, start: &[u8], end: &[u8], replicas: Vec<(IpAddr, ReplicaRole)>) -> PartitionRow {
        PartitionRow {
            keyspace: "ks".to_string(),
            table: table.to_string(),
            start_key: start.to_vec(),
            end_key: end.to_vec(),
            replicas,
        }
    }

    #[test]
    fn test_refresh_builds_sorted_splits_leader_first() {
        let cluster = cluster_with_hosts(3);
        let rows = vec![
            row(
                "users",
                &[0x80, 0x00],
                &[],
                vec![(ip(1), ReplicaRole::Follower), (ip(2), ReplicaRole::Leader)],
            ),
            row(
                "users",
                &[],
                &[0x80, 0x00],
                vec![(ip(3), ReplicaRole::Leader), (ip(1), ReplicaRole::Follower)],
            ),
        ];

        assert_eq!(cluster.refresh_partitions(&rows), 1);

        let split = cluster.table_split_metadata("ks.users").unwrap();
        assert_eq!(split.len(), 2);
        let upper = split.lookup(0x9000).unwrap();
        assert_eq!(upper.start_key, 0x8000);
        assert_eq!(upper.leader().unwrap().ip(), ip(2));
        assert_eq!(upper.hosts[1].ip(), ip(1));
        assert_eq!(split.lookup(0).unwrap().leader().unwrap().ip(), ip(3));
    }

    #[test]
    fn test_refresh_skips_unknown_hosts_and_bad_ranges() {
        let cluster = cluster_with_hosts(1);
        let rows = vec![
            row(
                "t",
                &[],
                &[],
                vec![(ip(9), ReplicaRole::Leader), (ip(1), ReplicaRole::Follower)],
            ),
            row("t", &[1, 2, 3], &[], vec![(ip(1), ReplicaRole::Leader)]),
        ];
        cluster.refresh_partitions(&rows);

        let split = cluster.table_split_metadata("ks.t").unwrap();
        assert_eq!(split.len(), 1);
        let hosts = &split.partitions()[0].hosts;
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].ip(), ip(1));
    }

    #[test]
    fn test_refresh_replaces_snapshot() {
        let cluster = cluster_with_hosts(1);
        cluster.refresh_partitions(&[row("a", &[], &[], vec![(ip(1), ReplicaRole::Leader)])]);
        let old = cluster.table_split_metadata("ks.a").unwrap();

        cluster.refresh_partitions(&[row("b", &[], &[], vec![(ip(1), ReplicaRole::Leader)])]);

        // Readers holding the old snapshot keep a consistent view
        assert_eq!(old.len(), 1);
        assert!(cluster.table_split_metadata("ks.a").is_none());
        assert_eq!(cluster.table_names(), vec!["ks.b"]);
    }

    #[test]
    fn test_update_and_remove_table() {
        let cluster = cluster_with_hosts(0);
        cluster.update_table("ks.t", TableSplitMetadata::default());
        assert!(cluster.table_split_metadata("ks.t").is_some());
        assert!(cluster.remove_table("ks.t").is_some());
        assert!(cluster.table_split_metadata("ks.t").is_none());
        assert_eq!(cluster.default_consistency_level(), ConsistencyLevel::LocalOne);
    }

    #[test]
    fn test_parse_replica_role() {
        assert_eq!("leader".parse(), Ok(ReplicaRole::Leader));
        assert_eq!("READ_REPLICA".parse(), Ok(ReplicaRole::ReadReplica));
        assert!("observer".parse::<ReplicaRole>().is_err());
    }
}
