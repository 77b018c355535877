//! Partition metadata and the per-table range index

use std::fmt;
use std::sync::Arc;

use strata_types::Host;

use crate::partition_key::PARTITION_KEY_SPACE;

/// One partition of a table: a half-open key range and its replicas
#[derive(Clone)]
pub struct PartitionMetadata {
    /// Inclusive
    pub start_key: i32,
    /// Exclusive
    pub end_key: i32,
    /// Leader first when known, then followers in no particular order
    pub hosts: Vec<Arc<Host>>,
}

impl PartitionMetadata {
    pub fn new(start_key: i32, end_key: i32, hosts: Vec<Arc<Host>>) -> Self {
        Self {
            start_key,
            end_key,
            hosts,
        }
    }

    /// Build from the 2-byte big-endian boundaries the server reports.
    ///
    /// An empty start key is the beginning of the key space and an empty end
    /// key is its end. Any other length yields an invalid entry.
    pub fn from_key_bytes(start_key: &[u8], end_key: &[u8], hosts: Vec<Arc<Host>>) -> Self {
        let start = match start_key {
            [] => 0,
            [hi, lo] => i32::from(u16::from_be_bytes([*hi, *lo])),
            _ => -1,
        };
        let end = match end_key {
            [] => PARTITION_KEY_SPACE,
            [hi, lo] => i32::from(u16::from_be_bytes([*hi, *lo])),
            _ => -1,
        };
        Self::new(start, end, hosts)
    }

    /// Whether this entry describes an actual range
    pub fn is_valid(&self) -> bool {
        self.start_key >= 0 && self.start_key <= self.end_key
    }

    pub fn contains(&self, key: i32) -> bool {
        self.start_key <= key && key < self.end_key
    }

    /// Current leader, if known
    pub fn leader(&self) -> Option<&Arc<Host>> {
        self.hosts.first()
    }
}

impl fmt::Debug for PartitionMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hosts: Vec<String> = self.hosts.iter().map(|h| h.to_string()).collect();
        f.debug_struct("PartitionMetadata")
            .field("start_key", &self.start_key)
            .field("end_key", &self.end_key)
            .field("hosts", &hosts)
            .finish()
    }
}

/// Immutable index from partition key to owning partition.
///
/// Built once per metadata refresh and published behind an `Arc`; a topology
/// change produces a new index rather than mutating this one.
#[derive(Debug, Clone, Default)]
pub struct TableSplitMetadata {
    partitions: Vec<PartitionMetadata>,
    start_keys: Vec<i32>,
}

impl TableSplitMetadata {
    /// Sort `partitions` by start key and index them
    pub fn new(partitions: impl IntoIterator<Item = PartitionMetadata>) -> Self {
        let mut partitions: Vec<PartitionMetadata> = partitions.into_iter().collect();
        partitions.sort_by_key(|p| p.start_key);
        let start_keys = partitions.iter().map(|p| p.start_key).collect();
        Self {
            partitions,
            start_keys,
        }
    }

    /// Partition owning `key`: an exact start-key match, otherwise the one
    /// with the greatest start key below `key`. `None` when `key` precedes
    /// every partition.
    ///
    /// Only start keys are consulted, so gaps between ranges resolve to the
    /// preceding partition.
    pub fn lookup(&self, key: i32) -> Option<&PartitionMetadata> {
        match self.start_keys.binary_search(&key) {
            Ok(index) => self.partitions.get(index),
            Err(0) => None,
            Err(insert_at) => self.partitions.get(insert_at - 1),
        }
    }

    /// Replica hosts for `key`, leader first
    pub fn hosts_for_key(&self, key: i32) -> Option<&[Arc<Host>]> {
        self.lookup(key).map(|p| p.hosts.as_slice())
    }

    /// Partitions in start-key order
    pub fn partitions(&self) -> &[PartitionMetadata] {
        &self.partitions
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartitionMetadata> {
        self.partitions.iter()
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

impl FromIterator<PartitionMetadata> for TableSplitMetadata {
    fn from_iter<I: IntoIterator<Item = PartitionMetadata>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn host(last_octet: u8) -> Arc<Host> {
        Arc::new(Host::with_ip(
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, last_octet)),
            "dc1",
            "rack1",
        ))
    }

    fn split(ranges: &[(i32, i32)]) -> TableSplitMetadata {
        ranges
            .iter()
            .enumerate()
            .map(|(i, &(start, end))| PartitionMetadata::new(start, end, vec![host(i as u8 + 1)]))
            .collect()
    }

    #[test]
    fn test_build_sorts_unordered_input() {
        let index = split(&[(200, 300), (0, 100), (100, 200)]);
        let starts: Vec<i32> = index.iter().map(|p| p.start_key).collect();
        assert_eq!(starts, vec![0, 100, 200]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_lookup_exact_and_interior() {
        let index = split(&[(0, 100), (100, PARTITION_KEY_SPACE)]);

        assert_eq!(index.lookup(0).unwrap().start_key, 0);
        assert_eq!(index.lookup(50).unwrap().start_key, 0);
        assert_eq!(index.lookup(99).unwrap().start_key, 0);
        assert_eq!(index.lookup(100).unwrap().start_key, 100);
        assert_eq!(index.lookup(65535).unwrap().start_key, 100);
    }

    #[test]
    fn test_lookup_below_first_start() {
        let index = split(&[(10, 100), (100, 200)]);
        assert!(index.lookup(9).is_none());
        assert!(index.lookup(-1).is_none());
    }

    #[test]
    fn test_lookup_in_gap_uses_preceding_partition() {
        let index = split(&[(0, 10), (50, 60)]);
        let found = index.lookup(30).unwrap();
        assert_eq!(found.start_key, 0);
        assert!(!found.contains(30));
    }

    #[test]
    fn test_empty_index() {
        let index = TableSplitMetadata::default();
        assert!(index.is_empty());
        assert!(index.lookup(0).is_none());
    }

    #[test]
    fn test_hosts_for_key_leader_first() {
        let leader = host(1);
        let follower = host(2);
        let index = TableSplitMetadata::new(vec![PartitionMetadata::new(
            0,
            PARTITION_KEY_SPACE,
            vec![leader.clone(), follower.clone()],
        )]);
        let hosts = index.hosts_for_key(1234).unwrap();
        assert_eq!(hosts, &[leader, follower]);
    }

    #[test]
    fn test_from_key_bytes() {
        let first = PartitionMetadata::from_key_bytes(&[], &[0x80, 0x00], vec![]);
        assert_eq!((first.start_key, first.end_key), (0, 0x8000));
        assert!(first.is_valid());

        let last = PartitionMetadata::from_key_bytes(&[0x80, 0x00], &[], vec![]);
        assert_eq!((last.start_key, last.end_key), (0x8000, PARTITION_KEY_SPACE));

        let broken = PartitionMetadata::from_key_bytes(&[1, 2, 3], &[], vec![]);
        assert!(!broken.is_valid());
    }

    proptest! {
        #[test]
        fn prop_lookup_is_last_start_at_or_below(
            starts in proptest::collection::btree_set(0i32..65536, 1..40),
            key in 0i32..65536,
        ) {
            let starts: Vec<i32> = starts.into_iter().collect();
            let mut ranges: Vec<(i32, i32)> = starts
                .windows(2)
                .map(|w| (w[0], w[1]))
                .collect();
            ranges.push((*starts.last().unwrap(), PARTITION_KEY_SPACE));
            // Reversed input exercises the sort
            ranges.reverse();
            let index = split(&ranges);

            let expected = starts.iter().copied().filter(|s| *s <= key).max();
            prop_assert_eq!(index.lookup(key).map(|p| p.start_key), expected);
            if let Some(found) = index.lookup(key) {
                prop_assert!(found.contains(key));
            }
        }
    }
}
