//! Host registry for tracking known cluster nodes

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use strata_types::Host;
use tracing::{debug, info, warn};

/// Liveness and placement snapshot of the cluster.
///
/// Owned by the topology tracker, which registers hosts and flips their
/// state. Policies only read from it.
pub struct HostRegistry {
    /// Map of address to host
    hosts: RwLock<HashMap<SocketAddr, Arc<Host>>>,
}

impl HostRegistry {
    /// Create an empty host registry
    pub fn new() -> Self {
        Self {
            hosts: RwLock::new(HashMap::new()),
        }
    }

    /// Register a host, returning the shared handle.
    ///
    /// Re-registering an address returns the existing handle.
    pub fn add(&self, host: Host) -> Arc<Host> {
        let mut hosts = self.hosts.write();
        if let Some(existing) = hosts.get(&host.address()) {
            debug!(address = %host.address(), "Host already registered");
            return existing.clone();
        }

        info!(
            address = %host.address(),
            datacenter = %host.datacenter(),
            rack = %host.rack(),
            "Registering host"
        );

        let host = Arc::new(host);
        hosts.insert(host.address(), host.clone());
        host
    }

    /// Unregister a host
    pub fn remove(&self, address: &SocketAddr) -> Option<Arc<Host>> {
        info!(address = %address, "Unregistering host");
        self.hosts.write().remove(address)
    }

    /// Get host by address
    pub fn get(&self, address: &SocketAddr) -> Option<Arc<Host>> {
        self.hosts.read().get(address).cloned()
    }

    /// Get host by IP, whatever its port
    pub fn get_by_ip(&self, ip: IpAddr) -> Option<Arc<Host>> {
        self.hosts
            .read()
            .values()
            .filter(|h| h.ip() == ip)
            .min_by_key(|h| h.address())
            .cloned()
    }

    /// All hosts in address order
    pub fn all(&self) -> Vec<Arc<Host>> {
        let mut hosts: Vec<Arc<Host>> = self.hosts.read().values().cloned().collect();
        hosts.sort_by_key(|h| h.address());
        hosts
    }

    /// Up hosts in address order
    pub fn up_hosts(&self) -> Vec<Arc<Host>> {
        let mut hosts: Vec<Arc<Host>> = self
            .hosts
            .read()
            .values()
            .filter(|h| h.is_up())
            .cloned()
            .collect();
        hosts.sort_by_key(|h| h.address());
        hosts
    }

    /// Hosts of one datacenter in address order
    pub fn in_datacenter(&self, datacenter: &str) -> Vec<Arc<Host>> {
        let mut hosts: Vec<Arc<Host>> = self
            .hosts
            .read()
            .values()
            .filter(|h| h.datacenter() == datacenter)
            .cloned()
            .collect();
        hosts.sort_by_key(|h| h.address());
        hosts
    }

    /// Known datacenter names, sorted
    pub fn datacenters(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .hosts
            .read()
            .values()
            .map(|h| h.datacenter().to_string())
            .collect();
        names.into_iter().collect()
    }

    /// Mark host as up
    pub fn mark_up(&self, address: &SocketAddr) {
        match self.get(address) {
            Some(host) => {
                if !host.set_up() {
                    info!(address = %address, "Host is up");
                }
            }
            None => warn!(address = %address, "Cannot mark unknown host up"),
        }
    }

    /// Mark host as down
    pub fn mark_down(&self, address: &SocketAddr) {
        match self.get(address) {
            Some(host) => {
                if host.set_down() {
                    warn!(address = %address, "Host is down");
                }
            }
            None => warn!(address = %address, "Cannot mark unknown host down"),
        }
    }

    /// Get total host count
    pub fn count(&self) -> usize {
        self.hosts.read().len()
    }

    /// Get up host count
    pub fn up_count(&self) -> usize {
        self.hosts.read().values().filter(|h| h.is_up()).count()
    }
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new()
    }
}
