//! Cluster host identity and liveness
//!
//! A `Host` is owned by the cluster-metadata layer. Routing code only reads
//! its address, placement (datacenter/rack) and up/down flag. The flag is an
//! atomic so liveness can be flipped by the topology tracker while query
//! plans are being produced on other threads.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};

/// Default native protocol port
pub const DEFAULT_PORT: u16 = 9042;

/// A node of the cluster as seen by the client
pub struct Host {
    address: SocketAddr,
    datacenter: String,
    rack: String,
    up: AtomicBool,
}

impl Host {
    /// Create a host that is initially up
    pub fn new(address: SocketAddr, datacenter: impl Into<String>, rack: impl Into<String>) -> Self {
        Self {
            address,
            datacenter: datacenter.into(),
            rack: rack.into(),
            up: AtomicBool::new(true),
        }
    }

    /// Create a host on the default port
    pub fn with_ip(ip: IpAddr, datacenter: impl Into<String>, rack: impl Into<String>) -> Self {
        Self::new(SocketAddr::new(ip, DEFAULT_PORT), datacenter, rack)
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn ip(&self) -> IpAddr {
        self.address.ip()
    }

    pub fn datacenter(&self) -> &str {
        &self.datacenter
    }

    pub fn rack(&self) -> &str {
        &self.rack
    }

    /// Current liveness as last reported by the topology tracker
    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    /// Mark the host as up. Returns the previous state.
    pub fn set_up(&self) -> bool {
        self.up.swap(true, Ordering::AcqRel)
    }

    /// Mark the host as down. Returns the previous state.
    pub fn set_down(&self) -> bool {
        self.up.swap(false, Ordering::AcqRel)
    }
}

impl PartialEq for Host {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Host {}

impl Hash for Host {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("address", &self.address)
            .field("datacenter", &self.datacenter)
            .field("rack", &self.rack)
            .field("up", &self.is_up())
            .finish()
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}
