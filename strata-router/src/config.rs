//! Router configuration

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strata_types::ConsistencyLevel;
use tracing::{info, warn};

use crate::cluster::ClusterView;
use crate::dc_aware::DcAwareRoundRobinPolicy;
use crate::host_registry::HostRegistry;
use crate::partition_aware::PartitionAwarePolicy;
use crate::policy::LoadBalancingPolicy;
use crate::round_robin::RoundRobinPolicy;

/// Load-balancing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Datacenter treated as local; `None` disables DC awareness
    pub local_datacenter: Option<String>,

    /// Hosts per remote datacenter allowed into plans
    pub used_hosts_per_remote_dc: usize,

    /// Consistency for statements that do not set one
    pub default_consistency: ConsistencyLevel,

    /// Route statements to their partition's replicas
    pub partition_aware: bool,
}

impl RouterConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let local_datacenter = std::env::var("STRATA_LOCAL_DC")
            .ok()
            .map(|dc| dc.trim().to_string())
            .filter(|dc| !dc.is_empty());

        let used_hosts_per_remote_dc = std::env::var("STRATA_REMOTE_DC_HOSTS")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .unwrap_or(0);

        let default_consistency = match std::env::var("STRATA_CONSISTENCY") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default consistency");
                ConsistencyLevel::default()
            }),
            Err(_) => ConsistencyLevel::default(),
        };

        let partition_aware = std::env::var("STRATA_PARTITION_AWARE")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Self {
            local_datacenter,
            used_hosts_per_remote_dc,
            default_consistency,
            partition_aware,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.used_hosts_per_remote_dc > 0 && self.local_datacenter.is_none() {
            anyhow::bail!("Remote datacenter hosts require a local datacenter");
        }

        Ok(())
    }

    /// Build the policy stack described by this configuration
    pub fn build_policy(
        &self,
        registry: Arc<HostRegistry>,
        cluster: Arc<dyn ClusterView>,
    ) -> anyhow::Result<Arc<dyn LoadBalancingPolicy>> {
        self.validate()?;

        let child: Arc<dyn LoadBalancingPolicy> = match &self.local_datacenter {
            Some(dc) => Arc::new(DcAwareRoundRobinPolicy::with_remote_hosts(
                registry,
                dc.clone(),
                self.used_hosts_per_remote_dc,
            )),
            None => Arc::new(RoundRobinPolicy::new(registry)),
        };

        info!(
            local_datacenter = ?self.local_datacenter,
            used_hosts_per_remote_dc = self.used_hosts_per_remote_dc,
            partition_aware = self.partition_aware,
            "Building load balancing policy"
        );

        if self.partition_aware {
            Ok(Arc::new(PartitionAwarePolicy::new(child, cluster)))
        } else {
            Ok(child)
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            local_datacenter: None,
            used_hosts_per_remote_dc: 0,
            default_consistency: ConsistencyLevel::LocalOne,
            partition_aware: true,
        }
    }
}
