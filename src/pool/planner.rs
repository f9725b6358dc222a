use std::sync::Arc;

use tracing::{info, warn};

use super::backend::UnitSummary;
use super::error::{PoolError, Result};
use super::oracle::CapacityOracle;
use super::provisioner::UnitProvisioner;
use super::registry::UnitRegistry;

/// First-fit placement over live-measured units.
///
/// Measurement and the later write are not atomic: two concurrent
/// placements can both see the same headroom and jointly overfill a unit.
pub struct PlacementPlanner {
    registry: Arc<UnitRegistry>,
    oracle: Arc<CapacityOracle>,
    provisioner: Arc<UnitProvisioner>,
    capacity_ceiling: u64,
}

impl PlacementPlanner {
    pub fn new(
        registry: Arc<UnitRegistry>,
        oracle: Arc<CapacityOracle>,
        provisioner: Arc<UnitProvisioner>,
        capacity_ceiling: u64,
    ) -> Self {
        Self {
            registry,
            oracle,
            provisioner,
            capacity_ceiling,
        }
    }

    pub async fn select_unit_for(&self, file_size: u64) -> Result<UnitSummary> {
        if file_size > self.capacity_ceiling {
            warn!(
                "Rejecting file of {} bytes, ceiling is {} bytes",
                file_size, self.capacity_ceiling
            );
            return Err(PoolError::FileTooLarge {
                size: file_size,
                ceiling: self.capacity_ceiling,
            });
        }

        for unit in self.registry.list_units().await? {
            let used = self.oracle.measure_used_bytes(&unit.id).await?;
            if used.saturating_add(file_size) <= self.capacity_ceiling {
                info!(
                    "Placing {} bytes on unit {} ({} bytes used)",
                    file_size, unit.name, used
                );
                return Ok(unit);
            }
        }

        warn!("Not enough space in existing units, provisioning a new one");
        // A fresh unit is empty; it is used without measuring it.
        self.provisioner.provision_unit().await
    }
}
