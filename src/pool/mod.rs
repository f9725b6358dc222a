pub mod backend;
pub mod docker_backend;
pub mod error;
pub mod ingest;
pub mod oracle;
pub mod planner;
pub mod provisioner;
pub mod registry;
pub mod reporter;

#[cfg(test)]
pub mod testing;

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::shared::constants::{
    DEFAULT_UNIT_IMAGE, MAX_CONTAINER_SIZE, UNIT_NAME_PREFIX, UNIT_STORAGE_PATH,
};
use crate::shared::PoolConfig;

pub use backend::{UnitBackend, UnitSummary};
pub use error::{PoolError, Result};
pub use reporter::UnitUsage;

use ingest::IngestWriter;
use oracle::CapacityOracle;
use planner::PlacementPlanner;
use provisioner::UnitProvisioner;
use registry::UnitRegistry;
use reporter::UsageReporter;

/// Values shared by every component of a pool.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub prefix: String,
    pub capacity_ceiling: u64,
    pub storage_path: String,
    pub image: String,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            prefix: UNIT_NAME_PREFIX.to_string(),
            capacity_ceiling: MAX_CONTAINER_SIZE,
            storage_path: UNIT_STORAGE_PATH.to_string(),
            image: DEFAULT_UNIT_IMAGE.to_string(),
        }
    }
}

impl PoolSettings {
    pub fn from_config(config: &PoolConfig) -> Self {
        Self {
            image: config.unit.image.clone(),
            ..Self::default()
        }
    }
}

/// Entry point for callers: uploads with placement, and usage reporting.
pub struct StoragePool {
    registry: Arc<UnitRegistry>,
    provisioner: Arc<UnitProvisioner>,
    planner: PlacementPlanner,
    writer: IngestWriter,
    reporter: UsageReporter,
}

impl StoragePool {
    pub fn new(backend: Arc<dyn UnitBackend>, settings: PoolSettings) -> Self {
        let provisioner = Arc::new(UnitProvisioner::new(backend.clone(), settings.clone()));
        let registry = Arc::new(UnitRegistry::new(
            backend.clone(),
            provisioner.clone(),
            settings.prefix.clone(),
        ));
        let oracle = Arc::new(CapacityOracle::new(
            backend.clone(),
            settings.storage_path.clone(),
        ));

        Self {
            planner: PlacementPlanner::new(
                registry.clone(),
                oracle.clone(),
                provisioner.clone(),
                settings.capacity_ceiling,
            ),
            writer: IngestWriter::new(backend, settings.storage_path.clone()),
            reporter: UsageReporter::new(registry.clone(), oracle, settings.capacity_ceiling),
            registry,
            provisioner,
        }
    }

    /// Places `path` on the first unit with room, provisioning one if needed.
    pub async fn upload_file_with_check(&self, path: &Path) -> Result<UnitSummary> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            error!("Failed to stat {}: {}", path.display(), e);
            PoolError::io(path, e)
        })?;

        let unit = self.planner.select_unit_for(metadata.len()).await?;
        self.writer.write_file(&unit.id, path).await?;

        info!("Uploaded {} to unit {}", path.display(), unit.name);
        Ok(unit)
    }

    /// Never fails; an internal error yields an empty list.
    pub async fn get_unit_disk_usage(&self) -> Vec<UnitUsage> {
        self.reporter.report_all().await
    }

    pub async fn list_units(&self) -> Result<Vec<UnitSummary>> {
        self.registry.list_units().await
    }

    pub async fn provision_unit(&self) -> Result<UnitSummary> {
        self.provisioner.provision_unit().await
    }
}
