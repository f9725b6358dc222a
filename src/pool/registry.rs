use std::sync::Arc;

use tracing::{error, info};

use super::backend::{UnitBackend, UnitSummary};
use super::error::{PoolError, Result};
use super::provisioner::UnitProvisioner;

/// Lists the units owned by this pool, bootstrapping the first one on demand.
pub struct UnitRegistry {
    backend: Arc<dyn UnitBackend>,
    provisioner: Arc<UnitProvisioner>,
    prefix: String,
}

impl UnitRegistry {
    pub fn new(
        backend: Arc<dyn UnitBackend>,
        provisioner: Arc<UnitProvisioner>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            provisioner,
            prefix: prefix.into(),
        }
    }

    /// Units in backend enumeration order; never empty on success.
    pub async fn list_units(&self) -> Result<Vec<UnitSummary>> {
        let listed = self.backend.list_units(&self.prefix).await.map_err(|e| {
            error!("Failed to list units: {}", e);
            PoolError::exec("listing units", e)
        })?;

        let units: Vec<UnitSummary> = listed
            .into_iter()
            .filter(|unit| unit.name.starts_with(&self.prefix))
            .collect();

        if units.is_empty() {
            info!("No units with prefix '{}' found, provisioning the first one", self.prefix);
            let unit = self.provisioner.provision_unit().await?;
            return Ok(vec![unit]);
        }

        Ok(units)
    }
}
