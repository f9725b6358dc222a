use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use super::backend::{MountKind, MountSpec, SandboxSpec, UnitBackend, UnitSummary};
use super::error::{BackendError, PoolError, ProvisionStep, Result};
use super::PoolSettings;
use crate::shared::constants::{KEEPALIVE_CMD, VOLUME_SUFFIX};

/// Creates storage units: volume, then sandbox, then start.
///
/// No step is retried and nothing is rolled back. A failure after the volume
/// exists leaves that volume orphaned; the returned error names it. Concurrent
/// callers are not serialised, so two of them may each create a unit.
pub struct UnitProvisioner {
    backend: Arc<dyn UnitBackend>,
    settings: PoolSettings,
}

impl UnitProvisioner {
    pub fn new(backend: Arc<dyn UnitBackend>, settings: PoolSettings) -> Self {
        Self { backend, settings }
    }

    pub async fn provision_unit(&self) -> Result<UnitSummary> {
        let unit_id = Uuid::new_v4().to_string();
        let volume_name = format!("{unit_id}{VOLUME_SUFFIX}");
        let unit_name = format!("{}{}", self.settings.prefix, unit_id);

        let fail = |step: ProvisionStep, source: BackendError| {
            error!(
                "Provisioning unit {} failed at '{}' (volume {}): {}",
                unit_id, step, volume_name, source
            );
            PoolError::Provision {
                step,
                unit_id: unit_id.clone(),
                volume: volume_name.clone(),
                source,
            }
        };

        let volume_ref = self
            .backend
            .create_volume(&volume_name)
            .await
            .map_err(|e| fail(ProvisionStep::CreateVolume, e))?;

        let spec = SandboxSpec {
            name: unit_name.clone(),
            image: self.settings.image.clone(),
            mounts: vec![MountSpec {
                target: self.settings.storage_path.clone(),
                source: volume_ref,
                kind: MountKind::Volume,
            }],
            cmd: KEEPALIVE_CMD.iter().map(|s| s.to_string()).collect(),
        };

        let handle = self
            .backend
            .create_sandbox(&spec)
            .await
            .map_err(|e| fail(ProvisionStep::CreateSandbox, e))?;

        self.backend
            .start(&handle)
            .await
            .map_err(|e| fail(ProvisionStep::StartSandbox, e))?;

        info!(
            "Unit {} created and running with volume {}",
            unit_name, volume_name
        );

        Ok(UnitSummary {
            id: handle,
            name: unit_name,
        })
    }
}
