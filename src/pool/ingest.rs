use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info};

use super::backend::UnitBackend;
use super::error::{PoolError, Result};

/// Copies local files into a unit's storage mount as single-entry tar archives.
pub struct IngestWriter {
    backend: Arc<dyn UnitBackend>,
    storage_path: String,
}

impl IngestWriter {
    pub fn new(backend: Arc<dyn UnitBackend>, storage_path: impl Into<String>) -> Self {
        Self {
            backend,
            storage_path: storage_path.into(),
        }
    }

    /// A failed upload may leave a partially extracted file behind.
    pub async fn write_file(&self, unit_id: &str, local_path: &Path) -> Result<()> {
        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                PoolError::io(
                    local_path,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
                )
            })?;

        let data = tokio::fs::read(local_path).await.map_err(|e| {
            error!("Failed to read {}: {}", local_path.display(), e);
            PoolError::io(local_path, e)
        })?;

        let archive = pack_single_file(&file_name, &data).map_err(|e| {
            error!("Failed to archive {}: {}", file_name, e);
            PoolError::io(local_path, e)
        })?;

        self.backend
            .put_archive(unit_id, archive, &self.storage_path)
            .await
            .map_err(|e| {
                error!("Failed to store {} in unit {}: {}", file_name, unit_id, e);
                PoolError::exec(format!("storing {file_name} in unit {unit_id}"), e)
            })?;

        info!("File {} stored in unit {}", file_name, unit_id);
        Ok(())
    }
}

fn pack_single_file(name: &str, data: &[u8]) -> std::io::Result<Bytes> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(chrono::Utc::now().timestamp().max(0) as u64);
    header.set_cksum();

    let mut builder = tar::Builder::new(Vec::new());
    builder.append_data(&mut header, name, data)?;
    Ok(Bytes::from(builder.into_inner()?))
}
