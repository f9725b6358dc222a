use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use super::error::BackendError;

/// Output of a command run inside a unit: stdout chunks in arrival order.
pub type OutputStream = BoxStream<'static, Result<Bytes, BackendError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    Volume,
    Bind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub target: String,
    pub source: String,
    pub kind: MountKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxSpec {
    pub name: String,
    pub image: String,
    pub mounts: Vec<MountSpec>,
    pub cmd: Vec<String>,
}

/// Narrow view of a sandbox engine: everything the pool needs and nothing else.
#[async_trait]
pub trait UnitBackend: Send + Sync {
    /// Running units whose name starts with `prefix`, in engine order.
    async fn list_units(&self, prefix: &str) -> Result<Vec<UnitSummary>, BackendError>;

    /// Creates a persistent volume and returns its reference.
    async fn create_volume(&self, name: &str) -> Result<String, BackendError>;

    /// Creates (but does not start) a sandbox; returns its runtime handle.
    async fn create_sandbox(&self, spec: &SandboxSpec) -> Result<String, BackendError>;

    async fn start(&self, handle: &str) -> Result<(), BackendError>;

    /// Runs `cmd` in the sandbox with only stdout attached.
    async fn exec(&self, handle: &str, cmd: &[String]) -> Result<OutputStream, BackendError>;

    /// Extracts a tar archive into `path` inside the sandbox.
    async fn put_archive(&self, handle: &str, archive: Bytes, path: &str)
        -> Result<(), BackendError>;
}
