use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a sandbox engine client.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Output stream error: {0}")]
    Stream(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// The multi-step provisioning sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    CreateVolume,
    CreateSandbox,
    StartSandbox,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            ProvisionStep::CreateVolume => "create volume",
            ProvisionStep::CreateSandbox => "create sandbox",
            ProvisionStep::StartSandbox => "start sandbox",
        };
        f.write_str(step)
    }
}

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("File of {size} bytes is too large for any unit (ceiling is {ceiling} bytes)")]
    FileTooLarge { size: u64, ceiling: u64 },

    #[error("Execution failed ({context}): {source}")]
    Exec {
        context: String,
        #[source]
        source: BackendError,
    },

    #[error("Unknown size format: '{0}'")]
    SizeParse(String),

    // Volumes created before the failing step are left behind; the name is
    // carried so they can be removed by hand.
    #[error("Provisioning unit {unit_id} failed at step '{step}' (volume {volume}): {source}")]
    Provision {
        step: ProvisionStep,
        unit_id: String,
        volume: String,
        #[source]
        source: BackendError,
    },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PoolError {
    pub fn exec(context: impl Into<String>, source: BackendError) -> Self {
        PoolError::Exec {
            context: context.into(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PoolError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;
