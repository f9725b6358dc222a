use std::collections::HashMap;

use async_trait::async_trait;
use bollard::{
    container::{
        Config, CreateContainerOptions, ListContainersOptions, LogOutput,
        UploadToContainerOptions,
    },
    exec::{CreateExecOptions, StartExecResults},
    models::{HostConfig, Mount, MountTypeEnum},
    volume::CreateVolumeOptions,
    Docker,
};
use bytes::Bytes;
use futures::StreamExt;
use tracing::info;

use super::backend::{MountKind, MountSpec, OutputStream, SandboxSpec, UnitBackend, UnitSummary};
use super::error::BackendError;

/// `UnitBackend` over the local Docker engine.
pub struct DockerBackend {
    docker: Docker,
}

impl DockerBackend {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Connects through `DOCKER_HOST` or the platform's default socket.
    pub fn connect() -> Result<Self, BackendError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self::new(docker))
    }
}

fn to_docker_mount(spec: &MountSpec) -> Mount {
    let typ = match spec.kind {
        MountKind::Volume => MountTypeEnum::VOLUME,
        MountKind::Bind => MountTypeEnum::BIND,
    };
    Mount {
        typ: Some(typ),
        source: Some(spec.source.clone()),
        target: Some(spec.target.clone()),
        ..Default::default()
    }
}

#[async_trait]
impl UnitBackend for DockerBackend {
    async fn list_units(&self, prefix: &str) -> Result<Vec<UnitSummary>, BackendError> {
        // Docker's name filter is a substring match; callers still check the prefix
        let mut filters = HashMap::new();
        filters.insert("name".to_string(), vec![prefix.to_string()]);

        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: false,
                filters,
                ..Default::default()
            }))
            .await?;

        let units = containers
            .into_iter()
            .filter_map(|container| {
                let id = container.id?;
                let name = container
                    .names
                    .and_then(|names| names.into_iter().next())
                    .map(|name| name.trim_start_matches('/').to_string())?;
                Some(UnitSummary { id, name })
            })
            .collect();

        Ok(units)
    }

    async fn create_volume(&self, name: &str) -> Result<String, BackendError> {
        let mut labels = HashMap::new();
        labels.insert("drivepool.managed".to_string(), "true".to_string());
        labels.insert(
            "drivepool.created_at".to_string(),
            chrono::Utc::now().to_rfc3339(),
        );

        let volume = self
            .docker
            .create_volume(CreateVolumeOptions {
                name: name.to_string(),
                driver: "local".to_string(),
                driver_opts: HashMap::new(),
                labels,
            })
            .await?;

        info!("Created volume {}", volume.name);
        Ok(volume.name)
    }

    async fn create_sandbox(&self, spec: &SandboxSpec) -> Result<String, BackendError> {
        let mut labels = HashMap::new();
        labels.insert("drivepool.managed".to_string(), "true".to_string());

        let config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.cmd.clone()),
            labels: Some(labels),
            host_config: Some(HostConfig {
                mounts: Some(spec.mounts.iter().map(to_docker_mount).collect()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            ..Default::default()
        };

        let container = self.docker.create_container(Some(options), config).await?;
        info!("Created container {} ({})", spec.name, container.id);
        Ok(container.id)
    }

    async fn start(&self, handle: &str) -> Result<(), BackendError> {
        self.docker.start_container::<String>(handle, None).await?;
        Ok(())
    }

    async fn exec(&self, handle: &str, cmd: &[String]) -> Result<OutputStream, BackendError> {
        let exec_config = CreateExecOptions {
            cmd: Some(cmd.to_vec()),
            attach_stdout: Some(true),
            attach_stderr: Some(false),
            ..Default::default()
        };

        let exec = self.docker.create_exec(handle, exec_config).await?;

        match self.docker.start_exec(&exec.id, None).await? {
            StartExecResults::Attached { output, .. } => {
                let stdout = output.filter_map(|frame| async move {
                    match frame {
                        Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                            Some(Ok(message))
                        }
                        Ok(_) => None,
                        Err(e) => Some(Err(BackendError::Stream(e.to_string()))),
                    }
                });
                Ok(stdout.boxed())
            }
            StartExecResults::Detached => Err(BackendError::Stream(format!(
                "exec {} in {} started detached; no output to read",
                exec.id, handle
            ))),
        }
    }

    async fn put_archive(
        &self,
        handle: &str,
        archive: Bytes,
        path: &str,
    ) -> Result<(), BackendError> {
        let options = UploadToContainerOptions {
            path: path.to_string(),
            no_overwrite_dir_non_dir: "false".to_string(),
        };

        self.docker
            .upload_to_container(handle, Some(options), archive)
            .await?;
        Ok(())
    }
}
