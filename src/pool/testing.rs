//! In-memory `UnitBackend` used by the pool's unit tests.

use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use super::backend::{OutputStream, SandboxSpec, UnitBackend, UnitSummary};
use super::error::BackendError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    List,
    CreateVolume,
    CreateSandbox,
    Start,
    Exec,
    ExecStream,
    ExecOn(String),
    PutArchive,
}

#[derive(Debug, Clone)]
pub struct FakeUnit {
    pub id: String,
    pub name: String,
    pub used: u64,
    pub running: bool,
    pub du_output: Option<String>,
    pub files: Vec<(String, Vec<u8>)>,
}

#[derive(Default)]
struct State {
    units: Vec<FakeUnit>,
    volumes: Vec<String>,
    sandbox_specs: Vec<SandboxSpec>,
    failures: Vec<Failure>,
    calls: Vec<String>,
    exec_cmds: Vec<(String, Vec<String>)>,
    archive_paths: Vec<String>,
    next_id: usize,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Adds an already running unit and returns its id.
    pub fn add_unit(&self, name: &str, used: u64) -> String {
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("existing-{}", state.next_id);
        state.units.push(FakeUnit {
            id: id.clone(),
            name: name.to_string(),
            used,
            running: true,
            du_output: None,
            files: Vec::new(),
        });
        id
    }

    pub fn set_used(&self, id: &str, used: u64) {
        if let Some(unit) = self.state().units.iter_mut().find(|u| u.id == id) {
            unit.used = used;
        }
    }

    pub fn set_du_output(&self, id: &str, output: &str) {
        if let Some(unit) = self.state().units.iter_mut().find(|u| u.id == id) {
            unit.du_output = Some(output.to_string());
        }
    }

    pub fn fail(&self, failure: Failure) {
        self.state().failures.push(failure);
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    pub fn units(&self) -> Vec<FakeUnit> {
        self.state().units.clone()
    }

    pub fn unit(&self, id: &str) -> Option<FakeUnit> {
        self.state().units.iter().find(|u| u.id == id).cloned()
    }

    pub fn volumes(&self) -> Vec<String> {
        self.state().volumes.clone()
    }

    pub fn sandbox_specs(&self) -> Vec<SandboxSpec> {
        self.state().sandbox_specs.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn archive_paths(&self) -> Vec<String> {
        self.state().archive_paths.clone()
    }

    pub fn exec_count(&self, id: &str) -> usize {
        self.state()
            .exec_cmds
            .iter()
            .filter(|(unit, _)| unit == id)
            .count()
    }

    pub fn last_exec_cmd(&self) -> Option<Vec<String>> {
        self.state().exec_cmds.last().map(|(_, cmd)| cmd.clone())
    }

    fn check(state: &State, failure: Failure) -> Result<(), BackendError> {
        if state.failures.contains(&failure) {
            return Err(BackendError::Unavailable(format!("injected {failure:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl UnitBackend for FakeBackend {
    async fn list_units(&self, prefix: &str) -> Result<Vec<UnitSummary>, BackendError> {
        let mut state = self.state();
        state.calls.push("list".to_string());
        Self::check(&state, Failure::List)?;

        // Substring match, like Docker's name filter
        Ok(state
            .units
            .iter()
            .filter(|u| u.running && u.name.contains(prefix))
            .map(|u| UnitSummary {
                id: u.id.clone(),
                name: u.name.clone(),
            })
            .collect())
    }

    async fn create_volume(&self, name: &str) -> Result<String, BackendError> {
        let mut state = self.state();
        state.calls.push(format!("create_volume:{name}"));
        Self::check(&state, Failure::CreateVolume)?;
        if state.volumes.iter().any(|v| v == name) {
            return Err(BackendError::Unavailable(format!("volume {name} exists")));
        }
        state.volumes.push(name.to_string());
        Ok(name.to_string())
    }

    async fn create_sandbox(&self, spec: &SandboxSpec) -> Result<String, BackendError> {
        let mut state = self.state();
        state.calls.push(format!("create_sandbox:{}", spec.name));
        Self::check(&state, Failure::CreateSandbox)?;
        state.next_id += 1;
        let id = format!("sandbox-{}", state.next_id);
        state.sandbox_specs.push(spec.clone());
        state.units.push(FakeUnit {
            id: id.clone(),
            name: spec.name.clone(),
            used: 0,
            running: false,
            du_output: None,
            files: Vec::new(),
        });
        Ok(id)
    }

    async fn start(&self, handle: &str) -> Result<(), BackendError> {
        let mut state = self.state();
        state.calls.push(format!("start:{handle}"));
        Self::check(&state, Failure::Start)?;
        let unit = state
            .units
            .iter_mut()
            .find(|u| u.id == handle)
            .ok_or_else(|| BackendError::Unavailable(format!("no sandbox {handle}")))?;
        unit.running = true;
        Ok(())
    }

    async fn exec(&self, handle: &str, cmd: &[String]) -> Result<OutputStream, BackendError> {
        let mut state = self.state();
        state.calls.push(format!("exec:{handle}"));
        state.exec_cmds.push((handle.to_string(), cmd.to_vec()));
        Self::check(&state, Failure::Exec)?;
        Self::check(&state, Failure::ExecOn(handle.to_string()))?;

        let unit = state
            .units
            .iter()
            .find(|u| u.id == handle)
            .ok_or_else(|| BackendError::Unavailable(format!("no sandbox {handle}")))?;
        let output = unit
            .du_output
            .clone()
            .unwrap_or_else(|| format!("{}\t/app/storage\n", unit.used));

        let mut chunks = vec![Ok(Bytes::from(output))];
        if state.failures.contains(&Failure::ExecStream) {
            chunks.push(Err(BackendError::Stream("connection reset".to_string())));
        }
        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn put_archive(
        &self,
        handle: &str,
        archive: Bytes,
        path: &str,
    ) -> Result<(), BackendError> {
        let mut state = self.state();
        state.calls.push(format!("put_archive:{handle}"));
        Self::check(&state, Failure::PutArchive)?;

        let mut files = Vec::new();
        let mut tar = tar::Archive::new(&archive[..]);
        let entries = tar
            .entries()
            .map_err(|e| BackendError::Stream(e.to_string()))?;
        for entry in entries {
            let mut entry = entry.map_err(|e| BackendError::Stream(e.to_string()))?;
            let name = entry
                .path()
                .map_err(|e| BackendError::Stream(e.to_string()))?
                .to_string_lossy()
                .into_owned();
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|e| BackendError::Stream(e.to_string()))?;
            files.push((name, data));
        }

        state.archive_paths.push(path.to_string());
        let unit = state
            .units
            .iter_mut()
            .find(|u| u.id == handle)
            .ok_or_else(|| BackendError::Unavailable(format!("no sandbox {handle}")))?;
        for (name, data) in files {
            unit.used += data.len() as u64;
            unit.files.push((name, data));
        }
        Ok(())
    }
}
