use crate::{error::BeamlineError, session::ModelSet};
use std::path::PathBuf;

/// Persistence boundary for a committed editor state. The editor core owns
/// no wire format; whatever shape a store writes is its own business.
pub trait Store {
    fn load(&self) -> Result<ModelSet, BeamlineError>;
    fn save(&mut self, state: &ModelSet) -> Result<(), BeamlineError>;
}

/// Pretty-printed JSON state file. A missing file loads as the empty state.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> Result<ModelSet, BeamlineError> {
        if !self.path.exists() {
            return Ok(ModelSet::default());
        }
        let text = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&mut self, state: &ModelSet) -> Result<(), BeamlineError> {
        let text = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

/// In-memory store, also the failure-injection double for commit tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: ModelSet,
    pub fail_next_save: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ModelSet {
        &self.state
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<ModelSet, BeamlineError> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &ModelSet) -> Result<(), BeamlineError> {
        if self.fail_next_save {
            self.fail_next_save = false;
            return Err(BeamlineError::String("injected save failure".to_string()));
        }
        self.state = state.clone();
        Ok(())
    }
}
