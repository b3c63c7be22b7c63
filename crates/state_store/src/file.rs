//! FileStateStore - calibration blob on disk

use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use contracts::{ContractError, EngineState, StateStore};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

/// Stores the blob as the whole content of a single file
///
/// Saves go to a temporary file in the same directory which is synced and
/// then renamed over the target, after which the directory is synced too.
/// A crash leaves either the old or the new image, never a torn one.
/// Loads refuse files longer than [`EngineState::MAX_LEN`].
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, message: impl Into<String>) -> ContractError {
        ContractError::persistence(self.path.display().to_string(), message)
    }

    /// Directory the temporary file must live in for the rename to be atomic
    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl StateStore for FileStateStore {
    /// Missing or empty file means no prior state
    #[instrument(name = "state_load", skip(self), fields(path = %self.path.display()))]
    fn load(&mut self) -> Result<EngineState, ContractError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no calibration state on disk");
                return Ok(EngineState::empty());
            }
            Err(e) => return Err(self.error(e.to_string())),
        };

        // one byte past the limit tells an oversized file from a full one
        let mut bytes = Vec::with_capacity(EngineState::MAX_LEN);
        file.take(EngineState::MAX_LEN as u64 + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| self.error(e.to_string()))?;
        if bytes.len() > EngineState::MAX_LEN {
            return Err(self.error(format!(
                "file exceeds {} bytes",
                EngineState::MAX_LEN
            )));
        }

        info!(bytes = bytes.len(), "loaded calibration state");
        Ok(EngineState::from(bytes))
    }

    #[instrument(name = "state_save", skip(self, state), fields(path = %self.path.display(), bytes = state.len()))]
    fn save(&mut self, state: &EngineState) -> Result<(), ContractError> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir).map_err(|e| self.error(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.error(e.to_string()))?;
        tmp.write_all(state.as_bytes())
            .map_err(|e| self.error(e.to_string()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| self.error(e.to_string()))?;
        tmp.persist(&self.path)
            .map_err(|e| self.error(e.error.to_string()))?;
        sync_dir(dir).map_err(|e| self.error(format!("sync {}: {e}", dir.display())))?;

        info!("saved calibration state");
        Ok(())
    }
}

/// Make the rename itself durable
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
