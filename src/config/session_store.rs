use crate::domain::model::SessionState;
use crate::domain::ports::SessionStore;
use crate::utils::error::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Session kept only for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    state: RwLock<SessionState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SessionState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn snapshot(&self) -> SessionState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn update(&self, apply: &mut dyn FnMut(&mut SessionState)) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        apply(&mut state);
        Ok(())
    }
}

/// Session persisted as a JSON file, rewritten on every update.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    state: RwLock<SessionState>,
}

impl FileSessionStore {
    /// Opens the session file, starting empty when it does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let data = fs::read(&path)?;
            if data.is_empty() {
                SessionState::default()
            } else {
                serde_json::from_slice(&data)?
            }
        } else {
            SessionState::default()
        };

        tracing::debug!("Opened session file {}", path.display());
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, state: &SessionState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_vec_pretty(state)?;
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // Files created before the mode was set keep their old permissions.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(&data)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn snapshot(&self) -> SessionState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn update(&self, apply: &mut dyn FnMut(&mut SessionState)) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let mut next = state.clone();
        apply(&mut next);
        self.persist(&next)?;
        *state = next;
        Ok(())
    }
}
