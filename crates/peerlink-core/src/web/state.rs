//! Shared state of the HTTP gateway.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, DownloadConfig};
use crate::error::Result;
use crate::registry::ShareRegistry;
use crate::transfer::SessionManager;

/// Everything a request handler needs.
#[derive(Debug)]
pub struct AppState {
    /// File servers of every share
    pub sessions: SessionManager,
    /// How the relay reaches a share
    pub download: DownloadConfig,
    /// Where uploads and relayed bytes are kept
    pub scratch_dir: PathBuf,
}

/// Shared state handle.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Build the gateway state from configuration.
    ///
    /// The scratch directory is created if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the code range is invalid or the scratch
    /// directory cannot be created.
    pub fn new(config: &Config) -> Result<Self> {
        let scratch_dir = config.storage.scratch_dir();
        std::fs::create_dir_all(&scratch_dir)?;

        let registry = Arc::new(ShareRegistry::new(config.share.code_generator()?));
        Ok(Self {
            sessions: SessionManager::new(registry, config.share.clone()),
            download: config.download.clone(),
            scratch_dir,
        })
    }

    /// Wrap into a [`SharedState`].
    #[must_use]
    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_scratch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("nested").join("uploads");

        let mut config = Config::default();
        config.storage.scratch_dir = Some(scratch.clone());

        let state = AppState::new(&config).unwrap();
        assert_eq!(state.scratch_dir, scratch);
        assert!(scratch.is_dir());
    }

    #[test]
    fn test_new_rejects_bad_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.scratch_dir = Some(dir.path().to_path_buf());
        config.share.code_range = (60_000, 50_000);

        assert!(AppState::new(&config).is_err());
    }
}
