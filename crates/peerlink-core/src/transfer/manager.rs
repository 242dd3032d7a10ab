//! Supervision of per-code file servers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::{EphemeralServer, TransferState};
use crate::code::ShareCode;
use crate::config::ShareConfig;
use crate::error::{Error, Result};
use crate::registry::ShareRegistry;

struct Session {
    state: watch::Receiver<TransferState>,
    task: JoinHandle<()>,
}

/// Owns the file server task of every share.
///
/// A code can be started once. After its server has served its client,
/// failed, or expired, the code stays retired; sharing the same bytes again
/// needs a fresh [`ShareRegistry::offer`].
pub struct SessionManager {
    registry: Arc<ShareRegistry>,
    config: ShareConfig,
    sessions: Mutex<HashMap<ShareCode, Session>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager serving entries of `registry`.
    #[must_use]
    pub fn new(registry: Arc<ShareRegistry>, config: ShareConfig) -> Self {
        Self {
            registry,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The registry shares are looked up in.
    #[must_use]
    pub fn registry(&self) -> &Arc<ShareRegistry> {
        &self.registry
    }

    /// Register a stored file and start serving it under a new code.
    ///
    /// # Errors
    ///
    /// Returns an error if no code is free or the listener cannot be bound.
    pub async fn share(&self, path: impl AsRef<Path>, file_name: &str) -> Result<ShareCode> {
        let code = self.registry.offer(path, file_name).await?;
        self.start(code).await?;
        Ok(code)
    }

    /// Bind the listener for a registered code and serve it in the
    /// background.
    ///
    /// The listener is bound before this returns, so the code is reachable
    /// as soon as the caller hands it out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CodeNotFound`] for an unregistered code,
    /// [`Error::ShareAlreadyStarted`] if the code was started before, or the
    /// bind error.
    pub async fn start(&self, code: ShareCode) -> Result<watch::Receiver<TransferState>> {
        let Some(entry) = self.registry.get(code).await else {
            tracing::warn!(
                %code,
                error_code = "P002",
                "refusing to serve a share code with no registered file"
            );
            return Err(Error::CodeNotFound(code));
        };

        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&code) {
            return Err(Error::ShareAlreadyStarted(code));
        }

        let server = EphemeralServer::bind(entry, &self.config).await?;
        let state = server.subscribe();
        let task = tokio::spawn(async move {
            // serve() logs its own outcome
            let _ = server.serve().await;
        });

        sessions.insert(
            code,
            Session {
                state: state.clone(),
                task,
            },
        );
        Ok(state)
    }

    /// Current state of a code's server, if it was ever started.
    pub async fn state(&self, code: ShareCode) -> Option<TransferState> {
        self.sessions
            .lock()
            .await
            .get(&code)
            .map(|session| *session.state.borrow())
    }

    /// Number of servers still waiting for or serving their client.
    pub async fn active(&self) -> usize {
        self.sessions
            .lock()
            .await
            .values()
            .filter(|session| !session.task.is_finished() && !session.state.borrow().is_terminal())
            .count()
    }

    /// Abort every outstanding server, dropping its listener.
    pub async fn shutdown(&self) {
        let sessions = self.sessions.lock().await;
        let mut aborted = 0usize;
        for session in sessions.values() {
            if !session.task.is_finished() {
                session.task.abort();
                aborted += 1;
            }
        }
        tracing::info!("Stopped {} pending share(s)", aborted);
    }
}
