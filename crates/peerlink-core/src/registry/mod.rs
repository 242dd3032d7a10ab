//! Process-wide share registry.
//!
//! Maps each allocated [`ShareCode`] to the file stored for it. Entries are
//! inserted once by [`ShareRegistry::offer`] and never updated or removed for
//! the lifetime of the process.
//!
//! Offers take the write lock for the whole check-and-insert, so two
//! concurrent uploads can never be handed the same code. Lookups take the
//! read lock and run alongside each other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use crate::code::{CodeGenerator, ShareCode};
use crate::error::{Error, Result};

/// Random draws attempted before falling back to a linear scan of the range.
const RANDOM_ATTEMPTS: usize = 32;

/// A registered share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareEntry {
    /// Code (and port) the file is offered on
    pub code: ShareCode,
    /// Location of the stored bytes
    pub path: PathBuf,
    /// Name announced to the downloader
    pub file_name: String,
}

/// Concurrency-safe mapping from share code to stored file.
#[derive(Debug)]
pub struct ShareRegistry {
    generator: CodeGenerator,
    entries: RwLock<HashMap<ShareCode, ShareEntry>>,
}

impl ShareRegistry {
    /// Create an empty registry allocating codes from `generator`.
    #[must_use]
    pub fn new(generator: CodeGenerator) -> Self {
        Self {
            generator,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register a stored file and allocate a fresh code for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CodeSpaceExhausted`] when every code in the range is
    /// already in use.
    pub async fn offer(&self, path: impl AsRef<Path>, file_name: &str) -> Result<ShareCode> {
        let mut entries = self.entries.write().await;

        let code = self.allocate(&entries)?;
        entries.insert(
            code,
            ShareEntry {
                code,
                path: path.as_ref().to_path_buf(),
                file_name: file_name.to_string(),
            },
        );
        drop(entries);

        tracing::debug!(%code, path = %path.as_ref().display(), "registered share");
        Ok(code)
    }

    /// Range codes are allocated from.
    #[must_use]
    pub const fn generator(&self) -> &CodeGenerator {
        &self.generator
    }

    /// Look up the entry for a code.
    pub async fn get(&self, code: ShareCode) -> Option<ShareEntry> {
        self.entries.read().await.get(&code).cloned()
    }

    /// Number of registered shares.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing has been shared yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn allocate(&self, entries: &HashMap<ShareCode, ShareEntry>) -> Result<ShareCode> {
        let exhausted = || Error::CodeSpaceExhausted {
            start: self.generator.start(),
            end: self.generator.end(),
        };

        if entries.len() >= self.generator.capacity() {
            return Err(exhausted());
        }

        let mut candidate = self.generator.generate();
        for _ in 0..RANDOM_ATTEMPTS {
            if !entries.contains_key(&candidate) {
                return Ok(candidate);
            }
            tracing::trace!(code = %candidate, "share code collision, drawing again");
            candidate = self.generator.generate();
        }

        self.generator
            .scan_from(candidate)
            .find(|code| !entries.contains_key(code))
            .ok_or_else(exhausted)
    }
}

impl Default for ShareRegistry {
    fn default() -> Self {
        Self::new(CodeGenerator::default())
    }
}
