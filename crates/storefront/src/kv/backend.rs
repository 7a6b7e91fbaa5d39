//! Raw string storage behind [`JsonStore`](super::JsonStore).
//!
//! Two backends are provided:
//!
//! - [`Backend::Memory`] - a map held in the process, used by tests and for
//!   throwaway sessions
//! - [`Backend::File`] - one `<key>.json` document per key inside a data
//!   directory
//!
//! File writes go to a temporary sibling first and are renamed into place, so
//! a reader never observes a half-written document.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

/// A single staged mutation.
#[derive(Debug, Clone)]
pub enum Op {
    /// Overwrite `key` with a serialized value.
    Put { key: String, value: String },
    /// Delete `key`.
    Remove { key: String },
}

impl Op {
    /// The key this operation touches.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Remove { key } => key,
        }
    }
}

/// Storage backend for serialized values.
#[derive(Debug)]
pub enum Backend {
    /// Values held in process memory.
    Memory(MemoryBackend),
    /// Values held as files in a directory.
    File(FileBackend),
}

impl Backend {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying file cannot be read.
    pub async fn read(&self, key: &str) -> io::Result<Option<String>> {
        match self {
            Self::Memory(m) => Ok(m.entries.read().await.get(key).cloned()),
            Self::File(f) => f.read(key).await,
        }
    }

    /// Apply staged operations.
    ///
    /// The file backend writes every new document to a temporary file before
    /// renaming any of them, so an I/O failure while staging leaves every key
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if staging or renaming fails.
    pub async fn apply(&self, ops: &[Op]) -> io::Result<()> {
        match self {
            Self::Memory(m) => {
                let mut entries = m.entries.write().await;
                for op in ops {
                    match op {
                        Op::Put { key, value } => {
                            entries.insert(key.clone(), value.clone());
                        }
                        Op::Remove { key } => {
                            entries.remove(key);
                        }
                    }
                }
                Ok(())
            }
            Self::File(f) => f.apply(ops).await,
        }
    }
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

/// Directory-of-documents backend.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) a data directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub async fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Directory holding the documents.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    fn staging_path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!(".{key}.json.tmp"))
    }

    async fn read(&self, key: &str) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn apply(&self, ops: &[Op]) -> io::Result<()> {
        for op in ops {
            if let Op::Put { key, value } = op
                && let Err(e) = tokio::fs::write(self.staging_path_for(key), value).await
            {
                self.discard_staged(ops).await;
                return Err(e);
            }
        }

        for op in ops {
            match op {
                Op::Put { key, .. } => {
                    tokio::fs::rename(self.staging_path_for(key), self.path_for(key)).await?;
                }
                Op::Remove { key } => match tokio::fs::remove_file(self.path_for(key)).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                },
            }
        }
        Ok(())
    }

    async fn discard_staged(&self, ops: &[Op]) {
        for op in ops {
            if let Op::Put { key, .. } = op {
                let _ = tokio::fs::remove_file(self.staging_path_for(key)).await;
            }
        }
    }
}
