//! Persisted symbol-list artifact.
//!
//! The artifact is a JSON array of strings, sorted ascending. Serialization is
//! deterministic, so "changed" means the serialized text differs from what is
//! on disk.
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Diff-aware writes (no rewrite when the text is identical)
//! - Corrupt artifacts are reported and treated as absent
//! - BLAKE3 digest of the written bytes for downstream change detection

use crate::error::PersistenceError;
use crate::symbol::{Symbol, SymbolSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// On-disk layout of the artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Two-space indent, no trailing newline.
    #[default]
    Pretty,
    /// Single line, no whitespace.
    Compact,
}

impl ArtifactFormat {
    pub fn serialize(self, symbols: &SymbolSet) -> Result<String, PersistenceError> {
        let text = match self {
            ArtifactFormat::Pretty => serde_json::to_string_pretty(symbols)?,
            ArtifactFormat::Compact => serde_json::to_string(symbols)?,
        };
        Ok(text)
    }
}

/// Parse artifact text back into a set. `None` if the text is not a JSON array
/// of non-empty strings.
pub fn parse_artifact(text: &str) -> Option<SymbolSet> {
    let items: Vec<String> = serde_json::from_str(text).ok()?;
    if items.iter().any(|s| s.is_empty() || s.trim() != s) {
        return None;
    }
    Some(items.into_iter().map(Symbol::new_unchecked).collect())
}

/// BLAKE3 hex digest of artifact text.
pub fn digest(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// A previously persisted symbol set and its exact text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub symbols: SymbolSet,
    pub text: String,
}

/// Result of a write request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub written: bool,
    pub count: usize,
    pub digest: String,
}

/// Storage for the artifact, threaded through the controller explicitly.
pub trait SnapshotStore {
    /// The current artifact, or `None` if there is none (or it is unreadable as a list).
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError>;

    /// Write `symbols` only if its serialization differs from the current artifact.
    fn diff_and_write(&self, symbols: &SymbolSet) -> Result<WriteOutcome, PersistenceError>;

    /// Write `symbols` unconditionally.
    fn write(&self, symbols: &SymbolSet) -> Result<WriteOutcome, PersistenceError>;

    /// Rewrite a loaded snapshot byte for byte, whatever the configured format.
    fn restore(&self, snapshot: &Snapshot) -> Result<WriteOutcome, PersistenceError>;
}

/// Artifact stored as a single file.
pub struct FileSnapshotStore {
    path: PathBuf,
    format: ArtifactFormat,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>, format: ArtifactFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn read_text(&self) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Write to `<path>.tmp`, then rename into place.
    fn write_atomic(&self, text: &str) -> Result<(), PersistenceError> {
        let write_err = |source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, text).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            write_err(e)
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            // Clean up temp file on rename failure
            let _ = fs::remove_file(&tmp);
            write_err(e)
        })
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        let Some(text) = self.read_text()? else {
            debug!(path = %self.path.display(), "no previous artifact");
            return Ok(None);
        };
        match parse_artifact(&text) {
            Some(symbols) => Ok(Some(Snapshot { symbols, text })),
            None => {
                warn!(
                    path = %self.path.display(),
                    "existing artifact is not a JSON list of symbols; ignoring it"
                );
                Ok(None)
            }
        }
    }

    fn diff_and_write(&self, symbols: &SymbolSet) -> Result<WriteOutcome, PersistenceError> {
        let text = self.format.serialize(symbols)?;
        let current = self.read_text()?;
        let written = current.as_deref() != Some(text.as_str());
        if written {
            self.write_atomic(&text)?;
        }
        Ok(WriteOutcome {
            written,
            count: symbols.len(),
            digest: digest(&text),
        })
    }

    fn write(&self, symbols: &SymbolSet) -> Result<WriteOutcome, PersistenceError> {
        let text = self.format.serialize(symbols)?;
        self.write_atomic(&text)?;
        Ok(WriteOutcome {
            written: true,
            count: symbols.len(),
            digest: digest(&text),
        })
    }

    fn restore(&self, snapshot: &Snapshot) -> Result<WriteOutcome, PersistenceError> {
        self.write_atomic(&snapshot.text)?;
        Ok(WriteOutcome {
            written: true,
            count: snapshot.symbols.len(),
            digest: digest(&snapshot.text),
        })
    }
}

/// In-memory store with the same semantics as [`FileSnapshotStore`].
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    text: Mutex<Option<String>>,
    format: ArtifactFormat,
    writes: Mutex<usize>,
}

impl MemorySnapshotStore {
    pub fn new(format: ArtifactFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Store pre-populated with an artifact's text.
    pub fn with_text(text: impl Into<String>, format: ArtifactFormat) -> Self {
        Self {
            text: Mutex::new(Some(text.into())),
            format,
            writes: Mutex::new(0),
        }
    }

    /// Current artifact text, if any.
    pub fn text(&self) -> Option<String> {
        self.text.lock().unwrap().clone()
    }

    /// Number of writes performed.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    fn put(&self, text: String) {
        *self.text.lock().unwrap() = Some(text);
        *self.writes.lock().unwrap() += 1;
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        Ok(self.text().and_then(|text| {
            parse_artifact(&text).map(|symbols| Snapshot { symbols, text })
        }))
    }

    fn diff_and_write(&self, symbols: &SymbolSet) -> Result<WriteOutcome, PersistenceError> {
        let text = self.format.serialize(symbols)?;
        let written = self.text().as_deref() != Some(text.as_str());
        let digest = digest(&text);
        if written {
            self.put(text);
        }
        Ok(WriteOutcome {
            written,
            count: symbols.len(),
            digest,
        })
    }

    fn write(&self, symbols: &SymbolSet) -> Result<WriteOutcome, PersistenceError> {
        let text = self.format.serialize(symbols)?;
        let digest = digest(&text);
        self.put(text);
        Ok(WriteOutcome {
            written: true,
            count: symbols.len(),
            digest,
        })
    }

    fn restore(&self, snapshot: &Snapshot) -> Result<WriteOutcome, PersistenceError> {
        self.put(snapshot.text.clone());
        Ok(WriteOutcome {
            written: true,
            count: snapshot.symbols.len(),
            digest: digest(&snapshot.text),
        })
    }
}
