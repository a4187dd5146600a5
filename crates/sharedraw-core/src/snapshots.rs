//! Per-actor frozen copies of the registry, persisted as text.
//!
//! File format, one owner block after another:
//!
//! ```text
//! ID 3
//! 1:1:Circle Black 50 50 10 10
//! 2:3:Rectangle Red 40 60 310 210
//! ID 5
//! ```
//!
//! The map is read once at startup and rewritten in full by `flush` at shutdown.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::ValidationError;
use crate::shapes::{ActorId, Shape, parse_shape_record};

/// Default location of the snapshot file
pub fn default_snapshot_path() -> PathBuf {
    let data_dir = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local/share")
        });
    data_dir.join("sharedraw").join("snapshots.txt")
}

/// Problem in a snapshot file, with the 1-based line it occurred on
#[derive(Debug, Error)]
pub enum SnapshotFormatError {
    #[error("line {line}: shape record before any `ID` header")]
    RecordWithoutOwner { line: usize },
    #[error("line {line}: bad owner id {value:?}")]
    BadOwner { line: usize, value: String },
    #[error("line {line}: {source}")]
    BadRecord {
        line: usize,
        #[source]
        source: ValidationError,
    },
}

pub type Snapshots = BTreeMap<ActorId, Vec<Shape>>;

/// Owner-keyed snapshot map with optional file backing
#[derive(Debug, Default)]
pub struct SnapshotStore {
    path: Option<PathBuf>,
    snapshots: RwLock<Snapshots>,
}

impl SnapshotStore {
    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing or unreadable file yields an empty store
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snapshots = if path.exists() {
            match read_snapshots(&path) {
                Ok(snapshots) => {
                    info!(path = %path.display(), owners = snapshots.len(), "loaded snapshots");
                    snapshots
                }
                Err(e) => {
                    warn!(path = %path.display(), "cannot read snapshots, starting empty: {e:#}");
                    Snapshots::new()
                }
            }
        } else {
            info!(path = %path.display(), "no snapshot file yet");
            Snapshots::new()
        };

        Self {
            path: Some(path),
            snapshots: RwLock::new(snapshots),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Store detached copies of `shapes` under `owner`, replacing any previous snapshot
    pub fn save<'a>(&self, owner: ActorId, shapes: impl IntoIterator<Item = &'a Shape>) -> usize {
        let copy: Vec<Shape> = shapes.into_iter().map(Shape::detached).collect();
        let count = copy.len();
        self.write().insert(owner, copy);
        count
    }

    /// The owner's snapshot, or empty
    pub fn load(&self, owner: ActorId) -> Vec<Shape> {
        self.read().get(&owner).cloned().unwrap_or_default()
    }

    /// Forget every snapshot
    pub fn erase(&self) -> usize {
        let mut snapshots = self.write();
        let count = snapshots.len();
        snapshots.clear();
        count
    }

    pub fn owner_count(&self) -> usize {
        self.read().len()
    }

    /// Whole map in the persisted text format
    pub fn render(&self) -> String {
        render_snapshots(&self.read())
    }

    /// Rewrite the backing file; no-op for in-memory stores
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let content = self.render();
        fs::write(path, content).with_context(|| format!("Failed to save to {:?}", path))?;
        info!(path = %path.display(), owners = self.owner_count(), "snapshots saved");
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Snapshots> {
        self.snapshots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Snapshots> {
        self.snapshots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_snapshots(path: &Path) -> Result<Snapshots> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read from {:?}", path))?;
    Ok(parse_snapshots(&content)?)
}

/// Parse the persisted format
pub fn parse_snapshots(content: &str) -> Result<Snapshots, SnapshotFormatError> {
    let mut snapshots = Snapshots::new();
    let mut current: Option<ActorId> = None;

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let text = raw.trim();
        if text.is_empty() {
            continue;
        }

        if let Some(owner) = text.strip_prefix("ID ") {
            let owner: ActorId = owner.trim().parse().map_err(|_| SnapshotFormatError::BadOwner {
                line,
                value: owner.to_string(),
            })?;
            // A repeated header starts the owner's list over, matching save semantics.
            snapshots.insert(owner, Vec::new());
            current = Some(owner);
            continue;
        }

        let owner = current.ok_or(SnapshotFormatError::RecordWithoutOwner { line })?;
        let shape = parse_shape_record(text)
            .map_err(|source| SnapshotFormatError::BadRecord { line, source })?;
        snapshots.entry(owner).or_default().push(shape);
    }

    Ok(snapshots)
}

/// Render in the persisted format, owners ascending
pub fn render_snapshots(snapshots: &Snapshots) -> String {
    let mut out = String::new();
    for (owner, shapes) in snapshots {
        let _ = writeln!(out, "ID {owner}");
        for shape in shapes {
            let _ = writeln!(out, "{}", shape.record());
        }
    }
    out
}
