//! Storage layer: the incrementally persisted result table.
//!
//! Rows live in memory in discovery order; every flush rewrites the whole
//! table to a sibling temp file and renames it over the target, so readers
//! only ever see a complete previous or complete new table.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// One persisted line of the result table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub file_path: String,
    pub organized_path: String,
    pub category: String,
    pub content: String,
    pub scenario: String,
    /// Tags joined with `", "`.
    pub tags: String,
    pub failure_reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    Written { rows: usize },
    Unchanged,
}

#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    rows: Vec<ResultRow>,
    dirty: bool,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rows: Vec::new(),
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when the in-memory table has rows the file does not.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn append(&mut self, row: ResultRow) {
        self.rows.push(row);
        self.dirty = true;
    }

    /// Rewrites the whole table. Does nothing if nothing changed since the
    /// last successful flush; a failed flush keeps the store dirty.
    pub fn flush(&mut self) -> Result<FlushOutcome, StoreError> {
        if !self.dirty {
            return Ok(FlushOutcome::Unchanged);
        }
        write_table(&self.path, &self.rows)?;
        self.dirty = false;
        debug!(path = %self.path.display(), rows = self.rows.len(), "result table written");
        Ok(FlushOutcome::Written {
            rows: self.rows.len(),
        })
    }
}

/// Reads a table previously written by [`ResultStore::flush`].
pub fn read_table(path: &Path) -> Result<Vec<ResultRow>, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn write_table(path: &Path, rows: &[ResultRow]) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(io_err)?;

    // Same directory as the target so the final rename stays on one filesystem.
    let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
    {
        let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush().map_err(io_err)?;
    }
    tmp.as_file().sync_all().map_err(io_err)?;
    set_table_permissions(tmp.as_file(), path).map_err(io_err)?;
    tmp.persist(path).map_err(|source| StoreError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Temp files are created owner-only; the table keeps the mode of the file it
/// replaces, or gets `0644` when new.
#[cfg(unix)]
fn set_table_permissions(file: &fs::File, path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::metadata(path)
        .map(|m| m.permissions())
        .unwrap_or_else(|_| fs::Permissions::from_mode(0o644));
    file.set_permissions(perms)
}

#[cfg(not(unix))]
fn set_table_permissions(_file: &fs::File, _path: &Path) -> std::io::Result<()> {
    Ok(())
}
