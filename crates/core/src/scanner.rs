//! Walks the input directory and splits audio files into those the service
//! accepts and those it does not.

use crate::config::ScanConfig;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

pub const UNSUPPORTED_REASON: &str = "unsupported audio format";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("directory not found: {0}")]
    NotADirectory(PathBuf),
    #[error("invalid exclude pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// In walk order: directories depth-first, entries sorted by name.
    pub supported: Vec<PathBuf>,
    pub unsupported: Vec<UnsupportedFile>,
}

/// Recursively lists audio files under `root`. Anything under one of
/// `skip_dirs` (e.g. the output folder) is left out, provided that dir lies
/// strictly inside `root`; a skip dir equal to or above `root` is ignored.
pub fn discover(
    root: &Path,
    cfg: &ScanConfig,
    skip_dirs: &[PathBuf],
) -> Result<Discovery, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    let excludes = build_globset(&cfg.exclude)?;
    let extensions: Vec<String> = cfg
        .extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();

    let skip_dirs: Vec<&PathBuf> = skip_dirs
        .iter()
        .filter(|d| d.as_path() != root && d.starts_with(root))
        .collect();

    info!("scanning {}", root.display());
    let mut found = Discovery::default();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !((!cfg.include_hidden && is_hidden(e.path()))
                    || excludes.is_match(e.path())
                    || skip_dirs.iter().any(|d| e.path().starts_with(d)))
        });
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if is_supported(&path, &extensions) {
            found.supported.push(path);
        } else if is_audio_mime(&path) {
            found.unsupported.push(UnsupportedFile {
                path,
                reason: UNSUPPORTED_REASON.to_string(),
            });
        }
    }
    info!(
        "found {} supported and {} unsupported audio files",
        found.supported.len(),
        found.unsupported.len()
    );
    Ok(found)
}

/// `extensions` are lowercase and without the leading dot.
pub fn is_supported(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .map(|e| extensions.iter().any(|x| *x == e))
        .unwrap_or(false)
}

fn is_audio_mime(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.type_().as_str() == "audio")
        .unwrap_or(false)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).map_err(|e| ScanError::Pattern {
            pattern: pat.clone(),
            source: e,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ScanError::Pattern {
        pattern: patterns.join(","),
        source: e,
    })
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
