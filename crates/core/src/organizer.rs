//! Copies classified files into `<root>/<category>/` without ever replacing
//! an existing file.

use crate::category::UNCLASSIFIED;
use crate::models::OrganizedFile;
use filetime::FileTime;
use std::ffi::{OsStr, OsString};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("source has no file name: {0}")]
    NoFileName(PathBuf),
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open source {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to copy to {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Copies `source` to `root/<category>/<name>`, probing `<stem>_1.<ext>`,
/// `<stem>_2.<ext>`, ... when the name is taken. The source is left untouched.
pub fn organize(
    source: &Path,
    category: &str,
    root: &Path,
) -> Result<OrganizedFile, OrganizeError> {
    let file_name = source
        .file_name()
        .ok_or_else(|| OrganizeError::NoFileName(source.to_path_buf()))?;

    let dir = root.join(category_dir_name(category));
    fs::create_dir_all(&dir).map_err(|e| OrganizeError::CreateDir {
        path: dir.clone(),
        source: e,
    })?;

    let mut input = File::open(source).map_err(|e| OrganizeError::Source {
        path: source.to_path_buf(),
        source: e,
    })?;
    let meta = input.metadata().map_err(|e| OrganizeError::Source {
        path: source.to_path_buf(),
        source: e,
    })?;

    let (destination, mut output) =
        create_unique(&dir, file_name).map_err(|e| OrganizeError::Copy {
            path: dir.join(file_name),
            source: e,
        })?;

    if let Err(e) = io::copy(&mut input, &mut output).and_then(|_| output.sync_all()) {
        drop(output);
        let _ = fs::remove_file(&destination);
        return Err(OrganizeError::Copy {
            path: destination,
            source: e,
        });
    }
    drop(output);
    copy_metadata(&meta, &destination);

    info!(
        "organized {} into {} as {}",
        source.display(),
        category,
        destination.display()
    );
    Ok(OrganizedFile {
        source: source.to_path_buf(),
        destination,
        category: category.to_string(),
    })
}

/// Folder name for a category: path separators and characters not allowed
/// in file names become `_`.
pub fn category_dir_name(category: &str) -> String {
    let cleaned: String = category
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_end_matches(&['.', ' '][..]).to_string();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        UNCLASSIFIED.to_string()
    } else {
        cleaned
    }
}

/// Name tried on attempt `n`: the unchanged name for 0, `<stem>_<n><.ext>` after.
pub fn candidate_path(dir: &Path, file_name: &OsStr, n: u32) -> PathBuf {
    if n == 0 {
        return dir.join(file_name);
    }
    let name = Path::new(file_name);
    let mut next: OsString = name.file_stem().unwrap_or(file_name).to_os_string();
    next.push(format!("_{}", n));
    if let Some(ext) = name.extension() {
        next.push(".");
        next.push(ext);
    }
    dir.join(next)
}

fn create_unique(dir: &Path, file_name: &OsStr) -> io::Result<(PathBuf, File)> {
    let mut n = 0u32;
    loop {
        let candidate = candidate_path(dir, file_name, n);
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                n = n.checked_add(1).ok_or(e)?;
            }
            Err(e) => return Err(e),
        }
    }
}

fn copy_metadata(meta: &fs::Metadata, destination: &Path) {
    let atime = FileTime::from_last_access_time(meta);
    let mtime = FileTime::from_last_modification_time(meta);
    if let Err(e) = filetime::set_file_times(destination, atime, mtime) {
        warn!("could not copy timestamps to {}: {}", destination.display(), e);
    }
    // Last, so a read-only source does not block the timestamp update.
    if let Err(e) = fs::set_permissions(destination, meta.permissions()) {
        warn!("could not copy permissions to {}: {}", destination.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_into_category_folder() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("step.wav");
        fs::write(&src, b"RIFF....").unwrap();
        let root = temp.path().join("sorted");

        let organized = organize(&src, "footstep", &root).unwrap();
        assert_eq!(organized.destination, root.join("footstep").join("step.wav"));
        assert_eq!(fs::read(&organized.destination).unwrap(), b"RIFF....");
        assert!(src.exists());
    }

    #[test]
    fn collisions_get_linear_suffixes() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("sorted");
        let mut dests = Vec::new();
        for i in 0..4 {
            let dir = temp.path().join(format!("in{i}"));
            fs::create_dir_all(&dir).unwrap();
            let src = dir.join("rain.mp3");
            fs::write(&src, format!("take {i}")).unwrap();
            dests.push(organize(&src, "rain", &root).unwrap().destination);
        }
        let names: Vec<_> = dests
            .iter()
            .map(|d| d.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["rain.mp3", "rain_1.mp3", "rain_2.mp3", "rain_3.mp3"]);
        // Earlier copies were not overwritten.
        assert_eq!(fs::read_to_string(root.join("rain").join("rain.mp3")).unwrap(), "take 0");
        assert_eq!(fs::read_to_string(&dests[3]).unwrap(), "take 3");
    }

    #[test]
    fn collision_search_fills_first_gap() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("sorted").join("bell");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bell.ogg"), "a").unwrap();
        fs::write(dir.join("bell_2.ogg"), "b").unwrap();
        let src = temp.path().join("bell.ogg");
        fs::write(&src, "c").unwrap();

        let organized = organize(&src, "bell", &temp.path().join("sorted")).unwrap();
        assert_eq!(organized.destination, dir.join("bell_1.ogg"));
    }

    #[test]
    fn candidate_without_extension() {
        let dir = Path::new("/x");
        assert_eq!(candidate_path(dir, OsStr::new("README"), 2), dir.join("README_2"));
        assert_eq!(candidate_path(dir, OsStr::new("a.tar.gz"), 1), dir.join("a.tar_1.gz"));
        assert_eq!(candidate_path(dir, OsStr::new("a.wav"), 0), dir.join("a.wav"));
    }

    #[test]
    fn missing_source_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let err = organize(&temp.path().join("gone.wav"), "x", temp.path()).unwrap_err();
        assert!(matches!(err, OrganizeError::Source { .. }));
        assert!(!temp.path().join("x").join("gone.wav").exists());
    }

    #[test]
    fn category_names_cannot_escape_root() {
        assert_eq!(category_dir_name("footstep"), "footstep");
        assert_eq!(category_dir_name("../etc"), ".._etc");
        assert_eq!(category_dir_name(".."), UNCLASSIFIED);
        assert_eq!(category_dir_name("a/b"), "a_b");
        assert_eq!(category_dir_name("  "), UNCLASSIFIED);
        assert_eq!(category_dir_name("rain."), "rain");
    }

    #[test]
    fn preserves_modification_time() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("old.wav");
        fs::write(&src, "x").unwrap();
        let then = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&src, then).unwrap();

        let organized = organize(&src, "old", &temp.path().join("out")).unwrap();
        let meta = fs::metadata(&organized.destination).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), then);
    }
}
