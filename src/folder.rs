//! Folder enumeration glue
//!
//! Thin filesystem helpers consumed by the pipeline and the statistics
//! store: experiment subfolder names under a root, and files of one log
//! type within a folder. Results are sorted so positional correlation and
//! store reconciliation are deterministic.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Names of the immediate subfolders of `root`, sorted.
pub fn subfolders(root: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    names.sort();
    Ok(names)
}

/// Paths of the files in `folder` carrying the given extension, sorted.
pub fn files_with_extension(folder: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}
