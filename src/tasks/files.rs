// src/tasks/files.rs

//! File selection and fingerprinting shared by the scan and remove tasks.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

/// Compiled include/exclude globs, matched against paths relative to the
/// scanned root (forward slashes).
#[derive(Debug, Clone)]
pub struct FilePatterns {
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl FilePatterns {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include = build_globset(include).context("building include globset")?;
        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };
        Ok(Self { include, exclude })
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        match &self.exclude {
            Some(ex) => !ex.is_match(rel_path),
            None => true,
        }
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Split a comma-separated job-data list, dropping empty entries.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// `path` relative to `root`, with forward slashes.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

/// Every regular file under `root` whose relative path matches `patterns`,
/// sorted for a stable processing order.
///
/// Unreadable subdirectories are logged and skipped; only an unreadable
/// `root` is an error.
pub fn collect_matching_files(root: &Path, patterns: &FilePatterns) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if dir != root => {
                warn!(dir = ?dir, error = %e, "skipping unreadable directory");
                continue;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("reading dir {:?}", root)));
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = ?dir, error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = ?path, error = %e, "skipping entry with unknown type");
                    continue;
                }
            };

            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                if let Some(rel) = relative_str(root, &path) {
                    if patterns.matches(&rel) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    debug!(root = ?root, count = files.len(), "collected matching files");
    Ok(files)
}

/// [`collect_matching_files`] on the blocking pool.
pub async fn collect_matching_files_async(
    root: PathBuf,
    patterns: FilePatterns,
) -> Result<Vec<PathBuf>> {
    tokio::task::spawn_blocking(move || collect_matching_files(&root, &patterns))
        .await
        .context("file listing task panicked")?
}

/// blake3 of a file's contents, hex encoded.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading file for hashing: {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
