//! Upload planning: walking the local tree and applying exclusions.
//!
//! The plan is computed up front so progress reporting can announce the total
//! file count before the first transfer starts. Walk order is sorted by file
//! name, making runs deterministic.

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while planning the upload.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Raised when the local root does not exist or is not a directory.
    #[error("local root directory missing: {path}")]
    MissingSource {
        /// Path that was expected to exist.
        path: Utf8PathBuf,
    },
    /// Raised when a path under the local root is not valid UTF-8.
    #[error("path under the local root is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },
    /// Raised when traversing the local tree fails.
    #[error("failed to walk {path}: {message}")]
    Walk {
        /// Path that could not be visited.
        path: String,
        /// Operating system error string.
        message: String,
    },
}

/// The set of files and directories a run will create remotely.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UploadPlan {
    /// Files to upload, as paths relative to the local root, in walk order.
    pub files: Vec<Utf8PathBuf>,
    /// Directories to create remotely, parents before children.
    pub dirs: Vec<Utf8PathBuf>,
    /// Number of files skipped by the exclusion list.
    pub excluded: usize,
}

/// Returns `true` when an exclusion entry equals `relative` or is a
/// component-wise prefix of it. Blank entries never match.
#[must_use]
pub fn is_excluded(relative: &Utf8Path, exclude: &[String]) -> bool {
    exclude.iter().any(|entry| {
        let trimmed = entry.trim();
        !trimmed.is_empty() && relative.starts_with(trimmed)
    })
}

/// Walks `local_root` and builds the upload plan.
///
/// # Errors
///
/// Returns [`PlanError::MissingSource`] when the root is not a directory,
/// [`PlanError::NonUtf8Path`] for non-UTF-8 file names, and
/// [`PlanError::Walk`] when traversal fails.
pub fn build(local_root: &Utf8Path, exclude: &[String]) -> Result<UploadPlan, PlanError> {
    if !local_root.is_dir() {
        return Err(PlanError::MissingSource {
            path: local_root.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    let mut excluded = 0usize;

    for visited in WalkDir::new(local_root).sort_by_file_name() {
        let entry = visited.map_err(|err| PlanError::Walk {
            path: err
                .path()
                .map_or_else(|| local_root.to_string(), |p| p.display().to_string()),
            message: err.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let full = Utf8Path::from_path(entry.path()).ok_or_else(|| PlanError::NonUtf8Path {
            path: entry.path().display().to_string(),
        })?;
        let relative = full.strip_prefix(local_root).unwrap_or(full);

        if is_excluded(relative, exclude) {
            excluded += 1;
        } else {
            files.push(relative.to_path_buf());
        }
    }

    let mut dirs = BTreeSet::new();
    for file in &files {
        let mut ancestor = file.parent();
        while let Some(dir) = ancestor {
            if dir.as_str().is_empty() {
                break;
            }
            dirs.insert(dir.to_path_buf());
            ancestor = dir.parent();
        }
    }

    Ok(UploadPlan {
        files,
        dirs: dirs.into_iter().collect(),
        excluded,
    })
}
