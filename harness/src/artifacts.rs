//! Artifact directories for planning results.
//!
//! # Layout
//!
//! ```text
//! <out>/
//!   batch_summary.json     canonical JSON, one row per target
//!   <target-name>/
//!     report.json          canonical SearchReport
//!     route.txt            rendered route, or the reason none was found
//!     summary.json         canonical TargetSummary
//! ```
//!
//! Every file is written to a temporary name and renamed into place, so a
//! reader never sees a half-written artifact.

use std::path::{Path, PathBuf};

use synthplan_kernel::digest::canon::{canonical_json_bytes, CanonError};
use synthplan_kernel::digest::hash::{canonical_hash, ContentHash, HashDomain};

use crate::runner::{BatchSummary, PlanOutcome};

pub const REPORT_FILENAME: &str = "report.json";
pub const ROUTE_FILENAME: &str = "route.txt";
pub const SUMMARY_FILENAME: &str = "summary.json";
pub const BATCH_SUMMARY_FILENAME: &str = "batch_summary.json";

/// Error writing an artifact directory.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactWriteError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Canon(#[from] CanonError),
}

/// A file written to disk with its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub digest: ContentHash,
}

/// Directory name for a target: ASCII alphanumerics, `-` and `_` are kept,
/// everything else becomes `_`.
#[must_use]
pub fn target_dir_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "target".to_string()
    } else {
        cleaned
    }
}

/// Write `report.json`, `route.txt` and `summary.json` for one target.
///
/// # Errors
///
/// Returns [`ArtifactWriteError`] on I/O or serialization failure.
pub fn write_target_artifacts(
    out_dir: &Path,
    outcome: &PlanOutcome,
) -> Result<Vec<WrittenArtifact>, ArtifactWriteError> {
    let dir = out_dir.join(target_dir_name(&outcome.report.name));
    std::fs::create_dir_all(&dir).map_err(|source| ArtifactWriteError::Io {
        path: dir.clone(),
        source,
    })?;

    let route_text = match &outcome.route {
        Some(route) => route.render(),
        None => format!(
            "no route for {} ({}): {} after {} step(s)\n",
            outcome.report.name, outcome.report.target, outcome.report.termination, outcome.report.steps
        ),
    };
    let files = [
        (REPORT_FILENAME, outcome.report.to_canonical_json_bytes()?),
        (ROUTE_FILENAME, route_text.into_bytes()),
        (
            SUMMARY_FILENAME,
            canonical_json_bytes(&outcome.summary().to_json_value())?,
        ),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        written.push(write_artifact(&dir.join(name), &content)?);
    }
    tracing::info!(dir = %dir.display(), files = written.len(), "wrote target artifacts");
    Ok(written)
}

/// Write `batch_summary.json`.
///
/// # Errors
///
/// Returns [`ArtifactWriteError`] on I/O or serialization failure.
pub fn write_batch_summary(
    out_dir: &Path,
    summary: &BatchSummary,
) -> Result<WrittenArtifact, ArtifactWriteError> {
    std::fs::create_dir_all(out_dir).map_err(|source| ArtifactWriteError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let bytes = canonical_json_bytes(&summary.to_json_value())?;
    write_artifact(&out_dir.join(BATCH_SUMMARY_FILENAME), &bytes)
}

fn write_artifact(path: &Path, content: &[u8]) -> Result<WrittenArtifact, ArtifactWriteError> {
    write_atomic(path, content)?;
    Ok(WrittenArtifact {
        path: path.to_path_buf(),
        digest: canonical_hash(HashDomain::Artifact, content),
    })
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<(), ArtifactWriteError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ArtifactWriteError::Io { path, source }
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = dir.join(format!(
        ".tmp_{}",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));
    std::fs::write(&temp_path, content).map_err(io_err(&temp_path))?;
    std::fs::rename(&temp_path, path).map_err(io_err(path))?;
    Ok(())
}
