//! Job-scoped artifact persistence.
//!
//! Layout under the output root:
//!
//! ```text
//! job_<job_id>/
//!   step_1_suggested_search_queries.json
//!   step_2_visual_results.json
//!   step_3_textual_results.json
//!   summary_report.md
//! ```
//!
//! A job directory is written only by the task running that job.

use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::pipeline::StageOutput;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Artifact {0} does not exist")]
    Missing(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Markdown,
}

/// Deterministic name of one stage artifact inside a job directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactKey {
    pub ordinal: usize,
    pub stem: &'static str,
    pub format: ArtifactFormat,
}

impl ArtifactKey {
    pub const fn json(ordinal: usize, stem: &'static str) -> Self {
        Self {
            ordinal,
            stem,
            format: ArtifactFormat::Json,
        }
    }

    pub const fn markdown(ordinal: usize, stem: &'static str) -> Self {
        Self {
            ordinal,
            stem,
            format: ArtifactFormat::Markdown,
        }
    }

    pub fn file_name(&self) -> String {
        match self.format {
            ArtifactFormat::Json => format!("step_{}_{}.json", self.ordinal, self.stem),
            ArtifactFormat::Markdown => format!("{}.md", self.stem),
        }
    }
}

pub const QUERIES_ARTIFACT: ArtifactKey = ArtifactKey::json(1, "suggested_search_queries");
pub const VISUAL_RESULTS_ARTIFACT: ArtifactKey = ArtifactKey::json(2, "visual_results");
pub const TEXTUAL_RESULTS_ARTIFACT: ArtifactKey = ArtifactKey::json(3, "textual_results");
pub const REPORT_ARTIFACT: ArtifactKey = ArtifactKey::markdown(4, "summary_report");

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.root.join(format!("job_{job_id}"))
    }

    pub fn path(&self, job_id: &str, key: ArtifactKey) -> PathBuf {
        self.job_dir(job_id).join(key.file_name())
    }

    /// Creates an empty job directory (and the root) for a fresh run.
    /// Files left by an earlier run under the same id are removed.
    pub async fn prepare(&self, job_id: &str) -> Result<PathBuf, ArtifactError> {
        let dir = self.job_dir(job_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!("Cleared previous artifacts in {}", dir.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ArtifactError::Io {
                    path: dir.clone(),
                    source,
                })
            }
        }
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| ArtifactError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }

    /// Persists a stage output. JSON outputs are pretty-printed, reports are written verbatim.
    pub async fn write(
        &self,
        job_id: &str,
        key: ArtifactKey,
        output: &StageOutput,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.path(job_id, key);
        let bytes = match output {
            StageOutput::Queries(set) => to_json(&path, set)?,
            StageOutput::Results(set) => to_json(&path, set)?,
            StageOutput::Report(text) => text.clone().into_bytes(),
        };

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| ArtifactError::Io {
                path: path.clone(),
                source,
            })?;
        debug!("Wrote artifact {}", path.display());
        Ok(path)
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn exists(&self, job_id: &str, key: ArtifactKey) -> bool {
        tokio::fs::try_exists(self.path(job_id, key))
            .await
            .unwrap_or(false)
    }

    pub async fn read_text(&self, job_id: &str, key: ArtifactKey) -> Result<String, ArtifactError> {
        let path = self.path(job_id, key);
        tokio::fs::read_to_string(&path).await.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ArtifactError::Missing(path.clone())
            } else {
                ArtifactError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })
    }

    pub async fn read_json<T: DeserializeOwned>(
        &self,
        job_id: &str,
        key: ArtifactKey,
    ) -> Result<T, ArtifactError> {
        let text = self.read_text(job_id, key).await?;
        serde_json::from_str(&text).map_err(|source| ArtifactError::Json {
            path: self.path(job_id, key),
            source,
        })
    }
}

fn to_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<Vec<u8>, ArtifactError> {
    serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}
