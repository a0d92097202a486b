use std::sync::Arc;

use crate::artifacts::ArtifactStore;
use crate::jobs::{JobRegistry, JobRunner};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Read side of the job table; the runner owns all writes after creation.
    pub registry: Arc<dyn JobRegistry>,
    pub runner: JobRunner,
    pub store: ArtifactStore,
}
