//! Job lifecycle: registry, background runner, status snapshots and HTTP handlers.

pub mod handlers;
pub mod registry;
pub mod runner;
pub mod snapshot;

pub use registry::{InMemoryJobRegistry, JobError, JobRegistry, JobUpdate};
pub use runner::JobRunner;
pub use snapshot::JobSnapshot;

use uuid::Uuid;

const MAX_JOB_ID_LEN: usize = 64;

/// System-generated job identifier.
pub fn generate_job_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Caller-supplied ids become directory names, so only `[A-Za-z0-9_-]{1,64}` is accepted.
pub fn is_valid_job_id(job_id: &str) -> bool {
    !job_id.is_empty()
        && job_id.len() <= MAX_JOB_ID_LEN
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
