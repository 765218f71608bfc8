use std::fmt;

use serde::Serialize;

use super::artifacts::ArtifactError;
use super::domain::{
    Actor, ApplicationId, ApplicationStatus, EntityKind, JobId, RecruiterId, SavedJobId, SeekerId,
};
use super::repository::{DuplicateKind, StoreError};

/// Mutating operation an actor attempted, carried by `Unauthorized` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Action {
    PostJob,
    DeleteJob { job_id: JobId },
    Apply { job_id: JobId },
    SaveJob { job_id: JobId },
    ClearSavedJobs { seeker_id: SeekerId },
    TransitionApplication {
        application_id: ApplicationId,
        to: ApplicationStatus,
    },
    AttachResume { application_id: ApplicationId },
    UpdateProfile { seeker_id: SeekerId },
    UpdateRecruiterProfile { recruiter_id: RecruiterId },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::PostJob => f.write_str("post a job"),
            Action::DeleteJob { job_id } => write!(f, "delete {job_id}"),
            Action::Apply { job_id } => write!(f, "apply to {job_id}"),
            Action::SaveJob { job_id } => write!(f, "save {job_id}"),
            Action::ClearSavedJobs { seeker_id } => {
                write!(f, "clear the saved jobs of {seeker_id}")
            }
            Action::TransitionApplication { application_id, to } => {
                write!(f, "move {application_id} to {to}")
            }
            Action::AttachResume { application_id } => {
                write!(f, "attach a resume to {application_id}")
            }
            Action::UpdateProfile { seeker_id } => write!(f, "update the profile of {seeker_id}"),
            Action::UpdateRecruiterProfile { recruiter_id } => {
                write!(f, "update the profile of {recruiter_id}")
            }
        }
    }
}

/// Rejected payloads: resume uploads and required fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unsupported resume type '{declared}' (expected PDF, DOC, or DOCX)")]
    UnsupportedFileType { declared: String },
    #[error("resume is {size} bytes, above the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("unknown application status '{raw}'")]
    UnknownStatus { raw: String },
}

/// Error raised by the hiring service.
///
/// Every variant apart from `Storage` and `Artifact` is an expected outcome that callers
/// branch on; those two signal infrastructure failure.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("{entity} {key} not found")]
    NotFound { entity: EntityKind, key: String },
    #[error(transparent)]
    Duplicate(DuplicateKind),
    #[error("cannot move application from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("{actor} is not allowed to {action}")]
    Unauthorized { actor: Actor, action: Action },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(
        "{job_id} is still saved by {} seeker(s); confirm a cascading delete to remove it",
        .saved_jobs.len()
    )]
    HasDependents {
        job_id: JobId,
        saved_jobs: Vec<SavedJobId>,
    },
    #[error("{application_id} has been withdrawn")]
    Closed { application_id: ApplicationId },
    #[error(transparent)]
    Storage(StoreError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl BoardError {
    pub fn not_found(entity: EntityKind, key: impl ToString) -> Self {
        BoardError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Stable machine-readable code for the error family.
    pub const fn code(&self) -> &'static str {
        match self {
            BoardError::NotFound { .. } => "not_found",
            BoardError::Duplicate(_) => "duplicate",
            BoardError::InvalidTransition { .. } => "invalid_transition",
            BoardError::Unauthorized { .. } => "unauthorized",
            BoardError::Validation(_) => "validation",
            BoardError::HasDependents { .. } => "has_dependents",
            BoardError::Closed { .. } => "closed",
            BoardError::Storage(_) | BoardError::Artifact(_) => "infrastructure",
        }
    }
}

impl From<StoreError> for BoardError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { entity, key } => BoardError::NotFound { entity, key },
            StoreError::Duplicate(kind) => BoardError::Duplicate(kind),
            StoreError::HasDependents { job_id, saved_jobs } => {
                BoardError::HasDependents { job_id, saved_jobs }
            }
            StoreError::Closed { application_id } => BoardError::Closed { application_id },
            other @ (StoreError::StatusChanged { .. } | StoreError::Unavailable(_)) => {
                BoardError::Storage(other)
            }
        }
    }
}
