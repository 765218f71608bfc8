use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ArtifactAddress, EntityKind, Job, JobId,
    NewApplication, NewJob, NewRecruiter, NewSeeker, Profile, Recruiter, RecruiterId,
    RecruiterProfile, SavedJob, SavedJobId, Seeker, SeekerId,
};

/// Result of a cascading job purge: the job and every bookmark removed with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobPurge {
    pub job: Job,
    pub saved_jobs: Vec<SavedJob>,
}

/// Entity store contract backing the hiring service.
///
/// Every mutation is a single transaction: it either becomes visible in full or not at
/// all. Uniqueness invariants are enforced here, not by callers. Relation fetches return
/// newest records first with ties kept in insertion order, and an empty vector when
/// nothing matches.
pub trait BoardRepository: Send + Sync {
    fn insert_seeker(&self, seeker: NewSeeker) -> Result<Seeker, StoreError>;
    fn seeker(&self, id: SeekerId) -> Result<Option<Seeker>, StoreError>;

    fn insert_recruiter(&self, recruiter: NewRecruiter) -> Result<Recruiter, StoreError>;
    fn recruiter(&self, id: RecruiterId) -> Result<Option<Recruiter>, StoreError>;

    fn upsert_profile(
        &self,
        seeker_id: SeekerId,
        attributes: BTreeMap<String, String>,
        updated_at: DateTime<Utc>,
    ) -> Result<Profile, StoreError>;
    fn profile_for_seeker(&self, seeker_id: SeekerId) -> Result<Option<Profile>, StoreError>;

    fn upsert_recruiter_profile(
        &self,
        recruiter_id: RecruiterId,
        attributes: BTreeMap<String, String>,
        updated_at: DateTime<Utc>,
    ) -> Result<RecruiterProfile, StoreError>;
    fn recruiter_profile(
        &self,
        recruiter_id: RecruiterId,
    ) -> Result<Option<RecruiterProfile>, StoreError>;

    fn insert_job(
        &self,
        recruiter_id: RecruiterId,
        job: NewJob,
        posted_at: DateTime<Utc>,
    ) -> Result<Job, StoreError>;
    fn job(&self, id: JobId) -> Result<Option<Job>, StoreError>;
    fn jobs(&self) -> Result<Vec<Job>, StoreError>;
    fn jobs_for_recruiter(&self, recruiter_id: RecruiterId) -> Result<Vec<Job>, StoreError>;
    /// Remove a job that nothing depends on; saved bookmarks raise `HasDependents`.
    fn delete_job(&self, id: JobId) -> Result<Job, StoreError>;
    /// Remove a job together with every saved bookmark referencing it.
    fn purge_job(&self, id: JobId) -> Result<JobPurge, StoreError>;

    /// Insert unless the pair already holds an active application.
    fn insert_application(&self, application: NewApplication)
        -> Result<Application, StoreError>;
    fn application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError>;
    fn active_application(
        &self,
        job_id: JobId,
        seeker_id: SeekerId,
    ) -> Result<Option<Application>, StoreError>;
    fn applications_for_job(&self, job_id: JobId) -> Result<Vec<Application>, StoreError>;
    fn applications_for_seeker(&self, seeker_id: SeekerId)
        -> Result<Vec<Application>, StoreError>;
    fn applications_for_recruiter(
        &self,
        recruiter_id: RecruiterId,
    ) -> Result<Vec<Application>, StoreError>;
    fn applications_with_status(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, StoreError>;
    /// Compare-and-set on the status column; a stale `expected` yields `StatusChanged`.
    fn set_application_status(
        &self,
        id: ApplicationId,
        expected: ApplicationStatus,
        next: ApplicationStatus,
    ) -> Result<Application, StoreError>;
    /// Point the application at a new resume, returning the address it replaced.
    /// Withdrawn applications yield `Closed`.
    fn set_application_resume(
        &self,
        id: ApplicationId,
        resume: ArtifactAddress,
    ) -> Result<Option<ArtifactAddress>, StoreError>;

    fn insert_saved_job(
        &self,
        job_id: JobId,
        seeker_id: SeekerId,
        saved_at: DateTime<Utc>,
    ) -> Result<SavedJob, StoreError>;
    fn delete_saved_job(&self, job_id: JobId, seeker_id: SeekerId)
        -> Result<SavedJob, StoreError>;
    fn saved_jobs_for_seeker(&self, seeker_id: SeekerId) -> Result<Vec<SavedJob>, StoreError>;
    fn saved_jobs_for_job(&self, job_id: JobId) -> Result<Vec<SavedJob>, StoreError>;
    /// Remove every bookmark the seeker holds in one transaction.
    fn delete_saved_jobs_for_seeker(&self, seeker_id: SeekerId)
        -> Result<Vec<SavedJob>, StoreError>;
}

/// Uniqueness violations detected at the storage boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DuplicateKind {
    #[error("{seeker_id} already holds active application {existing} for {job_id}")]
    ActiveApplication {
        job_id: JobId,
        seeker_id: SeekerId,
        existing: ApplicationId,
    },
    #[error("{job_id} is already saved by {seeker_id}")]
    SavedJob {
        job_id: JobId,
        seeker_id: SeekerId,
        existing: SavedJobId,
    },
    #[error("a seeker is already registered with {email}")]
    SeekerEmail { email: String },
    #[error("a recruiter is already registered with {email}")]
    RecruiterEmail { email: String },
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {key} not found")]
    NotFound { entity: EntityKind, key: String },
    #[error(transparent)]
    Duplicate(#[from] DuplicateKind),
    #[error("{job_id} is still referenced by {} saved job(s)", .saved_jobs.len())]
    HasDependents {
        job_id: JobId,
        saved_jobs: Vec<SavedJobId>,
    },
    #[error("{application_id} changed status to {current}")]
    StatusChanged {
        application_id: ApplicationId,
        current: ApplicationStatus,
    },
    #[error("{application_id} is withdrawn and closed to changes")]
    Closed { application_id: ApplicationId },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: EntityKind, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}
