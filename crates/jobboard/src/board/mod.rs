//! Hiring core of the job board: entity store, duplicate guard, application state
//! machine, resume artifacts, and job deletion with referential integrity.

pub mod artifacts;
pub mod clock;
pub mod domain;
pub mod error;
pub mod guard;
pub mod integrity;
pub mod lifecycle;
pub mod local;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use artifacts::{
    ArtifactError, ArtifactStore, FsArtifactStore, MemoryArtifactStore, ResumeFormat,
    ResumeUpload, StoredArtifact, MAX_RESUME_BYTES,
};
pub use clock::{Clock, SystemClock};
pub use domain::{
    AccountView, Actor, Application, ApplicationDetails, ApplicationId, ApplicationQuery,
    ApplicationStatus, ArtifactAddress, EntityKind, ExperienceLevel, Job, JobId, JobType,
    NewApplication, NewJob, NewRecruiter, NewSeeker, Profile, ProfileId, Recruiter, RecruiterId,
    RecruiterProfile, SavedJob, SavedJobDetails, SavedJobId, Seeker, SeekerId,
};
pub use error::{Action, BoardError, ValidationError};
pub use integrity::{IntegrityResolver, JobRemoval};
pub use lifecycle::Authority;
pub use local::{BoardTables, Ephemeral, JsonSnapshot, LocalRepository, Persistence};
pub use repository::{BoardRepository, DuplicateKind, JobPurge, StoreError};
pub use router::{board_router, ApiError};
pub use service::HiringService;
