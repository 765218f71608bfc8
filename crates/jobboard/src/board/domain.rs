use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $label, self.0)
            }
        }
    };
}

entity_id!(
    /// Store-assigned identifier for a job seeker account.
    SeekerId,
    "seeker"
);
entity_id!(
    /// Store-assigned identifier for a recruiter account.
    RecruiterId,
    "recruiter"
);
entity_id!(
    /// Store-assigned identifier for a posted job.
    JobId,
    "job"
);
entity_id!(
    /// Store-assigned identifier for an application.
    ApplicationId,
    "app"
);
entity_id!(
    /// Store-assigned identifier for a saved-job bookmark.
    SavedJobId,
    "saved"
);
entity_id!(ProfileId, "profile");

/// Entity families tracked by the board, used to qualify not-found errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Seeker,
    Recruiter,
    Profile,
    RecruiterProfile,
    Job,
    Application,
    SavedJob,
    Resume,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::Seeker => "seeker",
            EntityKind::Recruiter => "recruiter",
            EntityKind::Profile => "profile",
            EntityKind::RecruiterProfile => "recruiter profile",
            EntityKind::Job => "job",
            EntityKind::Application => "application",
            EntityKind::SavedJob => "saved job",
            EntityKind::Resume => "resume",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Authenticated caller identity supplied by the session layer on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Seeker(SeekerId),
    Recruiter(RecruiterId),
}

impl Actor {
    pub const fn seeker_id(self) -> Option<SeekerId> {
        match self {
            Actor::Seeker(id) => Some(id),
            Actor::Recruiter(_) => None,
        }
    }

    pub const fn recruiter_id(self) -> Option<RecruiterId> {
        match self {
            Actor::Recruiter(id) => Some(id),
            Actor::Seeker(_) => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Seeker(id) => write!(f, "{id}"),
            Actor::Recruiter(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seeker {
    pub id: SeekerId,
    pub name: String,
    pub email: String,
    pub credential_hash: String,
    pub phone: Option<String>,
}

/// Registration payload for a seeker; the credential arrives already hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSeeker {
    pub name: String,
    pub email: String,
    pub credential_hash: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recruiter {
    pub id: RecruiterId,
    pub name: String,
    pub email: String,
    pub credential_hash: String,
    pub company: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecruiter {
    pub name: String,
    pub email: String,
    pub credential_hash: String,
    #[serde(default)]
    pub company: Option<String>,
}

/// Public projection of an account that never carries the credential hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    pub id: u64,
    pub name: String,
    pub email: String,
}

impl From<&Seeker> for AccountView {
    fn from(seeker: &Seeker) -> Self {
        Self {
            id: seeker.id.0,
            name: seeker.name.clone(),
            email: seeker.email.clone(),
        }
    }
}

impl From<&Recruiter> for AccountView {
    fn from(recruiter: &Recruiter) -> Self {
        Self {
            id: recruiter.id.0,
            name: recruiter.name.clone(),
            email: recruiter.email.clone(),
        }
    }
}

/// Free-form seeker profile. Its fields carry no invariants beyond existence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub seeker_id: SeekerId,
    pub attributes: BTreeMap<String, String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterProfile {
    pub id: ProfileId,
    pub recruiter_id: RecruiterId,
    pub attributes: BTreeMap<String, String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
    Executive,
}

/// Posted job, owned exclusively by the recruiter that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub recruiter_id: RecruiterId,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub salary_range: Option<String>,
    pub job_type: JobType,
    pub experience_level: ExperienceLevel,
    pub posted_at: DateTime<Utc>,
}

/// Recruiter-submitted job payload prior to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub salary_range: Option<String>,
    pub job_type: JobType,
    pub experience_level: ExperienceLevel,
}

/// Lifecycle states of an application. `Withdrawn` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Accepted => "ACCEPTED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Withdrawn => "WITHDRAWN",
        }
    }

    /// Active applications block a second application for the same job and seeker.
    pub const fn is_active(self) -> bool {
        !matches!(self, ApplicationStatus::Withdrawn)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ApplicationStatus::Pending),
            "ACCEPTED" => Ok(ApplicationStatus::Accepted),
            "REJECTED" => Ok(ApplicationStatus::Rejected),
            "WITHDRAWN" => Ok(ApplicationStatus::Withdrawn),
            _ => Err(raw.to_string()),
        }
    }
}

/// Opaque location of a stored resume, resolvable through an artifact store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactAddress(pub String);

impl ArtifactAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application of a seeker to a job. Never physically deleted; `Withdrawn` stands in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub seeker_id: SeekerId,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub cover_letter: Option<String>,
    pub resume: Option<ArtifactAddress>,
}

/// Insert payload for the store; the id is assigned on commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub job_id: JobId,
    pub seeker_id: SeekerId,
    pub cover_letter: Option<String>,
    pub resume: Option<ArtifactAddress>,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedJob {
    pub id: SavedJobId,
    pub job_id: JobId,
    pub seeker_id: SeekerId,
    pub saved_at: DateTime<Utc>,
}

/// Application joined with its job. The job is absent once it has been purged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationDetails {
    pub application: Application,
    pub job: Option<Job>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedJobDetails {
    pub saved_job: SavedJob,
    pub job: Option<Job>,
}

/// Relation used to list applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationQuery {
    ByJob(JobId),
    ByRecruiter(RecruiterId),
    BySeeker(SeekerId),
    ByStatus(ApplicationStatus),
    ByJobAndStatus(JobId, ApplicationStatus),
}
