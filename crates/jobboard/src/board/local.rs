//! Process-local entity store with optional JSON snapshot durability.
//!
//! All tables live in one [`BoardTables`] value guarded by a mutex. A write clones the
//! tables, applies the mutation to the copy, hands the copy to the [`Persistence`] layer,
//! and only then publishes it. A failure at any of those steps leaves the published
//! tables exactly as they were, which is what makes the cascading job purge atomic.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ArtifactAddress, EntityKind, Job, JobId,
    NewApplication, NewJob, NewRecruiter, NewSeeker, Profile, ProfileId, Recruiter, RecruiterId,
    RecruiterProfile, SavedJob, SavedJobId, Seeker, SeekerId,
};
use super::guard;
use super::repository::{BoardRepository, DuplicateKind, JobPurge, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Sequences {
    seekers: u64,
    recruiters: u64,
    profiles: u64,
    recruiter_profiles: u64,
    jobs: u64,
    applications: u64,
    saved_jobs: u64,
}

fn bump(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

/// Complete table set. Map order is id order, which is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardTables {
    sequences: Sequences,
    seekers: BTreeMap<SeekerId, Seeker>,
    recruiters: BTreeMap<RecruiterId, Recruiter>,
    profiles: BTreeMap<SeekerId, Profile>,
    recruiter_profiles: BTreeMap<RecruiterId, RecruiterProfile>,
    jobs: BTreeMap<JobId, Job>,
    applications: BTreeMap<ApplicationId, Application>,
    saved_jobs: BTreeMap<SavedJobId, SavedJob>,
}

impl BoardTables {
    fn require_seeker(&self, id: SeekerId) -> Result<(), StoreError> {
        if self.seekers.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::not_found(EntityKind::Seeker, id))
        }
    }

    fn require_recruiter(&self, id: RecruiterId) -> Result<(), StoreError> {
        if self.recruiters.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::not_found(EntityKind::Recruiter, id))
        }
    }

    fn require_job(&self, id: JobId) -> Result<&Job, StoreError> {
        self.jobs
            .get(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Job, id))
    }

    fn saved_pair(&self, job_id: JobId, seeker_id: SeekerId) -> Option<&SavedJob> {
        self.saved_jobs
            .values()
            .find(|saved| saved.job_id == job_id && saved.seeker_id == seeker_id)
    }

    fn saved_ids_for_job(&self, job_id: JobId) -> Vec<SavedJobId> {
        self.saved_jobs
            .values()
            .filter(|saved| saved.job_id == job_id)
            .map(|saved| saved.id)
            .collect()
    }
}

/// Stable newest-first ordering; equal keys keep their insertion order.
fn newest_first<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    rows.sort_by(|left, right| key(right).cmp(&key(left)));
    rows
}

/// Commit hook invoked with the candidate tables before they are published.
pub trait Persistence: Send + Sync {
    fn commit(&self, tables: &BoardTables) -> Result<(), StoreError>;
}

/// Keeps state in memory only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ephemeral;

impl Persistence for Ephemeral {
    fn commit(&self, _tables: &BoardTables) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Writes the full table set to a JSON file, replacing it atomically on every commit.
#[derive(Debug, Clone)]
pub struct JsonSnapshot {
    path: PathBuf,
}

impl JsonSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last committed snapshot, if any.
    pub fn load(&self) -> Result<Option<BoardTables>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(unavailable(&self.path, err)),
        };
        let tables = serde_json::from_slice(&raw).map_err(|err| {
            StoreError::Unavailable(format!(
                "snapshot {} is unreadable: {err}",
                self.path.display()
            ))
        })?;
        Ok(Some(tables))
    }
}

impl Persistence for JsonSnapshot {
    fn commit(&self, tables: &BoardTables) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|err| unavailable(dir, err))?;

        let payload = serde_json::to_vec(tables)
            .map_err(|err| StoreError::Unavailable(format!("snapshot encoding failed: {err}")))?;
        let staged = NamedTempFile::new_in(dir).map_err(|err| unavailable(dir, err))?;
        {
            let mut file = staged.as_file();
            file.write_all(&payload)
                .and_then(|()| file.sync_all())
                .map_err(|err| unavailable(staged.path(), err))?;
        }
        staged
            .persist(&self.path)
            .map_err(|err| unavailable(&self.path, err.error))?;
        debug!(path = %self.path.display(), bytes = payload.len(), "snapshot committed");
        Ok(())
    }
}

fn unavailable(path: &Path, err: std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {err}", path.display()))
}

/// Mutex-guarded table store parameterised over its durability layer.
#[derive(Debug)]
pub struct LocalRepository<P = Ephemeral> {
    tables: Mutex<BoardTables>,
    persistence: P,
}

impl LocalRepository<Ephemeral> {
    pub fn in_memory() -> Self {
        Self::with_persistence(Ephemeral)
    }
}

impl Default for LocalRepository<Ephemeral> {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl LocalRepository<JsonSnapshot> {
    /// Open (or start) a snapshot-backed store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let snapshot = JsonSnapshot::new(path);
        let tables = snapshot.load()?.unwrap_or_default();
        Ok(Self::from_parts(tables, snapshot))
    }
}

impl<P: Persistence> LocalRepository<P> {
    pub fn with_persistence(persistence: P) -> Self {
        Self::from_parts(BoardTables::default(), persistence)
    }

    pub fn from_parts(tables: BoardTables, persistence: P) -> Self {
        Self {
            tables: Mutex::new(tables),
            persistence,
        }
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Copy of the currently published tables.
    pub fn snapshot(&self) -> Result<BoardTables, StoreError> {
        self.read(BoardTables::clone)
    }

    fn lock(&self) -> Result<MutexGuard<'_, BoardTables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("board tables lock poisoned".to_string()))
    }

    fn read<T>(&self, view: impl FnOnce(&BoardTables) -> T) -> Result<T, StoreError> {
        let guard = self.lock()?;
        Ok(view(&guard))
    }

    fn transact<T>(
        &self,
        mutation: impl FnOnce(&mut BoardTables) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        let outcome = mutation(&mut working)?;
        self.persistence.commit(&working)?;
        *guard = working;
        Ok(outcome)
    }
}

impl<P: Persistence> BoardRepository for LocalRepository<P> {
    fn insert_seeker(&self, seeker: NewSeeker) -> Result<Seeker, StoreError> {
        self.transact(|tables| {
            if tables
                .seekers
                .values()
                .any(|existing| existing.email.eq_ignore_ascii_case(&seeker.email))
            {
                return Err(DuplicateKind::SeekerEmail {
                    email: seeker.email,
                }
                .into());
            }

            let id = SeekerId(bump(&mut tables.sequences.seekers));
            let record = Seeker {
                id,
                name: seeker.name,
                email: seeker.email,
                credential_hash: seeker.credential_hash,
                phone: seeker.phone,
            };
            tables.seekers.insert(id, record.clone());
            Ok(record)
        })
    }

    fn seeker(&self, id: SeekerId) -> Result<Option<Seeker>, StoreError> {
        self.read(|tables| tables.seekers.get(&id).cloned())
    }

    fn insert_recruiter(&self, recruiter: NewRecruiter) -> Result<Recruiter, StoreError> {
        self.transact(|tables| {
            if tables
                .recruiters
                .values()
                .any(|existing| existing.email.eq_ignore_ascii_case(&recruiter.email))
            {
                return Err(DuplicateKind::RecruiterEmail {
                    email: recruiter.email,
                }
                .into());
            }

            let id = RecruiterId(bump(&mut tables.sequences.recruiters));
            let record = Recruiter {
                id,
                name: recruiter.name,
                email: recruiter.email,
                credential_hash: recruiter.credential_hash,
                company: recruiter.company,
            };
            tables.recruiters.insert(id, record.clone());
            Ok(record)
        })
    }

    fn recruiter(&self, id: RecruiterId) -> Result<Option<Recruiter>, StoreError> {
        self.read(|tables| tables.recruiters.get(&id).cloned())
    }

    fn upsert_profile(
        &self,
        seeker_id: SeekerId,
        attributes: BTreeMap<String, String>,
        updated_at: DateTime<Utc>,
    ) -> Result<Profile, StoreError> {
        self.transact(|tables| {
            tables.require_seeker(seeker_id)?;
            let id = match tables.profiles.get(&seeker_id) {
                Some(existing) => existing.id,
                None => ProfileId(bump(&mut tables.sequences.profiles)),
            };
            let profile = Profile {
                id,
                seeker_id,
                attributes,
                updated_at,
            };
            tables.profiles.insert(seeker_id, profile.clone());
            Ok(profile)
        })
    }

    fn profile_for_seeker(&self, seeker_id: SeekerId) -> Result<Option<Profile>, StoreError> {
        self.read(|tables| tables.profiles.get(&seeker_id).cloned())
    }

    fn upsert_recruiter_profile(
        &self,
        recruiter_id: RecruiterId,
        attributes: BTreeMap<String, String>,
        updated_at: DateTime<Utc>,
    ) -> Result<RecruiterProfile, StoreError> {
        self.transact(|tables| {
            tables.require_recruiter(recruiter_id)?;
            let id = match tables.recruiter_profiles.get(&recruiter_id) {
                Some(existing) => existing.id,
                None => ProfileId(bump(&mut tables.sequences.recruiter_profiles)),
            };
            let profile = RecruiterProfile {
                id,
                recruiter_id,
                attributes,
                updated_at,
            };
            tables
                .recruiter_profiles
                .insert(recruiter_id, profile.clone());
            Ok(profile)
        })
    }

    fn recruiter_profile(
        &self,
        recruiter_id: RecruiterId,
    ) -> Result<Option<RecruiterProfile>, StoreError> {
        self.read(|tables| tables.recruiter_profiles.get(&recruiter_id).cloned())
    }

    fn insert_job(
        &self,
        recruiter_id: RecruiterId,
        job: NewJob,
        posted_at: DateTime<Utc>,
    ) -> Result<Job, StoreError> {
        self.transact(|tables| {
            tables.require_recruiter(recruiter_id)?;
            let id = JobId(bump(&mut tables.sequences.jobs));
            let record = Job {
                id,
                recruiter_id,
                title: job.title,
                company: job.company,
                location: job.location,
                description: job.description,
                salary_range: job.salary_range,
                job_type: job.job_type,
                experience_level: job.experience_level,
                posted_at,
            };
            tables.jobs.insert(id, record.clone());
            Ok(record)
        })
    }

    fn job(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        self.read(|tables| tables.jobs.get(&id).cloned())
    }

    fn jobs(&self) -> Result<Vec<Job>, StoreError> {
        let rows: Vec<Job> = self.read(|tables| tables.jobs.values().cloned().collect())?;
        Ok(newest_first(rows, |job: &Job| job.posted_at))
    }

    fn jobs_for_recruiter(&self, recruiter_id: RecruiterId) -> Result<Vec<Job>, StoreError> {
        let rows: Vec<Job> = self.read(|tables| {
            tables
                .jobs
                .values()
                .filter(|job| job.recruiter_id == recruiter_id)
                .cloned()
                .collect()
        })?;
        Ok(newest_first(rows, |job: &Job| job.posted_at))
    }

    fn delete_job(&self, id: JobId) -> Result<Job, StoreError> {
        self.transact(|tables| {
            tables.require_job(id)?;
            let saved_jobs = tables.saved_ids_for_job(id);
            if !saved_jobs.is_empty() {
                return Err(StoreError::HasDependents {
                    job_id: id,
                    saved_jobs,
                });
            }
            tables
                .jobs
                .remove(&id)
                .ok_or_else(|| StoreError::not_found(EntityKind::Job, id))
        })
    }

    fn purge_job(&self, id: JobId) -> Result<JobPurge, StoreError> {
        self.transact(|tables| {
            tables.require_job(id)?;
            let saved_ids = tables.saved_ids_for_job(id);
            let saved_jobs = saved_ids
                .iter()
                .filter_map(|saved_id| tables.saved_jobs.remove(saved_id))
                .collect();
            let job = tables
                .jobs
                .remove(&id)
                .ok_or_else(|| StoreError::not_found(EntityKind::Job, id))?;
            Ok(JobPurge { job, saved_jobs })
        })
    }

    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, StoreError> {
        self.transact(|tables| {
            tables.require_job(application.job_id)?;
            tables.require_seeker(application.seeker_id)?;

            if let Some(existing) = guard::active_for_pair(
                tables.applications.values(),
                application.job_id,
                application.seeker_id,
            ) {
                return Err(DuplicateKind::ActiveApplication {
                    job_id: application.job_id,
                    seeker_id: application.seeker_id,
                    existing: existing.id,
                }
                .into());
            }

            let id = ApplicationId(bump(&mut tables.sequences.applications));
            let record = Application {
                id,
                job_id: application.job_id,
                seeker_id: application.seeker_id,
                status: ApplicationStatus::Pending,
                applied_at: application.applied_at,
                cover_letter: application.cover_letter,
                resume: application.resume,
            };
            tables.applications.insert(id, record.clone());
            Ok(record)
        })
    }

    fn application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError> {
        self.read(|tables| tables.applications.get(&id).cloned())
    }

    fn active_application(
        &self,
        job_id: JobId,
        seeker_id: SeekerId,
    ) -> Result<Option<Application>, StoreError> {
        self.read(|tables| {
            guard::active_for_pair(tables.applications.values(), job_id, seeker_id).cloned()
        })
    }

    fn applications_for_job(&self, job_id: JobId) -> Result<Vec<Application>, StoreError> {
        let rows: Vec<Application> = self.read(|tables| {
            tables
                .applications
                .values()
                .filter(|application| application.job_id == job_id)
                .cloned()
                .collect()
        })?;
        Ok(newest_first(rows, |application: &Application| {
            application.applied_at
        }))
    }

    fn applications_for_seeker(
        &self,
        seeker_id: SeekerId,
    ) -> Result<Vec<Application>, StoreError> {
        let rows: Vec<Application> = self.read(|tables| {
            tables
                .applications
                .values()
                .filter(|application| application.seeker_id == seeker_id)
                .cloned()
                .collect()
        })?;
        Ok(newest_first(rows, |application: &Application| {
            application.applied_at
        }))
    }

    fn applications_for_recruiter(
        &self,
        recruiter_id: RecruiterId,
    ) -> Result<Vec<Application>, StoreError> {
        let rows: Vec<Application> = self.read(|tables| {
            tables
                .applications
                .values()
                .filter(|application| {
                    tables
                        .jobs
                        .get(&application.job_id)
                        .is_some_and(|job| job.recruiter_id == recruiter_id)
                })
                .cloned()
                .collect()
        })?;
        Ok(newest_first(rows, |application: &Application| {
            application.applied_at
        }))
    }

    fn applications_with_status(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, StoreError> {
        let rows: Vec<Application> = self.read(|tables| {
            tables
                .applications
                .values()
                .filter(|application| application.status == status)
                .cloned()
                .collect()
        })?;
        Ok(newest_first(rows, |application: &Application| {
            application.applied_at
        }))
    }

    fn set_application_status(
        &self,
        id: ApplicationId,
        expected: ApplicationStatus,
        next: ApplicationStatus,
    ) -> Result<Application, StoreError> {
        self.transact(|tables| {
            let application = tables
                .applications
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found(EntityKind::Application, id))?;
            if application.status != expected {
                return Err(StoreError::StatusChanged {
                    application_id: id,
                    current: application.status,
                });
            }
            application.status = next;
            Ok(application.clone())
        })
    }

    fn set_application_resume(
        &self,
        id: ApplicationId,
        resume: ArtifactAddress,
    ) -> Result<Option<ArtifactAddress>, StoreError> {
        self.transact(|tables| {
            let application = tables
                .applications
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found(EntityKind::Application, id))?;
            if !application.status.is_active() {
                return Err(StoreError::Closed { application_id: id });
            }
            Ok(application.resume.replace(resume))
        })
    }

    fn insert_saved_job(
        &self,
        job_id: JobId,
        seeker_id: SeekerId,
        saved_at: DateTime<Utc>,
    ) -> Result<SavedJob, StoreError> {
        self.transact(|tables| {
            tables.require_job(job_id)?;
            tables.require_seeker(seeker_id)?;
            if let Some(existing) = tables.saved_pair(job_id, seeker_id) {
                return Err(DuplicateKind::SavedJob {
                    job_id,
                    seeker_id,
                    existing: existing.id,
                }
                .into());
            }

            let id = SavedJobId(bump(&mut tables.sequences.saved_jobs));
            let record = SavedJob {
                id,
                job_id,
                seeker_id,
                saved_at,
            };
            tables.saved_jobs.insert(id, record.clone());
            Ok(record)
        })
    }

    fn delete_saved_job(
        &self,
        job_id: JobId,
        seeker_id: SeekerId,
    ) -> Result<SavedJob, StoreError> {
        self.transact(|tables| {
            let id = tables
                .saved_pair(job_id, seeker_id)
                .map(|saved| saved.id)
                .ok_or_else(|| {
                    StoreError::not_found(EntityKind::SavedJob, format!("{job_id} for {seeker_id}"))
                })?;
            tables
                .saved_jobs
                .remove(&id)
                .ok_or_else(|| StoreError::not_found(EntityKind::SavedJob, id))
        })
    }

    fn saved_jobs_for_seeker(&self, seeker_id: SeekerId) -> Result<Vec<SavedJob>, StoreError> {
        let rows: Vec<SavedJob> = self.read(|tables| {
            tables
                .saved_jobs
                .values()
                .filter(|saved| saved.seeker_id == seeker_id)
                .cloned()
                .collect()
        })?;
        Ok(newest_first(rows, |saved: &SavedJob| saved.saved_at))
    }

    fn saved_jobs_for_job(&self, job_id: JobId) -> Result<Vec<SavedJob>, StoreError> {
        let rows: Vec<SavedJob> = self.read(|tables| {
            tables
                .saved_jobs
                .values()
                .filter(|saved| saved.job_id == job_id)
                .cloned()
                .collect()
        })?;
        Ok(newest_first(rows, |saved: &SavedJob| saved.saved_at))
    }
    fn delete_saved_jobs_for_seeker(
        &self,
        seeker_id: SeekerId,
    ) -> Result<Vec<SavedJob>, StoreError> {
        let removed = self.transact(|tables| {
            let ids: Vec<SavedJobId> = tables
                .saved_jobs
                .values()
                .filter(|saved| saved.seeker_id == seeker_id)
                .map(|saved| saved.id)
                .collect();
            Ok(ids
                .into_iter()
                .filter_map(|id| tables.saved_jobs.remove(&id))
                .collect::<Vec<_>>())
        })?;
        Ok(newest_first(removed, |saved: &SavedJob| saved.saved_at))
    }
}
