//! Job deletion that never leaves a saved bookmark pointing at a missing job.
//!
//! A plain delete is refused while seekers still hold bookmarks for the job. The caller
//! can retry with `force_cascade`, which removes the job and its bookmarks in one store
//! transaction. Applications are left untouched either way: they keep the job id and
//! read it back as absent.

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{Actor, EntityKind, Job, JobId, SavedJob};
use super::error::{Action, BoardError};
use super::repository::{BoardRepository, StoreError};

/// Outcome of a successful job deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRemoval {
    pub job: Job,
    pub purged_saved_jobs: Vec<SavedJob>,
    /// Applications that still reference the removed job id.
    pub retained_applications: usize,
}

pub struct IntegrityResolver<'a, R: ?Sized> {
    repository: &'a R,
}

impl<'a, R> IntegrityResolver<'a, R>
where
    R: BoardRepository + ?Sized,
{
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    pub fn delete_job(
        &self,
        actor: &Actor,
        job_id: JobId,
        force_cascade: bool,
    ) -> Result<JobRemoval, BoardError> {
        let job = self
            .repository
            .job(job_id)?
            .ok_or_else(|| BoardError::not_found(EntityKind::Job, job_id))?;

        if actor.recruiter_id() != Some(job.recruiter_id) {
            return Err(BoardError::Unauthorized {
                actor: *actor,
                action: Action::DeleteJob { job_id },
            });
        }

        let retained_applications = self.repository.applications_for_job(job_id)?.len();

        match self.repository.delete_job(job_id) {
            Ok(job) => {
                info!(%job_id, retained_applications, "job deleted");
                Ok(JobRemoval {
                    job,
                    purged_saved_jobs: Vec::new(),
                    retained_applications,
                })
            }
            Err(StoreError::HasDependents { saved_jobs, .. }) if force_cascade => {
                let purge = self.repository.purge_job(job_id)?;
                info!(
                    %job_id,
                    blocked_by = saved_jobs.len(),
                    purged = purge.saved_jobs.len(),
                    retained_applications,
                    "job purged with saved bookmarks"
                );
                Ok(JobRemoval {
                    job: purge.job,
                    purged_saved_jobs: purge.saved_jobs,
                    retained_applications,
                })
            }
            Err(err @ StoreError::HasDependents { .. }) => {
                warn!(%job_id, error = %err, "job deletion blocked by saved bookmarks");
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }
}
