use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{info, warn};

use super::artifacts::{
    mint_address, ArtifactError, ArtifactStore, ResumeFormat, ResumeUpload, StoredArtifact,
};
use super::clock::{Clock, SystemClock};
use super::domain::{
    Actor, Application, ApplicationDetails, ApplicationId, ApplicationQuery, ApplicationStatus,
    ArtifactAddress, EntityKind, Job, JobId, NewApplication, NewJob, NewRecruiter, NewSeeker,
    Profile, Recruiter, RecruiterId, RecruiterProfile, SavedJob, SavedJobDetails, Seeker,
    SeekerId,
};
use super::error::{Action, BoardError, ValidationError};
use super::guard;
use super::integrity::{IntegrityResolver, JobRemoval};
use super::lifecycle;
use super::repository::{BoardRepository, StoreError};

/// Attempts at a status compare-and-set before giving up on a contended application.
const MAX_STATUS_ATTEMPTS: usize = 4;

/// Fresh addresses tried before a resume upload gives up on finding a free one.
const MAX_ADDRESS_ATTEMPTS: usize = 8;

/// Service composing the entity store, duplicate guard, state machine, resume handler,
/// and integrity resolver behind the operations exposed to callers.
pub struct HiringService<R: ?Sized, A: ?Sized> {
    repository: Arc<R>,
    artifacts: Arc<A>,
    clock: Arc<dyn Clock>,
}

fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField { field })
    } else {
        Ok(())
    }
}

fn seeker_actor(actor: &Actor, action: Action) -> Result<SeekerId, BoardError> {
    actor.seeker_id().ok_or(BoardError::Unauthorized {
        actor: *actor,
        action,
    })
}

fn normalize_cover_letter(cover_letter: Option<String>) -> Option<String> {
    cover_letter
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

impl<R, A> HiringService<R, A>
where
    R: BoardRepository + ?Sized,
    A: ArtifactStore + ?Sized,
{
    pub fn new(repository: Arc<R>, artifacts: Arc<A>) -> Self {
        Self::with_clock(repository, artifacts, Arc::new(SystemClock))
    }

    pub fn with_clock(repository: Arc<R>, artifacts: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            artifacts,
            clock,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn artifacts(&self) -> &A {
        &self.artifacts
    }

    pub fn register_seeker(&self, seeker: NewSeeker) -> Result<Seeker, BoardError> {
        required("name", &seeker.name)?;
        required("email", &seeker.email)?;
        required("credential_hash", &seeker.credential_hash)?;
        let seeker = self.repository.insert_seeker(seeker)?;
        info!(seeker_id = %seeker.id, "seeker registered");
        Ok(seeker)
    }

    pub fn register_recruiter(&self, recruiter: NewRecruiter) -> Result<Recruiter, BoardError> {
        required("name", &recruiter.name)?;
        required("email", &recruiter.email)?;
        required("credential_hash", &recruiter.credential_hash)?;
        let recruiter = self.repository.insert_recruiter(recruiter)?;
        info!(recruiter_id = %recruiter.id, "recruiter registered");
        Ok(recruiter)
    }

    /// Create or replace the seeker's profile. Only the seeker may write it.
    pub fn upsert_profile(
        &self,
        actor: &Actor,
        seeker_id: SeekerId,
        attributes: BTreeMap<String, String>,
    ) -> Result<Profile, BoardError> {
        if actor.seeker_id() != Some(seeker_id) {
            return Err(BoardError::Unauthorized {
                actor: *actor,
                action: Action::UpdateProfile { seeker_id },
            });
        }
        let profile = self
            .repository
            .upsert_profile(seeker_id, attributes, self.clock.now())?;
        info!(%seeker_id, profile_id = %profile.id, "profile saved");
        Ok(profile)
    }

    pub fn upsert_recruiter_profile(
        &self,
        actor: &Actor,
        recruiter_id: RecruiterId,
        attributes: BTreeMap<String, String>,
    ) -> Result<RecruiterProfile, BoardError> {
        if actor.recruiter_id() != Some(recruiter_id) {
            return Err(BoardError::Unauthorized {
                actor: *actor,
                action: Action::UpdateRecruiterProfile { recruiter_id },
            });
        }
        let profile =
            self.repository
                .upsert_recruiter_profile(recruiter_id, attributes, self.clock.now())?;
        info!(%recruiter_id, profile_id = %profile.id, "recruiter profile saved");
        Ok(profile)
    }

    pub fn profile(&self, seeker_id: SeekerId) -> Result<Profile, BoardError> {
        self.repository
            .profile_for_seeker(seeker_id)?
            .ok_or_else(|| BoardError::not_found(EntityKind::Profile, seeker_id))
    }

    pub fn recruiter_profile(
        &self,
        recruiter_id: RecruiterId,
    ) -> Result<RecruiterProfile, BoardError> {
        self.repository
            .recruiter_profile(recruiter_id)?
            .ok_or_else(|| BoardError::not_found(EntityKind::RecruiterProfile, recruiter_id))
    }

    pub fn check_profile_exists(&self, seeker_id: SeekerId) -> Result<bool, BoardError> {
        Ok(self.repository.profile_for_seeker(seeker_id)?.is_some())
    }

    pub fn post_job(&self, actor: &Actor, job: NewJob) -> Result<Job, BoardError> {
        let recruiter_id = actor.recruiter_id().ok_or(BoardError::Unauthorized {
            actor: *actor,
            action: Action::PostJob,
        })?;
        required("title", &job.title)?;
        required("company", &job.company)?;
        required("location", &job.location)?;

        let job = self
            .repository
            .insert_job(recruiter_id, job, self.clock.now())?;
        info!(job_id = %job.id, %recruiter_id, title = %job.title, "job posted");
        Ok(job)
    }

    pub fn job(&self, job_id: JobId) -> Result<Job, BoardError> {
        self.repository
            .job(job_id)?
            .ok_or_else(|| BoardError::not_found(EntityKind::Job, job_id))
    }

    pub fn jobs(&self) -> Result<Vec<Job>, BoardError> {
        Ok(self.repository.jobs()?)
    }

    pub fn jobs_for_recruiter(&self, recruiter_id: RecruiterId) -> Result<Vec<Job>, BoardError> {
        Ok(self.repository.jobs_for_recruiter(recruiter_id)?)
    }

    /// Apply to a job. The duplicate check and the insert share one store transaction.
    pub fn create_application(
        &self,
        actor: &Actor,
        job_id: JobId,
        cover_letter: Option<String>,
    ) -> Result<Application, BoardError> {
        let seeker_id = seeker_actor(actor, Action::Apply { job_id })?;
        self.insert_application(job_id, seeker_id, cover_letter, None)
    }

    /// Apply with a resume in a single step.
    ///
    /// The upload is validated and stored before the application row is inserted with the
    /// address already set, so no caller ever observes the application without it. If the
    /// insert is refused, the stored artifact is discarded again.
    pub fn create_application_with_resume(
        &self,
        actor: &Actor,
        job_id: JobId,
        cover_letter: Option<String>,
        upload: ResumeUpload,
    ) -> Result<Application, BoardError> {
        let format = upload.validate()?;
        let seeker_id = seeker_actor(actor, Action::Apply { job_id })?;

        let address = self.store_resume(seeker_id, format, upload.bytes)?;
        match self.insert_application(job_id, seeker_id, cover_letter, Some(address.clone())) {
            Ok(application) => Ok(application),
            Err(err) => {
                self.discard_quietly(&address);
                Err(err)
            }
        }
    }

    fn insert_application(
        &self,
        job_id: JobId,
        seeker_id: SeekerId,
        cover_letter: Option<String>,
        resume: Option<ArtifactAddress>,
    ) -> Result<Application, BoardError> {
        let outcome = self.repository.insert_application(NewApplication {
            job_id,
            seeker_id,
            cover_letter: normalize_cover_letter(cover_letter),
            resume,
            applied_at: self.clock.now(),
        });

        match outcome {
            Ok(application) => {
                info!(
                    application_id = %application.id,
                    %job_id,
                    %seeker_id,
                    with_resume = application.resume.is_some(),
                    "application created"
                );
                Ok(application)
            }
            Err(err) => {
                warn!(%job_id, %seeker_id, error = %err, "application refused");
                Err(err.into())
            }
        }
    }

    /// Store a resume for an application and point the application at it.
    ///
    /// Validation runs before any lookup. A replaced resume is discarded once the
    /// application references the new one.
    pub fn attach_resume(
        &self,
        actor: &Actor,
        application_id: ApplicationId,
        upload: ResumeUpload,
    ) -> Result<ArtifactAddress, BoardError> {
        let format = upload.validate().inspect_err(|err| {
            warn!(%application_id, error = %err, "resume rejected");
        })?;

        let application = self.load_application(application_id)?;
        if actor.seeker_id() != Some(application.seeker_id) {
            return Err(BoardError::Unauthorized {
                actor: *actor,
                action: Action::AttachResume { application_id },
            });
        }
        if !application.status.is_active() {
            return Err(BoardError::Closed { application_id });
        }

        // Withdrawals landing from here on are caught by the store as `Closed`.
        let address = self.store_resume(application.seeker_id, format, upload.bytes)?;
        match self
            .repository
            .set_application_resume(application_id, address.clone())
        {
            Ok(previous) => {
                if let Some(previous) = previous.filter(|previous| *previous != address) {
                    self.discard_quietly(&previous);
                }
                info!(%application_id, %address, "resume attached");
                Ok(address)
            }
            Err(err) => {
                self.discard_quietly(&address);
                Err(err.into())
            }
        }
    }

    pub fn fetch_resume(&self, address: &ArtifactAddress) -> Result<StoredArtifact, BoardError> {
        self.artifacts
            .fetch(address)?
            .ok_or_else(|| BoardError::not_found(EntityKind::Resume, address))
    }

    /// Write the artifact under a freshly minted address, minting again if one is taken.
    fn store_resume(
        &self,
        seeker_id: SeekerId,
        format: ResumeFormat,
        bytes: Vec<u8>,
    ) -> Result<ArtifactAddress, BoardError> {
        let artifact = StoredArtifact {
            mime: format.mime().to_string(),
            bytes,
        };
        for _ in 0..MAX_ADDRESS_ATTEMPTS {
            let address = mint_address(seeker_id, format, self.clock.now());
            match self.artifacts.put(&address, &artifact) {
                Ok(()) => return Ok(address),
                Err(ArtifactError::AddressTaken { .. }) => {
                    warn!(%seeker_id, %address, "resume address already taken; minting another");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(BoardError::Artifact(ArtifactError::Unavailable(format!(
            "no free resume address for {seeker_id} after {MAX_ADDRESS_ATTEMPTS} attempts"
        ))))
    }

    fn discard_quietly(&self, address: &ArtifactAddress) {
        if let Err(err) = self.artifacts.discard(address) {
            warn!(%address, error = %err, "failed to discard resume artifact");
        }
    }

    pub fn check_has_applied(&self, job_id: JobId, seeker_id: SeekerId) -> Result<bool, BoardError> {
        Ok(guard::has_active_application(
            self.repository.as_ref(),
            job_id,
            seeker_id,
        )?)
    }

    /// Move an application to `to` on behalf of `actor`.
    ///
    /// Checks run as not-found, then terminal status, then authority, then legality, so a
    /// withdrawn application refuses every actor with `InvalidTransition`. The write is a
    /// compare-and-set; when another request changed the status first, the request is
    /// evaluated again against the status it lost to.
    pub fn transition_status(
        &self,
        application_id: ApplicationId,
        to: ApplicationStatus,
        actor: &Actor,
    ) -> Result<Application, BoardError> {
        let application = self.load_application(application_id)?;
        if application.status.is_terminal() {
            let err = BoardError::InvalidTransition {
                from: application.status,
                to,
            };
            warn!(%application_id, error = %err, "status change refused");
            return Err(err);
        }
        let owner = self
            .repository
            .job(application.job_id)?
            .map(|job| job.recruiter_id);
        lifecycle::authorize(actor, &application, owner, to).inspect_err(|err| {
            warn!(%application_id, error = %err, "status change refused");
        })?;

        let mut current = application.status;
        for _ in 0..MAX_STATUS_ATTEMPTS {
            current.transition(to).inspect_err(|err| {
                warn!(%application_id, error = %err, "status change refused");
            })?;

            match self
                .repository
                .set_application_status(application_id, current, to)
            {
                Ok(updated) => {
                    info!(%application_id, from = %current, %to, %actor, "application status changed");
                    return Ok(updated);
                }
                Err(StoreError::StatusChanged { current: latest, .. }) => current = latest,
                Err(err) => return Err(err.into()),
            }
        }

        Err(BoardError::Storage(StoreError::Unavailable(format!(
            "{application_id} kept changing status; gave up after {MAX_STATUS_ATTEMPTS} attempts"
        ))))
    }

    fn load_application(&self, application_id: ApplicationId) -> Result<Application, BoardError> {
        self.repository
            .application(application_id)?
            .ok_or_else(|| BoardError::not_found(EntityKind::Application, application_id))
    }

    /// List applications newest first, each joined with its job when the job still exists.
    pub fn list_applications(
        &self,
        query: ApplicationQuery,
    ) -> Result<Vec<ApplicationDetails>, BoardError> {
        let applications = match query {
            ApplicationQuery::ByJob(job_id) => self.repository.applications_for_job(job_id)?,
            ApplicationQuery::BySeeker(seeker_id) => {
                self.repository.applications_for_seeker(seeker_id)?
            }
            ApplicationQuery::ByRecruiter(recruiter_id) => {
                self.repository.applications_for_recruiter(recruiter_id)?
            }
            ApplicationQuery::ByStatus(status) => self.repository.applications_with_status(status)?,
            ApplicationQuery::ByJobAndStatus(job_id, status) => self
                .repository
                .applications_for_job(job_id)?
                .into_iter()
                .filter(|application| application.status == status)
                .collect(),
        };

        let mut jobs: HashMap<JobId, Option<Job>> = HashMap::new();
        applications
            .into_iter()
            .map(|application| -> Result<ApplicationDetails, BoardError> {
                let job = match jobs.get(&application.job_id) {
                    Some(cached) => cached.clone(),
                    None => {
                        let fetched = self.repository.job(application.job_id)?;
                        jobs.insert(application.job_id, fetched.clone());
                        fetched
                    }
                };
                Ok(ApplicationDetails { application, job })
            })
            .collect()
    }

    pub fn application(
        &self,
        application_id: ApplicationId,
    ) -> Result<ApplicationDetails, BoardError> {
        let application = self.load_application(application_id)?;
        let job = self.repository.job(application.job_id)?;
        Ok(ApplicationDetails { application, job })
    }

    /// Number of applications referencing the job, withdrawn ones included.
    pub fn count_applications(&self, job_id: JobId) -> Result<usize, BoardError> {
        Ok(self.repository.applications_for_job(job_id)?.len())
    }

    /// Applications in `status` across every job the recruiter posted.
    pub fn count_recruiter_applications(
        &self,
        recruiter_id: RecruiterId,
        status: ApplicationStatus,
    ) -> Result<usize, BoardError> {
        Ok(self
            .repository
            .applications_for_recruiter(recruiter_id)?
            .iter()
            .filter(|application| application.status == status)
            .count())
    }

    pub fn save_job(&self, actor: &Actor, job_id: JobId) -> Result<SavedJob, BoardError> {
        let seeker_id = seeker_actor(actor, Action::SaveJob { job_id })?;
        let saved = self
            .repository
            .insert_saved_job(job_id, seeker_id, self.clock.now())?;
        info!(saved_job_id = %saved.id, %job_id, %seeker_id, "job saved");
        Ok(saved)
    }

    pub fn unsave_job(&self, actor: &Actor, job_id: JobId) -> Result<SavedJob, BoardError> {
        let seeker_id = seeker_actor(actor, Action::SaveJob { job_id })?;
        let removed = self.repository.delete_saved_job(job_id, seeker_id)?;
        info!(saved_job_id = %removed.id, %job_id, %seeker_id, "job unsaved");
        Ok(removed)
    }

    pub fn is_job_saved(&self, job_id: JobId, seeker_id: SeekerId) -> Result<bool, BoardError> {
        Ok(self
            .repository
            .saved_jobs_for_seeker(seeker_id)?
            .iter()
            .any(|saved| saved.job_id == job_id))
    }

    pub fn saved_job_count(&self, seeker_id: SeekerId) -> Result<usize, BoardError> {
        Ok(self.repository.saved_jobs_for_seeker(seeker_id)?.len())
    }

    /// Seekers who bookmarked the job, most recent bookmark first.
    pub fn seekers_who_saved(&self, job_id: JobId) -> Result<Vec<Seeker>, BoardError> {
        let mut seekers = Vec::new();
        for saved in self.repository.saved_jobs_for_job(job_id)? {
            match self.repository.seeker(saved.seeker_id)? {
                Some(seeker) => seekers.push(seeker),
                None => warn!(
                    saved_job_id = %saved.id,
                    seeker_id = %saved.seeker_id,
                    "bookmark without seeker"
                ),
            }
        }
        Ok(seekers)
    }

    /// Drop every bookmark the seeker holds. Only that seeker may do this.
    pub fn unsave_all(
        &self,
        actor: &Actor,
        seeker_id: SeekerId,
    ) -> Result<Vec<SavedJob>, BoardError> {
        if actor.seeker_id() != Some(seeker_id) {
            return Err(BoardError::Unauthorized {
                actor: *actor,
                action: Action::ClearSavedJobs { seeker_id },
            });
        }
        let removed = self.repository.delete_saved_jobs_for_seeker(seeker_id)?;
        info!(%seeker_id, removed = removed.len(), "saved jobs cleared");
        Ok(removed)
    }

    pub fn saved_jobs(&self, seeker_id: SeekerId) -> Result<Vec<SavedJobDetails>, BoardError> {
        self.repository
            .saved_jobs_for_seeker(seeker_id)?
            .into_iter()
            .map(|saved_job| -> Result<SavedJobDetails, BoardError> {
                let job = self.repository.job(saved_job.job_id)?;
                Ok(SavedJobDetails { saved_job, job })
            })
            .collect()
    }

    pub fn delete_job(
        &self,
        actor: &Actor,
        job_id: JobId,
        force_cascade: bool,
    ) -> Result<JobRemoval, BoardError> {
        IntegrityResolver::new(self.repository.as_ref()).delete_job(actor, job_id, force_cascade)
    }
}
