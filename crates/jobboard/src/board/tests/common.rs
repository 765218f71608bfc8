use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::board::{
    board_router, Actor, Application, ApplicationId, ApplicationStatus, ArtifactAddress,
    ArtifactError, ArtifactStore, BoardRepository, BoardTables, Clock, Ephemeral, ExperienceLevel, HiringService, Job, JobId,
    JobPurge, JobType, LocalRepository, MemoryArtifactStore, NewApplication, NewJob,
    NewRecruiter, NewSeeker, Persistence, Profile, Recruiter, RecruiterId, RecruiterProfile,
    ResumeUpload, SavedJob, Seeker, SeekerId, StoreError, StoredArtifact,
};

pub(super) const PDF: &str = "application/pdf";

pub(super) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Advances by `step` every time it is read.
pub(super) struct SteppingClock {
    next: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    pub(super) fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().expect("clock mutex poisoned");
        let now = *next;
        *next = now + self.step;
        now
    }
}

pub(super) struct FixedClock(pub(super) DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Persistence that can be told to fail its next commit.
#[derive(Debug, Default)]
pub(super) struct FlakyPersistence {
    armed: AtomicBool,
    commits: AtomicUsize,
}

impl FlakyPersistence {
    pub(super) fn fail_next_commit(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub(super) fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl Persistence for FlakyPersistence {
    fn commit(&self, _tables: &BoardTables) -> Result<(), StoreError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "disk full while writing snapshot".to_string(),
            ));
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(super) type TestRepository = LocalRepository<FlakyPersistence>;
pub(super) type TestService = HiringService<TestRepository, MemoryArtifactStore>;

/// Service over a fresh store, seeded with one recruiter, one seeker, and one job.
pub(super) struct Board {
    pub(super) service: Arc<TestService>,
    pub(super) repository: Arc<TestRepository>,
    pub(super) artifacts: Arc<MemoryArtifactStore>,
    pub(super) recruiter: Recruiter,
    pub(super) seeker: Seeker,
    pub(super) job: Job,
}

impl Board {
    pub(super) fn recruiter_actor(&self) -> Actor {
        Actor::Recruiter(self.recruiter.id)
    }

    pub(super) fn seeker_actor(&self) -> Actor {
        Actor::Seeker(self.seeker.id)
    }

    pub(super) fn add_seeker(&self, name: &str) -> Seeker {
        self.service
            .register_seeker(new_seeker(name))
            .expect("seeker registers")
    }

    pub(super) fn add_recruiter(&self, name: &str) -> Recruiter {
        self.service
            .register_recruiter(new_recruiter(name))
            .expect("recruiter registers")
    }

    pub(super) fn apply(&self) -> Application {
        self.service
            .create_application(&self.seeker_actor(), self.job.id, None)
            .expect("application created")
    }

    pub(super) fn router(&self) -> axum::Router {
        board_router(self.service.clone())
    }
}

pub(super) fn board() -> Board {
    board_with_clock(Arc::new(SteppingClock::new(epoch(), Duration::minutes(1))))
}

pub(super) fn board_with_clock(clock: Arc<dyn Clock>) -> Board {
    let repository = Arc::new(LocalRepository::with_persistence(
        FlakyPersistence::default(),
    ));
    let artifacts = Arc::new(MemoryArtifactStore::default());
    let service = Arc::new(HiringService::with_clock(
        repository.clone(),
        artifacts.clone(),
        clock,
    ));

    let recruiter = service
        .register_recruiter(new_recruiter("Rhea"))
        .expect("recruiter registers");
    let seeker = service
        .register_seeker(new_seeker("Sam"))
        .expect("seeker registers");
    let job = service
        .post_job(&Actor::Recruiter(recruiter.id), new_job("Platform Engineer"))
        .expect("job posted");

    Board {
        service,
        repository,
        artifacts,
        recruiter,
        seeker,
        job,
    }
}

pub(super) fn new_seeker(name: &str) -> NewSeeker {
    NewSeeker {
        name: name.to_string(),
        email: format!("{}@seekers.example", name.to_ascii_lowercase()),
        credential_hash: "$argon2id$v=19$seeker".to_string(),
        phone: None,
    }
}

pub(super) fn new_recruiter(name: &str) -> NewRecruiter {
    NewRecruiter {
        name: name.to_string(),
        email: format!("{}@hiring.example", name.to_ascii_lowercase()),
        credential_hash: "$argon2id$v=19$recruiter".to_string(),
        company: Some("Northwind".to_string()),
    }
}

pub(super) fn new_job(title: &str) -> NewJob {
    NewJob {
        title: title.to_string(),
        company: "Northwind".to_string(),
        location: "Remote".to_string(),
        description: "Own the deployment pipeline.".to_string(),
        salary_range: Some("120k-140k".to_string()),
        job_type: JobType::FullTime,
        experience_level: ExperienceLevel::Senior,
    }
}

pub(super) fn new_application(job_id: JobId, seeker_id: SeekerId, at: DateTime<Utc>) -> NewApplication {
    NewApplication {
        job_id,
        seeker_id,
        cover_letter: None,
        resume: None,
        applied_at: at,
    }
}

pub(super) fn upload(mime: &str, len: usize) -> ResumeUpload {
    ResumeUpload::new(mime, vec![0x25; len])
}

pub(super) fn mib(count: usize) -> usize {
    count * 1024 * 1024
}

pub(super) fn request(
    method: &str,
    uri: &str,
    actor: Option<Actor>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        let (role, id) = match actor {
            Actor::Seeker(id) => ("seeker", id.0),
            Actor::Recruiter(id) => ("recruiter", id.0),
        };
        builder = builder
            .header("x-actor-role", role)
            .header("x-actor-id", id.to_string());
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Artifact store that reports its first `taken` addresses as already occupied.
#[derive(Default)]
pub(super) struct CrowdedArtifactStore {
    pub(super) inner: MemoryArtifactStore,
    taken: AtomicUsize,
    pub(super) refused: Mutex<Vec<ArtifactAddress>>,
}

impl CrowdedArtifactStore {
    pub(super) fn taking(taken: usize) -> Self {
        Self {
            taken: AtomicUsize::new(taken),
            ..Self::default()
        }
    }
}

impl ArtifactStore for CrowdedArtifactStore {
    fn put(
        &self,
        address: &ArtifactAddress,
        artifact: &StoredArtifact,
    ) -> Result<(), ArtifactError> {
        let occupied = self
            .taken
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if occupied {
            self.refused
                .lock()
                .expect("refused mutex poisoned")
                .push(address.clone());
            return Err(ArtifactError::AddressTaken {
                address: address.to_string(),
            });
        }
        self.inner.put(address, artifact)
    }

    fn fetch(&self, address: &ArtifactAddress) -> Result<Option<StoredArtifact>, ArtifactError> {
        self.inner.fetch(address)
    }

    fn discard(&self, address: &ArtifactAddress) -> Result<(), ArtifactError> {
        self.inner.discard(address)
    }
}

/// Store whose every call fails as if the backing database were down.
pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("database offline".to_string()))
}

impl BoardRepository for UnavailableRepository {
    fn insert_seeker(&self, _seeker: NewSeeker) -> Result<Seeker, StoreError> {
        offline()
    }
    fn seeker(&self, _id: SeekerId) -> Result<Option<Seeker>, StoreError> {
        offline()
    }
    fn insert_recruiter(&self, _recruiter: NewRecruiter) -> Result<Recruiter, StoreError> {
        offline()
    }
    fn recruiter(&self, _id: RecruiterId) -> Result<Option<Recruiter>, StoreError> {
        offline()
    }
    fn upsert_profile(
        &self,
        _seeker_id: SeekerId,
        _attributes: BTreeMap<String, String>,
        _updated_at: DateTime<Utc>,
    ) -> Result<Profile, StoreError> {
        offline()
    }
    fn profile_for_seeker(&self, _seeker_id: SeekerId) -> Result<Option<Profile>, StoreError> {
        offline()
    }
    fn upsert_recruiter_profile(
        &self,
        _recruiter_id: RecruiterId,
        _attributes: BTreeMap<String, String>,
        _updated_at: DateTime<Utc>,
    ) -> Result<RecruiterProfile, StoreError> {
        offline()
    }
    fn recruiter_profile(
        &self,
        _recruiter_id: RecruiterId,
    ) -> Result<Option<RecruiterProfile>, StoreError> {
        offline()
    }
    fn insert_job(
        &self,
        _recruiter_id: RecruiterId,
        _job: NewJob,
        _posted_at: DateTime<Utc>,
    ) -> Result<Job, StoreError> {
        offline()
    }
    fn job(&self, _id: JobId) -> Result<Option<Job>, StoreError> {
        offline()
    }
    fn jobs(&self) -> Result<Vec<Job>, StoreError> {
        offline()
    }
    fn jobs_for_recruiter(&self, _recruiter_id: RecruiterId) -> Result<Vec<Job>, StoreError> {
        offline()
    }
    fn delete_job(&self, _id: JobId) -> Result<Job, StoreError> {
        offline()
    }
    fn purge_job(&self, _id: JobId) -> Result<JobPurge, StoreError> {
        offline()
    }
    fn insert_application(&self, _application: NewApplication) -> Result<Application, StoreError> {
        offline()
    }
    fn application(&self, _id: ApplicationId) -> Result<Option<Application>, StoreError> {
        offline()
    }
    fn active_application(
        &self,
        _job_id: JobId,
        _seeker_id: SeekerId,
    ) -> Result<Option<Application>, StoreError> {
        offline()
    }
    fn applications_for_job(&self, _job_id: JobId) -> Result<Vec<Application>, StoreError> {
        offline()
    }
    fn applications_for_seeker(&self, _seeker_id: SeekerId) -> Result<Vec<Application>, StoreError> {
        offline()
    }
    fn applications_for_recruiter(
        &self,
        _recruiter_id: RecruiterId,
    ) -> Result<Vec<Application>, StoreError> {
        offline()
    }
    fn applications_with_status(
        &self,
        _status: ApplicationStatus,
    ) -> Result<Vec<Application>, StoreError> {
        offline()
    }
    fn set_application_status(
        &self,
        _id: ApplicationId,
        _expected: ApplicationStatus,
        _next: ApplicationStatus,
    ) -> Result<Application, StoreError> {
        offline()
    }
    fn set_application_resume(
        &self,
        _id: ApplicationId,
        _resume: ArtifactAddress,
    ) -> Result<Option<ArtifactAddress>, StoreError> {
        offline()
    }
    fn insert_saved_job(
        &self,
        _job_id: JobId,
        _seeker_id: SeekerId,
        _saved_at: DateTime<Utc>,
    ) -> Result<SavedJob, StoreError> {
        offline()
    }
    fn delete_saved_job(&self, _job_id: JobId, _seeker_id: SeekerId) -> Result<SavedJob, StoreError> {
        offline()
    }
    fn saved_jobs_for_seeker(&self, _seeker_id: SeekerId) -> Result<Vec<SavedJob>, StoreError> {
        offline()
    }
    fn saved_jobs_for_job(&self, _job_id: JobId) -> Result<Vec<SavedJob>, StoreError> {
        offline()
    }
    fn delete_saved_jobs_for_seeker(
        &self,
        _seeker_id: SeekerId,
    ) -> Result<Vec<SavedJob>, StoreError> {
        offline()
    }
}

/// Wraps an in-memory store and lets a competing status change land just before the
/// next compare-and-set or resume update issued through it.
#[derive(Default)]
pub(super) struct InterleavingRepository {
    pub(super) inner: LocalRepository<Ephemeral>,
    interloper: Mutex<Option<ApplicationStatus>>,
    withdraw_before_resume: AtomicBool,
}

impl InterleavingRepository {
    pub(super) fn race_next_transition_with(&self, status: ApplicationStatus) {
        *self.interloper.lock().expect("interloper mutex poisoned") = Some(status);
    }

    pub(super) fn withdraw_before_next_resume(&self) {
        self.withdraw_before_resume.store(true, Ordering::SeqCst);
    }
}

impl BoardRepository for InterleavingRepository {
    fn insert_seeker(&self, seeker: NewSeeker) -> Result<Seeker, StoreError> {
        self.inner.insert_seeker(seeker)
    }
    fn seeker(&self, id: SeekerId) -> Result<Option<Seeker>, StoreError> {
        self.inner.seeker(id)
    }
    fn insert_recruiter(&self, recruiter: NewRecruiter) -> Result<Recruiter, StoreError> {
        self.inner.insert_recruiter(recruiter)
    }
    fn recruiter(&self, id: RecruiterId) -> Result<Option<Recruiter>, StoreError> {
        self.inner.recruiter(id)
    }
    fn upsert_profile(
        &self,
        seeker_id: SeekerId,
        attributes: BTreeMap<String, String>,
        updated_at: DateTime<Utc>,
    ) -> Result<Profile, StoreError> {
        self.inner.upsert_profile(seeker_id, attributes, updated_at)
    }
    fn profile_for_seeker(&self, seeker_id: SeekerId) -> Result<Option<Profile>, StoreError> {
        self.inner.profile_for_seeker(seeker_id)
    }
    fn upsert_recruiter_profile(
        &self,
        recruiter_id: RecruiterId,
        attributes: BTreeMap<String, String>,
        updated_at: DateTime<Utc>,
    ) -> Result<RecruiterProfile, StoreError> {
        self.inner
            .upsert_recruiter_profile(recruiter_id, attributes, updated_at)
    }
    fn recruiter_profile(
        &self,
        recruiter_id: RecruiterId,
    ) -> Result<Option<RecruiterProfile>, StoreError> {
        self.inner.recruiter_profile(recruiter_id)
    }
    fn insert_job(
        &self,
        recruiter_id: RecruiterId,
        job: NewJob,
        posted_at: DateTime<Utc>,
    ) -> Result<Job, StoreError> {
        self.inner.insert_job(recruiter_id, job, posted_at)
    }
    fn job(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        self.inner.job(id)
    }
    fn jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.inner.jobs()
    }
    fn jobs_for_recruiter(&self, recruiter_id: RecruiterId) -> Result<Vec<Job>, StoreError> {
        self.inner.jobs_for_recruiter(recruiter_id)
    }
    fn delete_job(&self, id: JobId) -> Result<Job, StoreError> {
        self.inner.delete_job(id)
    }
    fn purge_job(&self, id: JobId) -> Result<JobPurge, StoreError> {
        self.inner.purge_job(id)
    }
    fn insert_application(&self, application: NewApplication) -> Result<Application, StoreError> {
        self.inner.insert_application(application)
    }
    fn application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError> {
        self.inner.application(id)
    }
    fn active_application(
        &self,
        job_id: JobId,
        seeker_id: SeekerId,
    ) -> Result<Option<Application>, StoreError> {
        self.inner.active_application(job_id, seeker_id)
    }
    fn applications_for_job(&self, job_id: JobId) -> Result<Vec<Application>, StoreError> {
        self.inner.applications_for_job(job_id)
    }
    fn applications_for_seeker(&self, seeker_id: SeekerId) -> Result<Vec<Application>, StoreError> {
        self.inner.applications_for_seeker(seeker_id)
    }
    fn applications_for_recruiter(
        &self,
        recruiter_id: RecruiterId,
    ) -> Result<Vec<Application>, StoreError> {
        self.inner.applications_for_recruiter(recruiter_id)
    }
    fn applications_with_status(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<Application>, StoreError> {
        self.inner.applications_with_status(status)
    }
    fn set_application_status(
        &self,
        id: ApplicationId,
        expected: ApplicationStatus,
        next: ApplicationStatus,
    ) -> Result<Application, StoreError> {
        let competing = self
            .interloper
            .lock()
            .expect("interloper mutex poisoned")
            .take();
        if let Some(competing) = competing {
            self.inner.set_application_status(id, expected, competing)?;
        }
        self.inner.set_application_status(id, expected, next)
    }
    fn set_application_resume(
        &self,
        id: ApplicationId,
        resume: ArtifactAddress,
    ) -> Result<Option<ArtifactAddress>, StoreError> {
        if self.withdraw_before_resume.swap(false, Ordering::SeqCst) {
            self.inner.set_application_status(
                id,
                ApplicationStatus::Pending,
                ApplicationStatus::Withdrawn,
            )?;
        }
        self.inner.set_application_resume(id, resume)
    }
    fn insert_saved_job(
        &self,
        job_id: JobId,
        seeker_id: SeekerId,
        saved_at: DateTime<Utc>,
    ) -> Result<SavedJob, StoreError> {
        self.inner.insert_saved_job(job_id, seeker_id, saved_at)
    }
    fn delete_saved_job(&self, job_id: JobId, seeker_id: SeekerId) -> Result<SavedJob, StoreError> {
        self.inner.delete_saved_job(job_id, seeker_id)
    }
    fn saved_jobs_for_seeker(&self, seeker_id: SeekerId) -> Result<Vec<SavedJob>, StoreError> {
        self.inner.saved_jobs_for_seeker(seeker_id)
    }
    fn saved_jobs_for_job(&self, job_id: JobId) -> Result<Vec<SavedJob>, StoreError> {
        self.inner.saved_jobs_for_job(job_id)
    }
    fn delete_saved_jobs_for_seeker(
        &self,
        seeker_id: SeekerId,
    ) -> Result<Vec<SavedJob>, StoreError> {
        self.inner.delete_saved_jobs_for_seeker(seeker_id)
    }
}
