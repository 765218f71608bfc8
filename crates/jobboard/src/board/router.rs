use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::artifacts::{ArtifactStore, ResumeUpload, MAX_RESUME_BYTES};
use super::domain::{
    AccountView, Actor, ApplicationId, ApplicationQuery, ApplicationStatus, ArtifactAddress,
    JobId, NewJob, NewRecruiter, NewSeeker, RecruiterId, SeekerId,
};
use super::error::{BoardError, ValidationError};
use super::repository::{BoardRepository, StoreError};
use super::service::HiringService;

pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

type SharedService<R, A> = State<Arc<HiringService<R, A>>>;

/// Router builder exposing the hiring operations as JSON endpoints.
pub fn board_router<R, A>(service: Arc<HiringService<R, A>>) -> Router
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    // Leave room above the resume limit so oversized uploads reach validation.
    let resume_body_limit = usize::try_from(MAX_RESUME_BYTES * 2).unwrap_or(usize::MAX);

    Router::new()
        .route("/api/seekers", post(register_seeker_handler::<R, A>))
        .route("/api/recruiters", post(register_recruiter_handler::<R, A>))
        .route(
            "/api/seekers/:seeker_id/profile",
            get(profile_handler::<R, A>).put(upsert_profile_handler::<R, A>),
        )
        .route(
            "/api/seekers/:seeker_id/profile/exists",
            get(profile_exists_handler::<R, A>),
        )
        .route(
            "/api/recruiters/:recruiter_id/profile",
            get(recruiter_profile_handler::<R, A>).put(upsert_recruiter_profile_handler::<R, A>),
        )
        .route(
            "/api/jobs",
            get(list_jobs_handler::<R, A>).post(post_job_handler::<R, A>),
        )
        .route(
            "/api/jobs/:job_id",
            get(job_handler::<R, A>).delete(delete_job_handler::<R, A>),
        )
        .route(
            "/api/jobs/recruiter/:recruiter_id",
            get(recruiter_jobs_handler::<R, A>),
        )
        .route("/api/applications", post(apply_handler::<R, A>))
        .route(
            "/api/applications/upload",
            post(apply_with_resume_handler::<R, A>)
                .layer(DefaultBodyLimit::max(resume_body_limit)),
        )
        .route(
            "/api/applications/status/:status",
            get(status_applications_handler::<R, A>),
        )
        .route(
            "/api/applications/:application_id",
            get(application_handler::<R, A>),
        )
        .route(
            "/api/applications/:application_id/status",
            put(transition_handler::<R, A>),
        )
        .route(
            "/api/applications/:application_id/resume",
            put(attach_resume_handler::<R, A>).layer(DefaultBodyLimit::max(resume_body_limit)),
        )
        .route(
            "/api/applications/check/:job_id/:seeker_id",
            get(has_applied_handler::<R, A>),
        )
        .route(
            "/api/applications/job/:job_id",
            get(job_applications_handler::<R, A>),
        )
        .route(
            "/api/applications/job/:job_id/count",
            get(count_applications_handler::<R, A>),
        )
        .route(
            "/api/applications/job/:job_id/status/:status",
            get(job_status_applications_handler::<R, A>),
        )
        .route(
            "/api/applications/seeker/:seeker_id",
            get(seeker_applications_handler::<R, A>),
        )
        .route(
            "/api/applications/recruiter/:recruiter_id",
            get(recruiter_applications_handler::<R, A>),
        )
        .route(
            "/api/applications/recruiter/:recruiter_id/status/:status/count",
            get(count_recruiter_applications_handler::<R, A>),
        )
        .route("/api/saved-jobs", post(save_job_handler::<R, A>))
        .route(
            "/api/saved-jobs/:job_id",
            axum::routing::delete(unsave_job_handler::<R, A>),
        )
        .route(
            "/api/saved-jobs/check/:job_id/:seeker_id",
            get(is_saved_handler::<R, A>),
        )
        .route(
            "/api/saved-jobs/seeker/:seeker_id",
            get(saved_jobs_handler::<R, A>),
        )
        .route(
            "/api/saved-jobs/count/:seeker_id",
            get(saved_job_count_handler::<R, A>),
        )
        .route(
            "/api/saved-jobs/job/:job_id/seekers",
            get(job_savers_handler::<R, A>),
        )
        .route(
            "/api/saved-jobs/bulk/:seeker_id",
            axum::routing::delete(unsave_all_handler::<R, A>),
        )
        .route("/api/artifacts/*address", get(artifact_handler::<R, A>))
        .with_state(service)
}

/// Failure surfaced by a board endpoint.
#[derive(Debug)]
pub enum ApiError {
    /// Actor headers missing or malformed.
    Unauthenticated(String),
    Board(BoardError),
}

impl From<BoardError> for ApiError {
    fn from(value: BoardError) -> Self {
        ApiError::Board(value)
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        ApiError::Board(BoardError::Validation(value))
    }
}

/// HTTP status for each error family.
pub fn status_for(err: &BoardError) -> StatusCode {
    match err {
        BoardError::NotFound { .. } => StatusCode::NOT_FOUND,
        BoardError::Duplicate(_) | BoardError::HasDependents { .. } | BoardError::Closed { .. } => {
            StatusCode::CONFLICT
        }
        BoardError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        BoardError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        BoardError::Validation(ValidationError::UnsupportedFileType { .. }) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        BoardError::Validation(ValidationError::FileTooLarge { .. }) => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        BoardError::Validation(_) => StatusCode::BAD_REQUEST,
        BoardError::Storage(_) | BoardError::Artifact(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn details_for(err: &BoardError) -> Value {
    match err {
        BoardError::NotFound { entity, key } => json!({ "entity": entity, "key": key }),
        BoardError::Duplicate(kind) => serde_json::to_value(kind).unwrap_or(Value::Null),
        BoardError::InvalidTransition { from, to } => json!({ "from": from, "to": to }),
        BoardError::Unauthorized { actor, action } => json!({ "actor": actor, "action": action }),
        BoardError::Validation(ValidationError::FileTooLarge { size, limit }) => {
            json!({ "size": size, "limit": limit })
        }
        BoardError::Validation(ValidationError::UnsupportedFileType { declared }) => {
            json!({ "declared": declared })
        }
        BoardError::Validation(ValidationError::MissingField { field }) => {
            json!({ "field": field })
        }
        BoardError::HasDependents { job_id, saved_jobs } => {
            json!({ "job_id": job_id, "saved_jobs": saved_jobs })
        }
        BoardError::Closed { application_id } => json!({ "application_id": application_id }),
        BoardError::Validation(ValidationError::UnknownStatus { .. })
        | BoardError::Storage(_)
        | BoardError::Artifact(_) => Value::Null,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthenticated(reason) => {
                let payload = json!({
                    "error": "unauthenticated",
                    "message": reason,
                });
                (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
            }
            ApiError::Board(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    error!(error = %err, "board operation failed");
                }
                let payload = json!({
                    "error": err.code(),
                    "message": err.to_string(),
                    "details": details_for(&err),
                });
                (status, Json(payload)).into_response()
            }
        }
    }
}

/// Resolve the calling actor from the session headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let role = header_text(ACTOR_ROLE_HEADER)
        .ok_or_else(|| ApiError::Unauthenticated(format!("missing {ACTOR_ROLE_HEADER} header")))?;
    let id: u64 = header_text(ACTOR_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthenticated(format!("missing {ACTOR_ID_HEADER} header")))?
        .parse()
        .map_err(|_| ApiError::Unauthenticated(format!("{ACTOR_ID_HEADER} must be numeric")))?;

    match role.to_ascii_lowercase().as_str() {
        "seeker" => Ok(Actor::Seeker(SeekerId(id))),
        "recruiter" => Ok(Actor::Recruiter(RecruiterId(id))),
        other => Err(ApiError::Unauthenticated(format!(
            "unknown actor role '{other}'"
        ))),
    }
}

/// Run a service call on the blocking pool; store commits and artifact writes touch disk.
async fn run_blocking<R, A, T>(
    service: Arc<HiringService<R, A>>,
    work: impl FnOnce(&HiringService<R, A>) -> Result<T, BoardError> + Send + 'static,
) -> Result<T, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
    T: Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || work(&service))
        .await
        .map_err(|err| {
            BoardError::Storage(StoreError::Unavailable(format!(
                "board task did not complete: {err}"
            )))
        })?;
    Ok(outcome?)
}

fn declared_mime(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub job_id: JobId,
    #[serde(default)]
    pub cover_letter: Option<String>,
}

/// Query string of a one-step application whose body is the resume itself.
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub job_id: JobId,
    #[serde(default)]
    pub cover_letter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveJobRequest {
    pub job_id: JobId,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteJobParams {
    #[serde(default)]
    pub force: bool,
}

pub(crate) async fn register_seeker_handler<R, A>(
    State(service): SharedService<R, A>,
    Json(seeker): Json<NewSeeker>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let seeker = run_blocking(service, move |service| service.register_seeker(seeker)).await?;
    Ok((StatusCode::CREATED, Json(AccountView::from(&seeker))).into_response())
}

pub(crate) async fn register_recruiter_handler<R, A>(
    State(service): SharedService<R, A>,
    Json(recruiter): Json<NewRecruiter>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let recruiter =
        run_blocking(service, move |service| service.register_recruiter(recruiter)).await?;
    Ok((StatusCode::CREATED, Json(AccountView::from(&recruiter))).into_response())
}

pub(crate) async fn profile_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(seeker_id): Path<SeekerId>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    Ok(Json(service.profile(seeker_id)?).into_response())
}

pub(crate) async fn upsert_profile_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(seeker_id): Path<SeekerId>,
    headers: HeaderMap,
    Json(attributes): Json<BTreeMap<String, String>>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let profile = run_blocking(service, move |service| {
        service.upsert_profile(&actor, seeker_id, attributes)
    })
    .await?;
    Ok(Json(profile).into_response())
}

pub(crate) async fn profile_exists_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(seeker_id): Path<SeekerId>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let exists = service.check_profile_exists(seeker_id)?;
    Ok(Json(json!({ "seeker_id": seeker_id, "exists": exists })).into_response())
}

pub(crate) async fn recruiter_profile_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(recruiter_id): Path<RecruiterId>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    Ok(Json(service.recruiter_profile(recruiter_id)?).into_response())
}

pub(crate) async fn upsert_recruiter_profile_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(recruiter_id): Path<RecruiterId>,
    headers: HeaderMap,
    Json(attributes): Json<BTreeMap<String, String>>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let profile = run_blocking(service, move |service| {
        service.upsert_recruiter_profile(&actor, recruiter_id, attributes)
    })
    .await?;
    Ok(Json(profile).into_response())
}

pub(crate) async fn list_jobs_handler<R, A>(
    State(service): SharedService<R, A>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    Ok(Json(service.jobs()?).into_response())
}

pub(crate) async fn post_job_handler<R, A>(
    State(service): SharedService<R, A>,
    headers: HeaderMap,
    Json(job): Json<NewJob>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let job = run_blocking(service, move |service| service.post_job(&actor, job)).await?;
    Ok((StatusCode::CREATED, Json(job)).into_response())
}

pub(crate) async fn job_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(job_id): Path<JobId>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    Ok(Json(service.job(job_id)?).into_response())
}

pub(crate) async fn delete_job_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(job_id): Path<JobId>,
    Query(params): Query<DeleteJobParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let removal = run_blocking(service, move |service| {
        service.delete_job(&actor, job_id, params.force)
    })
    .await?;
    Ok(Json(removal).into_response())
}

pub(crate) async fn recruiter_jobs_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(recruiter_id): Path<RecruiterId>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    Ok(Json(service.jobs_for_recruiter(recruiter_id)?).into_response())
}

pub(crate) async fn apply_handler<R, A>(
    State(service): SharedService<R, A>,
    headers: HeaderMap,
    Json(request): Json<ApplyRequest>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let application = run_blocking(service, move |service| {
        service.create_application(&actor, request.job_id, request.cover_letter)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(application)).into_response())
}

pub(crate) async fn apply_with_resume_handler<R, A>(
    State(service): SharedService<R, A>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let upload = ResumeUpload::new(declared_mime(&headers), body.to_vec());
    let UploadParams {
        job_id,
        cover_letter,
    } = params;
    let application = run_blocking(service, move |service| {
        service.create_application_with_resume(&actor, job_id, cover_letter, upload)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(application)).into_response())
}

pub(crate) async fn application_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(application_id): Path<ApplicationId>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    Ok(Json(service.application(application_id)?).into_response())
}

pub(crate) async fn transition_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(application_id): Path<ApplicationId>,
    headers: HeaderMap,
    Json(request): Json<StatusRequest>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let to = ApplicationStatus::parse(&request.status)?;
    let application = run_blocking(service, move |service| {
        service.transition_status(application_id, to, &actor)
    })
    .await?;
    Ok(Json(application).into_response())
}

pub(crate) async fn attach_resume_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(application_id): Path<ApplicationId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let upload = ResumeUpload::new(declared_mime(&headers), body.to_vec());
    let address = run_blocking(service, move |service| {
        service.attach_resume(&actor, application_id, upload)
    })
    .await?;
    Ok(Json(json!({
        "application_id": application_id,
        "address": address,
    }))
    .into_response())
}

pub(crate) async fn has_applied_handler<R, A>(
    State(service): SharedService<R, A>,
    Path((job_id, seeker_id)): Path<(JobId, SeekerId)>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let has_applied = service.check_has_applied(job_id, seeker_id)?;
    Ok(Json(json!({ "has_applied": has_applied })).into_response())
}

pub(crate) async fn job_applications_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(job_id): Path<JobId>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    Ok(Json(service.list_applications(ApplicationQuery::ByJob(job_id))?).into_response())
}

pub(crate) async fn status_applications_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(status): Path<String>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let status = ApplicationStatus::parse(&status)?;
    Ok(Json(service.list_applications(ApplicationQuery::ByStatus(status))?).into_response())
}

pub(crate) async fn job_status_applications_handler<R, A>(
    State(service): SharedService<R, A>,
    Path((job_id, status)): Path<(JobId, String)>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let status = ApplicationStatus::parse(&status)?;
    let applications =
        service.list_applications(ApplicationQuery::ByJobAndStatus(job_id, status))?;
    Ok(Json(applications).into_response())
}

pub(crate) async fn count_applications_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(job_id): Path<JobId>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let count = service.count_applications(job_id)?;
    Ok(Json(json!({ "job_id": job_id, "count": count })).into_response())
}

pub(crate) async fn seeker_applications_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(seeker_id): Path<SeekerId>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    Ok(Json(service.list_applications(ApplicationQuery::BySeeker(seeker_id))?).into_response())
}

pub(crate) async fn recruiter_applications_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(recruiter_id): Path<RecruiterId>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let applications = service.list_applications(ApplicationQuery::ByRecruiter(recruiter_id))?;
    Ok(Json(applications).into_response())
}

pub(crate) async fn count_recruiter_applications_handler<R, A>(
    State(service): SharedService<R, A>,
    Path((recruiter_id, status)): Path<(RecruiterId, String)>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let status = ApplicationStatus::parse(&status)?;
    let count = service.count_recruiter_applications(recruiter_id, status)?;
    Ok(Json(json!({
        "recruiter_id": recruiter_id,
        "status": status,
        "count": count,
    }))
    .into_response())
}

pub(crate) async fn save_job_handler<R, A>(
    State(service): SharedService<R, A>,
    headers: HeaderMap,
    Json(request): Json<SaveJobRequest>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let saved =
        run_blocking(service, move |service| service.save_job(&actor, request.job_id)).await?;
    Ok((StatusCode::CREATED, Json(saved)).into_response())
}

pub(crate) async fn unsave_job_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(job_id): Path<JobId>,
    headers: HeaderMap,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let removed = run_blocking(service, move |service| service.unsave_job(&actor, job_id)).await?;
    Ok(Json(removed).into_response())
}

pub(crate) async fn is_saved_handler<R, A>(
    State(service): SharedService<R, A>,
    Path((job_id, seeker_id)): Path<(JobId, SeekerId)>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let saved = service.is_job_saved(job_id, seeker_id)?;
    Ok(Json(json!({ "saved": saved })).into_response())
}

pub(crate) async fn saved_jobs_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(seeker_id): Path<SeekerId>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    Ok(Json(service.saved_jobs(seeker_id)?).into_response())
}

pub(crate) async fn saved_job_count_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(seeker_id): Path<SeekerId>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let count = service.saved_job_count(seeker_id)?;
    Ok(Json(json!({ "seeker_id": seeker_id, "count": count })).into_response())
}

pub(crate) async fn job_savers_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(job_id): Path<JobId>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let seekers: Vec<AccountView> = service
        .seekers_who_saved(job_id)?
        .iter()
        .map(AccountView::from)
        .collect();
    Ok(Json(seekers).into_response())
}

pub(crate) async fn unsave_all_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(seeker_id): Path<SeekerId>,
    headers: HeaderMap,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let removed =
        run_blocking(service, move |service| service.unsave_all(&actor, seeker_id)).await?;
    Ok(Json(json!({
        "seeker_id": seeker_id,
        "removed": removed,
    }))
    .into_response())
}

pub(crate) async fn artifact_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(address): Path<String>,
) -> Result<Response, ApiError>
where
    R: BoardRepository + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let address = ArtifactAddress(address);
    let artifact = run_blocking(service, move |service| service.fetch_resume(&address)).await?;
    Ok(([(header::CONTENT_TYPE, artifact.mime)], artifact.bytes).into_response())
}
