use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::activity::{ActivityDraft, ActivityType};
use super::dispatch::{DispatchReport, EffectDispatcher, Notifier};
use super::domain::{
    Actor, ApplicationId, CandidateContact, JobId, NewApplication, NewJobPosting, UserId,
};
use super::export::activity_csv_string;
use super::repository::{ApplicationRepository, JobRepository, UserDirectory};
use super::service::{
    PipelineError, PipelineService, TransitionOutcome, TransitionRequest,
};
use super::stage::{Stage, SubStage};
use super::transition::TransitionTarget;

/// Shared handles for the pipeline endpoints.
pub struct PipelineState<R, J, U, N> {
    pub service: Arc<PipelineService<R, J>>,
    pub dispatcher: Arc<EffectDispatcher<U, N>>,
}

impl<R, J, U, N> Clone for PipelineState<R, J, U, N> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::ApplicationNotFound(_) | PipelineError::JobNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            PipelineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Conflict(_) => StatusCode::CONFLICT,
            PipelineError::Authorization(_) => StatusCode::FORBIDDEN,
            PipelineError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn error_response(err: PipelineError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(%err, "pipeline request failed");
    }
    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

/// Router builder exposing job, application, and audit endpoints.
pub fn pipeline_router<R, J, U, N>(state: PipelineState<R, J, U, N>) -> Router
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/v1/candidates", post(register_candidate_handler::<R, J, U, N>))
        .route("/api/v1/jobs", post(create_job_handler::<R, J, U, N>))
        .route("/api/v1/jobs/:job_id", get(job_handler::<R, J, U, N>))
        .route(
            "/api/v1/jobs/:job_id/applications",
            post(open_application_handler::<R, J, U, N>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<R, J, U, N>),
        )
        .route(
            "/api/v1/applications/:application_id/transition",
            post(transition_handler::<R, J, U, N>),
        )
        .route(
            "/api/v1/applications/:application_id/comments",
            post(comment_handler::<R, J, U, N>).get(comments_handler::<R, J, U, N>),
        )
        .route(
            "/api/v1/applications/:application_id/activities",
            post(activity_handler::<R, J, U, N>),
        )
        .route(
            "/api/v1/applications/:application_id/timeline",
            get(timeline_handler::<R, J, U, N>),
        )
        .route(
            "/api/v1/applications/:application_id/activity.csv",
            get(export_handler::<R, J, U, N>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSubmission {
    pub seeker_id: UserId,
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    pub actor: Actor,
    pub stage: Stage,
    #[serde(default)]
    pub sub_stage: Option<SubStage>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub actor: Actor,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivityBody {
    pub actor: Actor,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Transition response: the committed outcome plus what happened to its notifications.
#[derive(Debug, Serialize)]
pub struct TransitionView {
    #[serde(flatten)]
    pub outcome: TransitionOutcome,
    pub dispatch: DispatchReport,
}

/// Candidates must be registered here before email notices can reach them.
pub(crate) async fn register_candidate_handler<R, J, U, N>(
    State(state): State<PipelineState<R, J, U, N>>,
    axum::Json(contact): axum::Json<CandidateContact>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
{
    match state.dispatcher.register_contact(contact) {
        Ok(contact) => (StatusCode::CREATED, axum::Json(contact)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_job_handler<R, J, U, N>(
    State(state): State<PipelineState<R, J, U, N>>,
    axum::Json(posting): axum::Json<NewJobPosting>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
{
    match state.service.create_job(posting) {
        Ok(job) => (StatusCode::CREATED, axum::Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn job_handler<R, J, U, N>(
    State(state): State<PipelineState<R, J, U, N>>,
    Path(job_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
{
    match state.service.job(&JobId(job_id)) {
        Ok(job) => (StatusCode::OK, axum::Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn open_application_handler<R, J, U, N>(
    State(state): State<PipelineState<R, J, U, N>>,
    Path(job_id): Path<String>,
    axum::Json(submission): axum::Json<ApplicationSubmission>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
{
    let request = NewApplication {
        seeker_id: submission.seeker_id,
        job_id: JobId(job_id),
        score: submission.score,
        cover_letter: submission.cover_letter,
        resume_url: submission.resume_url,
    };
    match state.service.open_application(request) {
        Ok(application) => (StatusCode::CREATED, axum::Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn application_handler<R, J, U, N>(
    State(state): State<PipelineState<R, J, U, N>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
{
    match state.service.application(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transition_handler<R, J, U, N>(
    State(state): State<PipelineState<R, J, U, N>>,
    Path(application_id): Path<String>,
    axum::Json(body): axum::Json<TransitionBody>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
{
    let request = TransitionRequest {
        application_id: ApplicationId(application_id),
        target: TransitionTarget {
            stage: body.stage,
            sub_stage: body.sub_stage,
            reason: body.reason,
        },
        actor: body.actor,
    };

    match state.service.transition(request) {
        Ok(outcome) => {
            let dispatch = state.dispatcher.dispatch(&outcome.effects);
            let view = TransitionView { outcome, dispatch };
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn comment_handler<R, J, U, N>(
    State(state): State<PipelineState<R, J, U, N>>,
    Path(application_id): Path<String>,
    axum::Json(body): axum::Json<CommentBody>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
{
    let id = ApplicationId(application_id);
    match state.service.add_comment(&id, &body.actor, &body.comment) {
        Ok(comment) => (StatusCode::CREATED, axum::Json(comment)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn comments_handler<R, J, U, N>(
    State(state): State<PipelineState<R, J, U, N>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
{
    match state.service.comments(&ApplicationId(application_id)) {
        Ok(comments) => (StatusCode::OK, axum::Json(comments)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn activity_handler<R, J, U, N>(
    State(state): State<PipelineState<R, J, U, N>>,
    Path(application_id): Path<String>,
    axum::Json(body): axum::Json<ActivityBody>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
{
    let id = ApplicationId(application_id);
    let draft = ActivityDraft {
        kind: body.kind,
        title: body.title,
        description: body.description,
    };
    match state.service.record_activity(&id, &body.actor, draft) {
        Ok(entry) => (StatusCode::CREATED, axum::Json(entry)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn timeline_handler<R, J, U, N>(
    State(state): State<PipelineState<R, J, U, N>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
{
    match state.service.activity_timeline(&ApplicationId(application_id)) {
        Ok(days) => (StatusCode::OK, axum::Json(days)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn export_handler<R, J, U, N>(
    State(state): State<PipelineState<R, J, U, N>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
{
    let entries = match state.service.activity(&ApplicationId(application_id)) {
        Ok(entries) => entries,
        Err(err) => return error_response(err),
    };

    match activity_csv_string(&entries) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(%err, "activity export failed");
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
