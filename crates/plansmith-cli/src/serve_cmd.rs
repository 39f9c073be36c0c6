use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use plansmith_core::llm::ToolCaller;
use plansmith_core::plan::{
    GenerateError, GenerationRequest, MaterializeError, MaterializeReport, MaterializeRequest, Plan,
    ServiceError, generate_plan, materialize_and_record,
};
use plansmith_core::tracker::{
    Credential, GitHubOAuth, MilestoneClose, RepoRef, Tracker, TrackerError,
    close_milestone_if_complete, fetch_roadmap,
};
use plansmith_db::models::{NewProject, ProjectUpdate};
use plansmith_db::queries::projects::{self, StoreError};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared handles built once at start-up.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub tracker: Arc<dyn Tracker>,
    /// `None` when no model API key is configured.
    pub model: Option<Arc<dyn ToolCaller>>,
    /// `None` when no OAuth application is configured.
    pub oauth: Option<GitHubOAuth>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    /// Materialize report for work that reached the tracker before the failure.
    report: Option<Box<MaterializeReport>>,
}

impl AppError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            report: None,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, msg)
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    }
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        let status = match &err {
            TrackerError::Unauthorized => StatusCode::UNAUTHORIZED,
            TrackerError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ if err.status() == Some(404) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl From<GenerateError> for AppError {
    fn from(err: GenerateError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, err.to_string())
    }
}

impl From<MaterializeError> for AppError {
    fn from(err: MaterializeError) -> Self {
        let message = err.to_string();
        let (MaterializeError::RepositoryCreation(inner) | MaterializeError::IdentityResolution(inner)) =
            err;
        Self {
            message,
            ..Self::from(inner)
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Materialize(e) => e.into(),
            ServiceError::Store { report, .. } => Self {
                report: Some(report),
                ..Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NotFound(_) => Self::not_found(message),
            StoreError::EmptyUpdate => Self::unprocessable(message),
            StoreError::Database(e) => Self::internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = match self.report {
            Some(report) => serde_json::json!({ "error": self.message, "report": report }),
            None => serde_json::json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MaterializeBody {
    #[serde(flatten)]
    pub request: MaterializeRequest,
    pub plan: Plan,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCodeQuery {
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CloseIssueResponse {
    pub number: u64,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CloseMilestoneResponse {
    pub number: u64,
    #[serde(flatten)]
    pub outcome: MilestoneClose,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/projects", post(create_project).get(list_projects))
        .route("/api/projects/{id}", get(get_project).patch(update_project))
        .route("/api/plans/generate", post(generate))
        .route("/api/plans/materialize", post(materialize))
        .route(
            "/api/repos/{owner}/{repo}/issues/{number}/close",
            post(close_issue),
        )
        .route(
            "/api/repos/{owner}/{repo}/milestones/{number}/close",
            post(close_milestone),
        )
        .route("/api/repos/{owner}/{repo}/roadmap", get(roadmap))
        .route("/api/oauth/access-token", get(oauth_access_token))
        .route("/api/oauth/user", get(oauth_user))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("plansmith serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("plansmith serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn authorization(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("missing Authorization header"))
}

fn credential(headers: &HeaderMap) -> Result<Credential, AppError> {
    Credential::from_authorization(authorization(headers)?)
        .ok_or_else(|| AppError::bad_request("malformed Authorization header; expected `token <t>`"))
}

fn required(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::unprocessable(format!("{field} must not be empty")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// [`Json`] whose rejections use the `{"error": ...}` body.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::new(rejection.status(), rejection.body_text())),
        }
    }
}

/// [`Path`] whose rejections use the `{"error": ...}` body.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::new(rejection.status(), rejection.body_text())),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_project(
    State(state): State<AppState>,
    ApiJson(project): ApiJson<NewProject>,
) -> Result<axum::response::Response, AppError> {
    required("username", &project.username)?;
    required("title", &project.title)?;
    required("link", &project.link)?;

    let record = projects::insert_project(&state.pool, &project)
        .await
        .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(record)).into_response())
}

async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<axum::response::Response, AppError> {
    let username = query
        .username
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("username query parameter is required"))?;

    let records = projects::list_projects_for_user(&state.pool, &username)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(records).into_response())
}

async fn get_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<axum::response::Response, AppError> {
    let record = projects::get_project(&state.pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("project {id} not found")))?;

    Ok(Json(record).into_response())
}

async fn update_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<ProjectUpdate>,
) -> Result<axum::response::Response, AppError> {
    let record = projects::update_project(&state.pool, id, &update).await?;
    Ok(Json(record).into_response())
}

async fn generate(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<GenerationRequest>,
) -> Result<axum::response::Response, AppError> {
    let model = state
        .model
        .as_deref()
        .ok_or_else(|| AppError::unavailable("plan generation is not configured (no model API key)"))?;
    required("description", &request.description)?;

    let plan = generate_plan(model, &request).await?;
    Ok(Json(plan).into_response())
}

async fn materialize(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<MaterializeBody>,
) -> Result<axum::response::Response, AppError> {
    let credential = credential(&headers)?;
    required("repo_name", &body.request.repo_name)?;

    let done = materialize_and_record(
        &state.pool,
        state.tracker.as_ref(),
        &credential,
        &body.request,
        &body.plan,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(done)).into_response())
}

async fn close_issue(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath((owner, repo, number)): ApiPath<(String, String, u64)>,
) -> Result<axum::response::Response, AppError> {
    let credential = credential(&headers)?;
    state
        .tracker
        .close_issue(&credential, RepoRef::new(&owner, &repo), number)
        .await?;

    Ok(Json(CloseIssueResponse {
        number,
        status: "closed",
    })
    .into_response())
}

async fn close_milestone(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath((owner, repo, number)): ApiPath<(String, String, u64)>,
) -> Result<axum::response::Response, AppError> {
    let credential = credential(&headers)?;
    let outcome = close_milestone_if_complete(
        state.tracker.as_ref(),
        &credential,
        RepoRef::new(&owner, &repo),
        number,
    )
    .await?;

    Ok(Json(CloseMilestoneResponse {
        number,
        message: outcome.message(),
        outcome,
    })
    .into_response())
}

async fn roadmap(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath((owner, repo)): ApiPath<(String, String)>,
) -> Result<axum::response::Response, AppError> {
    let credential = credential(&headers)?;
    let milestones =
        fetch_roadmap(state.tracker.as_ref(), &credential, RepoRef::new(&owner, &repo)).await?;
    Ok(Json(milestones).into_response())
}

async fn oauth_access_token(
    State(state): State<AppState>,
    Query(query): Query<OAuthCodeQuery>,
) -> Result<axum::response::Response, AppError> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| AppError::unavailable("GitHub OAuth is not configured"))?;
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::bad_request("code query parameter is required"))?;

    let body = oauth.exchange_code(&code).await?;
    Ok(Json(body).into_response())
}

async fn oauth_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<axum::response::Response, AppError> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| AppError::unavailable("GitHub OAuth is not configured"))?;
    let body = oauth.user_profile(authorization(&headers)?).await?;
    Ok(Json(body).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
