//! Projects HTTP server.
//!
//! The boundary the web application and the exercise CLI talk to:
//! provisioning, listing and deleting projects with a user session, and
//! reporting test runs with a project token.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::models::{Project, ServerConfig, SubmissionDetails, SubmissionResult};
use crate::domain::ports::{IdentityError, IdentityVerifier};
use crate::services::{
    ProjectService, ProvisionError, ProvisioningOrchestrator, SubmissionError, SubmissionOutcome,
    SubmissionRequest, SubmissionService,
};

/// Configuration for the projects HTTP server.
#[derive(Debug, Clone)]
pub struct ProjectsHttpConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to enable CORS.
    pub enable_cors: bool,
}

impl Default for ProjectsHttpConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for ProjectsHttpConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            enable_cors: config.enable_cors,
        }
    }
}

/// Request to provision a project.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[serde(default, alias = "moduleId")]
    pub exercise_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Query parameters for project listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQueryParams {
    #[serde(default, alias = "moduleId")]
    pub exercise_id: Option<String>,
}

/// A test run reported by the exercise CLI.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub project_id: Uuid,
    pub result: SubmissionResult,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub details: SubmissionDetails,
    #[serde(default)]
    pub commit_sha: Option<String>,
}

/// Response with a project.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: Uuid,
    pub repository_url: Option<String>,
    pub status: String,
    pub progress_percent: u8,
    pub exercise_id: String,
    pub language: String,
    pub current_challenge_index: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            repository_url: p.repository_url,
            status: p.status.as_str().to_string(),
            progress_percent: p.progress_percent,
            exercise_id: p.exercise_id,
            language: p.language.as_str().to_string(),
            current_challenge_index: p.current_step_index,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

/// Response to a submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub created_at: String,
    pub project_updated: bool,
    pub progress: u8,
    pub status: String,
    pub current_challenge_index: u32,
    pub challenge_unlocked: bool,
    pub all_completed: bool,
}

impl From<SubmissionOutcome> for SubmissionResponse {
    fn from(o: SubmissionOutcome) -> Self {
        Self {
            id: o.submission.id,
            created_at: o.submission.created_at.to_rfc3339(),
            project_updated: o.project_updated,
            progress: o.project.progress_percent,
            status: o.project.status.as_str().to_string(),
            current_challenge_index: o.project.current_step_index,
            challenge_unlocked: o.step_unlocked,
            all_completed: o.all_completed,
        }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: u16, code: &str, details: impl Into<String>) -> ApiError {
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(ErrorResponse {
            error: code.to_string(),
            details: details.into(),
        }),
    )
}

impl From<ProvisionError> for ApiError {
    fn from(e: ProvisionError) -> Self {
        api_error(e.status_code(), e.code(), e.to_string())
    }
}

impl From<SubmissionError> for ApiError {
    fn from(e: SubmissionError) -> Self {
        api_error(e.status_code(), e.code(), e.to_string())
    }
}

fn domain_error(e: DomainError) -> ApiError {
    match e {
        DomainError::ProjectNotFound(_) => api_error(404, "NOT_FOUND", e.to_string()),
        other => api_error(500, "STORAGE_ERROR", other.to_string()),
    }
}

fn body_error(rejection: JsonRejection) -> ApiError {
    api_error(400, "INVALID_REQUEST", rejection.body_text())
}

/// Shared state for the projects HTTP server.
struct AppState {
    orchestrator: ProvisioningOrchestrator,
    projects: ProjectService,
    submissions: SubmissionService,
    identity: Arc<dyn IdentityVerifier>,
}

/// Projects HTTP Server.
pub struct ProjectsHttpServer {
    config: ProjectsHttpConfig,
    state: Arc<AppState>,
}

impl ProjectsHttpServer {
    pub fn new(
        orchestrator: ProvisioningOrchestrator,
        projects: ProjectService,
        submissions: SubmissionService,
        identity: Arc<dyn IdentityVerifier>,
        config: ProjectsHttpConfig,
    ) -> Self {
        Self {
            config,
            state: Arc::new(AppState {
                orchestrator,
                projects,
                submissions,
                identity,
            }),
        }
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        let app = Router::new()
            .route("/projects", post(create_project).get(list_projects))
            .route("/projects/{id}", delete(delete_project))
            .route("/submissions", post(submit))
            .route("/health", get(health_check))
            .with_state(self.state.clone());

        if self.config.enable_cors {
            app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
                .layer(TraceLayer::new_for_http())
        } else {
            app.layer(TraceLayer::new_for_http())
        }
    }

    /// Start the server with a shutdown signal.
    pub async fn serve_with_shutdown<F>(
        self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let router = self.router();

        tracing::info!("Projects HTTP server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::from(ProvisionError::Unauthorized("missing bearer token".to_string())))?;

    state.identity.verify_caller(token).await.map_err(|e| match e {
        IdentityError::Unavailable(detail) => api_error(502, "IDENTITY_UNAVAILABLE", detail),
        other => ProvisionError::Unauthorized(other.to_string()).into(),
    })
}

// Handler functions

async fn health_check() -> &'static str {
    "OK"
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    let Json(req) = body.map_err(body_error)?;

    let (Some(exercise_id), Some(language)) = (req.exercise_id, req.language) else {
        return Err(ProvisionError::InvalidRequest("exerciseId and language are required".to_string()).into());
    };

    let outcome = state.orchestrator.provision(&user_id, &exercise_id, &language).await?;
    let status = if outcome.reused { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(ProjectResponse::from(outcome.project))))
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ProjectQueryParams>,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let user_id = authenticate(&state, &headers).await?;

    let projects = state
        .projects
        .list_projects(&user_id, params.exercise_id.as_deref())
        .await
        .map_err(domain_error)?;
    Ok(Json(projects.into_iter().map(ProjectResponse::from).collect()))
}

async fn delete_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = authenticate(&state, &headers).await?;

    state
        .projects
        .delete_project(&user_id, id)
        .await
        .map_err(domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    let token = bearer_token(&headers).ok_or_else(|| ApiError::from(SubmissionError::InvalidToken))?;
    let Json(req) = body.map_err(body_error)?;

    let outcome = state
        .submissions
        .submit(
            token,
            SubmissionRequest {
                project_id: req.project_id,
                result: req.result,
                summary: req.summary,
                details: req.details,
                commit_sha: req.commit_sha,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(SubmissionResponse::from(outcome))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::github::MockVcsClient;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteProjectRepository, SqliteSubmissionRepository};
    use crate::domain::models::{Catalog, Language, ProvisioningConfig};
    use crate::domain::ports::ProjectRepository;
    use crate::services::{template_name, RandomTokenGenerator};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    /// Accepts `session-<user>` tokens.
    struct PrefixVerifier;

    #[async_trait]
    impl IdentityVerifier for PrefixVerifier {
        async fn verify_caller(&self, bearer_token: &str) -> Result<String, IdentityError> {
            bearer_token
                .strip_prefix("session-")
                .map(str::to_string)
                .ok_or_else(|| IdentityError::Unauthorized("invalid JWT".into()))
        }
    }

    async fn test_server() -> (Router, Arc<SqliteProjectRepository>) {
        let pool = create_migrated_test_pool().await.unwrap();
        let projects = Arc::new(SqliteProjectRepository::new(pool.clone()));
        let submissions = Arc::new(SqliteSubmissionRepository::new(pool));
        let vcs = Arc::new(
            MockVcsClient::new("dsa-lab")
                .with_template("dsa-lab", &template_name("stack", Language::TypeScript))
                .with_template("dsa-lab", &template_name("min-heap", Language::Python)),
        );
        let config = ProvisioningConfig {
            settle_delay_ms: 0,
            ..ProvisioningConfig::default()
        };

        let orchestrator = ProvisioningOrchestrator::new(
            projects.clone(),
            vcs.clone(),
            Arc::new(RandomTokenGenerator),
            Catalog::builtin(),
            config,
        );
        let server = ProjectsHttpServer::new(
            orchestrator,
            ProjectService::new(projects.clone(), vcs),
            SubmissionService::new(projects.clone(), submissions),
            Arc::new(PrefixVerifier),
            ProjectsHttpConfig::default(),
        );
        (server.router(), projects)
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = test_server().await;
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_project_returns_201_then_200() {
        let (router, _) = test_server().await;
        let body = serde_json::json!({"exerciseId": "min-heap", "language": "python"});

        let (status, json) = send(&router, json_request("POST", "/projects", Some("session-u1"), body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["repositoryUrl"], "https://github.com/dsa-lab/u1-min-heap-py");
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["progressPercent"], 0);

        let (status, again) = send(&router, json_request("POST", "/projects", Some("session-u1"), body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["id"], json["id"]);
    }

    #[tokio::test]
    async fn test_module_id_alias_is_accepted() {
        let (router, _) = test_server().await;
        let body = serde_json::json!({"moduleId": "stack", "language": "TypeScript"});

        let (status, _) = send(&router, json_request("POST", "/projects", Some("session-u1"), body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_missing_session_is_401() {
        let (router, _) = test_server().await;
        let body = serde_json::json!({"exerciseId": "stack", "language": "TypeScript"});

        let (status, json) = send(&router, json_request("POST", "/projects", None, body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "UNAUTHORIZED");

        let (status, _) = send(&router, json_request("POST", "/projects", Some("forged"), body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unsupported_language_is_400_with_details() {
        let (router, _) = test_server().await;
        let body = serde_json::json!({"exerciseId": "stack", "language": "Rust"});

        let (status, json) = send(&router, json_request("POST", "/projects", Some("session-u1"), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "UNSUPPORTED_COMBINATION");
        assert!(json["details"].as_str().unwrap().contains("Rust"));
    }

    #[tokio::test]
    async fn test_missing_template_is_500_with_provider_detail() {
        let (router, projects) = test_server().await;
        let body = serde_json::json!({"exerciseId": "queue", "language": "Go"});

        let (status, json) = send(&router, json_request("POST", "/projects", Some("session-u1"), body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "TEMPLATE_UNAVAILABLE");
        assert!(json["details"].as_str().unwrap().contains("template-dsa-queue-go"));
        assert!(projects.list_for_user("u1", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (router, _) = test_server().await;
        let request = Request::builder()
            .method("POST")
            .uri("/projects")
            .header("content-type", "application/json")
            .header("authorization", "Bearer session-u1")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, json) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let (router, _) = test_server().await;
        let body = serde_json::json!({"exerciseId": "stack", "language": "TypeScript"});
        let (_, created) = send(&router, json_request("POST", "/projects", Some("session-u1"), body)).await;
        let id = created["id"].as_str().unwrap().to_string();

        let list = Request::builder()
            .uri("/projects?exerciseId=stack")
            .header("authorization", "Bearer session-u1")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&router, list).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);

        let foreign = Request::builder()
            .method("DELETE")
            .uri(format!("/projects/{id}"))
            .header("authorization", "Bearer session-u2")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router, foreign).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let own = Request::builder()
            .method("DELETE")
            .uri(format!("/projects/{id}"))
            .header("authorization", "Bearer session-u1")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router, own).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_submission_with_project_token() {
        let (router, projects) = test_server().await;
        let body = serde_json::json!({"exerciseId": "stack", "language": "TypeScript"});
        let (_, created) = send(&router, json_request("POST", "/projects", Some("session-u1"), body)).await;
        let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();
        let token = projects.get(id).await.unwrap().unwrap().project_token;

        let report = serde_json::json!({
            "projectId": id,
            "result": "pass",
            "summary": "2/2 passed",
            "details": {
                "cases": [{"id": "push", "passed": true}, {"id": "pop", "passed": true}],
                "currentChallengeIndex": 0,
                "challengeResult": {"id": "push", "passed": true}
            },
            "commitSha": "abc123"
        });
        let (status, json) = send(&router, json_request("POST", "/submissions", Some(&token), report.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["projectUpdated"], true);
        assert_eq!(json["progress"], 50);
        assert_eq!(json["currentChallengeIndex"], 1);
        assert_eq!(json["challengeUnlocked"], true);
        assert_eq!(json["allCompleted"], false);

        let (status, _) = send(&router, json_request("POST", "/submissions", Some("wrong"), report)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
