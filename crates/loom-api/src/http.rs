use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use loom_model::{Action, GroupStatus};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, handler::ApiHandler};

/// HTTP API service builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - GET /api/v1/status - Snapshot of every group
    /// - POST /api/v1/commands - Restart, stop or kill
    /// - PUT /api/v1/config - Replace the configuration
    /// - POST /api/v1/die - Shut the supervisor down
    pub fn router(self) -> Router {
        Router::new()
            .route("/api/v1/status", get(status::<H>))
            .route("/api/v1/commands", post(command::<H>))
            .route("/api/v1/config", put(upgrade::<H>))
            .route("/api/v1/die", post(die::<H>))
            .with_state(self.handler)
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct StatusResponse {
    groups: Vec<GroupStatus>,
}

/// Target is a group name or a pid; JSON numbers are accepted for pids.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Target {
    Name(String),
    Pid(u32),
}

#[derive(Debug, Deserialize)]
struct CommandRequest {
    action: String,
    #[serde(default)]
    target: Option<Target>,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DieRequest {
    #[serde(default)]
    code: Option<i32>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/status
async fn status<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let groups = handler.status().await?;
    Ok(Json(StatusResponse { groups }))
}

/// POST /api/v1/commands
async fn command<H>(
    State(handler): State<Arc<H>>,
    Json(req): Json<CommandRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let action: Action = req
        .action
        .parse()
        .map_err(|e: loom_model::ModelError| ApiError::InvalidRequest(e.to_string()))?;
    let target = req.target.map(|t| match t {
        Target::Name(name) => name,
        Target::Pid(pid) => pid.to_string(),
    });

    handler.command(action, target, req.args).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/config
async fn upgrade<H>(State(handler): State<Arc<H>>, body: String) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    handler.upgrade(body).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/die
async fn die<H>(State(handler): State<Arc<H>>, body: String) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let req: DieRequest = if body.trim().is_empty() {
        DieRequest::default()
    } else {
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?
    };

    handler.die(req.code).await?;
    Ok(StatusCode::ACCEPTED)
}
