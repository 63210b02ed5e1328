use async_trait::async_trait;
use loom_model::{Action, GroupStatus};

use crate::error::ApiError;

/// Supervisor command surface.
///
/// Implemented by [`crate::SupervisorApiAdapter`]; custom handlers can wrap
/// it to add auth or auditing in front of the supervisor.
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Snapshot of every task group.
    async fn status(&self) -> Result<Vec<GroupStatus>, ApiError>;

    /// Apply `action` to every group (`None`), a group name or a pid.
    async fn command(
        &self,
        action: Action,
        target: Option<String>,
        args: Vec<String>,
    ) -> Result<(), ApiError>;

    /// Replace the configuration with `text`.
    async fn upgrade(&self, text: String) -> Result<(), ApiError>;

    /// Begin shutdown. Returns once the request is queued, not when it is done.
    async fn die(&self, code: Option<i32>) -> Result<(), ApiError>;
}
