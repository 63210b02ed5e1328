use async_trait::async_trait;
use loom_core::SupervisorHandle;
use loom_model::{Action, GroupStatus};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::handler::ApiHandler;

/// Adapter that bridges [`SupervisorHandle`] to [`ApiHandler`].
pub struct SupervisorApiAdapter {
    supervisor: SupervisorHandle,
}

impl SupervisorApiAdapter {
    pub fn new(supervisor: SupervisorHandle) -> Self {
        Self { supervisor }
    }
}

#[async_trait]
impl ApiHandler for SupervisorApiAdapter {
    async fn status(&self) -> Result<Vec<GroupStatus>, ApiError> {
        self.supervisor.status().await.map_err(ApiError::from)
    }

    async fn command(
        &self,
        action: Action,
        target: Option<String>,
        args: Vec<String>,
    ) -> Result<(), ApiError> {
        self.supervisor
            .command(action, target, args)
            .await
            .map_err(ApiError::from)
    }

    async fn upgrade(&self, text: String) -> Result<(), ApiError> {
        // Text submitted over the API has no file origin.
        self.supervisor.upgrade(text, None).await.map_err(ApiError::from)
    }

    async fn die(&self, code: Option<i32>) -> Result<(), ApiError> {
        let supervisor = self.supervisor.clone();
        tokio::spawn(async move {
            match supervisor.die(code).await {
                Ok(code) => debug!(target: "loom.api", code, "shutdown finished"),
                Err(e) => warn!(target: "loom.api", error = %e, "shutdown request failed"),
            }
        });
        Ok(())
    }
}
