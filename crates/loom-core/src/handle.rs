use std::path::PathBuf;

use loom_model::{Action, GroupStatus};
use tokio::sync::{mpsc, oneshot};

use crate::{CoreError, DieRequest, Event, Request};

/// Cloneable front door to a running [`crate::Supervisor`].
///
/// Every call is queued on the supervisor loop and answered from there.
#[derive(Clone, Debug)]
pub struct SupervisorHandle {
    tx: mpsc::UnboundedSender<Event>,
}

impl SupervisorHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Request) -> Result<T, CoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Event::Request(make(reply)))
            .map_err(|_| CoreError::Closed)?;
        rx.await.map_err(|_| CoreError::Closed)
    }

    pub async fn status(&self) -> Result<Vec<GroupStatus>, CoreError> {
        self.request(|reply| Request::Status { reply }).await
    }

    pub async fn command(&self, action: Action, target: Option<String>, args: Vec<String>) -> Result<(), CoreError> {
        self.request(|reply| Request::Command {
            action,
            target,
            args,
            reply,
        })
        .await?
    }

    /// Submit configuration text; `origin` is the file it was read from.
    pub async fn upgrade(&self, text: impl Into<String>, origin: Option<PathBuf>) -> Result<(), CoreError> {
        let text = text.into();
        self.request(|reply| Request::Upgrade { text, origin, reply })
            .await?
    }

    /// Ask the supervisor to shut down; resolves with the final exit code.
    pub async fn die(&self, code: Option<i32>) -> Result<i32, CoreError> {
        self.request(|reply| Request::Die(DieRequest { code, reply }))
            .await
    }
}
