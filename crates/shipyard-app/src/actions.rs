//! Action handlers: UpdateAction dispatch and background task spawning

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use shipyard_api::ApiClient;
use shipyard_core::prelude::*;
use shipyard_core::SaveError;
use tokio::sync::mpsc;

use crate::handler::UpdateAction;
use crate::message::Message;

/// Execute an action by spawning a background task
///
/// Every control-plane call is bounded by `request_timeout`; the task always
/// sends exactly one completion message back.
pub fn handle_action<A>(
    action: UpdateAction,
    msg_tx: mpsc::Sender<Message>,
    api: Arc<A>,
    request_timeout: Duration,
) where
    A: ApiClient + Send + Sync + 'static,
{
    match action {
        UpdateAction::FetchResources => {
            tokio::spawn(async move {
                let msg = match with_timeout(request_timeout, api.list_resources()).await {
                    Ok(resources) => Message::ResourcesLoaded { resources },
                    Err(e) => Message::RefreshFailed {
                        error: e.to_string(),
                    },
                };
                if msg_tx.send(msg).await.is_err() {
                    debug!("Listing finished after the engine stopped");
                }
            });
        }

        UpdateAction::SubmitSave { ticket, operator } => {
            tokio::spawn(async move {
                let result = with_timeout(
                    request_timeout,
                    api.update_config(&ticket.resource_id, ticket.partial.clone(), &operator),
                )
                .await
                .map_err(SaveError::from);
                if let Err(e) = msg_tx.send(Message::SaveCompleted { ticket, result }).await {
                    warn!("{}", Error::channel_send(format!("save completion dropped: {e}")));
                }
            });
        }
    }
}

async fn with_timeout<T>(after: Duration, request: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(after, request)
        .await
        .map_err(|_| Error::Timeout { after })?
}
