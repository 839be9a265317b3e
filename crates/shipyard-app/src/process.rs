//! Message processing
//!
//! Runs a message and its follow-ups through the TEA update function and
//! dispatches the resulting actions.

use std::sync::Arc;
use std::time::Duration;

use shipyard_api::ApiClient;
use tokio::sync::mpsc;

use crate::actions::handle_action;
use crate::handler;
use crate::message::Message;
use crate::state::AppState;

/// Process a message through the TEA update function
pub fn process_message<A>(
    state: &mut AppState,
    message: Message,
    msg_tx: &mpsc::Sender<Message>,
    api: &Arc<A>,
    request_timeout: Duration,
) where
    A: ApiClient + Send + Sync + 'static,
{
    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = handler::update(state, m);

        if let Some(action) = result.action {
            handle_action(action, msg_tx.clone(), Arc::clone(api), request_timeout);
        }

        // Continue with follow-up message
        msg = result.message;
    }
}
