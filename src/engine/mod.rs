use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::engine::{chat_event::chat_event::ChatEvent, dispatcher::dispatcher::{DispatchOutcome, Dispatcher}};

pub mod state;
pub mod chat_event;
pub mod permissions;
pub mod handler;
pub mod tokenizer;
pub mod options;
pub mod arguments;
pub mod commands;
pub mod trigger;
pub mod cooldown;
pub mod failure;
pub mod dispatcher;
pub mod replies;

/// Feeds every incoming chat message to the dispatcher until the sender side closes.
pub async fn run_event_loop(dispatcher: Dispatcher, mut rx: UnboundedReceiver<ChatEvent>) {
    while let Some(event) = rx.recv().await {
        let message = event.message.clone();
        match dispatcher.dispatch(&message, event).await {
            DispatchOutcome::Ignored => {}
            outcome => debug!("Dispatched `{}`: {:?}", message, outcome),
        }
    }

    info!("Event channel closed, stopping event loop");
}
