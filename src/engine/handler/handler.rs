use futures::future::BoxFuture;
use serde::Serialize;
use tracing::debug;

use crate::engine::{chat_event::chat_event::ChatEvent, permissions::permissions::{PermissionLevel, has_permission}, state::def::EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityKind { User, Channel, Role }

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
    pub name: String,
}

/// The chat platform seen from the engine: replies, permissions and entity lookup.
///
/// Everything except `send_reply` is called while matching, which is synchronous, so
/// implementations should answer from cached state.
pub trait PlatformAdapter: Send + Sync {
    fn send_reply<'a>(&'a self, event: &'a ChatEvent, message: &'a str) -> BoxFuture<'a, EngineResult<()>>;

    /// Every entity `token` (mention, id or name) could refer to.
    fn resolve_entity(&self, _event: &ChatEvent, _kind: EntityKind, _token: &str) -> Vec<EntityRef> {
        Vec::new()
    }

    fn has_permission(&self, event: &ChatEvent, required: PermissionLevel) -> bool {
        has_permission(event, required)
    }

    fn is_developer(&self, _user_id: &str) -> bool {
        false
    }

    fn is_nsfw_channel(&self, _event: &ChatEvent) -> bool {
        false
    }
}

/// Adapter that drops every reply. Useful when only the dispatch outcome matters.
pub struct NullAdapter;

impl PlatformAdapter for NullAdapter {
    fn send_reply<'a>(&'a self, event: &'a ChatEvent, message: &'a str) -> BoxFuture<'a, EngineResult<()>> {
        Box::pin(async move {
            debug!("Dropping reply in {}: {}", event.channel, message);
            Ok(())
        })
    }
}
