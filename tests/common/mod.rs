#![allow(dead_code)]

use std::{future::Future, sync::{Arc, Mutex}, time::Duration};

use futures::future::BoxFuture;
use krapbott_commands::{ChatEvent, Dispatcher, EngineConfig, EngineResult, ParserRegistry, PermissionLevel, Platform, PlatformAdapter};

/// Keeps every reply so tests can look at what users would have seen.
#[derive(Default)]
pub struct RecordingAdapter {
    pub replies: Mutex<Vec<String>>,
    pub developers: Vec<String>,
    pub nsfw: bool,
}

impl RecordingAdapter {
    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }
}

impl PlatformAdapter for RecordingAdapter {
    fn send_reply<'a>(&'a self, _event: &'a ChatEvent, message: &'a str) -> BoxFuture<'a, EngineResult<()>> {
        Box::pin(async move {
            self.replies.lock().unwrap().push(message.to_string());
            Ok(())
        })
    }

    fn is_developer(&self, user_id: &str) -> bool {
        self.developers.iter().any(|d| d == user_id)
    }

    fn is_nsfw_channel(&self, _event: &ChatEvent) -> bool {
        self.nsfw
    }
}

pub fn dispatcher(adapter: RecordingAdapter) -> (Dispatcher, Arc<RecordingAdapter>) {
    dispatcher_with(EngineConfig::default(), adapter)
}

pub fn dispatcher_with(config: EngineConfig, adapter: RecordingAdapter) -> (Dispatcher, Arc<RecordingAdapter>) {
    let adapter = Arc::new(adapter);
    (Dispatcher::new(config, ParserRegistry::with_defaults(), adapter.clone()), adapter)
}

pub fn event(user: &str, message: &str) -> ChatEvent {
    event_as(user, PermissionLevel::Everyone, message)
}

pub fn event_as(user: &str, permission: PermissionLevel, message: &str) -> ChatEvent {
    ChatEvent::new(Platform::Twitch, "krapmatt", message).with_user(user, user, permission)
}

/// Polls `check` until it holds, failing the test after two seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check().await {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
