use core::fmt;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::engine::chat_event::chat_event::ChatEvent;

/// Ordered from most to least privileged, so `<=` means "at least as privileged".
#[derive(Clone, Copy, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub enum PermissionLevel {
    Broadcaster,
    LeadModerator,
    Moderator,
    Vip,
    Subscriber,
    Follower,
    #[default]
    Everyone,
}

impl Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionLevel::Broadcaster => "broadcaster",
            PermissionLevel::LeadModerator => "lead moderator",
            PermissionLevel::Moderator => "moderator",
            PermissionLevel::Vip => "vip",
            PermissionLevel::Subscriber => "subscriber",
            PermissionLevel::Follower => "follower",
            PermissionLevel::Everyone => "anyone",
        };
        write!(f, "{}", s)
    }
}

pub fn has_permission(event: &ChatEvent, required: PermissionLevel) -> bool {
    if required == PermissionLevel::Everyone {
        return true;
    }

    let Some(user) = &event.user else {
        return false;
    };

    user.permission <= required
}
