use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::permissions::permissions::PermissionLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Platform { Twitch, Kick, Discord, Console }

/// Everything the engine knows about the sender of a message.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub platform: Platform,
    pub channel: String,
    pub user: Option<ChatUser>,
    pub message: String,
    //Discord Data
    pub guild: Option<String>,
    pub shard: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ChatUser {
    pub identity: UserIdentity,
    pub name: DisplayName,
    pub permission: PermissionLevel
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserIdentity {
    pub platform: Platform,
    pub platform_user_id: String, // twitch user_id / discord snowflake
}

#[derive(Debug, Clone)]
pub struct DisplayName {
    pub login: String,        // lowercase login
    pub display: String,      // FancyName
}

impl ChatEvent {
    pub fn new(platform: Platform, channel: impl Into<String>, message: impl Into<String>) -> Self {
        ChatEvent {
            platform,
            channel: channel.into(),
            user: None,
            message: message.into(),
            guild: None,
            shard: None,
        }
    }

    pub fn with_user(mut self, id: impl Into<String>, login: impl Into<String>, permission: PermissionLevel) -> Self {
        let login = login.into();
        self.user = Some(ChatUser {
            identity: UserIdentity { platform: self.platform, platform_user_id: id.into() },
            name: DisplayName { display: login.clone(), login },
            permission,
        });
        self
    }

    pub fn with_guild(mut self, guild: impl Into<String>) -> Self {
        self.guild = Some(guild.into());
        self
    }

    pub fn with_shard(mut self, shard: u32) -> Self {
        self.shard = Some(shard);
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.identity.platform_user_id.as_str())
    }

    pub fn display_name(&self) -> &str {
        self.user.as_ref().map(|u| u.name.display.as_str()).unwrap_or("someone")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::Twitch => "twitch",
            Platform::Kick => "kick",
            Platform::Discord => "discord",
            Platform::Console => "console",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Platform {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "twitch" => Ok(Platform::Twitch),
            "kick" => Ok(Platform::Kick),
            "discord" => Ok(Platform::Discord),
            "console" => Ok(Platform::Console),
            _ => Err("Invalid platform"),
        }
    }
}
