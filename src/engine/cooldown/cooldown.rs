use std::time::{Duration, Instant};

use dashmap::{DashMap, mapref::entry::Entry};
use serde::{Deserialize, Serialize};

use crate::engine::chat_event::chat_event::ChatEvent;

/// What a cooldown is counted over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownScope {
    #[default]
    User,
    Channel,
    Guild,
    Shard,
    UserChannel,
    UserGuild,
    UserShard,
    Global,
}

impl CooldownScope {
    /// Guild scopes fall back to the channel outside of guilds.
    pub fn key(&self, event: &ChatEvent) -> String {
        let user = || format!("U:{}", event.user_id().unwrap_or("anonymous"));
        let channel = || format!("C:{}:{}", event.platform, event.channel);
        let guild = || match &event.guild {
            Some(guild) => format!("G:{}", guild),
            None => channel(),
        };
        let shard = || format!("S:{}", event.shard.unwrap_or(0));

        match self {
            CooldownScope::User => user(),
            CooldownScope::Channel => channel(),
            CooldownScope::Guild => guild(),
            CooldownScope::Shard => shard(),
            CooldownScope::UserChannel => format!("{}|{}", user(), channel()),
            CooldownScope::UserGuild => format!("{}|{}", user(), guild()),
            CooldownScope::UserShard => format!("{}|{}", user(), shard()),
            CooldownScope::Global => "global".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cooldown {
    #[serde(with = "serde_millis")]
    pub duration: Duration,
    #[serde(default)]
    pub scope: CooldownScope,
}

impl Cooldown {
    pub fn new(duration: Duration, scope: CooldownScope) -> Self {
        Cooldown { duration, scope }
    }
}

#[derive(Debug, Clone)]
pub struct CooldownRecord {
    pub key: String,
    pub start: Instant,
    pub duration: Duration,
}

impl CooldownRecord {
    pub fn remaining(&self, now: Instant) -> Duration {
        self.duration.saturating_sub(now.saturating_duration_since(self.start))
    }
}

/// Proof that a cooldown was started, needed to roll it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownTicket {
    pub command: usize,
    pub key: String,
    pub started: Instant,
}

/// Cooldown records by command id, then by scope key.
#[derive(Default)]
pub struct CooldownStore {
    records: DashMap<usize, DashMap<String, CooldownRecord>>,
}

impl CooldownStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a cooldown unless one is still running, in which case its remaining time is
    /// returned. Check and insert happen under one entry lock.
    pub fn try_acquire(&self, command: usize, key: String, duration: Duration, now: Instant) -> Result<CooldownTicket, Duration> {
        let scoped = self.records.entry(command).or_default();
        let record = CooldownRecord { key: key.clone(), start: now, duration };

        match scoped.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let remaining = occupied.get().remaining(now);
                if !remaining.is_zero() {
                    return Err(remaining);
                }
                occupied.insert(record);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(record);
            }
        }

        Ok(CooldownTicket { command, key, started: now })
    }

    /// Removes the record the ticket created. A newer record for the same key is kept.
    pub fn release(&self, ticket: &CooldownTicket) -> bool {
        let Some(scoped) = self.records.get(&ticket.command) else {
            return false;
        };
        scoped.remove_if(&ticket.key, |_, record| record.start == ticket.started).is_some()
    }

    pub fn remaining(&self, command: usize, key: &str, now: Instant) -> Option<Duration> {
        let scoped = self.records.get(&command)?;
        let remaining = scoped.get(key)?.remaining(now);
        (!remaining.is_zero()).then_some(remaining)
    }

    /// Drops expired records, returns how many went.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut purged = 0;
        for scoped in self.records.iter() {
            let before = scoped.len();
            scoped.retain(|_, record| !record.remaining(now).is_zero());
            purged += before - scoped.len();
        }
        self.records.retain(|_, scoped| !scoped.is_empty());
        purged
    }

    pub fn len(&self) -> usize {
        self.records.iter().map(|scoped| scoped.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
