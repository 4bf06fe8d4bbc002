use std::{collections::HashMap, env, fs, path::Path};

use tracing::{info, warn};

use crate::engine::{
    commands::commands::CommandPolicy,
    state::def::{EngineConfig, EngineResult, default_max_optional, default_prefix, default_true},
};

// same values serde fills in for missing fields
impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            prefix: default_prefix(),
            max_workers: None,
            reply_on_failure: default_true(),
            reply_on_rejection: default_true(),
            trim: Default::default(),
            unknown_options: Default::default(),
            duplicate_options: Default::default(),
            case_sensitive: false,
            max_optional_arguments: default_max_optional(),
            overrides: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let cfg = Self::from_json(&raw)?;
        info!("Loaded command config from {}", path.as_ref().display());
        Ok(cfg)
    }

    /// Reads `.env`, then `COMMAND_CONFIG` (path to a JSON file) and `COMMAND_PREFIX`.
    pub fn from_env() -> EngineResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!("Failed to read .env: {e}");
            }
        }

        let mut cfg = match env::var("COMMAND_CONFIG") {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(prefix) = env::var("COMMAND_PREFIX") {
            cfg.prefix = prefix;
        }

        Ok(cfg)
    }

    pub fn policy_for(&self, path: &str) -> Option<&CommandPolicy> {
        self.overrides.get(path)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::{cooldown::cooldown::CooldownScope, tokenizer::tokenizer::TrimPolicy};

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg = EngineConfig::from_json("{}").unwrap();
        assert_eq!(cfg.prefix, "!");
        assert!(cfg.reply_on_failure);
        assert_eq!(cfg.trim, TrimPolicy::Lenient);
        assert_eq!(cfg.max_optional_arguments, 8);
    }

    #[test]
    fn default_matches_an_empty_config_file() {
        let loaded = serde_json::to_value(EngineConfig::from_json("{}").unwrap()).unwrap();
        let built = serde_json::to_value(EngineConfig::default()).unwrap();
        assert_eq!(loaded, built);
    }

    #[test]
    fn overrides_are_keyed_by_path() {
        let cfg = EngineConfig::from_json(
            r#"{
                "prefix": "?",
                "trim": "strict",
                "overrides": {
                    "queue join": { "cooldown": { "duration": 1500, "scope": "user_channel" } }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.prefix, "?");
        assert_eq!(cfg.trim, TrimPolicy::Strict);
        let policy = cfg.policy_for("queue join").unwrap();
        let cooldown = policy.cooldown.as_ref().unwrap();
        assert_eq!(cooldown.duration, Duration::from_millis(1500));
        assert_eq!(cooldown.scope, CooldownScope::UserChannel);
    }
}
