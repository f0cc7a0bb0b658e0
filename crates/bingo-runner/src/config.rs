use std::collections::HashMap;

use serde::Deserialize;

use bingo_core::player::{IdentityError, SessionIdentity, keys};
use bingo_http::HttpAuthorityConfig;
use bingo_session::SessionConfig;

/// Runner configuration, loaded from `bingo.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub api_url: String,
    pub player_id: Option<String>,
    pub room_id: Option<String>,
    pub user_name: Option<String>,
    pub session: SessionConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            player_id: None,
            room_id: None,
            user_name: None,
            session: SessionConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Load config from `bingo.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("bingo.toml") {
            Ok(content) => match toml::from_str::<RunnerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from bingo.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse bingo.toml: {e}, using defaults");
                    RunnerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No bingo.toml found, using defaults");
                RunnerConfig::default()
            },
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Apply `BINGO_*` overrides; empty or unparsable values are ignored.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = set("BINGO_API_URL") {
            self.api_url = url;
        }
        if let Some(id) = set("BINGO_PLAYER_ID") {
            self.player_id = Some(id);
        }
        if let Some(id) = set("BINGO_ROOM_ID") {
            self.room_id = Some(id);
        }
        if let Some(name) = set("BINGO_USER_NAME") {
            self.user_name = Some(name);
        }
        if let Some(val) = set("BINGO_POLL_INTERVAL_MS")
            && let Ok(ms) = val.trim().parse::<u64>()
        {
            self.session.poll_interval_ms = ms;
            self.session.rematch_poll_interval_ms = ms;
        }
        if let Some(val) = set("BINGO_REQUEST_TIMEOUT_MS")
            && let Ok(ms) = val.trim().parse::<u64>()
        {
            self.session.request_timeout_ms = ms;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.http().validate()?;
        self.session.validate()
    }

    pub fn http(&self) -> HttpAuthorityConfig {
        HttpAuthorityConfig {
            request_timeout_ms: self.session.request_timeout_ms,
            ..HttpAuthorityConfig::new(self.api_url.as_str())
        }
    }

    /// Session identity from the configured values, keyed the same way the
    /// rest of the client stores them.
    pub fn identity(&self) -> Result<SessionIdentity, IdentityError> {
        let mut pairs = HashMap::new();
        for (key, value) in [
            (keys::PLAYER_ID, &self.player_id),
            (keys::ROOM_ID, &self.room_id),
            (keys::USER_NAME, &self.user_name),
        ] {
            if let Some(value) = value {
                pairs.insert(key.to_string(), value.clone());
            }
        }
        SessionIdentity::from_pairs(&pairs)
    }
}
