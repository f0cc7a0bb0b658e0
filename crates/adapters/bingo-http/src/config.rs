use std::time::Duration;

/// Connection settings for the game-room backend.
#[derive(Debug, Clone)]
pub struct HttpAuthorityConfig {
    /// Scheme, host and port, e.g. `http://localhost:5000`.
    pub base_url: String,
    /// Per-request timeout enforced by the HTTP client.
    pub request_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for HttpAuthorityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_ms: 5000,
            user_agent: "bingo-http/0.1".to_string(),
        }
    }
}

impl HttpAuthorityConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Base URL without a trailing slash.
    pub fn root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<(), String> {
        let root = self.root();
        if !(root.starts_with("http://") || root.starts_with("https://")) {
            return Err(format!("api url must start with http:// or https://, got {root:?}"));
        }
        if self.request_timeout_ms == 0 {
            return Err("request_timeout_ms must be > 0".to_string());
        }
        Ok(())
    }
}
