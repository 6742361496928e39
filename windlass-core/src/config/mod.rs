//! Connection settings
//!
//! Settings are plain in-memory values supplied by the embedding application;
//! persisting saved server profiles is the application's concern, not this
//! crate's.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::DEFAULT_CHANNEL_LIMIT;

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Remote platforms the dashboard knows how to manage
pub const SUPPORTED_PLATFORMS: &[&str] = &["FreeBSD"];

/// Settings for establishing one authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Remote hostname or IP address
    pub host: String,
    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login username
    pub username: String,
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Bound on concurrently open command channels
    #[serde(default = "default_channel_limit")]
    pub channel_limit: usize,
    /// Remote operating systems accepted at connect time
    #[serde(default = "default_platforms")]
    pub allowed_platforms: Vec<String>,
}

const fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

const fn default_channel_limit() -> usize {
    DEFAULT_CHANNEL_LIMIT
}

fn default_platforms() -> Vec<String> {
    SUPPORTED_PLATFORMS.iter().map(ToString::to_string).collect()
}

impl SessionSettings {
    /// Creates settings for `username@host` with defaults for everything else
    #[must_use]
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            username: username.into(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            channel_limit: DEFAULT_CHANNEL_LIMIT,
            allowed_platforms: default_platforms(),
        }
    }

    /// Sets the SSH port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connect timeout in seconds
    #[must_use]
    pub const fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Sets the bound on concurrently open command channels
    #[must_use]
    pub const fn with_channel_limit(mut self, limit: usize) -> Self {
        self.channel_limit = limit;
        self
    }

    /// Replaces the platform allow-list
    #[must_use]
    pub fn with_allowed_platforms(mut self, platforms: Vec<String>) -> Self {
        self.allowed_platforms = platforms;
        self
    }

    /// The connect timeout as a [`Duration`]
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Whether `platform` is on the allow-list
    #[must_use]
    pub fn is_platform_allowed(&self, platform: &str) -> bool {
        self.allowed_platforms.iter().any(|p| p == platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SessionSettings::new("bastion.example.net", "admin");
        assert_eq!(settings.port, 22);
        assert_eq!(settings.connect_timeout_secs, 15);
        assert_eq!(settings.channel_limit, DEFAULT_CHANNEL_LIMIT);
        assert!(settings.is_platform_allowed("FreeBSD"));
        assert!(!settings.is_platform_allowed("Linux"));
    }

    #[test]
    fn test_builders() {
        let settings = SessionSettings::new("10.0.0.1", "root")
            .with_port(2222)
            .with_connect_timeout_secs(5)
            .with_channel_limit(2)
            .with_allowed_platforms(vec!["FreeBSD".into(), "DragonFly".into()]);
        assert_eq!(settings.port, 2222);
        assert_eq!(settings.connect_timeout(), Duration::from_secs(5));
        assert_eq!(settings.channel_limit, 2);
        assert!(settings.is_platform_allowed("DragonFly"));
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let json = r#"{"host":"fbsd.lan","username":"ops"}"#;
        let settings: SessionSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.port, 22);
        assert_eq!(settings.allowed_platforms, vec!["FreeBSD".to_string()]);
    }
}
