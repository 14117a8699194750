//! Configuration file parser for ~/.config/farmfeed/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning when the file
//! contains potential typos.
use crate::model::{Author, Feed, Role};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Environment variable holding the bearer token. Takes precedence over the file.
pub const TOKEN_ENV_VAR: &str = "FARMFEED_TOKEN";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// The signed-in user, used as author of optimistic entities and for
/// delete permission checks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub role: Role,
    pub verified: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: "You".to_string(),
            avatar: None,
            role: Role::User,
            verified: false,
        }
    }
}

impl ViewerConfig {
    pub fn to_author(&self) -> Author {
        Author {
            id: self.id.clone(),
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            verified: self.verified,
            role: self.role,
        }
    }
}

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The custom Debug impl masks `auth_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend API root, e.g. `https://farmconnect.example.com/api/`.
    pub api_base_url: String,

    /// Bearer token (alternative to the FARMFEED_TOKEN env var).
    pub auth_token: Option<String>,

    pub posts_page_size: u32,
    pub stories_page_size: u32,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Retries for failed reads. Writes are never retried.
    pub max_retries: u32,

    /// Age after which a loaded feed is refetched on the next first-page
    /// request. 0 = only explicit invalidation or refresh.
    pub cache_ttl_secs: u64,

    /// Number of single-story lookups kept in the detail cache.
    pub story_cache_capacity: usize,

    pub viewer: ViewerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api/".to_string(),
            auth_token: None,
            posts_page_size: 10,
            stories_page_size: 9,
            request_timeout_secs: 30,
            max_retries: 3,
            cache_ttl_secs: 0,
            story_cache_capacity: 32,
            viewer: ViewerConfig::default(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("posts_page_size", &self.posts_page_size)
            .field("stories_page_size", &self.stories_page_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("story_cache_capacity", &self.story_cache_capacity)
            .field("viewer", &self.viewer)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "api_base_url",
        "auth_token",
        "posts_page_size",
        "stories_page_size",
        "request_timeout_secs",
        "max_retries",
        "cache_ttl_secs",
        "story_cache_capacity",
        "viewer",
    ];

    const KNOWN_VIEWER_KEYS: [&'static str; 5] = ["id", "name", "avatar", "role", "verified"];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
            if let Some(viewer) = raw.get("viewer").and_then(toml::Value::as_table) {
                for key in viewer.keys() {
                    if !Self::KNOWN_VIEWER_KEYS.contains(&key.as_str()) {
                        tracing::warn!(key = %key, "Unknown key in [viewer], ignoring");
                    }
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            path = %path.display(),
            api = %config.api_base_url,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Bearer token: FARMFEED_TOKEN if set and non-empty, else the file's `auth_token`.
    pub fn auth_token(&self) -> Option<SecretString> {
        self.resolve_token(std::env::var(TOKEN_ENV_VAR).ok())
    }

    fn resolve_token(&self, env_token: Option<String>) -> Option<SecretString> {
        env_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.auth_token.clone().filter(|t| !t.trim().is_empty()))
            .map(SecretString::from)
    }

    pub fn page_size(&self, feed: Feed) -> u32 {
        match feed {
            Feed::Posts => self.posts_page_size,
            Feed::Stories => self.stories_page_size,
        }
    }

    /// Feed TTL, or `None` when feeds never expire on their own.
    pub fn cache_ttl(&self) -> Option<chrono::Duration> {
        if self.cache_ttl_secs == 0 {
            return None;
        }
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn write_config(name: &str, content: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("farmfeed_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.posts_page_size, 10);
        assert_eq!(config.stories_page_size, 9);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.cache_ttl(), None);
        assert!(config.auth_token.is_none());
        assert_eq!(config.viewer.role, Role::User);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/farmfeed_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.posts_page_size, 10);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (dir, path) = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_base_url, Config::default().api_base_url);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let content = r#"
api_base_url = "https://farm.example.com/api/"
auth_token = "file-token"
posts_page_size = 20
stories_page_size = 6
request_timeout_secs = 10
max_retries = 1
cache_ttl_secs = 300
story_cache_capacity = 8

[viewer]
id = "u42"
name = "Asha"
role = "admin"
verified = true
"#;
        let (dir, path) = write_config("full", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_base_url, "https://farm.example.com/api/");
        assert_eq!(config.page_size(Feed::Posts), 20);
        assert_eq!(config.page_size(Feed::Stories), 6);
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.cache_ttl(), Some(chrono::Duration::seconds(300)));
        assert_eq!(config.story_cache_capacity, 8);

        let viewer = config.viewer.to_author();
        assert_eq!(viewer.id, "u42");
        assert!(viewer.is_admin());
        assert!(viewer.verified);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_viewer_uses_defaults() {
        let (dir, path) = write_config("partial_viewer", "[viewer]\nid = \"u1\"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.viewer.id, "u1");
        assert_eq!(config.viewer.name, "You");
        assert_eq!(config.posts_page_size, 10);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let content = "posts_page_size = 12\ntotally_fake_key = 1\n[viewer]\nnickname = \"x\"\n";
        let (dir, path) = write_config("unknown", content);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.posts_page_size, 12);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let (dir, path) = write_config("wrongtype", "posts_page_size = \"ten\"\n");
        assert!(Config::load(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_env_token_takes_precedence() {
        let config = Config {
            auth_token: Some("file-token".to_string()),
            ..Config::default()
        };

        let token = config.resolve_token(Some("env-token".to_string())).unwrap();
        assert_eq!(token.expose_secret(), "env-token");

        let token = config.resolve_token(Some("  ".to_string())).unwrap();
        assert_eq!(token.expose_secret(), "file-token");

        let token = config.resolve_token(None).unwrap();
        assert_eq!(token.expose_secret(), "file-token");

        assert!(Config::default().resolve_token(None).is_none());
    }

    #[test]
    fn test_debug_masks_token() {
        let config = Config {
            auth_token: Some("super-secret-token-12345".to_string()),
            ..Config::default()
        };

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-token-12345"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_debug_shows_none_when_no_token() {
        let debug_output = format!("{:?}", Config::default());
        assert!(!debug_output.contains("[REDACTED]"));
    }
}
