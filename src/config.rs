//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. Explicit path (e.g. `--config <path>`)
//! 2. `~/.muninn/config.toml` (user)
//! 3. `/etc/muninn/config.toml` (system)
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.muninn/secrets.toml` (user, must be 0600)
//! 2. `/etc/muninn/secrets.toml` (system, must be 0600)
//!
//! Missing secrets fall back to `MUNINN_CLIENT_ID` / `MUNINN_ACCESS_TOKEN`.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::limiter::RateLimitConfig;
use crate::parallel::ParallelConfig;
use crate::providers::RetryConfig;
use crate::{MuninnError, Result};

const CLIENT_ID_ENV: &str = "MUNINN_CLIENT_ID";
const ACCESS_TOKEN_ENV: &str = "MUNINN_ACCESS_TOKEN";

/// Resolver configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub parallel: ParallelSection,
    #[serde(default)]
    pub request: RequestSection,
    #[serde(default)]
    pub retry: RetrySection,
}

/// Remote catalog settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// Catalog base URL (default: the public catalog).
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Admission quota and cool-down.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSection {
    /// Requests admitted per window (default: 1000).
    #[serde(default = "default_quota")]
    pub quota: usize,
    /// Window length in seconds (default: 300).
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// First cool-down after a remote rate violation, in ms (default: 1000).
    #[serde(default = "default_cooldown_base_ms")]
    pub cooldown_base_ms: u64,
    /// Cool-down cap in ms (default: 60000).
    #[serde(default = "default_cooldown_max_ms")]
    pub cooldown_max_ms: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            quota: default_quota(),
            window_secs: default_window_secs(),
            cooldown_base_ms: default_cooldown_base_ms(),
            cooldown_max_ms: default_cooldown_max_ms(),
        }
    }
}

impl RateLimitSection {
    pub fn to_rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig::new()
            .quota(self.quota)
            .window(Duration::from_secs(self.window_secs))
            .cooldown_base(Duration::from_millis(self.cooldown_base_ms))
            .cooldown_max(Duration::from_millis(self.cooldown_max_ms))
    }
}

fn default_quota() -> usize {
    1000
}

fn default_window_secs() -> u64 {
    300
}

fn default_cooldown_base_ms() -> u64 {
    1000
}

fn default_cooldown_max_ms() -> u64 {
    60_000
}

/// Result cache bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Maximum live entries (default: 10000).
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Entry lifetime in seconds (default: 3600).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheSection {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.max_entries)
            .ttl(Duration::from_secs(self.ttl_secs))
    }
}

fn default_max_entries() -> usize {
    10_000
}

fn default_ttl_secs() -> u64 {
    3600
}

/// Concurrency and batching.
#[derive(Debug, Clone, Deserialize)]
pub struct ParallelSection {
    /// Maximum remote calls in flight (default: 10).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Items per batch (default: 50).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between batches in ms (default: 0).
    #[serde(default)]
    pub inter_batch_delay_ms: u64,
}

impl Default for ParallelSection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            batch_size: default_batch_size(),
            inter_batch_delay_ms: 0,
        }
    }
}

impl ParallelSection {
    pub fn to_parallel_config(&self) -> ParallelConfig {
        ParallelConfig::new()
            .concurrency(self.concurrency)
            .batch_size(self.batch_size)
            .inter_batch_delay(Duration::from_millis(self.inter_batch_delay_ms))
    }
}

fn default_concurrency() -> usize {
    10
}

fn default_batch_size() -> usize {
    50
}

/// Per-request limits.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestSection {
    /// Timeout for each remote call in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Re-admissions per item after a remote rate-limit signal (default: 5).
    #[serde(default = "default_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
}

impl Default for RequestSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_rate_limit_retries() -> u32 {
    5
}

/// Transient-error retry.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Wrap the catalog in a retrying decorator (default: false).
    #[serde(default)]
    pub enabled: bool,
    /// Attempts including the first (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in ms (default: 500).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Delay cap in ms (default: 30000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySection {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_attempts(self.max_attempts)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// Catalog credentials.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub catalog: Option<CatalogSecret>,
}

/// Credentials for the HTTP catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSecret {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.muninn/config.toml`
    /// 3. `/etc/muninn/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        Self::load_from_file(&path)
    }

    /// Like [`load`](Self::load), but falls back to defaults when no file
    /// exists in the standard locations. An explicit path must exist.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        if explicit_path.is_some() {
            return Self::load(explicit_path);
        }
        match Self::find_config_path() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            MuninnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(MuninnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        Self::find_config_path().ok_or_else(|| {
            MuninnError::Configuration(
                "No config file found. Create ~/.muninn/config.toml or /etc/muninn/config.toml"
                    .to_string(),
            )
        })
    }

    fn find_config_path() -> Option<PathBuf> {
        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".muninn").join("config.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/muninn/config.toml");
        system_config.exists().then_some(system_config)
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.muninn/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/muninn/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (env vars may still apply).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".muninn").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/muninn/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load a secrets file, rejecting it unless only the owner can read it.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            MuninnError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(MuninnError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// Catalog client id, falling back to `MUNINN_CLIENT_ID`.
    pub fn client_id(&self) -> Option<String> {
        self.catalog
            .as_ref()
            .and_then(|c| c.client_id.clone())
            .or_else(|| std::env::var(CLIENT_ID_ENV).ok())
    }

    /// Catalog access token, falling back to `MUNINN_ACCESS_TOKEN`.
    pub fn access_token(&self) -> Option<String> {
        self.catalog
            .as_ref()
            .and_then(|c| c.access_token.clone())
            .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.rate_limit.quota, 1000);
        assert_eq!(config.rate_limit.window_secs, 300);
        assert_eq!(config.cache.max_entries, 10_000);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.parallel.concurrency, 10);
        assert_eq!(config.parallel.batch_size, 50);
        assert_eq!(config.request.timeout_secs, 30);
        assert_eq!(config.request.max_rate_limit_retries, 5);
        assert!(!config.retry.enabled);
        assert!(config.catalog.base_url.is_none());
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [rate_limit]
            quota = 100
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.rate_limit.quota, 100);
        // Defaults preserved
        assert_eq!(config.rate_limit.window_secs, 300);
        assert_eq!(config.parallel.concurrency, 10);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [catalog]
            base_url = "http://localhost:8080"

            [rate_limit]
            quota = 500
            window_secs = 60
            cooldown_base_ms = 250
            cooldown_max_ms = 8000

            [cache]
            max_entries = 42
            ttl_secs = 5

            [parallel]
            concurrency = 4
            batch_size = 20
            inter_batch_delay_ms = 100

            [request]
            timeout_secs = 10
            max_rate_limit_retries = 2

            [retry]
            enabled = true
            max_attempts = 4
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.catalog.base_url.as_deref(),
            Some("http://localhost:8080")
        );

        let rate = config.rate_limit.to_rate_limit_config();
        assert_eq!(rate.quota, 500);
        assert_eq!(rate.window, Duration::from_secs(60));
        assert_eq!(rate.cooldown_base, Duration::from_millis(250));
        assert_eq!(rate.cooldown_max, Duration::from_secs(8));

        let cache = config.cache.to_cache_config();
        assert_eq!(cache.max_entries, 42);
        assert_eq!(cache.ttl, Duration::from_secs(5));

        let parallel = config.parallel.to_parallel_config();
        assert_eq!(parallel.concurrency, 4);
        assert_eq!(parallel.batch_size, 20);
        assert_eq!(parallel.inter_batch_delay, Duration::from_millis(100));

        assert_eq!(config.request.timeout_secs, 10);
        assert_eq!(config.request.max_rate_limit_retries, 2);

        assert!(config.retry.enabled);
        let retry = config.retry.to_retry_config();
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.initial_delay, Duration::from_millis(500));
    }

    #[test]
    fn parse_secrets() {
        let toml = r#"
            [catalog]
            client_id = "client"
            access_token = "token"
        "#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.client_id().as_deref(), Some("client"));
        assert_eq!(secrets.access_token().as_deref(), Some("token"));
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nmax_entries = 7").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.cache.max_entries, 7);
    }

    #[test]
    fn malformed_config_is_a_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache\nmax_entries = ").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, MuninnError::Configuration(_)));
    }

    #[cfg(unix)]
    #[test]
    fn world_readable_secrets_are_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[catalog]\naccess_token = \"t\"").unwrap();
        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o644)).unwrap();

        let err = Secrets::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("insecure permissions"));
    }

    #[cfg(unix)]
    #[test]
    fn owner_only_secrets_load() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[catalog]\nclient_id = \"abc\"").unwrap();
        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o600)).unwrap();

        let secrets = Secrets::load_from_file(file.path()).unwrap();
        assert_eq!(
            secrets.catalog.and_then(|c| c.client_id).as_deref(),
            Some("abc")
        );
    }
}
