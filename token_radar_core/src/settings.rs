use crate::error::CoreError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    // Upstream endpoints
    #[serde(default = "default_pump_api_base_url")]
    pub pump_api_base_url: String,
    #[serde(default = "default_dexscreener_base_url")]
    pub dexscreener_base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Sent verbatim as the `Cookie` header on pump.fun requests.
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_breaker_failure_threshold")]
    pub breaker_failure_threshold: u32,
    #[serde(default = "default_breaker_cooldown_secs")]
    pub breaker_cooldown_secs: u64,
    #[serde(default)]
    pub include_nsfw: bool,

    // Classification and paging
    #[serde(default = "default_bonding_threshold_usd")]
    pub bonding_threshold_usd: f64,
    #[serde(default = "default_upstream_fetch_limit")]
    pub upstream_fetch_limit: usize,
    #[serde(default = "default_page_limit")]
    pub default_page_limit: usize,
    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: usize,

    // Caching
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_quote_cache_ttl_secs")]
    pub quote_cache_ttl_secs: u64,

    // Bonding monitor
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
    #[serde(default)]
    pub monitor_autostart: bool,
    #[serde(default = "default_max_recent_events")]
    pub max_recent_events: usize,
    #[serde(default = "default_snapshot_capacity")]
    pub snapshot_capacity: usize,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    // API server
    #[serde(default = "default_api_host")]
    pub api_host: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pump_api_base_url: default_pump_api_base_url(),
            dexscreener_base_url: default_dexscreener_base_url(),
            user_agent: default_user_agent(),
            origin: default_origin(),
            cookie: None,
            request_timeout_secs: default_request_timeout_secs(),
            requests_per_second: default_requests_per_second(),
            breaker_failure_threshold: default_breaker_failure_threshold(),
            breaker_cooldown_secs: default_breaker_cooldown_secs(),
            include_nsfw: false,
            bonding_threshold_usd: default_bonding_threshold_usd(),
            upstream_fetch_limit: default_upstream_fetch_limit(),
            default_page_limit: default_page_limit(),
            max_page_limit: default_max_page_limit(),
            cache_capacity: default_cache_capacity(),
            quote_cache_ttl_secs: default_quote_cache_ttl_secs(),
            monitor_interval_secs: default_monitor_interval_secs(),
            monitor_autostart: false,
            max_recent_events: default_max_recent_events(),
            snapshot_capacity: default_snapshot_capacity(),
            data_dir: default_data_dir(),
            api_host: default_api_host(),
            api_port: default_api_port(),
        }
    }
}

impl Settings {
    /// Load from a TOML file that must exist.
    #[cfg(feature = "native")]
    pub fn from_file(path: &str) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    /// Load from an optional TOML file, then let `TOKEN_RADAR_*` environment
    /// variables override individual keys (`TOKEN_RADAR_API_PORT=9000`).
    #[cfg(feature = "native")]
    pub fn load(path: &str) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("TOKEN_RADAR")
                    .prefix_separator("_")
                    .try_parsing(true),
            );
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    #[cfg(feature = "native")]
    pub fn save_to_file(&self, path: &str) -> Result<(), CoreError> {
        let toml_string = toml::to_string(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Validate settings ranges and constraints
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, value) in [
            ("pump_api_base_url", &self.pump_api_base_url),
            ("dexscreener_base_url", &self.dexscreener_base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| CoreError::Validation(format!("{} is not a valid URL: {}", name, e)))?;
        }
        if !(self.bonding_threshold_usd.is_finite() && self.bonding_threshold_usd > 0.0) {
            return Err(CoreError::Validation("bonding_threshold_usd must be > 0".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Validation("request_timeout_secs must be > 0".to_string()));
        }
        if self.requests_per_second == 0 {
            return Err(CoreError::Validation("requests_per_second must be > 0".to_string()));
        }
        if self.breaker_failure_threshold == 0 {
            return Err(CoreError::Validation("breaker_failure_threshold must be > 0".to_string()));
        }
        if self.cache_capacity == 0 {
            return Err(CoreError::Validation("cache_capacity must be > 0".to_string()));
        }
        if self.upstream_fetch_limit == 0 {
            return Err(CoreError::Validation("upstream_fetch_limit must be > 0".to_string()));
        }
        if self.default_page_limit == 0 {
            return Err(CoreError::Validation("default_page_limit must be > 0".to_string()));
        }
        if self.max_page_limit < self.default_page_limit {
            return Err(CoreError::Validation("max_page_limit must be >= default_page_limit".to_string()));
        }
        if self.monitor_interval_secs == 0 {
            return Err(CoreError::Validation("monitor_interval_secs must be > 0".to_string()));
        }
        if self.snapshot_capacity == 0 {
            return Err(CoreError::Validation("snapshot_capacity must be > 0".to_string()));
        }
        Ok(())
    }

    /// Clamp a caller-supplied page size into `1..=max_page_limit`.
    pub fn page_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_limit)
            .clamp(1, self.max_page_limit.max(1))
    }
}

fn default_pump_api_base_url() -> String { "https://frontend-api-v3.pump.fun".to_string() }
fn default_dexscreener_base_url() -> String { "https://api.dexscreener.com".to_string() }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string()
}
fn default_origin() -> String { "https://pump.fun".to_string() }
fn default_request_timeout_secs() -> u64 { 30 }
fn default_requests_per_second() -> u32 { 5 }
fn default_breaker_failure_threshold() -> u32 { 5 }
fn default_breaker_cooldown_secs() -> u64 { 30 }
fn default_bonding_threshold_usd() -> f64 { crate::classifier::DEFAULT_BONDING_THRESHOLD_USD }
fn default_upstream_fetch_limit() -> usize { 100 }
fn default_page_limit() -> usize { 50 }
fn default_max_page_limit() -> usize { 200 }
fn default_cache_capacity() -> usize { 1024 }
fn default_quote_cache_ttl_secs() -> u64 { 30 }
fn default_monitor_interval_secs() -> u64 { 60 }
fn default_max_recent_events() -> usize { 100 }
fn default_snapshot_capacity() -> usize { 10_000 }
fn default_data_dir() -> String { "data".to_string() }
fn default_api_host() -> String { "0.0.0.0".to_string() }
fn default_api_port() -> u16 { 8080 }
