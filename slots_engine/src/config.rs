use std::{str::FromStr, time::Duration};

use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEMO_BALANCE: f64 = 100.0;

/// What to do when the ledger cannot be reached while placing a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BetFallback {
    /// Deduct the bet from the in-memory balance and play on.
    #[default]
    Local,
    /// Abort the round without touching the balance.
    Abort,
}

impl FromStr for BetFallback {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(BetFallback::Local),
            "abort" => Ok(BetFallback::Abort),
            other => Err(ConfigError::Invalid {
                key: "SLOTS_BET_FALLBACK",
                value: other.to_string(),
            }),
        }
    }
}

/// Inclusive bounds a chosen bet must respect (the upper bound is also capped by the balance).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetLimits {
    pub min: u32,
    pub max: u32,
}

impl Default for BetLimits {
    fn default() -> Self {
        Self { min: 1, max: 100 }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("invalid ledger url: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ledger Service root; endpoint paths are resolved relative to it.
    pub api_base_url: Url,
    /// Bearer token of the logged-in player. Without it every round is local.
    pub access_token: Option<String>,
    pub demo_balance: f64,
    pub bet_limits: BetLimits,
    pub bet_fallback: BetFallback,
    pub http_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: normalize_base(
                Url::parse(DEFAULT_API_BASE_URL).expect("default url is valid"),
            ),
            access_token: None,
            demo_balance: DEMO_BALANCE,
            bet_limits: BetLimits::default(),
            bet_fallback: BetFallback::default(),
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key/value source, falling back to defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup("SLOTS_API_BASE_URL") {
            config = config.with_base_url(&url)?;
        }
        config.access_token = lookup("SLOTS_ACCESS_TOKEN").filter(|t| !t.is_empty());
        if let Some(policy) = lookup("SLOTS_BET_FALLBACK") {
            config.bet_fallback = policy.parse()?;
        }
        if let Some(secs) = lookup("SLOTS_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "SLOTS_HTTP_TIMEOUT_SECS",
                value: secs.clone(),
            })?;
            config.http_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_base(Url::parse(url)?);
        Ok(self)
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_bet_fallback(mut self, policy: BetFallback) -> Self {
        self.bet_fallback = policy;
        self
    }
}

// Url::join drops the last path segment unless it ends in '/'
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
