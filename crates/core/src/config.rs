// Layered queue configuration
// Precedence: explicit option -> ZEPLO_* env var -> built-in default

use crate::error::ConfigError;
use crate::retry::Retry;
use chrono::{DateTime, Utc};

const PRODUCTION_API_URL: &str = "https://zeplo.to";
const DEV_SERVER_API_URL: &str = "http://localhost:4747";

/// Enqueue target selection.
///
/// The mode fully determines the effective API URL prefix unless an
/// explicit option or `ZEPLO_API_URL` overrides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Hosted queue service.
    #[default]
    Production,
    /// Local dev server.
    DevServer,
    /// No network hop: enqueue loops back into the in-process
    /// delivery handler before resolving.
    Direct,
}

impl Mode {
    pub fn default_api_url(&self) -> &'static str {
        match self {
            Mode::Production => PRODUCTION_API_URL,
            Mode::DevServer => DEV_SERVER_API_URL,
            Mode::Direct => "",
        }
    }
}

/// Enqueue delay, forwarded to the queue service as a query param.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    /// Relative delay in seconds (`_delay`).
    Seconds(u64),
    /// Absolute point in time (`_delay_until`, epoch millis).
    Until(DateTime<Utc>),
}

/// Declaration-time options for a queue. Unset fields fall back to
/// the ZEPLO_* environment and then to built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct QueueOptions {
    pub api_url: Option<String>,
    pub base_url: Option<String>,
    pub mode: Option<Mode>,
    pub token: Option<String>,
    pub encryption_secret: Option<String>,
    /// Retired secrets, tried in order when decryption with the
    /// current secret fails.
    pub old_secrets: Option<Vec<String>>,
    pub env: Option<String>,
    pub delay: Option<Delay>,
    pub retry: Option<Retry>,
}

/// Per-call overrides. `trace` is only settable here, never at
/// declaration time.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub delay: Option<Delay>,
    pub retry: Option<Retry>,
    pub trace: Option<String>,
}

/// Snapshot of the ZEPLO_* process environment, captured once when
/// the queue is declared.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub token: Option<String>,
    pub base_url: Option<String>,
    pub api_url: Option<String>,
    pub encryption_secret: Option<String>,
    /// Raw `ZEPLO_OLD_SECRETS` value, a JSON array of strings.
    pub old_secrets: Option<String>,
}

impl EnvOverrides {
    pub fn capture() -> Self {
        Self {
            token: std::env::var("ZEPLO_TOKEN").ok(),
            base_url: std::env::var("ZEPLO_BASE_URL").ok(),
            api_url: std::env::var("ZEPLO_API_URL").ok(),
            encryption_secret: std::env::var("ZEPLO_ENCRYPTION_SECRET").ok(),
            old_secrets: std::env::var("ZEPLO_OLD_SECRETS").ok(),
        }
    }
}

/// Fully-resolved configuration for one queue. Immutable after the
/// queue is built.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_url: String,
    pub base_url: String,
    pub mode: Mode,
    pub token: Option<String>,
    pub encryption_secret: Option<String>,
    pub old_secrets: Vec<String>,
    pub env: String,
    pub default_delay: Option<Delay>,
    pub default_retry: Option<Retry>,
}

/// Merge one queue's options with the captured environment.
///
/// Evaluated once per queue declaration, not per call.
pub fn resolve(opts: &QueueOptions, env: &EnvOverrides) -> Result<ResolvedConfig, ConfigError> {
    let mode = opts.mode.unwrap_or_default();

    let old_secrets = match (&opts.old_secrets, &env.old_secrets) {
        (Some(explicit), _) => explicit.clone(),
        (None, Some(raw)) => serde_json::from_str::<Vec<String>>(raw)
            .map_err(|e| ConfigError::InvalidOldSecrets(e.to_string()))?,
        (None, None) => Vec::new(),
    };

    Ok(ResolvedConfig {
        api_url: opts
            .api_url
            .clone()
            .or_else(|| env.api_url.clone())
            .unwrap_or_else(|| mode.default_api_url().to_string()),
        base_url: opts
            .base_url
            .clone()
            .or_else(|| env.base_url.clone())
            .unwrap_or_default(),
        mode,
        token: opts.token.clone().or_else(|| env.token.clone()),
        encryption_secret: opts
            .encryption_secret
            .clone()
            .or_else(|| env.encryption_secret.clone()),
        old_secrets,
        env: opts.env.clone().unwrap_or_else(|| "production".to_string()),
        default_delay: opts.delay,
        default_retry: opts.retry,
    })
}
