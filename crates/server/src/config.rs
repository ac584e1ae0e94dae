//! Relay configuration loaded from environment variables.
//!
//! The configuration is read once at startup into an immutable
//! [`RelayConfig`] that is handed to every component; nothing reads the
//! environment after that.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SLACK_BOT_TOKEN` - Slack bot token (xoxb-...). The process refuses to start without it.
//! - `RELAY_SHARED_SECRET` - Bearer secret required on `POST /notify-approver`
//! - `JIRA_BASE_URL` - Jira site URL (e.g., <https://corp.atlassian.net>)
//! - `JIRA_EMAIL` - Jira account used for API calls
//! - `JIRA_API_TOKEN` - Jira API token for that account
//!
//! ## Optional
//! - `RELAY_HOST` - Bind address (default: 127.0.0.1)
//! - `RELAY_PORT` - Listen port (default: 3000)
//! - `SLACK_SIGNING_SECRET` - Enables signature verification of Slack callbacks
//! - `SLACK_API_BASE` - Slack Web API base URL (default: <https://slack.com/api>)
//! - `APPROVE_TRANSITION_ID` - Jira transition for "Approve" (default: 61)
//! - `REJECT_TRANSITION_ID` - Jira transition for "Reject" (default: 71)
//! - `SEND_INTERVAL_MS` - Pause between direct messages (default: 1100)
//! - `DEDUP_WINDOW_SECS` - Duplicate click suppression window, 0 disables (default: 300)
//! - `HTTP_TIMEOUT_SECS` - Outbound request timeout (default: 15)
//! - `JIRA_PENDING_JQL` - Query behind the `/approvals` slash command
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (TLS)
//! - `RELAY_TLS_CERT` - PEM-encoded certificate chain
//! - `RELAY_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use approval_relay_core::{Decision, TicketKey, TransitionId};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SHARED_SECRET_LENGTH: usize = 24;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
const DEFAULT_PENDING_JQL: &str =
    "status = \"Waiting for approval\" ORDER BY priority DESC, created ASC";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text.
    Text,
    /// One JSON object per event.
    Json,
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer secret for `POST /notify-approver`
    pub shared_secret: SecretString,
    /// Slack configuration
    pub slack: SlackConfig,
    /// Jira configuration
    pub jira: JiraConfig,
    /// Transition IDs per decision
    pub transitions: TransitionConfig,
    /// Pause between consecutive direct messages in one fan-out
    pub send_interval: Duration,
    /// Duplicate interaction suppression window (zero disables)
    pub dedup_window: Duration,
    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Slack Web API configuration.
///
/// Implements `Debug` manually to redact secrets.
#[derive(Clone)]
pub struct SlackConfig {
    /// Slack bot token (xoxb-...).
    pub bot_token: SecretString,
    /// Slack app signing secret; callbacks are verified only when set.
    pub signing_secret: Option<SecretString>,
    /// Web API base URL.
    pub api_base: String,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field(
                "signing_secret",
                &self.signing_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Jira REST API configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct JiraConfig {
    /// Jira site URL.
    pub base_url: Url,
    /// Account email for basic auth.
    pub email: String,
    /// API token for basic auth.
    pub api_token: SecretString,
    /// JQL listing tickets that wait for approval.
    pub pending_jql: String,
}

impl std::fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraConfig")
            .field("base_url", &self.base_url.as_str())
            .field("email", &self.email)
            .field("api_token", &"[REDACTED]")
            .field("pending_jql", &self.pending_jql)
            .finish()
    }
}

impl JiraConfig {
    /// Site URL without trailing slash.
    #[must_use]
    pub fn site(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Browser URL of a ticket.
    #[must_use]
    pub fn browse_url(&self, key: &TicketKey) -> String {
        format!("{}/browse/{key}", self.site())
    }
}

/// Jira transition IDs for each decision.
#[derive(Debug, Clone, Copy)]
pub struct TransitionConfig {
    /// Transition applied on approval.
    pub approve: TransitionId,
    /// Transition applied on rejection.
    pub reject: TransitionId,
}

impl TransitionConfig {
    /// Transition ID for a decision.
    #[must_use]
    pub const fn for_decision(&self, decision: Decision) -> TransitionId {
        match decision {
            Decision::Approve => self.approve,
            Decision::Reject => self.reject,
        }
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            approve: TransitionId::new(61),
            reject: TransitionId::new(71),
        }
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

/// Source of configuration values.
///
/// Production reads the process environment; tests pass a map.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

impl RelayConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the shared secret fails validation (placeholder detection, entropy
    /// check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`RelayConfig::from_env`].
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let slack = SlackConfig::load(&env)?;
        let host = env.parsed::<IpAddr>("RELAY_HOST", "127.0.0.1")?;
        let port = env.parsed::<u16>("RELAY_PORT", "3000")?;

        let shared_secret = env.required("RELAY_SHARED_SECRET")?;
        validate_shared_secret(&shared_secret, "RELAY_SHARED_SECRET")?;

        let jira = JiraConfig::load(&env)?;
        let transitions = TransitionConfig {
            approve: TransitionId::new(env.parsed("APPROVE_TRANSITION_ID", "61")?),
            reject: TransitionId::new(env.parsed("REJECT_TRANSITION_ID", "71")?),
        };
        if transitions.approve == transitions.reject {
            return Err(ConfigError::InvalidEnvVar(
                "APPROVE_TRANSITION_ID".to_string(),
                "must differ from REJECT_TRANSITION_ID".to_string(),
            ));
        }

        let send_interval = Duration::from_millis(env.parsed("SEND_INTERVAL_MS", "1100")?);
        let dedup_window = Duration::from_secs(env.parsed("DEDUP_WINDOW_SECS", "300")?);
        let http_timeout = Duration::from_secs(env.parsed::<u64>("HTTP_TIMEOUT_SECS", "15")?.max(1));

        let log_format = match env.optional("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let sentry_sample_rate = env
            .optional("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = env
            .optional("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            host,
            port,
            shared_secret: SecretString::from(shared_secret),
            slack,
            jira,
            transitions,
            send_interval,
            dedup_window,
            http_timeout,
            log_format,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls: TlsConfig::load(&env)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SlackConfig {
    fn load(env: &Env<'_>) -> Result<Self, ConfigError> {
        let bot_token = env.required("SLACK_BOT_TOKEN")?;
        if !bot_token.starts_with("xoxb-") {
            tracing::warn!("SLACK_BOT_TOKEN does not look like a bot token (xoxb-...)");
        }

        let signing_secret = env.optional("SLACK_SIGNING_SECRET").map(|secret| {
            if let Err(e) = validate_secret_strength(&secret, "SLACK_SIGNING_SECRET") {
                tracing::warn!("SLACK_SIGNING_SECRET validation warning: {e}");
            }
            SecretString::from(secret)
        });

        let api_base = env
            .or_default("SLACK_API_BASE", DEFAULT_SLACK_API_BASE)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            signing_secret,
            api_base,
        })
    }
}

impl JiraConfig {
    fn load(env: &Env<'_>) -> Result<Self, ConfigError> {
        let raw_url = env.required("JIRA_BASE_URL")?;
        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("JIRA_BASE_URL".to_string(), e.to_string()))?;

        Ok(Self {
            base_url,
            email: env.required("JIRA_EMAIL")?,
            api_token: SecretString::from(env.required("JIRA_API_TOKEN")?),
            pending_jql: env.or_default("JIRA_PENDING_JQL", DEFAULT_PENDING_JQL),
        })
    }
}

impl TlsConfig {
    fn load(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        match (env.optional("RELAY_TLS_CERT"), env.optional("RELAY_TLS_KEY")) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "RELAY_TLS_*".to_string(),
                "Both RELAY_TLS_CERT and RELAY_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Validate the shared secret: minimum length, no placeholder, enough entropy.
fn validate_shared_secret(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_SHARED_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SHARED_SECRET_LENGTH,
                secret.len()
            ),
        ));
    }
    validate_secret_strength(secret, var_name)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

impl RelayConfig {
    /// Whether the shared secret matches a presented bearer credential.
    #[must_use]
    pub fn shared_secret_matches(&self, presented: &str) -> bool {
        crate::middleware::constant_time_eq(self.shared_secret.expose_secret(), presented)
    }
}
