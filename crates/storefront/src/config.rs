//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Cart backend (one of)
//! - `SUPABASE_URL` + `SUPABASE_ANON_KEY` - hosted `PostgREST` project
//! - `MAUVE_DATABASE_URL` (or `DATABASE_URL`) - direct `PostgreSQL` connection
//!
//! Supabase wins when both are present.
//!
//! ## Optional
//! - `MAUVE_STORAGE_PATH` - Local storage file (default: platform data dir)
//! - `WHATSAPP_PHONE` - Order line in international format (default: 2348140588890)
//! - `PAYSTACK_SECRET_KEY` - Enables card checkout (high entropy, no placeholders)
//! - `PAYSTACK_BASE_URL` - Paystack API root (default: <https://api.paystack.co>)
//! - `MAUVE_LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const DEFAULT_WHATSAPP_PHONE: &str = "2348140588890";
const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Where cart rows live
    pub backend: CartBackend,
    /// Local storage file override
    pub storage_path: Option<PathBuf>,
    /// WhatsApp number orders are sent to, digits only
    pub whatsapp_phone: String,
    /// Card checkout, disabled when absent
    pub paystack: Option<PaystackConfig>,
    /// Emit JSON logs instead of text
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
}

/// The remote cart item table to talk to.
#[derive(Debug, Clone)]
pub enum CartBackend {
    Supabase(SupabaseConfig),
    Postgres {
        /// `PostgreSQL` connection URL (contains password)
        database_url: SecretString,
    },
}

impl CartBackend {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Supabase(_) => "supabase",
            Self::Postgres { .. } => "postgres",
        }
    }
}

/// Supabase project configuration.
///
/// Implements `Debug` manually to redact the key.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abc.supabase.co`
    pub url: Url,
    /// Anonymous API key
    pub anon_key: SecretString,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// Paystack configuration.
///
/// Implements `Debug` manually to redact the key.
#[derive(Clone)]
pub struct PaystackConfig {
    /// Secret API key (`sk_live_...` / `sk_test_...`)
    pub secret_key: SecretString,
    /// API root
    pub base_url: Url,
}

impl fmt::Debug for PaystackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaystackConfig")
            .field("secret_key", &"[REDACTED]")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no backend is configured, a value is invalid,
    /// or the Paystack key fails validation (placeholder detection, entropy
    /// check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(&Env::new(|key| std::env::var(key).ok()))
    }

    fn from_source(env: &Env<'_>) -> Result<Self, ConfigError> {
        let backend = CartBackend::from_source(env)?;
        let storage_path = env.optional("MAUVE_STORAGE_PATH").map(PathBuf::from);
        let whatsapp_phone = parse_phone(
            "WHATSAPP_PHONE",
            &env.or_default("WHATSAPP_PHONE", DEFAULT_WHATSAPP_PHONE),
        )?;
        let paystack = PaystackConfig::from_source(env)?;
        let log_json = env
            .optional("MAUVE_LOG_FORMAT")
            .is_some_and(|format| format.eq_ignore_ascii_case("json"));
        let sentry_dsn = env.optional("SENTRY_DSN");
        let sentry_environment = env.optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env
            .optional("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            backend,
            storage_path,
            whatsapp_phone,
            paystack,
            log_json,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
        })
    }
}

impl CartBackend {
    fn from_source(env: &Env<'_>) -> Result<Self, ConfigError> {
        if let (Some(url), Some(anon_key)) =
            (env.optional("SUPABASE_URL"), env.optional("SUPABASE_ANON_KEY"))
        {
            let url = Url::parse(&url)
                .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;
            return Ok(Self::Supabase(SupabaseConfig {
                url,
                anon_key: SecretString::from(anon_key),
            }));
        }

        // Fallback to generic DATABASE_URL (set by Fly.io postgres attach)
        let database_url = env
            .optional("MAUVE_DATABASE_URL")
            .or_else(|| env.optional("DATABASE_URL"))
            .ok_or_else(|| {
                ConfigError::MissingEnvVar(
                    "SUPABASE_URL and SUPABASE_ANON_KEY, or MAUVE_DATABASE_URL".to_string(),
                )
            })?;

        Ok(Self::Postgres {
            database_url: SecretString::from(database_url),
        })
    }
}

impl PaystackConfig {
    /// Bearer header value.
    pub(crate) fn authorization(&self) -> String {
        format!("Bearer {}", self.secret_key.expose_secret())
    }

    fn from_source(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let Some(secret_key) = env.optional("PAYSTACK_SECRET_KEY") else {
            return Ok(None);
        };
        validate_secret_strength(&secret_key, "PAYSTACK_SECRET_KEY")?;

        let base_url = env.or_default("PAYSTACK_BASE_URL", DEFAULT_PAYSTACK_BASE_URL);
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("PAYSTACK_BASE_URL".to_string(), e.to_string())
        })?;

        Ok(Some(Self {
            secret_key: SecretString::from(secret_key),
            base_url,
        }))
    }
}

/// Database URL for tools that only need `PostgreSQL` (migrations).
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither `MAUVE_DATABASE_URL` nor
/// `DATABASE_URL` is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    let env = Env::new(|key| std::env::var(key).ok());
    env.optional("MAUVE_DATABASE_URL")
        .or_else(|| env.optional("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar("MAUVE_DATABASE_URL".to_string()))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup, so parsing can be tested without touching the process env.
struct Env<'a> {
    lookup: Box<dyn Fn(&str) -> Option<String> + 'a>,
}

impl<'a> Env<'a> {
    fn new(lookup: impl Fn(&str) -> Option<String> + 'a) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}

/// Normalize a phone number to the digits `wa.me` expects.
fn parse_phone(var_name: &str, raw: &str) -> Result<String, ConfigError> {
    let digits: String = raw
        .trim()
        .trim_start_matches('+')
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();

    if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must be 7-15 digits in international format".to_string(),
        ));
    }
    Ok(digits)
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
    let len = s.len() as f64;
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key from the Paystack dashboard."
            ),
        ));
    }

    Ok(())
}
