//! # Service Configuration
//!
//! Loaded once at startup from environment variables. Every variable is
//! optional; an unparseable value aborts startup with a [`ConfigError`]
//! naming the variable rather than silently falling back to the default.
//!
//! | Variable                        | Default                              |
//! |---------------------------------|--------------------------------------|
//! | `PORT`                          | `8080`                               |
//! | `UPLOAD_DIR`                    | `uploads`                            |
//! | `MAX_FILE_SIZE`                 | `10485760` (10 MiB)                  |
//! | `MAX_FILES`                     | `10`                                 |
//! | `CHECK_MIME_TYPE`               | `false`                              |
//! | `ALLOWED_MIME_TYPES`            | `image/*,application/pdf,text/plain` |
//! | `RECORD_CONTENT_HASH`           | `true`                               |
//! | `UPLOAD_RATE_LIMIT_MAX`         | `20`                                 |
//! | `UPLOAD_RATE_LIMIT_WINDOW_SECS` | `60`                                 |
//! | `LOAD_RATE_LIMIT_MAX`           | `100`                                |
//! | `LOAD_RATE_LIMIT_WINDOW_SECS`   | `60`                                 |
//! | `CORS_ORIGINS`                  | `*`                                  |
//! | `TRUST_FORWARDED_FOR`           | `false`                              |

use std::path::PathBuf;
use std::str::FromStr;

use depot_core::MimePolicy;
use thiserror::Error;

use crate::middleware::rate_limit::RateLimitConfig;

const DEFAULT_ALLOWED_MIME_TYPES: &str = "image/*,application/pdf,text/plain";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Root directory for date-partitioned blobs.
    pub upload_dir: PathBuf,
    /// Per-file byte cap enforced while reading multipart parts.
    pub max_file_size: usize,
    /// Maximum number of files per upload request.
    pub max_files: usize,
    /// Declared-MIME allow-list; disabled unless `CHECK_MIME_TYPE` is set.
    pub mime_policy: MimePolicy,
    /// Record a SHA-256 digest at ingestion and verify it on retrieval.
    pub record_content_hash: bool,
    /// Budget for `POST /v1/files/upload`.
    pub upload_rate_limit: RateLimitConfig,
    /// Budget for `POST /v1/files/load` and direct downloads.
    pub load_rate_limit: RateLimitConfig,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
    /// Key rate limits by `X-Forwarded-For`. Enable only behind a proxy
    /// that sets the header.
    pub trust_forwarded_for: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            upload_dir: PathBuf::from("uploads"),
            max_file_size: 10 * 1024 * 1024,
            max_files: 10,
            mime_policy: MimePolicy::disabled(),
            record_content_hash: true,
            upload_rate_limit: RateLimitConfig {
                max_requests: 20,
                window_secs: 60,
            },
            load_rate_limit: RateLimitConfig {
                max_requests: 100,
                window_secs: 60,
            },
            cors_origins: vec!["*".to_string()],
            trust_forwarded_for: false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let env = Env { lookup: &lookup };

        let check_mime = env.parse_bool("CHECK_MIME_TYPE", false)?;
        let mime_policy = if check_mime {
            let raw = env
                .get("ALLOWED_MIME_TYPES")
                .unwrap_or_else(|| DEFAULT_ALLOWED_MIME_TYPES.to_string());
            MimePolicy::allow_list(raw.split(','))
        } else {
            MimePolicy::disabled()
        };

        let cors_origins = match env.get("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.cors_origins,
        };

        Ok(Self {
            port: env.parse("PORT", defaults.port)?,
            upload_dir: env
                .get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_file_size: env.parse_positive("MAX_FILE_SIZE", defaults.max_file_size)?,
            max_files: env.parse_positive("MAX_FILES", defaults.max_files)?,
            mime_policy,
            record_content_hash: env.parse_bool("RECORD_CONTENT_HASH", true)?,
            upload_rate_limit: RateLimitConfig {
                max_requests: env.parse_positive(
                    "UPLOAD_RATE_LIMIT_MAX",
                    defaults.upload_rate_limit.max_requests,
                )?,
                window_secs: env.parse_positive(
                    "UPLOAD_RATE_LIMIT_WINDOW_SECS",
                    defaults.upload_rate_limit.window_secs,
                )?,
            },
            load_rate_limit: RateLimitConfig {
                max_requests: env.parse_positive(
                    "LOAD_RATE_LIMIT_MAX",
                    defaults.load_rate_limit.max_requests,
                )?,
                window_secs: env.parse_positive(
                    "LOAD_RATE_LIMIT_WINDOW_SECS",
                    defaults.load_rate_limit.window_secs,
                )?,
            },
            cors_origins,
            trust_forwarded_for: env.parse_bool("TRUST_FORWARDED_FOR", false)?,
        })
    }

    /// Body limit for the upload route: every permitted file at full size,
    /// plus headroom for multipart boundaries and part headers.
    pub fn upload_body_limit(&self) -> usize {
        const MULTIPART_OVERHEAD: usize = 64 * 1024;
        self.max_file_size
            .saturating_mul(self.max_files)
            .saturating_add(MULTIPART_OVERHEAD)
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn get(&self, var: &str) -> Option<String> {
        (self.lookup)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(var) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value: raw,
            }),
        }
    }

    fn parse_positive<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + PartialOrd + Default + std::fmt::Display,
        T::Err: std::fmt::Display,
    {
        let value = self.parse(var, default)?;
        if value <= T::default() {
            return Err(ConfigError::Invalid {
                var,
                value: value.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    }

    fn parse_bool(&self, var: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.get(var) {
            None => Ok(default),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    var,
                    value: raw,
                    reason: "expected true or false".to_string(),
                }),
            },
        }
    }
}
