use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

pub const DEFAULT_AI21_BASE_URL: &str = "https://api.ai21.com/studio/v1";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 300;
const DEFAULT_RETRY_MAX_ELAPSED_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppealConfig {
    pub common: core_config::Config,
    pub ai21: Ai21Config,
    pub maestro: MaestroConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Ai21Config {
    /// Bearer credential for every AI21 Studio call.
    pub api_key: Secret<String>,
    pub base_url: String,
    /// Per-HTTP-call timeout; the overall run wait is bounded separately.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct MaestroConfig {
    pub poll_interval_ms: u64,
    pub run_timeout_secs: u64,
    /// Budget for retrying transient upstream errors on a single call.
    pub retry_max_elapsed_secs: u64,
}

impl Ai21Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl MaestroConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn retry_max_elapsed(&self) -> Duration {
        Duration::from_secs(self.retry_max_elapsed_secs)
    }
}

impl Default for MaestroConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            run_timeout_secs: DEFAULT_RUN_TIMEOUT_SECS,
            retry_max_elapsed_secs: DEFAULT_RETRY_MAX_ELAPSED_SECS,
        }
    }
}

impl AppealConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(AppealConfig {
            common: common_config,
            ai21: Ai21Config {
                api_key: Secret::new(get_env("AI21_API_KEY", None, is_prod)?),
                base_url: get_env("AI21_API_BASE_URL", Some(DEFAULT_AI21_BASE_URL), is_prod)?,
                request_timeout_secs: get_env_u64(
                    "AI21_REQUEST_TIMEOUT_SECS",
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                    is_prod,
                )?,
            },
            maestro: MaestroConfig {
                poll_interval_ms: get_env_nonzero_u64(
                    "MAESTRO_POLL_INTERVAL_MS",
                    DEFAULT_POLL_INTERVAL_MS,
                    is_prod,
                )?,
                run_timeout_secs: get_env_u64(
                    "MAESTRO_RUN_TIMEOUT_SECS",
                    DEFAULT_RUN_TIMEOUT_SECS,
                    is_prod,
                )?,
                retry_max_elapsed_secs: get_env_u64(
                    "MAESTRO_RETRY_MAX_ELAPSED_SECS",
                    DEFAULT_RETRY_MAX_ELAPSED_SECS,
                    is_prod,
                )?,
            },
            otlp_endpoint: otlp_endpoint(),
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn get_env_u64(key: &str, default: u64, is_prod: bool) -> Result<u64, AppError> {
    get_env(key, Some(&default.to_string()), is_prod)?
        .parse()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("{} must be an integer: {}", key, e)))
}

/// Zero would turn polling into a busy loop against the upstream.
fn get_env_nonzero_u64(key: &str, default: u64, is_prod: bool) -> Result<u64, AppError> {
    match get_env_u64(key, default, is_prod)? {
        0 => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} must be greater than zero",
            key
        ))),
        value => Ok(value),
    }
}

/// OTLP export target; unset or empty disables trace export.
pub fn otlp_endpoint() -> Option<String> {
    env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty())
}
