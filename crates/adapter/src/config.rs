use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const APP_PREFIX: &str = "RELIEF_";

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:4000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_url: String,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientSettings {
    /// Reads `RELIEF_API_URL` and `RELIEF_REQUEST_TIMEOUT_SECS` (the unprefixed
    /// names work too).
    pub fn from_env() -> Self {
        let api_url: String = get_env("API_URL", DEFAULT_API_URL.to_string());
        let secs: u64 = get_env("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS);
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(secs.max(1)),
        }
    }
}

fn get_env<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    <T as FromStr>::Err: Display,
{
    let prefixed_key = format!("{}{}", APP_PREFIX, key);
    let raw_value = match std::env::var(&prefixed_key).or_else(|_| std::env::var(key)) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw_value.parse::<T>() {
        Ok(v) => v,
        Err(e) => {
            warn!(
                "Failed to parse env var '{}={}'. Error: {}. Using default: {}",
                key, raw_value, e, default
            );
            default
        }
    }
}
