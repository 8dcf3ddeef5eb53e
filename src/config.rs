use reqwest::Url;
use std::env;

/// Webhook the chat posts to unless overridden.
pub const DEFAULT_WEBHOOK_URL: &str = "https://anuragmn8n.app.n8n.cloud/webhook/consulting-prep-ai";

pub const WEBHOOK_URL_VAR: &str = "CONSULTING_PREP_WEBHOOK_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid http(s) URL: {value}")]
    InvalidEndpoint { var: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub webhook_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let webhook_url = match lookup(WEBHOOK_URL_VAR) {
            Some(raw) if !raw.trim().is_empty() => validate_endpoint(raw.trim())?,
            _ => DEFAULT_WEBHOOK_URL.to_string(),
        };
        Ok(Self { webhook_url })
    }
}

fn validate_endpoint(raw: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidEndpoint {
        var: WEBHOOK_URL_VAR,
        value: raw.to_string(),
    };
    let url = Url::parse(raw).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(raw.to_string())
}
