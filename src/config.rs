//! Environment-driven configuration.
//!
//! Everything is read once at startup. `from_lookup` takes the variable source as
//! a closure so tests don't have to touch the process environment.

use std::env;
use std::time::Duration;

use crate::credential::Credentials;
use crate::error::ConfigError;
use crate::types::{AREA_CODE_COUNTRIES, NumberRequest};

pub const ACCOUNT_SID_VAR: &str = "TWILIO_ACCOUNT_SID";
pub const AUTH_TOKEN_VAR: &str = "TWILIO_AUTH_TOKEN";
pub const API_BASE_VAR: &str = "TWILIO_API_BASE";
pub const TIMEOUT_VAR: &str = "TWILIO_TIMEOUT_SECS";
pub const DEFAULT_AREA_CODE_VAR: &str = "TWILIO_DEFAULT_AREA_CODE";
pub const COUNTRY_VAR: &str = "TWILIO_COUNTRY";
pub const PORT_VAR: &str = "PORT";
pub const API_KEY_VAR: &str = "REQUEST_NUMBER_API_KEY";

pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";
pub const DEFAULT_COUNTRY: &str = "US";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PORT: u16 = 3000;

/// Settings for the Twilio adapter
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// `None` when either variable is unset or empty
    pub credentials: Option<Credentials>,
    pub api_base: String,
    pub timeout: Duration,
    pub default_area_code: Option<String>,
    pub country: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            default_area_code: None,
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let credentials = match (get(ACCOUNT_SID_VAR), get(AUTH_TOKEN_VAR)) {
            (Some(sid), Some(token)) => Some(Credentials::new(sid, token)),
            _ => None,
        };

        let timeout = match get(TIMEOUT_VAR) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: TIMEOUT_VAR,
                        value: raw,
                    });
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        let country = get(COUNTRY_VAR)
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
        let country_check = NumberRequest {
            country: Some(country.clone()),
            ..Default::default()
        };
        if country_check.validate().is_err() {
            return Err(ConfigError::Invalid {
                var: COUNTRY_VAR,
                value: country,
            });
        }

        // Area codes only exist for the countries Twilio accepts them in
        let default_area_code = get(DEFAULT_AREA_CODE_VAR);
        if let Some(area_code) = &default_area_code
            && (NumberRequest::with_area_code(area_code.as_str())
                .validate()
                .is_err()
                || !AREA_CODE_COUNTRIES.contains(&country.as_str()))
        {
            return Err(ConfigError::Invalid {
                var: DEFAULT_AREA_CODE_VAR,
                value: area_code.clone(),
            });
        }

        Ok(Self {
            credentials,
            api_base: get(API_BASE_VAR)
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            timeout,
            default_area_code,
            country,
        })
    }

    /// Credentials or the name of the first missing variable
    pub fn require_credentials(&self) -> Result<&Credentials, ConfigError> {
        match &self.credentials {
            Some(creds) if creds.is_complete() => Ok(creds),
            Some(creds) if creds.account_sid.trim().is_empty() => Err(ConfigError::Missing {
                var: ACCOUNT_SID_VAR,
            }),
            Some(_) => Err(ConfigError::Missing {
                var: AUTH_TOKEN_VAR,
            }),
            None => Err(ConfigError::Missing {
                var: ACCOUNT_SID_VAR,
            }),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Bearer key callers must present to allocate numbers; open endpoint when unset
    pub api_key: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(PORT_VAR) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: PORT_VAR,
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            api_key: lookup(API_KEY_VAR)
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
        })
    }
}
