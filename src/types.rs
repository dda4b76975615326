use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

static AREA_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3}$").expect("valid area code regex"));
static COUNTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}$").expect("valid country regex"));

/// Request to allocate one new phone number.
///
/// Every field is optional; an empty request asks for any local number in the
/// configured country.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NumberRequest {
    #[serde(default)]
    pub area_code: Option<String>,
    /// ISO 3166-1 alpha-2 country code, e.g. "US"
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub friendly_name: Option<String>,
}

impl NumberRequest {
    pub fn with_area_code(area_code: impl Into<String>) -> Self {
        Self {
            area_code: Some(area_code.into()),
            ..Default::default()
        }
    }

    /// Check field formats before anything is sent to the provider
    pub fn validate(&self) -> Result<(), ProviderError> {
        if let Some(area_code) = &self.area_code
            && !AREA_CODE_RE.is_match(area_code)
        {
            return Err(ProviderError::InvalidRequest(format!(
                "area_code must be three digits, got {:?}",
                area_code
            )));
        }
        if let Some(country) = &self.country
            && !COUNTRY_RE.is_match(country)
        {
            return Err(ProviderError::InvalidRequest(format!(
                "country must be a two-letter upper-case code, got {:?}",
                country
            )));
        }
        if let Some(name) = &self.friendly_name
            && name.chars().count() > MAX_FRIENDLY_NAME_LEN
        {
            return Err(ProviderError::InvalidRequest(format!(
                "friendly_name is limited to {} characters",
                MAX_FRIENDLY_NAME_LEN
            )));
        }
        Ok(())
    }
}

/// Countries where Twilio accepts `AreaCode` on number creation
pub const AREA_CODE_COUNTRIES: [&str; 2] = ["US", "CA"];

/// Twilio caps FriendlyName at 64 characters
pub const MAX_FRIENDLY_NAME_LEN: usize = 64;

/// A phone number newly allocated by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedNumber {
    /// Provider resource identifier (PN...)
    pub sid: String,
    /// E.164 formatted number
    pub phone_number: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
}

/// IncomingPhoneNumber resource returned by the create call
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingPhoneNumber {
    pub sid: String,
    pub phone_number: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
}

impl From<IncomingPhoneNumber> for AllocatedNumber {
    fn from(number: IncomingPhoneNumber) -> Self {
        Self {
            sid: number.sid,
            phone_number: number.phone_number,
            friendly_name: number.friendly_name,
        }
    }
}

/// Page of candidates from the AvailablePhoneNumbers search
#[derive(Debug, Deserialize)]
pub struct AvailablePhoneNumbers {
    #[serde(default)]
    pub available_phone_numbers: Vec<AvailablePhoneNumber>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailablePhoneNumber {
    pub phone_number: String,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// Error body Twilio sends with non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioErrorBody {
    #[serde(default)]
    pub code: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}
