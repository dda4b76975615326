use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::ProviderConfig;
use crate::credential::Credentials;
use crate::error::{ConfigError, ProviderError};
use crate::types::{
    AREA_CODE_COUNTRIES, AllocatedNumber, AvailablePhoneNumber, AvailablePhoneNumbers,
    IncomingPhoneNumber, NumberRequest, TwilioErrorBody,
};

const API_VERSION: &str = "2010-04-01";
const SEARCH_PAGE_SIZE: &str = "1";
const USER_AGENT: &str = concat!("request-number/", env!("CARGO_PKG_VERSION"));

/// Source of newly allocated phone numbers.
///
/// One call allocates at most one number. Implementations make a single attempt:
/// no retries, no caching.
#[async_trait]
pub trait NumberProvider: Send + Sync {
    async fn acquire_number(&self, request: &NumberRequest)
    -> Result<AllocatedNumber, ProviderError>;

    /// Whether credentials are present. Used by the health check.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Twilio REST adapter. Owns the account credentials.
pub struct TwilioClient {
    http_client: Client,
    config: ProviderConfig,
}

impl TwilioClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ConfigError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(ProviderConfig::from_env()?)
    }

    fn credentials(&self) -> Result<&Credentials, ProviderError> {
        match &self.config.credentials {
            Some(creds) if creds.is_complete() => Ok(creds),
            _ => Err(ProviderError::auth("Twilio credentials are not configured")),
        }
    }

    fn account_url(&self, creds: &Credentials, resource: &str) -> String {
        format!(
            "{}/{}/Accounts/{}/{}",
            self.config.api_base, API_VERSION, creds.account_sid, resource
        )
    }

    /// Look up the first purchasable local number in `country`
    async fn find_available(
        &self,
        creds: &Credentials,
        country: &str,
    ) -> Result<AvailablePhoneNumber, ProviderError> {
        let url = self.account_url(creds, &format!("AvailablePhoneNumbers/{}/Local.json", country));
        tracing::debug!(%country, "Searching available local numbers");

        let response = self
            .http_client
            .get(url)
            .basic_auth(&creds.account_sid, Some(&creds.auth_token))
            .query(&[("PageSize", SEARCH_PAGE_SIZE)])
            .send()
            .await?;

        let page: AvailablePhoneNumbers = parse_response(response).await?;
        page.available_phone_numbers
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Rejected {
                status: None,
                code: None,
                message: format!("no phone numbers available in {}", country),
            })
    }
}

#[async_trait]
impl NumberProvider for TwilioClient {
    async fn acquire_number(
        &self,
        request: &NumberRequest,
    ) -> Result<AllocatedNumber, ProviderError> {
        let creds = self.credentials()?;
        request.validate()?;

        // Request values win over configured defaults. The default area code
        // belongs to the configured country and is not carried into another one.
        let country = request
            .country
            .clone()
            .unwrap_or_else(|| self.config.country.clone());
        let area_code = match &request.area_code {
            Some(area_code) => Some(area_code.clone()),
            None if country == self.config.country => self.config.default_area_code.clone(),
            None => None,
        };
        if area_code.is_some() && !AREA_CODE_COUNTRIES.contains(&country.as_str()) {
            return Err(ProviderError::InvalidRequest(format!(
                "area_code is only supported for US and CA numbers, not {}",
                country
            )));
        }
        let effective = NumberRequest {
            area_code,
            country: Some(country.clone()),
            friendly_name: request.friendly_name.clone(),
        };
        effective.validate()?;

        let mut form: Vec<(&str, String)> = Vec::with_capacity(2);
        match &effective.area_code {
            Some(area_code) => {
                tracing::info!(%area_code, "Requesting new number by area code");
                form.push(("AreaCode", area_code.clone()));
            }
            None => {
                let candidate = self.find_available(creds, &country).await?;
                tracing::info!(
                    phone_number = %candidate.phone_number,
                    locality = candidate.locality.as_deref().unwrap_or("-"),
                    region = candidate.region.as_deref().unwrap_or("-"),
                    "Requesting available number"
                );
                form.push(("PhoneNumber", candidate.phone_number));
            }
        }
        if let Some(name) = &effective.friendly_name {
            form.push(("FriendlyName", name.clone()));
        }

        let response = self
            .http_client
            .post(self.account_url(creds, "IncomingPhoneNumbers.json"))
            .basic_auth(&creds.account_sid, Some(&creds.auth_token))
            .form(&form)
            .send()
            .await?;

        let number: IncomingPhoneNumber = parse_response(response).await?;
        tracing::info!(sid = %number.sid, phone_number = %number.phone_number, "Number allocated");
        Ok(number.into())
    }

    fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }
}

/// Decode a success body or classify the failure
async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let err = classify_failure(status, &body);
        tracing::warn!(%status, error = %err, "Twilio request failed");
        return Err(err);
    }

    serde_json::from_str(&body)
        .map_err(|e| ProviderError::unavailable(format!("Failed to parse response: {}", e)))
}

/// Map a non-2xx Twilio response onto the error taxonomy.
///
/// 401/403 are credential problems, other 4xx are refusals carrying Twilio's error
/// code, everything else means the provider could not serve the call.
pub fn classify_failure(status: StatusCode, body: &str) -> ProviderError {
    let parsed: Option<TwilioErrorBody> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().and_then(|b| b.code);
    let message = parsed
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::auth(message),
        s if s.is_client_error() => ProviderError::Rejected {
            status: Some(s.as_u16()),
            code,
            message,
        },
        s => ProviderError::unavailable(format!("{} {}", s.as_u16(), message)),
    }
}
