//! Provider credential types.
//!
//! Defines the account SID / auth token pair used to authenticate Twilio requests.

use std::fmt;

/// Twilio account credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_sid: String,
    pub auth_token: String,
}

impl Credentials {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Both values must be non-empty before any remote call is attempted.
    pub fn is_complete(&self) -> bool {
        !self.account_sid.trim().is_empty() && !self.auth_token.trim().is_empty()
    }
}

// Keep the token out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}
