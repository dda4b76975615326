pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod server;
pub mod types;

pub use client::{NumberProvider, TwilioClient};
pub use config::{ProviderConfig, ServerConfig};
pub use credential::Credentials;
pub use error::{ConfigError, ProviderError};
pub use server::{AppState, build_app};
pub use types::{AllocatedNumber, NumberRequest};
