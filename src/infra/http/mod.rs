//! HTTP adapters for the content API and the media host.

pub mod content;
pub mod media;

use std::time::Duration;

use reqwest::Client;

use super::error::InfraError;

pub use content::ApiClient;
pub use media::{MediaHostClient, UnconfiguredMediaHost};

/// Default per-request timeout for both adapters.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub fn user_agent() -> &'static str {
    concat!("folio/", env!("CARGO_PKG_VERSION"))
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client, InfraError> {
    Client::builder()
        .user_agent(user_agent())
        .timeout(timeout)
        .build()
        .map_err(|err| InfraError::configuration(format!("failed to build HTTP client: {err}")))
}
