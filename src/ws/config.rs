use std::time::Duration;

use bon::Builder;
use secrecy::{ExposeSecret as _, SecretString};

use crate::Result;
use crate::error::Error;

const DEFAULT_RECONNECT_INTERVAL_DURATION: Duration = Duration::from_millis(5000);

/// Immutable settings for a [`super::ConnectionManager`].
///
/// ```
/// use std::time::Duration;
/// use resilient_ws::ws::config::Config;
///
/// let config = Config::builder()
///     .endpoint("wss://example.com/socket")
///     .token("opaque-token".to_owned())
///     .reconnect_interval(Duration::from_secs(1))
///     .build();
///
/// assert_eq!(config.reconnect_interval, Duration::from_secs(1));
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// Base URL of the socket, without the token query parameter
    #[builder(into)]
    pub endpoint: String,
    /// Opaque credential appended to the endpoint as `?token=`
    #[builder(into)]
    pub token: SecretString,
    /// Fixed delay between reconnection attempts
    #[builder(default = DEFAULT_RECONNECT_INTERVAL_DURATION)]
    pub reconnect_interval: Duration,
}

impl Config {
    /// Checks the settings that must hold before any network action is taken.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(Error::validation("url can not be empty"));
        }
        if self.token.expose_secret().is_empty() {
            return Err(Error::validation("token can not be empty"));
        }
        if self.reconnect_interval.is_zero() {
            return Err(Error::validation(
                "reconnect interval must be greater than zero",
            ));
        }

        Ok(())
    }

    /// The URL actually dialed: the endpoint with the token appended verbatim.
    ///
    /// The result embeds the credential and must not be logged.
    #[must_use]
    pub fn composed_url(&self) -> String {
        format!("{}?token={}", self.endpoint, self.token.expose_secret())
    }
}
