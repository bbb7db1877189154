use super::transport::Transport;
use crate::config::Application;
use crate::models::{Event, MixpanelError, UpdateOperation};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tap::Tap;
use tracing::{debug, info, warn};
use url::Url;

pub const HOST: &str = "api.mixpanel.com";
/// <https://developer.mixpanel.com/docs/http#section-events>
pub const TRACK_ENDPOINT: &str = "https://api.mixpanel.com/track/";
/// <https://developer.mixpanel.com/docs/http#section-profile-updates>
pub const ENGAGE_ENDPOINT: &str = "https://api.mixpanel.com/engage/";

const DATA: &str = "data";

/// Mixpanel API client bound to one project token.
///
/// `track` and `update` make exactly one request each and never retry. They
/// return `Ok(true)` when Mixpanel answers `1`, `Ok(false)` for any other body
/// and an error when the request itself failed.
#[derive(Clone, Debug)]
pub struct Client<T = reqwest::Client> {
    token: SecretString,
    transport: T,
}

impl Client {
    pub fn new(token: SecretString) -> Self {
        Self::with_transport(token, reqwest::Client::new())
    }

    pub fn from_config(settings: &Application) -> Self {
        Self::new(settings.token.clone())
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(token: SecretString, transport: T) -> Self {
        Self { token, transport }
    }

    /// # Errors
    ///
    /// `MixpanelError::Request` or `MixpanelError::Transport` when the round
    /// trip fails, `MixpanelError::SerdeJson` if the event fails to encode.
    #[tracing::instrument(skip(self, event), fields(event = %event.title))]
    pub async fn track(&self, event: &Event) -> Result<bool, MixpanelError> {
        let payload = event.to_json_with_token(self.token.expose_secret())?;
        self.submit(TRACK_ENDPOINT, &payload).await
    }

    /// # Errors
    ///
    /// Same as [`Client::track`].
    #[tracing::instrument(skip(self, operation), fields(verb = %operation.verb()))]
    pub async fn update(&self, operation: &UpdateOperation) -> Result<bool, MixpanelError> {
        let payload = operation.to_json_with_token(self.token.expose_secret())?;
        self.submit(ENGAGE_ENDPOINT, &payload).await
    }

    async fn submit(&self, endpoint: &str, payload: &str) -> Result<bool, MixpanelError> {
        // The url carries the token, so only its size is logged.
        let url = request_url(endpoint, payload)?
            .tap(|url| debug!(endpoint, url_length = url.as_str().len(), "Built request url"));
        let body = self.transport.submit(url).await?;

        if body == "1" {
            info!(endpoint, "Mixpanel accepted payload");
            Ok(true)
        } else {
            warn!(endpoint, %body, "Mixpanel rejected payload");
            Ok(false)
        }
    }
}

/// Builds the GET url for `endpoint` with `payload` base64-encoded into `data`.
///
/// # Errors
///
/// `MixpanelError::Url` if `endpoint` is not a valid url.
pub fn request_url(endpoint: &str, payload: &str) -> Result<Url, MixpanelError> {
    let mut url = Url::parse(endpoint)?;
    url.query_pairs_mut().append_pair(DATA, &STANDARD.encode(payload));
    Ok(url)
}

/// Decodes the payload carried by a url built with [`request_url`].
///
/// # Errors
///
/// `MixpanelError::MissingData` without a `data` parameter, otherwise the
/// base64 or JSON decoding error.
pub fn decode_request<P: DeserializeOwned>(url: &Url) -> Result<P, MixpanelError> {
    let (_, encoded) = url
        .query_pairs()
        .find(|(key, _)| key == DATA)
        .ok_or(MixpanelError::MissingData)?;
    let json = STANDARD.decode(encoded.as_bytes())?;
    Ok(serde_json::from_slice(&json)?)
}
