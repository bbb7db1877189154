use crate::models::MixpanelError;
use async_trait::async_trait;
use tracing::debug;
use url::Url;

/// Performs the single GET round trip behind `track` and `update`.
///
/// Implementations return the raw response body of a successful response and
/// an error for anything that kept the body from arriving: DNS, connect,
/// timeout, a non-2xx status or a failed body read.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn submit(&self, url: Url) -> Result<String, MixpanelError>;
}

#[async_trait]
impl Transport for reqwest::Client {
    // The query carries the base64 payload and with it the token.
    #[tracing::instrument(skip(self, url), fields(host = url.host_str(), path = url.path()))]
    async fn submit(&self, url: Url) -> Result<String, MixpanelError> {
        let response = self.get(url).send().await?.error_for_status()?;
        debug!(status = %response.status(), "Got response");
        Ok(response.text().await?)
    }
}
