use base64::DecodeError;
use serde_json::Error;
use thiserror::Error;
use url::ParseError;

#[derive(Error, Debug)]
pub enum MixpanelError {
    #[error("error sending request: {source}")]
    Request {
        #[from]
        source: reqwest::Error,
    },
    #[error("transport failed: {message}")]
    Transport { message: String },
    #[error("error marshaling json: {source}")]
    SerdeJson {
        #[from]
        source: Error,
    },
    #[error("error building request url: {source}")]
    Url {
        #[from]
        source: ParseError,
    },
    #[error("error decoding base64 payload: {source}")]
    Base64 {
        #[from]
        source: DecodeError,
    },
    #[error("request url has no `data` query parameter")]
    MissingData,
    #[error("malformed payload: {reason}")]
    Malformed { reason: String },
}

pub type Result<T> = std::result::Result<T, MixpanelError>;
