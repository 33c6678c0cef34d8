use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("upstream reported: {0}")]
    Upstream(String),
    #[error("unreadable error response: {0}")]
    UnknownBody(String),
    #[error("response body could not be decoded at all")]
    Undecodable,
    #[error("provider returned no usable data")]
    EmptyAnswer,
}
