use reqwest::StatusCode;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to parse as URL '{url}'")]
    InvalidEndpointUrl {
        url: String,

        #[source]
        source: url::ParseError,
    },

    #[error("Unexpected response code '{got}' while requesting to {requested_url}")]
    UnexpectedResponseCode {
        got: StatusCode,
        requested_url: String,
    },

    #[error("Malformed judge response from {requested_url}: {source}")]
    MalformedResponse {
        requested_url: String,

        #[source]
        source: serde_json::Error,
    },

    #[error("Http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
