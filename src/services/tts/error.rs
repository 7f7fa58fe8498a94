use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

const BODY_SNIPPET_LIMIT: usize = 512;

#[derive(Debug, Error)]
pub enum TtsError {
    /// The inference server answered with a non-success status.
    #[error("inference server returned {status}: {body}")]
    Server { status: StatusCode, body: String },

    /// Nothing is listening at the configured address.
    #[error("inference server at {addr} is unavailable, is the API running?")]
    ServiceUnavailable { addr: String },

    #[error("request to inference server failed: {0}")]
    RequestFailed(#[source] reqwest::Error),

    #[error("failed to write audio file {}: {source}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no text to synthesize")]
    EmptyText,

    #[error("model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),
}

impl TtsError {
    /// Sorts a transport failure into unavailable vs. generic.
    pub(crate) fn from_transport(err: reqwest::Error, addr: &str) -> Self {
        if err.is_connect() {
            TtsError::ServiceUnavailable {
                addr: addr.to_string(),
            }
        } else {
            TtsError::RequestFailed(err)
        }
    }

    /// Reads what it can of an error response body.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = match response.text().await {
            Ok(text) => text.trim().chars().take(BODY_SNIPPET_LIMIT).collect(),
            Err(e) => format!("<unreadable body: {}>", e),
        };
        TtsError::Server { status, body }
    }
}
