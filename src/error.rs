use reqwest::StatusCode;
use uuid::Uuid;

/// Client-level errors
///
/// Only failures that must reach the UI boundary live here. Malformed stream
/// lines are reported as [`crate::stream::ParseFailure`] values and stale search
/// results are a session status, so neither appears in this enum.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("{endpoint} returned status {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Generation session {0} is still active")]
    SessionActive(Uuid),
}

impl ClientError {
    /// Text shown to the user, once, for a failed operation
    pub fn user_message(&self) -> String {
        match self {
            ClientError::HttpClient(_) => {
                "Could not reach the recommendation service. Please try again.".to_string()
            }
            ClientError::Api { status, .. } => {
                format!("The recommendation service returned an error ({}).", status)
            }
            ClientError::Decode(_) => {
                "The recommendation service sent a response we could not read.".to_string()
            }
            ClientError::InvalidInput(msg) => msg.clone(),
            ClientError::SessionActive(_) => {
                "A response is still being generated. Wait for it to finish.".to_string()
            }
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// A genuine `reqwest` failure for test doubles
///
/// The URL is rejected by the request builder, so nothing touches the network.
#[cfg(test)]
pub(crate) fn request_error() -> ClientError {
    reqwest::Client::new()
        .get("not a url")
        .build()
        .unwrap_err()
        .into()
}
