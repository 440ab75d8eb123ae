/// Error types shared by the adapter layer.
///
/// These cover the HTTP-facing collaborators (WebDriver endpoint, OpenAI-compatible host).
/// Where a failure crosses into the pipeline it is converted to a `ProviderError`, keeping
/// the WebDriver error code so stale-element failures stay distinguishable.
use reqwest::StatusCode;
use reputation_core::error::ProviderError;

/// W3C error code for an element that was detached after it was located.
pub const STALE_ELEMENT: &str = "stale element reference";

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("webdriver returned {error} (status={status}): {message}")]
    WebDriver {
        status: StatusCode,
        error: String,
        message: String,
    },

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },

    #[error("unexpected response shape: {0}")]
    Protocol(String),

    #[error("{key} has an invalid value: '{value}'")]
    Config { key: String, value: String },
}

/// Parse an optional variable, rejecting values that are present but malformed.
pub(crate) fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, CommonError> {
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| CommonError::Config {
                key: key.to_string(),
                value: raw.clone(),
            })
        })
        .transpose()
}

impl CommonError {
    /// Convert into the pipeline's provider error, tagging it with the command that failed.
    pub fn into_provider(self, command: &str) -> ProviderError {
        match self {
            CommonError::WebDriver { error, message, .. } if error == STALE_ELEMENT => {
                ProviderError::StaleFragment(message)
            }
            CommonError::WebDriver { error, message, .. }
                if error == "invalid session id" || error == "session not created" =>
            {
                ProviderError::Unavailable(format!("{error}: {message}"))
            }
            CommonError::Request(e) => ProviderError::Transport(e.to_string()),
            other => ProviderError::command(command, other.to_string()),
        }
    }
}
