/// Error types for the acquisition-and-classification pipeline.
///
/// Most failures inside a run are absorbed into well-defined defaults (empty review list,
/// truncated extraction, neutral verdict). The types here cover the boundaries where that
/// is not possible: a malformed subject, and a content provider that cannot be acquired.

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("content provider unavailable: {0}")]
    Unavailable(String),

    #[error("{command} failed: {message}")]
    Command { command: String, message: String },

    #[error("fragment no longer readable: {0}")]
    StaleFragment(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubjectError {
    #[error("subject must not be empty")]
    Empty,

    #[error("subject contains whitespace: {0:?}")]
    Whitespace(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to open content session: {0}")]
    Launch(#[source] ProviderError),
}
