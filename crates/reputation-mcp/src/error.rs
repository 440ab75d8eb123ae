use reputation_common::error::CommonError;
use reputation_core::error::{PipelineError, SubjectError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("invalid subject: {0}")]
    Subject(#[from] SubjectError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("config error: {0}")]
    Config(String),
}
