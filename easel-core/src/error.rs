use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds of a single image request.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("inference failed: {0:#}")]
    Inference(#[source] anyhow::Error),

    #[error("{0} pipeline is not loaded")]
    Unavailable(&'static str),
}

impl Error {
    /// Whether the request itself was at fault, as opposed to the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MissingField(_) | Error::Validation(_) | Error::Decode(_)
        )
    }
}
