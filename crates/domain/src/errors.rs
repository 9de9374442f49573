use thiserror::Error;

#[derive(Error, Debug)]
pub enum BouncerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("preflight failed: {0}")]
    Preflight(String),

    #[error("transient remote error: {0}")]
    TransientRemote(String),

    #[error("remote rejected request: {0}")]
    RemoteValidation(String),

    #[error("decision feed error: {0}")]
    Feed(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl BouncerError {
    /// Transient failures are retried on the next tick; the rest are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BouncerError::TransientRemote(_) | BouncerError::Feed(_)
        )
    }
}
