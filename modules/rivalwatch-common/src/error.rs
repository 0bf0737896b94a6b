use thiserror::Error;

#[derive(Error, Debug)]
pub enum RivalWatchError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Persistence error: {0}")]
    Persist(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
