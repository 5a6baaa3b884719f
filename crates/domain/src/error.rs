/// Shared error type used across all crowdcount crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config: {0}")]
    Config(String),

    #[error("missing credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),

    #[error("unknown service: {0}")]
    UnknownService(String),
}

pub type Result<T> = std::result::Result<T, Error>;
