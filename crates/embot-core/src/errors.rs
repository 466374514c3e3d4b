/// Core error type.
///
/// Adapter crates map their specific failures into this type so the runtime
/// can tell transient transport trouble (retried by the polling loop) apart
/// from per-update processing failures (logged, never retried).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote api error: {0}")]
    Api(String),

    #[error("processing error: {0}")]
    Processing(String),

    #[error("cursor persistence error: {0}")]
    Persistence(String),

    #[error("malformed update: {0}")]
    Malformed(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the polling loop should back off and retry the fetch.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
