use thiserror::Error;

/// Core error type for the organizer.
/// Internally, modules can use `anyhow::Result<T>` for convenience,
/// but public boundaries should expose `CoreResult<T>` with this error.
///
/// Malformed frames never show up here: a mid-stream parse failure is
/// retried via the rejoin buffer, and an unparseable tail at end-of-stream
/// is dropped rather than surfaced.
#[derive(Debug, Error)]
pub enum OrganizerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("Rate limit exceeded. Please wait a moment and try again.")]
    RateLimited { retry_after: Option<u64> },

    #[error("Usage limit reached. Please add credits to continue.")]
    QuotaExceeded,

    #[error("gateway error {code}: {message}")]
    Gateway { code: u16, message: String },

    #[error("gateway response carried no event stream to read")]
    MissingBody,

    #[error("stream stalled: no data received for {seconds}s")]
    Timeout { seconds: u64 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CoreResult<T> = std::result::Result<T, OrganizerError>;
