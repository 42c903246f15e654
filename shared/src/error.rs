use thiserror::Error;

/// Maximum length of an error message carried into user-facing failure
/// records; anything longer is cut off.
pub const MAX_ERROR_MESSAGE_LEN: usize = 300;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("model returned malformed JSON: {0}")]
    MalformedResponse(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("upstream http status {0}")]
    Http(u16),
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl EvalError {
    /// Stable failure-kind name used in batch failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::MalformedResponse(_) => "MalformedResponseError",
            EvalError::Upstream(_) | EvalError::Http(_) => "UpstreamError",
            EvalError::Persistence(_) => "PersistenceError",
        }
    }

    /// Prefix the message with the pipeline stage the error surfaced from.
    pub fn tagged(self, stage: &str) -> EvalError {
        match self {
            EvalError::MalformedResponse(m) => {
                EvalError::MalformedResponse(format!("{stage}: {m}"))
            }
            EvalError::Upstream(m) => EvalError::Upstream(format!("{stage}: {m}")),
            EvalError::Http(code) => EvalError::Upstream(format!("{stage}: http status {code}")),
            EvalError::Persistence(m) => EvalError::Persistence(format!("{stage}: {m}")),
        }
    }
}

/// Truncate a message to the bounded length used in failure records,
/// collapsing newlines so a single report line stays a single line.
pub fn truncate_message(message: &str) -> String {
    let flat = message.replace('\n', " ");
    flat.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}

pub type Result<T> = std::result::Result<T, EvalError>;
