use thiserror::Error;

/// Failures surfaced by the race pipeline. All of them abort the run.
#[derive(Error, Debug)]
pub enum RaceError {
    /// The line could not be decoded, or the event contradicts the ledger
    /// (closing an interval that was never opened, starting twice, ...).
    #[error("malformed event `{line}`: {reason}")]
    MalformedEvent { line: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RaceError {
    pub fn malformed(line: impl Into<String>, reason: impl Into<String>) -> Self {
        RaceError::MalformedEvent {
            line: line.into(),
            reason: reason.into(),
        }
    }

    pub fn is_malformed_event(&self) -> bool {
        matches!(self, RaceError::MalformedEvent { .. })
    }
}

pub type Result<T> = std::result::Result<T, RaceError>;
