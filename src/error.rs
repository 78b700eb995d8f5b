/// Error types for Countdown Tab
use thiserror::Error;

/// Errors produced by the countdown calculators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CountdownError {
    /// Missing or malformed timer settings (birth date, life expectancy)
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },
}

impl CountdownError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        CountdownError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Human-readable reason, suitable for the settings UI
    pub fn reason(&self) -> &str {
        match self {
            CountdownError::InvalidInput { reason } => reason,
        }
    }
}

/// Errors surfaced by a settings store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to parse stored settings: {0}")]
    Malformed(String),
}

/// Errors raised while handling a browser tab/window event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Failed to process tab event: {0}")]
    EventProcessing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_reason() {
        let err = CountdownError::invalid("Birth date is required");
        assert_eq!(err.reason(), "Birth date is required");
        assert_eq!(err.to_string(), "Invalid input: Birth date is required");
    }

    #[test]
    fn test_tracker_error_display() {
        let err = TrackerError::EventProcessing("tab has no id".to_string());
        assert_eq!(err.to_string(), "Failed to process tab event: tab has no id");
    }
}
