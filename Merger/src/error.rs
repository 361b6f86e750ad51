//! Failures of a merge run.
//!
//! The `Display` text of every variant is the message handed back to the caller.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// Rejected before any I/O took place.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// No resolution strategy could open the input.
    #[error("Failed to open file: {reference}: {reason}")]
    SourceOpen { reference: String, reason: String },

    /// I/O failure while streaming samples from an opened input.
    #[error("Failed to read samples from {reference}: {reason}")]
    SourceRead { reference: String, reason: String },

    /// Registering tracks, starting, writing or finalizing the output failed.
    #[error("Failed to write output: {0}")]
    OutputWrite(String),

    #[error("Merge was cancelled")]
    Cancelled,
}

impl MergeError {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    pub fn source_open(reference: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceOpen {
            reference: reference.into(),
            reason: reason.to_string(),
        }
    }

    pub fn source_read(reference: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceRead {
            reference: reference.into(),
            reason: reason.to_string(),
        }
    }

    pub fn output_write(reason: impl ToString) -> Self {
        Self::OutputWrite(reason.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_reference() {
        let err = MergeError::source_open("/tmp/missing.mp4", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "Failed to open file: /tmp/missing.mp4: No such file or directory"
        );
        assert!(MergeError::invalid_arguments("No video paths provided")
            .to_string()
            .contains("No video paths provided"));
    }
}
