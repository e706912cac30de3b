//! Error types for TinyRelay.

use thiserror::Error;

use crate::providers::ProviderError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Queue error: {0}")]
    Queue(String),

    /// The file left `incoming` before we could rename it.
    #[error("Queue file {0} was claimed elsewhere")]
    ClaimConflict(String),

    #[error("Backend error: {0}")]
    Provider(#[from] ProviderError),

    #[error(
        "Delegation limit reached: {max_messages} message(s) per conversation. Further mentions were not forwarded."
    )]
    DelegationCapExceeded {
        conversation_id: String,
        max_messages: u32,
    },

    #[error("Conversation {conversation_id} is no longer tracked (reply from @{agent_id} discarded)")]
    OrphanedDelegation {
        conversation_id: String,
        agent_id: String,
    },

    #[error("No agents configured")]
    NoAgents,
}

impl Error {
    /// Errors that should not send the file back to `incoming`.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            Error::ClaimConflict(_) | Error::OrphanedDelegation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_error_reads_as_a_user_note() {
        let err = Error::DelegationCapExceeded {
            conversation_id: "conv_m1".to_string(),
            max_messages: 3,
        };
        assert_eq!(
            err.to_string(),
            "Delegation limit reached: 3 message(s) per conversation. Further mentions were not forwarded."
        );
    }

    #[test]
    fn benign_errors() {
        assert!(Error::ClaimConflict("a.json".to_string()).is_benign());
        assert!(!Error::NoAgents.is_benign());
    }
}
