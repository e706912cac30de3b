//! Agent execution contracts: timeout, retries, and failure codes.

use std::time::Duration;

use crate::config::QueueSettings;
use crate::providers::{normalize_reply, Provider, ResetSignal, Turn};

#[derive(Debug, Clone)]
pub struct ExecutionContract {
    pub timeout_seconds: u64,
    pub retries: u32,
    pub retry_backoff_ms: u64,
    pub max_response_chars: usize,
}

impl Default for ExecutionContract {
    fn default() -> Self {
        Self {
            timeout_seconds: 240,
            retries: 0,
            retry_backoff_ms: 600,
            max_response_chars: 4000,
        }
    }
}

impl ExecutionContract {
    pub fn from_settings(queue: &QueueSettings) -> Self {
        Self {
            timeout_seconds: queue.invocation_timeout_secs,
            retries: queue.invocation_retries,
            max_response_chars: queue.max_response_chars,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCode {
    Timeout,
    Unauthorized,
    ProviderUnavailable,
    CliMissing,
    MalformedOutput,
    Unknown,
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureCode::Timeout => write!(f, "timeout"),
            FailureCode::Unauthorized => write!(f, "unauthorized"),
            FailureCode::ProviderUnavailable => write!(f, "provider_unavailable"),
            FailureCode::CliMissing => write!(f, "cli_missing"),
            FailureCode::MalformedOutput => write!(f, "malformed_output"),
            FailureCode::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionError {
    pub code: FailureCode,
    pub message: String,
}

impl std::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ExecutionError {}

/// Invoke a provider under the contract and normalize its reply.
///
/// The reset signal is handed to every attempt; only the first one can find
/// it set, so a retry always continues the session the first attempt opened.
pub async fn execute_with_contract(
    provider: &dyn Provider,
    turn: &Turn<'_>,
    reset: &ResetSignal,
    contract: &ExecutionContract,
) -> Result<String, ExecutionError> {
    let attempts = contract.retries + 1;
    let timeout = Duration::from_secs(contract.timeout_seconds);
    let mut last_error: Option<ExecutionError> = None;

    for attempt in 1..=attempts {
        let result = tokio::time::timeout(timeout, provider.invoke(turn, reset)).await;
        match result {
            Ok(Ok(text)) => return Ok(normalize_reply(&text, contract.max_response_chars)),
            Ok(Err(e)) => {
                let err = classify_error(&e.to_string());
                tracing::warn!(
                    agent = turn.agent_id,
                    provider = provider.name(),
                    "Execution attempt {}/{} failed: {}",
                    attempt,
                    attempts,
                    err
                );
                last_error = Some(err);
            }
            Err(_) => {
                let err = ExecutionError {
                    code: FailureCode::Timeout,
                    message: format!(
                        "provider completion exceeded timeout of {}s",
                        contract.timeout_seconds
                    ),
                };
                tracing::warn!(
                    agent = turn.agent_id,
                    provider = provider.name(),
                    "Execution attempt {}/{} timed out",
                    attempt,
                    attempts
                );
                last_error = Some(err);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(Duration::from_millis(contract.retry_backoff_ms)).await;
        }
    }

    Err(last_error.unwrap_or(ExecutionError {
        code: FailureCode::Unknown,
        message: "execution failed for unknown reason".to_string(),
    }))
}

fn classify_error(message: &str) -> ExecutionError {
    let m = message.to_lowercase();
    let code = if m.contains("malformed output") {
        FailureCode::MalformedOutput
    } else if m.contains("unauthorized")
        || m.contains("auth")
        || m.contains("sign in")
        || m.contains("logged in")
        || m.contains("forbidden")
    {
        FailureCode::Unauthorized
    } else if m.contains("not found")
        || m.contains("no such file")
        || m.contains("command not found")
    {
        FailureCode::CliMissing
    } else if m.contains("not available")
        || m.contains("connection")
        || m.contains("timeout")
        || m.contains("failed to connect")
    {
        FailureCode::ProviderUnavailable
    } else {
        FailureCode::Unknown
    };

    ExecutionError {
        code,
        message: message.to_string(),
    }
}
