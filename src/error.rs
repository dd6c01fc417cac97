use crate::domain::request::PaymentStatus;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug)]
pub enum PaymentError {
    /// Malformed log payload. Absorbed and counted by the reconciler,
    /// never bubbled past it.
    #[error("malformed log message: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("payment request {request_id} not found")]
    NotFound { request_id: String },
    #[error("no log entry at sequence number {sequence_number}")]
    SequenceNotFound { sequence_number: u64 },
    #[error("cannot {guard} request {request_id} in status {status}")]
    GuardViolation {
        guard: &'static str,
        request_id: String,
        status: PaymentStatus,
    },
    #[error("request {request_id} expired at {expired_at}")]
    Expired {
        request_id: String,
        expired_at: DateTime<Utc>,
    },
    #[error("account {account} is not allowed to {action} request {request_id}")]
    Authorization {
        account: String,
        action: &'static str,
        request_id: String,
    },
    #[error("request {request_id} already processed (status {status})")]
    AlreadyProcessed {
        request_id: String,
        status: PaymentStatus,
    },
    /// Log or ledger unavailable. The only retryable variant.
    #[error("external collaborator unavailable: {0}")]
    Collaborator(String),
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PaymentError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::Collaborator(_))
    }
}
