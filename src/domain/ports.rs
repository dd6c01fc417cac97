use crate::domain::message::SequencedMessage;
use crate::domain::request::{Amount, PaymentType};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Parameters handed to the transfer builder. A projection of the payment
/// intent onto what the underlying ledger needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSpec {
    pub sender: String,
    pub recipient: String,
    pub payment_type: PaymentType,
    pub amount: Amount,
    pub token_id: Option<String>,
    pub nft_serial: Option<u64>,
    pub memo: Option<String>,
}

/// Receipt returned by the ledger for a submitted transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReceipt {
    pub transaction_id: String,
    pub network_fee: Decimal,
}

/// The append-only, totally-ordered message log. Ordering and durability are
/// the log's problem; this side only assumes sequence numbers strictly
/// increase within a topic.
#[async_trait]
pub trait TopicLog: Send + Sync {
    async fn fetch_messages(&self, log_id: &str) -> Result<Vec<SequencedMessage>>;
    /// Appends a payload and returns its assigned sequence number.
    async fn append(&self, log_id: &str, payload: Vec<u8>) -> Result<u64>;
}

/// Builds, signs, and submits the underlying transfer transaction.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    async fn build_transfer(&self, spec: &TransferSpec) -> Result<Vec<u8>>;
    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>>;
    async fn submit(&self, payload: &[u8]) -> Result<SubmitReceipt>;
}

pub type TopicLogBox = Box<dyn TopicLog>;
pub type TransferExecutorBox = Box<dyn TransferExecutor>;
