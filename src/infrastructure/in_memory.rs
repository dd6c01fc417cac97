use crate::domain::message::SequencedMessage;
use crate::domain::ports::{SubmitReceipt, TopicLog, TransferExecutor, TransferSpec};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-process append-only topic log.
///
/// Sequence numbers are assigned from 1 per topic, consensus timestamps at
/// append time. `Arc<RwLock<…>>` allows the same log to be shared between a
/// payer-side and a sponsor-side engine in tests.
#[derive(Default, Clone)]
pub struct InMemoryTopicLog {
    topics: Arc<RwLock<HashMap<String, Vec<SequencedMessage>>>>,
}

impl InMemoryTopicLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently on a topic.
    pub async fn len(&self, log_id: &str) -> usize {
        let topics = self.topics.read().await;
        topics.get(log_id).map_or(0, Vec::len)
    }

    pub async fn is_empty(&self, log_id: &str) -> bool {
        self.len(log_id).await == 0
    }
}

#[async_trait]
impl TopicLog for InMemoryTopicLog {
    async fn fetch_messages(&self, log_id: &str) -> Result<Vec<SequencedMessage>> {
        let topics = self.topics.read().await;
        Ok(topics.get(log_id).cloned().unwrap_or_default())
    }

    async fn append(&self, log_id: &str, payload: Vec<u8>) -> Result<u64> {
        let mut topics = self.topics.write().await;
        let entries = topics.entry(log_id.to_string()).or_default();
        let sequence_number = entries.len() as u64 + 1;
        entries.push(SequencedMessage {
            sequence_number,
            consensus_timestamp: Utc::now(),
            payload,
        });
        Ok(sequence_number)
    }
}

/// A loop-back transfer executor with deterministic outputs.
///
/// Builds the transfer as canonical JSON bytes, "signs" by wrapping them, and
/// "submits" by deriving a transaction id from the payload hash. Charges a
/// fixed network fee. Stands in for the real ledger in tests and demos.
#[derive(Clone)]
pub struct LocalTransferExecutor {
    operator: String,
    network_fee: Decimal,
}

impl LocalTransferExecutor {
    pub fn new(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            network_fee: dec!(0.001),
        }
    }

    pub fn with_network_fee(mut self, network_fee: Decimal) -> Self {
        self.network_fee = network_fee;
        self
    }
}

#[async_trait]
impl TransferExecutor for LocalTransferExecutor {
    async fn build_transfer(&self, spec: &TransferSpec) -> Result<Vec<u8>> {
        let body = serde_json::json!({
            "from": spec.sender,
            "to": spec.recipient,
            "kind": spec.payment_type.to_string(),
            "amount": spec.amount.value(),
            "tokenId": spec.token_id,
            "nftSerial": spec.nft_serial,
            "memo": spec.memo,
        });
        Ok(serde_json::to_vec(&body)?)
    }

    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let envelope = serde_json::json!({
            "signer": self.operator,
            "body": BASE64.encode(payload),
        });
        Ok(serde_json::to_vec(&envelope)?)
    }

    async fn submit(&self, payload: &[u8]) -> Result<SubmitReceipt> {
        if payload.is_empty() {
            return Err(PaymentError::Collaborator(
                "refusing to submit an empty transaction".to_string(),
            ));
        }
        let digest = Sha256::digest(payload);
        Ok(SubmitReceipt {
            transaction_id: format!("{}@{}", self.operator, hex::encode(&digest[..8])),
            network_fee: self.network_fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::{Amount, PaymentType};

    #[tokio::test]
    async fn test_append_assigns_increasing_sequence_numbers() {
        let log = InMemoryTopicLog::new();
        let a = log.append("0.0.9000", b"one".to_vec()).await.unwrap();
        let b = log.append("0.0.9000", b"two".to_vec()).await.unwrap();
        assert_eq!((a, b), (1, 2));

        let messages = log.fetch_messages("0.0.9000").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].payload, b"one");
        assert!(messages[0].consensus_timestamp <= messages[1].consensus_timestamp);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let log = InMemoryTopicLog::new();
        log.append("0.0.9000", b"one".to_vec()).await.unwrap();
        assert!(log.fetch_messages("0.0.9001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_executor_is_deterministic() {
        let executor = LocalTransferExecutor::new("0.0.5005");
        let spec = TransferSpec {
            sender: "0.0.1001".to_string(),
            recipient: "0.0.2002".to_string(),
            payment_type: PaymentType::Hbar,
            amount: Amount::new(rust_decimal_macros::dec!(10)).unwrap(),
            token_id: None,
            nft_serial: None,
            memo: None,
        };

        let built = executor.build_transfer(&spec).await.unwrap();
        assert_eq!(built, executor.build_transfer(&spec).await.unwrap());

        let signed = executor.sign(&built).await.unwrap();
        let receipt = executor.submit(&signed).await.unwrap();
        assert!(receipt.transaction_id.starts_with("0.0.5005@"));
        assert_eq!(receipt.network_fee, dec!(0.001));
    }
}
