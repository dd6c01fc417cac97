use crate::domain::request::{Amount, PaymentStatus, PaymentType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Current wire protocol version, carried on every request payload.
pub const PROTOCOL_VERSION: u32 = 1;

/// One entry as delivered by the log: sequence numbers are log-assigned and
/// strictly increasing, the payload is opaque bytes until decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedMessage {
    pub sequence_number: u64,
    pub consensus_timestamp: DateTime<Utc>,
    pub payload: Vec<u8>,
}

/// Closed union of every message shape that may appear on a payment topic.
///
/// The `type` field is the discriminator; a payload whose discriminator is
/// missing or unknown fails to decode rather than producing an untyped value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TopicMessage {
    #[serde(rename = "gasless_payment_request")]
    Request(RequestBody),
    #[serde(rename = "gasless_payment_signed")]
    Signed(SignedBody),
    #[serde(rename = "gasless_payment_completed")]
    Completed(CompletedBody),
    #[serde(rename = "gasless_payment_failed")]
    Failed(FailedBody),
}

/// A payer's published payment intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    pub version: u32,
    pub payment_request_id: String,
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub payment_type: PaymentType,
    pub recipient_account_id: String,
    pub amount: Amount,
    pub max_fee: Decimal,
    pub expiration_time: DateTime<Utc>,
    pub nonce: u64,
    /// Unsigned transfer payload, base64.
    pub transaction_bytes: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nft_serial_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsor_account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// The payer's off-log signature over a previously published request.
///
/// Carries display copies of the request fields so a sponsor can render the
/// payment without chasing the original entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedBody {
    pub payment_request_id: String,
    pub timestamp: DateTime<Utc>,
    /// Signed transfer payload, base64.
    pub signed_transaction_bytes: String,
    /// Sequence number of the request entry this signature answers.
    pub original_sequence_number: u64,
    pub status: PaymentStatus,
    pub sender: String,
    pub recipient_account_id: String,
    pub payment_type: PaymentType,
    pub amount: Amount,
}

/// A sponsor's record of a successfully executed transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedBody {
    pub payment_request_id: String,
    pub timestamp: DateTime<Utc>,
    pub transaction_id: String,
    pub sponsor: String,
    pub gas_paid: Decimal,
    pub sponsor_fee: Decimal,
    pub status: PaymentStatus,
}

/// A sponsor's record of a failed execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedBody {
    pub payment_request_id: String,
    pub timestamp: DateTime<Utc>,
    pub sponsor: String,
    pub reason: String,
    pub status: PaymentStatus,
}
