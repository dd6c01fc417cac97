#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sponsorpay::domain::message::{
    CompletedBody, PROTOCOL_VERSION, RequestBody, SequencedMessage, SignedBody, TopicMessage,
};
use sponsorpay::domain::request::{Amount, PaymentStatus, PaymentType};
use sponsorpay::domain::request_id::derive_request_id;

pub fn ts(offset_secs: i64) -> DateTime<Utc> {
    "2026-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap() + Duration::seconds(offset_secs)
}

pub fn request_body(
    sender: &str,
    recipient: &str,
    nonce: u64,
    expires: DateTime<Utc>,
) -> RequestBody {
    RequestBody {
        version: PROTOCOL_VERSION,
        payment_request_id: derive_request_id(sender, recipient, nonce),
        timestamp: ts(0),
        sender: sender.to_string(),
        payment_type: PaymentType::Hbar,
        recipient_account_id: recipient.to_string(),
        amount: Amount::new(dec!(10)).unwrap(),
        max_fee: dec!(0.5),
        expiration_time: expires,
        nonce,
        transaction_bytes: "dHgtYnl0ZXM=".to_string(),
        status: PaymentStatus::Pending,
        token_id: None,
        nft_serial_number: None,
        sponsor_account_id: None,
        memo: None,
    }
}

pub fn signed_body(request: &RequestBody, original_sequence: u64) -> SignedBody {
    SignedBody {
        payment_request_id: request.payment_request_id.clone(),
        timestamp: ts(1),
        signed_transaction_bytes: "c2lnbmVkLWJ5dGVz".to_string(),
        original_sequence_number: original_sequence,
        status: PaymentStatus::Signed,
        sender: request.sender.clone(),
        recipient_account_id: request.recipient_account_id.clone(),
        payment_type: request.payment_type,
        amount: request.amount,
    }
}

pub fn completed_body(request_id: &str, sponsor: &str, sponsor_fee: Decimal) -> CompletedBody {
    CompletedBody {
        payment_request_id: request_id.to_string(),
        timestamp: ts(2),
        transaction_id: format!("{sponsor}@1700000000.000000001"),
        sponsor: sponsor.to_string(),
        gas_paid: dec!(0.001),
        sponsor_fee,
        status: PaymentStatus::Completed,
    }
}

pub fn entry(sequence_number: u64, message: &TopicMessage) -> SequencedMessage {
    SequencedMessage {
        sequence_number,
        consensus_timestamp: ts(sequence_number as i64),
        payload: serde_json::to_vec(message).unwrap(),
    }
}

/// One line of the JSONL export format the binary consumes.
pub fn export_line(sequence_number: u64, message: &TopicMessage) -> String {
    serde_json::json!({
        "sequenceNumber": sequence_number,
        "consensusTimestamp": ts(sequence_number as i64),
        "payload": message,
    })
    .to_string()
}
