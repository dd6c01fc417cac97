use crate::domain::message::TopicMessage;
use crate::error::Result;

/// Decodes one log payload into a typed message.
///
/// Total over arbitrary bytes: a missing or unknown discriminator, a wrong
/// field type, or plain garbage yields a `Decode` error, never a panic.
/// Callers folding a stream skip failed entries instead of aborting.
pub fn decode(payload: &[u8]) -> Result<TopicMessage> {
    Ok(serde_json::from_slice(payload)?)
}

/// Encodes a message for appending to the log. Dual of [`decode`]:
/// `decode(encode(m)) == m` for every message shape.
pub fn encode(message: &TopicMessage) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::{CompletedBody, PROTOCOL_VERSION, RequestBody, SignedBody};
    use crate::domain::request::{Amount, PaymentStatus, PaymentType};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn request_message() -> TopicMessage {
        TopicMessage::Request(RequestBody {
            version: PROTOCOL_VERSION,
            payment_request_id: "deadbeef01020304".to_string(),
            timestamp: "2026-03-01T12:00:00Z".parse().unwrap(),
            sender: "0.0.1001".to_string(),
            payment_type: PaymentType::Token,
            recipient_account_id: "0.0.2002".to_string(),
            amount: Amount::new(dec!(25)).unwrap(),
            max_fee: dec!(0.5),
            expiration_time: "2026-03-01T13:00:00Z".parse().unwrap(),
            nonce: 42,
            transaction_bytes: "dHgtYnl0ZXM=".to_string(),
            status: PaymentStatus::Pending,
            token_id: Some("0.0.7777".to_string()),
            nft_serial_number: None,
            sponsor_account_id: Some("0.0.5005".to_string()),
            memo: Some("invoice 12".to_string()),
        })
    }

    #[test]
    fn test_round_trip_all_shapes() {
        let shapes = vec![
            request_message(),
            TopicMessage::Signed(SignedBody {
                payment_request_id: "deadbeef01020304".to_string(),
                timestamp: Utc::now(),
                signed_transaction_bytes: "c2lnbmVk".to_string(),
                original_sequence_number: 3,
                status: PaymentStatus::Signed,
                sender: "0.0.1001".to_string(),
                recipient_account_id: "0.0.2002".to_string(),
                payment_type: PaymentType::Token,
                amount: Amount::new(dec!(25)).unwrap(),
            }),
            TopicMessage::Completed(CompletedBody {
                payment_request_id: "deadbeef01020304".to_string(),
                timestamp: Utc::now(),
                transaction_id: "0.0.5005@1700000000.000000001".to_string(),
                sponsor: "0.0.5005".to_string(),
                gas_paid: dec!(0.001),
                sponsor_fee: dec!(0.01),
                status: PaymentStatus::Completed,
            }),
        ];

        for message in shapes {
            let bytes = encode(&message).unwrap();
            assert_eq!(decode(&bytes).unwrap(), message);
        }
    }

    #[test]
    fn test_garbage_is_a_decode_error_not_a_panic() {
        for payload in [
            &b"" as &[u8],
            b"{",
            b"[1,2,3]",
            b"{\"paymentRequestId\":\"x\"}",
            b"\xff\xfe\x00",
        ] {
            assert!(decode(payload).is_err());
        }
    }

    #[test]
    fn test_wrong_field_type_is_a_decode_error() {
        let mut value = serde_json::to_value(request_message()).unwrap();
        value["nonce"] = serde_json::json!("not-a-number");
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(decode(&bytes).is_err());
    }
}
