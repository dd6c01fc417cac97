use crate::application::reconciler::ReconciledView;
use crate::domain::request::{PaymentRequest, PaymentStatus, PaymentType};

/// Default page size applied by the read path when the caller gives none.
pub const DEFAULT_LIMIT: usize = 10;

/// Optional, conjunctive predicates over the reconciled view.
#[derive(Debug, Default, Clone)]
pub struct RequestFilter {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub payment_type: Option<PaymentType>,
    pub status: Option<PaymentStatus>,
}

impl RequestFilter {
    fn matches(&self, request: &PaymentRequest) -> bool {
        if let Some(sender) = &self.sender
            && &request.sender != sender
        {
            return false;
        }
        if let Some(recipient) = &self.recipient
            && &request.recipient != recipient
        {
            return false;
        }
        if let Some(payment_type) = self.payment_type
            && request.payment_type != payment_type
        {
            return false;
        }
        if let Some(status) = self.status
            && request.status != status
        {
            return false;
        }
        true
    }
}

/// Filters, orders, and truncates the reconciled view.
///
/// Newest first: descending `created_at`, ties broken by descending request
/// sequence number so the result is identical across runs. `limit: None`
/// returns every match.
pub fn query(
    view: &ReconciledView,
    filter: &RequestFilter,
    limit: Option<usize>,
) -> Vec<PaymentRequest> {
    let mut matches: Vec<PaymentRequest> = view
        .requests()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect();
    matches.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then(b.request_sequence.cmp(&a.request_sequence))
    });
    if let Some(limit) = limit {
        matches.truncate(limit);
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::reconciler::reconcile;
    use crate::domain::message::{PROTOCOL_VERSION, RequestBody, SequencedMessage, TopicMessage};
    use crate::domain::request::Amount;
    use crate::domain::request_id::derive_request_id;
    use chrono::{DateTime, Duration, Utc};
    use rust_decimal_macros::dec;

    fn ts(offset_secs: i64) -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap() + Duration::seconds(offset_secs)
    }

    fn log_with(requests: &[(&str, &str, u64, PaymentType)]) -> Vec<SequencedMessage> {
        requests
            .iter()
            .enumerate()
            .map(|(i, (sender, recipient, nonce, payment_type))| {
                let body = RequestBody {
                    version: PROTOCOL_VERSION,
                    payment_request_id: derive_request_id(sender, recipient, *nonce),
                    timestamp: ts(0),
                    sender: sender.to_string(),
                    payment_type: *payment_type,
                    recipient_account_id: recipient.to_string(),
                    amount: Amount::new(dec!(1)).unwrap(),
                    max_fee: dec!(0.5),
                    expiration_time: ts(3600),
                    nonce: *nonce,
                    transaction_bytes: "dHg=".to_string(),
                    status: PaymentStatus::Pending,
                    token_id: None,
                    nft_serial_number: None,
                    sponsor_account_id: None,
                    memo: None,
                };
                SequencedMessage {
                    sequence_number: (i + 1) as u64,
                    consensus_timestamp: ts((i + 1) as i64),
                    payload: serde_json::to_vec(&TopicMessage::Request(body)).unwrap(),
                }
            })
            .collect()
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let log = log_with(&[
            ("0.0.1001", "0.0.2002", 1, PaymentType::Hbar),
            ("0.0.1001", "0.0.3003", 2, PaymentType::Token),
            ("0.0.4004", "0.0.2002", 3, PaymentType::Hbar),
        ]);
        let view = reconcile(&log);

        let filter = RequestFilter {
            sender: Some("0.0.1001".to_string()),
            payment_type: Some(PaymentType::Hbar),
            ..Default::default()
        };
        let results = query(&view, &filter, None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].sender, "0.0.1001");
        assert_eq!(results[0].payment_type, PaymentType::Hbar);
    }

    #[test]
    fn test_newest_first_ordering() {
        let log = log_with(&[
            ("0.0.1001", "0.0.2002", 1, PaymentType::Hbar),
            ("0.0.1001", "0.0.2002", 2, PaymentType::Hbar),
            ("0.0.1001", "0.0.2002", 3, PaymentType::Hbar),
        ]);
        let view = reconcile(&log);

        let results = query(&view, &RequestFilter::default(), None);
        assert_eq!(
            results.iter().map(|r| r.request_sequence).collect::<Vec<_>>(),
            vec![3, 2, 1]
        );
    }

    #[test]
    fn test_equal_timestamps_break_ties_by_sequence() {
        // Entries landing in the same consensus instant must still order
        // deterministically.
        let mut log = log_with(&[
            ("0.0.1001", "0.0.2002", 1, PaymentType::Hbar),
            ("0.0.1001", "0.0.2002", 2, PaymentType::Hbar),
        ]);
        for entry in &mut log {
            entry.consensus_timestamp = ts(0);
        }
        let view = reconcile(&log);

        let results = query(&view, &RequestFilter::default(), None);
        assert_eq!(
            results.iter().map(|r| r.request_sequence).collect::<Vec<_>>(),
            vec![2, 1]
        );
    }

    #[test]
    fn test_limit_truncates_after_sort() {
        let log = log_with(&[
            ("0.0.1001", "0.0.2002", 1, PaymentType::Hbar),
            ("0.0.1001", "0.0.2002", 2, PaymentType::Hbar),
            ("0.0.1001", "0.0.2002", 3, PaymentType::Hbar),
        ]);
        let view = reconcile(&log);

        let results = query(&view, &RequestFilter::default(), Some(2));
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].request_sequence, 3);

        let all = query(&view, &RequestFilter::default(), None);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_repeated_queries_are_identical() {
        let log = log_with(&[
            ("0.0.1001", "0.0.2002", 1, PaymentType::Hbar),
            ("0.0.4004", "0.0.2002", 2, PaymentType::Nft),
        ]);
        let view = reconcile(&log);
        let filter = RequestFilter {
            recipient: Some("0.0.2002".to_string()),
            ..Default::default()
        };

        assert_eq!(query(&view, &filter, Some(10)), query(&view, &filter, Some(10)));
    }
}
