use crate::domain::message::{SequencedMessage, TopicMessage};
use crate::domain::request::{Completion, PaymentRequest};
use crate::interfaces::json::message_codec;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Everything a log prefix says about its payment requests, keyed by request
/// id, plus counters for the entries that contributed nothing.
///
/// `skipped` counts payloads that failed to decode; `ignored` counts
/// well-formed messages the fold rejected (duplicate requests, signatures for
/// unknown or already-signed requests, second terminal writes). Both degrade
/// to diagnostics, never to an error.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconciledView {
    requests: HashMap<String, PaymentRequest>,
    pub skipped: usize,
    pub ignored: usize,
}

impl ReconciledView {
    pub fn get(&self, request_id: &str) -> Option<&PaymentRequest> {
        self.requests.get(request_id)
    }

    pub fn requests(&self) -> impl Iterator<Item = &PaymentRequest> {
        self.requests.values()
    }

    /// The request whose signature entry carries this sequence number.
    pub fn find_by_signed_sequence(&self, sequence_number: u64) -> Option<&PaymentRequest> {
        self.requests
            .values()
            .find(|r| r.signed_sequence == Some(sequence_number))
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Folds an ordered message sequence into the materialized per-request view.
///
/// Single left-to-right pass in sequence-number order. Total over arbitrary
/// input: undecodable payloads and semantically inconsistent messages are
/// counted and dropped, never propagated. Re-running over the same prefix
/// yields the same view.
pub fn reconcile(messages: &[SequencedMessage]) -> ReconciledView {
    let mut ordered: Vec<&SequencedMessage> = messages.iter().collect();
    ordered.sort_by_key(|m| m.sequence_number);

    let mut view = ReconciledView::default();
    for entry in ordered {
        let message = match message_codec::decode(&entry.payload) {
            Ok(message) => message,
            Err(err) => {
                debug!(
                    sequence_number = entry.sequence_number,
                    %err,
                    "skipping undecodable log entry"
                );
                view.skipped += 1;
                continue;
            }
        };
        apply(&mut view, message, entry.sequence_number, entry.consensus_timestamp);
    }
    view
}

fn apply(
    view: &mut ReconciledView,
    message: TopicMessage,
    sequence_number: u64,
    consensus_timestamp: DateTime<Utc>,
) {
    match message {
        TopicMessage::Request(body) => {
            let id = body.payment_request_id.clone();
            if view.requests.contains_key(&id) {
                // Replayed request for an id we already materialized. The
                // earliest entry by sequence number wins.
                debug!(sequence_number, request_id = %id, "ignoring duplicate request");
                view.ignored += 1;
                return;
            }
            let record = PaymentRequest::from_request_body(body, sequence_number, consensus_timestamp);
            view.requests.insert(id, record);
        }
        TopicMessage::Signed(body) => {
            let id = body.payment_request_id;
            if let Some(record) = view.requests.get_mut(&id)
                && record
                    .record_signature(body.signed_transaction_bytes, sequence_number)
                    .is_ok()
            {
                return;
            }
            debug!(sequence_number, request_id = %id, "ignoring signature without pending request");
            view.ignored += 1;
        }
        TopicMessage::Completed(body) => {
            let id = body.payment_request_id;
            let completion = Completion {
                transaction_ref: body.transaction_id,
                sponsor: body.sponsor,
                network_fee_paid: body.gas_paid,
                sponsor_fee_charged: body.sponsor_fee,
                completed_at: consensus_timestamp,
            };
            if let Some(record) = view.requests.get_mut(&id)
                && record.record_completion(completion).is_ok()
            {
                return;
            }
            debug!(sequence_number, request_id = %id, "ignoring completion for unknown or settled request");
            view.ignored += 1;
        }
        TopicMessage::Failed(body) => {
            let id = body.payment_request_id;
            if let Some(record) = view.requests.get_mut(&id)
                && record
                    .record_failure(body.sponsor, body.reason, consensus_timestamp)
                    .is_ok()
            {
                return;
            }
            debug!(sequence_number, request_id = %id, "ignoring failure for unknown or settled request");
            view.ignored += 1;
        }
    }
}

/// Time-based post-pass: every request still awaiting execution whose
/// expiration lies before `now` becomes `Expired`. Runs strictly after the
/// fold so a recorded outcome always wins over the clock.
pub fn apply_expiry(view: &mut ReconciledView, now: DateTime<Utc>) {
    for record in view.requests.values_mut() {
        record.mark_expired(now);
    }
}

/// The full read path: fold, then expiry at `now`.
pub fn reconcile_at(messages: &[SequencedMessage], now: DateTime<Utc>) -> ReconciledView {
    let mut view = reconcile(messages);
    apply_expiry(&mut view, now);
    view
}
