use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A positive transfer amount.
///
/// Wrapper around `rust_decimal::Decimal` so that a zero or negative amount
/// can never enter the system, not even through wire decoding.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::Validation {
                field: "amount",
                reason: "amount must be positive".to_string(),
            })
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentType {
    Hbar,
    Token,
    Nft,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentType::Hbar => "HBAR",
            PaymentType::Token => "TOKEN",
            PaymentType::Nft => "NFT",
        };
        f.write_str(s)
    }
}

impl FromStr for PaymentType {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HBAR" => Ok(PaymentType::Hbar),
            "TOKEN" => Ok(PaymentType::Token),
            "NFT" => Ok(PaymentType::Nft),
            other => Err(PaymentError::Validation {
                field: "paymentType",
                reason: format!("unknown payment type '{other}'"),
            }),
        }
    }
}

/// Lifecycle status of a payment request.
///
/// `Completed` and `Failed` are recorded in the log and final. `Expired` is
/// derived from wall-clock time and never overrides a recorded outcome.
/// `Relayed` is a transient marker; no log message produces it, but guards
/// cover it so a second relay attempt is always rejected.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Signed,
    Relayed,
    Completed,
    Failed,
    Expired,
}

impl PaymentStatus {
    /// A status recorded in the log that no later message may overwrite.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }

    /// Statuses eligible for time-based expiry.
    pub fn can_expire(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Signed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Signed => "signed",
            PaymentStatus::Relayed => "relayed",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

impl FromStr for PaymentStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "signed" => Ok(PaymentStatus::Signed),
            "relayed" => Ok(PaymentStatus::Relayed),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "expired" => Ok(PaymentStatus::Expired),
            other => Err(PaymentError::Validation {
                field: "status",
                reason: format!("unknown status '{other}'"),
            }),
        }
    }
}

/// Execution outcome attached once a completed or failed record is folded in.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Completion {
    pub transaction_ref: String,
    pub sponsor: String,
    pub network_fee_paid: Decimal,
    pub sponsor_fee_charged: Decimal,
    pub completed_at: DateTime<Utc>,
}

/// Materialized view of one payment request, derived from its log messages.
/// Never itself written to the log.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentRequest {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub payment_type: PaymentType,
    pub amount: Amount,
    pub token_id: Option<String>,
    pub nft_serial: Option<u64>,
    /// Pinned sponsor account; `None` means any sponsor may relay.
    pub sponsor: Option<String>,
    pub max_fee: Decimal,
    pub expiration_time: DateTime<Utc>,
    pub memo: Option<String>,
    pub nonce: u64,
    /// Consensus timestamp of the originating request entry.
    pub created_at: DateTime<Utc>,
    /// Sequence number of the originating request entry.
    pub request_sequence: u64,
    /// Sequence number of the signature entry, once folded in.
    pub signed_sequence: Option<u64>,
    pub status: PaymentStatus,
    /// Unsigned transfer payload, base64.
    pub unsigned_transaction: String,
    /// Signed transfer payload, base64, once folded in.
    pub signed_transaction: Option<String>,
    pub completion: Option<Completion>,
    pub failure_reason: Option<String>,
}

impl PaymentRequest {
    /// Materializes a fresh record from a request entry. Status starts at
    /// `Pending` regardless of what the payload claims.
    pub fn from_request_body(
        body: crate::domain::message::RequestBody,
        sequence_number: u64,
        consensus_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: body.payment_request_id,
            sender: body.sender,
            recipient: body.recipient_account_id,
            payment_type: body.payment_type,
            amount: body.amount,
            token_id: body.token_id,
            nft_serial: body.nft_serial_number,
            sponsor: body.sponsor_account_id,
            max_fee: body.max_fee,
            expiration_time: body.expiration_time,
            memo: body.memo,
            nonce: body.nonce,
            created_at: consensus_timestamp,
            request_sequence: sequence_number,
            signed_sequence: None,
            status: PaymentStatus::Pending,
            unsigned_transaction: body.transaction_bytes,
            signed_transaction: None,
            completion: None,
            failure_reason: None,
        }
    }

    /// Whether the declared expiration has passed while no recorded outcome
    /// exists. A pure function of this record and `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status.can_expire() && self.expiration_time < now
    }

    /// Write-path guard: may `caller` append a signature for this request?
    pub fn authorize_signing(&self, caller: &str, now: DateTime<Utc>) -> Result<(), PaymentError> {
        match self.status {
            PaymentStatus::Expired => {
                return Err(PaymentError::Expired {
                    request_id: self.id.clone(),
                    expired_at: self.expiration_time,
                });
            }
            PaymentStatus::Signed
            | PaymentStatus::Relayed
            | PaymentStatus::Completed
            | PaymentStatus::Failed => {
                return Err(PaymentError::AlreadyProcessed {
                    request_id: self.id.clone(),
                    status: self.status,
                });
            }
            PaymentStatus::Pending => {}
        }
        if self.is_expired(now) {
            return Err(PaymentError::Expired {
                request_id: self.id.clone(),
                expired_at: self.expiration_time,
            });
        }
        if self.sender != caller {
            return Err(PaymentError::Authorization {
                account: caller.to_string(),
                action: "sign",
                request_id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Write-path guard: may `sponsor` relay this request?
    pub fn authorize_relay(&self, sponsor: &str, now: DateTime<Utc>) -> Result<(), PaymentError> {
        match self.status {
            PaymentStatus::Expired => {
                return Err(PaymentError::Expired {
                    request_id: self.id.clone(),
                    expired_at: self.expiration_time,
                });
            }
            PaymentStatus::Relayed | PaymentStatus::Completed | PaymentStatus::Failed => {
                return Err(PaymentError::AlreadyProcessed {
                    request_id: self.id.clone(),
                    status: self.status,
                });
            }
            PaymentStatus::Pending => {
                return Err(PaymentError::GuardViolation {
                    guard: "relay",
                    request_id: self.id.clone(),
                    status: self.status,
                });
            }
            PaymentStatus::Signed => {}
        }
        if self.is_expired(now) {
            return Err(PaymentError::Expired {
                request_id: self.id.clone(),
                expired_at: self.expiration_time,
            });
        }
        if self.signed_transaction.is_none() {
            return Err(PaymentError::GuardViolation {
                guard: "relay",
                request_id: self.id.clone(),
                status: self.status,
            });
        }
        if let Some(pinned) = &self.sponsor
            && pinned != sponsor
        {
            return Err(PaymentError::Authorization {
                account: sponsor.to_string(),
                action: "relay",
                request_id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Fold transition: attach a signature. Only valid from `Pending`.
    pub fn record_signature(
        &mut self,
        signed_transaction: String,
        sequence_number: u64,
    ) -> Result<(), PaymentError> {
        if self.status != PaymentStatus::Pending {
            return Err(PaymentError::GuardViolation {
                guard: "record signature on",
                request_id: self.id.clone(),
                status: self.status,
            });
        }
        self.signed_transaction = Some(signed_transaction);
        self.signed_sequence = Some(sequence_number);
        self.status = PaymentStatus::Signed;
        Ok(())
    }

    /// Fold transition: attach an execution outcome. First terminal write wins.
    pub fn record_completion(&mut self, completion: Completion) -> Result<(), PaymentError> {
        if self.status.is_terminal() {
            return Err(PaymentError::AlreadyProcessed {
                request_id: self.id.clone(),
                status: self.status,
            });
        }
        self.completion = Some(completion);
        self.status = PaymentStatus::Completed;
        Ok(())
    }

    /// Fold transition: record an execution failure. First terminal write wins.
    pub fn record_failure(
        &mut self,
        sponsor: String,
        reason: String,
        failed_at: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        if self.status.is_terminal() {
            return Err(PaymentError::AlreadyProcessed {
                request_id: self.id.clone(),
                status: self.status,
            });
        }
        self.completion = Some(Completion {
            transaction_ref: String::new(),
            sponsor,
            network_fee_paid: Decimal::ZERO,
            sponsor_fee_charged: Decimal::ZERO,
            completed_at: failed_at,
        });
        self.failure_reason = Some(reason);
        self.status = PaymentStatus::Failed;
        Ok(())
    }

    /// Expiry post-pass transition. No-op unless currently eligible.
    pub fn mark_expired(&mut self, now: DateTime<Utc>) {
        if self.is_expired(now) {
            self.status = PaymentStatus::Expired;
        }
    }
}
