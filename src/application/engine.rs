use crate::application::query::{self, DEFAULT_LIMIT, RequestFilter};
use crate::application::reconciler::{self, ReconciledView};
use crate::domain::message::{
    CompletedBody, FailedBody, PROTOCOL_VERSION, RequestBody, SequencedMessage, SignedBody,
    TopicMessage,
};
use crate::domain::ports::{TopicLogBox, TransferExecutorBox, TransferSpec};
use crate::domain::request::{Amount, PaymentRequest, PaymentStatus, PaymentType};
use crate::domain::request_id::{derive_request_id, next_nonce};
use crate::error::{PaymentError, Result};
use crate::interfaces::json::message_codec;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{info, warn};

const MAX_FETCH_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);

/// A payment intent as handed in by the payer. The sender is always the
/// engine's operator account.
#[derive(Debug, Clone)]
pub struct CreateIntent {
    pub log_id: String,
    pub recipient: String,
    pub payment_type: PaymentType,
    pub amount: Amount,
    pub token_id: Option<String>,
    pub nft_serial: Option<u64>,
    /// Pin execution to one sponsor; `None` lets any sponsor relay.
    pub sponsor: Option<String>,
    pub max_fee: Decimal,
    pub expiration_time: DateTime<Utc>,
    pub memo: Option<String>,
    /// Correlation nonce; generated when absent.
    pub nonce: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateReceipt {
    pub log_id: String,
    pub sequence_number: u64,
    pub request_id: String,
    /// Unsigned transfer payload, base64, for the payer to sign.
    pub unsigned_transaction: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignReceipt {
    pub log_id: String,
    pub sequence_number: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelayReceipt {
    pub transaction_ref: String,
    pub request_id: String,
    pub sponsor: String,
    pub gas_paid: Decimal,
    pub sponsor_fee: Decimal,
}

/// Read-path parameters. Absent filters match everything; an absent limit
/// falls back to [`DEFAULT_LIMIT`].
#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    pub log_id: String,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub payment_type: Option<PaymentType>,
    pub status: Option<PaymentStatus>,
    pub limit: Option<usize>,
}

/// The write path of the protocol, acting as one account.
///
/// Every operation re-reconciles the live log before evaluating its guards,
/// so caller-supplied state is never trusted. The log stays the sole source
/// of truth: nothing is cached between calls, and any operation future can be
/// dropped (e.g. by a caller-side timeout) without corrupting anything. The
/// only externally visible effect is the appended message itself.
pub struct PaymentEngine {
    log: TopicLogBox,
    executor: TransferExecutorBox,
    operator: String,
}

impl PaymentEngine {
    pub fn new(log: TopicLogBox, executor: TransferExecutorBox, operator: impl Into<String>) -> Self {
        Self {
            log,
            executor,
            operator: operator.into(),
        }
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// Publishes a payment intent and returns the unsigned transfer for the
    /// payer to sign.
    pub async fn create_request(&self, intent: CreateIntent) -> Result<CreateReceipt> {
        let now = Utc::now();
        validate_intent(&intent, now)?;

        let nonce = intent.nonce.unwrap_or_else(next_nonce);
        let request_id = derive_request_id(&self.operator, &intent.recipient, nonce);

        let view = self.view_of(&intent.log_id, now).await?;
        if let Some(existing) = view.get(&request_id) {
            return Err(PaymentError::AlreadyProcessed {
                request_id,
                status: existing.status,
            });
        }

        let spec = TransferSpec {
            sender: self.operator.clone(),
            recipient: intent.recipient.clone(),
            payment_type: intent.payment_type,
            amount: intent.amount,
            token_id: intent.token_id.clone(),
            nft_serial: intent.nft_serial,
            memo: intent.memo.clone(),
        };
        let unsigned = self.executor.build_transfer(&spec).await?;
        let unsigned_transaction = BASE64.encode(&unsigned);

        let body = RequestBody {
            version: PROTOCOL_VERSION,
            payment_request_id: request_id.clone(),
            timestamp: now,
            sender: self.operator.clone(),
            payment_type: intent.payment_type,
            recipient_account_id: intent.recipient,
            amount: intent.amount,
            max_fee: intent.max_fee,
            expiration_time: intent.expiration_time,
            nonce,
            transaction_bytes: unsigned_transaction.clone(),
            status: PaymentStatus::Pending,
            token_id: intent.token_id,
            nft_serial_number: intent.nft_serial,
            sponsor_account_id: intent.sponsor,
            memo: intent.memo,
        };
        let payload = message_codec::encode(&TopicMessage::Request(body))?;
        let sequence_number = self.log.append(&intent.log_id, payload).await?;
        info!(request_id = %request_id, sequence_number, "published payment request");

        Ok(CreateReceipt {
            log_id: intent.log_id,
            sequence_number,
            request_id,
            unsigned_transaction,
        })
    }

    /// Signs a pending request as its original sender and publishes the
    /// signature.
    pub async fn sign_request(
        &self,
        log_id: &str,
        request_id: &str,
        sequence_number: u64,
    ) -> Result<SignReceipt> {
        let now = Utc::now();
        let view = self.view_of(log_id, now).await?;
        let record = view.get(request_id).ok_or_else(|| PaymentError::NotFound {
            request_id: request_id.to_string(),
        })?;
        if record.request_sequence != sequence_number {
            return Err(PaymentError::SequenceNotFound { sequence_number });
        }
        record.authorize_signing(&self.operator, now)?;

        let unsigned = decode_transaction(&record.unsigned_transaction)?;
        let signed = self.executor.sign(&unsigned).await?;

        let body = SignedBody {
            payment_request_id: record.id.clone(),
            timestamp: now,
            signed_transaction_bytes: BASE64.encode(&signed),
            original_sequence_number: record.request_sequence,
            status: PaymentStatus::Signed,
            sender: record.sender.clone(),
            recipient_account_id: record.recipient.clone(),
            payment_type: record.payment_type,
            amount: record.amount,
        };
        let payload = message_codec::encode(&TopicMessage::Signed(body))?;
        let signed_sequence = self.log.append(log_id, payload).await?;
        info!(request_id = %record.id, sequence_number = signed_sequence, "published signature");

        Ok(SignReceipt {
            log_id: log_id.to_string(),
            sequence_number: signed_sequence,
        })
    }

    /// Executes a signed request as a sponsor, referenced by the sequence
    /// number of its signature entry, and publishes the outcome.
    ///
    /// Nothing prevents two sponsors from racing to this point; the ledger
    /// rejects the second submit of the same signed payload, and readers keep
    /// only the first recorded outcome. The loser pays for a wasted attempt.
    pub async fn relay_request(
        &self,
        log_id: &str,
        sequence_number: u64,
        sponsor_fee: Option<Decimal>,
    ) -> Result<RelayReceipt> {
        let sponsor_fee = sponsor_fee.unwrap_or(Decimal::ZERO);
        if sponsor_fee < Decimal::ZERO {
            return Err(PaymentError::Validation {
                field: "sponsorFee",
                reason: "sponsor fee cannot be negative".to_string(),
            });
        }

        let now = Utc::now();
        let view = self.view_of(log_id, now).await?;
        let record = view
            .find_by_signed_sequence(sequence_number)
            .ok_or(PaymentError::SequenceNotFound { sequence_number })?;
        record.authorize_relay(&self.operator, now)?;

        let signed_transaction =
            record
                .signed_transaction
                .as_deref()
                .ok_or(PaymentError::GuardViolation {
                    guard: "relay",
                    request_id: record.id.clone(),
                    status: record.status,
                })?;
        let signed = decode_transaction(signed_transaction)?;

        match self.executor.submit(&signed).await {
            Ok(receipt) => {
                let body = CompletedBody {
                    payment_request_id: record.id.clone(),
                    timestamp: now,
                    transaction_id: receipt.transaction_id.clone(),
                    sponsor: self.operator.clone(),
                    gas_paid: receipt.network_fee,
                    sponsor_fee,
                    status: PaymentStatus::Completed,
                };
                let payload = message_codec::encode(&TopicMessage::Completed(body))?;
                self.log.append(log_id, payload).await?;
                info!(
                    request_id = %record.id,
                    transaction_id = %receipt.transaction_id,
                    "relayed payment"
                );

                Ok(RelayReceipt {
                    transaction_ref: receipt.transaction_id,
                    request_id: record.id.clone(),
                    sponsor: self.operator.clone(),
                    gas_paid: receipt.network_fee,
                    sponsor_fee,
                })
            }
            Err(err) => {
                let body = FailedBody {
                    payment_request_id: record.id.clone(),
                    timestamp: now,
                    sponsor: self.operator.clone(),
                    reason: err.to_string(),
                    status: PaymentStatus::Failed,
                };
                // Publish the failure so other readers stop treating the
                // request as relayable; the original error still surfaces.
                match message_codec::encode(&TopicMessage::Failed(body)) {
                    Ok(payload) => {
                        if let Err(append_err) = self.log.append(log_id, payload).await {
                            warn!(request_id = %record.id, %append_err, "could not publish failure record");
                        }
                    }
                    Err(encode_err) => {
                        warn!(request_id = %record.id, %encode_err, "could not encode failure record");
                    }
                }
                Err(err)
            }
        }
    }

    /// Reconciles the topic at the current instant and returns the filtered,
    /// newest-first page.
    pub async fn list_requests(&self, params: QueryParams) -> Result<Vec<PaymentRequest>> {
        let view = self.view_of(&params.log_id, Utc::now()).await?;
        let filter = RequestFilter {
            sender: params.sender,
            recipient: params.recipient,
            payment_type: params.payment_type,
            status: params.status,
        };
        Ok(query::query(
            &view,
            &filter,
            Some(params.limit.unwrap_or(DEFAULT_LIMIT)),
        ))
    }

    async fn view_of(&self, log_id: &str, now: DateTime<Utc>) -> Result<ReconciledView> {
        let messages = self.fetch_with_retry(log_id).await?;
        Ok(reconciler::reconcile_at(&messages, now))
    }

    async fn fetch_with_retry(&self, log_id: &str) -> Result<Vec<SequencedMessage>> {
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 1;
        loop {
            match self.log.fetch_messages(log_id).await {
                Ok(messages) => return Ok(messages),
                Err(err) if err.is_retryable() && attempt < MAX_FETCH_ATTEMPTS => {
                    warn!(log_id, attempt, %err, "log fetch failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn validate_intent(intent: &CreateIntent, now: DateTime<Utc>) -> Result<()> {
    if intent.expiration_time <= now {
        return Err(PaymentError::Validation {
            field: "expirationTime",
            reason: "expiration must lie in the future".to_string(),
        });
    }
    if intent.max_fee < Decimal::ZERO {
        return Err(PaymentError::Validation {
            field: "maxFee",
            reason: "max fee cannot be negative".to_string(),
        });
    }
    match intent.payment_type {
        PaymentType::Hbar => {}
        PaymentType::Token => {
            if intent.token_id.is_none() {
                return Err(PaymentError::Validation {
                    field: "tokenId",
                    reason: "token payments need a token id".to_string(),
                });
            }
        }
        PaymentType::Nft => {
            if intent.token_id.is_none() || intent.nft_serial.is_none() {
                return Err(PaymentError::Validation {
                    field: "nftSerialNumber",
                    reason: "NFT payments need a token id and serial number".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn decode_transaction(encoded: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(encoded)
        .map_err(|err| PaymentError::Validation {
            field: "transactionBytes",
            reason: err.to_string(),
        })
}
