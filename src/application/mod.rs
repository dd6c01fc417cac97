//! Application layer: the reconciliation fold, the query engine over the
//! reconciled view, and the write-path `PaymentEngine` that guards and
//! appends new log entries.

pub mod engine;
pub mod query;
pub mod reconciler;
