use crate::domain::message::SequencedMessage;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};

/// One line of a topic export: the log-assigned envelope plus the wire
/// payload as it appeared on the topic.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportRecord {
    sequence_number: u64,
    consensus_timestamp: DateTime<Utc>,
    payload: serde_json::Value,
}

/// Reads a JSONL topic export (one log entry per line).
///
/// Wraps any `Read` source and yields per-line `Result`s lazily, so a single
/// bad line surfaces as one error item and the rest of the stream keeps
/// flowing.
pub struct LogFileReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> LogFileReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
        }
    }

    /// Returns an iterator that lazily parses log entries. Blank lines are
    /// skipped; the payload is re-serialized to the bytes the reconciler
    /// decodes, so codec-level validation still applies downstream.
    pub fn entries(self) -> impl Iterator<Item = Result<SequencedMessage>> {
        self.reader
            .lines()
            .map(|line| -> Result<Option<SequencedMessage>> {
                let line = line?;
                if line.trim().is_empty() {
                    return Ok(None);
                }
                let record: ExportRecord = serde_json::from_str(&line)?;
                Ok(Some(SequencedMessage {
                    sequence_number: record.sequence_number,
                    consensus_timestamp: record.consensus_timestamp,
                    payload: serde_json::to_vec(&record.payload)
                        .map_err(PaymentError::Decode)?,
                }))
            })
            .filter_map(Result::transpose)
    }
}
