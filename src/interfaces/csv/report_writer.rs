use crate::domain::request::PaymentRequest;
use crate::error::Result;
use std::io::Write;

/// Writes a flat CSV summary of payment requests.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_requests(&mut self, requests: &[PaymentRequest]) -> Result<()> {
        self.writer.write_record([
            "id", "sender", "recipient", "type", "amount", "status", "expires",
        ])?;
        for request in requests {
            let payment_type = request.payment_type.to_string();
            let amount = request.amount.to_string();
            let status = request.status.to_string();
            let expires = request.expiration_time.to_rfc3339();
            self.writer.write_record([
                request.id.as_str(),
                request.sender.as_str(),
                request.recipient.as_str(),
                payment_type.as_str(),
                amount.as_str(),
                status.as_str(),
                expires.as_str(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
