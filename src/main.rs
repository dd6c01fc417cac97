use chrono::Utc;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use sponsorpay::application::query::{self, DEFAULT_LIMIT, RequestFilter};
use sponsorpay::application::reconciler;
use sponsorpay::domain::request::{PaymentStatus, PaymentType};
use sponsorpay::interfaces::csv::report_writer::ReportWriter;
use sponsorpay::interfaces::json::log_file::LogFileReader;
use std::fs::File;
use std::io;
use std::path::PathBuf;

/// Reconciles a payment-topic export and prints the materialized requests.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Topic export to reconcile (JSON lines)
    input: PathBuf,

    /// Only requests sent by this account
    #[arg(long)]
    sender: Option<String>,

    /// Only requests paying this account
    #[arg(long)]
    recipient: Option<String>,

    /// Only requests of this payment type (HBAR, TOKEN, NFT)
    #[arg(long)]
    payment_type: Option<String>,

    /// Only requests currently in this status
    #[arg(long)]
    status: Option<String>,

    /// Maximum number of rows
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let payment_type = cli
        .payment_type
        .as_deref()
        .map(str::parse::<PaymentType>)
        .transpose()
        .into_diagnostic()?;
    let status = cli
        .status
        .as_deref()
        .map(str::parse::<PaymentStatus>)
        .transpose()
        .into_diagnostic()?;

    let file = File::open(cli.input).into_diagnostic()?;
    let mut messages = Vec::new();
    for entry in LogFileReader::new(file).entries() {
        match entry {
            Ok(message) => messages.push(message),
            Err(e) => {
                eprintln!("Error reading log entry: {}", e);
            }
        }
    }

    let view = reconciler::reconcile_at(&messages, Utc::now());
    if view.skipped > 0 {
        eprintln!("Skipped {} undecodable payloads", view.skipped);
    }

    let filter = RequestFilter {
        sender: cli.sender,
        recipient: cli.recipient,
        payment_type,
        status,
    };
    let results = query::query(&view, &filter, Some(cli.limit));

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_requests(&results).into_diagnostic()?;

    Ok(())
}
