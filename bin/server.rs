// Donation Trace - Web Server
// Read-only REST API over a ledger file

use anyhow::Result;
use clap::Parser;
use donation_trace::config::init_logging;
use donation_trace::server::{serve, ServerArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();
    init_logging(&args.log_level);

    serve(args).await
}
