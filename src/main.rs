// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use donation_trace::config::{init_logging, AnalyzeArgs, Cli, Command, OutputFormat};
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Analyze(args) => run_analyze(&args),
        #[cfg(feature = "tui")]
        Command::Tui(args) => run_ui_mode(&args),
    }
}

fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    let report = args.ledger.build_report()?;

    match args.format {
        OutputFormat::Text => {
            for line in report.summary_lines() {
                println!("{}", line);
            }
        }
        OutputFormat::Json => {
            let json = report.to_json().context("Failed to serialize report")?;
            println!("{}", json);
        }
    }

    if report.is_empty() {
        info!("no matching deposit/withdrawal pairs found");
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(args: &donation_trace::config::LedgerArgs) -> Result<()> {
    let window = args.window()?;
    let transactions = args.load_transactions()?;
    let report = donation_trace::MatchReport::build(&transactions, &window, &args.engine()?);

    let mut app = ui::App::new(report, transactions);
    ui::run_ui(&mut app)?;

    info!("UI closed");
    Ok(())
}
