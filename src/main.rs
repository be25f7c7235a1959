// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ecospend::{logging, report, EmissionFactorTable, ExpenseLedger, Submission};

#[derive(Debug, Parser)]
#[command(name = "ecospend", version, about = "Personal carbon-footprint expense log")]
struct Cli {
    /// Log filter directives (e.g. "debug")
    #[arg(long, env = "ECOSPEND_LOG", global = true)]
    log_level: Option<String>,

    /// Append logs to this file instead of stderr
    #[arg(long, env = "ECOSPEND_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive terminal UI (default)
    Ui,
    /// Print a report for the given expenses and exit
    Report {
        /// One expense as DATE,CATEGORY,AMOUNT (repeatable)
        #[arg(long = "expense", value_name = "DATE,CATEGORY,AMOUNT")]
        expenses: Vec<String>,
    },
    /// List categories and their emission factors
    Categories,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.as_deref();
    let log_file = cli.log_file.as_deref();

    match cli.command.unwrap_or(Command::Ui) {
        Command::Ui => {
            // Silent on stderr while the UI owns the terminal
            let default = match log_file {
                Some(_) => logging::DEFAULT_FILTER,
                None => logging::TUI_DEFAULT_FILTER,
            };
            logging::init(log_level, default, log_file)?;
            run_ui_mode()?;
        }
        Command::Report { expenses } => {
            logging::init(log_level, logging::DEFAULT_FILTER, log_file)?;
            run_report(&expenses)?;
        }
        Command::Categories => {
            logging::init(log_level, logging::DEFAULT_FILTER, log_file)?;
            run_categories();
        }
    }

    Ok(())
}

fn run_report(expenses: &[String]) -> Result<()> {
    let mut ledger = ExpenseLedger::new();

    for (i, raw) in expenses.iter().enumerate() {
        let submission: Submission = raw
            .parse()
            .with_context(|| format!("expense #{} rejected", i + 1))?;
        submission.apply(&mut ledger);
    }

    tracing::info!(entries = ledger.len(), "ledger built");
    print!("{}", report::render(&ledger));

    Ok(())
}

fn run_categories() {
    let table = EmissionFactorTable::standard();

    println!("{:<8} {:<14} {:>14}", "Key", "Label", "kg CO₂ / unit");
    for factor in table.factors() {
        println!("{:<8} {:<14} {:>14}", factor.category, factor.label, factor.kg_per_unit);
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode() -> Result<()> {
    // One process run is one session: the ledger starts empty and is
    // dropped when the UI exits.
    let mut app = ui::App::new(ExpenseLedger::new());
    ui::run_ui(&mut app)?;

    tracing::info!(entries = app.ledger.len(), "session closed");
    println!("{}", report::total_line(&app.ledger));

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode() -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: ecospend report --expense 2024-01-01,飲食,1000");
    std::process::exit(1);
}
