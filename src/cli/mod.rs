pub mod accounts;
pub mod import;
pub mod init;
pub mod movements;
pub mod periods;
pub mod status;

use clap::{Parser, Subcommand};

use crate::error::{Result, TesoroError};
use crate::models::Period;

/// Parse a "YYYY-MM" period argument.
pub(crate) fn parse_period(raw: &str) -> Result<Period> {
    let parts: Vec<&str> = raw.split('-').collect();
    if parts.len() == 2 {
        if let (Ok(year), Ok(month)) = (parts[0].parse::<i32>(), parts[1].parse::<u32>()) {
            if (1..=12).contains(&month) {
                return Ok(Period::new(year, month));
            }
        }
    }
    Err(TesoroError::InvalidPeriod(raw.to_string()))
}

#[derive(Parser)]
#[command(name = "tesoro", about = "Treasury ledger import CLI for membership organizations.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up tesoro: choose a data directory and initialize the database.
    Init {
        /// Path for tesoro data (default: ~/Documents/tesoro)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage treasury accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Import a ledger workbook (one cut-off sheet per month).
    Import {
        /// Path to the XLSX workbook
        file: String,
        /// Account code to import into
        #[arg(long)]
        account: String,
        /// Compute and report everything without writing
        #[arg(long)]
        dry_run: bool,
        /// Print the import summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Lock, unlock and list accounting periods.
    Periods {
        #[command(subcommand)]
        command: PeriodsCommands,
    },
    /// List recently imported movements.
    Movements {
        /// Maximum number of rows to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show data directory, database counts and the last import.
    Status,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a treasury account.
    Add {
        /// Short account code (e.g. CAJA)
        code: String,
        /// Display name
        name: String,
        /// Opening balance used to seed reconciliation
        #[arg(long, default_value_t = 0.0)]
        opening_balance: f64,
    },
    /// List accounts.
    List,
}

#[derive(Subcommand)]
pub enum PeriodsCommands {
    /// Lock a period (YYYY-MM): no further imports may write into it.
    Lock { period: String },
    /// Unlock a period (YYYY-MM).
    Unlock { period: String },
    /// List locked periods.
    List,
}
