mod classifier;
mod cli;
mod db;
mod error;
mod fingerprint;
mod fmt;
mod importer;
mod models;
mod persister;
mod reconciler;
mod rows;
mod settings;
mod sheets;
mod tolerance;

use clap::Parser;

use cli::{AccountsCommands, Cli, Commands, PeriodsCommands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add {
                code,
                name,
                opening_balance,
            } => cli::accounts::add(&code, &name, opening_balance),
            AccountsCommands::List => cli::accounts::list(),
        },
        Commands::Import {
            file,
            account,
            dry_run,
            json,
        } => cli::import::run(&file, &account, dry_run, json),
        Commands::Periods { command } => match command {
            PeriodsCommands::Lock { period } => cli::periods::lock(&period),
            PeriodsCommands::Unlock { period } => cli::periods::unlock(&period),
            PeriodsCommands::List => cli::periods::list(),
        },
        Commands::Movements { limit } => cli::movements::run(limit),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
