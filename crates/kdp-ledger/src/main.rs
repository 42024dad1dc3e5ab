//! KDP Royalty Ledger
//!
//! Ingests saved snapshots of the KDP royalties dashboard and the advertising
//! console, keeps one reconciled ledger per account and links books to the
//! portfolios that advertise them.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use kdp_ledger::config::{self, FileConfig};
use kdp_ledger::constants;
use kdp_ledger::reports;
use kdp_ledger::store::Store;
use kdp_ledger::Ledger;

/// Load config file, falling back to defaults when the default path is absent
fn load_config_file(explicit: Option<&Path>) -> Result<FileConfig> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!(
                    "Config file '{}' not found.\n\n\
                    Copy config.toml.example to config.toml or drop the --config flag\n\
                    to run with the built-in selectors.",
                    path.display()
                );
            }
            FileConfig::load(path)
        }
        None => {
            let path = Path::new(constants::CONFIG_FILE);
            if path.exists() {
                FileConfig::load(path)
            } else {
                Ok(FileConfig::default())
            }
        }
    }
}

/// Read a saved dashboard page
fn read_snapshot(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read snapshot: {}", file.display()))
}

#[derive(Parser, Debug)]
#[command(name = "kdp-ledger")]
#[command(about = "Royalty and ad-portfolio ledger built from KDP dashboard snapshots")]
struct Args {
    /// Path to config.toml (default: ./config.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for the ledger database (overrides config)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage royalty records
    Royalties {
        #[command(subcommand)]
        action: RoyaltiesCommand,
    },

    /// Manage advertising portfolios
    Portfolios {
        #[command(subcommand)]
        action: PortfoliosCommand,
    },

    /// Link a royalty to the portfolio advertising it
    Link {
        /// Royalty ID
        royalty_id: i64,

        /// Portfolio ID
        portfolio_id: i64,
    },

    /// Clear a royalty's portfolio link
    Unlink {
        /// Royalty ID
        royalty_id: i64,
    },

    /// Show portfolios and royalties grouped by link state
    Dashboard {
        /// Print as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Show headline royalty and ad spend figures
    Summary {
        /// Limit figures to one account
        #[arg(long)]
        account: Option<String>,
    },

    /// Export royalties and portfolios to CSV
    Export {
        /// Output directory for CSV files
        #[arg(short, long, default_value = "./output")]
        output_dir: PathBuf,
    },

    /// Delete every royalty and portfolio of an account
    Purge {
        /// Account identifier
        #[arg(long)]
        account: String,
    },
}

#[derive(Subcommand, Debug)]
enum RoyaltiesCommand {
    /// Reconcile an account against a saved royalties dashboard page
    Ingest {
        /// Account identifier
        #[arg(long)]
        account: String,

        /// Saved HTML page
        file: PathBuf,
    },

    /// List stored royalties
    List {
        /// Only royalties linked to this portfolio
        #[arg(long)]
        portfolio: Option<i64>,
    },
}

#[derive(Subcommand, Debug)]
enum PortfoliosCommand {
    /// Reconcile an account against a saved advertising console page
    Ingest {
        /// Account identifier
        #[arg(long)]
        account: String,

        /// Saved HTML page
        file: PathBuf,
    },

    /// List stored portfolios
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so --json output stays clean
    let default_filter = if args.verbose { "kdp_ledger=debug" } else { "kdp_ledger=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load config file and initialize runtime configuration
    let file_config = load_config_file(args.config.as_deref())?;
    let config = config::Config::from_file(&file_config, args.data_dir);

    let store = Store::open(&config.database_path)
        .await
        .with_context(|| format!("Failed to open ledger database {}", config.database_path.display()))?;
    let ledger = Ledger::new(store, &config).context("Invalid selector in config")?;

    handle_command(args.command, &ledger).await
}

/// Dispatch subcommands
async fn handle_command(command: Command, ledger: &Ledger) -> Result<()> {
    match command {
        Command::Royalties { action } => handle_royalties_command(action, ledger).await,
        Command::Portfolios { action } => handle_portfolios_command(action, ledger).await,

        Command::Link {
            royalty_id,
            portfolio_id,
        } => {
            let royalty = ledger.link(royalty_id, portfolio_id).await?;
            println!(
                "Linked '{}' (royalty {}) to portfolio {}",
                royalty.book_title, royalty.id, portfolio_id
            );
            Ok(())
        }

        Command::Unlink { royalty_id } => {
            let royalty = ledger.unlink(royalty_id).await?;
            println!("Unlinked '{}' (royalty {})", royalty.book_title, royalty.id);
            Ok(())
        }

        Command::Dashboard { json } => {
            let view = ledger.dashboard_view().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                reports::print_dashboard(&view);
            }
            Ok(())
        }

        Command::Summary { account } => {
            let summary = ledger.summary(account.as_deref()).await?;
            reports::print_summary(&summary);
            println!("Database: {}", ledger.store().stats().await?);
            Ok(())
        }

        Command::Export { output_dir } => {
            let royalties = ledger.royalties().await?;
            let portfolios = ledger.portfolios().await?;
            let paths = reports::export_all(&output_dir, &royalties, &portfolios)?;

            println!(
                "Exported {} royalties and {} portfolios:",
                royalties.len(),
                portfolios.len()
            );
            for path in paths {
                println!("  {}", path.display());
            }
            Ok(())
        }

        Command::Purge { account } => {
            let stats = ledger.purge(&account).await?;
            println!("Purged {} for account {}", stats, account);
            Ok(())
        }
    }
}

/// Handle royalty subcommands
async fn handle_royalties_command(action: RoyaltiesCommand, ledger: &Ledger) -> Result<()> {
    match action {
        RoyaltiesCommand::Ingest { account, file } => {
            println!("Ingesting royalties for {} from {}...\n", account, file.display());

            let html = read_snapshot(&file)?;
            let records = ledger.parse_royalties(&html, &account).await?;

            if records.is_empty() {
                println!("No royalty rows found. Account {} now has no royalties.", account);
            } else {
                println!("{}", reports::royalty_table(&records));
                println!("\n{} royalties stored for {}", records.len(), account);
            }
            Ok(())
        }

        RoyaltiesCommand::List { portfolio } => {
            let records = match portfolio {
                Some(id) => ledger.portfolio_royalties(id).await?,
                None => ledger.royalties().await?,
            };

            if records.is_empty() {
                println!("No royalties stored.");
                println!("\nUse 'kdp-ledger royalties ingest --account <ID> <page.html>' to import data");
            } else {
                println!("{}", reports::royalty_table(&records));
                println!("\n{} royalties", records.len());
            }
            Ok(())
        }
    }
}

/// Handle portfolio subcommands
async fn handle_portfolios_command(action: PortfoliosCommand, ledger: &Ledger) -> Result<()> {
    match action {
        PortfoliosCommand::Ingest { account, file } => {
            println!("Ingesting portfolios for {} from {}...\n", account, file.display());

            let html = read_snapshot(&file)?;
            let records = ledger.parse_portfolios(&html, &account).await?;

            if records.is_empty() {
                println!("No portfolio rows found. Account {} now has no portfolios.", account);
            } else {
                println!("{}", reports::portfolio_table(&records));
                println!("\n{} portfolios stored for {}", records.len(), account);
            }
            Ok(())
        }

        PortfoliosCommand::List => {
            let records = ledger.portfolios().await?;

            if records.is_empty() {
                println!("No portfolios stored.");
                println!("\nUse 'kdp-ledger portfolios ingest --account <ID> <page.html>' to import data");
            } else {
                println!("{}", reports::portfolio_table(&records));
                println!("\n{} portfolios", records.len());
            }
            Ok(())
        }
    }
}
