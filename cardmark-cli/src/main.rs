//! Cardmark CLI - issue and verify photographic membership cards.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;
use utils::LedgerArgs;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Usage error (invalid arguments)
  65  Invalid card or undecodable image
  66  Cannot read input file
  69  Ledger unavailable or refused the request
  70  Internal error (entropy, serialization)
  74  Cannot write output file";

#[derive(Parser)]
#[command(name = "cardmark")]
#[command(author, version, about = "Photographic membership cards with salted image credentials", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// When to use colored output
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a membership card from a photo
    Register {
        /// Path to the member photo
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Subject id to bind into the card (defaults to the current time in ms)
        #[arg(long, value_name = "ID")]
        subject: Option<String>,

        /// Holder address for the ledger credential
        #[arg(long, value_name = "ADDRESS")]
        holder: Option<String>,

        /// Issuer address checked against the ledger before anchoring
        #[arg(long, value_name = "ADDRESS")]
        issuer: Option<String>,

        /// Output path for the card (defaults to <IMAGE stem>.card.jpg)
        #[arg(short, long, value_name = "PATH")]
        out: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        ledger: LedgerArgs,
    },

    /// Verify a membership card
    Verify {
        /// Path to the card image
        #[arg(value_name = "CARD")]
        card: PathBuf,

        /// Holder address to check ownership for
        #[arg(long, value_name = "ADDRESS")]
        holder: Option<String>,

        /// Fail unless the ledger confirms ownership
        #[arg(long, requires = "holder")]
        require_ownership: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        ledger: LedgerArgs,
    },

    /// Show the raw metadata fields of a card
    Inspect {
        /// Path to the card image
        #[arg(value_name = "CARD")]
        card: PathBuf,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match (quiet, verbose) {
        (true, _) => EnvFilter::new("error"),
        (false, 0) => EnvFilter::new("warn"),
        (false, 1) => EnvFilter::new("info"),
        (false, 2) => EnvFilter::new("debug"),
        (false, _) => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;
    match cli.command {
        Commands::Register {
            image,
            subject,
            holder,
            issuer,
            out,
            json,
            ledger,
        } => {
            commands::register::execute(commands::register::RegisterArgs {
                image,
                subject,
                holder,
                issuer,
                out,
                json,
                ledger,
                quiet,
            })
            .await
        }
        Commands::Verify {
            card,
            holder,
            require_ownership,
            json,
            ledger,
        } => {
            commands::verify::execute(card, holder, require_ownership, json, ledger, quiet).await
        }
        Commands::Inspect { card } => commands::inspect::execute(card, quiet),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
    init_tracing(cli.verbose, cli.quiet);

    let exit = match run(cli).await {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        eprintln!("Error: {}", message);
    }
    std::process::exit(exit.code);
}
