// pricewise CLI - vendor pricing report from price book and cost catalogs

mod config_cmd;
mod exit_codes;
mod inspect;
mod run;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

/// Log filter override, e.g. `PRICEWISE_LOG=pricewise_pricing=debug`.
const LOG_ENV: &str = "PRICEWISE_LOG";

#[derive(Parser)]
#[command(name = "pricewise")]
#[command(about = "Vendor pricing report: GP2 margins, deal pivots, chain pricing")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output (debug)
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors on stderr
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the pricing workbook for one vendor
    #[command(after_help = "\
Examples:
  pricewise run --vendor 300123 --threshold 0.25
  pricewise run --vendor 300123 --threshold 0.25 --as-of 2024-06-01 --source-dir data/
  pricewise run --vendor 300123 --threshold 0.2 --price-book pb.xlsx --cost-catalog costs.csv --json")]
    Run(run::RunArgs),

    /// Inspect or print the pipeline config
    #[command(subcommand)]
    Config(ConfigCommands),

    /// List the sheets and header rows of a catalog file
    #[command(after_help = "\
Examples:
  pricewise inspect Price_Book_Full.xlsx
  pricewise inspect ZPURCON.xlsx --sheet Sheet1 --json")]
    Inspect {
        /// Catalog file (.xlsx, .xls, .ods, .csv, .tsv)
        file: PathBuf,

        /// Only this sheet
        #[arg(long)]
        sheet: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Validate a config file (default: the one `run` would use)
    Check {
        file: Option<PathBuf>,
    },
    /// Print the built-in config as TOML
    Default,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("PRICEWISE_COMMIT"), ")",
        "\nengine:  pricewise-pricing ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("PRICEWISE_TARGET"),
    )
}

fn init_tracing(verbose: bool, quiet: bool) {
    let fallback = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run(args) => run::cmd_run(args),
        Commands::Config(ConfigCommands::Check { file }) => config_cmd::cmd_check(file),
        Commands::Config(ConfigCommands::Default) => config_cmd::cmd_default(),
        Commands::Inspect { file, sheet, json } => inspect::cmd_inspect(file, sheet, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
