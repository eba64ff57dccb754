// Copyright 2026 PartScout Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use partscout_runtime::cli;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "partscout",
    about = "PartScout: price and availability lookup across industrial parts catalogs",
    version,
    after_help = "Run 'partscout <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every catalog for a part
    Search {
        /// Part number, part name, or description (e.g. "6203")
        query: String,
        /// Maximum number of listings
        #[arg(long)]
        limit: Option<usize>,
        /// Never fall back to the headless browser
        #[arg(long)]
        no_browser: bool,
        /// Also show what each source contributed
        #[arg(long)]
        report: bool,
        /// Only search these sources (repeatable, see `partscout sources`)
        #[arg(long = "source", value_name = "ID")]
        sources: Vec<String>,
    },
    /// Show how a query would be rewritten before searching
    Enhance {
        /// Query to enhance
        query: String,
    },
    /// List the configured catalogs
    Sources,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("partscout={level},partscout_runtime={level}"))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::output::init(cli.json, cli.quiet);
    init_tracing(&cli);

    let result = match cli.command {
        Commands::Search {
            query,
            limit,
            no_browser,
            report,
            sources,
        } => cli::search_cmd::run(&query, limit, no_browser, report, &sources).await,
        Commands::Enhance { query } => cli::enhance_cmd::run(&query).await,
        Commands::Sources => cli::sources_cmd::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "partscout", &mut std::io::stdout());
            Ok(())
        }
    };

    // 0=success, 1=error
    if let Err(e) = &result {
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else if !cli::output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
