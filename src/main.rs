use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use resource_coverage::config::Config;
use resource_coverage::coverage::{load_inventory, mark_in_terraform};
use resource_coverage::parsers::{ParseMode, parse_packages};
use resource_coverage::reports::{ReportFormat, render};
use resource_coverage::scanner::scan_dir;

#[derive(Parser)]
#[command(name = "resource-coverage")]
#[command(about = "Report which versioned SDK packages a Go provider imports", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the import block of a single Go file
    Parse {
        /// Path to the Go source file
        #[arg(short, long)]
        file: PathBuf,

        /// Output format: json or summary
        #[arg(short, long, default_value = "summary")]
        output: String,

        /// Skip import lines without an api version instead of failing
        #[arg(long)]
        lenient: bool,
    },
    /// Scan a provider tree and report imported API versions
    Scan {
        /// Root directory of the provider sources
        #[arg(short, long)]
        dir: PathBuf,

        /// JSON inventory of resources to correlate with the imports
        #[arg(short, long)]
        inventory: Option<PathBuf>,

        /// Output format: json, markdown, or summary
        #[arg(short, long, default_value = "summary")]
        output: String,

        /// Skip import lines without an api version instead of failing
        #[arg(long)]
        lenient: bool,

        /// Exit with code 1 if any file failed to parse
        #[arg(long)]
        fail_on_errors: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Parse {
            file,
            output,
            lenient,
        } => run_parse(file, output, parse_mode(&config, lenient)).await,
        Commands::Scan {
            dir,
            inventory,
            output,
            lenient,
            fail_on_errors,
        } => {
            let mode = parse_mode(&config, lenient);
            match run_scan(&config, dir, inventory, output, mode).await {
                Ok(has_failures) if has_failures && fail_on_errors => ExitCode::FAILURE,
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn parse_mode(config: &Config, lenient: bool) -> ParseMode {
    if lenient {
        ParseMode::Lenient
    } else {
        config.parser.mode
    }
}

async fn run_parse(file: PathBuf, output: String, mode: ParseMode) -> ExitCode {
    let task_file = file.clone();
    let packages =
        match tokio::task::spawn_blocking(move || parse_packages(&task_file, mode)).await {
            Ok(Ok(packages)) => packages,
            Ok(Err(e)) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
            Err(e) => {
                eprintln!("Error: parse task failed: {e}");
                return ExitCode::FAILURE;
            }
        };

    match ReportFormat::from_str_loose(&output) {
        ReportFormat::Json => match serde_json::to_string_pretty(&packages) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to serialize packages: {e}");
                return ExitCode::FAILURE;
            }
        },
        _ => {
            println!("Versioned packages in {}\n", file.display());
            if packages.is_empty() {
                println!("  (none)");
            }
            for package in &packages {
                if package.alias.is_empty() {
                    println!("  {}  [{}]", package.path, package.api_version);
                } else {
                    println!(
                        "  {} {}  [{}]",
                        package.alias, package.path, package.api_version
                    );
                }
            }
        }
    }

    ExitCode::SUCCESS
}

/// Returns whether any file failed to parse
async fn run_scan(
    config: &Config,
    dir: PathBuf,
    inventory: Option<PathBuf>,
    output: String,
    mode: ParseMode,
) -> anyhow::Result<bool> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }

    let mut coverage = inventory.as_deref().map(load_inventory).transpose()?;

    let scan = scan_dir(&dir, &config.scan, mode).await;

    if let Some(entries) = coverage.as_mut() {
        let packages: Vec<_> = scan.packages().cloned().collect();
        mark_in_terraform(entries, &packages);
    }

    let report = render(
        ReportFormat::from_str_loose(&output),
        &dir,
        &scan,
        coverage.as_deref(),
    )?;
    println!("{report}");

    Ok(scan.has_failures())
}
