use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kroger_cli::api::KrogerApi;
use kroger_cli::config::{default_config_path, Config};
use kroger_cli::credentials;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "kroger-cli")]
#[command(about = "Automate a Kroger account: points, purchases, coupon clipping, and the feedback survey")]
#[command(version = VERSION)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Run the browser in a visible window
    #[arg(long)]
    visible: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show account profile info
    AccountInfo,
    /// Show the rewards points balance
    PointsBalance,
    /// Show a summary of recent purchases
    PurchasesSummary,
    /// Clip all available digital coupons
    ClipCoupons,
    /// Complete the feedback survey for the most recent purchase
    CompleteSurvey,
    /// Show the config file path in use
    ConfigPath,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "info,chromiumoxide=warn,chromiumoxide::conn=off,chromiumoxide::handler=off",
            )
        }))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .init();

    let cli = Cli::parse();

    if let Command::ConfigPath = cli.command {
        println!("{}", cli.config.display());
        return Ok(());
    }

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;
    if cli.visible {
        config.browser.headless = false;
    }

    let credentials = credentials::resolve(&config)?;
    let api = KrogerApi::new(config, credentials);

    match cli.command {
        Command::AccountInfo => match api.account_info().await? {
            Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
            None => std::process::exit(1),
        },
        Command::PointsBalance => match api.points_balance().await? {
            Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            None => std::process::exit(1),
        },
        Command::PurchasesSummary => match api.purchases_summary().await? {
            Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            None => std::process::exit(1),
        },
        Command::ClipCoupons => {
            if api.clip_coupons().await?.is_none() {
                std::process::exit(1);
            }
        }
        Command::CompleteSurvey => match api.complete_survey().await? {
            Some(true) => {
                println!("Survey completed! The bonus fuel points should appear on your account shortly.");
            }
            Some(false) => {
                eprintln!("The survey never reached its finish page; it may have changed shape.");
                std::process::exit(2);
            }
            None => std::process::exit(1),
        },
        Command::ConfigPath => unreachable!("handled before config load"),
    }

    Ok(())
}
