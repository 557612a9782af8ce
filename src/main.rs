mod config;
mod error;
mod models;
mod server;
mod utils;
use std::net::SocketAddr;
use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{error, info, warn};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use crate::config::{PortalConfig, DOMAIN_VAR, USERNAME_VAR};
use crate::error::GradebookError;
use crate::server::AppState;
use crate::utils::console::{render_periods, render_text};
use crate::utils::normalize::normalize;
use crate::utils::studentvue::fetch_gradebook;
use crate::utils::web::render_html;

#[derive(Parser)]
#[command(name = "vuegrades")]
#[command(about = "Show StudentVue grades and assignments in the terminal or a browser", long_about = None)]
struct Cli {
    /// Log debug output, including the raw portal document
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Account name (defaults to STUDENTVUE_USERNAME)
    #[arg(long, global = true)]
    username: Option<String>,
    /// District portal domain (defaults to STUDENTVUE_DOMAIN)
    #[arg(long, global = true)]
    domain: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Print courses, grades and assignments as text
    Show {
        #[arg(long)]
        period: Option<u32>,
    },
    /// Write the gradebook as a standalone web page
    Html {
        #[arg(long)]
        period: Option<u32>,
        #[arg(long, default_value = "gradebook.html")]
        out: PathBuf,
    },
    /// Print the normalized gradebook as JSON
    Json {
        #[arg(long)]
        period: Option<u32>,
    },
    /// List the reporting periods the portal offers
    Periods,
    /// Serve the gradebook page over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:8501")]
        addr: SocketAddr,
        #[arg(long)]
        period: Option<u32>,
    },
}

// Entry point for the async main function, powered by tokio runtime.
#[tokio::main]
async fn main() {
    // Loads environment variables from a `.env` file, if present.
    dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(e) = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto) {
        eprintln!("Logging unavailable: {e}");
    }

    // Every failure from fetch through render ends up as one message.
    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        match e.downcast_ref::<GradebookError>() {
            Some(gradebook_error) => println!("{}", gradebook_error.user_message()),
            None => println!("Error fetching gradebook: {e}"),
        }
        std::process::exit(1);
    }
}

// Flags first, then the environment.
fn resolve_config(cli: &Cli) -> Result<PortalConfig> {
    if cli.username.is_none() && cli.domain.is_none() {
        return PortalConfig::from_env();
    }
    PortalConfig::from_lookup(|key| {
        let flag = match key {
            USERNAME_VAR => cli.username.clone(),
            DOMAIN_VAR => cli.domain.clone(),
            _ => None,
        };
        flag.or_else(|| std::env::var(key).ok())
    })
}

async fn run(cli: Cli) -> Result<()> {
    let command = cli.command.clone().unwrap_or(Commands::Show { period: None });

    match command {
        Commands::Show { period } => {
            let config = resolve_config(&cli)?;
            let raw = fetch_gradebook(&config, period).await?;
            info!("Grades retrieved successfully");
            print!("{}", render_text(&raw)?);
        }
        Commands::Html { period, out } => {
            let config = resolve_config(&cli)?;
            let raw = fetch_gradebook(&config, period).await?;
            let page = render_html(&raw)?;
            std::fs::write(&out, page)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            info!("Gradebook page written to {}", out.display());
        }
        Commands::Json { period } => {
            let config = resolve_config(&cli)?;
            let raw = fetch_gradebook(&config, period).await?;
            let gradebook = normalize(&raw)?;
            println!("{}", serde_json::to_string_pretty(&gradebook)?);
        }
        Commands::Periods => {
            let config = resolve_config(&cli)?;
            let raw = fetch_gradebook(&config, None).await?;
            print!("{}", render_periods(&normalize(&raw)?));
        }
        Commands::Serve { addr, period } => {
            let config = match resolve_config(&cli) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("{}; the page will ask for credentials", e);
                    None
                }
            };
            let domain_hint = cli.domain.clone().or_else(|| std::env::var(DOMAIN_VAR).ok());
            server::serve(addr, AppState { config, domain_hint, period }).await?;
        }
    }

    Ok(())
}
