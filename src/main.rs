mod calendar;
mod config;
mod error;
mod mcp;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use calendar::CalendarService;
use calendar::auth::Credentials;
use calendar::google::GoogleCalendar;
use config::Config;

#[derive(Parser)]
#[command(name = "gcal-mcp-server", about = "Google Calendar tools over MCP (stdio)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Calendar REST base URL (overrides GCAL_API_BASE)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// OAuth token file (overrides GCAL_TOKEN_FILE)
    #[arg(long, global = true)]
    token_file: Option<PathBuf>,

    /// OAuth client secret file (overrides GCAL_CREDENTIALS_FILE)
    #[arg(long, global = true)]
    credentials_file: Option<PathBuf>,

    /// Deadline for each calendar API call (overrides GCAL_CALL_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP on stdin/stdout (default)
    Serve,

    /// Print the tool registry as JSON
    Tools,

    /// Show the calendar identity the token belongs to
    Whoami,
}

impl Cli {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::from_env()?;
        if let Some(base) = &self.api_base {
            config.api_base = base.clone();
        }
        if let Some(path) = &self.token_file {
            config.token_file = path.clone();
        }
        if let Some(path) = &self.credentials_file {
            config.credentials_file = path.clone();
        }
        if let Some(secs) = self.timeout_secs {
            if secs == 0 {
                anyhow::bail!("--timeout-secs must be greater than zero");
            }
            config.call_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // stdout carries protocol frames, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command.as_ref().unwrap_or(&Commands::Serve);

    match command {
        Commands::Serve => run_server(&cli).await,
        Commands::Tools => cmd_tools(),
        Commands::Whoami => cmd_whoami(&cli).await,
    }
}

fn build_service(config: &Config) -> anyhow::Result<CalendarService> {
    let credentials = Credentials::load(config);
    let api = GoogleCalendar::new(config, credentials)?;
    Ok(CalendarService::new(Arc::new(api), config.call_timeout))
}

/// Serve MCP until the client exits.
async fn run_server(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.config()?;
    tracing::info!(
        api_base = %config.api_base,
        call_timeout_secs = config.call_timeout.as_secs(),
        "Starting calendar MCP server"
    );
    let service = build_service(&config)?;
    mcp::serve_stdio(&service).await?;
    tracing::info!("Server stopped");
    Ok(())
}

/// Print every tool definition.
fn cmd_tools() -> anyhow::Result<()> {
    let tools = mcp::handlers::tools_json();
    println!("{}", serde_json::to_string_pretty(&tools)?);
    Ok(())
}

/// Resolve the authenticated identity.
async fn cmd_whoami(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.config()?;
    let service = build_service(&config)?;
    let identity = service.identity().await?;
    println!("{identity}");
    Ok(())
}
