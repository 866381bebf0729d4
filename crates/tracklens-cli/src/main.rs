//! tracklens CLI - MCP server and configuration for the Jira/GitLab tools.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracklens_core::config::{token_from_env, GITLAB_TOKEN_ENV, JIRA_TOKEN_ENV};
use tracklens_core::Config;
use tracklens_gitlab::GitLabClient;
use tracklens_jira::JiraClient;
use tracklens_mcp::{McpServer, ToolHandler};

#[derive(Parser)]
#[command(name = "tracklens")]
#[command(author, version, about = "tracklens - Jira and GitLab tools for AI agents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server on stdin/stdout
    Serve,

    /// Read or change the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set a value, e.g. `jira.url https://acme.atlassian.net`
    Set { key: String, value: String },

    /// Print a single value
    Get { key: String },

    /// Show current configuration
    Show,

    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries JSON-RPC, so logs go to stderr
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };

    match cli.command {
        Some(Commands::Serve) => serve(&config_path).await,
        Some(Commands::Config { command }) => run_config(command, &config_path),
        None => {
            println!("tracklens - Jira and GitLab tools for AI agents");
            println!("Run with --help for usage information");
            Ok(())
        }
    }
}

async fn serve(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::load_from(config_path)?.with_env_overrides();
    let handler = build_handler(&config, token_from_env)?;
    if !handler.has_providers() {
        bail!(
            "No providers configured. Set jira.url/jira.email or gitlab.project_id with `tracklens config set`"
        );
    }

    tracing::info!(providers = ?config.configured_providers(), "Starting tracklens");
    let mut server = McpServer::new(handler);
    server.run().await?;
    Ok(())
}

/// Build the tool handler from configuration; `token` looks up secrets by
/// environment variable name.
fn build_handler<F>(config: &Config, token: F) -> anyhow::Result<ToolHandler>
where
    F: Fn(&str) -> tracklens_core::Result<String>,
{
    let mut handler = ToolHandler::new();

    if let Some(jira) = &config.jira {
        if jira.url.trim().is_empty() || jira.email.trim().is_empty() {
            bail!("Jira needs both jira.url and jira.email");
        }
        let api_token = token(JIRA_TOKEN_ENV).context("Jira API token")?;
        let client = JiraClient::new(&jira.url, &jira.email, api_token)
            .with_default_project(jira.project_key.clone());
        handler = handler.with_tickets(Arc::new(client));
    }

    if let Some(gitlab) = &config.gitlab {
        if gitlab.project_id.trim().is_empty() {
            bail!("GitLab needs gitlab.project_id");
        }
        let api_token = token(GITLAB_TOKEN_ENV).context("GitLab API token")?;
        let client = GitLabClient::with_base_url(&gitlab.url, &gitlab.project_id, api_token);
        handler = handler.with_merge_requests(Arc::new(client));
    }

    Ok(handler)
}

fn run_config(command: ConfigCommands, config_path: &Path) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load_from(config_path)?;
            config.set(&key, &value)?;
            config.save_to(config_path)?;
            println!("{} = {}", key, value);
        }
        ConfigCommands::Get { key } => {
            let config = Config::load_from(config_path)?;
            match config.get(&key)? {
                Some(value) => println!("{}", value),
                None => bail!("{} is not set", key),
            }
        }
        ConfigCommands::Show => {
            let config = Config::load_from(config_path)?;
            if !config.has_any_provider() {
                println!("No providers configured ({})", config_path.display());
                return Ok(());
            }
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommands::Path => {
            println!("{}", config_path.display());
        }
    }
    Ok(())
}
