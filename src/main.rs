//! legal-agent: streaming legal-assistant chat proxy.
//!
//! Usage:
//!   legal-agent serve            Start the HTTP chat proxy
//!   legal-agent init             Write a default config file
//!   legal-agent tools            List the tools offered to the model
//!   legal-agent todo list        Show the to-do list

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use legal_agent::config::{self, AgentConfig, CONFIG_FILE};
use legal_agent::inference::AnthropicClient;
use legal_agent::server::{self, AppState};
use legal_agent::state::TodoStore;
use legal_agent::tools::ToolRegistry;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "legal-agent")]
#[command(version)]
#[command(about = "Streaming legal-assistant chat proxy with in-band tool calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the legal-agent home directory (default: ~/.legal-agent).
    #[arg(long)]
    home: Option<String>,

    /// Log level (debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP chat proxy.
    Serve {
        /// Address to bind, overriding the config file.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Write a default config file into the home directory.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },

    /// List the tools offered to the model.
    Tools,

    /// Inspect or edit the to-do list.
    Todo {
        #[command(subcommand)]
        action: TodoCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TodoCommand {
    /// Show all items.
    List,
    /// Add an item.
    Add { item: String },
    /// Remove an item by id.
    Remove { id: String },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let home_dir = match &cli.home {
        Some(home) => PathBuf::from(shellexpand::tilde(home).into_owned()),
        None => config::default_home_dir(),
    };
    let config_path = home_dir.join(CONFIG_FILE);
    let mut cfg = config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    cfg.apply_api_key_override(std::env::var("ANTHROPIC_API_KEY").ok());

    // Initialize logging
    let level = cli.log_level.clone().unwrap_or_else(|| cfg.log_level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { bind } => cmd_serve(cfg, bind).await,
        Commands::Init { force } => cmd_init(&config_path, force),
        Commands::Tools => cmd_tools(),
        Commands::Todo { action } => cmd_todo(&cfg, action).await,
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_serve(mut cfg: AgentConfig, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        cfg.bind_address = bind;
    }

    let model = AnthropicClient::from_config(&cfg).context(
        "Model client unavailable. Set ANTHROPIC_API_KEY or api_key in legal-agent.toml",
    )?;
    let todos = Arc::new(TodoStore::open(cfg.resolved_todo_path()));

    println!(
        "{} Serving legal-agent on http://{} (model: {}, tools: {})",
        ">>>".green().bold(),
        cfg.bind_address,
        cfg.chat_model,
        cfg.tool_model,
    );

    let state = Arc::new(AppState::new(cfg, Arc::new(model), todos));
    let cancel = CancellationToken::new();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        println!("\n{} Shutting down gracefully...", "<<<".red().bold());
        shutdown.cancel();
    });

    server::serve(state, cancel).await
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        println!(
            "{} Config already exists at {} (use --force to overwrite)",
            "!".yellow().bold(),
            config_path.display()
        );
        return Ok(());
    }

    config::save_config(&AgentConfig::default(), config_path)?;
    info!("Wrote default config to {}", config_path.display());
    println!(
        "{} Wrote {}. Set api_key there or export ANTHROPIC_API_KEY.",
        ">>>".green().bold(),
        config_path.display()
    );
    Ok(())
}

fn cmd_tools() -> Result<()> {
    let registry = ToolRegistry::builtin();

    println!();
    println!("{}", "=== Tools ===".bold());
    println!();
    for tool in registry.list_tools() {
        println!("  {}  {}", tool.name.cyan().bold(), tool.description);
        for param in &tool.input_schema.properties {
            let marker = if tool.is_required(param.name) {
                "required".red().to_string()
            } else {
                "optional".dimmed().to_string()
            };
            println!("      {} ({}): {}", param.name, marker, param.description);
        }
    }
    println!();
    Ok(())
}

async fn cmd_todo(cfg: &AgentConfig, action: TodoCommand) -> Result<()> {
    let store = TodoStore::open(cfg.resolved_todo_path());

    match action {
        TodoCommand::List => {
            let items = store.list().await?;
            if items.is_empty() {
                println!("{}", "No to-do items.".dimmed());
            }
            for todo in items {
                println!("  {}  {}", todo.id.dimmed(), todo.item);
            }
        }
        TodoCommand::Add { item } => {
            let id = store.add(&item).await?;
            println!("{} Added {}", "+".green().bold(), id);
        }
        TodoCommand::Remove { id } => {
            store.remove(&id).await?;
            println!("{} Removed {}", "-".red().bold(), id);
        }
    }
    Ok(())
}
