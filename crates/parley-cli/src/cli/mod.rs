//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use parley_core::{config, interrupt};

mod commands;

#[derive(Parser)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Terminal LLM chat client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override the provider from config (anthropic, google, openai)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Override the model from config
    #[arg(long, short, global = true)]
    model: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Start an interactive chat session (the default)
    Chat,

    /// Manage saved conversations
    Conversations {
        #[command(subcommand)]
        command: ConversationCommands,
    },

    /// List the known provider/model catalog
    Models,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConversationCommands {
    /// Lists saved conversations, newest first
    List,
    /// Replays a saved conversation
    Show {
        /// The ID of the conversation to show
        #[arg(value_name = "CONVERSATION_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Write a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    interrupt::init();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;

    let overrides = commands::chat::Overrides {
        provider: cli.provider.as_deref(),
        model: cli.model.as_deref(),
    };

    match cli.command {
        None | Some(Commands::Chat) => commands::chat::run(&config, &overrides).await,
        Some(Commands::Conversations { command }) => match command {
            ConversationCommands::List => commands::conversations::list(),
            ConversationCommands::Show { id } => commands::conversations::show(&id),
        },
        Some(Commands::Models) => commands::models::list(),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
