mod export;
mod render;
mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chat::{ChatConfig, ChatOrchestrator, SendOutcome};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uibuilder_client::ApiClient;

#[derive(Parser)]
#[command(name = "uibuilder")]
#[command(about = "Generate front-end components by chatting with the UI builder", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// API base URL, overrides the config file and UIBUILDER_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Config file (default: <config dir>/uibuilder/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init,
    /// List chat sessions
    Sessions,
    /// Start a new chat session
    New,
    /// Print the messages of a session
    Show { session_id: String },
    /// Delete a session
    Delete { session_id: String },
    /// Send one message to a session and print the reply
    Send {
        session_id: String,
        #[arg(required = true, num_args = 1..)]
        content: Vec<String>,
    },
    /// Write the generated code blocks of a session to disk
    Export {
        session_id: String,
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Interactive chat (default)
    Chat {
        /// Resume an existing session
        #[arg(long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config_path = cli.config.clone().or_else(ChatConfig::default_path);

    let mut config = match &config_path {
        Some(path) => ChatConfig::read(path).await,
        None => ChatConfig::default(),
    }
    .with_env_overrides();
    if let Some(url) = cli.api_url {
        config = config.with_base_url(url);
    }
    tracing::debug!(base_url = %config.api.base_url, "Using API");

    let client = ApiClient::from_config(&config.api).context("Invalid API configuration")?;
    let chat = Arc::new(ChatOrchestrator::new(Arc::new(client)).with_config(&config));

    match cli.command.unwrap_or(Commands::Chat { session: None }) {
        Commands::Init => init_config(config_path).await,
        Commands::Sessions => list_sessions(&chat).await,
        Commands::New => new_session(&chat).await,
        Commands::Show { session_id } => show_session(&chat, &session_id).await,
        Commands::Delete { session_id } => delete_session(&chat, &session_id).await,
        Commands::Send {
            session_id,
            content,
        } => send(&chat, &session_id, &content.join(" ")).await,
        Commands::Export { session_id, dir } => {
            export::export_session(&chat, &session_id, &dir).await
        }
        Commands::Chat { session } => repl::run(chat, session).await,
    }
}

async fn init_config(path: Option<PathBuf>) -> Result<()> {
    let path = path.context("No config directory on this platform, pass --config")?;

    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    ChatConfig::default()
        .write(&path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

async fn list_sessions(chat: &ChatOrchestrator) -> Result<()> {
    chat.load_sessions().await?;
    let state = chat.snapshot().await;
    render::print_sessions(state.sessions(), state.current_session_id());
    Ok(())
}

async fn new_session(chat: &ChatOrchestrator) -> Result<()> {
    let session = chat.create_session().await?;
    println!("{}", session.id);
    Ok(())
}

async fn show_session(chat: &ChatOrchestrator, session_id: &str) -> Result<()> {
    chat.select_session(session_id).await?;
    for message in chat.messages().await {
        render::print_message(&message);
    }
    Ok(())
}

async fn delete_session(chat: &ChatOrchestrator, session_id: &str) -> Result<()> {
    chat.delete_session(session_id).await?;
    println!("Deleted {}", session_id);
    Ok(())
}

async fn send(chat: &ChatOrchestrator, session_id: &str, content: &str) -> Result<()> {
    chat.select_session(session_id).await?;

    match chat.send_message(content).await? {
        SendOutcome::Delivered(reply) | SendOutcome::Discarded(reply) => {
            render::print_message(&reply);
            render::print_questions(reply.follow_up_questions());
        }
        SendOutcome::Skipped => println!("Nothing to send."),
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uibuilder=info,chat=info,uibuilder_client=warn".into()),
        )
        .init();
}
