use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chat::{ChatError, ChatOrchestrator, SendOutcome};
use colored::Colorize;
use events::ChatEvent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use crate::{export, render};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    New,
    Sessions,
    Switch(String),
    Delete(String),
    Refresh,
    Answer(usize),
    Export(Option<String>),
    Help,
    Quit,
    Unknown(String),
    Send(String),
    Empty,
}

impl Command {
    /// Plain text is sent exactly as typed; trimming only decides what it is.
    fn parse(input: &str) -> Self {
        let line = input.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Send(input.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim().to_string())),
            None => (rest, None),
        };
        let arg = arg.filter(|a| !a.is_empty());

        match (name, arg) {
            ("new", _) => Self::New,
            ("sessions" | "ls", _) => Self::Sessions,
            ("switch" | "open", Some(target)) => Self::Switch(target),
            ("delete" | "rm", Some(target)) => Self::Delete(target),
            ("refresh", _) => Self::Refresh,
            ("answer", Some(n)) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Self::Answer(n - 1),
                _ => Self::Unknown(line.to_string()),
            },
            ("export", dir) => Self::Export(dir),
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit" | "q", _) => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Interactive loop over stdin.
pub async fn run(chat: Arc<ChatOrchestrator>, session: Option<String>) -> Result<()> {
    let notifier = tokio::spawn(watch_events(chat.subscribe()));

    println!("{}", "=== UI Builder ===".bright_magenta().bold());
    println!(
        "{}",
        "Describe a component to generate it. /help lists commands.".bright_black()
    );

    if chat.load_sessions().await.is_ok() {
        let state = chat.snapshot().await;
        render::print_sessions(state.sessions(), state.current_session_id());
    }
    if let Some(session_id) = session {
        open_session(&chat, &session_id).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Command::parse(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => render::print_help(),
            Command::New => match chat.create_session().await {
                Ok(session) => println!("{} {}", "Started".green(), session.id),
                Err(e) => report(&e),
            },
            Command::Sessions => {
                if chat.load_sessions().await.is_ok() {
                    let state = chat.snapshot().await;
                    render::print_sessions(state.sessions(), state.current_session_id());
                }
            }
            Command::Switch(target) => {
                let session_id = resolve_session(&chat, &target).await;
                open_session(&chat, &session_id).await;
            }
            Command::Delete(target) => {
                let session_id = resolve_session(&chat, &target).await;
                match chat.delete_session(&session_id).await {
                    Ok(()) => println!("{} {}", "Deleted".green(), session_id),
                    Err(e) => report(&e),
                }
            }
            Command::Refresh => match chat.refresh_messages().await {
                Ok(_) => print_history(&chat).await,
                Err(e) => report(&e),
            },
            Command::Answer(index) => {
                let outcome = chat.answer_question(index).await;
                print_send_outcome(outcome);
            }
            Command::Export(dir) => match chat.current_session_id().await {
                Some(session_id) => {
                    let dir = PathBuf::from(dir.unwrap_or_else(|| ".".to_string()));
                    if let Err(e) = export::export_session(&chat, &session_id, &dir).await {
                        render::print_error(&format!("{:#}", e));
                    }
                }
                None => render::print_error("No session is open."),
            },
            Command::Unknown(input) => {
                println!("{}", format!("Unknown command: {}", input).bright_black());
            }
            Command::Send(content) => {
                if chat.current_session_id().await.is_none() {
                    match chat.create_session().await {
                        Ok(session) => println!("{} {}", "Started".green(), session.id),
                        Err(e) => {
                            report(&e);
                            continue;
                        }
                    }
                }
                let outcome = chat.send_message(&content).await;
                print_send_outcome(outcome);
            }
        }
    }

    notifier.abort();
    println!("{}", "Goodbye!".bright_green());
    Ok(())
}

/// Accept either a session id or its 1-based position in the last listing.
async fn resolve_session(chat: &ChatOrchestrator, target: &str) -> String {
    if let Some(index) = target.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
        if let Some(session) = chat.sessions().await.get(index) {
            return session.id.clone();
        }
    }
    target.to_string()
}

async fn open_session(chat: &ChatOrchestrator, session_id: &str) {
    match chat.select_session(session_id).await {
        Ok(_) => print_history(chat).await,
        Err(e) => report(&e),
    }
}

async fn print_history(chat: &ChatOrchestrator) {
    let messages = chat.messages().await;
    for message in &messages {
        render::print_message(message);
    }
    if let Some(last) = messages.last() {
        render::print_questions(last.follow_up_questions());
    }
}

fn print_send_outcome(outcome: chat::Result<SendOutcome>) {
    match outcome {
        Ok(SendOutcome::Delivered(reply)) => {
            render::print_message(&reply);
            render::print_questions(reply.follow_up_questions());
        }
        Ok(SendOutcome::Discarded(_)) => {
            println!("{}", "Reply arrived for a session you left.".bright_black());
        }
        Ok(SendOutcome::Skipped) => {}
        Err(e) => report(&e),
    }
}

/// Network failures already reach the user through the error event.
fn report(err: &ChatError) {
    if !err.is_network() {
        render::print_error(&err.to_string());
    }
}

async fn watch_events(mut rx: tokio::sync::broadcast::Receiver<events::EventEnvelope>) {
    loop {
        match rx.recv().await {
            Ok(envelope) => match envelope.event {
                ChatEvent::ErrorChanged { error: Some(error) } => render::print_error(&error),
                ChatEvent::LoadingChanged { loading: true } => {
                    println!("{}", "...".bright_black());
                }
                _ => {}
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event watcher lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
