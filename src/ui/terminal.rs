use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::services::chat::{ChatSession, UiEvent};
use crate::services::markdown::{self, Style};
use crate::services::persistence::WriteOutcome;
use crate::services::sync::SyncReport;

const USER_PREFIX: &str = "Me";
const BOT_PREFIX: &str = "Personal AI";
const DEFAULT_HISTORY: usize = 10;

const HELP: &str = "\
Commands:
  /sync          sync cached chats now
  /pending       number of chats waiting to sync
  /history [n]   last n stored chats (default 10)
  /help          this text
  /quit          exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Sync,
    Pending,
    History(usize),
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        if !line.starts_with('/') {
            return Command::Send(line.to_string());
        }

        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();
        match (name, arg) {
            ("/sync", None) => Command::Sync,
            ("/pending", None) => Command::Pending,
            ("/history", None) => Command::History(DEFAULT_HISTORY),
            ("/history", Some(n)) => match n.parse() {
                Ok(n) if n > 0 => Command::History(n),
                _ => Command::Unknown(line.to_string()),
            },
            ("/help", None) => Command::Help,
            ("/quit" | "/exit", None) => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Text for one UI event, or `None` when nothing should be printed.
pub fn render_event(event: UiEvent, style: Style) -> Option<String> {
    match event {
        UiEvent::Typing(true) => Some(dim(&format!("{} is typing...", BOT_PREFIX), style)),
        UiEvent::Typing(false) => None,
        UiEvent::BotReply(reply) => Some(format!(
            "{}\n{}\n",
            bold(&format!("{}:", BOT_PREFIX), style),
            markdown::render(&reply, style)
        )),
        UiEvent::Persisted(WriteOutcome::Synced) => None,
        UiEvent::Persisted(WriteOutcome::Cached { reason }) => Some(dim(
            &format!("(saved locally, will sync later: {})", reason),
            style,
        )),
        UiEvent::Persisted(WriteOutcome::Dropped(e)) => Some(warning(
            &format!("Warning: this exchange was not saved anywhere: {}", e),
            style,
        )),
        UiEvent::SyncFinished(Ok(SyncReport::Drained(0))) => {
            Some("Nothing to sync.".to_string())
        }
        UiEvent::SyncFinished(Ok(SyncReport::Drained(n))) => {
            Some(format!("Synced {} cached chat(s).", n))
        }
        UiEvent::SyncFinished(Ok(SyncReport::Deferred)) => {
            Some("No conversation store configured; chats stay cached.".to_string())
        }
        UiEvent::SyncFinished(Err(e)) => Some(warning(&format!("Sync failed: {}", e), style)),
        UiEvent::Pending(Ok(n)) => Some(format!("{} chat(s) waiting to sync.", n)),
        UiEvent::Pending(Err(e)) => Some(warning(&e.to_string(), style)),
        UiEvent::History(Ok(records)) if records.is_empty() => {
            Some("No stored chats yet.".to_string())
        }
        UiEvent::History(Ok(records)) => {
            let mut out = String::new();
            // Oldest first, like a transcript.
            for record in records.iter().rev() {
                out.push_str(&dim(
                    &record.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    style,
                ));
                out.push('\n');
                out.push_str(&format!("{}: {}\n", bold(USER_PREFIX, style), record.user_message));
                out.push_str(&format!(
                    "{}:\n{}\n\n",
                    bold(BOT_PREFIX, style),
                    markdown::render(&record.bot_response, style)
                ));
            }
            Some(out.trim_end().to_string())
        }
        UiEvent::History(Err(e)) => {
            Some(warning(&format!("Could not load history: {}", e), style))
        }
    }
}

/// Reads user lines and drains worker events until `/quit` or end of input.
/// This loop is the only place that writes to the terminal.
pub async fn run(
    session: ChatSession,
    mut events: UnboundedReceiver<UiEvent>,
    style: Style,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    writeln!(stdout, "Type a message, or /help for commands.")?;
    prompt(&mut stdout, style)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                match Command::parse(&line) {
                    Command::Send(text) => {
                        session.send(&text);
                    }
                    Command::Sync => {
                        session.request_sync();
                    }
                    Command::Pending => {
                        session.request_pending();
                    }
                    Command::History(n) => {
                        session.request_history(n);
                    }
                    Command::Help => writeln!(stdout, "{}", HELP)?,
                    Command::Quit => break,
                    Command::Unknown(cmd) => writeln!(stdout, "Unknown command: {}", cmd)?,
                    Command::Empty => {}
                }
                prompt(&mut stdout, style)?;
            }
            Some(event) = events.recv() => {
                if let Some(text) = render_event(event, style) {
                    // Start on a fresh line; the prompt may be showing.
                    writeln!(stdout, "\r{}", text)?;
                    prompt(&mut stdout, style)?;
                }
            }
        }
    }

    tracing::info!("Chat session ended");
    Ok(())
}

fn prompt(stdout: &mut std::io::Stdout, style: Style) -> Result<()> {
    write!(stdout, "{}: ", bold(USER_PREFIX, style))?;
    stdout.flush()?;
    Ok(())
}

fn bold(text: &str, style: Style) -> String {
    paint("\x1b[1m", text, style)
}

fn dim(text: &str, style: Style) -> String {
    paint("\x1b[2;3m", text, style)
}

fn warning(text: &str, style: Style) -> String {
    paint("\x1b[1;31m", text, style)
}

fn paint(code: &str, text: &str, style: Style) -> String {
    match style {
        Style::Ansi => format!("{}{}\x1b[0m", code, text),
        Style::Plain => text.to_string(),
    }
}
