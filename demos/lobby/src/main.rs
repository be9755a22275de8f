//! Line-oriented chat client with an in-process echo bot to talk to.
//!
//! Log in with `<first> <last>`, then name a room (empty for `gen`).
//! In a room: type to chat, `/leave` to go back, `/join <room>` to
//! switch, `/quit` to exit. Logs go to stderr; set `RUST_LOG` to tune.

use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::thread;

use lanchat::prelude::*;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Terminal view
// ---------------------------------------------------------------------------

struct TerminalView {
    page: Mutex<Page>,
    peers: Mutex<Vec<String>>,
}

impl TerminalView {
    fn new() -> Self {
        Self {
            page: Mutex::new(Page::Login),
            peers: Mutex::new(Vec::new()),
        }
    }

    fn page(&self) -> Page {
        *self.page.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn print(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", ansi(line));
    }
}

impl ChatView for TerminalView {
    fn incoming_message(&self, msg: &ChatMessage) {
        self.print(&format_incoming(msg));
    }

    fn outgoing_message(&self, text: &str, self_name: &str) {
        self.print(&format_outgoing(text, self_name));
    }

    fn peers_updated(&self, peers: &[String]) {
        // No side pane here, so only print when the list changes.
        let mut last = self.peers.lock().unwrap_or_else(|e| e.into_inner());
        if last.as_slice() != peers {
            *last = peers.to_vec();
            drop(last);
            self.print(&format!("[orange]peers:[-] {}", peers.join(", ")));
        }
    }

    fn error(&self, err: &SessionError) {
        self.print(&format!("[red]error:[-] {err}"));
    }

    fn switch_page(&self, page: Page, title: &str) {
        *self.page.lock().unwrap_or_else(|e| e.into_inner()) = page;
        self.print(&format!("[orange]== {title} ==[-]"));
        match page {
            Page::Login => self.print("enter: <first name> <last name>"),
            Page::RoomSelection => self.print("enter a room name (empty for gen)"),
            Page::Chat => self.print("type to chat, /leave, /join <room>, /quit"),
        }
    }

    fn clear_messages(&self) {
        self.print("");
    }
}

/// Maps colour markup to ANSI escapes.
fn ansi(line: &str) -> String {
    [
        ("[green]", "\x1b[32m"),
        ("[yellow]", "\x1b[33m"),
        ("[red]", "\x1b[31m"),
        ("[orange]", "\x1b[38;5;208m"),
        ("[-]", "\x1b[0m"),
    ]
    .iter()
    .fold(line.to_string(), |acc, &(tag, esc)| acc.replace(tag, esc))
}

// ---------------------------------------------------------------------------
// Echo bot
// ---------------------------------------------------------------------------

/// Repeats everything it hears back into the room.
struct EchoBot {
    requests: mpsc::Sender<UiRequest>,
}

impl ChatView for EchoBot {
    fn incoming_message(&self, msg: &ChatMessage) {
        let reply = format!("{} said \"{}\"", msg.sender_name, msg.text);
        if self.requests.try_send(UiRequest::SubmitLine(reply)).is_err() {
            tracing::debug!("echo bot is busy, dropping reply");
        }
    }

    fn outgoing_message(&self, _text: &str, _self_name: &str) {}

    fn peers_updated(&self, _peers: &[String]) {}

    fn error(&self, err: &SessionError) {
        tracing::warn!(error = %err, "echo bot error");
    }

    fn switch_page(&self, _page: Page, _title: &str) {}
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

fn parse_line(page: Page, line: &str) -> Option<UiRequest> {
    let line = line.trim_end_matches(['\r', '\n']);

    if line == "/quit" {
        return Some(UiRequest::Quit);
    }
    if line == "/join" {
        return Some(UiRequest::JoinRoom(String::new()));
    }
    if let Some(room) = line.strip_prefix("/join ") {
        return Some(UiRequest::JoinRoom(room.trim().to_string()));
    }

    match page {
        Page::Login => {
            let mut names = line.split_whitespace();
            let first = names.next().unwrap_or_default().to_string();
            let last = names.next().unwrap_or_default().to_string();
            Some(UiRequest::Login { first, last })
        }
        Page::RoomSelection => Some(UiRequest::JoinRoom(line.trim().to_string())),
        Page::Chat if line == "/leave" => Some(UiRequest::Leave),
        Page::Chat if line.is_empty() => None,
        Page::Chat => Some(UiRequest::SubmitLine(line.to_string())),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let network = MemoryNetwork::new();

    let (node, bot_node) = match (
        ChatNode::builder().network(network.clone()).build(),
        ChatNode::builder().network(network.clone()).build(),
    ) {
        (Ok(node), Ok(bot_node)) => (node, bot_node),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("failed to start: {e}");
            return ExitCode::FAILURE;
        }
    };

    // The bot sits in the default room.
    let (bot_tx, bot_rx) = mpsc::channel(32);
    let bot = bot_node.session(Arc::new(EchoBot {
        requests: bot_tx.clone(),
    }));
    let bot_task = tokio::spawn(bot.run(bot_rx));
    let _ = bot_tx
        .send(UiRequest::Login {
            first: "EchoBot".into(),
            last: "Machine".into(),
        })
        .await;
    let _ = bot_tx.send(UiRequest::JoinRoom(String::new())).await;

    let view = Arc::new(TerminalView::new());
    let session = node.session(Arc::clone(&view));
    let shutdown = session.shutdown_signal();
    let (tx, rx) = mpsc::channel(32);
    let session_task = tokio::spawn(session.run(rx));

    // Interactive stdin blocks, so it gets a plain thread. The thread is
    // never joined: a pending read must not hold up exit.
    thread::spawn({
        let view = Arc::clone(&view);
        move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let Some(request) = parse_line(view.page(), &line) else {
                    continue;
                };
                let quit = request == UiRequest::Quit;
                if tx.blocking_send(request).is_err() || quit {
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            shutdown.trigger();
        }
        _ = shutdown.triggered() => {}
    }

    if let Err(e) = session_task.await {
        tracing::warn!(error = %e, "session task failed");
    }

    let _ = bot_tx.send(UiRequest::Quit).await;
    if let Err(e) = bot_task.await {
        tracing::warn!(error = %e, "echo bot task failed");
    }

    node.shutdown().await;
    bot_node.shutdown().await;
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_line() {
        assert_eq!(
            parse_line(Page::Login, "Alice Liddell"),
            Some(UiRequest::Login {
                first: "Alice".into(),
                last: "Liddell".into()
            })
        );
    }

    #[test]
    fn test_parse_chat_commands() {
        assert_eq!(parse_line(Page::Chat, "/leave"), Some(UiRequest::Leave));
        assert_eq!(parse_line(Page::Chat, "/quit"), Some(UiRequest::Quit));
        assert_eq!(
            parse_line(Page::Chat, "/join games"),
            Some(UiRequest::JoinRoom("games".into()))
        );
        assert_eq!(
            parse_line(Page::Chat, "/join"),
            Some(UiRequest::JoinRoom(String::new()))
        );
        assert_eq!(parse_line(Page::Chat, ""), None);
        assert_eq!(
            parse_line(Page::Chat, "hi there"),
            Some(UiRequest::SubmitLine("hi there".into()))
        );
    }

    #[test]
    fn test_join_needs_a_separator() {
        assert_eq!(
            parse_line(Page::Chat, "/joiner"),
            Some(UiRequest::SubmitLine("/joiner".into()))
        );
        assert_eq!(
            parse_line(Page::RoomSelection, "/joinx"),
            Some(UiRequest::JoinRoom("/joinx".into()))
        );
    }

    #[test]
    fn test_parse_room_selection_defaults_to_empty() {
        assert_eq!(
            parse_line(Page::RoomSelection, "  "),
            Some(UiRequest::JoinRoom(String::new()))
        );
    }

    #[test]
    fn test_ansi_maps_markup() {
        assert_eq!(ansi("[green]<a>:[-] x"), "\x1b[32m<a>:\x1b[0m x");
    }
}
