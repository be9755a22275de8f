//! The display side of a chat session.
//!
//! The core never touches UI widgets. It calls a [`ChatView`], which the
//! front end implements. Calls come from the coordinator's task and the
//! host's task, never from the UI's own thread, so implementations must
//! marshal the work onto their UI context (or render in a way that is safe
//! from any thread) and ask for a redraw.
//!
//! Message lines use the colour markup `[green]…[-]` understood by
//! terminal UI toolkits; [`strip_markup`] removes it for plain output.

use lanchat_protocol::ChatMessage;
use lanchat_transport::PeerId;

use crate::{Page, SessionError};

/// Callbacks through which the session shows things to the user.
pub trait ChatView: Send + Sync + 'static {
    /// A message from another peer arrived.
    fn incoming_message(&self, msg: &ChatMessage);

    /// Our own message was published.
    fn outgoing_message(&self, text: &str, self_name: &str);

    /// Fresh snapshot of the room's peers, as shortened IDs.
    fn peers_updated(&self, peers: &[String]);

    /// A recoverable error. The UI stays usable.
    fn error(&self, err: &SessionError);

    /// Show `page` with the given border title.
    fn switch_page(&self, page: Page, title: &str);

    /// Clear the message pane. Called when leaving a room.
    fn clear_messages(&self) {}

    /// Something changed; redraw when convenient.
    fn request_redraw(&self) {}
}

/// Wraps `text` in colour markup.
pub fn colour(colour: &str, text: &str) -> String {
    format!("[{colour}]{text}[-]")
}

/// `<sender>: text` with a green prompt.
pub fn format_incoming(msg: &ChatMessage) -> String {
    let prompt = colour("green", &format!("<{}>:", msg.sender_name));
    format!("{prompt} {}", msg.text)
}

/// `<self>: text` with a yellow prompt.
pub fn format_outgoing(text: &str, self_name: &str) -> String {
    let prompt = colour("yellow", &format!("<{self_name}>:"));
    format!("{prompt} {text}")
}

/// The last ten characters of each peer ID.
pub fn short_ids(peers: &[PeerId]) -> Vec<String> {
    peers.iter().map(|p| p.short().to_string()).collect()
}

/// Removes `[colour]` and `[-]` tags produced by [`colour`].
///
/// Only tags made of ASCII letters or a single `-` are treated as markup;
/// anything else in brackets is kept verbatim.
pub fn strip_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(']') {
            Some(close) if is_tag(&after[..close]) => {
                rest = &after[close + 1..];
            }
            _ => {
                out.push('[');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_tag(name: &str) -> bool {
    name == "-" || (!name.is_empty() && name.bytes().all(|b| b.is_ascii_alphabetic()))
}
