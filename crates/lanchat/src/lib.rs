//! # lanchat
//!
//! Serverless chat rooms for peers on the same network.
//!
//! Peers find each other through discovery, connect automatically, and
//! chat in named rooms. Each room is a pub/sub topic; there is no server
//! and no history.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lanchat::prelude::*;
//!
//! # struct MyView;
//! # impl ChatView for MyView {
//! #     fn incoming_message(&self, _: &ChatMessage) {}
//! #     fn outgoing_message(&self, _: &str, _: &str) {}
//! #     fn peers_updated(&self, _: &[String]) {}
//! #     fn error(&self, _: &SessionError) {}
//! #     fn switch_page(&self, _: Page, _: &str) {}
//! # }
//! # async fn demo() -> Result<(), LanchatError> {
//! let node = ChatNode::builder().build()?;
//! let (requests, rx) = tokio::sync::mpsc::channel(32);
//! tokio::spawn(node.session(Arc::new(MyView)).run(rx));
//!
//! requests.send(UiRequest::Login { first: "Alice".into(), last: "Liddell".into() }).await.ok();
//! requests.send(UiRequest::JoinRoom("lobby".into())).await.ok();
//! requests.send(UiRequest::SubmitLine("hello".into())).await.ok();
//! # Ok(())
//! # }
//! ```

mod discovery;
mod error;
mod node;

pub use discovery::DiscoveryBridge;
pub use error::LanchatError;
pub use node::{
    ChatNode, ChatNodeBuilder, NodeConfig, DEFAULT_LISTEN_ADDR,
    DISCOVERY_INTERVAL, SERVICE_TAG,
};

pub use lanchat_protocol as protocol;
pub use lanchat_room as room;
pub use lanchat_session as session;
pub use lanchat_tick as tick;
pub use lanchat_transport as transport;

/// Everything a front end needs.
pub mod prelude {
    pub use crate::{ChatNode, DiscoveryBridge, LanchatError, NodeConfig};
    pub use lanchat_protocol::ChatMessage;
    pub use lanchat_room::RoomConfig;
    pub use lanchat_session::{
        format_incoming, format_outgoing, strip_markup, ChatView, HostConfig,
        Page, SessionError, SessionHost, UiRequest,
    };
    pub use lanchat_tick::TickConfig;
    pub use lanchat_transport::{MemoryNetwork, PeerId, PeerInfo};
}
