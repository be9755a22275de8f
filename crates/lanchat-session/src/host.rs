//! Session host: turns UI requests into page changes and room lifecycle.
//!
//! The host is the only owner of the active room. It enforces at most one
//! room at a time (joining while in a room leaves the old one first) and
//! guards leave, so leaving twice or without a room is harmless. The
//! coordinator only ever sees rooms the host attached to it.

use std::ops::ControlFlow;
use std::sync::Arc;

use lanchat_room::{ChatRoom, RoomConfig};
use lanchat_tick::TickConfig;
use lanchat_transport::{PeerId, PubSub};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::coordinator::{self, CoordinatorHandle, CoordinatorState, ShutdownSignal};
use crate::forms::{Form, LoginForm, RoomForm};
use crate::{chat_title, validate_name, ChatView, NameField, Page, Profile, SessionError};

/// The line that quits instead of being published.
pub const QUIT_COMMAND: &str = "/quit";

/// A request from the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiRequest {
    /// Save the login form.
    Login { first: String, last: String },
    /// Join a room, leaving the current one first.
    JoinRoom(String),
    /// Leave the current room (escape key or BACK).
    Leave,
    /// A line typed on the chat page.
    SubmitLine(String),
    /// Exit.
    Quit,
}

/// Settings for a [`SessionHost`].
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    pub room: RoomConfig,
    /// Peer-list refresh cadence on the chat page.
    pub refresh: TickConfig,
}

/// Owns the page state and the active room of one local user.
pub struct SessionHost<P: PubSub, V: ChatView> {
    pubsub: Arc<P>,
    self_id: PeerId,
    room_config: RoomConfig,
    view: Arc<V>,
    coordinator: CoordinatorHandle<P>,
    page: Page,
    profile: Option<Profile>,
    login_form: LoginForm,
    room_form: RoomForm,
    room: Option<ChatRoom<P>>,
}

impl<P: PubSub, V: ChatView> SessionHost<P, V> {
    /// Creates a host on the login page and spawns its coordinator.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(pubsub: Arc<P>, self_id: PeerId, view: Arc<V>, config: HostConfig) -> Self {
        let coordinator = coordinator::spawn(Arc::clone(&view), config.refresh);
        Self {
            pubsub,
            self_id,
            room_config: config.room,
            view,
            coordinator,
            page: Page::Login,
            profile: None,
            login_form: LoginForm::default(),
            room_form: RoomForm::default(),
            room: None,
        }
    }

    /// Serves requests until `Quit`, a `/quit` line, the request channel
    /// closing, or the shutdown signal firing. Then leaves any active room
    /// and stops the coordinator.
    ///
    /// Request failures go to [`ChatView::error`] and do not end the loop.
    pub async fn run(mut self, mut requests: mpsc::Receiver<UiRequest>) {
        self.view.switch_page(self.page, self.page.title());
        let shutdown = self.shutdown_signal();

        loop {
            let request = tokio::select! {
                request = requests.recv() => request,
                () = shutdown.triggered() => None,
            };
            let Some(request) = request else { break };

            match self.handle(request).await {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => break,
                Err(e) => {
                    warn!(error = %e, "request failed");
                    self.view.error(&e);
                    self.view.request_redraw();
                }
            }
        }

        self.shutdown().await;
    }

    /// Applies one request. `Break` means the user asked to quit.
    pub async fn handle(&mut self, request: UiRequest) -> Result<ControlFlow<()>, SessionError> {
        match request {
            UiRequest::Login { first, last } => self.login(first, last)?,
            UiRequest::JoinRoom(name) => self.join_room(&name).await?,
            UiRequest::Leave => self.leave_room().await?,
            UiRequest::SubmitLine(line) => {
                if line == QUIT_COMMAND {
                    return Ok(ControlFlow::Break(()));
                }
                self.submit_line(line).await?;
            }
            UiRequest::Quit => return Ok(ControlFlow::Break(())),
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Validates and saves the login form, then moves to room selection.
    pub fn login(&mut self, first: impl Into<String>, last: impl Into<String>) -> Result<(), SessionError> {
        if self.page != Page::Login {
            return Err(SessionError::WrongPage {
                request: "log in",
                page: self.page,
            });
        }

        self.login_form.first_name.set(first);
        self.login_form.last_name.set(last);
        let profile = Profile::new(
            self.login_form.first_name.value(),
            self.login_form.last_name.value(),
        )?;

        info!(name = %profile.display_name(), "logged in");
        self.profile = Some(profile);
        self.show(Page::RoomSelection, Page::RoomSelection.title());
        Ok(())
    }

    /// Joins `room_name`, leaving the current room first if there is one.
    ///
    /// An empty name joins whatever the room form holds (`gen` by
    /// default). An invalid name is rejected before the current room is
    /// touched.
    pub async fn join_room(&mut self, room_name: &str) -> Result<(), SessionError> {
        let Some(self_name) = self.profile.as_ref().map(|p| p.display_name().to_string()) else {
            return Err(SessionError::NotLoggedIn);
        };

        if !room_name.is_empty() {
            self.room_form.room_name.set(room_name);
        }
        let room_name = self.room_form.room_name.value().to_string();
        validate_name(NameField::RoomName, &room_name)?;

        if self.room.is_some() {
            self.leave_room().await?;
        }

        let mut room = ChatRoom::join(
            Arc::clone(&self.pubsub),
            self.self_id.clone(),
            self_name,
            &room_name,
            &self.room_config,
        )?;
        let Some(messages) = room.take_messages() else {
            return Err(SessionError::RoomClosed(room_name));
        };

        if let Err(e) = self.coordinator.attach(room.handle(), messages).await {
            if let Err(leave_err) = room.leave().await {
                debug!(error = %leave_err, "leave after failed attach");
            }
            return Err(e);
        }

        self.room = Some(room);
        self.show(Page::Chat, &chat_title(&room_name));
        Ok(())
    }

    /// Leaves the active room and returns to room selection.
    ///
    /// A no-op without an active room, so leaving twice is harmless.
    pub async fn leave_room(&mut self) -> Result<(), SessionError> {
        let Some(room) = self.room.take() else {
            debug!("leave requested with no active room");
            return Ok(());
        };

        // Detach first so the coordinator never sees the stream end.
        let detached = self.coordinator.detach().await;
        let left = room.leave().await;

        self.room_form.reset();
        self.view.clear_messages();
        self.show(Page::RoomSelection, Page::RoomSelection.title());

        detached?;
        left?;
        Ok(())
    }

    /// Hands a typed line to the coordinator for publishing.
    ///
    /// Empty lines are ignored. Lines are only forwarded while the chat
    /// page is showing; elsewhere they are dropped.
    pub async fn submit_line(&mut self, line: String) -> Result<(), SessionError> {
        if line.is_empty() {
            return Ok(());
        }
        if self.page != Page::Chat || self.room.is_none() {
            debug!(page = %self.page, "dropping line submitted off the chat page");
            return Ok(());
        }
        self.coordinator.submit(line).await
    }

    /// Leaves any active room and stops the coordinator. Idempotent.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.leave_room().await {
            warn!(error = %e, "leave during shutdown failed");
        }
        self.coordinator.shutdown().await;
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Name of the active room, if any.
    pub fn room_name(&self) -> Option<&str> {
        self.room.as_ref().map(|r| r.room_name())
    }

    pub fn room_form(&self) -> &RoomForm {
        &self.room_form
    }

    pub fn coordinator_state(&self) -> CoordinatorState {
        self.coordinator.state()
    }

    /// Trigger that makes [`run`](Self::run) wind down.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.coordinator.shutdown_signal()
    }

    fn show(&mut self, page: Page, title: &str) {
        self.page = page;
        self.view.switch_page(page, title);
        self.view.request_redraw();
    }
}
