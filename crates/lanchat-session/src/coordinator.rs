//! Event coordinator: the one task that turns chat events into view calls.
//!
//! While a room is attached the coordinator waits on four sources at once
//! and services whichever is ready:
//!
//! - a line the user submitted → publish, then show it as outgoing
//! - a message from the room's receive loop → show it as incoming
//! - a peer-refresh tick → list peers, update the peer pane
//! - shutdown → stop
//!
//! Order between sources is not defined; each source is FIFO on its own.
//!
//! With no room attached, the coordinator blocks on its control channel
//! and the shutdown signal only. Nothing polls, and the peer-refresh
//! ticker is paused.
//!
//! ```text
//!   Idle ──attach──→ Running ──detach──→ Idle ── … ──shutdown──→ Stopped
//! ```

use std::sync::Arc;

use lanchat_protocol::ChatMessage;
use lanchat_room::{MessageReceiver, RoomHandle};
use lanchat_tick::{TickConfig, Ticker};
use lanchat_transport::PubSub;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::{short_ids, ChatView, SessionError};

/// Capacity of the submitted-line queue.
pub const INPUT_BUFFER: usize = 32;

/// Where the coordinator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// No room attached; blocked until one is or shutdown arrives.
    Idle,
    /// Servicing a room.
    Running,
    /// Terminal.
    Stopped,
}

/// One-shot, cloneable shutdown trigger.
///
/// Triggering more than once is a no-op. Dropping every clone also stops
/// the coordinator.
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// Requests shutdown. Returns `true` only for the call that actually
    /// flipped the signal.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        })
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once shutdown has been triggered.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this only returns on a trigger.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

enum Control<P: PubSub> {
    Attach {
        room: RoomHandle<P>,
        messages: MessageReceiver,
        ack: oneshot::Sender<()>,
    },
    Detach {
        ack: oneshot::Sender<()>,
    },
}

/// Handle to a running coordinator.
pub struct CoordinatorHandle<P: PubSub> {
    inputs: mpsc::Sender<String>,
    control: mpsc::Sender<Control<P>>,
    shutdown: ShutdownSignal,
    state: watch::Receiver<CoordinatorState>,
    task: Option<JoinHandle<()>>,
}

impl<P: PubSub> CoordinatorHandle<P> {
    /// Makes `room` the active room and starts servicing it.
    ///
    /// The room and its message stream arrive in a single control message,
    /// so the coordinator never sees one without the other. Returns once
    /// the coordinator has switched over.
    pub async fn attach(
        &self,
        room: RoomHandle<P>,
        messages: MessageReceiver,
    ) -> Result<(), SessionError> {
        let (ack, done) = oneshot::channel();
        self.control
            .send(Control::Attach {
                room,
                messages,
                ack,
            })
            .await
            .map_err(|_| SessionError::CoordinatorStopped)?;
        done.await.map_err(|_| SessionError::CoordinatorStopped)
    }

    /// Drops the active room and goes idle. Lines still queued for it are
    /// discarded. Returns once the coordinator is idle.
    pub async fn detach(&self) -> Result<(), SessionError> {
        let (ack, done) = oneshot::channel();
        self.control
            .send(Control::Detach { ack })
            .await
            .map_err(|_| SessionError::CoordinatorStopped)?;
        done.await.map_err(|_| SessionError::CoordinatorStopped)
    }

    /// Queues a line for publishing in the active room.
    pub async fn submit(&self, line: String) -> Result<(), SessionError> {
        self.inputs
            .send(line)
            .await
            .map_err(|_| SessionError::CoordinatorStopped)
    }

    /// A clone of the shutdown trigger.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// The current lifecycle state.
    pub fn state(&self) -> CoordinatorState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<CoordinatorState> {
        self.state.clone()
    }

    /// Triggers shutdown and waits for the task to finish. Safe to call
    /// more than once.
    pub async fn shutdown(&mut self) {
        self.shutdown.trigger();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "coordinator task failed");
            }
        }
    }
}

/// Spawns a coordinator that reports to `view`.
///
/// `refresh` sets the peer-refresh cadence. Must be called from within a
/// Tokio runtime.
pub fn spawn<P: PubSub, V: ChatView>(
    view: Arc<V>,
    refresh: TickConfig,
) -> CoordinatorHandle<P> {
    let (inputs_tx, inputs_rx) = mpsc::channel(INPUT_BUFFER);
    let (control_tx, control_rx) = mpsc::channel(1);
    let (shutdown, shutdown_rx) = ShutdownSignal::new();
    let (state_tx, state_rx) = watch::channel(CoordinatorState::Idle);

    let mut ticker = Ticker::new(refresh);
    ticker.pause();

    let task = tokio::spawn(run(
        view,
        ticker,
        inputs_rx,
        control_rx,
        shutdown_rx,
        state_tx,
    ));

    CoordinatorHandle {
        inputs: inputs_tx,
        control: control_tx,
        shutdown,
        state: state_rx,
        task: Some(task),
    }
}

struct ActiveRoom<P: PubSub> {
    room: RoomHandle<P>,
    /// `None` once the stream has ended.
    messages: Option<MessageReceiver>,
}

enum Event<P: PubSub> {
    Shutdown,
    Control(Control<P>),
    Input(String),
    Message(Option<ChatMessage>),
    Tick,
}

async fn run<P: PubSub, V: ChatView>(
    view: Arc<V>,
    mut ticker: Ticker,
    mut inputs: mpsc::Receiver<String>,
    mut control: mpsc::Receiver<Control<P>>,
    mut shutdown: watch::Receiver<bool>,
    state: watch::Sender<CoordinatorState>,
) {
    let mut active: Option<ActiveRoom<P>> = None;
    info!("coordinator started");

    loop {
        let event = match active.as_mut() {
            None => tokio::select! {
                () = shutdown_requested(&mut shutdown) => Event::Shutdown,
                ctl = control.recv() => ctl.map_or(Event::Shutdown, Event::Control),
            },
            Some(act) => tokio::select! {
                () = shutdown_requested(&mut shutdown) => Event::Shutdown,
                ctl = control.recv() => ctl.map_or(Event::Shutdown, Event::Control),
                Some(line) = inputs.recv() => Event::Input(line),
                msg = next_message(&mut act.messages) => Event::Message(msg),
                _ = ticker.wait_for_tick() => Event::Tick,
            },
        };

        match event {
            Event::Shutdown => break,

            Event::Control(Control::Attach {
                room,
                messages,
                ack,
            }) => {
                if let Some(old) = active.take() {
                    debug!(room = %old.room.room_name(), "replacing attached room");
                    discard_inputs(&mut inputs);
                }
                info!(room = %room.room_name(), "coordinator attached");
                active = Some(ActiveRoom {
                    room,
                    messages: Some(messages),
                });
                ticker.resume();
                state.send_replace(CoordinatorState::Running);
                let _ = ack.send(());
            }

            Event::Control(Control::Detach { ack }) => {
                if let Some(old) = active.take() {
                    info!(room = %old.room.room_name(), "coordinator detached");
                    discard_inputs(&mut inputs);
                    ticker.pause();
                    state.send_replace(CoordinatorState::Idle);
                }
                let _ = ack.send(());
            }

            Event::Input(line) => {
                let Some(act) = active.as_ref() else { continue };
                if act.messages.is_none() {
                    let room = act.room.room_name().to_string();
                    debug!(room = %room, "room stream ended, not publishing");
                    view.error(&SessionError::RoomClosed(room));
                    continue;
                }
                match act.room.publish(&line).await {
                    Ok(()) => view.outgoing_message(&line, act.room.self_name()),
                    Err(e) => {
                        warn!(room = %act.room.room_name(), error = %e, "publish failed");
                        view.error(&SessionError::Room(e));
                    }
                }
                view.request_redraw();
            }

            Event::Message(Some(msg)) => {
                view.incoming_message(&msg);
                view.request_redraw();
            }

            Event::Message(None) => {
                let Some(act) = active.as_mut() else { continue };
                act.messages = None;
                // Nothing left to refresh for until the room is replaced.
                ticker.pause();
                let room = act.room.room_name().to_string();
                warn!(room = %room, "room message stream ended");
                view.error(&SessionError::RoomClosed(room));
            }

            Event::Tick => {
                let Some(act) = active.as_ref() else { continue };
                let peers = short_ids(&act.room.list_peers());
                trace!(room = %act.room.room_name(), peers = peers.len(), "refreshed peers");
                view.peers_updated(&peers);
                view.request_redraw();
            }
        }
    }

    state.send_replace(CoordinatorState::Stopped);
    info!("coordinator stopped");
}

/// Resolves when shutdown is triggered or every trigger is gone.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopped| *stopped).await;
}

/// Next message from the stream, or pending forever once it has ended.
async fn next_message(messages: &mut Option<MessageReceiver>) -> Option<ChatMessage> {
    match messages {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn discard_inputs(inputs: &mut mpsc::Receiver<String>) {
    let mut dropped = 0usize;
    while inputs.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        debug!(dropped, "discarded lines queued for the previous room");
    }
}
