//! Subscription state machine for one participant viewing one conversation.
//!
//! A session subscribes to the conversation topic, backfills anything it
//! missed, then pumps live events into its [`LocalView`]. When the topic
//! fails or closes it drops to `Error`/`Disconnected` and resubscribes after
//! a capped exponential delay. Every (re)subscribe is followed by a backfill
//! from the last position confirmed by the store, so nothing appended while
//! disconnected is lost and redelivered events are filtered out by id.
//!
//! While the session is marked active, messages from the other participant
//! advance the viewer's read cursor automatically.

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use hirechat_types::config::MessagingConfig;
use hirechat_types::conversation::ConversationId;
use hirechat_types::error::MessagingError;
use hirechat_types::event::{ConnectionState, MessageAppended};
use hirechat_types::identity::UserId;
use hirechat_types::message::{Message, MessageCursor};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::error::Elapsed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use super::bus::Subscription;
use super::view::LocalView;

/// Buffered updates between the session task and its consumer.
const UPDATE_BUFFER: usize = 64;

/// What a session needs from the messaging service, already bound to the
/// viewing participant.
pub trait SessionBackend: Send + Sync + 'static {
    fn subscribe(
        &self,
        conversation_id: ConversationId,
    ) -> impl Future<Output = Result<Subscription, MessagingError>> + Send;

    /// Messages strictly after `after` (or all of them), in conversation order.
    fn list_after(
        &self,
        conversation_id: ConversationId,
        after: Option<MessageCursor>,
    ) -> impl Future<Output = Result<Vec<Message>, MessagingError>> + Send;

    /// Advance the viewer's read cursor to the conversation's newest message.
    fn mark_read(
        &self,
        conversation_id: ConversationId,
    ) -> impl Future<Output = Result<(), MessagingError>> + Send;
}

/// Output of a running session, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A message not previously seen by this session.
    Message(Message),
    State(ConnectionState),
}

/// Consumer requests, as seen by the session task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    FocusChanged,
    MarkRead,
}

/// How the pump phase ended.
enum Exit {
    /// Close the session.
    Stop,
    /// Enter the given state and resubscribe after a delay.
    Retry(ConnectionState),
}

enum Wake {
    Cancelled,
    Elapsed,
    Command(Option<Command>),
    Event(Result<Result<MessageAppended, RecvError>, Elapsed>),
}

/// Control handle for a spawned [`ConversationSession`].
///
/// None of its methods wait on the session task, so a consumer can keep
/// issuing requests while the session is blocked on a full update buffer.
#[derive(Debug)]
pub struct SessionHandle {
    focus: watch::Sender<bool>,
    read_requests: mpsc::Sender<()>,
    state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Whether the conversation is currently open in the viewer's UI.
    /// Only the latest value is kept.
    pub fn set_active(&self, active: bool) {
        self.focus.send_replace(active);
    }

    /// Request a mark-read. Requests made while one is pending merge into it.
    pub fn mark_read(&self) {
        let _ = self.read_requests.try_send(());
    }

    /// Stop the session and wait for it to release its subscription.
    pub async fn close(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "conversation session task failed");
        }
    }
}

/// The session task state.
pub struct ConversationSession<B> {
    conversation_id: ConversationId,
    viewer: UserId,
    backend: B,
    backoff: Backoff,
    idle_timeout: Duration,
    view: LocalView,
    /// Newest position read back from the store. Live events never move it.
    confirmed: Option<MessageCursor>,
    active: bool,
    state: ConnectionState,
    state_tx: watch::Sender<ConnectionState>,
    updates: mpsc::Sender<SessionUpdate>,
    focus: watch::Receiver<bool>,
    read_requests: mpsc::Receiver<()>,
    cancel: CancellationToken,
}

impl<B: SessionBackend> ConversationSession<B> {
    /// Spawn a session for `viewer` on `conversation_id`.
    ///
    /// Returns the control handle and the stream of updates. The session
    /// stops when the handle is closed or dropped, or when the update
    /// receiver is dropped.
    pub fn spawn(
        conversation_id: ConversationId,
        viewer: UserId,
        backend: B,
        config: &MessagingConfig,
    ) -> (SessionHandle, mpsc::Receiver<SessionUpdate>) {
        let (focus_tx, focus_rx) = watch::channel(false);
        let (read_tx, read_rx) = mpsc::channel(1);
        let (updates_tx, updates_rx) = mpsc::channel(UPDATE_BUFFER);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();

        let session = Self {
            conversation_id,
            viewer,
            backend,
            backoff: Backoff::from(&config.reconnect),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs.max(1)),
            view: LocalView::new(),
            confirmed: None,
            active: false,
            state: ConnectionState::Disconnected,
            state_tx,
            updates: updates_tx,
            focus: focus_rx,
            read_requests: read_rx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(session.run());

        let handle = SessionHandle {
            focus: focus_tx,
            read_requests: read_tx,
            state: state_rx,
            cancel,
            task,
        };
        (handle, updates_rx)
    }

    async fn run(mut self) {
        info!(conversation_id = %self.conversation_id, viewer = %self.viewer, "conversation session started");
        loop {
            self.transition(ConnectionState::Subscribing).await;

            let subscribed = tokio::select! {
                _ = self.cancel.cancelled() => None,
                result = self.backend.subscribe(self.conversation_id) => Some(result),
            };

            let exit = match subscribed {
                None => Exit::Stop,
                Some(Ok(subscription)) => {
                    self.transition(ConnectionState::Subscribed).await;
                    self.backoff.reset();
                    let Err(exit) = self.pump(subscription).await;
                    exit
                }
                Some(Err(e)) => {
                    warn!(conversation_id = %self.conversation_id, error = %e, "subscribe failed");
                    Exit::Retry(ConnectionState::Error)
                }
            };

            match exit {
                Exit::Stop => break,
                Exit::Retry(state) => {
                    self.transition(state).await;
                    if self.wait_before_retry().await.is_err() {
                        break;
                    }
                }
            }
        }
        self.transition(ConnectionState::Disconnected).await;
        info!(conversation_id = %self.conversation_id, viewer = %self.viewer, "conversation session closed");
    }

    /// Backfill, then forward live events until something ends the
    /// subscription. The subscription is dropped on return.
    async fn pump(&mut self, mut subscription: Subscription) -> Result<Infallible, Exit> {
        self.backfill().await?;

        loop {
            let wake = tokio::select! {
                _ = self.cancel.cancelled() => Wake::Cancelled,
                focus = self.focus.changed() => Wake::Command(focus.ok().map(|()| Command::FocusChanged)),
                request = self.read_requests.recv() => Wake::Command(request.map(|()| Command::MarkRead)),
                event = tokio::time::timeout(self.idle_timeout, subscription.recv()) => Wake::Event(event),
            };

            match wake {
                Wake::Cancelled | Wake::Command(None) => return Err(Exit::Stop),
                Wake::Command(Some(command)) => self.handle_command(command).await,
                Wake::Elapsed => {}
                Wake::Event(Err(_)) => {
                    if self.updates.is_closed() {
                        return Err(Exit::Stop);
                    }
                }
                Wake::Event(Ok(Ok(event))) => {
                    if self.deliver(Message::from(event)).await? && self.active {
                        self.mark_read().await;
                    }
                }
                Wake::Event(Ok(Err(RecvError::Lagged(skipped)))) => {
                    warn!(conversation_id = %self.conversation_id, skipped, "session lagged, backfilling");
                    self.backfill().await?;
                }
                Wake::Event(Ok(Err(RecvError::Closed))) => {
                    warn!(conversation_id = %self.conversation_id, "conversation topic closed");
                    return Err(Exit::Retry(ConnectionState::Disconnected));
                }
            }
        }
    }

    /// Fetch everything stored after the last backfill.
    ///
    /// Events are published after commit and can arrive out of order, so the
    /// newest message held is not a safe resume point. Appends always land
    /// after every committed message, so the last store read is.
    async fn backfill(&mut self) -> Result<(), Exit> {
        let messages = match self.backend.list_after(self.conversation_id, self.confirmed).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(conversation_id = %self.conversation_id, error = %e, "backfill failed");
                return Err(Exit::Retry(ConnectionState::Error));
            }
        };
        if let Some(last) = messages.last() {
            self.confirmed = Some(last.cursor());
        }

        let mut from_peer = false;
        let fetched = messages.len();
        for message in messages {
            from_peer |= self.deliver(message).await?;
        }
        debug!(conversation_id = %self.conversation_id, fetched, "backfilled conversation");

        if from_peer && self.active {
            self.mark_read().await;
        }
        Ok(())
    }

    /// Hand a message to the consumer unless it was already delivered.
    ///
    /// Returns whether it was new and sent by the other participant.
    async fn deliver(&mut self, message: Message) -> Result<bool, Exit> {
        if !self.view.insert(message.clone()) {
            debug!(message_id = %message.id, "dropping redelivered message");
            return Ok(false);
        }
        let from_peer = message.sender_id != self.viewer;
        self.emit(SessionUpdate::Message(message)).await?;
        Ok(from_peer)
    }

    /// Send an update, giving up if the session is closed while the
    /// consumer's buffer is full.
    async fn emit(&self, update: SessionUpdate) -> Result<(), Exit> {
        let update = match self.updates.try_send(update) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Closed(_)) => return Err(Exit::Stop),
            Err(TrySendError::Full(update)) => update,
        };
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Exit::Stop),
            sent = self.updates.send(update) => sent.map_err(|_| Exit::Stop),
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::FocusChanged => {
                let active = *self.focus.borrow_and_update();
                let activated = active && !self.active;
                self.active = active;
                if activated {
                    self.mark_read().await;
                }
            }
            Command::MarkRead => self.mark_read().await,
        }
    }

    async fn mark_read(&self) {
        if let Err(e) = self.backend.mark_read(self.conversation_id).await {
            warn!(conversation_id = %self.conversation_id, error = %e, "auto mark-read failed");
        }
    }

    /// Sleep out the next backoff delay, still serving commands.
    ///
    /// `Err` means the session was closed while waiting.
    async fn wait_before_retry(&mut self) -> Result<(), Exit> {
        let delay = self.backoff.next_delay();
        debug!(
            conversation_id = %self.conversation_id,
            delay_ms = delay.as_millis() as u64,
            attempt = self.backoff.attempt(),
            "resubscribing after delay"
        );
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            let wake = tokio::select! {
                _ = self.cancel.cancelled() => Wake::Cancelled,
                _ = &mut sleep => Wake::Elapsed,
                focus = self.focus.changed() => Wake::Command(focus.ok().map(|()| Command::FocusChanged)),
                request = self.read_requests.recv() => Wake::Command(request.map(|()| Command::MarkRead)),
            };
            match wake {
                Wake::Elapsed => return Ok(()),
                Wake::Command(Some(command)) => self.handle_command(command).await,
                Wake::Cancelled | Wake::Command(None) | Wake::Event(_) => return Err(Exit::Stop),
            }
        }
    }

    async fn transition(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "unexpected session state transition");
        }
        debug!(conversation_id = %self.conversation_id, from = %self.state, to = %next, "session state");
        self.state = next;
        self.state_tx.send_replace(next);
        let _ = self.emit(SessionUpdate::State(next)).await;
    }
}
