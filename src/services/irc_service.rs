use crate::models::chat::{ChatEvent, ChatLog, ChatMessage, ChatState};
use crate::models::settings::ChatSettings;
use crate::models::streamer::normalize_channel;
use crate::services::irc_parser::{classify, pong_line, split_lines, LineKind};
use anyhow::{bail, Context, Result};
use futures_util::{Sink, SinkExt, StreamExt};
use log::{debug, error, info, trace};
use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message};

const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// A chat event tagged with the session that produced it.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub session_id: u64,
    pub event: ChatEvent,
}

#[derive(Clone)]
struct SessionEmitter {
    session_id: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionEmitter {
    fn emit(&self, event: ChatEvent) {
        // The receiving view may already be gone
        let _ = self.tx.send(SessionEvent {
            session_id: self.session_id,
            event,
        });
    }

    fn state(&self, state: ChatState) {
        self.emit(ChatEvent::State(state));
    }
}

struct ChatSession {
    id: u64,
    channel: String,
    state: ChatState,
    log: ChatLog,
    close: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

/// Read-only chat for one channel at a time.
///
/// Connection tasks report through [`SessionEvent`]s which the owner feeds back
/// into [`ChatRelay::accept`]. Events from a session that has since been closed
/// or replaced are dropped there, so a slow socket can never write into a
/// newer view.
pub struct ChatRelay {
    config: ChatSettings,
    events: mpsc::UnboundedSender<SessionEvent>,
    session: Option<ChatSession>,
    next_session_id: u64,
}

impl ChatRelay {
    pub fn new(config: ChatSettings) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                config,
                events,
                session: None,
                next_session_id: 0,
            },
            rx,
        )
    }

    /// Opens a view on `channel`, closing whichever view was open before.
    pub async fn open(&mut self, channel: &str) -> Result<u64> {
        let channel = normalize_channel(channel);
        if channel.is_empty() {
            bail!("Channel name is empty");
        }

        self.close().await;

        self.next_session_id += 1;
        let id = self.next_session_id;
        let (close_tx, close_rx) = oneshot::channel();
        let emitter = SessionEmitter {
            session_id: id,
            tx: self.events.clone(),
        };

        info!("[IRC Chat] Opening chat for #{} (session {})", channel, id);
        let task = tokio::spawn(run_session(
            self.config.clone(),
            channel.clone(),
            emitter,
            close_rx,
        ));

        self.session = Some(ChatSession {
            id,
            channel,
            state: ChatState::Connecting,
            log: ChatLog::default(),
            close: Some(close_tx),
            task,
        });
        Ok(id)
    }

    /// Terminates the open view's connection; no-op when nothing is open.
    pub async fn close(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        if let Some(close) = session.close.take() {
            let _ = close.send(());
        }
        if timeout(CLOSE_GRACE, &mut session.task).await.is_err() {
            debug!("[IRC Chat] Session {} did not close in time, aborting", session.id);
            session.task.abort();
        }
        info!("[IRC Chat] Closed chat for #{}", session.channel);
    }

    /// Applies an event to the current view, returning it only if it belongs there.
    pub fn accept(&mut self, event: SessionEvent) -> Option<ChatEvent> {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|session| session.id == event.session_id)
        else {
            trace!("[IRC Chat] Dropping event from stale session {}", event.session_id);
            return None;
        };

        match &event.event {
            ChatEvent::State(state) => session.state = state.clone(),
            ChatEvent::Message(message) => {
                session.log.push(message.clone());
            }
        }
        Some(event.event)
    }

    pub fn state(&self) -> ChatState {
        self.session
            .as_ref()
            .map_or(ChatState::Disconnected, |session| session.state.clone())
    }

    pub fn log(&self) -> Option<&ChatLog> {
        self.session.as_ref().map(|session| &session.log)
    }

    pub fn channel(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.channel.as_str())
    }
}

async fn run_session(
    config: ChatSettings,
    channel: String,
    emitter: SessionEmitter,
    close_rx: oneshot::Receiver<()>,
) {
    match drive_socket(&config, &channel, &emitter, close_rx).await {
        Ok(()) => {
            info!("[IRC Chat] Left #{}", channel);
            emitter.state(ChatState::Disconnected);
        }
        Err(e) => {
            error!("[IRC Chat] Connection error on #{}: {:#}", channel, e);
            emitter.state(ChatState::Errored(format!("{:#}", e)));
        }
    }
}

async fn drive_socket(
    config: &ChatSettings,
    channel: &str,
    emitter: &SessionEmitter,
    mut close_rx: oneshot::Receiver<()>,
) -> Result<()> {
    debug!("[IRC Chat] Connecting to {}", config.server_url);

    // A dropped sender counts as a close request as well
    let ws_stream = tokio::select! {
        connected = connect_async(config.server_url.as_str()) => {
            connected.context("WebSocket connection failed")?.0
        }
        _ = &mut close_rx => return Ok(()),
    };
    let (mut write, mut read) = ws_stream.split();

    for line in handshake_lines(config, channel) {
        write.send(irc_frame(&line)).await?;
    }
    emitter.state(ChatState::Negotiating);

    let mut joined = false;
    loop {
        tokio::select! {
            _ = &mut close_rx => {
                let _ = write.send(Message::Close(None)).await;
                return Ok(());
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    handle_payload(text.as_str(), &mut write, emitter, &mut joined).await?;
                }
                Some(Ok(Message::Close(_))) | None => bail!("Chat connection closed by server"),
                Some(Err(e)) => return Err(e).context("Chat connection error"),
                Some(Ok(_)) => {}
            }
        }
    }
}

/// Anonymous read-only login: capabilities, a `justinfan` nick and the join.
fn handshake_lines(config: &ChatSettings, channel: &str) -> Vec<String> {
    let nick = config
        .nickname
        .clone()
        .unwrap_or_else(|| format!("justinfan{}", rand::rng().random_range(10000..99999)));

    vec![
        format!("CAP REQ :{}", config.capabilities),
        format!("NICK {}", nick),
        format!("JOIN #{}", channel),
    ]
}

fn irc_frame(line: &str) -> Message {
    Message::Text(format!("{}\r\n", line).into())
}

/// Handles every line of one inbound frame. Keep-alives are answered before
/// the next line is looked at.
async fn handle_payload<S>(
    payload: &str,
    sink: &mut S,
    emitter: &SessionEmitter,
    joined: &mut bool,
) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    for line in split_lines(payload) {
        match classify(line) {
            LineKind::KeepAlive { payload } => {
                sink.send(irc_frame(&pong_line(&payload))).await?;
                debug!("[IRC Chat] Answered PING");
            }
            LineKind::Chat { username, text } => {
                if !*joined {
                    *joined = true;
                    emitter.state(ChatState::Joined);
                }
                emitter.emit(ChatEvent::Message(ChatMessage::new(username, text)));
            }
            LineKind::Ignored => trace!("[IRC Chat] Ignoring: {}", line),
        }
    }
    Ok(())
}
