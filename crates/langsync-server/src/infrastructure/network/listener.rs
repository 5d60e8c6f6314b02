//! TCP accept loop and the server handle.
//!
//! Each accepted connection gets its own task:
//!
//! 1. Handshake (bounded by the configured timeout).
//! 2. Build the [`ClientSession`] for the negotiated version.
//! 3. Register the session under its screen name in the [`ServerHandle`].
//! 4. Fire "client connected" for the session.
//! 5. Run the session until it ends, then deregister it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use langsync_core::protocol::SequenceCounter;
use langsync_core::ProtocolVersion;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::handshake::perform_handshake;
use super::session::{ClientSession, SessionCommand, SessionDeps};
use super::SessionError;
use crate::application::chain::EnterScreen;
use crate::application::lifecycle::{EventKind, SessionId};
use crate::application::platform::{KeyboardHandle, Notify};
use crate::infrastructure::events::EventQueue;
use crate::infrastructure::storage::config::{AppConfig, ConfigError};

const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerSettings {
    /// Version offered in the server hello.
    pub version: ProtocolVersion,
    pub handshake_timeout: Duration,
    pub keep_alive: Duration,
}

impl ServerSettings {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a non-positive keep-alive interval.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            version: config.protocol_version(),
            handshake_timeout: config.handshake_timeout(),
            keep_alive: config.keep_alive()?,
        })
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            version: ProtocolVersion::CURRENT,
            handshake_timeout: Duration::from_secs(30),
            keep_alive: Duration::from_secs(3),
        }
    }
}

// ── Server handle ─────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandleError {
    #[error("no client named {0:?} is connected")]
    UnknownClient(String),

    #[error("session for {0:?} has ended")]
    SessionClosed(String),
}

/// A connected client as seen by the rest of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedClient {
    pub id: SessionId,
    pub name: String,
    pub version: ProtocolVersion,
}

struct SessionEntry {
    client: ConnectedClient,
    commands: mpsc::Sender<SessionCommand>,
}

/// Addresses connected clients by screen name.
///
/// Cheap to clone; all clones share the registry and the enter-sequence counter.
#[derive(Clone, Default)]
pub struct ServerHandle {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    sequence: Arc<SequenceCounter>,
}

impl ServerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the cursor onto `name`'s screen.  Returns the sequence number sent.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError`] if the client is unknown or its session ended.
    pub async fn enter(
        &self,
        name: &str,
        x: i16,
        y: i16,
        mask: u16,
        for_screensaver: bool,
    ) -> Result<u32, HandleError> {
        let commands = self.commands_for(name).await?;
        let sequence = self.sequence.next();
        let enter = EnterScreen {
            x,
            y,
            sequence,
            mask,
            for_screensaver,
        };
        send(name, &commands, SessionCommand::Enter(enter)).await?;
        Ok(sequence)
    }

    /// # Errors
    ///
    /// Returns [`HandleError`] if the client is unknown or its session ended.
    pub async fn leave(&self, name: &str) -> Result<(), HandleError> {
        let commands = self.commands_for(name).await?;
        send(name, &commands, SessionCommand::Leave).await
    }

    /// # Errors
    ///
    /// Returns [`HandleError`] if the client is unknown or its session ended.
    pub async fn close(&self, name: &str) -> Result<(), HandleError> {
        let commands = self.commands_for(name).await?;
        send(name, &commands, SessionCommand::Close).await
    }

    /// Connected clients sorted by name.
    pub async fn clients(&self) -> Vec<ConnectedClient> {
        let mut clients: Vec<ConnectedClient> = self
            .sessions
            .lock()
            .await
            .values()
            .map(|entry| entry.client.clone())
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        clients
    }

    pub async fn is_connected(&self, name: &str) -> bool {
        self.sessions.lock().await.contains_key(name)
    }

    /// Adds a session.  Returns `false` if the name is taken.
    async fn register(
        &self,
        client: ConnectedClient,
        commands: mpsc::Sender<SessionCommand>,
    ) -> bool {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&client.name) {
            return false;
        }
        sessions.insert(client.name.clone(), SessionEntry { client, commands });
        true
    }

    /// Removes `name` if it still belongs to session `id`.
    async fn unregister(&self, name: &str, id: SessionId) {
        let mut sessions = self.sessions.lock().await;
        if sessions.get(name).is_some_and(|entry| entry.client.id == id) {
            sessions.remove(name);
        }
    }

    async fn commands_for(&self, name: &str) -> Result<mpsc::Sender<SessionCommand>, HandleError> {
        self.sessions
            .lock()
            .await
            .get(name)
            .map(|entry| entry.commands.clone())
            .ok_or_else(|| HandleError::UnknownClient(name.to_string()))
    }
}

async fn send(
    name: &str,
    commands: &mpsc::Sender<SessionCommand>,
    command: SessionCommand,
) -> Result<(), HandleError> {
    commands
        .send(command)
        .await
        .map_err(|_| HandleError::SessionClosed(name.to_string()))
}

// ── Server ────────────────────────────────────────────────────────────────────

pub struct Server {
    settings: ServerSettings,
    events: Arc<EventQueue>,
    keyboard: KeyboardHandle,
    notifier: Arc<dyn Notify>,
    handle: ServerHandle,
}

impl Server {
    pub fn new(
        settings: ServerSettings,
        keyboard: KeyboardHandle,
        notifier: Arc<dyn Notify>,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            events: Arc::new(EventQueue::new()),
            keyboard,
            notifier,
            handle: ServerHandle::new(),
        })
    }

    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    pub fn events(&self) -> &Arc<EventQueue> {
        &self.events
    }

    /// Accepts connections until `running` is cleared.
    pub async fn serve(self: Arc<Self>, listener: TcpListener, running: Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            // Bounded so the loop can notice the shutdown flag.
            match timeout(ACCEPT_POLL, listener.accept()).await {
                Ok(Ok((stream, peer))) => {
                    info!(%peer, "accepted connection");
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(%peer, error = %e, "could not disable Nagle's algorithm");
                    }
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        let peer = peer.to_string();
                        match server.handle_connection(stream, peer.clone()).await {
                            Ok(()) => info!(%peer, "client disconnected"),
                            Err(e) => error!(%peer, error = %e, "client session failed"),
                        }
                    });
                }
                Ok(Err(e)) => error!(error = %e, "accept error"),
                Err(_) => {}
            }
        }
    }

    /// Serves one connection from handshake to teardown.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] that ended the connection.
    pub async fn handle_connection<S>(
        self: Arc<Self>,
        mut stream: S,
        peer: String,
    ) -> Result<(), SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let negotiated = timeout(
            self.settings.handshake_timeout,
            perform_handshake(&mut stream, self.settings.version),
        )
        .await
        .map_err(|_| SessionError::HandshakeTimeout(self.settings.handshake_timeout))??;

        let id = SessionId::new_v4();
        let deps = SessionDeps {
            events: self.events.clone(),
            keyboard: self.keyboard.clone(),
            notifier: Arc::clone(&self.notifier),
        };
        let (session, commands) =
            ClientSession::new(id, &negotiated, deps, self.settings.keep_alive);

        let client = ConnectedClient {
            id,
            name: negotiated.name.clone(),
            version: negotiated.version,
        };
        if !self.handle.register(client, commands).await {
            warn!(%peer, name = %negotiated.name, "a client with this name is already connected");
            return Err(SessionError::Handshake(format!(
                "duplicate screen name {:?}",
                negotiated.name
            )));
        }

        info!(
            %peer,
            name = %negotiated.name,
            version = %negotiated.version,
            session = %id,
            "client connected"
        );
        self.events.fire(EventKind::ClientConnected, id);

        let result = session.run(stream).await;
        self.handle.unregister(&negotiated.name, id).await;
        result
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
