//! One connected client.
//!
//! A [`ClientSession`] owns the protocol chain for the negotiated version and
//! runs as a single task.  The socket is split: a reader task turns bytes into
//! frames and forwards them over a channel, so the main loop can wait on
//! received frames, lifecycle events, server commands, and the keep-alive
//! timer at once without cancelling a half-read frame.
//!
//! After every step the frames queued by the chain are written in order.  A
//! fatal dispatch error queues `EBAD`, which is written before the connection
//! closes.

use std::sync::Arc;
use std::time::Duration;

use langsync_core::protocol::messages::{Close, KeepAlive, ProtocolBad};
use langsync_core::ProtocolVersion;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::framing::{read_frame, write_frames};
use super::handshake::Negotiated;
use super::SessionError;
use crate::application::chain::{ChainDeps, EnterScreen, ProtocolChain, SessionContext};
use crate::application::lifecycle::{LifecycleEvents, SessionId};
use crate::application::platform::{KeyboardHandle, Notify};

/// Keep-alive intervals without any inbound frame before the client is dropped.
pub const KEEP_ALIVE_MISSES: u32 = 3;

const FRAME_BUFFER: usize = 32;
const COMMAND_BUFFER: usize = 32;

/// Lifecycle notifications delivered to the session task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    ClientConnected,
}

/// Requests from the rest of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Enter(EnterScreen),
    Leave,
    /// Sends `CBYE` and ends the session.
    Close,
}

/// Process-wide services a session's chain is built with.
#[derive(Clone)]
pub struct SessionDeps {
    pub events: Arc<dyn LifecycleEvents>,
    pub keyboard: KeyboardHandle,
    pub notifier: Arc<dyn Notify>,
}

enum Flow {
    Continue,
    Stop,
}

pub struct ClientSession {
    id: SessionId,
    chain: ProtocolChain,
    ctx: SessionContext,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    commands: mpsc::Receiver<SessionCommand>,
    keep_alive: Duration,
    last_received: Instant,
}

impl ClientSession {
    /// Builds the chain for `negotiated.version`.
    ///
    /// Returns the session and the sender used to command it.  For 1.7
    /// clients this registers the session's "client connected" trigger; it is
    /// removed when the session is dropped, whether or not it ever ran.
    pub fn new(
        id: SessionId,
        negotiated: &Negotiated,
        deps: SessionDeps,
        keep_alive: Duration,
    ) -> (Self, mpsc::Sender<SessionCommand>) {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);

        let chain_deps = ChainDeps {
            session_id: id,
            events: deps.events,
            on_connected: Arc::new(move || {
                if event_tx.send(SessionEvent::ClientConnected).is_err() {
                    trace!(session = %id, "session already finished");
                }
            }),
            keyboard: deps.keyboard,
            notifier: deps.notifier,
        };
        let chain = ProtocolChain::build(negotiated.version, &chain_deps);

        let session = Self {
            id,
            chain,
            ctx: SessionContext::new(negotiated.name.clone()),
            events,
            commands,
            keep_alive,
            last_received: Instant::now(),
        };
        (session, command_tx)
    }

    /// Serves the client until it disconnects, is closed, or fails.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] that ended the session.  A client that
    /// closes the connection between frames, or a `Close` command, is `Ok`.
    pub async fn run<S>(mut self, stream: S) -> Result<(), SessionError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let (frame_tx, mut frames) = mpsc::channel(FRAME_BUFFER);
        let reader_task = tokio::spawn(async move {
            loop {
                let frame = read_frame(&mut reader).await;
                let done = !matches!(frame, Ok(Some(_)));
                let frame = frame.transpose();
                if let Some(frame) = frame {
                    if frame_tx.send(frame).await.is_err() {
                        break;
                    }
                }
                if done {
                    break;
                }
            }
        });

        let keep_alive_enabled = self.chain.version() >= ProtocolVersion::V1_3;
        let mut ticker = interval_at(Instant::now() + self.keep_alive, self.keep_alive);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.last_received = Instant::now();

        let outcome = loop {
            // Lifecycle events first: the LSYN catalogue must precede any
            // enter queued before the connected trigger fired.
            let step = tokio::select! {
                biased;
                Some(event) = self.events.recv() => {
                    self.on_event(event);
                    Ok(Flow::Continue)
                }
                frame = frames.recv() => self.on_frame(frame),
                Some(command) = self.commands.recv() => Ok(self.on_command(command)),
                _ = ticker.tick(), if keep_alive_enabled => self.on_keep_alive_tick(),
            };

            let queued = self.ctx.outbox.drain();
            if let Err(e) = write_frames(&mut writer, &queued).await {
                break Err(e);
            }
            match step {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        reader_task.abort();
        if let Err(e) = writer.shutdown().await {
            trace!(session = %self.id, error = %e, "shutdown after session end");
        }
        outcome
    }

    fn on_frame(
        &mut self,
        frame: Option<Result<Vec<u8>, SessionError>>,
    ) -> Result<Flow, SessionError> {
        let body = match frame {
            Some(Ok(body)) => body,
            Some(Err(e)) => return Err(e),
            None => {
                info!(client = %self.ctx.name, "client closed the connection");
                return Ok(Flow::Stop);
            }
        };

        self.last_received = Instant::now();
        match self.chain.dispatch(&body, &mut self.ctx) {
            Ok(code) => {
                trace!(client = %self.ctx.name, %code, "handled message");
                Ok(Flow::Continue)
            }
            Err(e) => {
                self.ctx.outbox.push(&ProtocolBad);
                Err(e.into())
            }
        }
    }

    fn on_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ClientConnected => {
                debug!(client = %self.ctx.name, "client connected event");
                self.chain.client_connected(&mut self.ctx);
            }
        }
    }

    fn on_command(&mut self, command: SessionCommand) -> Flow {
        match command {
            SessionCommand::Enter(enter) => {
                self.chain.enter(&enter, &mut self.ctx);
                Flow::Continue
            }
            SessionCommand::Leave => {
                self.chain.leave(&mut self.ctx);
                Flow::Continue
            }
            SessionCommand::Close => {
                info!(client = %self.ctx.name, "closing client");
                self.ctx.outbox.push(&Close);
                Flow::Stop
            }
        }
    }

    fn on_keep_alive_tick(&mut self) -> Result<Flow, SessionError> {
        let silent_for = self.last_received.elapsed();
        let limit = self.keep_alive * KEEP_ALIVE_MISSES;
        if silent_for >= limit {
            warn!(client = %self.ctx.name, ?silent_for, "client stopped responding");
            return Err(SessionError::KeepAliveTimeout(silent_for));
        }
        self.ctx.outbox.push(&KeepAlive);
        Ok(Flow::Continue)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::lifecycle::EventKind;
    use crate::infrastructure::events::EventQueue;
    use crate::infrastructure::keyboard::mock::RecordingKeyboard;
    use langsync_core::{LayoutCode, MessageCode};

    struct SilentNotify;

    impl Notify for SilentNotify {
        fn notify(&self, _title: &str, _body: &str) {}
    }

    fn negotiated(version: ProtocolVersion) -> Negotiated {
        Negotiated {
            version,
            client_version: version,
            name: "laptop".into(),
        }
    }

    #[tokio::test]
    async fn test_connected_event_is_served_before_an_already_queued_enter() {
        // Arrange: the enter command is queued before the trigger fires
        let events = Arc::new(EventQueue::new());
        let keyboard = RecordingKeyboard::new([LayoutCode::new('e', 'n')], None).unwrap();
        let deps = SessionDeps {
            events: events.clone(),
            keyboard: KeyboardHandle::new(keyboard),
            notifier: Arc::new(SilentNotify),
        };
        let id = SessionId::new_v4();
        let (session, commands) = ClientSession::new(
            id,
            &negotiated(ProtocolVersion::V1_7),
            deps,
            Duration::from_secs(60),
        );
        commands
            .send(SessionCommand::Enter(EnterScreen {
                x: 1,
                y: 2,
                sequence: 1,
                mask: 0,
                for_screensaver: false,
            }))
            .await
            .unwrap();
        assert!(events.fire(EventKind::ClientConnected, id));
        let (mut client, server_io) = tokio::io::duplex(4096);

        // Act
        let task = tokio::spawn(session.run(server_io));

        // Assert
        let mut codes = Vec::new();
        for _ in 0..3 {
            let body = read_frame(&mut client).await.unwrap().unwrap();
            codes.push(MessageCode::from_prefix(&body).unwrap());
        }
        assert_eq!(
            codes,
            vec![
                MessageCode::LANGUAGE_LIST,
                MessageCode::LANGUAGE_SET,
                MessageCode::ENTER
            ]
        );

        drop(client);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_close_command_sends_close_and_ends_session() {
        let keyboard = RecordingKeyboard::new([LayoutCode::new('e', 'n')], None).unwrap();
        let deps = SessionDeps {
            events: Arc::new(EventQueue::new()),
            keyboard: KeyboardHandle::new(keyboard),
            notifier: Arc::new(SilentNotify),
        };
        let (session, commands) = ClientSession::new(
            SessionId::new_v4(),
            &negotiated(ProtocolVersion::V1_0),
            deps,
            Duration::from_secs(60),
        );
        let (mut client, server_io) = tokio::io::duplex(4096);
        let task = tokio::spawn(session.run(server_io));

        commands.send(SessionCommand::Close).await.unwrap();

        let body = read_frame(&mut client).await.unwrap().unwrap();
        assert_eq!(body, b"CBYE");
        assert!(task.await.unwrap().is_ok());
    }
}
