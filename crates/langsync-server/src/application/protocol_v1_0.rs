//! Protocol 1.0: the base of every chain.

use langsync_core::protocol::messages::{ClientInfo, Enter, Leave, WireMessage};
use langsync_core::{FieldReader, MessageCode, ProtocolVersion};
use tracing::{debug, trace};

use super::chain::{ChainError, EnterScreen, ProtocolHandler, SessionContext};

/// Handles no-ops, info acknowledgements, and screen-info updates, and writes
/// the plain enter/leave messages.
#[derive(Debug, Default)]
pub struct ProtocolV1_0;

impl ProtocolV1_0 {
    pub fn new() -> Self {
        Self
    }
}

impl ProtocolHandler for ProtocolV1_0 {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V1_0
    }

    fn fallback(&mut self) -> Option<&mut dyn ProtocolHandler> {
        None
    }

    fn parse_message(
        &mut self,
        code: MessageCode,
        body: &mut FieldReader<'_>,
        ctx: &mut SessionContext,
    ) -> Result<bool, ChainError> {
        match code {
            MessageCode::NOOP => {
                trace!(client = %ctx.name, "no-op");
            }
            MessageCode::INFO_ACK => {
                debug!(client = %ctx.name, "client acknowledged screen info");
            }
            MessageCode::CLIENT_INFO => {
                let info = ClientInfo::read_fields(body).map_err(ChainError::decode(code))?;
                debug!(
                    client = %ctx.name,
                    width = info.width,
                    height = info.height,
                    cursor_x = info.cursor_x,
                    cursor_y = info.cursor_y,
                    "client screen info"
                );
                ctx.screen = Some(info);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn enter(&mut self, enter: &EnterScreen, ctx: &mut SessionContext) {
        if enter.for_screensaver {
            debug!(client = %ctx.name, "entering client for screensaver");
        }
        ctx.outbox.push(&Enter {
            x: enter.x,
            y: enter.y,
            sequence: enter.sequence,
            mask: enter.mask,
        });
    }

    fn leave(&mut self, ctx: &mut SessionContext) {
        ctx.outbox.push(&Leave);
    }

    fn client_connected(&mut self, ctx: &mut SessionContext) {
        trace!(client = %ctx.name, "client connected");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
