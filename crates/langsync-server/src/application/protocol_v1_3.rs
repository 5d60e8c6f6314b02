//! Protocol 1.3: keep-alive.
//!
//! The session sends `CALV` on a timer once this revision is negotiated; here
//! we only account for the client's replies.

use langsync_core::{FieldReader, MessageCode, ProtocolVersion};
use tracing::trace;

use super::chain::{ChainError, ProtocolHandler, SessionContext};

pub struct ProtocolV1_3 {
    fallback: Box<dyn ProtocolHandler>,
}

impl ProtocolV1_3 {
    pub fn new(fallback: Box<dyn ProtocolHandler>) -> Self {
        Self { fallback }
    }
}

impl ProtocolHandler for ProtocolV1_3 {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V1_3
    }

    fn fallback(&mut self) -> Option<&mut dyn ProtocolHandler> {
        Some(self.fallback.as_mut())
    }

    fn parse_message(
        &mut self,
        code: MessageCode,
        body: &mut FieldReader<'_>,
        ctx: &mut SessionContext,
    ) -> Result<bool, ChainError> {
        if code == MessageCode::KEEP_ALIVE {
            ctx.keep_alives += 1;
            trace!(client = %ctx.name, count = ctx.keep_alives, "keep-alive");
            return Ok(true);
        }
        self.fallback.parse_message(code, body, ctx)
    }
}
