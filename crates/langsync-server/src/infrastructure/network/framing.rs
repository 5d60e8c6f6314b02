//! Length-prefixed frame I/O.
//!
//! ```text
//! ┌────────────────┬─────────────────────────────────────┐
//! │ length (u32 BE)│ body: 4-byte code + fields           │
//! └────────────────┴─────────────────────────────────────┘
//! ```

use langsync_core::protocol::codec::FRAME_PREFIX_LEN;
use langsync_core::protocol::read_frame_length;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::SessionError;

/// Reads one frame body.
///
/// Returns `Ok(None)` when the peer closed the stream cleanly between frames.
///
/// # Errors
///
/// [`SessionError::Io`] on socket errors or EOF inside a frame (including
/// inside the length prefix), and
/// [`SessionError::Protocol`] when the announced length exceeds the limit.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, SessionError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; FRAME_PREFIX_LEN];
    // Only EOF before the first prefix byte is a clean close.
    if reader.read(&mut prefix[..1]).await? == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut prefix[1..]).await?;

    let length = read_frame_length(prefix)?;
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Writes pre-built frames in order and flushes once.
///
/// # Errors
///
/// Returns [`SessionError::Io`] if the stream rejects a write.
pub async fn write_frames<W>(writer: &mut W, frames: &[Vec<u8>]) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
{
    if frames.is_empty() {
        return Ok(());
    }
    for frame in frames {
        writer.write_all(frame).await?;
    }
    writer.flush().await?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
