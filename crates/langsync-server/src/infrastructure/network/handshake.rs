//! Hello exchange and version negotiation.
//!
//! ```text
//! server ── "Synergy" 1.7 ─────────────▶ client
//! server ◀──────── "Synergy" 1.x "name" ─ client
//!          major != 1 → EICV 1.7, close
//! ```

use langsync_core::protocol::messages::{Hello, IncompatibleVersion, WireMessage};
use langsync_core::ProtocolVersion;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use super::framing::read_frame;
use super::SessionError;

/// Outcome of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    /// The revision both sides will speak.
    pub version: ProtocolVersion,
    /// What the client announced.
    pub client_version: ProtocolVersion,
    pub name: String,
}

/// Runs the server side of the handshake on `stream`.
///
/// # Errors
///
/// - [`SessionError::IncompatibleVersion`] after writing `EICV` when the
///   client's major version differs.
/// - [`SessionError::Handshake`] when the client closes early, sends a
///   malformed hello, or omits its screen name.
/// - [`SessionError::Io`] on socket errors.
pub async fn perform_handshake<S>(
    stream: &mut S,
    server_version: ProtocolVersion,
) -> Result<Negotiated, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(&Hello::server(server_version).to_frame())
        .await?;
    stream.flush().await?;

    let body = read_frame(stream)
        .await?
        .ok_or_else(|| SessionError::Handshake("client closed before sending hello".into()))?;
    let hello = Hello::parse(&body)
        .map_err(|e| SessionError::Handshake(format!("malformed hello: {e}")))?;

    let Some(version) = server_version.negotiate(hello.version) else {
        warn!(client_version = %hello.version, "rejecting client with incompatible protocol");
        stream
            .write_all(
                &IncompatibleVersion {
                    version: server_version,
                }
                .to_frame(),
            )
            .await?;
        stream.flush().await?;
        return Err(SessionError::IncompatibleVersion(hello.version));
    };

    let name = hello
        .name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| SessionError::Handshake("client hello has no screen name".into()))?;

    debug!(%name, client_version = %hello.version, %version, "handshake complete");
    Ok(Negotiated {
        version,
        client_version: hello.version,
        name,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn server_hello() -> Vec<u8> {
        Hello::server(ProtocolVersion::V1_7).to_frame()
    }

    #[tokio::test]
    async fn test_older_client_negotiates_its_own_minor() {
        // Arrange
        let client = Hello::client(ProtocolVersion::new(1, 6), "laptop").to_frame();
        let mut stream = tokio_test::io::Builder::new()
            .write(&server_hello())
            .read(&client)
            .build();

        // Act
        let negotiated = perform_handshake(&mut stream, ProtocolVersion::V1_7)
            .await
            .unwrap();

        // Assert
        assert_eq!(negotiated.version, ProtocolVersion::new(1, 6));
        assert_eq!(negotiated.client_version, ProtocolVersion::new(1, 6));
        assert_eq!(negotiated.name, "laptop");
    }

    #[tokio::test]
    async fn test_newer_client_is_capped_at_server_version() {
        let client = Hello::client(ProtocolVersion::new(1, 8), "tablet").to_frame();
        let mut stream = tokio_test::io::Builder::new()
            .write(&server_hello())
            .read(&client)
            .build();

        let negotiated = perform_handshake(&mut stream, ProtocolVersion::V1_7)
            .await
            .unwrap();

        assert_eq!(negotiated.version, ProtocolVersion::V1_7);
    }

    #[tokio::test]
    async fn test_different_major_gets_incompatible_version_reply() {
        // Arrange: the mock fails the test if EICV is not written exactly
        let client = Hello::client(ProtocolVersion::new(2, 0), "future").to_frame();
        let eicv = IncompatibleVersion {
            version: ProtocolVersion::V1_7,
        }
        .to_frame();
        let mut stream = tokio_test::io::Builder::new()
            .write(&server_hello())
            .read(&client)
            .write(&eicv)
            .build();

        // Act
        let err = perform_handshake(&mut stream, ProtocolVersion::V1_7)
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(
            err,
            SessionError::IncompatibleVersion(v) if v == ProtocolVersion::new(2, 0)
        ));
    }

    #[tokio::test]
    async fn test_hello_without_name_is_rejected() {
        let client = Hello::server(ProtocolVersion::V1_7).to_frame();
        let mut stream = tokio_test::io::Builder::new()
            .write(&server_hello())
            .read(&client)
            .build();

        let err = perform_handshake(&mut stream, ProtocolVersion::V1_7)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Handshake(_)));
    }

    #[tokio::test]
    async fn test_wrong_tag_is_rejected() {
        let mut garbage = vec![0, 0, 0, 11];
        garbage.extend_from_slice(b"HTTP/1.1 GE");
        let mut stream = tokio_test::io::Builder::new()
            .write(&server_hello())
            .read(&garbage)
            .build();

        let err = perform_handshake(&mut stream, ProtocolVersion::V1_7)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("malformed hello"));
    }

    #[tokio::test]
    async fn test_client_closing_early_is_a_handshake_error() {
        let mut stream = tokio_test::io::Builder::new()
            .write(&server_hello())
            .build();

        let err = perform_handshake(&mut stream, ProtocolVersion::V1_7)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Handshake(_)));
    }
}
