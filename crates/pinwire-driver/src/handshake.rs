//! Handshake negotiation.
//!
//! Run once per session before any other request. The host sends an empty
//! handshake request; the peer answers with its protocol version. A major
//! version mismatch ends initialization, since payload layouts may differ.

use pinwire_protocol::{Kind, ProtocolVersion, Request, Response};
use tracing::{info, warn};

use crate::engine::Engine;
use crate::error::{DriverError, DriverResult};
use crate::transport::Transport;

/// Attempts allowed for the handshake. Larger than for ordinary requests
/// because the peer may still be booting.
pub const DEFAULT_HANDSHAKE_ATTEMPTS: u32 = 3;

/// What the host learned about the peer during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    /// Port the peer is attached to.
    pub port: String,
    /// Protocol version the peer reported.
    pub version: ProtocolVersion,
}

/// Perform the handshake against the version this host speaks.
pub fn negotiate<T: Transport>(engine: &mut Engine<T>, attempts: u32) -> DriverResult<PeerInfo> {
    negotiate_with(engine, attempts, ProtocolVersion::CURRENT)
}

/// Perform the handshake, requiring the peer to match `host`'s major version.
pub fn negotiate_with<T: Transport>(
    engine: &mut Engine<T>,
    attempts: u32,
    host: ProtocolVersion,
) -> DriverResult<PeerInfo> {
    let port = engine.transport().name().to_string();

    let response = engine
        .send(&Request::Handshake, attempts)
        .map_err(|source| DriverError::HandshakeFailed {
            port: port.clone(),
            source: Box::new(source),
        })?;

    let peer = match response {
        Response::Handshake(resp) => resp.version,
        other => {
            return Err(DriverError::HandshakeFailed {
                port,
                source: Box::new(DriverError::UnexpectedResponse {
                    expected: Kind::Handshake,
                    actual: other.kind(),
                }),
            })
        }
    };

    engine.telemetry().scope(|| {
        if !host.is_compatible_with(&peer) {
            warn!(%host, %peer, "peer protocol major version differs");
            return Err(DriverError::VersionIncompatible {
                port: port.clone(),
                host,
                peer,
            });
        }
        if host.minor != peer.minor {
            info!(%host, %peer, "peer minor version differs, continuing");
        }
        info!(version = %peer, "handshake complete");
        Ok(())
    })?;

    Ok(PeerInfo {
        port,
        version: peer,
    })
}
