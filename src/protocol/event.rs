//! Boundary events surfaced to the embedding application.

use crate::core::Message;
use crate::protocol::auth::Advisory;

/// Everything the session layer reports upward: connection lifecycle,
/// handshake advisories, and verified chat messages. Delivered over the
/// channel supplied when an endpoint is started.
///
/// `Message` is emitted only for messages the state machine has forwarded,
/// i.e. only from authenticated peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// A peer connected (listener side) or the hub was reached (dialer side).
    ConnectionEstablished { addr: String },
    /// The stream closed or failed; all session state for it is gone.
    ConnectionLost { addr: String },
    /// Verified chat message, the only path into the visible conversation.
    Message(Message),
    /// A 9-digit claim that is not registered.
    InvalidIdentifier { addr: String },
    /// Presence phrase before any identifier claim.
    PresenceWithoutClaim { addr: String },
    /// Handshake completed for this address.
    AuthenticationSucceeded { identifier: String, addr: String },
    /// Proof rejected; the challenge remains outstanding.
    AuthenticationFailed { identifier: String, addr: String },
}

impl From<Advisory> for PeerEvent {
    fn from(advisory: Advisory) -> Self {
        match advisory {
            Advisory::InvalidIdentifier { addr } => PeerEvent::InvalidIdentifier { addr },
            Advisory::PresenceWithoutClaim { addr } => PeerEvent::PresenceWithoutClaim { addr },
            Advisory::AuthenticationSucceeded { identifier, addr } => {
                PeerEvent::AuthenticationSucceeded { identifier, addr }
            }
            Advisory::AuthenticationFailed { identifier, addr } => {
                PeerEvent::AuthenticationFailed { identifier, addr }
            }
        }
    }
}
