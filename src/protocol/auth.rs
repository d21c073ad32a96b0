//! Per-peer authentication state machine.
//!
//! Every inbound message is classified by pattern-matching its text against
//! the sender's current state, in a fixed priority order: identifier claim,
//! presence confirmation, then proof-or-chat. There is no message-type tag
//! on the wire, so a chat message that *looks* like a control phrase is
//! treated as one; this ambiguity is load-bearing for the deployed peers
//! and is preserved.
//!
//! The machine is deterministic and synchronous. Concurrency lives in the
//! transport layer: two peers' messages may be processed in parallel, but
//! messages from one peer are processed strictly in arrival order.

use crate::core::Message;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::challenge;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::debug;

/// Exact length of an identifier claim.
pub const IDENTIFIER_LEN: usize = 9;

/// Literal presence-confirmation phrase.
pub const PRESENCE_PHRASE: &str = "I am here";

/// Reply sent when a registered identifier is claimed. The wording is fixed;
/// deployed peers key off it.
pub const CLAIM_ACK: &str = "StudentID verified. Please send 'I am here'";

/// Authentication state of one remote address.
///
/// Transitions move forward through the handshake; the only non-forward
/// behavior is that a failed proof leaves the same challenge outstanding,
/// and a fresh identifier claim overwrites any state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Nothing claimed or proven. The default for any address never seen.
    #[default]
    Unverified,
    /// Peer claimed a registered identifier; waiting for presence.
    IdentifierClaimed(String),
    /// Challenge sent; waiting for the encrypted proof.
    ChallengeIssued { identifier: String, challenge: u32 },
    /// Proof accepted; chat messages from this address are delivered.
    Authenticated,
}

/// Advisory notice produced by the state machine for the embedding
/// application. None of these corrupt state or terminate anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// A 9-digit claim that is not in the registered set.
    InvalidIdentifier { addr: String },
    /// Presence phrase received before any identifier claim.
    PresenceWithoutClaim { addr: String },
    /// Proof accepted.
    AuthenticationSucceeded { identifier: String, addr: String },
    /// Proof rejected; the challenge remains outstanding.
    AuthenticationFailed { identifier: String, addr: String },
}

/// Result of processing one inbound message: at most one protocol reply to
/// the sender, at most one advisory, and whether the message itself should
/// be delivered to the chat sink.
#[derive(Debug, Default)]
pub struct Outcome {
    pub reply: Option<String>,
    pub advisory: Option<Advisory>,
    pub deliver: bool,
}

/// The authentication engine: the registered-identifier set plus one
/// [`AuthState`] per remote address.
///
/// State is keyed on the message's origin field, exactly as the deployed
/// peers do. Entries persist until [`AuthEngine::clear`] at link teardown.
pub struct AuthEngine {
    registered: HashSet<String>,
    states: RwLock<HashMap<String, AuthState>>,
}

impl AuthEngine {
    pub fn new<I, S>(registered: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            registered: registered.into_iter().map(Into::into).collect(),
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Current state of an address. Addresses never seen are `Unverified`.
    pub fn state_of(&self, addr: &str) -> Result<AuthState> {
        let states = self
            .states
            .read()
            .map_err(|_| ProtocolError::LockPoisoned(constants::ERR_AUTH_READ_LOCK))?;
        Ok(states.get(addr).cloned().unwrap_or_default())
    }

    /// Discard all per-address state (link teardown).
    pub fn clear(&self) -> Result<()> {
        self.states
            .write()
            .map_err(|_| ProtocolError::LockPoisoned(constants::ERR_AUTH_WRITE_LOCK))?
            .clear();
        Ok(())
    }

    /// Classify one inbound message and advance the sender's state.
    pub fn process(&self, msg: &Message) -> Result<Outcome> {
        let addr = msg.origin.as_str();
        let text = msg.text.as_str();

        let mut states = self
            .states
            .write()
            .map_err(|_| ProtocolError::LockPoisoned(constants::ERR_AUTH_WRITE_LOCK))?;
        let current = states.get(addr).cloned().unwrap_or_default();

        let mut outcome = Outcome::default();

        if is_identifier(text) {
            // Priority 1: identifier claim. A registered claim overwrites
            // whatever state the address held.
            if self.registered.contains(text) {
                states.insert(addr.to_string(), AuthState::IdentifierClaimed(text.to_string()));
                debug!(addr, identifier = text, "identifier claim accepted");
                outcome.reply = Some(CLAIM_ACK.to_string());
            } else {
                debug!(addr, identifier = text, "identifier claim refused");
                outcome.advisory = Some(Advisory::InvalidIdentifier {
                    addr: addr.to_string(),
                });
            }
        } else if text == PRESENCE_PHRASE {
            // Priority 2: presence confirmation.
            match current {
                AuthState::IdentifierClaimed(identifier) => {
                    let value = challenge::generate();
                    debug!(addr, identifier, challenge = value, "challenge issued");
                    states.insert(
                        addr.to_string(),
                        AuthState::ChallengeIssued {
                            identifier,
                            challenge: value,
                        },
                    );
                    outcome.reply = Some(value.to_string());
                }
                _ => {
                    outcome.advisory = Some(Advisory::PresenceWithoutClaim {
                        addr: addr.to_string(),
                    });
                }
            }
        } else {
            // Priority 3: encrypted proof, chat, or noise.
            match current {
                AuthState::ChallengeIssued { identifier, challenge } => {
                    if challenge::verify(text, &identifier, challenge) {
                        states.insert(addr.to_string(), AuthState::Authenticated);
                        outcome.advisory = Some(Advisory::AuthenticationSucceeded {
                            identifier,
                            addr: addr.to_string(),
                        });
                    } else {
                        // Challenge stays outstanding until answered.
                        outcome.advisory = Some(Advisory::AuthenticationFailed {
                            identifier,
                            addr: addr.to_string(),
                        });
                    }
                }
                AuthState::Authenticated => {
                    outcome.deliver = true;
                }
                _ => {
                    debug!(addr, "dropping message from unverified peer");
                }
            }
        }

        Ok(outcome)
    }
}

/// An identifier claim is exactly nine ASCII decimal digits.
fn is_identifier(text: &str) -> bool {
    text.len() == IDENTIFIER_LEN && text.bytes().all(|b| b.is_ascii_digit())
}
