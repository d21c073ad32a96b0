//! # Protocol Logic
//!
//! The authentication state machine and its supporting pieces.
//!
//! ## Components
//! - **Auth**: per-peer state machine classifying every inbound message
//! - **Challenge**: random challenge generation and encrypted-proof checking
//! - **Event**: boundary events surfaced to the embedding application
//!
//! ## Handshake
//! ```text
//! peer                          hub
//!  | -- "816035115" ------------> |   identifier claim
//!  | <-- "StudentID verified..."  |
//!  | -- "I am here" ------------> |   presence confirmation
//!  | <-- "412087"                 |   random challenge R
//!  | -- hex(Enc(key(id), R)) ---> |   encrypted proof
//!  |        (no reply; peer is now Authenticated)
//! ```
//!
//! Only messages from `Authenticated` peers reach the chat sink.

pub mod auth;
pub mod challenge;
pub mod event;


pub use auth::{Advisory, AuthEngine, AuthState, Outcome};
pub use event::PeerEvent;
