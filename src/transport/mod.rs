//! # Transport Layer
//!
//! Socket plumbing for the two endpoint roles and the session registry
//! shared between them.
//!
//! ## Components
//! - **Listener**: the hub — binds a fixed address, accepts many peers,
//!   echoes every record back as a transport-level acknowledgment
//! - **Dialer**: a peer — one stream to the hub, no echo
//! - **Registry**: address → live writable handle, synchronized
//!
//! One task per connection; the state machine runs inside the task that
//! received the message, so per-peer ordering is arrival order while
//! different peers proceed in parallel.

pub mod dialer;
pub mod listener;
pub mod registry;

pub use dialer::Dialer;
pub use listener::Listener;
pub use registry::{PeerHandle, SessionRegistry};
