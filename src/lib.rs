//! # peerlink
//!
//! Authenticated peer-to-peer chat session layer for local wireless links.
//!
//! Two roles share a newline-delimited JSON wire format over TCP: a
//! [`Listener`](transport::Listener) hub that accepts many peers, and a
//! [`Dialer`](transport::Dialer) that connects to it. Chat delivery is gated
//! behind a four-step handshake — a peer claims a pre-registered identifier,
//! confirms presence, receives a random challenge, and proves possession of
//! the identifier-derived key by returning the challenge encrypted. Only
//! after that do its messages reach the chat sink.
//!
//! Link formation (finding peers, forming the wireless group, addressing)
//! and presentation are external: this crate starts from "a byte stream
//! exists" and ends at a [`PeerEvent`](protocol::PeerEvent) channel.
//!
//! ## Quick start (hub side)
//! ```no_run
//! use peerlink::config::NetworkConfig;
//! use peerlink::protocol::PeerEvent;
//! use peerlink::transport::Listener;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> peerlink::error::Result<()> {
//!     let mut config = NetworkConfig::default();
//!     config.auth.registered_ids = vec!["816035115".into()];
//!
//!     let (tx, mut rx) = mpsc::unbounded_channel();
//!     let listener = Listener::bind(&config, tx).await?;
//!
//!     while let Some(event) = rx.recv().await {
//!         if let PeerEvent::Message(msg) = event {
//!             listener.send_chat(&msg.origin, "ack!").await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use crate::core::Message;
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::{AuthEngine, AuthState, PeerEvent};
pub use crate::transport::{Dialer, Listener};
