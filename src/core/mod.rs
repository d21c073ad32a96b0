//! # Core Wire Components
//!
//! Message values, line framing, and the text wire format.
//!
//! ## Components
//! - **Message**: the single logical unit exchanged between peers
//! - **Codec**: tokio codec for newline-delimited framing over byte streams
//!
//! ## Wire Format
//! ```text
//! {"message":"<text>","senderIp":"<origin>"}\n
//! ```
//!
//! One JSON record per line. There is no message-type tag on the wire;
//! meaning is inferred from the text by the authentication state machine.
//!
//! ## Security
//! - Maximum record size: 64KB (prevents memory exhaustion)
//! - Framing and JSON parsing are decoupled, so a malformed record is
//!   dropped without tearing down the stream

pub mod codec;
pub mod message;

pub use codec::LineCodec;
pub use message::Message;
