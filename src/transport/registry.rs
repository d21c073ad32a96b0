//! Session registry: remote address → live writable stream.
//!
//! The registry and the handles it stores are the only shared mutable
//! transport state. Both are synchronized internally; there are no ambient
//! globals. A `lookup` miss is not an error, it means "no route to that
//! peer" and callers report or ignore it.

use crate::core::{LineCodec, Message};
use crate::error::Result;
use futures::stream::SplitSink;
use futures::SinkExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::debug;

/// Write half of one framed peer connection.
pub type RecordSink = SplitSink<Framed<TcpStream, LineCodec>, String>;

/// Writable handle to one remote peer.
///
/// Cheap to clone; all clones share the underlying sink. Sends are
/// serialized through an async mutex so concurrent callers cannot
/// interleave partial records on the wire.
#[derive(Clone)]
pub struct PeerHandle {
    addr: String,
    sink: Arc<Mutex<RecordSink>>,
}

impl PeerHandle {
    pub fn new(addr: impl Into<String>, sink: RecordSink) -> Self {
        Self {
            addr: addr.into(),
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// Remote address this handle writes to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Write one already-encoded record.
    pub async fn send_record(&self, record: String) -> Result<()> {
        let mut sink = self.sink.lock().await;
        sink.send(record).await
    }

    /// Encode and write one message.
    pub async fn send(&self, msg: &Message) -> Result<()> {
        self.send_record(msg.encode()?).await
    }

    /// Flush and close the write half. The peer's read loop then exits via
    /// its end-of-stream path.
    pub async fn close(&self) -> Result<()> {
        let mut sink = self.sink.lock().await;
        sink.close().await
    }
}

/// Address-keyed map of live sessions, used by the listener to multiplex
/// many peers. Keys are unique: registering an address that already has a
/// session replaces it.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, PeerHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, handle: PeerHandle) {
        let mut sessions = self.sessions.lock().await;
        if sessions.insert(handle.addr().to_string(), handle).is_some() {
            debug!("replaced existing session during registration");
        }
    }

    /// Live handle for an address, if any. A miss signals "no route".
    pub async fn lookup(&self, addr: &str) -> Option<PeerHandle> {
        self.sessions.lock().await.get(addr).cloned()
    }

    pub async fn remove(&self, addr: &str) -> Option<PeerHandle> {
        self.sessions.lock().await.remove(addr)
    }

    /// Addresses of all live sessions.
    pub async fn addresses(&self) -> Vec<String> {
        self.sessions.lock().await.keys().cloned().collect()
    }

    /// Drop every session and return the handles so the caller can close
    /// their streams (link teardown).
    pub async fn clear(&self) -> Vec<PeerHandle> {
        self.sessions.lock().await.drain().map(|(_, h)| h).collect()
    }
}
