//! Dialing peer endpoint.
//!
//! Opens one stream to the hub and runs a single read loop. Inbound records
//! flow through the dialer's own state machine like any other traffic, but
//! with two differences from the hub side: nothing is echoed, and protocol
//! replies the machine produces are suppressed — a dialing peer answers the
//! handshake from its user-facing side, not automatically.
//!
//! Outgoing chat goes straight to the stream; the handshake never applies
//! to what this endpoint sends.

use crate::config::NetworkConfig;
use crate::core::{LineCodec, Message};
use crate::error::Result;
use crate::protocol::{AuthEngine, PeerEvent};
use crate::transport::registry::PeerHandle;
use futures::stream::SplitStream;
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

/// The dialing side of the session layer: exactly one session, to the hub.
pub struct Dialer {
    handle: PeerHandle,
    local_addr: SocketAddr,
    origin: String,
    hub_addr: String,
}

impl Dialer {
    /// Dial the configured hub and start the read loop. Boundary events are
    /// delivered on `events`.
    #[instrument(skip_all, fields(addr = %config.dial_addr()))]
    pub async fn connect(
        config: &NetworkConfig,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Self> {
        let stream = TcpStream::connect(config.dial_addr()).await?;
        let local_addr = stream.local_addr()?;
        let hub_addr = stream.peer_addr()?.ip().to_string();
        // The local address is the origin stamped on everything we send.
        let origin = local_addr.ip().to_string();
        info!(%local_addr, %hub_addr, "connected to hub");

        let (sink, records) = Framed::new(stream, LineCodec::new()).split();
        let handle = PeerHandle::new(hub_addr.clone(), sink);
        let engine = Arc::new(AuthEngine::new(config.auth.registered_ids.iter().cloned()));

        let _ = events.send(PeerEvent::ConnectionEstablished {
            addr: hub_addr.clone(),
        });

        tokio::spawn(read_loop(hub_addr.clone(), records, engine, events));

        Ok(Self {
            handle,
            local_addr,
            origin,
            hub_addr,
        })
    }

    /// Local socket address of this endpoint.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address string stamped as the origin of every outgoing message.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Address of the hub this peer dialed.
    pub fn hub_addr(&self) -> &str {
        &self.hub_addr
    }

    /// Send chat text to the hub, bypassing the state machine entirely.
    /// Handshake steps travel the same way: the claim, the presence phrase,
    /// and the encrypted proof are all just text sent here.
    pub async fn send_chat(&self, text: &str) -> Result<()> {
        self.handle
            .send(&Message::new(text, self.origin.clone()))
            .await
    }

    /// Close the stream. The read loop exits via its end-of-stream path.
    pub async fn close(&self) -> Result<()> {
        self.handle.close().await
    }
}

/// Single read loop: decode and dispatch, no echo, replies suppressed.
async fn read_loop(
    hub_addr: String,
    mut records: SplitStream<Framed<TcpStream, LineCodec>>,
    engine: Arc<AuthEngine>,
    events: mpsc::UnboundedSender<PeerEvent>,
) {
    while let Some(item) = records.next().await {
        let line = match item {
            Ok(line) => line,
            Err(e) => {
                warn!(%hub_addr, error = %e, "read failed, closing session");
                break;
            }
        };

        let msg = match Message::decode(&line) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(%hub_addr, error = %e, "dropping malformed record");
                continue;
            }
        };

        let outcome = match engine.process(&msg) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "state machine failure, record dropped");
                continue;
            }
        };

        if let Some(reply) = outcome.reply {
            debug!(%hub_addr, reply, "suppressing protocol reply on dialer side");
        }

        if let Some(advisory) = outcome.advisory {
            let _ = events.send(advisory.into());
        }

        if outcome.deliver {
            let _ = events.send(PeerEvent::Message(msg));
        }
    }

    if let Err(e) = engine.clear() {
        error!(error = %e, "failed to clear auth state");
    }
    info!(%hub_addr, "session closed");
    let _ = events.send(PeerEvent::ConnectionLost { addr: hub_addr });
}
