//! Listening hub endpoint.
//!
//! Binds one fixed address, accepts peers, and runs one read loop per
//! accepted stream. Every successfully decoded record is echoed back to its
//! sender verbatim before being handed to the state machine; the echo is a
//! transport-level acknowledgment the deployed peers rely on, independent of
//! what the record means.

use crate::config::NetworkConfig;
use crate::core::{LineCodec, Message};
use crate::error::{ProtocolError, Result};
use crate::protocol::{AuthEngine, AuthState, PeerEvent};
use crate::transport::registry::{PeerHandle, SessionRegistry};
use futures::stream::SplitStream;
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

/// The hub side of the session layer.
///
/// Owns the accept task, the session registry, and the authentication
/// engine. Dropping the `Listener` does not stop the accept task; call
/// [`Listener::shutdown`] to tear the link down.
pub struct Listener {
    registry: SessionRegistry,
    engine: Arc<AuthEngine>,
    local_addr: SocketAddr,
    origin: String,
    shutdown_tx: mpsc::Sender<()>,
}

impl Listener {
    /// Bind the configured address and start accepting peers. Boundary
    /// events are delivered on `events`.
    #[instrument(skip_all, fields(addr = %config.listen_addr()))]
    pub async fn bind(
        config: &NetworkConfig,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Self> {
        let socket = TcpListener::bind(config.listen_addr()).await?;
        let local_addr = socket.local_addr()?;
        let origin = local_addr.ip().to_string();
        info!(%local_addr, "listening");

        let registry = SessionRegistry::new();
        let engine = Arc::new(AuthEngine::new(config.auth.registered_ids.iter().cloned()));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(accept_loop(
            socket,
            registry.clone(),
            Arc::clone(&engine),
            events,
            origin.clone(),
            shutdown_rx,
        ));

        Ok(Self {
            registry,
            engine,
            local_addr,
            origin,
            shutdown_tx,
        })
    }

    /// Actual bound address (useful when the configured port is 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address string stamped as the origin of every message the hub sends.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Addresses of all connected peers.
    pub async fn peers(&self) -> Vec<String> {
        self.registry.addresses().await
    }

    /// Authentication state of a peer address.
    pub fn auth_state(&self, addr: &str) -> Result<AuthState> {
        self.engine.state_of(addr)
    }

    /// Send chat text to one peer, bypassing the state machine entirely.
    /// Outgoing messages are never subject to the handshake.
    pub async fn send_chat(&self, peer: &str, text: &str) -> Result<()> {
        match self.registry.lookup(peer).await {
            Some(handle) => handle.send(&Message::new(text, self.origin.clone())).await,
            None => {
                warn!(peer, "no route to peer");
                Err(ProtocolError::NoRouteToPeer(peer.to_string()))
            }
        }
    }

    /// Tear the link down: stop accepting, close every session, discard all
    /// per-address state. Read loops exit through their end-of-stream path.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn accept_loop(
    socket: TcpListener,
    registry: SessionRegistry,
    engine: Arc<AuthEngine>,
    events: mpsc::UnboundedSender<PeerEvent>,
    origin: String,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("shutting down listener");
                for handle in registry.clear().await {
                    let _ = handle.close().await;
                }
                if let Err(e) = engine.clear() {
                    error!(error = %e, "failed to clear auth state");
                }
                return;
            }

            accepted = socket.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        // Sessions are keyed by IP: one active connection
                        // per address, a reconnect replaces the old one.
                        let addr = peer_addr.ip().to_string();
                        info!(%addr, "accepted connection");

                        let (sink, records) = Framed::new(stream, LineCodec::new()).split();
                        let handle = PeerHandle::new(addr.clone(), sink);
                        registry.register(handle.clone()).await;
                        let _ = events.send(PeerEvent::ConnectionEstablished { addr: addr.clone() });

                        tokio::spawn(read_loop(
                            addr,
                            records,
                            handle,
                            registry.clone(),
                            Arc::clone(&engine),
                            events.clone(),
                            origin.clone(),
                        ));
                    }
                    Err(e) => {
                        error!(error = %e, "error accepting connection");
                    }
                }
            }
        }
    }
}

/// Per-peer read loop: decode, echo, dispatch; exits on end-of-stream or
/// I/O error and removes the session.
async fn read_loop(
    addr: String,
    mut records: SplitStream<Framed<TcpStream, LineCodec>>,
    handle: PeerHandle,
    registry: SessionRegistry,
    engine: Arc<AuthEngine>,
    events: mpsc::UnboundedSender<PeerEvent>,
    origin: String,
) {
    while let Some(item) = records.next().await {
        let line = match item {
            Ok(line) => line,
            Err(e) => {
                warn!(%addr, error = %e, "read failed, closing session");
                break;
            }
        };

        let msg = match Message::decode(&line) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(%addr, error = %e, "dropping malformed record");
                continue;
            }
        };

        // Acknowledgment-by-echo: the exact record goes straight back,
        // whatever it means.
        if let Err(e) = handle.send_record(line).await {
            warn!(%addr, error = %e, "echo failed, closing session");
            break;
        }

        dispatch(msg, &registry, &engine, &events, &origin).await;
    }

    registry.remove(&addr).await;
    info!(%addr, "session closed");
    let _ = events.send(PeerEvent::ConnectionLost { addr });
}

/// Run one message through the state machine and act on the outcome.
async fn dispatch(
    msg: Message,
    registry: &SessionRegistry,
    engine: &AuthEngine,
    events: &mpsc::UnboundedSender<PeerEvent>,
    origin: &str,
) {
    let outcome = match engine.process(&msg) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "state machine failure, record dropped");
            return;
        }
    };

    if let Some(reply) = outcome.reply {
        // Replies are routed by the message's origin field, the same key
        // the state machine uses.
        match registry.lookup(&msg.origin).await {
            Some(peer) => {
                if let Err(e) = peer.send(&Message::new(reply, origin)).await {
                    warn!(peer = %msg.origin, error = %e, "failed to send protocol reply");
                }
            }
            None => {
                warn!(peer = %msg.origin, "no route to peer for protocol reply");
            }
        }
    }

    if let Some(advisory) = outcome.advisory {
        let _ = events.send(advisory.into());
    }

    if outcome.deliver {
        debug!(peer = %msg.origin, "delivering verified chat message");
        let _ = events.send(PeerEvent::Message(msg));
    }
}
