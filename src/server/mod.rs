//! TCP front end: connection acceptor, sessions, framing, and a typed client.
//!
//! # Concurrency
//!
//! The acceptor spawns one task per accepted connection and immediately goes back to
//! accepting. Each session owns its dataset and miner; nothing is shared between
//! sessions except the read-only [`SessionContext`]. Mining runs synchronously for
//! the session on tokio's blocking pool, without cancellation or timeout.
//!
//! Without `server.max_connections` the number of concurrent sessions (and blocking
//! threads busy mining) is unbounded; many simultaneous clients can exhaust memory
//! and CPU. Setting the limit makes extra connections wait for a free slot.

mod client;
pub mod protocol;
mod session;

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::data::DatasetSource;

pub use client::{Client, ClientError, Mined};
pub use protocol::{Message, ProtocolError};
pub use session::{Session, SessionContext, SessionState};

/// Monotonic per-connection id used to tag log lines.
static CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Listening server: accepts connections and runs one [`Session`] per connection.
pub struct Server {
    listener: TcpListener,
    ctx: Arc<SessionContext>,
    limit: Option<Arc<Semaphore>>,
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Bind the listening socket described by `config.server`.
    pub async fn bind(config: &Config, source: Arc<dyn DatasetSource>) -> io::Result<Self> {
        let addr = format!("{}:{}", config.server.bind_address, config.server.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            error!("failed to bind TCP listener to {}: {}", addr, e);
            e
        })?;

        match config.server.max_connections {
            Some(max) => info!(
                "listening on {} (max_connections={})",
                listener.local_addr()?,
                max
            ),
            None => warn!(
                "listening on {} with no connection limit; set server.max_connections to bound it",
                listener.local_addr()?
            ),
        }

        Ok(Self {
            listener,
            ctx: Arc::new(SessionContext {
                source,
                storage: config.storage.clone(),
                max_frame_bytes: config.server.max_frame_bytes,
            }),
            limit: config.server.max_connections.map(|n| Arc::new(Semaphore::new(n))),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await;
    }

    /// Accept connections until `shutdown` completes. Running sessions are not interrupted.
    pub async fn run_until<F: Future<Output = ()>>(self, shutdown: F) {
        tokio::pin!(shutdown);
        loop {
            let accepted = tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested; no longer accepting connections");
                    return;
                }
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    // Most accept errors are transient (e.g. the peer reset before accept).
                    error!("failed to accept TCP connection: {}", e);
                    continue;
                }
            };
            self.spawn_session(stream, peer);
        }
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let tag = format!("C{:03}", CONNECTION_COUNTER.fetch_add(1, Ordering::Relaxed));

        if let Err(e) = stream.set_nodelay(true) {
            // Dropping the stream closes the connection.
            warn!(conn = %tag, %peer, "failed to set up connection, closing: {}", e);
            return;
        }

        let ctx = Arc::clone(&self.ctx);
        let limit = self.limit.clone();
        let active = Arc::clone(&self.active);

        tokio::spawn(async move {
            let _permit = match limit {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(p) => Some(p),
                    Err(_) => {
                        error!(conn = %tag, %peer, "connection semaphore closed");
                        return;
                    }
                },
                None => None,
            };

            let count = active.fetch_add(1, Ordering::SeqCst) + 1;
            info!(conn = %tag, %peer, active = count, "client connected");

            let (reader, writer) = stream.into_split();
            let session = Session::new(BufReader::new(reader), writer, ctx, tag.clone());
            match session.run().await {
                Ok(()) => {}
                Err(ProtocolError::Io(e))
                    if matches!(
                        e.kind(),
                        io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe
                    ) =>
                {
                    debug!(conn = %tag, %peer, "client dropped connection: {}", e);
                }
                Err(e) => warn!(conn = %tag, %peer, "session ended with error: {}", e),
            }

            let count = active.fetch_sub(1, Ordering::SeqCst) - 1;
            info!(conn = %tag, %peer, active = count, "client disconnected");
        });
    }
}
