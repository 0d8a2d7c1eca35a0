//! Connection acceptor: binds the printer port and yields sessions.
//!
//! [`start`] binds the listener and returns the bound port together with a
//! lazy [`Connections`] stream.  The OS queues incoming connections in the
//! listen backlog as soon as `start` returns; `accept()` is only called when
//! the consumer polls for the next session.
//!
//! # Failure policy
//!
//! A failed bind is returned immediately as a [`BindError`].  A failed
//! accept is yielded once as an [`AcceptError`] and ends the stream; the
//! listener is dropped and not restarted.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::infrastructure::network::bridge::Session;

/// The listener could not be created.
#[derive(Debug, Error)]
pub enum BindError {
    /// Host name resolution failed.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Resolution succeeded but produced no addresses.
    #[error("no addresses found for {host}:{port}")]
    NoAddress { host: String, port: u16 },

    /// Binding the socket failed (port in use, permission denied, ...).
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Accepting a connection failed.  Terminates the connection stream.
#[derive(Debug, Error)]
#[error("accept failed: {0}")]
pub struct AcceptError(#[from] pub io::Error);

/// Binds a TCP listener on `host:port` (port 0 picks a free port).
///
/// Every address `host` resolves to is tried in order; the first that binds
/// wins.
///
/// # Errors
///
/// Returns [`BindError`] if resolution fails or no address can be bound.
pub async fn start(host: &str, port: u16) -> Result<(u16, Connections), BindError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| BindError::Resolve {
            host: host.to_string(),
            port,
            source,
        })?
        .collect();

    let mut last_error = BindError::NoAddress {
        host: host.to_string(),
        port,
    };

    for addr in addrs {
        match bind_one(addr).await {
            Ok((bound_port, listener)) => {
                debug!("listening on {addr} (bound port {bound_port})");
                return Ok((bound_port, Connections::new(listener)));
            }
            Err(e) => {
                debug!("{e}");
                last_error = e;
            }
        }
    }

    Err(last_error)
}

async fn bind_one(addr: SocketAddr) -> Result<(u16, TcpListener), BindError> {
    let bind_err = |source| BindError::Bind { addr, source };
    let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
    let bound_port = listener.local_addr().map_err(bind_err)?.port();
    Ok((bound_port, listener))
}

/// Lazy, single-pass stream of accepted [`Session`]s.
///
/// Dropping the stream closes the listening socket.
#[derive(Debug)]
pub struct Connections {
    listener: Option<TcpListener>,
}

impl Connections {
    fn new(listener: TcpListener) -> Self {
        Self {
            listener: Some(listener),
        }
    }

    /// Address the listener is bound to, or `None` once the stream ended.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Waits for the next connection.
    pub async fn next_session(&mut self) -> Option<Result<Session, AcceptError>> {
        self.next().await
    }
}

impl Stream for Connections {
    type Item = Result<Session, AcceptError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(listener) = this.listener.as_ref() else {
            return Poll::Ready(None);
        };

        let polled = listener
            .poll_accept(cx)
            .map_ok(|(stream, peer)| Session::new(stream, Some(peer)));
        accept_item(&mut this.listener, polled)
    }
}

/// Turns one accept poll into a stream item.  A failure drops `listener`, so
/// every later poll yields `None`.
fn accept_item<L, T>(
    listener: &mut Option<L>,
    polled: Poll<io::Result<T>>,
) -> Poll<Option<Result<T, AcceptError>>> {
    match polled {
        Poll::Pending => Poll::Pending,
        Poll::Ready(Ok(item)) => Poll::Ready(Some(Ok(item))),
        Poll::Ready(Err(e)) => {
            warn!("accept failed; closing listener: {e}");
            *listener = None;
            Poll::Ready(Some(Err(AcceptError(e))))
        }
    }
}
