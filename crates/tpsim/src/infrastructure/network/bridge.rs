//! Byte-stream socket bridge: one accepted TCP connection as two flows.
//!
//! A [`Session`] wraps an accepted [`TcpStream`] and hands its consumer:
//!
//! - an [`Inbound`] sequence of byte chunks, fed by a background reader task
//!   through a bounded channel, and
//! - an [`Outbound`] handle whose [`Outbound::send`] queues bytes to a single
//!   writer task, so replies reach the wire in the order they were sent.
//!
//! Both are only available inside [`Session::with_connection`].  When the
//! handler returns, fails, or its future is dropped, the reader and writer
//! tasks are aborted and the socket is closed in both directions.
//!
//! # Chunk boundaries
//!
//! The bridge performs no framing.  Each inbound chunk is whatever a single
//! `read()` returned; a command may be split across chunks or several
//! commands may arrive in one.  Decoders must keep state across chunks.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use uuid::Uuid;

/// Maximum bytes per inbound chunk.
pub const READ_BUFFER_SIZE: usize = 4096;

/// Inbound chunks buffered before the reader waits for the consumer.
pub const INBOUND_CHANNEL_CAPACITY: usize = 16;

const OUTBOUND_CHANNEL_CAPACITY: usize = 16;

/// Errors that end a single session.  Never fatal to the process.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading from or writing to the socket failed.
    #[error("connection I/O error: {0}")]
    Io(#[from] io::Error),

    /// The session was already closed when a send was attempted.
    #[error("connection closed")]
    ConnectionClosed,
}

/// One accepted connection, not yet being served.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    remote_address: String,
    stream: TcpStream,
}

impl Session {
    /// Wraps an accepted stream.  `peer` is the address reported by
    /// `accept()`; if absent, the stream is asked, and `"unknown"` is used
    /// when neither is available.
    pub fn new(stream: TcpStream, peer: Option<SocketAddr>) -> Self {
        let remote_address = peer
            .or_else(|| stream.peer_addr().ok())
            .map_or_else(|| "unknown".to_string(), |addr| addr.to_string());
        Self {
            id: Uuid::new_v4(),
            remote_address,
            stream,
        }
    }

    /// Random identifier used to correlate log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Remote `ip:port`, or `"unknown"`.
    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    /// Runs `handler` with the session's inbound and outbound flows and
    /// closes the socket when it finishes.
    ///
    /// The socket is released on every exit path: normal return, an `Err`
    /// from the handler, or cancellation of the future returned here.
    /// Sends attempted after that point fail with
    /// [`SessionError::ConnectionClosed`].
    ///
    /// # Errors
    ///
    /// Returns whatever error the handler returns.
    pub async fn with_connection<F, Fut, T>(self, handler: F) -> Result<T, SessionError>
    where
        F: FnOnce(Inbound, Outbound) -> Fut,
        Fut: Future<Output = Result<T, SessionError>>,
    {
        let Session { id, stream, .. } = self;
        let (read_half, write_half) = stream.into_split();

        let (chunk_tx, chunk_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let (write_tx, write_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);

        let _tasks = BridgeTasks {
            reader: tokio::spawn(read_chunks(read_half, chunk_tx, id)),
            writer: tokio::spawn(write_requests(write_half, write_rx, id)),
        };

        handler(Inbound { rx: chunk_rx }, Outbound { tx: write_tx }).await
    }
}

impl From<TcpStream> for Session {
    fn from(stream: TcpStream) -> Self {
        Self::new(stream, None)
    }
}

/// Aborts the reader and writer tasks when dropped, releasing both socket
/// halves.
struct BridgeTasks {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Drop for BridgeTasks {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

// ── Inbound ───────────────────────────────────────────────────────────────────

/// Single-pass sequence of inbound byte chunks.
///
/// Ends (`None`) when the peer closes the connection.  A read error is
/// delivered as the final `Some(Err(..))`.
#[derive(Debug)]
pub struct Inbound {
    rx: mpsc::Receiver<Result<Vec<u8>, SessionError>>,
}

impl Inbound {
    /// Waits for the next chunk.
    pub async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, SessionError>> {
        self.rx.recv().await
    }
}

impl Stream for Inbound {
    type Item = Result<Vec<u8>, SessionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

async fn read_chunks(
    mut read_half: OwnedReadHalf,
    tx: mpsc::Sender<Result<Vec<u8>, SessionError>>,
    session_id: Uuid,
) {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = match read_half.read(&mut buf).await {
            Ok(0) => {
                debug!(%session_id, "peer closed connection (EOF)");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                debug!(%session_id, "read failed: {e}");
                let _ = tx.send(Err(SessionError::Io(e))).await;
                break;
            }
        };

        trace!(%session_id, "read {n} bytes");
        if tx.send(Ok(buf[..n].to_vec())).await.is_err() {
            debug!(%session_id, "inbound consumer dropped; stopping reader");
            break;
        }
    }
}

// ── Outbound ──────────────────────────────────────────────────────────────────

struct WriteRequest {
    bytes: Vec<u8>,
    done: oneshot::Sender<io::Result<()>>,
}

/// Handle for writing to the session's socket.
///
/// Clones share one writer task; writes are applied in the order their
/// `send` calls were queued.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::Sender<WriteRequest>,
}

impl std::fmt::Debug for WriteRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteRequest")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Outbound {
    /// Writes `bytes` to the socket and waits until they were fully handed
    /// to the OS.
    ///
    /// # Errors
    ///
    /// [`SessionError::ConnectionClosed`] if the session has ended, or
    /// [`SessionError::Io`] if the write itself failed.
    pub async fn send(&self, bytes: impl Into<Vec<u8>>) -> Result<(), SessionError> {
        let (done, result) = oneshot::channel();
        self.tx
            .send(WriteRequest {
                bytes: bytes.into(),
                done,
            })
            .await
            .map_err(|_| SessionError::ConnectionClosed)?;

        match result.await {
            Ok(outcome) => outcome.map_err(SessionError::Io),
            Err(_) => Err(SessionError::ConnectionClosed),
        }
    }
}

async fn write_requests(
    mut write_half: OwnedWriteHalf,
    mut rx: mpsc::Receiver<WriteRequest>,
    session_id: Uuid,
) {
    while let Some(request) = rx.recv().await {
        let outcome = write_half.write_all(&request.bytes).await;
        let failed = outcome.is_err();
        if let Err(e) = &outcome {
            debug!(%session_id, "write failed: {e}");
        }
        let _ = request.done.send(outcome);
        if failed {
            break;
        }
    }
    let _ = write_half.shutdown().await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Returns (server-side Session, client stream) over loopback.
    async fn connected_pair() -> (Session, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, peer) = listener.accept().await.unwrap();
        (Session::new(server, Some(peer)), client)
    }

    #[tokio::test]
    async fn test_remote_address_matches_client_local_addr() {
        let (session, client) = connected_pair().await;
        assert_eq!(
            session.remote_address(),
            client.local_addr().unwrap().to_string()
        );
    }

    #[tokio::test]
    async fn test_session_from_stream_reads_peer_addr() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (server, _) = listener.accept().await.unwrap();

        let session = Session::from(server);

        assert_eq!(
            session.remote_address(),
            client.local_addr().unwrap().to_string()
        );
    }

    #[tokio::test]
    async fn test_inbound_yields_bytes_then_ends_on_eof() {
        // Arrange
        let (session, mut client) = connected_pair().await;
        client.write_all(b"hello printer").await.unwrap();
        client.shutdown().await.unwrap();

        // Act
        let received = session
            .with_connection(|mut inbound, _outbound| async move {
                let mut all = Vec::new();
                while let Some(chunk) = inbound.next_chunk().await {
                    all.extend_from_slice(&chunk?);
                }
                Ok(all)
            })
            .await
            .unwrap();

        // Assert
        assert_eq!(received, b"hello printer");
    }

    #[tokio::test]
    async fn test_send_reaches_client_in_order() {
        let (session, mut client) = connected_pair().await;

        session
            .with_connection(|_inbound, outbound| async move {
                outbound.send(vec![1u8, 2, 3]).await?;
                outbound.send([4u8, 5]).await?;
                outbound.send(b"six".to_vec()).await
            })
            .await
            .unwrap();

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, vec![1, 2, 3, 4, 5, b's', b'i', b'x']);
    }

    #[tokio::test]
    async fn test_socket_closed_when_handler_returns() {
        let (session, mut client) = connected_pair().await;

        session
            .with_connection(|_inbound, _outbound| async move { Ok(()) })
            .await
            .unwrap();

        // The client observes EOF even though it never closed its side.
        let mut buf = [0u8; 8];
        let n = tokio::time::timeout(std::time::Duration::from_secs(5), client.read(&mut buf))
            .await
            .expect("EOF must arrive promptly")
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_handler_error_is_returned_and_socket_closed() {
        let (session, mut client) = connected_pair().await;

        let result: Result<(), _> = session
            .with_connection(|_inbound, _outbound| async move {
                Err(SessionError::ConnectionClosed)
            })
            .await;

        assert!(matches!(result, Err(SessionError::ConnectionClosed)));
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_send_after_session_end_fails_with_connection_closed() {
        let (session, _client) = connected_pair().await;

        // Smuggle a clone of the outbound handle out of the scope.
        let outbound = session
            .with_connection(|_inbound, outbound| async move { Ok(outbound.clone()) })
            .await
            .unwrap();

        let result = outbound.send(vec![0u8]).await;
        assert!(matches!(result, Err(SessionError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_cancelled_session_releases_socket() {
        let (session, mut client) = connected_pair().await;

        let task = tokio::spawn(session.with_connection(|mut inbound, _outbound| async move {
            // Blocks forever: the client never sends anything.
            while inbound.next_chunk().await.is_some() {}
            Ok(())
        }));
        tokio::task::yield_now().await;
        task.abort();
        let _ = task.await;

        let mut buf = [0u8; 8];
        let n = tokio::time::timeout(std::time::Duration::from_secs(5), client.read(&mut buf))
            .await
            .expect("cancellation must close the socket")
            .unwrap();
        assert_eq!(n, 0);
    }
}
