//! Printer server: accept loop and per-session task management.
//!
//! [`run_server`] pulls sessions from a [`Connections`] stream and spawns one
//! Tokio task per session.  Each task builds its own
//! [`SessionDispatcher`](crate::application::SessionDispatcher) from the
//! shared [`SessionFactory`], so sessions never share decoder state.
//!
//! There is no cap on concurrent sessions and no idle timeout; a session
//! lasts until the peer closes its side or the socket fails.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::{SessionDispatcher, SessionFactory};
use crate::infrastructure::network::acceptor::{AcceptError, Connections};
use crate::infrastructure::network::bridge::{Inbound, Outbound, Session, SessionError};
use tpsim_core::{CommandDecoder, ReceiptRenderer};

// ── Public API ────────────────────────────────────────────────────────────────

/// Runs the accept loop until `shutdown` resolves or the listener fails.
///
/// Sessions already running when the loop exits are left to finish on their
/// own tasks; they end when the runtime shuts down.
///
/// # Errors
///
/// Returns the [`AcceptError`] that terminated the connection stream.
pub async fn run_server<F, S>(
    mut connections: Connections,
    factory: Arc<F>,
    shutdown: S,
) -> Result<(), AcceptError>
where
    F: SessionFactory,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("shutdown requested; stopping accept loop");
                return Ok(());
            }
            next = connections.next_session() => match next {
                Some(Ok(session)) => {
                    let factory = Arc::clone(&factory);
                    tokio::spawn(async move {
                        handle_session(session, factory.as_ref()).await;
                    });
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(()),
            },
        }
    }
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Serves one session to completion and reports its lifecycle on stdout.
///
/// Errors end only this session; they are logged and never propagated.
pub async fn handle_session<F: SessionFactory>(session: Session, factory: &F) {
    let id = session.id();
    let remote = session.remote_address().to_string();

    println!("Connection from {remote}");
    info!(session_id = %id, peer = %remote, "session opened");

    let dispatcher = factory.dispatcher();
    let outcome = session
        .with_connection(|inbound, outbound| serve_session(inbound, outbound, dispatcher))
        .await;

    match outcome {
        Ok(()) => debug!(session_id = %id, peer = %remote, "session ended normally"),
        Err(e) => warn!(session_id = %id, peer = %remote, "session ended with error: {e}"),
    }

    println!("Connection from {remote} closed");
}

/// Feeds every inbound chunk through `dispatcher` and writes its replies.
async fn serve_session<D, R>(
    mut inbound: Inbound,
    outbound: Outbound,
    mut dispatcher: SessionDispatcher<D, R>,
) -> Result<(), SessionError>
where
    D: CommandDecoder,
    R: ReceiptRenderer,
{
    while let Some(chunk) = inbound.next_chunk().await {
        let chunk = chunk?;
        for reply in dispatcher.process_chunk(&chunk) {
            outbound.send(reply.bytes).await?;
            let [d1, d2, d3, d4] = reply.process_id;
            println!("process: {d1}, {d2}, {d3}, {d4}");
        }
    }
    Ok(())
}
