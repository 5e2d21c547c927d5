//! Per-connection handler: join, outbound delivery, and input routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Wait for `join` (anything else gets an `error` reply)
//!   2. Spawn the writer task that drains the player's outbound channel
//!   3. Hand the player to the room manager (wait or match)
//!   4. Loop: decode client messages and route them to the player's room

use std::sync::Arc;

use mazeduel_protocol::{ClientMessage, Codec, PlayerId, ProtocolError, ServerMessage};
use mazeduel_room::{PlayerAction, RoomError, join_shared};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::MazeDuelError;
use crate::server::{JOIN_TIMEOUT, ServerState};
use crate::transport::WebSocketConnection;

/// Drop guard that removes the player from the room manager when the
/// handler exits, including on panic.
///
/// `Drop` is synchronous, so the async lock is taken in a spawned task.
struct LeaveGuard {
    player_id: PlayerId,
    state: Arc<ServerState>,
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut rooms = state.rooms.lock().await;
            if let Err(e) = rooms.leave(player_id).await {
                tracing::debug!(%player_id, error = %e, "leave on disconnect");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), MazeDuelError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let player_id = PlayerId(conn_id.into_inner());
    tracing::debug!(%conn_id, %player_id, "handling new connection");

    // --- Step 1: join ---
    let name = await_join(&conn, &state).await?;

    // --- Step 2: writer ---
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = spawn_writer(Arc::clone(&conn), Arc::clone(&state), rx);

    // --- Step 3: pair ---
    let joined = join_shared(&state.rooms, player_id, name, tx.clone()).await;
    if let Err(e) = joined {
        // The manager already told the client why.
        tracing::info!(%player_id, error = %e, "join failed");
        drop(tx);
        let _ = writer.await;
        return Err(e.into());
    }
    let _guard = LeaveGuard {
        player_id,
        state: Arc::clone(&state),
    };

    // --- Step 4: message loop ---
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode client message");
                let _ = tx.send(error_message(format!("invalid message: {e}")));
                continue;
            }
        };

        let Some(action) = PlayerAction::from_client(msg) else {
            let _ = tx.send(error_message("already joined"));
            continue;
        };

        // PERF: one manager lock per input. Caching the room handle per
        // connection would avoid it.
        let routed = state.rooms.lock().await.route(player_id, action).await;
        match routed {
            Ok(()) => {}
            Err(RoomError::NotInRoom(_)) => {
                let _ = tx.send(error_message("no match in progress"));
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "route failed");
                let _ = tx.send(error_message(e.to_string()));
            }
        }
    }

    writer.abort();
    // _guard drops here → manager.leave fires.
    Ok(())
}

/// Waits for the `join` message, giving up after [`JOIN_TIMEOUT`].
async fn await_join(conn: &WebSocketConnection, state: &ServerState) -> Result<Option<String>, MazeDuelError> {
    match tokio::time::timeout(JOIN_TIMEOUT, read_join(conn, state)).await {
        Ok(result) => result,
        Err(_) => {
            let _ = send_direct(conn, state, &error_message("join timed out")).await;
            Err(ProtocolError::InvalidMessage("join timed out".into()).into())
        }
    }
}

/// Reads frames until a valid `join` arrives, replying `error` to
/// anything else.
async fn read_join(conn: &WebSocketConnection, state: &ServerState) -> Result<Option<String>, MazeDuelError> {
    loop {
        let Some(data) = conn.recv().await? else {
            return Err(ProtocolError::InvalidMessage("connection closed before join".into()).into());
        };
        match state.codec.decode::<ClientMessage>(&data) {
            Ok(ClientMessage::Join { name }) => return Ok(name),
            Ok(_) => send_direct(conn, state, &error_message("join first")).await?,
            Err(e) => {
                tracing::debug!(conn_id = %conn.id(), error = %e, "failed to decode join");
                send_direct(conn, state, &error_message(format!("invalid message: {e}"))).await?;
            }
        }
    }
}

/// Encodes and forwards everything the room or the handler queues for
/// this player. Ends when every sender is gone or the socket breaks.
fn spawn_writer(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = send_direct(&conn, &state, &msg).await {
                tracing::debug!(conn_id = %conn.id(), error = %e, "outbound send failed");
                break;
            }
        }
    })
}

async fn send_direct(conn: &WebSocketConnection, state: &ServerState, msg: &ServerMessage) -> Result<(), MazeDuelError> {
    let bytes = state.codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}

fn error_message(message: impl Into<String>) -> ServerMessage {
    ServerMessage::Error {
        message: message.into(),
    }
}
