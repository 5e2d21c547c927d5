//! Room actor: an isolated Tokio task that owns one match.
//!
//! The actor is the only thing that touches its [`RoomEngine`]. Player
//! input arrives through an mpsc channel and is queued; the engine only
//! advances when the tick scheduler fires, so every state change happens
//! at a tick boundary.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use mazeduel_protocol::{Phase, PlayerId, Recipient, RoomId, ServerMessage};
use mazeduel_tick::{TickConfig, TickScheduler};
use tokio::sync::{mpsc, oneshot};

use crate::{Outbound, PlayerAction, RoomEngine, RoomError};

/// Channel for delivering outbound messages to one player's connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

pub(crate) enum RoomCommand {
    /// Queue an action for the next tick.
    Action {
        player_id: PlayerId,
        action: PlayerAction,
    },

    /// A player disconnected. Ends the match.
    Leave { player_id: PlayerId },

    GetInfo { reply: oneshot::Sender<RoomInfo> },

    Shutdown,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub players: Vec<PlayerId>,
    /// Ticks the engine has run.
    pub tick: u64,
    pub phase: Phase,
    pub carrier: Option<PlayerId>,
    pub ended: bool,
}

/// Handle to a running room actor.
///
/// Cheap to clone. The [`RoomManager`](crate::RoomManager) keeps one per room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Queues a move or an answer (fire-and-forget).
    pub async fn send_action(&self, player_id: PlayerId, action: PlayerAction) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Action { player_id, action })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Tells the room a player is gone.
    pub async fn leave(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Leave { player_id })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::GetInfo { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.room_id))
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

struct RoomActor {
    room_id: RoomId,
    engine: RoomEngine,
    senders: HashMap<PlayerId, PlayerSender>,
    scheduler: TickScheduler,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(
            room_id = %self.room_id,
            rate_hz = self.scheduler.tick_rate_hz(),
            "room actor started"
        );
        self.dispatch(self.engine.start_messages(now()));

        while !self.engine.is_ended() {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                _ = self.scheduler.wait_for_tick() => {
                    let at = now();
                    let engine = &mut self.engine;
                    let result = panic::catch_unwind(AssertUnwindSafe(|| engine.tick(at)));
                    self.scheduler.record_tick_end();
                    match result {
                        Ok(Ok(out)) => self.dispatch(out),
                        Ok(Err(e)) => {
                            tracing::error!(room_id = %self.room_id, error = %e, "room crashed");
                            self.crash();
                            break;
                        }
                        Err(_) => {
                            tracing::error!(room_id = %self.room_id, "room tick panicked");
                            self.crash();
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(
            room_id = %self.room_id,
            ticks = self.engine.tick_count(),
            "room actor stopped"
        );
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Action { player_id, action } => {
                if let Err(e) = self.engine.enqueue(player_id, action) {
                    tracing::warn!(room_id = %self.room_id, %player_id, error = %e, "action rejected");
                }
            }
            RoomCommand::Leave { player_id } => {
                let out = self.engine.disconnect(player_id);
                self.senders.remove(&player_id);
                self.dispatch(out);
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room_id = %self.room_id, "room shutting down");
                return false;
            }
        }
        true
    }

    fn crash(&self) {
        self.dispatch(vec![(
            Recipient::All,
            ServerMessage::Error {
                message: "room crashed".into(),
            },
        )]);
    }

    fn dispatch(&self, msgs: Vec<Outbound>) {
        for (recipient, msg) in msgs {
            match recipient {
                Recipient::All => {
                    for sender in self.senders.values() {
                        let _ = sender.send(msg.clone());
                    }
                }
                Recipient::Player(pid) => {
                    if let Some(sender) = self.senders.get(&pid) {
                        let _ = sender.send(msg);
                    }
                }
            }
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id,
            players: self.engine.players().iter().map(|p| p.id()).collect(),
            tick: self.engine.tick_count(),
            phase: self.engine.phase(),
            carrier: self.engine.carrier(),
            ended: self.engine.is_ended(),
        }
    }
}

/// The engine's clock. Follows Tokio's so paused-time tests drive stuns
/// and question timeouts.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

/// Spawns a room actor and returns a handle to it.
///
/// The actor sends `start` to both players right away, then ticks until
/// the match ends, a player leaves, or it is shut down.
pub fn spawn_room(
    engine: RoomEngine,
    senders: HashMap<PlayerId, PlayerSender>,
    tick_config: TickConfig,
    channel_size: usize,
) -> RoomHandle {
    let room_id = engine.room_id();
    let (tx, rx) = mpsc::channel(channel_size);
    let actor = RoomActor {
        room_id,
        engine,
        senders,
        scheduler: TickScheduler::new(tick_config),
        receiver: rx,
    };
    tokio::spawn(actor.run());
    RoomHandle { room_id, sender: tx }
}
