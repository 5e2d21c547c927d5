//! Room manager: pairs players, builds maps, and routes input to rooms.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use mazeduel_mapgen::{QuestionBank, QuestionCatalog, build_map};
use mazeduel_protocol::{PlayerId, RoomId, ServerMessage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;

use crate::room::spawn_room;
use crate::{PlayerAction, PlayerSender, RoomConfig, RoomEngine, RoomError, RoomHandle};

/// Counter for generating unique room IDs.
static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// What happened to a `join`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Queued. The player got a `waiting` message.
    Waiting,
    /// Paired with the waiting player. Both got `start`.
    Matched(RoomId),
}

/// First half of a join, from [`RoomManager::begin_join`].
pub enum Pairing {
    /// The player took the waiting slot.
    Waiting,
    /// Two players are paired and their map still has to be built.
    Ready(PendingRoom),
}

struct Seat {
    player_id: PlayerId,
    name: String,
    sender: PlayerSender,
}

/// A paired match whose map has not been built yet.
///
/// Building needs no manager state, so callers sharing the manager behind
/// a lock can run [`PendingRoom::build`] with the lock released.
pub struct PendingRoom {
    room_id: RoomId,
    config: RoomConfig,
    catalog: Arc<QuestionCatalog>,
    seats: [Seat; 2],
}

impl PendingRoom {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Builds the map on a blocking thread and wraps it in an engine.
    pub async fn build(&self) -> Result<RoomEngine, RoomError> {
        let seed: u64 = rand::rng().random();
        let catalog = Arc::clone(&self.catalog);
        let config = self.config.clone();

        let (map, pool) = tokio::task::spawn_blocking(move || {
            let mut pool = QuestionBank::new(catalog, seed).with_timeout(config.question_timeout_ms);
            let mut rng = StdRng::seed_from_u64(seed);
            build_map(&config.map, &mut pool, &mut rng).map(|map| (map, pool))
        })
        .await
        .map_err(|e| RoomError::Internal(format!("map generation task failed: {e}")))??;

        tracing::debug!(room_id = %self.room_id, seed, quiz = map.quiz_tiles.len(), "map ready");
        let players = self.seats.each_ref().map(|s| (s.player_id, s.name.clone()));
        Ok(RoomEngine::new(
            self.room_id,
            &self.config,
            map,
            players,
            Box::new(pool),
            seed.rotate_left(17),
        ))
    }
}

/// Tracks the waiting slot and every running room.
///
/// A player is in at most one place at a time: the waiting slot, a match
/// whose map is being built, or exactly one room.
pub struct RoomManager {
    config: RoomConfig,
    catalog: Arc<QuestionCatalog>,
    waiting: Option<Seat>,
    rooms: HashMap<RoomId, RoomHandle>,
    player_rooms: HashMap<PlayerId, RoomId>,
    /// Players whose map is being built, and whether they left meanwhile.
    pending: HashMap<PlayerId, bool>,
}

impl RoomManager {
    pub fn new(config: RoomConfig, catalog: Arc<QuestionCatalog>) -> Self {
        Self {
            config,
            catalog,
            waiting: None,
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Queues a player, or pairs them with the one already waiting, and
    /// starts the room.
    ///
    /// Holds `&mut self` while the map is built. When the manager is
    /// shared, use [`join_shared`] so other players are not held up.
    ///
    /// # Errors
    /// See [`begin_join`](Self::begin_join) and
    /// [`finish_join`](Self::finish_join).
    pub async fn join(
        &mut self,
        player_id: PlayerId,
        name: Option<String>,
        sender: PlayerSender,
    ) -> Result<JoinOutcome, RoomError> {
        match self.begin_join(player_id, name, sender)? {
            Pairing::Waiting => Ok(JoinOutcome::Waiting),
            Pairing::Ready(pending) => {
                let built = pending.build().await;
                self.finish_join(pending, built).await
            }
        }
    }

    /// Queues a player, or pairs them with the one already waiting.
    ///
    /// Pairing is first-come first-served: the waiting player takes seat
    /// 0 (top-left start), the newcomer seat 1. A waiting player whose
    /// connection has gone away is replaced instead of matched.
    ///
    /// # Errors
    /// [`RoomError::AlreadyJoined`] if the player is waiting, being
    /// paired, or playing.
    pub fn begin_join(
        &mut self,
        player_id: PlayerId,
        name: Option<String>,
        sender: PlayerSender,
    ) -> Result<Pairing, RoomError> {
        self.reap();
        if self.is_waiting(player_id)
            || self.pending.contains_key(&player_id)
            || self.player_rooms.contains_key(&player_id)
        {
            return Err(RoomError::AlreadyJoined(player_id));
        }
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("player-{}", player_id.0));
        let newcomer = Seat {
            player_id,
            name,
            sender,
        };

        let opponent = match self.waiting.take() {
            Some(w) if !w.sender.is_closed() => w,
            stale => {
                if let Some(w) = stale {
                    tracing::debug!(player_id = %w.player_id, "dropping stale waiting player");
                }
                let _ = newcomer.sender.send(ServerMessage::Waiting { player_id });
                tracing::info!(%player_id, name = %newcomer.name, "player waiting for an opponent");
                self.waiting = Some(newcomer);
                return Ok(Pairing::Waiting);
            }
        };

        self.pending.insert(opponent.player_id, false);
        self.pending.insert(player_id, false);
        Ok(Pairing::Ready(PendingRoom {
            room_id: RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed)),
            config: self.config.clone(),
            catalog: Arc::clone(&self.catalog),
            seats: [opponent, newcomer],
        }))
    }

    /// Starts the room for a built match.
    ///
    /// A player who left while the map was being built is removed from
    /// the fresh room at once, which ends it for the other player.
    ///
    /// # Errors
    /// [`RoomError::MapGeneration`] (or [`RoomError::Internal`]) if the
    /// build failed. Both players get an `error` message and neither is
    /// kept.
    pub async fn finish_join(
        &mut self,
        pending: PendingRoom,
        built: Result<RoomEngine, RoomError>,
    ) -> Result<JoinOutcome, RoomError> {
        let room_id = pending.room_id;
        let left: Vec<PlayerId> = pending
            .seats
            .iter()
            .filter(|s| self.pending.remove(&s.player_id).unwrap_or(false))
            .map(|s| s.player_id)
            .collect();

        let engine = match built {
            Ok(engine) => engine,
            Err(e) => {
                tracing::error!(%room_id, error = %e, "could not start room");
                let msg = ServerMessage::Error {
                    message: format!("could not start match: {e}"),
                };
                for seat in &pending.seats {
                    let _ = seat.sender.send(msg.clone());
                }
                return Err(e);
            }
        };

        let [first, second] = pending.seats;
        let (first_id, second_id) = (first.player_id, second.player_id);
        let senders = HashMap::from([(first_id, first.sender), (second_id, second.sender)]);
        let handle = spawn_room(engine, senders, self.config.tick_config(), DEFAULT_CHANNEL_SIZE);
        tracing::info!(%room_id, first = %first_id, second = %second_id, "room created");

        if let Some(&gone) = left.first() {
            tracing::info!(%room_id, player_id = %gone, "player left before the room started");
            if let Err(e) = handle.leave(gone).await {
                tracing::debug!(%room_id, error = %e, "room already gone");
            }
            return Ok(JoinOutcome::Matched(room_id));
        }

        self.rooms.insert(room_id, handle);
        self.player_rooms.insert(first_id, room_id);
        self.player_rooms.insert(second_id, room_id);
        Ok(JoinOutcome::Matched(room_id))
    }

    /// Removes a player from the waiting slot or ends their match.
    ///
    /// Leaving a room ends it for both players, so the room and its
    /// other player are forgotten too.
    pub async fn leave(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if self.is_waiting(player_id) {
            self.waiting = None;
            tracing::info!(%player_id, "waiting player left");
            return Ok(());
        }
        if let Some(left) = self.pending.get_mut(&player_id) {
            *left = true;
            tracing::info!(%player_id, "player left while their match was being built");
            return Ok(());
        }

        let room_id = self
            .player_rooms
            .remove(&player_id)
            .ok_or(RoomError::NotInRoom(player_id))?;
        self.player_rooms.retain(|_, rid| *rid != room_id);

        if let Some(handle) = self.rooms.remove(&room_id) {
            // The room may already have stopped after a win.
            if let Err(e) = handle.leave(player_id).await {
                tracing::debug!(%room_id, %player_id, error = %e, "room already gone");
            }
        }
        tracing::info!(%room_id, %player_id, "player left room");
        Ok(())
    }

    /// Forwards an in-game action to the player's room.
    pub async fn route(&self, player_id: PlayerId, action: PlayerAction) -> Result<(), RoomError> {
        let room_id = self
            .player_rooms
            .get(&player_id)
            .ok_or(RoomError::NotInRoom(player_id))?;
        let handle = self.rooms.get(room_id).ok_or(RoomError::NotFound(*room_id))?;
        handle.send_action(player_id, action).await
    }

    /// Forgets rooms whose actor has stopped. Returns how many.
    pub fn reap(&mut self) -> usize {
        let closed: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(_, h)| h.is_closed())
            .map(|(id, _)| *id)
            .collect();
        for room_id in &closed {
            self.rooms.remove(room_id);
            self.player_rooms.retain(|_, rid| rid != room_id);
            tracing::debug!(%room_id, "room reaped");
        }
        closed.len()
    }

    pub fn room(&self, room_id: RoomId) -> Option<&RoomHandle> {
        self.rooms.get(&room_id)
    }

    pub fn player_room(&self, player_id: PlayerId) -> Option<RoomId> {
        self.player_rooms.get(&player_id).copied()
    }

    pub fn is_waiting(&self, player_id: PlayerId) -> bool {
        self.waiting.as_ref().is_some_and(|w| w.player_id == player_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// [`RoomManager::join`] for a manager shared behind a lock.
///
/// The lock is released while the map is built, so routing for running
/// rooms keeps flowing during a slow build.
pub async fn join_shared(
    rooms: &Mutex<RoomManager>,
    player_id: PlayerId,
    name: Option<String>,
    sender: PlayerSender,
) -> Result<JoinOutcome, RoomError> {
    let pairing = rooms.lock().await.begin_join(player_id, name, sender)?;
    match pairing {
        Pairing::Waiting => Ok(JoinOutcome::Waiting),
        Pairing::Ready(pending) => {
            let built = pending.build().await;
            rooms.lock().await.finish_join(pending, built).await
        }
    }
}
