//! The authoritative rules of one match.
//!
//! [`RoomEngine`] owns everything a match needs (map, players, question
//! pool, quiz timers) and advances it one tick at a time. It never
//! touches a clock or a channel: the caller supplies `now` and delivers
//! the returned messages. Each tick runs in a fixed order:
//!
//! 0. expire questions whose deadline has passed (unlock + stun),
//! 1. apply up to `input_cap` queued actions per player, seat by seat,
//! 2. resolve treasure pickup, then steal, then win,
//! 3. broadcast `state`, unless the match just ended.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::time::{Duration, Instant};

use mazeduel_mapgen::{GameMap, QuestionPool, carve_return_corridor};
use mazeduel_protocol::{
    ClientMessage, Direction, EndReason, EventName, Phase, PlayerId, PlayerView, Position,
    QuestionId, QuestionMeta, Recipient, RoomId, ServerMessage, StateView, Tile,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::{RoomConfig, RoomError};

/// A message and who should get it.
pub type Outbound = (Recipient, ServerMessage);

/// A queued in-game request from a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerAction {
    Move(Direction),
    Answer { qid: QuestionId, choice: usize },
}

impl PlayerAction {
    /// `None` for `join`, which is handled before any room exists.
    pub fn from_client(msg: ClientMessage) -> Option<Self> {
        match msg {
            ClientMessage::Join { .. } => None,
            ClientMessage::Input { dir } => Some(Self::Move(dir)),
            ClientMessage::Answer { qid, choice } => Some(Self::Answer { qid, choice }),
        }
    }
}

/// Whether a player is waiting on a question.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QuizStatus {
    #[default]
    Unlocked,
    /// Frozen in place until `question_id` is answered or times out.
    Locked { question_id: QuestionId },
}

impl QuizStatus {
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    /// The question the player must answer, if any.
    pub fn active(&self) -> Option<&QuestionId> {
        match self {
            Self::Locked { question_id } => Some(question_id),
            Self::Unlocked => None,
        }
    }
}

/// One of the two players in a match.
#[derive(Debug)]
pub struct Player {
    id: PlayerId,
    name: String,
    pos: Position,
    start: Position,
    carrying: bool,
    quiz: QuizStatus,
    stun_until: Option<Instant>,
    /// Set when the player changed cell during the current tick.
    moved: bool,
    inbox: VecDeque<PlayerAction>,
}

impl Player {
    fn new(id: PlayerId, name: String, start: Position) -> Self {
        Self {
            id,
            name,
            pos: start,
            start,
            carrying: false,
            quiz: QuizStatus::Unlocked,
            stun_until: None,
            moved: false,
            inbox: VecDeque::new(),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn is_carrying(&self) -> bool {
        self.carrying
    }

    pub fn quiz(&self) -> &QuizStatus {
        &self.quiz
    }

    pub fn is_stunned(&self, now: Instant) -> bool {
        self.stun_until.is_some_and(|until| now < until)
    }

    pub fn pending_inputs(&self) -> usize {
        self.inbox.len()
    }

    fn view(&self, now: Instant) -> PlayerView {
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            pos: self.pos,
            start: self.start,
            has_treasure: self.carrying,
            locked: self.quiz.is_locked(),
            stun_ms: self
                .stun_until
                .map_or(0, |until| until.saturating_duration_since(now).as_millis() as u64),
        }
    }
}

/// The state machine of one two-player match.
pub struct RoomEngine {
    room_id: RoomId,
    input_cap: usize,
    max_pending_inputs: usize,
    stun: Duration,
    return_toggles: usize,

    map: GameMap,
    players: Vec<Player>,
    phase: Phase,
    carrier: Option<PlayerId>,
    tick: u64,
    ended: bool,

    pool: Box<dyn QuestionPool>,
    /// Min-heap of question deadlines. Entries whose id no longer matches
    /// the player's active question are discarded when they come due.
    timers: BinaryHeap<Reverse<(Instant, PlayerId, QuestionId)>>,
    /// Drives the return-corridor shake-up.
    rng: StdRng,
}

impl RoomEngine {
    /// `players[i]` starts at `map.starts[i]`.
    pub fn new(
        room_id: RoomId,
        config: &RoomConfig,
        map: GameMap,
        players: [(PlayerId, String); 2],
        pool: Box<dyn QuestionPool>,
        seed: u64,
    ) -> Self {
        let players = players
            .into_iter()
            .zip(map.starts)
            .map(|((id, name), start)| Player::new(id, name, start))
            .collect();
        Self {
            room_id,
            input_cap: config.input_cap,
            max_pending_inputs: config.max_pending_inputs,
            stun: config.stun,
            return_toggles: config.map.return_toggles,
            map,
            players,
            phase: Phase::Search,
            carrier: None,
            tick: 0,
            ended: false,
            pool,
            timers: BinaryHeap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn carrier(&self) -> Option<PlayerId> {
        self.carrier
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn map(&self) -> &GameMap {
        &self.map
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// The `start` message for each player.
    pub fn start_messages(&self, now: Instant) -> Vec<Outbound> {
        let map = self.map.view();
        let state = self.state_view(now);
        self.players
            .iter()
            .map(|p| {
                (
                    Recipient::Player(p.id),
                    ServerMessage::Start {
                        player_id: p.id,
                        room_id: self.room_id,
                        map: map.clone(),
                        state: state.clone(),
                    },
                )
            })
            .collect()
    }

    pub fn state_view(&self, now: Instant) -> StateView {
        StateView {
            tick: self.tick,
            phase: self.phase,
            players: self.players.iter().map(|p| p.view(now)).collect(),
            treasure: self.map.treasure,
            carrier: self.carrier,
        }
    }

    /// Queues an action for the next tick.
    ///
    /// Returns `Ok(false)` when the player's inbox is full and the action
    /// was dropped.
    pub fn enqueue(&mut self, player_id: PlayerId, action: PlayerAction) -> Result<bool, RoomError> {
        let limit = self.max_pending_inputs;
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or(RoomError::NotInRoom(player_id))?;
        if player.inbox.len() >= limit {
            tracing::debug!(room_id = %self.room_id, %player_id, "inbox full, dropping input");
            return Ok(false);
        }
        player.inbox.push_back(action);
        Ok(true)
    }

    /// Advances the match by one tick.
    ///
    /// # Errors
    /// [`RoomError::Internal`] if the carrier id no longer names a player.
    /// The room should be torn down.
    pub fn tick(&mut self, now: Instant) -> Result<Vec<Outbound>, RoomError> {
        let mut out = Vec::new();
        if self.ended {
            return Ok(out);
        }
        self.tick += 1;

        self.expire_questions(now);

        for player in &mut self.players {
            player.moved = false;
        }
        for seat in 0..self.players.len() {
            self.drain_inputs(seat, now, &mut out);
        }

        self.resolve(&mut out)?;

        if !self.ended {
            out.push((Recipient::All, ServerMessage::State(self.state_view(now))));
        }
        Ok(out)
    }

    /// Ends the match because `player_id` left. Nobody wins.
    pub fn disconnect(&mut self, player_id: PlayerId) -> Vec<Outbound> {
        if self.ended {
            return Vec::new();
        }
        self.ended = true;
        tracing::info!(room_id = %self.room_id, %player_id, "player left, match over");
        vec![(
            Recipient::All,
            ServerMessage::End {
                winner: None,
                reason: EndReason::Disconnect,
            },
        )]
    }

    fn expire_questions(&mut self, now: Instant) {
        while self
            .timers
            .peek()
            .is_some_and(|Reverse((deadline, _, _))| *deadline <= now)
        {
            let Some(Reverse((_, player_id, question_id))) = self.timers.pop() else {
                break;
            };
            let Some(player) = self.players.iter_mut().find(|p| p.id == player_id) else {
                continue;
            };
            if player.quiz.active() != Some(&question_id) {
                continue;
            }
            player.quiz = QuizStatus::Unlocked;
            player.stun_until = Some(now + self.stun);
            self.pool.retire(&question_id);
            tracing::debug!(room_id = %self.room_id, %player_id, %question_id, "question timed out");
        }
    }

    fn drain_inputs(&mut self, seat: usize, now: Instant, out: &mut Vec<Outbound>) {
        for _ in 0..self.input_cap {
            let Some(action) = self.players[seat].inbox.pop_front() else {
                break;
            };
            match action {
                PlayerAction::Move(dir) => self.apply_move(seat, dir, now, out),
                PlayerAction::Answer { qid, choice } => self.apply_answer(seat, &qid, choice, now),
            }
        }
    }

    fn apply_move(&mut self, seat: usize, dir: Direction, now: Instant, out: &mut Vec<Outbound>) {
        let player = &mut self.players[seat];
        if player.quiz.is_locked() || player.is_stunned(now) {
            tracing::trace!(room_id = %self.room_id, player_id = %player.id, "move while frozen ignored");
            return;
        }
        let dest = player.pos.step(dir);
        let Some(tile) = self.map.grid.get(dest).filter(|t| t.is_walkable()) else {
            return;
        };
        player.pos = dest;
        player.moved = true;

        if self.phase == Phase::Search && tile == Tile::Quiz {
            self.trigger_quiz(seat, dest, now, out);
        }
    }

    fn trigger_quiz(&mut self, seat: usize, pos: Position, now: Instant, out: &mut Vec<Outbound>) {
        let Some(tile) = self.map.quiz_tile_mut(pos) else {
            tracing::warn!(room_id = %self.room_id, %pos, "quiz cell without a question");
            return;
        };
        let question = match tile.prepared.take() {
            Some(prepared) => prepared,
            None => self.pool.register(&tile.source),
        };

        let player = &mut self.players[seat];
        player.quiz = QuizStatus::Locked {
            question_id: question.id.clone(),
        };
        let deadline = now + Duration::from_millis(question.timeout_ms);
        self.timers.push(Reverse((deadline, player.id, question.id.clone())));

        tracing::debug!(
            room_id = %self.room_id,
            player_id = %player.id,
            question_id = %question.id,
            %pos,
            "question issued"
        );
        out.push((
            Recipient::Player(player.id),
            ServerMessage::Question {
                qid: question.id,
                prompt: question.prompt,
                choices: question.choices,
                timeout_ms: question.timeout_ms,
                meta: QuestionMeta {
                    category: question.category,
                    difficulty: question.difficulty,
                },
            },
        ));
    }

    fn apply_answer(&mut self, seat: usize, qid: &QuestionId, choice: usize, now: Instant) {
        let player = &mut self.players[seat];
        if player.quiz.active() != Some(qid) {
            tracing::debug!(room_id = %self.room_id, player_id = %player.id, %qid, "stale answer ignored");
            return;
        }
        let correct = self.pool.check(qid, choice);
        player.quiz = QuizStatus::Unlocked;
        if !correct {
            player.stun_until = Some(now + self.stun);
        }
        tracing::debug!(room_id = %self.room_id, player_id = %player.id, correct, "answer checked");
    }

    fn seat_of(&self, id: PlayerId) -> Result<usize, RoomError> {
        self.players
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| RoomError::Internal(format!("carrier {id} is not in room {}", self.room_id)))
    }

    fn resolve(&mut self, out: &mut Vec<Outbound>) -> Result<(), RoomError> {
        if self.carrier.is_none() {
            if let Some(seat) = self.players.iter().position(|p| p.pos == self.map.treasure) {
                self.pick_up(seat, out);
            }
        }

        let Some(carrier_id) = self.carrier else {
            return Ok(());
        };

        // Sharing a cell steals only when someone arrived this tick, so
        // two players standing together never trade the treasure back.
        let carrier_seat = self.seat_of(carrier_id)?;
        let carrier = &self.players[carrier_seat];
        let (carrier_pos, carrier_moved) = (carrier.pos, carrier.moved);
        let mut holder = carrier_seat;
        if let Some(thief) = self
            .players
            .iter()
            .position(|p| p.id != carrier_id && p.pos == carrier_pos && (p.moved || carrier_moved))
        {
            self.players[carrier_seat].carrying = false;
            self.players[thief].carrying = true;
            let thief_id = self.players[thief].id;
            self.carrier = Some(thief_id);
            holder = thief;
            tracing::info!(room_id = %self.room_id, by = %thief_id, from = %carrier_id, "treasure stolen");
            out.push((
                Recipient::All,
                ServerMessage::Event {
                    name: EventName::TreasureStolen,
                    by: thief_id,
                },
            ));
        }

        let carrier = &self.players[holder];
        if carrier.pos == carrier.start {
            let winner = carrier.id;
            self.ended = true;
            tracing::info!(room_id = %self.room_id, %winner, tick = self.tick, "treasure returned, match over");
            out.push((
                Recipient::All,
                ServerMessage::End {
                    winner: Some(winner),
                    reason: EndReason::Treasure,
                },
            ));
        }
        Ok(())
    }

    fn pick_up(&mut self, seat: usize, out: &mut Vec<Outbound>) {
        let player = &mut self.players[seat];
        player.carrying = true;
        let (id, from, home) = (player.id, player.pos, player.start);

        self.carrier = Some(id);
        self.phase = Phase::Return;

        let protected: Vec<Position> = self.players.iter().map(|p| p.pos).collect();
        carve_return_corridor(
            &mut self.map.grid,
            from,
            home,
            &protected,
            self.return_toggles,
            &mut self.rng,
        );

        tracing::info!(room_id = %self.room_id, by = %id, "treasure picked, return phase");
        out.push((
            Recipient::All,
            ServerMessage::Event {
                name: EventName::TreasurePicked,
                by: id,
            },
        ));
        out.push((
            Recipient::All,
            ServerMessage::MapUpdate {
                grid: self.map.grid.rows(),
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_client_maps_game_messages() {
        assert_eq!(
            PlayerAction::from_client(ClientMessage::Input { dir: Direction::Up }),
            Some(PlayerAction::Move(Direction::Up))
        );
        assert_eq!(
            PlayerAction::from_client(ClientMessage::Answer {
                qid: QuestionId("q-1".into()),
                choice: 2
            }),
            Some(PlayerAction::Answer {
                qid: QuestionId("q-1".into()),
                choice: 2
            })
        );
        assert_eq!(PlayerAction::from_client(ClientMessage::Join { name: None }), None);
    }

    #[test]
    fn test_quiz_status_accessors() {
        let locked = QuizStatus::Locked {
            question_id: QuestionId("q-9".into()),
        };
        assert!(locked.is_locked());
        assert_eq!(locked.active(), Some(&QuestionId("q-9".into())));
        assert!(!QuizStatus::default().is_locked());
        assert_eq!(QuizStatus::Unlocked.active(), None);
    }
}
