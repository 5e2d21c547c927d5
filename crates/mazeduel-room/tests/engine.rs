//! Rule tests for the room engine on small hand-drawn maps.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mazeduel_mapgen::{GameMap, Grid, Question, QuestionBank, QuestionCatalog, QuizTile};
use mazeduel_protocol::{
    Category, Direction, EndReason, EventName, Phase, PlayerId, Position, QuestionId, Recipient,
    RoomId, ServerMessage,
};
use mazeduel_room::{Outbound, PlayerAction, RoomConfig, RoomEngine, RoomError};

const P1: PlayerId = PlayerId(1);
const P2: PlayerId = PlayerId(2);

// =========================================================================
// Fixtures
// =========================================================================

/// ```text
/// #######
/// #1.T.2#   starts (1,1) and (5,1), treasure (3,1)
/// #.###.#
/// #..?..#   quiz (3,3)
/// #######
/// ```
fn duel_map() -> GameMap {
    let grid = Grid::from_ascii(&["#######", "#.....#", "#.###.#", "#..?..#", "#######"]).unwrap();
    GameMap {
        grid,
        starts: [Position::new(1, 1), Position::new(5, 1)],
        treasure: Position::new(3, 1),
        quiz_tiles: vec![QuizTile {
            position: Position::new(3, 3),
            category: Category::Math,
            target_difficulty: 1,
            source: Question {
                category: Category::Math,
                difficulty: 1,
                prompt: "pick b".into(),
                choices: vec!["a".into(), "b".into()],
                correct_index: 1,
            },
            prepared: None,
        }],
    }
}

/// A long corridor with the treasure down a side branch.
fn corridor_map() -> GameMap {
    let grid = Grid::from_ascii(&[
        "###############",
        "#.............#",
        "#######.#######",
        "#######.#######",
        "###############",
    ])
    .unwrap();
    GameMap {
        grid,
        starts: [Position::new(1, 1), Position::new(13, 1)],
        treasure: Position::new(7, 3),
        quiz_tiles: vec![],
    }
}

fn config() -> RoomConfig {
    let mut config = RoomConfig::default();
    config.map.return_toggles = 0;
    config
}

fn engine_on(map: GameMap) -> RoomEngine {
    let pool = QuestionBank::new(Arc::new(QuestionCatalog::builtin()), 0);
    RoomEngine::new(
        RoomId(7),
        &config(),
        map,
        [(P1, "ada".into()), (P2, "bob".into())],
        Box::new(pool),
        42,
    )
}

fn push_moves(engine: &mut RoomEngine, player: PlayerId, dirs: &[Direction]) {
    for &dir in dirs {
        assert!(engine.enqueue(player, PlayerAction::Move(dir)).unwrap());
    }
}

fn answer(engine: &mut RoomEngine, player: PlayerId, qid: &QuestionId, choice: usize) {
    let action = PlayerAction::Answer {
        qid: qid.clone(),
        choice,
    };
    assert!(engine.enqueue(player, action).unwrap());
}

fn events(out: &[Outbound]) -> Vec<(EventName, PlayerId)> {
    out.iter()
        .filter_map(|(_, msg)| match msg {
            ServerMessage::Event { name, by } => Some((*name, *by)),
            _ => None,
        })
        .collect()
}

fn question(out: &[Outbound]) -> Option<(Recipient, QuestionId)> {
    out.iter().find_map(|(to, msg)| match msg {
        ServerMessage::Question { qid, .. } => Some((*to, qid.clone())),
        _ => None,
    })
}

fn pos(engine: &RoomEngine, player: PlayerId) -> Position {
    engine.player(player).unwrap().pos()
}

/// Walks P1 from its start onto the quiz tile in one tick.
fn walk_p1_to_quiz(engine: &mut RoomEngine, now: Instant) -> QuestionId {
    use Direction::*;
    push_moves(engine, P1, &[Down, Down, Right, Right]);
    let out = engine.tick(now).unwrap();
    let (to, qid) = question(&out).expect("question issued");
    assert_eq!(to, Recipient::Player(P1));
    assert_eq!(pos(engine, P1), Position::new(3, 3));
    qid
}

// =========================================================================
// Start and movement
// =========================================================================

#[test]
fn test_start_messages_are_private_and_complete() {
    let engine = engine_on(duel_map());
    let out = engine.start_messages(Instant::now());
    assert_eq!(out.len(), 2);

    for (player, (to, msg)) in [P1, P2].into_iter().zip(&out) {
        assert_eq!(*to, Recipient::Player(player));
        let ServerMessage::Start {
            player_id,
            room_id,
            map,
            state,
        } = msg
        else {
            panic!("expected start, got {msg:?}");
        };
        assert_eq!(*player_id, player);
        assert_eq!(*room_id, RoomId(7));
        assert_eq!(map.quiz, vec![Position::new(3, 3)]);
        assert_eq!(map.treasure, Position::new(3, 1));
        assert_eq!(state.tick, 0);
        assert_eq!(state.phase, Phase::Search);
        assert_eq!(state.players[0].pos, Position::new(1, 1));
        assert_eq!(state.players[1].pos, Position::new(5, 1));
        assert_eq!(state.players[1].name, "bob");
    }
}

#[test]
fn test_moves_apply_and_walls_block() {
    use Direction::*;
    let mut engine = engine_on(duel_map());
    let now = Instant::now();

    push_moves(&mut engine, P1, &[Right, Up]);
    let out = engine.tick(now).unwrap();
    assert_eq!(pos(&engine, P1), Position::new(2, 1));
    match out.last() {
        Some((Recipient::All, ServerMessage::State(state))) => assert_eq!(state.tick, 1),
        other => panic!("expected a state broadcast, got {other:?}"),
    }

    push_moves(&mut engine, P1, &[Left, Left]);
    engine.tick(now).unwrap();
    assert_eq!(pos(&engine, P1), Position::new(1, 1));
    assert_eq!(pos(&engine, P2), Position::new(5, 1));
}

#[test]
fn test_enqueue_for_stranger_fails() {
    let mut engine = engine_on(duel_map());
    let result = engine.enqueue(PlayerId(99), PlayerAction::Move(Direction::Up));
    assert!(matches!(result, Err(RoomError::NotInRoom(PlayerId(99)))));
}

#[test]
fn test_input_cap_spreads_moves_over_ticks() {
    let mut engine = engine_on(corridor_map());
    let now = Instant::now();

    push_moves(&mut engine, P1, &[Direction::Right; 10]);
    engine.tick(now).unwrap();
    assert_eq!(pos(&engine, P1), Position::new(7, 1));
    assert_eq!(engine.player(P1).unwrap().pending_inputs(), 4);

    engine.tick(now).unwrap();
    assert_eq!(pos(&engine, P1), Position::new(11, 1));
    assert_eq!(engine.player(P1).unwrap().pending_inputs(), 0);
}

#[test]
fn test_inbox_overflow_drops_inputs() {
    let mut engine = engine_on(corridor_map());
    let accepted = (0..70)
        .filter(|_| engine.enqueue(P2, PlayerAction::Move(Direction::Left)).unwrap())
        .count();
    assert_eq!(accepted, 64);
    assert_eq!(engine.player(P2).unwrap().pending_inputs(), 64);
}

// =========================================================================
// Treasure
// =========================================================================

#[test]
fn test_pickup_switches_phase_and_updates_map() {
    use Direction::*;
    let mut engine = engine_on(duel_map());

    push_moves(&mut engine, P1, &[Right, Right]);
    let out = engine.tick(Instant::now()).unwrap();

    assert_eq!(events(&out), vec![(EventName::TreasurePicked, P1)]);
    let picked = out
        .iter()
        .position(|(_, m)| matches!(m, ServerMessage::Event { .. }))
        .unwrap();
    assert!(matches!(out[picked + 1].1, ServerMessage::MapUpdate { .. }));
    assert_eq!(engine.phase(), Phase::Return);
    assert_eq!(engine.carrier(), Some(P1));
    assert!(engine.player(P1).unwrap().is_carrying());
}

#[test]
fn test_win_ends_with_single_end_and_no_state() {
    use Direction::*;
    let mut engine = engine_on(duel_map());
    let now = Instant::now();

    push_moves(&mut engine, P1, &[Right, Right]);
    engine.tick(now).unwrap();
    push_moves(&mut engine, P1, &[Left, Left]);
    let out = engine.tick(now).unwrap();

    assert_eq!(
        out,
        vec![(
            Recipient::All,
            ServerMessage::End {
                winner: Some(P1),
                reason: EndReason::Treasure
            }
        )]
    );
    assert!(engine.is_ended());

    push_moves(&mut engine, P2, &[Left]);
    assert!(engine.tick(now).unwrap().is_empty());
    assert_eq!(engine.tick_count(), 2);
}

#[test]
fn test_moving_onto_carrier_steals_once() {
    use Direction::*;
    let mut engine = engine_on(duel_map());
    let now = Instant::now();

    push_moves(&mut engine, P1, &[Right, Right]);
    engine.tick(now).unwrap();

    push_moves(&mut engine, P2, &[Left, Left]);
    let out = engine.tick(now).unwrap();
    assert_eq!(events(&out), vec![(EventName::TreasureStolen, P2)]);
    assert_eq!(engine.carrier(), Some(P2));
    assert!(engine.player(P2).unwrap().is_carrying());
    assert!(!engine.player(P1).unwrap().is_carrying());

    // Sharing the cell on the next tick without moving steals nothing.
    let out = engine.tick(now).unwrap();
    assert!(events(&out).is_empty());

    push_moves(&mut engine, P2, &[Right, Right]);
    let out = engine.tick(now).unwrap();
    assert!(matches!(
        out.as_slice(),
        [(_, ServerMessage::End { winner: Some(P2), reason: EndReason::Treasure })]
    ));
}

#[test]
fn test_carrier_walking_into_still_player_loses_treasure() {
    use Direction::*;
    let mut engine = engine_on(duel_map());
    let now = Instant::now();

    push_moves(&mut engine, P1, &[Right, Right]);
    push_moves(&mut engine, P2, &[Left]);
    engine.tick(now).unwrap();
    assert_eq!(engine.carrier(), Some(P1));

    push_moves(&mut engine, P1, &[Right]);
    let out = engine.tick(now).unwrap();
    assert_eq!(pos(&engine, P1), pos(&engine, P2));
    assert_eq!(events(&out), vec![(EventName::TreasureStolen, P2)]);
    assert_eq!(engine.carrier(), Some(P2));
    assert!(!engine.player(P1).unwrap().is_carrying());

    // Neither moves: the treasure stays put.
    let out = engine.tick(now).unwrap();
    assert!(events(&out).is_empty());
    assert_eq!(engine.carrier(), Some(P2));
}

// =========================================================================
// Quiz tiles
// =========================================================================

#[test]
fn test_locked_player_ignores_moves_and_stale_answers() {
    let mut engine = engine_on(duel_map());
    let now = Instant::now();
    let qid = walk_p1_to_quiz(&mut engine, now);
    assert!(engine.player(P1).unwrap().quiz().is_locked());

    push_moves(&mut engine, P1, &[Direction::Right]);
    answer(&mut engine, P1, &QuestionId("q-stale".into()), 1);
    engine.tick(now).unwrap();
    assert_eq!(pos(&engine, P1), Position::new(3, 3));
    assert_eq!(engine.player(P1).unwrap().quiz().active(), Some(&qid));

    answer(&mut engine, P1, &qid, 1);
    push_moves(&mut engine, P1, &[Direction::Right]);
    engine.tick(now).unwrap();
    let p1 = engine.player(P1).unwrap();
    assert!(!p1.quiz().is_locked());
    assert!(!p1.is_stunned(now));
    assert_eq!(p1.pos(), Position::new(4, 3));
}

#[test]
fn test_wrong_answer_stuns() {
    let mut engine = engine_on(duel_map());
    let t0 = Instant::now();
    let qid = walk_p1_to_quiz(&mut engine, t0);

    answer(&mut engine, P1, &qid, 0);
    let out = engine.tick(t0).unwrap();
    let Some((_, ServerMessage::State(state))) = out.last() else {
        panic!("expected state");
    };
    assert!(!state.players[0].locked);
    assert_eq!(state.players[0].stun_ms, 2000);

    push_moves(&mut engine, P1, &[Direction::Right]);
    engine.tick(t0 + Duration::from_secs(1)).unwrap();
    assert_eq!(pos(&engine, P1), Position::new(3, 3));

    push_moves(&mut engine, P1, &[Direction::Right]);
    engine.tick(t0 + Duration::from_secs(2)).unwrap();
    assert_eq!(pos(&engine, P1), Position::new(4, 3));
}

#[test]
fn test_timeout_unlocks_and_stuns() {
    let mut engine = engine_on(duel_map());
    let t0 = Instant::now();
    let qid = walk_p1_to_quiz(&mut engine, t0);

    engine.tick(t0 + Duration::from_millis(7_999)).unwrap();
    assert!(engine.player(P1).unwrap().quiz().is_locked());

    let expired_at = t0 + Duration::from_secs(8);
    engine.tick(expired_at).unwrap();
    let p1 = engine.player(P1).unwrap();
    assert!(!p1.quiz().is_locked());
    assert!(p1.is_stunned(expired_at));

    // Too late: the id is gone, so even the right choice changes nothing.
    answer(&mut engine, P1, &qid, 1);
    push_moves(&mut engine, P1, &[Direction::Right]);
    let t9 = t0 + Duration::from_secs(9);
    engine.tick(t9).unwrap();
    assert!(engine.player(P1).unwrap().is_stunned(t9));
    assert_eq!(pos(&engine, P1), Position::new(3, 3));

    push_moves(&mut engine, P1, &[Direction::Right]);
    engine.tick(t0 + Duration::from_secs(10)).unwrap();
    assert_eq!(pos(&engine, P1), Position::new(4, 3));
}

#[test]
fn test_revisiting_quiz_tile_issues_fresh_question() {
    let mut engine = engine_on(duel_map());
    let now = Instant::now();
    let first = walk_p1_to_quiz(&mut engine, now);

    answer(&mut engine, P1, &first, 1);
    push_moves(&mut engine, P1, &[Direction::Left, Direction::Right]);
    let out = engine.tick(now).unwrap();
    let (_, second) = question(&out).expect("second question");
    assert_ne!(first, second);
    assert_eq!(engine.player(P1).unwrap().quiz().active(), Some(&second));
}

#[test]
fn test_quiz_tiles_are_inert_in_return_phase() {
    use Direction::*;
    let mut engine = engine_on(duel_map());
    let now = Instant::now();

    push_moves(&mut engine, P2, &[Left, Left]);
    engine.tick(now).unwrap();
    assert_eq!(engine.phase(), Phase::Return);

    push_moves(&mut engine, P1, &[Down, Down, Right, Right]);
    let out = engine.tick(now).unwrap();
    assert_eq!(pos(&engine, P1), Position::new(3, 3));
    assert!(question(&out).is_none());
    assert!(!engine.player(P1).unwrap().quiz().is_locked());
}

// =========================================================================
// Disconnect
// =========================================================================

#[test]
fn test_disconnect_ends_without_winner() {
    let mut engine = engine_on(duel_map());
    let out = engine.disconnect(P2);
    assert_eq!(
        out,
        vec![(
            Recipient::All,
            ServerMessage::End {
                winner: None,
                reason: EndReason::Disconnect
            }
        )]
    );
    assert!(engine.is_ended());
    assert!(engine.tick(Instant::now()).unwrap().is_empty());
    assert!(engine.disconnect(P1).is_empty());
}
