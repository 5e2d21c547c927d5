//! Treasure and quiz placement by backtracking search.
//!
//! The solver answers one question: given a maze and the two start cells,
//! where can the treasure and `quiz_count` quiz tiles go so that
//!
//! - the treasure is (almost) equally far from both starts,
//! - every quiz tile is reachable by both players,
//! - quiz tiles are at least `k_apart` apart (Manhattan)?
//!
//! It tries treasure cells in shuffled order and, for each, runs a
//! chronological depth-first search over quiz cells. No constraint
//! propagation happens beyond filtering each slot's candidates against the
//! cells already chosen. The first complete assignment wins.
//!
//! # Cost
//!
//! The search has no time or node budget. `k_apart` pruning keeps branching
//! small on ordinary mazes, but an infeasible instance on a large open
//! grid can take exponential time before the solver gives up on a treasure
//! candidate. Callers bound the overall work by limiting how many mazes
//! they try (see [`MapConfig::max_attempts`](crate::MapConfig)).

use mazeduel_protocol::{Position, Tile};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::{DistanceField, Grid};

/// Placement constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementParams {
    /// Number of quiz tiles to place.
    pub quiz_count: usize,
    /// Minimum Manhattan distance between any two quiz tiles.
    pub k_apart: u32,
    /// Maximum allowed difference between the two starts' path lengths
    /// to the treasure.
    pub balance_tol: u32,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self {
            quiz_count: 12,
            k_apart: 6,
            balance_tol: 6,
        }
    }
}

/// A feasible assignment of special cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub starts: [Position; 2],
    pub treasure: Position,
    pub quiz: Vec<Position>,
}

/// Backtracking placement solver.
#[derive(Debug, Clone)]
pub struct PlacementSolver {
    params: PlacementParams,
}

/// One choice point of the quiz search: the candidates for the next slot,
/// already filtered and shuffled, and how many of them have been tried.
struct Frame {
    candidates: Vec<Position>,
    next: usize,
}

impl PlacementSolver {
    pub fn new(params: PlacementParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PlacementParams {
        &self.params
    }

    /// Runs the search. `None` means this grid admits no placement and the
    /// caller should generate a new maze.
    pub fn solve<R: Rng + ?Sized>(
        &self,
        grid: &Grid,
        start1: Position,
        start2: Position,
        rng: &mut R,
    ) -> Option<Placement> {
        let d1 = DistanceField::from_source(grid, start1);
        let d2 = DistanceField::from_source(grid, start2);

        let reachable: Vec<Position> = grid
            .cells_of(Tile::Floor)
            .into_iter()
            .filter(|&p| p != start1 && p != start2)
            .filter(|&p| d1.is_reachable(p) && d2.is_reachable(p))
            .collect();

        let mut treasure_domain: Vec<Position> = reachable
            .iter()
            .copied()
            .filter(|&p| d1.get(p).abs_diff(d2.get(p)) <= self.params.balance_tol)
            .collect();

        if treasure_domain.is_empty() {
            tracing::debug!("placement: empty treasure domain");
            return None;
        }
        if reachable.len() < self.params.quiz_count + 1 {
            tracing::debug!(
                domain = reachable.len(),
                quiz_count = self.params.quiz_count,
                "placement: quiz domain too small"
            );
            return None;
        }

        treasure_domain.shuffle(rng);

        for treasure in treasure_domain {
            if let Some(quiz) = self.search_quiz(&reachable, treasure, rng) {
                return Some(Placement {
                    starts: [start1, start2],
                    treasure,
                    quiz,
                });
            }
        }
        None
    }

    /// Depth-first search for `quiz_count` cells around a fixed treasure,
    /// driven by an explicit stack of [`Frame`]s.
    ///
    /// Invariant while searching: `chosen.len() + 1 == stack.len()`, i.e.
    /// the top frame holds the candidates for slot `chosen.len()`.
    fn search_quiz<R: Rng + ?Sized>(
        &self,
        domain: &[Position],
        treasure: Position,
        rng: &mut R,
    ) -> Option<Vec<Position>> {
        let target = self.params.quiz_count;
        let mut chosen: Vec<Position> = Vec::with_capacity(target);
        if target == 0 {
            return Some(chosen);
        }

        let mut stack = vec![self.frame(domain, treasure, &chosen, rng)];

        while let Some(top) = stack.last_mut() {
            if top.next >= top.candidates.len() {
                // Slot exhausted: undo the choice that led here.
                stack.pop();
                chosen.pop();
                continue;
            }
            let pick = top.candidates[top.next];
            top.next += 1;

            chosen.push(pick);
            if chosen.len() == target {
                return Some(chosen);
            }
            let frame = self.frame(domain, treasure, &chosen, rng);
            stack.push(frame);
        }
        None
    }

    /// Candidates for the next slot: the domain minus the treasure, minus
    /// cells already chosen, minus cells closer than `k_apart` to any chosen
    /// cell. Shuffled.
    fn frame<R: Rng + ?Sized>(
        &self,
        domain: &[Position],
        treasure: Position,
        chosen: &[Position],
        rng: &mut R,
    ) -> Frame {
        let mut candidates: Vec<Position> = domain
            .iter()
            .copied()
            .filter(|&p| p != treasure)
            .filter(|p| !chosen.contains(p))
            .filter(|&p| chosen.iter().all(|&q| p.manhattan(q) >= self.params.k_apart))
            .collect();
        candidates.shuffle(rng);
        Frame {
            candidates,
            next: 0,
        }
    }
}
