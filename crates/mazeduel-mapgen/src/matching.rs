//! Difficulty matching: pairing quiz tiles with questions at minimum cost.

use mazeduel_protocol::{Category, Position};

use crate::MapGenError;
use crate::questions::{Question, QuestionPool, TileQuestion};

/// Cost of pairing a real row with a padding column (or vice versa).
/// Large enough that the solver only uses padding when it has to.
pub const PAD_COST: i64 = 1_000_000;

/// A quiz tile after generation.
#[derive(Debug, Clone)]
pub struct QuizTile {
    pub position: Position,
    pub category: Category,
    /// 1 (far from the treasure) to 5 (next to it).
    pub target_difficulty: u8,
    /// The question matched to this tile. Each trigger registers it anew.
    pub source: Question,
    /// Registration made during generation, used by the first trigger.
    pub prepared: Option<TileQuestion>,
}

/// Result of [`hungarian`]: `columns[row]` is the column matched to `row`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub total_cost: i64,
    pub columns: Vec<usize>,
}

/// Target difficulty of a tile `distance` moves from the treasure, where
/// `max_distance` is the farthest reachable cell. Nearer is harder.
pub fn target_difficulty(distance: u32, max_distance: u32) -> u8 {
    let max_distance = max_distance.max(1) as f64;
    let ratio = 1.0 - distance as f64 / max_distance;
    (1.0 + (4.0 * ratio).round()).clamp(1.0, 5.0) as u8
}

/// Pads an `r × c` matrix to `n × n` (`n = max(r, c)`) with [`PAD_COST`].
pub fn pad_to_square(cost: &[Vec<i64>]) -> Vec<Vec<i64>> {
    let rows = cost.len();
    let cols = cost.iter().map(Vec::len).max().unwrap_or(0);
    let n = rows.max(cols);
    let mut square = vec![vec![PAD_COST; n]; n];
    for (i, row) in cost.iter().enumerate() {
        square[i][..row.len()].copy_from_slice(row);
    }
    square
}

/// Minimum-cost perfect matching on a square matrix (Kuhn–Munkres with
/// potentials, O(n³)).
///
/// Rows are added one at a time; each addition grows a shortest
/// augmenting path over reduced costs `cost[i][j] − u[i] − v[j]` and then
/// flips it. Index 0 of `u`, `v`, `owner` and `way` is a virtual
/// row/column, so real indices are shifted by one.
///
/// # Panics
/// If `cost` is not square.
pub fn hungarian(cost: &[Vec<i64>]) -> Assignment {
    let n = cost.len();
    assert!(cost.iter().all(|row| row.len() == n), "cost matrix must be square");

    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; n + 1];
    // owner[j]: row currently matched to column j (0 = none).
    let mut owner = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        owner[0] = row;
        let mut j0 = 0;
        let mut minv = vec![i64::MAX; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = owner[j0];
            let mut delta = i64::MAX;
            let mut j1 = 0;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let reduced = cost[i0 - 1][j - 1] - u[i0] - v[j];
                if reduced < minv[j] {
                    minv[j] = reduced;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if owner[j0] == 0 {
                break;
            }
        }

        // Flip the augmenting path back to the virtual column.
        loop {
            let j1 = way[j0];
            owner[j0] = owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut columns = vec![0; n];
    for j in 1..=n {
        if owner[j] != 0 {
            columns[owner[j] - 1] = j - 1;
        }
    }
    let total_cost = columns.iter().enumerate().map(|(i, &j)| cost[i][j]).sum();
    Assignment {
        total_cost,
        columns,
    }
}

/// Picks and registers one question per tile.
///
/// Tiles are grouped by category (in `Category::ALL` order). For each
/// group the pool is asked for as many questions as there are tiles, the
/// `|target − difficulty|` cost matrix is padded and solved, and every
/// tile registers its matched question. A tile matched to a padding column
/// falls back to its cheapest real question.
///
/// `tiles[i]` is `(position, category, target_difficulty)`; the output is
/// in the same order.
///
/// # Errors
/// [`MapGenError::NoQuestions`] if the pool has nothing for a category in use.
pub fn assign_questions(
    tiles: &[(Position, Category, u8)],
    pool: &mut dyn QuestionPool,
) -> Result<Vec<QuizTile>, MapGenError> {
    let mut out: Vec<Option<QuizTile>> = vec![None; tiles.len()];

    for category in Category::ALL {
        let members: Vec<usize> = (0..tiles.len()).filter(|&i| tiles[i].1 == category).collect();
        if members.is_empty() {
            continue;
        }

        let questions = pool.sample(category, members.len());
        if questions.is_empty() {
            return Err(MapGenError::NoQuestions(category));
        }

        let cost: Vec<Vec<i64>> = members
            .iter()
            .map(|&i| {
                let target = i64::from(tiles[i].2);
                questions
                    .iter()
                    .map(|q| (target - i64::from(q.difficulty)).abs())
                    .collect()
            })
            .collect();
        let assignment = hungarian(&pad_to_square(&cost));

        for (row, &tile_index) in members.iter().enumerate() {
            let mut column = assignment.columns[row];
            if column >= questions.len() {
                column = cheapest_column(&cost[row]);
            }
            let question = &questions[column];
            let (position, category, target_difficulty) = tiles[tile_index];
            out[tile_index] = Some(QuizTile {
                position,
                category,
                target_difficulty,
                source: question.clone(),
                prepared: Some(pool.register(question)),
            });
        }

        tracing::trace!(
            %category,
            tiles = members.len(),
            cost = assignment.total_cost,
            "difficulty matching done"
        );
    }

    Ok(out.into_iter().flatten().collect())
}

fn cheapest_column(row: &[i64]) -> usize {
    row.iter()
        .enumerate()
        .min_by_key(|(_, c)| **c)
        .map_or(0, |(j, _)| j)
}
