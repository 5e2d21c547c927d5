//! Question catalog and the per-room answer registry.
//!
//! A [`Question`] carries its correct answer and never leaves the server.
//! What a client sees is a [`TileQuestion`]: a registration of a question
//! under a fresh opaque id, without the answer. The answer stays in the
//! [`QuestionPool`] until [`check`](QuestionPool::check) consumes it.

use std::collections::HashMap;
use std::sync::Arc;

use mazeduel_protocol::{Category, QuestionId};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::MapGenError;

/// How long a player has to answer before the question expires.
pub const DEFAULT_TIMEOUT_MS: u64 = 8000;

/// A catalog record. Deserialize-only: the answer index has no way onto
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Question {
    pub category: Category,
    /// 1 (easy) to 5 (hard).
    pub difficulty: u8,
    pub prompt: String,
    pub choices: Vec<String>,
    #[serde(alias = "answer_index")]
    pub correct_index: usize,
}

/// A question registered for one use, as shown to a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileQuestion {
    pub id: QuestionId,
    pub category: Category,
    pub difficulty: u8,
    pub prompt: String,
    pub choices: Vec<String>,
    pub timeout_ms: u64,
}

/// Where questions come from and where their answers are kept.
///
/// One pool per room. Map generation calls [`sample`](Self::sample) and
/// [`register`](Self::register); the engine calls `register` again when a
/// tile is re-triggered, then [`check`](Self::check) or
/// [`retire`](Self::retire).
pub trait QuestionPool: Send {
    /// `count` questions of `category`. Repeats are allowed when the pool
    /// is short; an empty result means the category has no questions.
    fn sample(&mut self, category: Category, count: usize) -> Vec<Question>;

    /// Mints a fresh id bound privately to `question`'s answer.
    fn register(&mut self, question: &Question) -> TileQuestion;

    /// Consumes the answer for `id`. Unknown (or already consumed) ids
    /// are simply wrong.
    fn check(&mut self, id: &QuestionId, choice: usize) -> bool;

    /// Forgets `id` without checking it, e.g. after a timeout.
    fn retire(&mut self, _id: &QuestionId) {}
}

/// An immutable set of questions, shareable across rooms.
#[derive(Debug, Clone, Default)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    pub fn new(questions: Vec<Question>) -> Result<Self, MapGenError> {
        for (i, q) in questions.iter().enumerate() {
            if !(1..=5).contains(&q.difficulty) {
                return Err(MapGenError::InvalidCatalog(format!(
                    "question {i}: difficulty {} outside 1..=5",
                    q.difficulty
                )));
            }
            if q.choices.len() < 2 {
                return Err(MapGenError::InvalidCatalog(format!(
                    "question {i}: needs at least two choices"
                )));
            }
            if q.correct_index >= q.choices.len() {
                return Err(MapGenError::InvalidCatalog(format!(
                    "question {i}: correct_index {} out of range",
                    q.correct_index
                )));
            }
        }
        Ok(Self { questions })
    }

    /// Parses a JSON array of question records.
    pub fn from_json(bytes: &[u8]) -> Result<Self, MapGenError> {
        let questions: Vec<Question> =
            serde_json::from_slice(bytes).map_err(|e| MapGenError::InvalidCatalog(e.to_string()))?;
        Self::new(questions)
    }

    /// A small offline set covering every category.
    pub fn builtin() -> Self {
        let q = |category, difficulty, prompt: &str, choices: [&str; 4], correct_index| Question {
            category,
            difficulty,
            prompt: prompt.to_owned(),
            choices: choices.iter().map(|c| (*c).to_owned()).collect(),
            correct_index,
        };
        use Category::*;
        Self {
            questions: vec![
                q(Math, 1, "2 + 3 = ?", ["4", "5", "6", "7"], 1),
                q(Math, 2, "12 - 7 = ?", ["3", "4", "5", "6"], 2),
                q(Math, 3, "If 5x = 35, x = ?", ["5", "6", "7", "8"], 2),
                q(Math, 4, "What is 15% of 240?", ["32", "36", "38", "42"], 1),
                q(Math, 5, "Sum of the integers 1 to 40?", ["800", "820", "840", "860"], 1),
                q(Logic, 1, "Which is the odd one out?", ["cat", "dog", "car", "cow"], 2),
                q(Logic, 2, "Next in 1, 1, 2, 3, 5, ...?", ["6", "7", "8", "9"], 2),
                q(
                    Logic,
                    3,
                    "All bloops are razzies and all razzies are lazzies. Are all bloops lazzies?",
                    ["yes", "no", "only some", "cannot tell"],
                    0,
                ),
                q(
                    Logic,
                    4,
                    "A is taller than B, C is shorter than B. Who is shortest?",
                    ["A", "B", "C", "cannot tell"],
                    2,
                ),
                q(
                    Logic,
                    5,
                    "How many times a day do a clock's hands overlap?",
                    ["12", "22", "24", "11"],
                    1,
                ),
                q(Trick, 1, "What has keys but can't open locks?", ["map", "piano", "door", "car"], 1),
                q(
                    Trick,
                    2,
                    "The more you take away, the bigger it gets. What is it?",
                    ["a hole", "water", "fire", "a shadow"],
                    0,
                ),
                q(
                    Trick,
                    3,
                    "How many months have 28 days?",
                    ["1", "2", "6", "12"],
                    3,
                ),
                q(
                    Trick,
                    4,
                    "You overtake the runner in second place. What place are you in?",
                    ["first", "second", "third", "last"],
                    1,
                ),
                q(
                    Trick,
                    5,
                    "A bat and ball cost 1.10 and the bat costs 1.00 more. The ball costs?",
                    ["0.10", "0.05", "0.15", "0.01"],
                    1,
                ),
                q(Pattern, 1, "Next in 2, 4, 6, 8, ...?", ["9", "10", "11", "12"], 1),
                q(Pattern, 2, "Next in 1, 4, 9, 16, ...?", ["20", "24", "25", "36"], 2),
                q(Pattern, 3, "Next in 3, 6, 12, 24, ...?", ["30", "36", "48", "60"], 2),
                q(Pattern, 4, "Next in 2, 6, 12, 20, ...?", ["28", "30", "32", "34"], 1),
                q(Pattern, 5, "Next in 1, 2, 6, 24, 120, ...?", ["240", "600", "720", "840"], 2),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn of_category(&self, category: Category) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(move |q| q.category == category)
    }
}

/// The standard [`QuestionPool`]: a shared catalog plus this room's
/// outstanding answers.
#[derive(Debug)]
pub struct QuestionBank {
    catalog: Arc<QuestionCatalog>,
    rng: StdRng,
    answers: HashMap<QuestionId, usize>,
    timeout_ms: u64,
}

impl QuestionBank {
    /// `seed` drives sampling only; ids are drawn from the thread RNG so
    /// two rooms with the same seed never mint colliding ids.
    pub fn new(catalog: Arc<QuestionCatalog>, seed: u64) -> Self {
        Self {
            catalog,
            rng: StdRng::seed_from_u64(seed),
            answers: HashMap::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Answers registered but not yet checked or retired.
    pub fn outstanding(&self) -> usize {
        self.answers.len()
    }

    fn mint_id(&self) -> QuestionId {
        loop {
            let bytes: [u8; 4] = rand::rng().random();
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            let id = QuestionId(format!("q-{hex}"));
            if !self.answers.contains_key(&id) {
                return id;
            }
        }
    }
}

impl QuestionPool for QuestionBank {
    fn sample(&mut self, category: Category, count: usize) -> Vec<Question> {
        let mut candidates: Vec<&Question> = self.catalog.of_category(category).collect();
        if candidates.is_empty() {
            return Vec::new();
        }
        if candidates.len() < count {
            return (0..count)
                .filter_map(|_| candidates.choose(&mut self.rng).map(|q| (*q).clone()))
                .collect();
        }
        candidates.shuffle(&mut self.rng);
        candidates.into_iter().take(count).cloned().collect()
    }

    fn register(&mut self, question: &Question) -> TileQuestion {
        let id = self.mint_id();
        self.answers.insert(id.clone(), question.correct_index);
        TileQuestion {
            id,
            category: question.category,
            difficulty: question.difficulty,
            prompt: question.prompt.clone(),
            choices: question.choices.clone(),
            timeout_ms: self.timeout_ms,
        }
    }

    fn check(&mut self, id: &QuestionId, choice: usize) -> bool {
        self.answers.remove(id) == Some(choice)
    }

    fn retire(&mut self, id: &QuestionId) {
        self.answers.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> QuestionBank {
        QuestionBank::new(Arc::new(QuestionCatalog::builtin()), 7)
    }

    #[test]
    fn test_builtin_covers_every_category_and_is_valid() {
        let catalog = QuestionCatalog::builtin();
        for category in Category::ALL {
            assert!(catalog.of_category(category).count() >= 5, "{category}");
        }
        assert!(QuestionCatalog::new(catalog.questions.clone()).is_ok());
    }

    #[test]
    fn test_sample_without_repeats_when_pool_is_large_enough() {
        let mut bank = bank();
        let picked = bank.sample(Category::Math, 5);
        assert_eq!(picked.len(), 5);
        let mut prompts: Vec<_> = picked.iter().map(|q| q.prompt.clone()).collect();
        prompts.sort();
        prompts.dedup();
        assert_eq!(prompts.len(), 5);
        assert!(picked.iter().all(|q| q.category == Category::Math));
    }

    #[test]
    fn test_sample_repeats_when_pool_is_short() {
        let mut bank = bank();
        let picked = bank.sample(Category::Trick, 9);
        assert_eq!(picked.len(), 9);
        assert!(picked.iter().all(|q| q.category == Category::Trick));
    }

    #[test]
    fn test_sample_empty_category() {
        let catalog = QuestionCatalog::new(vec![]).unwrap();
        let mut bank = QuestionBank::new(Arc::new(catalog), 1);
        assert!(bank.sample(Category::Logic, 3).is_empty());
    }

    #[test]
    fn test_answer_is_consumed_once() {
        let mut bank = bank();
        let question = bank.sample(Category::Math, 1).remove(0);
        let tile = bank.register(&question);
        assert!(tile.id.0.starts_with("q-"));
        assert_eq!(tile.id.0.len(), 10);
        assert_eq!(tile.timeout_ms, DEFAULT_TIMEOUT_MS);

        assert!(bank.check(&tile.id, question.correct_index));
        assert!(!bank.check(&tile.id, question.correct_index));
    }

    #[test]
    fn test_wrong_answer_also_consumes() {
        let mut bank = bank();
        let question = bank.sample(Category::Pattern, 1).remove(0);
        let tile = bank.register(&question);
        let wrong = (question.correct_index + 1) % question.choices.len();
        assert!(!bank.check(&tile.id, wrong));
        assert_eq!(bank.outstanding(), 0);
    }

    #[test]
    fn test_each_registration_gets_a_fresh_id() {
        let mut bank = bank();
        let question = bank.sample(Category::Logic, 1).remove(0);
        let a = bank.register(&question);
        let b = bank.register(&question);
        assert_ne!(a.id, b.id);
        bank.retire(&a.id);
        assert!(!bank.check(&a.id, question.correct_index));
        assert!(bank.check(&b.id, question.correct_index));
    }

    #[test]
    fn test_unknown_id_is_false() {
        let mut bank = bank();
        assert!(!bank.check(&QuestionId("q-00000000".into()), 0));
    }

    #[test]
    fn test_tile_question_json_has_no_answer() {
        let mut bank = bank();
        let question = bank.sample(Category::Math, 1).remove(0);
        let json = serde_json::to_value(bank.register(&question)).unwrap();
        assert!(json.get("correct_index").is_none());
        assert!(json.get("answer_index").is_none());
        assert_eq!(json["timeout_ms"], 8000);
    }

    #[test]
    fn test_from_json_accepts_either_answer_key() {
        let json = br#"[
            {"category":"math","difficulty":1,"prompt":"1+1?","choices":["1","2"],"correct_index":1},
            {"category":"trick","difficulty":2,"prompt":"?","choices":["a","b"],"answer_index":0}
        ]"#;
        let catalog = QuestionCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_from_json_rejects_bad_records() {
        let out_of_range = br#"[{"category":"math","difficulty":1,"prompt":"?","choices":["a","b"],"correct_index":2}]"#;
        assert!(matches!(
            QuestionCatalog::from_json(out_of_range),
            Err(MapGenError::InvalidCatalog(_))
        ));
        let too_hard = br#"[{"category":"math","difficulty":9,"prompt":"?","choices":["a","b"],"correct_index":0}]"#;
        assert!(QuestionCatalog::from_json(too_hard).is_err());
        assert!(QuestionCatalog::from_json(b"not json").is_err());
    }
}
