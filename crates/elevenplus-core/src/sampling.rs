//! Question selection: the full bank or a uniform random sample of it.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::Question;

/// How many questions a session draws from the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "CountRepr", into = "CountRepr")]
pub enum QuestionCount {
    #[default]
    All,
    Sample(usize),
}

/// Persisted form: the string `"all"` or a number.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CountRepr {
    Number(usize),
    Text(String),
}

impl TryFrom<CountRepr> for QuestionCount {
    type Error = String;

    fn try_from(repr: CountRepr) -> Result<Self, Self::Error> {
        match repr {
            CountRepr::Number(0) => Err("question count must be at least 1".to_string()),
            CountRepr::Number(n) => Ok(QuestionCount::Sample(n)),
            CountRepr::Text(s) => s.parse(),
        }
    }
}

impl From<QuestionCount> for CountRepr {
    fn from(count: QuestionCount) -> Self {
        match count {
            QuestionCount::All => CountRepr::Text("all".into()),
            QuestionCount::Sample(n) => CountRepr::Number(n),
        }
    }
}

impl fmt::Display for QuestionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionCount::All => write!(f, "all"),
            QuestionCount::Sample(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for QuestionCount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(QuestionCount::All);
        }
        match s.parse::<usize>() {
            Ok(0) => Err("question count must be at least 1".to_string()),
            Ok(n) => Ok(QuestionCount::Sample(n)),
            Err(_) => Err(format!("invalid question count: '{s}'")),
        }
    }
}

/// Pick the active questions for a session using the thread-local RNG.
///
/// The source bank is never reordered.
pub fn select_questions(full: &[Question], count: QuestionCount) -> Vec<Question> {
    select_questions_with(full, count, &mut rand::rng())
}

/// Same as [`select_questions`] with a caller-supplied RNG.
pub fn select_questions_with<R: Rng + ?Sized>(
    full: &[Question],
    count: QuestionCount,
    rng: &mut R,
) -> Vec<Question> {
    match count {
        QuestionCount::All => full.to_vec(),
        QuestionCount::Sample(n) => {
            let mut pool = full.to_vec();
            pool.shuffle(rng);
            pool.truncate(n.min(full.len()));
            pool
        }
    }
}
