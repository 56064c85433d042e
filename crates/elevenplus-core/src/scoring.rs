//! Scoring and per-category breakdown of a set of answered questions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::answer::{is_correct, Selections};
use crate::model::Question;

/// Label for questions without a category.
pub const DEFAULT_CATEGORY: &str = "General";

/// `round(100 * correct / total)`, or 0 for an empty set.
pub fn percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * correct as f64 / total as f64).round() as u32
}

/// Which bucket a single question falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
    Unanswered,
}

/// Classify one question against the user's selections.
pub fn outcome_of(question: &Question, selections: &Selections) -> Outcome {
    let picked = selections.get(question.id);
    if picked.is_empty() {
        Outcome::Unanswered
    } else if is_correct(question, picked) {
        Outcome::Correct
    } else {
        Outcome::Incorrect
    }
}

/// Correct/incorrect/unanswered tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unanswered: usize,
}

impl Score {
    fn add(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Correct => self.correct += 1,
            Outcome::Incorrect => self.incorrect += 1,
            Outcome::Unanswered => self.unanswered += 1,
        }
    }

    pub fn percentage(&self) -> u32 {
        percentage(self.correct, self.total)
    }
}

/// Partition every question into exactly one bucket.
pub fn score(questions: &[Question], selections: &Selections) -> Score {
    let mut tally = Score::default();
    for question in questions {
        tally.add(outcome_of(question, selections));
    }
    tally
}

/// Tallies for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unanswered: usize,
    pub percentage: u32,
}

impl From<Score> for CategoryScore {
    fn from(score: Score) -> Self {
        Self {
            total: score.total,
            correct: score.correct,
            incorrect: score.incorrect,
            unanswered: score.unanswered,
            percentage: score.percentage(),
        }
    }
}

/// Category label of a question, falling back to [`DEFAULT_CATEGORY`].
pub fn category_of(question: &Question) -> &str {
    question
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY)
}

/// The same partition as [`score`], grouped by category.
pub fn category_breakdown(
    questions: &[Question],
    selections: &Selections,
) -> BTreeMap<String, CategoryScore> {
    let mut tallies: BTreeMap<String, Score> = BTreeMap::new();
    for question in questions {
        tallies
            .entry(category_of(question).to_string())
            .or_default()
            .add(outcome_of(question, selections));
    }
    tallies
        .into_iter()
        .map(|(category, tally)| (category, CategoryScore::from(tally)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerOption;

    fn question(id: u32, correct: &str, category: Option<&str>) -> Question {
        Question {
            id,
            question: format!("Q{id}"),
            options: ["A", "B", "C", "D"]
                .iter()
                .map(|l| AnswerOption {
                    letter: l.to_string(),
                    text: l.to_lowercase(),
                })
                .collect(),
            correct_answers: vec![correct.to_string()],
            instruction: None,
            image: None,
            category: category.map(str::to_string),
            show_passage: None,
        }
    }

    #[test]
    fn ten_questions_six_right_is_sixty_percent() {
        let questions: Vec<Question> = (1..=10).map(|id| question(id, "A", None)).collect();
        let mut sel = Selections::new();
        for id in 1..=6 {
            sel.set(id, ["A"]);
        }
        sel.set(7, ["B"]);
        sel.set(8, ["C"]);

        let tally = score(&questions, &sel);
        assert_eq!(tally.correct, 6);
        assert_eq!(tally.incorrect, 2);
        assert_eq!(tally.unanswered, 2);
        assert_eq!(tally.percentage(), 60);
    }

    #[test]
    fn empty_set_scores_zero() {
        let tally = score(&[], &Selections::new());
        assert_eq!(tally.total, 0);
        assert_eq!(tally.percentage(), 0);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
    }

    #[test]
    fn breakdown_groups_by_category_with_default() {
        let questions = vec![
            question(1, "A", Some("Fractions")),
            question(2, "A", Some("Fractions")),
            question(3, "B", Some("Algebra")),
            question(4, "C", None),
            question(5, "C", Some("  ")),
        ];
        let mut sel = Selections::new();
        sel.set(1, ["A"]);
        sel.set(2, ["D"]);
        sel.set(4, ["C"]);

        let breakdown = category_breakdown(&questions, &sel);
        assert_eq!(breakdown.len(), 3);

        let fractions = breakdown["Fractions"];
        assert_eq!((fractions.total, fractions.correct, fractions.incorrect), (2, 1, 1));
        assert_eq!(fractions.percentage, 50);

        let algebra = breakdown["Algebra"];
        assert_eq!(algebra.unanswered, 1);
        assert_eq!(algebra.percentage, 0);

        let general = breakdown[DEFAULT_CATEGORY];
        assert_eq!((general.total, general.correct, general.unanswered), (2, 1, 1));
    }
}
