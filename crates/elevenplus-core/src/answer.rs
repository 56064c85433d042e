//! Answer model: correct-answer normalization, user selections, and the
//! rules deciding whether a question is answered and whether it is correct.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Question;

/// The `correctAnswer` field as it appears in bank documents: either a
/// single string (possibly comma-delimited) or an array of letters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswerField {
    One(String),
    Many(Vec<String>),
}

/// Resolve the canonical list of correct letters.
///
/// Priority: an explicit non-empty `correctAnswers` list, then an array-typed
/// `correctAnswer`, then a comma-delimited string, then a single letter.
/// Returns an empty list when none of them carries a letter.
pub fn normalize_correct_answers(
    list: Option<&[String]>,
    field: Option<&CorrectAnswerField>,
) -> Vec<String> {
    if let Some(list) = list.filter(|l| !l.is_empty()) {
        return clean_letters(list.iter().map(String::as_str));
    }
    match field {
        Some(CorrectAnswerField::Many(items)) => clean_letters(items.iter().map(String::as_str)),
        Some(CorrectAnswerField::One(s)) if s.contains(',') => clean_letters(s.split(',')),
        Some(CorrectAnswerField::One(s)) => clean_letters(std::iter::once(s.as_str())),
        None => Vec::new(),
    }
}

fn clean_letters<'a>(letters: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for letter in letters.map(str::trim).filter(|l| !l.is_empty()) {
        if !out.iter().any(|l| l == letter) {
            out.push(letter.to_string());
        }
    }
    out
}

/// The correct letters of a question.
pub fn correct_answers_of(question: &Question) -> &[String] {
    &question.correct_answers
}

/// How many letters a complete answer needs: `max(1, |correct|)`.
pub fn required_selection_count(question: &Question) -> usize {
    correct_answers_of(question).len().max(1)
}

/// Order-independent, cardinality-sensitive comparison of a selection
/// against the question's correct answers.
pub fn is_correct(question: &Question, selected: &[String]) -> bool {
    let correct = correct_answers_of(question);
    if selected.len() != correct.len() {
        return false;
    }
    let mut a: Vec<&str> = selected.iter().map(String::as_str).collect();
    let mut b: Vec<&str> = correct.iter().map(String::as_str).collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// Selected letters per question id. A missing key means unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selections(BTreeMap<u32, Vec<String>>);

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Letters chosen for `question_id`, in the order they were picked.
    pub fn get(&self, question_id: u32) -> &[String] {
        self.0.get(&question_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Store a selection, dropping repeated letters but keeping first-seen
    /// order. An empty list removes the record.
    pub fn set<I, S>(&mut self, question_id: u32, letters: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut deduped: Vec<String> = Vec::new();
        for letter in letters {
            let letter = letter.into();
            if !deduped.contains(&letter) {
                deduped.push(letter);
            }
        }
        if deduped.is_empty() {
            self.0.remove(&question_id);
        } else {
            self.0.insert(question_id, deduped);
        }
    }

    pub fn clear(&mut self, question_id: u32) {
        self.0.remove(&question_id);
    }

    /// Exact-count check: a partially filled multi-select is not answered.
    pub fn is_answered(&self, question: &Question) -> bool {
        self.get(question.id).len() == required_selection_count(question)
    }

    pub fn has_any(&self, question_id: u32) -> bool {
        self.0.contains_key(&question_id)
    }

    /// Number of questions with at least one letter selected.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &[String])> {
        self.0.iter().map(|(id, letters)| (*id, letters.as_slice()))
    }
}

/// Fixed groups of option letters where at most one letter per group may be
/// picked (e.g. "one of A–E and one of X–Z").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionGroups(Vec<Vec<String>>);

impl Default for OptionGroups {
    fn default() -> Self {
        let group = |letters: &[&str]| letters.iter().map(|l| l.to_string()).collect();
        Self(vec![
            group(&["A", "B", "C", "D", "E"]),
            group(&["X", "Y", "Z"]),
        ])
    }
}

impl OptionGroups {
    pub fn new(groups: Vec<Vec<String>>) -> Self {
        Self(groups)
    }

    /// A rule with no groups; every multi-answer question is treated as
    /// ungrouped.
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn group_of(&self, letter: &str) -> Option<usize> {
        self.0.iter().position(|g| g.iter().any(|l| l == letter))
    }

    /// The rule applies to multi-answer questions whose options all belong
    /// to a group and span at least two groups.
    pub fn applies_to(&self, question: &Question) -> bool {
        if required_selection_count(question) < 2 || question.options.is_empty() {
            return false;
        }
        let mut seen = Vec::new();
        for letter in question.letters() {
            match self.group_of(letter) {
                Some(g) => {
                    if !seen.contains(&g) {
                        seen.push(g);
                    }
                }
                None => return false,
            }
        }
        seen.len() >= 2
    }
}

/// What a single pick did to a question's selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickChange {
    Selected,
    Deselected,
    /// `previous` was swapped out for the new letter.
    Replaced { previous: String },
    /// The required number of letters is already chosen.
    Refused,
}

/// Result of applying a pick to the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickOutcome {
    pub letters: Vec<String>,
    pub change: PickChange,
}

/// Apply one click on `letter` to `current` following the question's rule:
/// single answers toggle or replace, grouped answers replace within the
/// group, and plain multi-answers toggle up to the required count.
pub fn apply_pick(
    question: &Question,
    current: &[String],
    letter: &str,
    groups: &OptionGroups,
) -> PickOutcome {
    let mut letters: Vec<String> = current.to_vec();

    if letters.iter().any(|l| l == letter) {
        letters.retain(|l| l != letter);
        return PickOutcome {
            letters,
            change: PickChange::Deselected,
        };
    }

    let required = required_selection_count(question);
    if required == 1 {
        let change = match letters.first() {
            Some(previous) => PickChange::Replaced {
                previous: previous.clone(),
            },
            None => PickChange::Selected,
        };
        return PickOutcome {
            letters: vec![letter.to_string()],
            change,
        };
    }

    if groups.applies_to(question) {
        let group = groups.group_of(letter);
        let previous = letters
            .iter()
            .position(|l| group.is_some() && groups.group_of(l) == group)
            .map(|idx| letters.remove(idx));
        letters.push(letter.to_string());
        let change = match previous {
            Some(previous) => PickChange::Replaced { previous },
            None => PickChange::Selected,
        };
        return PickOutcome { letters, change };
    }

    if letters.len() >= required {
        return PickOutcome {
            letters,
            change: PickChange::Refused,
        };
    }
    letters.push(letter.to_string());
    PickOutcome {
        letters,
        change: PickChange::Selected,
    }
}
