//! Core data model types for elevenplus.
//!
//! These are the fundamental types the rest of the crate uses to represent
//! subjects, tests, questions and their options.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-level exam category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Subject {
    Maths,
    English,
    VerbalReasoning,
    NonVerbalReasoning,
    VerbalSkills,
}

impl Subject {
    /// Every subject, in menu order.
    pub const ALL: [Subject; 5] = [
        Subject::Maths,
        Subject::English,
        Subject::VerbalReasoning,
        Subject::NonVerbalReasoning,
        Subject::VerbalSkills,
    ];

    /// Stable slug used for data files and persisted records.
    pub fn slug(self) -> &'static str {
        match self {
            Subject::Maths => "maths",
            Subject::English => "english",
            Subject::VerbalReasoning => "verbal-reasoning",
            Subject::NonVerbalReasoning => "non-verbal-reasoning",
            Subject::VerbalSkills => "verbal-skills",
        }
    }

    /// Heading shown above the subject's test list.
    pub fn title(self) -> &'static str {
        match self {
            Subject::Maths => "Maths Tests",
            Subject::English => "English Tests",
            Subject::VerbalReasoning => "Verbal Reasoning Tests",
            Subject::NonVerbalReasoning => "Non-Verbal Reasoning Tests",
            Subject::VerbalSkills => "Verbal Skills Tests",
        }
    }

    /// File name of this subject's question bank inside the data directory.
    pub fn data_file(self) -> String {
        format!("{}.json", self.slug())
    }

    /// Question ids (inclusive) that belong to the reading-comprehension
    /// section when a test carries a passage.
    fn passage_question_range(self) -> Option<(u32, u32)> {
        match self {
            Subject::English => Some((1, 28)),
            Subject::VerbalSkills => Some((1, 14)),
            _ => None,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "maths" | "math" => Ok(Subject::Maths),
            "english" => Ok(Subject::English),
            "verbal-reasoning" | "vr" => Ok(Subject::VerbalReasoning),
            "non-verbal-reasoning" | "nvr" => Ok(Subject::NonVerbalReasoning),
            "verbal-skills" => Ok(Subject::VerbalSkills),
            other => Err(format!("unknown subject: {other}")),
        }
    }
}

/// One lettered choice of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub letter: String,
    pub text: String,
}

/// A multiple-choice question with its correct answers already normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u32,
    pub question: String,
    pub options: Vec<AnswerOption>,
    /// Canonical list of correct letters. Empty when the bank gave none.
    #[serde(default)]
    pub correct_answers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_passage: Option<bool>,
}

impl Question {
    /// Returns true if `letter` names one of this question's options.
    pub fn has_option(&self, letter: &str) -> bool {
        self.options.iter().any(|o| o.letter == letter)
    }

    /// Letters of all options, in display order.
    pub fn letters(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|o| o.letter.as_str())
    }
}

/// A named question set within a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSet {
    /// Key of the test inside the subject document (e.g. "test1").
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage_image: Option<String>,
}

impl TestSet {
    /// Whether the reading passage should accompany `question`.
    ///
    /// An explicit `showPassage` on the question wins; otherwise the
    /// subject's comprehension range decides.
    pub fn passage_visible(&self, subject: Subject, question: &Question) -> bool {
        if self.passage.is_none() {
            return false;
        }
        if let Some(explicit) = question.show_passage {
            return explicit;
        }
        subject
            .passage_question_range()
            .is_some_and(|(lo, hi)| (lo..=hi).contains(&question.id))
    }

    /// Heading for the passage panel.
    pub fn passage_heading(&self) -> &str {
        self.passage_title.as_deref().unwrap_or("Reading Passage")
    }
}

/// All tests of one subject, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectBank {
    pub tests: Vec<TestSet>,
}

impl SubjectBank {
    pub fn test(&self, key: &str) -> Option<&TestSet> {
        self.tests.iter().find(|t| t.key == key)
    }

    /// Tests that can actually be started (at least one question).
    pub fn available_tests(&self) -> impl Iterator<Item = &TestSet> {
        self.tests.iter().filter(|t| !t.questions.is_empty())
    }
}

/// The fully loaded question bank, keyed by subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionBank {
    pub subjects: BTreeMap<Subject, SubjectBank>,
}

impl QuestionBank {
    pub fn subject(&self, subject: Subject) -> Option<&SubjectBank> {
        self.subjects.get(&subject)
    }

    pub fn test(&self, subject: Subject, key: &str) -> Option<&TestSet> {
        self.subject(subject).and_then(|s| s.test(key))
    }

    /// Returns true if the subject/test pair exists in this bank.
    pub fn contains(&self, subject: Subject, key: &str) -> bool {
        self.test(subject, key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u32, show_passage: Option<bool>) -> Question {
        Question {
            id,
            question: format!("Question {id}"),
            options: vec![AnswerOption {
                letter: "A".into(),
                text: "yes".into(),
            }],
            correct_answers: vec!["A".into()],
            instruction: None,
            image: None,
            category: None,
            show_passage,
        }
    }

    fn test_set(passage: Option<&str>) -> TestSet {
        TestSet {
            key: "test1".into(),
            title: "Test 1".into(),
            questions: vec![],
            passage: passage.map(str::to_string),
            passage_title: None,
            passage_image: None,
        }
    }

    #[test]
    fn subject_display_and_parse() {
        assert_eq!(Subject::NonVerbalReasoning.to_string(), "non-verbal-reasoning");
        assert_eq!("maths".parse::<Subject>().unwrap(), Subject::Maths);
        assert_eq!("NVR".parse::<Subject>().unwrap(), Subject::NonVerbalReasoning);
        assert_eq!(
            "verbal_skills".parse::<Subject>().unwrap(),
            Subject::VerbalSkills
        );
        assert!("science".parse::<Subject>().is_err());
    }

    #[test]
    fn subject_serde_uses_slug() {
        let json = serde_json::to_string(&Subject::VerbalReasoning).unwrap();
        assert_eq!(json, "\"verbal-reasoning\"");
        for subject in Subject::ALL {
            assert_eq!(subject.data_file(), format!("{}.json", subject.slug()));
        }
    }

    #[test]
    fn passage_visibility_follows_subject_range() {
        let set = test_set(Some("Once upon a time"));
        assert!(set.passage_visible(Subject::English, &question(28, None)));
        assert!(!set.passage_visible(Subject::English, &question(29, None)));
        assert!(set.passage_visible(Subject::VerbalSkills, &question(14, None)));
        assert!(!set.passage_visible(Subject::VerbalSkills, &question(15, None)));
        assert!(!set.passage_visible(Subject::Maths, &question(1, None)));
    }

    #[test]
    fn explicit_show_passage_wins_but_needs_a_passage() {
        let set = test_set(Some("text"));
        assert!(set.passage_visible(Subject::Maths, &question(40, Some(true))));
        assert!(!set.passage_visible(Subject::English, &question(1, Some(false))));

        let no_passage = test_set(None);
        assert!(!no_passage.passage_visible(Subject::English, &question(1, Some(true))));
        assert_eq!(set.passage_heading(), "Reading Passage");
    }

    #[test]
    fn available_tests_skip_empty_sets() {
        let mut full = test_set(None);
        full.questions.push(question(1, None));
        let mut empty = test_set(None);
        empty.key = "test2".into();
        let bank = SubjectBank {
            tests: vec![full, empty],
        };
        let keys: Vec<_> = bank.available_tests().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["test1"]);
        assert!(bank.test("test2").is_some());
    }
}
