//! Question bank loading.
//!
//! Reads one JSON document per subject, normalizes correct answers once and
//! quarantines malformed questions instead of failing the whole document.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::answer::{normalize_correct_answers, CorrectAnswerField};
use crate::error::BankError;
use crate::model::{AnswerOption, Question, QuestionBank, Subject, SubjectBank, TestSet};

/// Intermediate structure of one test inside a subject document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    questions: Vec<Value>,
    #[serde(default)]
    passage: Option<String>,
    #[serde(default)]
    passage_title: Option<String>,
    #[serde(default)]
    passage_image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    id: u32,
    question: String,
    options: Vec<AnswerOption>,
    #[serde(default)]
    correct_answers: Option<Vec<String>>,
    #[serde(default)]
    correct_answer: Option<CorrectAnswerField>,
    #[serde(default)]
    instruction: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    show_passage: Option<bool>,
}

impl From<RawQuestion> for Question {
    fn from(raw: RawQuestion) -> Self {
        let correct_answers =
            normalize_correct_answers(raw.correct_answers.as_deref(), raw.correct_answer.as_ref());
        Question {
            id: raw.id,
            question: raw.question,
            options: raw.options,
            correct_answers,
            instruction: raw.instruction,
            image: raw.image,
            category: raw.category,
            show_passage: raw.show_passage,
        }
    }
}

/// Parse one subject document: `{ testKey: { title, questions, passage? } }`.
pub fn parse_subject_bank(json: &str, subject: Subject) -> Result<SubjectBank, BankError> {
    let malformed = |message: String| BankError::Malformed { subject, message };

    let root: Value = serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;
    let Value::Object(entries) = root else {
        return Err(malformed("expected an object of tests".into()));
    };

    let mut tests = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let raw: RawTest = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("{subject}: skipping malformed test '{key}': {e}");
                continue;
            }
        };

        let mut questions = Vec::with_capacity(raw.questions.len());
        for (index, value) in raw.questions.into_iter().enumerate() {
            match serde_json::from_value::<RawQuestion>(value) {
                Ok(q) => questions.push(Question::from(q)),
                Err(e) => {
                    tracing::warn!("{subject}/{key}: skipping malformed question #{index}: {e}");
                }
            }
        }

        tests.push(TestSet {
            title: raw.title.unwrap_or_else(|| key.clone()),
            key,
            questions,
            passage: raw.passage,
            passage_title: raw.passage_title,
            passage_image: raw.passage_image,
        });
    }

    tracing::debug!("{subject}: parsed {} tests", tests.len());
    Ok(SubjectBank { tests })
}

/// Where subject documents come from.
#[async_trait]
pub trait BankSource: Send + Sync {
    /// Human-readable location, used in logs.
    fn describe(&self) -> String;

    /// Fetch the raw JSON document of one subject.
    async fn fetch(&self, subject: Subject) -> Result<String, BankError>;
}

/// Reads `<dir>/<subject-slug>.json`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, subject: Subject) -> PathBuf {
        self.dir.join(subject.data_file())
    }
}

#[async_trait]
impl BankSource for DirectorySource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    async fn fetch(&self, subject: Subject) -> Result<String, BankError> {
        match tokio::fs::read_to_string(self.path_for(subject)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BankError::Missing(subject)),
            Err(e) => Err(BankError::Unreadable {
                subject,
                message: e.to_string(),
            }),
        }
    }
}

/// Serves documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: HashMap<Subject, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, subject: Subject, json: impl Into<String>) -> Self {
        self.documents.insert(subject, json.into());
        self
    }
}

#[async_trait]
impl BankSource for MemorySource {
    fn describe(&self) -> String {
        format!("memory ({} documents)", self.documents.len())
    }

    async fn fetch(&self, subject: Subject) -> Result<String, BankError> {
        self.documents
            .get(&subject)
            .cloned()
            .ok_or(BankError::Missing(subject))
    }
}

/// Load every listed subject concurrently. Any failure fails the whole load.
pub async fn load_question_bank(
    source: &dyn BankSource,
    subjects: &[Subject],
) -> Result<QuestionBank, BankError> {
    tracing::debug!("loading {} subjects from {}", subjects.len(), source.describe());
    let loads = subjects.iter().map(|&subject| async move {
        let json = source.fetch(subject).await?;
        parse_subject_bank(&json, subject).map(|bank| (subject, bank))
    });
    let subjects = futures::future::try_join_all(loads).await?;
    Ok(QuestionBank {
        subjects: subjects.into_iter().collect(),
    })
}

/// A non-fatal problem found in the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub subject: Subject,
    pub test_key: String,
    pub question_id: Option<u32>,
    pub message: String,
}

/// Check a loaded bank for common data problems.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for (&subject, subject_bank) in &bank.subjects {
        for test in &subject_bank.tests {
            let mut warn = |question_id: Option<u32>, message: String| {
                warnings.push(ValidationWarning {
                    subject,
                    test_key: test.key.clone(),
                    question_id,
                    message,
                })
            };

            if test.questions.is_empty() {
                warn(None, "test has no questions".into());
            }

            let mut seen_ids = HashSet::new();
            for question in &test.questions {
                let id = Some(question.id);
                if !seen_ids.insert(question.id) {
                    warn(id, format!("duplicate question id: {}", question.id));
                }

                let mut seen_letters = HashSet::new();
                for letter in question.letters() {
                    if !seen_letters.insert(letter) {
                        warn(id, format!("duplicate option letter: {letter}"));
                    }
                }

                if question.correct_answers.is_empty() {
                    warn(id, "no correct answer".into());
                }
                for letter in &question.correct_answers {
                    if !question.has_option(letter) {
                        warn(id, format!("correct answer '{letter}' is not an option"));
                    }
                }
            }
        }
    }

    warnings
}
