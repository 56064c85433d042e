//! Error types for the exam engine.
//!
//! Question-bank failures are fatal to the application; session errors are
//! rejected transitions the caller surfaces as notices; storage errors never
//! leave the typed storage layer.

use thiserror::Error;

use crate::model::Subject;

/// Failures while loading the question bank.
#[derive(Debug, Error)]
pub enum BankError {
    /// The subject's document could not be read.
    #[error("failed to read question bank for {subject}: {message}")]
    Unreadable { subject: Subject, message: String },

    /// The subject's document is not valid JSON or not an object of tests.
    #[error("malformed question bank for {subject}: {message}")]
    Malformed { subject: Subject, message: String },

    /// The source has no document for the subject.
    #[error("no question bank found for {0}")]
    Missing(Subject),
}

/// Rejected session transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no test is in progress")]
    NoActiveSession,

    #[error("unknown subject: {0}")]
    UnknownSubject(Subject),

    #[error("unknown test '{test_key}' for {subject}")]
    UnknownTest { subject: Subject, test_key: String },

    /// The test exists but has no questions yet.
    #[error("this test is not yet available")]
    EmptyTest { subject: Subject, test_key: String },

    #[error("question {0} is not part of this test")]
    UnknownQuestion(u32),

    #[error("option '{letter}' does not exist on question {question_id}")]
    UnknownOption { question_id: u32, letter: String },

    #[error("question index {index} is out of range (0..{len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Selections are frozen in review mode and after submission.
    #[error("answers can no longer be changed")]
    ReadOnly,
}

impl SessionError {
    /// Returns `true` for errors that should be shown to the user as a
    /// plain notice rather than reported as a failure.
    pub fn is_notice(&self) -> bool {
        matches!(self, SessionError::EmptyTest { .. } | SessionError::ReadOnly)
    }
}

/// Failures of a durable key-value backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend refuses writes (full or disabled).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_classification() {
        assert!(SessionError::ReadOnly.is_notice());
        assert!(SessionError::EmptyTest {
            subject: Subject::Maths,
            test_key: "test9".into()
        }
        .is_notice());
        assert!(!SessionError::NoActiveSession.is_notice());
        assert!(!SessionError::UnknownQuestion(3).is_notice());
    }

    #[test]
    fn messages_name_the_offender() {
        let err = SessionError::UnknownOption {
            question_id: 4,
            letter: "Q".into(),
        };
        assert_eq!(err.to_string(), "option 'Q' does not exist on question 4");
        let err = BankError::Missing(Subject::English);
        assert_eq!(err.to_string(), "no question bank found for english");
    }
}
