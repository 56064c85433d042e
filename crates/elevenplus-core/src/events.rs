//! Outbound notifications emitted as side effects of session transitions.
//!
//! Sinks are fire-and-forget: nothing they do can change core behavior.

use std::sync::Mutex;

use serde::Serialize;
use uuid::Uuid;

use crate::model::Subject;
use crate::sampling::QuestionCount;

/// A named event with its structured payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    ExamSelected {
        subject: Subject,
    },
    TestStarted {
        session_id: Uuid,
        subject: Subject,
        test_key: String,
        question_count: usize,
        count_mode: QuestionCount,
        timed: bool,
    },
    OptionSelected {
        session_id: Uuid,
        question_id: u32,
        letter: String,
        selected: Vec<String>,
    },
    TimerExpired {
        session_id: Uuid,
        target_ms: u64,
    },
    TestResumed {
        session_id: Uuid,
        subject: Subject,
        test_key: String,
        answered: usize,
    },
    ReviewStarted {
        session_id: Uuid,
    },
    TestAbandoned {
        session_id: Uuid,
        subject: Subject,
        test_key: String,
        reason: String,
        answered: usize,
        total: usize,
    },
    TestCompleted {
        session_id: Uuid,
        subject: Subject,
        test_key: String,
        percentage: u32,
        correct: usize,
        total: usize,
        elapsed_ms: u64,
    },
    HistoryCleared,
}

impl Event {
    /// The snake_case event name.
    pub fn name(&self) -> &'static str {
        match self {
            Event::ExamSelected { .. } => "exam_selected",
            Event::TestStarted { .. } => "test_started",
            Event::OptionSelected { .. } => "option_selected",
            Event::TimerExpired { .. } => "timer_expired",
            Event::TestResumed { .. } => "test_resumed",
            Event::ReviewStarted { .. } => "review_started",
            Event::TestAbandoned { .. } => "test_abandoned",
            Event::TestCompleted { .. } => "test_completed",
            Event::HistoryCleared => "history_cleared",
        }
    }
}

/// Receiver of outbound events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &Event);
}

/// Drops every event.
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _: &Event) {}
}

/// Logs each event's JSON payload under the `elevenplus::events` target.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &Event) {
        match serde_json::to_string(event) {
            Ok(payload) => {
                tracing::debug!(target: "elevenplus::events", name = event.name(), "{payload}")
            }
            Err(e) => tracing::debug!(target: "elevenplus::events", "unserializable event: {e}"),
        }
    }
}

/// Keeps every event in memory for later inspection.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Names of recorded events, in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(Event::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|n| **n == name).count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
