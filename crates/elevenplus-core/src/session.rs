//! Test-session state machine.
//!
//! A [`SessionController`] owns the single live [`SessionState`] and drives
//! it through `not-started → active → (reviewing | submitted)`. Every
//! mutating transition outside review mode is persisted through
//! [`Storage`]; persistence failures are logged and the in-memory state
//! stays authoritative.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::answer::{apply_pick, OptionGroups, PickChange, PickOutcome, Selections};
use crate::clock::Clock;
use crate::error::SessionError;
use crate::events::{Event, EventSink, NoopSink};
use crate::history::{record_attempt, AttemptRecord};
use crate::model::{Question, QuestionBank, Subject, TestSet};
use crate::sampling::{select_questions, QuestionCount};
use crate::scoring::{category_breakdown, score, CategoryScore, Score};
use crate::storage::Storage;
use crate::timer::{target_ms, TimerConfig, TimerPoll, TimerReading, TimerState};

/// Everything that describes one attempt in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: Uuid,
    pub subject: Subject,
    pub test_key: String,
    #[serde(default)]
    pub count_mode: QuestionCount,
    /// The active questions, possibly a random sample of the test.
    pub question_order: Vec<Question>,
    pub current_index: usize,
    #[serde(default)]
    pub selections: Selections,
    #[serde(default)]
    pub review_mode: bool,
    pub timer: TimerState,
}

impl SessionState {
    pub fn current_question(&self) -> Option<&Question> {
        self.question_order.get(self.current_index)
    }

    pub fn question(&self, id: u32) -> Option<&Question> {
        self.question_order.iter().find(|q| q.id == id)
    }

    pub fn total(&self) -> usize {
        self.question_order.len()
    }

    /// Questions whose selection has exactly the required number of letters.
    pub fn answered_count(&self) -> usize {
        self.question_order
            .iter()
            .filter(|q| self.selections.is_answered(q))
            .count()
    }

    pub fn unanswered_count(&self) -> usize {
        self.total() - self.answered_count()
    }

    /// 1-based position of the current question and the total.
    pub fn position(&self) -> (usize, usize) {
        (self.current_index + 1, self.total())
    }

    pub fn is_first(&self) -> bool {
        self.current_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 >= self.total()
    }

    /// Structural sanity of a deserialized snapshot.
    pub fn is_consistent(&self) -> bool {
        !self.question_order.is_empty()
            && self.current_index < self.question_order.len()
            && self
                .selections
                .iter()
                .all(|(id, _)| self.question(id).is_some())
    }
}

/// The persisted progress blob: the session plus when it was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSession {
    pub saved_at: DateTime<Utc>,
    #[serde(rename = "session")]
    pub state: SessionState,
}

/// Where the controller is in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    Active,
    Reviewing,
    Submitted,
}

/// Settings that shape session behavior.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionConfig {
    pub timer: TimerConfig,
    pub option_groups: OptionGroups,
}

/// Outcome of a submit request.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Some questions are not fully answered; call again with confirmation.
    NeedsConfirmation { unanswered: usize },
    Submitted(SessionResult),
}

/// Summary of a submitted session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub score: Score,
    pub percentage: u32,
    pub elapsed_ms: u64,
    pub breakdown: BTreeMap<String, CategoryScore>,
    pub record: AttemptRecord,
}

/// How one option should be marked when reviewing answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionMark {
    pub letter: String,
    pub selected: bool,
    pub correct: bool,
    /// Selected but not one of the correct letters.
    pub incorrect: bool,
}

/// Owns the live session and applies user actions to it.
pub struct SessionController {
    bank: Arc<QuestionBank>,
    storage: Storage,
    events: Arc<dyn EventSink>,
    clock: Clock,
    config: SessionConfig,
    session: Option<SessionState>,
    phase: SessionPhase,
    submitted: bool,
    focused_option: Option<usize>,
    timer_visible: bool,
    abandon_notified: bool,
    result: Option<SessionResult>,
}

impl SessionController {
    pub fn new(bank: Arc<QuestionBank>, storage: Storage) -> Self {
        Self {
            bank,
            storage,
            events: Arc::new(NoopSink),
            clock: Clock::System,
            config: SessionConfig::default(),
            session: None,
            phase: SessionPhase::NotStarted,
            submitted: false,
            focused_option: None,
            timer_visible: false,
            abandon_notified: false,
            result: None,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.session.as_ref().and_then(SessionState::current_question)
    }

    /// The test the live session was started from.
    pub fn test_set(&self) -> Option<&TestSet> {
        let state = self.session.as_ref()?;
        self.bank.test(state.subject, &state.test_key)
    }

    /// Whether the reading passage belongs next to the current question.
    pub fn passage_visible(&self) -> bool {
        match (self.session.as_ref(), self.test_set(), self.current_question()) {
            (Some(state), Some(test), Some(question)) => {
                test.passage_visible(state.subject, question)
            }
            _ => false,
        }
    }

    /// Open a subject and list its startable tests.
    pub fn select_exam(&self, subject: Subject) -> Result<Vec<&TestSet>, SessionError> {
        let bank = self
            .bank
            .subject(subject)
            .ok_or(SessionError::UnknownSubject(subject))?;
        self.events.emit(&Event::ExamSelected { subject });
        Ok(bank.available_tests().collect())
    }

    /// Start a fresh attempt, replacing whatever was live before.
    pub fn start(
        &mut self,
        subject: Subject,
        test_key: &str,
        count: QuestionCount,
        timed: bool,
    ) -> Result<&SessionState, SessionError> {
        let bank = Arc::clone(&self.bank);
        let test = bank
            .subject(subject)
            .ok_or(SessionError::UnknownSubject(subject))?
            .test(test_key)
            .ok_or_else(|| SessionError::UnknownTest {
                subject,
                test_key: test_key.to_string(),
            })?;
        let questions = select_questions(&test.questions, count);
        if questions.is_empty() {
            return Err(SessionError::EmptyTest {
                subject,
                test_key: test_key.to_string(),
            });
        }

        self.abandon("restarted");

        if let Some(saved) = self.storage.load_progress() {
            if saved.state.subject != subject || saved.state.test_key != test_key {
                tracing::debug!(
                    "clearing saved progress for {}/{}",
                    saved.state.subject,
                    saved.state.test_key
                );
                self.storage.clear_progress();
            }
        }

        let now = self.clock.now();
        let timer = match (timed, self.config.timer.base_minutes(subject)) {
            (true, Some(base)) => {
                TimerState::timed(now, target_ms(base, questions.len(), test.questions.len()))
            }
            (true, None) => {
                tracing::info!("no timer is available for {subject}, starting untimed");
                TimerState::untimed(now)
            }
            (false, _) => TimerState::untimed(now),
        };

        let state = SessionState {
            session_id: Uuid::new_v4(),
            subject,
            test_key: test_key.to_string(),
            count_mode: count,
            question_order: questions,
            current_index: 0,
            selections: Selections::new(),
            review_mode: false,
            timer,
        };
        tracing::debug!(
            "started {subject}/{test_key} with {} questions",
            state.question_order.len()
        );
        self.events.emit(&Event::TestStarted {
            session_id: state.session_id,
            subject,
            test_key: state.test_key.clone(),
            question_count: state.question_order.len(),
            count_mode: count,
            timed: state.timer.enabled,
        });

        self.timer_visible = state.timer.enabled;
        self.session = Some(state);
        self.phase = SessionPhase::Active;
        self.submitted = false;
        self.focused_option = None;
        self.abandon_notified = false;
        self.result = None;
        self.persist();

        self.session.as_ref().ok_or(SessionError::NoActiveSession)
    }

    fn ensure_mutable(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Active => Ok(()),
            SessionPhase::NotStarted => Err(SessionError::NoActiveSession),
            SessionPhase::Reviewing | SessionPhase::Submitted => Err(SessionError::ReadOnly),
        }
    }

    /// Apply a click on `letter` of question `question_id`.
    pub fn select(&mut self, question_id: u32, letter: &str) -> Result<PickOutcome, SessionError> {
        self.ensure_mutable()?;
        let state = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;
        let question = state
            .question(question_id)
            .ok_or(SessionError::UnknownQuestion(question_id))?;
        if !question.has_option(letter) {
            return Err(SessionError::UnknownOption {
                question_id,
                letter: letter.to_string(),
            });
        }

        let outcome = apply_pick(
            question,
            state.selections.get(question_id),
            letter,
            &self.config.option_groups,
        );
        if outcome.change == PickChange::Refused {
            tracing::debug!("question {question_id} already has its required picks");
            return Ok(outcome);
        }

        state.selections.set(question_id, outcome.letters.clone());
        self.events.emit(&Event::OptionSelected {
            session_id: state.session_id,
            question_id,
            letter: letter.to_string(),
            selected: outcome.letters.clone(),
        });
        self.persist();
        Ok(outcome)
    }

    /// [`select`](Self::select) on the current question.
    pub fn select_current(&mut self, letter: &str) -> Result<PickOutcome, SessionError> {
        let id = self
            .current_question()
            .map(|q| q.id)
            .ok_or(SessionError::NoActiveSession)?;
        self.select(id, letter)
    }

    pub fn focused_option(&self) -> Option<usize> {
        self.focused_option
    }

    /// Move the keyboard focus pointer; ignored when out of range.
    pub fn focus_option(&mut self, index: usize) {
        if self
            .current_question()
            .is_some_and(|q| index < q.options.len())
        {
            self.focused_option = Some(index);
        }
    }

    fn ensure_navigable(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Active | SessionPhase::Reviewing => Ok(()),
            SessionPhase::NotStarted | SessionPhase::Submitted => {
                Err(SessionError::NoActiveSession)
            }
        }
    }

    fn move_to(&mut self, index: usize) {
        if let Some(state) = self.session.as_mut() {
            state.current_index = index;
        }
        self.focused_option = None;
        self.persist();
    }

    /// Go to the next question. Returns `false` on the last one.
    pub fn next(&mut self) -> Result<bool, SessionError> {
        self.ensure_navigable()?;
        let state = self.session.as_ref().ok_or(SessionError::NoActiveSession)?;
        if state.is_last() {
            return Ok(false);
        }
        let index = state.current_index + 1;
        self.move_to(index);
        Ok(true)
    }

    /// Go to the previous question. Returns `false` on the first one.
    pub fn previous(&mut self) -> Result<bool, SessionError> {
        self.ensure_navigable()?;
        let state = self.session.as_ref().ok_or(SessionError::NoActiveSession)?;
        if state.is_first() {
            return Ok(false);
        }
        let index = state.current_index - 1;
        self.move_to(index);
        Ok(true)
    }

    /// Jump straight to a 0-based question index.
    pub fn jump_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_navigable()?;
        let len = self
            .session
            .as_ref()
            .ok_or(SessionError::NoActiveSession)?
            .total();
        if index >= len {
            return Err(SessionError::IndexOutOfRange { index, len });
        }
        self.move_to(index);
        Ok(())
    }

    /// Finish the attempt. Unless `confirm_unanswered` is set, a session with
    /// incomplete questions is not submitted and the caller gets the count.
    pub fn submit(&mut self, confirm_unanswered: bool) -> Result<SubmitOutcome, SessionError> {
        self.ensure_mutable()?;
        let now = self.clock.now();
        let state = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;

        let unanswered = state.unanswered_count();
        if unanswered > 0 && !confirm_unanswered {
            return Ok(SubmitOutcome::NeedsConfirmation { unanswered });
        }

        state.timer.stop(now);
        let tally = score(&state.question_order, &state.selections);
        let breakdown = category_breakdown(&state.question_order, &state.selections);
        let test_name = self
            .bank
            .test(state.subject, &state.test_key)
            .map(|t| t.title.clone())
            .unwrap_or_else(|| state.test_key.clone());
        let record = record_attempt(state, &test_name, &tally, breakdown.clone(), now);
        let elapsed_ms = state.timer.elapsed_ms(now);

        tracing::info!(
            "submitted {}/{}: {}/{} ({}%)",
            state.subject,
            state.test_key,
            tally.correct,
            tally.total,
            tally.percentage()
        );
        self.events.emit(&Event::TestCompleted {
            session_id: state.session_id,
            subject: state.subject,
            test_key: state.test_key.clone(),
            percentage: tally.percentage(),
            correct: tally.correct,
            total: tally.total,
            elapsed_ms,
        });

        self.storage.append_history(record.clone());
        self.storage.clear_progress();

        let result = SessionResult {
            score: tally,
            percentage: tally.percentage(),
            elapsed_ms,
            breakdown,
            record,
        };
        self.result = Some(result.clone());
        self.phase = SessionPhase::Submitted;
        self.submitted = true;
        self.timer_visible = false;
        self.focused_option = None;
        Ok(SubmitOutcome::Submitted(result))
    }

    /// Replay the frozen selections from the first question. Review is
    /// read-only and never persisted.
    pub fn enter_review(&mut self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::NotStarted {
            return Err(SessionError::NoActiveSession);
        }
        let state = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;
        state.current_index = 0;
        state.review_mode = true;
        self.events.emit(&Event::ReviewStarted {
            session_id: state.session_id,
        });
        self.phase = SessionPhase::Reviewing;
        self.focused_option = None;
        self.stop_timer();
        Ok(())
    }

    /// Review marks for each option of `question`.
    pub fn option_marks(&self, question: &Question) -> Vec<OptionMark> {
        let picked = self
            .session
            .as_ref()
            .map(|s| s.selections.get(question.id))
            .unwrap_or(&[]);
        question
            .options
            .iter()
            .map(|o| {
                let selected = picked.contains(&o.letter);
                let correct = question.correct_answers.contains(&o.letter);
                OptionMark {
                    letter: o.letter.clone(),
                    selected,
                    correct,
                    incorrect: selected && !correct,
                }
            })
            .collect()
    }

    /// Saved progress that could be resumed against the loaded bank.
    /// Invalid or stale snapshots are discarded.
    pub fn pending_resume(&self) -> Option<SavedSession> {
        let saved = self.storage.load_progress()?;
        if !saved.state.is_consistent() {
            tracing::warn!("discarding structurally invalid saved progress");
            self.storage.clear_progress();
            return None;
        }
        if !self.bank.contains(saved.state.subject, &saved.state.test_key) {
            tracing::warn!(
                "discarding saved progress for missing test {}/{}",
                saved.state.subject,
                saved.state.test_key
            );
            self.storage.clear_progress();
            return None;
        }
        Some(saved)
    }

    /// Restore the saved session, if it is still valid.
    pub fn resume(&mut self) -> Option<&SessionState> {
        let saved = self.pending_resume()?;
        let state = saved.state;
        self.events.emit(&Event::TestResumed {
            session_id: state.session_id,
            subject: state.subject,
            test_key: state.test_key.clone(),
            answered: state.answered_count(),
        });
        tracing::debug!(
            "resumed {}/{} at question {}",
            state.subject,
            state.test_key,
            state.current_index + 1
        );
        self.timer_visible = state.timer.enabled && state.timer.ended_at.is_none();
        self.session = Some(state);
        self.phase = SessionPhase::Active;
        self.submitted = false;
        self.focused_option = None;
        self.abandon_notified = false;
        self.result = None;
        self.session.as_ref()
    }

    /// Report that the session was left without submitting. Fires at most
    /// once per session and changes no stored state.
    pub fn abandon(&mut self, reason: &str) -> bool {
        if self.submitted || self.abandon_notified {
            return false;
        }
        let Some(state) = self.session.as_ref() else {
            return false;
        };
        self.events.emit(&Event::TestAbandoned {
            session_id: state.session_id,
            subject: state.subject,
            test_key: state.test_key.clone(),
            reason: reason.to_string(),
            answered: state.answered_count(),
            total: state.total(),
        });
        self.abandon_notified = true;
        true
    }

    /// Abandon and destroy the live session, including its saved progress.
    pub fn discard(&mut self, reason: &str) {
        self.abandon(reason);
        self.stop_timer();
        self.storage.clear_progress();
        self.session = None;
        self.phase = SessionPhase::NotStarted;
        self.submitted = false;
    }

    /// Wipe the attempt history.
    pub fn clear_history(&self) -> bool {
        let cleared = self.storage.clear_history();
        if cleared {
            self.events.emit(&Event::HistoryCleared);
        }
        cleared
    }

    pub fn timer_visible(&self) -> bool {
        self.timer_visible
    }

    /// Hide the timer display. Safe to call at any time.
    pub fn stop_timer(&mut self) {
        self.timer_visible = false;
    }

    /// Current countdown without side effects.
    pub fn timer_reading(&self) -> Option<TimerReading> {
        if !self.timer_visible {
            return None;
        }
        self.session.as_ref()?.timer.reading(self.clock.now())
    }

    /// Tick handler: reads the countdown and reports overtime once.
    pub fn poll_timer(&mut self) -> Option<TimerPoll> {
        if !self.timer_visible || self.phase != SessionPhase::Active {
            return None;
        }
        let now = self.clock.now();
        let state = self.session.as_mut()?;
        let poll = state.timer.poll(now)?;
        if poll.just_expired {
            tracing::info!("time is up for {}/{}", state.subject, state.test_key);
            self.events.emit(&Event::TimerExpired {
                session_id: state.session_id,
                target_ms: state.timer.target_ms.unwrap_or_default(),
            });
            self.persist();
        }
        Some(poll)
    }

    /// Elapsed time of the live or just-submitted session.
    pub fn elapsed_ms(&self) -> Option<u64> {
        self.session
            .as_ref()
            .map(|s| s.timer.elapsed_ms(self.clock.now()))
    }

    fn persist(&self) -> bool {
        if self.phase != SessionPhase::Active {
            return false;
        }
        let Some(state) = self.session.as_ref() else {
            return false;
        };
        self.storage.save_progress(&SavedSession {
            state: state.clone(),
            saved_at: self.clock.now(),
        })
    }
}
