//! Timer engine: proportional time budgets, countdown/overtime readings and
//! the cancellable one-second tick.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::Subject;

/// Interval of the display tick.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Per-subject base minutes for a full-length test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_base_minutes")]
    pub base_minutes: BTreeMap<Subject, u32>,
}

fn default_base_minutes() -> BTreeMap<Subject, u32> {
    BTreeMap::from([
        (Subject::Maths, 50),
        (Subject::English, 50),
        (Subject::VerbalReasoning, 60),
        (Subject::NonVerbalReasoning, 40),
    ])
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            base_minutes: default_base_minutes(),
        }
    }
}

impl TimerConfig {
    /// Base minutes for `subject`; `None` means no timer is offered.
    pub fn base_minutes(&self, subject: Subject) -> Option<u32> {
        self.base_minutes.get(&subject).copied()
    }
}

/// Time budget scaled by the fraction of the bank that was selected.
pub fn target_ms(base_minutes: u32, selected: usize, total: usize) -> u64 {
    if total == 0 {
        return 0;
    }
    let full_ms = f64::from(base_minutes) * 60_000.0;
    (full_ms * selected as f64 / total as f64).round() as u64
}

/// What the countdown shows at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerReading {
    Remaining { remaining_ms: u64 },
    Overtime { over_ms: u64 },
}

impl TimerReading {
    pub fn is_overtime(&self) -> bool {
        matches!(self, TimerReading::Overtime { .. })
    }

    /// `MM:SS` for the countdown, `+MM:SS` once over time.
    pub fn display(&self) -> String {
        match self {
            TimerReading::Remaining { remaining_ms } => format_clock(*remaining_ms),
            TimerReading::Overtime { over_ms } => format!("+{}", format_clock(*over_ms)),
        }
    }
}

/// Result of polling the timer on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerPoll {
    pub reading: TimerReading,
    /// True only on the first poll that observed overtime.
    pub just_expired: bool,
}

/// Timer fields of a session, persisted with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub enabled: bool,
    #[serde(default)]
    pub target_ms: Option<u64>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Set once the overtime transition has been reported.
    #[serde(default)]
    pub overtime_notified: bool,
}

impl TimerState {
    pub fn untimed(started_at: DateTime<Utc>) -> Self {
        Self {
            enabled: false,
            target_ms: None,
            started_at,
            ended_at: None,
            overtime_notified: false,
        }
    }

    pub fn timed(started_at: DateTime<Utc>, target_ms: u64) -> Self {
        Self {
            enabled: true,
            target_ms: Some(target_ms),
            ..Self::untimed(started_at)
        }
    }

    /// Elapsed time, frozen at `ended_at` once the session was submitted.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let end = self.ended_at.unwrap_or(now);
        (end - self.started_at).num_milliseconds().max(0) as u64
    }

    /// Current countdown reading, or `None` when the timer is off.
    pub fn reading(&self, now: DateTime<Utc>) -> Option<TimerReading> {
        if !self.enabled {
            return None;
        }
        let target = self.target_ms?;
        let elapsed = self.elapsed_ms(now);
        Some(if elapsed >= target {
            TimerReading::Overtime {
                over_ms: elapsed - target,
            }
        } else {
            TimerReading::Remaining {
                remaining_ms: target - elapsed,
            }
        })
    }

    /// Reading plus edge detection: `just_expired` is reported once.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<TimerPoll> {
        let reading = self.reading(now)?;
        let just_expired = reading.is_overtime() && !self.overtime_notified;
        if just_expired {
            self.overtime_notified = true;
        }
        Some(TimerPoll {
            reading,
            just_expired,
        })
    }

    /// Freeze the clock. Calling it again keeps the first end time.
    pub fn stop(&mut self, now: DateTime<Utc>) {
        if self.ended_at.is_none() {
            self.ended_at = Some(now);
        }
    }
}

/// Format milliseconds as `MM:SS` (minutes may exceed 59).
pub fn format_clock(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Cancellable periodic tick delivered over a channel.
#[derive(Debug, Default)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking every `period`, cancelling any tick already running.
    /// The first tick arrives immediately.
    pub fn start(&mut self, period: Duration) -> mpsc::UnboundedReceiver<()> {
        self.stop();
        let (tx, rx) = mpsc::unbounded_channel();
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if tx.send(()).is_err() {
                    break;
                }
            }
        }));
        rx
    }

    /// Cancel the tick. Safe to call repeatedly or before `start`.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::fixed_test_clock;

    #[test]
    fn target_scales_with_selected_fraction() {
        assert_eq!(target_ms(50, 10, 40), 750_000);
        assert_eq!(target_ms(50, 40, 40), 3_000_000);
        assert_eq!(target_ms(40, 1, 3), 800_000);
        assert_eq!(target_ms(60, 5, 0), 0);
    }

    #[test]
    fn default_lookup_leaves_verbal_skills_untimed() {
        let config = TimerConfig::default();
        assert_eq!(config.base_minutes(Subject::Maths), Some(50));
        assert_eq!(config.base_minutes(Subject::VerbalSkills), None);
    }

    #[test]
    fn overtime_fires_exactly_once() {
        let mut clock = fixed_test_clock();
        let mut timer = TimerState::timed(clock.now(), 750_000);

        clock.advance(chrono::Duration::milliseconds(749_000));
        let poll = timer.poll(clock.now()).unwrap();
        assert_eq!(poll.reading, TimerReading::Remaining { remaining_ms: 1_000 });
        assert!(!poll.just_expired);

        clock.advance(chrono::Duration::milliseconds(1_000));
        let poll = timer.poll(clock.now()).unwrap();
        assert_eq!(poll.reading, TimerReading::Overtime { over_ms: 0 });
        assert!(poll.just_expired);

        let mut fired = 0;
        for _ in 0..20 {
            clock.advance(chrono::Duration::seconds(1));
            if timer.poll(clock.now()).unwrap().just_expired {
                fired += 1;
            }
        }
        assert_eq!(fired, 0);
        assert_eq!(
            timer.reading(clock.now()),
            Some(TimerReading::Overtime { over_ms: 20_000 })
        );
    }

    #[test]
    fn untimed_sessions_have_no_reading_but_track_elapsed() {
        let mut clock = fixed_test_clock();
        let mut timer = TimerState::untimed(clock.now());
        clock.advance(chrono::Duration::seconds(42));
        assert!(timer.poll(clock.now()).is_none());
        assert_eq!(timer.elapsed_ms(clock.now()), 42_000);
    }

    #[test]
    fn stop_freezes_elapsed_and_is_idempotent() {
        let mut clock = fixed_test_clock();
        let mut timer = TimerState::timed(clock.now(), 60_000);
        clock.advance(chrono::Duration::seconds(30));
        timer.stop(clock.now());
        clock.advance(chrono::Duration::seconds(30));
        timer.stop(clock.now());
        assert_eq!(timer.elapsed_ms(clock.now()), 30_000);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(750_000), "12:30");
        assert_eq!(
            TimerReading::Overtime { over_ms: 61_500 }.display(),
            "+01:01"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_ticks_and_stops() {
        let mut ticker = Ticker::new();
        ticker.stop();

        let mut ticks = ticker.start(TICK_PERIOD);
        for _ in 0..3 {
            assert_eq!(ticks.recv().await, Some(()));
        }
        assert!(ticker.is_running());

        ticker.stop();
        ticker.stop();
        while ticks.recv().await.is_some() {}
        assert!(!ticker.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_cancels_the_previous_tick() {
        let mut ticker = Ticker::new();
        let mut first = ticker.start(TICK_PERIOD);
        assert_eq!(first.recv().await, Some(()));

        let mut second = ticker.start(TICK_PERIOD);
        while first.recv().await.is_some() {}
        assert_eq!(second.recv().await, Some(()));
    }
}
