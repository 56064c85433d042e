//! Attempt records, the bounded history log and calendar bucketing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AnswerOption, Subject};
use crate::scoring::{category_of, outcome_of, CategoryScore, Outcome, Score};
use crate::session::SessionState;

/// Default number of attempts kept in the history log.
pub const HISTORY_CAP: usize = 100;

/// A question the user got wrong, captured at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncorrectQuestion {
    pub id: u32,
    pub question: String,
    pub category: String,
    pub correct_answer: Vec<String>,
    pub user_answer: Vec<String>,
    pub options: Vec<AnswerOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Immutable snapshot of one completed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub timestamp: DateTime<Utc>,
    pub subject: Subject,
    pub test_key: String,
    pub test_name: String,
    pub total_questions: usize,
    pub correct_count: usize,
    pub percentage: u32,
    #[serde(default)]
    pub category_breakdown: BTreeMap<String, CategoryScore>,
    #[serde(default)]
    pub incorrect_questions: Vec<IncorrectQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

/// Build the attempt record for a finished session.
pub fn record_attempt(
    session: &SessionState,
    test_name: &str,
    score: &Score,
    breakdown: BTreeMap<String, CategoryScore>,
    now: DateTime<Utc>,
) -> AttemptRecord {
    let incorrect_questions = session
        .question_order
        .iter()
        .filter(|q| outcome_of(q, &session.selections) == Outcome::Incorrect)
        .map(|q| IncorrectQuestion {
            id: q.id,
            question: q.question.clone(),
            category: category_of(q).to_string(),
            correct_answer: q.correct_answers.clone(),
            user_answer: session.selections.get(q.id).to_vec(),
            options: q.options.clone(),
            instruction: q.instruction.clone(),
            image: q.image.clone(),
        })
        .collect();

    AttemptRecord {
        timestamp: now,
        subject: session.subject,
        test_key: session.test_key.clone(),
        test_name: test_name.to_string(),
        total_questions: score.total,
        correct_count: score.correct,
        percentage: score.percentage(),
        category_breakdown: breakdown,
        incorrect_questions,
        elapsed_ms: Some(session.timer.elapsed_ms(now)),
    }
}

/// Append-only attempt log, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog(Vec<AttemptRecord>);

impl From<Vec<AttemptRecord>> for HistoryLog {
    fn from(records: Vec<AttemptRecord>) -> Self {
        Self(records)
    }
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, evicting the oldest entries beyond `cap`.
    pub fn push(&mut self, record: AttemptRecord, cap: usize) {
        self.0.push(record);
        if self.0.len() > cap {
            let excess = self.0.len() - cap;
            self.0.drain(..excess);
        }
    }

    pub fn entries(&self) -> &[AttemptRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Either every subject or a single one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SubjectFilter {
    #[default]
    All,
    Only(Subject),
}

impl SubjectFilter {
    pub fn matches(&self, subject: Subject) -> bool {
        match self {
            SubjectFilter::All => true,
            SubjectFilter::Only(s) => *s == subject,
        }
    }
}

impl fmt::Display for SubjectFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectFilter::All => write!(f, "all"),
            SubjectFilter::Only(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for SubjectFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(SubjectFilter::All)
        } else {
            s.parse().map(SubjectFilter::Only)
        }
    }
}

impl TryFrom<String> for SubjectFilter {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SubjectFilter> for String {
    fn from(filter: SubjectFilter) -> Self {
        filter.to_string()
    }
}

/// Records matching `filter`, ordered oldest first.
pub fn filter_history(history: &[AttemptRecord], filter: SubjectFilter) -> Vec<&AttemptRecord> {
    let mut matching: Vec<&AttemptRecord> = history
        .iter()
        .filter(|r| filter.matches(r.subject))
        .collect();
    matching.sort_by_key(|r| r.timestamp);
    matching
}

/// Calendar period used to group attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    #[default]
    Week,
    Month,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Day => write!(f, "day"),
            Granularity::Week => write!(f, "week"),
            Granularity::Month => write!(f, "month"),
        }
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" => Ok(Granularity::Day),
            "week" | "weekly" => Ok(Granularity::Week),
            "month" | "monthly" => Ok(Granularity::Month),
            other => Err(format!("unknown granularity: {other}")),
        }
    }
}

impl Granularity {
    /// First calendar day of the period containing `date`. Weeks start on
    /// Monday.
    pub fn period_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }

    /// First calendar day of the following period.
    pub fn next_period_start(self, start: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => start + Duration::days(1),
            Granularity::Week => start + Duration::days(7),
            Granularity::Month => {
                let (year, month) = if start.month() == 12 {
                    (start.year() + 1, 1)
                } else {
                    (start.year(), start.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(start + Duration::days(31))
            }
        }
    }
}

/// Attempts falling inside one calendar period.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBucket {
    /// Local midnight on the first day of the period.
    pub start: DateTime<Utc>,
    /// Local midnight on the first day of the next period (exclusive).
    pub end: DateTime<Utc>,
    pub attempts: Vec<AttemptRecord>,
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
        .with_timezone(&Utc)
}

/// Group attempts by calendar period in time zone `tz`, chronologically.
pub fn bucket_by_period<'a, Tz, I>(
    attempts: I,
    granularity: Granularity,
    tz: &Tz,
) -> Vec<TimeBucket>
where
    Tz: TimeZone,
    I: IntoIterator<Item = &'a AttemptRecord>,
{
    let mut sorted: Vec<&AttemptRecord> = attempts.into_iter().collect();
    sorted.sort_by_key(|r| r.timestamp);

    let mut groups: BTreeMap<NaiveDate, Vec<AttemptRecord>> = BTreeMap::new();
    for record in sorted {
        let local_date = record.timestamp.with_timezone(tz).date_naive();
        groups
            .entry(granularity.period_start(local_date))
            .or_default()
            .push(record.clone());
    }

    groups
        .into_iter()
        .map(|(start, attempts)| TimeBucket {
            start: local_midnight(tz, start),
            end: local_midnight(tz, granularity.next_period_start(start)),
            attempts,
        })
        .collect()
}

/// The most recent `percent`% of buckets (at least one when any exist).
pub fn visible_range(buckets: &[TimeBucket], percent: u8) -> &[TimeBucket] {
    let n = buckets.len();
    if n == 0 {
        return buckets;
    }
    let percent = usize::from(percent.clamp(1, 100));
    let keep = (percent * n).div_ceil(100).max(1);
    &buckets[n - keep..]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::FixedOffset;

    pub(crate) fn attempt(subject: Subject, at: DateTime<Utc>, percentage: u32) -> AttemptRecord {
        AttemptRecord {
            timestamp: at,
            subject,
            test_key: "test1".into(),
            test_name: "Test 1".into(),
            total_questions: 10,
            correct_count: (percentage / 10) as usize,
            percentage,
            category_breakdown: BTreeMap::new(),
            incorrect_questions: vec![],
            elapsed_ms: None,
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn cap_evicts_oldest() {
        let mut log = HistoryLog::new();
        let base = utc(2024, 1, 1, 9);
        for i in 0..101 {
            log.push(
                attempt(Subject::Maths, base + Duration::hours(i), 50),
                HISTORY_CAP,
            );
        }
        assert_eq!(log.len(), 100);
        assert_eq!(log.entries()[0].timestamp, base + Duration::hours(1));
        assert_eq!(log.entries()[99].timestamp, base + Duration::hours(100));
    }

    #[test]
    fn filter_orders_oldest_first() {
        let history = vec![
            attempt(Subject::English, utc(2024, 3, 5, 10), 70),
            attempt(Subject::Maths, utc(2024, 3, 1, 10), 40),
            attempt(Subject::Maths, utc(2024, 2, 1, 10), 90),
        ];
        let maths = filter_history(&history, SubjectFilter::Only(Subject::Maths));
        assert_eq!(maths.len(), 2);
        assert_eq!(maths[0].percentage, 90);
        let all = filter_history(&history, SubjectFilter::All);
        assert_eq!(all.iter().map(|r| r.percentage).collect::<Vec<_>>(), vec![90, 40, 70]);
    }

    #[test]
    fn same_week_shares_a_bucket_next_monday_starts_another() {
        // 2024-03-04 is a Monday.
        let history = vec![
            attempt(Subject::Maths, utc(2024, 3, 4, 8), 50),
            attempt(Subject::Maths, utc(2024, 3, 10, 20), 60),
            attempt(Subject::Maths, utc(2024, 3, 11, 7), 70),
        ];
        let buckets = bucket_by_period(&history, Granularity::Week, &Utc);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].attempts.len(), 2);
        assert_eq!(buckets[0].start, utc(2024, 3, 4, 0));
        assert_eq!(buckets[0].end, utc(2024, 3, 11, 0));
        assert_eq!(buckets[1].attempts.len(), 1);
        assert_eq!(buckets[1].start, utc(2024, 3, 11, 0));
    }

    #[test]
    fn day_and_month_buckets() {
        let history = vec![
            attempt(Subject::Maths, utc(2024, 12, 31, 23), 50),
            attempt(Subject::Maths, utc(2024, 12, 1, 0), 60),
            attempt(Subject::Maths, utc(2025, 1, 2, 12), 70),
        ];
        let months = bucket_by_period(&history, Granularity::Month, &Utc);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].start, utc(2024, 12, 1, 0));
        assert_eq!(months[0].end, utc(2025, 1, 1, 0));
        assert_eq!(months[0].attempts[0].percentage, 60);

        let days = bucket_by_period(&history, Granularity::Day, &Utc);
        assert_eq!(days.len(), 3);
    }

    #[test]
    fn buckets_follow_the_given_time_zone() {
        // 23:30 UTC Sunday is already Monday in UTC+2.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let history = vec![
            attempt(Subject::Maths, Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap(), 50),
            attempt(Subject::Maths, utc(2024, 3, 9, 12), 50),
        ];
        assert_eq!(bucket_by_period(&history, Granularity::Week, &Utc).len(), 1);
        let local = bucket_by_period(&history, Granularity::Week, &tz);
        assert_eq!(local.len(), 2);
        assert_eq!(local[1].start, utc(2024, 3, 10, 22));
    }

    #[test]
    fn visible_range_keeps_most_recent_share() {
        let history: Vec<_> = (1..=10)
            .map(|d| attempt(Subject::Maths, utc(2024, 5, d, 9), 50))
            .collect();
        let buckets = bucket_by_period(&history, Granularity::Day, &Utc);
        assert_eq!(visible_range(&buckets, 100).len(), 10);
        assert_eq!(visible_range(&buckets, 25).len(), 3);
        let last = visible_range(&buckets, 1);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].start, utc(2024, 5, 10, 0));
        assert!(visible_range(&[], 50).is_empty());
    }

    #[test]
    fn filter_serde() {
        let json = serde_json::to_string(&SubjectFilter::Only(Subject::English)).unwrap();
        assert_eq!(json, "\"english\"");
        let parsed: SubjectFilter = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(parsed, SubjectFilter::All);
        assert!("week".parse::<Granularity>().is_ok());
    }
}
