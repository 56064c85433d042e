//! Trend analysis over the attempt history.
//!
//! Every function here takes attempts ordered oldest first, as returned by
//! [`filter_history`](crate::history::filter_history).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::{AttemptRecord, IncorrectQuestion, SubjectFilter, TimeBucket};
use crate::model::Subject;
use crate::scoring::{percentage, CategoryScore};

/// Attempts in each window of the overall trend.
pub const TREND_WINDOW: usize = 5;
/// Points of change in the overall mean that count as a trend.
pub const TREND_THRESHOLD: f64 = 5.0;
/// Most recent scores compared per category.
pub const CATEGORY_RECENT_WINDOW: usize = 3;
/// Points of change in a category that count as a swing.
pub const CATEGORY_SWING: f64 = 10.0;
/// Categories averaging below this are recommended for practice.
pub const WEAK_THRESHOLD: f64 = 60.0;
/// How many weak categories are surfaced.
pub const WEAK_LIMIT: usize = 3;

/// Direction of a score trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

impl TrendDirection {
    fn classify(delta: f64, threshold: f64) -> Self {
        if delta > threshold {
            TrendDirection::Improving
        } else if delta < -threshold {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Improving => write!(f, "improving"),
            TrendDirection::Declining => write!(f, "declining"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Sum per-category tallies across attempts and recompute percentages.
pub fn aggregate_category_breakdown<'a, I>(attempts: I) -> BTreeMap<String, CategoryScore>
where
    I: IntoIterator<Item = &'a AttemptRecord>,
{
    let mut totals: BTreeMap<String, CategoryScore> = BTreeMap::new();
    for attempt in attempts {
        for (category, score) in &attempt.category_breakdown {
            let entry = totals.entry(category.clone()).or_default();
            entry.total += score.total;
            entry.correct += score.correct;
            entry.incorrect += score.incorrect;
            entry.unanswered += score.unanswered;
        }
    }
    for score in totals.values_mut() {
        score.percentage = percentage(score.correct, score.total);
    }
    totals
}

/// Recent versus preceding mean percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSummary {
    pub recent_mean: f64,
    pub previous_mean: f64,
    pub delta: f64,
    pub direction: TrendDirection,
}

/// Compare the last [`TREND_WINDOW`] attempts with up to as many before
/// them. `None` until both windows have at least one attempt.
pub fn analyze_trend(attempts: &[&AttemptRecord]) -> Option<TrendSummary> {
    let split = attempts.len().saturating_sub(TREND_WINDOW);
    let (before, recent) = attempts.split_at(split);
    let previous = &before[before.len().saturating_sub(TREND_WINDOW)..];

    let recent_mean = mean(recent.iter().map(|a| f64::from(a.percentage)))?;
    let previous_mean = mean(previous.iter().map(|a| f64::from(a.percentage)))?;
    let delta = recent_mean - previous_mean;
    Some(TrendSummary {
        recent_mean,
        previous_mean,
        delta,
        direction: TrendDirection::classify(delta, TREND_THRESHOLD),
    })
}

fn category_series<'a>(attempts: &[&'a AttemptRecord]) -> BTreeMap<&'a str, Vec<f64>> {
    let mut series: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for attempt in attempts {
        for (category, score) in &attempt.category_breakdown {
            if score.total > 0 {
                series
                    .entry(category.as_str())
                    .or_default()
                    .push(f64::from(score.percentage));
            }
        }
    }
    series
}

/// Trend of a single category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTrend {
    pub category: String,
    pub samples: usize,
    pub average: f64,
    pub recent_mean: f64,
    pub earlier_mean: f64,
    pub delta: f64,
    pub direction: TrendDirection,
}

/// Per-category trends for categories with at least two scores.
///
/// The recent window is the last three scores, shrunk when needed so at
/// least one earlier score remains to compare against.
pub fn category_trends(attempts: &[&AttemptRecord]) -> Vec<CategoryTrend> {
    category_series(attempts)
        .into_iter()
        .filter(|(_, scores)| scores.len() >= 2)
        .filter_map(|(category, scores)| {
            let window = CATEGORY_RECENT_WINDOW.min(scores.len() - 1);
            let (earlier, recent) = scores.split_at(scores.len() - window);
            let recent_mean = mean(recent.iter().copied())?;
            let earlier_mean = mean(earlier.iter().copied())?;
            let delta = recent_mean - earlier_mean;
            Some(CategoryTrend {
                category: category.to_string(),
                samples: scores.len(),
                average: mean(scores.iter().copied())?,
                recent_mean,
                earlier_mean,
                delta,
                direction: TrendDirection::classify(delta, CATEGORY_SWING),
            })
        })
        .collect()
}

/// All-time average of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAverage {
    pub category: String,
    pub average: f64,
    pub samples: usize,
}

/// Categories averaging below [`WEAK_THRESHOLD`], weakest first, at most
/// [`WEAK_LIMIT`] of them.
pub fn weak_categories(attempts: &[&AttemptRecord]) -> Vec<CategoryAverage> {
    let mut weak: Vec<CategoryAverage> = category_series(attempts)
        .into_iter()
        .filter_map(|(category, scores)| {
            Some(CategoryAverage {
                category: category.to_string(),
                average: mean(scores.iter().copied())?,
                samples: scores.len(),
            })
        })
        .filter(|c| c.average < WEAK_THRESHOLD)
        .collect();
    weak.sort_by(|a, b| a.average.total_cmp(&b.average));
    weak.truncate(WEAK_LIMIT);
    weak
}

/// Aggregates for one time bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSummary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attempts: usize,
    pub mean_percentage: f64,
    pub categories: BTreeMap<String, CategoryScore>,
}

pub fn bucket_summaries(buckets: &[TimeBucket]) -> Vec<BucketSummary> {
    buckets
        .iter()
        .map(|bucket| BucketSummary {
            start: bucket.start,
            end: bucket.end,
            attempts: bucket.attempts.len(),
            mean_percentage: mean(bucket.attempts.iter().map(|a| f64::from(a.percentage)))
                .unwrap_or_default(),
            categories: aggregate_category_breakdown(&bucket.attempts),
        })
        .collect()
}

/// Headline numbers over a set of attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverallStats {
    pub attempts: usize,
    pub mean_percentage: f64,
    pub best_percentage: u32,
    pub latest_percentage: u32,
}

pub fn overall_stats(attempts: &[&AttemptRecord]) -> Option<OverallStats> {
    let latest = attempts.last()?;
    Some(OverallStats {
        attempts: attempts.len(),
        mean_percentage: mean(attempts.iter().map(|a| f64::from(a.percentage)))?,
        best_percentage: attempts.iter().map(|a| a.percentage).max()?,
        latest_percentage: latest.percentage,
    })
}

/// One wrong answer together with the attempt it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct MistakeEntry<'a> {
    pub timestamp: DateTime<Utc>,
    pub subject: Subject,
    pub test_key: &'a str,
    pub test_name: &'a str,
    pub question: &'a IncorrectQuestion,
}

/// Every stored wrong answer, most recent attempt first.
///
/// `category` is matched case-insensitively; `None` keeps every category.
pub fn mistakes_index<'a>(
    history: &'a [AttemptRecord],
    subject: SubjectFilter,
    category: Option<&str>,
) -> Vec<MistakeEntry<'a>> {
    let mut attempts: Vec<&AttemptRecord> = history
        .iter()
        .filter(|a| subject.matches(a.subject))
        .collect();
    attempts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    attempts
        .into_iter()
        .flat_map(|attempt| {
            attempt.incorrect_questions.iter().map(move |q| MistakeEntry {
                timestamp: attempt.timestamp,
                subject: attempt.subject,
                test_key: &attempt.test_key,
                test_name: &attempt.test_name,
                question: q,
            })
        })
        .filter(|m| category.map_or(true, |c| m.question.category.eq_ignore_ascii_case(c)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::attempt;
    use crate::history::{bucket_by_period, filter_history, Granularity};
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()
    }

    fn series(percentages: &[u32]) -> Vec<AttemptRecord> {
        percentages
            .iter()
            .enumerate()
            .map(|(i, p)| attempt(Subject::Maths, base() + Duration::days(i as i64), *p))
            .collect()
    }

    fn with_categories(mut record: AttemptRecord, cats: &[(&str, usize, usize)]) -> AttemptRecord {
        for (name, correct, total) in cats {
            record.category_breakdown.insert(
                name.to_string(),
                CategoryScore {
                    total: *total,
                    correct: *correct,
                    incorrect: total - correct,
                    unanswered: 0,
                    percentage: percentage(*correct, *total),
                },
            );
        }
        record
    }

    fn mistake(id: u32, category: &str) -> IncorrectQuestion {
        IncorrectQuestion {
            id,
            question: format!("Question {id}"),
            category: category.into(),
            correct_answer: vec!["A".into()],
            user_answer: vec!["B".into()],
            options: vec![],
            instruction: None,
            image: None,
        }
    }

    #[test]
    fn overall_trend_compares_two_windows() {
        let history = series(&[40, 40, 40, 40, 40, 60, 60, 60, 60, 60]);
        let refs: Vec<_> = history.iter().collect();
        let trend = analyze_trend(&refs).unwrap();
        assert_eq!(trend.recent_mean, 60.0);
        assert_eq!(trend.previous_mean, 40.0);
        assert_eq!(trend.direction, TrendDirection::Improving);

        let history = series(&[70, 66]);
        let refs: Vec<_> = history.iter().collect();
        assert!(analyze_trend(&refs).is_none(), "both attempts fall in the recent window");

        let history = series(&[70, 70, 70, 66, 66, 66]);
        let refs: Vec<_> = history.iter().collect();
        let trend = analyze_trend(&refs).unwrap();
        assert_eq!(trend.previous_mean, 70.0);
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn only_five_preceding_attempts_count() {
        let history = series(&[0, 0, 0, 80, 80, 80, 80, 80, 50, 50, 50, 50, 50]);
        let refs: Vec<_> = history.iter().collect();
        let trend = analyze_trend(&refs).unwrap();
        assert_eq!(trend.previous_mean, 80.0);
        assert_eq!(trend.direction, TrendDirection::Declining);
    }

    #[test]
    fn category_trend_flags_swings() {
        let history: Vec<_> = series(&[50, 50, 50, 50])
            .into_iter()
            .zip([(2, 10), (3, 10), (8, 10), (9, 10)])
            .map(|(r, (c, t))| with_categories(r, &[("Number", c, t), ("Shapes", 5, 10)]))
            .collect();
        let refs: Vec<_> = history.iter().collect();
        let trends = category_trends(&refs);
        assert_eq!(trends.len(), 2);

        let number = &trends[0];
        assert_eq!(number.category, "Number");
        assert_eq!(number.earlier_mean, 20.0);
        assert!((number.recent_mean - 66.666).abs() < 0.01);
        assert_eq!(number.direction, TrendDirection::Improving);
        assert_eq!(trends[1].direction, TrendDirection::Stable);
    }

    #[test]
    fn category_trend_needs_two_points() {
        let history = vec![with_categories(
            attempt(Subject::Maths, base(), 50),
            &[("Logic", 1, 2)],
        )];
        let refs: Vec<_> = history.iter().collect();
        assert!(category_trends(&refs).is_empty());

        let history: Vec<_> = series(&[50, 50])
            .into_iter()
            .zip([(9, 10), (5, 10)])
            .map(|(r, (c, t))| with_categories(r, &[("Logic", c, t)]))
            .collect();
        let refs: Vec<_> = history.iter().collect();
        let trends = category_trends(&refs);
        assert_eq!(trends[0].delta, -40.0);
        assert_eq!(trends[0].direction, TrendDirection::Declining);
    }

    #[test]
    fn weak_categories_sorted_and_capped() {
        let history = vec![with_categories(
            attempt(Subject::English, base(), 50),
            &[
                ("Grammar", 5, 10),
                ("Spelling", 2, 10),
                ("Vocabulary", 9, 10),
                ("Punctuation", 4, 10),
                ("Comprehension", 3, 10),
            ],
        )];
        let refs: Vec<_> = history.iter().collect();
        let weak = weak_categories(&refs);
        let names: Vec<_> = weak.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["Spelling", "Comprehension", "Punctuation"]);
    }

    #[test]
    fn aggregated_breakdown_sums_before_dividing() {
        let history = vec![
            with_categories(attempt(Subject::Maths, base(), 50), &[("Number", 1, 4)]),
            with_categories(attempt(Subject::Maths, base(), 50), &[("Number", 5, 6)]),
        ];
        let totals = aggregate_category_breakdown(&history);
        assert_eq!(totals["Number"].total, 10);
        assert_eq!(totals["Number"].correct, 6);
        assert_eq!(totals["Number"].percentage, 60);
    }

    #[test]
    fn bucket_summaries_and_overall_stats() {
        let history = series(&[40, 60, 90]);
        let buckets = bucket_by_period(&history, Granularity::Month, &Utc);
        let summaries = bucket_summaries(&buckets);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].attempts, 3);
        assert!((summaries[0].mean_percentage - 63.333).abs() < 0.01);

        let refs = filter_history(&history, SubjectFilter::All);
        let stats = overall_stats(&refs).unwrap();
        assert_eq!(stats.best_percentage, 90);
        assert_eq!(stats.latest_percentage, 90);
        assert_eq!(stats.attempts, 3);
        assert!(overall_stats(&[]).is_none());
    }

    #[test]
    fn mistakes_are_most_recent_first_and_filterable() {
        let mut older = attempt(Subject::Maths, base(), 50);
        older.incorrect_questions = vec![mistake(1, "Number"), mistake(2, "Shapes")];
        let mut newer = attempt(Subject::Maths, base() + Duration::days(3), 60);
        newer.incorrect_questions = vec![mistake(7, "Number")];
        let mut english = attempt(Subject::English, base() + Duration::days(1), 70);
        english.incorrect_questions = vec![mistake(4, "Grammar")];
        let history = vec![older, newer, english];

        let all = mistakes_index(&history, SubjectFilter::All, None);
        let ids: Vec<_> = all.iter().map(|m| m.question.id).collect();
        assert_eq!(ids, vec![7, 4, 1, 2]);

        let maths_numbers = mistakes_index(
            &history,
            SubjectFilter::Only(Subject::Maths),
            Some("number"),
        );
        let ids: Vec<_> = maths_numbers.iter().map(|m| m.question.id).collect();
        assert_eq!(ids, vec![7, 1]);
    }
}
