//! The `elevenplus trends` command.

use anyhow::Result;
use chrono::Local;
use comfy_table::{Cell, Table};

use elevenplus_core::history::{
    bucket_by_period, filter_history, visible_range, Granularity, SubjectFilter,
};
use elevenplus_core::statistics::{
    analyze_trend, bucket_summaries, category_trends, overall_stats, weak_categories,
};

use crate::{context, GlobalArgs};

pub fn execute(
    global: &GlobalArgs,
    subject: Option<SubjectFilter>,
    granularity: Option<Granularity>,
    range: Option<u8>,
) -> Result<()> {
    let config = context::config(global)?;
    let storage = context::storage(&config);

    let mut prefs = storage.load_trend_prefs();
    let changed = subject.is_some() || granularity.is_some() || range.is_some();
    if let Some(subject) = subject {
        prefs.exam_filter = subject;
    }
    if let Some(granularity) = granularity {
        prefs.granularity = granularity;
    }
    if let Some(range) = range {
        prefs.range_percent = range;
    }
    if changed {
        storage.save_trend_prefs(&prefs);
    }

    let history = storage.load_history();
    let attempts = filter_history(history.entries(), prefs.exam_filter);
    let Some(stats) = overall_stats(&attempts) else {
        println!("No attempts yet for {}.", prefs.exam_filter);
        return Ok(());
    };

    println!(
        "{} attempt(s) | average {:.0}% | best {}% | latest {}%",
        stats.attempts, stats.mean_percentage, stats.best_percentage, stats.latest_percentage
    );
    match analyze_trend(&attempts) {
        Some(trend) => println!(
            "Trend: {} ({:+.1} points, last {:.0}% vs previous {:.0}%)",
            trend.direction, trend.delta, trend.recent_mean, trend.previous_mean
        ),
        None => println!("Trend: not enough attempts yet"),
    }

    let buckets = bucket_by_period(attempts.iter().copied(), prefs.granularity, &Local);
    let shown = visible_range(&buckets, prefs.range_percent);
    let mut table = Table::new();
    table.set_header(vec![
        format!("{} starting", prefs.granularity),
        "Attempts".to_string(),
        "Average".to_string(),
        "Categories".to_string(),
    ]);
    for summary in bucket_summaries(shown) {
        let categories = summary
            .categories
            .iter()
            .map(|(name, score)| format!("{name} {}%", score.percentage))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(summary.start.with_timezone(&Local).format("%Y-%m-%d")),
            Cell::new(summary.attempts),
            Cell::new(format!("{:.0}%", summary.mean_percentage)),
            Cell::new(categories),
        ]);
    }
    println!("\n{table}");

    let trends = category_trends(&attempts);
    if !trends.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Category", "Average", "Recent", "Earlier", "Trend"]);
        for t in &trends {
            table.add_row(vec![
                Cell::new(&t.category),
                Cell::new(format!("{:.0}%", t.average)),
                Cell::new(format!("{:.0}%", t.recent_mean)),
                Cell::new(format!("{:.0}%", t.earlier_mean)),
                Cell::new(t.direction),
            ]);
        }
        println!("\n{table}");
    }

    let weak = weak_categories(&attempts);
    if !weak.is_empty() {
        println!("\nFocus next on:");
        for c in &weak {
            println!("  {} (average {:.0}%)", c.category, c.average);
        }
    }

    Ok(())
}
