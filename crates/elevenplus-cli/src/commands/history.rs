//! The `elevenplus history` command.

use anyhow::Result;
use chrono::Local;
use comfy_table::{Cell, Table};

use elevenplus_core::history::{filter_history, SubjectFilter};
use elevenplus_core::timer::format_clock;

use crate::{context, GlobalArgs};

pub fn execute(global: &GlobalArgs, subject: Option<SubjectFilter>, clear: bool) -> Result<()> {
    if clear {
        let controller = context::history_controller(global)?;
        if controller.clear_history() {
            println!("History cleared.");
        } else {
            println!("Could not clear history; see the log for details.");
        }
        return Ok(());
    }

    let config = context::config(global)?;
    let history = context::storage(&config).load_history();
    let attempts = filter_history(history.entries(), subject.unwrap_or_default());
    if attempts.is_empty() {
        println!("No attempts yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Subject", "Test", "Score", "%", "Time"]);
    for attempt in attempts.iter().rev() {
        table.add_row(vec![
            Cell::new(
                attempt
                    .timestamp
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M"),
            ),
            Cell::new(attempt.subject.title()),
            Cell::new(&attempt.test_name),
            Cell::new(format!("{}/{}", attempt.correct_count, attempt.total_questions)),
            Cell::new(format!("{}%", attempt.percentage)),
            Cell::new(attempt.elapsed_ms.map(format_clock).unwrap_or_default()),
        ]);
    }
    println!("{table}");
    println!("{} attempt(s)", attempts.len());
    Ok(())
}
