//! The `elevenplus mistakes` command.

use anyhow::Result;
use chrono::Local;
use comfy_table::{Cell, ContentArrangement, Table};

use elevenplus_core::history::SubjectFilter;
use elevenplus_core::statistics::mistakes_index;

use crate::{context, GlobalArgs};

pub fn execute(
    global: &GlobalArgs,
    subject: SubjectFilter,
    category: Option<String>,
) -> Result<()> {
    let config = context::config(global)?;
    let history = context::storage(&config).load_history();
    let mistakes = mistakes_index(history.entries(), subject, category.as_deref());
    if mistakes.is_empty() {
        println!("No mistakes recorded.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Date", "Test", "Q", "Category", "Question", "Yours", "Correct"]);
    for m in &mistakes {
        table.add_row(vec![
            Cell::new(m.timestamp.with_timezone(&Local).format("%Y-%m-%d")),
            Cell::new(m.test_name),
            Cell::new(m.question.id),
            Cell::new(&m.question.category),
            Cell::new(&m.question.question),
            Cell::new(m.question.user_answer.join(", ")),
            Cell::new(m.question.correct_answer.join(", ")),
        ]);
    }
    println!("{table}");
    println!("{} mistake(s)", mistakes.len());
    Ok(())
}
