//! The `elevenplus subjects` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use elevenplus_core::model::Subject;

use crate::{context, GlobalArgs};

pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let controller = context::controller(global).await?;

    let mut table = Table::new();
    table.set_header(vec!["Subject", "Test", "Title", "Questions"]);
    for subject in Subject::ALL {
        let Ok(tests) = controller.select_exam(subject) else {
            continue;
        };
        if tests.is_empty() {
            table.add_row(vec![
                Cell::new(subject.title()),
                Cell::new("-"),
                Cell::new("No tests available yet"),
                Cell::new(0),
            ]);
        }
        for test in tests {
            table.add_row(vec![
                Cell::new(subject.title()),
                Cell::new(&test.key),
                Cell::new(&test.title),
                Cell::new(test.questions.len()),
            ]);
        }
    }

    println!("{table}");
    Ok(())
}
