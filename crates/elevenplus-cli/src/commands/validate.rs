//! The `elevenplus validate` command.

use anyhow::Result;

use elevenplus_core::parser::validate_bank;

use crate::{context, GlobalArgs};

pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let config = context::config(global)?;
    let bank = context::bank(&config).await?;

    for (subject, subject_bank) in &bank.subjects {
        let questions: usize = subject_bank.tests.iter().map(|t| t.questions.len()).sum();
        println!(
            "{}: {} tests, {} available, {questions} questions",
            subject.title(),
            subject_bank.tests.len(),
            subject_bank.available_tests().count(),
        );
    }

    let warnings = validate_bank(&bank);
    for w in &warnings {
        let location = match w.question_id {
            Some(id) => format!("{}/{}#{id}", w.subject, w.test_key),
            None => format!("{}/{}", w.subject, w.test_key),
        };
        println!("  [{location}] WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("All question banks valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
