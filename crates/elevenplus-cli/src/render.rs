//! Terminal rendering of questions and results.

use comfy_table::{Cell, Table};

use elevenplus_core::answer::required_selection_count;
use elevenplus_core::session::{SessionController, SessionPhase, SessionResult};
use elevenplus_core::timer::format_clock;

/// Print the current question with its options, marks and progress.
pub fn print_question(controller: &SessionController) {
    let (Some(state), Some(question)) = (controller.state(), controller.current_question()) else {
        println!("No test in progress.");
        return;
    };
    let title = controller
        .test_set()
        .map(|t| t.title.as_str())
        .unwrap_or(state.test_key.as_str());
    let (position, total) = state.position();
    let reviewing = controller.phase() == SessionPhase::Reviewing;

    println!(
        "{title}: Question {position} of {total}{}",
        if reviewing { " (review)" } else { "" }
    );
    if let Some(reading) = controller.timer_reading() {
        let label = if reading.is_overtime() {
            "over time"
        } else {
            "remaining"
        };
        println!("Time: {} {label}", reading.display());
    }

    if controller.passage_visible() {
        if let Some(test) = controller.test_set() {
            println!("\n== {} ==", test.passage_heading());
            if let Some(passage) = &test.passage {
                println!("{passage}");
            }
        }
    }

    println!();
    if let Some(instruction) = &question.instruction {
        println!("{instruction}");
    }
    println!("{}. {}", question.id, question.question);
    if let Some(image) = &question.image {
        println!("[image: {image}]");
    }

    for (index, mark) in controller.option_marks(question).iter().enumerate() {
        let text = question
            .options
            .get(index)
            .map(|o| o.text.as_str())
            .unwrap_or_default();
        let pointer = if controller.focused_option() == Some(index) {
            ">"
        } else {
            " "
        };
        let marker = if reviewing {
            match (mark.selected, mark.correct) {
                (true, true) => "[+]",
                (true, false) => "[x]",
                (false, true) => "[=]",
                (false, false) => "[ ]",
            }
        } else if mark.selected {
            "[*]"
        } else {
            "[ ]"
        };
        println!("{pointer}{marker} {}) {text}", mark.letter);
    }

    let required = required_selection_count(question);
    if required > 1 && !reviewing {
        println!("\nSelect {required} answers.");
    }
    println!("\nAnswered {}/{}", state.answered_count(), state.total());
}

/// Print the score summary and per-category table.
pub fn print_result(result: &SessionResult) {
    println!(
        "Score: {}/{} ({}%)",
        result.score.correct, result.score.total, result.percentage
    );
    println!(
        "Correct: {}  Incorrect: {}  Unanswered: {}",
        result.score.correct, result.score.incorrect, result.score.unanswered
    );
    println!("Time taken: {}", format_clock(result.elapsed_ms));

    let mut table = Table::new();
    table.set_header(vec!["Category", "Correct", "Total", "Score"]);
    for (category, score) in &result.breakdown {
        table.add_row(vec![
            Cell::new(category),
            Cell::new(score.correct),
            Cell::new(score.total),
            Cell::new(format!("{}%", score.percentage)),
        ]);
    }
    println!("\n{table}");
}
