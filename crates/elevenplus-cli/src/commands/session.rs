//! Commands that drive the live test: start, show, select, navigation,
//! resume and abandon.
//!
//! Each command restores the saved session, applies one transition and lets
//! the controller persist the result.

use anyhow::{bail, Result};

use elevenplus_core::answer::PickChange;
use elevenplus_core::error::SessionError;
use elevenplus_core::model::Subject;
use elevenplus_core::sampling::QuestionCount;
use elevenplus_core::session::SessionController;
use elevenplus_core::storage::SetupPrefs;

use crate::{context, render, GlobalArgs};

fn require_session(controller: &SessionController) -> Result<()> {
    if controller.state().is_none() {
        bail!(SessionError::NoActiveSession);
    }
    Ok(())
}

pub async fn start(
    global: &GlobalArgs,
    subject: Subject,
    test: String,
    count: Option<QuestionCount>,
    timed: Option<bool>,
) -> Result<()> {
    let mut controller = context::resumed(global).await?;
    let prefs = controller.storage().load_setup_prefs();
    let count = count.unwrap_or(prefs.question_count);
    let timed = timed.unwrap_or(prefs.timer_enabled);

    match controller.start(subject, &test, count, timed) {
        Ok(_) => {}
        Err(e) if e.is_notice() => {
            println!("Notice: {e}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    controller.storage().save_setup_prefs(&SetupPrefs {
        question_count: count,
        timer_enabled: timed,
    });
    render::print_question(&controller);
    Ok(())
}

pub async fn show(global: &GlobalArgs) -> Result<()> {
    let controller = context::resumed(global).await?;
    require_session(&controller)?;
    render::print_question(&controller);
    Ok(())
}

pub async fn select(
    global: &GlobalArgs,
    letters: Vec<String>,
    question: Option<u32>,
) -> Result<()> {
    let mut controller = context::resumed(global).await?;
    require_session(&controller)?;

    for letter in letters {
        let letter = letter.trim().to_uppercase();
        let outcome = match question {
            Some(id) => controller.select(id, &letter)?,
            None => controller.select_current(&letter)?,
        };
        if outcome.change == PickChange::Refused {
            println!(
                "Already {} answers selected; deselect one before picking {letter}.",
                outcome.letters.len()
            );
        }
    }

    render::print_question(&controller);
    Ok(())
}

pub async fn next(global: &GlobalArgs) -> Result<()> {
    let mut controller = context::resumed(global).await?;
    require_session(&controller)?;
    if !controller.next()? {
        println!("Already at the last question. Run `elevenplus submit` when you are done.\n");
    }
    render::print_question(&controller);
    Ok(())
}

pub async fn prev(global: &GlobalArgs) -> Result<()> {
    let mut controller = context::resumed(global).await?;
    require_session(&controller)?;
    if !controller.previous()? {
        println!("Already at the first question.\n");
    }
    render::print_question(&controller);
    Ok(())
}

pub async fn jump(global: &GlobalArgs, position: usize) -> Result<()> {
    let mut controller = context::resumed(global).await?;
    require_session(&controller)?;
    let Some(index) = position.checked_sub(1) else {
        bail!("question positions start at 1");
    };
    controller.jump_to(index)?;
    render::print_question(&controller);
    Ok(())
}

pub async fn resume(global: &GlobalArgs) -> Result<()> {
    let mut controller = context::controller(global).await?;
    let Some(saved) = controller.pending_resume() else {
        println!("No saved test to resume.");
        return Ok(());
    };

    controller.resume();
    let state = &saved.state;
    println!(
        "Resuming {} {} ({} of {} answered, saved {})\n",
        state.subject.title(),
        state.test_key,
        state.answered_count(),
        state.total(),
        saved
            .saved_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M"),
    );
    render::print_question(&controller);
    Ok(())
}

pub async fn abandon(global: &GlobalArgs, discard: bool) -> Result<()> {
    let mut controller = context::resumed(global).await?;
    if controller.state().is_none() {
        println!("No test in progress.");
        return Ok(());
    }

    if discard {
        controller.discard("discarded");
        println!("Test abandoned and saved progress deleted.");
    } else {
        controller.abandon("left");
        println!("Test left. Progress is saved; run `elevenplus resume` to continue.");
    }
    Ok(())
}
