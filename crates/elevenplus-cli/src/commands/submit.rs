//! The `elevenplus submit` command.

use anyhow::{bail, Result};

use elevenplus_core::error::SessionError;
use elevenplus_core::session::SubmitOutcome;

use crate::{context, render, GlobalArgs};

pub async fn execute(global: &GlobalArgs, confirm: bool, review: bool) -> Result<()> {
    let mut controller = context::resumed(global).await?;
    if controller.state().is_none() {
        bail!(SessionError::NoActiveSession);
    }

    let result = match controller.submit(confirm)? {
        SubmitOutcome::NeedsConfirmation { unanswered } => {
            println!(
                "You have {unanswered} unanswered question(s). \
                 Run `elevenplus submit --yes` to submit anyway."
            );
            return Ok(());
        }
        SubmitOutcome::Submitted(result) => result,
    };

    println!("Test submitted.\n");
    render::print_result(&result);

    if review {
        controller.enter_review()?;
        loop {
            println!("\n----------------------------------------");
            render::print_question(&controller);
            if !controller.next()? {
                break;
            }
        }
    }

    Ok(())
}
