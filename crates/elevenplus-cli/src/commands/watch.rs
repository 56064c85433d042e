//! The `elevenplus watch` command: a live countdown for the current test.

use anyhow::{bail, Result};

use elevenplus_core::error::SessionError;
use elevenplus_core::timer::{Ticker, TICK_PERIOD};

use crate::{context, GlobalArgs};

pub async fn execute(global: &GlobalArgs, max_ticks: Option<u32>) -> Result<()> {
    let mut controller = context::resumed(global).await?;
    if controller.state().is_none() {
        bail!(SessionError::NoActiveSession);
    }
    if controller.timer_reading().is_none() {
        println!("This test is not timed.");
        return Ok(());
    }

    let mut ticker = Ticker::new();
    let mut ticks = ticker.start(TICK_PERIOD);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut seen = 0u32;
    loop {
        tokio::select! {
            tick = ticks.recv() => {
                if tick.is_none() {
                    break;
                }
                let Some(poll) = controller.poll_timer() else {
                    break;
                };
                let label = if poll.reading.is_overtime() { "over time" } else { "remaining" };
                println!("{} {label}", poll.reading.display());
                if poll.just_expired {
                    println!("Time is up! You can keep going; the extra time is recorded.");
                }
                seen += 1;
                if max_ticks.is_some_and(|max| seen >= max) {
                    break;
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    ticker.stop();
    controller.stop_timer();
    Ok(())
}
