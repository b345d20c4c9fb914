//! `hk drop` commands.

use chrono::TimeDelta;
use headless_kit_storefront::config::DropConfig;
use headless_kit_storefront::drop_timer::{DropClock, DropState, Phase};
use headless_kit_storefront::error::Result;

fn clock() -> Result<Option<DropClock>> {
    Ok(DropConfig::from_env()?.as_ref().map(DropClock::from))
}

/// `HH:MM:SS`, with a day count once the drop is more than a day away.
fn format_remaining(remaining: TimeDelta) -> String {
    let total = remaining.num_seconds().max(0);
    let (days, hours) = (total / 86_400, total % 86_400 / 3600);
    let (minutes, seconds) = (total % 3600 / 60, total % 60);
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

fn describe(state: &DropState, exact: bool) -> String {
    let marks = state.marks(exact);
    let phase = match marks.phase {
        Phase::Ready => "open",
        Phase::AlmostReady => "almost ready",
        Phase::Countdown => "counting down",
    };
    let progress = state
        .progress
        .map_or_else(String::new, |p| format!("  {:.1}%", p.clamp(0.0, 1.0) * 100.0));

    let reached: Vec<&str> = [
        (marks.seven_minute_mark, "7m"),
        (marks.five_minute_mark, "5m"),
        (marks.three_minute_mark, "3m"),
        (marks.one_minute_mark, "1m"),
        (marks.thirty_seconds_mark, "30s"),
        (marks.five_seconds_mark, "5s"),
        (marks.one_second_mark, "1s"),
    ]
    .into_iter()
    .filter_map(|(hit, label)| hit.then_some(label))
    .collect();
    let reached = if reached.is_empty() {
        String::new()
    } else {
        format!("  marks: {}", reached.join(" "))
    };

    format!(
        "{} {phase}{progress}{reached}",
        format_remaining(state.time_remaining)
    )
}

#[allow(clippy::print_stdout)]
pub fn status(exact: bool) -> Result<()> {
    match clock()? {
        Some(clock) => println!("{}", describe(&clock.state(), exact)),
        None => println!("No drop scheduled (set HK_DROP_END_AT)."),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn wait() -> Result<()> {
    let Some(clock) = clock()? else {
        println!("No drop scheduled (set HK_DROP_END_AT).");
        return Ok(());
    };

    tracing::info!(end = %clock.end(), "Waiting for drop");
    let (mut rx, handle) = clock.watch();

    loop {
        let state = *rx.borrow_and_update();
        println!("{}", describe(&state, false));
        if state.is_completed || rx.changed().await.is_err() {
            break;
        }
    }

    if let Err(e) = handle.await {
        tracing::warn!(error = %e, "Drop timer task ended abnormally");
    }
    println!("The drop is open.");
    Ok(())
}
