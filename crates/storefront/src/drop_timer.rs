//! Countdown to a product drop.
//!
//! [`DropClock`] computes the state of a launch countdown at a given instant;
//! [`DropClock::watch`] republishes it every second until the drop opens.
//! [`countdown_marks`] reports which of the fixed countdown thresholds have
//! been reached.

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::DropConfig;

/// Interval between updates published by [`DropClock::watch`].
pub const TICK: Duration = Duration::from_secs(1);

const SEVEN_MINUTES: TimeDelta = TimeDelta::minutes(7);
const FIVE_MINUTES: TimeDelta = TimeDelta::minutes(5);
const THREE_MINUTES: TimeDelta = TimeDelta::minutes(3);
const ONE_MINUTE: TimeDelta = TimeDelta::minutes(1);
const THIRTY_SECONDS: TimeDelta = TimeDelta::seconds(30);
const FIVE_SECONDS: TimeDelta = TimeDelta::seconds(5);
const ONE_SECOND: TimeDelta = TimeDelta::seconds(1);

/// Where a countdown stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The drop is open.
    Ready,
    /// Seven minutes or less to go.
    AlmostReady,
    Countdown,
}

/// Countdown state at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropState {
    /// Time until the drop opens, rounded to whole seconds; negative once it
    /// has.
    pub time_remaining: TimeDelta,
    /// Elapsed fraction of the countdown, when a start is known.
    pub progress: Option<f64>,
    pub is_completed: bool,
}

impl DropState {
    /// Threshold flags for this state.
    #[must_use]
    pub fn marks(&self, exact: bool) -> CountdownMarks {
        countdown_marks(self.time_remaining, self.is_completed, exact)
    }
}

/// Which countdown thresholds have been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct CountdownMarks {
    pub seven_minute_mark: bool,
    pub five_minute_mark: bool,
    pub three_minute_mark: bool,
    pub one_minute_mark: bool,
    pub thirty_seconds_mark: bool,
    pub five_seconds_mark: bool,
    pub one_second_mark: bool,
    pub is_complete: bool,
    pub phase: Phase,
}

/// Compute the countdown marks for the time remaining.
///
/// With `exact`, a mark is set only when `remaining` equals its threshold;
/// otherwise once `remaining` is at or below it.
#[must_use]
pub fn countdown_marks(remaining: TimeDelta, completed: bool, exact: bool) -> CountdownMarks {
    let reached = |threshold: TimeDelta| {
        if exact {
            remaining == threshold
        } else {
            remaining <= threshold
        }
    };

    let seven_minute_mark = reached(SEVEN_MINUTES);
    let phase = if completed {
        Phase::Ready
    } else if seven_minute_mark {
        Phase::AlmostReady
    } else {
        Phase::Countdown
    };

    CountdownMarks {
        seven_minute_mark,
        five_minute_mark: reached(FIVE_MINUTES),
        three_minute_mark: reached(THREE_MINUTES),
        one_minute_mark: reached(ONE_MINUTE),
        thirty_seconds_mark: reached(THIRTY_SECONDS),
        five_seconds_mark: reached(FIVE_SECONDS),
        one_second_mark: reached(ONE_SECOND),
        is_complete: completed,
        phase,
    }
}

/// A drop opening at `end`, optionally counted from `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropClock {
    end: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
}

impl DropClock {
    #[must_use]
    pub const fn new(end: DateTime<Utc>, start: Option<DateTime<Utc>>) -> Self {
        Self { end, start }
    }

    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[must_use]
    pub const fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// State of the countdown at `now`.
    ///
    /// The remaining time is rounded to the nearest second so exact marks
    /// fire on a live clock.
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> DropState {
        let millis = (self.end - now).num_milliseconds();
        let time_remaining = TimeDelta::seconds((millis + 500).div_euclid(1000));

        #[allow(clippy::cast_precision_loss)]
        let progress = self.start.and_then(|start| {
            let total = (self.end - start).num_milliseconds();
            (total != 0).then(|| (now - start).num_milliseconds() as f64 / total as f64)
        });

        DropState {
            time_remaining,
            progress,
            is_completed: time_remaining <= TimeDelta::zero(),
        }
    }

    /// State of the countdown now.
    #[must_use]
    pub fn state(&self) -> DropState {
        self.state_at(Utc::now())
    }

    /// Publish the state every [`TICK`] until the drop opens.
    ///
    /// The task stops after publishing the completed state, or as soon as
    /// every receiver is dropped. Must be called within a Tokio runtime.
    #[must_use]
    pub fn watch(self) -> (watch::Receiver<DropState>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(self.state());

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(TICK);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                if tx.borrow().is_completed {
                    info!(end = %self.end, "Drop is open");
                    break;
                }
                interval.tick().await;
                if tx.send(self.state()).is_err() {
                    debug!("All drop watchers gone, stopping");
                    break;
                }
            }
        });

        (rx, handle)
    }
}

impl From<&DropConfig> for DropClock {
    fn from(config: &DropConfig) -> Self {
        Self::new(config.end_at, config.start_at)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_state_before_end() {
        let clock = DropClock::new(
            at("2026-01-01T12:00:00Z"),
            Some(at("2026-01-01T10:00:00Z")),
        );
        let state = clock.state_at(at("2026-01-01T11:00:00Z"));

        assert_eq!(state.time_remaining, TimeDelta::hours(1));
        assert_eq!(state.progress, Some(0.5));
        assert!(!state.is_completed);
    }

    #[test]
    fn test_state_completed_at_end() {
        let clock = DropClock::new(at("2026-01-01T12:00:00Z"), None);

        let state = clock.state_at(at("2026-01-01T12:00:00Z"));
        assert!(state.is_completed);
        assert_eq!(state.progress, None);

        let late = clock.state_at(at("2026-01-01T12:00:05Z"));
        assert_eq!(late.time_remaining, TimeDelta::seconds(-5));
        assert!(late.is_completed);
    }

    #[test]
    fn test_progress_zero_span() {
        let end = at("2026-01-01T12:00:00Z");
        let clock = DropClock::new(end, Some(end));
        assert_eq!(clock.state_at(at("2026-01-01T11:00:00Z")).progress, None);
    }

    #[test]
    fn test_marks_thresholds() {
        let marks = countdown_marks(TimeDelta::minutes(8), false, false);
        assert!(!marks.seven_minute_mark);
        assert_eq!(marks.phase, Phase::Countdown);

        let marks = countdown_marks(TimeDelta::minutes(7), false, false);
        assert!(marks.seven_minute_mark);
        assert!(!marks.five_minute_mark);
        assert_eq!(marks.phase, Phase::AlmostReady);

        let marks = countdown_marks(TimeDelta::seconds(30), false, false);
        assert!(marks.one_minute_mark && marks.thirty_seconds_mark);
        assert!(!marks.five_seconds_mark);

        let marks = countdown_marks(TimeDelta::zero(), true, false);
        assert!(marks.one_second_mark && marks.is_complete);
        assert_eq!(marks.phase, Phase::Ready);
    }

    #[test]
    fn test_marks_exact() {
        let marks = countdown_marks(TimeDelta::minutes(5), false, true);
        assert!(marks.five_minute_mark);
        assert!(!marks.seven_minute_mark);
        assert!(!marks.three_minute_mark);
        assert_eq!(marks.phase, Phase::Countdown);

        let marks = countdown_marks(TimeDelta::seconds(4), false, true);
        assert!(!marks.five_seconds_mark && !marks.one_second_mark);
    }

    #[test]
    fn test_state_rounds_to_whole_seconds() {
        let clock = DropClock::new(at("2026-01-01T12:05:00.003Z"), None);

        let state = clock.state_at(at("2026-01-01T12:00:00.00325Z"));
        assert_eq!(state.time_remaining, TimeDelta::minutes(5));
        let marks = state.marks(true);
        assert!(marks.five_minute_mark);
        assert!(!marks.seven_minute_mark);

        let early = clock.state_at(at("2026-01-01T11:59:59.400Z"));
        assert_eq!(early.time_remaining, TimeDelta::seconds(301));
        assert!(!early.marks(true).five_minute_mark);

        let almost = clock.state_at(at("2026-01-01T12:04:59.700Z"));
        assert_eq!(almost.time_remaining, TimeDelta::zero());
        assert!(almost.is_completed);
    }

    #[tokio::test]
    async fn test_watch_completed_drop_stops() {
        let clock = DropClock::new(Utc::now() - TimeDelta::seconds(1), None);
        let (rx, handle) = clock.watch();

        handle.await.unwrap();
        assert!(rx.borrow().is_completed);
        assert_eq!(rx.borrow().marks(false).phase, Phase::Ready);
    }

    #[tokio::test]
    async fn test_watch_publishes_until_open() {
        let clock = DropClock::new(Utc::now() + TimeDelta::milliseconds(2500), None);
        let (mut rx, handle) = clock.watch();
        assert!(!rx.borrow_and_update().is_completed);

        rx.changed().await.unwrap();
        handle.abort();
        assert!(rx.borrow().time_remaining <= TimeDelta::milliseconds(2500));
    }
}
