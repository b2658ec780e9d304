//! Cadence policies for the ingestion scheduler.
//!
//! A [`Trigger`] only answers "when is the next cycle due"; the scheduler never
//! asks it anything else, so fixed-interval and wall-clock-anchored cadences are
//! interchangeable.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveTime, Utc};
use chrono_tz::Tz;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::debug;

use crate::tz::local_to_utc;

/// Produces a "run now" signal at some cadence.
#[async_trait]
pub trait Trigger: Send {
    /// Resolves when the next cycle should start.
    async fn wait(&mut self);
}

/// Fires immediately, then every `period`. A cycle that overruns delays the next
/// tick instead of producing a burst of catch-up ticks.
pub struct IntervalTrigger {
    period: Duration,
    interval: Option<Interval>,
}

impl IntervalTrigger {
    /// Creates the trigger; the underlying timer starts on the first [`Trigger::wait`].
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Configured period.
    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Trigger for IntervalTrigger {
    async fn wait(&mut self) {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut i = tokio::time::interval(period);
            i.set_missed_tick_behavior(MissedTickBehavior::Delay);
            i
        });
        interval.tick().await;
    }
}

/// Fires once a day at a local wall-clock time in `tz`.
pub struct DailyTrigger {
    at: NaiveTime,
    tz: Tz,
    run_at_start: bool,
    started: bool,
}

impl DailyTrigger {
    /// Creates a trigger firing daily at `at` local time in `tz`.
    pub fn new(at: NaiveTime, tz: Tz) -> Self {
        Self {
            at,
            tz,
            run_at_start: false,
            started: false,
        }
    }

    /// Also fire once immediately, before the first wall-clock occurrence.
    pub fn run_at_start(mut self, yes: bool) -> Self {
        self.run_at_start = yes;
        self
    }
}

/// Next instant strictly after `now` at which the local clock in `tz` reads `at`.
///
/// Nonexistent local times (spring-forward) shift to the first valid minute after
/// the gap; ambiguous ones (fall-back) take the earlier instant.
pub fn next_daily_fire(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let local_today = now.with_timezone(&tz).date_naive();
    // Two days ahead always contains a candidate, even across a DST shift.
    for offset in 0..=2u64 {
        let Some(day) = local_today.checked_add_days(Days::new(offset)) else {
            continue;
        };
        let naive = day.and_time(at);
        if let Ok(candidate) = local_to_utc(naive, tz) {
            if candidate > now {
                return candidate;
            }
        }
    }
    now + chrono::Duration::days(1)
}

#[async_trait]
impl Trigger for DailyTrigger {
    async fn wait(&mut self) {
        if self.run_at_start && !self.started {
            self.started = true;
            return;
        }
        self.started = true;

        let now = Utc::now();
        let next = next_daily_fire(now, self.at, self.tz);
        debug!(next = %next, "daily trigger sleeping");
        let delay = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(delay).await;
    }
}
