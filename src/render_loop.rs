use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::clock::registry::ClockRegistry;
use crate::error::{ClockError, ClockResult};
use crate::services::chime::{ChimeKind, ChimePlayer};

pub const TICK_CADENCE: Duration = Duration::from_millis(1000);

/// Rotation of each hand in degrees, clockwise from twelve.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HandAngles {
    pub hour_deg: f64,
    pub minute_deg: f64,
    pub second_deg: f64,
}

pub fn hand_angles(hour: u32, minute: u32, second: u32) -> HandAngles {
    let hour = f64::from(hour % 12);
    let minute = f64::from(minute);
    let second = f64::from(second);
    HandAngles {
        hour_deg: hour * 30.0 + minute * 0.5,
        minute_deg: minute * 6.0 + second * 0.1,
        second_deg: second * 6.0,
    }
}

pub fn chime_for(minute: u32, second: u32) -> Option<ChimeKind> {
    match (minute, second) {
        (0, 0) => Some(ChimeKind::Top),
        (30, 0) => Some(ChimeKind::Half),
        _ => None,
    }
}

/// Wall-clock reading of `now` in the zone named by `timezone`.
pub fn project(now: DateTime<Utc>, timezone: &str) -> ClockResult<NaiveDateTime> {
    let zone = timezone
        .parse::<Tz>()
        .map_err(|_| ClockError::UnresolvedTimezone(timezone.to_string()))?;
    Ok(now.with_timezone(&zone).naive_local())
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LoopState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct TickOutcome {
    pub rendered: usize,
    pub fallbacks: usize,
    pub top_chimes: usize,
    pub half_chimes: usize,
}

impl TickOutcome {
    /// The chime heard this tick; the top of the hour wins over half past.
    pub fn chimed(&self) -> Option<ChimeKind> {
        if self.top_chimes > 0 {
            Some(ChimeKind::Top)
        } else if self.half_chimes > 0 {
            Some(ChimeKind::Half)
        } else {
            None
        }
    }
}

const MIN_CADENCE: Duration = Duration::from_millis(1);

pub struct RenderLoop {
    state: LoopState,
    cadence: Duration,
    next_due: Instant,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::with_cadence(TICK_CADENCE)
    }

    /// Cadences shorter than a millisecond are raised to one.
    pub fn with_cadence(cadence: Duration) -> Self {
        Self {
            state: LoopState::Stopped,
            cadence: cadence.max(MIN_CADENCE),
            next_due: Instant::now(),
        }
    }

    /// The first tick is due immediately.
    pub fn start(&mut self, now: Instant) {
        self.state = LoopState::Running;
        self.next_due = now;
    }

    pub fn cancel(&mut self) {
        self.state = LoopState::Stopped;
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn next_due(&self) -> Option<Instant> {
        (self.state == LoopState::Running).then_some(self.next_due)
    }

    pub fn until_next(&self, now: Instant) -> Option<Duration> {
        match self.state {
            LoopState::Running => Some(self.next_due.saturating_duration_since(now)),
            LoopState::Stopped => None,
        }
    }

    /// Ticks when a slot is due. Slots missed while the caller was busy are
    /// skipped, not replayed.
    pub fn poll(
        &mut self,
        now: Instant,
        registry: &mut ClockRegistry,
        now_utc: DateTime<Utc>,
        chime: &dyn ChimePlayer,
    ) -> Option<TickOutcome> {
        if self.state != LoopState::Running || now < self.next_due {
            return None;
        }
        while self.next_due <= now {
            self.next_due += self.cadence;
        }
        Some(self.tick(registry, now_utc, chime))
    }

    pub fn tick(
        &mut self,
        registry: &mut ClockRegistry,
        now_utc: DateTime<Utc>,
        chime: &dyn ChimePlayer,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.state != LoopState::Running {
            return outcome;
        }

        for widget in registry.widgets_mut() {
            let local = match project(now_utc, &widget.timezone) {
                Ok(local) => local,
                Err(err) => {
                    if !widget.fallback_logged {
                        warn!(name = %widget.name, error = %err, "showing UTC instead");
                        widget.fallback_logged = true;
                    }
                    outcome.fallbacks += 1;
                    now_utc.naive_utc()
                }
            };
            widget.hands = hand_angles(local.hour(), local.minute(), local.second());
            widget.local_time = Some(local);
            outcome.rendered += 1;

            match chime_for(local.minute(), local.second()) {
                Some(ChimeKind::Top) => outcome.top_chimes = 1,
                Some(ChimeKind::Half) => outcome.half_chimes = 1,
                None => {}
            }
        }

        if outcome.top_chimes > 0 {
            chime.play_chime(ChimeKind::Top);
        }
        if outcome.half_chimes > 0 {
            chime.play_chime(ChimeKind::Half);
        }
        debug!(
            rendered = outcome.rendered,
            fallbacks = outcome.fallbacks,
            "tick"
        );
        outcome
    }
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

pub fn sleep_until(deadline: Instant) {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if !remaining.is_zero() {
        std::thread::sleep(remaining);
    }
}
