use std::time::{Duration, Instant};

use crate::error::{QuizError, QuizResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl TimerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerPhase::Idle => "idle",
            TimerPhase::Running => "running",
            TimerPhase::Paused => "paused",
            TimerPhase::Stopped => "stopped",
        }
    }
}

/// Handle for one scheduled recurring tick. A token stops being live as soon
/// as the ticker is cancelled, so a callback that was already queued does nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickToken {
    generation: u64,
}

#[derive(Debug, Default)]
pub struct Ticker {
    generation: u64,
    active: bool,
}

impl Ticker {
    pub fn acquire(&mut self) -> TickToken {
        self.generation += 1;
        self.active = true;
        TickToken {
            generation: self.generation,
        }
    }

    pub fn cancel(&mut self) {
        if self.active {
            self.generation += 1;
            self.active = false;
        }
    }

    pub fn is_live(&self, token: TickToken) -> bool {
        self.active && token.generation == self.generation
    }

    pub fn pending(&self) -> Option<TickToken> {
        self.active.then_some(TickToken {
            generation: self.generation,
        })
    }
}

/// `HH:MM:SS`, zero padded; hours keep counting past 24.
pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Wall-clock quiz timer. The displayed value only advances on ticks, but
/// [`TimerController::elapsed_at`] is always recomputed from timestamps, so
/// missed or cancelled ticks never cause drift.
#[derive(Debug)]
pub struct TimerController {
    phase: TimerPhase,
    start_time: Option<Instant>,
    total_paused: Duration,
    pause_started: Option<Instant>,
    stopped_at: Option<Instant>,
    display: String,
    display_enabled: bool,
    ticker: Ticker,
}

impl TimerController {
    pub fn new(display_enabled: bool) -> Self {
        Self {
            phase: TimerPhase::Idle,
            start_time: None,
            total_paused: Duration::ZERO,
            pause_started: None,
            stopped_at: None,
            display: format_hms(0),
            display_enabled,
            ticker: Ticker::default(),
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn display_enabled(&self) -> bool {
        self.display_enabled
    }

    pub fn pending_tick(&self) -> Option<TickToken> {
        self.ticker.pending()
    }

    fn invalid(&self, action: &'static str) -> QuizError {
        QuizError::InvalidSessionTransition {
            action,
            state: self.phase.as_str(),
        }
    }

    pub fn start(&mut self) -> QuizResult<TickToken> {
        self.start_at(Instant::now())
    }

    pub fn start_at(&mut self, now: Instant) -> QuizResult<TickToken> {
        if self.phase != TimerPhase::Idle {
            return Err(self.invalid("start timer"));
        }
        if self.start_time.is_none() {
            self.start_time = Some(now);
        }
        self.phase = TimerPhase::Running;
        Ok(self.ticker.acquire())
    }

    pub fn pause(&mut self) -> QuizResult<()> {
        self.pause_at(Instant::now())
    }

    pub fn pause_at(&mut self, now: Instant) -> QuizResult<()> {
        if self.phase != TimerPhase::Running {
            return Err(self.invalid("pause timer"));
        }
        // Cancel first so a queued tick cannot observe the half-updated pause state.
        self.ticker.cancel();
        self.pause_started = Some(now);
        self.phase = TimerPhase::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> QuizResult<TickToken> {
        self.resume_at(Instant::now())
    }

    pub fn resume_at(&mut self, now: Instant) -> QuizResult<TickToken> {
        if self.phase != TimerPhase::Paused {
            return Err(self.invalid("resume timer"));
        }
        if let Some(paused) = self.pause_started.take() {
            self.total_paused += now.saturating_duration_since(paused);
        }
        self.phase = TimerPhase::Running;
        Ok(self.ticker.acquire())
    }

    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    /// Freeze elapsed time. Stopping an idle or already stopped timer is a no-op.
    pub fn stop_at(&mut self, now: Instant) {
        self.ticker.cancel();
        match self.phase {
            TimerPhase::Running => {}
            TimerPhase::Paused => {
                if let Some(paused) = self.pause_started.take() {
                    self.total_paused += now.saturating_duration_since(paused);
                }
            }
            TimerPhase::Idle | TimerPhase::Stopped => return,
        }
        self.stopped_at = Some(now);
        self.phase = TimerPhase::Stopped;
        self.display = self.formatted_at(now);
    }

    /// Back to a never-started timer, cancelling any pending tick.
    pub fn reset(&mut self) {
        self.ticker.cancel();
        self.phase = TimerPhase::Idle;
        self.start_time = None;
        self.total_paused = Duration::ZERO;
        self.pause_started = None;
        self.stopped_at = None;
        self.display = format_hms(0);
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        let Some(start) = self.start_time else {
            return Duration::ZERO;
        };
        let end = match self.phase {
            TimerPhase::Idle => return Duration::ZERO,
            TimerPhase::Running => now,
            TimerPhase::Paused => self.pause_started.unwrap_or(now),
            TimerPhase::Stopped => self.stopped_at.unwrap_or(now),
        };
        end.saturating_duration_since(start)
            .saturating_sub(self.total_paused)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    pub fn formatted_at(&self, now: Instant) -> String {
        format_hms(self.elapsed_at(now).as_secs())
    }

    pub fn formatted(&self) -> String {
        self.formatted_at(Instant::now())
    }

    /// Last value computed by a tick (or by `stop`).
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Handle one scheduled tick. Stale tokens are ignored. Returns the label
    /// to show, or `None` when the display is disabled.
    pub fn tick_at(&mut self, token: TickToken, now: Instant) -> Option<String> {
        if !self.ticker.is_live(token) || self.phase != TimerPhase::Running {
            return None;
        }
        self.display = self.formatted_at(now);
        self.display_enabled.then(|| self.display.clone())
    }

    pub fn tick(&mut self, token: TickToken) -> Option<String> {
        self.tick_at(token, Instant::now())
    }
}
