//! Per-room stage countdown for Scrawl.
//!
//! One [`StageTimer`] lives inside each room actor. It ticks once per
//! second while armed, pends forever while idle, and self-cancels when
//! the countdown reaches zero. Expiry is purely informational — the
//! timer never forces a stage advance; advancing stays caller-triggered.
//!
//! # Cancel-before-arm
//!
//! The timer is owned by exactly one actor and polled only from that
//! actor's `tokio::select!` loop. [`StageTimer::arm`] overwrites the
//! pending deadline in place, so re-arming atomically discards the
//! previous countdown: a straggler tick from a cancelled instance cannot
//! exist, by construction rather than by after-the-fact filtering.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         tick = timer.wait_for_tick() => {
//!             room.decrement_active_ttl();
//!             broadcast_snapshot();
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace};

/// The fixed tick cadence: the active stage's TTL drops by one per tick.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Information about a completed tick, returned by
/// [`StageTimer::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    /// Seconds left after this tick.
    pub remaining: u32,
    /// `true` on the final tick; the timer has already disarmed itself.
    pub expired: bool,
}

/// A one-per-room countdown tied to the currently active stage.
#[derive(Debug)]
pub struct StageTimer {
    /// When the next tick fires. `None` while idle.
    next_tick: Option<TokioInstant>,
    remaining: u32,
}

impl StageTimer {
    /// Creates an idle timer. [`wait_for_tick`](Self::wait_for_tick)
    /// pends forever until [`arm`](Self::arm) is called.
    pub fn idle() -> Self {
        Self {
            next_tick: None,
            remaining: 0,
        }
    }

    /// Arms the countdown for `ttl` seconds, discarding any countdown
    /// that was still running. Arming with `ttl == 0` leaves the timer
    /// idle — there is nothing to count down.
    pub fn arm(&mut self, ttl: u32) {
        self.remaining = ttl;
        self.next_tick = if ttl > 0 {
            Some(TokioInstant::now() + TICK_INTERVAL)
        } else {
            None
        };
        debug!(ttl, "stage timer armed");
    }

    /// Stops the countdown. Idempotent.
    pub fn cancel(&mut self) {
        if self.next_tick.is_some() {
            debug!(remaining = self.remaining, "stage timer cancelled");
        }
        self.next_tick = None;
        self.remaining = 0;
    }

    /// Whether a countdown is currently running.
    pub fn is_armed(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Seconds left on the current countdown (0 while idle).
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Waits until the next one-second tick is due.
    ///
    /// While idle this future pends forever — it never resolves on its
    /// own, but a surrounding `tokio::select!` still services its other
    /// branches. On the tick that brings the countdown to zero the timer
    /// disarms itself and reports `expired = true`.
    pub async fn wait_for_tick(&mut self) -> TimerTick {
        let Some(next) = self.next_tick else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(next).await;

        self.remaining = self.remaining.saturating_sub(1);
        let expired = self.remaining == 0;
        self.next_tick = if expired {
            None
        } else {
            // Schedule from the previous deadline, not from now, so the
            // cadence stays at exactly one tick per second.
            Some(next + TICK_INTERVAL)
        };

        trace!(remaining = self.remaining, expired, "stage timer tick");

        TimerTick {
            remaining: self.remaining,
            expired,
        }
    }
}

impl Default for StageTimer {
    fn default() -> Self {
        Self::idle()
    }
}
