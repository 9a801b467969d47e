//! Reconnect policy and single-slot reconnect timer

use rand::Rng;
use tokio::time::{Duration, Instant};

/// Default fixed reconnect delay
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Delay before re-establishing the live stream after an abnormal close
///
/// The default is a fixed 5s delay. [`ReconnectPolicy::exponential`] grows
/// the delay per consecutive failure up to `max_delay`, with jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// First (or only) delay
    pub delay: Duration,
    /// Growth factor per consecutive failure; 1.0 keeps the delay fixed
    pub multiplier: f64,
    /// Upper bound for the grown delay
    pub max_delay: Duration,
    /// Randomize each delay within `[d/2, d]`
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    /// Same delay for every attempt
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            multiplier: 1.0,
            max_delay: delay,
            jitter: false,
        }
    }

    /// Doubling delay capped at `max_delay`, jittered
    pub fn exponential(initial: Duration, max_delay: Duration) -> Self {
        Self {
            delay: initial,
            multiplier: 2.0,
            max_delay: max_delay.max(initial),
            jitter: true,
        }
    }

    /// Delay for the given consecutive failure (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let grown = if self.multiplier > 1.0 {
            let secs = self.delay.as_secs_f64() * self.multiplier.powi(attempt.min(32) as i32);
            Duration::try_from_secs_f64(secs)
                .unwrap_or(self.max_delay)
                .min(self.max_delay)
        } else {
            self.delay
        };

        if self.jitter && !grown.is_zero() {
            let half = grown / 2;
            let spread = grown - half;
            let offset = rand::thread_rng().gen_range(0..=spread.as_millis() as u64);
            half + Duration::from_millis(offset)
        } else {
            grown
        }
    }
}

/// At most one pending reconnect
///
/// Scheduling while a reconnect is pending is a no-op, so repeated
/// failures never stack timers.
#[derive(Debug, Default)]
pub struct ReconnectSlot {
    deadline: Option<Instant>,
}

impl ReconnectSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer. Returns false if one was already pending.
    pub fn schedule(&mut self, delay: Duration) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(Instant::now() + delay);
        true
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolve when the pending deadline passes, then disarm
    ///
    /// Never resolves while nothing is pending.
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
