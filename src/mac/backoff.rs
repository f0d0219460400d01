//! ALOHA backoff and frame timing
//!
//! After the `a`-th unacknowledged attempt the sender sleeps for
//! `R * frame_time(mcs)` with `R` drawn uniformly from `[0, 2^k - 1)` and
//! `k = min(a, 10)`.

use std::time::Duration;

use rand::Rng;

use crate::core::{MAX_BACKOFF_EXPONENT, MAX_FRAME_SIZE};

/// Maps an MCS level to the on-air duration of one frame
pub trait FrameTimer: Send + Sync {
    fn duration_for(&self, mcs: u8) -> Duration;
}

/// Same duration for every MCS level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantFrameTime(pub Duration);

impl FrameTimer for ConstantFrameTime {
    fn duration_for(&self, _mcs: u8) -> Duration {
        self.0
    }
}

/// Airtime of a maximum-size frame at a per-MCS bit rate
///
/// MCS levels beyond the table use its last entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BitrateFrameTime {
    /// Frame airtime, indexed by MCS level
    durations: Vec<Duration>,
}

impl BitrateFrameTime {
    /// Builds the table from bit rates in bits per second
    ///
    /// Returns `None` for an empty table, a non-positive rate, or a rate so
    /// low that the airtime does not fit in a `Duration`.
    pub fn new(rates: Vec<f64>) -> Option<Self> {
        if rates.is_empty() {
            return None;
        }

        let bits = (MAX_FRAME_SIZE * 8) as f64;
        let durations = rates
            .iter()
            .map(|rate| {
                if !rate.is_finite() || *rate <= 0.0 {
                    return None;
                }
                Duration::try_from_secs_f64(bits / rate).ok()
            })
            .collect::<Option<Vec<_>>>()?;

        Some(BitrateFrameTime { durations })
    }
}

impl FrameTimer for BitrateFrameTime {
    fn duration_for(&self, mcs: u8) -> Duration {
        let index = (mcs as usize).min(self.durations.len() - 1);
        self.durations[index]
    }
}

/// Backoff exponent for an attempt count
pub fn backoff_exponent(attempt: u32) -> u32 {
    attempt.min(MAX_BACKOFF_EXPONENT)
}

/// Number of frame slots the backoff factor is drawn below
pub fn backoff_slots(attempt: u32) -> u32 {
    (1u32 << backoff_exponent(attempt)) - 1
}

/// Exclusive upper bound of the backoff delay after `attempt`
pub fn backoff_ceiling(attempt: u32, frame_time: Duration) -> Duration {
    frame_time.saturating_mul(backoff_slots(attempt))
}

/// Draws the delay before retransmitting after `attempt` failed
///
/// Saturates at `Duration::MAX` for frame times too long to scale.
pub fn sample_backoff<R: Rng + ?Sized>(attempt: u32, frame_time: Duration, rng: &mut R) -> Duration {
    let slots = backoff_slots(attempt);
    if slots == 0 {
        return Duration::ZERO;
    }
    let factor: f64 = rng.gen_range(0.0..slots as f64);
    Duration::try_from_secs_f64(frame_time.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}
