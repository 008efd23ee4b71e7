//! Random delay selection.

use rand::Rng;
use resort_booking_core::environment::{DelayJitter, DelayWindow};
use std::time::Duration;

/// Draws a delay uniformly from the window, at millisecond resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformJitter;

impl DelayJitter for UniformJitter {
    fn pick(&self, window: DelayWindow) -> Duration {
        let min = u64::try_from(window.min().as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(window.max().as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}
