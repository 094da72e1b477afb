//! Bounded polling for startup steps that complete asynchronously
use std::time::Duration;

use thiserror::Error;

use crate::transport::Pacer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("condition not met after {attempts} attempts ({waited_ms} ms)")]
pub struct RetryError {
    pub attempts: u32,
    pub waited_ms: u64,
}

/// Poll `condition` up to `attempts` times, pausing `interval` between polls.
///
/// Returns the 1-based attempt on which the condition held.
pub fn wait_until<D, F>(
    attempts: u32,
    interval: Duration,
    pacer: &mut D,
    mut condition: F,
) -> Result<u32, RetryError>
where
    D: Pacer,
    F: FnMut() -> bool,
{
    for attempt in 1..=attempts {
        if condition() {
            return Ok(attempt);
        }
        log::info!("Waiting... ({}/{})", attempt, attempts);
        if attempt < attempts {
            pacer.pause(interval);
        }
    }

    Err(RetryError {
        attempts,
        waited_ms: interval.as_millis() as u64 * attempts.saturating_sub(1) as u64,
    })
}
