//! Time abstraction for settle delays and polling
//!
//! Steps measure their own duration and the settle policies sleep and poll;
//! all of that goes through [`StepClock`] so tests can swap the real tokio
//! clock for a [`ManualClock`] that never actually sleeps.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

pub trait StepClock: Send + Sync {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

    fn elapsed_since(&self, start: Duration) -> Duration {
        self.now().saturating_sub(start)
    }
}

/// Fractional milliseconds, as recorded in results
pub fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

// ----------------------------------------------------------------------------
// System Clock
// ----------------------------------------------------------------------------

/// Real-time implementation using tokio::time
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl StepClock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

// ----------------------------------------------------------------------------
// Manual Clock
// ----------------------------------------------------------------------------

/// Deterministic clock: sleeping advances time instantly
///
/// Every sleep is recorded so tests can assert which delays a policy
/// applied, in order.
#[derive(Clone, Default)]
pub struct ManualClock {
    now_micros: Arc<AtomicU64>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        self.now_micros
            .fetch_add(duration.as_micros() as u64, Ordering::SeqCst);
    }

    /// Sleeps requested so far
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl StepClock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.now_micros.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        self.sleeps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(duration);
        self.advance(duration);
        Box::pin(std::future::ready(()))
    }
}

// ----------------------------------------------------------------------------
// Polling
// ----------------------------------------------------------------------------

/// Run `probe` every `interval` until it returns true or `timeout` elapses.
///
/// The probe always runs at least once. Returns whether it succeeded.
pub async fn poll_until<F, Fut>(
    clock: &dyn StepClock,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = clock.now();
    loop {
        if probe().await {
            return true;
        }
        if clock.elapsed_since(start) >= timeout {
            return false;
        }
        clock.sleep(interval).await;
    }
}
