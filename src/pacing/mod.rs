//! Pauses between warm-up calls.
//!
//! The warm-up replays the browser's cadence: a short wait after each edge
//! delivery and a shorter one after each tracking beacon. These are fixed
//! pauses, not backoff.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

pub const AFTER_EDGE_DELIVERY: Duration = Duration::from_millis(400);
pub const AFTER_TRACKING: Duration = Duration::from_millis(250);

/// Something that can hold the sequence for a while.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Blocks the sequence with `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        if duration > Duration::from_millis(0) {
            sleep(duration).await;
        }
    }
}

/// Records requested pauses instead of sleeping.
#[derive(Debug, Default, Clone)]
pub struct RecordingPacer {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        match self.pauses.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration) {
        let mut guard = match self.pauses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_pacer_keeps_order() {
        let pacer = RecordingPacer::new();
        pacer.pause(AFTER_EDGE_DELIVERY).await;
        pacer.pause(AFTER_TRACKING).await;
        assert_eq!(pacer.pauses(), vec![AFTER_EDGE_DELIVERY, AFTER_TRACKING]);
    }

    #[tokio::test]
    async fn tokio_pacer_waits_the_full_duration() {
        let started = tokio::time::Instant::now();
        TokioPacer.pause(AFTER_TRACKING).await;
        assert!(started.elapsed() >= AFTER_TRACKING);
    }
}
