//! Sprinkler relay with spray duration and cooldown

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// Sprays for a fixed duration, then refuses to fire again until the
/// cooldown has elapsed since the spray ended.
#[derive(Debug)]
pub struct Sprinkler {
    duration: Duration,
    cooldown: Duration,
    /// Earliest instant the next activation is allowed
    ready_at: Mutex<Option<Instant>>,
    spraying: Arc<AtomicBool>,
    activations: AtomicU64,
}

impl Sprinkler {
    pub fn new(duration: Duration, cooldown: Duration) -> Self {
        Self {
            duration,
            cooldown,
            ready_at: Mutex::new(None),
            spraying: Arc::new(AtomicBool::new(false)),
            activations: AtomicU64::new(0),
        }
    }

    /// Start a spray unless cooling down. Returns whether it fired.
    ///
    /// Does not wait for the spray to finish; the relay is switched off by a
    /// background task.
    pub async fn activate(&self) -> bool {
        let now = Instant::now();
        let mut ready_at = self.ready_at.lock().await;
        if ready_at.is_some_and(|at| now < at) {
            debug!("Sprinkler in cooldown, skipping");
            return false;
        }
        *ready_at = Some(now + self.duration + self.cooldown);
        drop(ready_at);

        info!("Sprinkler on for {:?}", self.duration);
        self.activations.fetch_add(1, Ordering::SeqCst);
        self.spraying.store(true, Ordering::SeqCst);

        let spraying = self.spraying.clone();
        let duration = self.duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            spraying.store(false, Ordering::SeqCst);
            info!("Sprinkler off");
        });
        true
    }

    pub fn is_spraying(&self) -> bool {
        self.spraying.load(Ordering::SeqCst)
    }

    pub fn activations(&self) -> u64 {
        self.activations.load(Ordering::SeqCst)
    }
}
