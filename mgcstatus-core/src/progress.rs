use log::info;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

/// Background heartbeat reporting how many collections have been analyzed.
#[derive(Clone)]
pub struct Progress {
    enabled: bool,
    interval: Duration,
    created: Instant,
    pub done: Arc<AtomicUsize>,
    pub total: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self::with_interval(enabled, Duration::from_secs(5))
    }

    pub fn with_interval(enabled: bool, interval: Duration) -> Self {
        Self {
            enabled,
            interval,
            created: Instant::now(),
            done: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_total(&self, n: usize) {
        self.total.store(n, Ordering::Relaxed);
    }
    pub fn inc(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
    }
    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    pub fn start(&self) {
        if !self.enabled {
            return;
        }
        self.running.store(true, Ordering::Relaxed);
        let done = self.done.clone();
        let total = self.total.clone();
        let running = self.running.clone();
        let interval = self.interval;
        thread::spawn(move || {
            let t0 = Instant::now();
            while running.load(Ordering::Relaxed) {
                thread::sleep(interval);
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                info!(
                    "[{:>4}s] collections {}/{}",
                    t0.elapsed().as_secs(),
                    done.load(Ordering::Relaxed),
                    total.load(Ordering::Relaxed)
                );
            }
        });
    }

    /// Ends the heartbeat and logs the final tally.
    pub fn stop(&self) {
        if self.enabled {
            self.running.store(false, Ordering::Relaxed);
            info!(
                "[{:>4}s] collections {}/{} analyzed",
                self.created.elapsed().as_secs(),
                self.done(),
                self.total.load(Ordering::Relaxed)
            );
        }
    }
}
