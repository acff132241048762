use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::Host;

/// Process-wide cancellation flag.
///
/// Clones share the same flag, so one copy can be handed to a signal handler
/// while another is owned by the [`StdHost`].
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    /// Create a new (not yet requested) shutdown signal.
    pub fn new() -> ShutdownSignal {
        ShutdownSignal::default()
    }

    /// Ask every polling loop observing this signal to bail out.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    /// Returns `true` once a shutdown has been requested.
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A [`Host`] backed by the standard library.
#[derive(Debug)]
pub struct StdHost {
    epoch: Instant,
    shutdown: ShutdownSignal,
}

impl StdHost {
    /// Create a new host with its own shutdown signal.
    pub fn new() -> StdHost {
        StdHost::with_shutdown_signal(ShutdownSignal::new())
    }

    /// Create a new host observing an existing shutdown signal.
    pub fn with_shutdown_signal(shutdown: ShutdownSignal) -> StdHost {
        StdHost {
            epoch: Instant::now(),
            shutdown,
        }
    }

    /// The shutdown signal observed by this host.
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }
}

impl Default for StdHost {
    fn default() -> Self {
        StdHost::new()
    }
}

impl Host for StdHost {
    fn now_ms(&mut self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn sleep_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64))
    }

    fn keep_alive(&mut self) {
        std::thread::yield_now()
    }

    fn shutdown_pending(&self) -> bool {
        self.shutdown.is_pending()
    }
}
