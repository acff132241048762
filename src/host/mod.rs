//! The host side of the polling loops: time, sleep, keep-alive and
//! cancellation.
//!
//! The debug link offers no completion signals, so every operation in this
//! crate that waits on the target does so by polling. Suspension only ever
//! happens through [`Host::sleep_ms`] / [`Host::keep_alive`], and every caller
//! checks [`Host::shutdown_pending`] right after suspending.

/// Services the host process provides to polling loops.
pub trait Host {
    /// Monotonic time in milliseconds. The epoch is arbitrary.
    fn now_ms(&mut self) -> u64;

    /// Suspend the calling loop for (at least) `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u32);

    /// Give the rest of the host a chance to run (e.g: service a connected
    /// debugger client so it doesn't time out).
    #[inline(always)]
    fn keep_alive(&mut self) {}

    /// Returns `true` once the host process has been asked to shut down.
    #[inline(always)]
    fn shutdown_pending(&self) -> bool {
        false
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        mod std_host;

        pub use std_host::{ShutdownSignal, StdHost};
    }
}
