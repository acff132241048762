//! Streaming large transfers through a ring buffer in target memory.
//!
//! Writing a few bytes at a time to a halted target is slow. Instead, an
//! algorithm is started on the target, and data is streamed to (or from) it
//! through a ring buffer in a working area while it keeps running: the host
//! fills the buffer and advances the write pointer, the algorithm drains it
//! and advances the read pointer (or the other way around for reads).
//!
//! There are no completion signals, so the host polls the partner's pointer.
//! Whenever the buffer is full (or empty), the host backs off for
//! [`StreamConfig::poll_interval_ms`], and gives up after
//! [`StreamConfig::max_stalls`] consecutive stalls. Either side aborts the
//! transfer by zeroing its own pointer word.
//!
//! A failed transfer usually leaves the target in an undefined state. Nothing
//! is retried: the remedy is an explicit target reset.

use log::*;

use crate::algorithm::AlgorithmRunner;
use crate::arch::Arch;
use crate::debug_target::DebugTarget;
use crate::error::{Error, TransferError};
use crate::host::Host;
use crate::target::{ExecState, Target, TargetMem};

mod config;
mod read;
mod ring;
mod write;

pub use config::StreamConfig;
pub use ring::RingBuffer;

/// Summary of a completed transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Bytes moved through the ring buffer.
    pub bytes: usize,
    /// Number of chunks written to (or read from) the ring buffer.
    pub chunks: u32,
    /// Number of times the host backed off because the ring buffer was full
    /// (or empty).
    pub stalls: u32,
    /// Number of times the host's pointer wrapped around.
    pub wraps: u32,
}

/// Streams data between the host and an algorithm through a [`RingBuffer`].
#[derive(Clone, Copy, Debug)]
pub struct StreamEngine {
    ring: RingBuffer,
    config: StreamConfig,
}

/// Convert a ring buffer address into a target address.
fn addr<T: Target>(addr: u32) -> Result<<T::Arch as Arch>::Usize, Error<T::Error>> {
    num_traits::FromPrimitive::from_u32(addr).ok_or(Error::InvalidRingBuffer(
        "buffer lies outside the target's address space",
    ))
}

impl StreamEngine {
    /// Create a new engine, streaming through `ring`.
    pub fn new(ring: RingBuffer, config: StreamConfig) -> Self {
        StreamEngine { ring, config }
    }

    /// The ring buffer used for transfers.
    pub fn ring(&self) -> &RingBuffer {
        &self.ring
    }

    /// The engine's configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Initialize the ring buffer, and start the algorithm.
    fn start<'a, T>(
        &self,
        dt: &mut DebugTarget<T>,
        runner: &mut AlgorithmRunner<'a, T::Arch>,
        what: &str,
    ) -> Result<(), Error<T::Error>>
    where
        T: Target,
    {
        // don't touch the buffer underneath a running algorithm
        if dt.running_algorithm() {
            error!("target is already running an algorithm");
            return Err(Error::AlreadyRunning);
        }

        let target = dt.target_mut();
        if target.poll()? != ExecState::Halted {
            warn!("target not halted");
            return Err(Error::NotHalted);
        }

        let fifo = self.ring.fifo_start();
        target.write_u32(addr::<T>(self.ring.wp_addr())?, fifo)?;
        target.write_u32(addr::<T>(self.ring.rp_addr())?, fifo)?;

        if let Err(e) = runner.start(dt) {
            error!("error starting target {} algorithm", what);
            return Err(e);
        }
        Ok(())
    }

    /// Back off after the ring buffer made no progress.
    fn stall<H: Host, E>(
        &self,
        host: &mut H,
        stalls: &mut u32,
        stats: &mut TransferStats,
    ) -> Result<(), Error<E>> {
        host.sleep_ms(self.config.poll_interval_ms);
        host.keep_alive();
        if host.shutdown_pending() {
            return Err(Error::Interrupted);
        }

        if *stalls >= self.config.max_stalls {
            error!("timeout waiting for algorithm, a target reset is recommended");
            return Err(Error::StreamTimeout);
        }
        *stalls += 1;
        stats.stalls += 1;
        Ok(())
    }

    /// Abort the algorithm if the transfer loop failed, wait for it to halt,
    /// and check whether it signalled an error of its own.
    ///
    /// `own_ptr` is the pointer word owned by the host, `partner_ptr` the one
    /// owned by the algorithm.
    #[allow(clippy::too_many_arguments)]
    fn finish<'a, T, H>(
        &self,
        dt: &mut DebugTarget<T>,
        host: &mut H,
        runner: &mut AlgorithmRunner<'a, T::Arch>,
        res: Result<(), Error<T::Error>>,
        stats: TransferStats,
        own_ptr: u32,
        partner_ptr: u32,
        what: &str,
    ) -> Result<TransferStats, TransferError<T::Error>>
    where
        T: Target,
        H: Host,
    {
        if res.is_err() {
            let aborted = addr::<T>(own_ptr).and_then(|a| dt.target_mut().write_u32(a, 0));
            if aborted.is_err() {
                error!("failed to abort target {} algorithm", what);
            }
        }

        let waited = runner.wait(dt, host, self.config.wait_timeout_ms);
        if waited.is_err() {
            error!("error waiting for target {} algorithm", what);
        }

        let offset = stats.bytes;
        match (res, waited) {
            (Err(error), waited) => Err(TransferError {
                offset,
                error,
                wait_error: waited.err(),
            }),
            (Ok(()), Err(e)) => Err(TransferError::new(offset, e)),
            (Ok(()), Ok(())) => {
                // the algorithm may still have bailed out after the last chunk
                let ptr = addr::<T>(partner_ptr).and_then(|a| dt.target_mut().read_u32(a));
                match ptr {
                    Ok(0) => {
                        error!("{} algorithm aborted by target", what);
                        Err(TransferError::new(offset, Error::FlashOperationFailed))
                    }
                    Ok(_) => Ok(stats),
                    Err(e) => Err(TransferError::new(offset, e)),
                }
            }
        }
    }
}
