use log::*;

use crate::algorithm::AlgorithmRunner;
use crate::debug_target::DebugTarget;
use crate::error::{Error, TransferError};
use crate::host::Host;
use crate::target::{Target, TargetMem};

use super::ring::trim_chunk;
use super::{addr, StreamEngine, TransferStats};

impl StreamEngine {
    /// Stream `data` to the algorithm run by `runner`.
    ///
    /// The ring buffer is initialized and the algorithm started, then `data`
    /// is fed into the buffer as fast as the algorithm drains it. Once all
    /// data has been handed over, the engine waits for the algorithm to halt.
    ///
    /// The algorithm is expected to drain the buffer, advance the read
    /// pointer, and zero it to report an error. If the host gives up first
    /// (e.g: on a stall timeout), it zeroes the write pointer before waiting
    /// for the algorithm to exit.
    pub fn write<'a, T, H>(
        &self,
        dt: &mut DebugTarget<T>,
        host: &mut H,
        runner: &mut AlgorithmRunner<'a, T::Arch>,
        data: &[u8],
    ) -> Result<TransferStats, TransferError<T::Error>>
    where
        T: Target,
        H: Host,
    {
        let mut stats = TransferStats::default();
        if let Err(e) = self.start(dt, runner, "flash write") {
            return Err(TransferError::new(0, e));
        }

        let res = self.write_loop(dt.target_mut(), host, data, &mut stats);
        self.finish(
            dt,
            host,
            runner,
            res,
            stats,
            self.ring.wp_addr(),
            self.ring.rp_addr(),
            "flash write",
        )
    }

    fn write_loop<T, H>(
        &self,
        target: &mut T,
        host: &mut H,
        data: &[u8],
        stats: &mut TransferStats,
    ) -> Result<(), Error<T::Error>>
    where
        T: Target,
        H: Host,
    {
        let ring = &self.ring;
        let wp_addr = addr::<T>(ring.wp_addr())?;
        let rp_addr = addr::<T>(ring.rp_addr())?;

        let mut wp = ring.fifo_start();
        let mut stalls = 0;

        while stats.bytes < data.len() {
            let rp = match target.read_u32(rp_addr) {
                Ok(rp) => rp,
                Err(e) => {
                    error!("failed to get read pointer");
                    return Err(e);
                }
            };

            debug!(
                "offs {:#x} count {:#x} wp {:#x} rp {:#x}",
                stats.bytes,
                data.len() - stats.bytes,
                wp,
                rp
            );

            if rp == 0 {
                error!("flash write algorithm aborted by target");
                return Err(Error::FlashOperationFailed);
            }
            if !ring.is_valid_ptr(rp) {
                error!("corrupted fifo read pointer {:#x}", rp);
                return Err(Error::CorruptedPointer { ptr: rp });
            }

            let space = ring.write_space(wp, rp);
            if space == 0 {
                if let Err(e) = self.stall(host, &mut stalls, stats) {
                    return Err(e);
                }
                continue;
            }
            stalls = 0;

            let remaining = data.len() - stats.bytes;
            let len = trim_chunk(rp, space.min(remaining.min(u32::MAX as usize) as u32));

            let chunk = &data[stats.bytes..stats.bytes + len as usize];
            target.write_buffer(addr::<T>(wp)?, chunk)?;
            stats.bytes += len as usize;
            stats.chunks += 1;

            let (next, wrapped) = ring.advance(wp, len);
            wp = next;
            if wrapped {
                stats.wraps += 1;
            }
            target.write_u32(wp_addr, wp)?;

            host.keep_alive();
            if host.shutdown_pending() {
                return Err(Error::Interrupted);
            }
        }

        Ok(())
    }
}
