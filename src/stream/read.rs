use log::*;

use crate::algorithm::AlgorithmRunner;
use crate::debug_target::DebugTarget;
use crate::error::{Error, TransferError};
use crate::host::Host;
use crate::target::{Target, TargetMem};

use super::ring::trim_chunk;
use super::{addr, StreamEngine, TransferStats};

impl StreamEngine {
    /// Stream data produced by the algorithm run by `runner` into `buf`.
    ///
    /// Mirrors [`write`](Self::write): the algorithm fills the ring buffer
    /// and advances the write pointer (zeroing it to report an error), the
    /// host drains it into `buf` and advances the read pointer. The host
    /// zeroes the read pointer if it gives up first.
    ///
    /// The algorithm always produces whole blocks, so `buf.len()` must be a
    /// multiple of the ring buffer's block size.
    pub fn read<'a, T, H>(
        &self,
        dt: &mut DebugTarget<T>,
        host: &mut H,
        runner: &mut AlgorithmRunner<'a, T::Arch>,
        buf: &mut [u8],
    ) -> Result<TransferStats, TransferError<T::Error>>
    where
        T: Target,
        H: Host,
    {
        if buf.len() % self.ring.block_size() as usize != 0 {
            return Err(TransferError::new(
                0,
                Error::InvalidRingBuffer("read length must be a multiple of the block size"),
            ));
        }

        let mut stats = TransferStats::default();
        if let Err(e) = self.start(dt, runner, "flash read") {
            return Err(TransferError::new(0, e));
        }

        let res = self.read_loop(dt.target_mut(), host, buf, &mut stats);
        self.finish(
            dt,
            host,
            runner,
            res,
            stats,
            self.ring.rp_addr(),
            self.ring.wp_addr(),
            "flash read",
        )
    }

    fn read_loop<T, H>(
        &self,
        target: &mut T,
        host: &mut H,
        buf: &mut [u8],
        stats: &mut TransferStats,
    ) -> Result<(), Error<T::Error>>
    where
        T: Target,
        H: Host,
    {
        let ring = &self.ring;
        let wp_addr = addr::<T>(ring.wp_addr())?;
        let rp_addr = addr::<T>(ring.rp_addr())?;

        let mut rp = ring.fifo_start();
        let mut stalls = 0;

        while stats.bytes < buf.len() {
            let wp = match target.read_u32(wp_addr) {
                Ok(wp) => wp,
                Err(e) => {
                    error!("failed to get write pointer");
                    return Err(e);
                }
            };

            debug!(
                "offs {:#x} count {:#x} wp {:#x} rp {:#x}",
                stats.bytes,
                buf.len() - stats.bytes,
                wp,
                rp
            );

            if wp == 0 {
                error!("flash read algorithm aborted by target");
                return Err(Error::FlashOperationFailed);
            }
            if !ring.is_valid_ptr(wp) {
                error!("corrupted fifo write pointer {:#x}", wp);
                return Err(Error::CorruptedPointer { ptr: wp });
            }

            let avail = ring.read_space(wp, rp);
            if avail == 0 {
                if let Err(e) = self.stall(host, &mut stalls, stats) {
                    return Err(e);
                }
                continue;
            }
            stalls = 0;

            let remaining = buf.len() - stats.bytes;
            let len = trim_chunk(rp, avail.min(remaining.min(u32::MAX as usize) as u32));

            let chunk = &mut buf[stats.bytes..stats.bytes + len as usize];
            target.read_buffer(addr::<T>(rp)?, chunk)?;
            stats.bytes += len as usize;
            stats.chunks += 1;

            let (next, wrapped) = ring.advance(rp, len);
            rp = next;
            if wrapped {
                stats.wraps += 1;
            }
            target.write_u32(rp_addr, rp)?;

            host.keep_alive();
            if host.shutdown_pending() {
                return Err(Error::Interrupted);
            }
        }

        Ok(())
    }
}
