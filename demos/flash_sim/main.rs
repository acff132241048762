//! Streams a firmware image into the flash of an emulated Cortex-M chip,
//! through a flash loader running on the target.
//!
//! Run with `RUST_LOG=debug` to watch the ring buffer pointers move.

use algostub::algorithm::{AlgorithmImage, AlgorithmRunner, RegParam};
use algostub::host::StdHost;
use algostub::stream::{RingBuffer, StreamConfig, StreamEngine, TransferStats};
use algostub::target::TargetMem;
use algostub::working_area::WorkingAreaConfig;
use algostub::{DebugTarget, Error, TargetRegistry};
use algostub_arch::arm::CortexM;
use log::*;

use crate::emu::{
    Emu, FLASH_BASE, FLASH_REGS, FLASH_SR_PGERR, FLASH_WRITE_EXIT, FLASH_WRITE_STUB, RAM_BASE,
    RAM_SIZE,
};

mod emu;
mod target;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error>>;

const IMAGE_SIZE: usize = 96 * 1024;

fn firmware_image() -> Vec<u8> {
    let mut seed: u32 = 0x1234_5678;
    (0..IMAGE_SIZE)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed as u8
        })
        .collect()
}

/// Program `data` into flash at `address`, streaming it to the on-chip flash
/// loader.
fn flash_write(
    dt: &mut DebugTarget<Emu>,
    host: &mut StdHost,
    address: u32,
    data: &[u8],
) -> DynResult<TransferStats> {
    // memory for the loader code
    let code = dt.alloc_working_area(FLASH_WRITE_STUB.len() as u32)?;
    if let Err(e) = dt.target_mut().write_buffer(code.address(), &FLASH_WRITE_STUB) {
        dt.free_working_area(code)?;
        return Err(e.into());
    }

    // as big a ring buffer as we can get
    let buffer = match dt.alloc_working_area_shrinking(16 * 1024, 256) {
        Ok(buffer) => buffer,
        Err(e) => {
            warn!("no large enough working area available, can't do block memory writes");
            dt.free_working_area(code)?;
            return Err(e.into());
        }
    };
    info!(
        "using a {} byte ring buffer at {:#010x}",
        buffer.size(),
        buffer.address()
    );

    let res = (|| -> DynResult<(TransferStats, u32)> {
        let ring = RingBuffer::from_area(&buffer, 2)
            .map_err(Error::<&'static str>::InvalidRingBuffer)?;

        let exit = code.address() + FLASH_WRITE_EXIT;
        let image = AlgorithmImage::<CortexM>::new(code.address(), exit)
            .reg_param(RegParam::in_out("r0", FLASH_REGS))
            .reg_param(RegParam::input("r1", (data.len() / 2) as u32))
            .reg_param(RegParam::input("r2", ring.wp_addr()))
            .reg_param(RegParam::input("r3", ring.wp_addr() + ring.buffer_size()))
            .reg_param(RegParam::input("r4", address));
        let mut runner = AlgorithmRunner::new(image)?;

        let engine = StreamEngine::new(ring, StreamConfig::new());
        let stats = engine.write(dt, host, &mut runner, data)?;
        let status = runner.image().reg_params()[0].value();
        Ok((stats, status))
    })();

    dt.free_working_area(buffer)?;
    dt.free_working_area(code)?;

    let (stats, status) = res?;
    if status & FLASH_SR_PGERR != 0 {
        return Err(format!("flash loader reported status {:#x}", status).into());
    }
    Ok(stats)
}

fn main() -> DynResult<()> {
    pretty_env_logger::init();

    let mut targets = TargetRegistry::new();
    let config = WorkingAreaConfig::new(RAM_SIZE).phys(RAM_BASE).backup(true);
    targets.insert(DebugTarget::new("stm32f1x.cpu", Emu::new(), config));

    let dt = targets.current_mut().ok_or("no current target")?;
    let mut host = StdHost::new();
    let image = firmware_image();

    let stats = flash_write(dt, &mut host, FLASH_BASE, &image)?;
    println!(
        "wrote {} bytes to {} in {} chunks ({} stalls, {} wraps)",
        stats.bytes,
        dt.name(),
        stats.chunks,
        stats.stalls,
        stats.wraps
    );

    let mut readback = vec![0; image.len()];
    dt.target_mut().read_buffer(FLASH_BASE, &mut readback)?;
    if readback != image {
        return Err("verification failed".into());
    }
    println!("verified {} bytes", readback.len());

    // the flash hasn't been erased, so the loader bails out
    match flash_write(dt, &mut host, FLASH_BASE, &image) {
        Ok(_) => return Err("programming non-erased flash succeeded".into()),
        Err(e) => println!("second write failed as expected: {}", e),
    }

    assert_eq!(dt.working_area_available()?, RAM_SIZE);
    Ok(())
}
