//! Implementations for ARM Cortex-M cores.

use alloc::vec;
use alloc::vec::Vec;

use algostub::algorithm::{AlgorithmImage, InvalidImage};
use algostub::arch::Arch;

pub mod reg;

pub use reg::ArmCoreRegId;

/// Thumb bit of the `xPSR` register. Cortex-M cores fault if it is clear.
pub const XPSR_THUMB: u32 = 0x0100_0000;

/// ARM-specific breakpoint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmBreakpointKind {
    /// 16-bit Thumb mode breakpoint.
    Thumb16,
    /// 32-bit Thumb mode (Thumb-2) breakpoint.
    Thumb32,
    /// 32-bit ARM mode breakpoint.
    Arm32,
}

/// Core mode an algorithm must run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CortexMMode {
    /// Leave the core mode untouched.
    Any,
    /// Privileged thread mode, on the main stack.
    Thread,
    /// Handler mode. The debugger can't enter it, so it is always rejected.
    Handler,
}

/// Cortex-M specific description of an algorithm.
#[derive(Debug, Clone)]
pub struct CortexMAlgorithm {
    /// The mode the algorithm expects to run in.
    pub core_mode: CortexMMode,
}

impl Default for CortexMAlgorithm {
    fn default() -> Self {
        CortexMAlgorithm {
            core_mode: CortexMMode::Thread,
        }
    }
}

/// Implements `Arch` for ARMv6-M / ARMv7-M / ARMv8-M (Thumb only) cores.
pub enum CortexM {}

impl Arch for CortexM {
    type Usize = u32;
    type RegId = ArmCoreRegId;
    type BreakpointKind = ArmBreakpointKind;
    type AlgorithmInfo = CortexMAlgorithm;

    fn pc_reg() -> ArmCoreRegId {
        ArmCoreRegId::Pc
    }

    fn exit_breakpoint_kind(_info: &CortexMAlgorithm) -> ArmBreakpointKind {
        ArmBreakpointKind::Thumb16
    }

    fn check_algorithm(image: &AlgorithmImage<'_, Self>) -> Result<(), InvalidImage> {
        if image.info().core_mode == CortexMMode::Handler {
            return Err(InvalidImage::Arch("cannot run algorithms in handler mode"));
        }
        if image.entry_point() & 1 != 0 {
            return Err(InvalidImage::MisalignedEntryPoint);
        }
        if image.exit_point() & 1 != 0 {
            return Err(InvalidImage::MisalignedExitPoint);
        }
        Ok(())
    }

    fn algorithm_context(info: &CortexMAlgorithm) -> Vec<(ArmCoreRegId, u32)> {
        let mut ctx = vec![(ArmCoreRegId::Xpsr, XPSR_THUMB)];
        if info.core_mode == CortexMMode::Thread {
            ctx.push((ArmCoreRegId::Control, 0));
        }
        ctx
    }
}
