//! Implementations for the [RISC-V](https://riscv.org/) architecture.
//!
//! *Note*: currently only supports the 32-bit integer ISA.

use algostub::algorithm::{AlgorithmImage, InvalidImage};
use algostub::arch::Arch;

pub mod reg;

pub use reg::RiscvRegId;

/// RISC-V specific description of an algorithm.
#[derive(Debug, Clone, Default)]
pub struct RiscvAlgorithm {
    /// The algorithm is built for the `C` extension, and may contain 16-bit
    /// instructions.
    pub compressed: bool,
}

impl RiscvAlgorithm {
    fn alignment(&self) -> u32 {
        if self.compressed {
            2
        } else {
            4
        }
    }
}

/// Implements `Arch` for 32-bit RISC-V.
pub enum Riscv32 {}

impl Arch for Riscv32 {
    type Usize = u32;
    type RegId = RiscvRegId;
    /// Breakpoint length in bytes (2 for `c.ebreak`, 4 for `ebreak`).
    type BreakpointKind = usize;
    type AlgorithmInfo = RiscvAlgorithm;

    fn pc_reg() -> RiscvRegId {
        RiscvRegId::Pc
    }

    fn exit_breakpoint_kind(info: &RiscvAlgorithm) -> usize {
        info.alignment() as usize
    }

    fn check_algorithm(image: &AlgorithmImage<'_, Self>) -> Result<(), InvalidImage> {
        let align = image.info().alignment();
        if image.entry_point() % align != 0 {
            return Err(InvalidImage::MisalignedEntryPoint);
        }
        if image.exit_point() % align != 0 {
            return Err(InvalidImage::MisalignedExitPoint);
        }
        Ok(())
    }
}
