//! Report the state of the target's MMU.

use crate::target::{Target, TargetResult};

/// Target Extension - Query the MMU.
///
/// The working area allocator uses this to decide whether the configured
/// physical or virtual working area address applies.
pub trait Mmu: Target {
    /// Return `true` if address translation is currently enabled.
    fn mmu_enabled(&mut self) -> TargetResult<bool, Self>;
}

define_ext!(MmuOps, Mmu);
