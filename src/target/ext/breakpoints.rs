//! Add/Remove breakpoints.

use crate::arch::Arch;
use crate::target::{Target, TargetResult};

/// Target Extension - Set/Remove Breakpoints.
///
/// Used by the algorithm runner to catch an algorithm's exit point. Whether
/// the target implements these as hardware or software breakpoints is up to
/// the target.
pub trait Breakpoints: Target {
    /// Add a new breakpoint.
    /// Return `Ok(false)` if the operation could not be completed.
    fn add_breakpoint(
        &mut self,
        addr: <Self::Arch as Arch>::Usize,
        kind: <Self::Arch as Arch>::BreakpointKind,
    ) -> TargetResult<bool, Self>;

    /// Remove an existing breakpoint.
    /// Return `Ok(false)` if the operation could not be completed.
    fn remove_breakpoint(
        &mut self,
        addr: <Self::Arch as Arch>::Usize,
        kind: <Self::Arch as Arch>::BreakpointKind,
    ) -> TargetResult<bool, Self>;
}

define_ext!(BreakpointsOps, Breakpoints);
