//! Traits to encode architecture-specific target information.
//!
//! The core crate never hard-codes a register layout. Everything it needs to
//! know about a CPU architecture (pointer width, how register parameters are
//! named, which breakpoint to arm at an algorithm's exit point, and which
//! registers make up an algorithm's execution context) is supplied through the
//! [`Arch`] trait.
//!
//! Ready-made implementations for common architectures live in the companion
//! [`algostub_arch`](https://docs.rs/algostub_arch) crate.

use alloc::vec::Vec;
use core::fmt::{Debug, LowerHex};

use num_traits::{FromPrimitive, PrimInt, Unsigned};

use crate::algorithm::{AlgorithmImage, InvalidImage};

/// Register identifier.
///
/// Algorithm register parameters are passed by name (e.g: `"r0"`, `"a2"`), so
/// each architecture must be able to resolve a name into a concrete register.
pub trait RegId: Sized + Debug + Copy + PartialEq {
    /// Map a register name into a `RegId`.
    ///
    /// Returns `None` if the name is not recognized.
    fn from_name(name: &str) -> Option<Self>;
}

/// Encodes architecture-specific information, such as pointer size, register
/// names and algorithm execution requirements.
pub trait Arch {
    /// The architecture's pointer size (e.g: `u32` on a 32-bit system).
    type Usize: Debug + LowerHex + FromPrimitive + PrimInt + Unsigned;

    /// Register identifier enum/struct.
    type RegId: RegId;

    /// Breakpoint kind used to catch an algorithm's exit point (e.g: a 16-bit
    /// Thumb breakpoint on ARM).
    type BreakpointKind: Debug + Copy;

    /// Architecture-specific description of an algorithm (the opaque
    /// `arch_info` carried by an [`AlgorithmImage`]).
    type AlgorithmInfo: Debug + Clone + Default;

    /// The program counter register.
    fn pc_reg() -> Self::RegId;

    /// The breakpoint kind to arm at an algorithm's exit point.
    fn exit_breakpoint_kind(info: &Self::AlgorithmInfo) -> Self::BreakpointKind;

    /// Validate an algorithm image before it is loaded.
    ///
    /// Generic checks (non-zero timeout, resolvable register names) are
    /// performed by the runner itself. Implementations should reject anything
    /// their core cannot execute, such as misaligned entry points.
    #[inline(always)]
    fn check_algorithm(image: &AlgorithmImage<'_, Self>) -> Result<(), InvalidImage>
    where
        Self: Sized,
    {
        let _ = image;
        Ok(())
    }

    /// Extra register values which must be set before an algorithm starts
    /// (e.g: the Thumb bit in a Cortex-M `xPSR`).
    ///
    /// These registers are saved before the algorithm runs, and restored once
    /// it completes.
    #[inline(always)]
    fn algorithm_context(info: &Self::AlgorithmInfo) -> Vec<(Self::RegId, Self::Usize)> {
        let _ = info;
        Vec::new()
    }
}
