//! The [`Target`] trait, and its various optional extension traits.
//!
//! `Target` is the capability interface through which every other part of
//! this crate talks to the device being debugged: raw memory access, single
//! register access, and execution control. The working area allocator, the
//! algorithm runner and the streaming engine only ever depend on this
//! interface, never on a concrete chip type.
//!
//! ### What's with all the `<Self::Arch as Arch>::` syntax?
//!
//! If [rust-lang/rust#38078](https://github.com/rust-lang/rust/issues/38078)
//! ever gets fixed, `<Self::Arch as Arch>::Foo` will be simplified to just
//! `Self::Arch::Foo`.
//!
//! Until then, when implementing `Target`, it's recommended to use the concrete
//! type directly. e.g: on a 32-bit platform, instead of writing `<Self::Arch
//! as Arch>::Usize`, use `u32` directly.
//!
//! ## Optional capabilities
//!
//! Not every target can set breakpoints or report MMU state. These
//! capabilities are exposed as extension traits (see [`ext`]), which a target
//! opts into by overriding the corresponding `support_` method:
//!
//! ```rust,ignore
//! impl Target for MyTarget {
//!     // ...
//!     #[inline(always)]
//!     fn support_breakpoints(&mut self) -> Option<BreakpointsOps<'_, Self>> {
//!         Some(self)
//!     }
//! }
//! ```

use crate::arch::Arch;

pub mod ext;
mod mem;

pub use mem::TargetMem;

/// Target-specific error which may occur while servicing a request.
#[derive(Debug)]
#[non_exhaustive]
pub enum TargetError<E> {
    /// A non-specific, non-fatal error has occurred.
    NonFatal,
    /// Non-fatal I/O error with an errno-style error code.
    Errno(u8),
    /// The target cannot perform the access with the requested alignment.
    UnalignedAccess,
    /// A target-specific fatal error (e.g: the debug link went away).
    Fatal(E),
}

/// A specialized `Result` type for `Target` operations.
///
/// _Note:_ While it's typically parameterized as `TargetResult<T, Self>`, the
/// error value is in-fact `TargetError<Self::Error>` (not `Self`).
pub type TargetResult<T, Tgt> = Result<T, TargetError<<Tgt as Target>::Error>>;

/// Byte order used by the target for multi-byte values in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

/// Execution state of the target, as reported by [`Target::poll`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecState {
    /// The core is executing code.
    Running,
    /// The core is stopped, and ready for debug requests.
    Halted,
    /// The core is executing code on behalf of the debugger (e.g: a
    /// downloaded algorithm).
    DebugRunning,
    /// The core is held in reset.
    Reset,
    /// The state could not be determined.
    Unknown,
}

bitflags::bitflags! {
    /// Options passed along with [`Target::resume`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ResumeFlags: u8 {
        /// Step over any breakpoint set at the resume address before
        /// continuing.
        const HANDLE_BREAKPOINTS = 1 << 0;
        /// The code is run on behalf of the debugger, not the debuggee. Targets
        /// may use this to suppress event reporting.
        const DEBUG_EXECUTION = 1 << 1;
    }
}

/// Describes a target which can be driven by this crate.
pub trait Target {
    /// The target's architecture.
    type Arch: Arch;

    /// A target-specific **fatal** error.
    type Error;

    /// Byte order of the target's memory. Defaults to little endian.
    #[inline(always)]
    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    /// Read bytes from the specified address range.
    ///
    /// If the requested address range could not be accessed (e.g: due to
    /// MMU protection, unhanded page fault, etc...), an appropriate
    /// non-fatal error should be returned.
    fn read_addrs(
        &mut self,
        start_addr: <Self::Arch as Arch>::Usize,
        data: &mut [u8],
    ) -> TargetResult<(), Self>;

    /// Write bytes to the specified address range.
    ///
    /// If the requested address range could not be accessed (e.g: due to
    /// MMU protection, unhanded page fault, etc...), an appropriate
    /// non-fatal error should be returned.
    fn write_addrs(
        &mut self,
        start_addr: <Self::Arch as Arch>::Usize,
        data: &[u8],
    ) -> TargetResult<(), Self>;

    /// Read a single register.
    fn read_register(
        &mut self,
        reg: <Self::Arch as Arch>::RegId,
    ) -> TargetResult<<Self::Arch as Arch>::Usize, Self>;

    /// Write a single register.
    fn write_register(
        &mut self,
        reg: <Self::Arch as Arch>::RegId,
        val: <Self::Arch as Arch>::Usize,
    ) -> TargetResult<(), Self>;

    /// Request the target to halt.
    ///
    /// This only _requests_ a halt. Completion is observed through
    /// [`Target::poll`].
    fn halt(&mut self) -> TargetResult<(), Self>;

    /// Resume execution, either from the current PC (`addr == None`), or from
    /// the provided address.
    fn resume(
        &mut self,
        addr: Option<<Self::Arch as Arch>::Usize>,
        flags: ResumeFlags,
    ) -> TargetResult<(), Self>;

    /// Take a snapshot of the target's execution state.
    ///
    /// The debug link offers no completion signals, so this is the only way
    /// to learn that a running target has stopped.
    fn poll(&mut self) -> TargetResult<ExecState, Self>;

    /// Support for setting / removing breakpoints.
    #[inline(always)]
    fn support_breakpoints(&mut self) -> Option<ext::breakpoints::BreakpointsOps<'_, Self>> {
        None
    }

    /// Support for querying the state of the target's MMU.
    ///
    /// Targets without this extension are assumed to run with the MMU
    /// disabled.
    #[inline(always)]
    fn support_mmu(&mut self) -> Option<ext::mmu::MmuOps<'_, Self>> {
        None
    }
}
