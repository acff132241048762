use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::arch::Arch;

use super::{MemParam, RegParam};

/// Timeout used when an image doesn't specify one.
pub const DEFAULT_TIMEOUT_MS: u32 = 10_000;

/// An algorithm, and the parameters it is run with.
///
/// The algorithm's code must already reside in target memory (typically in a
/// working area).
pub struct AlgorithmImage<'a, A: Arch> {
    entry_point: A::Usize,
    exit_point: A::Usize,
    mem_params: Vec<MemParam<'a, A::Usize>>,
    reg_params: Vec<RegParam<'a, A::Usize>>,
    arch_info: A::AlgorithmInfo,
    timeout_ms: u32,
}

impl<'a, A: Arch> AlgorithmImage<'a, A> {
    /// Create a new image starting at `entry_point`.
    ///
    /// Completion is detected by a breakpoint at `exit_point`. An exit point
    /// of zero denotes an algorithm which halts on its own (e.g: by executing
    /// a breakpoint instruction), in which case any halt counts as
    /// completion.
    pub fn new(entry_point: A::Usize, exit_point: A::Usize) -> Self {
        AlgorithmImage {
            entry_point,
            exit_point,
            mem_params: Vec::new(),
            reg_params: Vec::new(),
            arch_info: A::AlgorithmInfo::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Add a memory parameter.
    pub fn mem_param(mut self, param: MemParam<'a, A::Usize>) -> Self {
        self.mem_params.push(param);
        self
    }

    /// Add a register parameter.
    pub fn reg_param(mut self, param: RegParam<'a, A::Usize>) -> Self {
        self.reg_params.push(param);
        self
    }

    /// Set the architecture-specific description of the algorithm.
    pub fn arch_info(mut self, info: A::AlgorithmInfo) -> Self {
        self.arch_info = info;
        self
    }

    /// Set the time [`run`](super::AlgorithmRunner::run) waits for the
    /// algorithm to complete.
    pub fn timeout_ms(mut self, ms: u32) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Address execution starts at.
    pub fn entry_point(&self) -> A::Usize {
        self.entry_point
    }

    /// Address at which the algorithm is considered complete.
    pub fn exit_point(&self) -> A::Usize {
        self.exit_point
    }

    /// Memory parameters, in insertion order.
    pub fn mem_params(&self) -> &[MemParam<'a, A::Usize>] {
        &self.mem_params
    }

    /// Register parameters, in insertion order.
    pub fn reg_params(&self) -> &[RegParam<'a, A::Usize>] {
        &self.reg_params
    }

    /// Consume the image, returning its memory parameters.
    pub fn into_mem_params(self) -> Vec<MemParam<'a, A::Usize>> {
        self.mem_params
    }

    /// Architecture-specific description of the algorithm.
    pub fn info(&self) -> &A::AlgorithmInfo {
        &self.arch_info
    }

    /// Completion timeout used by `run`.
    pub fn timeout(&self) -> u32 {
        self.timeout_ms
    }

    pub(crate) fn params_mut(
        &mut self,
    ) -> (
        &mut [MemParam<'a, A::Usize>],
        &mut [RegParam<'a, A::Usize>],
    ) {
        (&mut self.mem_params, &mut self.reg_params)
    }
}

impl<'a, A: Arch> fmt::Debug for AlgorithmImage<'a, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmImage")
            .field("entry_point", &self.entry_point)
            .field("exit_point", &self.exit_point)
            .field("mem_params", &self.mem_params)
            .field("reg_params", &self.reg_params)
            .field("arch_info", &self.arch_info)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Reasons an [`AlgorithmImage`] may be rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidImage {
    /// A register parameter names a register the architecture doesn't know.
    UnknownRegister(String),
    /// The entry point can't be executed by the core.
    MisalignedEntryPoint,
    /// The exit point can't hold a breakpoint.
    MisalignedExitPoint,
    /// The completion timeout is zero.
    ZeroTimeout,
    /// Architecture-specific reason.
    Arch(&'static str),
}

impl fmt::Display for InvalidImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidImage::UnknownRegister(name) => write!(f, "unknown register `{}`", name),
            InvalidImage::MisalignedEntryPoint => write!(f, "misaligned entry point"),
            InvalidImage::MisalignedExitPoint => write!(f, "misaligned exit point"),
            InvalidImage::ZeroTimeout => write!(f, "timeout must be non-zero"),
            InvalidImage::Arch(why) => write!(f, "{}", why),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidImage {}
