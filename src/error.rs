use core::fmt::{self, Debug, Display};

use crate::algorithm::InvalidImage;
use crate::target::TargetError;

/// An error which may occur while managing working areas, running algorithms,
/// or streaming data to/from a target.
///
/// `E` is the target's fatal error type ([`Target::Error`]).
///
/// [`Target::Error`]: crate::target::Target::Error
#[derive(Debug)]
#[non_exhaustive]
pub enum Error<E> {
    /// No sufficiently large working area is available. Callers may retry with
    /// a smaller request.
    ResourceNotAvailable {
        /// Number of bytes requested (rounded up to a multiple of 4).
        requested: u32,
        /// Largest contiguous free block at the time of the request.
        available: u32,
    },
    /// The working area handle was already released, or belongs to another
    /// arena.
    StaleHandle,

    /// The target must be halted to start an algorithm.
    NotHalted,
    /// The target is already running an algorithm. Algorithms never nest.
    AlreadyRunning,
    /// Attempted to wait for an algorithm which was never started.
    NotRunning,
    /// The algorithm did not halt before the deadline. The remote state is
    /// unknown: the caller may wait again, or abandon the algorithm and reset
    /// the target.
    TimedOut,
    /// The algorithm halted somewhere other than its exit point.
    UnexpectedExit {
        /// Program counter at the time of the halt.
        pc: u64,
    },
    /// The algorithm image was rejected.
    InvalidImage(InvalidImage),

    /// The target-resident algorithm signalled an abort (zeroed its ring
    /// pointer).
    FlashOperationFailed,
    /// The target-resident algorithm published a misaligned or out-of-range
    /// ring pointer.
    CorruptedPointer {
        /// The offending pointer value.
        ptr: u32,
    },
    /// The ring buffer made no progress for too long.
    StreamTimeout,
    /// The transfer was cancelled by a pending shutdown request.
    Interrupted,
    /// The ring buffer geometry is unusable.
    InvalidRingBuffer(&'static str),

    /// The requested address range wraps around the end of the address space.
    AddressWrap {
        /// Start of the range.
        addr: u64,
        /// Length of the range.
        len: usize,
    },
    /// The target does not implement a capability required for the request.
    Unsupported(&'static str),

    /// Target reported an unaligned access.
    UnalignedAccess,
    /// Target reported a non-fatal error.
    NonFatal,
    /// Target reported a non-fatal error with an errno-style error code.
    Errno(u8),
    /// Target encountered a fatal error.
    TargetError(E),
}

impl<E> From<TargetError<E>> for Error<E> {
    fn from(e: TargetError<E>) -> Self {
        match e {
            TargetError::NonFatal => Error::NonFatal,
            TargetError::Errno(code) => Error::Errno(code),
            TargetError::UnalignedAccess => Error::UnalignedAccess,
            TargetError::Fatal(e) => Error::TargetError(e),
        }
    }
}

impl<E> From<InvalidImage> for Error<E> {
    fn from(e: InvalidImage) -> Self {
        Error::InvalidImage(e)
    }
}

impl<E> Error<E> {
    /// Returns `true` if the error indicates a misuse of the API (as opposed
    /// to a failure on the target). These must never be blindly retried.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Error::NotHalted | Error::AlreadyRunning | Error::NotRunning | Error::StaleHandle
        )
    }
}

impl<E> Display for Error<E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ResourceNotAvailable { requested, available } => write!(f, "Not enough working area available (requested {}, largest free block {}).", requested, available),
            Error::StaleHandle => write!(f, "Working area handle is stale."),

            Error::NotHalted => write!(f, "Target not halted."),
            Error::AlreadyRunning => write!(f, "Target is already running an algorithm."),
            Error::NotRunning => write!(f, "Target is not running an algorithm."),
            Error::TimedOut => write!(f, "Timed out while waiting for the algorithm to halt."),
            Error::UnexpectedExit { pc } => write!(f, "Algorithm halted at unexpected address {:#x}.", pc),
            Error::InvalidImage(e) => write!(f, "Invalid algorithm image: {}", e),

            Error::FlashOperationFailed => write!(f, "Algorithm aborted by target."),
            Error::CorruptedPointer { ptr } => write!(f, "Corrupted fifo pointer {:#010x}.", ptr),
            Error::StreamTimeout => write!(f, "Timeout waiting for algorithm, a target reset is recommended."),
            Error::Interrupted => write!(f, "Interrupted by a shutdown request."),
            Error::InvalidRingBuffer(why) => write!(f, "Invalid ring buffer: {}", why),

            Error::AddressWrap { addr, len } => write!(f, "Address + size wrapped ({:#x}, {:#x}).", addr, len),
            Error::Unsupported(what) => write!(f, "Target does not support {}.", what),

            Error::UnalignedAccess => write!(f, "Target reported an unaligned access."),
            Error::NonFatal => write!(f, "Target reported a non-fatal error."),
            Error::Errno(code) => write!(f, "Target reported a non-fatal error (errno {}).", code),
            Error::TargetError(e) => write!(f, "Target threw a fatal error: {:?}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E> std::error::Error for Error<E> where E: Debug {}

/// A streaming transfer failed.
///
/// A failed transfer typically leaves an aborted algorithm on the target. The
/// remedy is an explicit target reset.
#[derive(Debug)]
pub struct TransferError<E> {
    /// Number of host bytes moved through the ring buffer before the failure.
    pub offset: usize,
    /// The error which stopped the transfer.
    pub error: Error<E>,
    /// Set if waiting for the algorithm also failed after the transfer loop
    /// had already stopped with `error`.
    pub wait_error: Option<Error<E>>,
}

impl<E> TransferError<E> {
    pub(crate) fn new(offset: usize, error: Error<E>) -> Self {
        TransferError {
            offset,
            error,
            wait_error: None,
        }
    }
}

impl<E> Display for TransferError<E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transfer failed at offset {:#x}: {}", self.offset, self.error)?;
        if let Some(e) = &self.wait_error {
            write!(f, " (waiting for the algorithm also failed: {})", e)?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl<E> std::error::Error for TransferError<E> where E: Debug {}
