//! Run algorithms on, and stream data to and from, targets behind a debug
//! link.
//!
//! A debugger talking to a chip over JTAG/SWD can read and write memory, and
//! start/stop the core, but every access is a slow round trip. Bulk work
//! (flash programming, checksumming, memory dumps) is much faster when done
//! by native code running on the target itself. `algostub` provides the host
//! side of that arrangement:
//!
//! - [`working_area`]: an allocator for scratch regions of target RAM, used
//!   to hold algorithm code and transfer buffers.
//! - [`algorithm`]: downloads parameters, starts an algorithm, and waits for
//!   it to reach its exit point.
//! - [`stream`]: streams large amounts of data through a ring buffer in
//!   target memory while the algorithm keeps running.
//!
//! The debug link offers no interrupts or completion signals, so everything
//! in this crate is driven by polling.
//!
//! ## Getting Started
//!
//! Implement [`Target`](target::Target) for your debug probe / chip (see the
//! [`target`] module for details), pick an [`Arch`](arch::Arch) (ready-made
//! implementations live in the `algostub_arch` crate), and wrap the target in
//! a [`DebugTarget`]:
//!
//! ```rust,ignore
//! let config = WorkingAreaConfig::new(0x4000).phys(0x2000_0000);
//! let mut dt = DebugTarget::new("stm32f1x.cpu", MyProbe::new(), config);
//!
//! let code = dt.alloc_working_area(LOADER.len() as u32)?;
//! dt.target_mut().write_buffer(code.address(), LOADER)?;
//!
//! let buffer = dt.alloc_working_area_shrinking(0x4000, 0x100)?;
//! let ring = RingBuffer::from_area(&buffer, 4).map_err(Error::InvalidRingBuffer)?;
//!
//! let mut runner = AlgorithmRunner::new(image)?;
//! StreamEngine::new(ring, StreamConfig::new())
//!     .write(&mut dt, &mut StdHost::new(), &mut runner, &firmware)?;
//! ```
//!
//! ## Feature flags
//!
//! By default, the `std` feature is enabled.
//!
//! When using `algostub` in `#![no_std]` contexts, make sure to set
//! `default-features = false`. An allocator is still required.
//!
//! - `std`
//!   - Provides [`StdHost`](host::StdHost), a [`Host`](host::Host) backed by
//!     `std::time` and `std::thread`.
//!   - Implements `std::error::Error` for the crate's error types.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]

extern crate alloc;

pub mod algorithm;
pub mod arch;
pub mod host;
pub mod stream;
pub mod target;
pub mod working_area;

mod debug_target;
mod error;
mod registry;

#[cfg(test)]
mod sim;

pub use debug_target::DebugTarget;
pub use error::{Error, TransferError};
pub use registry::TargetRegistry;
