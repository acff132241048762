//! Downloading and running algorithms on a target.
//!
//! An algorithm is a piece of native code already placed in target memory
//! (usually in a working area). It is described by an [`AlgorithmImage`]:
//! where to start executing, where execution is considered complete, which
//! memory blocks and registers to exchange with it, and how long to wait.
//!
//! Running an algorithm goes through an [`AlgorithmRunner`]:
//!
//! ```rust,ignore
//! let image = AlgorithmImage::<CortexM>::new(code.address(), code.address() + 0x20)
//!     .reg_param(RegParam::input("r0", buf.address()))
//!     .reg_param(RegParam::output("r1"))
//!     .mem_param(MemParam::output(buf.address(), 64))
//!     .timeout_ms(500);
//!
//! let mut runner = AlgorithmRunner::new(image)?;
//! runner.run(&mut debug_target, &mut host)?;
//! let result = runner.image().reg_params()[1].value();
//! ```
//!
//! The link to the target offers no completion notifications, so completion
//! is detected by polling the target until it reports being halted.
//! Algorithms never nest: while one is running (or was left running by a
//! timeout), every attempt to start another on the same target fails with
//! [`Error::AlreadyRunning`](crate::Error::AlreadyRunning).

mod image;
mod param;
mod runner;

pub use image::{AlgorithmImage, InvalidImage, DEFAULT_TIMEOUT_MS};
pub use param::{MemParam, ParamDirection, RegParam};
pub use runner::{AlgorithmRunner, AlgorithmState, DEFAULT_POLL_INTERVAL_MS};
