//! Implementations of [`algostub::arch::Arch`] for various architectures.
//!
//! _Note:_ If an architecture is missing from this crate, that does _not_ mean
//! that it can't be used with `algostub`! Implementing `Arch` by hand only
//! requires a register name lookup, the breakpoint used to catch an
//! algorithm's exit point, and (optionally) a set of context registers to
//! prime before the algorithm starts.

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

extern crate alloc;

pub mod arm;
pub mod riscv;
