//! Working areas: scratch regions of target memory handed out to algorithms
//! and transfer buffers.
//!
//! The arena covers a single configured window of target RAM. It starts out
//! as one free region, which is split on allocation (first fit, in address
//! order) and merged back together on release. At all times, the areas tile
//! the window without gaps, and after every release no two neighbouring areas
//! are both free.
//!
//! Allocations are represented by [`WorkingArea`] handles. A handle is
//! consumed when it is released, and carries the id of the arena that handed
//! it out along with an `(index, generation)` pair, all of which the arena
//! validates. Handles invalidated behind the caller's back (e.g: by
//! [`WorkingAreas::free_all`]) or belonging to another target's arena are
//! rejected instead of silently freeing somebody else's area.

mod arena;
mod config;

pub use arena::{AreaInfo, WorkingAreas};
pub use config::WorkingAreaConfig;

/// Identifies a slot in the working area arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AreaId {
    pub(crate) arena: u32,
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// An allocated working area.
///
/// Must be handed back via [`WorkingAreas::free`] (or one of its variants).
/// Dropping the handle leaks the area until the next
/// [`free_all`](WorkingAreas::free_all).
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct WorkingArea<U> {
    pub(crate) id: AreaId,
    pub(crate) address: U,
    pub(crate) size: u32,
}

impl<U: Copy> WorkingArea<U> {
    /// The arena slot backing this area.
    pub fn id(&self) -> AreaId {
        self.id
    }

    /// Start address of the area in target memory.
    pub fn address(&self) -> U {
        self.address
    }

    /// Size of the area in bytes. Always a multiple of 4.
    pub fn size(&self) -> u32 {
        self.size
    }
}
