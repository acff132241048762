use alloc::vec;
use alloc::vec::Vec;
use core::fmt::{Debug, LowerHex};
use core::sync::atomic::{AtomicU32, Ordering};

use log::*;
use num_traits::{FromPrimitive, PrimInt};

use crate::arch::Arch;
use crate::error::Error;
use crate::target::{Target, TargetMem};

use super::{AreaId, WorkingArea, WorkingAreaConfig};

#[derive(Debug)]
struct Node<U> {
    address: U,
    size: u32,
    free: bool,
    backup: Option<Vec<u8>>,
}

#[derive(Debug)]
struct Slot<U> {
    generation: u32,
    live: bool,
    node: Node<U>,
}

/// A snapshot of a single area, as returned by [`WorkingAreas::layout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AreaInfo<U> {
    /// Start address of the area.
    pub address: U,
    /// Size of the area in bytes.
    pub size: u32,
    /// `true` if the area is available for allocation.
    pub free: bool,
    /// `true` if the area holds a backup of the memory it covers.
    pub backup: bool,
}

/// The working area arena of a single target.
///
/// The arena is materialized lazily, on the first allocation, so that the
/// MMU state is sampled as late as possible. It is discarded again by
/// [`free_all`](Self::free_all), and re-materialized (possibly at a different
/// address) on the next allocation.
#[derive(Debug)]
pub struct WorkingAreas<U> {
    id: u32,
    config: WorkingAreaConfig<U>,
    slots: Vec<Slot<U>>,
    // slot indices, in ascending address order
    order: Vec<u32>,
    vacant: Vec<u32>,
}

/// Source of unique arena ids, so that handles can't cross targets.
static NEXT_ARENA_ID: AtomicU32 = AtomicU32::new(1);

/// `addr + by`, for offsets which lie within the (validated) window.
fn offset<U: PrimInt + FromPrimitive>(addr: U, by: u32) -> U {
    U::from_u32(by)
        .and_then(|by| addr.checked_add(&by))
        .unwrap_or_else(U::max_value)
}

impl<U> WorkingAreas<U>
where
    U: PrimInt + FromPrimitive + LowerHex + Debug,
{
    /// Create a new (not yet materialized) arena.
    pub fn new(config: WorkingAreaConfig<U>) -> Self {
        WorkingAreas {
            id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
            config,
            slots: Vec::new(),
            order: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// The arena's configuration.
    pub fn config(&self) -> &WorkingAreaConfig<U> {
        &self.config
    }

    /// Replace the arena's configuration.
    ///
    /// Outstanding areas are forgotten without being restored. Callers should
    /// [`free_all`](Self::free_all) first.
    pub fn set_config(&mut self, config: WorkingAreaConfig<U>) {
        self.discard();
        self.config = config;
    }

    /// Returns `true` once the arena has been materialized by an allocation.
    pub fn is_materialized(&self) -> bool {
        !self.order.is_empty()
    }

    /// Size of the largest contiguous free block.
    ///
    /// Before the arena is materialized, this is the full configured size, or
    /// 0 if no address is configured at all. See
    /// [`available_on`](Self::available_on) to also account for the MMU.
    pub fn available(&self) -> u32 {
        if !self.is_materialized() {
            if self.config.phys_addr().is_none() && self.config.virt_addr().is_none() {
                return 0;
            }
            return self.config.size() & !3;
        }

        self.nodes()
            .filter(|n| n.free)
            .map(|n| n.size)
            .max()
            .unwrap_or(0)
    }

    /// Like [`available`](Self::available), but samples the target's MMU
    /// state before the arena is materialized: 0 if no address is configured
    /// for that state, since the next allocation is bound to fail.
    pub fn available_on<T>(&self, target: &mut T) -> Result<u32, Error<T::Error>>
    where
        T: Target + ?Sized,
        T::Arch: Arch<Usize = U>,
    {
        if self.is_materialized() {
            return Ok(self.available());
        }

        let enabled = match target.support_mmu() {
            Some(ops) => ops.mmu_enabled()?,
            None => false,
        };
        match self.config.window(enabled) {
            Some(_) => Ok(self.config.size() & !3),
            None => Ok(0),
        }
    }

    /// Snapshot of all areas, in ascending address order.
    pub fn layout(&self) -> Vec<AreaInfo<U>> {
        self.nodes()
            .map(|n| AreaInfo {
                address: n.address,
                size: n.size,
                free: n.free,
                backup: n.backup.is_some(),
            })
            .collect()
    }

    /// Allocate a working area of (at least) `size` bytes.
    ///
    /// Identical to [`alloc_try`](Self::alloc_try), but logs a warning when
    /// the request can't be satisfied.
    pub fn alloc<T>(
        &mut self,
        target: &mut T,
        size: u32,
    ) -> Result<WorkingArea<U>, Error<T::Error>>
    where
        T: Target + ?Sized,
        T::Arch: Arch<Usize = U>,
    {
        let res = self.alloc_try(target, size);
        if let Err(Error::ResourceNotAvailable { requested, .. }) = res {
            warn!(
                "not enough working area available(requested {})",
                requested
            );
        }
        res
    }

    /// Allocate a working area of (at least) `size` bytes.
    ///
    /// The request is rounded up to a multiple of 4, and served from the
    /// lowest addressed free block large enough to hold it. A zero-byte
    /// request is treated as a request for 4 bytes.
    ///
    /// If backups are enabled, the memory covered by the new area is read
    /// from the target before the area is handed out.
    pub fn alloc_try<T>(
        &mut self,
        target: &mut T,
        size: u32,
    ) -> Result<WorkingArea<U>, Error<T::Error>>
    where
        T: Target + ?Sized,
        T::Arch: Arch<Usize = U>,
    {
        let size = match size.max(1).checked_add(3) {
            Some(size) => size & !3,
            None => {
                return Err(Error::ResourceNotAvailable {
                    requested: size,
                    available: self.available(),
                })
            }
        };

        if !self.is_materialized() {
            self.materialize(target, size)?;
        }

        let pos = self.order.iter().position(|&i| {
            let n = &self.slots[i as usize].node;
            n.free && n.size >= size
        });
        let pos = match pos {
            Some(pos) => pos,
            None => {
                return Err(Error::ResourceNotAvailable {
                    requested: size,
                    available: self.available(),
                })
            }
        };

        self.split(pos, size);
        let index = self.order[pos];

        if self.config.backup_enabled() {
            let node = &mut self.slots[index as usize].node;
            let mut backup = match node.backup.take() {
                Some(buf) if buf.len() == size as usize => buf,
                _ => vec![0; size as usize],
            };
            let res = target.read_buffer(node.address, &mut backup);
            if let Err(e) = res {
                // the freshly split block goes straight back to the pool
                self.merge();
                return Err(e);
            }
            node.backup = Some(backup);
        }

        let slot = &mut self.slots[index as usize];
        slot.node.free = false;
        let area = WorkingArea {
            id: AreaId {
                arena: self.id,
                index,
                generation: slot.generation,
            },
            address: slot.node.address,
            size,
        };

        debug!(
            "allocated new working area of {} bytes at address {:#x}",
            size, area.address
        );
        self.print_layout();

        Ok(area)
    }

    /// Allocate the largest area between `min` and `preferred` bytes.
    ///
    /// Starting from `preferred`, the request is halved until it either
    /// succeeds or would drop below `min`.
    pub fn alloc_shrinking<T>(
        &mut self,
        target: &mut T,
        preferred: u32,
        min: u32,
    ) -> Result<WorkingArea<U>, Error<T::Error>>
    where
        T: Target + ?Sized,
        T::Arch: Arch<Usize = U>,
    {
        let min = min.max(1);
        let mut size = preferred.max(min);
        loop {
            match self.alloc_try(target, size) {
                Err(Error::ResourceNotAvailable { .. }) if size / 2 >= min => size /= 2,
                Err(Error::ResourceNotAvailable {
                    requested,
                    available,
                }) => {
                    error!(
                        "no large enough working area available, can't allocate {} bytes",
                        min
                    );
                    return Err(Error::ResourceNotAvailable {
                        requested,
                        available,
                    });
                }
                res => return res,
            }
        }
    }

    /// Release an area, restoring its backup (if any).
    pub fn free<T>(&mut self, target: &mut T, area: WorkingArea<U>) -> Result<(), Error<T::Error>>
    where
        T: Target + ?Sized,
        T::Arch: Arch<Usize = U>,
    {
        self.free_restore(target, area, true)
    }

    /// Release an area, optionally restoring its backup.
    ///
    /// The area is released even if the restore fails. The restore error is
    /// still reported to the caller.
    pub fn free_restore<T>(
        &mut self,
        target: &mut T,
        area: WorkingArea<U>,
        restore: bool,
    ) -> Result<(), Error<T::Error>>
    where
        T: Target + ?Sized,
        T::Arch: Arch<Usize = U>,
    {
        let index = match self.lookup(area.id) {
            Some(index) => index,
            None => {
                warn!(
                    "ignoring stale working area handle for address {:#x}",
                    area.address
                );
                return Err(Error::StaleHandle);
            }
        };

        let res = if restore {
            self.restore(target, index)
        } else {
            Ok(())
        };

        self.release(index);
        debug!(
            "freed {} bytes of working area at address {:#x}",
            area.size, area.address
        );

        self.merge();
        self.print_layout();

        res
    }

    /// Release every area (restoring backups), and discard the arena.
    ///
    /// The next allocation re-materializes the arena, re-sampling the MMU
    /// state. Every outstanding handle becomes stale.
    pub fn free_all<T>(&mut self, target: &mut T)
    where
        T: Target + ?Sized,
        T::Arch: Arch<Usize = U>,
    {
        self.free_all_restore(target, true);
        self.discard();
    }

    /// Release every area, optionally restoring backups.
    ///
    /// Restore failures are logged, and do not stop the remaining areas from
    /// being released. Every outstanding handle becomes stale.
    pub fn free_all_restore<T>(&mut self, target: &mut T, restore: bool)
    where
        T: Target + ?Sized,
        T::Arch: Arch<Usize = U>,
    {
        for pos in 0..self.order.len() {
            let index = self.order[pos];
            if self.slots[index as usize].node.free {
                continue;
            }
            if restore {
                // already logged
                let _ = self.restore(target, index);
            }
            self.release(index);
        }

        self.merge();
        self.print_layout();
    }

    /// Coalesce adjacent free areas.
    ///
    /// Merged areas lose their backup buffers. Running the pass on an
    /// already coalesced arena changes nothing.
    pub(crate) fn merge(&mut self) {
        let mut pos = 0;
        while pos + 1 < self.order.len() {
            let (a, b) = (self.order[pos] as usize, self.order[pos + 1] as usize);
            if !(self.slots[a].node.free && self.slots[b].node.free) {
                pos += 1;
                continue;
            }

            debug_assert_eq!(
                offset(self.slots[a].node.address, self.slots[a].node.size),
                self.slots[b].node.address
            );

            let size = self.slots[b].node.size;
            let node = &mut self.slots[a].node;
            node.size += size;
            node.backup = None;

            self.order.remove(pos + 1);
            self.vacate(b as u32);
        }
    }

    fn materialize<T>(&mut self, target: &mut T, requested: u32) -> Result<(), Error<T::Error>>
    where
        T: Target + ?Sized,
        T::Arch: Arch<Usize = U>,
    {
        let enabled = match target.support_mmu() {
            Some(ops) => ops.mmu_enabled()?,
            None => false,
        };

        let base = if !enabled {
            match self.config.phys_addr() {
                Some(addr) => {
                    debug!("MMU disabled, using physical address for working memory {:#x}", addr);
                    addr
                }
                None => {
                    error!("No working memory available. Specify a physical working area address.");
                    return Err(Error::ResourceNotAvailable {
                        requested,
                        available: 0,
                    });
                }
            }
        } else {
            match self.config.virt_addr() {
                Some(addr) => {
                    debug!("MMU enabled, using virtual address for working memory {:#x}", addr);
                    addr
                }
                None => {
                    error!("No working memory available. Specify a virtual working area address.");
                    return Err(Error::ResourceNotAvailable {
                        requested,
                        available: 0,
                    });
                }
            }
        };

        let size = self.config.size() & !3;
        let fits = size == 0
            || U::from_u32(size - 1)
                .and_then(|last| base.checked_add(&last))
                .is_some();
        if !fits {
            error!(
                "working area at {:#x} ({} bytes) wraps around the address space",
                base, size
            );
            return Err(Error::ResourceNotAvailable {
                requested,
                available: 0,
            });
        }

        let index = self.insert(Node {
            address: base,
            size,
            free: true,
            backup: None,
        });
        self.order.push(index);

        Ok(())
    }

    fn split(&mut self, pos: usize, size: u32) {
        let index = self.order[pos] as usize;
        let node = &mut self.slots[index].node;
        if node.size <= size {
            return;
        }

        let rest = Node {
            address: offset(node.address, size),
            size: node.size - size,
            free: true,
            backup: None,
        };
        node.size = size;
        node.backup = None;

        let new = self.insert(rest);
        self.order.insert(pos + 1, new);
    }

    fn restore<T>(&mut self, target: &mut T, index: u32) -> Result<(), Error<T::Error>>
    where
        T: Target + ?Sized,
        T::Arch: Arch<Usize = U>,
    {
        if !self.config.backup_enabled() {
            return Ok(());
        }

        let node = &self.slots[index as usize].node;
        if let Some(backup) = &node.backup {
            if let Err(e) = target.write_buffer(node.address, backup) {
                error!(
                    "failed to restore {} bytes of working area at address {:#x}",
                    node.size, node.address
                );
                return Err(e);
            }
        }
        Ok(())
    }

    fn lookup(&self, id: AreaId) -> Option<u32> {
        if id.arena != self.id {
            debug!("working area handle belongs to another target");
            return None;
        }
        let slot = self.slots.get(id.index as usize)?;
        if slot.live && slot.generation == id.generation && !slot.node.free {
            Some(id.index)
        } else {
            None
        }
    }

    // marks the area free, invalidating its handle
    fn release(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.node.free = true;
        slot.generation = slot.generation.wrapping_add(1);
    }

    fn insert(&mut self, node: Node<U>) -> u32 {
        match self.vacant.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.live = true;
                slot.node = node;
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    live: true,
                    node,
                });
                (self.slots.len() - 1) as u32
            }
        }
    }

    fn vacate(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.node.backup = None;
        self.vacant.push(index);
    }

    // slots are kept (and their generations bumped) so old handles stay stale
    fn discard(&mut self) {
        for pos in 0..self.order.len() {
            let index = self.order[pos];
            self.vacate(index);
        }
        self.order.clear();
    }

    fn nodes(&self) -> impl Iterator<Item = &Node<U>> + '_ {
        self.order.iter().map(move |&i| &self.slots[i as usize].node)
    }

    fn print_layout(&self) {
        if !log_enabled!(Level::Debug) {
            return;
        }

        for n in self.nodes() {
            debug!(
                "{}{} {:#010x}-{:#010x} ({} bytes)",
                if n.backup.is_some() { 'b' } else { ' ' },
                if n.free { ' ' } else { '*' },
                n.address,
                offset(n.address, n.size.saturating_sub(1)),
                n.size
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimTarget;

    const BASE: u32 = 0x2000_0000;

    fn arena(size: u32) -> WorkingAreas<u32> {
        WorkingAreas::new(WorkingAreaConfig::new(size).phys(BASE))
    }

    fn check_invariants(areas: &WorkingAreas<u32>) {
        let layout = areas.layout();
        let total: u32 = layout.iter().map(|a| a.size).sum();
        assert_eq!(total, areas.config().size() & !3);
        assert_eq!(layout[0].address, BASE);
        for pair in layout.windows(2) {
            assert_eq!(pair[0].address + pair[0].size, pair[1].address);
            assert!(!(pair[0].free && pair[1].free), "{:?}", layout);
        }
    }

    #[test]
    fn first_fit_and_rounding() {
        let mut target = SimTarget::new();
        let mut areas = arena(0x1000);

        let a = areas.alloc(&mut target, 5).unwrap();
        assert_eq!((a.address(), a.size()), (BASE, 8));
        let b = areas.alloc(&mut target, 0).unwrap();
        assert_eq!((b.address(), b.size()), (BASE + 8, 4));
        let c = areas.alloc(&mut target, 16).unwrap();
        assert_eq!(c.address(), BASE + 12);

        // the hole left by `a` is reused by the next small enough request
        areas.free(&mut target, a).unwrap();
        let d = areas.alloc(&mut target, 8).unwrap();
        assert_eq!(d.address(), BASE);

        // ...but not by a larger one
        let e = areas.alloc(&mut target, 12).unwrap();
        assert_eq!(e.address(), BASE + 28);

        for area in vec![b, c, d, e] {
            areas.free(&mut target, area).unwrap();
        }
        assert_eq!(areas.layout().len(), 1);
        assert_eq!(areas.available(), 0x1000);
    }

    #[test]
    fn exhaustion_reports_largest_block() {
        let mut target = SimTarget::new();
        let mut areas = arena(64);

        let a = areas.alloc(&mut target, 40).unwrap();
        match areas.alloc_try(&mut target, 32) {
            Err(Error::ResourceNotAvailable {
                requested,
                available,
            }) => assert_eq!((requested, available), (32, 24)),
            other => panic!("unexpected result: {:?}", other),
        }
        areas.free(&mut target, a).unwrap();
    }

    #[test]
    fn random_sequences_keep_the_arena_tiled() {
        let mut target = SimTarget::new();
        let mut areas = arena(0x800);
        let mut live = Vec::new();

        // small LCG, so the sequence is reproducible
        let mut seed: u32 = 0x1234_5678;
        let mut next = move || {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            seed >> 16
        };

        for _ in 0..2000 {
            if next() % 3 != 0 || live.is_empty() {
                let size = next() % 200;
                match areas.alloc_try(&mut target, size) {
                    Ok(area) => {
                        assert_eq!(area.size() % 4, 0);
                        assert!(area.size() >= size);
                        live.push(area)
                    }
                    Err(Error::ResourceNotAvailable { available, .. }) => {
                        assert!(available < size.max(1))
                    }
                    Err(e) => panic!("unexpected error: {:?}", e),
                }
            } else {
                let victim = next() as usize % live.len();
                areas.free(&mut target, live.swap_remove(victim)).unwrap();
            }
            check_invariants(&areas);
        }

        for area in live.drain(..) {
            areas.free(&mut target, area).unwrap();
        }
        assert_eq!(areas.layout().len(), 1);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut target = SimTarget::new();
        let mut areas = arena(0x100);

        let a = areas.alloc(&mut target, 16).unwrap();
        let b = areas.alloc(&mut target, 16).unwrap();
        let c = areas.alloc(&mut target, 16).unwrap();
        areas.free(&mut target, b).unwrap();

        let before = areas.layout();
        areas.merge();
        areas.merge();
        assert_eq!(areas.layout(), before);

        areas.free(&mut target, a).unwrap();
        areas.free(&mut target, c).unwrap();
    }

    #[test]
    fn identical_sequences_give_identical_addresses() {
        let run = || {
            let mut target = SimTarget::new();
            let mut areas = arena(0x400);
            let a = areas.alloc(&mut target, 10).unwrap();
            let b = areas.alloc(&mut target, 100).unwrap();
            let addr_a = a.address();
            areas.free(&mut target, a).unwrap();
            let c = areas.alloc(&mut target, 3).unwrap();
            let d = areas.alloc(&mut target, 33).unwrap();
            (addr_a, b.address(), c.address(), d.address())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn backup_is_restored_on_free() {
        let mut target = SimTarget::new();
        target.poke(BASE, &[0xaa; 32]);
        let mut areas = WorkingAreas::new(WorkingAreaConfig::new(0x100).phys(BASE).backup(true));

        let a = areas.alloc(&mut target, 32).unwrap();
        assert!(areas.layout()[0].backup);
        target.write_buffer(a.address(), &[0x55; 32]).unwrap();
        areas.free(&mut target, a).unwrap();
        assert_eq!(target.peek(BASE, 32), &[0xaa; 32][..]);

        // freeing without restore leaves the new contents in place
        let a = areas.alloc(&mut target, 32).unwrap();
        target.write_buffer(a.address(), &[0x55; 32]).unwrap();
        areas.free_restore(&mut target, a, false).unwrap();
        assert_eq!(target.peek(BASE, 32), &[0x55; 32][..]);
    }

    #[test]
    fn failed_restore_still_frees() {
        let mut target = SimTarget::new();
        let mut areas = WorkingAreas::new(WorkingAreaConfig::new(0x100).phys(BASE).backup(true));

        let a = areas.alloc(&mut target, 32).unwrap();
        target.fail_writes(true);
        assert!(matches!(
            areas.free(&mut target, a),
            Err(Error::NonFatal)
        ));
        target.fail_writes(false);

        assert_eq!(areas.layout().len(), 1);
        assert_eq!(areas.available(), 0x100);
    }

    #[test]
    fn failed_backup_returns_block_to_pool() {
        let mut target = SimTarget::new();
        // window sits in unmapped memory, so the backup read fails
        let mut areas =
            WorkingAreas::new(WorkingAreaConfig::new(0x100).phys(0x9000_0000).backup(true));

        assert!(matches!(
            areas.alloc(&mut target, 16),
            Err(Error::NonFatal)
        ));
        assert_eq!(areas.layout().len(), 1);
        assert!(areas.layout()[0].free);
    }

    #[test]
    fn stale_handles_are_rejected() {
        let mut target = SimTarget::new();
        let mut areas = arena(0x100);

        let a = areas.alloc(&mut target, 16).unwrap();
        let forged = WorkingArea {
            id: a.id(),
            address: a.address(),
            size: a.size(),
        };
        areas.free(&mut target, a).unwrap();
        assert!(matches!(
            areas.free(&mut target, forged),
            Err(Error::StaleHandle)
        ));

        // handles outstanding across a free_all are stale too
        let b = areas.alloc(&mut target, 16).unwrap();
        let forged = WorkingArea {
            id: b.id(),
            address: b.address(),
            size: b.size(),
        };
        areas.free_all(&mut target);
        assert!(!areas.is_materialized());
        assert!(matches!(
            areas.free(&mut target, forged),
            Err(Error::StaleHandle)
        ));

        // the slot got reused by the new arena, but with a new generation
        let c = areas.alloc(&mut target, 16).unwrap();
        assert_eq!(c.id().index, b.id().index);
        assert_ne!(c.id(), b.id());
        areas.free(&mut target, c).unwrap();
    }

    #[test]
    fn missing_window_is_reported() {
        let mut target = SimTarget::new();
        let mut areas = WorkingAreas::new(WorkingAreaConfig::new(0x100).virt(BASE));
        // only the MMU state tells whether the window is usable
        assert_eq!(areas.available(), 0x100);
        assert_eq!(areas.available_on(&mut target).unwrap(), 0);
        target.set_mmu(Some(true));
        assert_eq!(areas.available_on(&mut target).unwrap(), 0x100);
        target.set_mmu(None);

        assert!(matches!(
            areas.alloc(&mut target, 16),
            Err(Error::ResourceNotAvailable { available: 0, .. })
        ));
        assert!(!areas.is_materialized());
    }

    #[test]
    fn unconfigured_arena_has_nothing_available() {
        let mut target = SimTarget::new();
        let mut areas = WorkingAreas::<u32>::new(WorkingAreaConfig::new(0x100));
        assert_eq!(areas.available(), 0);
        assert_eq!(areas.available_on(&mut target).unwrap(), 0);
        assert!(matches!(
            areas.alloc(&mut target, 16),
            Err(Error::ResourceNotAvailable { available: 0, .. })
        ));
    }

    #[test]
    fn mmu_state_selects_window() {
        let mut target = SimTarget::new();
        target.set_mmu(Some(true));
        let config = WorkingAreaConfig::new(0x100).phys(BASE).virt(0x2000_1000);
        let mut areas = WorkingAreas::new(config);

        let a = areas.alloc(&mut target, 16).unwrap();
        assert_eq!(a.address(), 0x2000_1000);
        areas.free(&mut target, a).unwrap();

        // the window is only re-sampled after the arena is discarded
        target.set_mmu(Some(false));
        let a = areas.alloc(&mut target, 16).unwrap();
        assert_eq!(a.address(), 0x2000_1000);
        areas.free_all(&mut target);

        let a = areas.alloc(&mut target, 16).unwrap();
        assert_eq!(a.address(), BASE);
        areas.free(&mut target, a).unwrap();
    }

    #[test]
    fn shrinking_allocation() {
        let mut target = SimTarget::new();
        let mut areas = arena(0x3000);

        let a = areas.alloc_shrinking(&mut target, 0x10000, 0x100).unwrap();
        assert_eq!(a.size(), 0x2000);

        assert!(matches!(
            areas.alloc_shrinking(&mut target, 0x10000, 0x2000),
            Err(Error::ResourceNotAvailable { .. })
        ));
        areas.free(&mut target, a).unwrap();
    }

    #[test]
    fn free_all_without_restore() {
        let mut target = SimTarget::new();
        target.poke(BASE, &[0xaa; 8]);
        let mut areas = WorkingAreas::new(WorkingAreaConfig::new(0x100).phys(BASE).backup(true));

        let a = areas.alloc(&mut target, 8).unwrap();
        let _b = areas.alloc(&mut target, 8).unwrap();
        target.write_buffer(a.address(), &[0x11; 8]).unwrap();

        areas.free_all_restore(&mut target, false);
        assert_eq!(target.peek(BASE, 8), &[0x11; 8][..]);
        assert_eq!(areas.layout().len(), 1);
        assert!(areas.is_materialized());
    }
}
