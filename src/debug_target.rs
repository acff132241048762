use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::arch::Arch;
use crate::error::Error;
use crate::target::Target;
use crate::working_area::{AreaInfo, WorkingArea, WorkingAreaConfig, WorkingAreas};

type Usize<T> = <<T as Target>::Arch as Arch>::Usize;

/// A [`Target`], along with the host-side state this crate keeps for it: its
/// working area arena, and the guard which keeps algorithms from nesting.
///
/// Everything which mutates that state goes through `&mut DebugTarget`, which
/// serializes allocations and algorithm runs on a single control thread.
pub struct DebugTarget<T: Target> {
    name: String,
    target: T,
    working_areas: WorkingAreas<Usize<T>>,
    running_algorithm: bool,
}

impl<T: Target> DebugTarget<T> {
    /// Wrap `target`, using `config` to place its working areas.
    pub fn new(name: impl Into<String>, target: T, config: WorkingAreaConfig<Usize<T>>) -> Self {
        DebugTarget {
            name: name.into(),
            target,
            working_areas: WorkingAreas::new(config),
            running_algorithm: false,
        }
    }

    /// The target's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the underlying target.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Mutably borrow the underlying target.
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Unwrap the underlying target, dropping all host-side state.
    pub fn into_inner(self) -> T {
        self.target
    }

    /// Returns `true` while an algorithm is running (or was left running by
    /// a timeout) on the target.
    pub fn running_algorithm(&self) -> bool {
        self.running_algorithm
    }

    pub(crate) fn set_running_algorithm(&mut self, running: bool) {
        self.running_algorithm = running
    }

    /// The current working area configuration.
    pub fn working_area_config(&self) -> &WorkingAreaConfig<Usize<T>> {
        self.working_areas.config()
    }

    /// Move or resize the working area window.
    ///
    /// Every outstanding area is released (restoring backups) and the arena
    /// is discarded. The new window takes effect on the next allocation.
    pub fn set_working_area_config(&mut self, config: WorkingAreaConfig<Usize<T>>) {
        self.working_areas.free_all(&mut self.target);
        self.working_areas.set_config(config);
    }

    /// See [`WorkingAreas::alloc`].
    pub fn alloc_working_area(
        &mut self,
        size: u32,
    ) -> Result<WorkingArea<Usize<T>>, Error<T::Error>> {
        self.working_areas.alloc(&mut self.target, size)
    }

    /// See [`WorkingAreas::alloc_try`].
    pub fn alloc_working_area_try(
        &mut self,
        size: u32,
    ) -> Result<WorkingArea<Usize<T>>, Error<T::Error>> {
        self.working_areas.alloc_try(&mut self.target, size)
    }

    /// See [`WorkingAreas::alloc_shrinking`].
    pub fn alloc_working_area_shrinking(
        &mut self,
        preferred: u32,
        min: u32,
    ) -> Result<WorkingArea<Usize<T>>, Error<T::Error>> {
        self.working_areas
            .alloc_shrinking(&mut self.target, preferred, min)
    }

    /// See [`WorkingAreas::free`].
    pub fn free_working_area(
        &mut self,
        area: WorkingArea<Usize<T>>,
    ) -> Result<(), Error<T::Error>> {
        self.working_areas.free(&mut self.target, area)
    }

    /// See [`WorkingAreas::free_restore`].
    pub fn free_working_area_restore(
        &mut self,
        area: WorkingArea<Usize<T>>,
        restore: bool,
    ) -> Result<(), Error<T::Error>> {
        self.working_areas
            .free_restore(&mut self.target, area, restore)
    }

    /// See [`WorkingAreas::free_all`].
    pub fn free_all_working_areas(&mut self) {
        self.working_areas.free_all(&mut self.target)
    }

    /// See [`WorkingAreas::free_all_restore`].
    pub fn free_all_working_areas_restore(&mut self, restore: bool) {
        self.working_areas
            .free_all_restore(&mut self.target, restore)
    }

    /// See [`WorkingAreas::available_on`].
    pub fn working_area_available(&mut self) -> Result<u32, Error<T::Error>> {
        self.working_areas.available_on(&mut self.target)
    }

    /// See [`WorkingAreas::layout`].
    pub fn working_area_layout(&self) -> Vec<AreaInfo<Usize<T>>> {
        self.working_areas.layout()
    }
}

impl<T> fmt::Debug for DebugTarget<T>
where
    T: Target + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugTarget")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("working_areas", &self.working_areas)
            .field("running_algorithm", &self.running_algorithm)
            .finish()
    }
}
