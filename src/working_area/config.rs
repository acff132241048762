/// Where (and how much) target memory may be used as working area.
///
/// Built in the usual builder style:
///
/// ```rust
/// use algostub::working_area::WorkingAreaConfig;
///
/// let config = WorkingAreaConfig::new(0x4000)
///     .phys(0x2000_0000u32)
///     .backup(true);
/// assert_eq!(config.size(), 0x4000);
/// ```
///
/// Which address is used depends on the state of the target's MMU when the
/// arena is first materialized: the physical address while the MMU is
/// disabled (or unsupported), the virtual address while it is enabled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkingAreaConfig<U> {
    phys: Option<U>,
    virt: Option<U>,
    size: u32,
    backup: bool,
}

impl<U: Copy> WorkingAreaConfig<U> {
    /// Create a new config spanning `size` bytes, with no addresses set.
    ///
    /// The size is rounded down to a multiple of 4 once the arena is created.
    pub fn new(size: u32) -> Self {
        WorkingAreaConfig {
            phys: None,
            virt: None,
            size,
            backup: false,
        }
    }

    /// Working area address used while the MMU is disabled.
    pub fn phys(mut self, addr: U) -> Self {
        self.phys = Some(addr);
        self
    }

    /// Working area address used while the MMU is enabled.
    pub fn virt(mut self, addr: U) -> Self {
        self.virt = Some(addr);
        self
    }

    /// Save the previous contents of each allocated area, and write them back
    /// when the area is released. Defaults to `false`.
    pub fn backup(mut self, enabled: bool) -> Self {
        self.backup = enabled;
        self
    }

    /// The configured physical address, if any.
    pub fn phys_addr(&self) -> Option<U> {
        self.phys
    }

    /// The configured virtual address, if any.
    pub fn virt_addr(&self) -> Option<U> {
        self.virt
    }

    /// The address used for the given MMU state, if one is configured.
    pub(crate) fn window(&self, mmu_enabled: bool) -> Option<U> {
        if mmu_enabled {
            self.virt
        } else {
            self.phys
        }
    }

    /// The configured size, in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Whether area contents are backed up and restored.
    pub fn backup_enabled(&self) -> bool {
        self.backup
    }
}

impl<U: Copy> Default for WorkingAreaConfig<U> {
    fn default() -> Self {
        WorkingAreaConfig::new(0)
    }
}
