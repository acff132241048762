//! A simulated target, used by the inline tests.
//!
//! Memory is a couple of flat regions (RAM and "flash"). There is no real
//! core: instead, a test installs a [`SimProgram`] at an entry address, and
//! the program is stepped once every time the host polls the target or reads
//! from it while it is running. This is enough to emulate the on-target half
//! of the algorithm and ring buffer protocols.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::arch::{Arch, RegId};
use crate::host::Host;
use crate::target::ext::breakpoints::{Breakpoints, BreakpointsOps};
use crate::target::ext::mmu::{Mmu, MmuOps};
use crate::target::{Endianness, ExecState, ResumeFlags, Target, TargetError, TargetResult};

pub const RAM_BASE: u32 = 0x2000_0000;
pub const RAM_SIZE: u32 = 0x4_0000;
pub const FLASH_BASE: u32 = 0x0800_0000;
pub const FLASH_SIZE: u32 = 0x20_0000;

pub enum SimArch {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimReg {
    R(u8),
    Sp,
    Lr,
    Pc,
    Xpsr,
}

impl SimReg {
    fn idx(self) -> usize {
        match self {
            SimReg::R(n) => n as usize,
            SimReg::Sp => 13,
            SimReg::Lr => 14,
            SimReg::Pc => 15,
            SimReg::Xpsr => 16,
        }
    }
}

impl RegId for SimReg {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sp" => Some(SimReg::Sp),
            "lr" => Some(SimReg::Lr),
            "pc" => Some(SimReg::Pc),
            "xpsr" => Some(SimReg::Xpsr),
            _ => {
                let n: u8 = name.strip_prefix('r')?.parse().ok()?;
                if n <= 12 {
                    Some(SimReg::R(n))
                } else {
                    None
                }
            }
        }
    }
}

/// Registers forced to a value while an algorithm runs.
#[derive(Clone, Debug, Default)]
pub struct SimAlgorithm {
    pub context: Vec<(SimReg, u32)>,
}

impl Arch for SimArch {
    type Usize = u32;
    type RegId = SimReg;
    type BreakpointKind = u8;
    type AlgorithmInfo = SimAlgorithm;

    fn pc_reg() -> SimReg {
        SimReg::Pc
    }

    fn exit_breakpoint_kind(_info: &SimAlgorithm) -> u8 {
        4
    }

    fn check_algorithm(
        image: &crate::algorithm::AlgorithmImage<'_, Self>,
    ) -> Result<(), crate::algorithm::InvalidImage> {
        use crate::algorithm::InvalidImage;

        if image.entry_point() % 4 != 0 {
            return Err(InvalidImage::MisalignedEntryPoint);
        }
        if image.exit_point() % 4 != 0 {
            return Err(InvalidImage::MisalignedExitPoint);
        }
        Ok(())
    }

    fn algorithm_context(info: &SimAlgorithm) -> Vec<(SimReg, u32)> {
        info.context.clone()
    }
}

/// What a [`SimProgram`] did in a single step.
pub enum Step {
    /// Keep running.
    Continue,
    /// Jump to the given address. The core halts there if a breakpoint is
    /// set, and spins forever otherwise.
    Exit(u32),
    /// Halt at the given address (e.g: a breakpoint instruction).
    Halt(u32),
}

pub trait SimProgram {
    fn step(&mut self, core: &mut SimCore) -> Step;
}

/// Memory and registers of the simulated target.
pub struct SimCore {
    regions: Vec<(u32, Vec<u8>)>,
    regs: [u32; 17],
    endianness: Endianness,
}

impl SimCore {
    fn find(&self, addr: u32, len: usize) -> Option<(usize, usize)> {
        self.regions.iter().enumerate().find_map(|(i, (base, mem))| {
            let start = (addr as u64).checked_sub(*base as u64)?;
            if start + len as u64 <= mem.len() as u64 {
                Some((i, start as usize))
            } else {
                None
            }
        })
    }

    pub fn slice(&self, addr: u32, len: usize) -> Option<&[u8]> {
        let (i, start) = self.find(addr, len)?;
        Some(&self.regions[i].1[start..start + len])
    }

    pub fn slice_mut(&mut self, addr: u32, len: usize) -> Option<&mut [u8]> {
        let (i, start) = self.find(addr, len)?;
        Some(&mut self.regions[i].1[start..start + len])
    }

    pub fn read_u32(&self, addr: u32) -> u32 {
        let mut buf = [0; 4];
        buf.copy_from_slice(self.slice(addr, 4).expect("unmapped read"));
        match self.endianness {
            Endianness::Little => u32::from_le_bytes(buf),
            Endianness::Big => u32::from_be_bytes(buf),
        }
    }

    pub fn write_u32(&mut self, addr: u32, val: u32) {
        let buf = match self.endianness {
            Endianness::Little => val.to_le_bytes(),
            Endianness::Big => val.to_be_bytes(),
        };
        self.slice_mut(addr, 4)
            .expect("unmapped write")
            .copy_from_slice(&buf);
    }

    /// Copy `len` bytes between two mapped addresses.
    pub fn copy(&mut self, src: u32, dst: u32, len: usize) {
        let data = self.slice(src, len).expect("unmapped read").to_vec();
        self.slice_mut(dst, len)
            .expect("unmapped write")
            .copy_from_slice(&data);
    }

    pub fn reg(&self, reg: SimReg) -> u32 {
        self.regs[reg.idx()]
    }

    pub fn set_reg(&mut self, reg: SimReg, val: u32) {
        self.regs[reg.idx()] = val
    }
}

pub struct SimTarget {
    core: SimCore,
    state: ExecState,
    programs: Vec<(u32, Box<dyn SimProgram>)>,
    program: Option<Box<dyn SimProgram>>,
    breakpoints: Vec<u32>,
    breakpoints_supported: bool,
    mmu: Option<bool>,
    fail_writes: bool,
    reads: usize,
    writes: usize,
    steps: usize,
    last_resume: Option<(u32, ResumeFlags)>,
}

impl SimTarget {
    pub fn new() -> SimTarget {
        // RUST_LOG=trace to follow the host side of a failing test
        let _ = pretty_env_logger::try_init();

        let mut regs = [0; 17];
        regs[SimReg::Sp.idx()] = RAM_BASE + RAM_SIZE;
        SimTarget {
            core: SimCore {
                regions: vec![
                    (RAM_BASE, vec![0; RAM_SIZE as usize]),
                    (FLASH_BASE, vec![0xff; FLASH_SIZE as usize]),
                ],
                regs,
                endianness: Endianness::Little,
            },
            state: ExecState::Halted,
            programs: Vec::new(),
            program: None,
            breakpoints: Vec::new(),
            breakpoints_supported: true,
            mmu: None,
            fail_writes: false,
            reads: 0,
            writes: 0,
            steps: 0,
            last_resume: None,
        }
    }

    pub fn peek(&self, addr: u32, len: usize) -> &[u8] {
        self.core.slice(addr, len).expect("unmapped peek")
    }

    pub fn poke(&mut self, addr: u32, data: &[u8]) {
        self.core
            .slice_mut(addr, data.len())
            .expect("unmapped poke")
            .copy_from_slice(data)
    }

    pub fn core(&self) -> &SimCore {
        &self.core
    }

    pub fn reg(&self, reg: SimReg) -> u32 {
        self.core.reg(reg)
    }

    pub fn set_reg(&mut self, reg: SimReg, val: u32) {
        self.core.set_reg(reg, val)
    }

    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.core.endianness = endianness
    }

    pub fn set_state(&mut self, state: ExecState) {
        self.state = state
    }

    pub fn set_mmu(&mut self, mmu: Option<bool>) {
        self.mmu = mmu
    }

    pub fn set_breakpoints_supported(&mut self, supported: bool) {
        self.breakpoints_supported = supported
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail
    }

    pub fn read_count(&self) -> usize {
        self.reads
    }

    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn breakpoints(&self) -> &[u32] {
        &self.breakpoints
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn last_resume(&self) -> Option<(u32, ResumeFlags)> {
        self.last_resume
    }

    /// Run `program` the next time the core is resumed at `entry`.
    pub fn load_program(&mut self, entry: u32, program: impl SimProgram + 'static) {
        self.programs.push((entry, Box::new(program)));
    }

    fn running(&self) -> bool {
        matches!(self.state, ExecState::Running | ExecState::DebugRunning)
    }

    fn step(&mut self) {
        if !self.running() {
            return;
        }
        let program = match self.program.as_mut() {
            Some(program) => program,
            None => return,
        };

        self.steps += 1;
        match program.step(&mut self.core) {
            Step::Continue => {}
            Step::Exit(pc) => {
                self.core.set_reg(SimReg::Pc, pc);
                if self.breakpoints.contains(&pc) {
                    self.state = ExecState::Halted;
                    self.program = None;
                } else {
                    self.program = Some(Box::new(Spin));
                }
            }
            Step::Halt(pc) => {
                self.core.set_reg(SimReg::Pc, pc);
                self.state = ExecState::Halted;
                self.program = None;
            }
        }
    }
}

impl Target for SimTarget {
    type Arch = SimArch;
    type Error = &'static str;

    fn endianness(&self) -> Endianness {
        self.core.endianness
    }

    fn read_addrs(&mut self, start_addr: u32, data: &mut [u8]) -> TargetResult<(), Self> {
        self.reads += 1;
        self.step();
        let src = self
            .core
            .slice(start_addr, data.len())
            .ok_or(TargetError::NonFatal)?;
        data.copy_from_slice(src);
        Ok(())
    }

    fn write_addrs(&mut self, start_addr: u32, data: &[u8]) -> TargetResult<(), Self> {
        if self.fail_writes {
            return Err(TargetError::NonFatal);
        }
        let dst = self
            .core
            .slice_mut(start_addr, data.len())
            .ok_or(TargetError::NonFatal)?;
        dst.copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }

    fn read_register(&mut self, reg: SimReg) -> TargetResult<u32, Self> {
        Ok(self.core.reg(reg))
    }

    fn write_register(&mut self, reg: SimReg, val: u32) -> TargetResult<(), Self> {
        if self.fail_writes {
            return Err(TargetError::NonFatal);
        }
        self.core.set_reg(reg, val);
        self.writes += 1;
        Ok(())
    }

    fn halt(&mut self) -> TargetResult<(), Self> {
        self.state = ExecState::Halted;
        self.program = None;
        Ok(())
    }

    fn resume(&mut self, addr: Option<u32>, flags: ResumeFlags) -> TargetResult<(), Self> {
        if self.state != ExecState::Halted {
            return Err(TargetError::Fatal("resumed while not halted"));
        }

        let pc = match addr {
            Some(addr) => {
                self.core.set_reg(SimReg::Pc, addr);
                addr
            }
            None => self.core.reg(SimReg::Pc),
        };

        self.program = match self.programs.iter().position(|(entry, _)| *entry == pc) {
            Some(idx) => Some(self.programs.remove(idx).1),
            None => Some(Box::new(Spin)),
        };
        self.state = if flags.contains(ResumeFlags::DEBUG_EXECUTION) {
            ExecState::DebugRunning
        } else {
            ExecState::Running
        };
        self.last_resume = Some((pc, flags));
        Ok(())
    }

    fn poll(&mut self) -> TargetResult<ExecState, Self> {
        self.step();
        Ok(self.state)
    }

    fn support_breakpoints(&mut self) -> Option<BreakpointsOps<'_, Self>> {
        if self.breakpoints_supported {
            Some(self)
        } else {
            None
        }
    }

    fn support_mmu(&mut self) -> Option<MmuOps<'_, Self>> {
        if self.mmu.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl Breakpoints for SimTarget {
    fn add_breakpoint(&mut self, addr: u32, _kind: u8) -> TargetResult<bool, Self> {
        if self.breakpoints.contains(&addr) {
            return Ok(false);
        }
        self.breakpoints.push(addr);
        Ok(true)
    }

    fn remove_breakpoint(&mut self, addr: u32, _kind: u8) -> TargetResult<bool, Self> {
        match self.breakpoints.iter().position(|bp| *bp == addr) {
            Some(idx) => {
                self.breakpoints.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Mmu for SimTarget {
    fn mmu_enabled(&mut self) -> TargetResult<bool, Self> {
        Ok(self.mmu.unwrap_or(false))
    }
}

/// Never halts.
pub struct Spin;

impl SimProgram for Spin {
    fn step(&mut self, _core: &mut SimCore) -> Step {
        Step::Continue
    }
}

/// Halts at `pc` after `delay` steps.
pub struct Halter {
    pub pc: u32,
    pub delay: usize,
}

impl SimProgram for Halter {
    fn step(&mut self, _core: &mut SimCore) -> Step {
        if self.delay == 0 {
            return Step::Halt(self.pc);
        }
        self.delay -= 1;
        Step::Continue
    }
}

/// Sums the `r1` bytes at `r0` into `r2`, stores the sum at `r3`, scribbles
/// over `r0`, then exits.
pub struct Adder {
    pub exit: u32,
}

impl SimProgram for Adder {
    fn step(&mut self, core: &mut SimCore) -> Step {
        let (addr, len) = (core.reg(SimReg::R(0)), core.reg(SimReg::R(1)));
        let sum = core
            .slice(addr, len as usize)
            .expect("unmapped input")
            .iter()
            .map(|b| *b as u32)
            .sum();
        core.set_reg(SimReg::R(2), sum);
        core.write_u32(core.reg(SimReg::R(3)), sum);
        core.set_reg(SimReg::R(0), 0xdead_beef);
        Step::Exit(self.exit)
    }
}

/// Geometry of a ring buffer, as seen by the on-target programs.
#[derive(Clone, Copy, Debug)]
pub struct SimRing {
    pub start: u32,
    pub size: u32,
    pub block_size: u32,
}

impl SimRing {
    fn wp_addr(&self) -> u32 {
        self.start
    }

    fn rp_addr(&self) -> u32 {
        self.start + 4
    }

    fn fifo_start(&self) -> u32 {
        self.start + 8
    }

    fn fifo_end(&self) -> u32 {
        self.start + self.size
    }
}

/// Drains a ring buffer into `dest`, `rate` bytes per step at most, like a
/// flash loader.
///
/// Aborts (by zeroing the read pointer) once `abort_after` bytes have been
/// consumed, even if that is all of them. Exits once `total` bytes have been
/// consumed, or once the host zeroes the write pointer.
pub struct RingConsumer {
    pub ring: SimRing,
    pub dest: u32,
    pub total: u32,
    pub rate: u32,
    pub exit: u32,
    pub abort_after: Option<u32>,
    pub consumed: u32,
}

impl SimProgram for RingConsumer {
    fn step(&mut self, core: &mut SimCore) -> Step {
        let ring = self.ring;
        let wp = core.read_u32(ring.wp_addr());
        let rp = core.read_u32(ring.rp_addr());

        if wp == 0 {
            return Step::Exit(self.exit);
        }
        if let Some(limit) = self.abort_after {
            if self.consumed >= limit {
                core.write_u32(ring.rp_addr(), 0);
                return Step::Exit(self.exit);
            }
        }
        if self.consumed == self.total {
            return Step::Exit(self.exit);
        }
        if wp == rp {
            return Step::Continue;
        }

        let avail = if wp > rp { wp - rp } else { ring.fifo_end() - rp };
        let remaining = self.total - self.consumed;
        let mut take = avail.min(self.rate).min(remaining);
        // whole blocks only, except for the last one and the fifo's tail
        if take < remaining && rp + take < ring.fifo_end() {
            take -= take % ring.block_size;
        }
        if take == 0 {
            return Step::Continue;
        }

        core.copy(rp, self.dest + self.consumed, take as usize);
        self.consumed += take;

        let mut rp = rp + take;
        if rp >= ring.fifo_end() {
            rp = ring.fifo_start();
        }
        core.write_u32(ring.rp_addr(), rp);
        Step::Continue
    }
}

/// Fills a ring buffer from `src`, `rate` bytes per step at most.
///
/// The write pointer is only ever published on a block boundary: pieces are
/// cut down to whole blocks, except for the fifo's tail (which wraps the
/// pointer) and the last piece (which is padded up to the next block).
///
/// Aborts (by zeroing the write pointer) once `abort_after` bytes have been
/// produced. Exits once `total` bytes have been produced, or once the host
/// zeroes the read pointer.
pub struct RingProducer {
    pub ring: SimRing,
    pub src: u32,
    pub total: u32,
    pub rate: u32,
    pub exit: u32,
    pub abort_after: Option<u32>,
    pub produced: u32,
}

impl SimProgram for RingProducer {
    fn step(&mut self, core: &mut SimCore) -> Step {
        let ring = self.ring;
        let wp = core.read_u32(ring.wp_addr());
        let rp = core.read_u32(ring.rp_addr());

        if rp == 0 {
            return Step::Exit(self.exit);
        }
        if let Some(limit) = self.abort_after {
            if self.produced >= limit {
                core.write_u32(ring.wp_addr(), 0);
                return Step::Exit(self.exit);
            }
        }
        if self.produced == self.total {
            return Step::Exit(self.exit);
        }

        let bs = ring.block_size;
        let free = if rp > wp {
            (rp - wp).saturating_sub(bs)
        } else if rp > ring.fifo_start() {
            ring.fifo_end() - wp
        } else {
            (ring.fifo_end() - wp).saturating_sub(bs)
        };
        let remaining = self.total - self.produced;
        let mut take = free.min(self.rate).min(remaining);

        let offset = wp + take - ring.fifo_start();
        let next = if wp + take >= ring.fifo_end() {
            ring.fifo_start()
        } else if take == remaining {
            let padded = ring.fifo_start() + (offset + bs - 1) / bs * bs;
            if padded >= ring.fifo_end() {
                ring.fifo_start()
            } else {
                padded
            }
        } else {
            let next = ring.fifo_start() + offset - offset % bs;
            take = next - wp;
            next
        };
        if take == 0 {
            return Step::Continue;
        }

        core.copy(self.src + self.produced, wp, take as usize);
        self.produced += take;
        core.write_u32(ring.wp_addr(), next);
        Step::Continue
    }
}

/// Publishes a bogus pointer at `ptr_addr`, then waits for the host to give
/// up by zeroing its own pointer at `host_addr`.
pub struct Corrupter {
    pub ptr_addr: u32,
    pub bad_ptr: u32,
    pub host_addr: u32,
    pub exit: u32,
}

impl SimProgram for Corrupter {
    fn step(&mut self, core: &mut SimCore) -> Step {
        if core.read_u32(self.host_addr) == 0 {
            return Step::Exit(self.exit);
        }
        core.write_u32(self.ptr_addr, self.bad_ptr);
        Step::Continue
    }
}

/// A [`Host`] with a manual clock: time only advances while sleeping.
#[derive(Debug, Default)]
pub struct ManualHost {
    pub now: u64,
    pub sleeps: u32,
    pub keep_alives: u32,
    pub shutdown_after: Option<u32>,
}

impl ManualHost {
    pub fn new() -> ManualHost {
        ManualHost::default()
    }
}

impl Host for ManualHost {
    fn now_ms(&mut self) -> u64 {
        self.now
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.now += ms as u64;
        self.sleeps += 1;
    }

    fn keep_alive(&mut self) {
        self.keep_alives += 1;
    }

    fn shutdown_pending(&self) -> bool {
        self.shutdown_after.map_or(false, |n| self.sleeps >= n)
    }
}
