use algostub::target::ExecState;
use log::*;

pub const RAM_BASE: u32 = 0x2000_0000;
pub const RAM_SIZE: u32 = 0x5000;
pub const FLASH_BASE: u32 = 0x0800_0000;
pub const FLASH_SIZE: u32 = 0x2_0000;
pub const FLASH_REGS: u32 = 0x4002_2000;

/// `bkpt #0xab`. Code starting with this trap is serviced by the emulator
/// itself, using the service number stored in the following word.
const HLE_TRAP: [u8; 2] = [0xab, 0xbe];
const SVC_FLASH_WRITE: u32 = 1;

/// Flash status register bits reported in `r0`.
pub const FLASH_SR_PGERR: u32 = 1 << 2;

/// Halfwords programmed per poll.
const FLASH_BURST: u32 = 64;

/// A flash loader stub: the HLE trap, the service number, and the exit point
/// (`bkpt #0`) at offset 8.
pub const FLASH_WRITE_STUB: [u8; 12] = [
    0xab, 0xbe, 0x00, 0xbf, // bkpt #0xab; nop
    0x01, 0x00, 0x00, 0x00, // SVC_FLASH_WRITE
    0x00, 0xbe, 0x00, 0xbf, // bkpt #0; nop
];
pub const FLASH_WRITE_EXIT: u32 = 8;

/// Emulated STM32F1-style flash loader.
///
/// r0: flash controller base (in), status (out)
/// r1: number of halfwords to program
/// r2: ring buffer start (wp, rp, then the fifo)
/// r3: ring buffer end
/// r4: flash address
pub(crate) struct FlashWriter {
    count: u32,
    ring: u32,
    end: u32,
    dest: u32,
    exit: u32,
}

enum Service {
    Continue,
    Exit { status: u32 },
}

/// Barebones Cortex-M emulator. Only the flash loader is actually executed,
/// any other code just spins.
pub struct Emu {
    pub(crate) r: [u32; 13],
    pub(crate) sp: u32,
    pub(crate) lr: u32,
    pub(crate) pc: u32,
    pub(crate) xpsr: u32,
    pub(crate) msp: u32,
    pub(crate) psp: u32,
    pub(crate) control: u32,

    pub(crate) ram: Vec<u8>,
    pub(crate) flash: Vec<u8>,

    pub(crate) state: ExecState,
    pub(crate) breakpoints: Vec<u32>,
    pub(crate) service: Option<FlashWriter>,
}

impl Emu {
    pub fn new() -> Emu {
        Emu {
            r: [0; 13],
            sp: RAM_BASE + RAM_SIZE,
            lr: 0xffff_ffff,
            pc: FLASH_BASE,
            xpsr: 0x0100_0000,
            msp: RAM_BASE + RAM_SIZE,
            psp: 0,
            control: 0,

            ram: vec![0; RAM_SIZE as usize],
            flash: vec![0xff; FLASH_SIZE as usize],

            state: ExecState::Halted,
            breakpoints: Vec::new(),
            service: None,
        }
    }

    fn region(&self, addr: u32, len: usize) -> Option<(&[u8], usize)> {
        let end = addr.checked_add(len as u32)?;
        if addr >= RAM_BASE && end <= RAM_BASE + RAM_SIZE {
            Some((&self.ram[..], (addr - RAM_BASE) as usize))
        } else if addr >= FLASH_BASE && end <= FLASH_BASE + FLASH_SIZE {
            Some((&self.flash[..], (addr - FLASH_BASE) as usize))
        } else {
            None
        }
    }

    pub(crate) fn read(&self, addr: u32, buf: &mut [u8]) -> bool {
        match self.region(addr, buf.len()) {
            Some((mem, offset)) => {
                buf.copy_from_slice(&mem[offset..offset + buf.len()]);
                true
            }
            None => false,
        }
    }

    /// Only RAM is writable over the debug link.
    pub(crate) fn write_ram(&mut self, addr: u32, data: &[u8]) -> bool {
        let end = match addr.checked_add(data.len() as u32) {
            Some(end) => end,
            None => return false,
        };
        if addr < RAM_BASE || end > RAM_BASE + RAM_SIZE {
            return false;
        }
        let offset = (addr - RAM_BASE) as usize;
        self.ram[offset..offset + data.len()].copy_from_slice(data);
        true
    }

    fn ram_u32(&self, addr: u32) -> Option<u32> {
        let mut buf = [0; 4];
        if self.read(addr, &mut buf) {
            Some(u32::from_le_bytes(buf))
        } else {
            None
        }
    }

    fn set_ram_u32(&mut self, addr: u32, val: u32) -> bool {
        self.write_ram(addr, &val.to_le_bytes())
    }

    /// Run the core for a while. Returns `true` once it halted.
    pub fn step(&mut self) -> bool {
        if self.state != ExecState::Running {
            return self.state == ExecState::Halted;
        }

        if self.service.is_none() {
            self.service = self.trap();
        }

        if let Some(mut svc) = self.service.take() {
            match self.flash_write(&mut svc) {
                Service::Continue => self.service = Some(svc),
                Service::Exit { status } => {
                    debug!("flash loader exited with status {:#x}", status);
                    self.r[0] = status;
                    self.pc = svc.exit;
                }
            }
        }

        if self.breakpoints.contains(&self.pc) {
            self.state = ExecState::Halted;
            return true;
        }

        false
    }

    fn trap(&mut self) -> Option<FlashWriter> {
        let mut code = [0; 8];
        if !self.read(self.pc, &mut code) || code[..2] != HLE_TRAP {
            return None;
        }

        let svc = u32::from_le_bytes([code[4], code[5], code[6], code[7]]);
        if svc != SVC_FLASH_WRITE {
            warn!("unknown HLE service {} at {:#010x}", svc, self.pc);
            return None;
        }

        Some(FlashWriter {
            count: self.r[1],
            ring: self.r[2],
            end: self.r[3],
            dest: self.r[4],
            exit: self.pc + FLASH_WRITE_EXIT,
        })
    }

    fn flash_write(&mut self, st: &mut FlashWriter) -> Service {
        let fifo = st.ring + 8;

        for _ in 0..FLASH_BURST {
            if st.count == 0 {
                return Service::Exit { status: 0 };
            }

            let (wp, rp) = match (self.ram_u32(st.ring), self.ram_u32(st.ring + 4)) {
                (Some(wp), Some(rp)) => (wp, rp),
                _ => return Service::Exit { status: FLASH_SR_PGERR },
            };
            // host aborted
            if wp == 0 {
                return Service::Exit { status: 0 };
            }
            if wp == rp {
                break;
            }

            let mut half = [0; 2];
            if !self.read(rp, &mut half) {
                return Service::Exit { status: FLASH_SR_PGERR };
            }

            let offset = st.dest.wrapping_sub(FLASH_BASE) as usize;
            let erased = self
                .flash
                .get(offset..offset + 2)
                .map_or(false, |cell| cell.iter().all(|&b| b == 0xff));
            if !erased {
                error!("programming a non-erased halfword at {:#010x}", st.dest);
                self.set_ram_u32(st.ring + 4, 0);
                return Service::Exit { status: FLASH_SR_PGERR };
            }
            self.flash[offset..offset + 2].copy_from_slice(&half);

            st.dest += 2;
            st.count -= 1;
            let mut next = rp + 2;
            if next >= st.end {
                next = fifo;
            }
            self.set_ram_u32(st.ring + 4, next);
        }

        self.r[1] = st.count;
        self.r[4] = st.dest;
        Service::Continue
    }
}
