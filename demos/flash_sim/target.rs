use algostub::target::ext::breakpoints::{Breakpoints, BreakpointsOps};
use algostub::target::{ExecState, ResumeFlags, Target, TargetError, TargetResult};
use algostub_arch::arm::{ArmBreakpointKind, ArmCoreRegId, CortexM};
use log::*;

use crate::emu::Emu;

impl Target for Emu {
    type Arch = CortexM;
    type Error = &'static str;

    fn read_addrs(&mut self, start_addr: u32, data: &mut [u8]) -> TargetResult<(), Self> {
        if self.state == ExecState::Running {
            // the loader keeps going while the host reads its pointers
            self.step();
        }
        if !self.read(start_addr, data) {
            return Err(TargetError::NonFatal);
        }
        Ok(())
    }

    fn write_addrs(&mut self, start_addr: u32, data: &[u8]) -> TargetResult<(), Self> {
        if !self.write_ram(start_addr, data) {
            return Err(TargetError::NonFatal);
        }
        Ok(())
    }

    fn read_register(&mut self, reg: ArmCoreRegId) -> TargetResult<u32, Self> {
        let val = match reg {
            ArmCoreRegId::Gpr(i) => self.r[i as usize],
            ArmCoreRegId::Sp => self.sp,
            ArmCoreRegId::Lr => self.lr,
            ArmCoreRegId::Pc => self.pc,
            ArmCoreRegId::Xpsr => self.xpsr,
            ArmCoreRegId::Msp => self.msp,
            ArmCoreRegId::Psp => self.psp,
            ArmCoreRegId::Control => self.control,
            _ => return Err(TargetError::NonFatal),
        };
        Ok(val)
    }

    fn write_register(&mut self, reg: ArmCoreRegId, val: u32) -> TargetResult<(), Self> {
        match reg {
            ArmCoreRegId::Gpr(i) => self.r[i as usize] = val,
            ArmCoreRegId::Sp => self.sp = val,
            ArmCoreRegId::Lr => self.lr = val,
            ArmCoreRegId::Pc => self.pc = val,
            ArmCoreRegId::Xpsr => self.xpsr = val,
            ArmCoreRegId::Msp => self.msp = val,
            ArmCoreRegId::Psp => self.psp = val,
            ArmCoreRegId::Control => self.control = val,
            _ => return Err(TargetError::NonFatal),
        }
        Ok(())
    }

    fn halt(&mut self) -> TargetResult<(), Self> {
        self.state = ExecState::Halted;
        Ok(())
    }

    fn resume(&mut self, addr: Option<u32>, flags: ResumeFlags) -> TargetResult<(), Self> {
        if self.xpsr & 0x0100_0000 == 0 {
            // no Thumb bit: the core would take a usage fault
            return Err(TargetError::Fatal("resumed with xPSR.T clear"));
        }
        if let Some(addr) = addr {
            self.pc = addr;
            self.service = None;
        }
        trace!("resume at {:#010x} ({:?})", self.pc, flags);
        self.state = ExecState::Running;
        Ok(())
    }

    fn poll(&mut self) -> TargetResult<ExecState, Self> {
        self.step();
        Ok(self.state)
    }

    #[inline(always)]
    fn support_breakpoints(&mut self) -> Option<BreakpointsOps<'_, Self>> {
        Some(self)
    }
}

impl Breakpoints for Emu {
    fn add_breakpoint(&mut self, addr: u32, kind: ArmBreakpointKind) -> TargetResult<bool, Self> {
        if kind != ArmBreakpointKind::Thumb16 {
            return Ok(false);
        }
        self.breakpoints.push(addr);
        Ok(true)
    }

    fn remove_breakpoint(
        &mut self,
        addr: u32,
        _kind: ArmBreakpointKind,
    ) -> TargetResult<bool, Self> {
        match self.breakpoints.iter().position(|x| *x == addr) {
            None => return Ok(false),
            Some(pos) => self.breakpoints.remove(pos),
        };

        Ok(true)
    }
}
