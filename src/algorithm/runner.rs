use alloc::vec::Vec;

use log::*;
use num_traits::{ToPrimitive, Zero};

use crate::arch::{Arch, RegId};
use crate::debug_target::DebugTarget;
use crate::error::Error;
use crate::host::Host;
use crate::target::{ExecState, ResumeFlags, Target, TargetMem};

use super::{AlgorithmImage, InvalidImage};

/// Interval at which `wait` polls the target.
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 1;

/// Lifecycle of an [`AlgorithmRunner`].
///
/// A runner comes into being `Loaded` (there is no separate idle state: an
/// image which fails validation never yields a runner).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlgorithmState {
    /// Validated, not yet started.
    Loaded,
    /// Running on the target.
    Started,
    /// Halted at the exit point. Output parameters hold the results.
    Completed,
    /// Did not halt before the last deadline. May still be waited on, or
    /// abandoned.
    TimedOut,
    /// Stopped without completing (unexpected halt, or abandoned).
    Aborted,
}

/// Executes an [`AlgorithmImage`] on a target.
///
/// Execution is either synchronous ([`run`](Self::run)), or split into
/// [`start`](Self::start) and [`wait`](Self::wait) so the caller can interact
/// with the running algorithm in between (which is what the streaming engine
/// does).
///
/// Every register the runner touches is saved before the algorithm starts,
/// and restored once it halts.
pub struct AlgorithmRunner<'a, A: Arch> {
    image: AlgorithmImage<'a, A>,
    regs: Vec<A::RegId>,
    saved: Vec<(A::RegId, A::Usize)>,
    breakpoint: Option<A::Usize>,
    state: AlgorithmState,
    poll_interval_ms: u32,
}

impl<'a, A: Arch> AlgorithmRunner<'a, A> {
    /// Validate `image`, and prepare it for execution.
    pub fn new(image: AlgorithmImage<'a, A>) -> Result<Self, InvalidImage> {
        if image.timeout() == 0 {
            return Err(InvalidImage::ZeroTimeout);
        }

        let regs = image
            .reg_params()
            .iter()
            .map(|p| {
                A::RegId::from_name(p.name())
                    .ok_or_else(|| InvalidImage::UnknownRegister(p.name().into()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        A::check_algorithm(&image)?;

        Ok(AlgorithmRunner {
            image,
            regs,
            saved: Vec::new(),
            breakpoint: None,
            state: AlgorithmState::Loaded,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        })
    }

    /// Set the interval at which `wait` polls the target.
    pub fn poll_interval_ms(mut self, ms: u32) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// The runner's current state.
    pub fn state(&self) -> AlgorithmState {
        self.state
    }

    /// The image being run. Output parameters are valid once the runner is
    /// `Completed`.
    pub fn image(&self) -> &AlgorithmImage<'a, A> {
        &self.image
    }

    /// Consume the runner, returning the image.
    pub fn into_image(self) -> AlgorithmImage<'a, A> {
        self.image
    }

    /// Run the algorithm to completion, waiting for at most the image's
    /// timeout.
    pub fn run<T, H>(&mut self, dt: &mut DebugTarget<T>, host: &mut H) -> Result<(), Error<T::Error>>
    where
        T: Target<Arch = A>,
        H: Host,
    {
        self.start(dt)?;
        let timeout_ms = self.image.timeout();
        self.wait(dt, host, timeout_ms)
    }

    /// Load the parameters and start the algorithm.
    ///
    /// The target must be halted, and must not be running another algorithm.
    pub fn start<T>(&mut self, dt: &mut DebugTarget<T>) -> Result<(), Error<T::Error>>
    where
        T: Target<Arch = A>,
    {
        if dt.running_algorithm() {
            error!("target is already running an algorithm");
            return Err(Error::AlreadyRunning);
        }
        if matches!(self.state, AlgorithmState::Started | AlgorithmState::TimedOut) {
            return Err(Error::AlreadyRunning);
        }

        let target = dt.target_mut();
        if target.poll()? != ExecState::Halted {
            warn!("target not halted");
            return Err(Error::NotHalted);
        }

        if let Err(e) = self.load(target) {
            // best effort: leave the core the way we found it
            let _ = self.remove_breakpoint(target);
            let _ = self.restore_context(target);
            return Err(e);
        }

        debug!(
            "starting algorithm at {:#x} (exit point {:#x})",
            self.image.entry_point(),
            self.image.exit_point()
        );
        if let Err(e) = target.resume(
            Some(self.image.entry_point()),
            ResumeFlags::HANDLE_BREAKPOINTS | ResumeFlags::DEBUG_EXECUTION,
        ) {
            let _ = self.remove_breakpoint(target);
            let _ = self.restore_context(target);
            return Err(e.into());
        }

        dt.set_running_algorithm(true);
        self.state = AlgorithmState::Started;
        Ok(())
    }

    /// Wait up to `timeout_ms` for the algorithm to halt, then collect its
    /// results.
    ///
    /// On [`Error::TimedOut`] the algorithm is left running, and the target
    /// stays marked as busy: the caller may wait again, or
    /// [`abandon`](Self::abandon) the algorithm.
    pub fn wait<T, H>(
        &mut self,
        dt: &mut DebugTarget<T>,
        host: &mut H,
        timeout_ms: u32,
    ) -> Result<(), Error<T::Error>>
    where
        T: Target<Arch = A>,
        H: Host,
    {
        if !matches!(self.state, AlgorithmState::Started | AlgorithmState::TimedOut) {
            return Err(Error::NotRunning);
        }

        let deadline = host.now_ms().saturating_add(timeout_ms as u64);
        loop {
            if dt.target_mut().poll()? == ExecState::Halted {
                break;
            }

            if host.now_ms() >= deadline {
                error!("timed out while waiting for target halted");
                self.state = AlgorithmState::TimedOut;
                return Err(Error::TimedOut);
            }

            host.sleep_ms(self.poll_interval_ms);
            host.keep_alive();
            if host.shutdown_pending() {
                return Err(Error::Interrupted);
            }
        }

        let target = dt.target_mut();
        let res = self.collect(target);
        let restored = self.restore_context(target);
        dt.set_running_algorithm(false);

        match res.and(restored) {
            Ok(()) => {
                self.state = AlgorithmState::Completed;
                Ok(())
            }
            Err(e) => {
                self.state = AlgorithmState::Aborted;
                Err(e)
            }
        }
    }

    /// Give up on a started (or timed out) algorithm.
    ///
    /// Requests a halt, removes the exit breakpoint and restores the saved
    /// registers (all best effort), then releases the target. Nothing is
    /// re-run: the target's state is undefined until it is reset.
    pub fn abandon<T>(&mut self, dt: &mut DebugTarget<T>) -> Result<(), Error<T::Error>>
    where
        T: Target<Arch = A>,
    {
        if !matches!(self.state, AlgorithmState::Started | AlgorithmState::TimedOut) {
            return Err(Error::NotRunning);
        }

        warn!("abandoning algorithm at {:#x}", self.image.entry_point());

        let target = dt.target_mut();
        let mut res = target.halt().map_err(Error::from);
        res = res.and(self.remove_breakpoint(target));
        if let Ok(ExecState::Halted) = target.poll() {
            res = res.and(self.restore_context(target));
        } else {
            self.saved.clear();
        }

        dt.set_running_algorithm(false);
        self.state = AlgorithmState::Aborted;
        res
    }

    fn load<T>(&mut self, target: &mut T) -> Result<(), Error<T::Error>>
    where
        T: Target<Arch = A>,
    {
        let context = A::algorithm_context(self.image.info());

        // save everything we're about to clobber (pc included)
        self.saved.clear();
        let touched = core::iter::once(A::pc_reg())
            .chain(self.regs.iter().copied())
            .chain(context.iter().map(|(reg, _)| *reg));
        for reg in touched {
            if self.saved.iter().any(|(r, _)| *r == reg) {
                continue;
            }
            let val = target.read_register(reg)?;
            self.saved.push((reg, val));
        }

        let (mem_params, reg_params) = self.image.params_mut();
        for p in mem_params.iter().filter(|p| p.direction().is_input()) {
            target.write_buffer(p.address(), p.data())?;
        }
        for (p, reg) in reg_params.iter().zip(&self.regs) {
            if p.direction().is_input() {
                target.write_register(*reg, p.value())?;
            }
        }
        for (reg, val) in context {
            target.write_register(reg, val)?;
        }

        let exit = self.image.exit_point();
        if !exit.is_zero() {
            let kind = A::exit_breakpoint_kind(self.image.info());
            let ops = match target.support_breakpoints() {
                Some(ops) => ops,
                None => return Err(Error::Unsupported("breakpoints")),
            };
            if !ops.add_breakpoint(exit, kind)? {
                error!("could not set breakpoint at exit point {:#x}", exit);
                return Err(Error::Unsupported("breakpoints"));
            }
            self.breakpoint = Some(exit);
        }

        Ok(())
    }

    fn collect<T>(&mut self, target: &mut T) -> Result<(), Error<T::Error>>
    where
        T: Target<Arch = A>,
    {
        self.remove_breakpoint(target)?;

        let exit = self.image.exit_point();
        let pc = target.read_register(A::pc_reg())?;
        if !exit.is_zero() && pc != exit {
            error!(
                "algorithm halted at {:#x}, expected exit point {:#x}",
                pc, exit
            );
            return Err(Error::UnexpectedExit {
                pc: pc.to_u64().unwrap_or(u64::MAX),
            });
        }

        let (mem_params, reg_params) = self.image.params_mut();
        for p in mem_params.iter_mut().filter(|p| p.direction().is_output()) {
            let addr = p.address();
            target.read_buffer(addr, p.data_mut())?;
        }
        for (p, reg) in reg_params.iter_mut().zip(&self.regs) {
            if p.direction().is_output() {
                p.set_value(target.read_register(*reg)?);
            }
        }

        Ok(())
    }

    fn remove_breakpoint<T>(&mut self, target: &mut T) -> Result<(), Error<T::Error>>
    where
        T: Target<Arch = A>,
    {
        let addr = match self.breakpoint.take() {
            Some(addr) => addr,
            None => return Ok(()),
        };

        let kind = A::exit_breakpoint_kind(self.image.info());
        if let Some(ops) = target.support_breakpoints() {
            if !ops.remove_breakpoint(addr, kind)? {
                warn!("exit point breakpoint at {:#x} was already gone", addr);
            }
        }
        Ok(())
    }

    fn restore_context<T>(&mut self, target: &mut T) -> Result<(), Error<T::Error>>
    where
        T: Target<Arch = A>,
    {
        let mut res = Ok(());
        for (reg, val) in self.saved.drain(..) {
            if let Err(e) = target.write_register(reg, val) {
                error!("failed to restore register {:?}", reg);
                if res.is_ok() {
                    res = Err(e.into());
                }
            }
        }
        res
    }
}

impl<'a, A: Arch> core::fmt::Debug for AlgorithmRunner<'a, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AlgorithmRunner")
            .field("image", &self.image)
            .field("state", &self.state)
            .finish()
    }
}
