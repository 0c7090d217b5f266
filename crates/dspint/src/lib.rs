//! An interpreter for the GameCube DSP.

mod exec;
mod ext;

pub mod disasm;
pub mod hw;
pub mod ins;
pub mod mem;
pub mod regs;
pub mod symbols;

#[cfg(test)]
mod test;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use util::boxed_array;

use crate::exec::{OPCODE_EXEC_LUT, OpcodeFn};
use crate::ext::{EXTENSION_EXEC_LUT, ExtensionFn};
use crate::hw::{Control, Hardware, HostModule, Mailbox, NopHostModule};
use crate::ins::Decoded;
use crate::mem::Memory;
use crate::regs::Registers;

pub use crate::ins::Ins;
pub use crate::mem::LoadError;

/// Configuration of an [`Interpreter`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Size of the auxiliary RAM reachable through the accelerator, in bytes.
    pub aram_size: usize,
    /// Whether the DSP resets into IROM (0x8000) rather than IRAM (0x0000).
    pub reset_high: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aram_size: (16 * bytesize::MIB) as usize,
            reset_high: true,
        }
    }
}

/// DSP exceptions, by priority level. The vector of an exception is at `level * 2`.
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Exception {
    Reset                   = 0,
    StackOverflow           = 1,
    Unknown0                = 2,
    AccelRawReadOverflow    = 3,
    AccelRawWriteOverflow   = 4,
    AccelSampleReadOverflow = 5,
    Unknown1                = 6,
    External                = 7,
}

/// Why [`Interpreter::run`] or [`Interpreter::run_x`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The DSP is halted.
    Halted,
    /// The run was cancelled through [`Interpreter::stop`].
    Stopped,
    /// A breakpoint was reached. The instruction at it has not executed yet.
    Breakpoint(u16),
    /// The requested amount of instructions was executed.
    Exhausted,
}

#[derive(Clone, Copy)]
struct CachedIns {
    ins: Ins,
    len: u16,
    main: OpcodeFn,
    extension: Option<ExtensionFn>,
}

pub struct Interpreter {
    pub pc: u16,
    pub regs: Registers,
    pub mem: Memory,
    pub hw: Hardware,
    pub control: Control,
    /// Whether an exception handler is running (i.e. no `RTI` yet).
    pub exception_in_progress: bool,
    /// Amount of executed instructions.
    pub steps: u64,
    /// Hash of the microcode in instruction RAM.
    pub checksum: u64,
    /// Amount of executed instructions that did not decode.
    pub unknown_opcodes: u64,
    /// Remaining repetitions of the instruction following a `LOOP`/`LOOPI`.
    pub loop_counter: Option<u16>,
    pub breakpoints: Vec<u16>,

    running: Arc<AtomicBool>,
    host: Box<dyn HostModule>,
    cached: Box<[Option<CachedIns>; 1 << 16]>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Config::default(), Box::new(NopHostModule))
    }
}

impl Interpreter {
    pub fn new(config: Config, host: Box<dyn HostModule>) -> Self {
        let mut interpreter = Self {
            pc: 0,
            regs: Default::default(),
            mem: Default::default(),
            hw: Hardware::new(config.aram_size),
            control: Control::default().with_reset_high(config.reset_high),
            exception_in_progress: false,
            steps: 0,
            checksum: 0,
            unknown_opcodes: 0,
            loop_counter: None,
            breakpoints: Vec::new(),
            running: Arc::new(AtomicBool::new(false)),
            host,
            cached: boxed_array(None),
        };

        interpreter.checksum = interpreter.compute_checksum();
        interpreter.reset();
        interpreter
    }

    /// Soft resets the DSP.
    pub fn reset(&mut self) {
        debug_assert!(
            !self.exception_in_progress,
            "DSP reset while an exception is in progress"
        );

        self.regs = Default::default();
        self.loop_counter = None;
        self.exception_in_progress = false;
        self.hw.dsp_mailbox = Mailbox::from_bits(0);
        self.hw.cpu_mailbox = Mailbox::from_bits(0);
        self.control.set_halt(false);
        self.invalidate_cache();

        self.pc = if self.control.reset_high() {
            tracing::debug!("resetting at IROM (0x8000)");
            0x8000
        } else {
            tracing::debug!("resetting at IRAM (0x0000)");
            0x0000
        };
    }

    /// Drops every decoded instruction.
    pub fn invalidate_cache(&mut self) {
        self.cached.fill(None);
    }

    /// Reads from data memory.
    pub fn read_dmem(&mut self, addr: u16) -> u16 {
        match addr >> 12 {
            0x0 => self.mem.read_dram(addr),
            0x1 => self.mem.read_coef(addr),
            0x8 => self.mem.read_drom(addr),
            0xF => self.read_hw(addr as u8),
            _ => {
                tracing::warn!("read from unmapped data memory 0x{addr:04X}");
                0
            }
        }
    }

    /// Writes to data memory.
    pub fn write_dmem(&mut self, addr: u16, value: u16) {
        match addr >> 12 {
            0x0 => self.mem.write_dram(addr, value),
            0x1 => tracing::warn!("write of 0x{value:04X} to coefficient ROM 0x{addr:04X}"),
            0x8 => tracing::warn!("write of 0x{value:04X} to data ROM 0x{addr:04X}"),
            0xF => self.write_hw(addr as u8, value),
            _ => tracing::warn!("write of 0x{value:04X} to unmapped data memory 0x{addr:04X}"),
        }
    }

    /// Reads from instruction memory. Aliases the same way instruction fetches do: the low half
    /// of the address space mirrors IRAM and the high half mirrors IROM.
    #[inline(always)]
    pub fn read_imem(&self, addr: u16) -> u16 {
        self.mem.read_instruction(addr, addr)
    }

    /// Writes to instruction memory.
    pub fn write_imem(&mut self, addr: u16, value: u16) {
        let 0x0000..0x1000 = addr else {
            tracing::warn!("write of 0x{value:04X} to read-only instruction memory 0x{addr:04X}");
            return;
        };

        self.mem.write_iram(addr, value);

        // every PC in the low half aliases IRAM
        for alias in (0..0x8000u16).step_by(0x1000) {
            let pc = alias | addr;
            self.cached[pc as usize] = None;
            self.cached[pc.wrapping_sub(1) as usize] = None;
        }
    }

    /// Decodes the instruction at `addr`, fetched as if the PC were at the current one.
    fn decode_at(&self, addr: u16) -> Decoded {
        Ins::new(self.mem.read_instruction(self.pc, addr)).decoded()
    }

    fn fetch_decode_and_cache(&mut self) -> CachedIns {
        // fetch
        let mut ins = Ins::new(self.mem.read_instruction(self.pc, self.pc));

        // decode
        let decoded = ins.decoded();
        if decoded.needs_extra() {
            ins.extra = self
                .mem
                .read_instruction(self.pc, self.pc.wrapping_add(1));
        }

        let main = OPCODE_EXEC_LUT[decoded.opcode() as usize];
        let extension = decoded
            .extension
            .map(|extension| EXTENSION_EXEC_LUT[extension.opcode as usize]);

        // cache
        let cached = CachedIns {
            ins,
            len: decoded.len(),
            main,
            extension,
        };
        self.cached[self.pc as usize] = Some(cached);

        cached
    }

    fn raise_exception(&mut self, exception: Exception) {
        debug_assert!(
            !self.exception_in_progress,
            "exception {exception:?} raised while another one is in progress"
        );

        tracing::debug!("raising {exception:?} exception at 0x{:04X}", self.pc);

        self.regs.stacks.call.push(self.pc);
        self.regs.stacks.data.push(self.regs.status.to_bits());
        self.pc = exception as u16 * 2;
        self.exception_in_progress = true;

        match exception {
            Exception::External => self.regs.status.set_external_interrupt_enable(false),
            _ => self.regs.status.set_interrupt_enable(false),
        }
    }

    fn check_exceptions(&mut self) {
        if self.exception_in_progress || self.loop_counter.is_some() {
            return;
        }

        if let Some(exception) = self.take_accelerator_wrap() {
            self.raise_exception(exception);
            return;
        }

        // external interrupt does not care about status interrupt enable
        if self.control.interrupt() && self.regs.status.external_interrupt_enable() {
            self.control.set_interrupt(false);
            self.raise_exception(Exception::External);
        }
    }

    /// Ends or restarts the innermost block loop if the PC just left its last instruction.
    fn check_block_loop(&mut self) {
        let stacks = &mut self.regs.stacks;
        if stacks.loop_counter.top() == 0 || self.pc != stacks.loop_address.top().wrapping_add(1) {
            return;
        }

        let Some(counter) = stacks.loop_counter.top_mut() else {
            return;
        };

        *counter -= 1;
        if *counter == 0 {
            stacks.call.pop();
            stacks.loop_address.pop();
            stacks.loop_counter.pop();
        } else {
            self.pc = stacks.call.top();
        }
    }

    /// Executes a single instruction. Does nothing while the DSP is halted.
    pub fn step(&mut self) {
        if self.control.halt() {
            return;
        }

        let start = self.pc;
        let repeating = self.loop_counter.is_some();

        // have we cached this instruction already?
        let ins = match self.cached[start as usize] {
            Some(cached) => cached,
            None => self.fetch_decode_and_cache(),
        };

        self.pc = start.wrapping_add(ins.len);

        // execute
        if let Some(extension) = ins.extension {
            let regs_previous = self.regs.clone();
            (ins.main)(self, ins.ins);
            (extension)(self, ins.ins, &regs_previous);
        } else {
            (ins.main)(self, ins.ins);
        }

        self.steps += 1;

        if repeating {
            match self.loop_counter.map(|c| c.saturating_sub(1)) {
                Some(0) | None => {
                    // the repeated instruction may be the last one of a block loop
                    self.loop_counter = None;
                    self.check_block_loop();
                }
                Some(remaining) => {
                    self.loop_counter = Some(remaining);
                    self.pc = start;
                }
            }
        } else {
            self.check_block_loop();
        }

        self.check_exceptions();
    }

    fn run_inner(&mut self, mut budget: Option<u64>) -> Exit {
        self.running.store(true, Ordering::Relaxed);

        let mut first = true;
        let exit = loop {
            if !self.running.load(Ordering::Relaxed) {
                break Exit::Stopped;
            }

            if self.control.halt() {
                break Exit::Halted;
            }

            if budget == Some(0) {
                break Exit::Exhausted;
            }

            if !first && self.breakpoints.contains(&self.pc) {
                break Exit::Breakpoint(self.pc);
            }

            self.step();
            first = false;

            if let Some(remaining) = &mut budget {
                *remaining -= 1;
            }
        };

        self.running.store(false, Ordering::Relaxed);
        exit
    }

    /// Executes instructions until the DSP halts, a breakpoint is reached or the run is stopped.
    pub fn run(&mut self) -> Exit {
        self.run_inner(None)
    }

    /// Executes at most `count` instructions.
    pub fn run_x(&mut self, count: u64) -> Exit {
        self.run_inner(Some(count))
    }

    /// Cancels an ongoing run at the next instruction boundary.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// A handle through which another thread can cancel runs.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Writes the control register, as the CPU does.
    pub fn write_control(&mut self, value: u16) {
        let value = Control::from_bits(value);
        let control = &mut self.control;

        control.set_halt(value.halt());
        control.set_interrupt(value.interrupt());

        control.set_ai_dma_interrupt(control.ai_dma_interrupt() & !value.ai_dma_interrupt());
        control.set_ai_dma_interrupt_mask(value.ai_dma_interrupt_mask());
        control.set_aram_dma_interrupt(control.aram_dma_interrupt() & !value.aram_dma_interrupt());
        control.set_aram_dma_interrupt_mask(value.aram_dma_interrupt_mask());
        control.set_dsp_interrupt(control.dsp_interrupt() & !value.dsp_interrupt());
        control.set_dsp_interrupt_mask(value.dsp_interrupt_mask());

        control.set_unknown(value.unknown());
        control.set_reset_high(value.reset_high());

        if value.reset() {
            tracing::debug!("DSP reset");
            self.reset();
            self.control.set_halt(value.halt());
        }
    }

    /// Reads the control register, as the CPU does.
    pub fn read_control(&self) -> u16 {
        self.control.to_bits()
    }

    /// Loads an instruction ROM image.
    pub fn load_irom(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        self.mem.irom = mem::read_image(path.as_ref())?;
        self.invalidate_cache();
        Ok(())
    }

    /// Loads an instruction RAM image, as if it had been uploaded by DMA.
    pub fn load_iram(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        self.mem.iram = mem::read_image(path.as_ref())?;
        self.invalidate_cache();
        self.checksum = self.compute_checksum();
        Ok(())
    }

    /// Loads a data ROM image.
    pub fn load_drom(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        self.mem.drom = mem::read_image(path.as_ref())?;
        Ok(())
    }

    /// Loads a coefficient ROM image.
    pub fn load_coef(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        self.mem.coef = mem::read_image(path.as_ref())?;
        Ok(())
    }
}
