//! Extension micro-operations.
//!
//! Extensions run after the primary operation of their instruction. They observe the register
//! file as it was before the primary operation executed (`prev`), but their writes land on top
//! of its results.

use bitos::BitUtils;

use crate::ins::{ExtensionOpcode, Ins};
use crate::regs::{Reg, Registers};
use crate::Interpreter;

/// How an address register is stepped after a parallel load or store.
#[derive(Debug, Clone, Copy)]
enum Step {
    Increment,
    Index,
}

impl Interpreter {
    fn step_addressing(&mut self, index: usize, step: Step) {
        match step {
            Step::Increment => self.regs.increment_addressing(index),
            Step::Index => self.regs.index_addressing(index),
        }
    }

    pub fn ext_nop(&mut self, _: Ins, _: &Registers) {}

    pub fn ext_dr(&mut self, ins: Ins, _: &Registers) {
        self.regs.decrement_addressing(ins.base.bits(0, 2) as usize);
    }

    pub fn ext_ir(&mut self, ins: Ins, _: &Registers) {
        self.regs.increment_addressing(ins.base.bits(0, 2) as usize);
    }

    pub fn ext_nr(&mut self, ins: Ins, _: &Registers) {
        self.regs.index_addressing(ins.base.bits(0, 2) as usize);
    }

    pub fn ext_mv(&mut self, ins: Ins, prev: &Registers) {
        let d = ins.base.bits(2, 4) as u8;
        let s = ins.base.bits(0, 2) as u8;

        let value = prev.peek(Reg::new(0x1C + s));
        self.regs.write(Reg::new(0x18 + d), value);
    }

    fn ext_store(&mut self, ins: Ins, prev: &Registers, step: Step) {
        let d = ins.base.bits(0, 2) as usize;
        let s = ins.base.bits(3, 5) as u8;

        let value = prev.peek(Reg::new(0x1C + s));
        self.write_dmem(prev.addressing[d], value);
        self.step_addressing(d, step);
    }

    pub fn ext_s(&mut self, ins: Ins, prev: &Registers) {
        self.ext_store(ins, prev, Step::Increment);
    }

    pub fn ext_sn(&mut self, ins: Ins, prev: &Registers) {
        self.ext_store(ins, prev, Step::Index);
    }

    fn ext_load(&mut self, ins: Ins, prev: &Registers, step: Step) {
        let d = ins.base.bits(3, 6) as u8;
        let s = ins.base.bits(0, 2) as usize;

        let value = self.read_dmem(prev.addressing[s]);
        self.regs.write(Reg::new(0x18 + d), value);
        self.step_addressing(s, step);
    }

    pub fn ext_l(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load(ins, prev, Step::Increment);
    }

    pub fn ext_ln(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load(ins, prev, Step::Index);
    }

    /// Loads through `load` and stores an accumulator middle part through `store`. Afterwards,
    /// AR0 is stepped by `ar0` and AR3 by `ar3`.
    fn ext_load_store(
        &mut self,
        ins: Ins,
        prev: &Registers,
        load: usize,
        store: usize,
        ar0: Step,
        ar3: Step,
    ) {
        let d = ins.base.bits(4, 6) as u8;
        let s = ins.base.bit(0) as u8;

        let value = prev.peek(Reg::new(0x1E + s));
        self.write_dmem(prev.addressing[store], value);

        let loaded = self.read_dmem(prev.addressing[load]);
        self.regs.write(Reg::new(0x18 + d), loaded);

        self.step_addressing(0, ar0);
        self.step_addressing(3, ar3);
    }

    pub fn ext_ls(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load_store(ins, prev, 0, 3, Step::Increment, Step::Increment);
    }

    pub fn ext_sl(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load_store(ins, prev, 3, 0, Step::Increment, Step::Increment);
    }

    pub fn ext_lsn(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load_store(ins, prev, 0, 3, Step::Index, Step::Increment);
    }

    pub fn ext_sln(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load_store(ins, prev, 3, 0, Step::Index, Step::Increment);
    }

    pub fn ext_lsm(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load_store(ins, prev, 0, 3, Step::Increment, Step::Index);
    }

    pub fn ext_slm(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load_store(ins, prev, 3, 0, Step::Increment, Step::Index);
    }

    pub fn ext_lsnm(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load_store(ins, prev, 0, 3, Step::Index, Step::Index);
    }

    pub fn ext_slnm(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load_store(ins, prev, 3, 0, Step::Index, Step::Index);
    }

    /// Loads two auxiliary halves in parallel, one through the selected address register and one
    /// through AR3.
    fn ext_load_dual(&mut self, ins: Ins, prev: &Registers, ars: Step, ar3: Step) {
        let d = 0x18 + ((ins.base & 0x20) >> 4) as u8;
        let r = 0x19 + ((ins.base & 0x10) >> 3) as u8;
        let s = ins.base.bits(0, 2) as usize;

        let first = self.read_dmem(prev.addressing[s]);
        let second = self.read_dmem(prev.addressing[3]);
        self.regs.write(Reg::new(d), first);
        self.regs.write(Reg::new(r), second);

        self.step_addressing(s, ars);
        if s != 3 {
            self.step_addressing(3, ar3);
        }
    }

    pub fn ext_ld(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load_dual(ins, prev, Step::Increment, Step::Increment);
    }

    pub fn ext_ldn(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load_dual(ins, prev, Step::Index, Step::Increment);
    }

    pub fn ext_ldm(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load_dual(ins, prev, Step::Increment, Step::Index);
    }

    pub fn ext_ldnm(&mut self, ins: Ins, prev: &Registers) {
        self.ext_load_dual(ins, prev, Step::Index, Step::Index);
    }
}

pub(crate) type ExtensionFn = fn(&mut Interpreter, Ins, &Registers);

pub(crate) static EXTENSION_EXEC_LUT: [ExtensionFn; 1 << 5] = {
    use ExtensionOpcode as E;

    let mut lut = [Interpreter::ext_nop as ExtensionFn; 1 << 5];

    lut[E::Nop as usize] = Interpreter::ext_nop as ExtensionFn;
    lut[E::Dr as usize] = Interpreter::ext_dr as ExtensionFn;
    lut[E::Ir as usize] = Interpreter::ext_ir as ExtensionFn;
    lut[E::Nr as usize] = Interpreter::ext_nr as ExtensionFn;
    lut[E::Mv as usize] = Interpreter::ext_mv as ExtensionFn;
    lut[E::S as usize] = Interpreter::ext_s as ExtensionFn;
    lut[E::Sn as usize] = Interpreter::ext_sn as ExtensionFn;
    lut[E::L as usize] = Interpreter::ext_l as ExtensionFn;
    lut[E::Ln as usize] = Interpreter::ext_ln as ExtensionFn;
    lut[E::Ls as usize] = Interpreter::ext_ls as ExtensionFn;
    lut[E::Sl as usize] = Interpreter::ext_sl as ExtensionFn;
    lut[E::Lsn as usize] = Interpreter::ext_lsn as ExtensionFn;
    lut[E::Sln as usize] = Interpreter::ext_sln as ExtensionFn;
    lut[E::Lsm as usize] = Interpreter::ext_lsm as ExtensionFn;
    lut[E::Slm as usize] = Interpreter::ext_slm as ExtensionFn;
    lut[E::Lsnm as usize] = Interpreter::ext_lsnm as ExtensionFn;
    lut[E::Slnm as usize] = Interpreter::ext_slnm as ExtensionFn;
    lut[E::Ld as usize] = Interpreter::ext_ld as ExtensionFn;
    lut[E::Ldn as usize] = Interpreter::ext_ldn as ExtensionFn;
    lut[E::Ldm as usize] = Interpreter::ext_ldm as ExtensionFn;
    lut[E::Ldnm as usize] = Interpreter::ext_ldnm as ExtensionFn;

    lut
};
