use bitos::BitUtils;

use crate::ins::{Cond, Ins};
use crate::regs::{Product, Reg, Status};
use crate::Interpreter;

#[inline(always)]
fn round_40(value: i64) -> i64 {
    if value.bit(16) {
        (value + 0x8000) & !0xFFFF
    } else {
        (value + 0x7FFF) & !0xFFFF
    }
}

/// 40-bit value of an accumulator, reinterpreted as unsigned.
#[inline(always)]
fn logical(value: i64) -> i64 {
    value & ((1 << 40) - 1)
}

/// Post-modification applied to an address register by indirect loads and stores.
#[derive(Debug, Clone, Copy)]
enum Modify {
    None,
    Decrement,
    Increment,
    Index,
}

impl Interpreter {
    #[inline(always)]
    fn condition(&self, ins: Ins) -> bool {
        self.regs.status.condition(Cond::new(ins.base))
    }

    #[inline(always)]
    fn set_acc(&mut self, index: usize, value: i64) -> i64 {
        let new = self.regs.acc[index].set(value);
        self.regs.status.update(new);
        new
    }

    #[inline(always)]
    fn acc(&self, index: usize) -> i64 {
        self.regs.acc[index].unpack()
    }

    #[inline(always)]
    fn product(&self) -> i64 {
        self.regs.product.unpack()
    }

    #[inline(always)]
    fn set_product(&mut self, value: i64) {
        self.regs.product = Product::pack(value);
    }

    #[inline(always)]
    fn multiply(&self, lhs: u16, rhs: u16) -> i64 {
        lhs as i16 as i64 * rhs as i16 as i64 * self.regs.status.multiplier()
    }

    /// Multiplies two auxiliary halves. In unsigned mode, low halves are taken as unsigned.
    fn multiply_mixed(&self, lhs: u16, lhs_high: bool, rhs: u16, rhs_high: bool) -> i64 {
        let unsigned = self.regs.status.unsigned_mul();
        let lhs = if unsigned && !lhs_high { lhs as i64 } else { lhs as i16 as i64 };
        let rhs = if unsigned && !rhs_high { rhs as i64 } else { rhs as i16 as i64 };

        lhs * rhs * self.regs.status.multiplier()
    }

    fn modify_addressing(&mut self, index: usize, modify: Modify) {
        match modify {
            Modify::None => (),
            Modify::Decrement => self.regs.decrement_addressing(index),
            Modify::Increment => self.regs.increment_addressing(index),
            Modify::Index => self.regs.index_addressing(index),
        }
    }

    fn set_status_bit(&mut self, bit: u8, value: bool) {
        self.regs.status = Status::from_bits(self.regs.status.to_bits().with_bit(bit, value));
    }

    // ===== control flow =====

    pub fn nop(&mut self, _: Ins) {}

    pub fn halt(&mut self, _: Ins) {
        self.control.set_halt(true);
        self.pc = self.pc.wrapping_sub(1);
    }

    pub fn jmp(&mut self, ins: Ins) {
        if self.condition(ins) {
            self.pc = ins.extra;
        }
    }

    pub fn call(&mut self, ins: Ins) {
        if self.condition(ins) {
            self.regs.stacks.call.push(self.pc);
            self.pc = ins.extra;
        }
    }

    pub fn ret(&mut self, ins: Ins) {
        if self.condition(ins) {
            self.pc = self.regs.stacks.call.pop();
        }
    }

    pub fn rti(&mut self, _: Ins) {
        self.regs.status = Status::from_bits(self.regs.stacks.data.pop());
        self.pc = self.regs.stacks.call.pop();
        self.exception_in_progress = false;
    }

    pub fn jr(&mut self, ins: Ins) {
        if self.condition(ins) {
            let reg = Reg::new(ins.base.bits(5, 8) as u8);
            self.pc = self.regs.read(reg);
        }
    }

    pub fn callr(&mut self, ins: Ins) {
        if self.condition(ins) {
            let reg = Reg::new(ins.base.bits(5, 8) as u8);
            let target = self.regs.read(reg);
            self.regs.stacks.call.push(self.pc);
            self.pc = target;
        }
    }

    pub fn ifcc(&mut self, ins: Ins) {
        if !self.condition(ins) {
            let skipped = self.decode_at(self.pc);
            self.pc = self.pc.wrapping_add(skipped.len());
        }
    }

    /// Repeats the next instruction `count` times.
    fn repeat(&mut self, count: u16) {
        if count == 0 {
            let skipped = self.decode_at(self.pc);
            self.pc = self.pc.wrapping_add(skipped.len());
        } else {
            self.loop_counter = Some(count);
        }
    }

    pub fn loop_(&mut self, ins: Ins) {
        // stack registers are not popped by the count read
        let count = self.regs.peek(Reg::new(ins.base.bits(0, 5) as u8));
        self.repeat(count);
    }

    pub fn loopi(&mut self, ins: Ins) {
        self.repeat(ins.base.bits(0, 8));
    }

    /// Executes the block from the next instruction up to `end` (inclusive) `count` times.
    fn block_loop(&mut self, count: u16, end: u16) {
        if count == 0 {
            self.pc = end.wrapping_add(1);
            return;
        }

        self.regs.stacks.call.push(self.pc);
        self.regs.stacks.loop_address.push(end);
        self.regs.stacks.loop_counter.push(count);
    }

    pub fn bloop(&mut self, ins: Ins) {
        let count = self.regs.peek(Reg::new(ins.base.bits(0, 5) as u8));
        self.block_loop(count, ins.extra);
    }

    pub fn bloopi(&mut self, ins: Ins) {
        self.block_loop(ins.base.bits(0, 8), ins.extra);
    }

    // ===== address registers =====

    pub fn dar(&mut self, ins: Ins) {
        self.regs.decrement_addressing(ins.base.bits(0, 2) as usize);
    }

    pub fn iar(&mut self, ins: Ins) {
        self.regs.increment_addressing(ins.base.bits(0, 2) as usize);
    }

    pub fn subarn(&mut self, ins: Ins) {
        let r = ins.base.bits(0, 2) as usize;
        let ix = self.regs.indexing[r];
        if ix != 0 {
            self.regs.add_to_addressing(r, ix.wrapping_neg(), false);
        }
    }

    pub fn addarn(&mut self, ins: Ins) {
        let addr = ins.base.bits(0, 2) as usize;
        let idx = ins.base.bits(2, 4) as usize;

        let ix = self.regs.indexing[idx];
        self.regs.add_to_addressing(addr, ix, true);
    }

    // ===== loads and stores =====

    pub fn lri(&mut self, ins: Ins) {
        self.regs.write(Reg::new(ins.base.bits(0, 5) as u8), ins.extra);
    }

    pub fn lris(&mut self, ins: Ins) {
        let reg = Reg::new(0x18 + ins.base.bits(8, 11) as u8);
        self.regs.write(reg, ins.base as i8 as i16 as u16);
    }

    pub fn lr(&mut self, ins: Ins) {
        let value = self.read_dmem(ins.extra);
        self.regs.write(Reg::new(ins.base.bits(0, 5) as u8), value);
    }

    pub fn sr(&mut self, ins: Ins) {
        let value = self.regs.read(Reg::new(ins.base.bits(0, 5) as u8));
        self.write_dmem(ins.extra, value);
    }

    pub fn si(&mut self, ins: Ins) {
        let addr = ins.base as i8 as i16 as u16;
        self.write_dmem(addr, ins.extra);
    }

    pub fn lrs(&mut self, ins: Ins) {
        let reg = Reg::new(0x18 + ins.base.bits(8, 11) as u8);
        let value = self.read_dmem(ins.base as i8 as i16 as u16);
        self.regs.write(reg, value);
    }

    pub fn srs(&mut self, ins: Ins) {
        let reg = Reg::new(0x18 + ins.base.bits(8, 11) as u8);
        let value = self.regs.read(reg);
        self.write_dmem(ins.base as i8 as i16 as u16, value);
    }

    pub fn mrr(&mut self, ins: Ins) {
        let src = Reg::new(ins.base.bits(0, 5) as u8);
        let dst = Reg::new(ins.base.bits(5, 10) as u8);

        let value = self.regs.read(src);
        self.regs.write(dst, value);
    }

    fn load_indirect(&mut self, ins: Ins, modify: Modify) {
        let dst = Reg::new(ins.base.bits(0, 5) as u8);
        let s = ins.base.bits(5, 7) as usize;

        let value = self.read_dmem(self.regs.addressing[s]);
        self.regs.write(dst, value);
        self.modify_addressing(s, modify);
    }

    pub fn lrr(&mut self, ins: Ins) {
        self.load_indirect(ins, Modify::None);
    }

    pub fn lrrd(&mut self, ins: Ins) {
        self.load_indirect(ins, Modify::Decrement);
    }

    pub fn lrri(&mut self, ins: Ins) {
        self.load_indirect(ins, Modify::Increment);
    }

    pub fn lrrn(&mut self, ins: Ins) {
        self.load_indirect(ins, Modify::Index);
    }

    fn store_indirect(&mut self, ins: Ins, modify: Modify) {
        let src = Reg::new(ins.base.bits(0, 5) as u8);
        let d = ins.base.bits(5, 7) as usize;

        let value = self.regs.read(src);
        self.write_dmem(self.regs.addressing[d], value);
        self.modify_addressing(d, modify);
    }

    pub fn srr(&mut self, ins: Ins) {
        self.store_indirect(ins, Modify::None);
    }

    pub fn srrd(&mut self, ins: Ins) {
        self.store_indirect(ins, Modify::Decrement);
    }

    pub fn srri(&mut self, ins: Ins) {
        self.store_indirect(ins, Modify::Increment);
    }

    pub fn srrn(&mut self, ins: Ins) {
        self.store_indirect(ins, Modify::Index);
    }

    fn load_instruction_memory(&mut self, ins: Ins, modify: Modify) {
        let d = ins.base.bit(8) as u8;
        let s = ins.base.bits(0, 2) as usize;

        let value = self.read_imem(self.regs.addressing[s]);
        self.regs.write(Reg::new(0x1E + d), value);
        self.modify_addressing(s, modify);
    }

    pub fn ilrr(&mut self, ins: Ins) {
        self.load_instruction_memory(ins, Modify::None);
    }

    pub fn ilrrd(&mut self, ins: Ins) {
        self.load_instruction_memory(ins, Modify::Decrement);
    }

    pub fn ilrri(&mut self, ins: Ins) {
        self.load_instruction_memory(ins, Modify::Increment);
    }

    pub fn ilrrn(&mut self, ins: Ins) {
        self.load_instruction_memory(ins, Modify::Index);
    }

    // ===== status register =====

    pub fn sbclr(&mut self, ins: Ins) {
        let bit = ins.base.bits(0, 3) as u8 + 6;
        self.set_status_bit(bit, false);
    }

    pub fn sbset(&mut self, ins: Ins) {
        let bit = ins.base.bits(0, 3) as u8 + 6;
        self.set_status_bit(bit, true);
    }

    pub fn m2(&mut self, _: Ins) {
        self.regs.status.set_dont_double_result(false);
    }

    pub fn m0(&mut self, _: Ins) {
        self.regs.status.set_dont_double_result(true);
    }

    pub fn clr15(&mut self, _: Ins) {
        self.regs.status.set_unsigned_mul(false);
    }

    pub fn set15(&mut self, _: Ins) {
        self.regs.status.set_unsigned_mul(true);
    }

    pub fn set16(&mut self, _: Ins) {
        self.regs.status.set_sign_extend_to_40(false);
    }

    pub fn set40(&mut self, _: Ins) {
        self.regs.status.set_sign_extend_to_40(true);
    }

    // ===== immediate arithmetic and logic =====

    pub fn addi(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let rhs = (ins.extra as i16 as i64) << 16;
        self.set_acc(d, self.acc(d) + rhs);
    }

    pub fn addis(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let rhs = (ins.base as i8 as i64) << 16;
        self.set_acc(d, self.acc(d) + rhs);
    }

    pub fn cmpi(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let rhs = (ins.extra as i16 as i64) << 16;
        self.regs.status.update(self.acc(d) - rhs);
    }

    pub fn cmpis(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let rhs = (ins.base as i8 as i64) << 16;
        self.regs.status.update(self.acc(d) - rhs);
    }

    pub fn xori(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.regs.acc[d].mid ^= ins.extra;
        self.regs.status.update16(self.regs.acc[d].mid as i16);
    }

    pub fn andi(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.regs.acc[d].mid &= ins.extra;
        self.regs.status.update16(self.regs.acc[d].mid as i16);
    }

    pub fn ori(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.regs.acc[d].mid |= ins.extra;
        self.regs.status.update16(self.regs.acc[d].mid as i16);
    }

    pub fn andf(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let masked = self.regs.acc[d].mid & ins.extra;
        self.regs.status.set_logic_zero(masked == 0);
    }

    pub fn andcf(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let masked = self.regs.acc[d].mid & ins.extra;
        self.regs.status.set_logic_zero(masked == ins.extra);
    }

    // ===== shifts =====

    pub fn lsl(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        let shift = ins.base.bits(0, 6);
        self.set_acc(r, self.acc(r) << shift);
    }

    pub fn lsr(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        let shift = (64 - ins.base.bits(0, 6)) % 64;
        self.set_acc(r, logical(self.acc(r)) >> shift);
    }

    pub fn asl(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        let shift = ins.base.bits(0, 6);
        self.set_acc(r, self.acc(r) << shift);
    }

    pub fn asr(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        let shift = (64 - ins.base.bits(0, 6)) % 64;
        self.set_acc(r, self.acc(r) >> shift);
    }

    pub fn lsl16(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        self.set_acc(r, self.acc(r) << 16);
    }

    pub fn lsr16(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        self.set_acc(r, logical(self.acc(r)) >> 16);
    }

    pub fn asr16(&mut self, ins: Ins) {
        let r = ins.base.bit(11) as usize;
        self.set_acc(r, self.acc(r) >> 16);
    }

    /// Shifts an accumulator by a signed 7-bit amount. Positive amounts shift in `positive_left`
    /// direction.
    fn shift_by(&mut self, d: usize, amount: u16, arithmetic: bool, positive_left: bool) {
        let value = if arithmetic {
            self.acc(d)
        } else {
            logical(self.acc(d))
        };

        let magnitude = amount.bits(0, 6);
        let (left, shift) = if amount.bit(6) {
            (!positive_left, (64 - magnitude) % 64)
        } else {
            (positive_left, magnitude)
        };

        let new = if left { value << shift } else { value >> shift };
        self.set_acc(d, new);
    }

    pub fn lsrn(&mut self, _: Ins) {
        let amount = self.regs.acc[1].mid;
        self.shift_by(0, amount, false, false);
    }

    pub fn asrn(&mut self, _: Ins) {
        let amount = self.regs.acc[1].mid;
        self.shift_by(0, amount, true, false);
    }

    pub fn lsrnrx(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let s = ins.base.bit(9) as usize;
        let amount = self.regs.ax[s].high;
        self.shift_by(d, amount, false, true);
    }

    pub fn asrnrx(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let s = ins.base.bit(9) as usize;
        let amount = self.regs.ax[s].high;
        self.shift_by(d, amount, true, true);
    }

    pub fn lsrnr(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let amount = self.regs.acc[1 - d].mid;
        self.shift_by(d, amount, false, true);
    }

    pub fn asrnr(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let amount = self.regs.acc[1 - d].mid;
        self.shift_by(d, amount, true, true);
    }

    // ===== accumulator logic =====

    pub fn xorr(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let s = ins.base.bit(9) as usize;
        self.regs.acc[d].mid ^= self.regs.ax[s].high;
        self.regs.status.update(self.acc(d));
    }

    pub fn andr(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let s = ins.base.bit(9) as usize;
        self.regs.acc[d].mid &= self.regs.ax[s].high;
        self.regs.status.update(self.acc(d));
    }

    pub fn orr(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let s = ins.base.bit(9) as usize;
        self.regs.acc[d].mid |= self.regs.ax[s].high;
        self.regs.status.update(self.acc(d));
    }

    pub fn andc(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.regs.acc[d].mid &= self.regs.acc[1 - d].mid;
        self.regs.status.update(self.acc(d));
    }

    pub fn orc(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.regs.acc[d].mid |= self.regs.acc[1 - d].mid;
        self.regs.status.update(self.acc(d));
    }

    pub fn xorc(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.regs.acc[d].mid ^= self.regs.acc[1 - d].mid;
        self.regs.status.update(self.acc(d));
    }

    pub fn not(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.regs.acc[d].mid = !self.regs.acc[d].mid;
        self.regs.status.update(self.acc(d));
    }

    // ===== accumulator arithmetic =====

    pub fn addr(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let s = ins.base.bits(9, 11) as u8;
        let rhs = (self.regs.peek(Reg::new(0x18 + s)) as i16 as i64) << 16;
        self.set_acc(d, self.acc(d) + rhs);
    }

    pub fn subr(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let s = ins.base.bits(9, 11) as u8;
        let rhs = (self.regs.peek(Reg::new(0x18 + s)) as i16 as i64) << 16;
        self.set_acc(d, self.acc(d) - rhs);
    }

    pub fn movr(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let s = ins.base.bits(9, 11) as u8;
        let value = (self.regs.peek(Reg::new(0x18 + s)) as i16 as i64) << 16;
        self.set_acc(d, value);
    }

    pub fn addax(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let s = ins.base.bit(9) as usize;
        self.set_acc(d, self.acc(d) + self.regs.ax[s].unpack());
    }

    pub fn subax(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let s = ins.base.bit(9) as usize;
        self.set_acc(d, self.acc(d) - self.regs.ax[s].unpack());
    }

    pub fn movax(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let s = ins.base.bit(9) as usize;
        self.set_acc(d, self.regs.ax[s].unpack());
    }

    pub fn addaxl(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let s = ins.base.bit(9) as usize;
        self.set_acc(d, self.acc(d) + self.regs.ax[s].low as i64);
    }

    pub fn add(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.set_acc(d, self.acc(0) + self.acc(1));
    }

    pub fn sub(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.set_acc(d, self.acc(d) - self.acc(1 - d));
    }

    pub fn mov(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.set_acc(d, self.acc(1 - d));
    }

    pub fn addp(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.set_acc(d, self.acc(d) + self.product());
    }

    pub fn subp(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.set_acc(d, self.acc(d) - self.product());
    }

    pub fn movp(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.set_acc(d, self.product());
    }

    pub fn movnp(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.set_acc(d, -self.product());
    }

    pub fn movpz(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.set_acc(d, round_40(self.product()));
    }

    pub fn addpaxz(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        let s = ins.base.bit(9) as usize;

        let lhs = round_40(self.product());
        let rhs = self.regs.ax[s].unpack();
        self.set_acc(d, (lhs + rhs) & !0xFFFF);
    }

    pub fn inc(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.set_acc(d, self.acc(d) + 1);
    }

    pub fn dec(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.set_acc(d, self.acc(d) - 1);
    }

    pub fn incm(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.set_acc(d, self.acc(d) + (1 << 16));
    }

    pub fn decm(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.set_acc(d, self.acc(d) - (1 << 16));
    }

    pub fn neg(&mut self, ins: Ins) {
        let d = ins.base.bit(8) as usize;
        self.set_acc(d, -self.acc(d));
    }

    pub fn abs(&mut self, ins: Ins) {
        let r = ins.base.bit(11) as usize;
        self.set_acc(r, self.acc(r).abs());
    }

    pub fn clr(&mut self, ins: Ins) {
        let r = ins.base.bit(11) as usize;
        self.set_acc(r, 0);
    }

    pub fn clrl(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        self.set_acc(r, round_40(self.acc(r)));
    }

    pub fn cmp(&mut self, _: Ins) {
        self.regs.status.update(self.acc(0) - self.acc(1));
    }

    pub fn cmpar(&mut self, ins: Ins) {
        let s = ins.base.bit(11) as usize;
        let r = ins.base.bit(12) as usize;

        let rhs = (self.regs.ax[r].high as i16 as i64) << 16;
        self.regs.status.update(self.acc(s) - rhs);
    }

    pub fn tst(&mut self, ins: Ins) {
        let r = ins.base.bit(11) as usize;
        self.regs.status.update(self.acc(r));
    }

    pub fn tstaxh(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        self.regs.status.update16(self.regs.ax[r].high as i16);
    }

    pub fn tstprod(&mut self, _: Ins) {
        self.regs.status.update(self.product());
    }

    // ===== multiplication =====

    pub fn clrp(&mut self, _: Ins) {
        self.regs.product = Product {
            low: 0x0000,
            mid1: 0xFFF0,
            high: 0xFF,
            mid2: 0x0010,
        };
    }

    pub fn mulaxh(&mut self, _: Ins) {
        let high = self.regs.ax[0].high;
        self.set_product(self.multiply(high, high));
    }

    fn multiply_aux(&self, s: usize) -> i64 {
        self.multiply_mixed(self.regs.ax[s].low, false, self.regs.ax[s].high, true)
    }

    pub fn mul(&mut self, ins: Ins) {
        let s = ins.base.bit(11) as usize;
        self.set_product(self.multiply_aux(s));
    }

    pub fn mulac(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        let s = ins.base.bit(11) as usize;

        self.set_acc(r, self.acc(r) + self.product());
        self.set_product(self.multiply_aux(s));
    }

    pub fn mulmv(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        let s = ins.base.bit(11) as usize;

        self.set_acc(r, self.product());
        self.set_product(self.multiply_aux(s));
    }

    pub fn mulmvz(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        let s = ins.base.bit(11) as usize;

        self.set_acc(r, round_40(self.product()));
        self.set_product(self.multiply_aux(s));
    }

    fn multiply_cross(&self, ins: Ins) -> i64 {
        let s = ins.base.bit(12);
        let t = ins.base.bit(11);

        let lhs = if s { self.regs.ax[0].high } else { self.regs.ax[0].low };
        let rhs = if t { self.regs.ax[1].high } else { self.regs.ax[1].low };
        self.multiply_mixed(lhs, s, rhs, t)
    }

    pub fn mulx(&mut self, ins: Ins) {
        self.set_product(self.multiply_cross(ins));
    }

    pub fn mulxac(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        self.set_acc(r, self.acc(r) + self.product());
        self.set_product(self.multiply_cross(ins));
    }

    pub fn mulxmv(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        self.set_acc(r, self.product());
        self.set_product(self.multiply_cross(ins));
    }

    pub fn mulxmvz(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        self.set_acc(r, round_40(self.product()));
        self.set_product(self.multiply_cross(ins));
    }

    fn multiply_acc(&self, ins: Ins) -> i64 {
        let s = ins.base.bit(11) as usize;
        let t = ins.base.bit(12) as usize;
        self.multiply(self.regs.acc[s].mid, self.regs.ax[t].high)
    }

    pub fn mulc(&mut self, ins: Ins) {
        self.set_product(self.multiply_acc(ins));
    }

    pub fn mulcac(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        self.set_acc(r, self.acc(r) + self.product());
        self.set_product(self.multiply_acc(ins));
    }

    pub fn mulcmv(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        self.set_acc(r, self.product());
        self.set_product(self.multiply_acc(ins));
    }

    pub fn mulcmvz(&mut self, ins: Ins) {
        let r = ins.base.bit(8) as usize;
        self.set_acc(r, round_40(self.product()));
        self.set_product(self.multiply_acc(ins));
    }

    fn multiply_halves(&self, ins: Ins) -> i64 {
        let s = ins.base.bit(9);
        let t = ins.base.bit(8);

        let lhs = if s { self.regs.ax[0].high } else { self.regs.ax[0].low };
        let rhs = if t { self.regs.ax[1].high } else { self.regs.ax[1].low };
        self.multiply_mixed(lhs, s, rhs, t)
    }

    pub fn maddx(&mut self, ins: Ins) {
        self.set_product(self.product() + self.multiply_halves(ins));
    }

    pub fn msubx(&mut self, ins: Ins) {
        self.set_product(self.product() - self.multiply_halves(ins));
    }

    fn multiply_acc_mid(&self, ins: Ins) -> i64 {
        let s = ins.base.bit(9) as usize;
        let t = ins.base.bit(8) as usize;
        self.multiply(self.regs.acc[s].mid, self.regs.ax[t].high)
    }

    pub fn maddc(&mut self, ins: Ins) {
        self.set_product(self.product() + self.multiply_acc_mid(ins));
    }

    pub fn msubc(&mut self, ins: Ins) {
        self.set_product(self.product() - self.multiply_acc_mid(ins));
    }

    pub fn madd(&mut self, ins: Ins) {
        let s = ins.base.bit(8) as usize;
        self.set_product(self.product() + self.multiply_aux(s));
    }

    pub fn msub(&mut self, ins: Ins) {
        let s = ins.base.bit(8) as usize;
        self.set_product(self.product() - self.multiply_aux(s));
    }

    pub fn unknown(&mut self, ins: Ins) {
        self.unknown_opcodes += 1;
        tracing::warn!(
            "unknown opcode 0x{:04X} at 0x{:04X}",
            ins.base,
            self.pc.wrapping_sub(1)
        );
    }
}

pub(crate) type OpcodeFn = fn(&mut Interpreter, Ins);

pub(crate) static OPCODE_EXEC_LUT: [OpcodeFn; 1 << 8] = {
    use crate::ins::Opcode;

    let mut lut = [Interpreter::unknown as OpcodeFn; 1 << 8];

    lut[Opcode::Abs as usize] = Interpreter::abs as OpcodeFn;
    lut[Opcode::Add as usize] = Interpreter::add as OpcodeFn;
    lut[Opcode::Addarn as usize] = Interpreter::addarn as OpcodeFn;
    lut[Opcode::Addax as usize] = Interpreter::addax as OpcodeFn;
    lut[Opcode::Addaxl as usize] = Interpreter::addaxl as OpcodeFn;
    lut[Opcode::Addi as usize] = Interpreter::addi as OpcodeFn;
    lut[Opcode::Addis as usize] = Interpreter::addis as OpcodeFn;
    lut[Opcode::Addp as usize] = Interpreter::addp as OpcodeFn;
    lut[Opcode::Addpaxz as usize] = Interpreter::addpaxz as OpcodeFn;
    lut[Opcode::Addr as usize] = Interpreter::addr as OpcodeFn;
    lut[Opcode::Andc as usize] = Interpreter::andc as OpcodeFn;
    lut[Opcode::Andcf as usize] = Interpreter::andcf as OpcodeFn;
    lut[Opcode::Andf as usize] = Interpreter::andf as OpcodeFn;
    lut[Opcode::Andi as usize] = Interpreter::andi as OpcodeFn;
    lut[Opcode::Andr as usize] = Interpreter::andr as OpcodeFn;
    lut[Opcode::Asl as usize] = Interpreter::asl as OpcodeFn;
    lut[Opcode::Asr as usize] = Interpreter::asr as OpcodeFn;
    lut[Opcode::Asr16 as usize] = Interpreter::asr16 as OpcodeFn;
    lut[Opcode::Asrn as usize] = Interpreter::asrn as OpcodeFn;
    lut[Opcode::Asrnr as usize] = Interpreter::asrnr as OpcodeFn;
    lut[Opcode::Asrnrx as usize] = Interpreter::asrnrx as OpcodeFn;
    lut[Opcode::Bloop as usize] = Interpreter::bloop as OpcodeFn;
    lut[Opcode::Bloopi as usize] = Interpreter::bloopi as OpcodeFn;
    lut[Opcode::Call as usize] = Interpreter::call as OpcodeFn;
    lut[Opcode::Callr as usize] = Interpreter::callr as OpcodeFn;
    lut[Opcode::Clr as usize] = Interpreter::clr as OpcodeFn;
    lut[Opcode::Clr15 as usize] = Interpreter::clr15 as OpcodeFn;
    lut[Opcode::Clrl as usize] = Interpreter::clrl as OpcodeFn;
    lut[Opcode::Clrp as usize] = Interpreter::clrp as OpcodeFn;
    lut[Opcode::Cmp as usize] = Interpreter::cmp as OpcodeFn;
    lut[Opcode::Cmpar as usize] = Interpreter::cmpar as OpcodeFn;
    lut[Opcode::Cmpi as usize] = Interpreter::cmpi as OpcodeFn;
    lut[Opcode::Cmpis as usize] = Interpreter::cmpis as OpcodeFn;
    lut[Opcode::Dar as usize] = Interpreter::dar as OpcodeFn;
    lut[Opcode::Dec as usize] = Interpreter::dec as OpcodeFn;
    lut[Opcode::Decm as usize] = Interpreter::decm as OpcodeFn;
    lut[Opcode::Halt as usize] = Interpreter::halt as OpcodeFn;
    lut[Opcode::Iar as usize] = Interpreter::iar as OpcodeFn;
    lut[Opcode::If as usize] = Interpreter::ifcc as OpcodeFn;
    lut[Opcode::Ilrr as usize] = Interpreter::ilrr as OpcodeFn;
    lut[Opcode::Ilrrd as usize] = Interpreter::ilrrd as OpcodeFn;
    lut[Opcode::Ilrri as usize] = Interpreter::ilrri as OpcodeFn;
    lut[Opcode::Ilrrn as usize] = Interpreter::ilrrn as OpcodeFn;
    lut[Opcode::Inc as usize] = Interpreter::inc as OpcodeFn;
    lut[Opcode::Incm as usize] = Interpreter::incm as OpcodeFn;
    lut[Opcode::Jmp as usize] = Interpreter::jmp as OpcodeFn;
    lut[Opcode::Jr as usize] = Interpreter::jr as OpcodeFn;
    lut[Opcode::Loop as usize] = Interpreter::loop_ as OpcodeFn;
    lut[Opcode::Loopi as usize] = Interpreter::loopi as OpcodeFn;
    lut[Opcode::Lr as usize] = Interpreter::lr as OpcodeFn;
    lut[Opcode::Lri as usize] = Interpreter::lri as OpcodeFn;
    lut[Opcode::Lris as usize] = Interpreter::lris as OpcodeFn;
    lut[Opcode::Lrr as usize] = Interpreter::lrr as OpcodeFn;
    lut[Opcode::Lrrd as usize] = Interpreter::lrrd as OpcodeFn;
    lut[Opcode::Lrri as usize] = Interpreter::lrri as OpcodeFn;
    lut[Opcode::Lrrn as usize] = Interpreter::lrrn as OpcodeFn;
    lut[Opcode::Lrs as usize] = Interpreter::lrs as OpcodeFn;
    lut[Opcode::Lsl as usize] = Interpreter::lsl as OpcodeFn;
    lut[Opcode::Lsl16 as usize] = Interpreter::lsl16 as OpcodeFn;
    lut[Opcode::Lsr as usize] = Interpreter::lsr as OpcodeFn;
    lut[Opcode::Lsr16 as usize] = Interpreter::lsr16 as OpcodeFn;
    lut[Opcode::Lsrn as usize] = Interpreter::lsrn as OpcodeFn;
    lut[Opcode::Lsrnr as usize] = Interpreter::lsrnr as OpcodeFn;
    lut[Opcode::Lsrnrx as usize] = Interpreter::lsrnrx as OpcodeFn;
    lut[Opcode::M0 as usize] = Interpreter::m0 as OpcodeFn;
    lut[Opcode::M2 as usize] = Interpreter::m2 as OpcodeFn;
    lut[Opcode::Madd as usize] = Interpreter::madd as OpcodeFn;
    lut[Opcode::Maddc as usize] = Interpreter::maddc as OpcodeFn;
    lut[Opcode::Maddx as usize] = Interpreter::maddx as OpcodeFn;
    lut[Opcode::Mov as usize] = Interpreter::mov as OpcodeFn;
    lut[Opcode::Movax as usize] = Interpreter::movax as OpcodeFn;
    lut[Opcode::Movnp as usize] = Interpreter::movnp as OpcodeFn;
    lut[Opcode::Movp as usize] = Interpreter::movp as OpcodeFn;
    lut[Opcode::Movpz as usize] = Interpreter::movpz as OpcodeFn;
    lut[Opcode::Movr as usize] = Interpreter::movr as OpcodeFn;
    lut[Opcode::Mrr as usize] = Interpreter::mrr as OpcodeFn;
    lut[Opcode::Msub as usize] = Interpreter::msub as OpcodeFn;
    lut[Opcode::Msubc as usize] = Interpreter::msubc as OpcodeFn;
    lut[Opcode::Msubx as usize] = Interpreter::msubx as OpcodeFn;
    lut[Opcode::Mul as usize] = Interpreter::mul as OpcodeFn;
    lut[Opcode::Mulac as usize] = Interpreter::mulac as OpcodeFn;
    lut[Opcode::Mulaxh as usize] = Interpreter::mulaxh as OpcodeFn;
    lut[Opcode::Mulc as usize] = Interpreter::mulc as OpcodeFn;
    lut[Opcode::Mulcac as usize] = Interpreter::mulcac as OpcodeFn;
    lut[Opcode::Mulcmv as usize] = Interpreter::mulcmv as OpcodeFn;
    lut[Opcode::Mulcmvz as usize] = Interpreter::mulcmvz as OpcodeFn;
    lut[Opcode::Mulmv as usize] = Interpreter::mulmv as OpcodeFn;
    lut[Opcode::Mulmvz as usize] = Interpreter::mulmvz as OpcodeFn;
    lut[Opcode::Mulx as usize] = Interpreter::mulx as OpcodeFn;
    lut[Opcode::Mulxac as usize] = Interpreter::mulxac as OpcodeFn;
    lut[Opcode::Mulxmv as usize] = Interpreter::mulxmv as OpcodeFn;
    lut[Opcode::Mulxmvz as usize] = Interpreter::mulxmvz as OpcodeFn;
    lut[Opcode::Neg as usize] = Interpreter::neg as OpcodeFn;
    lut[Opcode::Nop as usize] = Interpreter::nop as OpcodeFn;
    lut[Opcode::Not as usize] = Interpreter::not as OpcodeFn;
    lut[Opcode::Nx as usize] = Interpreter::nop as OpcodeFn;
    lut[Opcode::Orc as usize] = Interpreter::orc as OpcodeFn;
    lut[Opcode::Ori as usize] = Interpreter::ori as OpcodeFn;
    lut[Opcode::Orr as usize] = Interpreter::orr as OpcodeFn;
    lut[Opcode::Ret as usize] = Interpreter::ret as OpcodeFn;
    lut[Opcode::Rti as usize] = Interpreter::rti as OpcodeFn;
    lut[Opcode::Sbclr as usize] = Interpreter::sbclr as OpcodeFn;
    lut[Opcode::Sbset as usize] = Interpreter::sbset as OpcodeFn;
    lut[Opcode::Set15 as usize] = Interpreter::set15 as OpcodeFn;
    lut[Opcode::Set16 as usize] = Interpreter::set16 as OpcodeFn;
    lut[Opcode::Set40 as usize] = Interpreter::set40 as OpcodeFn;
    lut[Opcode::Si as usize] = Interpreter::si as OpcodeFn;
    lut[Opcode::Sr as usize] = Interpreter::sr as OpcodeFn;
    lut[Opcode::Srr as usize] = Interpreter::srr as OpcodeFn;
    lut[Opcode::Srrd as usize] = Interpreter::srrd as OpcodeFn;
    lut[Opcode::Srri as usize] = Interpreter::srri as OpcodeFn;
    lut[Opcode::Srrn as usize] = Interpreter::srrn as OpcodeFn;
    lut[Opcode::Srs as usize] = Interpreter::srs as OpcodeFn;
    lut[Opcode::Sub as usize] = Interpreter::sub as OpcodeFn;
    lut[Opcode::Subarn as usize] = Interpreter::subarn as OpcodeFn;
    lut[Opcode::Subax as usize] = Interpreter::subax as OpcodeFn;
    lut[Opcode::Subp as usize] = Interpreter::subp as OpcodeFn;
    lut[Opcode::Subr as usize] = Interpreter::subr as OpcodeFn;
    lut[Opcode::Tst as usize] = Interpreter::tst as OpcodeFn;
    lut[Opcode::Tstaxh as usize] = Interpreter::tstaxh as OpcodeFn;
    lut[Opcode::Tstprod as usize] = Interpreter::tstprod as OpcodeFn;
    lut[Opcode::Xorc as usize] = Interpreter::xorc as OpcodeFn;
    lut[Opcode::Xori as usize] = Interpreter::xori as OpcodeFn;
    lut[Opcode::Xorr as usize] = Interpreter::xorr as OpcodeFn;
    lut[Opcode::Unknown as usize] = Interpreter::unknown as OpcodeFn;

    lut
};
