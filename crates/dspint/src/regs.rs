//! The DSP register file.

use bitos::{BitUtils, bitos};
use strum::{IntoStaticStr, VariantArray};
use tinyvec::ArrayVec;

use crate::ins::Cond;

/// A 40-bit accumulator, stored as the three hardware registers that make it up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Acc40 {
    pub low: u16,
    pub mid: u16,
    pub high: u8,
}

impl Acc40 {
    pub const MIN: i64 = (1 << 63) >> 24;
    pub const MAX: i64 = !Self::MIN;

    /// Packs the low 40 bits of `value`.
    #[inline(always)]
    pub fn pack(value: i64) -> Self {
        Self {
            low: value.bits(0, 16) as u16,
            mid: value.bits(16, 32) as u16,
            high: value.bits(32, 40) as u8,
        }
    }

    /// Returns the value of this accumulator, sign extended from bit 39.
    #[inline(always)]
    pub fn unpack(&self) -> i64 {
        let bits = 0i64
            .with_bits(0, 16, self.low as i64)
            .with_bits(16, 32, self.mid as i64)
            .with_bits(32, 40, self.high as i64);

        (bits << 24) >> 24
    }

    /// Sets the value of this accumulator and returns it as it was stored.
    #[inline(always)]
    pub fn set(&mut self, value: i64) -> i64 {
        *self = Self::pack(value);
        self.unpack()
    }

    /// The high register as seen by the program, sign extended from its low byte.
    #[inline(always)]
    pub fn high_reg(&self) -> u16 {
        self.high as i8 as i16 as u16
    }
}

/// A 32-bit auxiliary accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aux32 {
    pub low: u16,
    pub high: u16,
}

impl Aux32 {
    #[inline(always)]
    pub fn pack(value: i64) -> Self {
        Self {
            low: value as u16,
            high: (value >> 16) as u16,
        }
    }

    #[inline(always)]
    pub fn unpack(&self) -> i64 {
        ((self.high as i16 as i64) << 16) | self.low as i64
    }
}

/// The product register. The middle part is split in two halves which are added together when
/// the product is read, carrying into the high part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Product {
    pub low: u16,
    pub mid1: u16,
    pub high: u8,
    pub mid2: u16,
}

impl Product {
    #[inline(always)]
    pub fn pack(value: i64) -> Self {
        Self {
            low: value as u16,
            mid1: (value >> 16) as u16,
            high: (value >> 32) as u8,
            mid2: 0,
        }
    }

    pub fn unpack(&self) -> i64 {
        let (mid, carry) = self.mid1.overflowing_add(self.mid2);
        let high = self.high.wrapping_add(carry as u8);

        let bits = 0i64
            .with_bits(0, 16, self.low as i64)
            .with_bits(16, 32, mid as i64)
            .with_bits(32, 40, high as i64);

        (bits << 24) >> 24
    }
}

#[bitos(16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    #[bits(0)]
    pub carry: bool,
    #[bits(1)]
    pub overflow: bool,
    #[bits(2)]
    pub arithmetic_zero: bool,
    #[bits(3)]
    pub sign: bool,
    #[bits(4)]
    pub above_s32: bool,
    #[bits(5)]
    pub top_bits_clear: bool,
    #[bits(6)]
    pub logic_zero: bool,
    #[bits(7)]
    pub overflow_fused: bool,
    #[bits(9)]
    pub interrupt_enable: bool,
    #[bits(11)]
    pub external_interrupt_enable: bool,
    #[bits(13)]
    pub dont_double_result: bool,
    #[bits(14)]
    pub sign_extend_to_40: bool,
    #[bits(15)]
    pub unsigned_mul: bool,
}

impl Default for Status {
    fn default() -> Self {
        Self::from_bits(0)
            .with_interrupt_enable(true)
            .with_external_interrupt_enable(true)
    }
}

impl Status {
    fn clear_flags(&mut self) {
        *self = Self::from_bits(self.to_bits().with_bits(0, 6, 0));
    }

    /// Recomputes the comparison flags from a (40-bit) result.
    pub fn update(&mut self, value: i64) {
        self.clear_flags();
        self.set_sign(value < 0);
        self.set_arithmetic_zero(value == 0);
        self.set_top_bits_clear(value >> 62 == 0);
    }

    /// Recomputes the comparison flags from a 16-bit result.
    pub fn update16(&mut self, value: i16) {
        self.clear_flags();
        self.set_sign(value < 0);
        self.set_arithmetic_zero(value == 0);
        self.set_top_bits_clear(value >> 14 == 0);
    }

    /// Evaluates a condition against these flags. Conditions without a known meaning never hold.
    pub fn condition(&self, cond: Cond) -> bool {
        match cond {
            Cond::GreaterOrEqual => !self.overflow() && !self.sign(),
            Cond::Less => !self.overflow() && self.sign(),
            Cond::Greater => !self.sign(),
            Cond::LessOrEqual => self.overflow() || self.arithmetic_zero() || self.sign(),
            Cond::NotZero => !self.arithmetic_zero(),
            Cond::Zero => self.arithmetic_zero(),
            Cond::NotLogicZero => !self.logic_zero(),
            Cond::LogicZero => self.logic_zero(),
            Cond::Always => true,
            Cond::NotCarry
            | Cond::Carry
            | Cond::Unknown8
            | Cond::Unknown9
            | Cond::UnknownA
            | Cond::UnknownB
            | Cond::Overflow => false,
        }
    }

    /// Factor applied to multiplication results.
    #[inline(always)]
    pub fn multiplier(&self) -> i64 {
        if self.dont_double_result() { 1 } else { 2 }
    }
}

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, VariantArray, IntoStaticStr)]
#[repr(u8)]
pub enum Reg {
    #[strum(serialize = "AR0")] Addr0,
    #[strum(serialize = "AR1")] Addr1,
    #[strum(serialize = "AR2")] Addr2,
    #[strum(serialize = "AR3")] Addr3,
    #[strum(serialize = "IX0")] Index0,
    #[strum(serialize = "IX1")] Index1,
    #[strum(serialize = "IX2")] Index2,
    #[strum(serialize = "IX3")] Index3,
    #[strum(serialize = "WR0")] Wrap0,
    #[strum(serialize = "WR1")] Wrap1,
    #[strum(serialize = "WR2")] Wrap2,
    #[strum(serialize = "WR3")] Wrap3,
    #[strum(serialize = "ST0")] CallStack,
    #[strum(serialize = "ST1")] DataStack,
    #[strum(serialize = "ST2")] LoopStack,
    #[strum(serialize = "ST3")] LoopCount,
    #[strum(serialize = "AC0.H")] AccHigh0,
    #[strum(serialize = "AC1.H")] AccHigh1,
    #[strum(serialize = "CR")] Config,
    #[strum(serialize = "SR")] Status,
    #[strum(serialize = "PROD.L")] ProdLow,
    #[strum(serialize = "PROD.M1")] ProdMid1,
    #[strum(serialize = "PROD.H")] ProdHigh,
    #[strum(serialize = "PROD.M2")] ProdMid2,
    #[strum(serialize = "AX0.L")] AuxLow0,
    #[strum(serialize = "AX1.L")] AuxLow1,
    #[strum(serialize = "AX0.H")] AuxHigh0,
    #[strum(serialize = "AX1.H")] AuxHigh1,
    #[strum(serialize = "AC0.L")] AccLow0,
    #[strum(serialize = "AC1.L")] AccLow1,
    #[strum(serialize = "AC0.M")] AccMid0,
    #[strum(serialize = "AC1.M")] AccMid1,
}

impl Reg {
    /// Returns the register with the given index. Only the low 5 bits are considered.
    #[inline(always)]
    pub fn new(index: u8) -> Self {
        Self::VARIANTS[(index & 0x1F) as usize]
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    /// The stack this register aliases, if any.
    pub fn stack(self) -> Option<StackId> {
        match self {
            Self::CallStack => Some(StackId::Call),
            Self::DataStack => Some(StackId::Data),
            Self::LoopStack => Some(StackId::LoopAddress),
            Self::LoopCount => Some(StackId::LoopCounter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackId {
    Call,
    Data,
    LoopAddress,
    LoopCounter,
}

/// A fixed-depth hardware stack.
#[derive(Debug, Clone)]
pub struct Stack {
    name: &'static str,
    depth: usize,
    entries: ArrayVec<[u16; 8]>,
}

impl Stack {
    fn new(name: &'static str, depth: usize) -> Self {
        debug_assert!(depth <= 8);
        Self {
            name,
            depth,
            entries: ArrayVec::new(),
        }
    }

    /// Pushes a value. A full stack drops it.
    pub fn push(&mut self, value: u16) {
        if self.entries.len() >= self.depth {
            tracing::warn!("{} stack overflow, dropping 0x{value:04X}", self.name);
            return;
        }

        self.entries.push(value);
    }

    /// Pops a value. An empty stack yields zero.
    pub fn pop(&mut self) -> u16 {
        self.entries.pop().unwrap_or_else(|| {
            tracing::warn!("{} stack underflow", self.name);
            0
        })
    }

    /// The top of the stack, or zero if it is empty.
    #[inline(always)]
    pub fn top(&self) -> u16 {
        self.entries.last().copied().unwrap_or_default()
    }

    #[inline(always)]
    pub fn top_mut(&mut self) -> Option<&mut u16> {
        self.entries.last_mut()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[u16] {
        &self.entries
    }
}

#[derive(Debug, Clone)]
pub struct StackSet {
    pub call: Stack,
    pub data: Stack,
    pub loop_address: Stack,
    pub loop_counter: Stack,
}

impl Default for StackSet {
    fn default() -> Self {
        Self {
            call: Stack::new("call", 8),
            data: Stack::new("data", 4),
            loop_address: Stack::new("loop address", 4),
            loop_counter: Stack::new("loop counter", 4),
        }
    }
}

impl std::ops::Index<StackId> for StackSet {
    type Output = Stack;

    fn index(&self, index: StackId) -> &Self::Output {
        match index {
            StackId::Call => &self.call,
            StackId::Data => &self.data,
            StackId::LoopAddress => &self.loop_address,
            StackId::LoopCounter => &self.loop_counter,
        }
    }
}

impl std::ops::IndexMut<StackId> for StackSet {
    fn index_mut(&mut self, index: StackId) -> &mut Self::Output {
        match index {
            StackId::Call => &mut self.call,
            StackId::Data => &mut self.data,
            StackId::LoopAddress => &mut self.loop_address,
            StackId::LoopCounter => &mut self.loop_counter,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registers {
    pub addressing: [u16; 4],
    pub indexing: [u16; 4],
    pub wrapping: [u16; 4],
    pub stacks: StackSet,
    pub acc: [Acc40; 2],
    pub ax: [Aux32; 2],
    pub product: Product,
    pub config: u8,
    pub status: Status,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            addressing: Default::default(),
            indexing: Default::default(),
            wrapping: [0xFFFF; 4],
            stacks: Default::default(),
            acc: Default::default(),
            ax: Default::default(),
            product: Default::default(),
            config: Default::default(),
            status: Default::default(),
        }
    }
}

impl Registers {
    /// Middle part of an accumulator as read by the program. In 40-bit mode, accumulators that
    /// do not fit in 32 bits saturate.
    fn acc_mid_saturated(&self, i: usize) -> u16 {
        let full = self.acc[i].unpack();
        let truncated = full as i32 as i64;

        if self.status.sign_extend_to_40() && truncated != full {
            if full >= 0 { 0x7FFF } else { 0x8000 }
        } else {
            self.acc[i].mid
        }
    }

    /// Writes the middle part of an accumulator. In 40-bit mode, the whole accumulator is
    /// loaded with the sign extended value.
    fn set_acc_mid(&mut self, i: usize, value: u16) {
        if self.status.sign_extend_to_40() {
            self.acc[i] = Acc40 {
                low: 0,
                mid: value,
                high: if value.bit(15) { !0 } else { 0 },
            };
        } else {
            self.acc[i].mid = value;
        }
    }

    /// Reads a register without side effects: stack registers return their top.
    pub fn peek(&self, reg: Reg) -> u16 {
        match reg {
            Reg::Addr0 => self.addressing[0],
            Reg::Addr1 => self.addressing[1],
            Reg::Addr2 => self.addressing[2],
            Reg::Addr3 => self.addressing[3],
            Reg::Index0 => self.indexing[0],
            Reg::Index1 => self.indexing[1],
            Reg::Index2 => self.indexing[2],
            Reg::Index3 => self.indexing[3],
            Reg::Wrap0 => self.wrapping[0],
            Reg::Wrap1 => self.wrapping[1],
            Reg::Wrap2 => self.wrapping[2],
            Reg::Wrap3 => self.wrapping[3],
            Reg::CallStack => self.stacks.call.top(),
            Reg::DataStack => self.stacks.data.top(),
            Reg::LoopStack => self.stacks.loop_address.top(),
            Reg::LoopCount => self.stacks.loop_counter.top(),
            Reg::AccHigh0 => self.acc[0].high_reg(),
            Reg::AccHigh1 => self.acc[1].high_reg(),
            Reg::Config => self.config as u16,
            Reg::Status => self.status.to_bits(),
            Reg::ProdLow => self.product.low,
            Reg::ProdMid1 => self.product.mid1,
            Reg::ProdHigh => self.product.high as u16,
            Reg::ProdMid2 => self.product.mid2,
            Reg::AuxLow0 => self.ax[0].low,
            Reg::AuxLow1 => self.ax[1].low,
            Reg::AuxHigh0 => self.ax[0].high,
            Reg::AuxHigh1 => self.ax[1].high,
            Reg::AccLow0 => self.acc[0].low,
            Reg::AccLow1 => self.acc[1].low,
            Reg::AccMid0 => self.acc_mid_saturated(0),
            Reg::AccMid1 => self.acc_mid_saturated(1),
        }
    }

    /// Reads a register as an instruction does: stack registers are popped.
    pub fn read(&mut self, reg: Reg) -> u16 {
        match reg.stack() {
            Some(stack) => self.stacks[stack].pop(),
            None => self.peek(reg),
        }
    }

    /// Writes a register as an instruction does: stack registers are pushed.
    pub fn write(&mut self, reg: Reg, value: u16) {
        match reg {
            Reg::Addr0 => self.addressing[0] = value,
            Reg::Addr1 => self.addressing[1] = value,
            Reg::Addr2 => self.addressing[2] = value,
            Reg::Addr3 => self.addressing[3] = value,
            Reg::Index0 => self.indexing[0] = value,
            Reg::Index1 => self.indexing[1] = value,
            Reg::Index2 => self.indexing[2] = value,
            Reg::Index3 => self.indexing[3] = value,
            Reg::Wrap0 => self.wrapping[0] = value,
            Reg::Wrap1 => self.wrapping[1] = value,
            Reg::Wrap2 => self.wrapping[2] = value,
            Reg::Wrap3 => self.wrapping[3] = value,
            Reg::CallStack => self.stacks.call.push(value),
            Reg::DataStack => self.stacks.data.push(value),
            Reg::LoopStack => self.stacks.loop_address.push(value),
            Reg::LoopCount => self.stacks.loop_counter.push(value),
            Reg::AccHigh0 => self.acc[0].high = value as u8,
            Reg::AccHigh1 => self.acc[1].high = value as u8,
            Reg::Config => self.config = value as u8,
            Reg::Status => self.status = Status::from_bits(value.with_bit(8, false)),
            Reg::ProdLow => self.product.low = value,
            Reg::ProdMid1 => self.product.mid1 = value,
            Reg::ProdHigh => self.product.high = value as u8,
            Reg::ProdMid2 => self.product.mid2 = value,
            Reg::AuxLow0 => self.ax[0].low = value,
            Reg::AuxLow1 => self.ax[1].low = value,
            Reg::AuxHigh0 => self.ax[0].high = value,
            Reg::AuxHigh1 => self.ax[1].high = value,
            Reg::AccLow0 => self.acc[0].low = value,
            Reg::AccLow1 => self.acc[1].low = value,
            Reg::AccMid0 => self.set_acc_mid(0, value),
            Reg::AccMid1 => self.set_acc_mid(1, value),
        }
    }

    /// Adds `value` to an address register, wrapping around the modulo buffer described by the
    /// matching wrap register.
    pub fn add_to_addressing(&mut self, index: usize, value: u16, zero_is_positive: bool) {
        let ar = self.addressing[index];
        let wrap = self.wrapping[index];

        // amount of significant bits in the wrap register, minimum 1
        let n = (16 - wrap.leading_zeros()).max(1);
        let mask = 1u16.checked_shl(n).map(|r| r - 1).unwrap_or(!0);

        // carry out of bit n
        let carry = ((ar & mask) as u32 + (value & mask) as u32) > mask as u32;

        let mut result = ar.wrapping_add(value);
        if value as i16 > 0 || (zero_is_positive && value == 0) {
            if carry {
                result = result.wrapping_sub(wrap.wrapping_add(1));
            }
        } else {
            let low_sum = result & mask;
            let not_low_wrap = !wrap & mask;
            let carry_again = low_sum < not_low_wrap;

            if !carry || carry_again {
                result = result.wrapping_add(wrap.wrapping_add(1));
            }
        }

        self.addressing[index] = result;
    }

    #[inline(always)]
    pub fn increment_addressing(&mut self, index: usize) {
        self.add_to_addressing(index, 1, false);
    }

    #[inline(always)]
    pub fn decrement_addressing(&mut self, index: usize) {
        self.add_to_addressing(index, -1i16 as u16, false);
    }

    /// Adds the matching index register to an address register.
    #[inline(always)]
    pub fn index_addressing(&mut self, index: usize) {
        self.add_to_addressing(index, self.indexing[index], true);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn acc40_round_trips() {
        for value in [
            0,
            1,
            -1,
            0x7F_FFFF_FFFF,
            -0x80_0000_0000,
            0x12_3456_789A,
            -0x12_3456_789A,
            Acc40::MIN,
            Acc40::MAX,
        ] {
            assert_eq!(Acc40::pack(value).unpack(), value, "{value:X}");
        }
    }

    #[test]
    fn acc40_truncates() {
        // bit 40 and above are lost, bit 39 becomes the sign
        assert_eq!(Acc40::pack(0x80_0000_0000).unpack(), -0x80_0000_0000);
        assert_eq!(Acc40::pack(0x1_00_0000_0001).unpack(), 1);

        let acc = Acc40::pack(-2);
        assert_eq!(acc.high, 0xFF);
        assert_eq!(acc.high_reg(), 0xFFFF);
    }

    #[test]
    fn aux32_sign_extends() {
        let ax = Aux32 {
            low: 0x0001,
            high: 0x8000,
        };
        assert_eq!(ax.unpack(), -0x7FFF_FFFF);
        assert_eq!(Aux32::pack(ax.unpack()), ax);
    }

    #[test]
    fn product_carries_middle_halves() {
        let product = Product {
            low: 0x0000,
            mid1: 0xFFF0,
            high: 0x00,
            mid2: 0x0010,
        };
        assert_eq!(product.unpack(), 0x1_0000_0000);

        let product = Product::pack(-0x1234);
        assert_eq!(product.unpack(), -0x1234);
    }

    #[test]
    fn status_update() {
        let mut status = Status::default().with_carry(true).with_overflow(true);

        status.update(0);
        assert!(status.arithmetic_zero());
        assert!(status.top_bits_clear());
        assert!(!status.sign());
        assert!(!status.carry());
        assert!(!status.overflow());

        status.update(-5);
        assert!(status.sign());
        assert!(!status.arithmetic_zero());
        assert!(!status.top_bits_clear());

        status.update16(0x4000);
        assert!(!status.top_bits_clear());
        status.update16(0x3FFF);
        assert!(status.top_bits_clear());

        // enable bits are not flags
        assert!(status.interrupt_enable());
    }

    #[test]
    fn conditions_with_only_zero_set() {
        let status = Status::from_bits(0).with_arithmetic_zero(true);
        assert!(!status.condition(Cond::NotZero));
        assert!(status.condition(Cond::Zero));
        assert!(status.condition(Cond::Always));
        assert!(status.condition(Cond::LessOrEqual));
    }

    #[test]
    fn conditions_with_only_logic_zero_set() {
        let status = Status::from_bits(0).with_logic_zero(true);
        assert!(status.condition(Cond::new(0x4)));
        assert!(!status.condition(Cond::new(0x5)));
        assert!(status.condition(Cond::LogicZero));
        assert!(!status.condition(Cond::NotLogicZero));
    }

    #[test]
    fn always_holds_for_any_status() {
        for bits in [0x0000, 0xFFFF, 0x00FF, 0x8A5A] {
            assert!(Status::from_bits(bits).condition(Cond::Always));
        }
    }

    #[test]
    fn undefined_conditions_are_currently_false() {
        // unspecified, currently false
        for bits in [0x0000, 0xFFFF] {
            let status = Status::from_bits(bits);
            for code in [0x6, 0x7, 0x8, 0x9, 0xA, 0xB, 0xE] {
                assert!(!status.condition(Cond::new(code)), "{code:X}");
            }
        }
    }

    #[test]
    fn register_names() {
        assert_eq!(Reg::new(0x00).name(), "AR0");
        assert_eq!(Reg::new(0x13).name(), "SR");
        assert_eq!(Reg::new(0x1F).name(), "AC1.M");
        assert_eq!(Reg::new(0x3E), Reg::AccMid0);
    }

    #[test]
    fn stack_registers_push_and_pop() {
        let mut regs = Registers::default();
        regs.write(Reg::DataStack, 0x1234);
        regs.write(Reg::DataStack, 0x5678);
        assert_eq!(regs.peek(Reg::DataStack), 0x5678);
        assert_eq!(regs.read(Reg::DataStack), 0x5678);
        assert_eq!(regs.read(Reg::DataStack), 0x1234);
        assert_eq!(regs.read(Reg::DataStack), 0);
    }

    #[test]
    fn stack_overflow_drops() {
        let mut stack = Stack::new("test", 4);
        for i in 0..6 {
            stack.push(i);
        }

        assert_eq!(stack.len(), 4);
        assert_eq!(stack.top(), 3);
    }

    #[test]
    fn acc_mid_in_40_bit_mode() {
        let mut regs = Registers::default();
        regs.status.set_sign_extend_to_40(true);

        regs.write(Reg::AccMid0, 0x8000);
        assert_eq!(regs.acc[0].unpack(), -0x8000_0000);

        regs.acc[1].set(0x1_0000_0000);
        assert_eq!(regs.peek(Reg::AccMid1), 0x7FFF);

        regs.status.set_sign_extend_to_40(false);
        assert_eq!(regs.peek(Reg::AccMid1), 0x0000);
    }

    #[test]
    fn addressing_wraps() {
        let mut regs = Registers::default();
        regs.wrapping[0] = 0x000F;
        regs.addressing[0] = 0x100F;

        regs.increment_addressing(0);
        assert_eq!(regs.addressing[0], 0x1000);

        regs.decrement_addressing(0);
        assert_eq!(regs.addressing[0], 0x100F);

        // no wrapping with the default wrap register
        regs.addressing[1] = 0xFFFF;
        regs.increment_addressing(1);
        assert_eq!(regs.addressing[1], 0x0000);
    }
}
