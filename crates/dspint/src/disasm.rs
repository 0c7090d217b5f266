//! Instruction disassembly.
use std::fmt::Write as _;

use crate::hw;
use crate::ins::{Ins, Param, ParamKind};
use crate::regs::Reg;
use crate::symbols::SymbolMap;

/// Renders instructions as text.
#[derive(Debug, Clone)]
pub struct Disassembler {
    /// Prefix each line with the address of the instruction.
    pub show_pc: bool,
    /// Prefix each line with the raw instruction words.
    pub show_hex: bool,
    /// Separates the mnemonic of an instruction from the one of its extension.
    pub ext_separator: char,
}

impl Default for Disassembler {
    fn default() -> Self {
        Self {
            show_pc: false,
            show_hex: false,
            ext_separator: '\'',
        }
    }
}

fn reg_name(index: u16) -> String {
    match index {
        0x20 => "$ACC0".to_owned(),
        0x21 => "$ACC1".to_owned(),
        0x22 => "$AX0".to_owned(),
        0x23 => "$AX1".to_owned(),
        _ => format!("${}", Reg::new(index as u8).name()),
    }
}

fn data_address(addr: u16) -> String {
    match hw::label(addr) {
        Some(label) => format!("@{label}"),
        None => format!("@0x{addr:04x}"),
    }
}

fn operand(param: &Param, ins: Ins, symbols: Option<&SymbolMap>) -> String {
    let value = param.extract(ins);
    match param.kind {
        ParamKind::Reg(base) => reg_name(base as u16 + value),
        ParamKind::RegOther(base) => reg_name(base as u16 + (value ^ 1)),
        ParamKind::Prg => format!("@$AR{value}"),
        ParamKind::Imm if param.is_wide() => format!("#0x{value:04x}"),
        ParamKind::Imm => format!("#0x{value:02x}"),
        ParamKind::Mem => data_address(value),
        ParamKind::MemShort => data_address(value as u8 as i8 as u16),
        ParamKind::Addr => match symbols.and_then(|s| s.lookup(value)) {
            Some(symbol) => symbol.name.clone(),
            None => format!("0x{value:04x}"),
        },
    }
}

fn operands(params: &[Param], ins: Ins, symbols: Option<&SymbolMap>) -> String {
    params
        .iter()
        .map(|p| operand(p, ins, symbols))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Disassembler {
    /// Disassembles the instruction at the start of `words`, located at `pc`. Returns the text and
    /// the length of the instruction in words.
    pub fn disassemble(
        &self,
        words: &[u16],
        pc: u16,
        symbols: Option<&SymbolMap>,
    ) -> (String, u16) {
        let base = words.first().copied().unwrap_or_default();
        let decoded = Ins::new(base).decoded();
        let len = decoded.len();
        let ins = if decoded.needs_extra() {
            Ins::with_extra(base, words.get(1).copied().unwrap_or_default())
        } else {
            Ins::new(base)
        };

        let mut text = String::new();
        if self.show_pc {
            _ = write!(text, "{pc:04x} ");
        }

        if self.show_hex {
            if len == 2 {
                _ = write!(text, "{:04x} {:04x} ", ins.base, ins.extra);
            } else {
                _ = write!(text, "{:04x}      ", ins.base);
            }
        }

        let Some(descriptor) = decoded.descriptor else {
            _ = write!(text, "CW 0x{base:04x}\t; *** UNKNOWN OPCODE ***");
            return (text, len);
        };

        text.push_str(&descriptor.mnemonic(base));
        if let Some(extension) = decoded.extension {
            text.push(self.ext_separator);
            text.push_str(extension.name);
        }

        let main = operands(descriptor.params, ins, symbols);
        if !main.is_empty() {
            text.push('\t');
            text.push_str(&main);
        }

        if let Some(extension) = decoded.extension {
            let ext = operands(extension.params, ins, symbols);
            if !ext.is_empty() {
                text.push_str(" : ");
                text.push_str(&ext);
            }
        }

        (text, len)
    }

    /// Disassembles every instruction in `words`, the first of which is located at `base`, one
    /// per line.
    pub fn disassemble_all(
        &self,
        words: &[u16],
        base: u16,
        symbols: Option<&SymbolMap>,
        out: &mut impl std::io::Write,
    ) -> std::io::Result<()> {
        let mut offset = 0;
        while offset < words.len() {
            let pc = base.wrapping_add(offset as u16);
            if let Some(symbol) = symbols.and_then(|s| s.lookup(pc))
                && symbol.start == pc
            {
                writeln!(out, "// {}", symbol.name)?;
            }

            let (text, len) = self.disassemble(&words[offset..], pc, symbols);
            writeln!(out, "{text}")?;
            offset += len as usize;
        }

        Ok(())
    }
}
