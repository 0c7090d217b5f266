//! Instruction encoding: opcode and extension tables and the decoder built on top of them.
//!
//! Decoding is two-level: the top nibble of the instruction word selects an instruction class,
//! and the class is then searched for the first entry whose masked pattern matches. Instructions
//! marked as extended carry a second, fused micro-operation in their low bits, decoded through
//! [`EXTENSIONS`].

use bitos::BitUtils;

/// A branch/conditional execution condition, encoded in the low nibble of conditional opcodes.
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    GreaterOrEqual = 0x0,
    Less           = 0x1,
    Greater        = 0x2,
    LessOrEqual    = 0x3,
    NotZero        = 0x4,
    Zero           = 0x5,
    NotCarry       = 0x6,
    Carry          = 0x7,
    Unknown8       = 0x8,
    Unknown9       = 0x9,
    UnknownA       = 0xA,
    UnknownB       = 0xB,
    NotLogicZero   = 0xC,
    LogicZero      = 0xD,
    Overflow       = 0xE,
    Always         = 0xF,
}

impl Cond {
    /// Extracts the condition from the low nibble of `code`.
    pub fn new(code: u16) -> Self {
        match code & 0xF {
            0x0 => Self::GreaterOrEqual,
            0x1 => Self::Less,
            0x2 => Self::Greater,
            0x3 => Self::LessOrEqual,
            0x4 => Self::NotZero,
            0x5 => Self::Zero,
            0x6 => Self::NotCarry,
            0x7 => Self::Carry,
            0x8 => Self::Unknown8,
            0x9 => Self::Unknown9,
            0xA => Self::UnknownA,
            0xB => Self::UnknownB,
            0xC => Self::NotLogicZero,
            0xD => Self::LogicZero,
            0xE => Self::Overflow,
            _ => Self::Always,
        }
    }

    /// Suffix appended to the prefix of a conditional mnemonic.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::GreaterOrEqual => "GE",
            Self::Less => "L",
            Self::Greater => "G",
            Self::LessOrEqual => "LE",
            Self::NotZero => "NZ",
            Self::Zero => "Z",
            Self::NotCarry => "NC",
            Self::Carry => "C",
            Self::Unknown8 => "x8",
            Self::Unknown9 => "x9",
            Self::UnknownA => "xA",
            Self::UnknownB => "xB",
            Self::NotLogicZero => "LNZ",
            Self::LogicZero => "LZ",
            Self::Overflow => "O",
            Self::Always => "",
        }
    }
}

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Abs, Add, Addarn, Addax, Addaxl, Addi, Addis, Addp, Addpaxz, Addr, Andc, Andcf, Andf, Andi,
    Andr, Asl, Asr, Asr16, Asrn, Asrnr, Asrnrx, Bloop, Bloopi, Call, Callr, Clr, Clr15, Clrl,
    Clrp, Cmp, Cmpar, Cmpi, Cmpis, Dar, Dec, Decm, Halt, Iar, If, Ilrr, Ilrrd, Ilrri, Ilrrn, Inc,
    Incm, Jmp, Jr, Loop, Loopi, Lr, Lri, Lris, Lrr, Lrrd, Lrri, Lrrn, Lrs, Lsl, Lsl16, Lsr, Lsr16,
    Lsrn, Lsrnr, Lsrnrx, M0, M2, Madd, Maddc, Maddx, Mov, Movax, Movnp, Movp, Movpz, Movr, Mrr,
    Msub, Msubc, Msubx, Mul, Mulac, Mulaxh, Mulc, Mulcac, Mulcmv, Mulcmvz, Mulmv, Mulmvz, Mulx,
    Mulxac, Mulxmv, Mulxmvz, Neg, Nop, Not, Nx, Orc, Ori, Orr, Ret, Rti, Sbclr, Sbset, Set15,
    Set16, Set40, Si, Sr, Srr, Srrd, Srri, Srrn, Srs, Sub, Subarn, Subax, Subp, Subr, Tst,
    Tstaxh, Tstprod, Xorc, Xori, Xorr, Unknown,
}

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExtensionOpcode {
    Nop, Dr, Ir, Nr, Mv, S, Sn, L, Ln, Ls, Sl, Lsn, Sln, Lsm, Slm, Lsnm, Slnm, Ld, Ldn, Ldm, Ldnm,
}

/// How an instruction parameter is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A register index, offset by the given base. Bases from 0x20 up name the whole
    /// accumulators (`ACC0`, `ACC1`, `AX0`, `AX1`).
    Reg(u8),
    /// Like [`ParamKind::Reg`], but the encoded bit selects the *other* accumulator.
    RegOther(u8),
    /// Data memory addressed indirectly through an address register.
    Prg,
    Imm,
    /// Absolute data memory address.
    Mem,
    /// Data memory address, sign extended from 8 bits.
    MemShort,
    /// Instruction memory address.
    Addr,
}

/// Where a parameter lives in an instruction and how to interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub kind: ParamKind,
    /// Word index (0 for the opcode word, 1 for the immediate word).
    pub word: u8,
    pub shift: u8,
    pub mask: u16,
}

impl Param {
    /// Extracts the raw value of this parameter.
    #[inline(always)]
    pub fn extract(&self, ins: Ins) -> u16 {
        let word = if self.word == 0 { ins.base } else { ins.extra };
        (word & self.mask) >> self.shift
    }

    /// Whether this parameter is a full 16-bit value.
    pub fn is_wide(&self) -> bool {
        self.mask > 0xFF
    }
}

const REG: ParamKind = ParamKind::Reg(0x00);
const REG04: ParamKind = ParamKind::Reg(0x04);
const REG18: ParamKind = ParamKind::Reg(0x18);
const REG19: ParamKind = ParamKind::Reg(0x19);
const REG1A: ParamKind = ParamKind::Reg(0x1A);
const REG1C: ParamKind = ParamKind::Reg(0x1C);
const ACCL: ParamKind = ParamKind::Reg(0x1C);
const ACCM: ParamKind = ParamKind::Reg(0x1E);
const ACCM_D: ParamKind = ParamKind::RegOther(0x1E);
const ACC: ParamKind = ParamKind::Reg(0x20);
const ACC_D: ParamKind = ParamKind::RegOther(0x20);
const AX: ParamKind = ParamKind::Reg(0x22);
const PRG: ParamKind = ParamKind::Prg;
const IMM: ParamKind = ParamKind::Imm;
const MEM: ParamKind = ParamKind::Mem;
const MEM_SHORT: ParamKind = ParamKind::MemShort;
const ADDR: ParamKind = ParamKind::Addr;

const fn base(kind: ParamKind, shift: u8, mask: u16) -> Param {
    Param {
        kind,
        word: 0,
        shift,
        mask,
    }
}

const fn extra(kind: ParamKind) -> Param {
    Param {
        kind,
        word: 1,
        shift: 0,
        mask: 0xFFFF,
    }
}

/// Static description of a primary instruction.
#[derive(Debug)]
pub struct OpcodeDescriptor {
    /// Mnemonic. For conditional families, this is the mnemonic of the "always" form.
    pub name: &'static str,
    /// Mnemonic prefix of a conditional family, to which the condition suffix is appended.
    pub conditional: Option<&'static str>,
    pub opcode: Opcode,
    pub pattern: u16,
    pub mask: u16,
    /// Length in words.
    pub size: u16,
    /// Whether the low bits encode an extension micro-operation.
    pub extended: bool,
    pub params: &'static [Param],
}

impl OpcodeDescriptor {
    #[inline(always)]
    pub fn matches(&self, word: u16) -> bool {
        word & self.mask == self.pattern
    }

    /// Mnemonic of this instruction as encoded by `base`.
    pub fn mnemonic(&self, base: u16) -> String {
        let Some(prefix) = self.conditional else {
            return self.name.to_owned();
        };

        match Cond::new(base) {
            Cond::Always => self.name.to_owned(),
            cond @ (Cond::Unknown8 | Cond::Unknown9 | Cond::UnknownA | Cond::UnknownB) => {
                format!("{}{}", self.name, cond.suffix())
            }
            cond => format!("{prefix}{}", cond.suffix()),
        }
    }

    const fn ext(mut self) -> Self {
        self.extended = true;
        self
    }

    const fn cond(mut self, prefix: &'static str) -> Self {
        self.conditional = Some(prefix);
        self
    }
}

const fn op(
    name: &'static str,
    opcode: Opcode,
    pattern: u16,
    mask: u16,
    size: u16,
    params: &'static [Param],
) -> OpcodeDescriptor {
    OpcodeDescriptor {
        name,
        conditional: None,
        opcode,
        pattern,
        mask,
        size,
        extended: false,
        params,
    }
}

/// Static description of an extension micro-operation.
#[derive(Debug)]
pub struct ExtensionDescriptor {
    pub name: &'static str,
    pub opcode: ExtensionOpcode,
    pub pattern: u8,
    pub mask: u8,
    pub params: &'static [Param],
}

impl ExtensionDescriptor {
    #[inline(always)]
    pub fn matches(&self, bits: u8) -> bool {
        bits & self.mask == self.pattern
    }
}

const fn ext(
    name: &'static str,
    opcode: ExtensionOpcode,
    pattern: u8,
    mask: u8,
    params: &'static [Param],
) -> ExtensionDescriptor {
    ExtensionDescriptor {
        name,
        opcode,
        pattern,
        mask,
        params,
    }
}

use Opcode as O;

#[rustfmt::skip]
const CLASS_0: &[OpcodeDescriptor] = &[
    op("NOP",    O::Nop,    0x0000, 0xFFFC, 1, &[]),
    op("DAR",    O::Dar,    0x0004, 0xFFFC, 1, &[base(REG, 0, 0x0003)]),
    op("IAR",    O::Iar,    0x0008, 0xFFFC, 1, &[base(REG, 0, 0x0003)]),
    op("SUBARN", O::Subarn, 0x000C, 0xFFFC, 1, &[base(REG, 0, 0x0003)]),
    op("ADDARN", O::Addarn, 0x0010, 0xFFF0, 1, &[base(REG, 0, 0x0003), base(REG04, 2, 0x000C)]),
    op("HALT",   O::Halt,   0x0021, 0xFFFF, 1, &[]),
    op("LOOP",   O::Loop,   0x0040, 0xFFE0, 1, &[base(REG, 0, 0x001F)]),
    op("BLOOP",  O::Bloop,  0x0060, 0xFFE0, 2, &[base(REG, 0, 0x001F), extra(ADDR)]),
    op("LRI",    O::Lri,    0x0080, 0xFFE0, 2, &[base(REG, 0, 0x001F), extra(IMM)]),
    op("LR",     O::Lr,     0x00C0, 0xFFE0, 2, &[base(REG, 0, 0x001F), extra(MEM)]),
    op("SR",     O::Sr,     0x00E0, 0xFFE0, 2, &[extra(MEM), base(REG, 0, 0x001F)]),
    op("ADDI",   O::Addi,   0x0200, 0xFEFF, 2, &[base(ACCM, 8, 0x0100), extra(IMM)]),
    op("ILRR",   O::Ilrr,   0x0210, 0xFEFC, 1, &[base(ACCM, 8, 0x0100), base(PRG, 0, 0x0003)]),
    op("ILRRD",  O::Ilrrd,  0x0214, 0xFEFC, 1, &[base(ACCM, 8, 0x0100), base(PRG, 0, 0x0003)]),
    op("ILRRI",  O::Ilrri,  0x0218, 0xFEFC, 1, &[base(ACCM, 8, 0x0100), base(PRG, 0, 0x0003)]),
    op("ILRRN",  O::Ilrrn,  0x021C, 0xFEFC, 1, &[base(ACCM, 8, 0x0100), base(PRG, 0, 0x0003)]),
    op("XORI",   O::Xori,   0x0220, 0xFEFF, 2, &[base(ACCM, 8, 0x0100), extra(IMM)]),
    op("ANDI",   O::Andi,   0x0240, 0xFEFF, 2, &[base(ACCM, 8, 0x0100), extra(IMM)]),
    op("ORI",    O::Ori,    0x0260, 0xFEFF, 2, &[base(ACCM, 8, 0x0100), extra(IMM)]),
    op("IF",     O::If,     0x0270, 0xFFF0, 1, &[]).cond("IF"),
    op("CMPI",   O::Cmpi,   0x0280, 0xFEFF, 2, &[base(ACCM, 8, 0x0100), extra(IMM)]),
    op("JMP",    O::Jmp,    0x0290, 0xFFF0, 2, &[extra(ADDR)]).cond("J"),
    op("ANDF",   O::Andf,   0x02A0, 0xFEFF, 2, &[base(ACCM, 8, 0x0100), extra(IMM)]),
    op("CALL",   O::Call,   0x02B0, 0xFFF0, 2, &[extra(ADDR)]).cond("CALL"),
    op("ANDCF",  O::Andcf,  0x02C0, 0xFEFF, 2, &[base(ACCM, 8, 0x0100), extra(IMM)]),
    op("LSRN",   O::Lsrn,   0x02CA, 0xFFFF, 1, &[]),
    op("ASRN",   O::Asrn,   0x02CB, 0xFFFF, 1, &[]),
    op("RET",    O::Ret,    0x02D0, 0xFFF0, 1, &[]).cond("RET"),
    op("RTI",    O::Rti,    0x02FF, 0xFFFF, 1, &[]),
    op("ADDIS",  O::Addis,  0x0400, 0xFE00, 1, &[base(ACCM, 8, 0x0100), base(IMM, 0, 0x00FF)]),
    op("CMPIS",  O::Cmpis,  0x0600, 0xFE00, 1, &[base(ACCM, 8, 0x0100), base(IMM, 0, 0x00FF)]),
    op("LRIS",   O::Lris,   0x0800, 0xF800, 1, &[base(REG18, 8, 0x0700), base(IMM, 0, 0x00FF)]),
];

#[rustfmt::skip]
const CLASS_1: &[OpcodeDescriptor] = &[
    op("LOOPI",  O::Loopi,  0x1000, 0xFF00, 1, &[base(IMM, 0, 0x00FF)]),
    op("BLOOPI", O::Bloopi, 0x1100, 0xFF00, 2, &[base(IMM, 0, 0x00FF), extra(ADDR)]),
    op("SBCLR",  O::Sbclr,  0x1200, 0xFF00, 1, &[base(IMM, 0, 0x0007)]),
    op("SBSET",  O::Sbset,  0x1300, 0xFF00, 1, &[base(IMM, 0, 0x0007)]),
    op("LSL",    O::Lsl,    0x1400, 0xFEC0, 1, &[base(ACC, 8, 0x0100), base(IMM, 0, 0x003F)]),
    op("LSR",    O::Lsr,    0x1440, 0xFEC0, 1, &[base(ACC, 8, 0x0100), base(IMM, 0, 0x003F)]),
    op("ASL",    O::Asl,    0x1480, 0xFEC0, 1, &[base(ACC, 8, 0x0100), base(IMM, 0, 0x003F)]),
    op("ASR",    O::Asr,    0x14C0, 0xFEC0, 1, &[base(ACC, 8, 0x0100), base(IMM, 0, 0x003F)]),
    op("SI",     O::Si,     0x1600, 0xFF00, 2, &[base(MEM_SHORT, 0, 0x00FF), extra(IMM)]),
    op("JMPR",   O::Jr,     0x1700, 0xFF1F, 1, &[base(REG, 5, 0x00E0)]).cond("JR"),
    op("CALLR",  O::Callr,  0x1710, 0xFF1F, 1, &[base(REG, 5, 0x00E0)]).cond("CALLR"),
    op("LRR",    O::Lrr,    0x1800, 0xFF80, 1, &[base(REG, 0, 0x001F), base(PRG, 5, 0x0060)]),
    op("LRRD",   O::Lrrd,   0x1880, 0xFF80, 1, &[base(REG, 0, 0x001F), base(PRG, 5, 0x0060)]),
    op("LRRI",   O::Lrri,   0x1900, 0xFF80, 1, &[base(REG, 0, 0x001F), base(PRG, 5, 0x0060)]),
    op("LRRN",   O::Lrrn,   0x1980, 0xFF80, 1, &[base(REG, 0, 0x001F), base(PRG, 5, 0x0060)]),
    op("SRR",    O::Srr,    0x1A00, 0xFF80, 1, &[base(PRG, 5, 0x0060), base(REG, 0, 0x001F)]),
    op("SRRD",   O::Srrd,   0x1A80, 0xFF80, 1, &[base(PRG, 5, 0x0060), base(REG, 0, 0x001F)]),
    op("SRRI",   O::Srri,   0x1B00, 0xFF80, 1, &[base(PRG, 5, 0x0060), base(REG, 0, 0x001F)]),
    op("SRRN",   O::Srrn,   0x1B80, 0xFF80, 1, &[base(PRG, 5, 0x0060), base(REG, 0, 0x001F)]),
    op("MRR",    O::Mrr,    0x1C00, 0xFC00, 1, &[base(REG, 5, 0x03E0), base(REG, 0, 0x001F)]),
];

#[rustfmt::skip]
const CLASS_2: &[OpcodeDescriptor] = &[
    op("LRS", O::Lrs, 0x2000, 0xF800, 1, &[base(REG18, 8, 0x0700), base(MEM_SHORT, 0, 0x00FF)]),
    op("SRS", O::Srs, 0x2800, 0xF800, 1, &[base(MEM_SHORT, 0, 0x00FF), base(REG18, 8, 0x0700)]),
];

#[rustfmt::skip]
const CLASS_3: &[OpcodeDescriptor] = &[
    op("XORR",   O::Xorr,   0x3000, 0xFC80, 1, &[base(ACCM, 8, 0x0100), base(REG1A, 9, 0x0200)]).ext(),
    op("ANDR",   O::Andr,   0x3400, 0xFC80, 1, &[base(ACCM, 8, 0x0100), base(REG1A, 9, 0x0200)]).ext(),
    op("ORR",    O::Orr,    0x3800, 0xFC80, 1, &[base(ACCM, 8, 0x0100), base(REG1A, 9, 0x0200)]).ext(),
    op("ANDC",   O::Andc,   0x3C00, 0xFE80, 1, &[base(ACCM, 8, 0x0100), base(ACCM_D, 8, 0x0100)]).ext(),
    op("ORC",    O::Orc,    0x3E00, 0xFE80, 1, &[base(ACCM, 8, 0x0100), base(ACCM_D, 8, 0x0100)]).ext(),
    op("XORC",   O::Xorc,   0x3080, 0xFE80, 1, &[base(ACCM, 8, 0x0100), base(ACCM_D, 8, 0x0100)]).ext(),
    op("NOT",    O::Not,    0x3280, 0xFE80, 1, &[base(ACCM, 8, 0x0100)]).ext(),
    op("LSRNRX", O::Lsrnrx, 0x3480, 0xFC80, 1, &[base(ACC, 8, 0x0100), base(REG1A, 9, 0x0200)]).ext(),
    op("ASRNRX", O::Asrnrx, 0x3880, 0xFC80, 1, &[base(ACC, 8, 0x0100), base(REG1A, 9, 0x0200)]).ext(),
    op("LSRNR",  O::Lsrnr,  0x3C80, 0xFE80, 1, &[base(ACC, 8, 0x0100), base(ACCM_D, 8, 0x0100)]).ext(),
    op("ASRNR",  O::Asrnr,  0x3E80, 0xFE80, 1, &[base(ACC, 8, 0x0100), base(ACCM_D, 8, 0x0100)]).ext(),
];

#[rustfmt::skip]
const CLASS_4: &[OpcodeDescriptor] = &[
    op("ADDR",  O::Addr,  0x4000, 0xF800, 1, &[base(ACC, 8, 0x0100), base(REG18, 9, 0x0600)]).ext(),
    op("ADDAX", O::Addax, 0x4800, 0xFC00, 1, &[base(ACC, 8, 0x0100), base(AX, 9, 0x0200)]).ext(),
    op("ADD",   O::Add,   0x4C00, 0xFE00, 1, &[base(ACC, 8, 0x0100), base(ACC_D, 8, 0x0100)]).ext(),
    op("ADDP",  O::Addp,  0x4E00, 0xFE00, 1, &[base(ACC, 8, 0x0100)]).ext(),
];

#[rustfmt::skip]
const CLASS_5: &[OpcodeDescriptor] = &[
    op("SUBR",  O::Subr,  0x5000, 0xF800, 1, &[base(ACC, 8, 0x0100), base(REG18, 9, 0x0600)]).ext(),
    op("SUBAX", O::Subax, 0x5800, 0xFC00, 1, &[base(ACC, 8, 0x0100), base(AX, 9, 0x0200)]).ext(),
    op("SUB",   O::Sub,   0x5C00, 0xFE00, 1, &[base(ACC, 8, 0x0100), base(ACC_D, 8, 0x0100)]).ext(),
    op("SUBP",  O::Subp,  0x5E00, 0xFE00, 1, &[base(ACC, 8, 0x0100)]).ext(),
];

#[rustfmt::skip]
const CLASS_6: &[OpcodeDescriptor] = &[
    op("MOVR",  O::Movr,  0x6000, 0xF800, 1, &[base(ACC, 8, 0x0100), base(REG18, 9, 0x0600)]).ext(),
    op("MOVAX", O::Movax, 0x6800, 0xFC00, 1, &[base(ACC, 8, 0x0100), base(AX, 9, 0x0200)]).ext(),
    op("MOV",   O::Mov,   0x6C00, 0xFE00, 1, &[base(ACC, 8, 0x0100), base(ACC_D, 8, 0x0100)]).ext(),
    op("MOVP",  O::Movp,  0x6E00, 0xFE00, 1, &[base(ACC, 8, 0x0100)]).ext(),
];

#[rustfmt::skip]
const CLASS_7: &[OpcodeDescriptor] = &[
    op("ADDAXL", O::Addaxl, 0x7000, 0xFC00, 1, &[base(ACC, 8, 0x0100), base(REG18, 9, 0x0200)]).ext(),
    op("INCM",   O::Incm,   0x7400, 0xFE00, 1, &[base(ACCM, 8, 0x0100)]).ext(),
    op("INC",    O::Inc,    0x7600, 0xFE00, 1, &[base(ACC, 8, 0x0100)]).ext(),
    op("DECM",   O::Decm,   0x7800, 0xFE00, 1, &[base(ACCM, 8, 0x0100)]).ext(),
    op("DEC",    O::Dec,    0x7A00, 0xFE00, 1, &[base(ACC, 8, 0x0100)]).ext(),
    op("NEG",    O::Neg,    0x7C00, 0xFE00, 1, &[base(ACC, 8, 0x0100)]).ext(),
    op("MOVNP",  O::Movnp,  0x7E00, 0xFE00, 1, &[base(ACC, 8, 0x0100)]).ext(),
];

#[rustfmt::skip]
const CLASS_8: &[OpcodeDescriptor] = &[
    op("NX",      O::Nx,      0x8000, 0xF700, 1, &[]).ext(),
    op("CLR",     O::Clr,     0x8100, 0xF700, 1, &[base(ACC, 11, 0x0800)]).ext(),
    op("CMP",     O::Cmp,     0x8200, 0xFF00, 1, &[]).ext(),
    op("MULAXH",  O::Mulaxh,  0x8300, 0xFF00, 1, &[]).ext(),
    op("CLRP",    O::Clrp,    0x8400, 0xFF00, 1, &[]).ext(),
    op("TSTPROD", O::Tstprod, 0x8500, 0xFF00, 1, &[]).ext(),
    op("TSTAXH",  O::Tstaxh,  0x8600, 0xFE00, 1, &[base(REG1A, 8, 0x0100)]).ext(),
    op("M2",      O::M2,      0x8A00, 0xFF00, 1, &[]).ext(),
    op("M0",      O::M0,      0x8B00, 0xFF00, 1, &[]).ext(),
    op("CLR15",   O::Clr15,   0x8C00, 0xFF00, 1, &[]).ext(),
    op("SET15",   O::Set15,   0x8D00, 0xFF00, 1, &[]).ext(),
    op("SET16",   O::Set16,   0x8E00, 0xFF00, 1, &[]).ext(),
    op("SET40",   O::Set40,   0x8F00, 0xFF00, 1, &[]).ext(),
];

#[rustfmt::skip]
const CLASS_9: &[OpcodeDescriptor] = &[
    op("MUL",    O::Mul,    0x9000, 0xF700, 1, &[base(REG18, 11, 0x0800), base(REG1A, 11, 0x0800)]).ext(),
    op("ASR16",  O::Asr16,  0x9100, 0xF700, 1, &[base(ACC, 11, 0x0800)]).ext(),
    op("MULMVZ", O::Mulmvz, 0x9200, 0xF600, 1, &[base(REG18, 11, 0x0800), base(REG1A, 11, 0x0800), base(ACC, 8, 0x0100)]).ext(),
    op("MULAC",  O::Mulac,  0x9400, 0xF600, 1, &[base(REG18, 11, 0x0800), base(REG1A, 11, 0x0800), base(ACC, 8, 0x0100)]).ext(),
    op("MULMV",  O::Mulmv,  0x9600, 0xF600, 1, &[base(REG18, 11, 0x0800), base(REG1A, 11, 0x0800), base(ACC, 8, 0x0100)]).ext(),
];

#[rustfmt::skip]
const CLASS_AB: &[OpcodeDescriptor] = &[
    op("MULX",    O::Mulx,    0xA000, 0xE700, 1, &[base(REG18, 11, 0x1000), base(REG19, 10, 0x0800)]).ext(),
    op("ABS",     O::Abs,     0xA100, 0xF700, 1, &[base(ACC, 11, 0x0800)]).ext(),
    op("MULXMVZ", O::Mulxmvz, 0xA200, 0xE600, 1, &[base(REG18, 11, 0x1000), base(REG19, 10, 0x0800), base(ACC, 8, 0x0100)]).ext(),
    op("MULXAC",  O::Mulxac,  0xA400, 0xE600, 1, &[base(REG18, 11, 0x1000), base(REG19, 10, 0x0800), base(ACC, 8, 0x0100)]).ext(),
    op("MULXMV",  O::Mulxmv,  0xA600, 0xE600, 1, &[base(REG18, 11, 0x1000), base(REG19, 10, 0x0800), base(ACC, 8, 0x0100)]).ext(),
    op("TST",     O::Tst,     0xB100, 0xF700, 1, &[base(ACC, 11, 0x0800)]).ext(),
];

#[rustfmt::skip]
const CLASS_CD: &[OpcodeDescriptor] = &[
    op("MULC",    O::Mulc,    0xC000, 0xE700, 1, &[base(ACCM, 11, 0x0800), base(REG1A, 12, 0x1000)]).ext(),
    op("CMPAR",   O::Cmpar,   0xC100, 0xE700, 1, &[base(ACC, 11, 0x0800), base(REG1A, 12, 0x1000)]).ext(),
    op("MULCMVZ", O::Mulcmvz, 0xC200, 0xE600, 1, &[base(ACCM, 11, 0x0800), base(REG1A, 12, 0x1000), base(ACC, 8, 0x0100)]).ext(),
    op("MULCAC",  O::Mulcac,  0xC400, 0xE600, 1, &[base(ACCM, 11, 0x0800), base(REG1A, 12, 0x1000), base(ACC, 8, 0x0100)]).ext(),
    op("MULCMV",  O::Mulcmv,  0xC600, 0xE600, 1, &[base(ACCM, 11, 0x0800), base(REG1A, 12, 0x1000), base(ACC, 8, 0x0100)]).ext(),
];

#[rustfmt::skip]
const CLASS_E: &[OpcodeDescriptor] = &[
    op("MADDX", O::Maddx, 0xE000, 0xFC00, 1, &[base(REG18, 8, 0x0200), base(REG19, 7, 0x0100)]).ext(),
    op("MSUBX", O::Msubx, 0xE400, 0xFC00, 1, &[base(REG18, 8, 0x0200), base(REG19, 7, 0x0100)]).ext(),
    op("MADDC", O::Maddc, 0xE800, 0xFC00, 1, &[base(ACCM, 9, 0x0200), base(REG19, 7, 0x0100)]).ext(),
    op("MSUBC", O::Msubc, 0xEC00, 0xFC00, 1, &[base(ACCM, 9, 0x0200), base(REG19, 7, 0x0100)]).ext(),
];

#[rustfmt::skip]
const CLASS_F: &[OpcodeDescriptor] = &[
    op("LSL16",   O::Lsl16,   0xF000, 0xFE00, 1, &[base(ACC, 8, 0x0100)]).ext(),
    op("MADD",    O::Madd,    0xF200, 0xFE00, 1, &[base(REG18, 8, 0x0100), base(REG1A, 8, 0x0100)]).ext(),
    op("LSR16",   O::Lsr16,   0xF400, 0xFE00, 1, &[base(ACC, 8, 0x0100)]).ext(),
    op("MSUB",    O::Msub,    0xF600, 0xFE00, 1, &[base(REG18, 8, 0x0100), base(REG1A, 8, 0x0100)]).ext(),
    op("ADDPAXZ", O::Addpaxz, 0xF800, 0xFC00, 1, &[base(ACC, 8, 0x0100), base(AX, 9, 0x0200)]).ext(),
    op("CLRL",    O::Clrl,    0xFC00, 0xFE00, 1, &[base(ACCL, 8, 0x0100)]).ext(),
    op("MOVPZ",   O::Movpz,   0xFE00, 0xFE00, 1, &[base(ACC, 8, 0x0100)]).ext(),
];

/// Instruction classes, indexed by the top nibble of the opcode word.
pub static CLASSES: [&[OpcodeDescriptor]; 16] = [
    CLASS_0, CLASS_1, CLASS_2, CLASS_3, CLASS_4, CLASS_5, CLASS_6, CLASS_7, CLASS_8, CLASS_9,
    CLASS_AB, CLASS_AB, CLASS_CD, CLASS_CD, CLASS_E, CLASS_F,
];

use ExtensionOpcode as E;

/// Extension micro-operations, matched against the low byte (or low 7 bits, for class 3) of an
/// extended instruction.
#[rustfmt::skip]
pub static EXTENSIONS: &[ExtensionDescriptor] = &[
    ext("XXX",  E::Nop,  0x00, 0xFC, &[]),
    ext("DR",   E::Dr,   0x04, 0xFC, &[base(REG, 0, 0x0003)]),
    ext("IR",   E::Ir,   0x08, 0xFC, &[base(REG, 0, 0x0003)]),
    ext("NR",   E::Nr,   0x0C, 0xFC, &[base(REG, 0, 0x0003)]),
    ext("MV",   E::Mv,   0x10, 0xF0, &[base(REG18, 2, 0x000C), base(REG1C, 0, 0x0003)]),
    ext("S",    E::S,    0x20, 0xE4, &[base(PRG, 0, 0x0003), base(REG1C, 3, 0x0018)]),
    ext("SN",   E::Sn,   0x24, 0xE4, &[base(PRG, 0, 0x0003), base(REG1C, 3, 0x0018)]),
    ext("L",    E::L,    0x40, 0xC4, &[base(REG18, 3, 0x0038), base(PRG, 0, 0x0003)]),
    ext("LN",   E::Ln,   0x44, 0xC4, &[base(REG18, 3, 0x0038), base(PRG, 0, 0x0003)]),
    ext("LS",   E::Ls,   0x80, 0xCE, &[base(REG18, 4, 0x0030), base(ACCM, 0, 0x0001)]),
    ext("SL",   E::Sl,   0x82, 0xCE, &[base(ACCM, 0, 0x0001), base(REG18, 4, 0x0030)]),
    ext("LSN",  E::Lsn,  0x84, 0xCE, &[base(REG18, 4, 0x0030), base(ACCM, 0, 0x0001)]),
    ext("SLN",  E::Sln,  0x86, 0xCE, &[base(ACCM, 0, 0x0001), base(REG18, 4, 0x0030)]),
    ext("LSM",  E::Lsm,  0x88, 0xCE, &[base(REG18, 4, 0x0030), base(ACCM, 0, 0x0001)]),
    ext("SLM",  E::Slm,  0x8A, 0xCE, &[base(ACCM, 0, 0x0001), base(REG18, 4, 0x0030)]),
    ext("LSNM", E::Lsnm, 0x8C, 0xCE, &[base(REG18, 4, 0x0030), base(ACCM, 0, 0x0001)]),
    ext("SLNM", E::Slnm, 0x8E, 0xCE, &[base(ACCM, 0, 0x0001), base(REG18, 4, 0x0030)]),
    ext("LD",   E::Ld,   0xC0, 0xCC, &[base(REG18, 4, 0x0020), base(REG19, 3, 0x0010), base(PRG, 0, 0x0003)]),
    ext("LDN",  E::Ldn,  0xC4, 0xCC, &[base(REG18, 4, 0x0020), base(REG19, 3, 0x0010), base(PRG, 0, 0x0003)]),
    ext("LDM",  E::Ldm,  0xC8, 0xCC, &[base(REG18, 4, 0x0020), base(REG19, 3, 0x0010), base(PRG, 0, 0x0003)]),
    ext("LDNM", E::Ldnm, 0xCC, 0xCC, &[base(REG18, 4, 0x0020), base(REG19, 3, 0x0010), base(PRG, 0, 0x0003)]),
];

/// Iterates over every primary instruction descriptor.
pub fn opcodes() -> impl Iterator<Item = &'static OpcodeDescriptor> {
    CLASSES
        .iter()
        .enumerate()
        // A/B and C/D share their tables
        .filter(|(i, _)| !matches!(i, 0xB | 0xD))
        .flat_map(|(_, class)| class.iter())
}

/// A DSP instruction: the opcode word and, for two-word instructions, the word following it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ins {
    pub base: u16,
    pub extra: u16,
}

/// Result of decoding an instruction word.
#[derive(Debug, Clone, Copy)]
pub struct Decoded {
    /// The matching primary instruction, if any.
    pub descriptor: Option<&'static OpcodeDescriptor>,
    /// The fused extension micro-operation, if the instruction carries a nonzero one.
    pub extension: Option<&'static ExtensionDescriptor>,
}

impl Decoded {
    pub fn opcode(&self) -> Opcode {
        self.descriptor.map_or(Opcode::Unknown, |d| d.opcode)
    }

    /// Length of the instruction in words. Unknown instructions take a single word.
    pub fn len(&self) -> u16 {
        self.descriptor.map_or(1, |d| d.size)
    }

    pub fn needs_extra(&self) -> bool {
        self.len() == 2
    }
}

impl Ins {
    #[inline(always)]
    pub fn new(base: u16) -> Self {
        Self { base, extra: 0 }
    }

    #[inline(always)]
    pub fn with_extra(base: u16, extra: u16) -> Self {
        Self { base, extra }
    }

    /// Bits holding the extension micro-operation of this instruction.
    #[inline(always)]
    pub fn extension_bits(self) -> u8 {
        if self.base >> 12 == 0x3 {
            self.base.bits(0, 7) as u8
        } else {
            self.base.bits(0, 8) as u8
        }
    }

    pub fn decoded(self) -> Decoded {
        let class = CLASSES[(self.base >> 12) as usize];
        let descriptor = class.iter().find(|d| d.matches(self.base));

        let extension = descriptor
            .filter(|d| d.extended && self.extension_bits() != 0)
            .and_then(|_| {
                let bits = self.extension_bits();
                EXTENSIONS.iter().find(|e| e.matches(bits))
            });

        Decoded {
            descriptor,
            extension,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classes_are_keyed_by_top_nibble() {
        for (nibble, class) in CLASSES.iter().enumerate() {
            for descriptor in class.iter() {
                let top = (descriptor.pattern >> 12) as usize;
                let shared = matches!((nibble, top), (0xB, 0xA) | (0xD, 0xC));
                assert!(
                    top == nibble || shared,
                    "{} is in class {nibble:X}",
                    descriptor.name
                );
            }
        }
    }

    #[test]
    fn patterns_fit_their_masks() {
        for descriptor in opcodes() {
            assert_eq!(
                descriptor.pattern & descriptor.mask,
                descriptor.pattern,
                "{}",
                descriptor.name
            );
        }

        for descriptor in EXTENSIONS {
            assert_eq!(descriptor.pattern & descriptor.mask, descriptor.pattern);
        }
    }

    #[test]
    fn every_extension_byte_decodes() {
        for bits in 0..=0xFFu8 {
            assert!(
                EXTENSIONS.iter().any(|e| e.matches(bits)),
                "extension byte {bits:02X} does not decode"
            );
        }
    }

    #[test]
    fn decode_two_word() {
        let decoded = Ins::new(0x0200).decoded();
        assert_eq!(decoded.opcode(), Opcode::Addi);
        assert_eq!(decoded.len(), 2);
        assert!(decoded.extension.is_none());

        let decoded = Ins::new(0x029F).decoded();
        assert_eq!(decoded.opcode(), Opcode::Jmp);
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn decode_extended() {
        // ADD $ACC0, $ACC1 : L $AX0.L, @$AR0
        let decoded = Ins::new(0x4C40).decoded();
        assert_eq!(decoded.opcode(), Opcode::Add);
        assert_eq!(
            decoded.extension.map(|e| e.opcode),
            Some(ExtensionOpcode::L)
        );

        // class 3 only uses 7 bits for the extension
        let decoded = Ins::new(0x3080).decoded();
        assert_eq!(decoded.opcode(), Opcode::Xorc);
        assert!(decoded.extension.is_none());
    }

    #[test]
    fn decode_unknown() {
        let decoded = Ins::new(0x0030).decoded();
        assert_eq!(decoded.opcode(), Opcode::Unknown);
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn conditional_mnemonics() {
        let jmp = CLASS_0.iter().find(|d| d.opcode == Opcode::Jmp).unwrap();
        assert_eq!(jmp.mnemonic(0x029F), "JMP");
        assert_eq!(jmp.mnemonic(0x0290), "JGE");
        assert_eq!(jmp.mnemonic(0x0298), "JMPx8");
        assert_eq!(jmp.mnemonic(0x029C), "JLNZ");

        let jr = CLASS_1.iter().find(|d| d.opcode == Opcode::Jr).unwrap();
        assert_eq!(jr.mnemonic(0x170F), "JMPR");
        assert_eq!(jr.mnemonic(0x1705), "JRZ");
    }
}
