//! Memory regions of the DSP.

use std::path::{Path, PathBuf};

use bitos::BitUtils;
use easyerr::{Error, ResultExt};
use util::boxed_array;
use zerocopy::IntoBytes;

/// Length, in words, of every memory region.
pub const REGION_LEN: usize = 0x1000;

const REGION_MASK: u16 = REGION_LEN as u16 - 1;

/// A memory region. Words are kept in the DSP's (big endian) byte order, so images can be
/// copied in verbatim.
pub type Region = Box<[u16; REGION_LEN]>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path:?}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("image has {len} bytes, but the region holds at most {max} bytes of whole words")]
    Size { len: usize, max: usize },
}

/// Reads a raw, headerless image of 16-bit words into a fresh region.
pub fn read_image(path: &Path) -> Result<Region, LoadError> {
    let data = std::fs::read(path).with_context(|_| LoadCtx::Io {
        path: path.to_owned(),
    })?;

    let max = REGION_LEN * 2;
    if data.len() > max || !data.len().is_multiple_of(2) {
        return Err(LoadError::Size {
            len: data.len(),
            max,
        });
    }

    let mut region: Region = boxed_array(0);
    region.as_mut_bytes()[..data.len()].copy_from_slice(&data);

    Ok(region)
}

#[inline(always)]
fn load(region: &Region, addr: u16) -> u16 {
    u16::from_be(region[(addr & REGION_MASK) as usize])
}

#[inline(always)]
fn store(region: &mut Region, addr: u16, value: u16) {
    region[(addr & REGION_MASK) as usize] = value.to_be();
}

pub struct Memory {
    /// Instruction RAM.
    pub iram: Region,
    /// Instruction ROM.
    pub irom: Region,
    /// Data RAM.
    pub dram: Region,
    /// Data ROM.
    pub drom: Region,
    /// Coefficient ROM.
    pub coef: Region,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            iram: boxed_array(0),
            irom: boxed_array(0),
            dram: boxed_array(0),
            drom: boxed_array(0),
            coef: boxed_array(0),
        }
    }
}

impl Memory {
    /// Fetches an instruction word. Whether it comes from ROM or RAM depends on bit 15 of the
    /// program counter, not of the address.
    #[inline(always)]
    pub fn read_instruction(&self, pc: u16, addr: u16) -> u16 {
        if pc.bit(15) {
            load(&self.irom, addr)
        } else {
            load(&self.iram, addr)
        }
    }

    #[inline(always)]
    pub fn read_iram(&self, addr: u16) -> u16 {
        load(&self.iram, addr)
    }

    #[inline(always)]
    pub fn write_iram(&mut self, addr: u16, value: u16) {
        store(&mut self.iram, addr, value);
    }

    #[inline(always)]
    pub fn read_irom(&self, addr: u16) -> u16 {
        load(&self.irom, addr)
    }

    #[inline(always)]
    pub fn read_dram(&self, addr: u16) -> u16 {
        load(&self.dram, addr)
    }

    #[inline(always)]
    pub fn write_dram(&mut self, addr: u16, value: u16) {
        store(&mut self.dram, addr, value);
    }

    #[inline(always)]
    pub fn read_drom(&self, addr: u16) -> u16 {
        load(&self.drom, addr)
    }

    #[inline(always)]
    pub fn read_coef(&self, addr: u16) -> u16 {
        load(&self.coef, addr)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn words_round_trip() {
        let mut mem = Memory::default();
        for (addr, value) in [(0x000, 0x0000), (0x123, 0x1234), (0xFFF, 0xFFFF), (0x800, 0x00FF)] {
            mem.write_dram(addr, value);
            assert_eq!(mem.read_dram(addr), value);
        }
    }

    #[test]
    fn stored_big_endian() {
        let mut mem = Memory::default();
        mem.write_iram(0, 0x1234);
        assert_eq!(mem.iram[..1].as_bytes(), &[0x12, 0x34]);
    }

    #[test]
    fn instruction_region_follows_pc() {
        let mut mem = Memory::default();
        mem.write_iram(0x10, 0xAAAA);
        mem.irom[0x10] = 0xBBBBu16.to_be();

        assert_eq!(mem.read_instruction(0x0000, 0x8010), 0xAAAA);
        assert_eq!(mem.read_instruction(0x8000, 0x0010), 0xBBBB);
    }
}
