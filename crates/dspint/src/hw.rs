//! Memory mapped hardware registers: DMA, mailboxes, interrupts and the accelerator.
use bitos::integer::{u3, u4, u15, u31};
use bitos::{BitUtils, bitos};
use zerocopy::IntoBytes;

use crate::{Exception, Interpreter};

/// The interface through which the DSP reaches the rest of the console.
pub trait HostModule: Send {
    /// Reads `buf.len()` bytes of main memory starting at `addr`.
    fn read_ram(&mut self, addr: u32, buf: &mut [u8]);
    /// Writes `data` into main memory starting at `addr`.
    fn write_ram(&mut self, addr: u32, data: &[u8]);
    /// Raises the DSP interrupt in the host CPU.
    fn raise_interrupt(&mut self);
}

/// An implementation of [`HostModule`] with no memory behind it.
#[derive(Debug, Clone, Copy)]
pub struct NopHostModule;

impl HostModule for NopHostModule {
    fn read_ram(&mut self, _: u32, buf: &mut [u8]) {
        buf.fill(0);
    }

    fn write_ram(&mut self, _: u32, _: &[u8]) {}

    fn raise_interrupt(&mut self) {}
}

#[bitos(32)]
#[derive(Debug, Default, Clone, Copy)]
pub struct Mailbox {
    #[bits(0..16)]
    pub low: u16,
    #[bits(16..31)]
    pub high: u15,
    #[bits(16..32)]
    pub high_and_status: u16,

    #[bits(0..31)]
    pub data: u31,
    #[bits(31)]
    pub status: bool,
}

#[bitos(16)]
#[derive(Debug, Clone, Copy)]
pub struct Control {
    /// Reset the DSP.
    #[bits(0)]
    pub reset: bool,
    /// The CPU->DSP interrupt (external interrupt exception in the DSP).
    #[bits(1)]
    pub interrupt: bool,
    /// Halts the DSP (i.e. stops execution of further instructions).
    #[bits(2)]
    pub halt: bool,
    #[bits(3)]
    pub ai_dma_interrupt: bool,
    #[bits(4)]
    pub ai_dma_interrupt_mask: bool,
    #[bits(5)]
    pub aram_dma_interrupt: bool,
    #[bits(6)]
    pub aram_dma_interrupt_mask: bool,
    /// The DSP->CPU interrupt, raised by the DSP to interrupt the CPU.
    #[bits(7)]
    pub dsp_interrupt: bool,
    #[bits(8)]
    pub dsp_interrupt_mask: bool,
    #[bits(9)]
    pub aram_dma_ongoing: bool,
    #[bits(10)]
    pub unknown: bool,
    /// Whether reset happens at the high vector (IROM) or the low vector (IRAM).
    #[bits(11)]
    pub reset_high: bool,
}

impl Default for Control {
    fn default() -> Self {
        Self::from_bits(0).with_reset_high(true)
    }
}

#[bitos(1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DspDmaDirection {
    FromRamToDsp = 0,
    FromDspToRam = 1,
}

#[bitos(1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DspDmaTarget {
    Dmem = 0,
    Imem = 1,
}

#[bitos(16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DspDmaControl {
    #[bits(0)]
    pub direction: DspDmaDirection,
    #[bits(1)]
    pub dsp_target: DspDmaTarget,
    #[bits(2)]
    pub transfer_ongoing: bool,
}

#[derive(Debug, Default, Clone)]
pub struct DspDma {
    pub ram_base: u32,
    pub dsp_base: u16,
    pub length: u16,
    pub control: DspDmaControl,
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleSize {
    #[default]
    Nibble   = 0b00,
    Byte     = 0b01,
    Word     = 0b10,
    Reserved = 0b11,
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleDecoding {
    #[default]
    AramAdpcm  = 0b00,
    AcinPcm    = 0b01,
    AramPcm    = 0b10,
    AcinPcmInc = 0b11,
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PcmDivisor {
    #[default]
    D2048    = 0b00,
    D1       = 0b01,
    D65536   = 0b10,
    Reserved = 0b11,
}

impl PcmDivisor {
    /// Applies rounding division. The reserved divisor leaves the value unchanged.
    pub fn apply(self, value: i64) -> i64 {
        match self {
            Self::D2048 => (value + (1 << 10)) >> 11,
            Self::D65536 => (value + (1 << 15)) >> 16,
            Self::D1 | Self::Reserved => value,
        }
    }
}

#[bitos(16)]
#[derive(Debug, Clone, Copy, Default)]
pub struct AccelFormat {
    #[bits(0..2)]
    pub sample: SampleSize,
    #[bits(2..4)]
    pub decoding: SampleDecoding,
    #[bits(4..6)]
    pub divisor: PcmDivisor,
}

#[bitos(16)]
#[derive(Debug, Clone, Copy, Default)]
pub struct AccelPredictor {
    #[bits(0..4)]
    pub scale_log2: u4,
    #[bits(4..7)]
    pub coefficients: u3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelWrap {
    RawRead,
    RawWrite,
    SampleRead,
}

impl AccelWrap {
    pub fn exception(self) -> Exception {
        match self {
            Self::RawRead => Exception::AccelRawReadOverflow,
            Self::RawWrite => Exception::AccelRawWriteOverflow,
            Self::SampleRead => Exception::AccelSampleReadOverflow,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccelCoefficients {
    pub a: i16,
    pub b: i16,
}

/// The audio accelerator: streams raw or decoded samples out of ARAM.
pub struct Accelerator {
    pub aram: Box<[u8]>,
    pub coefficients: [AccelCoefficients; 8],
    pub format: AccelFormat,
    pub predictor: AccelPredictor,
    pub aram_start: u32,
    pub aram_end: u32,
    pub aram_curr: u32,
    pub gain: i16,
    pub input: i16,
    pub wrapped: Option<AccelWrap>,
    pub previous_samples: [i16; 2],
    pub has_data: bool,
}

impl Accelerator {
    pub fn new(aram_len: usize) -> Self {
        Self {
            aram: vec![0; aram_len].into_boxed_slice(),
            coefficients: Default::default(),
            format: Default::default(),
            predictor: Default::default(),
            aram_start: 0,
            aram_end: 0,
            aram_curr: 0,
            gain: 0,
            input: 0,
            wrapped: None,
            previous_samples: [0; 2],
            has_data: false,
        }
    }

    #[inline(always)]
    fn aram_byte(&self, addr: usize) -> u8 {
        self.aram.get(addr).copied().unwrap_or_default()
    }

    fn increment_curr(&mut self, wrap: Option<AccelWrap>) {
        self.aram_curr = self.aram_curr.wrapping_add(1);
        if self.aram_curr > self.aram_end {
            self.aram_curr = self.aram_start;
            self.has_data = false;

            if wrap.is_some() {
                self.wrapped = wrap;
            }
        }
    }

    fn read_aram(&mut self, wrap: Option<AccelWrap>) -> u16 {
        let index = self.aram_curr.with_bit(31, false) as usize;
        let value = match self.format.sample() {
            SampleSize::Nibble => {
                let byte = self.aram_byte(index / 2) as u16;
                if index.is_multiple_of(2) {
                    byte >> 4
                } else {
                    byte & 0xF
                }
            }
            SampleSize::Byte => self.aram_byte(index) as u16,
            SampleSize::Word => {
                u16::from_be_bytes([self.aram_byte(index * 2), self.aram_byte(index * 2 + 1)])
            }
            SampleSize::Reserved => {
                tracing::warn!("accelerator reading with reserved sample size");
                0
            }
        };

        tracing::trace!(
            "accelerator reading 0x{value:04X} from ARAM 0x{:08X} (wraps at 0x{:08X})",
            self.aram_curr,
            self.aram_end
        );

        self.increment_curr(wrap);
        value
    }

    /// Reads the next raw value from ARAM.
    pub fn read_raw(&mut self) -> u16 {
        self.read_aram(Some(AccelWrap::RawRead))
    }

    /// Writes a raw word into ARAM.
    pub fn write_raw(&mut self, value: u16) {
        let index = self.aram_curr.with_bit(31, false) as usize * 2;

        tracing::trace!(
            "accelerator writing 0x{value:04X} to ARAM 0x{:08X} (wraps at 0x{:08X})",
            self.aram_curr,
            self.aram_end
        );

        match self.aram.get_mut(index..index + 2) {
            Some(dest) => dest.copy_from_slice(value.to_be().as_bytes()),
            None => tracing::warn!("accelerator write out of ARAM bounds at 0x{index:08X}"),
        }

        self.increment_curr(Some(AccelWrap::RawWrite));
    }

    fn pcm_gain(&self, value: i64) -> i64 {
        value * self.gain as i64
    }

    /// Scales `value` by the gain and adds the weighted history. The result wraps to 16 bits.
    fn pcm_decode(&self, value: i16) -> i16 {
        let coeffs = self.coefficients[self.predictor.coefficients().value() as usize];

        let acc = self.pcm_gain(value as i64)
            + self.pcm_gain(coeffs.a as i64 * self.previous_samples[0] as i64)
            + self.pcm_gain(coeffs.b as i64 * self.previous_samples[1] as i64);

        self.format.divisor().apply(acc) as i16
    }

    fn adpcm_decode(&mut self) -> i16 {
        // every 8 byte frame starts with a predictor/scale header
        if self.aram_curr.is_multiple_of(16) {
            let coeff_idx = self.read_aram(None) as u8;
            let scale = self.read_aram(None) as u8;
            self.predictor.set_coefficients(u3::new(coeff_idx & 0x7));
            self.predictor.set_scale_log2(u4::new(scale & 0xF));
        }

        let coeffs = self.coefficients[self.predictor.coefficients().value() as usize];
        let scale = 1i64 << self.predictor.scale_log2().value();

        let data = ((self.read_aram(None) as i8) << 4) >> 4;
        let value = scale * data as i64;

        let prediction = coeffs.a as i64 * self.previous_samples[0] as i64
            + coeffs.b as i64 * self.previous_samples[1] as i64;

        let result = PcmDivisor::D2048.apply(prediction) + value;
        result.clamp(i16::MIN as i64, i16::MAX as i64) as i16
    }

    /// Reads the next decoded sample.
    pub fn read_sample(&mut self) -> i16 {
        if !self.has_data {
            return 0;
        }

        let value = match self.format.decoding() {
            SampleDecoding::AramAdpcm => self.adpcm_decode(),
            SampleDecoding::AcinPcm => self.pcm_decode(self.input),
            SampleDecoding::AramPcm => {
                let value = self.read_aram(Some(AccelWrap::SampleRead)) as i16;
                self.pcm_decode(value)
            }
            SampleDecoding::AcinPcmInc => {
                self.increment_curr(Some(AccelWrap::SampleRead));
                self.pcm_decode(self.input)
            }
        };

        self.previous_samples[1] = self.previous_samples[0];
        self.previous_samples[0] = value;

        value
    }
}

/// State of the hardware register block.
pub struct Hardware {
    /// Data from DSP to CPU.
    pub dsp_mailbox: Mailbox,
    /// Data from CPU to DSP.
    pub cpu_mailbox: Mailbox,
    pub dma: DspDma,
    pub accel: Accelerator,
}

impl Hardware {
    pub fn new(aram_len: usize) -> Self {
        Self {
            dsp_mailbox: Default::default(),
            cpu_mailbox: Default::default(),
            dma: Default::default(),
            accel: Accelerator::new(aram_len),
        }
    }
}

/// Documented names of hardware register and coefficient addresses.
pub fn label(addr: u16) -> Option<&'static str> {
    const COEFFICIENTS: [&str; 16] = [
        "COEF_A1_0", "COEF_A2_0", "COEF_A1_1", "COEF_A2_1", "COEF_A1_2", "COEF_A2_2", "COEF_A1_3",
        "COEF_A2_3", "COEF_A1_4", "COEF_A2_4", "COEF_A1_5", "COEF_A2_5", "COEF_A1_6", "COEF_A2_6",
        "COEF_A1_7", "COEF_A2_7",
    ];

    Some(match addr {
        0xFFA0..=0xFFAF => COEFFICIENTS[addr as usize - 0xFFA0],
        0xFFC9 => "DSCR",
        0xFFCB => "DSBL",
        0xFFCD => "DSPA",
        0xFFCE => "DSMAH",
        0xFFCF => "DSMAL",
        0xFFD1 => "SampleFormat",
        0xFFD3 => "UnkZelda",
        0xFFD4 => "ACSAH",
        0xFFD5 => "ACSAL",
        0xFFD6 => "ACEAH",
        0xFFD7 => "ACEAL",
        0xFFD8 => "ACCAH",
        0xFFD9 => "ACCAL",
        0xFFDA => "pred_scale",
        0xFFDB => "yn1",
        0xFFDC => "yn2",
        0xFFDD => "ARAM",
        0xFFDE => "GAIN",
        0xFFEF => "AMDM",
        0xFFFB => "DIRQ",
        0xFFFC => "DMBH",
        0xFFFD => "DMBL",
        0xFFFE => "CMBH",
        0xFFFF => "CMBL",
        _ => return None,
    })
}

impl Interpreter {
    /// Reads a hardware register.
    pub(crate) fn read_hw(&mut self, offset: u8) -> u16 {
        let hw = &mut self.hw;
        match offset {
            // Coefficients
            0xA0..=0xAF => {
                let index = (offset as usize - 0xA0) / 2;
                if offset.is_multiple_of(2) {
                    hw.accel.coefficients[index].a as u16
                } else {
                    hw.accel.coefficients[index].b as u16
                }
            }

            // DMA
            0xC9 => hw.dma.control.to_bits(),
            0xCB => hw.dma.length,
            0xCD => hw.dma.dsp_base,
            0xCE => hw.dma.ram_base.bits(16, 32) as u16,
            0xCF => hw.dma.ram_base.bits(0, 16) as u16,

            // Accelerator
            0xD1 => hw.accel.format.to_bits(),
            0xD3 => hw.accel.read_raw(),
            0xD4 => hw.accel.aram_start.bits(16, 32) as u16,
            0xD5 => hw.accel.aram_start.bits(0, 16) as u16,
            0xD6 => hw.accel.aram_end.bits(16, 32) as u16,
            0xD7 => hw.accel.aram_end.bits(0, 16) as u16,
            0xD8 => hw.accel.aram_curr.bits(16, 32) as u16,
            0xD9 => hw.accel.aram_curr.bits(0, 16) as u16,
            0xDA => hw.accel.predictor.to_bits(),
            0xDB => hw.accel.previous_samples[0] as u16,
            0xDC => hw.accel.previous_samples[1] as u16,
            0xDD => hw.accel.read_sample() as u16,
            0xDE => hw.accel.gain as u16,
            0xDF => hw.accel.input as u16,

            // Mailboxes
            0xFC => hw.dsp_mailbox.high_and_status(),
            0xFD => hw.dsp_mailbox.low(),
            0xFE => hw.cpu_mailbox.high_and_status(),
            0xFF => {
                if hw.cpu_mailbox.status() {
                    tracing::debug!(
                        "received from CPU mailbox: 0x{:08X}",
                        hw.cpu_mailbox.data().value()
                    );
                    hw.cpu_mailbox.set_status(false);
                }

                hw.cpu_mailbox.low()
            }
            _ => {
                tracing::warn!("read from unknown hardware register 0xFF{offset:02X}");
                0
            }
        }
    }

    /// Writes a hardware register.
    pub(crate) fn write_hw(&mut self, offset: u8, value: u16) {
        let hw = &mut self.hw;
        match offset {
            // Coefficients
            0xA0..=0xAF => {
                let index = (offset as usize - 0xA0) / 2;
                if offset.is_multiple_of(2) {
                    hw.accel.coefficients[index].a = value as i16
                } else {
                    hw.accel.coefficients[index].b = value as i16
                }
            }

            // DMA
            0xC9 => hw.dma.control = DspDmaControl::from_bits(value),
            0xCB => {
                hw.dma.length = value;
                hw.dma.control.set_transfer_ongoing(true);
                self.do_dma();
            }
            0xCD => hw.dma.dsp_base = value,
            0xCE => hw.dma.ram_base = hw.dma.ram_base.with_bits(16, 32, value as u32),
            0xCF => hw.dma.ram_base = hw.dma.ram_base.with_bits(0, 16, value as u32),

            // Accelerator
            0xD1 => hw.accel.format = AccelFormat::from_bits(value),
            0xD3 => hw.accel.write_raw(value),
            0xD4 => hw.accel.aram_start = hw.accel.aram_start.with_bits(16, 32, value as u32),
            0xD5 => hw.accel.aram_start = hw.accel.aram_start.with_bits(0, 16, value as u32),
            0xD6 => hw.accel.aram_end = hw.accel.aram_end.with_bits(16, 32, value as u32),
            0xD7 => hw.accel.aram_end = hw.accel.aram_end.with_bits(0, 16, value as u32),
            0xD8 => hw.accel.aram_curr = hw.accel.aram_curr.with_bits(16, 32, value as u32),
            0xD9 => hw.accel.aram_curr = hw.accel.aram_curr.with_bits(0, 16, value as u32),
            0xDA => hw.accel.predictor = AccelPredictor::from_bits(value),
            0xDB => hw.accel.previous_samples[0] = value as i16,
            0xDC => {
                hw.accel.previous_samples[1] = value as i16;
                hw.accel.has_data = true;
            }
            0xDE => hw.accel.gain = value as i16,
            0xDF => hw.accel.input = value as i16,

            // Interrupt
            0xFB => {
                if value != 0 {
                    tracing::debug!("raising DSP interrupt in the CPU");
                    self.control.set_dsp_interrupt(true);
                    self.host.raise_interrupt();
                }
            }

            // Mailboxes
            0xFC => hw.dsp_mailbox.set_high(u15::new(value & 0x7FFF)),
            0xFD => {
                hw.dsp_mailbox.set_low(value);
                hw.dsp_mailbox.set_status(true);
                tracing::debug!(
                    "sent to DSP mailbox: 0x{:08X}",
                    hw.dsp_mailbox.data().value()
                );
            }
            _ => tracing::warn!("write of 0x{value:04X} to unknown hardware register 0xFF{offset:02X}"),
        }
    }

    /// Performs the DSP DMA if a transfer is ongoing.
    pub(crate) fn do_dma(&mut self) {
        let dma = self.hw.dma.clone();
        if !dma.control.transfer_ongoing() {
            return;
        }

        let ram_base = dma.ram_base.with_bits(26, 32, 0);
        let dsp_base = dma.dsp_base;
        let length = dma.length;
        let words = (length / 2) as usize;

        match (dma.control.dsp_target(), dma.control.direction()) {
            (DspDmaTarget::Dmem, DspDmaDirection::FromRamToDsp) => {
                tracing::debug!(
                    "DSP DMA {length:04X} bytes from RAM {ram_base:08X} to DMEM {dsp_base:04X}"
                );

                let mut data = vec![0u16; words];
                self.host.read_ram(ram_base, data.as_mut_bytes());
                for (offset, word) in data.into_iter().enumerate() {
                    self.write_dmem(dsp_base.wrapping_add(offset as u16), u16::from_be(word));
                }
            }
            (DspDmaTarget::Dmem, DspDmaDirection::FromDspToRam) => {
                tracing::debug!(
                    "DSP DMA {length:04X} bytes from DMEM {dsp_base:04X} to RAM {ram_base:08X}"
                );

                let data = (0..words)
                    .map(|offset| self.read_dmem(dsp_base.wrapping_add(offset as u16)).to_be())
                    .collect::<Vec<_>>();
                self.host.write_ram(ram_base, data.as_bytes());
            }
            (DspDmaTarget::Imem, DspDmaDirection::FromRamToDsp) => {
                let mut data = vec![0u16; words];
                self.host.read_ram(ram_base, data.as_mut_bytes());
                for (offset, word) in data.into_iter().enumerate() {
                    self.mem
                        .write_iram(dsp_base.wrapping_add(offset as u16), u16::from_be(word));
                }

                self.invalidate_cache();
                self.checksum = self.compute_checksum();

                tracing::info!(
                    "DSP DMA {length:04X} bytes from RAM {ram_base:08X} to IMEM {dsp_base:04X} (ucode {:016X})",
                    self.checksum
                );
            }
            (DspDmaTarget::Imem, DspDmaDirection::FromDspToRam) => {
                tracing::debug!(
                    "DSP DMA {length:04X} bytes from IMEM {dsp_base:04X} to RAM {ram_base:08X}"
                );

                let data = (0..words)
                    .map(|offset| self.mem.read_iram(dsp_base.wrapping_add(offset as u16)).to_be())
                    .collect::<Vec<_>>();
                self.host.write_ram(ram_base, data.as_bytes());
            }
        }

        self.hw.dma.length = 0;
        self.hw.dma.control.set_transfer_ongoing(false);
    }

    /// Hash of instruction RAM, identifying the loaded microcode.
    pub fn compute_checksum(&self) -> u64 {
        twox_hash::XxHash3_64::oneshot(self.mem.iram.as_bytes())
    }

    /// Sends mail from the CPU to the DSP.
    pub fn send_cpu_mail(&mut self, mail: u32) {
        tracing::debug!("CPU mail 0x{mail:08X}");
        self.hw.cpu_mailbox = Mailbox::from_bits(mail).with_status(true);
    }

    /// Takes pending mail sent by the DSP to the CPU, if any.
    pub fn take_dsp_mail(&mut self) -> Option<u32> {
        let mailbox = &mut self.hw.dsp_mailbox;
        if !mailbox.status() {
            return None;
        }

        mailbox.set_status(false);
        Some(mailbox.data().value())
    }

    fn matches_polling_loop(&self, offset: i16, mailbox: u16, taken: bool) -> bool {
        let start = self.pc.wrapping_add_signed(offset);
        let jump = if taken { 0x029C } else { 0x029D };

        let current = [
            self.read_imem(start),
            self.read_imem(start.wrapping_add(1)),
            self.read_imem(start.wrapping_add(2)),
            self.read_imem(start.wrapping_add(3)),
            self.read_imem(start.wrapping_add(4)),
        ];

        // lrs   $ACx.M, @mailbox
        // andcf $ACx.M, #0x8000
        // jlnz/jlz start
        [0, 1].into_iter().any(|acc| {
            let pattern = [
                0x2600 | (acc << 8) | (mailbox & 0xFF),
                0x02C0 | (acc << 8),
                0x8000,
                jump,
                start,
            ];

            current == pattern
        })
    }

    /// Whether the DSP is spinning while waiting for mail from the CPU.
    pub fn is_waiting_for_cpu_mail(&self) -> bool {
        [0, -1, -3]
            .into_iter()
            .any(|offset| self.matches_polling_loop(offset, 0xFFFE, true))
    }

    /// Whether the DSP is spinning while waiting for the CPU to read its mail.
    pub fn is_waiting_for_dsp_mail(&self) -> bool {
        [0, -1, -3]
            .into_iter()
            .any(|offset| self.matches_polling_loop(offset, 0xFFFC, false))
    }

    /// Raises the exception for a pending accelerator wrap, if interrupts are enabled.
    pub(crate) fn take_accelerator_wrap(&mut self) -> Option<Exception> {
        if !self.regs.status.interrupt_enable() {
            return None;
        }

        self.hw.accel.wrapped.take().map(AccelWrap::exception)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(label(0xFFA0), Some("COEF_A1_0"));
        assert_eq!(label(0xFFAF), Some("COEF_A2_7"));
        assert_eq!(label(0xFFFE), Some("CMBH"));
        assert_eq!(label(0xFFD0), None);
    }

    #[test]
    fn accelerator_raw_reads_wrap() {
        let mut accel = Accelerator::new(0x100);
        accel.aram[..4].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);
        accel.format = AccelFormat::default().with_sample(SampleSize::Word);
        accel.aram_start = 0;
        accel.aram_end = 1;

        assert_eq!(accel.read_raw(), 0x1234);
        assert_eq!(accel.read_raw(), 0x5678);
        assert_eq!(accel.wrapped, Some(AccelWrap::RawRead));
        assert_eq!(accel.aram_curr, 0);
    }

    #[test]
    fn accelerator_reads_nibbles() {
        let mut accel = Accelerator::new(0x10);
        accel.aram[0] = 0xAB;
        accel.aram_end = 0xFF;

        assert_eq!(accel.read_raw(), 0xA);
        assert_eq!(accel.read_raw(), 0xB);
        assert_eq!(accel.wrapped, None);
    }

    #[test]
    fn accelerator_out_of_bounds_reads_zero() {
        let mut accel = Accelerator::new(0x10);
        accel.format = AccelFormat::default().with_sample(SampleSize::Byte);
        accel.aram_curr = 0x1000;
        accel.aram_end = 0xFFFF;

        assert_eq!(accel.read_raw(), 0);
    }
}
