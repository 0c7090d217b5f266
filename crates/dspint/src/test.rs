use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::disasm::Disassembler;
use crate::hw::{HostModule, NopHostModule};
use crate::regs::Acc40;
use crate::symbols::SymbolMap;
use crate::{Config, Exception, Exit, Interpreter, LoadError};

/// Creates an interpreter that resets into IRAM, with `program` loaded at address 0.
fn interpreter_with_host(program: &[u16], host: Box<dyn HostModule>) -> Interpreter {
    let config = Config {
        aram_size: 0x1000,
        reset_high: false,
    };

    let mut interp = Interpreter::new(config, host);
    for (addr, word) in program.iter().enumerate() {
        interp.write_imem(addr as u16, *word);
    }

    interp.reset();
    interp
}

fn interpreter(program: &[u16]) -> Interpreter {
    interpreter_with_host(program, Box::new(NopHostModule))
}

#[derive(Default)]
struct TestHost {
    ram: Vec<u8>,
    interrupts: Arc<AtomicUsize>,
}

impl HostModule for TestHost {
    fn read_ram(&mut self, addr: u32, buf: &mut [u8]) {
        buf.copy_from_slice(&self.ram[addr as usize..][..buf.len()]);
    }

    fn write_ram(&mut self, addr: u32, data: &[u8]) {
        self.ram[addr as usize..][..data.len()].copy_from_slice(data);
    }

    fn raise_interrupt(&mut self) {
        self.interrupts.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn reset_vector() {
    let interp = Interpreter::default();
    assert_eq!(interp.pc, 0x8000);

    let interp = interpreter(&[]);
    assert_eq!(interp.pc, 0x0000);
}

#[test]
fn add_immediate() {
    // ADDI $AC0.M, #0x1000
    let mut interp = interpreter(&[0x0200, 0x1000]);
    interp.regs.acc[0] = Acc40::pack(0x0234 << 16);

    interp.step();

    assert_eq!(interp.pc, 2);
    assert_eq!(interp.steps, 1);
    assert_eq!(interp.regs.acc[0].mid, 0x1234);
    assert_eq!(interp.regs.acc[0].high, 0x00);
}

#[test]
fn add_immediate_truncates_middle() {
    // ADDI $AC0.M, #0x1000
    let mut interp = interpreter(&[0x0200, 0x1000]);
    interp.regs.acc[0] = Acc40::pack(0xF000 << 16);

    interp.step();

    assert_eq!(interp.pc, 2);
    assert_eq!(interp.regs.acc[0].mid, 0x0000);
    assert_eq!(interp.regs.acc[0].high, 0x01);
    assert!(!interp.regs.status.arithmetic_zero());
}

#[test]
fn unknown_opcode_is_skipped() {
    let mut interp = interpreter(&[0x0030, 0x0030]);

    interp.step();
    assert_eq!(interp.pc, 1);
    assert_eq!(interp.unknown_opcodes, 1);

    interp.step();
    assert_eq!(interp.pc, 2);
    assert_eq!(interp.unknown_opcodes, 2);
}

#[test]
fn block_loop() {
    let mut interp = interpreter(&[
        0x1103, 0x0003, // BLOOPI #0x03, 0x0003
        0x7600, // INC $ACC0
        0x7700, // INC $ACC1
        0x0021, // HALT
    ]);

    assert_eq!(interp.run(), Exit::Halted);
    assert_eq!(interp.pc, 4);
    assert_eq!(interp.regs.acc[0].unpack(), 3);
    assert_eq!(interp.regs.acc[1].unpack(), 3);
    assert!(interp.regs.stacks.call.is_empty());
    assert!(interp.regs.stacks.loop_address.is_empty());
    assert!(interp.regs.stacks.loop_counter.is_empty());
}

#[test]
fn block_loop_restores_outer_stacks() {
    let mut interp = interpreter(&[
        0x1102, 0x0003, // BLOOPI #0x02, 0x0003
        0x7600, // INC $ACC0
        0x7600, // INC $ACC0
        0x0021, // HALT
    ]);

    interp.regs.stacks.call.push(0x0ABC);
    interp.regs.stacks.loop_address.push(0x0DEF);
    interp.regs.stacks.loop_counter.push(0);

    assert_eq!(interp.run(), Exit::Halted);
    assert_eq!(interp.regs.acc[0].unpack(), 4);
    assert_eq!(interp.regs.stacks.call.entries(), &[0x0ABC]);
    assert_eq!(interp.regs.stacks.loop_address.entries(), &[0x0DEF]);
    assert_eq!(interp.regs.stacks.loop_counter.entries(), &[0]);
}

#[test]
fn empty_block_loop_skips_body() {
    let mut interp = interpreter(&[
        0x1100, 0x0002, // BLOOPI #0x00, 0x0002
        0x7600, // INC $ACC0
        0x0021, // HALT
    ]);

    assert_eq!(interp.run(), Exit::Halted);
    assert_eq!(interp.pc, 3);
    assert_eq!(interp.regs.acc[0].unpack(), 0);
    assert!(interp.regs.stacks.call.is_empty());
}

#[test]
fn repeat_loop() {
    let mut interp = interpreter(&[
        0x1003, // LOOPI #0x03
        0x7600, // INC $ACC0
        0x0021, // HALT
    ]);

    assert_eq!(interp.run(), Exit::Halted);
    assert_eq!(interp.regs.acc[0].unpack(), 3);
    assert_eq!(interp.loop_counter, None);
}

#[test]
fn empty_repeat_loop_skips_instruction() {
    let mut interp = interpreter(&[
        0x1000, // LOOPI #0x00
        0x7600, // INC $ACC0
        0x0021, // HALT
    ]);

    assert_eq!(interp.run(), Exit::Halted);
    assert_eq!(interp.regs.acc[0].unpack(), 0);
}

#[test]
fn conditional_jump() {
    let mut interp = interpreter(&[
        0x8100, // CLR $ACC0
        0x0295, 0x0005, // JZ 0x0005
        0x7600, // INC $ACC0
        0x0021, // HALT
        0x7700, // INC $ACC1
        0x0021, // HALT
    ]);

    assert_eq!(interp.run(), Exit::Halted);
    assert_eq!(interp.regs.acc[0].unpack(), 0);
    assert_eq!(interp.regs.acc[1].unpack(), 1);
}

#[test]
fn call_and_return() {
    let mut interp = interpreter(&[
        0x02BF, 0x0004, // CALL 0x0004
        0x7600, // INC $ACC0
        0x0021, // HALT
        0x7700, // INC $ACC1
        0x02DF, // RET
    ]);

    assert_eq!(interp.run(), Exit::Halted);
    assert_eq!(interp.regs.acc[0].unpack(), 1);
    assert_eq!(interp.regs.acc[1].unpack(), 1);
    assert!(interp.regs.stacks.call.is_empty());
}

#[test]
fn extension_reads_previous_registers() {
    // MOV $ACC0, $ACC1 : MV $AX0.L, $AC0.M
    let mut interp = interpreter(&[0x6C12]);
    interp.regs.acc[0] = Acc40::pack(0x1111 << 16);
    interp.regs.acc[1] = Acc40::pack(0x2222 << 16);

    interp.step();

    assert_eq!(interp.regs.acc[0].mid, 0x2222);
    assert_eq!(interp.regs.ax[0].low, 0x1111);
}

#[test]
fn extension_load() {
    // NX : L $AX1.L, @$AR2
    let mut interp = interpreter(&[0x804A]);
    interp.mem.write_dram(0x0010, 0xBEEF);
    interp.regs.addressing[2] = 0x0010;

    interp.step();

    assert_eq!(interp.regs.ax[1].low, 0xBEEF);
    assert_eq!(interp.regs.addressing[2], 0x0011);
}

#[test]
fn multiply_doubles_by_default() {
    // MUL $AX0.L, $AX0.H
    let mut interp = interpreter(&[0x9000]);
    interp.regs.ax[0].low = 3;
    interp.regs.ax[0].high = 5;

    interp.step();
    assert_eq!(interp.regs.product.unpack(), 30);

    // M0 ; MUL $AX0.L, $AX0.H
    let mut interp = interpreter(&[0x8B00, 0x9000]);
    interp.regs.ax[0].low = 3;
    interp.regs.ax[0].high = 5;

    interp.step();
    interp.step();
    assert_eq!(interp.regs.product.unpack(), 15);
}

#[test]
fn unmapped_data_memory_reads_zero() {
    let mut interp = interpreter(&[]);
    interp.write_dmem(0x4000, 0x1234);
    assert_eq!(interp.read_dmem(0x4000), 0);

    interp.write_dmem(0x8000, 0x1234);
    assert_eq!(interp.read_dmem(0x8000), 0);
}

#[test]
fn external_interrupt_and_return() {
    let mut program = [0u16; 0x10];
    program[0x0E] = 0x02FF; // RTI
    let mut interp = interpreter(&program);

    let control = interp.control.with_interrupt(true);
    interp.write_control(control.to_bits());

    interp.step();
    assert_eq!(interp.pc, Exception::External as u16 * 2);
    assert!(interp.exception_in_progress);
    assert!(!interp.regs.status.external_interrupt_enable());
    assert_eq!(interp.regs.stacks.call.entries(), &[1]);

    interp.step();
    assert_eq!(interp.pc, 1);
    assert!(!interp.exception_in_progress);
    assert!(interp.regs.status.external_interrupt_enable());
    assert!(interp.regs.stacks.call.is_empty());
    assert!(interp.regs.stacks.data.is_empty());
}

#[test]
fn interrupt_waits_for_enable() {
    let mut interp = interpreter(&[0x0000, 0x0000]);
    interp.regs.status.set_external_interrupt_enable(false);

    let control = interp.control.with_interrupt(true);
    interp.write_control(control.to_bits());

    interp.step();
    assert_eq!(interp.pc, 1);
    assert!(!interp.exception_in_progress);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "exception is in progress")]
fn reset_during_exception() {
    let mut interp = interpreter(&[]);
    interp.exception_in_progress = true;
    interp.reset();
}

#[test]
fn halt_and_control_reset() {
    let mut interp = interpreter(&[0x0000, 0x0021]);

    assert_eq!(interp.run(), Exit::Halted);
    assert_eq!(interp.pc, 1);

    // stepping while halted does nothing
    interp.step();
    assert_eq!(interp.pc, 1);

    let control = interp.control.with_reset(true).with_halt(false);
    interp.write_control(control.to_bits());
    assert_eq!(interp.pc, 0);
    assert!(!interp.control.halt());
    assert!(!interp.control.reset());
}

#[test]
fn run_x_and_breakpoints() {
    let mut interp = interpreter(&[0x7600; 8]);

    assert_eq!(interp.run_x(3), Exit::Exhausted);
    assert_eq!(interp.pc, 3);

    interp.breakpoints.push(5);
    assert_eq!(interp.run(), Exit::Breakpoint(5));
    assert_eq!(interp.pc, 5);

    // resuming from a breakpoint executes it
    assert_eq!(interp.run_x(1), Exit::Exhausted);
    assert_eq!(interp.pc, 6);
    assert_eq!(interp.regs.acc[0].unpack(), 6);
}

#[test]
fn stop_from_another_thread() {
    // JMP 0x0000
    let mut interp = interpreter(&[0x029F, 0x0000]);
    let handle = interp.stop_handle();

    let stopper = std::thread::spawn(move || {
        while !handle.load(Ordering::Relaxed) {
            std::thread::yield_now();
        }

        handle.store(false, Ordering::Relaxed);
    });

    assert_eq!(interp.run(), Exit::Stopped);
    stopper.join().unwrap();
    assert_eq!(interp.pc, 0);
}

#[test]
fn dma_upload_and_interrupt() {
    let interrupts = Arc::new(AtomicUsize::new(0));
    let host = TestHost {
        ram: vec![0x02, 0x00, 0x10, 0x00],
        interrupts: interrupts.clone(),
    };

    let mut interp = interpreter_with_host(
        &[
            0x16CE, 0x0000, // SI @DSMAH, #0x0000
            0x16CF, 0x0000, // SI @DSMAL, #0x0000
            0x16CD, 0x0040, // SI @DSPA, #0x0040
            0x16C9, 0x0002, // SI @DSCR, #0x0002
            0x16CB, 0x0004, // SI @DSBL, #0x0004
            0x16FB, 0x0001, // SI @DIRQ, #0x0001
            0x0021, // HALT
        ],
        Box::new(host),
    );

    let checksum = interp.checksum;
    assert_eq!(interp.run(), Exit::Halted);

    assert_eq!(interp.read_imem(0x0040), 0x0200);
    assert_eq!(interp.read_imem(0x0041), 0x1000);
    assert_ne!(interp.checksum, checksum);
    assert_eq!(interp.checksum, interp.compute_checksum());

    assert_eq!(interrupts.load(Ordering::Relaxed), 1);
    assert!(interp.control.dsp_interrupt());
}

#[test]
fn dma_download() {
    let host = TestHost {
        ram: vec![0; 4],
        ..Default::default()
    };

    let mut interp = interpreter_with_host(
        &[
            0x16CD, 0x0010, // SI @DSPA, #0x0010
            0x16C9, 0x0001, // SI @DSCR, #0x0001
            0x16CB, 0x0004, // SI @DSBL, #0x0004
            0x0021, // HALT
        ],
        Box::new(host),
    );

    interp.write_dmem(0x0010, 0xCAFE);
    interp.write_dmem(0x0011, 0xF00D);
    assert_eq!(interp.run(), Exit::Halted);

    let mut ram = [0; 4];
    interp.host.read_ram(0, &mut ram);
    assert_eq!(ram, [0xCA, 0xFE, 0xF0, 0x0D]);
}

#[test]
fn mailboxes() {
    let mut interp = interpreter(&[
        0x26FE, // LRS $AC0.M, @CMBH
        0x27FF, // LRS $AC1.M, @CMBL
        0x16FC, 0x1234, // SI @DMBH, #0x1234
        0x16FD, 0x5678, // SI @DMBL, #0x5678
        0x0021, // HALT
    ]);

    interp.send_cpu_mail(0x1234_5678);
    assert_eq!(interp.take_dsp_mail(), None);
    assert_eq!(interp.run(), Exit::Halted);

    assert_eq!(interp.regs.acc[0].mid, 0x9234);
    assert_eq!(interp.regs.acc[1].mid, 0x5678);
    assert!(!interp.hw.cpu_mailbox.status());

    assert_eq!(interp.take_dsp_mail(), Some(0x1234_5678));
    assert_eq!(interp.take_dsp_mail(), None);
}

#[test]
fn mail_polling_detection() {
    let interp = interpreter(&[
        0x26FE, // LRS $AC0.M, @CMBH
        0x02C0, 0x8000, // ANDCF $AC0.M, #0x8000
        0x029C, 0x0000, // JLNZ 0x0000
    ]);

    assert!(interp.is_waiting_for_cpu_mail());
    assert!(!interp.is_waiting_for_dsp_mail());
}

#[test]
fn imem_writes_invalidate_cache() {
    let mut interp = interpreter(&[0x7600]);
    interp.step();
    assert_eq!(interp.regs.acc[0].unpack(), 1);

    interp.write_imem(0x0000, 0x7700);
    interp.pc = 0;
    interp.step();
    assert_eq!(interp.regs.acc[0].unpack(), 1);
    assert_eq!(interp.regs.acc[1].unpack(), 1);
}

#[test]
fn call_target_uses_symbol() {
    let symbols = SymbolMap::parse("0010 001F mix_voices\n");
    let (text, len) = Disassembler::default().disassemble(&[0x02BF, 0x0010], 0, Some(&symbols));

    assert_eq!(len, 2);
    insta::assert_snapshot!(text, @"CALL	mix_voices");
}

fn scratch_file(name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("dspint-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn load_images() {
    let mut interp = interpreter(&[]);

    let path = scratch_file("irom.bin", &[0x12, 0x34, 0xAB, 0xCD]);
    interp.load_irom(&path).unwrap();
    assert_eq!(interp.mem.read_irom(0), 0x1234);
    assert_eq!(interp.mem.read_irom(1), 0xABCD);
    std::fs::remove_file(path).unwrap();

    let path = scratch_file("coef.bin", &[0x00, 0x01]);
    interp.load_coef(&path).unwrap();
    assert_eq!(interp.read_dmem(0x1000), 0x0001);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn failed_load_keeps_contents() {
    let mut interp = interpreter(&[]);
    interp.mem.irom[0] = 0x1234u16.to_be();

    let missing = std::env::temp_dir().join("dspint-does-not-exist.bin");
    assert!(matches!(
        interp.load_irom(&missing),
        Err(LoadError::Io { .. })
    ));
    assert_eq!(interp.mem.read_irom(0), 0x1234);

    let path = scratch_file("oversized.bin", &vec![0; 0x2002]);
    assert!(matches!(
        interp.load_irom(&path),
        Err(LoadError::Size { len: 0x2002, .. })
    ));
    assert_eq!(interp.mem.read_irom(0), 0x1234);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn block_loop_ending_in_repeat() {
    // BLOOPI #2, 0x0003; LOOPI #1; INC $ACC0; HALT
    let mut interp = interpreter(&[0x1102, 0x0003, 0x1001, 0x7600, 0x0021]);

    assert_eq!(interp.run(), Exit::Halted);
    assert_eq!(interp.regs.acc[0].unpack(), 2);
    assert!(interp.regs.stacks.call.is_empty());
    assert!(interp.regs.stacks.loop_address.is_empty());
    assert!(interp.regs.stacks.loop_counter.is_empty());
}

#[test]
fn loop_count_does_not_pop_stack() {
    // LOOP $ST1; INC $ACC0; HALT
    let mut interp = interpreter(&[0x004D, 0x7600, 0x0021]);
    interp.regs.stacks.data.push(2);

    assert_eq!(interp.run(), Exit::Halted);
    assert_eq!(interp.regs.acc[0].unpack(), 2);
    assert_eq!(interp.regs.stacks.data.entries(), &[2]);
}

#[test]
fn if_skips_long_instruction() {
    // CLR $ACC0; IFNZ; ADDI $AC0.M, #0x1000; INC $ACC1; HALT
    let mut interp = interpreter(&[0x8100, 0x0274, 0x0200, 0x1000, 0x7700, 0x0021]);

    assert_eq!(interp.run(), Exit::Halted);
    assert_eq!(interp.regs.acc[0].unpack(), 0);
    assert_eq!(interp.regs.acc[1].unpack(), 1);

    // same, with IFZ
    let mut interp = interpreter(&[0x8100, 0x0275, 0x0200, 0x1000, 0x7700, 0x0021]);

    assert_eq!(interp.run(), Exit::Halted);
    assert_eq!(interp.regs.acc[0].unpack(), 0x1000 << 16);
    assert_eq!(interp.regs.acc[1].unpack(), 1);
}

#[test]
fn shift_immediates_are_negative() {
    // LSR $ACC0, #-4
    let mut interp = interpreter(&[0x147C]);
    interp.regs.acc[0] = Acc40::pack(0x0012340000);
    interp.step();
    assert_eq!(interp.regs.acc[0].unpack(), 0x0001234000);

    // LSR is logical over the 40 bits
    let mut interp = interpreter(&[0x147C]);
    interp.regs.acc[0] = Acc40::pack(-0x10000);
    interp.step();
    assert_eq!(interp.regs.acc[0].unpack(), 0x0FFFFFF000);

    // ASR $ACC0, #-4
    let mut interp = interpreter(&[0x14FC]);
    interp.regs.acc[0] = Acc40::pack(-0x10000);
    interp.step();
    assert_eq!(interp.regs.acc[0].unpack(), -0x1000);
}

#[test]
fn shift_by_register_direction() {
    // LSRN: positive amounts shift right, negative ones shift left
    let mut interp = interpreter(&[0x02CA, 0x02CA]);
    interp.regs.acc[0] = Acc40::pack(0x0012340000);
    interp.regs.acc[1].mid = 0x0004;
    interp.step();
    assert_eq!(interp.regs.acc[0].unpack(), 0x0001234000);

    interp.regs.acc[1].mid = 0x007C;
    interp.step();
    assert_eq!(interp.regs.acc[0].unpack(), 0x0012340000);

    // ASRN
    let mut interp = interpreter(&[0x02CB, 0x02CB]);
    interp.regs.acc[0] = Acc40::pack(-0x10000);
    interp.regs.acc[1].mid = 0x0004;
    interp.step();
    assert_eq!(interp.regs.acc[0].unpack(), -0x1000);

    interp.regs.acc[1].mid = 0x007C;
    interp.step();
    assert_eq!(interp.regs.acc[0].unpack(), -0x10000);
}

#[test]
fn load_store_reads_before_primary() {
    // MOV $ACC1, $ACC0 : LS $AX0.H, $AC1.M
    let mut interp = interpreter(&[0x6DA1]);
    interp.regs.acc[0] = Acc40::pack(0x1111 << 16);
    interp.regs.acc[1] = Acc40::pack(0x2222 << 16);
    interp.regs.addressing[0] = 0x0010;
    interp.regs.addressing[3] = 0x0020;
    interp.write_dmem(0x0010, 0xBEEF);

    interp.step();
    assert_eq!(interp.read_dmem(0x0020), 0x2222);
    assert_eq!(interp.regs.ax[0].high, 0xBEEF);
    assert_eq!(interp.regs.acc[1].mid, 0x1111);
    assert_eq!(interp.regs.addressing[0], 0x0011);
    assert_eq!(interp.regs.addressing[3], 0x0021);
}

#[test]
fn store_load_swaps_address_registers() {
    // NX : SL $AC0.M, $AX0.L
    let mut interp = interpreter(&[0x8082]);
    interp.regs.acc[0] = Acc40::pack(0x1234 << 16);
    interp.regs.addressing[0] = 0x0010;
    interp.regs.addressing[3] = 0x0020;
    interp.write_dmem(0x0020, 0x5678);

    interp.step();
    assert_eq!(interp.read_dmem(0x0010), 0x1234);
    assert_eq!(interp.regs.ax[0].low, 0x5678);
    assert_eq!(interp.regs.addressing[0], 0x0011);
    assert_eq!(interp.regs.addressing[3], 0x0021);
}

#[test]
fn load_store_address_steps() {
    // NX : LS, LSN, LSM, LSNM with $AX0.L, $AC0.M
    let cases = [
        (0x8080, 0x0011, 0x0021),
        (0x8084, 0x0014, 0x0021),
        (0x8088, 0x0011, 0x0028),
        (0x808C, 0x0014, 0x0028),
    ];

    for (word, ar0, ar3) in cases {
        let mut interp = interpreter(&[word]);
        interp.regs.addressing[0] = 0x0010;
        interp.regs.addressing[3] = 0x0020;
        interp.regs.indexing[0] = 4;
        interp.regs.indexing[3] = 8;
        interp.write_dmem(0x0010, 0xCAFE);

        interp.step();
        assert_eq!(interp.regs.ax[0].low, 0xCAFE, "{word:04X}");
        assert_eq!(interp.regs.addressing[0], ar0, "{word:04X}");
        assert_eq!(interp.regs.addressing[3], ar3, "{word:04X}");
    }
}

#[test]
fn dual_loads() {
    // NX : LD, LDN, LDM with $AX0.L, $AX1.L, @$AR0
    let cases = [
        (0x80C0, 0x0011, 0x0021),
        (0x80C4, 0x0014, 0x0021),
        (0x80C8, 0x0011, 0x0028),
    ];

    for (word, ar0, ar3) in cases {
        let mut interp = interpreter(&[word]);
        interp.regs.addressing[0] = 0x0010;
        interp.regs.addressing[3] = 0x0020;
        interp.regs.indexing[0] = 4;
        interp.regs.indexing[3] = 8;
        interp.write_dmem(0x0010, 0xAAAA);
        interp.write_dmem(0x0020, 0xBBBB);

        interp.step();
        assert_eq!(interp.regs.ax[0].low, 0xAAAA, "{word:04X}");
        assert_eq!(interp.regs.ax[1].low, 0xBBBB, "{word:04X}");
        assert_eq!(interp.regs.addressing[0], ar0, "{word:04X}");
        assert_eq!(interp.regs.addressing[3], ar3, "{word:04X}");
    }
}

#[test]
fn accelerator_sample_wrap_raises_exception() {
    let mut interp = interpreter(&[0x0000; 16]);
    interp.hw.accel.aram[..4].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);

    // ARAM PCM, 16-bit samples, unity gain
    interp.write_dmem(0xFFD1, 0x000A);
    interp.write_dmem(0xFFDE, 0x0800);
    interp.write_dmem(0xFFD7, 0x0001);
    interp.write_dmem(0xFFDC, 0x0000);

    assert_eq!(interp.read_dmem(0xFFDD), 0x1234);
    assert_eq!(interp.read_dmem(0xFFDD), 0x5678);
    assert_eq!(interp.read_dmem(0xFFD9), 0x0000);
    assert_eq!(interp.read_dmem(0xFFDD), 0x0000);

    interp.step();
    assert_eq!(interp.pc, Exception::AccelSampleReadOverflow as u16 * 2);
    assert!(interp.exception_in_progress);
    assert!(!interp.regs.status.interrupt_enable());
    assert_eq!(interp.regs.stacks.call.entries(), &[1]);
}

#[test]
fn accelerator_pcm_saturated_inputs() {
    let mut interp = interpreter(&[]);

    // ACIN PCM with every input at its maximum
    interp.write_dmem(0xFFD1, 0x0004);
    interp.write_dmem(0xFFA0, 0x7FFF);
    interp.write_dmem(0xFFA1, 0x7FFF);
    interp.write_dmem(0xFFDE, 0x7FFF);
    interp.write_dmem(0xFFDF, 0x7FFF);
    interp.write_dmem(0xFFDB, 0x7FFF);
    interp.write_dmem(0xFFDC, 0x7FFF);

    assert_eq!(interp.read_dmem(0xFFDD), 0x0040);
    assert_eq!(interp.read_dmem(0xFFDB), 0x0040);
    assert_eq!(interp.read_dmem(0xFFDC), 0x7FFF);
}

#[test]
fn accelerator_adpcm_prediction_clamps() {
    let mut interp = interpreter(&[]);

    // ARAM ADPCM with both history samples and coefficients at their minimum
    interp.write_dmem(0xFFD1, 0x0000);
    interp.write_dmem(0xFFD7, 0xFFFF);
    interp.write_dmem(0xFFA0, 0x8000);
    interp.write_dmem(0xFFA1, 0x8000);
    interp.write_dmem(0xFFDB, 0x8000);
    interp.write_dmem(0xFFDC, 0x8000);

    assert_eq!(interp.read_dmem(0xFFDD), 0x7FFF);
}

#[test]
fn interrupt_deferred_until_return() {
    let mut program = [0x0000; 16];
    program[15] = 0x02FF; // RTI
    let mut interp = interpreter(&program);

    let control = interp.control.with_interrupt(true);
    interp.write_control(control.to_bits());
    interp.step();
    assert_eq!(interp.pc, Exception::External as u16 * 2);

    // a second interrupt arrives while the handler runs
    interp.regs.status.set_external_interrupt_enable(true);
    let control = interp.control.with_interrupt(true);
    interp.write_control(control.to_bits());

    interp.step();
    assert_eq!(interp.pc, 15);
    assert!(interp.exception_in_progress);
    assert_eq!(interp.regs.stacks.call.entries(), &[1]);

    interp.step();
    assert_eq!(interp.pc, Exception::External as u16 * 2);
    assert!(interp.exception_in_progress);
    assert_eq!(interp.regs.stacks.call.entries(), &[1]);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "raised while another one is in progress")]
fn nested_exception_panics() {
    let mut interp = interpreter(&[]);
    interp.raise_exception(Exception::External);
    interp.raise_exception(Exception::AccelRawReadOverflow);
}

#[test]
fn instruction_reads_alias() {
    let mut interp = interpreter(&[]);
    interp.write_imem(0x0005, 0xABCD);
    interp.mem.irom[1] = 0x4321u16.to_be();

    assert_eq!(interp.read_imem(0x1005), 0xABCD);
    assert_eq!(interp.read_imem(0x7005), 0xABCD);
    assert_eq!(interp.read_imem(0x9001), 0x4321);

    // ILRR $AC0.M, @$AR0
    interp.write_imem(0x0000, 0x0210);
    interp.regs.addressing[0] = 0x1005;
    interp.step();
    assert_eq!(interp.regs.acc[0].mid, 0xABCD);
}
