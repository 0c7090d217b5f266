mod cli;

use std::io::Write;

use clap::Parser;
use dspint::disasm::Disassembler;
use dspint::hw::NopHostModule;
use dspint::symbols::SymbolMap;
use dspint::{Exit, Interpreter};
use eyre_pretty::eyre::{Result, bail};

use crate::cli::{Command, DisasmArgs, RunArgs};

fn setup_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or(EnvFilter::new("dsptool=info,dspint=info"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(env_filter)
        .init();
}

fn load_symbols(path: Option<&std::path::Path>) -> Result<Option<SymbolMap>> {
    let Some(path) = path else {
        return Ok(None);
    };

    let symbols = SymbolMap::load(path)?;
    tracing::info!(
        "loaded {} symbols and {} breakpoints",
        symbols.symbols().len(),
        symbols.breakpoints().len()
    );

    Ok(Some(symbols))
}

fn disasm(args: &DisasmArgs) -> Result<()> {
    let bytes = std::fs::read(&args.image)?;
    if bytes.len() % 2 != 0 {
        bail!("image has an odd length of {} bytes", bytes.len());
    }

    let words = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect::<Vec<_>>();

    tracing::info!(
        "disassembling {} ({})",
        args.image.display(),
        bytesize::ByteSize(bytes.len() as u64)
    );

    let symbols = load_symbols(args.symbols.as_deref())?;
    let disassembler = Disassembler {
        show_pc: args.pc,
        show_hex: args.hex,
        ..Default::default()
    };

    let mut out = std::io::stdout().lock();
    disassembler.disassemble_all(&words, args.base, symbols.as_ref(), &mut out)?;
    out.flush()?;

    Ok(())
}

fn run(args: &RunArgs) -> Result<()> {
    let config = dspint::Config {
        reset_high: !args.reset_low,
        ..Default::default()
    };

    let mut interp = Interpreter::new(config, Box::new(NopHostModule));
    if let Some(path) = &args.irom {
        interp.load_irom(path)?;
    }
    if let Some(path) = &args.iram {
        interp.load_iram(path)?;
        tracing::info!("microcode checksum: {:016x}", interp.checksum);
    }
    if let Some(path) = &args.drom {
        interp.load_drom(path)?;
    }
    if let Some(path) = &args.coef {
        interp.load_coef(path)?;
    }

    let symbols = load_symbols(args.symbols.as_deref())?;
    if let Some(symbols) = &symbols {
        interp.breakpoints.extend_from_slice(symbols.breakpoints());
    }

    interp.reset();
    let exit = match args.count {
        Some(count) => interp.run_x(count),
        None => interp.run(),
    };

    match exit {
        Exit::Halted => tracing::info!("halted at {:04x}", interp.pc),
        Exit::Stopped => tracing::info!("stopped at {:04x}", interp.pc),
        Exit::Breakpoint(addr) => tracing::info!("breakpoint hit at {addr:04x}"),
        Exit::Exhausted => tracing::info!("instruction budget exhausted at {:04x}", interp.pc),
    }

    let (text, _) = Disassembler::default().disassemble(
        &[interp.read_imem(interp.pc), interp.read_imem(interp.pc.wrapping_add(1))],
        interp.pc,
        symbols.as_ref(),
    );

    let regs = &interp.regs;
    let mut out = std::io::stdout().lock();
    writeln!(out, "pc    {:04x}  {text}", interp.pc)?;
    writeln!(out, "steps {} ({} unknown)", interp.steps, interp.unknown_opcodes)?;
    writeln!(
        out,
        "acc0  {:010x}  acc1  {:010x}",
        regs.acc[0].unpack() & 0xFF_FFFF_FFFF,
        regs.acc[1].unpack() & 0xFF_FFFF_FFFF
    )?;
    writeln!(
        out,
        "ax0   {:08x}  ax1   {:08x}",
        regs.ax[0].unpack() as u32,
        regs.ax[1].unpack() as u32
    )?;
    writeln!(out, "prod  {:010x}", regs.product.unpack() & 0xFF_FFFF_FFFF)?;
    for i in 0..4 {
        writeln!(
            out,
            "ar{i}   {:04x}  ix{i}   {:04x}  wr{i}   {:04x}",
            regs.addressing[i], regs.indexing[i], regs.wrapping[i]
        )?;
    }
    writeln!(
        out,
        "sr    {:04x}  cr    {:02x}",
        regs.status.to_bits(),
        regs.config
    )?;

    Ok(())
}

fn main() -> Result<()> {
    eyre_pretty::install()?;
    setup_tracing();
    let cfg = cli::Config::parse();

    match &cfg.command {
        Command::Disasm(args) => disasm(args),
        Command::Run(args) => run(args),
    }
}
