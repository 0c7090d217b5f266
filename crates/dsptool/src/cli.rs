use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Args, Debug)]
pub struct DisasmArgs {
    /// Path to the big endian microcode image to disassemble
    pub image: PathBuf,
    /// Path to a symbol map used to label addresses
    #[arg(short, long)]
    pub symbols: Option<PathBuf>,
    /// Address of the first word of the image
    #[arg(long, value_parser = parse_hex, default_value = "0")]
    pub base: u16,
    /// Whether to prefix each line with its address
    #[arg(long, default_value_t = false)]
    pub pc: bool,
    /// Whether to prefix each line with the raw instruction words
    #[arg(long, default_value_t = false)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the instruction ROM image
    #[arg(long)]
    pub irom: Option<PathBuf>,
    /// Path to the instruction RAM image
    #[arg(long)]
    pub iram: Option<PathBuf>,
    /// Path to the data ROM image
    #[arg(long)]
    pub drom: Option<PathBuf>,
    /// Path to the coefficient ROM image
    #[arg(long)]
    pub coef: Option<PathBuf>,
    /// Path to a symbol map whose breakpoints should be used
    #[arg(short, long)]
    pub symbols: Option<PathBuf>,
    /// Maximum amount of instructions to execute
    #[arg(short('n'), long)]
    pub count: Option<u64>,
    /// Whether to reset into IRAM (0x0000) instead of IROM (0x8000)
    #[arg(long, default_value_t = false)]
    pub reset_low: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Disassembles a microcode image
    Disasm(DisasmArgs),
    /// Executes microcode until it halts
    Run(RunArgs),
}

/// dsptool: GameCube audio DSP interpreter and disassembler
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,
}

fn parse_hex(text: &str) -> Result<u16, std::num::ParseIntError> {
    let text = text.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(text, 16)
}
