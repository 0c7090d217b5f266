//! Symbol maps: named instruction memory ranges plus breakpoints.

use std::path::Path;

use easyerr::ResultExt;

use crate::mem::{LoadCtx, LoadError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub start: u16,
    /// Inclusive end address.
    pub end: u16,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolMap {
    symbols: Vec<Symbol>,
    breakpoints: Vec<u16>,
}

fn parse_hex(text: &str) -> Option<u16> {
    let text = text.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(text, 16).ok()
}

impl SymbolMap {
    /// Parses a symbol map. Lines are one of:
    ///
    /// - `.` followed by anything: a comment
    /// - `C`: clears the breakpoints read so far
    /// - `B <addr>`: adds a breakpoint
    /// - `<start> <end> <name>`: a symbol
    ///
    /// Addresses are hexadecimal. Malformed lines are skipped.
    pub fn parse(text: &str) -> Self {
        let mut map = Self::default();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('.') {
                continue;
            }

            let mut parts = line.split_whitespace();
            let parsed = match parts.next() {
                Some("C") => {
                    map.breakpoints.clear();
                    Some(())
                }
                Some("B") => parts.next().and_then(parse_hex).map(|addr| {
                    map.breakpoints.push(addr);
                }),
                Some(start) => {
                    let start = parse_hex(start);
                    let end = parts.next().and_then(parse_hex);
                    let name = parts.collect::<Vec<_>>().join(" ");

                    match (start, end) {
                        (Some(start), Some(end)) if !name.is_empty() && start <= end => {
                            map.symbols.push(Symbol { start, end, name });
                            Some(())
                        }
                        _ => None,
                    }
                }
                None => None,
            };

            if parsed.is_none() {
                tracing::warn!("skipping malformed symbol map line {}: {line:?}", number + 1);
            }
        }

        map.symbols.sort_by_key(|s| s.start);
        map
    }

    /// Reads and parses a symbol map file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|_| LoadCtx::Io {
            path: path.to_owned(),
        })?;

        Ok(Self::parse(&text))
    }

    /// The symbol covering `addr`, if any.
    pub fn lookup(&self, addr: u16) -> Option<&Symbol> {
        let index = self.symbols.partition_point(|s| s.start <= addr);
        self.symbols[..index]
            .iter()
            .rev()
            .find(|s| addr <= s.end)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn breakpoints(&self) -> &[u16] {
        &self.breakpoints
    }
}
