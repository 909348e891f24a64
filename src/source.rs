//! Symbol source adapters.
//!
//! Two ways to obtain raw `(address, name)` rows: running `nm` against a
//! compiled ELF, or reading a precomputed kernel map file whose mangled names
//! are piped through an external demangler. Both are behind the
//! `SymbolSource` trait so the filter and encoder can be driven by an
//! in-memory fake in tests, without spawning real executables.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::Error;
use crate::symbol::{RawSymbolEntry, SymbolKind};

/// Namespace qualifier the kernel compiles everything under; stripped from
/// demangled names so backtraces stay readable.
pub const KERNEL_NAMESPACE_PREFIX: &str = "kernel::";

/// Default demangler executable name, resolved via PATH.
pub const DEFAULT_DEMANGLER: &str = "c++filt";

/// Anything that yields raw symbol rows, ordered by ascending address.
pub trait SymbolSource {
    fn raw_symbols(&self) -> Result<Vec<RawSymbolEntry>>;
}

/// Converts a mangled name into a human-readable one.
pub trait Demangler {
    fn demangle(&self, mangled: &str) -> Result<String>;
}

/// Runs `nm` against an ELF binary and parses its symbol table listing.
///
/// nm is asked for demangled (`-C`), numerically sorted (`-n`) output, so
/// the rows arrive in ascending address order with their type letter.
pub struct NmSymbolSource {
    nm_path: PathBuf,
    elf_path: PathBuf,
}

impl NmSymbolSource {
    pub fn new(elf_path: impl Into<PathBuf>) -> Self {
        Self {
            nm_path: PathBuf::from("nm"),
            elf_path: elf_path.into(),
        }
    }
}

impl SymbolSource for NmSymbolSource {
    fn raw_symbols(&self) -> Result<Vec<RawSymbolEntry>> {
        let output = Command::new(&self.nm_path)
            .arg("-C")
            .arg("-n")
            .arg(&self.elf_path)
            .output()
            .map_err(|e| Error::external_tool(self.nm_path.display().to_string(), e))?;

        if !output.status.success() {
            return Err(Error::external_tool(
                self.nm_path.display().to_string(),
                format!("exited with {}", output.status),
            )
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut entries = Vec::new();
        for line in stdout.lines() {
            if let Some(entry) = parse_nm_line(line) {
                entries.push(entry);
            }
        }
        debug!(count = entries.len(), "parsed nm symbol listing");
        Ok(entries)
    }
}

/// Parses one nm output line: `<hex address> <type letter> <name...>`.
///
/// Lines that do not match (undefined symbols have no address column,
/// plus blank lines) are skipped. Trailing `[clone .suffix]` annotations
/// on compiler-generated variants are stripped from the name.
pub fn parse_nm_line(line: &str) -> Option<RawSymbolEntry> {
    let mut fields = line.split_whitespace();
    let address = u64::from_str_radix(fields.next()?, 16).ok()?;
    let letter_field = fields.next()?;
    if letter_field.len() != 1 {
        return None;
    }
    let kind = SymbolKind::from_nm_letter(letter_field.chars().next()?);
    let name = fields.collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return None;
    }
    Some(RawSymbolEntry::new(address, kind, strip_clone_suffix(&name)))
}

/// Removes trailing `[clone ...]` annotations, which nm appends to
/// compiler-generated copies (`.cold`, `.isra.N`, ...). More than one can
/// stack on a single symbol.
fn strip_clone_suffix(name: &str) -> String {
    let mut name = name;
    while name.ends_with(']') {
        match name.rfind(" [clone ") {
            Some(pos) => name = &name[..pos],
            None => break,
        }
    }
    name.to_string()
}

/// Reads a line-oriented kernel map file and demangles each entry.
///
/// Data lines carry exactly two whitespace-separated fields, the first a
/// `0x`-prefixed address. Header and blank lines are skipped silently.
pub struct MapFileSource<D> {
    map_path: PathBuf,
    demangler: D,
}

impl<D: Demangler> MapFileSource<D> {
    pub fn new(map_path: impl Into<PathBuf>, demangler: D) -> Self {
        Self {
            map_path: map_path.into(),
            demangler,
        }
    }
}

impl<D: Demangler> SymbolSource for MapFileSource<D> {
    fn raw_symbols(&self) -> Result<Vec<RawSymbolEntry>> {
        let text = std::fs::read_to_string(&self.map_path)
            .with_context(|| format!("failed to read {}", self.map_path.display()))?;

        let mut entries = Vec::new();
        for line in text.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 2 || !fields[0].starts_with("0x") {
                continue;
            }
            let Ok(address) = u64::from_str_radix(&fields[0][2..], 16) else {
                continue;
            };
            let demangled = self.demangler.demangle(fields[1])?;
            let name = demangled
                .strip_prefix(KERNEL_NAMESPACE_PREFIX)
                .unwrap_or(&demangled);
            // The map file only lists code symbols, so everything is Text.
            entries.push(RawSymbolEntry::new(address, SymbolKind::Text, name));
        }
        debug!(count = entries.len(), "parsed kernel map file");
        Ok(entries)
    }
}

/// Demangles by invoking an external `c++filt`-style executable.
pub struct CxxFilt {
    path: PathBuf,
}

impl CxxFilt {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Demangler for CxxFilt {
    fn demangle(&self, mangled: &str) -> Result<String> {
        let output = Command::new(&self.path)
            .arg(mangled)
            .output()
            .map_err(|e| Error::external_tool(self.path.display().to_string(), e))?;
        if !output.status.success() {
            return Err(Error::external_tool(
                self.path.display().to_string(),
                format!("exited with {}", output.status),
            )
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Identity demangler, for inputs that already carry readable names.
pub struct NoopDemangler;

impl Demangler for NoopDemangler {
    fn demangle(&self, mangled: &str) -> Result<String> {
        Ok(mangled.to_string())
    }
}

/// In-memory source for driving the pipeline without external tools.
pub struct InMemorySource {
    entries: Vec<RawSymbolEntry>,
}

impl InMemorySource {
    pub fn new(entries: Vec<RawSymbolEntry>) -> Self {
        Self { entries }
    }
}

impl SymbolSource for InMemorySource {
    fn raw_symbols(&self) -> Result<Vec<RawSymbolEntry>> {
        Ok(self.entries.clone())
    }
}

/// Detects whether we are running under WSL, where a user-supplied demangler
/// path typically points across the filesystem boundary and is painfully
/// slow. In that case the platform-native binary is used instead.
pub fn running_under_wsl() -> bool {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|release| {
            let release = release.to_ascii_lowercase();
            release.contains("microsoft") || release.contains("wsl")
        })
        .unwrap_or(false)
}

/// Resolves the demangler path: the user's choice, unless the WSL policy
/// forces the native executable.
pub fn resolve_demangler_path(user_path: Option<&Path>) -> PathBuf {
    if running_under_wsl() {
        return PathBuf::from("/usr/bin/c++filt");
    }
    user_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DEMANGLER))
}
