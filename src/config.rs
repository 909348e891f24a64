//! Configuration module.
//!
//! This module defines the command-line interface (CLI) for the symbol-map
//! compiler using `clap`. The input variant (ELF symbol table vs. kernel map
//! file) is chosen by flag, never sniffed from file content.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::filter::{default_rules, ExcludeRule};
use crate::source::resolve_demangler_path;
use crate::writer::RecordLayout;

/// Name of the artifact written into the binary directory.
pub const OUTPUT_FILE_NAME: &str = "KSyms.map";

/// Compiles a symbol listing into a binary KSyms.map for the kernel.
///
/// Reads either an ELF binary's symbol table (via nm) or a precomputed
/// kernel map file, filters out non-code and noisy symbols, and writes a
/// compact address-to-name map the kernel loads for crash backtraces.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Directory containing the input artifact; KSyms.map is written here
    pub bin_dir: PathBuf,

    /// ELF filename (with --source elf) or kernel map filename (--source map)
    pub file_name: String,

    /// Demangler executable, map source only (defaults to c++filt)
    pub demangler: Option<PathBuf>,

    /// Where the symbol listing comes from
    #[arg(long, value_enum, default_value_t = SourceKind::Elf)]
    pub source: SourceKind,

    /// On-wire record layout
    #[arg(long, value_enum, default_value_t = LayoutKind::Fixed)]
    pub layout: LayoutKind,

    /// Maximum symbol name field size, including the terminator byte.
    /// Must leave room for at least one name byte plus the terminator.
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u16).range(2..))]
    pub max_symbol_length: u16,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", help = "Set the logging level")]
    pub log_level: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Run nm against an ELF binary's symbol table
    Elf,
    /// Read a precomputed text map file and demangle its names
    Map,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// Constant record stride, NUL-padded name fields (indexable)
    Fixed,
    /// NUL-terminated names, records-until-footer (oldest format)
    Variable,
}

impl Config {
    pub fn input_path(&self) -> PathBuf {
        self.bin_dir.join(&self.file_name)
    }

    pub fn output_path(&self) -> PathBuf {
        self.bin_dir.join(OUTPUT_FILE_NAME)
    }

    pub fn record_layout(&self) -> RecordLayout {
        match self.layout {
            LayoutKind::Fixed => RecordLayout::Fixed {
                max_symbol_length: usize::from(self.max_symbol_length),
            },
            LayoutKind::Variable => RecordLayout::Variable,
        }
    }

    /// The filter chain for the selected source. Interrupt trampoline stubs
    /// only show up in kernel map files, so that rule is map-only.
    pub fn exclude_rules(&self) -> Vec<ExcludeRule> {
        default_rules(
            self.source == SourceKind::Map,
            usize::from(self.max_symbol_length),
        )
    }

    /// Demangler to invoke, after the foreign-OS platform policy is applied.
    pub fn demangler_path(&self) -> PathBuf {
        resolve_demangler_path(self.demangler.as_deref())
    }
}
