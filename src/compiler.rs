//! Core symbol-map compilation logic.
//!
//! This module contains the `MapCompiler` struct which orchestrates the
//! whole pipeline:
//! 1. Source: obtain raw symbol rows (nm listing or kernel map file).
//! 2. Filter: drop non-code, duplicate, and noisy entries; normalize names.
//! 3. Width inference: pick 4- or 8-byte address encoding.
//! 4. Encode: serialize the map and write it in a single pass.
//!
//! Everything is strictly sequential and single-threaded; the only blocking
//! points are the external tool invocations inside the source adapter, and
//! any failure there aborts the run before the output file exists.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::filter::{filter_symbols, ExcludeRule};
use crate::source::SymbolSource;
use crate::symbol::NormalizedSymbol;
use crate::writer::{self, AddressWidth, RecordLayout};

/// What a successful run produced, for reporting.
#[derive(Debug)]
pub struct MapSummary {
    pub symbol_count: usize,
    pub width: AddressWidth,
}

pub struct MapCompiler<S: SymbolSource> {
    source: S,
    rules: Vec<ExcludeRule>,
    layout: RecordLayout,
}

impl<S: SymbolSource> MapCompiler<S> {
    pub fn new(source: S, rules: Vec<ExcludeRule>, layout: RecordLayout) -> Self {
        Self {
            source,
            rules,
            layout,
        }
    }

    /// Runs source and filter, yielding the list the encoder will see.
    pub fn collect(&self) -> Result<Vec<NormalizedSymbol>> {
        let raw = self.source.raw_symbols()?;
        info!(raw = raw.len(), "collected raw symbol rows");
        Ok(filter_symbols(&raw, &self.rules))
    }

    /// Full pipeline: collect, infer the address width, encode, write.
    pub fn run(&self, output_path: &Path) -> Result<MapSummary> {
        let symbols = self.collect()?;
        let width = AddressWidth::infer(&symbols)?;
        writer::write_map(output_path, &symbols, width, self.layout)?;
        info!(
            symbols = symbols.len(),
            width = width.bytes(),
            output = %output_path.display(),
            "wrote symbol map"
        );
        Ok(MapSummary {
            symbol_count: symbols.len(),
            width,
        })
    }
}
