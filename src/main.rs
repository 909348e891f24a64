//! Entry point for the ksymgen symbol-map compiler.
//!
//! This file handles high-level application flow:
//! 1. Parse command-line arguments using `clap`.
//! 2. Initialize `tracing` from the `--log-level` flag.
//! 3. Build the configured symbol source (nm or map file + demangler).
//! 4. Run the pipeline: collect, filter, infer width, encode, write.
//!
//! Every fatal condition exits with status 1 and leaves no KSyms.map behind;
//! error handling is done via `anyhow`.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ksymgen::compiler::{MapCompiler, MapSummary};
use ksymgen::config::{Config, SourceKind};
use ksymgen::source::{CxxFilt, MapFileSource, NmSymbolSource, SymbolSource};

fn main() {
    // Usage errors exit with 1, not clap's default 2; --help and --version
    // are not errors.
    let config = match Config::try_parse() {
        Ok(config) => config,
        Err(err) => {
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            std::process::exit(code);
        }
    };

    if let Err(err) = run(config) {
        eprintln!("ksymgen: {err:#}");
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .init();

    let summary = match config.source {
        SourceKind::Elf => {
            let source = NmSymbolSource::new(config.input_path());
            compile(source, &config)?
        }
        SourceKind::Map => {
            let demangler = CxxFilt::new(config.demangler_path());
            let source = MapFileSource::new(config.input_path(), demangler);
            compile(source, &config)?
        }
    };

    println!(
        "Wrote {} symbols ({}-byte addresses) to {}",
        summary.symbol_count,
        summary.width.bytes(),
        config.output_path().display()
    );
    Ok(())
}

fn compile<S: SymbolSource>(source: S, config: &Config) -> Result<MapSummary> {
    MapCompiler::new(source, config.exclude_rules(), config.record_layout())
        .run(&config.output_path())
}
