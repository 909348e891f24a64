//! Kernel symbol-map compiler library.
//!
//! This library provides the core components for the `ksymgen` tool.
//! It is organized into several modules:
//! - `config`: CLI configuration.
//! - `source`: symbol source adapters (nm listing, kernel map file).
//! - `filter`: symbol filtering and normalization rules.
//! - `compiler`: the main compilation orchestration.
//! - `writer`: binary map encoding and decoding.
//! - `symbol`: symbol data model.
//! - `error`: fatal error taxonomy.

pub mod compiler;
pub mod config;
pub mod error;
pub mod filter;
pub mod source;
pub mod symbol;
pub mod writer;
