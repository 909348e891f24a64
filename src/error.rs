//! Fatal error taxonomy.
//!
//! Every condition that aborts a run is a distinct variant so tests can match
//! on it. Propagation upward still goes through `anyhow`; these are the leaf
//! causes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// An external collaborator (nm or the demangler) could not be spawned
    /// or exited with a non-zero status. Always fatal, no output is written.
    #[error("external tool `{tool}` failed: {reason}")]
    ExternalTool { tool: String, reason: String },

    /// No symbols survived filtering; an empty map is useless to the kernel
    /// and the address-width inference has nothing to key off.
    #[error("no symbols survived filtering, refusing to write an empty map")]
    EmptySymbolSet,

    /// A symbol address does not fit the selected address width.
    #[error("address {address:#x} does not fit in a {width}-byte field")]
    AddressOverflow { address: u64, width: usize },

    /// A symbol name does not fit the fixed-layout name field. The filter
    /// chain normally drops these before encoding; hitting this means the
    /// encoder was handed an unfiltered list.
    #[error("symbol name at {address:#x} exceeds the {max_symbol_length}-byte name field")]
    NameTooLong {
        address: u64,
        max_symbol_length: usize,
    },

    /// A symbol name contains a NUL byte, which would corrupt the
    /// terminator-delimited wire format.
    #[error("symbol name at {address:#x} contains an embedded NUL byte")]
    EmbeddedNul { address: u64 },

    /// The input file does not look like a symbol map at all.
    #[error("bad magic: {0}")]
    BadMagic(&'static str),

    /// The map ended before the footer magic; the file is truncated.
    #[error("truncated symbol map: {0}")]
    Truncated(&'static str),
}

impl Error {
    pub fn external_tool(tool: impl Into<String>, reason: impl ToString) -> Self {
        Error::ExternalTool {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }
}
