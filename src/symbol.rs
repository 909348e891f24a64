//! Symbol data model.
//!
//! Raw entries come out of a symbol source (nm output or a kernel map file)
//! and are consumed once by the filter chain, which produces the normalized
//! entries the encoder serializes.

/// Classification of a symbol-table row, derived from nm's type letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Code symbol (`T`/`t`).
    Text,
    /// Weak code symbol (`W`/`w`).
    WeakText,
    /// Data symbol (`D`/`d`, `B`/`b`, `R`/`r`).
    Data,
    /// Anything else (undefined, absolute, debug, ...).
    Other,
}

impl SymbolKind {
    /// Maps an nm type letter to a kind. Unknown letters become `Other`.
    pub fn from_nm_letter(letter: char) -> Self {
        match letter {
            'T' | 't' => SymbolKind::Text,
            'W' | 'w' => SymbolKind::WeakText,
            'D' | 'd' | 'B' | 'b' | 'R' | 'r' => SymbolKind::Data,
            _ => SymbolKind::Other,
        }
    }

    /// Whether this kind belongs in the symbol map (code symbols only).
    pub fn is_code(self) -> bool {
        matches!(self, SymbolKind::Text | SymbolKind::WeakText)
    }
}

/// A single row produced by a symbol source, before filtering.
#[derive(Debug, Clone)]
pub struct RawSymbolEntry {
    pub address: u64,
    pub kind: SymbolKind,
    pub raw_name: String,
}

impl RawSymbolEntry {
    pub fn new(address: u64, kind: SymbolKind, raw_name: impl Into<String>) -> Self {
        Self {
            address,
            kind,
            raw_name: raw_name.into(),
        }
    }
}

/// A symbol that survived the filter chain.
///
/// The name is guaranteed printable, NUL-free, and strictly shorter than the
/// configured maximum symbol length (leaving room for a terminator byte).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSymbol {
    pub address: u64,
    pub name: String,
}
