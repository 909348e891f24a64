//! Symbol map encoder.
//!
//! This module handles serializing the normalized symbol list into the final
//! `KSyms.map` artifact, and reading one back. The whole file is built in
//! memory and written with a single `fs::write`, so no fatal path can leave
//! a partially written map behind.
//!
//! Wire layout (all integers little-endian, unsigned):
//!
//! ```text
//! "KSYMS"              5-byte header magic
//! per symbol, in order:
//!     address          4 or 8 bytes, unaligned
//!     name             NUL-terminated; fixed layout pads the field out to
//!                      exactly max_symbol_length bytes
//! "SMYSK"              5-byte footer magic
//! ```

use std::path::Path;

use anyhow::{Context, Result};

use crate::error::Error;
use crate::symbol::NormalizedSymbol;

pub const MAGIC_HEADER: &[u8; 5] = b"KSYMS";
pub const MAGIC_FOOTER: &[u8; 5] = b"SMYSK";

/// On-wire size of each address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressWidth {
    Four,
    Eight,
}

impl AddressWidth {
    pub fn bytes(self) -> usize {
        match self {
            AddressWidth::Four => 4,
            AddressWidth::Eight => 8,
        }
    }

    /// Picks the width from the retained symbol list: 8 bytes when the first
    /// address is beyond the 32-bit range, 4 otherwise. The list is sorted
    /// ascending by construction, and a higher-half kernel puts every symbol
    /// on the same side of the boundary. An empty list is a hard error.
    pub fn infer(symbols: &[NormalizedSymbol]) -> Result<Self, Error> {
        let first = symbols.first().ok_or(Error::EmptySymbolSet)?;
        if first.address > u64::from(u32::MAX) {
            Ok(AddressWidth::Eight)
        } else {
            Ok(AddressWidth::Four)
        }
    }
}

/// How each record's name field is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// Name bytes plus a single NUL terminator; records vary in size and the
    /// consumer scans linearly until the footer magic. The oldest format.
    Variable,
    /// Name field NUL-padded to exactly `max_symbol_length` bytes, giving a
    /// constant record stride so the consumer can index and binary-search.
    Fixed { max_symbol_length: usize },
}

/// Serializes the symbol list into a complete map image.
pub fn encode_map(
    symbols: &[NormalizedSymbol],
    width: AddressWidth,
    layout: RecordLayout,
) -> Result<Vec<u8>, Error> {
    if symbols.is_empty() {
        return Err(Error::EmptySymbolSet);
    }

    let mut buffer = Vec::with_capacity(estimated_size(symbols, width, layout));
    buffer.extend_from_slice(MAGIC_HEADER);

    for symbol in symbols {
        match width {
            AddressWidth::Four => {
                let address = u32::try_from(symbol.address).map_err(|_| Error::AddressOverflow {
                    address: symbol.address,
                    width: 4,
                })?;
                buffer.extend_from_slice(&address.to_le_bytes());
            }
            AddressWidth::Eight => buffer.extend_from_slice(&symbol.address.to_le_bytes()),
        }

        let name = symbol.name.as_bytes();
        if name.contains(&0) {
            return Err(Error::EmbeddedNul {
                address: symbol.address,
            });
        }
        match layout {
            RecordLayout::Variable => {
                buffer.extend_from_slice(name);
                buffer.push(0);
            }
            RecordLayout::Fixed { max_symbol_length } => {
                if name.len() + 1 > max_symbol_length {
                    return Err(Error::NameTooLong {
                        address: symbol.address,
                        max_symbol_length,
                    });
                }
                buffer.extend_from_slice(name);
                buffer.resize(buffer.len() + max_symbol_length - name.len(), 0);
            }
        }
    }

    buffer.extend_from_slice(MAGIC_FOOTER);
    Ok(buffer)
}

fn estimated_size(symbols: &[NormalizedSymbol], width: AddressWidth, layout: RecordLayout) -> usize {
    let records = match layout {
        RecordLayout::Variable => symbols
            .iter()
            .map(|s| width.bytes() + s.name.len() + 1)
            .sum(),
        RecordLayout::Fixed { max_symbol_length } => {
            symbols.len() * (width.bytes() + max_symbol_length)
        }
    };
    MAGIC_HEADER.len() + records + MAGIC_FOOTER.len()
}

/// Encodes and writes the map to disk in one shot.
pub fn write_map(
    output_path: &Path,
    symbols: &[NormalizedSymbol],
    width: AddressWidth,
    layout: RecordLayout,
) -> Result<()> {
    let image = encode_map(symbols, width, layout)?;
    std::fs::write(output_path, &image)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    Ok(())
}

/// Decodes a map image back into its symbol sequence.
///
/// Verifies both magics; a truncated file fails the footer check before any
/// record parsing happens, mirroring what the kernel-side consumer does.
pub fn read_map(
    bytes: &[u8],
    width: AddressWidth,
    layout: RecordLayout,
) -> Result<Vec<NormalizedSymbol>, Error> {
    if bytes.len() < MAGIC_HEADER.len() + MAGIC_FOOTER.len() {
        return Err(Error::Truncated("shorter than the two magic markers"));
    }
    if &bytes[..MAGIC_HEADER.len()] != MAGIC_HEADER {
        return Err(Error::BadMagic("missing KSYMS header"));
    }
    if &bytes[bytes.len() - MAGIC_FOOTER.len()..] != MAGIC_FOOTER {
        return Err(Error::Truncated("missing SMYSK footer"));
    }

    let body = &bytes[MAGIC_HEADER.len()..bytes.len() - MAGIC_FOOTER.len()];
    let mut symbols = Vec::new();

    match layout {
        RecordLayout::Variable => {
            let mut rest = body;
            while !rest.is_empty() {
                let (address, after_address) = take_address(rest, width)?;
                let nul = after_address
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or(Error::Truncated("record without name terminator"))?;
                symbols.push(NormalizedSymbol {
                    address,
                    name: String::from_utf8_lossy(&after_address[..nul]).into_owned(),
                });
                rest = &after_address[nul + 1..];
            }
        }
        RecordLayout::Fixed { max_symbol_length } => {
            let stride = width.bytes() + max_symbol_length;
            if body.len() % stride != 0 {
                return Err(Error::Truncated("body is not a whole number of records"));
            }
            for record in body.chunks_exact(stride) {
                let (address, name_field) = take_address(record, width)?;
                let nul = name_field
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or(Error::Truncated("record without name terminator"))?;
                symbols.push(NormalizedSymbol {
                    address,
                    name: String::from_utf8_lossy(&name_field[..nul]).into_owned(),
                });
            }
        }
    }

    Ok(symbols)
}

fn take_address(bytes: &[u8], width: AddressWidth) -> Result<(u64, &[u8]), Error> {
    if bytes.len() < width.bytes() {
        return Err(Error::Truncated("record cut short inside an address"));
    }
    let (head, rest) = bytes.split_at(width.bytes());
    let address = match width {
        AddressWidth::Four => u64::from(u32::from_le_bytes(head.try_into().unwrap())),
        AddressWidth::Eight => u64::from_le_bytes(head.try_into().unwrap()),
    };
    Ok((address, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(address: u64, name: &str) -> NormalizedSymbol {
        NormalizedSymbol {
            address,
            name: name.to_string(),
        }
    }

    #[test]
    fn width_follows_first_address() {
        assert_eq!(
            AddressWidth::infer(&[symbol(0x1000, "a")]).unwrap(),
            AddressWidth::Four
        );
        assert_eq!(
            AddressWidth::infer(&[symbol(0x1_0000_0000, "a")]).unwrap(),
            AddressWidth::Eight
        );
        // Exactly u32::MAX still fits in four bytes.
        assert_eq!(
            AddressWidth::infer(&[symbol(0xFFFF_FFFF, "a")]).unwrap(),
            AddressWidth::Four
        );
    }

    #[test]
    fn width_inference_rejects_empty_list() {
        assert!(matches!(
            AddressWidth::infer(&[]),
            Err(Error::EmptySymbolSet)
        ));
    }

    #[test]
    fn variable_layout_round_trip() {
        let symbols = vec![symbol(0x1000, "foo"), symbol(0x2000, "Bar::baz()")];
        let image = encode_map(&symbols, AddressWidth::Four, RecordLayout::Variable).unwrap();
        let decoded = read_map(&image, AddressWidth::Four, RecordLayout::Variable).unwrap();
        assert_eq!(decoded, symbols);
    }

    #[test]
    fn fixed_layout_round_trip() {
        let layout = RecordLayout::Fixed {
            max_symbol_length: 100,
        };
        let symbols = vec![
            symbol(0xFFFF_FFFF_8000_0000, "kernel_main"),
            symbol(0xFFFF_FFFF_8000_1000, "Scheduler::pick_next()"),
        ];
        let image = encode_map(&symbols, AddressWidth::Eight, layout).unwrap();
        assert_eq!(image.len(), 5 + 2 * (8 + 100) + 5);
        let decoded = read_map(&image, AddressWidth::Eight, layout).unwrap();
        assert_eq!(decoded, symbols);
    }

    #[test]
    fn variable_layout_size_is_exact() {
        let symbols = vec![symbol(0x1000, "foo"), symbol(0x2000, "Bar::baz")];
        let image = encode_map(&symbols, AddressWidth::Four, RecordLayout::Variable).unwrap();
        assert_eq!(image.len(), 5 + (4 + 3 + 1) + (4 + 8 + 1) + 5);
    }

    #[test]
    fn magics_bracket_the_image() {
        let image = encode_map(
            &[symbol(0x1000, "foo")],
            AddressWidth::Four,
            RecordLayout::Variable,
        )
        .unwrap();
        assert!(image.starts_with(b"KSYMS"));
        assert!(image.ends_with(b"SMYSK"));
    }

    #[test]
    fn truncated_image_fails_footer_check() {
        let image = encode_map(
            &[symbol(0x1000, "foo"), symbol(0x2000, "bar")],
            AddressWidth::Four,
            RecordLayout::Variable,
        )
        .unwrap();
        let cut = &image[..image.len() - 7];
        assert!(matches!(
            read_map(cut, AddressWidth::Four, RecordLayout::Variable),
            Err(Error::Truncated(_))
        ));
    }

    #[test]
    fn wrong_header_is_rejected() {
        let mut image = encode_map(
            &[symbol(0x1000, "foo")],
            AddressWidth::Four,
            RecordLayout::Variable,
        )
        .unwrap();
        image[0] = b'X';
        assert!(matches!(
            read_map(&image, AddressWidth::Four, RecordLayout::Variable),
            Err(Error::BadMagic(_))
        ));
    }

    #[test]
    fn four_byte_width_rejects_wide_addresses() {
        let symbols = vec![symbol(0x1000, "low"), symbol(0x1_0000_0000, "high")];
        assert!(matches!(
            encode_map(&symbols, AddressWidth::Four, RecordLayout::Variable),
            Err(Error::AddressOverflow { width: 4, .. })
        ));
    }

    #[test]
    fn embedded_nul_is_rejected() {
        let symbols = vec![symbol(0x1000, "bad\0name")];
        assert!(matches!(
            encode_map(&symbols, AddressWidth::Four, RecordLayout::Variable),
            Err(Error::EmbeddedNul { address: 0x1000 })
        ));
    }

    #[test]
    fn fixed_layout_rejects_names_at_field_capacity() {
        let layout = RecordLayout::Fixed {
            max_symbol_length: 8,
        };
        // Seven bytes of content plus the terminator is the limit.
        assert!(encode_map(&[symbol(0x1000, "1234567")], AddressWidth::Four, layout).is_ok());
        assert!(matches!(
            encode_map(&[symbol(0x1000, "12345678")], AddressWidth::Four, layout),
            Err(Error::NameTooLong { .. })
        ));
    }

    #[test]
    fn zero_size_name_field_is_an_error_not_a_panic() {
        let layout = RecordLayout::Fixed {
            max_symbol_length: 0,
        };
        assert!(matches!(
            encode_map(&[symbol(0x1000, "f")], AddressWidth::Four, layout),
            Err(Error::NameTooLong { .. })
        ));
    }

    #[test]
    fn empty_symbol_list_is_an_error() {
        assert!(matches!(
            encode_map(&[], AddressWidth::Four, RecordLayout::Variable),
            Err(Error::EmptySymbolSet)
        ));
    }
}
