//! Symbol filtering and normalization.
//!
//! A single streaming pass over the raw rows: non-code kinds and adjacent
//! duplicate addresses are dropped structurally, then each name runs through
//! an ordered chain of exclusion rules. The first matching rule drops the
//! entry entirely. Survivors keep their input order; there is no re-sorting
//! and no global dedup — only *adjacent* equal addresses collapse, which is
//! the documented behavior the kernel-side consumer expects.

use tracing::debug;

use crate::symbol::{NormalizedSymbol, RawSymbolEntry};

const VTABLE_PREFIX: &str = "vtable for ";
const STATIC_LOCAL_MARKER: &str = "::s_";
const TRAMPOLINE_PREFIX: &str = "interrupt";
const TRAMPOLINE_SUFFIX: &str = "_handler";

/// One name-based exclusion rule. Rules are independent and individually
/// testable; [`filter_symbols`] applies them in slice order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcludeRule {
    /// Compiler-emitted vtable symbols (`vtable for Foo`).
    Vtable,
    /// Function-static locals (`Foo::s_counter`), useless in a backtrace.
    StaticLocal,
    /// Raw interrupt entry stubs (`interrupt<N>_handler`); the real handler
    /// they tail-call into is the interesting frame.
    InterruptTrampoline,
    /// Names too long for the map's name field.
    Overlong { max_symbol_length: usize },
}

impl ExcludeRule {
    /// Whether this rule drops the given (normalized) name.
    pub fn excludes(&self, name: &str) -> bool {
        match self {
            ExcludeRule::Vtable => name.starts_with(VTABLE_PREFIX),
            ExcludeRule::StaticLocal => name.contains(STATIC_LOCAL_MARKER),
            ExcludeRule::InterruptTrampoline => {
                name.starts_with(TRAMPOLINE_PREFIX) && name.ends_with(TRAMPOLINE_SUFFIX)
            }
            ExcludeRule::Overlong { max_symbol_length } => name.len() + 1 > *max_symbol_length,
        }
    }
}

/// The standard rule chain.
///
/// The trampoline rule only applies to map-file input: nm output never
/// contains the raw stub names because they live in assembly sources that
/// the map file lists but the symbol table filters differently.
pub fn default_rules(include_trampolines: bool, max_symbol_length: usize) -> Vec<ExcludeRule> {
    let mut rules = vec![ExcludeRule::Vtable, ExcludeRule::StaticLocal];
    if include_trampolines {
        rules.push(ExcludeRule::InterruptTrampoline);
    }
    rules.push(ExcludeRule::Overlong { max_symbol_length });
    rules
}

/// Runs the full filter chain over the raw rows.
pub fn filter_symbols(raw: &[RawSymbolEntry], rules: &[ExcludeRule]) -> Vec<NormalizedSymbol> {
    let mut retained: Vec<NormalizedSymbol> = Vec::with_capacity(raw.len());
    let mut dropped_kind = 0usize;
    let mut dropped_adjacent = 0usize;
    let mut dropped_by_rule = 0usize;

    for entry in raw {
        if !entry.kind.is_code() {
            dropped_kind += 1;
            continue;
        }
        if retained.last().is_some_and(|prev| prev.address == entry.address) {
            dropped_adjacent += 1;
            continue;
        }
        let name = entry.raw_name.trim();
        if rules.iter().any(|rule| rule.excludes(name)) {
            dropped_by_rule += 1;
            continue;
        }
        retained.push(NormalizedSymbol {
            address: entry.address,
            name: name.to_string(),
        });
    }

    debug!(
        raw = raw.len(),
        retained = retained.len(),
        dropped_kind,
        dropped_adjacent,
        dropped_by_rule,
        "filtered symbol listing"
    );
    retained
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolKind;

    fn text(address: u64, name: &str) -> RawSymbolEntry {
        RawSymbolEntry::new(address, SymbolKind::Text, name)
    }

    #[test]
    fn non_code_kinds_are_dropped() {
        let raw = vec![
            RawSymbolEntry::new(0x1000, SymbolKind::Data, "g_boot_info"),
            RawSymbolEntry::new(0x2000, SymbolKind::Text, "main"),
            RawSymbolEntry::new(0x3000, SymbolKind::Other, "__bss_start"),
            RawSymbolEntry::new(0x4000, SymbolKind::WeakText, "operator new(unsigned long)"),
        ];
        let out = filter_symbols(&raw, &default_rules(false, 100));
        let names: Vec<&str> = out.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["main", "operator new(unsigned long)"]);
    }

    #[test]
    fn adjacent_duplicate_addresses_keep_first_only() {
        let raw = vec![
            text(0x1000, "first"),
            text(0x1000, "second"),
            text(0x2000, "third"),
        ];
        let out = filter_symbols(&raw, &default_rules(false, 100));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "first");
        assert_eq!(out[1].name, "third");
    }

    #[test]
    fn non_adjacent_duplicates_both_survive() {
        let raw = vec![
            text(0x1000, "a"),
            text(0x2000, "b"),
            text(0x1000, "a_again"),
        ];
        let out = filter_symbols(&raw, &default_rules(false, 100));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn dedup_compares_against_retained_not_raw_predecessor() {
        // The middle entry is dropped by kind, so the third entry is
        // adjacent to the first in the retained sequence.
        let raw = vec![
            text(0x1000, "kept"),
            RawSymbolEntry::new(0x1000, SymbolKind::Data, "data_twin"),
            text(0x1000, "dropped_as_adjacent"),
        ];
        let out = filter_symbols(&raw, &default_rules(false, 100));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "kept");
    }

    #[test]
    fn vtable_rule() {
        assert!(ExcludeRule::Vtable.excludes("vtable for Foo"));
        assert!(!ExcludeRule::Vtable.excludes("Foo::bar()"));
    }

    #[test]
    fn static_local_rule() {
        assert!(ExcludeRule::StaticLocal.excludes("Foo::s_counter"));
        assert!(!ExcludeRule::StaticLocal.excludes("Foo::counter()"));
    }

    #[test]
    fn trampoline_rule() {
        let rule = ExcludeRule::InterruptTrampoline;
        assert!(rule.excludes("interrupt7_handler"));
        assert!(rule.excludes("interrupt255_handler"));
        assert!(!rule.excludes("InterruptManager::handle()"));
        assert!(!rule.excludes("interrupt_statistics"));
    }

    #[test]
    fn overlong_rule_bounds_content_at_max_minus_one() {
        let rule = ExcludeRule::Overlong { max_symbol_length: 10 };
        assert!(!rule.excludes("123456789"));
        assert!(rule.excludes("1234567890"));
    }

    #[test]
    fn overlong_rule_handles_degenerate_maximum() {
        // A zero-byte name field can hold nothing; every name is overlong,
        // none of them panics the rule.
        let rule = ExcludeRule::Overlong { max_symbol_length: 0 };
        assert!(rule.excludes(""));
        assert!(rule.excludes("x"));
    }

    #[test]
    fn trampolines_pass_when_rule_disabled() {
        let raw = vec![text(0x1000, "interrupt7_handler")];
        assert_eq!(filter_symbols(&raw, &default_rules(false, 100)).len(), 1);
        assert_eq!(filter_symbols(&raw, &default_rules(true, 100)).len(), 0);
    }
}
