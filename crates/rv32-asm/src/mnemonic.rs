//! Mnemonic resolution derived from the core instruction table.

use std::collections::HashMap;
use std::sync::OnceLock;

use rv32_core::{Mnemonic, INSTRUCTION_TABLE};

/// Shortest accepted mnemonic token.
pub const MIN_MNEMONIC_LEN: usize = 2;
/// Longest accepted mnemonic token.
pub const MAX_MNEMONIC_LEN: usize = 6;

fn mnemonic_index() -> &'static HashMap<&'static str, Mnemonic> {
    static INDEX: OnceLock<HashMap<&'static str, Mnemonic>> = OnceLock::new();
    INDEX.get_or_init(|| {
        INSTRUCTION_TABLE
            .iter()
            .map(|spec| (spec.name, spec.mnemonic))
            .collect()
    })
}

/// Resolves a mnemonic token.
///
/// Matching is ASCII case-insensitive.
#[must_use]
pub fn resolve_mnemonic(name: &str) -> Option<Mnemonic> {
    mnemonic_index()
        .get(name.to_ascii_lowercase().as_str())
        .copied()
}

/// Returns `true` when `token` has the shape of a mnemonic: 2 to 6 ASCII letters.
#[must_use]
pub fn is_well_formed_mnemonic(token: &str) -> bool {
    (MIN_MNEMONIC_LEN..=MAX_MNEMONIC_LEN).contains(&token.len())
        && token.bytes().all(|b| b.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rv32_core::{Mnemonic, INSTRUCTION_TABLE};

    use super::{is_well_formed_mnemonic, mnemonic_index, resolve_mnemonic};

    #[test]
    fn every_table_row_resolves_to_its_mnemonic() {
        for spec in INSTRUCTION_TABLE {
            assert_eq!(resolve_mnemonic(spec.name), Some(spec.mnemonic));
            assert!(is_well_formed_mnemonic(spec.name), "{}", spec.name);
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(resolve_mnemonic("ADD"), Some(Mnemonic::Add));
        assert_eq!(resolve_mnemonic("mUlHsU"), Some(Mnemonic::Mulhsu));
    }

    #[test]
    fn unknown_mnemonic_returns_none() {
        assert_eq!(resolve_mnemonic("nop"), None);
        assert_eq!(resolve_mnemonic("ecall"), None);
        assert_eq!(resolve_mnemonic(""), None);
    }

    #[test]
    fn index_covers_every_mnemonic_once() {
        let resolved: HashSet<_> = mnemonic_index().values().copied().collect();
        assert_eq!(resolved.len(), INSTRUCTION_TABLE.len());
        assert_eq!(mnemonic_index().len(), 45);
    }

    #[test]
    fn mnemonic_shape_rules() {
        assert!(is_well_formed_mnemonic("or"));
        assert!(is_well_formed_mnemonic("mulhsu"));
        assert!(!is_well_formed_mnemonic("a"));
        assert!(!is_well_formed_mnemonic("toolong"));
        assert!(!is_well_formed_mnemonic("add1"));
        assert!(!is_well_formed_mnemonic("x.y"));
    }
}
