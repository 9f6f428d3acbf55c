//! Internal helpers for input normalization and validation.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so every operation enforces the same invariants.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{EngineError, MoneyCents, ResultEngine};

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.nfc().collect())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn require_positive(amount: MoneyCents, label: &str) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidAmount(format!("{label} must be > 0")));
    }
    Ok(())
}

/// Display form of a category: trimmed, NFC, inner whitespace collapsed.
pub(crate) fn normalize_category_display(value: &str) -> ResultEngine<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    normalize_required_name(&collapsed, "category")
}

/// Comparison key of a category: case and accent insensitive.
pub(crate) fn category_key(display: &str) -> String {
    display
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_key_ignores_case_and_accents() {
        let display = normalize_category_display("  Mangime   Extra ").unwrap();
        assert_eq!(display, "Mangime Extra");
        assert_eq!(category_key("Caffè"), category_key("CAFFE"));
        assert!(normalize_category_display("   ").is_err());
    }
}
