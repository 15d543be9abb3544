//! Table/column/symbol name validation.
//!
//! Names are measured in UTF-8 bytes against `max_name_len`, not in chars.
//! A name built from multi-byte characters can be shorter in characters
//! than `max_name_len` but still rejected on byte length.

use crate::error::{Error, Result};

const BOM: char = '\u{FEFF}';

fn is_forbidden_common(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1F}' | '\u{7F}') || c == BOM
}

/// Characters forbidden in a table name, beyond the common control set.
fn is_forbidden_table_char(c: char) -> bool {
    is_forbidden_common(c)
        || matches!(
            c,
            '?' | ',' | '\'' | '"' | '\\' | '/' | ':' | ')' | '(' | '+' | '*' | '%' | '~' | '\r' | '\n'
        )
}

/// Characters forbidden in a column/symbol name: the table set plus `-`
/// and `.` (table names allow internal `.` as a path-like separator;
/// column names don't allow it at all).
fn is_forbidden_column_char(c: char) -> bool {
    is_forbidden_table_char(c) || c == '-' || c == '.'
}

fn check_len(name: &str, max_name_len: usize) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name("name must not be empty"));
    }
    if name.len() > max_name_len {
        return Err(Error::invalid_name(format!(
            "name '{name}' exceeds the maximum length of {max_name_len} bytes"
        )));
    }
    Ok(())
}

/// Validates a table name: non-empty, within `max_name_len` UTF-8 bytes,
/// free of the forbidden byte set, and `.` neither leading/trailing nor
/// doubled.
pub fn validate_table_name(name: &str, max_name_len: usize) -> Result<()> {
    check_len(name, max_name_len)?;

    if name.starts_with('.') || name.ends_with('.') {
        return Err(Error::invalid_name(format!(
            "table name '{name}' must not start or end with '.'"
        )));
    }
    if name.contains("..") {
        return Err(Error::invalid_name(format!(
            "table name '{name}' must not contain consecutive '.'"
        )));
    }

    if let Some(bad) = name.chars().find(|&c| is_forbidden_table_char(c)) {
        return Err(Error::invalid_name(format!(
            "table name '{name}' contains forbidden character {bad:?}"
        )));
    }
    Ok(())
}

/// Validates a column or symbol name.
pub fn validate_column_name(name: &str, max_name_len: usize) -> Result<()> {
    check_len(name, max_name_len)?;

    if let Some(bad) = name.chars().find(|&c| is_forbidden_column_char(c)) {
        return Err(Error::invalid_name(format!(
            "column name '{name}' contains forbidden character {bad:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_names() {
        assert!(validate_table_name("metrics", 127).is_ok());
        assert!(validate_column_name("tag", 127).is_ok());
    }

    #[test]
    fn table_name_allows_internal_dot() {
        assert!(validate_table_name("a.b.c", 127).is_ok());
    }

    #[test]
    fn table_name_rejects_leading_trailing_dot() {
        assert!(validate_table_name(".leading", 127).is_err());
        assert!(validate_table_name("trailing.", 127).is_err());
    }

    #[test]
    fn table_name_rejects_consecutive_dots() {
        assert!(validate_table_name("a..b", 127).is_err());
    }

    #[test]
    fn column_name_rejects_dot_and_dash() {
        assert!(validate_column_name("a.b", 127).is_err());
        assert!(validate_column_name("a-b", 127).is_err());
    }

    #[test]
    fn rejects_forbidden_characters() {
        for bad in ['?', ',', '\'', '"', '\\', '/', ':', ')', '(', '+', '*', '%', '~'] {
            let name = format!("x{bad}y");
            assert!(
                validate_table_name(&name, 127).is_err(),
                "expected {bad:?} to be forbidden in table names"
            );
            assert!(
                validate_column_name(&name, 127).is_err(),
                "expected {bad:?} to be forbidden in column names"
            );
        }
    }

    #[test]
    fn rejects_control_characters_and_bom() {
        assert!(validate_table_name("a\u{0}b", 127).is_err());
        assert!(validate_table_name("a\u{7F}b", 127).is_err());
        assert!(validate_table_name("a\u{FEFF}b", 127).is_err());
    }

    #[test]
    fn rejects_empty_names() {
        assert!(validate_table_name("", 127).is_err());
        assert!(validate_column_name("", 127).is_err());
    }

    #[test]
    fn length_measured_in_utf8_bytes_not_chars() {
        // 3-byte UTF-8 character repeated: 10 chars, 30 bytes.
        let name: String = std::iter::repeat('\u{20AC}').take(10).collect();
        assert!(validate_table_name(&name, 20).is_err());
        assert!(validate_table_name(&name, 30).is_ok());
    }

    proptest::proptest! {
        #[test]
        fn validation_accepts_or_rejects_every_input(s in "\\PC*") {
            let max = 127;
            let forbidden_table: Vec<char> = s.chars().filter(|&c| is_forbidden_table_char(c)).collect();
            match validate_table_name(&s, max) {
                Ok(()) => proptest::prop_assert!(forbidden_table.is_empty() && !s.is_empty() && s.len() <= max && !s.starts_with('.') && !s.ends_with('.') && !s.contains("..")),
                Err(_) => proptest::prop_assert!(!forbidden_table.is_empty() || s.is_empty() || s.len() > max || s.starts_with('.') || s.ends_with('.') || s.contains("..")),
            }
        }
    }
}
