//! Text escaping for ILP wire values.
//!
//! Two escaping contexts exist: unquoted (table names, symbol values,
//! column names) and quoted (string column values, delimited by `"`).
//! Both escape `\`, `\n`, `\r`; the unquoted context additionally escapes
//! space, comma and `=`; the quoted context additionally escapes `"`.
//! Non-ASCII bytes are written through unchanged as raw UTF-8.

/// Escapes `s` for an unquoted context (table name, symbol key/value,
/// column name).
pub fn escape_unquoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ' ' => out.push_str("\\ "),
            ',' => out.push_str("\\,"),
            '=' => out.push_str("\\="),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\\n"),
            '\r' => out.push_str("\\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Escapes `s` for a quoted string column value (the surrounding `"`
/// delimiters are added by the caller).
pub fn escape_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\\n"),
            '\r' => out.push_str("\\\r"),
            other => out.push(other),
        }
    }
    out
}
