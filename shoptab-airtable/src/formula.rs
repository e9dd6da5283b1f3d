//! `filterByFormula` builders.
//!
//! Airtable query formulas embed field names in braces and string literals
//! in single quotes; values are escaped so quoted input cannot break out of
//! the literal.

/// Build an exact-match formula: `{Field}='value'`.
pub fn eq(field: &str, value: &str) -> String {
    format!("{{{field}}}='{}'", escape(value))
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
