//! Creators codec between delimited strings and ordered name sequences.
//!
//! Relational storage keeps one row per creator. Source records carry all
//! creators in one `;`-delimited field, and aggregation folds the rows back
//! into one `"; "`-joined string before the domain object is built.

/// Delimiter recognized when splitting creator fields.
pub const CREATOR_DELIMITER: char = ';';

/// Separator used when folding creator rows into one field.
pub const CREATOR_SEPARATOR: &str = "; ";

/// Splits a delimited creator field into trimmed, non-empty names.
pub fn split_creators(value: &str) -> Vec<String> {
    value
        .split(CREATOR_DELIMITER)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Joins creator names into one delimited field.
pub fn join_creators<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(CREATOR_SEPARATOR)
}
