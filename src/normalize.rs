//! Pure transforms from raw metadata values to canonical typed values. These
//! run once per metadata key while a [`crate::content`] page is parsed, and
//! the key normalization is shared with the site configuration loader.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_yaml::Value;
use std::collections::BTreeSet;

/// Lowercases `key` and collapses every run of hyphens and spaces into a
/// single underscore, so `Posted-At`, `posted at` and `posted_at` all
/// resolve to `posted_at`.
pub fn norm_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut in_separator = false;
    for c in key.chars() {
        if c == '-' || c == ' ' {
            if !in_separator {
                out.push('_');
                in_separator = true;
            }
        } else {
            in_separator = false;
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Whether a YAML block holds nothing but blank lines and comments.
/// serde_yaml reports such input as an early end of stream rather than
/// null.
pub fn is_blank_yaml(yaml: &str) -> bool {
    yaml.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

/// Strips everything but ASCII letters and digits.
pub fn alphanum(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%B %d, %Y %H:%M",
    "%d %B %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%Y%m%d",
];

/// Parses a loosely formatted date or date-time. Zoned inputs (RFC 3339,
/// RFC 2822) keep their local wall-clock time. Returns `None` when no known
/// format matches.
pub fn parse_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Normalizes a date-like metadata value. Null and empty strings are "no
/// value"; anything else must parse.
pub fn norm_time(value: &Value) -> Result<Option<NaiveDateTime>> {
    let raw = match scalar_to_string(value) {
        Some(raw) => raw,
        None if value.is_null() => return Ok(None),
        None => return Err(Error::InvalidDate(format!("{:?}", value))),
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    match parse_time(&raw) {
        Some(dt) => Ok(Some(dt)),
        None => Err(Error::InvalidDate(raw)),
    }
}

/// Splits a tag string on commas if it has any, otherwise on whitespace, and
/// normalizes each token with [`alphanum`]. Empty tokens are dropped.
pub fn split_tags(s: &str) -> BTreeSet<String> {
    if s.contains(',') {
        norm_tag_names(s.split(','))
    } else {
        norm_tag_names(s.split_whitespace())
    }
}

/// Normalizes already-split tag names.
pub fn norm_tag_names<I, S>(names: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| alphanum(name.as_ref()))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Normalizes a tag-like metadata value: either a delimited string (see
/// [`split_tags`]) or a YAML sequence of scalars.
pub fn norm_tags(value: &Value) -> Result<BTreeSet<String>> {
    match value {
        Value::Null => Ok(BTreeSet::new()),
        Value::Sequence(items) => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                match scalar_to_string(item) {
                    Some(name) => names.push(name),
                    None => return Err(Error::InvalidTags(format!("{:?}", item))),
                }
            }
            Ok(norm_tag_names(names))
        }
        other => match scalar_to_string(other) {
            Some(s) => Ok(split_tags(&s)),
            None => Err(Error::InvalidTags(format!("{:?}", other))),
        },
    }
}

/// Renders YAML scalars as strings; `None` for null, sequences and mappings.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A metadata value that could not be normalized.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a `date`/`posted` value doesn't look like a date.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Returned when a `tags` value is neither a string nor a list of
    /// scalars.
    #[error("invalid tags: {0}")]
    InvalidTags(String),
}
