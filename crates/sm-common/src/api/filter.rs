use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, de};

/// Accepts either a comma separated string (`?skills=Rust,Go`) or a JSON array
/// of strings and parses every item with `FromStr`.
pub fn delimited<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Joined(String),
        List(Vec<String>),
    }

    let Some(raw) = Option::<Raw>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let items = match raw {
        Raw::Joined(joined) => joined.split(',').map(str::to_string).collect::<Vec<_>>(),
        Raw::List(list) => list,
    };

    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<T>().map_err(de::Error::custom))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Case-insensitive literal substring match used for `name` filters.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// `IN` semantics over array fields: true when any wanted value is present.
/// An empty or absent wanted list imposes no constraint.
pub fn overlaps<T: PartialEq>(values: &[T], wanted: Option<&[T]>) -> bool {
    match wanted {
        Some(wanted) if !wanted.is_empty() => wanted.iter().any(|w| values.contains(w)),
        _ => true,
    }
}

pub fn within(
    created_at: DateTime<Utc>,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
) -> bool {
    after.is_none_or(|after| created_at >= after) && before.is_none_or(|before| created_at <= before)
}

pub fn matches_exact<T: PartialEq>(value: &T, wanted: Option<&T>) -> bool {
    wanted.is_none_or(|wanted| wanted == value)
}

/// Escape `LIKE` wildcards so user input is matched literally.
pub fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
