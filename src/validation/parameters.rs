//! Validators for tool arguments.
//!
//! Each helper returns a taxonomy error naming the offending parameter, so
//! validation failures reach the caller as `MISSING_PARAMETER` or
//! `INVALID_PARAMETER` before any gateway call is made.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::errors::{AppError, Result};

/// Tool call arguments
pub type Arguments = Map<String, Value>;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    )
    .expect("EMAIL_REGEX should be a valid regex pattern");
}

fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// Fail with the first of `required` that is absent or null.
pub fn require_params(args: &Arguments, required: &[&str]) -> Result<()> {
    match required.iter().find(|name| is_absent(args.get(**name))) {
        Some(name) => Err(AppError::missing_parameter(*name)),
        None => Ok(()),
    }
}

/// Required string argument, trimmed and non-empty.
pub fn non_empty_string<'a>(args: &'a Arguments, name: &str) -> Result<&'a str> {
    optional_string(args, name)?.ok_or_else(|| AppError::missing_parameter(name))
}

/// Optional string argument; present values must be non-empty strings.
pub fn optional_string<'a>(args: &'a Arguments, name: &str) -> Result<Option<&'a str>> {
    let value = args.get(name);
    if is_absent(value) {
        return Ok(None);
    }
    match value.and_then(Value::as_str) {
        Some(s) if s.trim().is_empty() => {
            Err(AppError::invalid_parameter(name, "must not be empty"))
        }
        Some(s) => Ok(Some(s.trim())),
        None => Err(AppError::invalid_parameter(name, "must be a string")),
    }
}

/// Required string that is spliced into a URL path, so it may not contain
/// path or query delimiters.
pub fn path_segment<'a>(args: &'a Arguments, name: &str) -> Result<&'a str> {
    let value = non_empty_string(args, name)?;
    if value.contains(&['/', '?', '#'][..]) || value == "." || value == ".." {
        return Err(AppError::invalid_parameter(name, "must be a single path segment"));
    }
    Ok(value)
}

/// Positive integer given either as a JSON number or a numeric string.
pub fn positive_integer(args: &Arguments, name: &str) -> Result<u64> {
    let value = args
        .get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| AppError::missing_parameter(name))?;
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n > 0 => Ok(n as u64),
        _ => Err(AppError::invalid_parameter(name, "must be a positive integer")),
    }
}

pub fn in_range(value: i64, name: &str, min: i64, max: i64) -> Result<i64> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(AppError::invalid_parameter(name, format!("must be between {} and {}", min, max)))
    }
}

pub fn email<'a>(value: &'a str, name: &str) -> Result<&'a str> {
    if EMAIL_REGEX.is_match(value) {
        Ok(value)
    } else {
        Err(AppError::invalid_parameter(name, "must be a valid email address"))
    }
}

pub fn matches_pattern<'a>(
    value: &'a str,
    name: &str,
    pattern: &Regex,
    description: &str,
) -> Result<&'a str> {
    if pattern.is_match(value) {
        Ok(value)
    } else {
        Err(AppError::invalid_parameter(name, format!("must match {}", description)))
    }
}

pub fn one_of<'a>(value: &'a str, name: &str, allowed: &[&str]) -> Result<&'a str> {
    if allowed.contains(&value) {
        Ok(value)
    } else {
        Err(AppError::invalid_parameter(name, format!("must be one of: {}", allowed.join(", "))))
    }
}

/// Optional list of strings; absent means empty.
pub fn string_list(args: &Arguments, name: &str) -> Result<Vec<String>> {
    let value = args.get(name);
    if is_absent(value) {
        return Ok(Vec::new());
    }
    let items = value
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::invalid_parameter(name, "must be a list of strings"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| AppError::invalid_parameter(name, "must be a list of strings"))
        })
        .collect()
}

pub fn unique_items<'a>(items: &'a [String], name: &str) -> Result<&'a [String]> {
    let mut seen = HashSet::new();
    if items.iter().all(|item| seen.insert(item)) {
        Ok(items)
    } else {
        Err(AppError::invalid_parameter(name, "must not contain duplicates"))
    }
}

/// Optional boolean with a default.
pub fn bool_flag(args: &Arguments, name: &str, default: bool) -> Result<bool> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(AppError::invalid_parameter(name, "must be a boolean")),
    }
}
