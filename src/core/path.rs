//! Lookup of a numeric rate inside a ticker's JSON body.
//!
//! Paths are dotted with optional array indices: `last`, `time.unix`,
//! `result[0].price`, `data.items.1.rate`.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Path {0} not found in response")]
    Missing(String),
    #[error("Value at {path} is not numeric: {value}")]
    NotNumeric { path: String, value: String },
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn parse_path(path: &str) -> Result<Vec<Segment<'_>>, PathError> {
    let invalid = || PathError::InvalidPath(path.to_string());
    let mut segments = Vec::new();

    for part in path.split('.') {
        let (key, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if key.is_empty() && rest.is_empty() {
            return Err(invalid());
        }
        if !key.is_empty() {
            segments.push(Segment::Key(key));
        }
        while !rest.is_empty() {
            let close = rest.find(']').ok_or_else(invalid)?;
            if !rest.starts_with('[') {
                return Err(invalid());
            }
            let index = rest[1..close].parse::<usize>().map_err(|_| invalid())?;
            segments.push(Segment::Index(index));
            rest = &rest[close + 1..];
        }
    }

    Ok(segments)
}

/// Walks `path` through `value`. A bare numeric key also indexes arrays.
pub fn lookup<'v>(value: &'v Value, path: &str) -> Result<&'v Value, PathError> {
    let missing = || PathError::Missing(path.to_string());
    let mut current = value;

    for segment in parse_path(path)? {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key).ok_or_else(missing)?,
            (Segment::Key(key), Value::Array(items)) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .ok_or_else(missing)?,
            (Segment::Index(i), Value::Array(items)) => items.get(i).ok_or_else(missing)?,
            _ => return Err(missing()),
        };
    }

    Ok(current)
}

/// Extracts a finite `f64` at `path`. Tickers often quote prices as strings,
/// so numeric strings are accepted (leading numeric prefix, like `"237.90 USD"`).
pub fn extract_rate(value: &Value, path: &str) -> Result<f64, PathError> {
    let found = lookup(value, path)?;
    let not_numeric = || PathError::NotNumeric {
        path: path.to_string(),
        value: found.to_string(),
    };

    let rate = match found {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    }
    .ok_or_else(not_numeric)?;

    if rate.is_finite() {
        Ok(rate)
    } else {
        Err(not_numeric())
    }
}

fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}
