use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::AppError;

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid color regex"));

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Trimmed value of a required text field.
pub fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::BadRequest(format!("{field} is required"))),
    }
}

pub fn date_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if start >= end {
        return Err(AppError::BadRequest(
            "Start date must be before due date".to_string(),
        ));
    }
    Ok(())
}

pub fn color(value: &str) -> Result<(), AppError> {
    if HEX_COLOR.is_match(value) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Invalid color '{value}', expected #rrggbb"
        )))
    }
}

pub fn email(value: &str) -> Result<(), AppError> {
    if EMAIL.is_match(value) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid email address '{value}'")))
    }
}

pub fn bug_count(value: Option<i32>, field: &str) -> Result<(), AppError> {
    match value {
        Some(n) if n < 0 => Err(AppError::BadRequest(format!("{field} cannot be negative"))),
        _ => Ok(()),
    }
}

/// Parse a closed enumeration from its wire name, as a 400 on failure.
pub fn parse<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T, AppError> {
    value.parse().map_err(AppError::BadRequest)
}
