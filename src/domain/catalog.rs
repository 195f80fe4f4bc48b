//! Input rules shared by the ingredient and recipe write paths.

use crate::domain::error::DomainError;
use crate::domain::object_id::ObjectId;

/// Trim a display name and reject it when nothing is left.
pub fn normalize_name(raw: &str, field: &'static str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub fn ensure_non_negative_calories(value: i32) -> Result<i32, DomainError> {
    if value < 0 {
        return Err(DomainError::validation(
            "calories_per_gram must not be negative",
        ));
    }
    Ok(value)
}

/// Parse every reference of a recipe, failing on the first malformed one.
pub fn parse_references(raw: &[String]) -> Result<Vec<ObjectId>, (usize, String)> {
    raw.iter()
        .enumerate()
        .map(|(position, value)| {
            ObjectId::parse_hex(value.trim()).map_err(|err| (position, err.to_string()))
        })
        .collect()
}
