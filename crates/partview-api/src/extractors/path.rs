//! Typed path parameter helpers.

use std::str::FromStr;

use partview_core::error::AppError;

/// Parses an identifier from a path segment.
///
/// Axum's own `Path` rejection is plain text; parsing here keeps the
/// error envelope consistent.
pub fn parse_id<T: FromStr>(s: &str) -> Result<T, AppError> {
    s.parse::<T>()
        .map_err(|_| AppError::validation(format!("Invalid id: {s}")))
}
