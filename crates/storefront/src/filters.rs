//! Askama filters used by the storefront templates.

use std::fmt::Display;

/// The calendar year, for the footer legal line.
///
/// Filters always receive the piped value; the year needs none, so templates
/// call this as `{{ ""|current_year }}`.
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}
