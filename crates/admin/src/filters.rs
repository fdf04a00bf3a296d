//! Askama filters for the console templates.

use std::fmt::Display;

/// Year shown in the sidebar footer.
///
/// Called as `{{ ""|current_year }}`; the piped value is unused.
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}
