use crate::error::AppError;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// On-disk timestamp layout, e.g. `2025-12-20 09:30:00`.
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Minute-resolution layout used when rendering tables.
pub const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: u64,
    pub description: String,
    pub created_at: PrimitiveDateTime,
    pub is_complete: bool,
}

impl Task {
    pub fn new(id: u64, description: impl Into<String>, created_at: PrimitiveDateTime) -> Self {
        Self {
            id,
            description: description.into(),
            created_at,
            is_complete: false,
        }
    }

    /// `created_at` in [`TIMESTAMP_FORMAT`]. Written out by hand so encoding
    /// cannot fail; `[year]` is at most four digits without `large-dates`.
    pub fn created_timestamp(&self) -> String {
        let at = self.created_at;
        format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            at.year(),
            u8::from(at.month()),
            at.day(),
            at.hour(),
            at.minute(),
            at.second()
        )
    }

    pub fn created_display(&self) -> Result<String, AppError> {
        self.created_at
            .format(DISPLAY_FORMAT)
            .map_err(|err| AppError::invalid_data(err.to_string()))
    }
}

/// Current local wall-clock time, truncated to whole seconds so it survives
/// the on-disk format unchanged. Falls back to UTC when the local offset
/// cannot be determined.
pub fn now_timestamp() -> Result<PrimitiveDateTime, AppError> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let now = now
        .replace_nanosecond(0)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    Ok(PrimitiveDateTime::new(now.date(), now.time()))
}
