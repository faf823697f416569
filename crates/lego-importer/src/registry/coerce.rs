//! Text-to-column coercions shared by the table transforms
//!
//! Key helpers fail the row; non-key helpers degrade to null.

use super::SqlValue;
use crate::error::TransformError;
use crate::source::RawRecord;

fn required<'r>(record: &'r RawRecord, column: &str) -> Result<&'r str, TransformError> {
    record.get(column).ok_or_else(|| TransformError::MissingField {
        field: column.to_string(),
    })
}

/// Integer key column; empty or unparsable fails the row
pub fn key_int(record: &RawRecord, column: &str) -> Result<SqlValue, TransformError> {
    let raw = required(record, column)?;
    raw.parse::<i32>()
        .map(|n| SqlValue::Integer(Some(n)))
        .map_err(|_| TransformError::InvalidKey {
            column: column.to_string(),
            value: raw.to_string(),
        })
}

/// Text key column; empty fails the row
pub fn key_text(record: &RawRecord, column: &str) -> Result<SqlValue, TransformError> {
    let raw = required(record, column)?;
    if raw.is_empty() {
        return Err(TransformError::InvalidKey {
            column: column.to_string(),
            value: String::new(),
        });
    }
    Ok(SqlValue::Text(Some(raw.to_string())))
}

/// Integer column; missing, empty or unparsable is null
pub fn int(record: &RawRecord, column: &str) -> SqlValue {
    SqlValue::Integer(record.get(column).and_then(|raw| raw.parse().ok()))
}

/// Text column; missing or empty is null
pub fn text(record: &RawRecord, column: &str) -> SqlValue {
    text_any(record, &[column])
}

/// First non-empty value among alternative source columns
pub fn text_any(record: &RawRecord, columns: &[&str]) -> SqlValue {
    SqlValue::Text(
        columns
            .iter()
            .filter_map(|column| record.get(column))
            .find(|raw| !raw.is_empty())
            .map(str::to_string),
    )
}

/// Boolean column; `t`/`true` in any case is true, anything else false
pub fn flag(record: &RawRecord, column: &str) -> SqlValue {
    SqlValue::Boolean(record.get(column).is_some_and(is_truthy))
}

pub fn is_truthy(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("t") || raw.eq_ignore_ascii_case("true")
}
