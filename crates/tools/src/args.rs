//! Argument decoding shared by the catalog tools.

use chrono::{DateTime, NaiveDate, Utc};
use selah_core::error::ToolError;
use serde::de::DeserializeOwned;

/// Decode a tool's JSON arguments into its typed payload.
pub(crate) fn parse<T: DeserializeOwned>(
    tool_name: &str,
    arguments: serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(arguments)
        .map_err(|e| ToolError::InvalidArguments(format!("{tool_name}: {e}")))
}

/// Trimmed text, or an error naming the empty field.
pub(crate) fn required(field: &str, value: String) -> Result<String, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidArguments(format!("'{field}' must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Blank optional text becomes `None`.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
pub(crate) fn due_date(raw: Option<String>) -> Result<Option<DateTime<Utc>>, ToolError> {
    let Some(raw) = optional(raw) else {
        return Ok(None);
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| ToolError::InvalidArguments(format!("unrecognized due_date '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_date_formats() {
        let plain = due_date(Some("2026-03-01".into())).unwrap().unwrap();
        assert_eq!(plain.to_rfc3339(), "2026-03-01T00:00:00+00:00");
        assert!(due_date(Some("2026-03-01T09:30:00Z".into())).unwrap().is_some());
        assert!(due_date(Some("  ".into())).unwrap().is_none());
        assert!(due_date(Some("next tuesday".into())).is_err());
    }

    #[test]
    fn required_rejects_blank() {
        assert!(required("content", "   ".into()).is_err());
        assert_eq!(required("content", " hi ".into()).unwrap(), "hi");
    }
}
