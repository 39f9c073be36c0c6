//! Conversion of plan due dates into GitHub's `due_on` timestamp format.

use chrono::NaiveDate;

const PLAN_DATE_FORMAT: &str = "%Y-%m-%d";

/// Normalize a plan-side due date into the tracker's timestamp format.
///
/// `"2025-03-01"` becomes `"2025-03-01T00:00:00Z"`. Missing, blank, or
/// unparseable input yields `None` so the caller can omit the field.
pub fn normalize_due_date(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let date = NaiveDate::parse_from_str(trimmed, PLAN_DATE_FORMAT).ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    Some(midnight.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_date_becomes_midnight_utc() {
        assert_eq!(
            normalize_due_date(Some("2025-03-01")).as_deref(),
            Some("2025-03-01T00:00:00Z")
        );
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(
            normalize_due_date(Some("  2024-12-31\n")).as_deref(),
            Some("2024-12-31T00:00:00Z")
        );
    }

    #[test]
    fn absent_and_blank_are_dropped() {
        assert_eq!(normalize_due_date(None), None);
        assert_eq!(normalize_due_date(Some("")), None);
        assert_eq!(normalize_due_date(Some("   ")), None);
    }

    #[test]
    fn free_text_and_invalid_dates_are_dropped() {
        assert_eq!(normalize_due_date(Some("March 1")), None);
        assert_eq!(normalize_due_date(Some("2025-02-30")), None);
        assert_eq!(normalize_due_date(Some("2025/03/01")), None);
        assert_eq!(normalize_due_date(Some("2025-03-01T10:00:00Z")), None);
    }

    #[test]
    fn date_portion_round_trips() {
        for raw in ["2025-03-01", "2000-02-29", "1999-12-31"] {
            let normalized = normalize_due_date(Some(raw)).unwrap();
            assert!(normalized.ends_with('Z'));
            let (date_part, _) = normalized.split_once('T').unwrap();
            let reparsed = NaiveDate::parse_from_str(date_part, PLAN_DATE_FORMAT).unwrap();
            assert_eq!(reparsed, NaiveDate::parse_from_str(raw, PLAN_DATE_FORMAT).unwrap());
        }
    }
}
