use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime};

pub(crate) const SECONDS_PER_DAY: f64 = 86_400.0;

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Parses an RFC 3339 timestamp and normalizes it to naive UTC.
pub(crate) fn parse_rfc3339_utc(value: &str) -> Option<PrimitiveDateTime> {
    let parsed = OffsetDateTime::parse(value, &Rfc3339).ok()?.to_offset(time::UtcOffset::UTC);
    Some(PrimitiveDateTime::new(parsed.date(), parsed.time()))
}

/// Fractional days from `earlier` to `later`; negative when `earlier` is in the future.
pub(crate) fn days_between(earlier: PrimitiveDateTime, later: PrimitiveDateTime) -> f64 {
    (later - earlier).as_seconds_f64() / SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn format_primitive_outputs_utc_z() {
        let value = datetime!(2025-01-02 10:20:30);
        assert_eq!(format_primitive(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn parse_rfc3339_shifts_offsets_to_utc() {
        let parsed = parse_rfc3339_utc("2025-01-02T13:20:30+03:00").expect("parse");
        assert_eq!(parsed, datetime!(2025-01-02 10:20:30));
        assert!(parse_rfc3339_utc("yesterday").is_none());
    }

    #[test]
    fn days_between_is_fractional_and_signed() {
        let start = datetime!(2025-01-01 00:00:00);
        let later = datetime!(2025-01-03 12:00:00);
        assert!((days_between(start, later) - 2.5).abs() < 1e-9);
        assert!((days_between(later, start) + 2.5).abs() < 1e-9);
    }
}
