//! Timestamp parsing and formatting shared by both record representations.
//!
//! Output is always UTC with an explicit `+00:00` offset, with microseconds
//! only when the instant has a sub-second part:
//! `2025-05-30T10:00:00+00:00`, `2025-05-01T22:36:24.105812+00:00`.

use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Parse an ISO 8601 timestamp.
///
/// Accepts RFC 3339 (`Z` or numeric offset), date-times without an offset
/// (taken as UTC) and bare dates (midnight UTC).
pub fn parse(input: &str) -> Option<OffsetDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(ts) = OffsetDateTime::parse(input, &Rfc3339) {
        return Some(ts);
    }
    if let Ok(ts) = OffsetDateTime::parse(input, &Iso8601::DEFAULT) {
        return Some(ts);
    }
    if let Ok(ts) = PrimitiveDateTime::parse(input, &Iso8601::DEFAULT) {
        return Some(ts.assume_utc());
    }
    Date::parse(input, &Iso8601::DEFAULT)
        .ok()
        .map(|date| date.midnight().assume_utc())
}

/// Parse an optional timestamp, falling back to the current instant.
pub fn parse_or_now(input: Option<&str>) -> OffsetDateTime {
    input
        .and_then(parse)
        .unwrap_or_else(OffsetDateTime::now_utc)
}

/// Format an instant as UTC with full offset notation.
pub fn format(ts: OffsetDateTime) -> String {
    let utc = ts.to_offset(UtcOffset::UTC);
    let mut out = format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour(),
        utc.minute(),
        utc.second()
    );
    let micros = utc.microsecond();
    if micros != 0 {
        out.push_str(&format!(".{micros:06}"));
    }
    out.push_str("+00:00");
    out
}

/// Serde adapters storing an `OffsetDateTime` as a [`format`]ted string.
pub mod serde {
    use ::serde::de::Error as _;
    use ::serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use ::serde::de::Error as _;
        use ::serde::{Deserialize, Deserializer, Serializer};
        use time::OffsetDateTime;

        pub fn serialize<S: Serializer>(
            ts: &Option<OffsetDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => serializer.serialize_str(&super::super::format(*ts)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<OffsetDateTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}"))),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_zulu_and_offsets() {
        assert_eq!(
            parse("2025-05-01T00:00:00Z"),
            Some(datetime!(2025-05-01 00:00:00 UTC))
        );
        assert_eq!(
            parse("2025-05-01T02:00:00+02:00").map(|ts| ts.to_offset(UtcOffset::UTC)),
            Some(datetime!(2025-05-01 00:00:00 UTC))
        );
        assert_eq!(
            parse("2025-05-30T10:00:00.000Z"),
            Some(datetime!(2025-05-30 10:00:00 UTC))
        );
    }

    #[test]
    fn parses_naive_and_date_only_as_utc() {
        assert_eq!(
            parse("2025-05-01T08:30:00"),
            Some(datetime!(2025-05-01 08:30:00 UTC))
        );
        assert_eq!(parse("2025-05-01"), Some(datetime!(2025-05-01 00:00:00 UTC)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("yesterday"), None);
        assert_eq!(parse("2025-13-45T99:00:00Z"), None);
    }

    #[test]
    fn parse_or_now_falls_back() {
        let before = OffsetDateTime::now_utc();
        let ts = parse_or_now(Some("not a date"));
        assert!(ts >= before);
        assert_eq!(ts.offset(), UtcOffset::UTC);
        assert!(parse_or_now(None) >= before);
    }

    #[test]
    fn formats_utc_with_full_offset() {
        assert_eq!(
            format(datetime!(2025-05-30 10:00:00 UTC)),
            "2025-05-30T10:00:00+00:00"
        );
        assert_eq!(
            format(datetime!(2025-05-30 12:00:00 +02:00)),
            "2025-05-30T10:00:00+00:00"
        );
        assert_eq!(
            format(datetime!(2025-05-01 22:36:24.105812 UTC)),
            "2025-05-01T22:36:24.105812+00:00"
        );
    }
}
