//! Wall-clock zone for persisted timestamps.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;

/// Either an IANA zone (`Europe/Moscow`, DST-aware) or a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Fixed(FixedOffset),
    Named(Tz),
}

impl Zone {
    /// Parse `UTC`, a fixed offset like `+03:00`, or an IANA zone name.
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(offset) = parse_utc_offset(s) {
            return Some(Self::Fixed(offset));
        }
        s.trim().parse::<Tz>().ok().map(Self::Named)
    }

    /// `instant` as wall-clock time in this zone.
    pub fn at(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Fixed(offset) => instant.with_timezone(offset),
            Self::Named(tz) => instant.with_timezone(tz).fixed_offset(),
        }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.at(Utc::now())
    }

    /// Resolve a wall-clock time in this zone. Inside a DST fold the earlier
    /// instant wins; times skipped by a DST gap resolve to `None`.
    pub fn resolve(&self, local: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Fixed(offset) => offset.from_local_datetime(local).single(),
            Self::Named(tz) => tz
                .from_local_datetime(local)
                .earliest()
                .map(|t| t.fixed_offset()),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(offset) => write!(f, "{offset}"),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// Parse `UTC`, `Z`, `GMT`, `+03:00`, `-0530` or `+3` into a fixed offset.
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if matches!(s.to_ascii_uppercase().as_str(), "UTC" | "Z" | "GMT") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    if !rest.is_ascii() {
        return None;
    }

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    if hours.is_empty() || !hours.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
