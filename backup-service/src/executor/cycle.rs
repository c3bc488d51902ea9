//! Cycle identity.
//!
//! A cycle id is the local start time formatted `YYYYMMDD_HHMMSS`. Every
//! field is zero-padded and fixed-width, so sorting ids (or any filename that
//! embeds one at the same position) as strings sorts them chronologically.
//! Manifest listings depend on this.

use chrono::{Duration, Local, NaiveDateTime, Timelike};
use std::fmt;

pub const CYCLE_ID_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Human-readable form used inside artifact headers and manifests.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleId {
    started_at: NaiveDateTime,
    text: String,
}

impl CycleId {
    pub fn from_datetime(started_at: NaiveDateTime) -> Self {
        Self {
            text: started_at.format(CYCLE_ID_FORMAT).to_string(),
            started_at,
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(text, CYCLE_ID_FORMAT)
            .ok()
            .map(Self::from_datetime)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Issues strictly increasing cycle ids for one process.
#[derive(Debug, Default)]
pub struct CycleClock {
    last: Option<NaiveDateTime>,
}

impl CycleClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for a cycle starting now.
    pub fn next(&mut self) -> CycleId {
        self.next_at(Local::now().naive_local())
    }

    /// Id for a cycle starting at `now`. If `now` (at second resolution) is
    /// not after the previous id, the previous id plus one second is used.
    pub fn next_at(&mut self, now: NaiveDateTime) -> CycleId {
        let now = now.with_nanosecond(0).unwrap_or(now);
        let at = match self.last {
            Some(last) if now <= last => last + Duration::seconds(1),
            _ => now,
        };
        self.last = Some(at);
        CycleId::from_datetime(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_format_is_fixed_width() {
        let id = CycleId::from_datetime(at(2024, 1, 2, 3, 4, 5));
        assert_eq!(id.as_str(), "20240102_030405");
        assert_eq!(id.as_str().len(), 15);
        assert_eq!(CycleId::parse("20240102_030405"), Some(id));
        assert_eq!(CycleId::parse("2024-01-02"), None);
    }

    #[test]
    fn test_string_order_matches_time_order() {
        let instants = [
            at(1999, 12, 31, 23, 59, 59),
            at(2000, 1, 1, 0, 0, 0),
            at(2000, 1, 1, 0, 0, 9),
            at(2000, 1, 1, 0, 0, 10),
            at(2000, 1, 1, 9, 59, 59),
            at(2000, 1, 1, 10, 0, 0),
            at(2000, 2, 9, 0, 0, 0),
            at(2000, 10, 1, 0, 0, 0),
            at(2024, 9, 30, 23, 0, 0),
            at(2024, 10, 1, 1, 0, 0),
        ];

        for (i, a) in instants.iter().enumerate() {
            for b in &instants[i + 1..] {
                let (ia, ib) = (CycleId::from_datetime(*a), CycleId::from_datetime(*b));
                assert!(a < b);
                assert!(ia.as_str() < ib.as_str(), "{} !< {}", ia, ib);
            }
        }
    }

    #[test]
    fn test_clock_never_repeats() {
        let mut clock = CycleClock::new();
        let t = at(2024, 5, 1, 12, 0, 0);

        let first = clock.next_at(t);
        let second = clock.next_at(t);
        let third = clock.next_at(t - Duration::hours(1));
        let later = clock.next_at(t + Duration::minutes(5));

        assert_eq!(first.as_str(), "20240501_120000");
        assert_eq!(second.as_str(), "20240501_120001");
        assert_eq!(third.as_str(), "20240501_120002");
        assert_eq!(later.as_str(), "20240501_120500");
        assert!(first < second && second < third && third < later);
    }
}
