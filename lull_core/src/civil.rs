//! Civil (wall-clock) time conversions.
//!
//! The pipeline only ever asks two questions of a time zone: what are the
//! civil fields of this instant, and which instant do these civil fields
//! name. Zone rules come from chrono / chrono-tz.

use crate::{Error, Result};
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

/// Wall-clock fields in some zone
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CivilFields {
    pub date: NaiveDate,
    pub hour: u32,
    pub minute: u32,
}

impl CivilFields {
    pub fn new(date: NaiveDate, hour: u32, minute: u32) -> Self {
        Self { date, hour, minute }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }

    fn naive(&self) -> NaiveDateTime {
        let time = chrono::NaiveTime::from_hms_opt(self.hour.min(23), self.minute.min(59), 0)
            .unwrap_or(chrono::NaiveTime::MIN);
        self.date.and_time(time)
    }
}

/// Civil time service for one zone.
pub trait CivilTime {
    fn to_civil(&self, instant: DateTime<Utc>) -> CivilFields;
    fn from_civil(&self, fields: CivilFields) -> DateTime<Utc>;
}

impl<Tz: TimeZone> CivilTime for Tz {
    fn to_civil(&self, instant: DateTime<Utc>) -> CivilFields {
        let local = instant.with_timezone(self).naive_local();
        CivilFields {
            date: local.date(),
            hour: local.hour(),
            minute: local.minute(),
        }
    }

    fn from_civil(&self, fields: CivilFields) -> DateTime<Utc> {
        let naive = fields.naive();
        match self.from_local_datetime(&naive) {
            // DST fall-back: take the earlier of the two instants
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
            LocalResult::None => {
                // Spring-forward gap; an hour later always exists
                let shifted = naive + Duration::hours(1);
                match self.from_local_datetime(&shifted) {
                    LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                        dt.with_timezone(&Utc)
                    }
                    LocalResult::None => Utc.from_utc_datetime(&naive),
                }
            }
        }
    }
}

/// Instant of `hour:minute` on the civil date containing `instant`.
pub fn same_day_at(
    zone: &impl CivilTime,
    instant: DateTime<Utc>,
    hour: u32,
    minute: u32,
) -> DateTime<Utc> {
    let civil = zone.to_civil(instant);
    zone.from_civil(CivilFields::new(civil.date, hour, minute))
}

/// Most recent `hour:00` boundary at or before `now` in the zone.
pub fn day_start_at_or_before(
    zone: &impl CivilTime,
    now: DateTime<Utc>,
    hour: u32,
) -> DateTime<Utc> {
    let today = same_day_at(zone, now, hour, 0);
    if today <= now {
        return today;
    }
    let civil = zone.to_civil(now);
    let yesterday = civil.date.pred_opt().unwrap_or(civil.date);
    zone.from_civil(CivilFields::new(yesterday, hour, 0))
}

/// Resolve an IANA zone identifier.
pub fn parse_zone(name: &str) -> Result<chrono_tz::Tz> {
    name.trim()
        .parse::<chrono_tz::Tz>()
        .map_err(|e| Error::Config(format!("Unknown time zone '{}': {}", name, e)))
}
