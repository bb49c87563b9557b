//! Calendar days and reporting-period keys.
//!
//! Message timestamps are reduced to a [`Day`] (a plain year/month/day
//! triple) during packing; all per-period aggregation happens over *keys*
//! derived from days:
//!
//! - date key: `YYYY-MM-DD`
//! - week key: `YYYY-MM--W`, where `W` is the zero-based week *within the
//!   month* (days 1-7 are week 0). Weeks never span a month boundary, which
//!   keeps the date→week table monotonic.
//! - month key: `YYYY-MM`
//!
//! [`gen_time_keys`] materializes the key lists for a date range once per
//! database, so blocks can index per-day counters by position instead of
//! hashing strings in the hot loop.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ChatstatsError, Result};

/// A calendar day, kept as plain fields to stay cheap to copy and pack.
///
/// `month` and `day` are 1-based. Ordering is chronological.
///
/// # Example
///
/// ```rust
/// use chatstats::time::Day;
///
/// let day = Day::new(2020, 6, 15);
/// assert_eq!(day.date_key(), "2020-06-15");
/// assert_eq!(day.week_key(), "2020-06--2");
/// assert_eq!(day.month_key(), "2020-06");
/// assert_eq!(Day::from_binary(day.to_binary()), day);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Day {
    pub year: u16,
    /// 1-12
    pub month: u8,
    /// 1-31
    pub day: u8,
}

impl Day {
    /// Creates a day from raw fields. Not validated; see [`Day::to_date`].
    #[must_use]
    pub fn new(year: u16, month: u8, day: u8) -> Self {
        Day { year, month, day }
    }

    /// Converts a chrono date.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Day {
            year: date.year() as u16,
            month: date.month() as u8,
            day: date.day() as u8,
        }
    }

    /// Parses a date key (`YYYY-MM-DD`), month key (`YYYY-MM`) or week key
    /// (`YYYY-MM--W`) back into a day, anchored at the period start.
    ///
    /// # Errors
    ///
    /// Returns [`ChatstatsError::InvalidDate`] if the key does not parse or
    /// names an impossible calendar date.
    pub fn from_key(key: &str) -> Result<Self> {
        let bad = || ChatstatsError::invalid_date(key);

        let parts: Vec<&str> = key.split('-').collect();
        let day = match parts.as_slice() {
            [y, m] => Day {
                year: y.parse().map_err(|_| bad())?,
                month: m.parse().map_err(|_| bad())?,
                day: 1,
            },
            [y, m, d] => Day {
                year: y.parse().map_err(|_| bad())?,
                month: m.parse().map_err(|_| bad())?,
                day: d.parse().map_err(|_| bad())?,
            },
            // Week keys contain "--", which split sees as an empty segment.
            [y, m, "", w] => {
                let week: u8 = w.parse().map_err(|_| bad())?;
                Day {
                    year: y.parse().map_err(|_| bad())?,
                    month: m.parse().map_err(|_| bad())?,
                    day: week * 7 + 1,
                }
            }
            _ => return Err(bad()),
        };

        // Reject keys like 2020-13-40 even though they split fine.
        day.to_date().ok_or_else(bad)?;
        Ok(day)
    }

    /// Unpacks a day from its 21-bit wire form.
    #[must_use]
    pub fn from_binary(binary: u32) -> Self {
        Day {
            year: (binary >> 9) as u16,
            month: ((binary >> 5) & 0b1111) as u8,
            day: (binary & 0b11111) as u8,
        }
    }

    /// Packs the day into 21 bits: `year << 9 | month << 5 | day`.
    #[must_use]
    pub fn to_binary(self) -> u32 {
        (u32::from(self.year) << 9) | (u32::from(self.month) << 5) | u32::from(self.day)
    }

    /// The chrono date, or `None` for impossible field combinations.
    #[must_use]
    pub fn to_date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))
    }

    /// Midnight UTC of this day, in milliseconds since the epoch.
    #[must_use]
    pub fn timestamp_millis(self) -> Option<i64> {
        Some(self.to_date()?.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
    }

    /// The following calendar day.
    #[must_use]
    pub fn next_day(self) -> Option<Self> {
        self.to_date()?.succ_opt().map(Day::from_date)
    }

    /// `YYYY-MM-DD`
    #[must_use]
    pub fn date_key(self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }

    /// `YYYY-MM--W` with the week aligned to the month (days 1-7 are week 0).
    #[must_use]
    pub fn week_key(self) -> String {
        format!("{:04}-{:02}--{}", self.year, self.month, (self.day - 1) / 7)
    }

    /// `YYYY-MM`
    #[must_use]
    pub fn month_key(self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// Per-period key tables for a database's date range, built once by
/// [`gen_time_keys`].
///
/// `date_keys[i]` is the key of day index `i`; `date_to_week[i]` and
/// `date_to_month[i]` map that day to positions in `week_keys` and
/// `month_keys`. Blocks aggregate into vectors indexed this way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeKeys {
    pub date_keys: Vec<String>,
    pub week_keys: Vec<String>,
    pub month_keys: Vec<String>,
    pub date_to_week: Vec<usize>,
    pub date_to_month: Vec<usize>,
}

impl TimeKeys {
    /// Number of days covered.
    #[must_use]
    pub fn num_days(&self) -> usize {
        self.date_keys.len()
    }
}

/// Generates the key tables for every day from `start` to `end` inclusive.
///
/// Keys appear in chronological order and week/month keys are deduplicated
/// as the scan advances, so the mapping tables are non-decreasing.
///
/// # Errors
///
/// Returns [`ChatstatsError::InvalidDate`] if either bound is not a real
/// calendar date or `start` is after `end`.
///
/// # Example
///
/// ```rust
/// use chatstats::time::{Day, gen_time_keys};
///
/// let keys = gen_time_keys(Day::new(2020, 1, 30), Day::new(2020, 2, 2)).unwrap();
/// assert_eq!(keys.date_keys.len(), 4);
/// assert_eq!(keys.month_keys, vec!["2020-01", "2020-02"]);
/// assert_eq!(keys.date_to_month, vec![0, 0, 1, 1]);
/// ```
pub fn gen_time_keys(start: Day, end: Day) -> Result<TimeKeys> {
    let start_date = start
        .to_date()
        .ok_or_else(|| ChatstatsError::invalid_date(start.date_key()))?;
    let end_date = end
        .to_date()
        .ok_or_else(|| ChatstatsError::invalid_date(end.date_key()))?;
    if start_date > end_date {
        return Err(ChatstatsError::invalid_date(end.date_key()));
    }

    let mut keys = TimeKeys {
        date_keys: Vec::new(),
        week_keys: Vec::new(),
        month_keys: Vec::new(),
        date_to_week: Vec::new(),
        date_to_month: Vec::new(),
    };

    let mut date = start_date;
    loop {
        let day = Day::from_date(date);
        let week_key = day.week_key();
        let month_key = day.month_key();

        if keys.week_keys.last() != Some(&week_key) {
            keys.week_keys.push(week_key);
        }
        if keys.month_keys.last() != Some(&month_key) {
            keys.month_keys.push(month_key);
        }
        keys.date_keys.push(day.date_key());
        keys.date_to_week.push(keys.week_keys.len() - 1);
        keys.date_to_month.push(keys.month_keys.len() - 1);

        if date >= end_date {
            break;
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    Ok(keys)
}

// ============================================================================
// Tests
// ============================================================================
