//! Resolves the Mon-Fri workweek the calendar shows and its UTC query bounds.
//!
//! Run on a weekday, the window is the current week; run on a weekend, it
//! jumps ahead to next week (there is nothing left to book this week).
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Australia::Melbourne;
use chrono_tz::Tz;

/// Bookings are displayed and matched in campus local time.
pub const DISPLAY_TZ: Tz = Melbourne;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    pub monday: NaiveDate,
    pub friday: NaiveDate,
    /// Local Monday 00:00:00.000 as a UTC instant (API query lower bound).
    pub start_utc: DateTime<Utc>,
    /// Local Friday 23:59:59.999 as a UTC instant (API query upper bound).
    pub end_utc: DateTime<Utc>,
}

impl WeekWindow {
    /// Pure function of the clock: Sat/Sun anchors roll forward to next Monday,
    /// weekday anchors snap back to this week's Monday.
    pub fn resolve(now: DateTime<Utc>) -> Self {
        let today = now.with_timezone(&DISPLAY_TZ).date_naive();
        let wd = i64::from(today.weekday().num_days_from_monday()); // Mon=0 .. Sun=6
        let monday = if wd >= 5 {
            today + Duration::days(7 - wd)
        } else {
            today - Duration::days(wd)
        };
        Self::for_monday(monday)
    }

    pub fn for_monday(monday: NaiveDate) -> Self {
        let friday = monday + Duration::days(4);
        let day_end = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap();
        Self {
            monday,
            friday,
            start_utc: local_to_utc(monday.and_time(NaiveTime::MIN)),
            end_utc: local_to_utc(friday.and_time(day_end)),
        }
    }

    /// ISO-8601 millisecond bounds with a `Z` suffix, the format the API expects.
    pub fn query_bounds(&self) -> (String, String) {
        let fmt = "%Y-%m-%dT%H:%M:%S%.3fZ";
        (
            self.start_utc.format(fmt).to_string(),
            self.end_utc.format(fmt).to_string(),
        )
    }

    /// Caption like "Week of 11–15 Aug 2025"; month and year only repeat when
    /// the week straddles a boundary.
    pub fn title(&self) -> String {
        format!("Week of {}", self.range_label())
    }

    fn range_label(&self) -> String {
        let (m, f) = (self.monday, self.friday);
        if m.year() == f.year() {
            if m.month() == f.month() {
                format!("{}–{} {}", m.day(), f.day(), f.format("%b %Y"))
            } else {
                format!("{} {} – {} {}", m.day(), m.format("%b"), f.day(), f.format("%b %Y"))
            }
        } else {
            format!(
                "{} {} – {} {}",
                m.day(),
                m.format("%b %Y"),
                f.day(),
                f.format("%b %Y")
            )
        }
    }
}

/// Converts a local wall-clock time to UTC. Ambiguous times (DST fold) take the
/// earlier instant; times inside a DST gap step forward until they exist.
fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    let mut probe = naive;
    loop {
        if let Some(local) = DISPLAY_TZ.from_local_datetime(&probe).earliest() {
            return local.with_timezone(&Utc);
        }
        probe += Duration::minutes(30);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn weekday_anchor_stays_in_current_week() {
        // Wed 13 Aug 2025 12:00 Melbourne (02:00 UTC)
        let w = WeekWindow::resolve(utc("2025-08-13T02:00:00Z"));
        assert_eq!(w.monday, NaiveDate::from_ymd_opt(2025, 8, 11).unwrap());
        assert_eq!(w.friday, NaiveDate::from_ymd_opt(2025, 8, 15).unwrap());
    }

    #[test]
    fn weekend_anchor_rolls_to_next_week() {
        // Sat 16 Aug 2025 Melbourne
        let w = WeekWindow::resolve(utc("2025-08-16T02:00:00Z"));
        assert_eq!(w.monday, NaiveDate::from_ymd_opt(2025, 8, 18).unwrap());
        // Sun 17 Aug 2025 Melbourne
        let w = WeekWindow::resolve(utc("2025-08-17T02:00:00Z"));
        assert_eq!(w.monday, NaiveDate::from_ymd_opt(2025, 8, 18).unwrap());
    }

    #[test]
    fn utc_bounds_cover_local_midnights() {
        // August: Melbourne is UTC+10 (no DST).
        let w = WeekWindow::for_monday(NaiveDate::from_ymd_opt(2025, 8, 11).unwrap());
        assert_eq!(w.start_utc, utc("2025-08-10T14:00:00Z"));
        assert_eq!(w.end_utc, utc("2025-08-15T13:59:59.999Z"));
        let (s, e) = w.query_bounds();
        assert_eq!(s, "2025-08-10T14:00:00.000Z");
        assert_eq!(e, "2025-08-15T13:59:59.999Z");
    }

    #[test]
    fn title_same_month() {
        let w = WeekWindow::for_monday(NaiveDate::from_ymd_opt(2025, 8, 11).unwrap());
        assert_eq!(w.title(), "Week of 11–15 Aug 2025");
    }

    #[test]
    fn title_cross_month_and_year() {
        let w = WeekWindow::for_monday(NaiveDate::from_ymd_opt(2025, 9, 29).unwrap());
        assert_eq!(w.title(), "Week of 29 Sep – 3 Oct 2025");
        let w = WeekWindow::for_monday(NaiveDate::from_ymd_opt(2025, 12, 29).unwrap());
        assert_eq!(w.title(), "Week of 29 Dec 2025 – 2 Jan 2026");
    }
}
