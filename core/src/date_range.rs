//! Date range selection shared by every chart.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{DateTime, Days, Duration, Local, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::models::Measurement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRangeFilter {
    Last7Days,
    Last30Days,
    Last90Days,
    Custom,
    #[default]
    AllTime,
}

impl DateRangeFilter {
    pub const ALL: [Self; 5] = [
        Self::Last7Days,
        Self::Last30Days,
        Self::Last90Days,
        Self::Custom,
        Self::AllTime,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Last7Days => "Last 7 Days",
            Self::Last30Days => "Last 30 Days",
            Self::Last90Days => "Last 90 Days",
            Self::Custom => "Custom Range",
            Self::AllTime => "All Time",
        }
    }

    #[must_use]
    pub fn lookback_days(self) -> Option<u32> {
        match self {
            Self::Last7Days => Some(7),
            Self::Last30Days => Some(30),
            Self::Last90Days => Some(90),
            Self::Custom | Self::AllTime => None,
        }
    }

    /// Resolve the window against the current wall-clock time.
    #[must_use]
    pub fn window(
        self,
        custom_start: Option<DateTime<Local>>,
        custom_end: Option<DateTime<Local>>,
    ) -> DateWindow {
        self.window_at(Local::now(), custom_start, custom_end)
    }

    /// Resolve the window against an explicit `now`.
    ///
    /// A custom range widens its start to midnight and its end to 23:59:59 of
    /// the given days. Without a custom start the window is unbounded, and
    /// without a custom end it closes at `now`.
    #[must_use]
    pub fn window_at(
        self,
        now: DateTime<Local>,
        custom_start: Option<DateTime<Local>>,
        custom_end: Option<DateTime<Local>>,
    ) -> DateWindow {
        match self {
            Self::Last7Days | Self::Last30Days | Self::Last90Days => {
                let days = self.lookback_days().unwrap_or_default();
                let start = now
                    .checked_sub_days(Days::new(u64::from(days)))
                    .unwrap_or_else(|| now - Duration::days(i64::from(days)));
                DateWindow {
                    start: Some(start),
                    end: now,
                }
            }
            Self::Custom => DateWindow {
                start: custom_start.map(start_of_day),
                end: custom_end.map_or(now, end_of_day),
            },
            Self::AllTime => DateWindow::unbounded(now),
        }
    }
}

impl fmt::Display for DateRangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DateRangeFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['_', '-', ' '], "").as_str() {
            "7d" | "7days" | "last7days" | "week" => Ok(Self::Last7Days),
            "30d" | "30days" | "last30days" | "month" => Ok(Self::Last30Days),
            "90d" | "90days" | "last90days" | "quarter" => Ok(Self::Last90Days),
            "custom" | "customrange" => Ok(Self::Custom),
            "all" | "alltime" => Ok(Self::AllTime),
            _ => bail!("Invalid range '{s}'. Use 7d, 30d, 90d, custom or all"),
        }
    }
}

/// A concrete `[start, end]` window. `start == None` means no lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: Option<DateTime<Local>>,
    pub end: DateTime<Local>,
}

impl DateWindow {
    #[must_use]
    pub fn unbounded(end: DateTime<Local>) -> Self {
        Self { start: None, end }
    }

    /// Inclusive on both ends. An unbounded window includes everything,
    /// including readings after `end`.
    #[must_use]
    pub fn contains(&self, timestamp: &DateTime<Local>) -> bool {
        match self.start {
            None => true,
            Some(start) => start <= *timestamp && *timestamp <= self.end,
        }
    }

    #[must_use]
    pub fn filter<'a>(&self, measurements: &'a [Measurement]) -> Vec<&'a Measurement> {
        measurements
            .iter()
            .filter(|m| self.contains(&m.timestamp))
            .collect()
    }
}

/// First instant of the same local day. When midnight falls in a DST gap
/// this is the first minute after it that exists.
#[must_use]
pub fn start_of_day(at: DateTime<Local>) -> DateTime<Local> {
    first_valid_from(at.date_naive().and_time(NaiveTime::MIN), |naive| {
        local_instant(naive, false)
    })
    .unwrap_or(at)
}

fn first_valid_from<T>(
    start: NaiveDateTime,
    resolve: impl Fn(NaiveDateTime) -> Option<T>,
) -> Option<T> {
    (0..24 * 60)
        .map(|minute| start + Duration::minutes(minute))
        .take_while(|naive| naive.date() == start.date())
        .find_map(resolve)
}

/// 23:59:59 of the same local day.
#[must_use]
pub fn end_of_day(at: DateTime<Local>) -> DateTime<Local> {
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    local_instant(at.date_naive().and_time(last_second), true).unwrap_or(at)
}

fn local_instant(naive: NaiveDateTime, latest: bool) -> Option<DateTime<Local>> {
    let resolved = Local.from_local_datetime(&naive);
    if latest {
        resolved.latest()
    } else {
        resolved.earliest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, s).earliest().unwrap()
    }

    #[test]
    fn test_lookback_windows() {
        let now = local(2025, 3, 31, 12, 0, 0);
        let w = DateRangeFilter::Last7Days.window_at(now, None, None);
        assert_eq!(w.start, Some(local(2025, 3, 24, 12, 0, 0)));
        assert_eq!(w.end, now);

        let w = DateRangeFilter::Last30Days.window_at(now, None, None);
        assert_eq!(w.start, Some(local(2025, 3, 1, 12, 0, 0)));

        let w = DateRangeFilter::Last90Days.window_at(now, None, None);
        assert_eq!(w.start, Some(local(2024, 12, 31, 12, 0, 0)));
    }

    #[test]
    fn test_lookbacks_ignore_custom_bounds() {
        let now = local(2025, 3, 31, 12, 0, 0);
        let w = DateRangeFilter::Last7Days.window_at(
            now,
            Some(local(2020, 1, 1, 0, 0, 0)),
            Some(local(2020, 1, 2, 0, 0, 0)),
        );
        assert_eq!(w.end, now);
        assert_eq!(w.start, Some(local(2025, 3, 24, 12, 0, 0)));
    }

    #[test]
    fn test_first_valid_from_skips_missing_midnight() {
        let midnight = NaiveDate::from_ymd_opt(2025, 9, 7)
            .unwrap()
            .and_time(NaiveTime::MIN);
        // Local clocks jump from 00:00 to 01:00 on this day.
        let resolved = first_valid_from(midnight, |naive| (naive.hour() >= 1).then_some(naive));
        assert_eq!(resolved, Some(midnight + Duration::hours(1)));

        let plain = first_valid_from(midnight, Some);
        assert_eq!(plain, Some(midnight));

        assert_eq!(first_valid_from(midnight, |_| None::<NaiveDateTime>), None);
    }

    #[test]
    fn test_custom_normalizes_to_whole_days() {
        let now = local(2025, 6, 1, 9, 0, 0);
        let w = DateRangeFilter::Custom.window_at(
            now,
            Some(local(2025, 1, 1, 15, 30, 0)),
            Some(local(2025, 1, 2, 6, 0, 0)),
        );
        assert_eq!(w.start, Some(local(2025, 1, 1, 0, 0, 0)));
        assert_eq!(w.end, local(2025, 1, 2, 23, 59, 59));
    }

    #[test]
    fn test_custom_boundary_inclusion() {
        let now = local(2025, 6, 1, 9, 0, 0);
        let w = DateRangeFilter::Custom.window_at(
            now,
            Some(local(2025, 1, 1, 0, 0, 0)),
            Some(local(2025, 1, 2, 0, 0, 0)),
        );
        assert!(w.contains(&local(2025, 1, 1, 0, 0, 0)));
        assert!(w.contains(&local(2025, 1, 2, 23, 59, 59)));
        assert!(!w.contains(&local(2025, 1, 3, 0, 0, 0)));
        assert!(!w.contains(&local(2024, 12, 31, 23, 59, 59)));
    }

    #[test]
    fn test_custom_without_end_uses_now() {
        let now = local(2025, 6, 1, 9, 0, 0);
        let w = DateRangeFilter::Custom.window_at(now, Some(local(2025, 5, 1, 8, 0, 0)), None);
        assert_eq!(w.end, now);
        assert_eq!(w.start.unwrap().hour(), 0);
    }

    #[test]
    fn test_custom_without_start_is_unbounded() {
        let now = local(2025, 6, 1, 9, 0, 0);
        let w = DateRangeFilter::Custom.window_at(now, None, Some(local(2025, 1, 2, 0, 0, 0)));
        assert!(w.start.is_none());
        assert!(w.contains(&local(2030, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_all_time_includes_everything() {
        let now = local(2025, 6, 1, 9, 0, 0);
        let w = DateRangeFilter::AllTime.window_at(now, None, None);
        assert!(w.start.is_none());
        assert_eq!(w.end, now);
        assert!(w.contains(&local(1970, 1, 2, 0, 0, 0)));
        // No comparison against `end` once the start is unbounded
        assert!(w.contains(&local(2026, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_window_uses_wall_clock() {
        let before = Local::now();
        let w = DateRangeFilter::Last7Days.window(None, None);
        assert!(w.end >= before);
        assert!(w.end <= Local::now());
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            "7d".parse::<DateRangeFilter>().unwrap(),
            DateRangeFilter::Last7Days
        );
        assert_eq!(
            "Last 30 Days".parse::<DateRangeFilter>().unwrap(),
            DateRangeFilter::Last30Days
        );
        assert_eq!(
            "all".parse::<DateRangeFilter>().unwrap(),
            DateRangeFilter::AllTime
        );
        assert_eq!(
            "custom".parse::<DateRangeFilter>().unwrap(),
            DateRangeFilter::Custom
        );
        assert!("fortnight".parse::<DateRangeFilter>().is_err());
    }

    #[test]
    fn test_labels() {
        let labels: Vec<&str> = DateRangeFilter::ALL.iter().map(|f| f.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Last 7 Days",
                "Last 30 Days",
                "Last 90 Days",
                "Custom Range",
                "All Time"
            ]
        );
        assert_eq!(DateRangeFilter::default(), DateRangeFilter::AllTime);
    }
}
