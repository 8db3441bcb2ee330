use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Fixed set of reporting windows offered to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Today,
    Yesterday,
    #[default]
    Last7Days,
    Last30Days,
    Last90Days,
}

impl TimeRange {
    pub const ALL: [Self; 5] = [
        Self::Today,
        Self::Yesterday,
        Self::Last7Days,
        Self::Last30Days,
        Self::Last90Days,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "today" => Some(Self::Today),
            "yesterday" => Some(Self::Yesterday),
            "last7days" => Some(Self::Last7Days),
            "last30days" => Some(Self::Last30Days),
            "last90days" => Some(Self::Last90Days),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Last7Days => "last7days",
            Self::Last30Days => "last30days",
            Self::Last90Days => "last90days",
        }
    }

    /// Resolve against the caller's clock. Never cached: the same range
    /// yields a different interval once the UTC date rolls over.
    pub fn resolve(self, now: DateTime<Utc>) -> DateInterval {
        let today = now.date_naive();
        match self {
            Self::Today => DateInterval::new(today, today),
            Self::Yesterday => {
                let yesterday = days_before(today, 1);
                DateInterval::new(yesterday, yesterday)
            }
            Self::Last7Days => DateInterval::new(days_before(today, 7), today),
            Self::Last30Days => DateInterval::new(days_before(today, 30), today),
            Self::Last90Days => DateInterval::new(days_before(today, 90), today),
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// Calendar-date interval, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Half-open timestamp bounds `[start 00:00, end+1 00:00)` as SQL date literals.
    pub fn timestamp_bounds(&self) -> (String, String) {
        let upper = self
            .end
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX);
        (self.start.to_string(), upper.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_known_ranges() {
        for range in TimeRange::ALL {
            assert_eq!(TimeRange::parse(range.as_str()), Some(range));
        }
    }

    #[test]
    fn test_parse_unknown_range() {
        assert_eq!(TimeRange::parse("30d"), None);
        assert_eq!(TimeRange::parse(""), None);
    }

    #[test]
    fn test_today_is_single_day() {
        let interval = TimeRange::Today.resolve(at(2024, 3, 10, 15, 0, 0));
        assert_eq!(interval, DateInterval::new(date(2024, 3, 10), date(2024, 3, 10)));
    }

    #[test]
    fn test_yesterday_crosses_month_boundary() {
        let interval = TimeRange::Yesterday.resolve(at(2024, 3, 1, 0, 0, 1));
        assert_eq!(interval, DateInterval::new(date(2024, 2, 29), date(2024, 2, 29)));
    }

    #[test]
    fn test_last_n_days() {
        let now = at(2024, 3, 31, 12, 0, 0);
        assert_eq!(TimeRange::Last7Days.resolve(now).start, date(2024, 3, 24));
        assert_eq!(TimeRange::Last30Days.resolve(now).start, date(2024, 3, 1));
        assert_eq!(TimeRange::Last90Days.resolve(now).start, date(2024, 1, 1));
        assert_eq!(TimeRange::Last90Days.resolve(now).end, date(2024, 3, 31));
    }

    #[test]
    fn test_today_rolls_over_at_midnight() {
        let before = TimeRange::Today.resolve(at(2024, 1, 15, 23, 59, 59));
        let after = TimeRange::Today.resolve(at(2024, 1, 16, 0, 0, 1));
        assert!(before.contains(date(2024, 1, 15)));
        assert!(!after.contains(date(2024, 1, 15)));
    }

    #[test]
    fn test_timestamp_bounds_are_half_open() {
        let interval = DateInterval::new(date(2024, 1, 15), date(2024, 1, 15));
        assert_eq!(
            interval.timestamp_bounds(),
            ("2024-01-15".to_string(), "2024-01-16".to_string())
        );
    }

    #[test]
    fn test_serde_names() {
        let parsed: TimeRange = serde_json::from_str("\"last30days\"").unwrap();
        assert_eq!(parsed, TimeRange::Last30Days);
        assert_eq!(serde_json::to_string(&TimeRange::Today).unwrap(), "\"today\"");
    }
}
