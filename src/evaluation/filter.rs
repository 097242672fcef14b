//! Date filtering of evaluation history by year-month keys.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::evaluation::EvaluationHistoryDoc;

/// Earliest year a report may cover.
pub const MIN_YEAR: i32 = 1970;
/// Latest year a report may cover.
pub const MAX_YEAR: i32 = 9999;
/// Longest window, in months, a report may span.
pub const MAX_SPAN_MONTHS: i64 = 120;

/// Month window of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DateFilter {
    /// A single month
    Monthly { year: i32, month: u32 },
    /// Inclusive span of months
    Range {
        start_year: i32,
        start_month: u32,
        end_year: i32,
        end_month: u32,
    },
}

/// `year * 100 + month`, ordered like the calendar.
pub fn month_key(year: i32, month: u32) -> i64 {
    i64::from(year) * 100 + i64::from(month)
}

impl DateFilter {
    /// Inclusive `(start_key, end_key)`.
    pub fn key_bounds(&self) -> (i64, i64) {
        match *self {
            DateFilter::Monthly { year, month } => {
                let key = month_key(year, month);
                (key, key)
            }
            DateFilter::Range {
                start_year,
                start_month,
                end_year,
                end_month,
            } => (
                month_key(start_year, start_month),
                month_key(end_year, end_month),
            ),
        }
    }

    /// Months from start to end inclusive; zero or negative when reversed.
    pub fn span_months(&self) -> i64 {
        let (start, end) = self.key_bounds();
        let ordinal = |key: i64| (key / 100) * 12 + key % 100;
        ordinal(end) - ordinal(start) + 1
    }

    /// One-line description, e.g. `2024-03` or `2024-01 to 2024-06`.
    pub fn describe(&self) -> String {
        match *self {
            DateFilter::Monthly { year, month } => format!("{year}-{month:02}"),
            DateFilter::Range {
                start_year,
                start_month,
                end_year,
                end_month,
            } => format!("{start_year}-{start_month:02} to {end_year}-{end_month:02}"),
        }
    }
}

/// Records whose year-month lies inside the filter window.
pub fn month_filter(
    records: Vec<EvaluationHistoryDoc>,
    filter: &DateFilter,
) -> Vec<EvaluationHistoryDoc> {
    let (start, end) = filter.key_bounds();
    records
        .into_iter()
        .filter(|record| match (record.evaluation_year, record.evaluation_month) {
            (Some(year), Some(month)) => (start..=end).contains(&month_key(year, month)),
            _ => false,
        })
        .collect()
}

/// `(min_year, max_year)` for the store query.
pub fn year_bounds(filter: &DateFilter) -> (i32, i32) {
    match *filter {
        DateFilter::Monthly { year, .. } => (year, year),
        DateFilter::Range {
            start_year,
            end_year,
            ..
        } => (start_year.min(end_year), start_year.max(end_year)),
    }
}

/// Every month key from the start of the window to its end; empty when the
/// end precedes the start or the window is longer than [`MAX_SPAN_MONTHS`].
pub fn month_keys(filter: &DateFilter) -> Vec<i64> {
    let (start, end) = filter.key_bounds();
    let mut keys = Vec::new();
    let (mut year, mut month) = (start / 100, start % 100);
    if !(1..=12).contains(&month) || filter.span_months() > MAX_SPAN_MONTHS {
        return keys;
    }

    while year * 100 + month <= end {
        keys.push(year * 100 + month);
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, year: i32, month: u32) -> EvaluationHistoryDoc {
        EvaluationHistoryDoc {
            id: id.to_string(),
            evaluation_year: Some(year),
            evaluation_month: Some(month),
            ..Default::default()
        }
    }

    #[test]
    fn monthly_filter_keeps_only_that_month() {
        let records = vec![
            record("feb", 2024, 2),
            record("mar", 2024, 3),
            record("apr", 2024, 4),
            record("mar-23", 2023, 3),
        ];
        let kept = month_filter(records, &DateFilter::Monthly { year: 2024, month: 3 });
        let ids: Vec<_> = kept.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["mar"]);
    }

    #[test]
    fn range_filter_is_inclusive_across_years() {
        let filter = DateFilter::Range {
            start_year: 2023,
            start_month: 11,
            end_year: 2024,
            end_month: 2,
        };
        let records = vec![
            record("oct", 2023, 10),
            record("nov", 2023, 11),
            record("jan", 2024, 1),
            record("feb", 2024, 2),
            record("mar", 2024, 3),
        ];
        let ids: Vec<_> = month_filter(records, &filter)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["nov", "jan", "feb"]);
        assert_eq!(year_bounds(&filter), (2023, 2024));
        assert_eq!(month_keys(&filter), vec![202311, 202312, 202401, 202402]);
    }

    #[test]
    fn records_without_a_month_are_dropped() {
        let mut undated = record("x", 2024, 3);
        undated.evaluation_month = None;
        assert!(month_filter(vec![undated], &DateFilter::Monthly { year: 2024, month: 3 }).is_empty());
    }

    #[test]
    fn reversed_range_has_no_months() {
        let filter = DateFilter::Range {
            start_year: 2024,
            start_month: 5,
            end_year: 2024,
            end_month: 1,
        };
        assert!(month_keys(&filter).is_empty());
        assert!(filter.span_months() <= 0);
        assert_eq!(filter.describe(), "2024-05 to 2024-01");
    }

    #[test]
    fn windows_longer_than_the_cap_have_no_months() {
        let ten_years = DateFilter::Range {
            start_year: 2015,
            start_month: 1,
            end_year: 2024,
            end_month: 12,
        };
        assert_eq!(ten_years.span_months(), MAX_SPAN_MONTHS);
        assert_eq!(month_keys(&ten_years).len(), 120);

        let huge = DateFilter::Range {
            start_year: 0,
            start_month: 1,
            end_year: 200_000,
            end_month: 12,
        };
        assert!(month_keys(&huge).is_empty());

        let extreme = DateFilter::Range {
            start_year: i32::MIN,
            start_month: 1,
            end_year: i32::MAX,
            end_month: 12,
        };
        assert!(month_keys(&extreme).is_empty());
    }
}
