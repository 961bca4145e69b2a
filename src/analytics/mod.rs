//! Attendance aggregation.
//!
//! Groups employee rows by a field and counts occurrences. All groupings are
//! plain `BTreeMap`s so JSON output and chart ordering are deterministic.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::Employee;

/// Label to count mapping.
pub type Counts = BTreeMap<String, u64>;

/// Number of days shown by the daily attendance charts.
pub const RECENT_DAYS: usize = 10;

/// Response body of `GET /api/analysis/`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AttendanceSummary {
    pub total_records: usize,
    pub checkin_vs_checkout: Counts,
    pub department_distribution: Counts,
    pub role_distribution: Counts,
    /// Keyed by ISO date (`YYYY-MM-DD`).
    pub daily_attendance: Counts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Count rows by the value `field` extracts.
pub fn count_by<F>(rows: &[Employee], field: F) -> Counts
where
    F: Fn(&Employee) -> &str,
{
    let mut counts = Counts::new();
    for row in rows {
        *counts.entry(field(row).to_string()).or_insert(0) += 1;
    }
    counts
}

pub fn count_by_department(rows: &[Employee]) -> Counts {
    count_by(rows, |e| e.department.as_str())
}

pub fn count_by_role(rows: &[Employee]) -> Counts {
    count_by(rows, |e| e.role.as_str())
}

pub fn count_by_signature(rows: &[Employee]) -> Counts {
    count_by(rows, |e| e.signature.as_str())
}

/// Count rows per UTC calendar date of `time_posted`.
pub fn count_by_day(rows: &[Employee]) -> Counts {
    let mut counts = Counts::new();
    for row in rows {
        let day = row.time_posted.date_naive().format("%Y-%m-%d").to_string();
        *counts.entry(day).or_insert(0) += 1;
    }
    counts
}

/// Build the full analysis summary. Empty input is not an error.
pub fn summarize(rows: &[Employee]) -> AttendanceSummary {
    AttendanceSummary {
        total_records: rows.len(),
        checkin_vs_checkout: count_by_signature(rows),
        department_distribution: count_by_department(rows),
        role_distribution: count_by_role(rows),
        daily_attendance: count_by_day(rows),
        message: rows.is_empty().then(|| "No data available".to_string()),
    }
}

/// Entries by descending count, ties broken by label.
pub fn ranked(counts: &Counts) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counts
        .iter()
        .map(|(label, count)| (label.clone(), *count))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

/// The last `n` days of a daily grouping, oldest first.
pub fn recent_days(daily: &Counts, n: usize) -> Vec<(String, u64)> {
    let skip = daily.len().saturating_sub(n);
    daily
        .iter()
        .skip(skip)
        .map(|(day, count)| (day.clone(), *count))
        .collect()
}
