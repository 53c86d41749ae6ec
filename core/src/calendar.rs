//! Fiscal quarters and working-day arithmetic.
//!
//! Quarters are derived, never persisted: every call recomputes them from
//! the reference date it is given.

use crate::config::PlannerConfig;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Monday–Friday days in `start..=end`. No holiday calendar.
/// Returns 0 when `start > end`.
pub fn working_days(start: NaiveDate, end: NaiveDate) -> u32 {
    if start > end {
        return 0;
    }
    let total = (end - start).num_days() + 1;
    let full_weeks = total / 7;
    let mut count = full_weeks * 5;
    // Remainder: at most six days starting on start's weekday.
    let mut day = start + Duration::days(full_weeks * 7);
    while day <= end {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            count += 1;
        }
        day = day + Duration::days(1);
    }
    count as u32
}

/// One fiscal quarter: three calendar months.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalQuarter {
    /// e.g. "Q1 FY26"
    pub label: String,
    /// e.g. "Jul–Sep"
    pub month_range: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// 1..=4 within the fiscal year.
    pub number: u8,
    /// Calendar year in which the fiscal year ends.
    pub fiscal_year: i32,
    pub working_days: u32,
}

impl FiscalQuarter {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiscalCalendar {
    start_month: u32,
}

impl FiscalCalendar {
    /// `start_month` is 1-based and clamped into 1..=12.
    pub fn new(start_month: u32) -> Self {
        Self { start_month: start_month.clamp(1, 12) }
    }

    pub fn from_config(config: &PlannerConfig) -> Self {
        Self::new(config.fiscal_year_start_month)
    }

    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    /// The quarter containing `reference` and the three after it.
    pub fn next_four_quarters(&self, reference: NaiveDate) -> Vec<FiscalQuarter> {
        self.quarters_from(reference, 4)
    }

    pub fn quarter_containing(&self, date: NaiveDate) -> FiscalQuarter {
        let (fy_start_year, quarter_index) = self.locate(date);
        self.build(fy_start_year, quarter_index)
    }

    /// `count` consecutive quarters starting with the one containing `reference`.
    pub fn quarters_from(&self, reference: NaiveDate, count: usize) -> Vec<FiscalQuarter> {
        let (fy_start_year, current) = self.locate(reference);
        (0..count as u32)
            .map(|i| {
                let absolute = current + i;
                self.build(fy_start_year + (absolute / 4) as i32, absolute % 4)
            })
            .collect()
    }

    /// (calendar year the containing fiscal year starts in, 0-based quarter index)
    fn locate(&self, date: NaiveDate) -> (i32, u32) {
        let month = date.month();
        let offset = (month + 12 - self.start_month) % 12;
        let fy_start_year = if month >= self.start_month { date.year() } else { date.year() - 1 };
        (fy_start_year, offset / 3)
    }

    fn build(&self, fy_start_year: i32, quarter_index: u32) -> FiscalQuarter {
        let first_month0 = fy_start_year * 12 + (self.start_month as i32 - 1) + quarter_index as i32 * 3;
        let start = first_of_month(first_month0);
        let end = first_of_month(first_month0 + 3) - Duration::days(1);

        let fiscal_year = if self.start_month == 1 { fy_start_year } else { fy_start_year + 1 };
        let m1 = MONTH_NAMES[first_month0.rem_euclid(12) as usize];
        let m3 = MONTH_NAMES[(first_month0 + 2).rem_euclid(12) as usize];

        FiscalQuarter {
            label: format!("Q{} FY{:02}", quarter_index + 1, fiscal_year.rem_euclid(100)),
            month_range: format!("{m1}\u{2013}{m3}"),
            start,
            end,
            number: (quarter_index + 1) as u8,
            fiscal_year,
            working_days: working_days(start, end),
        }
    }
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self::from_config(&PlannerConfig::default())
    }
}

/// `next_four_quarters` with the configured fiscal calendar.
pub fn next_four_quarters(config: &PlannerConfig, reference: NaiveDate) -> Vec<FiscalQuarter> {
    FiscalCalendar::from_config(config).next_four_quarters(reference)
}

/// First day of the month `months0` months after January of year 0.
fn first_of_month(months0: i32) -> NaiveDate {
    let year = months0.div_euclid(12);
    let month = months0.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

/// First day of each of the `count` calendar months starting at `from`'s month.
pub fn month_starts(from: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let base = from.year() * 12 + from.month0() as i32;
    (0..count as i32).map(|i| first_of_month(base + i)).collect()
}
