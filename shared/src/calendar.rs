//! Calendar month-grid arithmetic.
//!
//! Pure date math, no clock access: the same (year, month) input always yields
//! the same grid. Datetimes derived from grid cells anchor at noon so that
//! DST or UTC-to-local rounding can never shift them across a date boundary.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// A month grid is always six full weeks.
pub const GRID_CELLS: usize = 42;

/// Which month a grid cell belongs to, relative to the displayed month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthPosition {
    Previous,
    Current,
    Next,
}

/// One cell of the 6x7 month grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub position: MonthPosition,
}

impl DayCell {
    /// The cell's date anchored at noon.
    pub fn at_noon(&self) -> NaiveDateTime {
        self.date.and_time(NaiveTime::from_hms_opt(12, 0, 0).expect("noon is a valid time"))
    }
}

/// Normalize a (year, month) pair where month may lie outside 1..=12.
///
/// Month 0 is December of the previous year, month 13 is January of the next;
/// any offset works, so callers can navigate by adding or subtracting months
/// without their own rollover logic.
pub fn normalize_month(year: i32, month: i32) -> (i32, u32) {
    let zero_based = month - 1;
    (
        year + zero_based.div_euclid(12),
        (zero_based.rem_euclid(12) + 1) as u32,
    )
}

/// Compute the 42-cell grid for a month.
///
/// The grid starts at the `week_start` weekday on or before the 1st of the
/// month and runs for six weeks, tagging each cell with its month membership.
pub fn month_grid(year: i32, month: i32, week_start: Weekday) -> Vec<DayCell> {
    let (year, month) = normalize_month(year, month);
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("normalized month is valid");

    let offset = (first.weekday().num_days_from_sunday() + 7 - week_start.num_days_from_sunday())
        % 7;
    let grid_start = first - Duration::days(offset as i64);

    (0..GRID_CELLS as i64)
        .map(|i| {
            let date = grid_start + Duration::days(i);
            let position = if date.year() == year && date.month() == month {
                MonthPosition::Current
            } else if date < first {
                MonthPosition::Previous
            } else {
                MonthPosition::Next
            };
            DayCell { date, position }
        })
        .collect()
}

/// First and last dates covered by a month's grid, inclusive.
///
/// Useful for range-filtering events to what the grid displays, which spans
/// into the adjacent months.
pub fn grid_range(year: i32, month: i32, week_start: Weekday) -> (NaiveDate, NaiveDate) {
    let grid = month_grid(year, month, week_start);
    (grid[0].date, grid[GRID_CELLS - 1].date)
}
