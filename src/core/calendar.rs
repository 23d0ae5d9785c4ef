//! Whole-month calendar arithmetic for the monthly simulation clock.
//!
//! The engine only ever needs month granularity, so these helpers work on
//! `(year, month)` pairs directly instead of going through `jiff::Span`.

use jiff::civil::Date;

/// Whole months from `from` to `to`, truncated toward zero.
///
/// A month only counts once the day-of-month has been reached, so
/// 1991-07-13 → 2025-07-12 is 407 months and → 2025-07-13 is 408.
pub fn months_between(from: Date, to: Date) -> i64 {
    let mut months = (to.year() as i64 - from.year() as i64) * 12
        + (to.month() as i64 - from.month() as i64);
    if months > 0 && to.day() < from.day() {
        months -= 1;
    } else if months < 0 && to.day() > from.day() {
        months += 1;
    }
    months
}

/// Calendar `(year, month)` reached `offset` months after `date`.
pub fn month_after(date: Date, offset: i64) -> (i16, i8) {
    let index = date.year() as i64 * 12 + (date.month() as i64 - 1) + offset;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) + 1;
    (year as i16, month as i8)
}

/// Age label such as `"34 yrs"` or `"34 yrs 2 mos"`.
pub fn age_display(age_in_months: i64) -> String {
    let years = age_in_months.div_euclid(12);
    let months = age_in_months.rem_euclid(12);
    if months > 0 {
        format!("{years} yrs {months} mos")
    } else {
        format!("{years} yrs")
    }
}
