//! In-world calendar helpers.
//!
//! One tick is one year. Years before 1 are BCE; there is a year zero in
//! the stored counter, rendered as `1 BCE` the way astronomical year
//! numbering maps onto the historical calendar.

/// Render a stored year as a human-readable era string.
///
/// `-5000` becomes `"5001 BCE"`, `0` becomes `"1 BCE"`, `1` becomes
/// `"1 CE"`.
pub fn format_year(year: i64) -> String {
    if year > 0 {
        format!("{year} CE")
    } else {
        let bce = year.unsigned_abs().saturating_add(1);
        format!("{bce} BCE")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_years_are_common_era() {
        assert_eq!(format_year(1), "1 CE");
        assert_eq!(format_year(2024), "2024 CE");
    }

    #[test]
    fn zero_and_negative_years_are_bce() {
        assert_eq!(format_year(0), "1 BCE");
        assert_eq!(format_year(-5000), "5001 BCE");
        assert_eq!(format_year(i64::MIN), format!("{} BCE", u64::MAX));
    }
}
