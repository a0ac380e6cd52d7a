//! Price derivation for bookings.
//!
//! Dates arrive as calendar dates already normalized to midnight (parsing
//! happens in `availability::parse_date`), so the day count is an exact
//! whole-day difference and cannot drift with time-of-day components.

use chrono::NaiveDate;

/// Number of billable days for an inclusive [start, end] stay.
///
/// The range has already passed validation (`end > start`), so this is always
/// at least 1. A stay from the 6th to the 8th is two billable days: the item
/// comes back on the end date.
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Total price for a date range at a per-day rate. Pure and deterministic.
pub fn total_price(start: NaiveDate, end: NaiveDate, price_per_day: f64) -> f64 {
    rental_days(start, end) as f64 * price_per_day
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_rental_days() {
        assert_eq!(rental_days(d("2025-03-01"), d("2025-03-02")), 1);
        assert_eq!(rental_days(d("2025-03-01"), d("2025-03-05")), 4);
        // Across a month boundary
        assert_eq!(rental_days(d("2025-02-27"), d("2025-03-02")), 3);
    }

    #[test]
    fn test_total_price() {
        // Two days at 20/day
        assert_eq!(total_price(d("2025-03-06"), d("2025-03-08"), 20.0), 40.0);
        assert_eq!(total_price(d("2025-03-01"), d("2025-03-02"), 15.5), 15.5);
        assert_eq!(total_price(d("2025-03-01"), d("2025-03-11"), 0.0), 0.0);
    }

    #[test]
    fn test_price_is_monotonic_in_span() {
        let start = d("2025-06-01");
        let rate = 12.75;
        let mut last = 0.0;
        for offset in 1..60 {
            let end = start + chrono::Duration::days(offset);
            let price = total_price(start, end, rate);
            assert!(price >= last, "price decreased when span grew");
            last = price;
        }
    }

    #[test]
    fn test_price_is_deterministic() {
        let (s, e) = (d("2025-03-06"), d("2025-03-08"));
        assert_eq!(total_price(s, e, 20.0), total_price(s, e, 20.0));
    }
}
