//! Cooldown duration parsing.
//!
//! Accepts strings made of `<integer><unit>` tokens where the unit is one
//! of `h`, `m` or `s`, e.g. `"30m"`, `"1h30m"`, `"45s"`. Tokens may appear
//! in any order and repeated units are summed.

use std::time::Duration;

/// Parse a duration string like `"1h30m"`.
///
/// Returns `None` when the input is absent, empty, carries no unit, has a
/// unit without a number (`"h"`), a number without a unit (`"30"`), any
/// other character, or overflows.
pub fn parse_duration(value: Option<&str>) -> Option<Duration> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    let mut start = 0;

    for (idx, ch) in value.char_indices() {
        if ch.is_ascii_digit() {
            continue;
        }

        let unit_secs: u64 = match ch {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };

        let digits = &value[start..idx];
        if digits.is_empty() {
            return None;
        }
        let count: u64 = digits.parse().ok()?;
        let secs = count.checked_mul(unit_secs)?;
        total = total.checked_add(Duration::from_secs(secs))?;
        start = idx + ch.len_utf8();
    }

    // Trailing digits without a unit, or no unit at all.
    if start != value.len() {
        return None;
    }

    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mins(n: u64) -> Duration {
        Duration::from_secs(n * 60)
    }

    #[test]
    fn single_units() {
        assert_eq!(parse_duration(Some("30m")), Some(mins(30)));
        assert_eq!(parse_duration(Some("2h")), Some(mins(120)));
        assert_eq!(parse_duration(Some("45s")), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration(Some("0s")), Some(Duration::ZERO));
    }

    #[test]
    fn combined_units_are_summed() {
        assert_eq!(parse_duration(Some("1h30m")), Some(mins(90)));
        assert_eq!(
            parse_duration(Some("1h2m3s")),
            Some(Duration::from_secs(3600 + 120 + 3))
        );
    }

    #[test]
    fn order_is_irrelevant() {
        assert_eq!(parse_duration(Some("30m1h")), Some(mins(90)));
        assert_eq!(parse_duration(Some("10s5m")), Some(Duration::from_secs(310)));
    }

    #[test]
    fn surrounding_whitespace_ignored() {
        assert_eq!(parse_duration(Some("  15m ")), Some(mins(15)));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_duration(None), None);
        assert_eq!(parse_duration(Some("")), None);
        assert_eq!(parse_duration(Some("xyz")), None);
        assert_eq!(parse_duration(Some("30")), None);
        assert_eq!(parse_duration(Some("h")), None);
        assert_eq!(parse_duration(Some("1h30")), None);
        assert_eq!(parse_duration(Some("1d")), None);
        assert_eq!(parse_duration(Some("1 h")), None);
        assert_eq!(parse_duration(Some("-5m")), None);
    }

    #[test]
    fn rejects_overflow() {
        assert_eq!(parse_duration(Some("99999999999999999999h")), None);
        assert_eq!(parse_duration(Some("18446744073709551615h")), None);
    }
}
