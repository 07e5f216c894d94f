//! Total parsers for the loosely formatted text search pages show.
//!
//! None of these fail: malformed input maps to the zero value, or to
//! [`Age::Unknown`] for relative ages.

use std::sync::LazyLock;

use regex::Regex;

static VIEW_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(?:\.(\d+))?\s*([km]?)").expect("valid regex"));

static RELATIVE_AGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+|\ban?\b)\s*(second|minute|hour|day|week|month|year)s?\b").expect("valid regex")
});

/// Parse "1.2M views", "128K", "1,234 views" into an integer count.
///
/// Fractions are applied with integer arithmetic, so "1.2M" is exactly
/// 1 200 000 and the result is floored.
pub fn parse_view_count(text: &str) -> u64 {
    let normalized = text.to_lowercase().replace(',', "");
    let Some(caps) = VIEW_COUNT.captures(&normalized) else {
        return 0;
    };

    let multiplier: u128 = match caps.get(3).map(|m| m.as_str()) {
        Some("k") => 1_000,
        Some("m") => 1_000_000,
        _ => 1,
    };

    let Ok(whole) = caps[1].parse::<u128>() else {
        return 0;
    };

    // Only the first 12 fraction digits can matter at these magnitudes.
    let fraction = caps
        .get(2)
        .map(|m| &m.as_str()[..m.as_str().len().min(12)])
        .unwrap_or("");
    let fraction_value = if fraction.is_empty() {
        0
    } else {
        let digits = fraction.parse::<u128>().unwrap_or(0);
        digits * multiplier / 10u128.pow(fraction.len() as u32)
    };

    let total = whole.saturating_mul(multiplier).saturating_add(fraction_value);
    u64::try_from(total).unwrap_or(u64::MAX)
}

/// Parse "MM:SS" or "HH:MM:SS" into seconds. Any other shape is 0.
pub fn parse_duration(text: &str) -> u64 {
    let parts: Option<Vec<u64>> = text
        .trim()
        .split(':')
        .map(|p| p.trim().parse::<u64>().ok())
        .collect();

    let total = match parts.as_deref() {
        Some([minutes, seconds]) => minutes.checked_mul(60).and_then(|m| m.checked_add(*seconds)),
        Some([hours, minutes, seconds]) => hours
            .checked_mul(3600)
            .and_then(|h| h.checked_add(minutes.checked_mul(60)?))
            .and_then(|hm| hm.checked_add(*seconds)),
        _ => None,
    };
    // Overflowing values are garbage, not huge durations.
    total.unwrap_or(0)
}

/// Parsed upload age.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Age {
    Years(f64),
    /// Text carried no recognisable age. Distinct from `Years(0.0)`.
    Unknown,
}

impl Age {
    pub fn years(self) -> Option<f64> {
        match self {
            Age::Years(y) => Some(y),
            Age::Unknown => None,
        }
    }
}

/// Parse "3 months ago", "a year ago", "Streamed 2 weeks ago".
///
/// Units below a day count as zero years. This is the only age parser;
/// scoring and source-side recency filters both read it.
pub fn parse_relative_age(text: &str) -> Age {
    let normalized = text.trim().to_lowercase();
    if matches!(normalized.as_str(), "today" | "just now" | "yesterday") {
        return Age::Years(0.0);
    }

    let Some(caps) = RELATIVE_AGE.captures(&normalized) else {
        return Age::Unknown;
    };

    let count: f64 = match &caps[1] {
        "a" | "an" => 1.0,
        digits => match digits.parse::<u32>() {
            Ok(n) => n as f64,
            Err(_) => return Age::Unknown,
        },
    };

    let years = match &caps[2] {
        "second" | "minute" | "hour" => 0.0,
        "day" => count / 365.0,
        "week" => count / 52.0,
        "month" => count / 12.0,
        "year" => count,
        _ => return Age::Unknown,
    };

    Age::Years(years)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_count_suffixes() {
        assert_eq!(parse_view_count("1.2M"), 1_200_000);
        assert_eq!(parse_view_count("128K"), 128_000);
        assert_eq!(parse_view_count("1.2M views"), 1_200_000);
        assert_eq!(parse_view_count("3.45k views"), 3_450);
        assert_eq!(parse_view_count("1.2345K"), 1_234);
    }

    #[test]
    fn view_count_separators_and_plain_numbers() {
        assert_eq!(parse_view_count("1,234,567 views"), 1_234_567);
        assert_eq!(parse_view_count("42 views"), 42);
        assert_eq!(parse_view_count("12.9"), 12);
    }

    #[test]
    fn view_count_garbage_is_zero() {
        assert_eq!(parse_view_count(""), 0);
        assert_eq!(parse_view_count("No views"), 0);
        assert_eq!(parse_view_count("views"), 0);
    }

    #[test]
    fn duration_shapes() {
        assert_eq!(parse_duration("12:34"), 754);
        assert_eq!(parse_duration("1:23:45"), 5025);
        assert_eq!(parse_duration(" 0:59 "), 59);
    }

    #[test]
    fn duration_garbage_is_zero() {
        assert_eq!(parse_duration(""), 0);
        assert_eq!(parse_duration("45"), 0);
        assert_eq!(parse_duration("1:2:3:4"), 0);
        assert_eq!(parse_duration("LIVE"), 0);
        assert_eq!(parse_duration("ab:cd"), 0);
        assert_eq!(parse_duration("99999999999999999:00:00"), 0);
        assert_eq!(parse_duration("18446744073709551615:00"), 0);
        assert_eq!(parse_duration("0:18446744073709551615:00"), 0);
    }

    #[test]
    fn relative_age_units() {
        assert_eq!(parse_relative_age("2 years ago"), Age::Years(2.0));
        assert_eq!(parse_relative_age("6 months ago"), Age::Years(0.5));
        assert_eq!(parse_relative_age("a year ago"), Age::Years(1.0));
        assert_eq!(parse_relative_age("Streamed 1 year ago"), Age::Years(1.0));
        assert_eq!(parse_relative_age("26 weeks ago"), Age::Years(0.5));
    }

    #[test]
    fn sub_day_units_are_zero_years() {
        assert_eq!(parse_relative_age("5 hours ago"), Age::Years(0.0));
        assert_eq!(parse_relative_age("30 minutes ago"), Age::Years(0.0));
        assert_eq!(parse_relative_age("today"), Age::Years(0.0));
    }

    #[test]
    fn unrecognised_age_is_unknown_not_zero() {
        assert_eq!(parse_relative_age(""), Age::Unknown);
        assert_eq!(parse_relative_age("Premiered recently"), Age::Unknown);
        assert_eq!(parse_relative_age("2024-01-01"), Age::Unknown);
        assert_eq!(Age::Unknown.years(), None);
    }
}
