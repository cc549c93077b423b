use chrono::{Datelike, NaiveDate, Weekday};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub fn year_month_key(date: &NaiveDate) -> String {
    format!("{}-{:02}", date.year(), date.month())
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("?")
}

/// Keep the tail of a long path, which is the part that identifies it.
pub fn shorten_path(path: &str, max_chars: usize) -> String {
    let count = path.chars().count();
    if count <= max_chars || max_chars <= 3 {
        return path.to_string();
    }
    let keep = max_chars - 3;
    let tail: String = path.chars().skip(count - keep).collect();
    format!("...{tail}")
}

/// Cut a name to `max_chars`, marking the cut with an ellipsis.
pub fn shorten_name(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars || max_chars <= 3 {
        return name.to_string();
    }
    let head: String = name.chars().take(max_chars - 3).collect();
    format!("{head}...")
}

/// Steady spinner on stderr; hidden automatically when stderr is not a terminal.
pub fn spinner(msg: impl Into<std::borrow::Cow<'static, str>>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(msg);
    pb
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortens_from_the_front_for_paths() {
        assert_eq!(shorten_path("src/a.rs", 40), "src/a.rs");
        assert_eq!(shorten_path("a/very/long/path/to/module.rs", 12), "...module.rs");
    }

    #[test]
    fn shortens_from_the_back_for_names() {
        assert_eq!(shorten_name("Armin Ronacher", 20), "Armin Ronacher");
        assert_eq!(shorten_name("A very long contributor name", 10), "A very ...");
    }

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }

    #[test]
    fn keys_and_names() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(year_month_key(&date), "2024-03");
        assert_eq!(weekday_name(date.weekday()), "Saturday");
        assert_eq!(month_name(12), "Dec");
    }
}
