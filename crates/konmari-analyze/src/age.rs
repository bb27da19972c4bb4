//! Age signals and human-readable ages.

use konmari_core::Signal;

/// The age bonus signal for a file, if any. Only the highest applies.
pub fn age_signal(age_days: u64) -> Option<Signal> {
    match age_days {
        d if d > 180 => Some(Signal::AgeOver180),
        d if d > 90 => Some(Signal::AgeOver90),
        d if d > 60 => Some(Signal::AgeOver60),
        _ => None,
    }
}

/// The recent-edit penalty signal for a file, if any. Only the strongest applies.
pub fn recency_signal(age_days: u64) -> Option<Signal> {
    match age_days {
        d if d < 14 => Some(Signal::ModifiedWithin14Days),
        d if d < 30 => Some(Signal::ModifiedWithin30Days),
        _ => None,
    }
}

/// Format an age in days for display.
pub fn format_age(days: u64) -> String {
    match days {
        0 => "today".to_string(),
        1 => "1 day".to_string(),
        d if d < 60 => format!("{d} days"),
        d if d < 365 => format!("{} months", d / 30),
        d => format!("{:.1} years", d as f64 / 365.0),
    }
}
