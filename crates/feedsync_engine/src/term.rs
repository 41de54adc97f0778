//! Term identifiers and labels.
//!
//! Term ids are numeric: the academic year followed by one digit for
//! the period (1 odd, 2 even, 3 short). Labels are free text such as
//! `"2024/2025 Ganjil"`.

use serde::Serialize;

/// Odd/even classification of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    /// Odd (first) period of the year.
    Odd,
    /// Even (second) period of the year.
    Even,
}

impl Parity {
    /// Returns the stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Parity::Odd => "odd",
            Parity::Even => "even",
        }
    }
}

/// Returns the first standalone run of exactly four digits in `label`.
pub fn parse_year(label: &str) -> Option<i32> {
    let bytes = label.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 {
                return label[start..i].parse().ok();
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Classifies a label as odd or even by case-insensitive substring match.
pub fn parse_parity(label: &str) -> Option<Parity> {
    let lower = label.to_lowercase();
    if lower.contains("ganjil") || lower.contains("odd") {
        Some(Parity::Odd)
    } else if lower.contains("genap") || lower.contains("even") {
        Some(Parity::Even)
    } else {
        None
    }
}

/// The window of term ids considered sane, relative to the current year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermWindow {
    /// Years before the current year still accepted.
    pub years_back: u32,
    /// Years after the current year still accepted.
    pub years_ahead: u32,
}

impl TermWindow {
    /// Creates a window.
    pub fn new(years_back: u32, years_ahead: u32) -> Self {
        Self {
            years_back,
            years_ahead,
        }
    }

    /// Returns the inclusive `(lower, upper)` id bounds for `current_year`.
    ///
    /// With `years_ahead = 1` and year 2025 the upper bound is `20263`.
    pub fn bounds(&self, current_year: i32) -> (i64, i64) {
        let year = i64::from(current_year);
        let lower = (year - i64::from(self.years_back)) * 10 + 1;
        let upper = (year + i64::from(self.years_ahead)) * 10 + 3;
        (lower, upper)
    }

    /// Returns true if `term_id` falls inside the window.
    pub fn contains(&self, term_id: i64, current_year: i32) -> bool {
        let (lower, upper) = self.bounds(current_year);
        (lower..=upper).contains(&term_id)
    }
}

impl Default for TermWindow {
    fn default() -> Self {
        Self::new(50, 1)
    }
}
