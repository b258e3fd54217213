// RatioCrab - GPL-3.0-or-later
// This file is part of RatioCrab.
//
// Copyright (C) 2026 Daniel Freiermuth
//
// RatioCrab is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// RatioCrab is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with RatioCrab.  If not, see <https://www.gnu.org/licenses/>.

//! Count parsers for engagement numbers as the page renders them.

use fancy_regex::Regex;
use std::sync::LazyLock;

// First number in the text, optionally fractional, with an optional k/m suffix
static COUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d*\.?\d+)([kKmM]?)").expect("valid regex literal"));

/// Multiplier for an abbreviation suffix (`k`, `m`, case-insensitive).
pub fn suffix_multiplier(suffix: &str) -> f64 {
    match suffix.to_ascii_lowercase().as_str() {
        "k" => 1_000.0,
        "m" => 1_000_000.0,
        _ => 1.0,
    }
}

/// Parse an abbreviated count such as `"1.2K"`, `"10k views"` or `"3M"`.
///
/// Uses the first number found in `text`. Returns `None` when there is no
/// number at all.
pub fn parse_count(text: &str) -> Option<u64> {
    let caps = COUNT_PATTERN.captures(text).ok()??;
    let number: f64 = caps.get(1)?.as_str().parse().ok()?;
    let suffix = caps.get(2).map_or("", |m| m.as_str());

    let value = (number * suffix_multiplier(suffix)).round();
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value as u64)
}

/// Keep only the ASCII digits of `text` and parse them.
///
/// `"1,234"` becomes 1234 and `"1.2K"` becomes 12. Returns `None` when no
/// digits are left or the number does not fit.
pub fn parse_digits(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}
