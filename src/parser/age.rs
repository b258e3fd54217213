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

//! Post age parsing.
//!
//! Posts show either a relative label (`"5m"`, `"2h"`, `"3d"`) or an absolute
//! date with an ISO timestamp in the `datetime` attribute. Everything is
//! converted to minutes and clamped to one year so that old or undated posts
//! are all treated as equally stale.

use chrono::{DateTime, NaiveDateTime, Utc};
use fancy_regex::Regex;
use std::sync::LazyLock;

/// One year in minutes.
pub const AGE_CAP_MINUTES: u64 = 525_600;

static RELATIVE_AGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)([mhdwy])").expect("valid regex literal"));

const fn unit_minutes(unit: char) -> u64 {
    match unit {
        'm' => 1,
        'h' => 60,
        'd' => 1_440,
        'w' => 10_080,
        _ => 525_600,
    }
}

/// Parse an ISO 8601 timestamp as rendered in `<time datetime="...">`.
fn parse_iso(datetime: &str) -> Option<DateTime<Utc>> {
    let trimmed = datetime.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Age of a post in minutes, clamped to `cap`.
///
/// The ISO timestamp is only consulted when the label is absent or blank.
/// A timestamp in the future counts as age 0. Anything that cannot be parsed
/// yields `cap`.
pub fn extract_age_minutes(
    age_text: Option<&str>,
    datetime: Option<&str>,
    now: DateTime<Utc>,
    cap: u64,
) -> u64 {
    let label = age_text.map(str::trim).filter(|t| !t.is_empty());

    if label.is_none() {
        if let Some(posted) = datetime.and_then(parse_iso) {
            let minutes = (now - posted).num_minutes().max(0) as u64;
            return minutes.min(cap);
        }
    }

    let Some(label) = label else {
        return cap;
    };
    let Ok(Some(caps)) = RELATIVE_AGE.captures(label) else {
        return cap;
    };

    let Some(value) = caps.get(1).and_then(|m| m.as_str().parse::<u64>().ok()) else {
        return cap;
    };
    let unit = caps
        .get(2)
        .and_then(|m| m.as_str().chars().next())
        .map_or('y', |c| c.to_ascii_lowercase());

    value
        .checked_mul(unit_minutes(unit))
        .map_or(cap, |minutes| minutes.min(cap))
}
