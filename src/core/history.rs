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

//! Rolling window of observed ratios.
//!
//! The history is the only state that outlives a session. It is pruned to a
//! time window and capped in size, keeping the most recent observations.

use anyhow::Context as _;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Default retention window: 24 hours.
pub const WINDOW: TimeDelta = TimeDelta::seconds(86_400);

/// Default maximum number of retained observations.
pub const MAX_SIZE: usize = 100;

/// One recorded value.
///
/// Non-finite values stand for posts without comments. JSON cannot carry
/// infinity, so such values are stored as `null` and read back as +∞.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(with = "infinite_as_null")]
    pub value: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
}

mod infinite_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// Summary of the finite part of the history.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistoryStats {
    pub count: usize,
    pub finite: usize,
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct History {
    observations: Vec<Observation>,
    window: TimeDelta,
    max_size: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(WINDOW, MAX_SIZE)
    }
}

impl History {
    pub fn new(window: TimeDelta, max_size: usize) -> Self {
        Self {
            observations: Vec::new(),
            window,
            max_size,
        }
    }

    /// Rebuild a history from its stored JSON form.
    pub fn from_value(
        value: serde_json::Value,
        window: TimeDelta,
        max_size: usize,
    ) -> anyhow::Result<Self> {
        let observations: Vec<Observation> =
            serde_json::from_value(value).context("Stored history is not an observation list")?;
        let mut history = Self {
            observations,
            window,
            max_size,
        };
        history.cap();
        Ok(history)
    }

    /// Stored JSON form.
    pub fn to_value(&self) -> anyhow::Result<serde_json::Value> {
        serde_json::to_value(&self.observations).context("Failed to serialize history")
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Record `value` observed at `time`, pruning relative to `time` first.
    pub fn record(&mut self, value: f64, time: DateTime<Utc>) {
        self.prune(time);
        self.observations.push(Observation { value, time });
        self.cap();
    }

    /// Drop everything at or before `now - window`.
    ///
    /// A window reaching past the earliest representable time keeps everything.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let Some(cutoff) = now.checked_sub_signed(self.window) else {
            return;
        };
        self.observations.retain(|o| o.time > cutoff);
    }

    /// Keep only the `max_size` most recent observations.
    ///
    /// Observations with equal times keep their relative order.
    pub fn cap(&mut self) {
        if self.observations.len() > self.max_size {
            self.observations.sort_by(|a, b| b.time.cmp(&a.time));
            self.observations.truncate(self.max_size);
        }
    }

    pub fn stats(&self) -> HistoryStats {
        let mut finite: Vec<f64> = self
            .observations
            .iter()
            .map(|o| o.value)
            .filter(|v| v.is_finite())
            .collect();
        finite.sort_by(f64::total_cmp);

        let median = match finite.len() {
            0 => None,
            n if n % 2 == 1 => Some(finite[n / 2]),
            n => Some((finite[n / 2 - 1] + finite[n / 2]) / 2.0),
        };

        HistoryStats {
            count: self.observations.len(),
            finite: finite.len(),
            min: finite.first().copied(),
            median,
            max: finite.last().copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).expect("valid timestamp")
    }

    #[test]
    fn test_prune_drops_window_edge_and_older() {
        let now = at(100_000);
        let mut history = History::default();
        history.record(1.0, now - WINDOW - TimeDelta::seconds(1));
        history.record(2.0, now - WINDOW);
        history.record(3.0, now - WINDOW + TimeDelta::milliseconds(1));
        history.record(4.0, now);

        history.prune(now);
        let values: Vec<f64> = history.observations().iter().map(|o| o.value).collect();
        assert_eq!(values, vec![3.0, 4.0]);
    }

    #[test]
    fn test_unbounded_window_keeps_everything() {
        let mut history = History::new(TimeDelta::MAX, MAX_SIZE);
        history.record(1.0, at(0));
        history.record(2.0, at(1_000_000));
        history.prune(at(2_000_000));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_cap_keeps_most_recent() {
        let mut history = History::default();
        // insert out of order
        for i in (0..150).rev() {
            history.record(i as f64, at(i));
            assert!(history.len() <= MAX_SIZE);
        }
        assert_eq!(history.len(), MAX_SIZE);

        let mut times: Vec<DateTime<Utc>> = history.observations().iter().map(|o| o.time).collect();
        times.sort();
        let expected: Vec<DateTime<Utc>> = (50..150).map(at).collect();
        assert_eq!(times, expected);
    }

    #[test]
    fn test_cap_with_ties_is_deterministic() {
        let run = || {
            let mut history = History::new(WINDOW, 3);
            for v in 0..6 {
                history.record(v as f64, at(0));
            }
            history.observations().to_vec()
        };
        assert_eq!(run(), run());
        assert_eq!(run().len(), 3);
    }

    #[test]
    fn test_infinity_survives_storage() {
        let mut history = History::default();
        history.record(f64::INFINITY, at(5));
        history.record(12.5, at(6));

        let value = history.to_value().expect("serializable");
        assert_eq!(value[0]["value"], serde_json::Value::Null);
        assert_eq!(value[1]["time"], serde_json::json!(1_700_000_006_000_i64));

        let restored = History::from_value(value, WINDOW, MAX_SIZE).expect("valid history");
        assert_eq!(restored.observations(), history.observations());
    }

    #[test]
    fn test_from_value_rejects_garbage() {
        let garbage = serde_json::json!({ "not": "a list" });
        assert!(History::from_value(garbage, WINDOW, MAX_SIZE).is_err());
    }

    #[test]
    fn test_from_value_applies_cap() {
        let stored: Vec<Observation> = (0..5)
            .map(|i| Observation {
                value: i as f64,
                time: at(i),
            })
            .collect();
        let value = serde_json::to_value(stored).expect("serializable");
        let history = History::from_value(value, WINDOW, 2).expect("valid history");
        let values: Vec<f64> = history.observations().iter().map(|o| o.value).collect();
        assert_eq!(values, vec![4.0, 3.0]);
    }

    #[test]
    fn test_stats() {
        let mut history = History::default();
        assert_eq!(history.stats(), HistoryStats::default());

        for (i, v) in [8.0, f64::INFINITY, 2.0, 5.0, 11.0].into_iter().enumerate() {
            history.record(v, at(i as i64));
        }
        let stats = history.stats();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.finite, 4);
        assert_eq!(stats.min, Some(2.0));
        assert_eq!(stats.median, Some(6.5));
        assert_eq!(stats.max, Some(11.0));
    }
}
