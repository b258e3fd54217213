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

//! Mapping from ratios to the visual signal applied to a post.

use super::ratio::RatioOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete band a post is painted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Low,
    Mid,
    High,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "LOW",
            Self::Mid => "MID",
            Self::High => "HIGH",
        })
    }
}

/// What to show for posts without any comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroCommentPolicy {
    /// No discussion is good news: always [`Signal::High`].
    #[default]
    Favorable,
    /// Band the base-2 fallback ratio like any other ratio.
    Scored,
}

/// Banding of ratios into signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalMapper {
    pub low_threshold: f64,
    pub high_threshold: f64,
    pub zero_comment_policy: ZeroCommentPolicy,
}

impl Default for SignalMapper {
    fn default() -> Self {
        Self {
            low_threshold: 2.0,
            high_threshold: 3.5,
            zero_comment_policy: ZeroCommentPolicy::Favorable,
        }
    }
}

impl SignalMapper {
    pub fn map_to_signal(&self, ratio: f64) -> Signal {
        if ratio < self.low_threshold {
            Signal::Low
        } else if ratio > self.high_threshold {
            Signal::High
        } else {
            Signal::Mid
        }
    }

    /// Signal for a computed ratio, honoring the zero-comment policy.
    pub fn signal_for(&self, outcome: &RatioOutcome) -> Signal {
        match (outcome.used_fallback, self.zero_comment_policy) {
            (true, ZeroCommentPolicy::Favorable) => Signal::High,
            (true, ZeroCommentPolicy::Scored) | (false, _) => self.map_to_signal(outcome.ratio),
        }
    }
}

/// Color tokens for each signal, as understood by the presentation sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub low: String,
    pub mid: String,
    pub high: String,
}

impl Palette {
    /// Dark-to-bright teal gradient.
    pub fn tidepool() -> Self {
        Self {
            low: "rgb(2, 28, 34)".to_string(),
            mid: "rgb(6, 83, 102)".to_string(),
            high: "rgb(14, 207, 255)".to_string(),
        }
    }

    pub fn traffic_light() -> Self {
        Self {
            low: "red".to_string(),
            mid: "yellow".to_string(),
            high: "green".to_string(),
        }
    }

    pub fn color(&self, signal: Signal) -> &str {
        match signal {
            Signal::Low => &self.low,
            Signal::Mid => &self.mid,
            Signal::High => &self.high,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::tidepool()
    }
}
