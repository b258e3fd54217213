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

//! Engagement ratio: log-scaled visibility per comment.

use crate::parser::{PostMetrics, AGE_CAP_MINUTES};
use serde::{Deserialize, Serialize};

/// Tunables of the ratio formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioParams {
    /// Lower bound of the likes+retweets visibility proxy
    pub visibility_floor: u64,
    /// Posts at least this old are scored like ads
    pub age_cap_minutes: u64,
    pub influence_multiplier: f64,
    pub like_weight: f64,
    pub retweet_weight: f64,
}

impl Default for RatioParams {
    fn default() -> Self {
        Self {
            visibility_floor: 1_000,
            age_cap_minutes: AGE_CAP_MINUTES,
            influence_multiplier: 10.0,
            like_weight: 10.0,
            retweet_weight: 5.0,
        }
    }
}

/// Result of [`compute_ratio`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioOutcome {
    pub ratio: f64,
    /// The post had no usable comment count and was scored with base 2.
    pub used_fallback: bool,
    pub adjusted_influence: f64,
    pub adjusted_visibility: f64,
}

/// Reach estimate: the view count when known, else likes + retweets raised
/// to the floor.
pub fn visibility(metrics: &PostMetrics, floor: u64) -> f64 {
    metrics
        .views
        .unwrap_or_else(|| metrics.likes.saturating_add(metrics.retweets).max(floor)) as f64
}

/// How much reach the post gained beyond its raw visibility.
///
/// Ads and stale posts have no meaningful view rate, so likes and retweets
/// stand in. Fresh posts use views per minute of age.
pub fn adjusted_influence(metrics: &PostMetrics, params: &RatioParams) -> f64 {
    let views = metrics.views.unwrap_or(0) as f64;

    if metrics.is_ad || metrics.age_minutes >= params.age_cap_minutes {
        metrics.likes as f64 * params.like_weight + metrics.retweets as f64 * params.retweet_weight
    } else if metrics.age_minutes > 0 {
        views / metrics.age_minutes as f64
    } else {
        views
    }
}

/// Compute the engagement ratio of a post.
pub fn compute_ratio(metrics: &PostMetrics, visibility: f64, params: &RatioParams) -> RatioOutcome {
    let adjusted_influence = adjusted_influence(metrics, params);
    let adjusted_visibility = visibility + adjusted_influence * params.influence_multiplier;

    // A post showing "0 views" would otherwise hit log10(0)
    let numerator = adjusted_visibility.max(1.0).log10();

    match metrics.comments {
        Some(comments) if comments > 0 => RatioOutcome {
            ratio: numerator / (comments as f64 + 1.0).log10(),
            used_fallback: false,
            adjusted_influence,
            adjusted_visibility,
        },
        _ => RatioOutcome {
            ratio: numerator / 2f64.log10(),
            used_fallback: true,
            adjusted_influence,
            adjusted_visibility,
        },
    }
}

/// Value recorded into the history for a scored post: visibility per
/// comment.
///
/// Infinite when there are no comments to divide by, and also when the
/// quotient is 0 (a post showing "0 views").
pub fn observation_value(visibility: f64, comments: Option<u64>) -> f64 {
    match comments {
        Some(comments) if comments > 0 => {
            let value = visibility / comments as f64;
            if value > 0.0 {
                value
            } else {
                f64::INFINITY
            }
        }
        _ => f64::INFINITY,
    }
}
