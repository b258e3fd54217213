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

use super::ratio::{compute_ratio, observation_value, visibility, RatioOutcome, RatioParams};
use super::signal::{Signal, SignalMapper};
use crate::page::PostElement;
use crate::parser::{extract_count, extract_metrics, MetricSelectors, PostMetrics};
use chrono::{DateTime, Utc};

/// Everything learned about one post in one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PostScore {
    pub metrics: PostMetrics,
    pub visibility: f64,
    pub outcome: RatioOutcome,
    pub signal: Signal,
    /// Value to record into the history
    pub observation: f64,
}

/// Extractor, ratio engine and signal mapper chained together.
#[derive(Debug, Clone, Default)]
pub struct PostScorer {
    pub params: RatioParams,
    pub mapper: SignalMapper,
    pub selectors: MetricSelectors,
}

impl PostScorer {
    pub fn new(params: RatioParams, mapper: SignalMapper, selectors: MetricSelectors) -> Self {
        Self {
            params,
            mapper,
            selectors,
        }
    }

    pub fn score<E: PostElement>(&self, element: &E, now: DateTime<Utc>) -> PostScore {
        profiling::function_scope!();

        let metrics = extract_metrics(element, &self.selectors, now, self.params.age_cap_minutes);
        let visibility = visibility(&metrics, self.params.visibility_floor);
        let outcome = compute_ratio(&metrics, visibility, &self.params);
        let signal = self.mapper.signal_for(&outcome);
        let observation = observation_value(visibility, metrics.comments);

        tracing::debug!(
            age = %metrics.age_label,
            views = ?metrics.views,
            influence = outcome.adjusted_influence,
            comments = ?metrics.comments,
            likes = metrics.likes,
            retweets = metrics.retweets,
            is_ad = metrics.is_ad,
            ratio = outcome.ratio,
            %signal,
            "Scored post"
        );

        PostScore {
            metrics,
            visibility,
            outcome,
            signal,
            observation,
        }
    }

    /// Value used to seed an empty history: visibility over the digits-only
    /// comment count, which defaults to 1 when the counter is missing.
    pub fn seed_value<E: PostElement>(&self, element: &E, now: DateTime<Utc>) -> f64 {
        let metrics = extract_metrics(element, &self.selectors, now, self.params.age_cap_minutes);
        let visibility = visibility(&metrics, self.params.visibility_floor);
        let comments = extract_count(element, &self.selectors.comments, 1);
        if comments == 0 {
            f64::INFINITY
        } else {
            visibility / comments as f64
        }
    }
}
