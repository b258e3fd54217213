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

//! Best-effort engagement extraction from a post element.
//!
//! Page markup is unreliable: counters move around, get abbreviated or are
//! missing entirely. Nothing in here fails; every lookup degrades to `None`
//! or a documented default.

use super::age::extract_age_minutes;
use super::count::{parse_count, parse_digits};
use crate::page::selector::AttrOp;
use crate::page::{Lookup, PostElement, Selector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Class of the generic counter span used when a dedicated counter node is missing
const GENERIC_COUNTER_CLASS: &str = "r-1qa8mrt";

/// Selectors the extractor uses to find metric nodes inside a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSelectors {
    pub comments: Lookup,
    pub likes: Lookup,
    pub retweets: Lookup,
    pub analytics_link: Selector,
    pub span: Selector,
    pub timestamp: Selector,
    pub ad_marker: Selector,
}

fn counter_lookup(test_id: &str) -> Lookup {
    Lookup::new(vec![
        Selector::test_id(test_id),
        Selector::tag("span").with_class(GENERIC_COUNTER_CLASS),
    ])
}

impl Default for MetricSelectors {
    fn default() -> Self {
        Self {
            comments: counter_lookup("reply"),
            likes: counter_lookup("like"),
            retweets: counter_lookup("retweet"),
            analytics_link: Selector::tag("a").with_attr("href", AttrOp::Contains, "/analytics"),
            span: Selector::tag("span"),
            timestamp: Selector::tag("time"),
            ad_marker: Selector::test_id("ad"),
        }
    }
}

/// Engagement numbers of one post for one evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMetrics {
    /// `None` when there is no comment counter or it shows no number.
    pub comments: Option<u64>,
    pub likes: u64,
    pub retweets: u64,
    pub views: Option<u64>,
    pub age_minutes: u64,
    pub is_ad: bool,
    /// Age label or ISO timestamp the age was derived from, for logging.
    pub age_label: String,
}

/// Digits-only count of the first node `lookup` finds, or `default`.
pub fn extract_count<E: PostElement>(element: &E, lookup: &Lookup, default: u64) -> u64 {
    element
        .lookup(lookup)
        .and_then(|node| parse_digits(&node.text_content()))
        .unwrap_or(default)
}

/// Comment count from the comment counter's text.
pub fn extract_comment_count(text: &str) -> Option<u64> {
    parse_count(text)
}

/// View count of a post.
///
/// Prefers the span inside the analytics link, then any span mentioning
/// "views".
pub fn extract_views<E: PostElement>(element: &E, selectors: &MetricSelectors) -> Option<u64> {
    let from_analytics = element
        .query(&selectors.analytics_link)
        .and_then(|link| link.query(&selectors.span))
        .and_then(|span| parse_count(&span.text_content()));
    if from_analytics.is_some() {
        return from_analytics;
    }

    element
        .query_all(&selectors.span)
        .iter()
        .map(|span| span.text_content().to_lowercase())
        .filter(|text| text.contains("views"))
        .find_map(|text| parse_count(&text))
}

/// Whether the post looks like an advertisement.
///
/// This is a plain substring test for "ad" over the whole post text, so any
/// post mentioning e.g. "read" or "made" counts as an ad too. Known and kept.
pub fn is_advertisement<E: PostElement>(element: &E, ad_marker: &Selector) -> bool {
    element.text_content().to_lowercase().contains("ad") || element.query(ad_marker).is_some()
}

/// Extract every metric of a post.
pub fn extract_metrics<E: PostElement>(
    element: &E,
    selectors: &MetricSelectors,
    now: DateTime<Utc>,
    age_cap: u64,
) -> PostMetrics {
    profiling::function_scope!();

    let comments = element
        .lookup(&selectors.comments)
        .and_then(|node| extract_comment_count(&node.text_content()));
    let likes = extract_count(element, &selectors.likes, 0);
    let retweets = extract_count(element, &selectors.retweets, 0);
    let views = extract_views(element, selectors);

    let time_node = element.query(&selectors.timestamp);
    let age_text = time_node
        .as_ref()
        .map(|t| t.text_content().trim().to_string())
        .unwrap_or_default();
    let datetime = time_node.as_ref().and_then(|t| t.attribute("datetime"));
    let age_minutes = extract_age_minutes(Some(&age_text), datetime.as_deref(), now, age_cap);

    let age_label = if age_text.is_empty() {
        datetime.unwrap_or_default()
    } else {
        age_text
    };

    PostMetrics {
        comments,
        likes,
        retweets,
        views,
        age_minutes,
        is_ad: is_advertisement(element, &selectors.ad_marker),
        age_label,
    }
}
