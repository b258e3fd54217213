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

pub mod age;
pub mod count;
pub mod metrics;

pub use age::{extract_age_minutes, AGE_CAP_MINUTES};
pub use count::{parse_count, parse_digits};
pub use metrics::{
    extract_comment_count, extract_count, extract_metrics, extract_views, is_advertisement,
    MetricSelectors, PostMetrics,
};
