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

//! Scoring: ratio computation and its mapping to a visual signal.

pub mod ratio;
pub mod scorer;
pub mod signal;

pub use ratio::{compute_ratio, observation_value, visibility, RatioOutcome, RatioParams};
pub use scorer::{PostScore, PostScorer};
pub use signal::{Palette, Signal, SignalMapper, ZeroCommentPolicy};
