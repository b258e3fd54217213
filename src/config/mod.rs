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

use crate::anomaly::{Palette, RatioParams, SignalMapper};
use crate::parser::MetricSelectors;
use anyhow::Context as _;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global user configuration stored in config directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Ratio formula tunables
    pub scoring: RatioParams,
    /// Thresholds and zero-comment policy
    pub signal: SignalMapper,
    pub palette: Palette,
    pub history: HistoryConfig,
    pub coordinator: CoordinatorConfig,
    pub style: StyleConfig,
    /// Selectors used to find metrics inside a post
    pub selectors: MetricSelectors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub window_secs: u64,
    pub max_size: usize,
    pub save_debounce_ms: u64,
    /// Storage key the history is saved under
    pub storage_key: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window_secs: 86_400,
            max_size: 100,
            save_debounce_ms: 1_000,
            storage_key: "learnedRatios".to_string(),
        }
    }
}

impl HistoryConfig {
    pub fn window(&self) -> TimeDelta {
        i64::try_from(self.window_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    pub const fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Minimum time between two evaluation passes
    pub throttle_ms: u64,
    /// Locations where posts are scored; borders are cleared everywhere else
    pub timeline_paths: Vec<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 500,
            timeline_paths: vec!["/".to_string(), "/home".to_string()],
        }
    }
}

impl CoordinatorConfig {
    pub fn throttle(&self) -> TimeDelta {
        i64::try_from(self.throttle_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub border_width_px: u32,
    pub transition_secs: f64,
    /// Selector of the post elements the transition rule targets
    pub post_selector: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            border_width_px: 2,
            transition_secs: 0.9,
            post_selector: "article".to_string(),
        }
    }
}

impl StyleConfig {
    /// Style rule animating border color changes on posts.
    pub fn transition_css(&self) -> String {
        format!(
            "{} {{\n  transition: border-color {}s ease !important;\n}}\n",
            self.post_selector, self.transition_secs
        )
    }

    /// Full border declaration for a color token.
    pub fn border(&self, color: &str) -> String {
        format!("{}px solid {color}", self.border_width_px)
    }
}

impl GlobalConfig {
    /// Get the path to the global config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ratiocrab").join("config.json"))
    }

    /// Load global config from disk, returning defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            tracing::info!("No config directory, using defaults");
            return Self::default();
        };
        if !path.exists() {
            tracing::info!("No global config found, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring global config: {e:#}");
                Self::default()
            }
        }
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        tracing::info!("Loading config from {path:?}");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save global config to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path().context("Could not determine config directory")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json).context("Failed to write config file")?;

        tracing::info!("Saved config to {path:?}");
        Ok(())
    }
}
