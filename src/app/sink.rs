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

//! Where signals end up.

use crate::page::PostKey;
use std::collections::{BTreeMap, BTreeSet};

/// Rendering surface for post borders.
///
/// Every call may fail, e.g. when the post was detached meanwhile. Callers
/// log such failures and carry on.
pub trait PresentationSink {
    /// Install page-wide style rules.
    fn install_styles(&mut self, css: &str) -> anyhow::Result<()>;

    fn apply_color(&mut self, post: &PostKey, color: &str) -> anyhow::Result<()>;

    fn clear_color(&mut self, post: &PostKey) -> anyhow::Result<()>;
}

/// Sink that remembers the current color of every post.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub styles: Vec<String>,
    pub colors: BTreeMap<PostKey, String>,
    /// Number of successful apply calls
    pub applied: usize,
    /// Number of successful clear calls
    pub cleared: usize,
    /// Posts that behave as detached: every call for them fails
    pub detached: BTreeSet<PostKey>,
    pub fail_styles: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color(&self, post: &str) -> Option<&str> {
        self.colors.get(&PostKey(post.to_string())).map(String::as_str)
    }

    fn check_attached(&self, post: &PostKey) -> anyhow::Result<()> {
        if self.detached.contains(post) {
            anyhow::bail!("Post {post} is detached");
        }
        Ok(())
    }
}

impl PresentationSink for RecordingSink {
    fn install_styles(&mut self, css: &str) -> anyhow::Result<()> {
        if self.fail_styles {
            anyhow::bail!("No document head to attach styles to");
        }
        self.styles.push(css.to_string());
        Ok(())
    }

    fn apply_color(&mut self, post: &PostKey, color: &str) -> anyhow::Result<()> {
        self.check_attached(post)?;
        self.colors.insert(post.clone(), color.to_string());
        self.applied += 1;
        Ok(())
    }

    fn clear_color(&mut self, post: &PostKey) -> anyhow::Result<()> {
        self.check_attached(post)?;
        self.colors.remove(post);
        self.cleared += 1;
        Ok(())
    }
}
