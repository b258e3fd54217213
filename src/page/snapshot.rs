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

//! Serializable page snapshots.
//!
//! A snapshot is a tree of [`Node`]s plus the location path. Post elements are
//! the `article` nodes of the tree, keyed by their `data-post-id` or `id`
//! attribute, falling back to their position.

use super::{Page, Post, PostElement, PostKey, Selector};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const POST_TAG: &str = "article";

/// One element of a snapshot tree.
///
/// `text` is the element's own text, rendered before its children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    pub fn element(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        text.clone_into(&mut self.text);
        self
    }

    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Whether this node satisfies every part of `selector`.
    pub fn matches(&self, selector: &Selector) -> bool {
        if let Some(tag) = &selector.tag {
            if !self.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if !selector.classes.is_empty() {
            let Some(class_attr) = self.attrs.get("class") else {
                return false;
            };
            let has_all = selector
                .classes
                .iter()
                .all(|wanted| class_attr.split_whitespace().any(|c| c == wanted));
            if !has_all {
                return false;
            }
        }

        selector.attrs.iter().all(|attr| {
            self.attrs
                .get(&attr.name)
                .is_some_and(|actual| attr.matches(actual))
        })
    }

    /// Descendants in document order, excluding `self`.
    fn descendants(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        let mut stack: Vec<&Self> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

impl<'a> PostElement for &'a Node {
    fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attrs.get(name).cloned()
    }

    fn query(&self, selector: &Selector) -> Option<Self> {
        self.descendants().into_iter().find(|n| n.matches(selector))
    }

    fn query_all(&self, selector: &Selector) -> Vec<Self> {
        self.descendants()
            .into_iter()
            .filter(|n| n.matches(selector))
            .collect()
    }
}

/// A captured page: location path plus document body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub path: String,
    pub body: Node,
}

impl PageSnapshot {
    pub fn new(path: &str, body: Node) -> Self {
        Self {
            path: path.to_string(),
            body,
        }
    }

    /// Load a snapshot from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read page snapshot {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse page snapshot {}", path.display()))
    }
}

impl Page for PageSnapshot {
    type Element<'a> = &'a Node;

    fn location_path(&self) -> String {
        self.path.clone()
    }

    fn posts(&self) -> Vec<Post<&Node>> {
        let post_selector = Selector::tag(POST_TAG);
        let body = &self.body;
        let mut nodes = Vec::new();
        if body.matches(&post_selector) {
            nodes.push(body);
        }
        nodes.extend(body.query_all(&post_selector));

        nodes
            .into_iter()
            .enumerate()
            .map(|(index, element)| {
                let key = element
                    .attrs
                    .get("data-post-id")
                    .or_else(|| element.attrs.get("id"))
                    .cloned()
                    .unwrap_or_else(|| format!("{POST_TAG}-{index}"));
                Post {
                    key: PostKey(key),
                    element,
                }
            })
            .collect()
    }
}
