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

//! Compound CSS-like selectors.
//!
//! Only the subset the extractor needs is supported: an optional tag name
//! followed by any number of `.class`, `[attr="value"]` and
//! `[attr*="value"]` parts, e.g. `span.r-1qa8mrt` or `a[href*="/analytics"]`.

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static TAG_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*").expect("valid regex literal"));
static CLASS_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.([A-Za-z0-9_-]+)").expect("valid regex literal"));
static ATTR_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\[\s*([A-Za-z0-9_-]+)\s*(\*?=)\s*"([^"]*)"\s*\]"#).expect("valid regex literal")
});

/// How an attribute part compares against the element's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    Equals,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrMatch {
    pub name: String,
    pub op: AttrOp,
    pub value: String,
}

impl AttrMatch {
    pub fn matches(&self, actual: &str) -> bool {
        match self.op {
            AttrOp::Equals => actual == self.value,
            AttrOp::Contains => actual.contains(&self.value),
        }
    }
}

/// A compound selector. Every part present must match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Selector {
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrMatch>,
}

impl Selector {
    pub fn tag(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_ascii_lowercase()),
            ..Self::default()
        }
    }

    /// Shorthand for `[data-testid="<id>"]`.
    pub fn test_id(id: &str) -> Self {
        Self::default().with_attr("data-testid", AttrOp::Equals, id)
    }

    #[must_use]
    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    #[must_use]
    pub fn with_attr(mut self, name: &str, op: AttrOp, value: &str) -> Self {
        self.attrs.push(AttrMatch {
            name: name.to_string(),
            op,
            value: value.to_string(),
        });
        self
    }

    /// Parse a selector string like `a[href*="/analytics"]`.
    pub fn parse(input: &str) -> Result<Self, String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err("empty selector".to_string());
        }

        let mut selector = Self::default();
        let mut rest = trimmed;

        if let Ok(Some(m)) = TAG_PART.find(rest) {
            selector.tag = Some(m.as_str().to_ascii_lowercase());
            rest = &rest[m.end()..];
        }

        while !rest.is_empty() {
            if let Ok(Some(caps)) = CLASS_PART.captures(rest) {
                selector.classes.push(caps[1].to_string());
                rest = &rest[caps[0].len()..];
            } else if let Ok(Some(caps)) = ATTR_PART.captures(rest) {
                let op = if &caps[2] == "*=" {
                    AttrOp::Contains
                } else {
                    AttrOp::Equals
                };
                selector.attrs.push(AttrMatch {
                    name: caps[1].to_string(),
                    op,
                    value: caps[3].to_string(),
                });
                rest = &rest[caps[0].len()..];
            } else {
                return Err(format!("unsupported selector syntax near '{rest}' in '{trimmed}'"));
            }
        }

        Ok(selector)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        for attr in &self.attrs {
            let op = match attr.op {
                AttrOp::Equals => "=",
                AttrOp::Contains => "*=",
            };
            write!(f, "[{}{op}\"{}\"]", attr.name, attr.value)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Selector {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.to_string()
    }
}

/// Ordered lookup strategies. The first strategy that finds an element wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lookup(Vec<Selector>);

impl Lookup {
    pub const fn new(strategies: Vec<Selector>) -> Self {
        Self(strategies)
    }

    pub fn strategies(&self) -> &[Selector] {
        &self.0
    }
}
