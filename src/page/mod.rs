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

//! Read-only view of the page the engine runs on.
//!
//! The engine never touches a real DOM. It sees a [`Page`] that knows its
//! location and hands out keyed [`PostElement`]s, which can be queried with
//! simple CSS-like [`Selector`]s. [`snapshot`] provides an in-memory
//! implementation used by the CLI and the tests.

pub mod selector;
pub mod snapshot;

pub use selector::{Lookup, Selector};
pub use snapshot::{Node, PageSnapshot};

use std::fmt;

/// Stable identifier of a post element within a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostKey(pub String);

impl fmt::Display for PostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A queryable element of a post (the post itself or one of its descendants).
pub trait PostElement: Sized {
    /// Concatenated text of this element and all of its descendants.
    fn text_content(&self) -> String;

    /// Value of an attribute on this element.
    fn attribute(&self, name: &str) -> Option<String>;

    /// First descendant (document order) matching `selector`.
    fn query(&self, selector: &Selector) -> Option<Self>;

    /// All descendants (document order) matching `selector`.
    fn query_all(&self, selector: &Selector) -> Vec<Self>;

    /// First descendant matched by any strategy of `lookup`, tried in order.
    fn lookup(&self, lookup: &Lookup) -> Option<Self> {
        lookup.strategies().iter().find_map(|s| self.query(s))
    }
}

/// A post element together with its key.
#[derive(Debug, Clone)]
pub struct Post<E> {
    pub key: PostKey,
    pub element: E,
}

/// The currently rendered page.
pub trait Page {
    type Element<'a>: PostElement
    where
        Self: 'a;

    /// Path component of the current location, e.g. `/home`.
    fn location_path(&self) -> String;

    /// Every post element currently in the document.
    fn posts(&self) -> Vec<Post<Self::Element<'_>>>;
}
