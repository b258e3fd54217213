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

/// Whether `path` is one of the timeline locations posts are scored on.
///
/// Matching is exact; a trailing slash or query makes it a different page.
pub fn is_main_timeline(path: &str, timeline_paths: &[String]) -> bool {
    timeline_paths.iter().any(|p| p == path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Vec<String> {
        vec!["/".to_string(), "/home".to_string()]
    }

    #[test]
    fn test_timeline_paths() {
        assert!(is_main_timeline("/", &defaults()));
        assert!(is_main_timeline("/home", &defaults()));
        assert!(!is_main_timeline("/home/", &defaults()));
        assert!(!is_main_timeline("/someone/status/1", &defaults()));
        assert!(!is_main_timeline("/explore", &defaults()));
        assert!(!is_main_timeline("/", &[]));
    }
}
