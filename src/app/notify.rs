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

//! "Something changed" notifications from the page.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Anything that can tell when the set of posts on the page changed.
pub trait ChangeSource {
    /// Start delivering notifications to `notifier`.
    fn subscribe(&mut self, notifier: ChangeNotifier);
}

/// Sending half handed to a [`ChangeSource`].
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: UnboundedSender<()>,
}

impl ChangeNotifier {
    /// Returns false once the feed has been dropped.
    pub fn notify(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

/// Receiving half consumed by the coordinator loop.
#[derive(Debug)]
pub struct ChangeFeed {
    rx: UnboundedReceiver<()>,
}

impl ChangeFeed {
    /// Wait for the next change, folding any notifications already queued
    /// into it. Returns false when every notifier is gone.
    pub async fn changed(&mut self) -> bool {
        if self.rx.recv().await.is_none() {
            return false;
        }
        while self.rx.try_recv().is_ok() {}
        true
    }
}

pub fn change_channel() -> (ChangeNotifier, ChangeFeed) {
    let (tx, rx) = unbounded_channel();
    (ChangeNotifier { tx }, ChangeFeed { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_is_coalesced() {
        let (notifier, mut feed) = change_channel();
        for _ in 0..5 {
            assert!(notifier.notify());
        }
        assert!(feed.changed().await);

        drop(notifier);
        assert!(!feed.changed().await);
    }

    #[tokio::test]
    async fn test_notify_after_feed_dropped() {
        let (notifier, feed) = change_channel();
        drop(feed);
        assert!(!notifier.notify());
    }
}
