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

//! The coordinator: turns page changes into scored, colored posts and a
//! growing history.

pub mod navigation;
pub mod notify;
pub mod sink;

use crate::anomaly::{Palette, PostScorer, Signal};
use crate::config::{CoordinatorConfig, GlobalConfig, HistoryConfig, StyleConfig};
use crate::core::{Clock, DebouncedWriter, History, Storage};
use crate::page::{Page, Post, PostElement};
use anyhow::Context as _;
use chrono::{DateTime, Utc};
use navigation::is_main_timeline;
use notify::ChangeFeed;
use sink::PresentationSink;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Uninitialized,
    Ready,
    Evaluating,
}

/// What a trigger ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Triggered before [`Coordinator::init`]
    NotReady,
    /// Too soon after the previous pass
    Throttled,
    /// Not on a timeline: borders removed from this many posts
    Cleared { posts: usize },
    Evaluated { scored: usize, failed: usize },
}

pub struct Coordinator<S> {
    scorer: PostScorer,
    palette: Palette,
    style: StyleConfig,
    settings: CoordinatorConfig,
    history_config: HistoryConfig,
    history: History,
    storage: Arc<dyn Storage>,
    writer: DebouncedWriter,
    sink: S,
    clock: Arc<dyn Clock>,
    state: CoordinatorState,
    last_evaluation: Option<DateTime<Utc>>,
}

impl<S: PresentationSink> Coordinator<S> {
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: &GlobalConfig,
        storage: Arc<dyn Storage>,
        sink: S,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let history_config = config.history.clone();
        let writer = DebouncedWriter::new(
            Arc::clone(&storage),
            history_config.storage_key.clone(),
            history_config.save_debounce(),
        )?;

        Ok(Self {
            scorer: PostScorer::new(config.scoring, config.signal, config.selectors.clone()),
            palette: config.palette.clone(),
            style: config.style.clone(),
            settings: config.coordinator.clone(),
            history: History::new(history_config.window(), history_config.max_size),
            history_config,
            storage,
            writer,
            sink,
            clock,
            state: CoordinatorState::Uninitialized,
            last_evaluation: None,
        })
    }

    pub const fn state(&self) -> CoordinatorState {
        self.state
    }

    pub const fn history(&self) -> &History {
        &self.history
    }

    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Load the history, seed it if empty and run the first pass.
    pub fn init<P: Page>(&mut self, page: &P) -> PassOutcome {
        if self.state != CoordinatorState::Uninitialized {
            tracing::warn!("Coordinator already initialized");
            return self.on_change(page);
        }

        let css = self.style.transition_css();
        match self.sink.install_styles(&css) {
            Ok(()) => tracing::debug!("Transition styles installed"),
            Err(e) => tracing::info!("Style injection failed: {e:#}"),
        }

        let now = self.clock.now();
        self.history = self.load_history();
        self.history.prune(now);

        let stats = self.history.stats();
        tracing::info!(
            count = stats.count,
            finite = stats.finite,
            median = ?stats.median,
            "Loaded learned ratios"
        );

        if self.history.is_empty() {
            self.seed(page, now);
        }

        self.state = CoordinatorState::Ready;
        self.on_change(page)
    }

    fn load_history(&self) -> History {
        let window = self.history_config.window();
        let max_size = self.history_config.max_size;
        let key = &self.history_config.storage_key;

        match self.storage.get(key) {
            Ok(Some(value)) => History::from_value(value, window, max_size).unwrap_or_else(|e| {
                tracing::warn!("Discarding stored {key}: {e:#}");
                History::new(window, max_size)
            }),
            Ok(None) => History::new(window, max_size),
            Err(e) => {
                tracing::warn!("Could not load {key}: {e:#}");
                History::new(window, max_size)
            }
        }
    }

    /// Give an empty history a starting distribution from the visible posts.
    fn seed<P: Page>(&mut self, page: &P, now: DateTime<Utc>) {
        let posts = page.posts();
        for post in &posts {
            let value = self.scorer.seed_value(&post.element, now);
            self.history.record(value, now);
        }
        tracing::debug!("Seeded history from {} posts", posts.len());
        self.schedule_save(now);
    }

    /// Re-evaluate the page after a change notification.
    pub fn on_change<P: Page>(&mut self, page: &P) -> PassOutcome {
        profiling::function_scope!();

        if self.state == CoordinatorState::Uninitialized {
            tracing::debug!("Change before init, ignored");
            return PassOutcome::NotReady;
        }

        let now = self.clock.now();
        if let Some(last) = self.last_evaluation {
            if now - last < self.settings.throttle() {
                tracing::trace!("Evaluation throttled");
                return PassOutcome::Throttled;
            }
        }
        self.last_evaluation = Some(now);
        self.history.prune(now);

        let path = page.location_path();
        if !is_main_timeline(&path, &self.settings.timeline_paths) {
            let posts = self.clear_all(page);
            tracing::info!("Not on main timeline (path: {path}), borders cleared");
            return PassOutcome::Cleared { posts };
        }

        self.state = CoordinatorState::Evaluating;
        let mut scored = 0;
        let mut failed = 0;
        for post in page.posts() {
            match self.evaluate_post(&post, now) {
                Ok(_) => scored += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!("Post {} not colored: {e:#}", post.key);
                }
            }
        }
        if scored + failed > 0 {
            self.schedule_save(now);
        }
        self.state = CoordinatorState::Ready;

        tracing::debug!(scored, failed, history = self.history.len(), "Evaluation pass done");
        PassOutcome::Evaluated { scored, failed }
    }

    /// Score one post, record it and color it.
    ///
    /// The observation is recorded even when coloring fails.
    fn evaluate_post<E: PostElement>(
        &mut self,
        post: &Post<E>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Signal> {
        let score = self.scorer.score(&post.element, now);
        self.history.record(score.observation, now);
        self.sink
            .apply_color(&post.key, self.palette.color(score.signal))
            .with_context(|| format!("Failed to apply {} signal", score.signal))?;
        Ok(score.signal)
    }

    fn clear_all<P: Page>(&mut self, page: &P) -> usize {
        let mut cleared = 0;
        for post in page.posts() {
            match self.sink.clear_color(&post.key) {
                Ok(()) => cleared += 1,
                Err(e) => tracing::warn!("Post {} not cleared: {e:#}", post.key),
            }
        }
        cleared
    }

    fn history_value(&mut self, now: DateTime<Utc>) -> Option<serde_json::Value> {
        self.history.prune(now);
        match self.history.to_value() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Not saving history: {e:#}");
                None
            }
        }
    }

    fn schedule_save(&mut self, now: DateTime<Utc>) {
        if let Some(value) = self.history_value(now) {
            self.writer.schedule(value);
        }
    }

    /// Write the history out right away, replacing any pending save.
    pub fn teardown(&mut self) {
        let now = self.clock.now();
        if let Some(value) = self.history_value(now) {
            self.writer.flush(value);
        }
        tracing::debug!("Coordinator torn down with {} learned ratios", self.history.len());
    }

    /// Initialize on the current page, then re-evaluate on every change until
    /// the feed closes, then tear down.
    pub async fn run<P, F>(&mut self, mut feed: ChangeFeed, mut current_page: F)
    where
        P: Page,
        F: FnMut() -> P,
    {
        if self.state == CoordinatorState::Uninitialized {
            let page = current_page();
            self.init(&page);
        }
        while feed.changed().await {
            let page = current_page();
            let outcome = self.on_change(&page);
            tracing::trace!(?outcome, "Change handled");
        }
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::RatioParams;
    use crate::core::{ManualClock, MemoryStorage, Observation};
    use crate::page::{Node, PageSnapshot, PostKey};
    use chrono::TimeDelta;
    use sink::RecordingSink;
    use std::time::Duration;

    const KEY: &str = "learnedRatios";

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn counter(test_id: &str, text: &str) -> Node {
        Node::element("button")
            .attr("data-testid", test_id)
            .child(Node::element("span").text(text))
    }

    fn post(id: &str, replies: &str, views: &str) -> Node {
        Node::element("article")
            .attr("data-post-id", id)
            .child(Node::element("time").text("2h"))
            .child(counter("reply", replies))
            .child(counter("retweet", "50"))
            .child(counter("like", "300"))
            .child(
                Node::element("a")
                    .attr("href", "/x/status/1/analytics")
                    .child(Node::element("span").text(views)),
            )
    }

    fn timeline(path: &str) -> PageSnapshot {
        PageSnapshot::new(
            path,
            Node::element("main")
                .child(post("viral", "1.2K", "10K"))
                .child(post("quiet", "", "5K")),
        )
    }

    fn coordinator(storage: &MemoryStorage, clock: &ManualClock) -> Coordinator<RecordingSink> {
        Coordinator::new(
            &GlobalConfig::default(),
            Arc::new(storage.clone()),
            RecordingSink::new(),
            Arc::new(clock.clone()),
        )
        .expect("runtime")
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_seeds_and_colors() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(start());
        let mut coordinator = coordinator(&storage, &clock);
        assert_eq!(coordinator.state(), CoordinatorState::Uninitialized);

        let outcome = coordinator.init(&timeline("/home"));
        assert_eq!(outcome, PassOutcome::Evaluated { scored: 2, failed: 0 });
        assert_eq!(coordinator.state(), CoordinatorState::Ready);

        // two seed values plus two scored observations
        assert_eq!(coordinator.history().len(), 4);

        let palette = Palette::default();
        assert_eq!(coordinator.sink().color("viral"), Some(palette.low.as_str()));
        // no comment count: forced favorable
        assert_eq!(coordinator.sink().color("quiet"), Some(palette.high.as_str()));
        assert_eq!(coordinator.sink().styles.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_pass_within_throttle_is_ignored() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(start());
        let mut coordinator = coordinator(&storage, &clock);
        let page = timeline("/home");

        coordinator.init(&page);
        let size = coordinator.history().len();

        clock.advance(TimeDelta::milliseconds(499));
        assert_eq!(coordinator.on_change(&page), PassOutcome::Throttled);
        assert_eq!(coordinator.history().len(), size);

        clock.advance(TimeDelta::milliseconds(1));
        assert_eq!(
            coordinator.on_change(&page),
            PassOutcome::Evaluated { scored: 2, failed: 0 }
        );
        assert_eq!(coordinator.history().len(), size + 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_before_init() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(start());
        let mut coordinator = coordinator(&storage, &clock);
        assert_eq!(coordinator.on_change(&timeline("/home")), PassOutcome::NotReady);
        assert!(coordinator.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_off_timeline_clears_borders() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(start());
        let mut coordinator = coordinator(&storage, &clock);

        coordinator.init(&timeline("/"));
        let size = coordinator.history().len();
        assert_eq!(coordinator.sink().colors.len(), 2);

        clock.advance(TimeDelta::seconds(1));
        let outcome = coordinator.on_change(&timeline("/someone/status/1"));
        assert_eq!(outcome, PassOutcome::Cleared { posts: 2 });
        assert!(coordinator.sink().colors.is_empty());
        assert_eq!(coordinator.history().len(), size);
    }

    #[tokio::test(start_paused = true)]
    async fn test_off_timeline_pass_still_throttles() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(start());
        let mut coordinator = coordinator(&storage, &clock);

        coordinator.init(&timeline("/explore"));
        clock.advance(TimeDelta::milliseconds(100));
        assert_eq!(coordinator.on_change(&timeline("/home")), PassOutcome::Throttled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stored_history_is_loaded_and_pruned() {
        let storage = MemoryStorage::new();
        let stored = vec![
            Observation {
                value: 3.0,
                time: start() - TimeDelta::hours(25),
            },
            Observation {
                value: 7.0,
                time: start() - TimeDelta::hours(1),
            },
        ];
        storage
            .set(KEY, serde_json::to_value(stored).expect("serializable"))
            .expect("available");

        let clock = ManualClock::new(start());
        let mut coordinator = coordinator(&storage, &clock);
        coordinator.init(&timeline("/home"));

        // no seeding: one surviving stored value plus two scored posts
        assert_eq!(coordinator.history().len(), 3);
        assert!(coordinator.history().observations().iter().any(|o| o.value == 7.0));
        assert!(!coordinator.history().observations().iter().any(|o| o.value == 3.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_stored_history_starts_over() {
        let storage = MemoryStorage::new();
        storage.set(KEY, serde_json::json!("garbage")).expect("available");

        let clock = ManualClock::new(start());
        let mut coordinator = coordinator(&storage, &clock);
        coordinator.init(&timeline("/home"));
        assert_eq!(coordinator.history().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_is_saved_after_quiet_period() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(start());
        let mut coordinator = coordinator(&storage, &clock);
        coordinator.init(&timeline("/home"));

        assert_eq!(storage.get(KEY).expect("available"), None);
        tokio::time::sleep(Duration::from_millis(1_001)).await;

        let saved = storage.get(KEY).expect("available").expect("history saved");
        let restored: Vec<Observation> = serde_json::from_value(saved).expect("observation list");
        assert_eq!(restored.len(), 4);
        assert_eq!(
            restored.iter().filter(|o| o.value.is_infinite()).count(),
            1,
            "the post without comments records +inf"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidated_storage_skips_save() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(start());
        let mut coordinator = coordinator(&storage, &clock);
        coordinator.init(&timeline("/home"));

        storage.invalidate();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        coordinator.teardown();
        assert_eq!(coordinator.history().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_flushes_pending_save() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(start());
        let mut coordinator = coordinator(&storage, &clock);
        coordinator.init(&timeline("/home"));

        coordinator.teardown();
        assert!(storage.get(KEY).expect("available").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_post_does_not_abort_pass() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(start());
        let mut coordinator = coordinator(&storage, &clock);
        coordinator
            .sink_mut()
            .detached
            .insert(PostKey("viral".to_string()));
        coordinator.sink_mut().fail_styles = true;

        let outcome = coordinator.init(&timeline("/home"));
        assert_eq!(outcome, PassOutcome::Evaluated { scored: 1, failed: 1 });
        assert_eq!(coordinator.sink().color("viral"), None);
        assert!(coordinator.sink().color("quiet").is_some());
        assert_eq!(coordinator.history().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_stays_capped() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(start());
        let mut coordinator = coordinator(&storage, &clock);
        let page = timeline("/home");

        coordinator.init(&page);
        for _ in 0..80 {
            clock.advance(TimeDelta::seconds(1));
            coordinator.on_change(&page);
        }
        assert_eq!(coordinator.history().len(), 100);
        let oldest = coordinator
            .history()
            .observations()
            .iter()
            .map(|o| o.time)
            .min()
            .expect("non-empty");
        assert_eq!(oldest, start() + TimeDelta::seconds(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_over_feed() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(start());
        let mut coordinator = coordinator(&storage, &clock);
        let (notifier, feed) = notify::change_channel();

        let pages = [timeline("/home"), timeline("/explore")];
        let mut served = 0;
        clock.advance(TimeDelta::seconds(1));
        notifier.notify();
        drop(notifier);

        let ticking = clock.clone();
        coordinator
            .run(feed, || {
                let page = pages[served.min(pages.len() - 1)].clone();
                served += 1;
                ticking.advance(TimeDelta::seconds(1));
                page
            })
            .await;

        assert_eq!(served, 2);
        assert!(coordinator.sink().colors.is_empty());
        assert!(storage.get(KEY).expect("available").is_some());
    }

    #[test]
    fn test_scoring_config_is_used() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime");
        let _guard = runtime.enter();

        let mut config = GlobalConfig::default();
        config.scoring = RatioParams {
            visibility_floor: 5,
            ..RatioParams::default()
        };
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(start());
        let coordinator = Coordinator::new(
            &config,
            Arc::new(storage),
            RecordingSink::new(),
            Arc::new(clock),
        )
        .expect("runtime");
        assert_eq!(coordinator.scorer.params.visibility_floor, 5);
    }
}
