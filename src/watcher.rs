//! Per-page controller: waits for the paywall barrier, then runs
//! detect → fetch → reconstruct → patch exactly once.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Anchors;
use crate::detect::{detect, PaywallSignals, PaywallState};
use crate::dom::{Document, MutationBatch, Page};
use crate::fetch::{ReviewFetcher, ReviewPayload};
use crate::markup::render_body;
use crate::page::{classify, PageKind};
use crate::patch::{select_injector, PatchReport, Patcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Observing,
    Triggered,
    Enhancing,
    Settled(Outcome),
}

pub struct Watcher {
    page: Page,
    fetcher: ReviewFetcher,
    patcher: Patcher,
    anchors: Anchors,
    state: watch::Sender<RunState>,
    history: Vec<RunState>,
    report: Option<PatchReport>,
}

impl Watcher {
    /// The markup injector is chosen here, once, from the page's capabilities.
    pub fn new(page: Page, fetcher: ReviewFetcher, anchors: Anchors) -> Self {
        let capabilities = page.read(Document::capabilities);
        let patcher = Patcher::new(select_injector(&capabilities), anchors.clone());
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            page,
            fetcher,
            patcher,
            anchors,
            state,
            history: vec![RunState::Idle],
            report: None,
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    /// What the patcher did, if it ran.
    pub fn report(&self) -> Option<PatchReport> {
        self.report
    }

    fn transition(&mut self, next: RunState) {
        debug!("watcher: {:?} -> {:?}", self.state(), next);
        self.state.send_replace(next);
        self.history.push(next);
    }

    fn settle(&mut self, outcome: Outcome) -> RunState {
        self.transition(RunState::Settled(outcome));
        self.state()
    }

    /// Drive the run to completion. Only the first call does anything; later
    /// calls return the current state untouched.
    pub async fn run(&mut self) -> RunState {
        if self.state() != RunState::Idle {
            debug!("watcher already ran ({:?}); ignoring", self.state());
            return self.state();
        }

        let location = self.page.location();
        if classify(location.path()) != PageKind::AlbumReview {
            debug!("{} is not an album review; staying idle", location.path());
            return self.state();
        }

        let barrier = self.anchors.barrier_class.clone();
        let subscription = self
            .page
            .observe_unless(|doc| doc.find_by_class(&barrier).is_some());
        if let Some(mut subscription) = subscription {
            self.transition(RunState::Observing);
            loop {
                let Some(batch) = subscription.next().await else {
                    debug!("mutation stream closed before any barrier appeared");
                    return self.state();
                };
                if self.page.read(|doc| batch_adds_barrier(doc, &batch, &barrier)) {
                    subscription.cancel();
                    break;
                }
            }
        } else {
            debug!("barrier present at install time");
        }

        self.transition(RunState::Triggered);
        self.enhance().await
    }

    async fn enhance(&mut self) -> RunState {
        self.transition(RunState::Enhancing);

        let anchors = &self.anchors;
        let signals = self.page.read(|doc| PaywallSignals::collect(doc, anchors));
        if detect(&signals) == PaywallState::Open {
            info!("Barrier seen but review is not paywalled; nothing to do");
            return self.settle(Outcome::Success);
        }

        let location = self.page.location();
        let document = match self.fetcher.fetch_document(&location).await {
            Ok(document) => document,
            Err(e) => {
                warn!("Fetching structured review for {} failed: {}", location, e);
                return self.settle(Outcome::Failed);
            }
        };

        let payload = match ReviewPayload::from_document(&document) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Malformed review payload for {}: {}", location, e);
                return self.settle(Outcome::Success);
            }
        };
        if payload.body.is_none() {
            warn!("Review payload for {} has no body; restoring score only", location);
        }

        let markup = payload.body.as_deref().map(render_body);
        let patcher = &self.patcher;
        let report = self
            .page
            .update(|doc| patcher.apply(doc, markup.as_deref(), payload.score));
        info!(
            body_replaced = report.body_replaced,
            score_restored = report.score_restored,
            "Restored review at {}",
            location
        );
        self.report = Some(report);
        self.settle(Outcome::Success)
    }
}

/// Only the newly attached subtrees are searched, not the whole document.
fn batch_adds_barrier(doc: &Document, batch: &MutationBatch, barrier_class: &str) -> bool {
    batch
        .added
        .iter()
        .any(|&id| doc.find_by_class_in(id, barrier_class).is_some())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use url::Url;

    use super::*;

    // Nothing listens here; any fetch attempt fails fast.
    const UNREACHABLE: &str = "http://127.0.0.1:1";

    fn watcher(path: &str, html: &str) -> (Watcher, Page) {
        let url = Url::parse(&format!("{UNREACHABLE}{path}")).unwrap();
        let page = Page::new(Document::parse(url, html));
        let fetcher = ReviewFetcher::new("paywall_drop-test").unwrap();
        (Watcher::new(page.clone(), fetcher, Anchors::default()), page)
    }

    #[tokio::test]
    async fn other_pages_stay_idle() {
        let (mut w, page) = watcher("/news/some-story/", r#"<body><div class="FloatingBarrier"></div></body>"#);
        assert_eq!(w.run().await, RunState::Idle);
        assert_eq!(w.history(), &[RunState::Idle]);
        assert_eq!(page.read(Document::observer_count), 0);
    }

    #[tokio::test]
    async fn vanished_barrier_settles_without_fetching() {
        let (mut w, page) = watcher(
            "/reviews/albums/x/",
            r#"<body><div class="ScoreBox"><p class="Rating">8.1</p></div></body>"#,
        );
        let mut states = w.subscribe_state();
        let run = tokio::spawn(async move {
            let state = w.run().await;
            (w, state)
        });
        states.wait_for(|s| *s == RunState::Observing).await.unwrap();

        // The barrier flashes in and is gone before the watcher looks.
        let (body, kept) = page.update(|doc| {
            let body = doc.body().unwrap();
            let kept = doc.children(body).to_vec();
            let barrier = doc.create_element("div", [("class", "FloatingBarrier-q1")]);
            doc.append_child(body, barrier);
            (body, kept)
        });
        page.update(|doc| doc.replace_children(body, kept));
        let before = page.read(Document::to_html);

        let (w, state) = run.await.unwrap();
        assert_eq!(state, RunState::Settled(Outcome::Success));
        assert_eq!(
            w.history(),
            &[
                RunState::Idle,
                RunState::Observing,
                RunState::Triggered,
                RunState::Enhancing,
                RunState::Settled(Outcome::Success),
            ]
        );
        assert_eq!(w.report(), None);
        assert_eq!(page.read(Document::to_html), before);
    }

    #[tokio::test]
    async fn fetch_failure_settles_failed_once() {
        let (mut w, page) = watcher(
            "/reviews/albums/x/",
            r#"<body><div class="FloatingBarrier"></div><div class="ScoreBox"><p class="Rating">0.0</p></div></body>"#,
        );
        let before = page.read(Document::to_html);

        assert_eq!(w.run().await, RunState::Settled(Outcome::Failed));
        assert_eq!(w.run().await, RunState::Settled(Outcome::Failed));
        assert_eq!(w.history().len(), 4);
        assert_eq!(page.read(Document::to_html), before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn barrier_after_observing_always_triggers() {
        for _ in 0..50 {
            let (mut w, page) = watcher("/reviews/albums/x/", "<body></body>");
            let mut states = w.subscribe_state();
            let run = tokio::spawn(async move { w.run().await });

            states.wait_for(|s| *s == RunState::Observing).await.unwrap();
            page.update(|doc| {
                let body = doc.body().unwrap();
                let barrier = doc.create_element("div", [("class", "FloatingBarrier")]);
                doc.append_child(body, barrier);
            });

            let state = tokio::time::timeout(Duration::from_secs(5), run)
                .await
                .expect("watcher never left Observing")
                .unwrap();
            assert_eq!(state, RunState::Settled(Outcome::Failed));
            assert_eq!(page.read(Document::observer_count), 0);
        }
    }

    #[tokio::test]
    async fn unrelated_additions_do_not_trigger() {
        let (mut w, page) = watcher("/reviews/albums/x/", "<body></body>");
        let mut states = w.subscribe_state();

        let run = tokio::spawn(async move {
            let state = w.run().await;
            (w, state)
        });
        states.wait_for(|s| *s == RunState::Observing).await.unwrap();

        page.update(|doc| {
            let body = doc.body().unwrap();
            let el = doc.create_element("div", [("class", "Banner")]);
            doc.append_child(body, el);
        });
        tokio::task::yield_now().await;
        assert_eq!(*states.borrow(), RunState::Observing);
        assert_eq!(page.read(Document::observer_count), 1);

        run.abort();
        let _ = run.await;
        // Dropping the watcher mid-observation disconnects it.
        assert_eq!(page.read(Document::observer_count), 0);
    }
}
