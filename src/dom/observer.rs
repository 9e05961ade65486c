use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

use super::{Document, NodeId};

/// Nodes attached to the document by one update, in mutation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    pub added: Vec<NodeId>,
}

/// Shared handle to the live document.
///
/// The lock is only ever held inside `read`/`update` closures, never across
/// an await point.
#[derive(Clone)]
pub struct Page {
    inner: Arc<Mutex<Document>>,
}

impl Page {
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(Mutex::new(document)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&*self.lock())
    }

    /// Mutate the document; everything attached inside `f` reaches
    /// subscribers as a single batch.
    pub fn update<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut doc = self.lock();
        let result = f(&mut *doc);
        doc.flush_mutations();
        result
    }

    pub fn location(&self) -> Url {
        self.lock().location().clone()
    }

    pub fn observe(&self) -> MutationSubscription {
        let (id, rx) = self.lock().add_observer();
        self.subscription(id, rx)
    }

    /// Subscribe unless `present` already holds for the document. The check and
    /// the install happen under one lock, so no update can land between them.
    /// `None` means `present` held and nothing was installed.
    pub fn observe_unless(
        &self,
        present: impl FnOnce(&Document) -> bool,
    ) -> Option<MutationSubscription> {
        let (id, rx) = {
            let mut doc = self.lock();
            if present(&*doc) {
                return None;
            }
            doc.add_observer()
        };
        Some(self.subscription(id, rx))
    }

    fn subscription(
        &self,
        id: u64,
        rx: mpsc::UnboundedReceiver<MutationBatch>,
    ) -> MutationSubscription {
        debug!(observer = id, "mutation subscription installed");
        MutationSubscription {
            id,
            rx,
            page: self.clone(),
        }
    }
}

/// Stream of mutation batches. Disconnected on `cancel` or drop.
pub struct MutationSubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<MutationBatch>,
    page: Page,
}

impl MutationSubscription {
    /// Next batch, or `None` once the document stops delivering.
    pub async fn next(&mut self) -> Option<MutationBatch> {
        self.rx.recv().await
    }

    /// Stop delivery. Batches still queued are discarded.
    pub fn cancel(self) {}
}

impl Drop for MutationSubscription {
    fn drop(&mut self) {
        self.rx.close();
        self.page.lock().remove_observer(self.id);
        debug!(observer = self.id, "mutation subscription cancelled");
    }
}
