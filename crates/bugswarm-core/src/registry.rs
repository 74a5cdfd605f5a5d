// ── Feed registry ──
//
// The connector's view of locally available feeds. One registry instance
// is injected per connector; changes are pushed to a single listener.

use dashmap::DashMap;
use strum::Display;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::feed::Feed;

/// What happened to a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FeedChangeKind {
    Added,
    Modified,
    Removed,
}

/// Change notification carrying the affected feed's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedChange {
    pub kind: FeedChangeKind,
    pub name: String,
}

/// Source of local feeds consumed by the connector.
pub trait FeedRegistry: Send + Sync {
    /// Snapshot of every registered feed, structured and binary.
    fn list_feeds(&self) -> Vec<Feed>;

    fn get_feed(&self, name: &str) -> Option<Feed>;

    /// Install the change listener, replacing any previous one.
    /// `None` detaches.
    fn set_change_listener(&self, listener: Option<mpsc::UnboundedSender<FeedChange>>);
}

/// Concurrent in-process registry.
///
/// Producers call [`upsert`](Self::upsert) whenever a feed appears or its
/// shape changes, and [`remove`](Self::remove) when it goes away.
pub struct InMemoryFeedRegistry {
    feeds: DashMap<String, Feed>,
    listener: watch::Sender<Option<mpsc::UnboundedSender<FeedChange>>>,
}

impl Default for InMemoryFeedRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFeedRegistry {
    pub fn new() -> Self {
        let (listener, _) = watch::channel(None);
        Self {
            feeds: DashMap::new(),
            listener,
        }
    }

    /// Insert or replace a feed. Emits `Added` or `Modified`.
    pub fn upsert(&self, feed: Feed) {
        let name = feed.name().to_owned();
        let kind = match self.feeds.insert(name.clone(), feed) {
            Some(_) => FeedChangeKind::Modified,
            None => FeedChangeKind::Added,
        };
        self.notify(kind, name);
    }

    /// Remove a feed. Emits `Removed` if it existed.
    pub fn remove(&self, name: &str) -> Option<Feed> {
        let removed = self.feeds.remove(name).map(|(_, feed)| feed);
        if removed.is_some() {
            self.notify(FeedChangeKind::Removed, name.to_owned());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    fn notify(&self, kind: FeedChangeKind, name: String) {
        debug!(feed = %name, %kind, "feed registry change");
        if let Some(tx) = self.listener.borrow().as_ref() {
            // Listener gone just means nobody is connected right now.
            let _ = tx.send(FeedChange { kind, name });
        }
    }
}

impl FeedRegistry for InMemoryFeedRegistry {
    fn list_feeds(&self) -> Vec<Feed> {
        let mut feeds: Vec<Feed> = self.feeds.iter().map(|r| r.value().clone()).collect();
        feeds.sort_by(|a, b| a.name().cmp(b.name()));
        feeds
    }

    fn get_feed(&self, name: &str) -> Option<Feed> {
        self.feeds.get(name).map(|r| r.value().clone())
    }

    fn set_change_listener(&self, listener: Option<mpsc::UnboundedSender<FeedChange>>) {
        self.listener.send_replace(listener);
    }
}
