// ── Feed response tasks ──
//
// Units of work the scheduler runs to answer a feed request. Each run looks
// the feed up again, so value changes and removals are picked up between
// runs. Errors are logged and never unschedule the task.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::capabilities::feed_document;
use crate::error::CoreError;
use crate::event::TaskKey;
use crate::feed::Feed;
use crate::messaging::Messaging;
use crate::registry::FeedRegistry;
use crate::scheduler::ScheduledTask;
use crate::web::WebService;

/// Sends a structured feed's current values to the requesting peer.
pub struct StructuredFeedTask {
    key: TaskKey,
    registry: Arc<dyn FeedRegistry>,
    messaging: Arc<dyn Messaging>,
}

impl StructuredFeedTask {
    pub fn new(key: TaskKey, registry: Arc<dyn FeedRegistry>, messaging: Arc<dyn Messaging>) -> Self {
        Self {
            key,
            registry,
            messaging,
        }
    }

    async fn respond(&self) -> Result<(), CoreError> {
        let Some(Feed::Structured(feed)) = self.registry.get_feed(&self.key.feed) else {
            debug!(task = %self.key, "structured feed no longer available");
            return Ok(());
        };
        let document = feed_document(&feed.name, feed.source.read());
        self.messaging
            .send_feed_to_user(&self.key.peer, &self.key.swarm_id, &document)
            .await
    }
}

#[async_trait]
impl ScheduledTask for StructuredFeedTask {
    async fn run(&self) {
        if let Err(e) = self.respond().await {
            warn!(
                peer = %self.key.peer,
                swarm = %self.key.swarm_id,
                feed = %self.key.feed,
                error = %e,
                "feed response failed"
            );
        }
    }
}

/// Reads a binary feed in full and uploads it for the requesting peer.
pub struct BinaryFeedTask {
    key: TaskKey,
    registry: Arc<dyn FeedRegistry>,
    web: Arc<dyn WebService>,
}

impl BinaryFeedTask {
    pub fn new(key: TaskKey, registry: Arc<dyn FeedRegistry>, web: Arc<dyn WebService>) -> Self {
        Self { key, registry, web }
    }

    async fn respond(&self) -> Result<(), CoreError> {
        let Some(Feed::Binary(feed)) = self.registry.get_feed(&self.key.feed) else {
            debug!(task = %self.key, "binary feed no longer available");
            return Ok(());
        };

        let mut reader = feed.source.open().await?;
        let mut payload = Vec::new();
        reader.read_to_end(&mut payload).await?;

        debug!(task = %self.key, bytes = payload.len(), "uploading binary feed");
        self.web
            .upload_binary(
                &self.key.peer.username,
                &self.key.peer.resource,
                &feed.name,
                Bytes::from(payload),
            )
            .await
    }
}

#[async_trait]
impl ScheduledTask for BinaryFeedTask {
    async fn run(&self) {
        if let Err(e) = self.respond().await {
            warn!(
                peer = %self.key.peer,
                swarm = %self.key.swarm_id,
                feed = %self.key.feed,
                error = %e,
                "binary feed upload failed"
            );
        }
    }
}
