// ── Messaging contract ──
//
// How the connector talks to peers. `StreamMessaging` runs it over the
// participation stream and translates stanzas into `ProtocolEvent`s.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use bugswarm_api::{ParticipationClient, PeerAddress, ReconnectConfig, StreamConfig, TransportConfig};

use crate::error::CoreError;
use crate::event::ProtocolEvent;

#[async_trait]
pub trait Messaging: Send + Sync {
    /// Open the session for `resource_id` and start delivering events to
    /// `events`, in arrival order.
    async fn connect(
        &self,
        resource_id: &str,
        events: mpsc::UnboundedSender<ProtocolEvent>,
    ) -> Result<(), CoreError>;

    async fn join_swarm(&self, swarm_id: &str) -> Result<(), CoreError>;

    async fn leave_swarm(&self, swarm_id: &str) -> Result<(), CoreError>;

    /// Broadcast `document` to everyone present in the swarm.
    async fn announce(&self, swarm_id: &str, document: &Value) -> Result<(), CoreError>;

    /// Send one feed response privately.
    async fn send_feed_to_user(
        &self,
        peer: &PeerAddress,
        swarm_id: &str,
        document: &Value,
    ) -> Result<(), CoreError>;

    /// Send the capabilities document privately.
    async fn send_all_feeds_to_user(
        &self,
        peer: &PeerAddress,
        swarm_id: &str,
        document: &Value,
    ) -> Result<(), CoreError>;

    async fn clear_chat_cache(&self, peer: &PeerAddress);

    async fn disconnect(&self);

    fn is_connected(&self) -> bool;
}

// ── Participation stream implementation ──────────────────────────────

/// [`Messaging`] over the BUGswarm participation stream.
pub struct StreamMessaging {
    hostname: String,
    port: u16,
    api_key: SecretString,
    transport: TransportConfig,
    reconnect: ReconnectConfig,
    // Never held across an await, so readers are not blocked by connect.
    client: RwLock<Option<Arc<ParticipationClient>>>,
}

impl StreamMessaging {
    pub fn new(
        hostname: impl Into<String>,
        port: u16,
        api_key: SecretString,
        transport: TransportConfig,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            api_key,
            transport,
            reconnect: ReconnectConfig::default(),
            client: RwLock::new(None),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    fn current(&self) -> Option<Arc<ParticipationClient>> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }

    fn swap(&self, next: Option<Arc<ParticipationClient>>) -> Option<Arc<ParticipationClient>> {
        std::mem::replace(
            &mut *self.client.write().unwrap_or_else(PoisonError::into_inner),
            next,
        )
    }

    fn client(&self) -> Result<Arc<ParticipationClient>, CoreError> {
        self.current().ok_or(CoreError::Disconnected)
    }
}

#[async_trait]
impl Messaging for StreamMessaging {
    async fn connect(
        &self,
        resource_id: &str,
        events: mpsc::UnboundedSender<ProtocolEvent>,
    ) -> Result<(), CoreError> {
        let mut config = StreamConfig::new(
            &self.hostname,
            self.port,
            resource_id,
            self.api_key.clone(),
            &self.transport,
        )?;
        config.reconnect = self.reconnect.clone();

        let (stanza_tx, mut stanza_rx) = mpsc::unbounded_channel();
        let client = ParticipationClient::connect(config, stanza_tx).await?;

        // Ends when the session drops its sender or the connector stops listening.
        tokio::spawn(async move {
            while let Some(stanza) = stanza_rx.recv().await {
                let Some(event) = ProtocolEvent::from_stanza(stanza) else {
                    continue;
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            debug!("stanza forwarder exiting");
        });

        if let Some(previous) = self.swap(Some(Arc::new(client))) {
            warn!("replacing an existing participation session");
            previous.disconnect().await;
        }
        Ok(())
    }

    async fn join_swarm(&self, swarm_id: &str) -> Result<(), CoreError> {
        Ok(self.client()?.join_swarm(swarm_id).await?)
    }

    async fn leave_swarm(&self, swarm_id: &str) -> Result<(), CoreError> {
        Ok(self.client()?.leave_swarm(swarm_id).await?)
    }

    async fn announce(&self, swarm_id: &str, document: &Value) -> Result<(), CoreError> {
        Ok(self.client()?.publish(swarm_id, document.clone())?)
    }

    async fn send_feed_to_user(
        &self,
        peer: &PeerAddress,
        swarm_id: &str,
        document: &Value,
    ) -> Result<(), CoreError> {
        Ok(self
            .client()?
            .send_private(peer, swarm_id, document.clone())
            .await?)
    }

    async fn send_all_feeds_to_user(
        &self,
        peer: &PeerAddress,
        swarm_id: &str,
        document: &Value,
    ) -> Result<(), CoreError> {
        self.send_feed_to_user(peer, swarm_id, document).await
    }

    async fn clear_chat_cache(&self, peer: &PeerAddress) {
        if let Some(client) = self.current() {
            client.clear_chat_cache(peer).await;
        }
    }

    async fn disconnect(&self) {
        if let Some(client) = self.swap(None) {
            client.disconnect().await;
        }
    }

    fn is_connected(&self) -> bool {
        self.current().is_some_and(|c| c.is_connected())
    }
}
