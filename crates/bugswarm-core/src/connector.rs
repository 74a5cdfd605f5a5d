// ── Connector ──
//
// Session lifecycle for one device: resolve the device resource, connect
// the messaging session, join member swarms, announce local feeds, then
// react to protocol and feed-registry events until shutdown.
//
// All session state lives behind one lock and is only mutated from the
// event loop and the start/shutdown paths.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use strum::Display;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use bugswarm_api::{PeerAddress, SwarmModel};

use crate::capabilities::capabilities_document;
use crate::config::ConnectorConfig;
use crate::error::CoreError;
use crate::event::{ProtocolEvent, TaskKey};
use crate::feed::Feed;
use crate::messaging::Messaging;
use crate::registry::{FeedChange, FeedRegistry};
use crate::request::FeedRequest;
use crate::scheduler::{ScheduledTask, TaskHandle, TaskScheduler};
use crate::store::ResourceStore;
use crate::task::{BinaryFeedTask, StructuredFeedTask};
use crate::web::WebService;

const RESOURCE_DESCRIPTION: &str = "BUGswarm device connector";
const RESOURCE_MACHINE_TYPE: &str = "pc";

// ── ConnectorState ───────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectorState {
    Created,
    Initializing,
    Running,
    ShuttingDown,
    Stopped,
}

// ── Session ──────────────────────────────────────────────────────

struct Session {
    resource_id: Option<String>,
    member_swarms: Vec<SwarmModel>,
    blacklist: BTreeSet<String>,
    active_tasks: HashMap<TaskKey, TaskHandle>,
    scheduler: Option<TaskScheduler>,
}

impl Session {
    fn is_member(&self, swarm_id: &str) -> bool {
        self.member_swarms.iter().any(|s| s.id == swarm_id)
    }

    /// Cancel and forget every active task whose key matches.
    fn cancel_matching(&mut self, matches: impl Fn(&TaskKey) -> bool) -> usize {
        let before = self.active_tasks.len();
        self.active_tasks.retain(|key, handle| {
            if matches(key) {
                handle.cancel();
                false
            } else {
                true
            }
        });
        before - self.active_tasks.len()
    }
}

// ── Connector ────────────────────────────────────────────────────

/// The device connector.
///
/// Cheaply cloneable via `Arc<ConnectorInner>`. Collaborators are injected
/// so tests can substitute fakes for the network.
#[derive(Clone)]
pub struct Connector {
    inner: Arc<ConnectorInner>,
}

struct ConnectorInner {
    config: ConnectorConfig,
    web: Arc<dyn WebService>,
    messaging: Arc<dyn Messaging>,
    registry: Arc<dyn FeedRegistry>,
    store: Arc<dyn ResourceStore>,
    state: watch::Sender<ConnectorState>,
    session: Mutex<Session>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Connector {
    /// Create a connector. Does NOT connect -- call [`start()`](Self::start).
    ///
    /// Fails with [`CoreError::Config`] if the configuration is invalid.
    pub fn new(
        config: ConnectorConfig,
        web: Arc<dyn WebService>,
        messaging: Arc<dyn Messaging>,
        registry: Arc<dyn FeedRegistry>,
        store: Arc<dyn ResourceStore>,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        let (state, _) = watch::channel(ConnectorState::Created);
        let session = Session {
            resource_id: config.resource_id.clone(),
            member_swarms: Vec::new(),
            blacklist: BTreeSet::new(),
            active_tasks: HashMap::new(),
            scheduler: None,
        };

        Ok(Self {
            inner: Arc::new(ConnectorInner {
                config,
                web,
                messaging,
                registry,
                store,
                state,
                session: Mutex::new(session),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Access the connector configuration.
    pub fn config(&self) -> &ConnectorConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Bring the connector up.
    ///
    /// On failure the connector is left in [`ConnectorState::Created`] and
    /// `start` may be called again.
    pub async fn start(&self) -> Result<(), CoreError> {
        let claimed = self.inner.state.send_if_modified(|state| {
            if *state == ConnectorState::Created {
                *state = ConnectorState::Initializing;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(match self.state() {
                ConnectorState::ShuttingDown | ConnectorState::Stopped => CoreError::ShutDown,
                _ => CoreError::AlreadyRunning,
            });
        }

        let mut session = self.inner.session.lock().await;
        match self.initialize(&mut session).await {
            Ok((events, changes)) => {
                drop(session);
                let connector = self.clone();
                let cancel = self.inner.cancel.clone();
                self.inner
                    .task_handles
                    .lock()
                    .await
                    .push(tokio::spawn(event_loop(connector, events, changes, cancel)));

                self.inner.state.send_replace(ConnectorState::Running);
                info!("connector running");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "connector initialization failed");
                self.inner.registry.set_change_listener(None);
                if let Some(scheduler) = session.scheduler.take() {
                    scheduler.shutdown().await;
                }
                session.member_swarms.clear();
                drop(session);
                self.inner.messaging.disconnect().await;

                self.inner.state.send_replace(ConnectorState::Created);
                Err(e)
            }
        }
    }

    /// Stop the connector: halt scheduled work, leave every member swarm,
    /// disconnect, and stop listening to the feed registry. Idempotent.
    pub async fn shutdown(&self) {
        let mut from_running = false;
        let claimed = self.inner.state.send_if_modified(|state| match *state {
            ConnectorState::Running => {
                from_running = true;
                *state = ConnectorState::ShuttingDown;
                true
            }
            ConnectorState::Created => {
                *state = ConnectorState::Stopped;
                true
            }
            _ => false,
        });
        if !claimed || !from_running {
            return;
        }

        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        let mut session = self.inner.session.lock().await;
        if let Some(scheduler) = session.scheduler.take() {
            scheduler.shutdown().await;
        }
        session.cancel_matching(|_| true);

        for swarm in std::mem::take(&mut session.member_swarms) {
            if let Err(e) = self.inner.messaging.leave_swarm(&swarm.id).await {
                warn!(swarm = %swarm.id, error = %e, "failed to leave swarm");
            }
        }
        drop(session);

        self.inner.messaging.disconnect().await;
        self.inner.registry.set_change_listener(None);

        self.inner.state.send_replace(ConnectorState::Stopped);
        info!("connector stopped");
    }

    // ── State observation ────────────────────────────────────────

    pub fn state(&self) -> ConnectorState {
        *self.inner.state.borrow()
    }

    /// Subscribe to lifecycle state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectorState> {
        self.inner.state.subscribe()
    }

    /// Server-assigned resource id of this device, once resolved.
    pub async fn resource_id(&self) -> Option<String> {
        self.inner.session.lock().await.resource_id.clone()
    }

    pub async fn member_swarms(&self) -> Vec<SwarmModel> {
        self.inner.session.lock().await.member_swarms.clone()
    }

    /// Feeds disabled by meta requests.
    pub async fn blacklist(&self) -> Vec<String> {
        self.inner
            .session
            .lock()
            .await
            .blacklist
            .iter()
            .cloned()
            .collect()
    }

    /// Keys of every recurring task currently streaming.
    pub async fn active_task_keys(&self) -> Vec<TaskKey> {
        let mut keys: Vec<TaskKey> = self
            .inner
            .session
            .lock()
            .await
            .active_tasks
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    // ── Initialization ───────────────────────────────────────────

    async fn initialize(
        &self,
        session: &mut Session,
    ) -> Result<
        (
            mpsc::UnboundedReceiver<ProtocolEvent>,
            mpsc::UnboundedReceiver<FeedChange>,
        ),
        CoreError,
    > {
        let resource_id = self.resolve_resource(session).await?;
        info!(resource = %resource_id, "device resource resolved");

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.inner.messaging.connect(&resource_id, event_tx).await?;
        session.scheduler = Some(TaskScheduler::new());

        let swarms = match self.inner.web.list_member_swarms(&resource_id).await {
            Ok(swarms) => swarms,
            Err(e) if e.is_not_found() => {
                info!("device has no swarm memberships");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        for swarm in swarms {
            if session.is_member(&swarm.id) {
                continue;
            }
            self.inner.messaging.join_swarm(&swarm.id).await?;
            debug!(swarm = %swarm.id, name = %swarm.name, "joined member swarm");
            session.member_swarms.push(swarm);
        }

        if !session.member_swarms.is_empty() {
            self.announce_all(session).await;
        }

        let (change_tx, change_rx) = mpsc::unbounded_channel();
        self.inner.registry.set_change_listener(Some(change_tx));

        Ok((event_rx, change_rx))
    }

    /// Look up the stored resource, or create and persist a new one.
    async fn resolve_resource(&self, session: &mut Session) -> Result<String, CoreError> {
        if let Some(resource_id) = session.resource_id.clone() {
            return match self.inner.web.get_resource(&resource_id).await? {
                Some(_) => Ok(resource_id),
                None => {
                    warn!(resource = %resource_id, "stored resource no longer exists, clearing it");
                    self.inner.store.clear_resource_id()?;
                    session.resource_id = None;
                    Err(CoreError::ResourceGone { resource_id })
                }
            };
        }

        let created = self
            .inner
            .web
            .create_resource(
                &self.inner.config.device_name,
                RESOURCE_DESCRIPTION,
                RESOURCE_MACHINE_TYPE,
                0.0,
                0.0,
            )
            .await?;
        self.inner.store.store_resource_id(&created.resource_id)?;
        info!(resource = %created.resource_id, name = %created.name, "created device resource");
        session.resource_id = Some(created.resource_id.clone());
        Ok(created.resource_id)
    }

    // ── Capabilities ─────────────────────────────────────────────

    fn capabilities(&self, session: &Session) -> Value {
        capabilities_document(&self.inner.registry.list_feeds(), &session.blacklist)
    }

    /// Broadcast the capabilities document to every member swarm.
    async fn announce_all(&self, session: &Session) {
        let document = self.capabilities(session);
        for swarm in &session.member_swarms {
            if let Err(e) = self.inner.messaging.announce(&swarm.id, &document).await {
                warn!(swarm = %swarm.id, error = %e, "capability announcement failed");
            }
        }
    }

    // ── Event handling ───────────────────────────────────────────

    async fn handle_feed_change(&self, change: FeedChange) {
        debug!(feed = %change.name, kind = %change.kind, "re-announcing capabilities");
        let session = self.inner.session.lock().await;
        self.announce_all(&session).await;
    }

    async fn handle_protocol_event(&self, event: ProtocolEvent) {
        let peer = event.peer().map(ToString::to_string).unwrap_or_default();
        let swarm = event.swarm_id().unwrap_or_default().to_owned();

        let mut session = self.inner.session.lock().await;
        let result = match event {
            ProtocolEvent::FeedListRequest { peer, swarm_id } => {
                self.on_feed_list_request(&session, &peer, &swarm_id).await
            }
            ProtocolEvent::FeedRequest {
                peer,
                swarm_id,
                request,
            } => self.on_feed_request(&mut session, peer, swarm_id, &request),
            ProtocolEvent::MetaRequest { request, .. } => {
                self.on_meta_request(&mut session, &request).await;
                Ok(())
            }
            ProtocolEvent::Invite { peer, swarm_id } => {
                self.on_invite(&mut session, &peer, swarm_id).await
            }
            ProtocolEvent::CancelFeedRequests { peer, .. } => {
                self.on_cancel_feed_requests(&mut session, &peer).await;
                Ok(())
            }
            ProtocolEvent::Presence { .. } => {
                debug!(peer = %peer, swarm = %swarm, "peer available");
                Ok(())
            }
            ProtocolEvent::Message { payload, .. } => {
                debug!(peer = %peer, swarm = %swarm, %payload, "ignoring non-request message");
                Ok(())
            }
            ProtocolEvent::Exception { code, message } => {
                warn!(?code, %message, "messaging server reported an error");
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(peer = %peer, swarm = %swarm, error = %e, "event handling failed");
        }
    }

    async fn on_feed_list_request(
        &self,
        session: &Session,
        peer: &PeerAddress,
        swarm_id: &str,
    ) -> Result<(), CoreError> {
        let document = self.capabilities(session);
        self.inner
            .messaging
            .send_all_feeds_to_user(peer, swarm_id, &document)
            .await
    }

    fn on_feed_request(
        &self,
        session: &mut Session,
        peer: PeerAddress,
        swarm_id: String,
        request: &FeedRequest,
    ) -> Result<(), CoreError> {
        let Some(feed) = self.inner.registry.get_feed(&request.name) else {
            info!(peer = %peer, swarm = %swarm_id, feed = %request.name, "requested feed does not exist");
            return Ok(());
        };
        let scheduler = session.scheduler.as_ref().ok_or(CoreError::ShutDown)?;

        let key = TaskKey::new(peer, swarm_id, request.name.clone());
        let task: Arc<dyn ScheduledTask> = match feed {
            Feed::Structured(_) => Arc::new(StructuredFeedTask::new(
                key.clone(),
                Arc::clone(&self.inner.registry),
                Arc::clone(&self.inner.messaging),
            )),
            Feed::Binary(_) => Arc::new(BinaryFeedTask::new(
                key.clone(),
                Arc::clone(&self.inner.registry),
                Arc::clone(&self.inner.web),
            )),
        };

        match request.frequency() {
            Some(secs) if !session.active_tasks.contains_key(&key) => {
                info!(task = %key, period_secs = secs, "streaming feed");
                let handle = scheduler.schedule_fixed_rate(task, Duration::from_secs(secs));
                session.active_tasks.insert(key, handle);
            }
            Some(_) => {
                debug!(task = %key, "already streaming, answering once");
                scheduler.schedule_once(task);
            }
            None => {
                scheduler.schedule_once(task);
            }
        }
        Ok(())
    }

    async fn on_meta_request(&self, session: &mut Session, request: &FeedRequest) {
        let feed = request.name.clone();
        match request.status() {
            Some("off") => {
                session.blacklist.insert(feed.clone());
                let cancelled = session.cancel_matching(|key| key.feed == feed);
                info!(feed = %feed, cancelled, "feed disabled");
                self.announce_all(session).await;
            }
            Some(status) => {
                if session.blacklist.remove(&feed) {
                    info!(feed = %feed, %status, "feed re-enabled");
                    self.announce_all(session).await;
                }
            }
            None => {
                warn!(feed = %feed, params = ?request.params, "unrecognized meta request");
            }
        }
    }

    async fn on_invite(
        &self,
        session: &mut Session,
        peer: &PeerAddress,
        swarm_id: String,
    ) -> Result<(), CoreError> {
        if session.is_member(&swarm_id) {
            debug!(swarm = %swarm_id, from = %peer, "already a member, ignoring invite");
            return Ok(());
        }

        self.inner.messaging.join_swarm(&swarm_id).await?;
        let swarm = self.inner.web.get_swarm(&swarm_id).await?;
        info!(swarm = %swarm_id, name = %swarm.name, from = %peer, "joined swarm by invitation");
        session.member_swarms.push(swarm);

        let document = self.capabilities(session);
        self.inner.messaging.announce(&swarm_id, &document).await
    }

    /// Peer-wide: stops streams to `peer` in every swarm.
    async fn on_cancel_feed_requests(&self, session: &mut Session, peer: &PeerAddress) {
        self.inner.messaging.clear_chat_cache(peer).await;
        let cancelled = session.cancel_matching(|key| key.peer == *peer);
        if cancelled > 0 {
            info!(peer = %peer, cancelled, "cancelled feed requests");
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Serve protocol and registry events one at a time until cancelled.
async fn event_loop(
    connector: Connector,
    mut events: mpsc::UnboundedReceiver<ProtocolEvent>,
    mut changes: mpsc::UnboundedReceiver<FeedChange>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(event) = events.recv() => connector.handle_protocol_event(event).await,
            Some(change) = changes.recv() => connector.handle_feed_change(change).await,
            else => break,
        }
    }
    debug!("connector event loop exiting");
}
