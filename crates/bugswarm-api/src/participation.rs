//! Participation stream client with auto-reconnect.
//!
//! Holds one WebSocket session per device identity. Inbound stanzas are
//! parsed and forwarded, in arrival order, through an unbounded
//! [`tokio::sync::mpsc`] channel handed in by the caller. Outbound stanzas
//! are queued to the connection task, which owns the socket.
//!
//! The first connection attempt is awaited by [`ParticipationClient::connect`]
//! so authentication failures surface to the caller. After that, dropped
//! connections are retried with exponential backoff + jitter and presence
//! is re-sent for every joined swarm.
//!
//! # Example
//!
//! ```rust,ignore
//! use bugswarm_api::participation::{ParticipationClient, StreamConfig};
//! use tokio::sync::mpsc;
//!
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let client = ParticipationClient::connect(config, tx).await?;
//! client.join_swarm("5e2c...").await?;
//!
//! while let Some(stanza) = rx.recv().await {
//!     println!("{stanza:?}");
//! }
//!
//! client.disconnect().await;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, watch};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::error::Error;
use crate::stanza::{InboundStanza, OutboundMessage, OutboundStanza, PeerAddress, PresenceType};
use crate::transport::{API_KEY_HEADER, TransportConfig};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for stream reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 60s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_retries: None,
        }
    }
}

// ── StreamConfig ─────────────────────────────────────────────────────

/// Where and as whom to connect.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub url: Url,
    pub api_key: SecretString,
    pub reconnect: ReconnectConfig,
}

impl StreamConfig {
    /// Build the stream URL `{ws|wss}://{hostname}:{port}/stream?resource_id=...`.
    pub fn new(
        hostname: &str,
        port: u16,
        resource_id: &str,
        api_key: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut url = Url::parse(&format!(
            "{}://{hostname}:{port}/stream",
            transport.ws_scheme()
        ))?;
        url.query_pairs_mut().append_pair("resource_id", resource_id);
        Ok(Self {
            url,
            api_key,
            reconnect: ReconnectConfig::default(),
        })
    }
}

// ── ParticipationClient ──────────────────────────────────────────────

/// Handle to a live participation session.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct ParticipationClient {
    outbound: mpsc::UnboundedSender<OutboundStanza>,
    connected: watch::Receiver<bool>,
    joined: Arc<Mutex<HashSet<String>>>,
    chats: Mutex<HashMap<PeerAddress, String>>,
    cancel: CancellationToken,
}

impl ParticipationClient {
    /// Open the stream and spawn the connection task.
    ///
    /// Fails with [`Error::StreamConnect`] if the first attempt is refused.
    pub async fn connect(
        config: StreamConfig,
        inbound: mpsc::UnboundedSender<InboundStanza>,
    ) -> Result<Self, Error> {
        let ws = open(&config.url, &config.api_key).await?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (connected_tx, connected_rx) = watch::channel(true);
        let joined = Arc::new(Mutex::new(HashSet::new()));
        let cancel = CancellationToken::new();

        let session = Session {
            config,
            inbound,
            outbound: outbound_rx,
            connected: connected_tx,
            joined: Arc::clone(&joined),
            cancel: cancel.clone(),
        };
        tokio::spawn(session.run(ws));

        Ok(Self {
            outbound: outbound_tx,
            connected: connected_rx,
            joined,
            chats: Mutex::new(HashMap::new()),
            cancel,
        })
    }

    /// Whether the socket is currently up.
    pub fn is_connected(&self) -> bool {
        !self.cancel.is_cancelled() && *self.connected.borrow()
    }

    /// Swarms presence has been announced to.
    pub async fn joined_swarms(&self) -> Vec<String> {
        self.joined.lock().await.iter().cloned().collect()
    }

    /// Announce presence in a swarm's channel; remembered across reconnects.
    pub async fn join_swarm(&self, swarm_id: &str) -> Result<(), Error> {
        self.send(OutboundStanza::presence(swarm_id, PresenceType::Available))?;
        self.joined.lock().await.insert(swarm_id.to_owned());
        Ok(())
    }

    /// Leave a swarm's channel.
    pub async fn leave_swarm(&self, swarm_id: &str) -> Result<(), Error> {
        self.joined.lock().await.remove(swarm_id);
        self.send(OutboundStanza::presence(swarm_id, PresenceType::Unavailable))
    }

    /// Broadcast `payload` to everyone present in the swarm.
    pub fn publish(&self, swarm_id: &str, payload: serde_json::Value) -> Result<(), Error> {
        self.send(OutboundStanza::Message(OutboundMessage {
            to: swarm_id.to_owned(),
            private_to: None,
            thread: None,
            payload,
        }))
    }

    /// Send `payload` privately to one peer, reusing its chat thread.
    pub async fn send_private(
        &self,
        peer: &PeerAddress,
        swarm_id: &str,
        payload: serde_json::Value,
    ) -> Result<(), Error> {
        let thread = {
            let mut chats = self.chats.lock().await;
            chats
                .entry(peer.clone())
                .or_insert_with(|| Uuid::new_v4().to_string())
                .clone()
        };
        self.send(OutboundStanza::Message(OutboundMessage {
            to: swarm_id.to_owned(),
            private_to: Some(peer.clone()),
            thread: Some(thread),
            payload,
        }))
    }

    /// Forget the cached chat thread for `peer`. Returns whether one existed.
    pub async fn clear_chat_cache(&self, peer: &PeerAddress) -> bool {
        self.chats.lock().await.remove(peer).is_some()
    }

    /// Tear down the session. Idempotent.
    pub async fn disconnect(&self) {
        self.cancel.cancel();
        self.joined.lock().await.clear();
        self.chats.lock().await.clear();
    }

    fn send(&self, stanza: OutboundStanza) -> Result<(), Error> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        self.outbound.send(stanza).map_err(|_| Error::NotConnected)
    }
}

impl Drop for ParticipationClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background connection task ───────────────────────────────────────

struct Session {
    config: StreamConfig,
    inbound: mpsc::UnboundedSender<InboundStanza>,
    outbound: mpsc::UnboundedReceiver<OutboundStanza>,
    connected: watch::Sender<bool>,
    joined: Arc<Mutex<HashSet<String>>>,
    cancel: CancellationToken,
}

impl Session {
    /// Main loop: read/write → on drop, backoff → reconnect → replay presence.
    async fn run(mut self, first: WsStream) {
        let mut ws = Some(first);
        let mut attempt: u32 = 0;

        loop {
            if let Some(stream) = ws.take() {
                let _ = self.connected.send(true);
                attempt = 0;
                match self.pump(stream).await {
                    Ok(()) => tracing::info!("participation stream closed"),
                    Err(e) => tracing::warn!(error = %e, "participation stream error"),
                }
                let _ = self.connected.send(false);
            }

            if self.cancel.is_cancelled() {
                break;
            }

            if let Some(max) = self.config.reconnect.max_retries {
                if attempt >= max {
                    tracing::error!(
                        max_retries = max,
                        "participation reconnection limit reached, giving up"
                    );
                    break;
                }
            }

            let delay = calculate_backoff(attempt, &self.config.reconnect);
            tracing::info!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                attempt,
                "waiting before reconnect"
            );
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;

            match open(&self.config.url, &self.config.api_key).await {
                Ok(stream) => {
                    ws = Some(self.rejoin(stream).await);
                }
                Err(e) => tracing::warn!(error = %e, attempt, "reconnect failed"),
            }
        }

        let _ = self.connected.send(false);
        tracing::debug!("participation loop exiting");
    }

    /// Re-announce presence for every joined swarm on a fresh socket.
    async fn rejoin(&self, mut stream: WsStream) -> WsStream {
        let swarms: Vec<String> = self.joined.lock().await.iter().cloned().collect();
        for swarm_id in swarms {
            let stanza = OutboundStanza::presence(&swarm_id, PresenceType::Available);
            if let Err(e) = write_stanza(&mut stream, &stanza).await {
                tracing::warn!(swarm = %swarm_id, error = %e, "failed to replay presence");
            }
        }
        stream
    }

    /// Shuttle frames until the socket drops or the session is cancelled.
    async fn pump(&mut self, stream: WsStream) -> Result<(), Error> {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    // Flush what was queued before the cancel, e.g. leave presence.
                    while let Ok(stanza) = self.outbound.try_recv() {
                        if let Err(e) = write.send(encode(&stanza)?).await {
                            tracing::debug!(error = %e, "dropping queued stanzas on close");
                            break;
                        }
                    }
                    let _ = write.send(tungstenite::Message::Close(None)).await;
                    return Ok(());
                }
                outgoing = self.outbound.recv() => {
                    let Some(stanza) = outgoing else { return Ok(()) };
                    write
                        .send(encode(&stanza)?)
                        .await
                        .map_err(|e| Error::StreamConnect(e.to_string()))?;
                }
                frame = read.next() => {
                    match frame {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            parse_and_forward(&text, &self.inbound);
                        }
                        Some(Ok(tungstenite::Message::Ping(_))) => {
                            // tungstenite handles pong replies automatically
                            tracing::trace!("participation ping");
                        }
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            return match frame {
                                Some(cf) => Err(Error::StreamClosed {
                                    code: cf.code.into(),
                                    reason: cf.reason.to_string(),
                                }),
                                None => Ok(()),
                            };
                        }
                        Some(Err(e)) => return Err(Error::StreamConnect(e.to_string())),
                        None => return Ok(()),
                        _ => {}
                    }
                }
            }
        }
    }
}

// ── Single connection attempt ────────────────────────────────────────

async fn open(url: &Url, api_key: &SecretString) -> Result<WsStream, Error> {
    tracing::info!(url = %url, "connecting participation stream");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::StreamConnect(e.to_string()))?;

    let request =
        ClientRequestBuilder::new(uri).with_header(API_KEY_HEADER, api_key.expose_secret());

    let (ws, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| match e {
            tungstenite::Error::Http(resp) if resp.status().as_u16() == 401 => {
                Error::InvalidApiKey
            }
            other => Error::StreamConnect(other.to_string()),
        })?;

    tracing::info!("participation stream connected");
    Ok(ws)
}

fn encode(stanza: &OutboundStanza) -> Result<tungstenite::Message, Error> {
    serde_json::to_string(stanza)
        .map(tungstenite::Message::text)
        .map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: String::new(),
        })
}

async fn write_stanza(stream: &mut WsStream, stanza: &OutboundStanza) -> Result<(), Error> {
    stream
        .send(encode(stanza)?)
        .await
        .map_err(|e| Error::StreamConnect(e.to_string()))
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Parse a text frame and forward the stanza. Malformed frames are dropped.
fn parse_and_forward(text: &str, inbound: &mpsc::UnboundedSender<InboundStanza>) {
    match serde_json::from_str::<InboundStanza>(text) {
        Ok(stanza) => {
            // Ignore send errors -- just means the consumer has gone away
            let _ = inbound.send(stanza);
        }
        Err(e) => tracing::debug!(error = %e, "dropping unparseable stanza"),
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from many devices.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
