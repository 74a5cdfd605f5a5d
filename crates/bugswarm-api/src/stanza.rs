//! Participation stream wire types.
//!
//! Every frame is a JSON object with a single key naming the stanza kind:
//!
//! ```json
//! {"presence": {"to": "<swarm>", "type": "available"}}
//! {"message":  {"to": "<swarm>", "payload": {...}}}
//! {"message":  {"to": "<swarm>", "private_to": {"username": "u", "resource": "r"}, "thread": "...", "payload": {...}}}
//! {"invite":   {"from": {...}, "swarm": "<swarm>"}}
//! {"error":    {"code": 403, "message": "..."}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Addressing ───────────────────────────────────────────────────────

/// Identity of a remote participant: a user's resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerAddress {
    pub username: String,
    pub resource: String,
}

impl PeerAddress {
    pub fn new(username: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.username, self.resource)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceType {
    #[default]
    Available,
    Unavailable,
}

// ── Inbound ──────────────────────────────────────────────────────────

/// A stanza received from the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboundStanza {
    Presence(Presence),
    Message(Message),
    Invite(Invite),
    Error(StreamError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Presence {
    pub from: PeerAddress,
    #[serde(default)]
    pub swarm: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: PresenceType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    pub from: PeerAddress,
    #[serde(default)]
    pub swarm: Option<String>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub thread: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Invite {
    pub from: PeerAddress,
    pub swarm: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamError {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
}

// ── Outbound ─────────────────────────────────────────────────────────

/// A stanza sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundStanza {
    Presence(OutboundPresence),
    Message(OutboundMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundPresence {
    pub to: String,
    #[serde(rename = "type")]
    pub kind: PresenceType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_to: Option<PeerAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
    pub payload: serde_json::Value,
}

impl OutboundStanza {
    pub fn presence(swarm_id: &str, kind: PresenceType) -> Self {
        Self::Presence(OutboundPresence {
            to: swarm_id.to_owned(),
            kind,
        })
    }
}
