// ── Protocol events ──
//
// Everything the messaging layer delivers to the connector, as one tagged
// type. Raw stream stanzas are classified here.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use bugswarm_api::stanza::{InboundStanza, PresenceType};
pub use bugswarm_api::PeerAddress;

use crate::request::FeedRequest;

/// Identity of one streaming subscription: who asked, where, for what.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub peer: PeerAddress,
    pub swarm_id: String,
    pub feed: String,
}

impl TaskKey {
    pub fn new(peer: PeerAddress, swarm_id: impl Into<String>, feed: impl Into<String>) -> Self {
        Self {
            peer,
            swarm_id: swarm_id.into(),
            feed: feed.into(),
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.peer, self.swarm_id, self.feed)
    }
}

/// An inbound event for the connector.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    /// Peer wants the capabilities document.
    FeedListRequest { peer: PeerAddress, swarm_id: String },
    /// Peer wants a feed, once or streamed.
    FeedRequest {
        peer: PeerAddress,
        swarm_id: String,
        request: FeedRequest,
    },
    /// Peer toggles a feed on or off.
    MetaRequest {
        peer: PeerAddress,
        swarm_id: String,
        request: FeedRequest,
    },
    /// Device was invited into a swarm.
    Invite { peer: PeerAddress, swarm_id: String },
    /// Peer went away; stop everything streaming to it.
    CancelFeedRequests { peer: PeerAddress, swarm_id: String },
    /// Peer became available.
    Presence {
        peer: PeerAddress,
        swarm_id: Option<String>,
    },
    /// Message that is not a feed request.
    Message {
        peer: PeerAddress,
        swarm_id: Option<String>,
        payload: Value,
    },
    /// Error reported by the server.
    Exception { code: Option<u16>, message: String },
}

impl ProtocolEvent {
    /// Classify a stream stanza. Returns `None` for payloads that look like
    /// feed requests but fail to parse; those are dropped.
    pub fn from_stanza(stanza: InboundStanza) -> Option<Self> {
        let event = match stanza {
            InboundStanza::Presence(p) => match p.kind {
                PresenceType::Unavailable => Self::CancelFeedRequests {
                    peer: p.from,
                    swarm_id: p.swarm.unwrap_or_default(),
                },
                PresenceType::Available => Self::Presence {
                    peer: p.from,
                    swarm_id: p.swarm,
                },
            },
            InboundStanza::Invite(inv) => Self::Invite {
                peer: inv.from,
                swarm_id: inv.swarm,
            },
            InboundStanza::Error(err) => Self::Exception {
                code: err.code,
                message: err.message,
            },
            InboundStanza::Message(msg) => {
                if !looks_like_request(&msg.payload) {
                    return Some(Self::Message {
                        peer: msg.from,
                        swarm_id: msg.swarm,
                        payload: msg.payload,
                    });
                }

                let request = match FeedRequest::parse(&msg.payload) {
                    Ok(request) => request,
                    Err(e) => {
                        debug!(peer = %msg.from, error = %e, "dropping malformed feed request");
                        return None;
                    }
                };

                let peer = msg.from;
                let swarm_id = msg.swarm.unwrap_or_default();
                if request.is_feed_list_request() {
                    Self::FeedListRequest { peer, swarm_id }
                } else if request.is_feed_meta_request() {
                    Self::MetaRequest {
                        peer,
                        swarm_id,
                        request,
                    }
                } else if request.is_feed_request() {
                    Self::FeedRequest {
                        peer,
                        swarm_id,
                        request,
                    }
                } else {
                    Self::Message {
                        peer,
                        swarm_id: Some(swarm_id),
                        payload: msg.payload,
                    }
                }
            }
        };
        Some(event)
    }
}

impl ProtocolEvent {
    /// Peer the event came from, if any.
    pub fn peer(&self) -> Option<&PeerAddress> {
        match self {
            Self::FeedListRequest { peer, .. }
            | Self::FeedRequest { peer, .. }
            | Self::MetaRequest { peer, .. }
            | Self::Invite { peer, .. }
            | Self::CancelFeedRequests { peer, .. }
            | Self::Presence { peer, .. }
            | Self::Message { peer, .. } => Some(peer),
            Self::Exception { .. } => None,
        }
    }

    /// Swarm the event relates to, if any.
    pub fn swarm_id(&self) -> Option<&str> {
        match self {
            Self::FeedListRequest { swarm_id, .. }
            | Self::FeedRequest { swarm_id, .. }
            | Self::MetaRequest { swarm_id, .. }
            | Self::Invite { swarm_id, .. }
            | Self::CancelFeedRequests { swarm_id, .. } => Some(swarm_id),
            Self::Presence { swarm_id, .. } | Self::Message { swarm_id, .. } => {
                swarm_id.as_deref()
            }
            Self::Exception { .. } => None,
        }
    }
}

fn looks_like_request(payload: &Value) -> bool {
    payload
        .as_object()
        .is_some_and(|obj| obj.contains_key("type") && obj.contains_key("feed"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn stanza(raw: Value) -> InboundStanza {
        serde_json::from_value(raw).unwrap()
    }

    fn message(payload: Value) -> InboundStanza {
        stanza(json!({
            "message": {
                "from": { "username": "alice", "resource": "phone" },
                "swarm": "sw-1",
                "payload": payload
            }
        }))
    }

    #[test]
    fn feed_request_is_classified() {
        let event =
            ProtocolEvent::from_stanza(message(json!({ "type": "get", "feed": "temp" }))).unwrap();
        assert!(matches!(
            event,
            ProtocolEvent::FeedRequest { ref swarm_id, ref request, .. }
                if swarm_id == "sw-1" && request.name == "temp"
        ));
    }

    #[test]
    fn feed_list_and_meta_requests_are_classified() {
        let list =
            ProtocolEvent::from_stanza(message(json!({ "type": "get", "feed": "feeds" }))).unwrap();
        assert!(matches!(list, ProtocolEvent::FeedListRequest { .. }));

        let meta = ProtocolEvent::from_stanza(message(
            json!({ "type": "put", "feed": "temp", "params": { "status": "off" } }),
        ))
        .unwrap();
        assert!(matches!(meta, ProtocolEvent::MetaRequest { .. }));
    }

    #[test]
    fn malformed_request_is_dropped() {
        assert!(
            ProtocolEvent::from_stanza(message(json!({ "type": "bogus", "feed": "temp" })))
                .is_none()
        );
    }

    #[test]
    fn chatter_becomes_plain_message() {
        let event = ProtocolEvent::from_stanza(message(json!({ "text": "hi" }))).unwrap();
        assert!(matches!(event, ProtocolEvent::Message { .. }));
    }

    #[test]
    fn unavailable_presence_cancels() {
        let event = ProtocolEvent::from_stanza(stanza(json!({
            "presence": {
                "from": { "username": "bob", "resource": "pi" },
                "swarm": "sw-2",
                "type": "unavailable"
            }
        })))
        .unwrap();
        assert_eq!(
            event,
            ProtocolEvent::CancelFeedRequests {
                peer: PeerAddress::new("bob", "pi"),
                swarm_id: "sw-2".into(),
            }
        );
    }

    #[test]
    fn invite_and_error_map_through() {
        let invite = ProtocolEvent::from_stanza(stanza(json!({
            "invite": { "from": { "username": "bob", "resource": "pi" }, "swarm": "sw-3" }
        })))
        .unwrap();
        assert!(matches!(invite, ProtocolEvent::Invite { ref swarm_id, .. } if swarm_id == "sw-3"));

        let error = ProtocolEvent::from_stanza(stanza(json!({
            "error": { "code": 403, "message": "forbidden" }
        })))
        .unwrap();
        assert!(matches!(error, ProtocolEvent::Exception { code: Some(403), .. }));
    }

    #[test]
    fn task_key_display() {
        let key = TaskKey::new(PeerAddress::new("u", "r"), "sw", "temp");
        assert_eq!(key.to_string(), "u/r@sw:temp");
    }
}
