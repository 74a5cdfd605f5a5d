// REST API response and request types
//
// Models for the BUGswarm configuration API. Fields use `#[serde(default)]`
// liberally because optional attributes are omitted rather than nulled.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── Member type ──────────────────────────────────────────────────────

/// Role of a resource inside a swarm.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MemberType {
    /// Publishes data into the swarm.
    Producer,
    /// Receives data from the swarm.
    Consumer,
}

// ── Swarm ────────────────────────────────────────────────────────────

/// A swarm as returned by `GET /swarms/{id}`.
///
/// Identity is the `id` alone: two models with the same id compare equal
/// even if one of them carries stale attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmModel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "public")]
    pub is_public: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "user_id")]
    pub owner_user_id: Option<String>,
    #[serde(default, rename = "resources")]
    pub members: Vec<SwarmResourceModel>,
}

impl PartialEq for SwarmModel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SwarmModel {}

impl Hash for SwarmModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One resource's membership in one swarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmResourceModel {
    #[serde(default)]
    pub swarm_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub resource_id: String,
    #[serde(rename = "resource_type")]
    pub member_type: MemberType,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body for `POST /swarms` and `PUT /swarms/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SwarmRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "public", skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

/// Body for adding or removing a swarm member.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SwarmResourceRequest<'a> {
    pub resource_id: &'a str,
    pub resource_type: MemberType,
}

// ── Resource ─────────────────────────────────────────────────────────

/// Geographic position of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// A device or process identity owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResourceModel {
    #[serde(rename = "id")]
    pub resource_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub machine_type: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
}

/// Body for `POST /resources` and `PUT /resources/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

// ── Invitation ───────────────────────────────────────────────────────

/// Invitation lifecycle: created `New`, answered exactly once.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InvitationStatus {
    New,
    Accepted,
    Rejected,
}

impl InvitationStatus {
    /// `Accepted` and `Rejected` are terminal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::New)
    }
}

/// An invitation for a resource to join a swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    #[serde(rename = "from")]
    pub from_user: String,
    #[serde(rename = "to")]
    pub to_user: String,
    pub resource_id: String,
    #[serde(default)]
    pub swarm_id: Option<String>,
    #[serde(rename = "resource_type")]
    pub member_type: MemberType,
    #[serde(default)]
    pub description: Option<String>,
    pub status: InvitationStatus,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
}

/// Body for `POST /swarms/{id}/invitations`.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationRequest {
    pub to: String,
    pub resource_id: String,
    pub resource_type: MemberType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct InvitationResponse {
    pub status: InvitationStatus,
}

// ── API keys ─────────────────────────────────────────────────────────

/// Which API an API key grants access to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum KeyType {
    /// REST configuration API.
    Configuration,
    /// Participation stream.
    Participation,
}

/// An API key owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub key: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;

    #[test]
    fn swarm_identity_is_id_only() {
        let fresh: SwarmModel = serde_json::from_value(json!({
            "id": "s1",
            "name": "Kitchen",
            "public": true,
            "resources": [{ "resource_id": "r1", "resource_type": "producer" }]
        }))
        .unwrap();
        let stale: SwarmModel = serde_json::from_value(json!({
            "id": "s1",
            "name": "Old name",
            "public": false
        }))
        .unwrap();
        let other: SwarmModel = serde_json::from_value(json!({
            "id": "s2",
            "name": "Kitchen",
            "public": true
        }))
        .unwrap();

        assert_eq!(fresh, stale);
        assert_ne!(fresh, other);

        let set: HashSet<SwarmModel> = [fresh, stale, other].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn deserialize_swarm_with_members() {
        let swarm: SwarmModel = serde_json::from_value(json!({
            "id": "5e2c",
            "name": "Lab",
            "description": "sensors",
            "public": false,
            "created_at": "2012-05-01T10:00:00Z",
            "user_id": "alice",
            "resources": [
                { "swarm_id": "5e2c", "user_id": "alice", "resource_id": "r1", "resource_type": "producer" },
                { "swarm_id": "5e2c", "user_id": "bob", "resource_id": "r2", "resource_type": "consumer" }
            ]
        }))
        .unwrap();

        assert_eq!(swarm.owner_user_id.as_deref(), Some("alice"));
        assert_eq!(swarm.members.len(), 2);
        assert_eq!(swarm.members[1].member_type, MemberType::Consumer);
        assert!(swarm.created_at.is_some());
    }

    #[test]
    fn member_type_parses_case_insensitively() {
        assert_eq!("PRODUCER".parse::<MemberType>().unwrap(), MemberType::Producer);
        assert_eq!(MemberType::Consumer.to_string(), "consumer");
    }

    #[test]
    fn invitation_terminal_states() {
        assert!(!InvitationStatus::New.is_terminal());
        assert!(InvitationStatus::Accepted.is_terminal());
        assert!(InvitationStatus::Rejected.is_terminal());
    }
}
