// bugswarm-api: Async Rust client for the BUGswarm REST and participation APIs

pub mod client;
pub mod error;
pub mod invitations;
pub mod keys;
pub mod models;
pub mod participation;
pub mod resources;
pub mod stanza;
pub mod swarms;
pub mod transport;

pub use client::BugswarmClient;
pub use error::Error;
pub use models::{
    ApiKey, Invitation, InvitationRequest, InvitationStatus, KeyType, MemberType, Position,
    ResourceRequest, SwarmModel, SwarmRequest, SwarmResourceModel, UserResourceModel,
};
pub use participation::{ParticipationClient, ReconnectConfig, StreamConfig};
pub use stanza::{InboundStanza, PeerAddress, PresenceType};
pub use transport::TransportConfig;
