// bugswarm-core: Device connector between local feeds and BUGswarm swarms.

pub mod capabilities;
pub mod config;
pub mod connector;
pub mod error;
pub mod event;
pub mod feed;
pub mod messaging;
pub mod registry;
pub mod request;
pub mod scheduler;
pub mod store;
pub mod task;
pub mod web;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ConnectorConfig;
pub use connector::{Connector, ConnectorState};
pub use error::CoreError;
pub use event::{PeerAddress, ProtocolEvent, TaskKey};
pub use feed::{
    BinaryFeed, BinaryReader, BinarySource, BytesSource, Feed, FileSource, StructuredFeed, ValueMap,
    ValueSource,
};
pub use messaging::{Messaging, StreamMessaging};
pub use registry::{FeedChange, FeedChangeKind, FeedRegistry, InMemoryFeedRegistry};
pub use request::{FeedRequest, RequestType};
pub use scheduler::{ScheduledTask, TaskHandle, TaskScheduler};
pub use store::{MemoryResourceStore, ResourceStore};
pub use web::WebService;

// Models the connector hands back to callers.
pub use bugswarm_api::{SwarmModel, UserResourceModel};
