// ── Web-service contract ──
//
// The subset of the REST API the connector depends on. Implemented for
// `bugswarm_api::BugswarmClient`; tests substitute an in-memory fake.

use async_trait::async_trait;
use bytes::Bytes;

use bugswarm_api::{BugswarmClient, SwarmModel, UserResourceModel};

use crate::error::CoreError;

#[async_trait]
pub trait WebService: Send + Sync {
    /// Swarms `resource_id` belongs to. Fails with `NotFound` when there
    /// are none.
    async fn list_member_swarms(&self, resource_id: &str) -> Result<Vec<SwarmModel>, CoreError>;

    async fn get_swarm(&self, swarm_id: &str) -> Result<SwarmModel, CoreError>;

    async fn get_resource(&self, resource_id: &str)
    -> Result<Option<UserResourceModel>, CoreError>;

    async fn create_resource(
        &self,
        name: &str,
        description: &str,
        machine_type: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<UserResourceModel, CoreError>;

    async fn upload_binary(
        &self,
        username: &str,
        resource: &str,
        feed: &str,
        payload: Bytes,
    ) -> Result<(), CoreError>;
}

#[async_trait]
impl WebService for BugswarmClient {
    async fn list_member_swarms(&self, resource_id: &str) -> Result<Vec<SwarmModel>, CoreError> {
        Ok(BugswarmClient::list_member_swarms(self, resource_id).await?)
    }

    async fn get_swarm(&self, swarm_id: &str) -> Result<SwarmModel, CoreError> {
        Ok(BugswarmClient::get_swarm(self, swarm_id).await?)
    }

    async fn get_resource(
        &self,
        resource_id: &str,
    ) -> Result<Option<UserResourceModel>, CoreError> {
        Ok(BugswarmClient::get_resource(self, resource_id).await?)
    }

    async fn create_resource(
        &self,
        name: &str,
        description: &str,
        machine_type: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<UserResourceModel, CoreError> {
        Ok(BugswarmClient::create_resource(
            self,
            name,
            description,
            machine_type,
            latitude,
            longitude,
        )
        .await?)
    }

    async fn upload_binary(
        &self,
        username: &str,
        resource: &str,
        feed: &str,
        payload: Bytes,
    ) -> Result<(), CoreError> {
        Ok(BugswarmClient::upload_binary(self, username, resource, feed, payload).await?)
    }
}
