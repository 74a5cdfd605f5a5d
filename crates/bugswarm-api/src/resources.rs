// Resource endpoints
//
// A resource is one device identity owned by the API key's user. Also hosts
// the binary upload endpoint, which is keyed by user/resource/feed.

use bytes::Bytes;
use tracing::debug;

use crate::client::BugswarmClient;
use crate::error::Error;
use crate::models::{Position, ResourceRequest, SwarmModel, UserResourceModel};

impl BugswarmClient {
    /// `GET /resources`
    pub async fn list_resources(&self) -> Result<Vec<UserResourceModel>, Error> {
        debug!("listing resources");
        self.get("resources").await
    }

    /// `GET /resources/{id}`, with "not found" folded into `None`.
    pub async fn get_resource(&self, resource_id: &str) -> Result<Option<UserResourceModel>, Error> {
        match self.get(&format!("resources/{resource_id}")).await {
            Ok(resource) => Ok(Some(resource)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// `POST /resources`
    pub async fn create_resource(
        &self,
        name: &str,
        description: &str,
        machine_type: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<UserResourceModel, Error> {
        let body = ResourceRequest {
            name: Some(name.to_owned()),
            description: Some(description.to_owned()),
            machine_type: Some(machine_type.to_owned()),
            position: Some(Position {
                latitude,
                longitude,
            }),
        };
        self.post("resources", &body).await
    }

    /// `PUT /resources/{id}`
    pub async fn update_resource(
        &self,
        resource_id: &str,
        update: &ResourceRequest,
    ) -> Result<UserResourceModel, Error> {
        self.put(&format!("resources/{resource_id}"), update).await
    }

    /// `DELETE /resources/{id}`
    pub async fn delete_resource(&self, resource_id: &str) -> Result<(), Error> {
        self.delete(&format!("resources/{resource_id}")).await
    }

    /// Swarms the resource is a member of.
    ///
    /// `GET /resources/{id}/swarms` -- the server answers 404 when there are
    /// no memberships, which surfaces as [`Error::NotFound`].
    pub async fn list_member_swarms(&self, resource_id: &str) -> Result<Vec<SwarmModel>, Error> {
        self.get(&format!("resources/{resource_id}/swarms")).await
    }

    /// Upload a binary feed payload.
    ///
    /// `PUT /upload/{username}/{resource}/{feed}` with an octet-stream body.
    pub async fn upload_binary(
        &self,
        username: &str,
        resource: &str,
        feed: &str,
        payload: Bytes,
    ) -> Result<(), Error> {
        self.put_bytes(&format!("upload/{username}/{resource}/{feed}"), payload)
            .await
    }
}
