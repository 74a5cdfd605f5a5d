// Swarm endpoints
//
// CRUD on swarms plus membership management under `/swarms/{id}/resources`.

use tracing::debug;

use crate::client::BugswarmClient;
use crate::error::Error;
use crate::models::{
    MemberType, SwarmModel, SwarmRequest, SwarmResourceModel, SwarmResourceRequest,
};

impl BugswarmClient {
    /// List every swarm visible to the API key's owner.
    ///
    /// `GET /swarms`
    pub async fn list_swarms(&self) -> Result<Vec<SwarmModel>, Error> {
        debug!("listing swarms");
        self.get("swarms").await
    }

    /// `GET /swarms/{id}`
    pub async fn get_swarm(&self, swarm_id: &str) -> Result<SwarmModel, Error> {
        self.get(&format!("swarms/{swarm_id}")).await
    }

    /// `POST /swarms`
    pub async fn create_swarm(
        &self,
        name: &str,
        description: Option<&str>,
        is_public: bool,
    ) -> Result<SwarmModel, Error> {
        let body = SwarmRequest {
            name: Some(name.to_owned()),
            description: description.map(str::to_owned),
            is_public: Some(is_public),
        };
        self.post("swarms", &body).await
    }

    /// `PUT /swarms/{id}` -- only the fields set in `update` change.
    pub async fn update_swarm(
        &self,
        swarm_id: &str,
        update: &SwarmRequest,
    ) -> Result<SwarmModel, Error> {
        self.put(&format!("swarms/{swarm_id}"), update).await
    }

    /// `DELETE /swarms/{id}`
    pub async fn delete_swarm(&self, swarm_id: &str) -> Result<(), Error> {
        self.delete(&format!("swarms/{swarm_id}")).await
    }

    // ── Membership ───────────────────────────────────────────────────

    /// `GET /swarms/{id}/resources[?type=producer|consumer]`
    pub async fn list_swarm_resources(
        &self,
        swarm_id: &str,
        member_type: Option<MemberType>,
    ) -> Result<Vec<SwarmResourceModel>, Error> {
        let path = format!("swarms/{swarm_id}/resources");
        match member_type {
            Some(kind) => {
                self.get_with_params(&path, &[("type", kind.to_string())])
                    .await
            }
            None => self.get(&path).await,
        }
    }

    /// `POST /swarms/{id}/resources`
    pub async fn add_swarm_resource(
        &self,
        swarm_id: &str,
        resource_id: &str,
        member_type: MemberType,
    ) -> Result<(), Error> {
        let body = SwarmResourceRequest {
            resource_id,
            resource_type: member_type,
        };
        self.post_no_response(&format!("swarms/{swarm_id}/resources"), &body)
            .await
    }

    /// `DELETE /swarms/{id}/resources`
    pub async fn remove_swarm_resource(
        &self,
        swarm_id: &str,
        resource_id: &str,
        member_type: MemberType,
    ) -> Result<(), Error> {
        let body = SwarmResourceRequest {
            resource_id,
            resource_type: member_type,
        };
        self.delete_with_body(&format!("swarms/{swarm_id}/resources"), &body)
            .await
    }
}
