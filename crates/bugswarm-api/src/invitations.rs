// Invitation endpoints
//
// Invitations are sent per swarm and received per resource. Answering one
// is a one-shot transition out of `new`.

use crate::client::BugswarmClient;
use crate::error::Error;
use crate::models::{Invitation, InvitationRequest, InvitationResponse, InvitationStatus};

impl BugswarmClient {
    /// `POST /swarms/{id}/invitations`
    pub async fn send_invitation(
        &self,
        swarm_id: &str,
        request: &InvitationRequest,
    ) -> Result<Invitation, Error> {
        self.post(&format!("swarms/{swarm_id}/invitations"), request)
            .await
    }

    /// `GET /swarms/{id}/invitations`
    pub async fn list_sent_invitations(&self, swarm_id: &str) -> Result<Vec<Invitation>, Error> {
        self.get(&format!("swarms/{swarm_id}/invitations")).await
    }

    /// `GET /resources/{id}/invitations`
    pub async fn list_received_invitations(
        &self,
        resource_id: &str,
    ) -> Result<Vec<Invitation>, Error> {
        self.get(&format!("resources/{resource_id}/invitations"))
            .await
    }

    /// Accept or reject an invitation.
    ///
    /// `PUT /resources/{id}/invitations/{invitation}`. Fails locally with
    /// [`Error::InvitationClosed`] if the invitation was already answered.
    pub async fn respond_to_invitation(
        &self,
        invitation: &Invitation,
        accept: bool,
    ) -> Result<(), Error> {
        if invitation.status.is_terminal() {
            return Err(Error::InvitationClosed {
                id: invitation.id.clone(),
                status: invitation.status.to_string(),
            });
        }

        let status = if accept {
            InvitationStatus::Accepted
        } else {
            InvitationStatus::Rejected
        };
        let path = format!(
            "resources/{}/invitations/{}",
            invitation.resource_id, invitation.id
        );
        self.put_no_response(&path, &InvitationResponse { status })
            .await
    }
}
