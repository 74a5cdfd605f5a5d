// API key endpoints
//
// Keys are managed with the account's username and password (HTTP basic
// auth) rather than an existing key, so these calls use a separate
// anonymous client.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::BugswarmClient;
use crate::error::Error;
use crate::models::{ApiKey, KeyType};

impl BugswarmClient {
    /// `GET /keys`
    pub async fn list_keys(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Vec<ApiKey>, Error> {
        let url = self.url("keys")?;
        debug!("GET {url}");

        let http = self.transport().build_anonymous_client()?;
        let resp = http
            .get(url)
            .basic_auth(username, Some(password.expose_secret()))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    /// `POST /keys[/{type}]` -- returns the newly issued key.
    pub async fn create_key(
        &self,
        username: &str,
        password: &SecretString,
        key_type: KeyType,
    ) -> Result<ApiKey, Error> {
        let url = self.url(&format!("keys/{key_type}"))?;
        debug!("POST {url}");

        let http = self.transport().build_anonymous_client()?;
        let resp = http
            .post(url)
            .basic_auth(username, Some(password.expose_secret()))
            .send()
            .await?;
        self.handle_response(resp).await
    }
}
