/*
[INPUT]:  Authenticated request (method, endpoint, optional JSON body)
[OUTPUT]: Decoded response, retried once after a token refresh on 401
[POS]:    HTTP layer - bearer-token decorator over ContribClient
[UPDATE]: When retry policy or authorization scheme changes
*/

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::SessionAuthenticator;
use crate::http::{ContribClient, ContribError, Result};

/// Client for endpoints that require `Authorization: Bearer <access_token>`.
///
/// An unauthorized response triggers one refresh through the authenticator
/// and one retry. Concurrent 401s share a single refresh.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    client: ContribClient,
    authenticator: SessionAuthenticator,
}

impl AuthorizedClient {
    pub fn new(client: ContribClient, authenticator: SessionAuthenticator) -> Self {
        Self {
            client,
            authenticator,
        }
    }

    pub fn client(&self) -> &ContribClient {
        &self.client
    }

    pub fn authenticator(&self) -> &SessionAuthenticator {
        &self.authenticator
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.send::<T, ()>(Method::GET, endpoint, None).await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        self.send(Method::POST, endpoint, Some(body)).await
    }

    /// Send with the current access token; on 401 refresh and retry once
    pub async fn send<T, B>(&self, method: Method, endpoint: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let session = self.authenticator.usable_session().await?;

        match self
            .send_with_token(method.clone(), endpoint, body, &session.access_token)
            .await
        {
            Err(ContribError::Unauthorized { .. }) => {
                debug!(endpoint, "request unauthorized; refreshing access token");
                let refreshed = self
                    .authenticator
                    .refresh_after_unauthorized(&session.access_token)
                    .await?;
                match self
                    .send_with_token(method, endpoint, body, &refreshed.access_token)
                    .await
                {
                    Err(ContribError::Unauthorized { message }) => {
                        Err(ContribError::AuthenticationFailed { message })
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn send_with_token<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        access_token: &str,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let mut builder = self
            .client
            .request(method, endpoint)?
            .bearer_auth(access_token);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.client.send_json(builder).await
    }
}
