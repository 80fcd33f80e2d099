use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use super::{NewUser, UserApi, UserId, UserRecord};
use crate::error::ApiError;

/// `reqwest`-backed adapter for a `/users` REST resource.
///
/// Paths are appended to whatever path the base URL already has, so both
/// `https://host` and `https://host/api/` work.
#[derive(Clone, Debug)]
pub struct HttpUserApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpUserApi {
    pub fn new(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    /// Build a client with a per-request timeout.
    pub fn with_timeout(base: Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client, base))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn users_url(&self, id: Option<&UserId>) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        {
            let mut segs = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidBaseUrl(self.base.to_string()))?;
            segs.pop_if_empty().push("users");
            if let Some(id) = id {
                segs.push(&id.to_string());
            }
        }
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url, body: Option<&serde_json::Value>) -> Result<Response, ApiError> {
        let mut req = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().await?;
        let status = response.status();
        tracing::debug!(%method, %url, %status, "user service responded");
        if !status.is_success() {
            return Err(ApiError::Status {
                method,
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<T, ApiError> {
        let response = self.send(method, url, body).await?;
        Ok(response.json::<T>().await?)
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::other(format!("encode request body: {e}")))
}

#[async_trait]
impl UserApi for HttpUserApi {
    #[instrument(name = "users.list", skip_all, fields(base = %self.base))]
    async fn list_all(&self) -> Result<Vec<UserRecord>, ApiError> {
        let url = self.users_url(None)?;
        self.send_json(Method::GET, url, None).await
    }

    #[instrument(name = "users.create", skip_all, fields(base = %self.base))]
    async fn create(&self, user: &NewUser) -> Result<UserRecord, ApiError> {
        let url = self.users_url(None)?;
        let body = to_body(user)?;
        self.send_json(Method::POST, url, Some(&body)).await
    }

    #[instrument(name = "users.update", skip_all, fields(base = %self.base, user_id = %id))]
    async fn update(&self, id: &UserId, user: &UserRecord) -> Result<UserRecord, ApiError> {
        let url = self.users_url(Some(id))?;
        let body = to_body(user)?;
        self.send_json(Method::PUT, url, Some(&body)).await
    }

    #[instrument(name = "users.delete", skip_all, fields(base = %self.base, user_id = %id))]
    async fn delete(&self, id: &UserId) -> Result<(), ApiError> {
        let url = self.users_url(Some(id))?;
        // Body ignored; any 2xx counts.
        self.send(Method::DELETE, url, None).await.map(drop)
    }
}
