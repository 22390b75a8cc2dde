//! Common utilities for the gridscale API client
//!
//! Provides shared request plumbing used by every API call: authentication
//! headers, envelope handling and status classification.

use crate::error::GridscaleError;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// HTTP client wrapper with authentication
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    user_uuid: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, user_uuid: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_uuid,
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("X-Auth-UserId", &self.user_uuid)
            .header("X-Auth-Token", &self.token)
            .header("Accept", "application/json")
    }

    /// Turn a non-success response into a classified error
    async fn check_status(path: &str, method: &str, response: Response) -> Result<Response, GridscaleError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GridscaleError::from_status(
            status.as_u16(),
            format!("{} {} failed: {} - {}", method, path, status, body),
        ))
    }

    /// Make a GET request and decode the response body as is
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GridscaleError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self.authorized(self.client.get(&url)).send().await?;
        let response = Self::check_status(path, "GET", response).await?;
        response.json().await.map_err(GridscaleError::Http)
    }

    /// GET an object and strip its single-key envelope (`{"server": {...}}`)
    pub async fn get_object<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<T, GridscaleError> {
        let mut envelope: serde_json::Value = self.get(path).await?;
        let object = envelope
            .get_mut(key)
            .map(serde_json::Value::take)
            .ok_or_else(|| GridscaleError::InvalidRequest(format!("GET {} response has no '{}' field", path, key)))?;
        Ok(serde_json::from_value(object)?)
    }

    /// GET a collection; the API returns it as a map keyed by object UUID
    pub async fn get_list<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<Vec<T>, GridscaleError> {
        let objects: serde_json::Map<String, serde_json::Value> = self.get_object(path, key).await?;
        objects
            .into_iter()
            .map(|(_, value)| serde_json::from_value(value).map_err(GridscaleError::Serialization))
            .collect()
    }

    /// Make a POST request and decode the response body
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GridscaleError> {
        let url = self.build_url(path);
        debug!("POST {} with body: {}", url, serde_json::to_string(body).unwrap_or_default());

        let response = self.authorized(self.client.post(&url)).json(body).send().await?;
        let response = Self::check_status(path, "POST", response).await?;
        response.json().await.map_err(GridscaleError::Http)
    }

    /// Make a POST request whose response body is irrelevant (relation links)
    pub async fn post_no_content<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), GridscaleError> {
        let url = self.build_url(path);
        debug!("POST {} with body: {}", url, serde_json::to_string(body).unwrap_or_default());

        let response = self.authorized(self.client.post(&url)).json(body).send().await?;
        Self::check_status(path, "POST", response).await?;
        Ok(())
    }

    /// Make a PATCH request
    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), GridscaleError> {
        let url = self.build_url(path);
        debug!("PATCH {} with body: {}", url, serde_json::to_string(body).unwrap_or_default());

        let response = self.authorized(self.client.patch(&url)).json(body).send().await?;
        Self::check_status(path, "PATCH", response).await?;
        Ok(())
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), GridscaleError> {
        let url = self.build_url(path);
        debug!("DELETE {}", url);

        let response = self.authorized(self.client.delete(&url)).send().await?;
        Self::check_status(path, "DELETE", response).await?;
        Ok(())
    }
}

/// Percent-encode a single path segment (object UUIDs come from user input)
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_trims_trailing_slash() {
        let http = HttpClient::new(
            Client::new(),
            "https://api.gridscale.io/".to_string(),
            "user".to_string(),
            "token".to_string(),
        );
        assert_eq!(http.base_url(), "https://api.gridscale.io");
        assert_eq!(
            http.build_url("/objects/servers"),
            "https://api.gridscale.io/objects/servers"
        );
        assert_eq!(http.build_url("https://other/x"), "https://other/x");
    }

    #[test]
    fn test_segment_encodes_reserved_characters() {
        assert_eq!(segment("abc-123"), "abc-123");
        assert_eq!(segment("a/b"), "a%2Fb");
    }
}
