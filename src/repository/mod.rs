//! Outbound clients for legal-document repositories.
//!
//! A fetch never fails from the caller's point of view: transport, status and
//! body problems are logged and turn into an empty candidate list.

mod mapping;
mod types;

pub use types::{ApiKey, HttpMethod, RawCandidate, RepositoryEndpoint};

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, warn};

use mapping::extract_candidates;

const MAX_RESPONSE_BYTES: usize = 10_000_000;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unauthorized: check the repository API key")]
    Unauthorized,

    #[error("request failed: status {0}")]
    Status(u16),

    #[error("response too large (>{} bytes)", MAX_RESPONSE_BYTES)]
    TooLarge,

    #[error("malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("response has no results array at '{0}'")]
    MissingResults(String),

    #[error("invalid header '{0}' in request template")]
    InvalidHeader(String),
}

/// Source of raw candidates for a query.
/// Implemented by `HttpRepositoryClient` for production; stub implementations used in tests.
pub trait RepositoryClient: Send + Sync + 'static {
    fn fetch(
        &self,
        endpoint: &RepositoryEndpoint,
        query: &str,
    ) -> impl Future<Output = Vec<RawCandidate>> + Send;
}

#[derive(Clone)]
pub struct HttpRepositoryClient {
    http: Client,
    timeout: Duration,
}

impl HttpRepositoryClient {
    pub fn new(http: Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    pub async fn try_fetch(
        &self,
        endpoint: &RepositoryEndpoint,
        query: &str,
    ) -> Result<Vec<RawCandidate>, FetchError> {
        let response = self.request(endpoint, query)?.send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length()
            && len as usize > MAX_RESPONSE_BYTES
        {
            return Err(FetchError::TooLarge);
        }

        let mut body = Vec::new();
        let mut stream = response;
        while let Some(chunk) = stream.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() > MAX_RESPONSE_BYTES {
                return Err(FetchError::TooLarge);
            }
        }

        let value: serde_json::Value = serde_json::from_slice(&body)?;
        extract_candidates(&endpoint.name, &endpoint.fields, &value)
    }

    fn request(
        &self,
        endpoint: &RepositoryEndpoint,
        query: &str,
    ) -> Result<RequestBuilder, FetchError> {
        let template = &endpoint.request;

        let mut req = match template.method {
            HttpMethod::Get => {
                let mut url = endpoint.address.clone();
                {
                    let mut pairs = url.query_pairs_mut();
                    pairs.append_pair(&template.query_param, query);
                    for (key, value) in &template.params {
                        pairs.append_pair(key, value);
                    }
                }
                self.http.get(url)
            }
            HttpMethod::Post => {
                let mut body: serde_json::Map<String, serde_json::Value> = template
                    .params
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect();
                body.insert(
                    template.query_param.clone(),
                    serde_json::Value::String(query.to_string()),
                );
                self.http.post(endpoint.address.clone()).json(&body)
            }
        };

        req = req
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, crate::USER_AGENT)
            .headers(template.header_map()?);
        if let (Some(auth), Some(key)) = (&template.auth, &endpoint.credential) {
            req = req.header(AUTHORIZATION, format!("{} {}", auth.scheme, key.expose()));
        }

        Ok(req.timeout(self.timeout))
    }
}

impl RepositoryClient for HttpRepositoryClient {
    async fn fetch(&self, endpoint: &RepositoryEndpoint, query: &str) -> Vec<RawCandidate> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        match self.try_fetch(endpoint, query).await {
            Ok(candidates) => {
                debug!(
                    endpoint = %endpoint.name,
                    count = candidates.len(),
                    "repository fetch complete"
                );
                candidates
            }
            Err(e) => {
                warn!(endpoint = %endpoint.name, error = %e, "repository fetch failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_messages_are_descriptive() {
        assert_eq!(
            FetchError::Status(503).to_string(),
            "request failed: status 503"
        );
        assert!(FetchError::Unauthorized.to_string().contains("API key"));
        assert!(
            FetchError::MissingResults("/results".into())
                .to_string()
                .contains("/results")
        );
    }
}
