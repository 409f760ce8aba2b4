use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use url::Url;

use super::FetchError;

const CASE_LAW_URL: &str = "https://api.case.law/v1/cases/";
pub const CASE_LAW_KEY_ENV: &str = "CASE_LAW_API_KEY";

/// One external document repository and how to talk to it.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryEndpoint {
    pub name: String,
    pub address: Url,
    #[serde(default)]
    pub request: RequestTemplate,
    #[serde(default)]
    pub fields: FieldMapping,
    /// Resolved from `request.auth.api_key_env` at startup.
    #[serde(skip)]
    pub credential: Option<ApiKey>,
}

impl RepositoryEndpoint {
    /// Case Law Access Project search, the default repository.
    pub fn case_law() -> Result<Self, url::ParseError> {
        Ok(Self {
            name: "case_law".to_string(),
            address: Url::parse(CASE_LAW_URL)?,
            request: RequestTemplate {
                method: HttpMethod::Get,
                query_param: "search".to_string(),
                params: BTreeMap::from([
                    ("full_case".to_string(), "true".to_string()),
                    ("page_size".to_string(), "20".to_string()),
                    ("format".to_string(), "json".to_string()),
                ]),
                headers: BTreeMap::new(),
                auth: Some(AuthTemplate {
                    scheme: "Token".to_string(),
                    api_key_env: CASE_LAW_KEY_ENV.to_string(),
                }),
            },
            fields: FieldMapping {
                results: "/results".to_string(),
                title: "/name".to_string(),
                text: "/casebody/data/opinions/0/text".to_string(),
                court: "/court/name".to_string(),
                url: "/frontend_url".to_string(),
                jurisdiction: "/jurisdiction/name".to_string(),
                date: "/decision_date".to_string(),
            },
            credential: None,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// Fixed request shape for an endpoint. The query text is the only part
/// that varies between calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequestTemplate {
    pub method: HttpMethod,
    pub query_param: String,
    pub params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub auth: Option<AuthTemplate>,
}

impl RequestTemplate {
    /// Template headers as a map that replaces same-named defaults on the request.
    pub fn header_map(&self) -> Result<HeaderMap, FetchError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
            let value =
                HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader(name.clone()))?;
            map.insert(header, value);
        }
        Ok(map)
    }
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self {
            method: HttpMethod::Get,
            query_param: "query".to_string(),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            auth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthTemplate {
    #[serde(default = "default_auth_scheme")]
    pub scheme: String,
    pub api_key_env: String,
}

fn default_auth_scheme() -> String {
    "Bearer".to_string()
}

/// JSON pointers (RFC 6901) into a repository response.
///
/// `results` is resolved against the whole body; the rest are resolved
/// against each record of that array.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    pub results: String,
    pub title: String,
    pub text: String,
    pub court: String,
    pub url: String,
    pub jurisdiction: String,
    pub date: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            results: "/results".to_string(),
            title: "/title".to_string(),
            text: "/text".to_string(),
            court: "/court".to_string(),
            url: "/url".to_string(),
            jurisdiction: "/jurisdiction".to_string(),
            date: "/date".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// A record as a repository returned it, before scoring. Every field may be
/// missing; `repository` is always the endpoint that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCandidate {
    pub repository: String,
    pub title: Option<String>,
    pub text: Option<String>,
    pub court: Option<String>,
    pub url: Option<String>,
    pub jurisdiction: Option<String>,
    pub date: Option<String>,
}
