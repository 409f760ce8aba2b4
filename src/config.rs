use std::collections::HashSet;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use tracing::{debug, warn};

use crate::repository::{ApiKey, RepositoryEndpoint};
use crate::search::engine::{DEFAULT_FETCH_TIMEOUT, DEFAULT_SCORING_CONCURRENCY};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read endpoints file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid endpoints file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid repository address: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Service configuration from command-line flags, falling back to environment variables.
///
/// Repository credentials are never passed as flags: each endpoint names the
/// environment variable holding its key (`CASE_LAW_API_KEY` for the built-in endpoint).
#[derive(Debug, Parser)]
#[command(name = "lexsearch", version, about)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "LEXSEARCH_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// JSON file with an array of repository endpoint definitions (default: Case Law Access Project)
    #[arg(long, env = "LEXSEARCH_ENDPOINTS")]
    pub endpoints: Option<PathBuf>,

    /// Per-repository fetch timeout in seconds
    #[arg(long, env = "LEXSEARCH_FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT.as_secs())]
    pub fetch_timeout_secs: u64,

    /// Maximum candidates scored concurrently per repository
    #[arg(long, env = "LEXSEARCH_SCORING_CONCURRENCY", default_value_t = DEFAULT_SCORING_CONCURRENCY)]
    pub scoring_concurrency: usize,

    /// Origin allowed to call the API from a browser (repeatable; "*" allows any)
    #[arg(
        long = "cors-origin",
        env = "LEXSEARCH_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch timeout must be greater than 0".into(),
            ));
        }
        if self.scoring_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "scoring concurrency must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Endpoints from `--endpoints`, or the built-in Case Law endpoint,
    /// with credentials resolved from the environment.
    pub fn load_endpoints(&self) -> Result<Vec<RepositoryEndpoint>, ConfigError> {
        let endpoints = match &self.endpoints {
            Some(path) => read_endpoints(path)?,
            None => vec![RepositoryEndpoint::case_law()?],
        };
        validate_endpoints(&endpoints)?;
        Ok(endpoints
            .into_iter()
            .map(|e| resolve_credential(e, |var| env::var(var).ok()))
            .collect())
    }
}

fn read_endpoints(path: &Path) -> Result<Vec<RepositoryEndpoint>, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&json)?)
}

fn validate_endpoints(endpoints: &[RepositoryEndpoint]) -> Result<(), ConfigError> {
    if endpoints.is_empty() {
        return Err(ConfigError::Invalid(
            "at least one repository endpoint must be configured".into(),
        ));
    }

    let mut names = HashSet::new();
    for endpoint in endpoints {
        if endpoint.name.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint name must not be empty".into()));
        }
        if !names.insert(endpoint.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "duplicate endpoint name '{}'",
                endpoint.name
            )));
        }
        match endpoint.address.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "endpoint '{}' must use http or https, got '{other}'",
                    endpoint.name
                )));
            }
        }
        endpoint.request.header_map().map_err(|e| {
            ConfigError::Invalid(format!("endpoint '{}': {e}", endpoint.name))
        })?;
    }
    Ok(())
}

fn resolve_credential(
    mut endpoint: RepositoryEndpoint,
    lookup: impl Fn(&str) -> Option<String>,
) -> RepositoryEndpoint {
    let Some(auth) = &endpoint.request.auth else {
        return endpoint;
    };

    match lookup(&auth.api_key_env)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
    {
        Some(key) => {
            debug!(endpoint = %endpoint.name, "repository API key configured");
            endpoint.credential = Some(ApiKey::new(key));
        }
        None => {
            warn!(
                endpoint = %endpoint.name,
                env = %auth.api_key_env,
                "API key not set; requests will be unauthenticated"
            );
        }
    }
    endpoint
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("lexsearch").chain(args.iter().copied())).unwrap()
    }

    /// Declared default for `id`, unaffected by `LEXSEARCH_*` in the environment.
    fn declared_default(id: &str) -> String {
        let command = Config::command();
        let arg = command
            .get_arguments()
            .find(|a| a.get_id().as_str() == id)
            .unwrap();
        arg.get_default_values()
            .iter()
            .map(|v| v.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn default_config() -> Config {
        Config {
            bind: declared_default("bind").parse().unwrap(),
            endpoints: None,
            fetch_timeout_secs: declared_default("fetch_timeout_secs").parse().unwrap(),
            scoring_concurrency: declared_default("scoring_concurrency").parse().unwrap(),
            cors_origins: vec![declared_default("cors_origins")],
        }
    }

    fn endpoints_json(json: &str) -> Vec<RepositoryEndpoint> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn declared_defaults() {
        let config = default_config();
        assert_eq!(config.bind, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.fetch_timeout(), DEFAULT_FETCH_TIMEOUT);
        assert_eq!(config.scoring_concurrency, DEFAULT_SCORING_CONCURRENCY);
        assert_eq!(config.cors_origins, ["http://localhost:3000"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--bind",
            "0.0.0.0:9000",
            "--fetch-timeout-secs",
            "3",
            "--cors-origin",
            "https://a.example,https://b.example",
        ]);
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(3));
        assert_eq!(config.cors_origins, ["https://a.example", "https://b.example"]);
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let config = parse(&["--fetch-timeout-secs", "0"]);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_concurrency_is_invalid() {
        let config = parse(&["--scoring-concurrency", "0"]);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn builtin_endpoint_used_without_file() {
        let endpoints = default_config().load_endpoints().unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].name, "case_law");
    }

    #[test]
    fn endpoints_file_is_loaded() {
        let mut file = std::env::temp_dir();
        file.push(format!("lexsearch-endpoints-{}.json", std::process::id()));
        let mut handle = std::fs::File::create(&file).unwrap();
        handle
            .write_all(
                br#"[
                    {"name": "statutes", "address": "https://statutes.example.com/api"},
                    {"name": "opinions", "address": "http://opinions.example.com/search",
                     "request": {"method": "POST", "query_param": "q"}}
                ]"#,
            )
            .unwrap();

        let config = parse(&["--endpoints", file.to_str().unwrap()]);
        let endpoints = config.load_endpoints().unwrap();
        std::fs::remove_file(&file).unwrap();

        let names: Vec<_> = endpoints.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["statutes", "opinions"]);
    }

    #[test]
    fn missing_endpoints_file_is_read_error() {
        let config = parse(&["--endpoints", "/nonexistent/lexsearch/endpoints.json"]);
        assert!(matches!(
            config.load_endpoints(),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn malformed_endpoints_are_rejected() {
        assert!(serde_json::from_str::<Vec<RepositoryEndpoint>>(r#"[{"name": "x"}]"#).is_err());
        assert!(
            serde_json::from_str::<Vec<RepositoryEndpoint>>(
                r#"[{"name": "x", "address": "not a url"}]"#
            )
            .is_err()
        );
    }

    #[test]
    fn empty_endpoint_list_is_invalid() {
        assert!(matches!(
            validate_endpoints(&[]),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn duplicate_names_are_invalid() {
        let endpoints = endpoints_json(
            r#"[
                {"name": "a", "address": "https://one.example.com"},
                {"name": "a", "address": "https://two.example.com"}
            ]"#,
        );
        let err = validate_endpoints(&endpoints).unwrap_err();
        assert!(err.to_string().contains("duplicate"), "got: {err}");
    }

    #[test]
    fn blank_name_is_invalid() {
        let endpoints = endpoints_json(r#"[{"name": " ", "address": "https://one.example.com"}]"#);
        assert!(validate_endpoints(&endpoints).is_err());
    }

    #[test]
    fn non_http_scheme_is_invalid() {
        let endpoints = endpoints_json(r#"[{"name": "ftp", "address": "ftp://files.example.com"}]"#);
        let err = validate_endpoints(&endpoints).unwrap_err();
        assert!(err.to_string().contains("http or https"), "got: {err}");
    }

    #[test]
    fn invalid_template_header_is_rejected() {
        let endpoints = endpoints_json(
            r#"[{"name": "typo", "address": "https://one.example.com",
                 "request": {"headers": {"X Client": "lexsearch"}}}]"#,
        );
        let err = validate_endpoints(&endpoints).unwrap_err();
        assert!(err.to_string().contains("X Client"), "got: {err}");
    }

    #[test]
    fn credential_resolved_from_lookup() {
        let endpoint = RepositoryEndpoint::case_law().unwrap();
        let resolved = resolve_credential(endpoint, |var| {
            (var == "CASE_LAW_API_KEY").then(|| " secret ".to_string())
        });
        assert_eq!(resolved.credential.unwrap().expose(), "secret");
    }

    #[test]
    fn blank_credential_is_ignored() {
        let endpoint = RepositoryEndpoint::case_law().unwrap();
        let resolved = resolve_credential(endpoint, |_| Some("   ".to_string()));
        assert!(resolved.credential.is_none());
    }

    #[test]
    fn endpoint_without_auth_needs_no_credential() {
        let endpoints =
            endpoints_json(r#"[{"name": "open", "address": "https://open.example.com"}]"#);
        let resolved = resolve_credential(endpoints[0].clone(), |_| Some("unused".into()));
        assert!(resolved.credential.is_none());
    }
}
