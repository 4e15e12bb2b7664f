use crate::core::{Result, StoreError};
use std::fmt;
use std::str::FromStr;

/// What `update` does when the target document is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Fail with `NotFound`
    #[default]
    Strict,
    /// Create the document from the partial fields
    Upsert,
}

impl FromStr for UpdatePolicy {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "upsert" => Ok(Self::Upsert),
            other => Err(StoreError::Config(format!("unknown update policy '{}'", other))),
        }
    }
}

impl fmt::Display for UpdatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Upsert => f.write_str("upsert"),
        }
    }
}

/// Store client configuration
///
/// Opaque to the layers above the store; supplied once when the client is
/// constructed. `project_id`, `database`, `host` and `port` address the
/// hosted backend. [`InMemoryStore`](super::InMemoryStore) keeps them only
/// so the CLI can report where a hosted client would connect; it reads
/// nothing but `update_policy`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend project identifier
    pub project_id: String,

    /// Database name inside the project
    pub database: String,

    /// Store host
    pub host: String,

    /// Store port
    pub port: u16,

    /// Behaviour of `update` on a missing document
    pub update_policy: UpdatePolicy,
}

const URL_SCHEME: &str = "scorebook://";
const DEFAULT_PORT: u16 = 8080;

impl StoreConfig {
    pub fn new(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            database: "(default)".to_string(),
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            update_policy: UpdatePolicy::Strict,
        }
    }

    pub fn database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn update_policy(mut self, policy: UpdatePolicy) -> Self {
        self.update_policy = policy;
        self
    }

    /// Parse from connection string
    ///
    /// Format: "scorebook://project@host:port/database"
    ///
    /// # Examples
    ///
    /// ```
    /// # use scorebook::StoreConfig;
    /// let config = StoreConfig::from_url("scorebook://cricket-live@localhost:8080/scores").unwrap();
    /// assert_eq!(config.project_id, "cricket-live");
    /// assert_eq!(config.database, "scores");
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| StoreError::Config(format!("URL must start with '{}'", URL_SCHEME)))?;

        let (project, location) = rest
            .split_once('@')
            .ok_or_else(|| StoreError::Config("missing '@' between project and host".into()))?;

        let (host_port, database) = location
            .split_once('/')
            .ok_or_else(|| StoreError::Config("missing '/database' suffix".into()))?;

        let (host, port) = match host_port.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| StoreError::Config(format!("invalid port '{}'", port)))?;
                (host, port)
            }
            None => (host_port, DEFAULT_PORT),
        };

        Ok(Self::new(project).host(host).port(port).database(database))
    }

    /// Read `SCOREBOOK_URL` and `SCOREBOOK_UPDATE_POLICY`, falling back to a
    /// local emulator configuration.
    pub fn from_env() -> Result<Self> {
        let config = match std::env::var("SCOREBOOK_URL") {
            Ok(url) => Self::from_url(&url)?,
            Err(_) => Self::default(),
        };
        let config = match std::env::var("SCOREBOOK_UPDATE_POLICY") {
            Ok(policy) => config.update_policy(policy.parse()?),
            Err(_) => config,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_url(&self) -> String {
        format!(
            "{}{}@{}:{}/{}",
            URL_SCHEME, self.project_id, self.host, self.port, self.database
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.project_id.is_empty() {
            return Err(StoreError::Config("project id cannot be empty".into()));
        }
        if self.database.is_empty() {
            return Err(StoreError::Config("database cannot be empty".into()));
        }
        if self.host.is_empty() {
            return Err(StoreError::Config("host cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(StoreError::Config("port must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("scorebook-local")
    }
}
