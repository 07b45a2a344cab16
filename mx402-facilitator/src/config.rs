//! Facilitator server configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//! A missing file means all defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 3000
//! gateway_url = "https://devnet-gateway.multiversx.com"
//! network = "multiversx:D"
//! quota_limit = 100
//! db_path = "$DATA_DIR/quota.json"
//! gateway_timeout_ms = 10000
//! probe_gateway = true
//! ```
//!
//! # Environment Overrides
//!
//! - `HOST`, `PORT` - Bind address
//! - `NETWORK_PROVIDER` or `MULTIVERSX_API_URL` - Gateway base URL
//! - `NETWORK` - Network name or CAIP-2 id
//! - `QUOTA_LIMIT` - Relays allowed per sender
//! - `DB_PATH` - Quota snapshot file, `:memory:` for none
//! - `GATEWAY_TIMEOUT_MS` - Deadline for each gateway call

use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use mx402::chain::ChainId;
use mx402::networks::DEVNET;
use mx402::quota::IN_MEMORY;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use url::Url;

static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_]+)\}|\$([A-Za-z0-9_]+)").expect("valid env reference regex")
});

/// Errors produced while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File location.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for [`FacilitatorConfig`].
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
    /// An environment override could not be parsed.
    #[error("invalid {var}={value:?}: {reason}")]
    Override {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// Parse failure.
        reason: String,
    },
}

/// Top-level facilitator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilitatorConfig {
    /// Server bind address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Server port (default: `3000`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the network gateway (default: the devnet gateway).
    #[serde(default = "default_gateway_url")]
    pub gateway_url: Url,

    /// Network the facilitator serves (default: `multiversx:D`).
    #[serde(default = "default_network")]
    pub network: ChainId,

    /// Relays allowed per sender (default: `100`).
    #[serde(default = "default_quota_limit")]
    pub quota_limit: u64,

    /// Quota snapshot file; `:memory:` keeps quota in memory only.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Deadline for each gateway call in milliseconds (default: `10000`).
    #[serde(default = "default_gateway_timeout_ms")]
    pub gateway_timeout_ms: u64,

    /// Whether to check the gateway's chain id at startup (default: `true`).
    #[serde(default = "default_probe_gateway")]
    pub probe_gateway: bool,
}

const fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    3000
}

fn default_gateway_url() -> Url {
    Url::parse(DEVNET.gateway_url).expect("devnet gateway url is valid")
}

fn default_network() -> ChainId {
    DEVNET.chain_id()
}

const fn default_quota_limit() -> u64 {
    100
}

fn default_db_path() -> String {
    IN_MEMORY.to_owned()
}

const fn default_gateway_timeout_ms() -> u64 {
    10_000
}

const fn default_probe_gateway() -> bool {
    true
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            gateway_url: default_gateway_url(),
            network: default_network(),
            quota_limit: default_quota_limit(),
            db_path: default_db_path(),
            gateway_timeout_ms: default_gateway_timeout_ms(),
            probe_gateway: default_probe_gateway(),
        }
    }
}

impl FacilitatorConfig {
    /// Loads configuration from `path`, expanding and overriding values from
    /// the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Loads configuration from `path`, resolving variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override is invalid.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            String::new()
        };
        Self::parse_with(&content, lookup)
    }

    /// Parses TOML text, then applies `$VAR` expansion and overrides from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is not valid or an override is invalid.
    pub fn parse_with<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_env_vars(content, &lookup);
        let mut config: Self = toml::from_str(&expanded)?;
        config.apply_overrides(&lookup)?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = parse_override(lookup, "HOST")? {
            self.host = host;
        }
        if let Some(port) = parse_override(lookup, "PORT")? {
            self.port = port;
        }
        if let Some(url) = parse_override(lookup, "NETWORK_PROVIDER")? {
            self.gateway_url = url;
        } else if let Some(url) = parse_override(lookup, "MULTIVERSX_API_URL")? {
            self.gateway_url = url;
        }
        if let Some(network) = parse_override(lookup, "NETWORK")? {
            self.network = network;
        }
        if let Some(limit) = parse_override(lookup, "QUOTA_LIMIT")? {
            self.quota_limit = limit;
        }
        if let Some(path) = lookup("DB_PATH").filter(|p| !p.is_empty()) {
            self.db_path = path;
        }
        if let Some(timeout) = parse_override(lookup, "GATEWAY_TIMEOUT_MS")? {
            self.gateway_timeout_ms = timeout;
        }
        Ok(())
    }

    /// Returns the address to bind the server to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns the gateway call deadline.
    #[must_use]
    pub const fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }
}

fn parse_override<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    value
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::Override {
            var,
            reason: e.to_string(),
            value,
        })
}

/// Expands `$VAR` and `${VAR}` references through `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_env_vars<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_REFERENCE
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            lookup(name).unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}
