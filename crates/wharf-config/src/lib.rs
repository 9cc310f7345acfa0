//! Configuration for the wharf metadata pipeline.

pub mod error;

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, Result};

/// A secondary edge node receiving HMAC-signed document pushes.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EdgeNode {
    /// Base URL of the node's internal push endpoint.
    pub url: String,

    /// Shared secret used to sign every push payload.
    pub secret: String,
}

/// Edge tier settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EdgeConfig {
    /// Configured edge nodes. Empty means no edge tier.
    #[serde(default)]
    pub nodes: Vec<EdgeNode>,

    /// Maximum number of in-flight pushes per batch.
    /// Default: 40
    pub concurrency: Option<usize>,
}

/// Dump scheduling settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DumpConfig {
    /// Maximum number of passes one invocation of the dump loop performs
    /// before exiting so external supervision can restart it.
    /// Default: 120
    pub iterations: Option<u32>,

    /// Seconds to sleep between dump passes.
    /// Default: 10
    pub interval_secs: Option<u64>,

    /// Lease TTL in seconds for the dump and GC jobs.
    /// Default: 3600
    pub lease_ttl_secs: Option<i64>,
}

/// Change-feed retention settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FeedConfig {
    /// How many days of update/delete entries to retain before trimming.
    /// Default: 75
    pub retention_days: Option<i64>,
}

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Directory the metadata documents are published under.
    /// Default: /srv/wharf/metadata
    pub metadata_dir: Option<String>,

    /// Path to the SQLite store.
    /// Default: /srv/wharf/wharf.db
    pub db_path: Option<String>,

    /// Directory lease files live in.
    /// Default: /srv/wharf/locks
    pub lock_dir: Option<String>,

    #[serde(default)]
    pub dump: DumpConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub edge: EdgeConfig,
}

impl Config {
    /// Loads the configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a present but malformed file is
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, fails to parse,
    /// or names an invalid edge node.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            action: format!("reading config file {}", path.display()),
            source,
        })?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for node in &self.edge.nodes {
            Url::parse(&node.url).map_err(|_| ConfigError::InvalidEdgeUrl(node.url.clone()))?;
            if node.secret.is_empty() {
                return Err(ConfigError::EmptyEdgeSecret(node.url.clone()));
            }
        }
        Ok(())
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.metadata_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/srv/wharf/metadata"))
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/srv/wharf/wharf.db"))
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.lock_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/srv/wharf/locks"))
    }

    pub fn dump_iterations(&self) -> u32 {
        self.dump.iterations.unwrap_or(120)
    }

    pub fn dump_interval_secs(&self) -> u64 {
        self.dump.interval_secs.unwrap_or(10)
    }

    pub fn lease_ttl_millis(&self) -> i64 {
        self.dump.lease_ttl_secs.unwrap_or(3600) * 1000
    }

    pub fn feed_retention_millis(&self) -> i64 {
        self.feed.retention_days.unwrap_or(75) * 24 * 60 * 60 * 1000
    }

    pub fn edge_concurrency(&self) -> usize {
        self.edge.concurrency.unwrap_or(40)
    }
}
