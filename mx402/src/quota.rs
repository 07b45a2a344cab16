//! Per-sender relay quota.
//!
//! [`QuotaTracker`] counts relayed transactions per sender against a fixed
//! ceiling. Counts never decay; they reset only through [`QuotaTracker::reset`],
//! [`QuotaTracker::reset_all`] or a restart without persistence.

use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::chain::Address;

/// Path value that disables quota persistence.
pub const IN_MEMORY: &str = ":memory:";

/// Errors produced while loading or persisting a quota snapshot.
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    /// The snapshot file could not be read or written.
    #[error("quota snapshot {}: {source}", path.display())]
    Io {
        /// Snapshot location.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The snapshot file is not valid JSON.
    #[error("quota snapshot {}: {source}", path.display())]
    Json {
        /// Snapshot location.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Atomic per-sender usage counter with a ceiling.
///
/// Each sender's counter is guarded by its `DashMap` shard lock, so a
/// check-and-increment never races with another for the same sender.
///
/// Entries are created on first use and only removed by [`Self::reset`] or
/// [`Self::reset_all`]. Every fresh keypair that passes the signature check
/// adds one entry, so memory grows with the number of distinct senders seen.
/// Operators exposed to key churn should reset periodically.
#[derive(Debug)]
pub struct QuotaTracker {
    limit: u64,
    usage: DashMap<Address, u64>,
    snapshot: Option<PathBuf>,
}

impl QuotaTracker {
    /// Creates an in-memory tracker with the given per-sender ceiling.
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            usage: DashMap::new(),
            snapshot: None,
        }
    }

    /// Creates a tracker backed by a JSON snapshot at `path`, loading any
    /// existing counts. [`IN_MEMORY`] yields a transient tracker.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError`] if an existing snapshot cannot be read or parsed.
    pub fn load(limit: u64, path: &str) -> Result<Self, QuotaError> {
        if path == IN_MEMORY {
            return Ok(Self::new(limit));
        }
        let path = PathBuf::from(path);
        let tracker = Self {
            limit,
            usage: DashMap::new(),
            snapshot: Some(path.clone()),
        };
        if !path.exists() {
            return Ok(tracker);
        }
        let content = std::fs::read_to_string(&path).map_err(|source| QuotaError::Io {
            path: path.clone(),
            source,
        })?;
        let counts: HashMap<Address, u64> =
            serde_json::from_str(&content).map_err(|source| QuotaError::Json {
                path: path.clone(),
                source,
            })?;
        for (identity, used) in counts {
            tracker.usage.insert(identity, used);
        }
        Ok(tracker)
    }

    /// Writes the current counts to the snapshot file, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError`] if the snapshot cannot be written.
    pub fn persist(&self) -> Result<(), QuotaError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let counts: BTreeMap<String, u64> = self
            .usage
            .iter()
            .map(|entry| (entry.key().to_string(), *entry.value()))
            .collect();
        let json = serde_json::to_string_pretty(&counts).map_err(|source| QuotaError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| QuotaError::Io {
            path: path.clone(),
            source,
        })
    }

    /// Returns the snapshot location, if persistence is enabled.
    #[must_use]
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    /// Returns the per-sender ceiling.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Consumes one unit of quota for `identity`.
    ///
    /// Returns `false`, leaving the count untouched, when the ceiling is reached.
    pub fn try_consume(&self, identity: &Address) -> bool {
        if self.limit == 0 {
            return false;
        }
        let mut used = self.usage.entry(*identity).or_insert(0);
        if *used >= self.limit {
            return false;
        }
        *used += 1;
        true
    }

    /// Returns how many relays `identity` has left.
    #[must_use]
    pub fn remaining(&self, identity: &Address) -> u64 {
        let used = self.usage.get(identity).map_or(0, |entry| *entry.value());
        self.limit.saturating_sub(used)
    }

    /// Clears the count of a single sender.
    pub fn reset(&self, identity: &Address) {
        self.usage.remove(identity);
    }

    /// Clears every count.
    pub fn reset_all(&self) {
        self.usage.clear();
    }
}
