//! Verifier configuration: tree shape, address source, and resource bounds.
//!
//! Loaded from `.toml` or `.json` (by extension); every field has a default,
//! so an empty file yields [`VerifierConfig::default`].
//!
//! ```toml
//! leaf_depth = 160
//! addresses = "explicit"
//!
//! [limits]
//! max_proof_bytes = 1048576
//! max_opcodes = 65536
//! max_leaves = 16384
//! ```

use crate::error::Error;
use crate::types::MAX_LEAF_DEPTH;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Where leaf addresses come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressSource {
    /// One address per leaf in the address section, checked against its path.
    #[default]
    Explicit,
    /// Address section is empty; addresses are recovered from path bits.
    Derived,
}

/// Bounds checked before any traversal work starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Maximum total proof buffer length.
    pub max_proof_bytes: usize,
    /// Maximum opcode count (one byte per opcode).
    pub max_opcodes: usize,
    /// Maximum number of leaves, as implied by the old-balance section.
    pub max_leaves: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_proof_bytes: 1 << 20,
            max_opcodes: 1 << 16,
            max_leaves: 1 << 14,
        }
    }
}

impl Limits {
    /// No effective bound.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_proof_bytes: usize::MAX,
            max_opcodes: usize::MAX,
            max_leaves: usize::MAX,
        }
    }
}

/// Full verifier configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    /// Depth at which leaves live (`1..=MAX_LEAF_DEPTH`).
    pub leaf_depth: usize,
    /// Address section mode.
    pub addresses: AddressSource,
    /// Resource bounds.
    pub limits: Limits,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            leaf_depth: MAX_LEAF_DEPTH,
            addresses: AddressSource::Explicit,
            limits: Limits::default(),
        }
    }
}

impl VerifierConfig {
    /// Default configuration with a different leaf depth.
    #[must_use]
    pub fn with_leaf_depth(leaf_depth: usize) -> Self {
        Self {
            leaf_depth,
            ..Self::default()
        }
    }

    /// Same configuration, different address source.
    #[must_use]
    pub const fn addresses(mut self, source: AddressSource) -> Self {
        self.addresses = source;
        self
    }

    /// Same configuration, different limits.
    #[must_use]
    pub const fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Reject configurations the verifier cannot honour.
    ///
    /// # Errors
    /// [`Error::Config`] if `leaf_depth` is out of range.
    pub fn validate(&self) -> Result<(), Error> {
        if self.leaf_depth == 0 || self.leaf_depth > MAX_LEAF_DEPTH {
            return Err(Error::Config(format!(
                "leaf_depth must be in 1..={MAX_LEAF_DEPTH}, got {}",
                self.leaf_depth
            )));
        }
        Ok(())
    }

    /// Load and validate from `.toml` or `.json`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let src = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let cfg: Self = match ext.as_deref() {
            Some("toml") => toml::from_str(&src).context("parse TOML config")?,
            Some("json") => serde_json::from_str(&src).context("parse JSON config")?,
            Some(other) => {
                return Err(anyhow!(
                    "unsupported config extension: {other} (supported: .toml, .json)"
                ))
            }
            None => return Err(anyhow!("config path has no extension (expected .toml or .json)")),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}
