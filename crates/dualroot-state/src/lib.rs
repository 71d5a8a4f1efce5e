// crates/dualroot-state/src/lib.rs

//! Committed-root store backed by a small manifest file.
//!
//! - Manifest contains: schema version, the current root, and how many
//!   transitions have been accepted on top of the genesis root.
//! - [`ManifestStore`] is the pipeline's pre-root source and post-root sink.
//!   A commit rewrites the manifest through a sibling temp file and a rename,
//!   so a crash never leaves a half-written root behind.
//! - JSON or CBOR by extension, like every other dualroot file.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

use anyhow::{bail, Context, Result};
use dualroot_core::io::{ext_lower, read_auto, write_cbor, write_json};
use dualroot_core::pipeline::{apply_transition, PostRootSink, PreRootSource};
use dualroot_core::{Balance, Verifier};
use dualroot_crypto::{Digest, TreeHasher};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Format version for [`StateManifest`].
pub const MANIFEST_VERSION: u32 = 1;

/// The committed state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateManifest {
    /// Schema/encoding version.
    pub version: u32,
    /// Current committed root.
    pub root: Digest,
    /// Accepted transitions since genesis.
    pub transitions: u64,
}

impl StateManifest {
    /// Fresh manifest at `root`.
    #[must_use]
    pub const fn genesis(root: Digest) -> Self {
        Self {
            version: MANIFEST_VERSION,
            root,
            transitions: 0,
        }
    }

    /// Manifest after accepting a transition to `root`.
    #[must_use]
    pub const fn advance(&self, root: Digest) -> Self {
        Self {
            version: self.version,
            root,
            transitions: self.transitions + 1,
        }
    }
}

impl PreRootSource for StateManifest {
    fn pre_root(&self) -> Result<Digest> {
        Ok(self.root)
    }
}

/* -------------------- Manifest IO (JSON/CBOR) -------------------- */

/// Auto-detect read by extension `.json` / `.cbor`; rejects unknown versions.
pub fn read_manifest_auto<P: AsRef<Path>>(path: P) -> Result<StateManifest> {
    let m: StateManifest = read_auto(path.as_ref(), "state manifest")?;
    if m.version != MANIFEST_VERSION {
        bail!(
            "unsupported state manifest version {} (expected {MANIFEST_VERSION})",
            m.version
        );
    }
    Ok(m)
}

/// Write `m` to `path` via a temp file in the same directory.
///
/// The encoding follows `path`'s extension (CBOR for `.cbor`, JSON otherwise).
/// On failure the temp file is removed and `path` is left as it was.
pub fn write_manifest_atomic<P: AsRef<Path>>(path: P, m: &StateManifest) -> Result<()> {
    let path = path.as_ref();
    let tmp = tmp_path(path);
    let res = write_then_rename(&tmp, path, m);
    if res.is_err() && tmp.exists() {
        let _ = fs::remove_file(&tmp);
    }
    res
}

fn write_then_rename(tmp: &Path, path: &Path, m: &StateManifest) -> Result<()> {
    if ext_lower(path).as_deref() == Some("cbor") {
        write_cbor(tmp, m, "state manifest")?;
    } else {
        write_json(tmp, m, "state manifest")?;
    }
    fs::rename(tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))
}

/* -------------------- Store -------------------- */

/// File-backed pre-root source and post-root sink.
#[derive(Clone, Debug)]
pub struct ManifestStore {
    path: PathBuf,
    manifest: StateManifest,
}

impl ManifestStore {
    /// Create a new manifest at `path` holding `root`.
    ///
    /// Refuses to replace an existing file unless `overwrite` is set.
    pub fn create<P: AsRef<Path>>(path: P, root: Digest, overwrite: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() && !overwrite {
            bail!("state manifest {} already exists", path.display());
        }
        let manifest = StateManifest::genesis(root);
        write_manifest_atomic(&path, &manifest)?;
        debug!(path = %path.display(), root = %root, "created state manifest");
        Ok(Self { path, manifest })
    }

    /// Open an existing manifest.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let manifest = read_manifest_auto(&path)
            .with_context(|| format!("open state manifest {}", path.display()))?;
        Ok(Self { path, manifest })
    }

    /// Current in-memory manifest (matches the file after every commit).
    #[must_use]
    pub const fn manifest(&self) -> &StateManifest {
        &self.manifest
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify one transition against the stored root and commit on accept.
    pub fn apply<H: TreeHasher>(
        &mut self,
        verifier: &Verifier<H>,
        proof: &[u8],
        new_balances: &[Balance],
    ) -> Result<Digest> {
        let snapshot = self.manifest.clone();
        apply_transition(verifier, &snapshot, self, proof, new_balances)
    }
}

impl PreRootSource for ManifestStore {
    fn pre_root(&self) -> Result<Digest> {
        Ok(self.manifest.root)
    }
}

impl PostRootSink for ManifestStore {
    fn commit(&mut self, root: Digest) -> Result<()> {
        let next = self.manifest.advance(root);
        write_manifest_atomic(&self.path, &next)?;
        self.manifest = next;
        Ok(())
    }
}

/* -------------------- Small helpers -------------------- */

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
