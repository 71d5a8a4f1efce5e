//! File I/O for transition bundles and other serde payloads.
//!
//! JSON and CBOR are selected by extension (`.json` / `.cbor`,
//! case-insensitive). Unknown or missing extensions are rejected on read and
//! fall back to JSON on write.

use crate::types::Balance;
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// A proof buffer plus the new balances it is verified against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionBundle {
    /// Wire-encoded proof (hex string on disk).
    #[serde(with = "hex_bytes")]
    pub proof: Vec<u8>,
    /// One new balance per leaf, in traversal order.
    pub new_balances: Vec<Balance>,
}

impl TransitionBundle {
    /// Read a bundle (`.json` / `.cbor`).
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_auto(path.as_ref(), "transition bundle")
    }

    /// Write a bundle (JSON unless the extension says `.cbor`).
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_auto(path.as_ref(), self, "transition bundle")
    }
}

mod hex_bytes {
    use super::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/* -------------------- generic JSON/CBOR -------------------- */

/// Read any `T` from **JSON**.
pub fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let f = File::open(path).with_context(|| format!("open {}", display(path)))?;
    serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("deserialize JSON {what}"))
}

/// Write any `T` to **JSON** (pretty).
pub fn write_json<T: Serialize>(path: &Path, v: &T, what: &str) -> Result<()> {
    ensure_parent_dir(path)?;
    let f = File::create(path).with_context(|| format!("create {}", display(path)))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, v).with_context(|| format!("serialize JSON {what}"))?;
    w.flush().with_context(|| "flush JSON writer")?;
    Ok(())
}

/// Read any `T` from **CBOR**.
pub fn read_cbor<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let f = File::open(path).with_context(|| format!("open {}", display(path)))?;
    let mut rdr = BufReader::new(f);
    ciborium::de::from_reader(&mut rdr).with_context(|| format!("deserialize CBOR {what}"))
}

/// Write any `T` to **CBOR**.
pub fn write_cbor<T: Serialize>(path: &Path, v: &T, what: &str) -> Result<()> {
    ensure_parent_dir(path)?;
    let f = File::create(path).with_context(|| format!("create {}", display(path)))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(v, &mut w).with_context(|| format!("serialize CBOR {what}"))?;
    w.flush().with_context(|| "flush CBOR writer")?;
    Ok(())
}

/// Auto-detect read by extension.
pub fn read_auto<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    match ext_lower(path).as_deref() {
        Some("json") => read_json(path, what),
        Some("cbor") => read_cbor(path, what),
        Some(other) => Err(anyhow!(
            "unsupported {what} extension: {other} (supported: .json, .cbor)"
        )),
        None => Err(anyhow!("path has no extension (expected .json or .cbor)")),
    }
}

/// Auto-detect write (defaults to **JSON**).
pub fn write_auto<T: Serialize>(path: &Path, v: &T, what: &str) -> Result<()> {
    match ext_lower(path).as_deref() {
        Some("cbor") => write_cbor(path, v, what),
        _ => write_json(path, v, what),
    }
}

/* -------------------- small helpers -------------------- */

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", display(path)))?;
        }
    }
    Ok(())
}

/// Lowercased file extension, if any.
#[inline]
#[must_use]
pub fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

#[inline]
fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
