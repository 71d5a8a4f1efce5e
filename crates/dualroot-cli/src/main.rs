// crates/dualroot-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dualroot_core::{Leaf, ProofStats, TransitionBundle, Verifier, VerifierConfig};
use dualroot_crypto::{Blake2b160Hasher, Blake3Hasher, Digest, TreeHasher};
use dualroot_state::ManifestStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "dualroot",
    about = "Dual-root sparse Merkle transition verifier",
    long_about = "Dual-root sparse Merkle transition verifier.\n\nUse this tool to initialize a committed root, verify transition bundles against it, and inspect proofs.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

/// Node hash the committed roots were built with.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum HashKind {
    /// BLAKE3, truncated to 160 bits
    #[default]
    Blake3,
    /// Unkeyed BLAKE2b with a 160-bit output
    Blake2b,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write a fresh state manifest holding a genesis root
    Init {
        /// Genesis root (40 hex chars, optional 0x prefix)
        #[arg(long)]
        root: Digest,

        /// Output path for the state manifest (CBOR/JSON)
        #[arg(long, default_value = "state.json")]
        state: PathBuf,

        /// Replace an existing manifest
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Verify a transition bundle against the committed root and commit on accept
    Verify {
        /// State manifest (CBOR/JSON)
        #[arg(long)]
        state: PathBuf,

        /// Transition bundle: proof + new balances (CBOR/JSON)
        #[arg(long)]
        bundle: PathBuf,

        /// Verifier configuration (TOML/JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Node hash function
        #[arg(long, value_enum, default_value_t = HashKind::Blake3)]
        hash: HashKind,
    },

    /// Decode a bundle's proof and print its leaves and size statistics
    Inspect {
        /// Transition bundle (CBOR/JSON)
        #[arg(long)]
        bundle: PathBuf,

        /// Verifier configuration (TOML/JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Init { root, state, force } => init(root, &state, force),
        Cmd::Verify {
            state,
            bundle,
            config,
            hash: HashKind::Blake3,
        } => verify::<Blake3Hasher>(&state, &bundle, config.as_deref()),
        Cmd::Verify {
            state,
            bundle,
            config,
            hash: HashKind::Blake2b,
        } => verify::<Blake2b160Hasher>(&state, &bundle, config.as_deref()),
        Cmd::Inspect { bundle, config } => inspect(&bundle, config.as_deref()),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn load_verifier<H: TreeHasher>(config: Option<&Path>) -> Result<Verifier<H>> {
    let cfg = match config {
        Some(path) => VerifierConfig::load(path)?,
        None => VerifierConfig::default(),
    };
    info!(leaf_depth = cfg.leaf_depth, addresses = ?cfg.addresses, "verifier config");
    Ok(Verifier::new(cfg)?)
}

fn init(root: Digest, state: &Path, force: bool) -> Result<()> {
    info!(state=%state.display(), %root, "initializing state");
    ManifestStore::create(state, root, force)
        .with_context(|| format!("writing state manifest {}", state.display()))?;
    println!("Initialized {} at root {root}", state.display());
    Ok(())
}

fn verify<H: TreeHasher>(state: &Path, bundle: &Path, config: Option<&Path>) -> Result<()> {
    let verifier = load_verifier::<H>(config)?;
    let mut store = ManifestStore::open(state)?;
    let b = TransitionBundle::read(bundle)
        .with_context(|| format!("reading bundle {}", bundle.display()))?;

    info!(state=%state.display(), bundle=%bundle.display(), bytes = b.proof.len(), "verifying transition");
    let new_root = store
        .apply(&verifier, &b.proof, &b.new_balances)
        .with_context(|| format!("transition {} rejected", bundle.display()))?;

    println!(
        "OK: transition #{} accepted, new root {new_root}",
        store.manifest().transitions
    );
    Ok(())
}

#[derive(Serialize)]
struct InspectReport {
    stats: ProofStats,
    leaves: Vec<Leaf>,
}

fn inspect(bundle: &Path, config: Option<&Path>) -> Result<()> {
    let verifier = load_verifier::<Blake3Hasher>(config)?;
    let b = TransitionBundle::read(bundle)
        .with_context(|| format!("reading bundle {}", bundle.display()))?;
    let (leaves, stats) = verifier
        .inspect(&b.proof)
        .with_context(|| format!("decoding proof in {}", bundle.display()))?;
    if leaves.len() != b.new_balances.len() {
        tracing::warn!(
            leaves = leaves.len(),
            new_balances = b.new_balances.len(),
            "bundle balance count does not match proof"
        );
    }
    let report = InspectReport { stats, leaves };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize inspect report")?
    );
    Ok(())
}
