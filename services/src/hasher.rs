//! Content fingerprints for upload deduplication.
//!
//! Fingerprints are cache keys, not security credentials. The backend is
//! chosen once per [`Hasher`] and reused for its lifetime:
//!
//! 1. An external fast hash tool on `PATH` (probed with `--version`).
//! 2. An in-process fast hash compiled into this crate (`xxh3`, `blake3` features).
//! 3. SHA-256 as the reference digest.
//!
//! If the external tool fails at call time, that call degrades one tier and
//! the degradation is logged. Hashing never fails.

use std::process::Stdio;
use std::time::Duration;

use sha2::{Digest as _, Sha256};
use tokio::io::AsyncWriteExt as _;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// How long a `--version` probe may take before the tool is considered absent.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// External tools in preference order, with the arguments to hash stdin.
pub const EXTERNAL_TOOLS: &[(&str, &[&str])] = &[("b3sum", &["--no-names"]), ("xxhsum", &["-H2"])];

/// In-process fast hashes in preference order.
pub const NATIVE_PREFERENCE: &[Algorithm] = &[Algorithm::Xxh3, Algorithm::Blake3];

/// In-process hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Xxh3,
    Blake3,
    Sha256,
}

impl Algorithm {
    /// Hex digest, or `None` when the algorithm is not compiled in.
    pub fn digest(self, data: &[u8]) -> Option<String> {
        match self {
            Self::Xxh3 => xxh3_digest(data),
            Self::Blake3 => blake3_digest(data),
            Self::Sha256 => Some(hex::encode(Sha256::digest(data))),
        }
    }

    pub fn is_available(self) -> bool {
        self.digest(&[]).is_some()
    }
}

#[cfg(feature = "xxh3")]
fn xxh3_digest(data: &[u8]) -> Option<String> {
    Some(format!("{:032x}", twox_hash::xxh3::hash128(data)))
}

#[cfg(not(feature = "xxh3"))]
fn xxh3_digest(_data: &[u8]) -> Option<String> {
    None
}

#[cfg(feature = "blake3")]
fn blake3_digest(data: &[u8]) -> Option<String> {
    Some(blake3::hash(data).to_hex().to_string())
}

#[cfg(not(feature = "blake3"))]
fn blake3_digest(_data: &[u8]) -> Option<String> {
    None
}

/// The selected hashing backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashBackend {
    External {
        program: String,
        args: Vec<String>,
    },
    Native(Algorithm),
    Reference,
}

impl HashBackend {
    /// Best in-process backend: first available native hash, else the reference digest.
    pub fn in_process() -> Self {
        NATIVE_PREFERENCE
            .iter()
            .copied()
            .find(|alg| alg.is_available())
            .map_or(Self::Reference, Self::Native)
    }
}

/// Fingerprint calculator with lazily selected backend.
#[derive(Debug, Default)]
pub struct Hasher {
    backend: OnceCell<HashBackend>,
}

impl Hasher {
    /// Hasher that probes for the best backend on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hasher pinned to a backend, skipping the probe.
    pub fn with_backend(backend: HashBackend) -> Self {
        Self {
            backend: OnceCell::new_with(Some(backend)),
        }
    }

    pub async fn backend(&self) -> &HashBackend {
        self.backend.get_or_init(select_backend).await
    }

    /// Hex fingerprint of `data`.
    pub async fn hash(&self, data: &[u8]) -> String {
        match self.backend().await {
            HashBackend::External { program, args } => {
                match run_external(program, args, data).await {
                    Ok(digest) => digest,
                    Err(err) => {
                        warn!(
                            target: "pasteup_services::hasher",
                            program = %program,
                            error = %err,
                            "external hash tool failed, falling back to in-process hash"
                        );
                        hash_in_process(&HashBackend::in_process(), data)
                    }
                }
            }
            backend => hash_in_process(backend, data),
        }
    }
}

fn hash_in_process(backend: &HashBackend, data: &[u8]) -> String {
    if let HashBackend::Native(alg) = backend
        && let Some(digest) = alg.digest(data)
    {
        return digest;
    }
    hex::encode(Sha256::digest(data))
}

async fn select_backend() -> HashBackend {
    for (program, args) in EXTERNAL_TOOLS {
        if probe(program).await {
            debug!(target: "pasteup_services::hasher", program, "using external hash tool");
            return HashBackend::External {
                program: (*program).to_owned(),
                args: args.iter().map(|a| (*a).to_owned()).collect(),
            };
        }
    }

    let backend = HashBackend::in_process();
    debug!(target: "pasteup_services::hasher", ?backend, "using in-process hash");
    backend
}

async fn probe(program: &str) -> bool {
    let child = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    matches!(
        tokio::time::timeout(PROBE_TIMEOUT, child).await,
        Ok(Ok(status)) if status.success()
    )
}

async fn run_external(program: &str, args: &[String], data: &[u8]) -> std::io::Result<String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(data).await?;
        stdin.shutdown().await?;
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(std::io::Error::other(format!(
            "{program} exited with {}",
            output.status
        )));
    }

    parse_digest(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{program} printed no digest"),
        )
    })
}

/// First token of tool output, without an algorithm prefix such as `XXH3_`.
fn parse_digest(output: &str) -> Option<String> {
    let token = output.split_whitespace().next()?;
    let hex = token.rsplit('_').next().unwrap_or(token);
    (!hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())).then(|| hex.to_lowercase())
}
