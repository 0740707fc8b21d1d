//! Content fingerprints for artifacts and source trees.
//!
//! - `Fingerprint`: hex SHA-256 digest identifying content
//! - `fingerprint_dir()`: deterministic digest of a source tree, used as the build cache key
//! - `fingerprint_file()`: digest of a single file, used as an artifact checksum
//! - `fingerprint_bytes()`: digest of arbitrary bytes

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

/// Length of the abbreviated form shown in logs and events.
const SHORT_LEN: usize = 12;

/// Lowercase hex SHA-256 digest (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// First 12 hex characters, for display.
  pub fn short(&self) -> &str {
    &self.0[..self.0.len().min(SHORT_LEN)]
  }
}

impl std::fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Error)]
pub enum FingerprintError {
  #[error("failed to walk {}: {source}", .root.display())]
  Walk {
    root: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to read {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Digest a directory tree.
///
/// Covers relative paths and file contents; ignores timestamps and permissions.
/// A symlink to a regular file contributes the target's contents, any other
/// symlink contributes its target path.
///
/// `exclude` holds paths relative to `root` (`/`-separated); each is skipped with
/// everything below it. Entries whose file name satisfies `skip_name` are skipped
/// at any depth.
pub fn fingerprint_dir(
  root: &Path,
  exclude: &[&str],
  skip_name: impl Fn(&str) -> bool,
) -> Result<Fingerprint, FingerprintError> {
  let relative = |path: &Path| {
    path
      .strip_prefix(root)
      .unwrap_or(path)
      .components()
      .map(|c| c.as_os_str().to_string_lossy())
      .collect::<Vec<_>>()
      .join("/")
  };
  let walker = WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|e| {
    e.depth() == 0 || !(skip_name(&e.file_name().to_string_lossy()) || exclude.contains(&relative(e.path()).as_str()))
  });

  let mut lines: Vec<String> = Vec::new();
  for entry in walker {
    let entry = entry.map_err(|source| FingerprintError::Walk {
      root: root.to_path_buf(),
      source,
    })?;
    if entry.depth() == 0 {
      continue;
    }

    let rel = relative(entry.path());
    let file_type = entry.file_type();
    let line = if file_type.is_file() || (file_type.is_symlink() && entry.path().is_file()) {
      format!("F:{}:{}", rel, fingerprint_file(entry.path())?)
    } else if file_type.is_dir() {
      format!("D:{}", rel)
    } else if file_type.is_symlink() {
      let target = fs::read_link(entry.path()).map_err(|source| FingerprintError::Read {
        path: entry.path().to_path_buf(),
        source,
      })?;
      format!("L:{}:{}", rel, fingerprint_bytes(target.to_string_lossy().as_bytes()))
    } else {
      continue;
    };
    lines.push(line);
  }

  let mut hasher = Sha256::new();
  for line in lines {
    hasher.update(line.as_bytes());
    hasher.update(b"\n");
  }
  Ok(Fingerprint(hex::encode(hasher.finalize())))
}

/// Digest a single file's contents.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint, FingerprintError> {
  let read_err = |source| FingerprintError::Read {
    path: path.to_path_buf(),
    source,
  };
  let mut file = fs::File::open(path).map_err(read_err)?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];
  loop {
    let n = file.read(&mut buffer).map_err(read_err)?;
    if n == 0 {
      break;
    }
    hasher.update(&buffer[..n]);
  }
  Ok(Fingerprint(hex::encode(hasher.finalize())))
}

pub fn fingerprint_bytes(data: &[u8]) -> Fingerprint {
  Fingerprint(hex::encode(Sha256::digest(data)))
}
