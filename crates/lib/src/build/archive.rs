//! Deterministic zip packaging.
//!
//! Archives contain regular files only, with `/`-separated relative names in sorted
//! order, a fixed timestamp (1980-01-01) and normalized permissions (0755 for
//! executables, 0644 otherwise). The same inputs therefore produce byte-identical
//! archives, which keeps artifact checksums stable across rebuilds.
//!
//! Archives are written to a temporary file next to the destination and renamed
//! into place, so a reader never observes a partial archive.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::BuildError;
use crate::consts::PACKAGE_SKIP_SUFFIXES;

/// Whether a file or directory name is excluded from packaging.
pub fn should_skip(name: &str) -> bool {
  PACKAGE_SKIP_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Package the contents of `roots` into a zip at `output`.
///
/// Each root contributes its files relative to itself; a symlink to a regular file
/// is packaged with the target's contents. When two roots contain the
/// same relative path, the later root wins. `exclude` (typically the output itself
/// when it lives inside a root) is never packaged.
pub fn package_zip(output: &Path, roots: &[&Path], exclude: Option<&Path>) -> Result<(), BuildError> {
  let entries = collect_entries(roots, exclude)?;
  debug!(output = %output.display(), entries = entries.len(), "writing archive");

  let parent = output.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
  fs::create_dir_all(parent)?;
  let mut tmp = tempfile::NamedTempFile::new_in(parent)?;

  {
    let mut zip = ZipWriter::new(tmp.as_file_mut());
    for (name, source) in &entries {
      let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(file_mode(source)?);
      zip.start_file(name.as_str(), options)?;
      let mut file = File::open(source)?;
      io::copy(&mut file, &mut zip)?;
      trace!(entry = %name, "added");
    }
    zip.finish()?;
  }

  tmp.persist(output).map_err(|e| e.error)?;
  Ok(())
}

/// Copy `source` to `output` through a temporary file in the destination directory.
pub fn install_file(source: &Path, output: &Path) -> Result<(), BuildError> {
  let parent = output.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
  fs::create_dir_all(parent)?;
  let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
  io::copy(&mut File::open(source)?, tmp.as_file_mut())?;
  tmp.persist(output).map_err(|e| e.error)?;
  Ok(())
}

fn collect_entries(roots: &[&Path], exclude: Option<&Path>) -> Result<BTreeMap<String, PathBuf>, BuildError> {
  let mut entries = BTreeMap::new();
  for root in roots {
    let walker = WalkDir::new(root)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|e| e.depth() == 0 || !should_skip(&e.file_name().to_string_lossy()));

    for entry in walker {
      let entry = entry.map_err(io::Error::from)?;
      let file_type = entry.file_type();
      let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
      if !is_file {
        continue;
      }
      if exclude.is_some_and(|ex| ex == entry.path()) {
        continue;
      }
      let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
      let name = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
      entries.insert(name, entry.path().to_path_buf());
    }
  }
  Ok(entries)
}

#[cfg(unix)]
fn file_mode(path: &Path) -> io::Result<u32> {
  use std::os::unix::fs::PermissionsExt;
  let mode = fs::metadata(path)?.permissions().mode();
  Ok(if mode & 0o111 != 0 { 0o755 } else { 0o644 })
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> io::Result<u32> {
  Ok(0o644)
}
