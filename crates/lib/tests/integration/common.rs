//! Shared helpers for the library integration tests.

use std::path::{Path, PathBuf};

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
  let path = root.join(rel);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, content).unwrap();
  path
}

/// Install an executable shell script named `name` in `dir`.
#[cfg(unix)]
pub fn stub_executable(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = write_file(dir, name, &format!("#!/bin/sh\n{}\n", body));
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path
}

/// Sorted entry names of a zip archive.
pub fn zip_entry_names(path: &Path) -> Vec<String> {
  let file = std::fs::File::open(path).unwrap();
  let mut archive = zip::ZipArchive::new(file).unwrap();
  let mut names: Vec<String> = (0..archive.len())
    .map(|i| archive.by_index(i).unwrap().name().to_string())
    .collect();
  names.sort();
  names
}
