//! Test helpers: fixture trees and stub toolchain executables.

use std::fs;
use std::path::{Path, PathBuf};

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
  let path = root.join(rel);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(&path, content).unwrap();
  path
}

/// Create an executable shell script named `name` in `dir` with the given body.
#[cfg(unix)]
pub fn stub_executable(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join(name);
  fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
  fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  path
}

/// Sorted entry names of a zip archive.
pub fn zip_entry_names(path: &Path) -> Vec<String> {
  let file = fs::File::open(path).unwrap();
  let archive = zip::ZipArchive::new(file).unwrap();
  let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
  names.sort();
  names
}

/// Contents of one entry of a zip archive.
pub fn zip_entry(path: &Path, name: &str) -> String {
  use std::io::Read;

  let file = fs::File::open(path).unwrap();
  let mut archive = zip::ZipArchive::new(file).unwrap();
  let mut entry = archive.by_name(name).unwrap();
  let mut content = String::new();
  entry.read_to_string(&mut content).unwrap();
  content
}
