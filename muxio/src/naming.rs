//! Final container name resolution.
//!
//! The merged file is named after the video stream's filename, which may
//! carry percent-encoding inherited from its download URL and may need its
//! extension rewritten for the target container. Collisions with existing
//! files resolve by suffixing `_1`, `_2`, … before the extension.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::Result;
use crate::config::Settings;

/// Extension rewrites applied before collision resolution.
#[derive(Debug, Clone)]
pub struct ExtensionOverrides {
    map: HashMap<String, String>,
}

impl Default for ExtensionOverrides {
    /// WebM video cannot be stream-copied into an MP4-family container, but
    /// can into Matroska.
    fn default() -> Self {
        Self::new().with("webm", "mkv")
    }
}

impl ExtensionOverrides {
    /// An empty mapping: extensions pass through unchanged.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn with(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.map.insert(from.into(), to.into());
        self
    }

    fn apply(&self, ext: &str) -> String {
        self.map
            .get(ext)
            .cloned()
            .unwrap_or_else(|| ext.to_string())
    }
}

/// Claim on a resolved final path, held as an empty placeholder file.
#[derive(Debug)]
pub struct ReservedName {
    path: PathBuf,
}

impl ReservedName {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the placeholder and hand the path over to the writer.
    ///
    /// The merge tool's invocation carries no overwrite flag, so the
    /// placeholder cannot stay in place; the claim narrows to the
    /// unlink-to-spawn window.
    pub fn yield_to_writer(self) -> Result<PathBuf> {
        std::fs::remove_file(&self.path)?;
        Ok(self.path)
    }

    /// Release the claim without producing a file.
    pub fn release(self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Derive the final container path for `source_file_name` in `target_dir`.
///
/// The source name is percent-decoded, its extension rewritten through
/// `overrides`, the directory redirected into a `Videos` subfolder when it
/// is the configured download directory and subfolders are enabled, and the
/// first non-existing candidate returned. Existence is only checked, never
/// claimed; use [`reserve_final_name`] to claim atomically.
pub fn resolve_final_name(
    source_file_name: &str,
    target_dir: &Path,
    overrides: &ExtensionOverrides,
    settings: &Settings,
) -> PathBuf {
    let (dir, stem, ext) = prepare(source_file_name, target_dir, overrides, settings);

    let mut n = 0;
    loop {
        let path = candidate(&dir, &stem, ext.as_deref(), n);
        if !path.is_file() {
            debug!(path = %path.display(), "resolved final name");
            return path;
        }
        n += 1;
    }
}

/// Like [`resolve_final_name`], but claim the winning candidate with an
/// exclusive-create placeholder so a concurrent resolution cannot pick the
/// same name. Creates the target directory if needed.
pub fn reserve_final_name(
    source_file_name: &str,
    target_dir: &Path,
    overrides: &ExtensionOverrides,
    settings: &Settings,
) -> Result<ReservedName> {
    let (dir, stem, ext) = prepare(source_file_name, target_dir, overrides, settings);
    std::fs::create_dir_all(&dir)?;

    let mut n = 0;
    loop {
        let path = candidate(&dir, &stem, ext.as_deref(), n);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                debug!(path = %path.display(), "reserved final name");
                return Ok(ReservedName { path });
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

fn prepare(
    source_file_name: &str,
    target_dir: &Path,
    overrides: &ExtensionOverrides,
    settings: &Settings,
) -> (PathBuf, String, Option<String>) {
    let decoded = decode_file_name(source_file_name);
    let (stem, ext) = split_name(&decoded);
    let ext = ext.map(|e| overrides.apply(&e));
    let dir = make_absolute(&target_directory(target_dir, settings));
    (dir, stem, ext)
}

/// Percent-decode a filename inherited from a download URL. Invalid byte
/// sequences are replaced rather than rejected.
fn decode_file_name(name: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(name.as_bytes())).into_owned()
}

/// Split on the last `.`; names without one have no extension.
fn split_name(name: &str) -> (String, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), Some(ext.to_string())),
        _ => (name.to_string(), None),
    }
}

/// Completed videos land in a `Videos` subfolder when saved directly under
/// the configured download directory with subfolders enabled.
fn target_directory(target_dir: &Path, settings: &Settings) -> PathBuf {
    if settings.use_subfolders && target_dir == settings.download_dir {
        target_dir.join("Videos")
    } else {
        target_dir.to_path_buf()
    }
}

fn candidate(dir: &Path, stem: &str, ext: Option<&str>, n: u32) -> PathBuf {
    let name = match (ext, n) {
        (Some(ext), 0) => format!("{stem}.{ext}"),
        (Some(ext), n) => format!("{stem}_{n}.{ext}"),
        (None, 0) => stem.to_string(),
        (None, n) => format!("{stem}_{n}"),
    };
    dir.join(name)
}

fn make_absolute(dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        return dir.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(dir),
        Err(_) => dir.to_path_buf(),
    }
}
