//! Caller-supplied settings consumed by the final-assembly stage.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The two settings-store keys this stage reads, passed in explicitly
/// instead of consulted through ambient application state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// The user's configured base download directory.
    pub download_dir: PathBuf,

    /// Whether completed videos are sorted into a `Videos` subfolder when
    /// they land directly under the base download directory.
    #[serde(default)]
    pub use_subfolders: bool,
}

impl Settings {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            use_subfolders: false,
        }
    }

    pub fn with_subfolders(mut self, enabled: bool) -> Self {
        self.use_subfolders = enabled;
        self
    }
}
