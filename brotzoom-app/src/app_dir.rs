//! Directory where the executable lives. Preferences and exported frames are
//! kept next to it so a copied binary carries its own state.

use std::path::PathBuf;

/// Directory containing the running executable. Falls back to the current
/// directory if unavailable.
pub fn exe_directory() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Default directory for exported frames.
pub fn images_directory() -> PathBuf {
    exe_directory().join("images")
}
