//! Media artifact helpers
//!
//! Runtime-produced files (written by yt-dlp after deployment) cannot go
//! through a generic static-file layer, so the media endpoints resolve names
//! against a single fixed root and recognize only the extensions the
//! pipeline actually produces. Unknown extensions fall back to a generic
//! binary type.

use std::path::{Path, PathBuf};

/// Content type for a produced artifact, from a fixed extension table.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" => "video/mp4",
        "m4a" => "audio/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mkv" => "video/x-matroska",
        "srt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Resolve a validated file name against the media root.
///
/// Callers must have already rejected traversal attempts via
/// [`crate::api::validation::is_valid_media_name`]; this only joins.
pub fn resolve(media_root: &Path, file_name: &str) -> PathBuf {
    media_root.join(file_name)
}
