//! Filename normalization and collision-free allocation.
//!
//! `sanitize` never touches the filesystem; `allocate_unique` only checks for
//! existence. Both walk the same candidate sequence as
//! [`FileStorage::place_unique`](super::FileStorage::place_unique), which is
//! the race-free variant used by uploads.

use super::StorageError;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Stem substituted when sanitization leaves nothing behind.
pub const FALLBACK_STEM: &str = "unnamed_file";

/// Suffixed names tried after the candidate itself is taken.
pub const MAX_SUFFIXES: u32 = 999;

// Letters, digits, underscore, hyphen and CJK unified ideographs survive in
// the stem. Marks and joiners are not letters and get replaced.
static STEM_REJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{L}\p{N}_\x{4E00}-\x{9FFF}-]").expect("stem pattern is valid")
});

// The extension additionally keeps its dot.
static EXT_REJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}_.-]").expect("extension pattern is valid"));

static UNDERSCORE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("underscore pattern is valid"));

/// Split a filename into `(stem, extension)`, the extension keeping its dot.
///
/// A dot only starts an extension when it is neither the first nor the last
/// character, so `".bashrc"` and `"notes."` have no extension.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Normalize a client-supplied filename to a filesystem- and URL-safe one.
///
/// Empty input comes back empty; callers reject empty names before this.
pub fn sanitize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let (stem, ext) = split_name(raw);

    let stem = STEM_REJECT.replace_all(stem, "_");
    let stem = UNDERSCORE_RUN.replace_all(&stem, "_");
    let stem = stem.trim_matches('_');
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };

    let ext = EXT_REJECT.replace_all(ext, "_");

    format!("{stem}{ext}")
}

/// The candidate sequence for `name`: the name itself, then `stem_01.ext`,
/// `stem_02.ext`, ... up to [`MAX_SUFFIXES`] suffixed variants.
pub fn candidates(name: &str) -> impl Iterator<Item = String> + '_ {
    let (stem, ext) = split_name(name);
    std::iter::once(name.to_string())
        .chain((1..=MAX_SUFFIXES).map(move |n| format!("{stem}_{n:02}{ext}")))
}

/// Return the first name in the candidate sequence with no entry in `directory`.
///
/// This is a point-in-time answer: another writer may take the name before
/// the caller uses it. Uploads go through `FileStorage::place_unique`, which
/// claims the name atomically instead.
pub fn allocate_unique(directory: &Path, candidate: &str) -> Result<String, StorageError> {
    candidates(candidate)
        .find(|name| !entry_exists(&directory.join(name)))
        .ok_or_else(|| StorageError::ResourceExhausted {
            candidate: candidate.to_string(),
            attempts: MAX_SUFFIXES,
        })
}

// Dangling symlinks still occupy the name.
fn entry_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
