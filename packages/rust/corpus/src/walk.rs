//! Candidate document enumeration.

use std::path::{Path, PathBuf};

use tracing::debug;

use topiclens_shared::{Result, TopicLensError};

/// List the documents at `location`.
///
/// A file is returned as-is, whatever its extension. A directory yields the
/// files whose extension is in `extensions` (already lowercased, no dot),
/// skipping hidden entries, in ascending path order.
pub fn enumerate(
    location: &Path,
    extensions: &[String],
    recursive: bool,
) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(location).map_err(|e| TopicLensError::io(location, e))?;

    if meta.is_file() {
        return Ok(vec![location.to_path_buf()]);
    }

    let mut found = Vec::new();
    walk_dir(location, extensions, recursive, &mut found)?;
    found.sort();

    debug!(
        location = %location.display(),
        matched = found.len(),
        recursive,
        "enumerated candidate documents"
    );

    Ok(found)
}

fn walk_dir(
    dir: &Path,
    extensions: &[String],
    recursive: bool,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| TopicLensError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| TopicLensError::io(dir, e))?;
        let path = entry.path();

        if is_hidden(&path) {
            continue;
        }

        let file_type = entry.file_type().map_err(|e| TopicLensError::io(&path, e))?;
        if file_type.is_dir() {
            if recursive {
                walk_dir(&path, extensions, recursive, out)?;
            }
            continue;
        }

        // Follow symlinks to files; dangling links are skipped.
        if !path.is_file() {
            continue;
        }

        if has_extension(&path, extensions) {
            out.push(path);
        }
    }

    Ok(())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            let e = e.to_ascii_lowercase();
            extensions.iter().any(|x| *x == e)
        })
}
