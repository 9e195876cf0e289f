//! Filesystem operations
//!
//! Recursive tree copies and glob-pattern file selection used by the
//! target runners and the install composer.

use std::path::{Path, PathBuf};

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents, ignoring a missing directory
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::RemoveDir {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Copy a single file, creating parent directories of the destination
pub fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    std::fs::copy(from, to).map_err(|e| FilesystemError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(())
}

/// Recursively copy the contents of `from` into `to`
///
/// Symlinks are followed; `to` is created if absent.
pub fn copy_dir_all(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    create_dir_all(to)?;
    for entry in walkdir::WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(|e| FilesystemError::ReadDir {
            path: from.to_path_buf(),
            error: e.to_string(),
        })?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .expect("walkdir yields paths under its root");
        if rel.as_os_str().is_empty() {
            continue;
        }
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            create_dir_all(&dest)?;
        } else {
            copy_file(entry.path(), &dest)?;
        }
    }
    Ok(())
}

/// Find files under `root` matching a relative glob pattern
///
/// Supports a single `*` wildcard in the final path component, e.g.
/// `lib/*.so`. Components before the last are taken literally.
pub fn glob_files(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, FilesystemError> {
    let pattern_path = Path::new(pattern);
    let file_pattern = pattern_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = match pattern_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => root.join(p),
        _ => root.to_path_buf(),
    };

    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(&dir).map_err(|e| FilesystemError::ReadDir {
        path: dir.clone(),
        error: e.to_string(),
    })?;

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FilesystemError::ReadDir {
            path: dir.clone(),
            error: e.to_string(),
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if matches_pattern(&name, &file_pattern) && entry.path().is_file() {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches)
}

/// Match a file name against a pattern with at most one `*` wildcard
fn matches_pattern(name: &str, pattern: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
        None => name == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_all_preserves_structure() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(src.join("sub")).unwrap();
        std::fs::write(src.join("a.txt"), "a").unwrap();
        std::fs::write(src.join("sub/b.txt"), "b").unwrap();

        let dst = temp.path().join("dst");
        copy_dir_all(&src, &dst).unwrap();

        assert_eq!(std::fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
        assert_eq!(std::fs::read_to_string(dst.join("sub/b.txt")).unwrap(), "b");
    }

    #[test]
    fn test_glob_files_matches_extension() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("lib")).unwrap();
        std::fs::write(temp.path().join("lib/libsdl.so"), "").unwrap();
        std::fs::write(temp.path().join("lib/libpng.so"), "").unwrap();
        std::fs::write(temp.path().join("lib/readme.txt"), "").unwrap();

        let found = glob_files(temp.path(), "lib/*.so").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.extension().unwrap() == "so"));
    }

    #[test]
    fn test_glob_files_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let found = glob_files(temp.path(), "nope/*.so").unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("libfoo.so", "*.so"));
        assert!(matches_pattern("libfoo.so", "lib*.so"));
        assert!(!matches_pattern("libfoo.dll", "*.so"));
        assert!(matches_pattern("exact", "exact"));
        assert!(!matches_pattern("so", "lib*.so"));
    }
}
