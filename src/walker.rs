use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A discovered image file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the scan root.
    pub relative_path: PathBuf,
    /// Fully resolved absolute path.
    pub absolute_path: PathBuf,
    /// Last modification time, at the filesystem's full precision.
    pub mtime: DateTime<Utc>,
}

impl DiscoveredFile {
    /// The key this file is stored under.
    pub fn key(&self) -> String {
        self.absolute_path.to_string_lossy().into_owned()
    }
}

/// Image extensions handed to the recognizer, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "tiff", "bmp", "gif"];

/// Recursively walk a directory and discover image files.
///
/// Files without a recognized image extension are skipped silently.
/// Subdirectories and files that cannot be read are logged and skipped;
/// only a missing or unreadable root is an error.
/// Results are sorted by relative path.
pub fn discover_files(root: &Path) -> Result<Vec<DiscoveredFile>> {
    if !root.is_dir() {
        return Err(Error::Config(format!(
            "not a directory: {}",
            root.display()
        )));
    }

    let canonical_root = root.canonicalize()?;
    // An unreadable root is still fatal.
    std::fs::read_dir(&canonical_root)?;

    let mut results = Vec::new();
    walk_dir(&canonical_root, &canonical_root, &mut results);
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}

fn walk_dir(root: &Path, current: &Path, results: &mut Vec<DiscoveredFile>) {
    let entries = match std::fs::read_dir(current) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                dir = %current.display(),
                error = %e,
                "skipping unreadable directory"
            );
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(
                    dir = %current.display(),
                    error = %e,
                    "skipping unreadable entry"
                );
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping entry");
                continue;
            }
        };

        if file_type.is_dir() {
            walk_dir(root, &path, results);
        } else if file_type.is_symlink() {
            let resolved = match path.canonicalize() {
                Ok(p) => p,
                Err(_) => continue, // broken symlink
            };
            // Linked directories are not followed.
            if resolved.is_file() && is_image(&path) {
                push_discovered(root, &path, &resolved, results);
            }
        } else if file_type.is_file() && is_image(&path) {
            match path.canonicalize() {
                Ok(abs) => push_discovered(root, &path, &abs, results),
                Err(e) => {
                    debug!(
                        path = %path.display(),
                        error = %e,
                        "file vanished during scan"
                    );
                }
            }
        }
    }
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn push_discovered(
    root: &Path,
    original_path: &Path,
    absolute_path: &Path,
    results: &mut Vec<DiscoveredFile>,
) {
    match make_discovered(root, original_path, absolute_path) {
        Ok(file) => results.push(file),
        Err(e) => {
            debug!(
                path = %absolute_path.display(),
                error = %e,
                "skipping file"
            );
        }
    }
}

fn make_discovered(
    root: &Path,
    original_path: &Path,
    absolute_path: &Path,
) -> Result<DiscoveredFile> {
    let relative_path = original_path
        .strip_prefix(root)
        .unwrap_or(original_path)
        .to_path_buf();

    let mtime = std::fs::metadata(absolute_path)?
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::UNIX_EPOCH);

    Ok(DiscoveredFile {
        relative_path,
        absolute_path: absolute_path.to_path_buf(),
        mtime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(files: &[DiscoveredFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.relative_path.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn keeps_only_images_ignoring_case() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.png"), "png").unwrap();
        std::fs::write(tmp.path().join("b.txt"), "text").unwrap();
        std::fs::write(tmp.path().join("c.JPG"), "jpg").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["a.png", "c.JPG"]);
    }

    #[test]
    fn every_image_extension_is_recognized() {
        for ext in IMAGE_EXTENSIONS {
            assert!(is_image(Path::new(&format!("scan.{ext}"))));
            assert!(is_image(Path::new(&format!(
                "SCAN.{}",
                ext.to_uppercase()
            ))));
        }
        assert!(!is_image(Path::new("photo.webp")));
        assert!(!is_image(Path::new("png")));
        assert!(!is_image(Path::new("noext")));
    }

    #[test]
    fn recurses_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("2024").join("march");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("deep.gif"), "gif").unwrap();
        std::fs::write(tmp.path().join("top.bmp"), "bmp").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["2024/march/deep.gif", "top.bmp"]);
    }

    #[test]
    fn absolute_path_is_canonical() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.png"), "png").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        let expected = tmp.path().canonicalize().unwrap().join("a.png");
        assert_eq!(files[0].absolute_path, expected);
        assert_eq!(files[0].key(), expected.to_string_lossy());
    }

    #[test]
    fn mtime_is_nonzero() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("file.jpeg"), "content").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].mtime > DateTime::UNIX_EPOCH);
    }

    #[test]
    fn results_are_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("z.png"), "z").unwrap();
        std::fs::write(tmp.path().join("a.png"), "a").unwrap();
        std::fs::write(tmp.path().join("m.png"), "m").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["a.png", "m.png", "z.png"]);
    }

    #[test]
    fn empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let files = discover_files(tmp.path()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = discover_files(&tmp.path().join("gone")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_is_not_followed() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("a.png"), "a").unwrap();
        std::os::unix::fs::symlink(tmp.path(), sub.join("loop")).unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["sub/a.png"]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.png"), "a").unwrap();
        let locked = tmp.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::write(locked.join("hidden.png"), "h").unwrap();
        let mode = |bits| std::fs::Permissions::from_mode(bits);
        std::fs::set_permissions(&locked, mode(0o000)).unwrap();

        // Root ignores permission bits, so the directory may still list.
        let still_readable = std::fs::read_dir(&locked).is_ok();
        let result = discover_files(tmp.path());

        std::fs::set_permissions(&locked, mode(0o755)).unwrap();

        let files = result.unwrap();
        if still_readable {
            assert_eq!(names(&files), vec!["a.png", "locked/hidden.png"]);
        } else {
            assert_eq!(names(&files), vec!["a.png"]);
        }
    }
}
