use crate::error::{Result, StitchError};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads the contents of a file at the given path
///
/// The handle is closed before this returns, so callers can recurse into the
/// contents without holding it open.
///
/// # Errors
///
/// - `StitchError::FileNotFound` if the path doesn't exist or isn't a file.
/// - `StitchError::ReadFile` if the file can't be read as UTF-8 text.
pub fn read_file_contents(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(StitchError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    fs::read_to_string(path).map_err(|source| StitchError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves an include path against the directory of the including file
///
/// The result is canonical, so two spellings of the same file (`a/../b.txt`,
/// symlinks) compare equal in the inclusion chain.
///
/// # Errors
///
/// Returns `StitchError::FileNotFound` with the joined path if it can't be
/// canonicalized, which happens when it doesn't exist.
pub fn resolve_include_path(include: &str, base_dir: &Path) -> Result<PathBuf> {
    let full_path = base_dir.join(include);
    full_path
        .canonicalize()
        .map_err(|_| StitchError::FileNotFound { path: full_path })
}

/// Directory that paths inside `file` are resolved against
#[must_use]
pub fn include_base_dir(file: &Path) -> PathBuf {
    file.parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_file_contents() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");

        fs::write(&file_path, "test content").unwrap();
        let result = read_file_contents(&file_path);
        assert_eq!(result.unwrap(), "test content");

        let non_existent = temp_dir.path().join("nonexistent.txt");
        let result = read_file_contents(&non_existent);
        assert!(matches!(result, Err(StitchError::FileNotFound { .. })));

        // Directory is not an includable file
        let dir_path = temp_dir.path().join("dir");
        fs::create_dir(&dir_path).unwrap();
        let result = read_file_contents(&dir_path);
        assert!(matches!(result, Err(StitchError::FileNotFound { .. })));
    }

    #[test]
    fn test_read_file_contents_invalid_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("blob.bin");
        fs::write(&file_path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let result = read_file_contents(&file_path);
        assert!(matches!(result, Err(StitchError::ReadFile { .. })));
    }

    #[test]
    fn test_read_file_contents_unicode() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("unicode.txt");

        let content = "Hello 世界 🌍 Здравствуй";
        fs::write(&file_path, content).unwrap();
        assert_eq!(read_file_contents(&file_path).unwrap(), content);
    }

    #[test]
    fn test_resolve_include_path_relative() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        fs::create_dir_all(base.join("sub")).unwrap();
        let file_path = base.join("sub/D.txt");
        fs::write(&file_path, "d").unwrap();

        let resolved = resolve_include_path("sub/D.txt", base).unwrap();
        assert_eq!(resolved, file_path.canonicalize().unwrap());
        assert!(resolved.is_absolute());
    }

    #[test]
    fn test_resolve_include_path_normalizes_parent_components() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        fs::create_dir_all(base.join("a")).unwrap();
        fs::create_dir_all(base.join("b")).unwrap();
        let target = base.join("b/x.txt");
        fs::write(&target, "x").unwrap();

        // Both spellings must land on the same chain entry
        let via_parent = resolve_include_path("../b/x.txt", &base.join("a")).unwrap();
        let direct = resolve_include_path("b/x.txt", base).unwrap();
        assert_eq!(via_parent, direct);
    }

    #[test]
    fn test_resolve_include_path_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        let result = resolve_include_path("missing.txt", base);
        match result {
            Err(StitchError::FileNotFound { path }) => {
                assert_eq!(path, base.join("missing.txt"));
            }
            other => panic!("expected FileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_include_base_dir() {
        assert_eq!(
            include_base_dir(Path::new("/dir/sub/D.txt")),
            PathBuf::from("/dir/sub")
        );
        assert_eq!(include_base_dir(Path::new("/")), PathBuf::from("."));
    }
}
