use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Canonical form of `path` used as the resource registry key.
///
/// Falls back to canonicalizing the parent when the file itself does not
/// exist yet, and to a lexical cleanup when neither exists.
pub fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    let cleaned = lexical_normalize(path);
    if let (Some(parent), Some(name)) = (cleaned.parent(), cleaned.file_name())
        && let Ok(parent) = fs::canonicalize(parent)
    {
        return parent.join(name);
    }
    cleaned
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Remove a file, treating an already-missing file as success.
/// Returns whether a file was actually deleted.
pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Write `content` next to `path` first and rename it into place, so a
/// failed write never leaves a truncated data file behind.
pub fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, content)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_normalize() {
        assert_eq!(
            lexical_normalize(Path::new("/a/b/../c/./d.robot")),
            PathBuf::from("/a/c/d.robot")
        );
        assert_eq!(lexical_normalize(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn test_canonical_path_of_missing_file_uses_parent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("sub").join("..").join("missing.resource");
        let canonical = canonical_path(&missing);
        assert_eq!(
            canonical,
            fs::canonicalize(dir.path()).unwrap().join("missing.resource")
        );
    }

    #[test]
    fn test_remove_file_if_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        fs::write(&path, "x").unwrap();
        assert!(remove_file_if_exists(&path).unwrap());
        assert!(!remove_file_if_exists(&path).unwrap());
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.robot");
        fs::write(&path, "old").unwrap();
        write_atomic(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert!(!dir.path().join(".suite.robot.tmp").exists());
    }
}
