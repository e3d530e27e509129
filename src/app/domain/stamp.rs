use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Last-known modification time and size of a file.
///
/// Two stamps are equal only if both fields match. This is a cheap heuristic,
/// not a content hash: an edit that keeps the size and lands in the same
/// timer tick goes unnoticed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    mtime: SystemTime,
    size: u64,
}

impl FileStamp {
    pub fn new(mtime: SystemTime, size: u64) -> Self {
        Self { mtime, size }
    }

    /// Stat `path` and capture its stamp.
    pub fn of(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            mtime: meta.modified()?,
            size: meta.len(),
        })
    }

    pub fn mtime(&self) -> SystemTime {
        self.mtime
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_stamp_matches_until_touched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.robot");
        fs::write(&path, "*** Test Cases ***\n").unwrap();

        let before = FileStamp::of(&path).unwrap();
        assert_eq!(before, FileStamp::of(&path).unwrap());

        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(UNIX_EPOCH + Duration::from_secs(1))
            .unwrap();
        let after = FileStamp::of(&path).unwrap();
        assert_ne!(before, after);
        assert_eq!(before.size(), after.size());
    }

    #[test]
    fn test_size_change_alone_differs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.robot");
        fs::write(&path, "abc").unwrap();
        let before = FileStamp::of(&path).unwrap();

        let mut file = File::options().append(true).open(&path).unwrap();
        file.write_all(b"#Ninja edit\n").unwrap();
        drop(file);
        let touched = FileStamp::of(&path).unwrap();
        let same_time = FileStamp::new(before.mtime(), touched.size());

        assert_ne!(before, same_time);
    }

    #[test]
    fn test_missing_file() {
        let err = FileStamp::of(Path::new("/definitely/not/here.robot")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
