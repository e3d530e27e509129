use std::path::Path;

use crate::app::domain::document::{DataKind, Document, Import, Setting, TestCase, UserKeyword, Variable};
use crate::app::domain::stamp::FileStamp;
use crate::app::infrastructure::error::{AppError, Operation, Result};

/// Stable handle of a controller inside the chief's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(pub u64);

impl std::fmt::Display for ControllerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who a controller hangs off. Never an ownership link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLink {
    /// The top suite and every registered resource.
    Chief,
    Controller(ControllerId),
}

/// Wraps one [`Document`] and tracks how it relates to the file on disk.
///
/// Controllers are created and mutated only by the
/// [`ChiefController`](super::chief::ChiefController); everything here is
/// read access plus the on-disk comparison, which never mutates.
#[derive(Debug)]
pub struct DataController {
    pub(crate) id: ControllerId,
    pub(crate) data: Document,
    pub(crate) parent: Option<ParentLink>,
    pub(crate) children: Vec<ControllerId>,
    pub(crate) stamp: Option<FileStamp>,
    pub(crate) dirty: bool,
    pub(crate) removed: bool,
}

impl DataController {
    pub(crate) fn new(
        id: ControllerId,
        data: Document,
        parent: Option<ParentLink>,
        children: Vec<ControllerId>,
        stamp: Option<FileStamp>,
    ) -> Self {
        Self {
            id,
            data,
            parent,
            children,
            stamp,
            dirty: false,
            removed: false,
        }
    }

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn kind(&self) -> DataKind {
        self.data.kind
    }

    pub fn data(&self) -> &Document {
        &self.data
    }

    pub fn parent(&self) -> Option<ParentLink> {
        self.parent
    }

    pub fn children(&self) -> &[ControllerId] {
        &self.children
    }

    pub fn stamp(&self) -> Option<FileStamp> {
        self.stamp
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn source(&self) -> Option<&Path> {
        self.data.source.as_deref()
    }

    pub fn directory(&self) -> &Path {
        &self.data.directory
    }

    /// The path identifying this controller in a directory listing.
    pub fn location(&self) -> &Path {
        match (self.data.kind, self.data.source.as_deref()) {
            (DataKind::Directory, _) | (_, None) => self.data.directory.as_path(),
            (_, Some(source)) => source,
        }
    }

    /// The path whose stamp tells whether the data changed on disk.
    pub fn stamp_path(&self) -> &Path {
        self.data.source.as_deref().unwrap_or(&self.data.directory)
    }

    /// Whether the data is backed by a file of its own. False only for a
    /// directory suite without an init file.
    pub fn has_format(&self) -> bool {
        self.data.source.is_some()
    }

    pub fn display_name(&self) -> String {
        self.data.display_name()
    }

    pub fn settings(&self) -> Vec<&Setting> {
        self.data.setting_table.settings().collect()
    }

    pub fn imports(&self) -> Vec<&Import> {
        self.data.setting_table.imports().collect()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.data.variable_table
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.data.testcase_table
    }

    pub fn keywords(&self) -> &[UserKeyword] {
        &self.data.keyword_table
    }

    /// Compare a fresh stamp of [`stamp_path`](Self::stamp_path) with the
    /// stored one. Never updates the stored stamp.
    ///
    /// A removed controller is never modified. A controller that was never
    /// written is modified only once its file appears. Otherwise a missing
    /// file is reported as `NotFound`.
    pub fn has_been_modified_on_disk(&self) -> Result<bool> {
        if self.removed {
            return Ok(false);
        }
        let path = self.stamp_path();
        let Some(stored) = self.stamp else {
            return Ok(path.exists());
        };
        let current = FileStamp::of(path).map_err(|e| AppError::io(Operation::CheckModified, path, e))?;
        let changed = current != stored;
        tracing::debug!(controller = %self.id, path = %path.display(), changed, "stamp check");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::path::PathBuf;
    use std::time::{Duration, UNIX_EPOCH};

    fn file_controller(path: &Path) -> DataController {
        let doc = Document::new(
            DataKind::TestCaseFile,
            Some(path.to_path_buf()),
            path.parent().unwrap().to_path_buf(),
        );
        let stamp = FileStamp::of(path).ok();
        DataController::new(ControllerId(1), doc, Some(ParentLink::Chief), Vec::new(), stamp)
    }

    #[test]
    fn test_unmodified_until_mtime_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.txt");
        fs::write(&path, "*Test Cases*\nT  No Operation\n").unwrap();
        let ctrl = file_controller(&path);
        assert!(!ctrl.has_been_modified_on_disk().unwrap());

        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(UNIX_EPOCH + Duration::from_secs(1))
            .unwrap();
        assert!(ctrl.has_been_modified_on_disk().unwrap());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.txt");
        fs::write(&path, "x").unwrap();
        let ctrl = file_controller(&path);
        fs::remove_file(&path).unwrap();

        let err = ctrl.has_been_modified_on_disk().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_never_written_controller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.resource");
        let doc = Document::empty_resource(&path);
        let ctrl = DataController::new(ControllerId(2), doc, Some(ParentLink::Chief), Vec::new(), None);
        assert!(!ctrl.has_been_modified_on_disk().unwrap());

        fs::write(&path, "*Keywords*\n").unwrap();
        assert!(ctrl.has_been_modified_on_disk().unwrap());
    }

    #[test]
    fn test_removed_controller_is_never_modified() {
        let mut ctrl = file_controller(Path::new("/gone/tests.txt"));
        ctrl.stamp = Some(FileStamp::new(UNIX_EPOCH, 3));
        ctrl.removed = true;
        assert!(!ctrl.has_been_modified_on_disk().unwrap());
    }

    #[test]
    fn test_directory_paths() {
        let doc = Document::directory(Path::new("/project"));
        let mut ctrl = DataController::new(ControllerId(3), doc, None, Vec::new(), None);
        assert_eq!(ctrl.location(), Path::new("/project"));
        assert_eq!(ctrl.stamp_path(), Path::new("/project"));
        assert!(!ctrl.has_format());

        ctrl.data.source = Some(PathBuf::from("/project/__init__.robot"));
        assert_eq!(ctrl.location(), Path::new("/project"));
        assert_eq!(ctrl.stamp_path(), Path::new("/project/__init__.robot"));
        assert!(ctrl.has_format());
    }
}
