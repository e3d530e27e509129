//! Builds detached trees of parsed documents from disk.
//!
//! Nothing here touches a controller: a load or reload first parses
//! everything it needs into a [`ParsedTree`], and the chief splices the
//! result in only once every file parsed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::app::domain::document::{DataKind, Document};
use crate::app::domain::settings::EditorSettings;
use crate::app::domain::stamp::FileStamp;
use crate::app::infrastructure::error::{AppError, Operation, Result};
use crate::app::services::parser;

/// A parsed document with its stamp and parsed child suites.
#[derive(Debug)]
pub struct ParsedTree {
    pub document: Document,
    pub stamp: Option<FileStamp>,
    pub children: Vec<ParsedTree>,
}

impl ParsedTree {
    /// A directory counts as a suite if it has init data or child suites.
    pub fn is_suite(&self) -> bool {
        self.document.kind != DataKind::Directory
            || self.document.source.is_some()
            || !self.children.is_empty()
    }
}

pub struct Loader<'a> {
    settings: &'a EditorSettings,
    operation: Operation,
}

impl<'a> Loader<'a> {
    pub fn new(settings: &'a EditorSettings, operation: Operation) -> Self {
        Self { settings, operation }
    }

    fn stamp(&self, path: &Path) -> Result<FileStamp> {
        FileStamp::of(path).map_err(|e| AppError::io(self.operation, path, e))
    }

    /// Parse one data file. With `kind` the file must be of that kind,
    /// otherwise the kind is inferred from its tables.
    pub fn load_file(&self, path: &Path, kind: Option<DataKind>) -> Result<ParsedTree> {
        let stamp = self.stamp(path)?;
        let parsed = match kind {
            Some(kind) => parser::parse_as(path, kind),
            None => parser::parse_data_file(path),
        };
        let document = parsed.map_err(|e| AppError::format(self.operation, path, e))?;
        Ok(ParsedTree {
            document,
            stamp: Some(stamp),
            children: Vec::new(),
        })
    }

    /// Parse only a directory's own data: its init file, or nothing.
    pub fn load_directory_document(&self, directory: &Path) -> Result<ParsedTree> {
        let (document, stamp) = match self.find_init_file(directory)? {
            Some(init) => {
                let stamp = self.stamp(&init)?;
                let document = parser::parse_init_file(&init, directory)
                    .map_err(|e| AppError::format(self.operation, &init, e))?;
                (document, stamp)
            }
            None => (Document::directory(directory), self.stamp(directory)?),
        };
        Ok(ParsedTree {
            document,
            stamp: Some(stamp),
            children: Vec::new(),
        })
    }

    /// Parse a directory suite and every suite below it.
    pub fn load_directory(&self, directory: &Path) -> Result<ParsedTree> {
        let mut tree = self.load_directory_document(directory)?;
        for candidate in self.suite_candidates(directory)? {
            if let Some(child) = self.load_suite(&candidate)? {
                tree.children.push(child);
            }
        }
        Ok(tree)
    }

    /// Parse `path` as a child suite. Returns `None` for resource files and
    /// directories that hold no suites.
    pub fn load_suite(&self, path: &Path) -> Result<Option<ParsedTree>> {
        let tree = if path.is_dir() {
            self.load_directory(path)?
        } else {
            self.load_file(path, None)?
        };
        match tree.document.kind {
            DataKind::Resource => Ok(None),
            _ if tree.is_suite() => Ok(Some(tree)),
            _ => Ok(None),
        }
    }

    pub fn find_init_file(&self, directory: &Path) -> Result<Option<PathBuf>> {
        let entries = fs::read_dir(directory).map_err(|e| AppError::io(self.operation, directory, e))?;
        let mut found: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && self.settings.is_init_file(p))
            .collect();
        found.sort();
        Ok(found.into_iter().next())
    }

    /// Entries of `directory` that may be child suites, sorted
    /// case-insensitively by name: data files other than the init file, and
    /// subdirectories whose names do not start with `.` or `_`.
    pub fn suite_candidates(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(directory).map_err(|e| AppError::io(self.operation, directory, e))?;
        let mut candidates: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|path| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if name.starts_with('.') || name.starts_with('_') {
                    return false;
                }
                if path.is_dir() {
                    true
                } else {
                    self.settings.is_data_file(path) && !self.settings.is_init_file(path)
                }
            })
            .collect();
        candidates.sort_by_key(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default()
        });
        Ok(candidates)
    }
}
