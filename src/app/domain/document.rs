use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::controllers::data::ControllerId;
use crate::app::services::text_ops::extract_filename;

/// Which of the three kinds of test data a document holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    Directory,
    TestCaseFile,
    Resource,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory suite",
            Self::TestCaseFile => "test case file",
            Self::Resource => "resource file",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportKind {
    Library,
    Resource,
    Variables,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Library => "Library",
            Self::Resource => "Resource",
            Self::Variables => "Variables",
        }
    }

    /// Match a settings-table row name, ignoring case, spaces and a trailing colon.
    pub fn from_setting_name(name: &str) -> Option<Self> {
        match normalize_name(name).as_str() {
            "library" => Some(Self::Library),
            "resource" => Some(Self::Resource),
            "variables" => Some(Self::Variables),
            _ => None,
        }
    }
}

/// Lowercase a setting or table name and drop spaces and a trailing colon.
pub fn normalize_name(name: &str) -> String {
    name.trim_end_matches(':')
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A settings-table record declaring a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub kind: ImportKind,
    pub name: String,
    pub args: Vec<String>,
    pub comment: Option<String>,
}

impl Import {
    pub fn new(kind: ImportKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            args: Vec::new(),
            comment: None,
        }
    }

    pub fn is_resource(&self) -> bool {
        self.kind == ImportKind::Resource
    }
}

/// Any non-import setting, e.g. `Documentation` or `Suite Setup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub name: String,
    pub values: Vec<String>,
    pub comment: Option<String>,
}

impl Setting {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
            comment: None,
        }
    }

    pub fn value(&self) -> String {
        self.values.join(" ")
    }

    pub fn is_documentation(&self) -> bool {
        normalize_name(&self.name) == "documentation"
    }
}

/// One row of the settings table, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingRow {
    Setting(Setting),
    Import(Import),
    /// A row holding only a `#` comment.
    Comment(String),
}

/// The settings table. Settings, imports and comment rows share one
/// sequence so a save writes them back in the order they were read.
/// Import indexes count imports only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingTable {
    rows: Vec<SettingRow>,
}

impl SettingTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[SettingRow] {
        &self.rows
    }

    pub(crate) fn row_mut(&mut self, index: usize) -> Option<&mut SettingRow> {
        self.rows.get_mut(index)
    }

    /// Append a row and return its row index.
    pub fn push(&mut self, row: SettingRow) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    pub fn settings(&self) -> impl Iterator<Item = &Setting> {
        self.rows.iter().filter_map(|row| match row {
            SettingRow::Setting(setting) => Some(setting),
            _ => None,
        })
    }

    pub fn imports(&self) -> impl Iterator<Item = &Import> {
        self.rows.iter().filter_map(|row| match row {
            SettingRow::Import(import) => Some(import),
            _ => None,
        })
    }

    pub fn import_count(&self) -> usize {
        self.imports().count()
    }

    /// Remove the import at `index` among imports.
    pub fn remove_import(&mut self, index: usize) -> Option<Import> {
        let position = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| matches!(row, SettingRow::Import(_)))
            .nth(index)
            .map(|(position, _)| position)?;
        match self.rows.remove(position) {
            SettingRow::Import(import) => Some(import),
            _ => None,
        }
    }

    pub fn documentation(&self) -> Option<&Setting> {
        self.settings().find(|s| s.is_documentation())
    }

    /// Replace the documentation value, adding the setting first if missing.
    pub fn set_documentation(&mut self, value: impl Into<String>) {
        let value = value.into();
        let existing = self.rows.iter_mut().find_map(|row| match row {
            SettingRow::Setting(setting) if setting.is_documentation() => Some(setting),
            _ => None,
        });
        match existing {
            Some(setting) => setting.values = vec![value],
            None => self
                .rows
                .insert(0, SettingRow::Setting(Setting::new("Documentation", vec![value]))),
        }
    }

    /// Resource imports together with their index among imports.
    pub fn resource_imports(&self) -> impl Iterator<Item = (usize, &Import)> {
        self.imports().enumerate().filter(|(_, i)| i.is_resource())
    }
}

/// A table the editor does not model, such as `*** Comments ***`, kept
/// verbatim so saving does not lose it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub header: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub values: Vec<String>,
}

/// One body row of a test case or keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserKeyword {
    pub name: String,
    pub steps: Vec<Step>,
}

/// A parsed test data file, or the init data of a directory suite.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub kind: DataKind,
    /// The file backing this document. Directories have one only when they
    /// carry an init file.
    pub source: Option<PathBuf>,
    pub directory: PathBuf,
    /// Controller owning the parent document. Not an ownership link.
    pub parent: Option<ControllerId>,
    pub setting_table: SettingTable,
    pub variable_table: Vec<Variable>,
    pub testcase_table: Vec<TestCase>,
    pub keyword_table: Vec<UserKeyword>,
    /// Non-empty lines before the first table header.
    pub preamble: Vec<String>,
    pub raw_tables: Vec<RawTable>,
}

impl Document {
    pub fn new(kind: DataKind, source: Option<PathBuf>, directory: PathBuf) -> Self {
        Self {
            kind,
            source,
            directory,
            parent: None,
            setting_table: SettingTable::default(),
            variable_table: Vec::new(),
            testcase_table: Vec::new(),
            keyword_table: Vec::new(),
            preamble: Vec::new(),
            raw_tables: Vec::new(),
        }
    }

    /// A directory suite without an init file.
    pub fn directory(path: &Path) -> Self {
        Self::new(DataKind::Directory, None, path.to_path_buf())
    }

    /// A resource that only exists in memory so far.
    pub fn empty_resource(path: &Path) -> Self {
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::new(DataKind::Resource, Some(path.to_path_buf()), directory)
    }

    pub fn display_name(&self) -> String {
        match self.kind {
            DataKind::Directory => extract_filename(&self.directory.to_string_lossy()),
            _ => self
                .source
                .as_ref()
                .map(|p| extract_filename(&p.to_string_lossy()))
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }

    pub fn has_content(&self) -> bool {
        !self.setting_table.is_empty()
            || !self.variable_table.is_empty()
            || !self.testcase_table.is_empty()
            || !self.keyword_table.is_empty()
            || !self.preamble.is_empty()
            || !self.raw_tables.is_empty()
    }

    /// Drop every table, keeping identity fields (kind, paths, parent).
    pub fn clear_tables(&mut self) {
        self.setting_table = SettingTable::default();
        self.variable_table.clear();
        self.testcase_table.clear();
        self.keyword_table.clear();
        self.preamble.clear();
        self.raw_tables.clear();
    }
}
