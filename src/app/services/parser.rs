//! Plain-text test data parser.
//!
//! Only as much of the format as the editor core needs to round-trip the
//! four tables. Comment tables, unknown tables and rows before the first
//! table are kept as raw lines.

use std::fs;
use std::path::Path;

use crate::app::domain::document::{
    normalize_name, DataKind, Document, Import, ImportKind, RawTable, Setting, SettingRow,
    SettingTable, Step, TestCase, UserKeyword, Variable,
};
use crate::app::infrastructure::error::FormatError;
use crate::app::services::text_ops::{split_cells, split_comment};

const CONTINUATION: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Table {
    None,
    Settings,
    Variables,
    TestCases,
    Keywords,
    Ignored,
}

fn table_from_header(cell: &str) -> Option<Table> {
    let name = normalize_name(cell.trim_matches(|c: char| c == '*' || c.is_whitespace()));
    let table = match name.as_str() {
        "setting" | "settings" | "metadata" => Table::Settings,
        "variable" | "variables" => Table::Variables,
        "testcase" | "testcases" | "task" | "tasks" => Table::TestCases,
        "keyword" | "keywords" | "userkeyword" | "userkeywords" => Table::Keywords,
        "comment" | "comments" => Table::Ignored,
        _ => return None,
    };
    Some(table)
}

#[derive(Debug, Clone, Copy)]
enum Body {
    Test(usize),
    Keyword(usize),
}

/// Tables read from one file, before a kind is attached.
#[derive(Debug, Default)]
struct Tables {
    setting_table: SettingTable,
    variable_table: Vec<Variable>,
    testcase_table: Vec<TestCase>,
    keyword_table: Vec<UserKeyword>,
    preamble: Vec<String>,
    raw_tables: Vec<RawTable>,
    /// Line of the first test case table header, if there is one.
    testcase_header: Option<usize>,
}

impl Tables {
    fn into_document(self, kind: DataKind, path: &Path, directory: &Path) -> Document {
        let mut document = Document::new(kind, Some(path.to_path_buf()), directory.to_path_buf());
        document.setting_table = self.setting_table;
        document.variable_table = self.variable_table;
        document.testcase_table = self.testcase_table;
        document.keyword_table = self.keyword_table;
        document.preamble = self.preamble;
        document.raw_tables = self.raw_tables;
        document
    }
}

fn read_text(path: &Path) -> Result<String, FormatError> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8(bytes).map_err(|_| FormatError::Encoding)?;
    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

fn directory_of(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

/// Parse a data file, inferring its kind: a file with a test case table is a
/// test case file, anything else is a resource.
pub fn parse_data_file(path: &Path) -> Result<Document, FormatError> {
    let tables = parse_text(&read_text(path)?)?;
    let kind = if tables.testcase_header.is_some() {
        DataKind::TestCaseFile
    } else {
        DataKind::Resource
    };
    Ok(tables.into_document(kind, path, directory_of(path)))
}

/// Parse a data file that must be of `kind`.
pub fn parse_as(path: &Path, kind: DataKind) -> Result<Document, FormatError> {
    if kind == DataKind::Directory {
        return Err(FormatError::Syntax {
            line: 0,
            message: "a directory suite is read through its init file".to_string(),
        });
    }
    let tables = parse_text(&read_text(path)?)?;
    if kind == DataKind::Resource
        && let Some(line) = tables.testcase_header
    {
        return Err(FormatError::Syntax {
            line,
            message: "resource file cannot contain a test case table".to_string(),
        });
    }
    Ok(tables.into_document(kind, path, directory_of(path)))
}

/// Parse the init file of the directory suite at `directory`.
pub fn parse_init_file(path: &Path, directory: &Path) -> Result<Document, FormatError> {
    let tables = parse_text(&read_text(path)?)?;
    if let Some(line) = tables.testcase_header {
        return Err(FormatError::Syntax {
            line,
            message: "init file cannot contain a test case table".to_string(),
        });
    }
    Ok(tables.into_document(DataKind::Directory, path, directory))
}

fn parse_text(text: &str) -> Result<Tables, FormatError> {
    let mut tables = Tables::default();
    let mut table = Table::None;
    // Row index of the last setting or import, for `...` rows
    let mut last_setting: Option<usize> = None;
    let mut last_variable: Option<usize> = None;
    let mut body: Option<Body> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let cells = split_cells(raw);
        if cells.iter().all(String::is_empty) {
            continue;
        }

        if cells[0].starts_with('*') {
            table = match table_from_header(&cells[0]) {
                Some(found) => found,
                None => {
                    tracing::warn!("line {}: skipping unknown table {:?}", line_no, cells[0]);
                    Table::Ignored
                }
            };
            if table == Table::TestCases && tables.testcase_header.is_none() {
                tables.testcase_header = Some(line_no);
            }
            if table == Table::Ignored {
                tables.raw_tables.push(RawTable {
                    header: raw.trim().to_string(),
                    lines: Vec::new(),
                });
            }
            last_setting = None;
            last_variable = None;
            body = None;
            continue;
        }

        match table {
            Table::None => {
                tables.preamble.push(raw.trim_end().to_string());
                continue;
            }
            Table::Ignored => {
                if let Some(raw_table) = tables.raw_tables.last_mut() {
                    raw_table.lines.push(raw.trim_end().to_string());
                }
                continue;
            }
            _ => {}
        }
        if cells[0].starts_with('#') {
            if table == Table::Settings {
                tables.setting_table.push(SettingRow::Comment(raw.trim().to_string()));
            }
            continue;
        }

        match table {
            Table::None | Table::Ignored => {}
            Table::Settings => {
                last_setting = setting_row(&mut tables.setting_table, cells, last_setting, line_no)?;
            }
            Table::Variables => {
                last_variable = Some(variable_row(&mut tables.variable_table, cells, last_variable, line_no)?);
            }
            Table::TestCases | Table::Keywords => {
                body = Some(body_row(&mut tables, table, cells, body, line_no)?);
            }
        }
    }

    Ok(tables)
}

fn setting_row(
    table: &mut SettingTable,
    cells: Vec<String>,
    last: Option<usize>,
    line: usize,
) -> Result<Option<usize>, FormatError> {
    let (data, comment) = split_comment(cells);
    let mut data: Vec<String> = data.into_iter().skip_while(String::is_empty).collect();
    if data.is_empty() {
        if let Some(comment) = comment {
            table.push(SettingRow::Comment(comment));
        }
        return Ok(last);
    }
    let name = data.remove(0);

    if name == CONTINUATION {
        let row = last.and_then(|i| table.row_mut(i)).ok_or(FormatError::Syntax {
            line,
            message: "continuation without a preceding setting".to_string(),
        })?;
        match row {
            SettingRow::Setting(setting) if setting.is_documentation() => {
                let joined = data.join(" ");
                match setting.values.first_mut() {
                    Some(value) => {
                        value.push_str("\\n");
                        value.push_str(&joined);
                    }
                    None => setting.values.push(joined),
                }
            }
            SettingRow::Setting(setting) => setting.values.extend(data),
            SettingRow::Import(import) => import.args.extend(data),
            SettingRow::Comment(_) => {}
        }
        return Ok(last);
    }

    if let Some(kind) = ImportKind::from_setting_name(&name) {
        if data.is_empty() {
            return Err(FormatError::Syntax {
                line,
                message: format!("{} setting requires a value", kind.as_str()),
            });
        }
        let import_name = data.remove(0);
        let row = table.push(SettingRow::Import(Import {
            kind,
            name: import_name,
            args: data,
            comment,
        }));
        return Ok(Some(row));
    }

    let mut setting = Setting::new(name, data);
    if setting.is_documentation() {
        setting.values = vec![setting.values.join(" ")];
    }
    setting.comment = comment;
    Ok(Some(table.push(SettingRow::Setting(setting))))
}

fn variable_row(
    variables: &mut Vec<Variable>,
    mut cells: Vec<String>,
    last: Option<usize>,
    line: usize,
) -> Result<usize, FormatError> {
    let name = cells.remove(0);
    if name == CONTINUATION {
        let idx = last.ok_or(FormatError::Syntax {
            line,
            message: "continuation without a preceding variable".to_string(),
        })?;
        variables[idx].values.extend(cells);
        return Ok(idx);
    }
    variables.push(Variable { name, values: cells });
    Ok(variables.len() - 1)
}

fn body_row(
    tables: &mut Tables,
    table: Table,
    mut cells: Vec<String>,
    current: Option<Body>,
    line: usize,
) -> Result<Body, FormatError> {
    let first = cells.remove(0);

    if !first.is_empty() && first != CONTINUATION {
        let steps = step_from(cells).into_iter().collect();
        let body = if table == Table::TestCases {
            tables.testcase_table.push(TestCase { name: first, steps });
            Body::Test(tables.testcase_table.len() - 1)
        } else {
            tables.keyword_table.push(UserKeyword { name: first, steps });
            Body::Keyword(tables.keyword_table.len() - 1)
        };
        return Ok(body);
    }

    let body = current.ok_or(FormatError::Syntax {
        line,
        message: "step outside of a test case or keyword".to_string(),
    })?;
    let steps = match body {
        Body::Test(i) => &mut tables.testcase_table[i].steps,
        Body::Keyword(i) => &mut tables.keyword_table[i].steps,
    };

    let continued = first == CONTINUATION
        || cells.iter().find(|c| !c.is_empty()).is_some_and(|c| c == CONTINUATION);
    if continued {
        let rest: Vec<String> = cells
            .into_iter()
            .skip_while(|c| c.is_empty() || c == CONTINUATION)
            .collect();
        match steps.last_mut() {
            Some(step) => step.cells.extend(rest),
            None => steps.extend(step_from(rest)),
        }
    } else if let Some(step) = step_from(cells) {
        steps.push(step);
    }
    Ok(body)
}

fn step_from(cells: Vec<String>) -> Option<Step> {
    let cells: Vec<String> = cells.into_iter().skip_while(String::is_empty).collect();
    if cells.is_empty() {
        None
    } else {
        Some(Step { cells })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    const SUITE: &str = "\
*Settings*
Resource  resource.txt
*Test Cases*
Ride Unit Test  No Operation
";

    #[test]
    fn test_parse_test_case_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "tests.txt", SUITE);
        let doc = parse_data_file(&path).unwrap();

        assert_eq!(doc.kind, DataKind::TestCaseFile);
        let imports: Vec<_> = doc.setting_table.imports().collect();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].kind, ImportKind::Resource);
        assert_eq!(imports[0].name, "resource.txt");
        assert_eq!(doc.testcase_table.len(), 1);
        assert_eq!(doc.testcase_table[0].name, "Ride Unit Test");
        assert_eq!(doc.testcase_table[0].steps[0].cells, vec!["No Operation"]);
        assert_eq!(doc.directory, dir.path());
    }

    #[test]
    fn test_file_without_tests_is_resource() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "resource.txt",
            "*Keywords*\nUnit Test Keyword  No Operation\n",
        );
        let doc = parse_data_file(&path).unwrap();
        assert_eq!(doc.kind, DataKind::Resource);
        assert_eq!(doc.keyword_table[0].name, "Unit Test Keyword");
    }

    #[test]
    fn test_documentation_continuation_joins_with_newline_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "__init__.txt",
            "*Settings*\nDocumentation  Ride unit testing file\n...  ninjaed more documentation",
        );
        let doc = parse_init_file(&path, dir.path()).unwrap();
        assert_eq!(doc.kind, DataKind::Directory);
        assert_eq!(
            doc.setting_table.documentation().unwrap().value(),
            "Ride unit testing file\\nninjaed more documentation"
        );
    }

    #[test]
    fn test_steps_and_step_continuation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "steps.robot",
            "*** Test Cases ***\nLogin\n    Open    page\n    ...    chrome\n    Close\n\n*** Keywords ***\nOpen\n    [Arguments]    ${url}\n",
        );
        let doc = parse_data_file(&path).unwrap();
        let steps: Vec<_> = doc.testcase_table[0].steps.iter().map(|s| s.cells.clone()).collect();
        assert_eq!(steps, vec![vec!["Open", "page", "chrome"], vec!["Close"]]);
        assert_eq!(doc.keyword_table[0].steps[0].cells, vec!["[Arguments]", "${url}"]);
    }

    #[test]
    fn test_import_arguments_and_comment() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "libs.robot",
            "*** Settings ***\nLibrary    Remote    http://x    # remote lib\n...    WITH NAME    R\n",
        );
        let doc = parse_data_file(&path).unwrap();
        let import = doc.setting_table.imports().next().unwrap();
        assert_eq!(import.kind, ImportKind::Library);
        assert_eq!(import.args, vec!["http://x", "WITH NAME", "R"]);
        assert_eq!(import.comment.as_deref(), Some("# remote lib"));
    }

    #[test]
    fn test_variables_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "vars.robot", "*** Variables ***\n${HOST}    localhost\n@{LIST}    a\n...    b\n");
        let doc = parse_data_file(&path).unwrap();
        assert_eq!(doc.variable_table.len(), 2);
        assert_eq!(doc.variable_table[1].values, vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_table_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "odd.robot", "*** Nonsense ***\nwhatever  here\n*** Keywords ***\nK\n    No Operation\n");
        let doc = parse_data_file(&path).unwrap();
        assert_eq!(doc.keyword_table.len(), 1);
        assert_eq!(doc.raw_tables.len(), 1);
        assert_eq!(doc.raw_tables[0].header, "*** Nonsense ***");
        assert_eq!(doc.raw_tables[0].lines, vec!["whatever  here"]);
    }

    #[test]
    fn test_settings_keep_file_order_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "ordered.robot",
            "# generated\n*** Settings ***\nLibrary    OperatingSystem\n# shared keywords\nDocumentation    Doc\nResource    common.resource\n...    ignored\n*** Comments ***\nnote    here\n",
        );
        let doc = parse_data_file(&path).unwrap();
        let rows = doc.setting_table.rows();
        assert!(matches!(&rows[0], SettingRow::Import(i) if i.name == "OperatingSystem"));
        assert_eq!(rows[1], SettingRow::Comment("# shared keywords".to_string()));
        assert!(matches!(&rows[2], SettingRow::Setting(s) if s.is_documentation()));
        assert!(matches!(&rows[3], SettingRow::Import(i) if i.args == vec!["ignored"]));
        assert_eq!(doc.preamble, vec!["# generated"]);
        assert_eq!(doc.raw_tables[0].header, "*** Comments ***");
        assert_eq!(doc.raw_tables[0].lines, vec!["note    here"]);
    }

    #[test]
    fn test_step_outside_test_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.robot", "*** Test Cases ***\n    Log    orphan\n");
        let err = parse_data_file(&path).unwrap_err();
        assert!(matches!(err, FormatError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_resource_with_tests_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "tests.txt", SUITE);
        let err = parse_as(&path, DataKind::Resource).unwrap_err();
        assert!(matches!(err, FormatError::Syntax { line: 3, .. }));
    }

    #[test]
    fn test_invalid_utf8_is_an_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.robot");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x2a]).unwrap();
        assert!(matches!(parse_data_file(&path), Err(FormatError::Encoding)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = parse_data_file(Path::new("/no/such/file.robot")).unwrap_err();
        assert!(matches!(err, FormatError::Io(_)));
    }
}
