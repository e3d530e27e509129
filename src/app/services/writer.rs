use std::io;
use std::path::Path;

use crate::app::domain::document::{DataKind, Document, SettingRow, Step};
use crate::app::domain::settings::EditorSettings;
use crate::app::infrastructure::filesystem::write_atomic;
use crate::app::services::text_ops::escape_cell;

/// Render a document in the plain-text format.
///
/// Settings rows keep their order. Raw tables go after the modelled ones.
pub fn render(document: &Document, settings: &EditorSettings) -> String {
    let sep = " ".repeat(settings.cell_separator_width.max(2));
    let mut sections: Vec<String> = Vec::new();

    if !document.preamble.is_empty() {
        sections.push(raw_lines(&document.preamble));
    }

    let table = &document.setting_table;
    if !table.is_empty() {
        let mut out = String::from("*** Settings ***\n");
        for row in table.rows() {
            match row {
                SettingRow::Setting(setting) => {
                    push_row(&mut out, &sep, &setting.name, &setting.values, setting.comment.as_deref())
                }
                SettingRow::Import(import) => {
                    let mut values = Vec::with_capacity(import.args.len() + 1);
                    values.push(import.name.clone());
                    values.extend(import.args.iter().cloned());
                    push_row(&mut out, &sep, import.kind.as_str(), &values, import.comment.as_deref());
                }
                SettingRow::Comment(comment) => {
                    out.push_str(comment);
                    out.push('\n');
                }
            }
        }
        sections.push(out);
    }

    if !document.variable_table.is_empty() {
        let mut out = String::from("*** Variables ***\n");
        for variable in &document.variable_table {
            push_row(&mut out, &sep, &variable.name, &variable.values, None);
        }
        sections.push(out);
    }

    // The header alone is what makes an empty test case file one
    if !document.testcase_table.is_empty() || document.kind == DataKind::TestCaseFile {
        let mut out = String::from("*** Test Cases ***\n");
        for test in &document.testcase_table {
            push_body(&mut out, &sep, &test.name, &test.steps);
        }
        sections.push(out);
    }

    if !document.keyword_table.is_empty() {
        let mut out = String::from("*** Keywords ***\n");
        for keyword in &document.keyword_table {
            push_body(&mut out, &sep, &keyword.name, &keyword.steps);
        }
        sections.push(out);
    }

    for raw in &document.raw_tables {
        let mut out = format!("{}\n", raw.header);
        out.push_str(&raw_lines(&raw.lines));
        sections.push(out);
    }

    sections.join("\n")
}

fn raw_lines(lines: &[String]) -> String {
    lines.iter().map(|line| format!("{line}\n")).collect()
}

fn push_row(out: &mut String, sep: &str, name: &str, values: &[String], comment: Option<&str>) {
    out.push_str(name);
    for value in values {
        out.push_str(sep);
        out.push_str(&escape_cell(value));
    }
    if let Some(comment) = comment {
        out.push_str(sep);
        out.push_str(comment);
    }
    out.push('\n');
}

fn push_body(out: &mut String, sep: &str, name: &str, steps: &[Step]) {
    out.push_str(name);
    out.push('\n');
    for step in steps {
        let cells: Vec<String> = step.cells.iter().map(|c| escape_cell(c)).collect();
        out.push_str(sep);
        out.push_str(&cells.join(sep));
        out.push('\n');
    }
}

/// Serialize `document` to `path`, replacing the file atomically.
pub fn write_document(document: &Document, path: &Path, settings: &EditorSettings) -> io::Result<()> {
    write_atomic(path, &render(document, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::domain::document::{Import, ImportKind, RawTable, Setting, TestCase, UserKeyword, Variable};
    use crate::app::services::parser::parse_data_file;
    use std::path::PathBuf;

    fn sample() -> Document {
        let mut doc = Document::new(
            DataKind::TestCaseFile,
            Some(PathBuf::from("/p/tests.robot")),
            PathBuf::from("/p"),
        );
        doc.setting_table.push(SettingRow::Setting(Setting::new(
            "Documentation",
            vec!["Line one\\nline two".into()],
        )));
        doc.setting_table
            .push(SettingRow::Import(Import::new(ImportKind::Resource, "resource.txt")));
        doc.variable_table.push(Variable {
            name: "${HOST}".into(),
            values: vec!["localhost".into()],
        });
        doc.testcase_table.push(TestCase {
            name: "Ride Unit Test".into(),
            steps: vec![Step { cells: vec!["Log".into(), "".into(), "x".into()] }],
        });
        doc.keyword_table.push(UserKeyword {
            name: "Helper".into(),
            steps: vec![Step { cells: vec!["No Operation".into()] }],
        });
        doc
    }

    #[test]
    fn test_render_layout() {
        let text = render(&sample(), &EditorSettings::default());
        let expected = "\
*** Settings ***
Documentation    Line one\\nline two
Resource    resource.txt

*** Variables ***
${HOST}    localhost

*** Test Cases ***
Ride Unit Test
    Log    \\    x

*** Keywords ***
Helper
    No Operation
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_written_file_parses_back_to_same_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.robot");
        let original = sample();
        write_document(&original, &path, &EditorSettings::default()).unwrap();

        let parsed = parse_data_file(&path).unwrap();
        assert_eq!(parsed.setting_table, original.setting_table);
        assert_eq!(parsed.variable_table, original.variable_table);
        assert_eq!(parsed.testcase_table, original.testcase_table);
        assert_eq!(parsed.keyword_table, original.keyword_table);
    }

    #[test]
    fn test_settings_interleaving_and_raw_tables_survive_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ordered.robot");
        let mut doc = Document::new(DataKind::TestCaseFile, Some(path.clone()), dir.path().to_path_buf());
        doc.preamble.push("# generated".into());
        let table = &mut doc.setting_table;
        table.push(SettingRow::Import(Import::new(ImportKind::Library, "OperatingSystem")));
        table.push(SettingRow::Comment("# shared keywords".into()));
        table.push(SettingRow::Setting(Setting::new("Documentation", vec!["Doc".into()])));
        table.push(SettingRow::Import(Import::new(ImportKind::Resource, "common.resource")));
        doc.raw_tables.push(RawTable {
            header: "*** Comments ***".into(),
            lines: vec!["note    here".into()],
        });
        write_document(&doc, &path, &EditorSettings::default()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "# generated\n\n*** Settings ***\nLibrary    OperatingSystem\n# shared keywords\nDocumentation    Doc\nResource    common.resource\n\n*** Test Cases ***\n\n*** Comments ***\nnote    here\n"
        );
        let parsed = parse_data_file(&path).unwrap();
        assert_eq!(parsed.setting_table, doc.setting_table);
        assert_eq!(parsed.preamble, doc.preamble);
        assert_eq!(parsed.raw_tables, doc.raw_tables);
    }

    #[test]
    fn test_empty_test_case_file_keeps_its_header() {
        let path = PathBuf::from("/p/empty.robot");
        let doc = Document::new(DataKind::TestCaseFile, Some(path), PathBuf::from("/p"));
        assert_eq!(render(&doc, &EditorSettings::default()), "*** Test Cases ***\n");
    }

    #[test]
    fn test_empty_document_renders_nothing() {
        let doc = Document::directory(std::path::Path::new("/p"));
        assert_eq!(render(&doc, &EditorSettings::default()), "");
    }
}
