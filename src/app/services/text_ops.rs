use std::path::Path;
use std::sync::LazyLock;

use regex_lite::Regex;

/// A tab (with any surrounding blanks) or two-plus spaces: the plain-text cell separator.
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\t[ \t]*| {2,}").expect("separator pattern is valid"));

/// Extract filename from a file path
///
/// Returns the filename component of a path, or "Unknown" if it can't be extracted.
pub fn extract_filename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != ".")
        .map(|s| s.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Split one data row into cells.
///
/// Rows starting with `| ` use the pipe format; everything else is split on
/// tabs or runs of two or more spaces. A leading separator yields an empty
/// first cell, which marks a step row inside a test or keyword.
pub fn split_cells(line: &str) -> Vec<String> {
    let line = line.trim_end();
    if line.is_empty() {
        return Vec::new();
    }
    if line.starts_with("| ") || line == "|" {
        return split_pipe_row(line);
    }
    SEPARATOR
        .split(line)
        .map(|cell| unescape_cell(cell.trim_start_matches(' ')))
        .collect()
}

fn split_pipe_row(line: &str) -> Vec<String> {
    let inner = line.trim_start_matches('|');
    let inner = inner.strip_suffix(" |").unwrap_or(inner);
    inner
        .split(" | ")
        .map(|cell| unescape_cell(cell.trim()))
        .collect()
}

/// A lone backslash is the on-disk form of an empty cell.
pub fn unescape_cell(cell: &str) -> String {
    if cell == "\\" {
        String::new()
    } else {
        cell.to_string()
    }
}

pub fn escape_cell(cell: &str) -> String {
    if cell.is_empty() {
        "\\".to_string()
    } else {
        cell.to_string()
    }
}

/// Split trailing `#` cells off a row. Returns the data cells and the comment.
pub fn split_comment(cells: Vec<String>) -> (Vec<String>, Option<String>) {
    match cells.iter().position(|c| c.starts_with('#')) {
        Some(idx) => {
            let comment = cells[idx..].join(" ");
            let mut data = cells;
            data.truncate(idx);
            (data, Some(comment))
        }
        None => (cells, None),
    }
}

/// Substitute `${CURDIR}` with the directory of the importing file.
pub fn replace_curdir(value: &str, directory: &Path) -> String {
    value.replace("${CURDIR}", &directory.to_string_lossy())
}
