//! ASCII tree rendering for the suite hierarchy.

use crate::app::domain::document::DataKind;

const DIRECTORY: char = '▸';
const TEST_FILE: char = '●';
const RESOURCE: char = '◆';

/// One line of the rendered tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteNode {
    pub name: String,
    pub kind: DataKind,
    pub dirty: bool,
    pub children: Vec<SuiteNode>,
}

fn kind_symbol(kind: DataKind) -> char {
    match kind {
        DataKind::Directory => DIRECTORY,
        DataKind::TestCaseFile => TEST_FILE,
        DataKind::Resource => RESOURCE,
    }
}

/// Render suite trees as ASCII art. Unsaved nodes are marked with `*`.
///
/// Example output:
/// ```text
/// project
/// ├── ▸ login
/// │   └── ● valid.robot
/// └── ● tests.txt *
/// ```
pub fn render_tree(nodes: &[SuiteNode]) -> String {
    let mut output = String::new();
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i == nodes.len() - 1;
        render_node(&mut output, node, "", is_last, true);
    }
    output
}

fn render_node(output: &mut String, node: &SuiteNode, prefix: &str, is_last: bool, is_root: bool) {
    if is_root {
        output.push_str(&node.name);
    } else {
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        output.push(kind_symbol(node.kind));
        output.push(' ');
        output.push_str(&node.name);
    }
    if node.dirty {
        output.push_str(" *");
    }
    output.push('\n');

    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    for (i, child) in node.children.iter().enumerate() {
        let child_is_last = i == node.children.len() - 1;
        render_node(output, child, &child_prefix, child_is_last, false);
    }
}
