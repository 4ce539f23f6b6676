//! Structural overview: one line per body item with its anchor.
//!
//! Indentation is `depth + heading level` in units of two spaces, where the
//! heading level is the level of the last section header seen in document
//! order. Titles are never indented.

use crate::tree::{DocTree, NodeKind};

const INDENT: &str = "  ";

pub fn render(tree: &DocTree) -> String {
    let mut lines = Vec::new();
    let mut heading_level = 0usize;

    for (node, depth) in tree.iter_items() {
        let text = node.text.as_deref().unwrap_or("");
        match &node.kind {
            NodeKind::Title => {
                lines.push(format!("[anchor:{}] {}: {}", node.self_ref, node.kind.label(), text));
            }
            NodeKind::SectionHeader { level } => {
                heading_level = *level as usize;
                lines.push(format!(
                    "{}[anchor:{}] {}-{}: {}",
                    INDENT.repeat(depth + heading_level),
                    node.self_ref,
                    node.kind.label(),
                    level,
                    text
                ));
            }
            _ => {
                lines.push(format!(
                    "{}[anchor:{}] {}",
                    INDENT.repeat(depth + heading_level + 1),
                    node.self_ref,
                    node.kind.label()
                ));
            }
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TableData;

    #[test]
    fn test_empty_document() {
        let mut tree = DocTree::new("o");
        tree.add_furniture_text("prompt: x").unwrap();
        assert_eq!(render(&tree), "");
    }

    #[test]
    fn test_indentation_follows_heading_level() {
        let mut tree = DocTree::new("o");
        tree.add_title("Report").unwrap();
        tree.add_heading("Intro", 1).unwrap();
        tree.add_text("para").unwrap();
        let list = tree.add_group(false, None).unwrap();
        tree.add_list_item("item", "-", list).unwrap();
        tree.add_heading("Detail", 2).unwrap();
        let table = tree.add_table(TableData::default(), None).unwrap();
        tree.add_caption(table, "cap").unwrap();

        let expected = [
            "[anchor:#/texts/0] title: Report",
            "    [anchor:#/texts/1] section_header-1: Intro",
            "      [anchor:#/texts/2] text",
            "      [anchor:#/groups/0] list",
            "        [anchor:#/texts/3] list_item",
            "      [anchor:#/texts/4] section_header-2: Detail",
            "        [anchor:#/tables/0] table",
            "          [anchor:#/texts/5] caption",
        ]
        .join("\n");
        assert_eq!(render(&tree), expected);
    }

    #[test]
    fn test_render_is_read_only() {
        let mut tree = DocTree::new("o");
        tree.add_title("T").unwrap();
        let before = tree.clone();
        let _ = render(&tree);
        assert_eq!(tree, before);
    }
}
