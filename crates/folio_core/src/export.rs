//! Markdown and JSON export, plus saving both to disk

use crate::anchor::Anchor;
use crate::tree::{ContentLayer, DocTree, Node, NodeKind, TableData};
use folio_common::{FolioError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Greedy word wrap. Words longer than `width` get a line of their own.
pub fn wrap(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if line_len > 0 && line_len + 1 + word_len > width {
            lines.push(std::mem::take(&mut line));
            line_len = 0;
        }
        if line_len > 0 {
            line.push(' ');
            line_len += 1;
        }
        line.push_str(word);
        line_len += word_len;
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines.join("\n")
}

fn paragraph(text: &str, text_width: Option<usize>) -> String {
    match text_width {
        Some(width) => wrap(text, width),
        None => text.trim().to_string(),
    }
}

fn escape_cell(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

fn pipe_table(data: &TableData) -> Option<String> {
    let grid = data.grid();
    if grid.is_empty() || data.num_cols == 0 {
        return None;
    }

    let row_line = |row: &[String]| {
        let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = vec![row_line(&grid[0])];
    lines.push(format!("|{}", "---|".repeat(data.num_cols)));
    lines.extend(grid[1..].iter().map(|row| row_line(row)));
    Some(lines.join("\n"))
}

struct MarkdownWriter<'t> {
    tree: &'t DocTree,
    text_width: Option<usize>,
    blocks: Vec<String>,
}

impl MarkdownWriter<'_> {
    fn text_of(node: &Node) -> &str {
        node.text.as_deref().unwrap_or("")
    }

    fn list_lines(&self, group: &Node, indent: usize, lines: &mut Vec<String>) {
        let mut position = 0;
        for child in &group.children {
            let Some(node) = self.tree.get(child) else {
                continue;
            };
            match &node.kind {
                NodeKind::ListItem { marker, enumerated } => {
                    position += 1;
                    let marker = match (marker.trim(), enumerated) {
                        ("", true) => format!("{}.", position),
                        ("", false) => "-".to_string(),
                        (given, _) => given.to_string(),
                    };
                    lines.push(format!(
                        "{}{} {}",
                        " ".repeat(indent),
                        marker,
                        Self::text_of(node).trim()
                    ));
                    for nested in &node.children {
                        if let Some(sub) = self.tree.get(nested).filter(|n| n.kind.is_list()) {
                            self.list_lines(sub, indent + 4, lines);
                        }
                    }
                }
                kind if kind.is_list() => self.list_lines(node, indent + 4, lines),
                _ => {
                    if let Some(text) = &node.text {
                        lines.push(format!("{}{}", " ".repeat(indent), text.trim()));
                    }
                }
            }
        }
    }

    fn block(&mut self, anchor: &Anchor) {
        let Some(node) = self.tree.get(anchor) else {
            return;
        };
        if node.content_layer == ContentLayer::Furniture {
            return;
        }

        match &node.kind {
            NodeKind::Title => self.blocks.push(format!("# {}", Self::text_of(node).trim())),
            NodeKind::SectionHeader { level } => {
                let hashes = "#".repeat((*level as usize + 1).min(6));
                self.blocks
                    .push(format!("{} {}", hashes, Self::text_of(node).trim()));
            }
            NodeKind::Text | NodeKind::Caption | NodeKind::Footnote => {
                let text = paragraph(Self::text_of(node), self.text_width);
                if !text.is_empty() {
                    self.blocks.push(text);
                }
            }
            NodeKind::ListItem { marker, .. } => {
                let marker = if marker.trim().is_empty() { "-" } else { marker.trim() };
                self.blocks
                    .push(format!("{} {}", marker, Self::text_of(node).trim()));
            }
            NodeKind::List | NodeKind::OrderedList => {
                let mut lines = Vec::new();
                self.list_lines(node, 0, &mut lines);
                if !lines.is_empty() {
                    self.blocks.push(lines.join("\n"));
                }
            }
            NodeKind::Table {
                data,
                captions,
                footnotes,
            } => {
                for caption in captions {
                    self.block(caption);
                }
                if let Some(table) = pipe_table(data) {
                    self.blocks.push(table);
                }
                for footnote in footnotes {
                    self.block(footnote);
                }
            }
        }
    }
}

/// Renders the body of `tree` as markdown. Paragraphs are wrapped at
/// `text_width` when given.
pub fn to_markdown(tree: &DocTree, text_width: Option<usize>) -> String {
    let mut writer = MarkdownWriter {
        tree,
        text_width,
        blocks: Vec::new(),
    };
    for anchor in tree.children(&Anchor::Body).unwrap_or_default() {
        writer.block(anchor);
    }

    if writer.blocks.is_empty() {
        String::new()
    } else {
        format!("{}\n", writer.blocks.join("\n\n"))
    }
}

/// Pretty-printed JSON dump of the whole tree, furniture included
pub fn to_json(tree: &DocTree) -> Result<String> {
    Ok(serde_json::to_string_pretty(tree)?)
}

/// Loads a dump written by [`to_json`]
pub fn from_json(json: &str) -> Result<DocTree> {
    let tree: DocTree = serde_json::from_str(json)?;
    tree.check_integrity()?;
    Ok(tree)
}

/// Files written by [`save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPaths {
    pub markdown: PathBuf,
    pub json: PathBuf,
}

/// Writes `<dir>/<key>.md` and `<dir>/<key>.json`, replacing existing files
#[tracing::instrument(skip(tree), fields(dir = %dir.display()))]
pub fn save(tree: &DocTree, dir: &Path, key: &str, text_width: usize) -> Result<SavedPaths> {
    if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
        return Err(FolioError::InvalidInput(format!(
            "`{}` cannot be used as a file name",
            key
        )));
    }
    fs::create_dir_all(dir)?;

    let paths = SavedPaths {
        markdown: dir.join(format!("{}.md", key)),
        json: dir.join(format!("{}.json", key)),
    };
    fs::write(&paths.markdown, to_markdown(tree, Some(text_width)))?;
    fs::write(&paths.json, to_json(tree)?)?;

    tracing::info!("Saved document {} to {}", key, dir.display());
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TableCell;

    fn sample() -> DocTree {
        let mut tree = DocTree::new("sample");
        tree.add_furniture_text("prompt: hidden").unwrap();
        tree.add_title("Report").unwrap();
        tree.add_heading("Intro", 1).unwrap();
        tree.add_text("The quick brown fox jumps over the lazy dog").unwrap();
        let list = tree.add_group(true, None).unwrap();
        tree.add_list_item("first", "", list).unwrap();
        tree.add_list_item("second", "", list).unwrap();
        let nested = tree.add_group(false, Some(list)).unwrap();
        tree.add_list_item("inner", "*", nested).unwrap();
        tree
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("aa bb cc dd", 5), "aa bb\ncc dd");
        assert_eq!(wrap("averyveryverylongword x", 4), "averyveryverylongword\nx");
        assert_eq!(wrap("   ", 10), "");
    }

    #[test]
    fn test_markdown_layout() {
        let md = to_markdown(&sample(), None);
        assert_eq!(
            md,
            "# Report\n\n## Intro\n\nThe quick brown fox jumps over the lazy dog\n\n\
             1. first\n2. second\n    * inner\n"
        );
        assert!(!md.contains("hidden"));
    }

    #[test]
    fn test_markdown_wraps_paragraphs_only() {
        let md = to_markdown(&sample(), Some(20));
        assert!(md.contains("The quick brown fox\njumps over the lazy\ndog"));
        assert!(md.contains("1. first"));
    }

    #[test]
    fn test_heading_depth_is_capped() {
        let mut tree = DocTree::new("h");
        tree.add_heading("Deep", 6).unwrap();
        assert_eq!(to_markdown(&tree, None), "###### Deep\n");
    }

    #[test]
    fn test_table_with_caption_and_footnote() {
        let mut tree = DocTree::new("t");
        let cell = |text: &str, row, col| TableCell {
            text: text.to_string(),
            row_span: 1,
            col_span: 1,
            start_row_offset_idx: row,
            end_row_offset_idx: row + 1,
            start_col_offset_idx: col,
            end_col_offset_idx: col + 1,
            column_header: row == 0,
            row_header: false,
        };
        let data = TableData {
            num_rows: 2,
            num_cols: 2,
            table_cells: vec![cell("Name", 0, 0), cell("Age", 0, 1), cell("A|B", 1, 0), cell("30", 1, 1)],
        };
        let table = tree.add_table(data, None).unwrap();
        tree.add_caption(table, "Table 1").unwrap();
        tree.add_footnote(table, "Source: census").unwrap();

        assert_eq!(
            to_markdown(&tree, None),
            "Table 1\n\n| Name | Age |\n|---|---|\n| A\\|B | 30 |\n\nSource: census\n"
        );
    }

    #[test]
    fn test_export_is_deterministic() {
        let tree = sample();
        assert_eq!(to_markdown(&tree, Some(72)), to_markdown(&tree, Some(72)));
        assert_eq!(to_json(&tree).unwrap(), to_json(&tree).unwrap());
    }

    #[test]
    fn test_json_round_trip_keeps_tombstones() {
        let mut tree = sample();
        let doomed = tree.add_text("gone").unwrap();
        tree.delete(&[doomed]).unwrap();

        let json = to_json(&tree).unwrap();
        let back = from_json(&json).unwrap();
        assert_eq!(back, tree);
        assert_eq!(to_json(&back).unwrap(), json);
        assert!(json.contains("null"));
    }

    #[test]
    fn test_from_json_rejects_dangling_child() {
        let tree = sample();
        let json = to_json(&tree).unwrap().replace("#/texts/4", "#/texts/99");
        assert!(from_json(&json).is_err());
    }

    fn edited_dump(edit: impl FnOnce(&mut serde_json::Value)) -> String {
        let mut tree = DocTree::new("dump");
        let list = tree.add_group(false, None).unwrap();
        tree.add_list_item("only", "-", list).unwrap();
        tree.add_group(false, None).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&to_json(&tree).unwrap()).unwrap();
        edit(&mut value);
        value.to_string()
    }

    #[test]
    fn test_from_json_rejects_self_referencing_group() {
        let json = edited_dump(|v| {
            v["groups"][0]["children"] = serde_json::json!([{ "$ref": "#/groups/0" }]);
        });
        assert!(matches!(from_json(&json), Err(FolioError::InvalidInput(_))));
    }

    #[test]
    fn test_from_json_rejects_shared_child() {
        let json = edited_dump(|v| {
            v["groups"][1]["children"] = serde_json::json!([{ "$ref": "#/texts/0" }]);
        });
        assert!(matches!(from_json(&json), Err(FolioError::InvalidInput(_))));
    }

    #[test]
    fn test_from_json_rejects_wrong_parent() {
        let json = edited_dump(|v| {
            v["texts"][0]["parent"] = serde_json::json!({ "$ref": "#/groups/1" });
        });
        assert!(matches!(from_json(&json), Err(FolioError::InvalidInput(_))));
    }

    #[test]
    fn test_from_json_rejects_unreachable_cycle() {
        let json = edited_dump(|v| {
            v["body"]["children"] = serde_json::json!([{ "$ref": "#/groups/1" }]);
            v["groups"][0]["parent"] = serde_json::json!({ "$ref": "#/texts/0" });
            v["texts"][0]["children"] = serde_json::json!([{ "$ref": "#/groups/0" }]);
        });
        assert!(matches!(from_json(&json), Err(FolioError::InvalidInput(_))));
    }

    #[test]
    fn test_from_json_rejects_overly_deep_lists() {
        use crate::tree::MAX_LIST_DEPTH;

        let mut tree = DocTree::new("deep");
        let mut parent = None;
        for _ in 0..MAX_LIST_DEPTH {
            parent = Some(tree.add_group(false, parent).unwrap());
        }
        let outer = tree.add_group(false, None).unwrap();
        tree.add_group(false, Some(outer)).unwrap();
        let json = to_json(&tree).unwrap();
        assert!(from_json(&json).is_ok());

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let deepest = format!("#/groups/{}", MAX_LIST_DEPTH - 1);
        value["body"]["children"] = serde_json::json!([{ "$ref": "#/groups/0" }]);
        value["groups"][MAX_LIST_DEPTH]["parent"] = serde_json::json!({ "$ref": deepest });
        value["groups"][MAX_LIST_DEPTH - 1]["children"] =
            serde_json::json!([{ "$ref": outer.to_string() }]);
        assert!(matches!(
            from_json(&value.to_string()),
            Err(FolioError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_save_writes_both_files() {
        let dir = assert_fs::TempDir::new().unwrap();
        let target = dir.path().join("out");
        let paths = save(&sample(), &target, "abc123", 72).unwrap();

        assert_eq!(paths.markdown, target.join("abc123.md"));
        let md = fs::read_to_string(&paths.markdown).unwrap();
        assert!(md.starts_with("# Report"));
        let json = fs::read_to_string(&paths.json).unwrap();
        assert_eq!(from_json(&json).unwrap(), sample());
    }

    #[test]
    fn test_save_rejects_path_like_keys() {
        let dir = assert_fs::TempDir::new().unwrap();
        assert!(matches!(
            save(&sample(), dir.path(), "../escape", 72),
            Err(FolioError::InvalidInput(_))
        ));
    }
}
