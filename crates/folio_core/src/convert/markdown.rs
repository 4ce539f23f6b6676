//! Markdown input, read with `pulldown-cmark`.
//!
//! `#` becomes the document title, `##`..`######` section headings one level
//! lower. Lists keep their nesting, tables become table nodes whose first row
//! is the column header.

use crate::anchor::Anchor;
use crate::tree::{DocTree, TableCell, TableData, MAX_LIST_DEPTH};
use folio_common::Result;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

struct OpenList {
    group: Anchor,
    ordered: bool,
    next_number: u64,
    item_pending: bool,
}

#[derive(Default)]
struct TableBuffer {
    rows: Vec<Vec<String>>,
}

impl TableBuffer {
    fn into_data(self) -> TableData {
        let num_rows = self.rows.len();
        let num_cols = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut table_cells = Vec::new();
        for (row, cells) in self.rows.into_iter().enumerate() {
            for (col, text) in cells.into_iter().enumerate() {
                table_cells.push(TableCell {
                    text,
                    row_span: 1,
                    col_span: 1,
                    start_row_offset_idx: row,
                    end_row_offset_idx: row + 1,
                    start_col_offset_idx: col,
                    end_col_offset_idx: col + 1,
                    column_header: row == 0,
                    row_header: false,
                });
            }
        }
        TableData {
            num_rows,
            num_cols,
            table_cells,
        }
    }
}

struct MarkdownReader<'t> {
    tree: &'t mut DocTree,
    buffer: String,
    lists: Vec<OpenList>,
    table: Option<TableBuffer>,
}

impl MarkdownReader<'_> {
    fn in_item(&self) -> bool {
        self.lists.last().is_some_and(|list| list.item_pending)
    }

    fn take_buffer(&mut self) -> String {
        let text = self.buffer.split_whitespace().collect::<Vec<_>>().join(" ");
        self.buffer.clear();
        text
    }

    fn flush_item(&mut self) -> Result<()> {
        if !self.in_item() {
            return Ok(());
        }
        let text = self.take_buffer();
        if let Some(list) = self.lists.last_mut() {
            list.item_pending = false;
            let marker = if list.ordered {
                let marker = format!("{}.", list.next_number);
                list.next_number += 1;
                marker
            } else {
                "-".to_string()
            };
            let group = list.group;
            self.tree.add_list_item(text, marker, group)?;
        }
        Ok(())
    }

    fn start(&mut self, tag: Tag<'_>) -> Result<()> {
        match tag {
            Tag::Heading { .. } | Tag::CodeBlock(_) => self.buffer.clear(),
            Tag::Paragraph => {
                if !self.in_item() {
                    self.buffer.clear();
                }
            }
            Tag::List(start) => {
                self.flush_item()?;
                let parent = self.lists.last().map(|list| list.group);
                // Past the depth limit, deeper lists continue the outer one.
                let group = match parent {
                    Some(outer) if self.lists.len() >= MAX_LIST_DEPTH => outer,
                    _ => self.tree.add_group(start.is_some(), parent)?,
                };
                self.lists.push(OpenList {
                    group,
                    ordered: start.is_some(),
                    next_number: start.unwrap_or(1),
                    item_pending: false,
                });
            }
            Tag::Item => {
                self.buffer.clear();
                if let Some(list) = self.lists.last_mut() {
                    list.item_pending = true;
                }
            }
            Tag::Table(_) => self.table = Some(TableBuffer::default()),
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.rows.push(Vec::new());
                }
            }
            Tag::TableCell => self.buffer.clear(),
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, tag: TagEnd) -> Result<()> {
        match tag {
            TagEnd::Heading(level) => {
                let text = self.take_buffer();
                if !text.is_empty() {
                    if level == HeadingLevel::H1 {
                        self.tree.add_title(text)?;
                    } else {
                        self.tree.add_heading(text, level as u8 - 1)?;
                    }
                }
            }
            TagEnd::Paragraph => {
                if self.in_item() {
                    self.buffer.push(' ');
                } else {
                    let text = self.take_buffer();
                    if !text.is_empty() {
                        self.tree.add_text(text)?;
                    }
                }
            }
            TagEnd::CodeBlock => {
                let code = self.buffer.trim_end().to_string();
                self.buffer.clear();
                if !code.is_empty() {
                    self.tree.add_text(code)?;
                }
            }
            TagEnd::Item => self.flush_item()?,
            TagEnd::List(_) => {
                self.lists.pop();
            }
            TagEnd::TableCell => {
                let text = self.take_buffer();
                if let Some(row) = self.table.as_mut().and_then(|t| t.rows.last_mut()) {
                    row.push(text);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    let data = table.into_data();
                    if !data.table_cells.is_empty() {
                        self.tree.add_table(data, None)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Appends the content of `markdown` to `tree`
pub fn build_tree(tree: &mut DocTree, markdown: &str) -> Result<()> {
    let mut reader = MarkdownReader {
        tree,
        buffer: String::new(),
        lists: Vec::new(),
        table: None,
    };

    for event in Parser::new_ext(markdown, Options::ENABLE_TABLES) {
        match event {
            Event::Start(tag) => reader.start(tag)?,
            Event::End(tag) => reader.end(tag)?,
            Event::Text(text) | Event::Code(text) => reader.buffer.push_str(&text),
            Event::SoftBreak | Event::HardBreak => reader.buffer.push(' '),
            _ => {}
        }
    }
    Ok(())
}
