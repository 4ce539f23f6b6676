//! Build stack controller
//!
//! Every document carries a stack of insertion contexts. The bottom entry is
//! the sentinel created with the document, open lists are pushed on top of
//! it. Titles, headings and paragraphs may only be added while no list is
//! open; list items only while one is.

use crate::anchor::Anchor;
use crate::convert::html;
use crate::tree::DocTree;
use folio_common::{FolioError, Result};

/// One insertion context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackEntry {
    /// Last node produced at document level
    Leaf(Anchor),
    /// An open list group
    List { group: Anchor, ordered: bool },
}

impl StackEntry {
    pub fn anchor(&self) -> Anchor {
        match self {
            StackEntry::Leaf(anchor) => *anchor,
            StackEntry::List { group, .. } => *group,
        }
    }

    pub fn is_open_list(&self) -> bool {
        matches!(self, StackEntry::List { .. })
    }
}

/// Stack of insertion contexts. It always holds at least the sentinel entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStack {
    bottom: StackEntry,
    above: Vec<StackEntry>,
}

impl BuildStack {
    pub fn seeded(sentinel: Anchor) -> Self {
        Self {
            bottom: StackEntry::Leaf(sentinel),
            above: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        1 + self.above.len()
    }

    pub fn top(&self) -> &StackEntry {
        self.above.last().unwrap_or(&self.bottom)
    }

    pub fn push(&mut self, entry: StackEntry) {
        self.above.push(entry);
    }

    /// Pops the top entry. The bottom entry is never popped.
    pub fn pop(&mut self) -> Option<StackEntry> {
        self.above.pop()
    }

    pub fn replace_top(&mut self, entry: StackEntry) {
        match self.above.last_mut() {
            Some(top) => *top = entry,
            None => self.bottom = entry,
        }
    }

    /// Entries from bottom to top
    pub fn entries(&self) -> impl Iterator<Item = &StackEntry> {
        std::iter::once(&self.bottom).chain(self.above.iter())
    }
}

/// Text and marker of one list item to add
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItemSpec {
    pub text: String,
    pub marker: String,
}

impl ListItemSpec {
    pub fn new(text: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marker: marker.into(),
        }
    }
}

/// A document together with its build stack
#[derive(Debug, Clone)]
pub struct DocumentSession {
    tree: DocTree,
    stack: BuildStack,
}

impl DocumentSession {
    /// Adds `sentinel` to the tree as furniture text and seeds the stack with it
    pub fn new(mut tree: DocTree, sentinel: impl Into<String>) -> Result<Self> {
        let anchor = tree.add_furniture_text(sentinel)?;
        Ok(Self {
            tree,
            stack: BuildStack::seeded(anchor),
        })
    }

    pub fn tree(&self) -> &DocTree {
        &self.tree
    }

    /// Direct tree access for anchor edits, which bypass the stack
    pub fn tree_mut(&mut self) -> &mut DocTree {
        &mut self.tree
    }

    pub fn stack(&self) -> &BuildStack {
        &self.stack
    }

    fn ensure_no_open_list(&self, what: &str) -> Result<()> {
        if self.stack.top().is_open_list() {
            return Err(FolioError::ValidationError(format!(
                "A list is currently opened. Please close the list before adding a {}!",
                what
            )));
        }
        Ok(())
    }

    pub fn add_title(&mut self, text: &str) -> Result<Anchor> {
        self.ensure_no_open_list("title")?;
        let anchor = self.tree.add_title(text)?;
        self.stack.replace_top(StackEntry::Leaf(anchor));
        Ok(anchor)
    }

    pub fn add_section_heading(&mut self, text: &str, level: u8) -> Result<Anchor> {
        if !(1..=6).contains(&level) {
            return Err(FolioError::ValidationError(format!(
                "section level must be between 1 and 6, got {}",
                level
            )));
        }
        self.ensure_no_open_list("section-heading")?;
        let anchor = self.tree.add_heading(text, level)?;
        self.stack.replace_top(StackEntry::Leaf(anchor));
        Ok(anchor)
    }

    pub fn add_paragraph(&mut self, text: &str) -> Result<Anchor> {
        self.ensure_no_open_list("paragraph")?;
        let anchor = self.tree.add_text(text)?;
        self.stack.replace_top(StackEntry::Leaf(anchor));
        Ok(anchor)
    }

    /// Opens a list, nested in the current list if one is open
    pub fn open_list(&mut self, ordered: bool) -> Result<Anchor> {
        let parent = match self.stack.top() {
            StackEntry::List { group, .. } => Some(*group),
            StackEntry::Leaf(_) => None,
        };
        let group = self.tree.add_group(ordered, parent)?;
        self.stack.push(StackEntry::List { group, ordered });
        Ok(group)
    }

    pub fn close_list(&mut self) -> Result<Anchor> {
        match self.stack.pop() {
            Some(entry) => Ok(entry.anchor()),
            None => Err(FolioError::ValidationError(
                "No list is currently opened. Please open a list before closing it!".to_string(),
            )),
        }
    }

    /// Appends the items to the open list in the given order
    pub fn add_list_items(&mut self, items: &[ListItemSpec]) -> Result<Vec<Anchor>> {
        let StackEntry::List { group, .. } = *self.stack.top() else {
            return Err(FolioError::ValidationError(
                "No list is currently opened. Please open a list before adding list-items!"
                    .to_string(),
            ));
        };
        if self.tree.get(&group).is_none() {
            return Err(FolioError::BadAnchor(format!(
                "the open list {} was deleted; close it before adding items",
                group
            )));
        }

        items
            .iter()
            .map(|item| self.tree.add_list_item(item.text.as_str(), item.marker.as_str(), group))
            .collect()
    }

    /// Parses `html_table` and adds its first table at document level, then
    /// its captions and footnotes in the given order. Nothing is added when
    /// the markup holds no table or a table over the size limits.
    pub fn add_table(
        &mut self,
        html_table: &str,
        captions: &[String],
        footnotes: &[String],
    ) -> Result<Anchor> {
        let wrapped = format!("<html><body>{}</body></html>", html_table);
        let Some(data) = html::parse_tables(&wrapped)?.into_iter().next() else {
            return Err(FolioError::InvalidInput(
                "Could not parse the html string of the table! Please fix the html and try again!"
                    .to_string(),
            ));
        };

        let table = self.tree.add_table(data, None)?;
        for caption in captions {
            self.tree.add_caption(table, caption.as_str())?;
        }
        for footnote in footnotes {
            self.tree.add_footnote(table, footnote.as_str())?;
        }
        Ok(table)
    }
}
