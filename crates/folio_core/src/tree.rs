//! Document tree
//!
//! A `DocTree` owns every node of one document. Nodes live in three
//! collections (texts, groups, tables) and are addressed by [`Anchor`].
//! Deleting a node empties its slot instead of shifting the collection, so an
//! anchor is never reused and surviving anchors never change.

use crate::anchor::{Anchor, Collection};
use folio_common::{FolioError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const SCHEMA_NAME: &str = "FolioDocument";
pub const SCHEMA_VERSION: &str = "1.0.0";
/// Deepest a list group may sit below the body
pub const MAX_LIST_DEPTH: usize = 256;

/// Whether a node is part of the document content or bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentLayer {
    #[default]
    Body,
    Furniture,
}

/// One cell of a table grid, spans included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCell {
    pub text: String,
    pub row_span: usize,
    pub col_span: usize,
    pub start_row_offset_idx: usize,
    pub end_row_offset_idx: usize,
    pub start_col_offset_idx: usize,
    pub end_col_offset_idx: usize,
    #[serde(default)]
    pub column_header: bool,
    #[serde(default)]
    pub row_header: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableData {
    pub num_rows: usize,
    pub num_cols: usize,
    pub table_cells: Vec<TableCell>,
}

impl TableData {
    /// Dense `num_rows x num_cols` text grid. Spanned cells repeat their text.
    pub fn grid(&self) -> Vec<Vec<String>> {
        let mut grid = vec![vec![String::new(); self.num_cols]; self.num_rows];
        for cell in &self.table_cells {
            let rows = cell.start_row_offset_idx..cell.end_row_offset_idx.min(self.num_rows);
            for row in rows {
                let cols = cell.start_col_offset_idx..cell.end_col_offset_idx.min(self.num_cols);
                for col in cols {
                    grid[row][col] = cell.text.clone();
                }
            }
        }
        grid
    }
}

/// Node kind. Serialized as the node's `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum NodeKind {
    Title,
    SectionHeader {
        level: u8,
    },
    Text,
    ListItem {
        marker: String,
        enumerated: bool,
    },
    Caption,
    Footnote,
    Table {
        data: TableData,
        captions: Vec<Anchor>,
        footnotes: Vec<Anchor>,
    },
    List,
    OrderedList,
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Title => "title",
            NodeKind::SectionHeader { .. } => "section_header",
            NodeKind::Text => "text",
            NodeKind::ListItem { .. } => "list_item",
            NodeKind::Caption => "caption",
            NodeKind::Footnote => "footnote",
            NodeKind::Table { .. } => "table",
            NodeKind::List => "list",
            NodeKind::OrderedList => "ordered_list",
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            NodeKind::Table { .. } => Collection::Tables,
            NodeKind::List | NodeKind::OrderedList => Collection::Groups,
            _ => Collection::Texts,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, NodeKind::List | NodeKind::OrderedList)
    }

    /// True for every kind stored in the `texts` collection
    pub fn carries_text(&self) -> bool {
        self.collection() == Collection::Texts
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub self_ref: Anchor,
    pub parent: Anchor,
    #[serde(default)]
    pub children: Vec<Anchor>,
    #[serde(default)]
    pub content_layer: ContentLayer,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Root {
    self_ref: Anchor,
    children: Vec<Anchor>,
}

/// In-memory document: an ordered tree of nodes under an implicit body root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocTree {
    schema_name: String,
    version: String,
    pub name: String,
    body: Root,
    texts: Vec<Option<Node>>,
    groups: Vec<Option<Node>>,
    tables: Vec<Option<Node>>,
}

impl DocTree {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema_name: SCHEMA_NAME.to_string(),
            version: SCHEMA_VERSION.to_string(),
            name: name.into(),
            body: Root {
                self_ref: Anchor::Body,
                children: Vec::new(),
            },
            texts: Vec::new(),
            groups: Vec::new(),
            tables: Vec::new(),
        }
    }

    fn slots(&self, collection: Collection) -> &Vec<Option<Node>> {
        match collection {
            Collection::Texts => &self.texts,
            Collection::Groups => &self.groups,
            Collection::Tables => &self.tables,
        }
    }

    fn slots_mut(&mut self, collection: Collection) -> &mut Vec<Option<Node>> {
        match collection {
            Collection::Texts => &mut self.texts,
            Collection::Groups => &mut self.groups,
            Collection::Tables => &mut self.tables,
        }
    }

    /// Live node at `anchor`. `None` for the body, deleted or unknown anchors.
    pub fn get(&self, anchor: &Anchor) -> Option<&Node> {
        match anchor {
            Anchor::Body => None,
            Anchor::Item { collection, index } => {
                self.slots(*collection).get(*index).and_then(Option::as_ref)
            }
        }
    }

    pub fn get_mut(&mut self, anchor: &Anchor) -> Option<&mut Node> {
        match anchor {
            Anchor::Body => None,
            Anchor::Item { collection, index } => self
                .slots_mut(*collection)
                .get_mut(*index)
                .and_then(Option::as_mut),
        }
    }

    /// True for the body and for every live node
    pub fn contains(&self, anchor: &Anchor) -> bool {
        matches!(anchor, Anchor::Body) || self.get(anchor).is_some()
    }

    pub fn children(&self, anchor: &Anchor) -> Option<&[Anchor]> {
        match anchor {
            Anchor::Body => Some(&self.body.children),
            _ => self.get(anchor).map(|node| node.children.as_slice()),
        }
    }

    fn children_mut(&mut self, anchor: &Anchor) -> Option<&mut Vec<Anchor>> {
        match anchor {
            Anchor::Body => Some(&mut self.body.children),
            _ => self.get_mut(anchor).map(|node| &mut node.children),
        }
    }

    fn insert(
        &mut self,
        parent: Anchor,
        kind: NodeKind,
        text: Option<String>,
        content_layer: ContentLayer,
    ) -> Result<Anchor> {
        if !self.contains(&parent) {
            return Err(FolioError::BadAnchor(format!(
                "parent {} does not resolve in document `{}`",
                parent, self.name
            )));
        }

        let collection = kind.collection();
        let slots = self.slots_mut(collection);
        let anchor = Anchor::item(collection, slots.len());
        slots.push(Some(Node {
            self_ref: anchor,
            parent,
            children: Vec::new(),
            content_layer,
            kind,
            text,
        }));

        if let Some(children) = self.children_mut(&parent) {
            children.push(anchor);
        }
        Ok(anchor)
    }

    pub fn add_title(&mut self, text: impl Into<String>) -> Result<Anchor> {
        self.insert(Anchor::Body, NodeKind::Title, Some(text.into()), ContentLayer::Body)
    }

    pub fn add_heading(&mut self, text: impl Into<String>, level: u8) -> Result<Anchor> {
        self.insert(
            Anchor::Body,
            NodeKind::SectionHeader { level },
            Some(text.into()),
            ContentLayer::Body,
        )
    }

    pub fn add_text(&mut self, text: impl Into<String>) -> Result<Anchor> {
        self.insert(Anchor::Body, NodeKind::Text, Some(text.into()), ContentLayer::Body)
    }

    /// Bookkeeping text (prompt or source marker), hidden from overview and export
    pub fn add_furniture_text(&mut self, text: impl Into<String>) -> Result<Anchor> {
        self.insert(Anchor::Body, NodeKind::Text, Some(text.into()), ContentLayer::Furniture)
    }

    /// Adds a list group under `parent`, or under the body when `None`.
    /// Fails with `InvalidInput` past [`MAX_LIST_DEPTH`].
    pub fn add_group(&mut self, ordered: bool, parent: Option<Anchor>) -> Result<Anchor> {
        let parent = parent.unwrap_or(Anchor::Body);
        if self.depth(&parent) >= MAX_LIST_DEPTH {
            return Err(FolioError::InvalidInput(format!(
                "lists cannot nest more than {} levels deep",
                MAX_LIST_DEPTH
            )));
        }
        let kind = if ordered {
            NodeKind::OrderedList
        } else {
            NodeKind::List
        };
        self.insert(parent, kind, None, ContentLayer::Body)
    }

    /// Steps from `anchor` up to the body: 0 for the body, 1 for its
    /// children. Stops counting past [`MAX_LIST_DEPTH`].
    pub fn depth(&self, anchor: &Anchor) -> usize {
        let mut depth = 0;
        let mut current = *anchor;
        while let Some(node) = self.get(&current) {
            depth += 1;
            if depth > MAX_LIST_DEPTH {
                break;
            }
            current = node.parent;
        }
        depth
    }

    pub fn add_list_item(
        &mut self,
        text: impl Into<String>,
        marker: impl Into<String>,
        group: Anchor,
    ) -> Result<Anchor> {
        let enumerated = match self.get(&group).map(|node| &node.kind) {
            Some(NodeKind::OrderedList) => true,
            Some(NodeKind::List) => false,
            Some(other) => {
                return Err(FolioError::WrongKind(format!(
                    "list items need a list parent, {} is a {}",
                    group,
                    other.label()
                )))
            }
            None => {
                return Err(FolioError::BadAnchor(format!(
                    "list {} does not resolve in document `{}`",
                    group, self.name
                )))
            }
        };

        self.insert(
            group,
            NodeKind::ListItem {
                marker: marker.into(),
                enumerated,
            },
            Some(text.into()),
            ContentLayer::Body,
        )
    }

    pub fn add_table(&mut self, data: TableData, parent: Option<Anchor>) -> Result<Anchor> {
        self.insert(
            parent.unwrap_or(Anchor::Body),
            NodeKind::Table {
                data,
                captions: Vec::new(),
                footnotes: Vec::new(),
            },
            None,
            ContentLayer::Body,
        )
    }

    pub fn add_caption(&mut self, table: Anchor, text: impl Into<String>) -> Result<Anchor> {
        self.add_table_note(table, NodeKind::Caption, text.into())
    }

    pub fn add_footnote(&mut self, table: Anchor, text: impl Into<String>) -> Result<Anchor> {
        self.add_table_note(table, NodeKind::Footnote, text.into())
    }

    fn add_table_note(&mut self, table: Anchor, kind: NodeKind, text: String) -> Result<Anchor> {
        match self.get(&table).map(|node| &node.kind) {
            Some(NodeKind::Table { .. }) => {}
            Some(other) => {
                return Err(FolioError::WrongKind(format!(
                    "{} is a {}, not a table",
                    table,
                    other.label()
                )))
            }
            None => {
                return Err(FolioError::BadAnchor(format!(
                    "table {} does not resolve in document `{}`",
                    table, self.name
                )))
            }
        }

        let is_caption = kind == NodeKind::Caption;
        let anchor = self.insert(table, kind, Some(text), ContentLayer::Body)?;
        if let Some(Node {
            kind: NodeKind::Table {
                captions, footnotes, ..
            },
            ..
        }) = self.get_mut(&table)
        {
            if is_caption {
                captions.push(anchor);
            } else {
                footnotes.push(anchor);
            }
        }
        Ok(anchor)
    }

    /// Removes the nodes at `anchors` together with their subtrees.
    ///
    /// Every anchor is checked before anything is removed: if one of them does
    /// not resolve, the tree is left untouched. Returns the number of nodes
    /// removed, descendants included.
    pub fn delete(&mut self, anchors: &[Anchor]) -> Result<usize> {
        let unresolved: Vec<String> = anchors
            .iter()
            .filter(|a| self.get(a).is_none())
            .map(|a| a.to_string())
            .collect();
        if !unresolved.is_empty() {
            return Err(FolioError::BadAnchor(format!(
                "{} do not resolve in document `{}`; nothing was deleted",
                unresolved.join(", "),
                self.name
            )));
        }

        let mut doomed: Vec<Anchor> = Vec::new();
        let mut seen: HashSet<Anchor> = HashSet::new();
        let mut pending: Vec<Anchor> = anchors.to_vec();
        while let Some(anchor) = pending.pop() {
            if !seen.insert(anchor) {
                continue;
            }
            if let Some(node) = self.get(&anchor) {
                pending.extend(node.children.iter().copied());
            }
            doomed.push(anchor);
        }

        let detach: Vec<(Anchor, Anchor)> = doomed
            .iter()
            .filter_map(|a| self.get(a).map(|node| (*a, node.parent)))
            .filter(|(_, parent)| !seen.contains(parent))
            .collect();

        for (anchor, parent) in detach {
            if let Some(children) = self.children_mut(&parent) {
                children.retain(|c| *c != anchor);
            }
            if let Some(Node {
                kind: NodeKind::Table {
                    captions, footnotes, ..
                },
                ..
            }) = self.get_mut(&parent)
            {
                captions.retain(|c| *c != anchor);
                footnotes.retain(|c| *c != anchor);
            }
        }

        for anchor in &doomed {
            if let Anchor::Item { collection, index } = anchor {
                if let Some(slot) = self.slots_mut(*collection).get_mut(*index) {
                    *slot = None;
                }
            }
        }

        Ok(doomed.len())
    }

    /// Body-layer nodes in document order (pre-order), with their depth.
    /// Children of the body have depth 1.
    pub fn iter_items(&self) -> Vec<(&Node, usize)> {
        let mut items = Vec::new();
        let mut pending: Vec<(Anchor, usize)> =
            self.body.children.iter().rev().map(|a| (*a, 1)).collect();

        while let Some((anchor, depth)) = pending.pop() {
            let Some(node) = self.get(&anchor) else {
                continue;
            };
            if node.content_layer == ContentLayer::Furniture {
                continue;
            }
            items.push((node, depth));
            pending.extend(node.children.iter().rev().map(|a| (*a, depth + 1)));
        }
        items
    }

    /// Live nodes in all collections and layers
    pub fn node_count(&self) -> usize {
        [&self.texts, &self.groups, &self.tables]
            .iter()
            .map(|slots| slots.iter().filter(|slot| slot.is_some()).count())
            .sum()
    }

    /// True when the document has no body-layer content
    pub fn is_empty(&self) -> bool {
        self.iter_items().is_empty()
    }

    /// Checks that every stored node sits in the slot its anchor names and
    /// that every child reference resolves. Used after loading a JSON dump.
    pub fn check_integrity(&self) -> Result<()> {
        if self.schema_name != SCHEMA_NAME {
            return Err(FolioError::InvalidInput(format!(
                "unsupported schema `{}`",
                self.schema_name
            )));
        }
        for collection in [Collection::Texts, Collection::Groups, Collection::Tables] {
            for (index, slot) in self.slots(collection).iter().enumerate() {
                let Some(node) = slot else { continue };
                let expected = Anchor::item(collection, index);
                if node.self_ref != expected || node.kind.collection() != collection {
                    return Err(FolioError::InvalidInput(format!(
                        "node {} is stored at {}",
                        node.self_ref, expected
                    )));
                }
                if let Some(missing) = node.children.iter().find(|c| self.get(c).is_none()) {
                    return Err(FolioError::InvalidInput(format!(
                        "{} references missing child {}",
                        expected, missing
                    )));
                }
            }
        }
        if let Some(missing) = self.body.children.iter().find(|c| self.get(c).is_none()) {
            return Err(FolioError::InvalidInput(format!(
                "body references missing child {}",
                missing
            )));
        }
        self.check_reachability()
    }

    /// Every live node hangs off the body exactly once and names the node
    /// that lists it as its parent. Rules out cycles and shared subtrees.
    fn check_reachability(&self) -> Result<()> {
        let mut seen: HashSet<Anchor> = HashSet::new();
        let mut pending: Vec<(Anchor, Anchor, usize)> = self
            .body
            .children
            .iter()
            .map(|c| (Anchor::Body, *c, 1))
            .collect();

        while let Some((parent, anchor, depth)) = pending.pop() {
            if depth > MAX_LIST_DEPTH + 1 {
                return Err(FolioError::InvalidInput(format!(
                    "{} sits deeper than {} levels",
                    anchor,
                    MAX_LIST_DEPTH + 1
                )));
            }
            if !seen.insert(anchor) {
                return Err(FolioError::InvalidInput(format!(
                    "{} is referenced more than once",
                    anchor
                )));
            }
            let Some(node) = self.get(&anchor) else {
                return Err(FolioError::InvalidInput(format!(
                    "{} references missing child {}",
                    parent, anchor
                )));
            };
            if node.parent != parent {
                return Err(FolioError::InvalidInput(format!(
                    "{} is listed under {} but names {} as its parent",
                    anchor, parent, node.parent
                )));
            }
            if let NodeKind::Table {
                captions, footnotes, ..
            } = &node.kind
            {
                if let Some(stray) = captions
                    .iter()
                    .chain(footnotes)
                    .find(|a| !node.children.contains(*a))
                {
                    return Err(FolioError::InvalidInput(format!(
                        "table {} lists {} outside its children",
                        anchor, stray
                    )));
                }
            }
            pending.extend(node.children.iter().map(|c| (anchor, *c, depth + 1)));
        }

        if seen.len() != self.node_count() {
            return Err(FolioError::InvalidInput(format!(
                "{} nodes are not reachable from the body",
                self.node_count() - seen.len()
            )));
        }
        Ok(())
    }
}
