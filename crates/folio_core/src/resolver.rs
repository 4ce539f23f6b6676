//! Anchor-addressed reads and edits. These bypass the build stack.

use crate::anchor::Anchor;
use crate::tree::{DocTree, Node};
use folio_common::{FolioError, Result};

/// Parses `anchor` and returns the live node it names in `tree`
pub fn resolve<'t>(tree: &'t DocTree, anchor: &str) -> Result<&'t Node> {
    let parsed: Anchor = anchor.parse()?;
    tree.get(&parsed).ok_or_else(|| unresolved(tree, anchor))
}

fn resolve_mut<'t>(tree: &'t mut DocTree, anchor: &str) -> Result<&'t mut Node> {
    let parsed: Anchor = anchor.parse()?;
    if tree.get(&parsed).is_none() {
        return Err(unresolved(tree, anchor));
    }
    tree.get_mut(&parsed).ok_or_else(|| FolioError::BadAnchor(anchor.to_string()))
}

fn unresolved(tree: &DocTree, anchor: &str) -> FolioError {
    FolioError::BadAnchor(format!(
        "{} does not resolve to an item of document `{}`",
        anchor, tree.name
    ))
}

fn not_textual(node: &Node) -> FolioError {
    FolioError::WrongKind(format!(
        "Item at {} is a {}, not a textual item",
        node.self_ref,
        node.kind.label()
    ))
}

/// Text of a text-bearing node
pub fn read_text(node: &Node) -> Result<&str> {
    if !node.kind.carries_text() {
        return Err(not_textual(node));
    }
    Ok(node.text.as_deref().unwrap_or(""))
}

/// Replaces the text of the node at `anchor`. The old text is not kept.
pub fn update_text(tree: &mut DocTree, anchor: &str, text: &str) -> Result<()> {
    let node = resolve_mut(tree, anchor)?;
    if !node.kind.carries_text() {
        return Err(not_textual(node));
    }
    node.text = Some(text.to_string());
    Ok(())
}

/// Deletes the nodes at `anchors` and their subtrees. If any anchor fails to
/// parse or resolve, nothing is deleted.
pub fn delete(tree: &mut DocTree, anchors: &[String]) -> Result<usize> {
    let parsed = anchors
        .iter()
        .map(|a| a.parse::<Anchor>())
        .collect::<Result<Vec<_>>>()?;
    tree.delete(&parsed)
}
