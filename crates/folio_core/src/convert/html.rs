//! Tolerant HTML reader
//!
//! Builds a small element tree out of an HTML fragment or page, closing the
//! elements HTML lets authors leave open (`p`, `li`, `td`, `th`, `tr`, table
//! sections), and turns it into document nodes or table grids.

use crate::anchor::Anchor;
use crate::tree::{DocTree, TableCell, TableData};
use folio_common::{FolioError, Result};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];
const BLOCK_ELEMENTS: &[&str] = &[
    "div", "table", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article", "p",
    "blockquote", "pre", "header", "footer",
];
/// Upper bound for `rowspan`/`colspan`
const MAX_SPAN: usize = 1000;
/// Widest table accepted, in grid columns
pub const MAX_TABLE_COLUMNS: usize = 1000;
/// Largest table accepted, in grid cells (rows times columns)
pub const MAX_TABLE_CELLS: usize = 1_000_000;
/// Open elements kept on the stack; deeper start tags are dropped and their
/// content lands in the innermost kept element
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<HtmlNode>,
}

impl Element {
    fn new(name: String, attrs: Vec<(String, String)>) -> Self {
        Self {
            name,
            attrs,
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Text of the element with whitespace collapsed
    pub fn text_content(&self) -> String {
        self.text_excluding(&[])
    }

    /// Text of the element, skipping descendants named in `skip`
    pub fn text_excluding(&self, skip: &[&str]) -> String {
        let mut raw = String::new();
        collect_text(&self.children, skip, &mut raw);
        collapse_whitespace(&raw)
    }

    fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            HtmlNode::Element(el) => Some(el),
            HtmlNode::Text(_) => None,
        })
    }
}

fn collect_text(nodes: &[HtmlNode], skip: &[&str], out: &mut String) {
    for node in nodes {
        match node {
            HtmlNode::Text(text) => out.push_str(text),
            HtmlNode::Element(el) if el.name == "br" => out.push(' '),
            HtmlNode::Element(el) if skip.contains(&el.name.as_str()) => {}
            HtmlNode::Element(el) => {
                // Block boundaries separate words even without whitespace in the source
                out.push(' ');
                collect_text(&el.children, skip, out);
                out.push(' ');
            }
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, PartialEq)]
enum Token {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End(String),
    Text(String),
}

fn tokenize(input: &str) -> Vec<Token> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }

        let rest = &input[pos..];
        let next = bytes.get(pos + 1).copied();
        let is_markup = rest.starts_with("<!")
            || rest.starts_with("<?")
            || (next == Some(b'/') && bytes.get(pos + 2).is_some_and(u8::is_ascii_alphabetic))
            || next.is_some_and(|b| b.is_ascii_alphabetic());
        if !is_markup {
            pos += 1;
            continue;
        }

        if text_start < pos {
            tokens.push(Token::Text(decode_entities(&input[text_start..pos])));
        }

        if rest.starts_with("<!--") {
            pos = rest[4..].find("-->").map_or(bytes.len(), |end| pos + 4 + end + 3);
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = rest.find('>').map_or(bytes.len(), |end| pos + end + 1);
        } else if next == Some(b'/') {
            let end = rest.find('>').map_or(bytes.len(), |end| pos + end);
            let name = input[pos + 2..end]
                .trim()
                .to_ascii_lowercase();
            tokens.push(Token::End(name));
            pos = (end + 1).min(bytes.len());
        } else {
            let (token, after) = read_start_tag(input, pos);
            let raw_text_name = match &token {
                Token::Start {
                    name,
                    self_closing: false,
                    ..
                } if RAW_TEXT_ELEMENTS.contains(&name.as_str()) => Some(name.clone()),
                _ => None,
            };
            tokens.push(token);
            pos = after;

            if let Some(name) = raw_text_name {
                // Skip script/style bodies entirely
                let closing = format!("</{}", name);
                let lower = input[pos..].to_ascii_lowercase();
                match lower.find(&closing) {
                    Some(offset) => pos += offset,
                    None => pos = bytes.len(),
                }
            }
        }
        text_start = pos;
    }

    if text_start < bytes.len() {
        tokens.push(Token::Text(decode_entities(&input[text_start..])));
    }
    tokens
}

/// Parses `<name attr=value ...>` starting at `start` (which points at `<`).
/// Returns the token and the position just past the tag.
fn read_start_tag(input: &str, start: usize) -> (Token, usize) {
    let bytes = input.as_bytes();
    let mut pos = start + 1;

    let name_start = pos;
    while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'-') {
        pos += 1;
    }
    let name = input[name_start..pos].to_ascii_lowercase();

    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos) {
            None => break,
            Some(b'>') => {
                pos += 1;
                break;
            }
            Some(b'/') => {
                if bytes.get(pos + 1) == Some(&b'>') {
                    self_closing = true;
                    pos += 2;
                    break;
                }
                pos += 1;
                continue;
            }
            Some(_) => {}
        }

        let attr_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
        {
            pos += 1;
        }
        let attr_name = input[attr_start..pos].to_ascii_lowercase();

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let mut value = String::new();
        if bytes.get(pos) == Some(&b'=') {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            match bytes.get(pos) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let value_start = pos + 1;
                    let value_end = input[value_start..]
                        .find(quote as char)
                        .map_or(bytes.len(), |end| value_start + end);
                    value = decode_entities(&input[value_start..value_end]);
                    pos = (value_end + 1).min(bytes.len());
                }
                _ => {
                    let value_start = pos;
                    while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' {
                        pos += 1;
                    }
                    value = decode_entities(&input[value_start..pos]);
                }
            }
        }

        if !attr_name.is_empty() {
            attrs.push((attr_name, value));
        }
    }

    (
        Token::Start {
            name,
            attrs,
            self_closing,
        },
        pos,
    )
}

/// Decodes the named entities common in hand-written markup plus numeric ones.
/// Unknown entities are kept verbatim.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..]
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| {
                let entity = &rest[1..1 + semi];
                let ch = match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => entity
                        .strip_prefix("#x")
                        .or_else(|| entity.strip_prefix("#X"))
                        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                        .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                        .and_then(char::from_u32),
                };
                ch.map(|ch| (ch, semi + 2))
            });

        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

struct TreeBuilder {
    open: Vec<Element>,
    roots: Vec<HtmlNode>,
}

impl TreeBuilder {
    fn attach(&mut self, node: HtmlNode) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn close_top(&mut self) {
        if let Some(el) = self.open.pop() {
            self.attach(HtmlNode::Element(el));
        }
    }

    /// Closes open elements down to and including the one at `index`
    fn close_to(&mut self, index: usize) {
        while self.open.len() > index {
            self.close_top();
        }
    }

    /// Closes the nearest open element named in `targets`, unless an element
    /// named in `boundaries` is found first.
    fn close_implied(&mut self, targets: &[&str], boundaries: &[&str]) {
        for index in (0..self.open.len()).rev() {
            let name = self.open[index].name.as_str();
            if targets.contains(&name) {
                self.close_to(index);
                return;
            }
            if boundaries.contains(&name) {
                return;
            }
        }
    }

    fn start(&mut self, name: String, attrs: Vec<(String, String)>, self_closing: bool) {
        match name.as_str() {
            "li" => self.close_implied(&["li"], &["ul", "ol", "table"]),
            "td" | "th" => self.close_implied(&["td", "th"], &["tr", "table"]),
            "tr" => self.close_implied(&["tr"], &["table", "thead", "tbody", "tfoot"]),
            "thead" | "tbody" | "tfoot" => {
                self.close_implied(&["thead", "tbody", "tfoot"], &["table"])
            }
            _ => {}
        }
        if BLOCK_ELEMENTS.contains(&name.as_str()) {
            if let Some(top) = self.open.last() {
                if top.name == "p" {
                    self.close_top();
                }
            }
        }

        let element = Element::new(name, attrs);
        if self_closing || VOID_ELEMENTS.contains(&element.name.as_str()) {
            self.attach(HtmlNode::Element(element));
        } else if self.open.len() >= MAX_NESTING {
            tracing::debug!("Dropping <{}> nested deeper than {}", element.name, MAX_NESTING);
        } else {
            self.open.push(element);
        }
    }

    fn end(&mut self, name: &str) {
        if let Some(index) = self.open.iter().rposition(|el| el.name == name) {
            self.close_to(index);
        }
    }

    fn finish(mut self) -> Vec<HtmlNode> {
        self.close_to(0);
        self.roots
    }
}

/// Parses an HTML page or fragment into a list of top-level nodes
pub fn parse_fragment(input: &str) -> Vec<HtmlNode> {
    let mut builder = TreeBuilder {
        open: Vec::new(),
        roots: Vec::new(),
    };

    for token in tokenize(input) {
        match token {
            Token::Start {
                name,
                attrs,
                self_closing,
            } => builder.start(name, attrs, self_closing),
            Token::End(name) => builder.end(&name),
            Token::Text(text) => builder.attach(HtmlNode::Text(text)),
        }
    }
    builder.finish()
}

/// Every non-empty `<table>` in document order, nested tables after their
/// parent. Fails on a table larger than [`MAX_TABLE_COLUMNS`] or
/// [`MAX_TABLE_CELLS`].
pub fn parse_tables(html: &str) -> Result<Vec<TableData>> {
    let mut tables = Vec::new();
    collect_tables(&parse_fragment(html), &mut tables)?;
    Ok(tables)
}

fn collect_tables(nodes: &[HtmlNode], out: &mut Vec<TableData>) -> Result<()> {
    for node in nodes {
        if let HtmlNode::Element(el) = node {
            if el.name == "table" {
                let data = table_data(el)?;
                if !data.table_cells.is_empty() {
                    out.push(data);
                }
            }
            collect_tables(&el.children, out)?;
        }
    }
    Ok(())
}

fn oversized(what: String) -> FolioError {
    FolioError::InvalidInput(format!("table is too large: {}", what))
}

fn table_rows(table: &Element) -> Vec<&Element> {
    let mut rows = Vec::new();
    for child in table.child_elements() {
        match child.name.as_str() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child.child_elements().filter(|el| el.name == "tr"))
            }
            _ => {}
        }
    }
    rows
}

fn span_attr(el: &Element, name: &str) -> usize {
    el.attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&span| span > 0)
        .map_or(1, |span| span.min(MAX_SPAN))
}

/// Lays the cells of `table` out on a grid, honouring `rowspan` and `colspan`.
/// Row spans are clipped to the rows the table actually has.
pub fn table_data(table: &Element) -> Result<TableData> {
    let rows = table_rows(table);
    let num_rows = rows.len();
    let mut occupied: Vec<Vec<bool>> = vec![Vec::new(); num_rows];
    let mut cells = Vec::new();
    let mut num_cols = 0;

    for (row_index, row) in rows.iter().enumerate() {
        let mut col = 0;
        for cell in row.child_elements().filter(|el| el.name == "td" || el.name == "th") {
            while occupied[row_index].get(col).copied().unwrap_or(false) {
                col += 1;
            }

            let row_span = span_attr(cell, "rowspan");
            let col_span = span_attr(cell, "colspan");
            let end_row = (row_index + row_span).min(num_rows);
            let end_col = col + col_span;
            if end_col > MAX_TABLE_COLUMNS {
                return Err(oversized(format!(
                    "more than {} columns",
                    MAX_TABLE_COLUMNS
                )));
            }

            for taken in occupied.iter_mut().take(end_row).skip(row_index) {
                if taken.len() < end_col {
                    taken.resize(end_col, false);
                }
                taken[col..end_col].iter_mut().for_each(|slot| *slot = true);
            }

            cells.push(TableCell {
                text: cell.text_excluding(&["table"]),
                row_span: end_row - row_index,
                col_span,
                start_row_offset_idx: row_index,
                end_row_offset_idx: end_row,
                start_col_offset_idx: col,
                end_col_offset_idx: end_col,
                column_header: cell.name == "th",
                row_header: false,
            });

            num_cols = num_cols.max(end_col);
            col = end_col;
        }
    }

    if num_rows.saturating_mul(num_cols) > MAX_TABLE_CELLS {
        return Err(oversized(format!(
            "{} x {} exceeds {} cells",
            num_rows, num_cols, MAX_TABLE_CELLS
        )));
    }

    Ok(TableData {
        num_rows,
        num_cols,
        table_cells: cells,
    })
}

/// Converts a parsed HTML page into document nodes
pub fn build_tree(tree: &mut DocTree, nodes: &[HtmlNode]) -> Result<()> {
    for node in nodes {
        match node {
            HtmlNode::Text(text) => {
                let text = collapse_whitespace(text);
                if !text.is_empty() {
                    tree.add_text(text)?;
                }
            }
            HtmlNode::Element(el) => add_element(tree, el)?,
        }
    }
    Ok(())
}

fn add_element(tree: &mut DocTree, el: &Element) -> Result<()> {
    match el.name.as_str() {
        "head" | "script" | "style" | "template" => {}
        "h1" => {
            let text = el.text_content();
            if !text.is_empty() {
                tree.add_title(text)?;
            }
        }
        "h2" | "h3" | "h4" | "h5" | "h6" => {
            let text = el.text_content();
            if !text.is_empty() {
                let level = el.name[1..].parse::<u8>().unwrap_or(2) - 1;
                tree.add_heading(text, level)?;
            }
        }
        "p" | "pre" | "blockquote" => {
            let text = el.text_content();
            if !text.is_empty() {
                tree.add_text(text)?;
            }
        }
        "ul" | "ol" => add_list(tree, el, None)?,
        "table" => {
            let data = table_data(el)?;
            if !data.table_cells.is_empty() {
                let table = tree.add_table(data, None)?;
                for caption in el.child_elements().filter(|c| c.name == "caption") {
                    let text = caption.text_content();
                    if !text.is_empty() {
                        tree.add_caption(table, text)?;
                    }
                }
            }
        }
        _ => build_tree(tree, &el.children)?,
    }
    Ok(())
}

fn add_list(tree: &mut DocTree, list: &Element, parent: Option<Anchor>) -> Result<()> {
    let ordered = list.name == "ol";
    let group = tree.add_group(ordered, parent)?;
    let mut number = list
        .attr("start")
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(1);

    for item in list.child_elements().filter(|el| el.name == "li") {
        let text = item.text_excluding(&["ul", "ol"]);
        let marker = if ordered {
            format!("{}.", number)
        } else {
            "-".to_string()
        };
        number += 1;
        tree.add_list_item(text, marker, group)?;

        for nested in item
            .child_elements()
            .filter(|el| el.name == "ul" || el.name == "ol")
        {
            add_list(tree, nested, Some(group))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeKind;

    fn element(nodes: &[HtmlNode]) -> &Element {
        match &nodes[0] {
            HtmlNode::Element(el) => el,
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_elements_and_attributes() {
        let nodes = parse_fragment(r#"<div class="x" data-n=3><b>bold</b> tail</div>"#);
        let div = element(&nodes);
        assert_eq!(div.name, "div");
        assert_eq!(div.attr("class"), Some("x"));
        assert_eq!(div.attr("data-n"), Some("3"));
        assert_eq!(div.text_content(), "bold tail");
    }

    #[test]
    fn test_implicit_cell_and_row_closing() {
        let tables = parse_tables("<table><tr><td>a<td>b<tr><td>c<td>d</table>").unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].num_rows, 2);
        assert_eq!(tables[0].num_cols, 2);
        assert_eq!(
            tables[0].grid(),
            vec![vec!["a", "b"], vec!["c", "d"]]
                .into_iter()
                .map(|r| r.into_iter().map(String::from).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_rowspan_and_colspan_layout() {
        let html = "<table><tr><th colspan='2'>Demographics</th></tr><tr><th>Name</th><th>Age</th></tr><tr><td>John</td><td rowspan='2'>30</td></tr><tr><td>Jane</td></tr></table>";
        let tables = parse_tables(html).unwrap();
        assert_eq!(tables.len(), 1);
        let data = &tables[0];
        assert_eq!((data.num_rows, data.num_cols), (4, 2));

        let jane = data.table_cells.iter().find(|c| c.text == "Jane").unwrap();
        assert_eq!((jane.start_row_offset_idx, jane.start_col_offset_idx), (3, 0));

        let age = data.table_cells.iter().find(|c| c.text == "30").unwrap();
        assert_eq!(age.row_span, 2);
        assert_eq!(data.grid()[3][1], "30");
        assert!(data.table_cells[0].column_header);
    }

    #[test]
    fn test_rowspan_clipped_to_table() {
        let tables = parse_tables("<table><tr><td rowspan=9>x</td></tr></table>").unwrap();
        assert_eq!(tables[0].table_cells[0].row_span, 1);
        assert_eq!(tables[0].num_rows, 1);
    }

    #[test]
    fn test_no_tables_and_empty_tables() {
        assert!(parse_tables("<p>no table here</p>").unwrap().is_empty());
        assert!(parse_tables("<table></table>").unwrap().is_empty());
        assert!(parse_tables("not html at all < 3").unwrap().is_empty());
    }

    #[test]
    fn test_multiple_tables_in_document_order() {
        let tables = parse_tables("<table><tr><td>first</td></tr></table><table><tr><td>second</td></tr></table>").unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].table_cells[0].text, "first");
    }

    #[test]
    fn test_oversized_tables_are_rejected() {
        let wide = "<table><tr><td colspan=1000>a</td><td>b</td></tr></table>";
        assert!(matches!(parse_tables(wide), Err(FolioError::InvalidInput(_))));

        let mut tall = "<table>".to_string();
        tall.push_str(&"<tr><td>r</td></tr>".repeat(1000));
        tall.push_str("<tr><td colspan=1000>x</td></tr></table>");
        assert!(matches!(parse_tables(&tall), Err(FolioError::InvalidInput(_))));

        let fits = "<table><tr><td colspan=1000>a</td></tr></table>";
        assert_eq!(parse_tables(fits).unwrap()[0].num_cols, 1000);
    }

    #[test]
    fn test_deep_nesting_is_capped() {
        let html = format!("{}x", "<div>".repeat(50_000));
        let nodes = parse_fragment(&html);

        let mut depth = 0;
        let mut current = &nodes;
        while let Some(HtmlNode::Element(el)) = current.first() {
            depth += 1;
            current = &el.children;
        }
        assert_eq!(depth, MAX_NESTING);
        assert_eq!(current, &vec![HtmlNode::Text("x".to_string())]);

        let mut tree = DocTree::new("deep");
        build_tree(&mut tree, &nodes).unwrap();
        assert_eq!(tree.iter_items()[0].0.text.as_deref(), Some("x"));
    }

    #[test]
    fn test_entities_and_comments() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt; &#65;&#x42; &bogus;"), "a & b <c> AB &bogus;");
        let nodes = parse_fragment("<p>x<!-- hidden <b>y</b> -->z</p>");
        assert_eq!(element(&nodes).text_content(), "xz");
    }

    #[test]
    fn test_script_bodies_are_skipped() {
        let nodes = parse_fragment("<div><script>if (a < b) { x = '<p>' }</script>ok</div>");
        assert_eq!(element(&nodes).text_content(), "ok");
    }

    #[test]
    fn test_build_tree_from_page() {
        let html = "<html><head><title>t</title></head><body>\
            <h1>Report</h1><h2>Intro</h2><p>Hello <i>there</i>\
            <ul><li>one<li>two<ol><li>nested</ol></ul>\
            <table><caption>Totals</caption><tr><td>1</td></tr></table>\
            </body></html>";
        let mut tree = DocTree::new("page");
        build_tree(&mut tree, &parse_fragment(html)).unwrap();

        let labels: Vec<(&str, usize)> = tree
            .iter_items()
            .into_iter()
            .map(|(n, d)| (n.kind.label(), d))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("title", 1),
                ("section_header", 1),
                ("text", 1),
                ("list", 1),
                ("list_item", 2),
                ("list_item", 2),
                ("ordered_list", 2),
                ("list_item", 3),
                ("table", 1),
                ("caption", 2),
            ]
        );

        let heading = tree
            .iter_items()
            .into_iter()
            .find(|(n, _)| matches!(n.kind, NodeKind::SectionHeader { .. }))
            .unwrap()
            .0;
        assert_eq!(heading.kind, NodeKind::SectionHeader { level: 1 });
        assert_eq!(heading.text.as_deref(), Some("Intro"));
    }
}
