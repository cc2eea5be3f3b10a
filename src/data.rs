//
// Copyright (c) The yangdb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! XML data trees.
//!
//! An [`XmlTree`] owns its element nodes in an arena and hands out
//! [`XmlNodeRef`] handles for navigation. Every tree has a synthetic
//! root element named `config` whose children are the document's
//! top-level elements; serialization prints the children, not the root.

use bitflags::bitflags;

use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::iter::{Ancestors, NodeIterable, Set, Siblings, Traverse};
use crate::schema::{SchemaNode, SchemaNodeId};
use crate::utils::Binding;
use crate::xpath;

/// Name of the synthetic root element.
pub const ROOT_NAME: &str = "config";

/// Stable handle to an element within its tree's arena.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct XmlNodeId(pub(crate) usize);

bitflags! {
    /// XML node flags.
    pub struct XmlFlags: u8 {
        /// Transient mark used by the prune pass.
        const MARK = 0x01;
        /// The node was created by default injection.
        const DEFAULT = 0x02;
    }
}

bitflags! {
    /// XML printer flags.
    pub struct XmlPrinterFlags: u8 {
        /// Output without indentation and newlines.
        const SHRINK = 0x01;
    }
}

/// Arena record of an element.
#[derive(Debug)]
pub(crate) struct XmlNodeData {
    pub name: String,
    pub value: Option<String>,
    pub attrs: Vec<(String, String)>,
    pub parent: Option<XmlNodeId>,
    pub children: Vec<XmlNodeId>,
    pub schema: Option<SchemaNodeId>,
    pub flags: XmlFlags,
}

/// An XML tree.
#[derive(Debug)]
pub struct XmlTree {
    pub(crate) nodes: Vec<XmlNodeData>,
}

/// A reference to an element of an XML tree.
#[derive(Clone, Debug)]
pub struct XmlNodeRef<'a> {
    tree: &'a XmlTree,
    raw: XmlNodeId,
}

// ===== impl XmlTree =====

impl XmlTree {
    /// Create a new tree containing only the synthetic root element.
    pub fn new() -> XmlTree {
        XmlTree {
            nodes: vec![XmlNodeData {
                name: ROOT_NAME.to_owned(),
                value: None,
                attrs: Vec::new(),
                parent: None,
                children: Vec::new(),
                schema: None,
                flags: XmlFlags::empty(),
            }],
        }
    }

    /// Parse a sequence of top-level XML elements into a tree.
    pub fn parse_string(text: &str) -> Result<XmlTree> {
        let mut tree = XmlTree::new();
        parse_into(&mut tree, text)?;
        Ok(tree)
    }

    /// Returns a reference to the synthetic root element.
    pub fn root(&self) -> XmlNodeRef<'_> {
        XmlNodeRef::from_raw(self, XmlNodeId(0))
    }

    /// Returns a reference to an element by handle.
    pub fn node(&self, id: XmlNodeId) -> XmlNodeRef<'_> {
        XmlNodeRef::from_raw(self, id)
    }

    /// Append a new child element and return its handle.
    pub fn add_child(&mut self, parent: XmlNodeId, name: &str) -> XmlNodeId {
        let id = XmlNodeId(self.nodes.len());
        self.nodes.push(XmlNodeData {
            name: name.to_owned(),
            value: None,
            attrs: Vec::new(),
            parent: Some(parent),
            children: Vec::new(),
            schema: None,
            flags: XmlFlags::empty(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Set the body text of an element.
    pub fn set_value(&mut self, id: XmlNodeId, value: &str) {
        self.nodes[id.0].value = Some(value.to_owned());
    }

    /// Set an attribute of an element, replacing a previous value.
    pub fn set_attr(&mut self, id: XmlNodeId, name: &str, value: &str) {
        let attrs = &mut self.nodes[id.0].attrs;
        match attrs.iter_mut().find(|(aname, _)| aname == name) {
            Some(attr) => attr.1 = value.to_owned(),
            None => attrs.push((name.to_owned(), value.to_owned())),
        }
    }

    pub(crate) fn set_schema(&mut self, id: XmlNodeId, schema: SchemaNodeId) {
        self.nodes[id.0].schema = Some(schema);
    }

    pub(crate) fn set_flag(&mut self, id: XmlNodeId, flags: XmlFlags) {
        self.nodes[id.0].flags.insert(flags);
    }

    /// Find the first child element with the given name.
    pub(crate) fn find_child(
        &self,
        parent: XmlNodeId,
        name: &str,
    ) -> Option<XmlNodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child.0].name == name)
    }

    /// Find a child element with the given name and body text.
    pub(crate) fn find_child_with_value(
        &self,
        parent: XmlNodeId,
        name: &str,
        value: &str,
    ) -> Option<XmlNodeId> {
        self.nodes[parent.0].children.iter().copied().find(|&child| {
            let node = &self.nodes[child.0];
            node.name == name && node.value.as_deref() == Some(value)
        })
    }

    /// Find a list entry: a child element with the given name whose
    /// key-leaf children carry exactly the given values.
    pub(crate) fn find_list_entry(
        &self,
        parent: XmlNodeId,
        name: &str,
        keys: &[(&str, &str)],
    ) -> Option<XmlNodeId> {
        self.nodes[parent.0].children.iter().copied().find(|&child| {
            let node = &self.nodes[child.0];
            node.name == name
                && keys.iter().all(|(keyname, keyval)| {
                    self.find_child_with_value(child, keyname, keyval).is_some()
                })
        })
    }

    /// Handles of all elements reachable from the root, in document
    /// order, the root included.
    pub(crate) fn element_ids(&self) -> Vec<XmlNodeId> {
        let mut ids = Vec::new();
        let mut stack = vec![XmlNodeId(0)];
        while let Some(id) = stack.pop() {
            ids.push(id);
            for &child in self.nodes[id.0].children.iter().rev() {
                stack.push(child);
            }
        }
        ids
    }

    /// Set the MARK flag on the given elements.
    pub fn mark(&mut self, ids: &[XmlNodeId]) {
        for &id in ids {
            self.nodes[id.0].flags.insert(XmlFlags::MARK);
        }
    }

    /// Clear the MARK flag on every element.
    pub fn clear_marks(&mut self) {
        for node in &mut self.nodes {
            node.flags.remove(XmlFlags::MARK);
        }
    }

    /// Prune everything that is neither marked nor an ancestor of a
    /// marked element. A marked element keeps its whole subtree. MARK
    /// flags are cleared on exit; unlinked nodes remain allocated in the
    /// arena but are no longer reachable.
    pub fn prune_unmarked(&mut self) {
        self.prune_rec(XmlNodeId(0));
        self.clear_marks();
    }

    fn prune_rec(&mut self, id: XmlNodeId) -> bool {
        if self.nodes[id.0].flags.contains(XmlFlags::MARK) {
            return true;
        }
        let children = self.nodes[id.0].children.clone();
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            if self.prune_rec(child) {
                kept.push(child);
            }
        }
        let any = !kept.is_empty();
        self.nodes[id.0].children = kept;
        any
    }

    /// Search the tree for elements matching the provided XPath.
    pub fn find_xpath(&self, xpath: &str) -> Result<Set<'_, XmlNodeRef<'_>>> {
        let ids = xpath::eval(self, xpath)?;
        Ok(Set::new(self, ids))
    }

    /// Print the tree (the children of the synthetic root) in XML
    /// format.
    pub fn print_string(&self, options: XmlPrinterFlags) -> String {
        let mut out = String::new();
        for &child in &self.nodes[0].children {
            print_node(self, child, 0, options, &mut out);
        }
        out
    }

    pub(crate) fn data(&self, id: XmlNodeId) -> &XmlNodeData {
        &self.nodes[id.0]
    }
}

impl Default for XmlTree {
    fn default() -> XmlTree {
        XmlTree::new()
    }
}

// ===== impl XmlNodeRef =====

impl<'a> XmlNodeRef<'a> {
    fn data(&self) -> &'a XmlNodeData {
        &self.tree.nodes[self.raw.0]
    }

    /// Arena handle of this element.
    pub fn id(&self) -> XmlNodeId {
        self.raw
    }

    /// Element name.
    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    /// Body text of the element.
    pub fn value(&self) -> Option<&'a str> {
        self.data().value.as_deref()
    }

    /// Value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.data()
            .attrs
            .iter()
            .find(|(aname, _)| aname == name)
            .map(|(_, value)| value.as_str())
    }

    /// Schema handle the element is bound to.
    pub fn schema_id(&self) -> Option<SchemaNodeId> {
        self.data().schema
    }

    /// Resolve the element's schema binding in the given context.
    pub fn schema<'b>(&self, context: &'b Context) -> Option<SchemaNode<'b>> {
        self.data()
            .schema
            .map(|id| SchemaNode::from_raw(context, id))
    }

    /// Returns whether the element was created by default injection.
    pub fn is_default(&self) -> bool {
        self.data().flags.contains(XmlFlags::DEFAULT)
    }

    /// Generate the path of the element, the synthetic root excluded.
    pub fn path(&self) -> String {
        let mut names = self
            .inclusive_ancestors()
            .filter(|node| node.parent().is_some())
            .map(|node| node.name().to_owned())
            .collect::<Vec<_>>();
        names.reverse();
        let mut path = String::new();
        for name in names {
            path.push('/');
            path.push_str(&name);
        }
        path
    }

    /// Find the first child element with the given name.
    pub fn find_child(&self, name: &str) -> Option<XmlNodeRef<'a>> {
        self.tree
            .find_child(self.raw, name)
            .map(|id| XmlNodeRef::from_raw(self.tree, id))
    }

    /// Returns an iterator over the ancestor elements.
    pub fn ancestors(&self) -> Ancestors<'a, XmlNodeRef<'a>> {
        Ancestors::new(self.parent())
    }

    /// Returns an iterator over this element and its ancestors.
    pub fn inclusive_ancestors(&self) -> Ancestors<'a, XmlNodeRef<'a>> {
        Ancestors::new(Some(self.clone()))
    }

    /// Returns an iterator over the sibling elements.
    pub fn siblings(&self) -> Siblings<'a, XmlNodeRef<'a>> {
        Siblings::new(self.next_sibling())
    }

    /// Returns an iterator over the child elements.
    pub fn children(&self) -> Siblings<'a, XmlNodeRef<'a>> {
        Siblings::new(self.first_child())
    }

    /// Returns an iterator over all elements of the subtree (depth-first
    /// search algorithm).
    pub fn traverse(&self) -> Traverse<'a, XmlNodeRef<'a>> {
        Traverse::new(self.clone())
    }

    /// Print the subtree rooted at this element in XML format.
    pub fn print_string(&self, options: XmlPrinterFlags) -> String {
        let mut out = String::new();
        print_node(self.tree, self.raw, 0, options, &mut out);
        out
    }
}

impl<'a> Binding<'a> for XmlNodeRef<'a> {
    type Id = XmlNodeId;
    type Container = XmlTree;

    fn from_raw(tree: &'a XmlTree, raw: XmlNodeId) -> XmlNodeRef<'a> {
        XmlNodeRef { tree, raw }
    }
}

impl<'a> NodeIterable<'a> for XmlNodeRef<'a> {
    fn parent(&self) -> Option<XmlNodeRef<'a>> {
        self.data()
            .parent
            .map(|id| XmlNodeRef::from_raw(self.tree, id))
    }

    fn next_sibling(&self) -> Option<XmlNodeRef<'a>> {
        let parent = self.data().parent?;
        let siblings = &self.tree.nodes[parent.0].children;
        let pos = siblings.iter().position(|&id| id == self.raw)?;
        siblings
            .get(pos + 1)
            .map(|&id| XmlNodeRef::from_raw(self.tree, id))
    }

    fn first_child(&self) -> Option<XmlNodeRef<'a>> {
        self.data()
            .children
            .first()
            .map(|&id| XmlNodeRef::from_raw(self.tree, id))
    }
}

impl<'a> PartialEq for XmlNodeRef<'a> {
    fn eq(&self, other: &XmlNodeRef<'_>) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.raw == other.raw
    }
}

// ===== XML parsing =====

fn parse_into(tree: &mut XmlTree, text: &str) -> Result<()> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    let mut stack = vec![XmlNodeId(0)];

    while pos < bytes.len() {
        if bytes[pos] == b'<' {
            match bytes.get(pos + 1) {
                Some(b'?') => {
                    pos = skip_past(text, pos, "?>")?;
                }
                Some(b'!') => {
                    if text[pos..].starts_with("<!--") {
                        pos = skip_past(text, pos, "-->")?;
                    } else {
                        pos = skip_past(text, pos, ">")?;
                    }
                }
                Some(b'/') => {
                    let end = find_byte(bytes, pos, b'>')?;
                    let name = text[pos + 2..end].trim();
                    let top = *stack.last().unwrap();
                    if stack.len() < 2 || tree.nodes[top.0].name != name {
                        return Err(Error::msg(
                            ErrorKind::BadXml,
                            format!("unexpected closing tag: {}", name),
                        ));
                    }
                    stack.pop();
                    pos = end + 1;
                }
                Some(_) => {
                    pos = parse_tag(tree, text, pos, &mut stack)?;
                }
                None => {
                    return Err(Error::msg(ErrorKind::BadXml, "truncated tag"));
                }
            }
        } else {
            let end = bytes[pos..]
                .iter()
                .position(|&byte| byte == b'<')
                .map(|off| pos + off)
                .unwrap_or(bytes.len());
            let run = &text[pos..end];
            if !run.trim().is_empty() {
                let top = *stack.last().unwrap();
                if stack.len() < 2 {
                    return Err(Error::msg(
                        ErrorKind::BadXml,
                        "text outside of any element",
                    ));
                }
                let unescaped = unescape(run.trim())?;
                match &mut tree.nodes[top.0].value {
                    Some(value) => value.push_str(&unescaped),
                    value @ None => *value = Some(unescaped),
                }
            }
            pos = end;
        }
    }

    if stack.len() != 1 {
        let top = *stack.last().unwrap();
        return Err(Error::msg(
            ErrorKind::BadXml,
            format!("unclosed element: {}", tree.nodes[top.0].name),
        ));
    }
    Ok(())
}

/// Parse one opening (or self-closing) tag starting at `pos`.
fn parse_tag(
    tree: &mut XmlTree,
    text: &str,
    pos: usize,
    stack: &mut Vec<XmlNodeId>,
) -> Result<usize> {
    let bytes = text.as_bytes();
    let mut pos = pos + 1;
    let start = pos;
    while pos < bytes.len()
        && !bytes[pos].is_ascii_whitespace()
        && !matches!(bytes[pos], b'>' | b'/')
    {
        pos += 1;
    }
    if pos == start {
        return Err(Error::msg(ErrorKind::BadXml, "empty tag name"));
    }
    let name = &text[start..pos];
    let parent = *stack.last().unwrap();
    let id = tree.add_child(parent, name);

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos) {
            Some(b'>') => {
                stack.push(id);
                return Ok(pos + 1);
            }
            Some(b'/') => {
                if bytes.get(pos + 1) != Some(&b'>') {
                    return Err(Error::msg(ErrorKind::BadXml, "malformed tag"));
                }
                return Ok(pos + 2);
            }
            Some(_) => {
                let (next, aname, avalue) = parse_attr(text, pos)?;
                tree.set_attr(id, &aname, &avalue);
                pos = next;
            }
            None => {
                return Err(Error::msg(
                    ErrorKind::BadXml,
                    format!("truncated tag: {}", name),
                ));
            }
        }
    }
}

fn parse_attr(text: &str, pos: usize) -> Result<(usize, String, String)> {
    let bytes = text.as_bytes();
    let start = pos;
    let mut pos = pos;
    while pos < bytes.len()
        && !bytes[pos].is_ascii_whitespace()
        && !matches!(bytes[pos], b'=' | b'>' | b'/')
    {
        pos += 1;
    }
    let name = text[start..pos].to_owned();
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    if bytes.get(pos) != Some(&b'=') {
        return Err(Error::msg(
            ErrorKind::BadXml,
            format!("attribute {} without value", name),
        ));
    }
    pos += 1;
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    let quote = match bytes.get(pos) {
        Some(&quote @ (b'"' | b'\'')) => quote,
        _ => {
            return Err(Error::msg(
                ErrorKind::BadXml,
                format!("unquoted value of attribute {}", name),
            ));
        }
    };
    pos += 1;
    let vstart = pos;
    while pos < bytes.len() && bytes[pos] != quote {
        pos += 1;
    }
    if pos >= bytes.len() {
        return Err(Error::msg(ErrorKind::BadXml, "unterminated attribute"));
    }
    let value = unescape(&text[vstart..pos])?;
    Ok((pos + 1, name, value))
}

fn skip_past(text: &str, pos: usize, marker: &str) -> Result<usize> {
    text[pos..]
        .find(marker)
        .map(|off| pos + off + marker.len())
        .ok_or_else(|| Error::msg(ErrorKind::BadXml, "truncated markup"))
}

fn find_byte(bytes: &[u8], pos: usize, byte: u8) -> Result<usize> {
    bytes[pos..]
        .iter()
        .position(|&b| b == byte)
        .map(|off| pos + off)
        .ok_or_else(|| Error::msg(ErrorKind::BadXml, "truncated tag"))
}

fn unescape(text: &str) -> Result<String> {
    if !text.contains('&') {
        return Ok(text.to_owned());
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let end = rest.find(';').ok_or_else(|| {
            Error::msg(ErrorKind::BadXml, "unterminated entity reference")
        })?;
        match &rest[..end + 1] {
            "&lt;" => out.push('<'),
            "&gt;" => out.push('>'),
            "&amp;" => out.push('&'),
            "&quot;" => out.push('"'),
            "&apos;" => out.push('\''),
            other => {
                return Err(Error::msg(
                    ErrorKind::BadXml,
                    format!("unknown entity reference: {}", other),
                ));
            }
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

// ===== XML printing =====

fn escape(text: &str, attr: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn print_node(
    tree: &XmlTree,
    id: XmlNodeId,
    level: usize,
    options: XmlPrinterFlags,
    out: &mut String,
) {
    let shrink = options.contains(XmlPrinterFlags::SHRINK);
    let node = &tree.nodes[id.0];
    if !shrink {
        out.push_str(&"  ".repeat(level));
    }
    out.push('<');
    out.push_str(&node.name);
    for (name, value) in &node.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape(value, true));
        out.push('"');
    }

    if node.value.is_none() && node.children.is_empty() {
        out.push_str("/>");
    } else {
        out.push('>');
        if let Some(value) = &node.value {
            out.push_str(&escape(value, false));
        }
        if !node.children.is_empty() {
            if !shrink {
                out.push('\n');
            }
            for &child in &node.children {
                print_node(tree, child, level + 1, options, out);
            }
            if !shrink {
                out.push_str(&"  ".repeat(level));
            }
        }
        out.push_str("</");
        out.push_str(&node.name);
        out.push('>');
    }
    if !shrink {
        out.push('\n');
    }
}
