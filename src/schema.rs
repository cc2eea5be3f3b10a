//
// Copyright (c) The yangdb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG schema data.

use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::iter::{Ancestors, NodeIterable, Siblings, Traverse};
use crate::utils::Binding;

/// YANG module.
#[derive(Clone, Debug)]
pub struct SchemaModule<'a> {
    context: &'a Context,
    raw: usize,
}

/// Stable handle to a schema node within its context's arena.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SchemaNodeId(pub(crate) usize);

/// Arena record of a schema node.
#[derive(Debug)]
pub(crate) struct SchemaNodeData {
    pub kind: SchemaNodeKind,
    pub name: String,
    pub parent: Option<SchemaNodeId>,
    pub children: Vec<SchemaNodeId>,
    pub module: usize,
    pub default: Option<String>,
    pub keys: Vec<String>,
}

/// Generic YANG schema node.
#[derive(Clone, Debug)]
pub struct SchemaNode<'a> {
    context: &'a Context,
    raw: SchemaNodeId,
}

/// YANG schema node kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SchemaNodeKind {
    Container,
    Case,
    Choice,
    Leaf,
    LeafList,
    List,
}

impl SchemaNodeKind {
    /// Choice and case statements structure the schema but are invisible
    /// on the data path.
    pub fn is_schema_only(&self) -> bool {
        matches!(self, SchemaNodeKind::Choice | SchemaNodeKind::Case)
    }
}

// ===== impl SchemaModule =====

impl<'a> SchemaModule<'a> {
    /// Name of the module.
    pub fn name(&self) -> &'a str {
        &self.context.modules[self.raw].name
    }

    /// Namespace of the module.
    pub fn namespace(&self) -> Option<&'a str> {
        self.context.modules[self.raw].namespace.as_deref()
    }

    /// Prefix of the module.
    pub fn prefix(&self) -> Option<&'a str> {
        self.context.modules[self.raw].prefix.as_deref()
    }

    /// Returns an iterator over the top-level data nodes.
    pub fn data(&self) -> Siblings<'a, SchemaNode<'a>> {
        let first = self.context.modules[self.raw]
            .data
            .first()
            .map(|&id| SchemaNode::from_raw(self.context, id));
        Siblings::new(first)
    }

    /// Returns an iterator over all data nodes of the module (depth-first
    /// search algorithm).
    pub fn traverse(&self) -> impl Iterator<Item = SchemaNode<'a>> {
        self.data().flat_map(|snode| snode.traverse())
    }
}

impl<'a> PartialEq for SchemaModule<'a> {
    fn eq(&self, other: &SchemaModule<'_>) -> bool {
        std::ptr::eq(self.context, other.context) && self.raw == other.raw
    }
}

impl<'a> Binding<'a> for SchemaModule<'a> {
    type Id = usize;
    type Container = Context;

    fn from_raw(context: &'a Context, raw: usize) -> SchemaModule<'a> {
        SchemaModule { context, raw }
    }
}

// ===== impl SchemaNode =====

impl<'a> SchemaNode<'a> {
    fn data(&self) -> &'a SchemaNodeData {
        self.context.node_data(self.raw)
    }

    /// Arena handle of this node.
    pub fn id(&self) -> SchemaNodeId {
        self.raw
    }

    /// Schema node module.
    pub fn module(&self) -> SchemaModule<'a> {
        SchemaModule::from_raw(self.context, self.data().module)
    }

    /// Returns the kind of the schema node.
    pub fn kind(&self) -> SchemaNodeKind {
        self.data().kind
    }

    /// Schema node name.
    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    /// Generate the data path of the node. Choice and case ancestors do
    /// not appear on the data path.
    pub fn path(&self) -> String {
        let mut names = self
            .inclusive_ancestors()
            .filter(|snode| !snode.kind().is_schema_only())
            .map(|snode| snode.name().to_owned())
            .collect::<Vec<_>>();
        names.reverse();
        let mut path = String::new();
        for name in names {
            path.push('/');
            path.push_str(&name);
        }
        path
    }

    /// Find a child data node by name, looking through choice/case
    /// layers.
    pub fn find_child(&self, name: &str) -> Option<SchemaNode<'a>> {
        self.context
            .find_visible(&self.data().children, name)
            .map(|id| SchemaNode::from_raw(self.context, id))
    }

    /// Returns whether the leaf has a default value.
    pub fn has_default(&self) -> bool {
        self.data().default.is_some()
    }

    /// Default value of the leaf.
    pub fn default_value(&self) -> Option<&'a str> {
        self.data().default.as_deref()
    }

    /// Returns whether the node is a list's key.
    pub fn is_list_key(&self) -> bool {
        match self.kind() {
            SchemaNodeKind::Leaf => match self.parent() {
                Some(parent) if parent.kind() == SchemaNodeKind::List => {
                    parent.data().keys.iter().any(|key| key == self.name())
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Names of the list's key leaves, in declared order.
    ///
    /// Returns an empty slice for non-list nodes, and fails for a list
    /// without a `key` statement.
    pub fn list_key_names(&self) -> Result<&'a [String]> {
        let data = self.data();
        if data.kind == SchemaNodeKind::List && data.keys.is_empty() {
            return Err(Error::msg(
                ErrorKind::ListWithoutKey,
                format!("list \"{}\" has no key statement", data.name),
            )
            .with_path(self.path()));
        }
        Ok(&data.keys)
    }

    /// Returns an iterator over the list's key leaves.
    pub fn list_keys(&self) -> impl Iterator<Item = SchemaNode<'a>> + 'a {
        let node = self.clone();
        self.data()
            .keys
            .iter()
            .filter_map(move |key| node.find_child(key))
    }

    /// Returns an iterator over the ancestor nodes.
    pub fn ancestors(&self) -> Ancestors<'a, SchemaNode<'a>> {
        Ancestors::new(self.parent())
    }

    /// Returns an iterator over this node and its ancestors.
    pub fn inclusive_ancestors(&self) -> Ancestors<'a, SchemaNode<'a>> {
        Ancestors::new(Some(self.clone()))
    }

    /// Returns an iterator over the sibling nodes.
    pub fn siblings(&self) -> Siblings<'a, SchemaNode<'a>> {
        Siblings::new(self.next_sibling())
    }

    /// Returns an iterator over the child nodes.
    pub fn children(&self) -> Siblings<'a, SchemaNode<'a>> {
        Siblings::new(self.first_child())
    }

    /// Returns an iterator over all elements in the schema subtree
    /// (depth-first search algorithm).
    pub fn traverse(&self) -> Traverse<'a, SchemaNode<'a>> {
        Traverse::new(self.clone())
    }
}

impl<'a> Binding<'a> for SchemaNode<'a> {
    type Id = SchemaNodeId;
    type Container = Context;

    fn from_raw(context: &'a Context, raw: SchemaNodeId) -> SchemaNode<'a> {
        SchemaNode { context, raw }
    }
}

impl<'a> NodeIterable<'a> for SchemaNode<'a> {
    fn parent(&self) -> Option<SchemaNode<'a>> {
        self.data()
            .parent
            .map(|id| SchemaNode::from_raw(self.context, id))
    }

    fn next_sibling(&self) -> Option<SchemaNode<'a>> {
        let siblings = match self.data().parent {
            Some(parent) => &self.context.node_data(parent).children,
            None => &self.context.modules[self.data().module].data,
        };
        let pos = siblings.iter().position(|&id| id == self.raw)?;
        siblings
            .get(pos + 1)
            .map(|&id| SchemaNode::from_raw(self.context, id))
    }

    fn first_child(&self) -> Option<SchemaNode<'a>> {
        self.data()
            .children
            .first()
            .map(|&id| SchemaNode::from_raw(self.context, id))
    }
}

impl<'a> PartialEq for SchemaNode<'a> {
    fn eq(&self, other: &SchemaNode<'_>) -> bool {
        std::ptr::eq(self.context, other.context) && self.raw == other.raw
    }
}

// ===== impl SchemaCursor =====

/// A cursor walking the schema along the segments of an xml key.
///
/// The cursor only resolves element names; consuming the value segments
/// that follow list and leaf-list names is the caller's business, since
/// how many there are depends on the kind of the resolved node.
#[derive(Debug)]
pub struct SchemaCursor<'a> {
    context: &'a Context,
    current: Option<SchemaNode<'a>>,
}

impl<'a> SchemaCursor<'a> {
    pub fn new(context: &'a Context) -> SchemaCursor<'a> {
        SchemaCursor {
            context,
            current: None,
        }
    }

    /// Advance the cursor to the named node: a top-level lookup on the
    /// first call, a child lookup afterwards.
    pub fn advance(&mut self, name: &str) -> Result<SchemaNode<'a>> {
        let next = match &self.current {
            None => self.context.find_top(name),
            Some(current) => current.find_child(name),
        }
        .ok_or_else(|| {
            Error::msg(
                ErrorKind::UnknownNode,
                format!("no schema node found: {}", name),
            )
        })?;
        self.current = Some(next.clone());
        Ok(next)
    }

    /// The node the cursor currently points at.
    pub fn current(&self) -> Option<&SchemaNode<'a>> {
        self.current.as_ref()
    }
}
