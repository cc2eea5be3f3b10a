//
// Copyright (c) The yangdb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Datastore operations.
//!
//! A datastore holds one named configuration database (`running`,
//! `candidate`, ...) as flat key/value pairs behind a [`KvStore`] and
//! presents it as an XML tree. Reads scan the whole database and
//! assemble the tree under schema guidance; writes walk an edit tree or
//! a single keyed edit and emit pairs under NETCONF operation
//! semantics.
//!
//! Operations are atomic with respect to themselves but not across each
//! other, and a failed write is not rolled back: transactional behavior
//! is layered above by copying between candidate and running databases.
//! Locking is likewise the frontends' business.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::context::Context;
use crate::data::{XmlFlags, XmlNodeId, XmlNodeRef, XmlTree};
use crate::db::KvStore;
use crate::error::{Error, ErrorKind, Result};
use crate::iter::NodeIterable;
use crate::schema::{SchemaCursor, SchemaNode, SchemaNodeKind};
use crate::utils::split_xml_key;
use crate::xpath;

/// NETCONF edit operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    /// Set the value, creating the node if needed.
    Merge,
    /// Like merge; at the datastore level, the database is
    /// reinitialized first.
    Replace,
    /// Like merge, but the key must not exist yet.
    Create,
    /// Remove the subtree; the key must exist.
    Delete,
    /// Remove the subtree if present.
    Remove,
    /// No write at this node; children carry their own operations.
    None,
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(value: &str) -> Result<Operation> {
        match value {
            "merge" => Ok(Operation::Merge),
            "replace" => Ok(Operation::Replace),
            "create" => Ok(Operation::Create),
            "delete" => Ok(Operation::Delete),
            "remove" => Ok(Operation::Remove),
            _ => Err(Error::msg(
                ErrorKind::BadOperation,
                format!("bad operation attribute: {}", value),
            )),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Merge => "merge",
            Operation::Replace => "replace",
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::Remove => "remove",
            Operation::None => "none",
        };
        write!(f, "{}", name)
    }
}

/// A configuration datastore over a key-value backend.
#[derive(Debug)]
pub struct Datastore<S> {
    store: S,
}

impl<S> Datastore<S>
where
    S: KvStore,
{
    pub fn new(store: S) -> Datastore<S> {
        Datastore { store }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the datastore, returning the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Read the datastore contents as a single XML tree.
    ///
    /// The whole database is scanned and assembled under schema
    /// guidance. When an XPath filter is given, the result is the
    /// minimal tree containing every match together with the full path
    /// from the root to each. Schema defaults are then injected and the
    /// tree is verified against the schema.
    pub fn get(&self, context: &Context, xpath: Option<&str>) -> Result<XmlTree> {
        let mut tree = self.assemble(context)?;
        if let Some(expr) = xpath {
            let matches = xpath::eval(&tree, expr)?;
            tree.mark(&matches);
            tree.prune_unmarked();
        }
        add_defaults(&mut tree, context)?;
        verify_schema(&tree, context)?;
        Ok(tree)
    }

    /// Read the datastore contents, returning both the assembled tree
    /// and the handles of the elements matching the XPath expression.
    /// Unlike [`Datastore::get`], nothing is pruned.
    pub fn get_vec(
        &self,
        context: &Context,
        xpath: &str,
    ) -> Result<(XmlTree, Vec<XmlNodeId>)> {
        let mut tree = self.assemble(context)?;
        let matches = xpath::eval(&tree, xpath)?;
        add_defaults(&mut tree, context)?;
        verify_schema(&tree, context)?;
        Ok((tree, matches))
    }

    fn assemble(&self, context: &Context) -> Result<XmlTree> {
        // Read in the complete database. Integration is insensitive to
        // pair ordering, but assembling in key order keeps sibling
        // order reproducible whatever the backend returns.
        let mut pairs = self.store.scan("")?;
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut tree = XmlTree::new();
        for (key, value) in &pairs {
            debug!("integrate {} {}", key, value.as_deref().unwrap_or(""));
            integrate_pair(&mut tree, context, key, value.as_deref())?;
        }
        Ok(tree)
    }

    /// Apply an edit tree to the datastore.
    ///
    /// Every element inherits the operation of its parent unless it
    /// carries an `operation` attribute of its own; `op` seeds the
    /// inheritance. A top-level `replace` reinitializes the database
    /// first and then proceeds as a merge.
    pub fn put(
        &mut self,
        context: &Context,
        edit: &XmlTree,
        op: Operation,
    ) -> Result<()> {
        if op == Operation::Replace {
            self.store.unlink()?;
            self.store.init()?;
        }
        for child in edit.root().children() {
            let snode = context.find_top(child.name()).ok_or_else(|| {
                Error::msg(
                    ErrorKind::UnknownNode,
                    format!("no schema node found: {}", child.name()),
                )
            })?;
            self.put_node(&child, &snode, op, "")?;
        }
        Ok(())
    }

    /// Recursively emit pairs for one edit tree element.
    fn put_node(
        &mut self,
        node: &XmlNodeRef<'_>,
        snode: &SchemaNode<'_>,
        op: Operation,
        prefix: &str,
    ) -> Result<()> {
        let mut op = op;
        if let Some(value) = node.attr("operation") {
            op = value.parse()?;
        }

        let mut key = format!("{}/{}", prefix, node.name());
        match snode.kind() {
            SchemaNodeKind::List => {
                for keyname in snode.list_key_names()? {
                    let keyval = node
                        .find_child(keyname)
                        .and_then(|kchild| kchild.value())
                        .ok_or_else(|| {
                            Error::msg(
                                ErrorKind::SchemaMismatch,
                                format!(
                                    "list node {} has no key child {}",
                                    node.name(),
                                    keyname
                                ),
                            )
                            .with_path(node.path())
                        })?;
                    key.push('/');
                    key.push_str(keyval);
                }
            }
            SchemaNodeKind::LeafList => {
                let body = node.value().ok_or_else(|| {
                    Error::msg(
                        ErrorKind::SchemaMismatch,
                        format!("leaf-list node {} without a body", node.name()),
                    )
                    .with_path(node.path())
                })?;
                key.push('/');
                key.push_str(body);
            }
            _ => {}
        }

        match op {
            Operation::Create | Operation::Merge | Operation::Replace => {
                if op == Operation::Create && self.store.exists(&key)? {
                    return Err(Error::new(ErrorKind::CreateExists).with_path(key));
                }
                self.store.set(&key, node.value())?;
            }
            Operation::Delete | Operation::Remove => {
                if op == Operation::Delete && !self.store.exists(&key)? {
                    return Err(
                        Error::new(ErrorKind::DeleteMissing).with_path(key)
                    );
                }
                // The scan below takes the whole subtree with it, so
                // there is nothing left to recurse into.
                return self.remove_subtree(&key);
            }
            Operation::None => {}
        }

        for child in node.children() {
            let child_schema = snode.find_child(child.name()).ok_or_else(|| {
                Error::msg(
                    ErrorKind::UnknownNode,
                    format!("no schema node found: {}", child.name()),
                )
                .with_path(child.path())
            })?;
            self.put_node(&child, &child_schema, op, &key)?;
        }
        Ok(())
    }

    /// Apply a single keyed edit to the datastore, without constructing
    /// an edit tree.
    ///
    /// When creating, intermediate list entries and their key leaves
    /// are written along the way so that a subsequent read reconstructs
    /// the list. When deleting through a key leaf of a list, the
    /// operation is lifted to the list entry: the whole entry is
    /// removed, not the key-leaf pair alone.
    pub fn put_key(
        &mut self,
        context: &Context,
        xml_key: &str,
        value: Option<&str>,
        op: Operation,
    ) -> Result<()> {
        let segments = split_xml_key(xml_key)?;
        let mut cursor = SchemaCursor::new(context);
        let mut key = String::with_capacity(xml_key.len());
        let mut last = None;
        let mut i = 0;

        while i < segments.len() {
            let name = segments[i];
            let snode = cursor
                .advance(name)
                .map_err(|err| err.with_path(xml_key))?;
            i += 1;

            // Deleting a list entry through one of its key leaves
            // removes the entry: the key-leaf name is not appended.
            let lifted = matches!(op, Operation::Delete | Operation::Remove)
                && snode.is_list_key();
            if !lifted {
                key.push('/');
                key.push_str(name);
            }

            match snode.kind() {
                SchemaNodeKind::LeafList => {
                    let val = *segments.get(i).ok_or_else(|| {
                        Error::msg(
                            ErrorKind::MalformedKey,
                            format!("leaf-list {} without a value", name),
                        )
                        .with_path(xml_key)
                    })?;
                    i += 1;
                    key.push('/');
                    key.push_str(val);
                }
                SchemaNodeKind::List => {
                    let keynames = snode.list_key_names()?;
                    let mut keyvals = Vec::with_capacity(keynames.len());
                    for keyname in keynames {
                        let val = *segments.get(i).ok_or_else(|| {
                            Error::msg(
                                ErrorKind::MalformedKey,
                                format!(
                                    "list {} without a value for key {}",
                                    name, keyname
                                ),
                            )
                            .with_path(xml_key)
                        })?;
                        i += 1;
                        key.push('/');
                        key.push_str(val);
                        keyvals.push(val);
                    }
                    if matches!(
                        op,
                        Operation::Merge | Operation::Replace | Operation::Create
                    ) {
                        self.store.set(&key, None)?;
                        for (keyname, keyval) in keynames.iter().zip(&keyvals) {
                            let subkey = format!("{}/{}", key, keyname);
                            self.store.set(&subkey, Some(*keyval))?;
                        }
                    }
                }
                _ => {
                    if matches!(
                        op,
                        Operation::Merge | Operation::Replace | Operation::Create
                    ) && i < segments.len()
                    {
                        self.store.set(&key, None)?;
                    }
                }
            }
            last = Some(snode);
        }

        let snode = last
            .ok_or_else(|| Error::new(ErrorKind::MalformedKey).with_path(xml_key))?;

        match op {
            Operation::Create | Operation::Merge | Operation::Replace => {
                if op == Operation::Create && self.store.exists(&key)? {
                    return Err(Error::new(ErrorKind::CreateExists).with_path(key));
                }
                match snode.kind() {
                    SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                        self.store.set(&key, value)?;
                    }
                    _ => self.store.set(&key, None)?,
                }
            }
            Operation::Delete | Operation::Remove => {
                if op == Operation::Delete && !self.store.exists(&key)? {
                    return Err(
                        Error::new(ErrorKind::DeleteMissing).with_path(key)
                    );
                }
                self.remove_subtree(&key)?;
            }
            Operation::None => {}
        }
        Ok(())
    }

    /// Delete every pair whose key starts with the given key.
    fn remove_subtree(&mut self, key: &str) -> Result<()> {
        let pattern = format!("^{}.*$", regex::escape(key));
        for (key, _) in self.store.scan(&pattern)? {
            self.store.del(&key)?;
        }
        Ok(())
    }
}

/// Integrate one key/value pair into the tree under schema guidance.
///
/// Integration is idempotent: the same or an overlapping key only
/// creates the elements that are still missing. List entries are
/// identified by the ordered tuple of their key-leaf bodies.
fn integrate_pair(
    tree: &mut XmlTree,
    context: &Context,
    key: &str,
    value: Option<&str>,
) -> Result<()> {
    let segments = split_xml_key(key)?;
    let mut cursor = SchemaCursor::new(context);
    let mut node = tree.root().id();
    let mut i = 0;

    while i < segments.len() {
        let name = segments[i];
        let snode = cursor.advance(name).map_err(|err| err.with_path(key))?;
        i += 1;

        match snode.kind() {
            SchemaNodeKind::LeafList => {
                // The next segment is the entry's value.
                let val = *segments.get(i).ok_or_else(|| {
                    Error::msg(
                        ErrorKind::MalformedKey,
                        format!("leaf-list {} without a value", name),
                    )
                    .with_path(key)
                })?;
                i += 1;
                node = match tree.find_child_with_value(node, name, val) {
                    Some(id) => id,
                    None => {
                        let id = tree.add_child(node, name);
                        tree.set_schema(id, snode.id());
                        tree.set_value(id, val);
                        id
                    }
                };
            }
            SchemaNodeKind::List => {
                // The next segments are the values of the key leaves,
                // in declared order.
                let keynames = snode.list_key_names()?;
                let mut keyvals = Vec::with_capacity(keynames.len());
                for keyname in keynames {
                    let val = *segments.get(i).ok_or_else(|| {
                        Error::msg(
                            ErrorKind::MalformedKey,
                            format!(
                                "list {} without a value for key {}",
                                name, keyname
                            ),
                        )
                        .with_path(key)
                    })?;
                    i += 1;
                    keyvals.push((keyname.as_str(), val));
                }
                node = match tree.find_list_entry(node, name, &keyvals) {
                    Some(id) => id,
                    None => {
                        let entry = tree.add_child(node, name);
                        tree.set_schema(entry, snode.id());
                        for (keyname, keyval) in &keyvals {
                            let kleaf =
                                snode.find_child(keyname).ok_or_else(|| {
                                    Error::msg(
                                        ErrorKind::SchemaMismatch,
                                        format!(
                                            "list {} has no key leaf {}",
                                            name, keyname
                                        ),
                                    )
                                })?;
                            let kid = tree.add_child(entry, keyname);
                            tree.set_schema(kid, kleaf.id());
                            tree.set_value(kid, keyval);
                        }
                        entry
                    }
                };
            }
            _ => {
                node = match tree.find_child(node, name) {
                    Some(id) => id,
                    None => {
                        let id = tree.add_child(node, name);
                        tree.set_schema(id, snode.id());
                        id
                    }
                };
            }
        }
    }

    if let Some(value) = value {
        if !value.is_empty() && tree.node(node).value().is_none() {
            tree.set_value(node, value);
        }
    }
    Ok(())
}

/// Inject schema defaults into the tree.
///
/// Two passes: every present container or list element receives its
/// absent defaulted leaf children, and containers whose subtree carries
/// a default are materialized from the root even with no instance data,
/// so that defaults are visible on an empty datastore.
fn add_defaults(tree: &mut XmlTree, context: &Context) -> Result<()> {
    for id in tree.element_ids() {
        if let Some(snode) = tree.node(id).schema(context) {
            if matches!(
                snode.kind(),
                SchemaNodeKind::Container | SchemaNodeKind::List
            ) {
                fill_leaf_defaults(tree, id, &snode);
            }
        }
    }

    let root = tree.root().id();
    let top = context
        .modules()
        .flat_map(|module| module.data())
        .collect::<Vec<_>>();
    for snode in &top {
        materialize_defaults(tree, root, snode);
    }
    Ok(())
}

/// Create the absent defaulted leaf children of one element.
fn fill_leaf_defaults(tree: &mut XmlTree, id: XmlNodeId, snode: &SchemaNode<'_>) {
    for child in snode.children() {
        let default = match (child.kind(), child.default_value()) {
            (SchemaNodeKind::Leaf, Some(default)) => default,
            _ => continue,
        };
        if tree.find_child(id, child.name()).is_none() {
            let leaf = tree.add_child(id, child.name());
            tree.set_schema(leaf, child.id());
            tree.set_value(leaf, default);
            tree.set_flag(leaf, XmlFlags::DEFAULT);
        }
    }
}

/// Materialize a container (and fill its defaults) if its subtree,
/// looking through containers only, declares any default.
fn materialize_defaults(
    tree: &mut XmlTree,
    parent: XmlNodeId,
    snode: &SchemaNode<'_>,
) {
    if snode.kind() != SchemaNodeKind::Container || !carries_default(snode) {
        return;
    }
    let id = match tree.find_child(parent, snode.name()) {
        Some(id) => id,
        None => {
            let id = tree.add_child(parent, snode.name());
            tree.set_schema(id, snode.id());
            tree.set_flag(id, XmlFlags::DEFAULT);
            id
        }
    };
    fill_leaf_defaults(tree, id, snode);
    for child in snode.children() {
        materialize_defaults(tree, id, &child);
    }
}

fn carries_default(snode: &SchemaNode<'_>) -> bool {
    snode.children().any(|child| match child.kind() {
        SchemaNodeKind::Leaf => child.has_default(),
        SchemaNodeKind::Container => carries_default(&child),
        _ => false,
    })
}

/// Verify that every element is bound to a schema node of the same
/// name.
fn verify_schema(tree: &XmlTree, context: &Context) -> Result<()> {
    for node in tree.root().traverse() {
        if node.parent().is_none() {
            // Synthetic root.
            continue;
        }
        let snode = node.schema(context).ok_or_else(|| {
            Error::msg(
                ErrorKind::SchemaMismatch,
                format!("no schema bound to node {}", node.name()),
            )
            .with_path(node.path())
        })?;
        if node.name() != snode.name() {
            return Err(Error::msg(
                ErrorKind::SchemaMismatch,
                format!(
                    "node name {} does not match schema node {}",
                    node.name(),
                    snode.name()
                ),
            )
            .with_path(node.path()));
        }
    }
    Ok(())
}
