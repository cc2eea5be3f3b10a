//
// Copyright (c) The yangdb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG context.

use crate::error::{Error, ErrorKind, Result};
use crate::iter::SchemaModules;
use crate::parser::{self, YangStmt};
use crate::schema::{
    SchemaModule, SchemaNode, SchemaNodeData, SchemaNodeId, SchemaNodeKind,
};
use crate::utils::Binding;

/// Context of the YANG schemas.
///
/// The context holds all information about the loaded schemas. The
/// application is supposed to work with a single context in which all
/// modules are loaded, and according to which datastore contents are
/// assembled and validated.
///
/// Schema nodes live in an arena owned by the context and are referred
/// to by [`SchemaNodeId`] handles; a context is immutable once all
/// modules are loaded.
#[derive(Debug, Default)]
pub struct Context {
    pub(crate) nodes: Vec<SchemaNodeData>,
    pub(crate) modules: Vec<SchemaModuleData>,
}

#[derive(Debug)]
pub(crate) struct SchemaModuleData {
    pub name: String,
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub data: Vec<SchemaNodeId>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Context {
        Context {
            nodes: Vec::new(),
            modules: Vec::new(),
        }
    }

    /// Parse a YANG module from a string and load it into the context.
    pub fn load_module_str(&mut self, text: &str) -> Result<SchemaModule<'_>> {
        let stmt = parser::parse_module(text)?;
        let name = stmt
            .arg
            .clone()
            .ok_or_else(|| Error::msg(ErrorKind::BadYang, "module without a name"))?;

        let module = self.modules.len();
        self.modules.push(SchemaModuleData {
            name,
            namespace: stmt.find("namespace").and_then(|sub| sub.arg.clone()),
            prefix: stmt.find("prefix").and_then(|sub| sub.arg.clone()),
            data: Vec::new(),
        });

        let mut data = Vec::new();
        for sub in &stmt.substmts {
            if let Some(id) = self.intern_stmt(sub, None, module)? {
                data.push(id);
            }
        }
        self.modules[module].data = data;

        Ok(SchemaModule::from_raw(self, module))
    }

    /// Intern one statement subtree into the schema node arena. Returns
    /// `None` for statements that are not data nodes.
    fn intern_stmt(
        &mut self,
        stmt: &YangStmt,
        parent: Option<SchemaNodeId>,
        module: usize,
    ) -> Result<Option<SchemaNodeId>> {
        let kind = match stmt.keyword.as_str() {
            "container" => SchemaNodeKind::Container,
            "list" => SchemaNodeKind::List,
            "leaf" => SchemaNodeKind::Leaf,
            "leaf-list" => SchemaNodeKind::LeafList,
            "choice" => SchemaNodeKind::Choice,
            "case" => SchemaNodeKind::Case,
            _ => return Ok(None),
        };
        let name = stmt.arg.clone().ok_or_else(|| {
            Error::msg(
                ErrorKind::BadYang,
                format!("{} statement without a name", stmt.keyword),
            )
        })?;

        let default = match kind {
            SchemaNodeKind::Leaf => {
                stmt.find("default").and_then(|sub| sub.arg.clone())
            }
            _ => None,
        };
        let keys = match kind {
            SchemaNodeKind::List => stmt
                .find("key")
                .and_then(|sub| sub.arg.as_deref())
                .map(|arg| arg.split_whitespace().map(str::to_owned).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let id = SchemaNodeId(self.nodes.len());
        self.nodes.push(SchemaNodeData {
            kind,
            name,
            parent,
            children: Vec::new(),
            module,
            default,
            keys,
        });
        for sub in &stmt.substmts {
            if let Some(child) = self.intern_stmt(sub, Some(id), module)? {
                self.nodes[id.0].children.push(child);
            }
        }
        Ok(Some(id))
    }

    /// Get a loaded YANG module by its name.
    pub fn get_module(&self, name: &str) -> Option<SchemaModule<'_>> {
        self.modules
            .iter()
            .position(|module| module.name == name)
            .map(|raw| SchemaModule::from_raw(self, raw))
    }

    /// Get an iterator over the loaded modules.
    pub fn modules(&self) -> SchemaModules<'_> {
        SchemaModules::new(self)
    }

    /// Find a top-level data node by name, searching all modules.
    ///
    /// Choice and case nodes are schema-only and transparent here: a
    /// data node placed under a top-level choice is itself top-level on
    /// the data path.
    pub fn find_top(&self, name: &str) -> Option<SchemaNode<'_>> {
        self.modules
            .iter()
            .find_map(|module| self.find_visible(&module.data, name))
            .map(|id| SchemaNode::from_raw(self, id))
    }

    /// Search a set of schema children for a data node by name, looking
    /// through choice/case layers.
    pub(crate) fn find_visible(
        &self,
        children: &[SchemaNodeId],
        name: &str,
    ) -> Option<SchemaNodeId> {
        for &id in children {
            let node = &self.nodes[id.0];
            match node.kind {
                SchemaNodeKind::Choice | SchemaNodeKind::Case => {
                    if let Some(found) = self.find_visible(&node.children, name) {
                        return Some(found);
                    }
                }
                _ if node.name == name => return Some(id),
                _ => {}
            }
        }
        None
    }

    /// Returns an iterator over all data nodes from all modules in the
    /// context (depth-first search algorithm).
    pub fn traverse(&self) -> impl Iterator<Item = SchemaNode<'_>> {
        self.modules()
            .flat_map(|module| module.data())
            .flat_map(|snode| snode.traverse())
    }

    pub(crate) fn node_data(&self, id: SchemaNodeId) -> &SchemaNodeData {
        &self.nodes[id.0]
    }
}
