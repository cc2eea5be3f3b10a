//
// Copyright (c) The yangdb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Pure-Rust YANG-modeled XML configuration datastore.
//!
//! A datastore persists configuration as flat key/value pairs whose
//! keys encode schema-rooted paths (e.g.
//! `/interfaces/interface/eth0/mtu`), and presents callers with a
//! logical XML tree view assembled under the guidance of the loaded
//! YANG modules. Edits are applied with NETCONF operation semantics
//! (`merge`, `replace`, `create`, `delete`, `remove`, `none`), either
//! as an edit tree or as a single keyed edit.
//!
//! ## Design Goals
//! * Self-contained: schema handling, tree assembly and the path codec
//!   are implemented here, with no bindings to an external YANG library
//! * Leverage Rust's ownership system to detect API misuse problems at
//!   compile time
//! * Pluggable storage: any sorted key-value store can back a datastore
//!   through the [`db::KvStore`] trait
//!
//! ## Example
//!
//! ```
//! use yangdb::context::Context;
//! use yangdb::data::{XmlPrinterFlags, XmlTree};
//! use yangdb::datastore::{Datastore, Operation};
//! use yangdb::db::MemStore;
//!
//! let mut ctx = Context::new();
//! ctx.load_module_str(
//!     "module system {
//!          namespace \"urn:example:system\";
//!          prefix sys;
//!          container system { leaf hostname { type string; } }
//!      }",
//! )
//! .expect("Failed to load module");
//!
//! let mut store = Datastore::new(MemStore::new());
//! let edit = XmlTree::parse_string(
//!     "<system><hostname>router1</hostname></system>",
//! )
//! .expect("Failed to parse edit");
//! store
//!     .put(&ctx, &edit, Operation::Merge)
//!     .expect("Failed to apply edit");
//!
//! let tree = store.get(&ctx, None).expect("Failed to read datastore");
//! assert_eq!(
//!     tree.print_string(XmlPrinterFlags::SHRINK),
//!     "<system><hostname>router1</hostname></system>"
//! );
//! ```

mod error;
mod parser;
mod utils;

pub mod context;
pub mod data;
pub mod datastore;
pub mod db;
pub mod iter;
pub mod path;
pub mod schema;
pub mod xpath;

pub use crate::error::{Error, ErrorKind, ErrorType, Result};
