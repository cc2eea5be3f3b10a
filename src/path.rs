//
// Copyright (c) The yangdb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Path codec.
//!
//! A datastore key (xml key) is the concatenation of an element's name
//! with its ancestors' names plus any list key values, e.g.
//! `/interfaces/interface/eth0/address/10.0.0.1`. A key format is the
//! same string with every key value replaced by the `%s` placeholder,
//! e.g. `/interfaces/interface/%s/address/%s`. Key formats are derived
//! once from the schema and instantiated later by frontends holding
//! unstructured variable bindings:
//!
//! ```text
//! +-----------------+  schema_to_format   +---------------------+
//! | list aa, key k  | ------------------> |       /aa/%s        |
//! +-----------------+                     +---------------------+
//!                                                   |
//!                                                   | k=17
//!                                                   v
//!                              format_and_values_to_key:  /aa/17
//! ```

use log::warn;

use crate::error::{Error, ErrorKind, Result};
use crate::schema::{SchemaNode, SchemaNodeKind};

/// An ordered sequence of variable bindings.
///
/// The entry at index 0 is the command label and is never substituted
/// into a key format; trailing entries may be left out, in which case
/// the remaining placeholders are treated as wildcards by
/// [`format_and_values_to_regex`].
#[derive(Clone, Debug)]
pub struct ValueVec {
    vars: Vec<String>,
}

impl ValueVec {
    /// Create a value vector holding only the command label.
    pub fn new(label: impl Into<String>) -> ValueVec {
        ValueVec {
            vars: vec![label.into()],
        }
    }

    /// Append a variable value.
    pub fn push(&mut self, value: impl Into<String>) {
        self.vars.push(value.into());
    }

    /// The command label.
    pub fn label(&self) -> &str {
        &self.vars[0]
    }

    /// Number of entries, the label included.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns whether the vector holds no values besides the label.
    pub fn is_empty(&self) -> bool {
        self.vars.len() == 1
    }

    fn get(&self, index: usize) -> Option<&str> {
        self.vars.get(index).map(String::as_str)
    }
}

/// Construct a key format from a schema node, using `%s` wildcards for
/// key positions.
///
/// The format is rendered root-down: one `/<name>` per ancestor and the
/// node itself (choice and case nodes are invisible on the data path),
/// plus one `/%s` per key leaf after each list and a single `/%s` after
/// each leaf-list.
pub fn schema_to_format(snode: &SchemaNode<'_>) -> Result<String> {
    let mut chain = snode.inclusive_ancestors().collect::<Vec<_>>();
    chain.reverse();

    let mut fmt = String::new();
    for snode in &chain {
        if !snode.kind().is_schema_only() {
            fmt.push('/');
            fmt.push_str(snode.name());
        }
        match snode.kind() {
            SchemaNodeKind::List => {
                for _ in snode.list_key_names()? {
                    fmt.push_str("/%s");
                }
            }
            SchemaNodeKind::LeafList => fmt.push_str("/%s"),
            _ => {}
        }
    }
    Ok(fmt)
}

/// Instantiate a key format into an xml key by substituting values for
/// the `%s` placeholders.
///
/// Substitution starts at index 1 of the value vector (index 0 is the
/// command label). Running out of values is an error; unused trailing
/// values are ignored with a warning.
pub fn format_and_values_to_key(fmt: &str, values: &ValueVec) -> Result<String> {
    let mut key = String::with_capacity(fmt.len());
    let mut next = 1;
    let mut rest = fmt;
    while let Some(pos) = find_placeholder(fmt, rest)? {
        key.push_str(&rest[..pos]);
        let value = values.get(next).ok_or_else(|| {
            Error::msg(
                ErrorKind::BadFormat,
                format!("too few values for format {}", fmt),
            )
        })?;
        key.push_str(value);
        next += 1;
        rest = &rest[pos + 2..];
    }
    key.push_str(rest);

    if next < values.len() {
        warn!(
            "key format mismatch, {} values unused: {} ({})",
            values.len() - next,
            fmt,
            values.label()
        );
    }
    Ok(key)
}

/// Instantiate a key format into an anchored regular expression,
/// substituting `.*` for every placeholder the value vector does not
/// cover. Used for wildcard deletion of whole subtrees.
pub fn format_and_values_to_regex(
    fmt: &str,
    values: &ValueVec,
) -> Result<String> {
    let mut pattern = String::with_capacity(fmt.len() + 2);
    pattern.push('^');
    let mut next = 1;
    let mut rest = fmt;
    while let Some(pos) = find_placeholder(fmt, rest)? {
        pattern.push_str(&regex::escape(&rest[..pos]));
        match values.get(next) {
            Some(value) => {
                pattern.push_str(&regex::escape(value));
                next += 1;
            }
            None => pattern.push_str(".*"),
        }
        rest = &rest[pos + 2..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');
    Ok(pattern)
}

/// Position of the next `%s` in `rest`, rejecting any other use of `%`.
fn find_placeholder(fmt: &str, rest: &str) -> Result<Option<usize>> {
    match rest.find('%') {
        Some(pos) if rest[pos..].starts_with("%s") => Ok(Some(pos)),
        Some(_) => Err(Error::msg(
            ErrorKind::BadFormat,
            format!("bad placeholder in format {}", fmt),
        )),
        None => Ok(None),
    }
}
