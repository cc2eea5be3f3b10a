//
// Copyright (c) The yangdb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! XPath evaluation.
//!
//! Implements the XPath 1.0 subset configuration filters use: absolute
//! location paths of child steps, each step a name test (or `*`) with
//! any number of equality predicates. A predicate compares either a
//! child element's body (`[name='value']`) or the context element's own
//! body (`[.='value']`).

use crate::data::{XmlNodeId, XmlTree};
use crate::error::{Error, ErrorKind, Result};

#[derive(Debug)]
struct Step {
    /// Name test; `None` matches any element.
    name: Option<String>,
    preds: Vec<Pred>,
}

#[derive(Debug)]
struct Pred {
    /// Child element name, or `None` for the context element itself.
    child: Option<String>,
    value: String,
}

/// Evaluate an XPath expression against a tree, returning the handles of
/// all matching elements.
pub fn eval(tree: &XmlTree, xpath: &str) -> Result<Vec<XmlNodeId>> {
    let steps = parse(xpath)?;
    let mut frontier = vec![tree.root().id()];
    for step in &steps {
        let mut next = Vec::new();
        for &id in &frontier {
            for child in tree.node(id).children() {
                if step_matches(tree, child.id(), step) {
                    next.push(child.id());
                }
            }
        }
        frontier = next;
    }
    Ok(frontier)
}

fn step_matches(tree: &XmlTree, id: XmlNodeId, step: &Step) -> bool {
    let node = tree.node(id);
    if let Some(name) = &step.name {
        if node.name() != name {
            return false;
        }
    }
    step.preds.iter().all(|pred| match &pred.child {
        Some(child) => node
            .find_child(child)
            .and_then(|child| child.value())
            .is_some_and(|value| value == pred.value),
        None => node.value().is_some_and(|value| value == pred.value),
    })
}

fn parse(xpath: &str) -> Result<Vec<Step>> {
    let bad = |msg: &str| Error::msg(ErrorKind::BadXpath, msg).with_path(xpath);

    let mut rest = xpath
        .trim()
        .strip_prefix('/')
        .ok_or_else(|| bad("expected absolute location path"))?;
    let mut steps = Vec::new();
    loop {
        let end = rest
            .find(|ch| ch == '/' || ch == '[')
            .unwrap_or(rest.len());
        let name = &rest[..end];
        if name.is_empty() {
            return Err(bad("empty step"));
        }
        let mut step = Step {
            name: (name != "*").then(|| name.to_owned()),
            preds: Vec::new(),
        };
        rest = &rest[end..];

        while let Some(inner) = rest.strip_prefix('[') {
            let close = inner
                .find(']')
                .ok_or_else(|| bad("unterminated predicate"))?;
            step.preds.push(parse_pred(&inner[..close], xpath)?);
            rest = &inner[close + 1..];
        }
        steps.push(step);

        match rest.strip_prefix('/') {
            Some(tail) => rest = tail,
            None if rest.is_empty() => break,
            None => return Err(bad("trailing input after step")),
        }
    }
    Ok(steps)
}

fn parse_pred(pred: &str, xpath: &str) -> Result<Pred> {
    let bad = |msg: &str| Error::msg(ErrorKind::BadXpath, msg).with_path(xpath);

    let (child, value) = pred
        .split_once('=')
        .ok_or_else(|| bad("expected equality predicate"))?;
    let child = child.trim();
    let value = value.trim();
    let value = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| {
            value.strip_prefix('"').and_then(|v| v.strip_suffix('"'))
        })
        .ok_or_else(|| bad("expected quoted literal in predicate"))?;
    if child.is_empty() {
        return Err(bad("empty name in predicate"));
    }
    Ok(Pred {
        child: (child != ".").then(|| child.to_owned()),
        value: value.to_owned(),
    })
}
