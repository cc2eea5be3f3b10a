//
// Copyright (c) The yangdb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Command-line datastore utility.
//!
//! Reads or edits a text-file datastore against a YANG module:
//!
//! ```text
//! yangdb get <db> <yangfile> [<xpath>]
//! yangdb put <db> <yangfile> merge|replace|create|delete|remove
//! ```
//!
//! `put` reads the XML edit tree from standard input.

use std::io::Read;
use std::process::exit;

use yangdb::context::Context;
use yangdb::data::{XmlPrinterFlags, XmlTree};
use yangdb::datastore::{Datastore, Operation};
use yangdb::db::TextStore;

fn usage() -> ! {
    eprintln!("usage: yangdb get <db> <yangfile> [<xpath>]");
    eprintln!("       yangdb put <db> <yangfile> <operation>\t\txml on stdin");
    exit(1);
}

fn run() -> yangdb::Result<()> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let (cmd, db, yangfile) = match args.as_slice() {
        [cmd, db, yangfile, ..] => (cmd.as_str(), db, yangfile),
        _ => usage(),
    };

    let mut ctx = Context::new();
    let text = std::fs::read_to_string(yangfile).unwrap_or_else(|err| {
        eprintln!("yangdb: {}: {}", yangfile, err);
        exit(1);
    });
    ctx.load_module_str(&text)?;

    let mut store = Datastore::new(TextStore::open(db)?);
    match (cmd, &args[3..]) {
        ("get", rest) if rest.len() <= 1 => {
            let xpath = rest.first().map(String::as_str);
            let tree = store.get(&ctx, xpath)?;
            print!("{}", tree.print_string(XmlPrinterFlags::empty()));
        }
        ("put", [op]) => {
            let op = op.parse::<Operation>()?;
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input).unwrap_or_else(|err| {
                eprintln!("yangdb: stdin: {}", err);
                exit(1);
            });
            let edit = XmlTree::parse_string(&input)?;
            store.put(&ctx, &edit, op)?;
        }
        _ => usage(),
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("yangdb: {}", err);
        exit(1);
    }
}
