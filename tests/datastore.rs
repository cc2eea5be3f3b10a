//
// Copyright (c) The yangdb Core Contributors
//
// SPDX-License-Identifier: MIT
//

use yangdb::context::Context;
use yangdb::data::{XmlPrinterFlags, XmlTree};
use yangdb::datastore::{Datastore, Operation};
use yangdb::db::{KvStore, MemStore, TextStore};
use yangdb::{ErrorKind, Result};

static HOSTS: &str = r###"
    module hosts {
        namespace "urn:example:hosts";
        prefix h;
        container a { leaf b { type string; } }
    }"###;

static ROUTES: &str = r###"
    module routes {
        namespace "urn:example:routes";
        prefix r;
        list x {
            key "k1 k2";
            leaf k1 { type string; }
            leaf k2 { type string; }
            leaf v { type string; }
        }
    }"###;

static COLORS: &str = r###"
    module colors {
        namespace "urn:example:colors";
        prefix c;
        leaf-list ll { type string; }
    }"###;

static TIMEOUTS: &str = r###"
    module timeouts {
        namespace "urn:example:timeouts";
        prefix t;
        container c { leaf n { type uint32; default "42"; } }
    }"###;

fn context_with(module: &str) -> Context {
    let mut ctx = Context::new();
    ctx.load_module_str(module).expect("Failed to load module");
    ctx
}

fn shrink(tree: &XmlTree) -> String {
    tree.print_string(XmlPrinterFlags::SHRINK)
}

fn preload(pairs: &[(&str, Option<&str>)]) -> Datastore<MemStore> {
    let mut store = MemStore::new();
    for (key, value) in pairs {
        store.set(key, *value).expect("Failed to preload store");
    }
    Datastore::new(store)
}

#[test]
fn get_bare_container() {
    let ctx = context_with(HOSTS);
    let store = preload(&[("/a/b", Some("7"))]);

    let tree = store.get(&ctx, None).expect("Failed to read datastore");
    assert_eq!(shrink(&tree), "<a><b>7</b></a>");
}

#[test]
fn get_list_with_composite_key() {
    let ctx = context_with(ROUTES);
    let store = preload(&[
        ("/x/1/aa", None),
        ("/x/1/aa/k1", Some("1")),
        ("/x/1/aa/k2", Some("aa")),
        ("/x/1/aa/v", Some("hello")),
    ]);

    let tree = store.get(&ctx, None).expect("Failed to read datastore");
    assert_eq!(
        shrink(&tree),
        "<x><k1>1</k1><k2>aa</k2><v>hello</v></x>"
    );
}

#[test]
fn get_leaf_list() {
    let ctx = context_with(COLORS);
    let store = preload(&[("/ll/red", None), ("/ll/blue", None)]);

    let tree = store.get(&ctx, None).expect("Failed to read datastore");
    assert_eq!(shrink(&tree), "<ll>blue</ll><ll>red</ll>");
}

#[test]
fn get_injects_defaults() {
    let ctx = context_with(TIMEOUTS);
    let store = Datastore::new(MemStore::new());

    let tree = store.get(&ctx, None).expect("Failed to read datastore");
    assert_eq!(shrink(&tree), "<c><n>42</n></c>");
    let leaf = tree
        .root()
        .find_child("c")
        .and_then(|c| c.find_child("n"))
        .unwrap();
    assert!(leaf.is_default());
}

#[test]
fn defaults_do_not_shadow() {
    let ctx = context_with(TIMEOUTS);
    let store = preload(&[("/c", None), ("/c/n", Some("7"))]);

    let tree = store.get(&ctx, None).expect("Failed to read datastore");
    assert_eq!(shrink(&tree), "<c><n>7</n></c>");
    let leaf = tree
        .root()
        .find_child("c")
        .and_then(|c| c.find_child("n"))
        .unwrap();
    assert!(!leaf.is_default());
}

#[test]
fn get_with_xpath_prunes() {
    let ctx = context_with(ROUTES);
    let store = preload(&[
        ("/x/1/aa", None),
        ("/x/1/aa/k1", Some("1")),
        ("/x/1/aa/k2", Some("aa")),
        ("/x/1/aa/v", Some("hello")),
        ("/x/2/bb", None),
        ("/x/2/bb/k1", Some("2")),
        ("/x/2/bb/k2", Some("bb")),
        ("/x/2/bb/v", Some("world")),
    ]);

    let tree = store
        .get(&ctx, Some("/x[k1='1']"))
        .expect("Failed to read datastore");
    assert_eq!(
        shrink(&tree),
        "<x><k1>1</k1><k2>aa</k2><v>hello</v></x>"
    );

    // No match prunes everything.
    let tree = store
        .get(&ctx, Some("/x[k1='9']"))
        .expect("Failed to read datastore");
    assert_eq!(shrink(&tree), "");
}

#[test]
fn get_vec_does_not_prune() {
    let ctx = context_with(ROUTES);
    let store = preload(&[
        ("/x/1/aa/k1", Some("1")),
        ("/x/1/aa/k2", Some("aa")),
        ("/x/2/bb/k1", Some("2")),
        ("/x/2/bb/k2", Some("bb")),
    ]);

    let (tree, matches) = store
        .get_vec(&ctx, "/x[k1='1']")
        .expect("Failed to read datastore");
    assert_eq!(matches.len(), 1);
    assert_eq!(
        shrink(&tree),
        "<x><k1>1</k1><k2>aa</k2></x><x><k1>2</k1><k2>bb</k2></x>"
    );
    assert_eq!(
        tree.node(matches[0])
            .find_child("k2")
            .and_then(|k2| k2.value()),
        Some("aa")
    );
}

#[test]
fn put_then_get_round_trip() {
    let ctx = context_with(HOSTS);
    let mut store = Datastore::new(MemStore::new());

    let edit = XmlTree::parse_string("<a><b>7</b></a>").unwrap();
    store
        .put(&ctx, &edit, Operation::Merge)
        .expect("Failed to apply edit");

    let tree = store.get(&ctx, None).expect("Failed to read datastore");
    assert_eq!(shrink(&tree), "<a><b>7</b></a>");

    // Merge is idempotent: a second identical put does not grow the
    // pair set.
    let pairs = store.store().scan("").unwrap().len();
    store
        .put(&ctx, &edit, Operation::Merge)
        .expect("Failed to apply edit");
    assert_eq!(store.store().scan("").unwrap().len(), pairs);
}

#[test]
fn put_list_emits_keys() {
    let ctx = context_with(ROUTES);
    let mut store = Datastore::new(MemStore::new());

    let edit = XmlTree::parse_string(
        "<x><k1>1</k1><k2>aa</k2><v>hello</v></x>",
    )
    .unwrap();
    store
        .put(&ctx, &edit, Operation::Merge)
        .expect("Failed to apply edit");

    let mut keys = store
        .store()
        .scan("")
        .unwrap()
        .into_iter()
        .map(|(key, _)| key)
        .collect::<Vec<_>>();
    keys.sort();
    assert_eq!(
        keys,
        vec!["/x/1/aa", "/x/1/aa/k1", "/x/1/aa/k2", "/x/1/aa/v"]
    );
}

#[test]
fn put_replace_resets() {
    let ctx = context_with(HOSTS);
    let mut store = preload(&[("/a/b", Some("9"))]);

    let edit = XmlTree::parse_string("<a><b>7</b></a>").unwrap();
    store
        .put(&ctx, &edit, Operation::Replace)
        .expect("Failed to apply edit");

    let tree = store.get(&ctx, None).expect("Failed to read datastore");
    assert_eq!(shrink(&tree), "<a><b>7</b></a>");
    assert_eq!(store.store().get("/a/b").unwrap(), Some(Some("7".to_owned())));
}

#[test]
fn put_operation_attribute() {
    let ctx = context_with(ROUTES);
    let mut store = preload(&[
        ("/x/1/aa", None),
        ("/x/1/aa/k1", Some("1")),
        ("/x/1/aa/k2", Some("aa")),
        ("/x/1/aa/v", Some("hello")),
        ("/x/2/bb", None),
        ("/x/2/bb/k1", Some("2")),
        ("/x/2/bb/k2", Some("bb")),
    ]);

    // The entry carries its own operation; the walk is seeded with
    // none so only attributed nodes write.
    let edit = XmlTree::parse_string(
        "<x operation=\"remove\"><k1>1</k1><k2>aa</k2></x>",
    )
    .unwrap();
    store
        .put(&ctx, &edit, Operation::None)
        .expect("Failed to apply edit");

    let tree = store.get(&ctx, None).expect("Failed to read datastore");
    assert_eq!(shrink(&tree), "<x><k1>2</k1><k2>bb</k2></x>");
}

#[test]
fn put_bad_operation_attribute() {
    let ctx = context_with(HOSTS);
    let mut store = Datastore::new(MemStore::new());

    let edit = XmlTree::parse_string("<a operation=\"overwrite\"/>").unwrap();
    assert_eq!(
        store.put(&ctx, &edit, Operation::Merge).unwrap_err().kind,
        ErrorKind::BadOperation
    );
}

#[test]
fn put_unknown_node() {
    let ctx = context_with(HOSTS);
    let mut store = Datastore::new(MemStore::new());

    let edit = XmlTree::parse_string("<nosuch/>").unwrap();
    assert_eq!(
        store.put(&ctx, &edit, Operation::Merge).unwrap_err().kind,
        ErrorKind::UnknownNode
    );

    let edit = XmlTree::parse_string("<a><nosuch/></a>").unwrap();
    assert_eq!(
        store.put(&ctx, &edit, Operation::Merge).unwrap_err().kind,
        ErrorKind::UnknownNode
    );
}

#[test]
fn put_create_precondition() {
    let ctx = context_with(HOSTS);
    let mut store = preload(&[("/a/b", Some("7"))]);

    let edit = XmlTree::parse_string("<a><b operation=\"create\">8</b></a>")
        .unwrap();
    let err = store.put(&ctx, &edit, Operation::Merge).unwrap_err();
    assert_eq!(err.kind, ErrorKind::CreateExists);
    assert_eq!(store.store().get("/a/b").unwrap(), Some(Some("7".to_owned())));
}

#[test]
fn put_delete_precondition() {
    let ctx = context_with(HOSTS);
    let mut store = Datastore::new(MemStore::new());

    let edit = XmlTree::parse_string("<a operation=\"delete\"/>").unwrap();
    let err = store.put(&ctx, &edit, Operation::Merge).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DeleteMissing);
    assert!(store.store().scan("").unwrap().is_empty());
}

#[test]
fn put_key_create_conflict() {
    let ctx = context_with(HOSTS);
    let mut store = preload(&[("/a/b", Some("7"))]);

    let err = store
        .put_key(&ctx, "/a/b", Some("8"), Operation::Create)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::CreateExists);
    assert_eq!(store.store().get("/a/b").unwrap(), Some(Some("7".to_owned())));
}

#[test]
fn put_key_writes_intermediates() {
    let ctx = context_with(ROUTES);
    let mut store = Datastore::new(MemStore::new());

    store
        .put_key(&ctx, "/x/1/aa/v", Some("hello"), Operation::Merge)
        .expect("Failed to apply edit");

    let tree = store.get(&ctx, None).expect("Failed to read datastore");
    assert_eq!(
        shrink(&tree),
        "<x><k1>1</k1><k2>aa</k2><v>hello</v></x>"
    );
}

#[test]
fn put_key_leaf_list() {
    let ctx = context_with(COLORS);
    let mut store = Datastore::new(MemStore::new());

    store
        .put_key(&ctx, "/ll/red", None, Operation::Merge)
        .expect("Failed to apply edit");

    let tree = store.get(&ctx, None).expect("Failed to read datastore");
    assert_eq!(shrink(&tree), "<ll>red</ll>");
}

#[test]
fn put_key_delete_lifts_to_list_entry() {
    let ctx = context_with(ROUTES);
    let mut store = preload(&[
        ("/x/1/aa", None),
        ("/x/1/aa/k1", Some("1")),
        ("/x/1/aa/k2", Some("aa")),
        ("/x/1/aa/v", Some("hello")),
        ("/x/2/bb/k1", Some("2")),
        ("/x/2/bb/k2", Some("bb")),
    ]);

    // Deleting through the key leaf removes the whole entry, not the
    // key-leaf pair alone.
    store
        .put_key(&ctx, "/x/1/aa/k1", None, Operation::Delete)
        .expect("Failed to apply edit");

    let mut keys = store
        .store()
        .scan("")
        .unwrap()
        .into_iter()
        .map(|(key, _)| key)
        .collect::<Vec<_>>();
    keys.sort();
    assert_eq!(keys, vec!["/x/2/bb/k1", "/x/2/bb/k2"]);
}

#[test]
fn put_key_delete_missing() {
    let ctx = context_with(HOSTS);
    let mut store = Datastore::new(MemStore::new());

    let err = store
        .put_key(&ctx, "/a/b", None, Operation::Delete)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::DeleteMissing);

    // Remove of an absent key is fine.
    store
        .put_key(&ctx, "/a/b", None, Operation::Remove)
        .expect("Failed to apply edit");
}

#[test]
fn put_key_malformed() {
    let ctx = context_with(ROUTES);
    let mut store = Datastore::new(MemStore::new());

    for bad in ["x/1/aa", "/x//aa", "/x/1"] {
        let err = store
            .put_key(&ctx, bad, None, Operation::Merge)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedKey, "{}", bad);
    }
    assert_eq!(
        store
            .put_key(&ctx, "/y/1/aa", None, Operation::Merge)
            .unwrap_err()
            .kind,
        ErrorKind::UnknownNode
    );
}

#[test]
fn get_rejects_unknown_pairs() {
    let ctx = context_with(HOSTS);
    let store = preload(&[("/nosuch", None)]);
    assert_eq!(
        store.get(&ctx, None).unwrap_err().kind,
        ErrorKind::UnknownNode
    );

    let store = preload(&[("a/b", None)]);
    assert_eq!(
        store.get(&ctx, None).unwrap_err().kind,
        ErrorKind::MalformedKey
    );
}

/// A store wrapper that scans in reverse order, to exercise assembly
/// determinism.
struct RevStore(MemStore);

impl KvStore for RevStore {
    fn init(&mut self) -> Result<()> {
        self.0.init()
    }
    fn unlink(&mut self) -> Result<()> {
        self.0.unlink()
    }
    fn exists(&self, key: &str) -> Result<bool> {
        self.0.exists(key)
    }
    fn get(&self, key: &str) -> Result<Option<Option<String>>> {
        self.0.get(key)
    }
    fn set(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        self.0.set(key, value)
    }
    fn del(&mut self, key: &str) -> Result<()> {
        self.0.del(key)
    }
    fn scan(&self, pattern: &str) -> Result<Vec<(String, Option<String>)>> {
        let mut pairs = self.0.scan(pattern)?;
        pairs.reverse();
        Ok(pairs)
    }
}

#[test]
fn assembly_is_order_independent() {
    let ctx = context_with(ROUTES);
    let pairs: &[(&str, Option<&str>)] = &[
        ("/x/1/aa", None),
        ("/x/1/aa/k1", Some("1")),
        ("/x/1/aa/k2", Some("aa")),
        ("/x/1/aa/v", Some("hello")),
        ("/x/2/bb/k1", Some("2")),
        ("/x/2/bb/k2", Some("bb")),
    ];

    let forward = preload(pairs);
    let mut rev = RevStore(MemStore::new());
    for (key, value) in pairs {
        rev.set(key, *value).unwrap();
    }
    let reverse = Datastore::new(rev);

    assert_eq!(
        shrink(&forward.get(&ctx, None).unwrap()),
        shrink(&reverse.get(&ctx, None).unwrap())
    );
}

#[test]
fn text_store_persists() {
    let dir = tempfile::tempdir().expect("Failed to create tempdir");
    let path = dir.path().join("running.db");
    let ctx = context_with(HOSTS);

    {
        let mut store = Datastore::new(TextStore::open(&path).unwrap());
        store
            .put_key(&ctx, "/a/b", Some("value with\ttab"), Operation::Merge)
            .expect("Failed to apply edit");
    }

    // Reopen and read back.
    let store = Datastore::new(TextStore::open(&path).unwrap());
    let tree = store.get(&ctx, None).expect("Failed to read datastore");
    let leaf = tree
        .root()
        .find_child("a")
        .and_then(|a| a.find_child("b"))
        .unwrap();
    assert_eq!(leaf.value(), Some("value with\ttab"));

    // Unlink removes the backing file.
    let mut store = store.into_store();
    store.unlink().unwrap();
    assert!(!path.exists());
}
