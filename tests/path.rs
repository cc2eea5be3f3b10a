//
// Copyright (c) The yangdb Core Contributors
//
// SPDX-License-Identifier: MIT
//

use yangdb::context::Context;
use yangdb::path::{
    format_and_values_to_key, format_and_values_to_regex, schema_to_format,
    ValueVec,
};
use yangdb::ErrorKind;

static INTERFACES: &str = r###"
    module interfaces {
        namespace "urn:example:interfaces";
        prefix if;

        container interfaces {
            list interface {
                key "name";
                leaf name { type string; }
                leaf mtu { type uint16; }
                leaf-list address { type string; }
                choice vlan-mode {
                    case trunk {
                        leaf-list trunk-vlans { type uint16; }
                    }
                }
            }
        }
        list route {
            key "prefix next-hop";
            leaf prefix { type string; }
            leaf next-hop { type string; }
        }
    }"###;

fn create_context() -> Context {
    let mut ctx = Context::new();
    ctx.load_module_str(INTERFACES)
        .expect("Failed to load module");
    ctx
}

#[test]
fn format_from_schema() {
    let ctx = create_context();

    let list = ctx
        .find_top("interfaces")
        .and_then(|snode| snode.find_child("interface"))
        .unwrap();
    assert_eq!(
        schema_to_format(&list).unwrap(),
        "/interfaces/interface/%s"
    );
    assert_eq!(
        schema_to_format(&list.find_child("mtu").unwrap()).unwrap(),
        "/interfaces/interface/%s/mtu"
    );

    // One placeholder per leaf-list entry; choice and case are
    // invisible on the data path.
    assert_eq!(
        schema_to_format(&list.find_child("address").unwrap()).unwrap(),
        "/interfaces/interface/%s/address/%s"
    );
    assert_eq!(
        schema_to_format(&list.find_child("trunk-vlans").unwrap()).unwrap(),
        "/interfaces/interface/%s/trunk-vlans/%s"
    );

    // One placeholder per declared key.
    let route = ctx.find_top("route").unwrap();
    assert_eq!(schema_to_format(&route).unwrap(), "/route/%s/%s");
}

#[test]
fn key_from_format() {
    let mut values = ValueVec::new("set interface mtu");
    values.push("eth0");
    assert_eq!(
        format_and_values_to_key("/interfaces/interface/%s/mtu", &values)
            .unwrap(),
        "/interfaces/interface/eth0/mtu"
    );

    // Index 0 is the command label and is never substituted.
    assert_eq!(values.label(), "set interface mtu");
    assert_eq!(
        format_and_values_to_key("/interfaces/interface/%s", &values).unwrap(),
        "/interfaces/interface/eth0"
    );
}

#[test]
fn key_from_format_too_few_values() {
    let mut values = ValueVec::new("set address");
    values.push("eth0");
    assert_eq!(
        format_and_values_to_key("/interfaces/interface/%s/address/%s", &values)
            .unwrap_err()
            .kind,
        ErrorKind::BadFormat
    );
}

#[test]
fn key_from_format_extra_values_ignored() {
    let mut values = ValueVec::new("set interface");
    values.push("eth0");
    values.push("unused");
    assert_eq!(
        format_and_values_to_key("/interfaces/interface/%s", &values).unwrap(),
        "/interfaces/interface/eth0"
    );
}

#[test]
fn regex_from_format() {
    let mut values = ValueVec::new("del interface");
    values.push("eth0.1");
    assert_eq!(
        format_and_values_to_regex("/interfaces/interface/%s", &values)
            .unwrap(),
        "^/interfaces/interface/eth0\\.1$"
    );

    // Exhausted values turn into wildcards.
    let values = ValueVec::new("del interface");
    assert_eq!(
        format_and_values_to_regex("/interfaces/interface/%s/mtu", &values)
            .unwrap(),
        "^/interfaces/interface/.*/mtu$"
    );
}

#[test]
fn bad_placeholder() {
    let values = ValueVec::new("cmd");
    assert_eq!(
        format_and_values_to_key("/a/%d", &values).unwrap_err().kind,
        ErrorKind::BadFormat
    );
}
