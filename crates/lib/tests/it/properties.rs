use std::fs;

use cfgmgmt::archive::CommitLog;
use cfgmgmt::commit::CommitMeta;
use cfgmgmt::diff::DiffTree;
use cfgmgmt::tree::{ConfigTree, Node};
use cfgmgmt::view::DictOptions;
use cfgmgmt::ConfigPath;
use proptest::prelude::*;

use crate::helpers::{Harness, host, parse, path, schema};

/// One interface: tag value, addresses, description, disabled.
type Interface = (String, Vec<String>, Option<String>, bool);

/// Tag values, including ones the text format has to quote.
fn tag_value() -> impl Strategy<Value = String> {
    prop_oneof![
        "eth[0-9]{1,2}",
        "[a-z0-9\"'{}/\\\\;#]{1,6}",
        "//[a-z]{0,4}",
    ]
}

fn interface() -> impl Strategy<Value = Interface> {
    (
        tag_value(),
        prop::collection::vec("10\\.0\\.[0-9]{1,2}\\.1/24", 0..3),
        prop::option::of("[ -~]{0,12}"),
        any::<bool>(),
    )
}

fn config() -> impl Strategy<Value = ConfigTree> {
    (
        prop::option::of("[a-z][a-z0-9-]{0,8}"),
        prop::collection::vec("[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}", 0..4),
        prop::collection::vec(interface(), 0..3),
        prop::option::of(1u16..65535),
    )
        .prop_map(|(host_name, servers, interfaces, port)| {
            let schema = schema();
            let schema = schema.as_ref();
            let mut tree = ConfigTree::new();
            if let Some(name) = host_name {
                tree.set(schema, &path("system host-name"), Some(&name), true).unwrap();
            }
            for server in &servers {
                tree.append(schema, &path("system name-server"), server).unwrap();
            }
            for (name, addresses, description, disabled) in &interfaces {
                let base = path("interfaces ethernet").child(name.as_str()).unwrap();
                tree.set(schema, &base, None, true).unwrap();
                for address in addresses {
                    tree.append(schema, &base.child("address").unwrap(), address).unwrap();
                }
                if let Some(description) = description {
                    tree.set(schema, &base.child("description").unwrap(), Some(description), true)
                        .unwrap();
                }
                if *disabled {
                    tree.set_valueless(schema, &base.child("disable").unwrap()).unwrap();
                }
            }
            if let Some(port) = port {
                tree.set(schema, &path("service ssh port"), Some(&port.to_string()), true)
                    .unwrap();
            }
            tree
        })
}

/// Every node path of `tree` plus a few that never exist.
fn probe_paths(tree: &ConfigTree) -> Vec<ConfigPath> {
    fn walk(node: &Node, at: &ConfigPath, out: &mut Vec<ConfigPath>) {
        out.push(at.clone());
        match node {
            Node::NonLeaf(children) | Node::Tag(children) => {
                for (name, child) in children {
                    walk(child, &at.child(name.as_str()).unwrap(), out);
                }
            }
            Node::Multi(values) => {
                out.extend(values.iter().map(|value| at.child(value.as_str()).unwrap()));
            }
            Node::Leaf(_) | Node::Valueless => {}
        }
    }
    let mut out = Vec::new();
    walk(tree.root(), &ConfigPath::root(), &mut out);
    out.retain(|p| !p.is_root());
    out.extend(["protocols bgp", "system time-zone", "interfaces ethernet eth99"].map(path));
    out
}

proptest! {
    #[test]
    fn exists_matches_reads(tree in config()) {
        for p in probe_paths(&tree) {
            let parent_value = p.parent().zip(p.last()).is_some_and(|(parent, last)| {
                tree.values(&parent).iter().any(|v| v == last) || tree.value(&parent) == Some(last)
            });
            let present = tree.node_at(&p).is_some() || parent_value;
            prop_assert_eq!(tree.exists(&p), present, "{}", p);

            let readable = tree.value(&p).is_some()
                || !tree.values(&p).is_empty()
                || !tree.children(&p).is_empty();
            if readable {
                prop_assert!(tree.exists(&p), "{}", p);
            }
        }
    }

    #[test]
    fn text_round_trip_is_stable(tree in config()) {
        let text = tree.to_text();
        let reparsed = ConfigTree::parse_with_schema(&text, schema().as_ref()).unwrap();
        prop_assert_eq!(reparsed.to_text(), text);
    }

    #[test]
    fn json_projection_survives_text_round_trip(tree in config()) {
        let reparsed = ConfigTree::parse_with_schema(&tree.to_text(), schema().as_ref()).unwrap();
        prop_assert_eq!(reparsed.to_json_value(), tree.to_json_value());
    }

    #[test]
    fn diff_is_empty_for_identical_trees_and_antisymmetric(left in config(), right in config()) {
        let same = DiffTree::new(&left, &left);
        prop_assert!(same.add().is_empty());
        prop_assert!(same.sub().is_empty());

        let forward = DiffTree::new(&left, &right);
        let backward = DiffTree::new(&right, &left);
        prop_assert_eq!(forward.add(), backward.sub());
        prop_assert_eq!(forward.sub(), backward.add());
    }
}

#[test]
fn with_defaults_is_defaults_merged_under_the_view() {
    let h = Harness::new();
    let text = "service {\n    ssh {\n        listen-address 192.0.2.1\n    }\n}\n";
    let session = h.session(text, None);

    let options = DictOptions::at(path("service ssh")).get_first_key();
    let with = session.dict(&options.clone().with_defaults()).unwrap();
    assert_eq!(with["port"], "22");
    assert_eq!(with["listen-address"], "192.0.2.1");

    let plain = session.dict(&options).unwrap();
    let merged = session.merge_defaults(plain, false).unwrap();
    assert_eq!(with.to_value(), merged.to_value());

    let twice = session.merge_defaults(with.clone(), false).unwrap();
    assert_eq!(twice.to_value(), with.to_value());
}

#[test]
fn commit_makes_running_equal_proposed() {
    let h = Harness::new();
    let env = h.session_env(true);
    fs::write(&env.running_config, host("r1")).unwrap();
    let proposed_text = format!("{}service {{\n    ssh {{\n        port 2222\n    }}\n}}\n", host("r2"));
    fs::write(env.proposed_config.as_ref().unwrap(), &proposed_text).unwrap();
    let running_file = env.running_config.clone();
    let mut session = h.file_session(env);

    h.engine.commit(&mut session, &CommitMeta::default()).unwrap();
    assert_eq!(session.running(), &parse(&proposed_text));
    assert_eq!(h.read(&running_file), session.running().to_text());
    assert!(!session.session_changed());

    // the boot file lags until saved
    assert!(h.engine.unsaved_commits(session.running()).unwrap());
    h.engine
        .save(session.running(), &h.layout().config_file, None)
        .unwrap();
    assert!(!h.engine.unsaved_commits(session.running()).unwrap());
}

#[test]
fn rollback_shifts_revision_list_by_one() {
    let h = Harness::new();
    for n in 1..=5 {
        h.commit(&host(&format!("r{n}")));
    }
    let before: Vec<Vec<u8>> = (0..5).map(|rev| h.revision_bytes(rev)).collect();

    let k = 3;
    h.engine.rollback(k, true).unwrap();
    assert_eq!(fs::read(h.layout().prerollback()).unwrap(), before[0]);

    // the rebooted system commits the rolled-back config
    let booted = parse(&h.read(&h.layout().config_file));
    h.engine
        .commit_revision(&booted, &CommitMeta::new("root", "init", "commit"))
        .unwrap();
    assert_eq!(h.engine.archive().num_revisions().unwrap(), 6);
    assert_eq!(h.revision_bytes(0), before[k]);
    for j in 0..5 {
        assert_eq!(h.revision_bytes(j + 1), before[j], "revision {j}");
    }
}

#[test]
fn commit_log_parsing_skips_malformed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let log = CommitLog::new(dir.path().join("commits"));
    fs::write(
        log.path(),
        "|1700000300|alice|cli|fix %%pipe%% here|\n\
         garbage\n\
         |notanumber|bob|cli|x|\n\
         |1700000200|bob|cli|commit|\n\
         |1700000100|carol|init|\n\
         \n\
         |1700000000|root|init|commit|\n",
    )
    .unwrap();

    let entries = log.entries().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].comment, "fix |pipe| here");
    assert_eq!(entries[0].user, "alice");
    assert_eq!(entries[1].timestamp, 1_700_000_200);
    assert_eq!(entries[2].via, "init");
}
