use std::fs;
use std::sync::Arc;

use cfgmgmt::archive::LogEntry;
use cfgmgmt::commit::{CommitMeta, Outcome};
use cfgmgmt::diff::ChangeDetector;
use cfgmgmt::testing::FlakyCompressor;
use regex::Regex;

use crate::helpers::{EPOCH, Harness, host, parse, path, schema};

#[test]
fn boot_bring_up_archives_running_config() {
    let h = Harness::new();
    let env = h.session_env(false);
    fs::write(&env.running_config, host("r1")).unwrap();
    let session = h.file_session(env);

    let meta = CommitMeta::new("root", "other", "commit");
    h.engine.initialize_revision(session.running(), &meta).unwrap();

    let layout = h.layout();
    assert_eq!(h.read(&layout.archive_config()), host("r1"));
    assert_eq!(h.revision_bytes(0), host("r1").into_bytes());

    let log = h.read(&layout.commit_log());
    let line = Regex::new(r"^\|(\d+)\|root\|init\|commit\|\n$").unwrap();
    let captures = line.captures(&log).expect("one init line");
    assert_eq!(captures[1].parse::<i64>().unwrap(), EPOCH);
}

#[test]
fn compare_commands_lists_new_address() {
    let h = Harness::new();
    let running = host("r1");
    let proposed = format!(
        "{running}interfaces {{\n    ethernet eth0 {{\n        address 10.0.0.1/24\n    }}\n}}\n"
    );
    let session = h.session(&running, Some(&proposed));

    let outcome = h.engine.compare(&session, false, true, None, None).unwrap();
    assert_eq!(
        outcome,
        Outcome::ok("set interfaces ethernet eth0 address '10.0.0.1/24'")
    );
}

#[test]
fn leaf_change_reports_old_value() {
    let old = parse("service {\n    ssh {\n        port 22\n    }\n}\n");
    let new = parse("service {\n    ssh {\n        port 2222\n    }\n}\n");
    let schema = schema();
    let detector = ChangeDetector::new(&old, &new, schema.as_ref());
    assert_eq!(
        detector.leaf_node_changed(&path("service ssh port")).unwrap(),
        Some(vec!["22".to_string()])
    );
}

#[test]
fn multi_leaf_removal_reports_removed_value() {
    let old = parse("system {\n    name-server 1.1.1.1\n    name-server 8.8.8.8\n}\n");
    let new = parse("system {\n    name-server 1.1.1.1\n}\n");
    let schema = schema();
    let detector = ChangeDetector::new(&old, &new, schema.as_ref());
    assert_eq!(
        detector.leaf_node_changed(&path("system name-server")).unwrap(),
        Some(vec!["8.8.8.8".to_string()])
    );
}

#[test]
fn commit_confirm_then_confirm_archives_once() {
    let h = Harness::new();
    h.commit(&host("r1"));
    let before = h.engine.archive().num_revisions().unwrap();

    let mut session = h.session(&host("r1"), Some(&host("r2")));
    let armed = h.engine.commit_confirm(session.running(), 10, true).unwrap();
    assert!(armed.is_success());
    assert_eq!(h.system.state().armed, Some(10));

    let meta = CommitMeta::new("vyos", "cli", "commit").confirming();
    h.engine.commit(&mut session, &meta).unwrap();
    assert_eq!(h.engine.archive().num_revisions().unwrap(), before);

    let confirmed = h.engine.confirm(session.running(), &CommitMeta::default()).unwrap();
    assert_eq!(confirmed, Outcome::ok("Reboot timer stopped"));
    assert!(h.system.state().armed.is_none());
    assert_eq!(h.engine.archive().num_revisions().unwrap(), before + 1);
    assert_eq!(h.revision_bytes(0), host("r2").into_bytes());

    let entries = h.engine.raw_log_data().unwrap();
    assert_eq!(entries[0].via, "commit-confirm");
    assert_eq!(entries[1].via, "cli");
}

#[test]
fn commit_confirm_without_confirm_reverts() {
    let h = Harness::new();
    h.commit(&host("r1"));
    let saved = parse(&host("r1"));
    h.engine.save(&saved, &h.layout().config_file, None).unwrap();
    let log_before = h.read(&h.layout().commit_log());

    let mut session = h.session(&host("r1"), Some(&host("r2")));
    h.engine.commit_confirm(session.running(), 1, true).unwrap();
    let meta = CommitMeta::new("vyos", "cli", "commit").confirming();
    h.engine.commit(&mut session, &meta).unwrap();
    assert!(h.layout().pending_entry().exists());

    // timer expiry runs the revert action
    h.engine.revert().unwrap();
    assert_eq!(h.system.state().reboots, 1);
    assert!(!h.layout().pending_entry().exists());
    assert_eq!(h.read(&h.layout().commit_log()), log_before);

    let booted = parse(&h.read(&h.layout().config_file));
    assert_eq!(booted, saved);
}

#[test]
fn rollback_to_revision_two_of_five() {
    let h = Harness::new();
    for n in 1..=5 {
        h.commit(&host(&format!("r{n}")));
    }
    assert_eq!(h.engine.archive().num_revisions().unwrap(), 5);
    let current = h.read(&h.layout().archive_config());
    let target = h.revision_bytes(2);

    let outcome = h.engine.rollback(2, true).unwrap();
    assert_eq!(outcome.code, 0);

    let layout = h.layout();
    assert_eq!(h.read(&layout.prerollback()), current);
    assert_eq!(fs::read(layout.rollback()).unwrap(), target);
    assert_eq!(fs::read(&layout.config_file).unwrap(), target);
    assert_eq!(String::from_utf8(target).unwrap(), host("r3"));
    assert_eq!(h.system.state().reboots, 1);
    assert!(h.system.state().questions.is_empty());
}

#[test]
fn log_reports_follow_archive() {
    let h = Harness::new();
    h.commit(&host("r1"));
    let mut session = h.session("", Some(&host("r2")));
    h.engine
        .commit(&mut session, &CommitMeta::new("alice", "cli", "rename | router"))
        .unwrap();

    let entries = h.engine.raw_log_data().unwrap();
    assert_eq!(
        entries[0],
        LogEntry::new(EPOCH + 60, "alice", "cli", "rename | router")
    );
    let report = cfgmgmt::commit::format_log_data(&entries);
    assert_eq!(report.lines().count(), 3);
    assert!(report.lines().nth(1).unwrap().trim() == "rename | router");

    let diff = h.engine.show_commit_diff(&session, 0, None, true).unwrap();
    assert_eq!(diff, "set system host-name 'r2'");
    assert!(h.engine.is_node_revised(schema().as_ref(), &path("system host-name"), 1, 0));
}

#[test]
fn failed_archive_step_is_retried_by_the_next_commit() {
    let h = Harness::with_compressor(Arc::new(FlakyCompressor::failing(1)));
    let running = parse(&host("r1"));
    let meta = CommitMeta::new("vyos", "cli", "commit");

    let err = h.engine.commit_revision(&running, &meta).unwrap_err();
    assert!(err.is_io_error());
    assert!(!h.layout().archive_config().exists());
    assert_eq!(h.engine.archive().num_revisions().unwrap(), 0);

    assert!(h.engine.commit_revision(&running, &meta).unwrap());
    assert_eq!(h.engine.archive().num_revisions().unwrap(), 1);
    assert_eq!(h.revision_bytes(0), host("r1").into_bytes());
    assert_eq!(h.read(&h.layout().archive_config()), host("r1"));
}
