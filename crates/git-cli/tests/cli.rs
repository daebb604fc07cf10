mod common;

use std::collections::HashMap;
use std::fs;

use common::*;

const A: [u8; 20] = [1; 20];
const B: [u8; 20] = [2; 20];
const MISSING: [u8; 20] = [3; 20];

fn site(entries: &[(&str, [u8; 20], u32, u32)], objects: &[([u8; 20], &[u8])]) -> String {
    let mut routes = HashMap::new();
    routes.insert(INDEX_ROUTE.to_string(), index(entries));
    for (oid, content) in objects {
        routes.insert(object_route(oid), blob(content));
    }
    format!("http://{}/repo/.git/", serve(routes))
}

#[test]
fn missing_url_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = githarvest(dir.path(), &[]);
    assert_eq!(result.exit_code, 2);
    assert!(result.stderr.contains("Usage"), "{}", result.stderr);
}

#[test]
fn empty_url_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = githarvest(dir.path(), &[""]);
    assert_eq!(result.exit_code, 2);
}

#[test]
fn unsupported_scheme_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = githarvest(dir.path(), &["ftp://example.com/.git/"]);
    assert_eq!(result.exit_code, 2);
}

#[test]
fn missing_index_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("http://{}/nothing/.git/", serve(HashMap::new()));
    let result = githarvest(dir.path(), &[&url, "-o", "out"]);
    assert_eq!(result.exit_code, 128);
    assert!(result.stderr.contains("fatal"), "{}", result.stderr);
    assert!(!dir.path().join("out").exists());
}

#[test]
fn garbage_index_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut routes = HashMap::new();
    routes.insert(INDEX_ROUTE.to_string(), b"<html>not an index</html>".to_vec());
    let url = format!("http://{}/repo/.git/", serve(routes));

    let result = githarvest(dir.path(), &[&url, "-o", "out"]);
    assert_eq!(result.exit_code, 128);
    assert!(result.stderr.contains("cannot decode index"), "{}", result.stderr);
}

#[test]
fn rebuilds_working_tree() {
    let dir = tempfile::tempdir().unwrap();
    let url = site(
        &[
            ("README.md", A, 6, 0o100644),
            ("src/lib.rs", B, 12, 0o100644),
        ],
        &[(A, b"readme"), (B, b"pub fn x(){}")],
    );

    let result = githarvest(dir.path(), &[&url, "-o", "out", "-j", "2"]);
    assert_eq!(result.exit_code, 0, "{}\n{}", result.stdout, result.stderr);

    let out = dir.path().join("out");
    assert_eq!(fs::read(out.join("README.md")).unwrap(), b"readme");
    assert_eq!(fs::read(out.join("src/lib.rs")).unwrap(), b"pub fn x(){}");
    assert!(result.stdout.contains("ok     README.md (6 bytes)"), "{}", result.stdout);
    assert!(result.stdout.contains("2 written, 0 skipped, 0 failed, 0 cancelled"));
}

#[test]
fn partial_failure_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let url = site(
        &[("here", A, 4, 0o100644), ("gone", MISSING, 4, 0o100644)],
        &[(A, b"here")],
    );

    let result = githarvest(dir.path(), &[&url, "-o", "out"]);
    assert_eq!(result.exit_code, 1);
    assert_eq!(fs::read(dir.path().join("out/here")).unwrap(), b"here");
    assert!(!dir.path().join("out/gone").exists());
    assert!(result.stdout.contains("fail   gone: fetch failed: not found"), "{}", result.stdout);
}

#[test]
fn skipped_entries_do_not_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let url = site(
        &[
            ("ok", A, 2, 0o100644),
            ("vendor/sub", B, 0, 0o160000),
            ("../evil", B, 0, 0o100644),
        ],
        &[(A, b"ok")],
    );

    let result = githarvest(dir.path(), &[&url, "-o", "out"]);
    assert_eq!(result.exit_code, 0, "{}", result.stdout);
    assert!(result.stdout.contains("skip   vendor/sub: submodule"));
    assert!(result.stdout.contains("skip   ../evil: unsafe path"));
    assert!(!dir.path().join("evil").exists());
}

#[test]
fn default_output_is_named_after_host() {
    let dir = tempfile::tempdir().unwrap();
    let url = site(&[("f", A, 1, 0o100644)], &[(A, b"f")]);

    let result = githarvest(dir.path(), &[&url]);
    assert_eq!(result.exit_code, 0, "{}", result.stderr);
    assert_eq!(fs::read(dir.path().join("127.0.0.1/f")).unwrap(), b"f");
}

#[test]
fn rerun_overwrites_and_clean_removes_stale_files() {
    let dir = tempfile::tempdir().unwrap();
    let url = site(&[("f", A, 3, 0o100644)], &[(A, b"new")]);
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("f"), b"old").unwrap();
    fs::write(out.join("stale"), b"left over").unwrap();

    let first = githarvest(dir.path(), &[&url, "-o", "out"]);
    assert_eq!(first.exit_code, 0);
    assert_eq!(fs::read(out.join("f")).unwrap(), b"new");
    assert!(out.join("stale").exists());

    let second = githarvest(dir.path(), &[&url, "-o", "out", "--clean"]);
    assert_eq!(second.exit_code, 0);
    assert_eq!(fs::read(out.join("f")).unwrap(), b"new");
    assert!(!out.join("stale").exists());
}

#[test]
fn port_flag_overrides_url_port() {
    let dir = tempfile::tempdir().unwrap();
    let url = site(&[("f", A, 1, 0o100644)], &[(A, b"f")]);
    let port = url
        .trim_start_matches("http://127.0.0.1:")
        .split('/')
        .next()
        .unwrap()
        .to_string();

    let result = githarvest(dir.path(), &["http://127.0.0.1:1/repo/.git/", "-p", &port, "-o", "out"]);
    assert_eq!(result.exit_code, 0, "{}", result.stderr);
}

#[test]
fn zero_jobs_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let result = githarvest(dir.path(), &["http://example.com/.git/", "-j", "0"]);
    assert_eq!(result.exit_code, 2);
}
