//! Integration tests for the CLI binary.
//!
//! This test is registered as a [[test]] in the proxy-trust-cli crate
//! so that CARGO_BIN_EXE_ptrust is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `ptrust` binary.
fn ptrust_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ptrust"))
}

fn run(args: &[&str]) -> Output {
    ptrust_binary()
        .args(args)
        .output()
        .expect("failed to execute ptrust")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

const TRUST_PROXY: &str = r#"{
    "kind": "trust_proxy",
    "interfaces": ["Echo"],
    "main": { "kind": "basic", "name": "echo", "interfaces": ["Echo"],
              "method_control": true, "trust_equivalence": true },
    "boot": { "kind": "basic", "name": "echo-boot", "method_control": true,
              "trust_equivalence": true, "verifier": { "trusted": ["echo-boot"] } }
}"#;

const UNTRUSTED_BOOT_PROXY: &str = r#"{
    "kind": "trust_proxy",
    "interfaces": ["Echo"],
    "main": { "kind": "basic", "name": "echo", "interfaces": ["Echo"],
              "method_control": true, "trust_equivalence": true },
    "boot": { "kind": "basic", "name": "echo-boot", "method_control": true,
              "trust_equivalence": true, "verifier": { "trusted": [] } }
}"#;

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn cli_responds_to_help() {
    let output = run(&["--help"]);
    assert!(
        output.status.success(),
        "ptrust --help should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let out = stdout(&output);
    assert!(
        out.contains("negotiate") && out.contains("verify"),
        "ptrust --help should list subcommands, got: {out}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("ptrust"));
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = run(&["--nonexistent-flag"]);
    assert!(!output.status.success());
}

#[test]
fn negotiate_selects_suite_with_most_preferences() {
    let dir = tempfile::tempdir().unwrap();
    let constraints = write(
        dir.path(),
        "constraints.json",
        r#"{
            "requirements": [{"integrity": "yes"}],
            "preferences": [{"confidentiality": "yes"}]
        }"#,
    );
    let output = run(&[
        "negotiate",
        "--suite",
        "TLS_RSA_WITH_NULL_SHA",
        "--suite",
        "TLS_RSA_WITH_AES_128_CBC_SHA",
        "--server",
        "CN=server",
        "--constraints",
        &constraints,
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let out = stdout(&output);
    assert!(out.contains("Selected: TLS_RSA_WITH_AES_128_CBC_SHA"), "got: {out}");
    assert!(out.contains("Integrity required:  yes"));
}

#[test]
fn negotiate_fails_when_nothing_supported() {
    // An authenticating suite without a server principal is never viable.
    let output = run(&["negotiate", "--suite", "TLS_RSA_WITH_AES_128_CBC_SHA"]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("Supported:           no"));
}

#[test]
fn verify_trusted_proxy() {
    let dir = tempfile::tempdir().unwrap();
    let proxy = write(dir.path(), "proxy.json", TRUST_PROXY);
    let output = run(&["verify", "--proxy", &proxy]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout(&output).contains("TRUSTED"));
}

#[test]
fn verify_untrusted_proxy_fails() {
    let dir = tempfile::tempdir().unwrap();
    let proxy = write(dir.path(), "proxy.json", UNTRUSTED_BOOT_PROXY);
    let output = run(&["verify", "--proxy", &proxy]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("NOT TRUSTED"));
}

#[test]
fn verify_rejects_invalid_pairing() {
    let dir = tempfile::tempdir().unwrap();
    let proxy = write(
        dir.path(),
        "proxy.json",
        r#"{
            "kind": "trust_proxy",
            "main": { "kind": "basic", "name": "m", "trust_equivalence": true },
            "boot": { "kind": "basic", "name": "b", "trust_equivalence": true }
        }"#,
    );
    let output = run(&["verify", "--proxy", &proxy]);
    assert!(!output.status.success());
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("invalid proxy descriptor"), "got: {err}");
}

#[test]
fn inspect_prints_fingerprints() {
    let dir = tempfile::tempdir().unwrap();
    let proxy = write(dir.path(), "proxy.json", TRUST_PROXY);
    let output = run(&["inspect", "--proxy", &proxy]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Proxy: Proxy[Echo,"), "got: {out}");
    assert!(out.contains("Main: BasicProxy[echo]"));
    assert!(out.contains("Boot: BasicProxy[echo-boot]"));
    assert_eq!(out.matches("Fingerprint:").count(), 2);
}

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ptrust.json");
    let path = path.to_string_lossy().into_owned();

    let output = run(&["config", "init", "--output", &path]);
    assert!(output.status.success());
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("\"max_examined\": 64"));

    let output = run(&["config", "init", "--output", &path]);
    assert!(!output.status.success());

    let output = run(&["config", "init", "--output", &path, "--force"]);
    assert!(output.status.success());

    let output = run(&["config", "show", "--config", &path]);
    assert!(stdout(&output).contains("max_examined:              64"));
}
