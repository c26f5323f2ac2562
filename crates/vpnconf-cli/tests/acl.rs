mod common;

use common::{parse_json, stderr, stdout, Sandbox, OTHER_UID};

fn imported(prefix: &str) -> (Sandbox, String) {
    let sandbox = Sandbox::new(prefix);
    let config = sandbox.write_source("plain.conf", "client\nremote vpn.example.com\n");
    let path = sandbox.import(&config, &["--persistent"]);
    (sandbox, path)
}

#[test]
fn grant_batch_with_an_unknown_user_is_a_partial_failure() {
    let (sandbox, path) = imported("vpnconf-acl-partial");

    let assert = sandbox
        .cmd()
        .args([
            "config-acl",
            "--path",
            &path,
            "--grant",
            "root",
            "--grant",
            "no-such-user-vpnconf",
        ])
        .assert()
        .code(3);
    let out = stdout(&assert);
    assert!(out.contains("Granted access to root (uid 0)"), "{out}");
    assert!(
        out.contains("** ERROR ** --grant no-such-user-vpnconf does not map to a valid user account"),
        "{out}"
    );
    assert!(stderr(&assert).contains("vpnconf config-acl: 1 request failed"));

    let assert = sandbox
        .cmd()
        .args(["--json", "config-acl", "--path", &path, "--show"])
        .assert()
        .success();
    let payload = parse_json(&assert);
    let acl = payload["details"]["show"]["acl"].as_array().expect("acl");
    assert_eq!(acl.len(), 1);
    assert_eq!(acl[0]["uid"], 0);
}

#[test]
fn granted_users_can_read_until_lock_down() {
    let (sandbox, path) = imported("vpnconf-acl-lockdown");
    sandbox
        .cmd()
        .args(["config-acl", "--path", &path, "--grant", "root"])
        .assert()
        .success();

    sandbox
        .cmd_as("0")
        .args(["config-show", "--path", &path])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["config-acl", "--path", &path, "--lock-down", "true"])
        .assert()
        .success();
    let assert = sandbox
        .cmd_as("0")
        .args(["--json", "config-show", "--path", &path])
        .assert()
        .code(1);
    assert_eq!(parse_json(&assert)["details"]["reason"], "content_restricted");

    let assert = sandbox
        .cmd_as(OTHER_UID)
        .args(["--json", "config-show", "--path", &path])
        .assert()
        .code(1);
    assert_eq!(parse_json(&assert)["details"]["reason"], "not_found");
}

#[test]
fn seal_waits_for_confirmation_and_then_freezes_the_acl() {
    let (sandbox, path) = imported("vpnconf-acl-seal");

    let assert = sandbox
        .cmd()
        .args(["config-acl", "--path", &path, "--seal"])
        .write_stdin("no\n")
        .assert()
        .success();
    assert!(stdout(&assert).contains("--seal operation has been cancelled"));

    let assert = sandbox
        .cmd()
        .args(["config-acl", "--path", &path, "--seal", "--show"])
        .write_stdin("YES\n")
        .assert()
        .success();
    let out = stdout(&assert);
    assert!(out.contains("Configuration has been sealed."), "{out}");
    assert!(out.contains("Read-only: yes"), "{out}");

    let assert = sandbox
        .cmd()
        .args(["--json", "config-acl", "--path", &path, "--public-access", "true"])
        .assert()
        .code(1);
    assert_eq!(parse_json(&assert)["details"]["reason"], "sealed");

    let assert = sandbox
        .cmd()
        .args(["--json", "config-acl", "--path", &path, "--seal", "--force"])
        .assert()
        .code(1);
    assert_eq!(parse_json(&assert)["details"]["reason"], "already_sealed");

    sandbox
        .cmd()
        .args(["config-manage", "--path", &path, "--rename", "still allowed"])
        .assert()
        .success();
}

#[test]
fn a_failing_step_reports_what_already_happened() {
    let (sandbox, path) = imported("vpnconf-acl-abort");
    sandbox
        .cmd()
        .args(["config-acl", "--path", &path, "--seal", "--force"])
        .assert()
        .success();

    let assert = sandbox
        .cmd()
        .args(["--json", "config-acl", "--path", &path, "--grant", "root", "--lock-down", "yes"])
        .assert()
        .code(1);
    let payload = parse_json(&assert);
    assert_eq!(payload["details"]["reason"], "sealed");
    assert!(payload["details"]["failures"]
        .as_array()
        .is_some_and(|failures| failures.len() == 1));
}

#[test]
fn only_the_owner_may_change_access() {
    let (sandbox, path) = imported("vpnconf-acl-owner");
    sandbox
        .cmd()
        .args(["config-acl", "--path", &path, "--public-access", "yes"])
        .assert()
        .success();

    let assert = sandbox
        .cmd_as(OTHER_UID)
        .args(["config-acl", "--path", &path, "--lock-down", "true"])
        .assert()
        .code(1);
    let err = stderr(&assert);
    assert!(err.contains("VC250"), "{err}");
    assert!(err.contains("Only the profile owner may do this."), "{err}");
}
