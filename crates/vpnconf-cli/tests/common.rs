#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use assert_cmd::assert::Assert;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub const OWNER_UID: &str = "4242";
pub const OTHER_UID: &str = "4343";

/// An isolated state/runtime directory pair plus a scratch area for
/// profile sources.
pub struct Sandbox {
    pub temp: TempDir,
}

impl Sandbox {
    pub fn new(prefix: &str) -> Self {
        let temp = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .expect("tempdir");
        for dir in ["state", "runtime", "src"] {
            fs::create_dir_all(temp.path().join(dir)).expect("create sandbox dir");
        }
        Self { temp }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.temp.path().join("state")
    }

    pub fn runtime_dir(&self) -> PathBuf {
        self.temp.path().join("runtime")
    }

    pub fn src(&self) -> PathBuf {
        self.temp.path().join("src")
    }

    pub fn write_source(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.src().join(name);
        fs::write(&path, contents).expect("write source");
        path
    }

    /// `vpnconf` running as the profile owner.
    pub fn cmd(&self) -> Command {
        self.cmd_as(OWNER_UID)
    }

    pub fn cmd_as(&self, uid: &str) -> Command {
        let mut cmd = cargo_bin_cmd!("vpnconf");
        cmd.env("VPNCONF_STATE_DIR", self.state_dir())
            .env("VPNCONF_RUNTIME_DIR", self.runtime_dir())
            .env("VPNCONF_CALLER_UID", uid)
            .env("NO_COLOR", "1")
            .env_remove("VPNCONF_MAX_PROFILE_SIZE")
            .env_remove("VPNCONF_MAX_LINE_SIZE");
        cmd
    }

    /// Imports `config` and returns the new configuration path.
    pub fn import(&self, config: &Path, extra: &[&str]) -> String {
        let mut args = vec!["--json", "config-import", "--config"];
        let config = config.to_str().expect("utf-8 path");
        args.push(config);
        args.extend_from_slice(extra);
        let assert = self.cmd().args(&args).assert().success();
        let payload = parse_json(&assert);
        payload["details"]["path"]
            .as_str()
            .expect("path in import details")
            .to_string()
    }
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn stdout(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).into_owned()
}

pub fn stderr(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stderr).into_owned()
}

pub const CLIENT_PROFILE: &str = "client\nremote vpn.example.com 1194\nca ca.crt\n";
pub const CA_PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";
