use std::fs;
use std::path::Path;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use tempfile::tempdir;
use vpnconf_domain::{MergeError, MergeLimits, OptionList};

use super::*;
use crate::core::effects::SystemFileSystem;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write fixture");
}

fn request(path: &Path) -> ImportRequest {
    ImportRequest {
        source: ProfileSource::File(path.to_path_buf()),
        name: "office".into(),
        single_use: false,
        persistent: false,
        mode: FollowMode::Full,
    }
}

fn text_request(text: &str, base: &Path) -> ImportRequest {
    ImportRequest {
        source: ProfileSource::Text {
            text: text.to_string(),
            base_path: base.to_path_buf(),
            origin: "inline profile".into(),
        },
        ..request(&base.join("unused.ovpn"))
    }
}

fn prepare(req: &ImportRequest) -> Result<PreparedProfile, MergeError> {
    ProfileImporter::new(&SystemFileSystem, MergeLimits::default()).prepare(req)
}

fn merge_text(text: &str, base: &Path, mode: FollowMode) -> Result<MergedProfile, MergeError> {
    ProfileMerge::merge_text(
        &SystemFileSystem,
        text,
        base,
        "inline profile",
        mode,
        MergeLimits::default(),
    )
}

#[test]
fn references_are_embedded_as_inline_blocks() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "ca.crt", "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n");
    write(dir.path(), "client.key", "KEYDATA");
    write(
        dir.path(),
        "client.ovpn",
        "# office\nclient\nremote vpn.example.com 1194\nca ca.crt\nkey client.key\n",
    );

    let prepared = prepare(&request(&dir.path().join("client.ovpn"))).expect("import");
    let content = &prepared.profile.content;
    assert!(content.starts_with("# office\nclient\n"));
    assert!(content.contains("<ca>\n-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n</ca>\n"));
    assert!(content.contains("<key>\nKEYDATA\n</key>\n"));
    assert!(!content.contains("ca ca.crt"));
    assert_eq!(prepared.embedded.len(), 2);

    let list = OptionList::parse(content, &MergeLimits::default()).expect("merged parses");
    assert_eq!(
        list.get("ca").and_then(|d| d.inline.as_deref()),
        Some("-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n")
    );
    assert!(list.contains("remote"));
}

#[test]
fn nested_includes_are_fully_embedded() {
    let dir = tempdir().expect("tempdir");
    let nested = dir.path().join("common");
    fs::create_dir(&nested).expect("mkdir");
    write(&nested, "ta.key", "TLSAUTH\n");
    write(&nested, "common.conf", "dev tun\ntls-auth ta.key 1\n");
    write(dir.path(), "client.ovpn", "client\nconfig common/common.conf\nremote x 1194\n");

    let prepared = prepare(&request(&dir.path().join("client.ovpn"))).expect("import");
    assert_eq!(
        prepared.profile.content,
        "client\ndev tun\n<tls-auth>\nTLSAUTH\n</tls-auth>\nkey-direction 1\nremote x 1194\n"
    );
    assert_eq!(prepared.embedded.len(), 2);
}

#[test]
fn missing_reference_fails_the_whole_import() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "client.ovpn", "client\nca missing.crt\n");

    let err = prepare(&request(&dir.path().join("client.ovpn"))).expect_err("missing file");
    match err {
        MergeError::UnresolvedReference { directive, file, .. } => {
            assert_eq!(directive, "ca");
            assert_eq!(file, "missing.crt");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn oversize_profiles_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let limits = MergeLimits {
        max_profile_size: 128,
        ..MergeLimits::default()
    };
    write(dir.path(), "big.crt", &"A\n".repeat(100));
    write(dir.path(), "client.ovpn", "client\nca big.crt\n");

    let err = ProfileImporter::new(&SystemFileSystem, limits)
        .prepare(&request(&dir.path().join("client.ovpn")))
        .expect_err("too large");
    assert_eq!(err.constraint(), "max_profile_size");
}

#[test]
fn long_lines_in_embedded_files_are_rejected() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "wide.crt", &"B".repeat(600));
    write(dir.path(), "client.ovpn", "ca wide.crt\n");

    let err = prepare(&request(&dir.path().join("client.ovpn"))).expect_err("long line");
    assert_eq!(err.constraint(), "max_line_size");
}

#[test]
fn include_cycles_are_detected() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "a.conf", "config b.conf\n");
    write(dir.path(), "b.conf", "config a.conf\n");

    let err = prepare(&request(&dir.path().join("a.conf"))).expect_err("cycle");
    assert!(matches!(err, MergeError::IncludeCycle { .. }), "{err:?}");
}

#[test]
fn include_depth_is_bounded() {
    let dir = tempdir().expect("tempdir");
    for level in 0..4 {
        write(
            dir.path(),
            &format!("l{level}.conf"),
            &format!("config l{}.conf\n", level + 1),
        );
    }
    write(dir.path(), "l4.conf", "client\n");
    let limits = MergeLimits {
        max_include_depth: 2,
        ..MergeLimits::default()
    };

    let err = ProfileImporter::new(&SystemFileSystem, limits)
        .prepare(&request(&dir.path().join("l0.conf")))
        .expect_err("too deep");
    assert_eq!(err.constraint(), "max_include_depth");
}

#[test]
fn partial_mode_keeps_references_inside_the_base() {
    let outer = tempdir().expect("tempdir");
    let base = outer.path().join("profile");
    fs::create_dir(&base).expect("mkdir");
    write(outer.path(), "secret.key", "SECRET\n");
    write(&base, "ok.crt", "OK\n");

    let merged = merge_text("ca ok.crt\n", &base, FollowMode::Partial).expect("inside base");
    assert!(merged.content.contains("<ca>\nOK\n</ca>"));

    let err = merge_text("key ../secret.key\n", &base, FollowMode::Partial).expect_err("escape");
    assert_eq!(err.constraint(), "follow_mode");

    let absolute = format!("key {}\n", base.join("ok.crt").display());
    let err = merge_text(&absolute, &base, FollowMode::Partial).expect_err("absolute");
    assert_eq!(err.constraint(), "follow_mode");

    let merged = merge_text("key ../secret.key\n", &base, FollowMode::Full).expect("full mode");
    assert!(merged.content.contains("<key>\nSECRET\n</key>"));
}

#[test]
fn conditional_directives_stay_as_written() {
    let dir = tempdir().expect("tempdir");
    let text = "dh none\ncrl-verify crls dir\nauth-user-pass\nhttp-proxy proxy 8080 auto\nca [inline]\n<ca>\nX\n</ca>\n";
    let merged = merge_text(text, dir.path(), FollowMode::Full).expect("no references");
    assert_eq!(merged.content, text);
    assert!(merged.embedded.is_empty());
}

#[test]
fn proxy_credentials_and_pkcs12_are_embedded() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "creds", "user\npass\n");
    let binary = vec![0_u8, 159, 146, 150, 255];
    fs::write(dir.path().join("client.p12"), &binary).expect("p12");

    let merged = merge_text(
        "http-proxy proxy.example.com 3128 creds basic\npkcs12 client.p12\n",
        dir.path(),
        FollowMode::Full,
    )
    .expect("merge");
    assert!(merged.content.starts_with(
        "http-proxy proxy.example.com 3128\n<http-proxy-user-pass>\nuser\npass\n</http-proxy-user-pass>\n"
    ));
    let encoded = BASE64_STANDARD.encode(&binary);
    assert!(merged.content.contains(&format!("<pkcs12>\n{encoded}\n</pkcs12>\n")));
}

#[test]
fn file_reference_without_argument_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let err = merge_text("client\nca\n", dir.path(), FollowMode::Full).expect_err("no file");
    assert!(matches!(err, MergeError::MissingFileArgument { ref directive } if directive == "ca"));
}

#[test]
fn persist_tun_is_detected_from_the_merged_text() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "on.ovpn", "client\npersist-tun\nremote x 1194\n");
    write(dir.path(), "off.ovpn", "client\nremote x 1194\n");

    let on = prepare(&request(&dir.path().join("on.ovpn"))).expect("import");
    assert!(on.profile.persist_tun);
    assert_eq!(on.profile.content, "client\npersist-tun\nremote x 1194\n");
    let off = prepare(&request(&dir.path().join("off.ovpn"))).expect("import");
    assert!(!off.profile.persist_tun);
}

#[test]
fn unparseable_profiles_import_without_persist_tun() {
    let dir = tempdir().expect("tempdir");
    write(
        dir.path(),
        "broken.ovpn",
        "client\npersist-tun\nsetenv NAME \"unterminated\n",
    );

    let prepared = prepare(&request(&dir.path().join("broken.ovpn"))).expect("import");
    assert!(!prepared.profile.persist_tun);
    let limits = MergeLimits::default();
    assert!(lookup_directive(&prepared.profile.content, PERSIST_TUN, &limits).is_err());
}

#[test]
fn single_use_persistent_imports_carry_a_warning() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "client.ovpn", "client\n");
    let mut req = request(&dir.path().join("client.ovpn"));
    req.single_use = true;
    req.persistent = true;

    let prepared = prepare(&req).expect("import");
    assert!(prepared.profile.single_use);
    assert!(prepared.profile.persistent);
    assert_eq!(prepared.warnings, [SINGLE_USE_PERSISTENT_WARNING]);

    req.persistent = false;
    assert!(prepare(&req).expect("import").warnings.is_empty());
}

#[test]
fn raw_text_without_trailing_newline_is_imported() {
    let dir = tempdir().expect("tempdir");
    let prepared = prepare(&text_request("client\npersist-tun\nremote x 1194", dir.path()))
        .expect("import");
    assert!(prepared.profile.persist_tun);
    assert_eq!(prepared.profile.content, "client\npersist-tun\nremote x 1194\n");
    assert!(prepared.embedded.is_empty());
}

#[test]
fn raw_text_references_resolve_against_the_base_path() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "ca.crt", "CADATA\n");

    let prepared =
        prepare(&text_request("client\nca ca.crt", dir.path())).expect("import");
    assert_eq!(prepared.profile.content, "client\n<ca>\nCADATA\n</ca>\n");
    assert_eq!(prepared.embedded, [dir.path().join("ca.crt").canonicalize().expect("canonical")]);

    let elsewhere = tempdir().expect("tempdir");
    let err = prepare(&text_request("client\nca ca.crt", elsewhere.path()))
        .expect_err("not under this base");
    assert_eq!(err.constraint(), "unresolved_reference");
}

#[test]
fn raw_text_over_the_size_limit_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let limits = MergeLimits {
        max_profile_size: 64,
        ..MergeLimits::default()
    };
    let text = "verb 3\n".repeat(20);

    let err = ProfileImporter::new(&SystemFileSystem, limits)
        .prepare(&text_request(text.trim_end(), dir.path()))
        .expect_err("too large");
    assert!(matches!(err, MergeError::ProfileTooLarge { .. }), "{err:?}");
    assert_eq!(err.constraint(), "max_profile_size");
}
