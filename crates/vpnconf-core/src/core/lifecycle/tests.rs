use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::{tempdir, TempDir};
use vpnconf_domain::{MergeError, MergeLimits, Principal, ProfileError};

use super::*;
use crate::core::confirm::AlwaysAffirm;
use crate::core::effects::SystemFileSystem;
use crate::core::identity::StaticIdentities;
use crate::core::import::{FollowMode, ProfileSource};
use crate::core::service::LocalConfigService;

const OWNER: Principal = Principal::new(1000);
const ALICE: Principal = Principal::new(1001);
const CAROL: Principal = Principal::new(1003);

struct Fixture {
    dir: TempDir,
    service: LocalConfigService,
    identities: StaticIdentities,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempdir().expect("tempdir"),
            service: LocalConfigService::in_memory(),
            identities: StaticIdentities::new([("owner", 1000), ("alice", 1001), ("carol", 1003)]),
        }
    }

    fn as_user(&self, caller: Principal) -> ConfigLifecycle<'_> {
        ConfigLifecycle::new(&self.service, &self.identities, caller)
    }

    fn owner(&self) -> ConfigLifecycle<'_> {
        self.as_user(OWNER)
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(&path, contents).expect("write");
        path
    }

    fn import(&self, contents: &str) -> ProfilePath {
        let file = self.write("client.ovpn", contents);
        self.import_file(&file, MergeLimits::default())
            .expect("import")
            .path
    }

    fn import_file(&self, file: &Path, limits: MergeLimits) -> Result<ImportReport, ProfileError> {
        self.owner().import(&SystemFileSystem, limits, &request(file))
    }
}

fn request(file: &Path) -> ImportRequest {
    ImportRequest {
        source: ProfileSource::File(file.to_path_buf()),
        name: "office".into(),
        single_use: false,
        persistent: false,
        mode: FollowMode::Full,
    }
}

/// Answers every prompt the same way and counts how often it was asked.
struct Scripted {
    answer: Confirmation,
    asked: AtomicUsize,
}

impl Scripted {
    fn new(answer: Confirmation) -> Self {
        Self {
            answer,
            asked: AtomicUsize::new(0),
        }
    }

    fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl Confirmer for Scripted {
    fn confirm(&self, _request: &ConfirmRequest<'_>) -> Confirmation {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

#[test]
fn import_records_flags_and_persist_tun() {
    let fx = Fixture::new();
    let path = fx.import("client\npersist-tun\nremote x 1194\n");

    let props = fx.owner().properties(path).expect("props");
    assert!(props.persist_tun);
    assert!(!props.sealed);
    assert!(!props.public_access);
    assert!(!props.locked_down);
    assert!(props.acl.is_empty());
    assert_eq!(props.owner, OWNER);
    assert_eq!(props.name, "office");
    assert_eq!(
        fx.owner().content(path).expect("content"),
        "client\npersist-tun\nremote x 1194\n"
    );
}

#[test]
fn persist_tun_absent_or_unparseable_is_false() {
    let fx = Fixture::new();
    let plain = fx.import("client\nremote x 1194\n");
    assert!(!fx.owner().properties(plain).expect("props").persist_tun);

    let broken = fx.import("client\npersist-tun\n<ca>\nnever closed\n");
    assert!(!fx.owner().properties(broken).expect("props").persist_tun);
}

#[test]
fn oversize_import_registers_nothing() {
    let fx = Fixture::new();
    let file = fx.write("big.ovpn", &format!("client\nsetenv X {}\n", "y".repeat(400)));
    let limits = MergeLimits {
        max_profile_size: 256,
        ..MergeLimits::default()
    };

    let err = fx.import_file(&file, limits).expect_err("too large");
    assert!(matches!(err, ProfileError::Merge(MergeError::ProfileTooLarge { .. })));
    assert!(fx.service.is_empty());
}

#[test]
fn nested_references_are_embedded_on_import() {
    let fx = Fixture::new();
    fx.write("pki/ca.crt", "CA\n");
    fx.write("pki/common.conf", "ca ca.crt\nverb 3\n");
    let file = fx.write("client.ovpn", "client\nconfig pki/common.conf\n");

    let report = fx.import_file(&file, MergeLimits::default()).expect("import");
    assert_eq!(report.embedded.len(), 2);
    let content = fx.owner().content(report.path).expect("content");
    assert_eq!(content, "client\n<ca>\nCA\n</ca>\nverb 3\n");
}

#[test]
fn grant_allows_reading_until_revoked() {
    let fx = Fixture::new();
    let path = fx.import("client\n");
    let owner = fx.owner();

    assert!(!owner.can_read(path, "alice").expect("check"));
    let report = owner.grant(path, &["alice"]);
    assert!(!report.is_partial_failure());
    assert!(owner.can_read(path, "alice").expect("check"));
    assert_eq!(fx.as_user(ALICE).content(path).expect("granted"), "client\n");

    owner.revoke(path, &["alice"]);
    assert!(!owner.can_read(path, "alice").expect("check"));
    assert!(matches!(
        fx.as_user(ALICE).content(path),
        Err(ProfileError::NotFound { .. })
    ));
}

#[test]
fn granting_twice_is_idempotent() {
    let fx = Fixture::new();
    let path = fx.import("client\n");
    let first = fx.owner().grant(path, &["alice"]);
    let second = fx.owner().grant(path, &["alice"]);
    assert_eq!(first.items[0].result, Ok(true));
    assert_eq!(second.items[0].result, Ok(false));
    assert_eq!(fx.owner().properties(path).expect("props").acl, [ALICE]);
}

#[test]
fn batch_grant_isolates_failures() {
    let fx = Fixture::new();
    let path = fx.import("client\n");

    let report = fx.owner().grant(path, &["alice", "no-such-user", "carol"]);
    assert!(report.is_partial_failure());
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.items[1].result,
        Err(ProfileError::InvalidIdentity(ref raw)) if raw == "no-such-user"
    ));
    assert_eq!(report.items[2].display_name.as_deref(), Some("carol"));
    assert_eq!(fx.owner().properties(path).expect("props").acl, [ALICE, CAROL]);
}

#[test]
fn numeric_identities_fall_back_to_uids() {
    let fx = Fixture::new();
    let path = fx.import("client\n");
    let report = fx.owner().grant(path, &["4242"]);
    assert_eq!(report.items[0].principal, Some(Principal::new(4242)));
    assert_eq!(report.items[0].display_name.as_deref(), Some("(unknown)"));
}

#[test]
fn sealed_profiles_refuse_acl_changes() {
    let fx = Fixture::new();
    let path = fx.import("client\n");
    fx.owner().grant(path, &["alice"]);
    assert_eq!(
        fx.owner().seal(path, &AlwaysAffirm).expect("seal"),
        Confirmation::Affirmed
    );

    let report = fx.owner().grant(path, &["carol"]);
    assert!(matches!(report.items[0].result, Err(ProfileError::Sealed { .. })));
    let props = fx.owner().properties(path).expect("props");
    assert!(props.sealed);
    assert_eq!(props.acl, [ALICE]);
    assert!(matches!(
        fx.owner().set_public_access(path, true),
        Err(ProfileError::Sealed { .. })
    ));
    assert!(matches!(
        fx.owner().set_persist_tun(path, true),
        Err(ProfileError::Sealed { .. })
    ));
    fx.owner().rename(path, "archived").expect("name stays mutable");
}

#[test]
fn cancelled_seal_changes_nothing() {
    let fx = Fixture::new();
    let path = fx.import("client\n");
    let declining = Scripted::new(Confirmation::Cancelled);

    let answer = fx.owner().seal(path, &declining).expect("seal");
    assert_eq!(answer, Confirmation::Cancelled);
    assert_eq!(declining.asked(), 1);
    assert!(!fx.owner().properties(path).expect("props").sealed);
}

#[test]
fn doomed_seals_fail_before_prompting() {
    let fx = Fixture::new();
    let path = fx.import("client\n");
    fx.owner().grant(path, &["alice"]);
    let prompt = Scripted::new(Confirmation::Affirmed);

    let err = fx.as_user(ALICE).seal(path, &prompt).expect_err("not owner");
    assert!(matches!(err, ProfileError::Unauthorized { .. }));
    fx.owner().seal(path, &prompt).expect("seal");
    let err = fx.owner().seal(path, &prompt).expect_err("already sealed");
    assert!(matches!(err, ProfileError::AlreadySealed { .. }));
    assert_eq!(prompt.asked(), 1);
}

#[test]
fn removal_is_confirmed_and_works_on_sealed_profiles() {
    let fx = Fixture::new();
    let path = fx.import("client\n");
    fx.owner().seal(path, &AlwaysAffirm).expect("seal");

    let declining = Scripted::new(Confirmation::Cancelled);
    assert_eq!(
        fx.owner().remove(path, &declining).expect("remove"),
        Confirmation::Cancelled
    );
    assert_eq!(fx.owner().list().expect("list").len(), 1);

    assert_eq!(
        fx.owner().remove(path, &AlwaysAffirm).expect("remove"),
        Confirmation::Affirmed
    );
    assert!(fx.owner().list().expect("list").is_empty());
    assert!(matches!(
        fx.owner().properties(path),
        Err(ProfileError::NotFound { .. })
    ));
}

#[test]
fn lock_down_blocks_content_but_keeps_sessions_working() {
    let fx = Fixture::new();
    let path = fx.import("client\n");
    fx.owner().grant(path, &["alice"]);
    fx.owner().set_locked_down(path, true).expect("lock down");

    let alice = fx.as_user(ALICE);
    assert!(matches!(
        alice.content(path),
        Err(ProfileError::ContentRestricted { .. })
    ));
    assert_eq!(alice.list().expect("list").len(), 1);
    let delivery = alice.deliver_to_session(path).expect("deliver");
    assert_eq!(delivery.content, "client\n");
    assert_eq!(fx.owner().properties(path).expect("props").used_count, 1);
}

#[test]
fn alias_can_be_set_and_deleted() {
    let fx = Fixture::new();
    let path = fx.import("client\n");
    fx.owner().set_alias(path, "work").expect("alias");
    assert_eq!(
        fx.owner().properties(path).expect("props").alias.as_deref(),
        Some("work")
    );
    fx.owner().delete_alias(path).expect("delete alias");
    assert_eq!(fx.owner().properties(path).expect("props").alias, None);
}
