//! `PermissionsIntegrityChecker`, the optional file-integrity checker.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;

use ike_plugin_core::{IntegrityChecker, PermissionsIntegrityChecker};
use tempfile::tempdir;

#[test]
fn accepts_a_normally_permissioned_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("libstrongswan-random.so");
    fs::write(&path, b"").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

    let checker = PermissionsIntegrityChecker;
    assert!(checker.check_file("random", &path));
}

#[test]
fn rejects_a_world_writable_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("libstrongswan-random.so");
    fs::write(&path, b"").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o646)).unwrap();

    let checker = PermissionsIntegrityChecker;
    assert!(!checker.check_file("random", &path));
}

#[test]
fn missing_file_fails_the_check() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("does-not-exist.so");

    let checker = PermissionsIntegrityChecker;
    assert!(!checker.check_file("random", &path));
}
