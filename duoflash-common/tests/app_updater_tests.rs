// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Application slot updater against a two-slot OTA platform.

mod common;

use common::{app_image, SimOta, FLASH_SECTOR, OTA_1};
use duoflash_common::app::HEADER_PROBE_LEN;
use duoflash_common::{
    AppUpdater, ImageState, ImageVersion, UpdateError, UpdateWriter, Validation,
};

#[test]
fn test_image_version_parsing() {
    let image = app_image("1.2.3", HEADER_PROBE_LEN);
    let version = ImageVersion::from_image(&image).unwrap();
    assert_eq!(version.as_str(), "1.2.3");
    assert_eq!(ImageVersion::from_image(&image[..HEADER_PROBE_LEN - 1]), None);
}

#[test]
fn test_update_commits_boot_partition() {
    let image = app_image("2.0.0", 2 * FLASH_SECTOR as usize + 500);
    let mut app = AppUpdater::new(SimOta::new("1.0.0"));

    let mut session = app.begin().unwrap();
    assert_eq!(session.partition(), &OTA_1);
    for chunk in image.chunks(1024) {
        app.write(&mut session, chunk).unwrap();
    }
    assert!(session.is_writing());
    app.end(&mut session).unwrap();

    let ota = app.platform();
    assert_eq!(ota.boot, 1);
    assert_eq!(ota.ended, 1);
    assert_eq!(&ota.images[1][..image.len()], &image[..]);
    assert_eq!(ota.versions[1].map(|v| v.as_str().to_owned()), Some("2.0.0".into()));
}

#[test]
fn test_final_unit_zero_padded() {
    let image = app_image("2.0.0", FLASH_SECTOR as usize + 300);
    let mut app = AppUpdater::new(SimOta::new("1.0.0"));

    let mut session = app.begin().unwrap();
    app.write(&mut session, &image).unwrap();
    app.end(&mut session).unwrap();

    let ota = app.platform();
    assert_eq!(ota.write_calls, [FLASH_SECTOR as usize, FLASH_SECTOR as usize]);
    assert!(ota.images[1][image.len()..].iter().all(|&b| b == 0));
}

#[test]
fn test_short_header_then_retry() {
    let image = app_image("2.0.0", 1024);
    let mut app = AppUpdater::new(SimOta::new("1.0.0"));

    let mut session = app.begin().unwrap();
    assert_eq!(
        app.write(&mut session, &image[..HEADER_PROBE_LEN - 1]),
        Err(UpdateError::HeaderTooShort)
    );
    app.abort(&mut session);
    assert_eq!(app.platform().begun, 0);

    let mut retry = app.begin().unwrap();
    app.write(&mut retry, &image).unwrap();
    app.end(&mut retry).unwrap();
    assert_eq!(app.platform().boot, 1);
}

#[test]
fn test_same_version_is_no_change() {
    let image = app_image("1.0.0", 1024);
    let mut app = AppUpdater::new(SimOta::new("1.0.0"));

    let mut session = app.begin().unwrap();
    assert_eq!(app.write(&mut session, &image), Err(UpdateError::NoChange));
    app.abort(&mut session);

    let ota = app.platform();
    assert_eq!(ota.begun, 0);
    assert_eq!(ota.written_bytes(), 0);
    assert_eq!(ota.aborted, 0);
    assert_eq!(ota.boot, 0);
}

#[test]
fn test_known_bad_version_rejected() {
    let image = app_image("1.5.0", 1024);
    let mut ota = SimOta::new("1.0.0");
    ota.versions[1] = Some(ImageVersion::from_bytes(b"1.5.0"));
    ota.last_invalid = Some(1);
    let mut app = AppUpdater::new(ota);

    let mut session = app.begin().unwrap();
    assert_eq!(app.write(&mut session, &image), Err(UpdateError::KnownBadVersion));
    assert_eq!(app.platform().written_bytes(), 0);
}

#[test]
fn test_no_update_partition() {
    let mut ota = SimOta::new("1.0.0");
    ota.has_update_slot = false;
    let mut app = AppUpdater::new(ota);
    assert_eq!(app.begin().err(), Some(UpdateError::NoUpdatePartition));
}

#[test]
fn test_boot_partition_failure_is_retryable() {
    let image = app_image("2.0.0", 1024);
    let mut ota = SimOta::new("1.0.0");
    ota.fail_set_boot = 1;
    let mut app = AppUpdater::new(ota);

    let mut session = app.begin().unwrap();
    app.write(&mut session, &image).unwrap();
    assert_eq!(app.end(&mut session), Err(UpdateError::BootPartitionNotSet));
    assert_eq!(app.platform().ended, 1);
    assert_eq!(app.platform().boot, 0);

    app.end(&mut session).unwrap();
    assert_eq!(app.platform().ended, 1);
    assert_eq!(app.platform().boot, 1);
}

#[test]
fn test_end_without_writes_is_noop() {
    let mut app = AppUpdater::new(SimOta::new("1.0.0"));
    let mut session = app.begin().unwrap();
    assert_eq!(app.end(&mut session), Ok(()));
    assert_eq!(app.platform().ended, 0);
    assert_eq!(app.platform().boot, 0);
}

#[test]
fn test_abort_releases_handle() {
    let image = app_image("2.0.0", 1024);
    let mut app = AppUpdater::new(SimOta::new("1.0.0"));

    let mut session = app.begin().unwrap();
    app.write(&mut session, &image).unwrap();
    app.abort(&mut session);
    assert_eq!(app.platform().aborted, 1);
    assert_eq!(app.platform().boot, 0);
    assert_eq!(app.write(&mut session, &image), Err(UpdateError::SessionClosed));
}

#[test]
fn test_validate_pending_image() {
    let mut ota = SimOta::new("1.0.0");
    ota.state = Some(ImageState::PendingVerify);
    let mut app = AppUpdater::new(ota);
    assert_eq!(app.validate(true), Validation::Confirmed);
    assert!(app.platform().marked_valid);

    app.platform_mut().state = Some(ImageState::PendingVerify);
    assert_eq!(app.validate(false), Validation::RolledBack);
    assert!(app.platform().rolled_back);
}

#[test]
fn test_validate_not_pending() {
    let mut app = AppUpdater::new(SimOta::new("1.0.0"));
    assert_eq!(app.validate(false), Validation::NotPending);
    assert!(!app.platform().rolled_back);
}
