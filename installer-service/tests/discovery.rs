// SPDX-License-Identifier: GPL-3.0-only

mod common;

use common::{DISK_SIZE, Lab, config};
use installer_contracts::InstallErrorKind;
use installer_service::{discover, plan_layout};
use installer_testing::{PartedDisk, Reply};
use installer_types::{ByteRange, DiskRef, LEADING_RESERVED_END};

const INSTALL: &str = "recovery:\n  type: installer-only\nconfigs:\n  boot_size: 100\n";

fn label(lab: &Lab, name: &str, device: &str) {
    lab.runner
        .reply(&format!("findfs LABEL={name}"), Reply::ok(format!("{device}\n")));
}

fn no_label(lab: &Lab, name: &str) {
    lab.runner.reply(
        &format!("findfs LABEL={name}"),
        Reply::fail(1, format!("findfs: unable to resolve 'LABEL={name}'")),
    );
}

#[tokio::test]
async fn discovers_source_target_and_existing_partitions() {
    let lab = Lab::new();
    label(&lab, "recovery", "/dev/sda1");
    label(&lab, "system-boot", "/dev/sdb1");
    no_label(&lab, "swap");
    label(&lab, "writable", "/dev/sdb2");
    lab.tables(&[PartedDisk::new("/dev/sdb", DISK_SIZE)
        .partition(1, 20_971_521, 125_829_121, "fat32", "system-boot")
        .partition(2, 125_829_122, 32_017_030_655, "ext4", "writable")]);

    let parts = discover(&lab.host(), &config(INSTALL), "recovery")
        .await
        .unwrap();

    assert_eq!(parts.source, Some(DiskRef::from_path("/dev/sda")));
    assert_eq!(parts.target, Some(DiskRef::from_path("/dev/sdb")));
    assert_eq!(parts.recovery_nr, Some(1));
    assert_eq!(parts.sysboot_nr, Some(1));
    assert_eq!(parts.swap_nr, None);
    assert_eq!(parts.writable_nr, Some(2));
    assert_eq!(parts.last_part_nr, Some(2));
    assert_eq!(parts.target_size, Some(DISK_SIZE));
    // recovery lives on another disk, so its range stays the reserved region
    assert_eq!(parts.recovery.end, LEADING_RESERVED_END);
}

#[tokio::test]
async fn system_boot_on_source_is_ignored() {
    let lab = Lab::new();
    label(&lab, "recovery", "/dev/sda1");
    label(&lab, "system-boot", "/dev/sda2");
    no_label(&lab, "swap");
    no_label(&lab, "writable");

    let parts = discover(&lab.host(), &config(INSTALL), "recovery")
        .await
        .unwrap();
    assert_eq!(parts.sysboot_nr, None);
}

#[tokio::test]
async fn unknown_recovery_label_is_not_found() {
    let lab = Lab::new();
    no_label(&lab, "NOPE");

    let err = discover(&lab.host(), &config(INSTALL), "NOPE")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), InstallErrorKind::NotFound);
    assert_eq!(lab.runner.calls(), vec!["findfs LABEL=NOPE".to_string()]);
    assert!(lab.mounter.events().is_empty());
}

#[tokio::test]
async fn same_disk_reads_back_recovery_and_plans_after_it() {
    let lab = Lab::new();
    label(&lab, "recovery", "/dev/sda1");
    no_label(&lab, "system-boot");
    no_label(&lab, "swap");
    no_label(&lab, "writable");
    lab.runner.reply(
        "parted -ms /dev/sda unit B print",
        Reply::ok(
            PartedDisk::new("/dev/sda", DISK_SIZE)
                .partition(1, 1_048_576, 20_971_520, "fat32", "recovery")
                .render(),
        ),
    );
    let cfg = config(
        "recovery:\n  type: factory-copy\n  recovery_device: /dev/sda\nconfigs:\n  boot_size: 100\n",
    );

    let parts = discover(&lab.host(), &cfg, "recovery").await.unwrap();
    assert!(parts.same_disk());
    assert_eq!(parts.recovery, ByteRange::new(1_048_576, 20_971_520));

    let parts = plan_layout(parts, &cfg).unwrap();
    assert_eq!(parts.sysboot, Some(ByteRange::new(20_971_521, 125_829_121)));
}

#[tokio::test]
async fn no_other_disk_is_not_found() {
    let lab = Lab::new();
    lab.tree.remove("/sys/block/sdb/dev");
    lab.tree.remove("/sys/block/sdb");
    label(&lab, "recovery", "/dev/sda1");

    let err = discover(&lab.host(), &config(INSTALL), "recovery")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), InstallErrorKind::NotFound);
}
