//! Mount a fresh image and check the layout numbers it reports.

mod common;

use common::{make_image, unique_path};
use ecs150fs::device::FileBlockDevice;
use ecs150fs::FileSystem;

#[test]
fn fresh_mount_reports_full_free_ratios() {
    let _ = env_logger::builder().is_test(true).try_init();
    let path = unique_path("mount_info");
    let data_block_count = make_image(&path, 8192);
    assert_eq!(data_block_count, 8186);

    let device = FileBlockDevice::open(&path).unwrap();
    let fs = FileSystem::mount(device).unwrap();
    fs.info();
    fs.ls();
    fs.umount().unwrap();

    std::fs::remove_file(&path).ok();
}

#[test]
fn mount_rejects_a_non_fs_image() {
    let path = unique_path("mount_garbage");
    std::fs::write(&path, vec![0u8; 4096 * 4]).unwrap();

    let device = FileBlockDevice::open(&path).unwrap();
    let err = FileSystem::mount(device).unwrap_err();
    assert!(matches!(err, ecs150fs::FsError::CorruptImage));

    std::fs::remove_file(&path).ok();
}
