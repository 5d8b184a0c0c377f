//! Descriptor-table limits, mount/unmount resource rules, and the
//! create/delete/persist lifecycle.

mod common;

use common::{make_image, unique_path};
use ecs150fs::device::FileBlockDevice;
use ecs150fs::{FileSystem, FsError, FS_OPEN_MAX_COUNT};

#[test]
fn delete_is_the_inverse_of_create_for_an_empty_file() {
    let path = unique_path("delete_inverse");
    make_image(&path, 16);
    let pristine = std::fs::read(&path).unwrap();

    let device = FileBlockDevice::open(&path).unwrap();
    let mut fs = FileSystem::mount(device).unwrap();
    fs.create("ephemeral").unwrap();
    fs.delete("ephemeral").unwrap();
    fs.umount().unwrap();

    let after = std::fs::read(&path).unwrap();
    assert_eq!(pristine, after);

    std::fs::remove_file(&path).ok();
}

#[test]
fn open_exhausts_after_fs_open_max_count() {
    let path = unique_path("open_limit");
    make_image(&path, 16);
    let device = FileBlockDevice::open(&path).unwrap();
    let mut fs = FileSystem::mount(device).unwrap();

    for i in 0..FS_OPEN_MAX_COUNT {
        fs.create(&format!("f{}", i)).unwrap();
    }
    let mut fds = Vec::new();
    for i in 0..FS_OPEN_MAX_COUNT {
        fds.push(fs.open(&format!("f{}", i)).unwrap());
    }
    fs.create("overflow").unwrap();
    let err = fs.open("overflow").unwrap_err();
    assert!(matches!(err, FsError::ResourceExhausted));

    for fd in fds {
        fs.close(fd).unwrap();
    }
    fs.umount().unwrap();
    std::fs::remove_file(&path).ok();
}

#[test]
fn umount_rejects_open_descriptors() {
    let path = unique_path("umount_busy");
    make_image(&path, 16);
    let device = FileBlockDevice::open(&path).unwrap();
    let mut fs = FileSystem::mount(device).unwrap();

    fs.create("held").unwrap();
    let _fd = fs.open("held").unwrap();
    let err = fs.umount().unwrap_err();
    assert!(matches!(err, FsError::Busy));

    std::fs::remove_file(&path).ok();
}

#[test]
fn delete_rejects_an_open_file() {
    let path = unique_path("delete_busy");
    make_image(&path, 16);
    let device = FileBlockDevice::open(&path).unwrap();
    let mut fs = FileSystem::mount(device).unwrap();

    fs.create("held").unwrap();
    let fd = fs.open("held").unwrap();
    let err = fs.delete("held").unwrap_err();
    assert!(matches!(err, FsError::Busy));

    fs.close(fd).unwrap();
    fs.delete("held").unwrap();
    fs.umount().unwrap();
    std::fs::remove_file(&path).ok();
}

#[test]
fn opening_the_same_file_twice_yields_independent_offsets() {
    let path = unique_path("independent_fds");
    make_image(&path, 16);
    let device = FileBlockDevice::open(&path).unwrap();
    let mut fs = FileSystem::mount(device).unwrap();

    fs.create("shared").unwrap();
    let fd_a = fs.open("shared").unwrap();
    let fd_b = fs.open("shared").unwrap();
    assert_ne!(fd_a, fd_b);

    fs.write(fd_a, b"0123456789").unwrap();
    fs.lseek(fd_a, 2).unwrap();
    fs.lseek(fd_b, 5).unwrap();

    let mut byte_a = [0u8; 1];
    let mut byte_b = [0u8; 1];
    fs.read(fd_a, &mut byte_a).unwrap();
    fs.read(fd_b, &mut byte_b).unwrap();
    assert_eq!(byte_a[0], b'2');
    assert_eq!(byte_b[0], b'5');

    fs.close(fd_a).unwrap();
    fs.close(fd_b).unwrap();
    fs.umount().unwrap();
    std::fs::remove_file(&path).ok();
}

#[test]
fn fd_out_of_range_is_rejected_everywhere() {
    let path = unique_path("fd_range");
    make_image(&path, 16);
    let device = FileBlockDevice::open(&path).unwrap();
    let mut fs = FileSystem::mount(device).unwrap();

    assert!(matches!(
        fs.close(FS_OPEN_MAX_COUNT).unwrap_err(),
        FsError::InvalidArgument
    ));
    assert!(matches!(
        fs.stat(FS_OPEN_MAX_COUNT).unwrap_err(),
        FsError::InvalidArgument
    ));
    assert!(matches!(
        fs.lseek(FS_OPEN_MAX_COUNT, 0).unwrap_err(),
        FsError::InvalidArgument
    ));

    fs.umount().unwrap();
    std::fs::remove_file(&path).ok();
}

#[test]
fn write_survives_a_close_umount_remount_cycle() {
    let path = unique_path("persistence");
    make_image(&path, 16);

    let device = FileBlockDevice::open(&path).unwrap();
    let mut fs = FileSystem::mount(device).unwrap();
    fs.create("durable").unwrap();
    let fd = fs.open("durable").unwrap();
    fs.write(fd, b"still here").unwrap();
    fs.close(fd).unwrap();
    fs.umount().unwrap();

    let device = FileBlockDevice::open(&path).unwrap();
    let mut fs = FileSystem::mount(device).unwrap();
    let fd = fs.open("durable").unwrap();
    assert_eq!(fs.stat(fd).unwrap(), 10);
    let mut buf = [0u8; 10];
    fs.read(fd, &mut buf).unwrap();
    assert_eq!(&buf, b"still here");
    fs.close(fd).unwrap();
    fs.umount().unwrap();

    std::fs::remove_file(&path).ok();
}
