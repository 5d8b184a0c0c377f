//! Shared image-building helper for the integration tests below, grounded
//! on the same layout math `mkfs` uses.

use ecs150fs::device::{BlockDevice, FileBlockDevice};
use ecs150fs::fat::Fat;
use ecs150fs::layout::{DirEntry, Superblock, BLOCK_SIZE, DIR_ENTRY_SIZE, FS_FILE_MAX_COUNT};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// A scratch path under the OS temp directory, unique per test process and
/// call, so parallel test runs never collide on the same image file.
pub fn unique_path(tag: &str) -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut path = std::env::temp_dir();
    path.push(format!("ecs150fs_test_{}_{}_{}.img", std::process::id(), tag, n));
    path
}

fn fat_block_count_for(total_block_count: u16) -> u8 {
    let mut fat_block_count: u32 = 1;
    loop {
        let data_block_count = total_block_count as u32 - 2 - fat_block_count;
        let needed = (data_block_count * 2 + BLOCK_SIZE as u32 - 1) / BLOCK_SIZE as u32;
        if needed == fat_block_count {
            return fat_block_count as u8;
        }
        fat_block_count = needed;
    }
}

/// Lay out a fresh, empty `total_block_count`-block image at `path`.
/// Returns the data block count so callers can size scenarios around it.
pub fn make_image(path: &Path, total_block_count: u16) -> u16 {
    let fat_block_count = fat_block_count_for(total_block_count);
    let root_dir_block_index = fat_block_count as u16 + 1;
    let data_block_start_index = fat_block_count as u16 + 2;
    let data_block_count = total_block_count - data_block_start_index;

    let mut device = FileBlockDevice::create(path, total_block_count).unwrap();
    let superblock = Superblock {
        total_block_count,
        root_dir_block_index,
        data_block_start_index,
        data_block_count,
        fat_block_count,
    };
    device.write_block(0, &superblock.to_bytes()).unwrap();

    let zeroed = vec![[0u8; BLOCK_SIZE]; fat_block_count as usize];
    let fat = Fat::from_blocks(&zeroed, data_block_count);
    for (i, block) in fat.to_blocks(fat_block_count).iter().enumerate() {
        device.write_block(1 + i as u16, block).unwrap();
    }

    let mut root_block = [0u8; BLOCK_SIZE];
    for slot in 0..FS_FILE_MAX_COUNT {
        let start = slot * DIR_ENTRY_SIZE;
        DirEntry::free().write_to(&mut root_block[start..start + DIR_ENTRY_SIZE]);
    }
    device.write_block(root_dir_block_index, &root_block).unwrap();

    data_block_count
}
