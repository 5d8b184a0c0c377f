//! `mkfs` — creates a zeroed virtual-disk image with a valid superblock,
//! an empty FAT and an empty root directory.

use ecs150fs::device::{BlockDevice, FileBlockDevice};
use ecs150fs::fat::Fat;
use ecs150fs::layout::{DirEntry, Superblock, BLOCK_SIZE, DIR_ENTRY_SIZE, FS_FILE_MAX_COUNT};
use std::env;

/// Work out `fat_block_count` for a given `total_block_count` by fixpoint
/// iteration: the FAT must be big enough to hold one 16-bit entry per data
/// block, and the data block count itself shrinks as the FAT grows.
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

fn main() {
    env_logger::init();

    let args = env::args().collect::<Vec<_>>();
    if args.len() != 3 {
        eprintln!("Usage: {} <diskname> <total_block_count>", args[0]);
        std::process::exit(1);
    }

    let diskname = &args[1];
    let total_block_count: u16 = args[2].parse().expect("total_block_count must fit in a u16");
    assert!(
        total_block_count > 3,
        "need room for at least a superblock, one FAT block and a root directory block"
    );

    let fat_block_count = fat_block_count_for(total_block_count);
    let root_dir_block_index = fat_block_count as u16 + 1;
    let data_block_start_index = fat_block_count as u16 + 2;
    let data_block_count = total_block_count - data_block_start_index;

    let mut device = FileBlockDevice::create(diskname, total_block_count)
        .expect("failed to create disk image");

    let superblock = Superblock {
        total_block_count,
        root_dir_block_index,
        data_block_start_index,
        data_block_count,
        fat_block_count,
    };
    device
        .write_block(0, &superblock.to_bytes())
        .expect("failed to write superblock");

    let zeroed = vec![[0u8; BLOCK_SIZE]; fat_block_count as usize];
    let fat = Fat::from_blocks(&zeroed, data_block_count);
    for (i, block) in fat.to_blocks(fat_block_count).iter().enumerate() {
        device
            .write_block(1 + i as u16, block)
            .expect("failed to write FAT block");
    }

    let mut root_block = [0u8; BLOCK_SIZE];
    for slot in 0..FS_FILE_MAX_COUNT {
        let start = slot * DIR_ENTRY_SIZE;
        DirEntry::free().write_to(&mut root_block[start..start + DIR_ENTRY_SIZE]);
    }
    device
        .write_block(root_dir_block_index, &root_block)
        .expect("failed to write root directory");

    println!(
        "created {} ({} blocks total, {} FAT blocks, {} data blocks)",
        diskname, total_block_count, fat_block_count, data_block_count
    );
}
