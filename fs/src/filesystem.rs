//! The top-level `FileSystem` handle: mount/unmount and every file
//! operation, each dispatched against the in-memory superblock, FAT and
//! root directory it owns.
//!
//! There is no global mutable state here, and no "already mounted" flag to
//! check: the single-mount invariant is realized by ownership instead —
//! you simply cannot call any of these methods without first holding a
//! `FileSystem` value, and that value only exists once `mount` has
//! already succeeded.

use crate::descriptor::DescriptorTable;
use crate::device::BlockDevice;
use crate::fat::Fat;
use crate::layout::{
    validate_filename, DirEntry, Superblock, BLOCK_SIZE, FAT_EOC, FS_FILE_MAX_COUNT,
    FS_OPEN_MAX_COUNT,
};
use crate::{FsError, Result};
use log::{debug, info, warn};

/// The mounted filesystem: owns the block device, the in-memory superblock,
/// FAT and root directory, and the open-file descriptor table.
pub struct FileSystem<D: BlockDevice> {
    device: D,
    superblock: Superblock,
    fat: Fat,
    root_dir: [DirEntry; FS_FILE_MAX_COUNT],
    descriptors: DescriptorTable,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Mount `device`. Reads the superblock from block 0, verifies its
    /// signature and block count, loads the FAT and root directory, and
    /// starts with every fd slot free.
    pub fn mount(mut device: D) -> Result<FileSystem<D>> {
        let mut block0 = [0u8; BLOCK_SIZE];
        device
            .read_block(0, &mut block0)
            .map_err(|e| FsError::Device(e.into()))?;
        let superblock = Superblock::from_bytes(&block0)?;

        if superblock.total_block_count != device.block_count() {
            warn!(
                "mount: superblock total_block_count ({}) does not match device block_count ({})",
                superblock.total_block_count,
                device.block_count()
            );
            return Err(FsError::CorruptImage);
        }

        let mut fat_blocks = Vec::with_capacity(superblock.fat_block_count as usize);
        for i in 0..superblock.fat_block_count as u16 {
            let mut block = [0u8; BLOCK_SIZE];
            device
                .read_block(1 + i, &mut block)
                .map_err(|e| FsError::Device(e.into()))?;
            fat_blocks.push(block);
        }
        let fat = Fat::from_blocks(&fat_blocks, superblock.data_block_count);

        let mut root_block = [0u8; BLOCK_SIZE];
        device
            .read_block(superblock.root_dir_block_index, &mut root_block)
            .map_err(|e| FsError::Device(e.into()))?;
        let mut root_dir = [DirEntry::free(); FS_FILE_MAX_COUNT];
        for (i, entry) in root_dir.iter_mut().enumerate() {
            *entry = DirEntry::from_bytes(&root_block[i * 32..(i + 1) * 32]);
        }

        info!(
            "mount: {} total blocks, {} data blocks, {} fat blocks",
            superblock.total_block_count, superblock.data_block_count, superblock.fat_block_count
        );

        Ok(FileSystem {
            device,
            superblock,
            fat,
            root_dir,
            descriptors: DescriptorTable::new(),
        })
    }

    /// Unmount: write the FAT and root directory back and drop the device.
    /// Fails if any file descriptor is still open. Data blocks need no
    /// flushing here — `write` flushes them synchronously.
    pub fn umount(mut self) -> Result<()> {
        if self.descriptors.has_open_descriptors() {
            warn!("umount: refused, descriptors still open");
            return Err(FsError::Busy);
        }
        let fat_blocks = self.fat.to_blocks(self.superblock.fat_block_count);
        for (i, block) in fat_blocks.iter().enumerate() {
            self.device
                .write_block(1 + i as u16, block)
                .map_err(|e| FsError::Device(e.into()))?;
        }
        let mut root_block = [0u8; BLOCK_SIZE];
        for (i, entry) in self.root_dir.iter().enumerate() {
            entry.write_to(&mut root_block[i * 32..(i + 1) * 32]);
        }
        self.device
            .write_block(self.superblock.root_dir_block_index, &root_block)
            .map_err(|e| FsError::Device(e.into()))?;
        info!("umount: flushed fat and root directory");
        Ok(())
    }

    /// Print layout and free-ratio information to stdout.
    pub fn info(&self) {
        println!("FS Info:");
        println!("total_blk_count={}", self.superblock.total_block_count);
        println!("fat_blk_count={}", self.superblock.fat_block_count);
        println!("rdir_blk={}", self.superblock.fat_block_count as u16 + 1);
        println!("data_blk={}", self.superblock.fat_block_count as u16 + 2);
        println!("data_blk_count={}", self.superblock.data_block_count);
        println!(
            "fat_free_ratio={}/{}",
            self.fat.free_count(),
            self.superblock.data_block_count
        );
        println!(
            "rdir_free_ratio={}/{}",
            self.root_dir.iter().filter(|e| e.is_free()).count(),
            FS_FILE_MAX_COUNT
        );
    }

    fn find_entry(&self, name: &[u8]) -> Option<usize> {
        self.root_dir.iter().position(|e| e.matches_name(name))
    }

    /// Create an empty file named `name`. Fails on a bad name, a duplicate
    /// name, or a full root directory.
    pub fn create(&mut self, name: &str) -> Result<()> {
        let name = validate_filename(name)?;
        if self.find_entry(name).is_some() {
            return Err(FsError::InvalidArgument);
        }
        let slot = self
            .root_dir
            .iter()
            .position(DirEntry::is_free)
            .ok_or(FsError::ResourceExhausted)?;
        self.root_dir[slot] = DirEntry::new_file(name);
        debug!("create: {:?} in slot {}", String::from_utf8_lossy(name), slot);
        Ok(())
    }

    /// Delete `name` and free its block chain. Fails on a bad name, a
    /// missing file, or an open file.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let name = validate_filename(name)?;
        let slot = self.find_entry(name).ok_or(FsError::NotFound)?;
        if self.descriptors.is_open(name) {
            return Err(FsError::Busy);
        }
        self.fat.free_chain(self.root_dir[slot].first_data_block);
        self.root_dir[slot] = DirEntry::free();
        debug!("delete: {:?}", String::from_utf8_lossy(name));
        Ok(())
    }

    /// Print every occupied directory entry, one per line, in the format
    /// `file: <name>, size: <n>, data_blk: <idx>`.
    pub fn ls(&self) {
        println!("FS Ls:");
        for entry in self.root_dir.iter().filter(|e| !e.is_free()) {
            println!(
                "file: {}, size: {}, data_blk: {}",
                entry.name_string(),
                entry.size,
                entry.first_data_block
            );
        }
    }

    /// Open `name`, returning a file descriptor. Fails on a bad name, a
    /// missing file, or a full descriptor table.
    pub fn open(&mut self, name: &str) -> Result<usize> {
        let name = validate_filename(name)?;
        if self.find_entry(name).is_none() {
            return Err(FsError::NotFound);
        }
        self.descriptors.open(name).ok_or(FsError::ResourceExhausted)
    }

    fn check_fd_range(fd: usize) -> Result<()> {
        if fd >= FS_OPEN_MAX_COUNT {
            Err(FsError::InvalidArgument)
        } else {
            Ok(())
        }
    }

    /// Close `fd`. Fails if `fd` is out of `[0, FS_OPEN_MAX_COUNT)` or the
    /// slot is already free.
    pub fn close(&mut self, fd: usize) -> Result<()> {
        Self::check_fd_range(fd)?;
        if self.descriptors.close(fd) {
            Ok(())
        } else {
            Err(FsError::NotFound)
        }
    }

    /// The size, in bytes, of the file bound to `fd`.
    pub fn stat(&self, fd: usize) -> Result<u32> {
        Self::check_fd_range(fd)?;
        let descriptor = self.descriptors.get(fd).ok_or(FsError::NotFound)?;
        let slot = self
            .find_entry(descriptor.name_bytes())
            .expect("open descriptor must name a live directory entry");
        Ok(self.root_dir[slot].size)
    }

    /// Set `fd`'s offset. Fails if `offset` is past the file's size
    /// (seeking to exactly `size` is allowed).
    pub fn lseek(&mut self, fd: usize, offset: u32) -> Result<()> {
        Self::check_fd_range(fd)?;
        let name = {
            let descriptor = self.descriptors.get(fd).ok_or(FsError::NotFound)?;
            descriptor.name_bytes().to_vec()
        };
        let slot = self
            .find_entry(&name)
            .expect("open descriptor must name a live directory entry");
        if offset > self.root_dir[slot].size {
            return Err(FsError::InvalidArgument);
        }
        self.descriptors.get_mut(fd).unwrap().offset = offset;
        Ok(())
    }

    /// Read up to `buf.len()` bytes from `fd` at its current offset,
    /// advancing the offset by the amount actually read. Reads are not
    /// capped at the file's `size` — see `DESIGN.md`.
    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize> {
        Self::check_fd_range(fd)?;
        let (name, mut offset) = {
            let descriptor = self.descriptors.get(fd).ok_or(FsError::NotFound)?;
            (descriptor.name_bytes().to_vec(), descriptor.offset)
        };
        let slot = self
            .find_entry(&name)
            .expect("open descriptor must name a live directory entry");
        let first_block = self.root_dir[slot].first_data_block;

        if first_block == FAT_EOC {
            return Ok(0);
        }

        let block_size = BLOCK_SIZE as u32;
        let mut curr = match self.fat.walk(first_block, offset / block_size) {
            Some(b) => b,
            None => return Ok(0),
        };

        let mut done = 0usize;
        let mut remaining = buf.len();
        while remaining > 0 {
            let in_block_off = (offset % block_size) as usize;
            let take = remaining.min(BLOCK_SIZE - in_block_off);

            let mut bounce = [0u8; BLOCK_SIZE];
            self.device
                .read_block(
                    curr + self.superblock.data_block_start_index,
                    &mut bounce,
                )
                .map_err(|e| FsError::Device(e.into()))?;
            buf[done..done + take].copy_from_slice(&bounce[in_block_off..in_block_off + take]);

            done += take;
            offset += take as u32;
            remaining -= take;

            if in_block_off + take == BLOCK_SIZE {
                match self.fat.get(curr) {
                    FAT_EOC => break,
                    next => curr = next,
                }
            }
        }

        self.descriptors.get_mut(fd).unwrap().offset = offset;
        Ok(done)
    }

    /// Write `buf` to `fd` at its current offset, allocating and linking
    /// new blocks on demand, advancing the offset by the amount actually
    /// written. A short count means the data region ran out of free
    /// blocks, not an error.
    pub fn write(&mut self, fd: usize, buf: &[u8]) -> Result<usize> {
        Self::check_fd_range(fd)?;
        let (name, mut offset) = {
            let descriptor = self.descriptors.get(fd).ok_or(FsError::NotFound)?;
            (descriptor.name_bytes().to_vec(), descriptor.offset)
        };
        if buf.is_empty() {
            return Ok(0);
        }
        let slot = self
            .find_entry(&name)
            .expect("open descriptor must name a live directory entry");

        let first_block = if self.root_dir[slot].first_data_block == FAT_EOC {
            match self.fat.allocate() {
                Some(b) => b,
                None => return Ok(0),
            }
        } else {
            self.root_dir[slot].first_data_block
        };

        let block_size = BLOCK_SIZE as u32;
        let mut curr = first_block;
        let mut hops = offset / block_size;
        while hops > 0 {
            curr = match self.fat.get(curr) {
                FAT_EOC => match self.fat.allocate() {
                    Some(next) => {
                        self.fat.link(curr, next);
                        next
                    }
                    None => {
                        return self.finish_write(slot, fd, first_block, offset, 0);
                    }
                },
                next => next,
            };
            hops -= 1;
        }

        let mut written = 0usize;
        loop {
            let in_block_off = (offset % block_size) as usize;
            let put = (buf.len() - written).min(BLOCK_SIZE - in_block_off);

            let mut bounce = [0u8; BLOCK_SIZE];
            let absolute = curr + self.superblock.data_block_start_index;
            if in_block_off != 0 || put != BLOCK_SIZE {
                self.device
                    .read_block(absolute, &mut bounce)
                    .map_err(|e| FsError::Device(e.into()))?;
            }
            bounce[in_block_off..in_block_off + put]
                .copy_from_slice(&buf[written..written + put]);
            self.device
                .write_block(absolute, &bounce)
                .map_err(|e| FsError::Device(e.into()))?;

            written += put;
            offset += put as u32;

            if written == buf.len() {
                break;
            }

            if in_block_off + put == BLOCK_SIZE {
                curr = match self.fat.get(curr) {
                    FAT_EOC => match self.fat.allocate() {
                        Some(next) => {
                            self.fat.link(curr, next);
                            next
                        }
                        None => break,
                    },
                    next => next,
                };
            }
        }

        self.finish_write(slot, fd, first_block, offset, written)
    }

    fn finish_write(
        &mut self,
        slot: usize,
        fd: usize,
        first_block: u16,
        offset: u32,
        written: usize,
    ) -> Result<usize> {
        if written > 0 {
            let entry = &mut self.root_dir[slot];
            entry.size = entry.size.max(offset);
            entry.first_data_block = first_block;
        }
        self.descriptors.get_mut(fd).unwrap().offset = offset;
        debug!("write: fd={} wrote {} bytes, new offset={}", fd, written, offset);
        Ok(written)
    }
}
