//! The block device adapter.
//!
//! The core filesystem never touches a host file directly; it only ever
//! reads and writes whole, fixed-size blocks through [`BlockDevice`]. The
//! one implementation the workspace ships, [`FileBlockDevice`], backs
//! that trait with a host file.

use crate::layout::BLOCK_SIZE;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Reads and writes fixed-size blocks, indexed from 0, on some backing
/// store. Block size is always [`BLOCK_SIZE`] bytes.
pub trait BlockDevice {
    /// The error type this device's I/O can fail with.
    type Error: std::error::Error + Into<io::Error>;

    /// Total number of addressable blocks on this device.
    fn block_count(&self) -> u16;

    /// Read block `index` into `buf`. `index` must be `< block_count()`.
    fn read_block(&mut self, index: u16, buf: &mut [u8; BLOCK_SIZE]) -> Result<(), Self::Error>;

    /// Write `buf` to block `index`. `index` must be `< block_count()`.
    fn write_block(&mut self, index: u16, buf: &[u8; BLOCK_SIZE]) -> Result<(), Self::Error>;
}

/// A [`BlockDevice`] backed by a single host-side file, opened once and
/// addressed by `block_index * BLOCK_SIZE` byte offsets.
pub struct FileBlockDevice {
    file: File,
    block_count: u16,
}

impl FileBlockDevice {
    /// Open an existing image file and determine its block count from its
    /// length. Fails if the file's length is not an exact multiple of
    /// [`BLOCK_SIZE`], or if it does not fit in a `u16` block count.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        if len % BLOCK_SIZE as u64 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "image length is not a multiple of the block size",
            ));
        }
        let block_count = len / BLOCK_SIZE as u64;
        let block_count = u16::try_from(block_count)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "image has too many blocks"))?;
        Ok(FileBlockDevice { file, block_count })
    }

    /// Create a new, zero-filled image of `block_count` blocks at `path`,
    /// truncating any existing file, and open it.
    pub fn create(path: impl AsRef<Path>, block_count: u16) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(block_count as u64 * BLOCK_SIZE as u64)?;
        Ok(FileBlockDevice { file, block_count })
    }

    fn seek_to(&mut self, index: u16) -> io::Result<()> {
        self.file
            .seek(SeekFrom::Start(index as u64 * BLOCK_SIZE as u64))?;
        Ok(())
    }
}

impl BlockDevice for FileBlockDevice {
    type Error = io::Error;

    fn block_count(&self) -> u16 {
        self.block_count
    }

    fn read_block(&mut self, index: u16, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()> {
        self.seek_to(index)?;
        self.file.read_exact(buf)
    }

    fn write_block(&mut self, index: u16, buf: &[u8; BLOCK_SIZE]) -> io::Result<()> {
        self.seek_to(index)?;
        self.file.write_all(buf)?;
        self.file.flush()
    }
}
