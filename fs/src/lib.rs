//! `ecs150fs` — a small, user-space FAT-style block filesystem.
//!
//! The library mounts a fixed-size virtual disk (a host file treated as a
//! contiguous array of 4096-byte blocks) and exposes a POSIX-like file API
//! on top of it: `mount`, `create`, `delete`, `ls`, `open`, `close`, `stat`,
//! `lseek`, `read` and `write`. There is no concurrency, no permissions, no
//! subdirectories (the root is flat) and no journaling — see
//! [`FileSystem`] for the entry point.

pub mod descriptor;
pub mod device;
pub mod fat;
pub mod filesystem;
pub mod layout;

pub use descriptor::FileDescriptor;
pub use device::{BlockDevice, FileBlockDevice};
pub use filesystem::FileSystem;
pub use layout::{BLOCK_SIZE, FS_FILENAME_LEN, FS_FILE_MAX_COUNT, FS_OPEN_MAX_COUNT};

use std::fmt;

/// The error type for every `ecs150fs` operation.
///
/// Every fallible API surfaces one of these variants instead of the
/// `-1`/short-count convention of the original C implementation; a short
/// read or write on exhaustion is still reported as `Ok(n)` with `n` less
/// than requested, never as an `Err`.
#[derive(Debug)]
pub enum FsError {
    /// An operation other than `mount` was attempted with no image mounted.
    NotMounted,
    /// `mount` was called while an image was already mounted.
    AlreadyMounted,
    /// A null/empty filename, an over-length filename, an out-of-range fd,
    /// a null buffer, or a seek target past end of file.
    InvalidArgument,
    /// The named file does not exist, or the given fd slot is free.
    NotFound,
    /// The root directory is full (`create`) or the FD table is full
    /// (`open`).
    ResourceExhausted,
    /// `delete` was attempted on an open file, or `umount` with open fds.
    Busy,
    /// The block device reported an I/O error.
    Device(std::io::Error),
    /// The image signature is wrong, or the superblock's block count does
    /// not match the device's.
    CorruptImage,
}

/// The result type for `ecs150fs`.
pub type Result<T> = std::result::Result<T, FsError>;

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FsError::NotMounted => write!(f, "no filesystem is mounted"),
            FsError::AlreadyMounted => write!(f, "a filesystem is already mounted"),
            FsError::InvalidArgument => write!(f, "invalid argument"),
            FsError::NotFound => write!(f, "no such file or descriptor"),
            FsError::ResourceExhausted => write!(f, "directory or descriptor table is full"),
            FsError::Busy => write!(f, "file is open"),
            FsError::Device(e) => write!(f, "block device error: {}", e),
            FsError::CorruptImage => write!(f, "corrupt or incompatible image"),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::Device(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FsError {
    fn from(e: std::io::Error) -> Self {
        FsError::Device(e)
    }
}
