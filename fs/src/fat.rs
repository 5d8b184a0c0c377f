//! The File Allocation Table: allocation, chain walking and freeing.
//!
//! A flat, directly 16-bit-indexed chain of data blocks — simpler than a
//! FAT16/32 cluster chain, but the same allocate/link/walk/free shape.

use crate::layout::{BLOCK_SIZE, FAT_EOC, FAT_FREE};
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};

/// The in-memory File Allocation Table: a densely packed array of
/// `data_block_count` 16-bit next-pointers. Entry 0 is reserved and always
/// [`FAT_EOC`]; it is never handed out by [`Fat::allocate`].
#[derive(Debug, Clone)]
pub struct Fat {
    entries: Vec<u16>,
}

impl Fat {
    /// Parse the FAT out of `fat_block_count` consecutive 4096-byte blocks.
    pub fn from_blocks(blocks: &[[u8; BLOCK_SIZE]], data_block_count: u16) -> Fat {
        let mut entries = Vec::with_capacity(data_block_count as usize);
        for block in blocks {
            for chunk in block.chunks_exact(2) {
                if entries.len() == data_block_count as usize {
                    break;
                }
                entries.push(LittleEndian::read_u16(chunk));
            }
        }
        entries.resize(data_block_count as usize, FAT_FREE);
        entries[0] = FAT_EOC;
        Fat { entries }
    }

    /// Serialize the FAT back into `fat_block_count` 4096-byte blocks,
    /// zero-padding the tail of the last block.
    pub fn to_blocks(&self, fat_block_count: u8) -> Vec<[u8; BLOCK_SIZE]> {
        let mut blocks = vec![[0u8; BLOCK_SIZE]; fat_block_count as usize];
        for (i, &entry) in self.entries.iter().enumerate() {
            let block = i * 2 / BLOCK_SIZE;
            let offset = i * 2 % BLOCK_SIZE;
            LittleEndian::write_u16(&mut blocks[block][offset..offset + 2], entry);
        }
        blocks
    }

    /// Number of entries in the table (equal to `data_block_count`).
    pub fn len(&self) -> u16 {
        self.entries.len() as u16
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u16) -> u16 {
        self.entries[index as usize]
    }

    fn set(&mut self, index: u16, value: u16) {
        self.entries[index as usize] = value;
    }

    fn is_free(&self, index: u16) -> bool {
        self.entries[index as usize] == FAT_FREE
    }

    /// First-fit free-block search: the lowest index `>= 1` with a free
    /// entry. Marks the chosen entry `FAT_EOC` and returns it, or `None`
    /// if the data region is full.
    pub fn allocate(&mut self) -> Option<u16> {
        for index in 1..self.entries.len() as u16 {
            if self.is_free(index) {
                self.set(index, FAT_EOC);
                trace!("fat: allocated block {}", index);
                return Some(index);
            }
        }
        debug!("fat: no free blocks");
        None
    }

    /// Link `from -> to` (used when extending a chain during a write).
    pub fn link(&mut self, from: u16, to: u16) {
        self.set(from, to);
    }

    /// Walk `hops` links forward from `start`, returning the reached block
    /// index, or `None` if the chain ends (`FAT_EOC`) before `hops` hops
    /// are exhausted.
    pub fn walk(&self, start: u16, hops: u32) -> Option<u16> {
        let mut current = start;
        for _ in 0..hops {
            if current == FAT_EOC {
                return None;
            }
            current = self.get(current);
        }
        if current == FAT_EOC {
            None
        } else {
            Some(current)
        }
    }

    /// Free every block in the chain starting at `start`: read `next`,
    /// zero the current entry, advance.
    pub fn free_chain(&mut self, start: u16) {
        let mut current = start;
        while current != FAT_EOC {
            let next = self.get(current);
            self.set(current, FAT_FREE);
            current = next;
        }
    }

    /// Count of free entries, excluding the reserved entry 0 — used by
    /// `info` for the FAT free ratio.
    pub fn free_count(&self) -> usize {
        self.entries[1..].iter().filter(|&&e| e == FAT_FREE).count()
    }
}
