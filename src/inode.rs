/*
 * Copyright 2025 Luc Lenôtre
 *
 * This file is part of Maestro.
 *
 * Maestro is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * Maestro is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
 * A PARTICULAR PURPOSE. See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * Maestro. If not, see <https://www.gnu.org/licenses/>.
 */

//! Inode records, indirect blocks, and the inode number each file is identified by.

use std::fmt;

/// Number of direct block pointers stored inline in every inode.
pub const POINTERS_PER_INODE: usize = 5;

/// Size in bytes of an encoded [`RawInode`]: `valid` (4) + `size` (4) + five direct pointers
/// (4 each) + `indirect` (4).
pub const INODE_ENCODED_SIZE: usize = 4 + 4 + 4 * POINTERS_PER_INODE + 4;

/// Size in bytes of a single block pointer within an indirect block.
pub const POINTER_ENCODED_SIZE: usize = 4;

/// How many inodes fit in one inode-table block of `block_size` bytes.
pub const fn inodes_per_block(block_size: usize) -> usize {
    block_size / INODE_ENCODED_SIZE
}

/// How many block pointers fit in one indirect block of `block_size` bytes.
pub const fn pointers_per_block(block_size: usize) -> usize {
    block_size / POINTER_ENCODED_SIZE
}

/// Identifies a file within a mounted [`crate::fs::Filesystem`].
///
/// A thin wrapper around the raw slot index so that callers cannot accidentally pass a byte
/// offset, block index, or other unrelated `u32` where an inode number is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InodeNumber(pub u32);

impl fmt::Display for InodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for InodeNumber {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<InodeNumber> for u32 {
    fn from(value: InodeNumber) -> Self {
        value.0
    }
}

/// An inode: the fixed-size record describing one file's size and the blocks holding its data.
///
/// A zero-valued pointer slot (direct or indirect) means "no block". Block 0 is the
/// superblock and can therefore never legally appear as a data pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawInode {
    /// Whether this slot is allocated to a file.
    pub valid: bool,
    /// Size of the file in bytes.
    pub size: u32,
    /// Direct data block pointers, zero where unused.
    pub direct: [u32; POINTERS_PER_INODE],
    /// Pointer to this inode's indirect block, zero if the file needs none.
    pub indirect: u32,
}

impl RawInode {
    /// Encodes the inode as little-endian fields into `buf`.
    ///
    /// `buf` must be at least [`INODE_ENCODED_SIZE`] bytes long.
    pub fn encode(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&(self.valid as u32).to_le_bytes());
        buf[4..8].copy_from_slice(&self.size.to_le_bytes());
        for (i, ptr) in self.direct.iter().enumerate() {
            let off = 8 + i * 4;
            buf[off..off + 4].copy_from_slice(&ptr.to_le_bytes());
        }
        let indirect_off = 8 + POINTERS_PER_INODE * 4;
        buf[indirect_off..indirect_off + 4].copy_from_slice(&self.indirect.to_le_bytes());
    }

    /// Decodes an inode from `buf`.
    ///
    /// `buf` must be at least [`INODE_ENCODED_SIZE`] bytes long.
    pub fn decode(buf: &[u8]) -> Self {
        let valid = u32::from_le_bytes(buf[0..4].try_into().unwrap()) != 0;
        let size = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        let mut direct = [0u32; POINTERS_PER_INODE];
        for (i, ptr) in direct.iter_mut().enumerate() {
            let off = 8 + i * 4;
            *ptr = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
        }
        let indirect_off = 8 + POINTERS_PER_INODE * 4;
        let indirect = u32::from_le_bytes(buf[indirect_off..indirect_off + 4].try_into().unwrap());
        Self {
            valid,
            size,
            direct,
            indirect,
        }
    }

    /// Number of data blocks this inode's `size` spans, i.e. `ceil(size / block_size)`.
    pub fn blocks_in_use(&self, block_size: usize) -> usize {
        (self.size as usize).div_ceil(block_size)
    }
}

/// An indirect block: a data block whose entire contents are an array of block pointers.
pub struct IndirectBlock {
    pointers: Vec<u32>,
}

impl IndirectBlock {
    /// Builds an all-zero indirect block sized for `block_size`.
    pub fn zeroed(block_size: usize) -> Self {
        Self {
            pointers: vec![0; pointers_per_block(block_size)],
        }
    }

    /// Decodes an indirect block from `buf`, which must be exactly one block long.
    pub fn decode(buf: &[u8]) -> Self {
        let pointers = buf
            .chunks_exact(POINTER_ENCODED_SIZE)
            .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
            .collect();
        Self { pointers }
    }

    /// Encodes the indirect block into `buf`, which must be exactly one block long.
    pub fn encode(&self, buf: &mut [u8]) {
        for (i, ptr) in self.pointers.iter().enumerate() {
            let off = i * POINTER_ENCODED_SIZE;
            buf[off..off + POINTER_ENCODED_SIZE].copy_from_slice(&ptr.to_le_bytes());
        }
    }

    /// Returns the pointer at position `i`.
    pub fn get(&self, i: usize) -> u32 {
        self.pointers[i]
    }

    /// Sets the pointer at position `i`.
    pub fn set(&mut self, i: usize, block: u32) {
        self.pointers[i] = block;
    }

    /// Iterates over the non-zero pointers, in order.
    pub fn iter_non_zero(&self) -> impl Iterator<Item = u32> + '_ {
        self.pointers.iter().copied().filter(|&p| p != 0)
    }
}
