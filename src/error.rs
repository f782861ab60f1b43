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

//! Error type returned by every fallible operation in this crate.

use thiserror::Error;

/// Errors that can occur while formatting, mounting or operating on an [`crate::Filesystem`].
#[derive(Debug, Error)]
pub enum SfsError {
    /// The underlying block device returned an I/O error.
    #[error("block device I/O error")]
    Io(#[from] std::io::Error),
    /// The superblock's magic number, or one of its derived counts, does not match the
    /// invariants `blocks > 0`, `inode_blocks == ceil(blocks * 0.10)` and
    /// `inodes == inode_blocks * INODES_PER_BLOCK`.
    #[error("superblock is corrupt or was never formatted")]
    CorruptSuperblock,
    /// The device has fewer blocks than a filesystem requires to hold even an empty inode
    /// table, so no valid `inode_blocks` count can satisfy the superblock invariants.
    #[error("device is too small to hold a filesystem")]
    DeviceTooSmall,
    /// An inode number is out of the `[0, inodes)` range, or refers to a slot whose `valid`
    /// flag is unset.
    #[error("inode {0} is out of range or not allocated")]
    InvalidInode(u32),
    /// `offset` is strictly past the inode's current `size`; reads and writes may only start
    /// at or before the current end of file.
    #[error("offset {offset} is past the end of file (size {size})")]
    OffsetPastEnd {
        /// The offset the caller requested.
        offset: u32,
        /// The inode's current size.
        size: u32,
    },
    /// `create` found no inode-table slot with `valid == 0`.
    #[error("inode table is full")]
    NoFreeInode,
    /// The inode's `size` implies a block at this logical position, but the corresponding
    /// direct or indirect pointer is unset: the on-disk inode is internally inconsistent.
    #[error("inode {inumber} has no block at logical position {position}, but its size implies one")]
    MissingBlock {
        /// The inode being read.
        inumber: u32,
        /// The logical block index (0-based, direct region then indirect region) that turned
        /// out to be a null pointer.
        position: usize,
    },
}
