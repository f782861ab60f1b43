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

//! The block device contract the filesystem is built on.
//!
//! The filesystem never opens, sizes or locks a device itself; it is handed one that already
//! knows its own block count and can read and write whole blocks. [`Filesystem::mount`] takes
//! ownership of the device for the lifetime of the mount, which is what makes "already mounted"
//! a property the type system enforces rather than a flag the device has to track.
//!
//! [`Filesystem::mount`]: crate::fs::Filesystem::mount

use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;

/// A fixed-size-block random-access device.
///
/// Implementors only need to move bytes in and out of numbered blocks; everything about
/// superblocks, inodes and bitmaps lives above this trait.
pub trait BlockDevice {
    /// Size of a block in bytes, identical for every block on the device.
    const BLOCK_SIZE: usize;

    /// Total number of addressable blocks on the device.
    fn block_count(&self) -> usize;

    /// Reads block `index` into `buf`.
    ///
    /// `buf` must be exactly [`Self::BLOCK_SIZE`] bytes long.
    fn read_block(&mut self, index: usize, buf: &mut [u8]) -> io::Result<()>;

    /// Writes `buf` to block `index`.
    ///
    /// `buf` must be exactly [`Self::BLOCK_SIZE`] bytes long.
    fn write_block(&mut self, index: usize, buf: &[u8]) -> io::Result<()>;
}

/// A [`BlockDevice`] backed by a regular file (or a block/char device node), addressed by
/// seeking to `index * BLOCK_SIZE` the way `mkfs`'s ext2 factory addresses the superblock and
/// block group descriptor table.
pub struct FileBlockDevice {
    file: File,
    block_count: usize,
}

/// Block size used by every [`FileBlockDevice`].
const FILE_BLOCK_SIZE: usize = 4096;

impl FileBlockDevice {
    /// Opens `path` for reading and writing and treats it as a device of `block_count` blocks
    /// of [`BlockDevice::BLOCK_SIZE`] bytes each.
    ///
    /// The file is not created, truncated or extended; the caller is responsible for making
    /// sure it is at least `block_count * BLOCK_SIZE` bytes long (a plain file will grow to
    /// that length lazily as blocks past its current end are written, the same way a sparse
    /// disk image does).
    pub fn open<P: AsRef<Path>>(path: P, block_count: usize) -> io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;
        Ok(Self { file, block_count })
    }
}

impl BlockDevice for FileBlockDevice {
    const BLOCK_SIZE: usize = FILE_BLOCK_SIZE;

    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&mut self, index: usize, buf: &mut [u8]) -> io::Result<()> {
        debug_assert_eq!(buf.len(), FILE_BLOCK_SIZE);
        self.file
            .seek(SeekFrom::Start((index * FILE_BLOCK_SIZE) as u64))?;
        self.file.read_exact(buf)
    }

    fn write_block(&mut self, index: usize, buf: &[u8]) -> io::Result<()> {
        debug_assert_eq!(buf.len(), FILE_BLOCK_SIZE);
        self.file
            .seek(SeekFrom::Start((index * FILE_BLOCK_SIZE) as u64))?;
        self.file.write_all(buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn writes_and_reads_land_on_the_right_block() {
        let path = std::env::temp_dir().join(format!("sfs-device-test-{}", std::process::id()));
        {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .open(&path)
                .unwrap();
            file.set_len((4 * FILE_BLOCK_SIZE) as u64).unwrap();
        }

        let mut device = FileBlockDevice::open(&path, 4).unwrap();
        assert_eq!(device.block_count(), 4);

        let mut zero = vec![0u8; FILE_BLOCK_SIZE];
        let mut ones = vec![0xffu8; FILE_BLOCK_SIZE];
        device.write_block(0, &zero).unwrap();
        device.write_block(1, &ones).unwrap();

        device.read_block(0, &mut zero).unwrap();
        assert!(zero.iter().all(|&b| b == 0));
        device.read_block(1, &mut ones).unwrap();
        assert!(ones.iter().all(|&b| b == 0xff));

        std::fs::remove_file(&path).unwrap();
    }
}
