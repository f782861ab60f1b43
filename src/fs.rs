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

//! Formatting, mounting, and the inode-table / file I/O operations that make up the bulk of
//! this crate.

use crate::bitmap::Bitmap;
use crate::device::BlockDevice;
use crate::error::SfsError;
use crate::inode::InodeNumber;
use crate::inode::RawInode;
use crate::inode::IndirectBlock;
use crate::inode::INODE_ENCODED_SIZE;
use crate::inode::POINTERS_PER_INODE;
use crate::inode::inodes_per_block;
use crate::inode::pointers_per_block;
use crate::superblock::Superblock;

/// Initializes a fresh, empty filesystem on `device`.
///
/// Writes a superblock sized for the device's full block count (`inode_blocks =
/// ceil(block_count * 0.10)`), then zero-fills every remaining block so that every inode-table
/// slot reads `valid = 0`. Block 0 is left holding the superblock that was just written, not
/// re-zeroed afterwards.
pub fn format<D: BlockDevice>(device: &mut D) -> Result<(), SfsError> {
    let blocks = device.block_count();
    if blocks == 0 {
        return Err(SfsError::DeviceTooSmall);
    }
    let inodes_per_block = inodes_per_block(D::BLOCK_SIZE) as u32;
    let superblock = Superblock::for_blocks(blocks as u32, inodes_per_block);
    if blocks <= superblock.inode_blocks {
        return Err(SfsError::DeviceTooSmall);
    }

    let mut block_buf = vec![0u8; D::BLOCK_SIZE];
    superblock.encode(&mut block_buf);
    device.write_block(0, &block_buf)?;

    block_buf.fill(0);
    for i in 1..blocks {
        device.write_block(i, &block_buf)?;
    }
    Ok(())
}

/// A mounted filesystem: an exclusive handle to a [`BlockDevice`] plus the free-block bitmap
/// reconstructed from it.
///
/// `Filesystem<D>` owns `D` for as long as the mount lasts, which is what makes "mounting an
/// already-mounted device" impossible to express rather than a runtime check: the only way to
/// get `D` back is [`Filesystem::unmount`], which consumes `self`.
pub struct Filesystem<D: BlockDevice> {
    device: D,
    inode_blocks: usize,
    inodes: usize,
    inodes_per_block: usize,
    pointers_per_block: usize,
    bitmap: Bitmap,
}

impl<D: BlockDevice> Filesystem<D> {
    /// Validates `device`'s superblock and reconstructs the free-block bitmap from its inode
    /// table.
    ///
    /// Every invariant from the data model is checked: the magic number, a non-zero block
    /// count, and `inode_blocks` / `inodes` consistent with that block count. Any violation
    /// returns [`SfsError::CorruptSuperblock`] and `device` is dropped without being touched
    /// further.
    pub fn mount(mut device: D) -> Result<Self, SfsError> {
        let mut block_buf = vec![0u8; D::BLOCK_SIZE];
        device.read_block(0, &mut block_buf)?;
        let superblock = Superblock::decode(&block_buf);

        let inodes_per_block = inodes_per_block(D::BLOCK_SIZE);
        if !superblock.is_valid(inodes_per_block as u32) {
            return Err(SfsError::CorruptSuperblock);
        }

        let blocks = superblock.blocks as usize;
        let inode_blocks = superblock.inode_blocks as usize;
        let inodes = superblock.inodes as usize;
        let pointers_per_block = pointers_per_block(D::BLOCK_SIZE);

        let mut bitmap = Bitmap::new_all_free(blocks);
        bitmap.mark_used(0);
        for i in 0..inode_blocks {
            bitmap.mark_used(1 + i);
        }

        for inode_block in 0..inode_blocks {
            device.read_block(1 + inode_block, &mut block_buf)?;
            for slot in 0..inodes_per_block {
                let off = slot * INODE_ENCODED_SIZE;
                let node = RawInode::decode(&block_buf[off..off + INODE_ENCODED_SIZE]);
                if !node.valid {
                    continue;
                }
                let n_blocks = node.blocks_in_use(D::BLOCK_SIZE);
                for pointer in node.direct.iter().take(n_blocks.min(POINTERS_PER_INODE)) {
                    if *pointer != 0 {
                        bitmap.mark_used(*pointer as usize);
                    }
                }
                if n_blocks > POINTERS_PER_INODE {
                    bitmap.mark_used(node.indirect as usize);
                    let mut indirect_buf = vec![0u8; D::BLOCK_SIZE];
                    device.read_block(node.indirect as usize, &mut indirect_buf)?;
                    let indirect = IndirectBlock::decode(&indirect_buf);
                    for i in 0..(n_blocks - POINTERS_PER_INODE) {
                        let pointer = indirect.get(i);
                        if pointer != 0 {
                            bitmap.mark_used(pointer as usize);
                        }
                    }
                }
            }
        }

        Ok(Self {
            device,
            inode_blocks,
            inodes,
            inodes_per_block,
            pointers_per_block,
            bitmap,
        })
    }

    /// Releases the mount and returns the underlying device.
    pub fn unmount(self) -> D {
        self.device
    }

    /// The largest file size this layout can represent: `B * (POINTERS_PER_INODE +
    /// POINTERS_PER_BLOCK)`.
    pub fn max_file_size(&self) -> usize {
        D::BLOCK_SIZE * (POINTERS_PER_INODE + self.pointers_per_block)
    }

    /// (block index, slot within block) for inode number `inumber`.
    fn inode_address(&self, inumber: u32) -> (usize, usize) {
        let inumber = inumber as usize;
        (1 + inumber / self.inodes_per_block, inumber % self.inodes_per_block)
    }

    /// Reads inode `inumber`'s on-disk record.
    fn load_inode(&mut self, inumber: InodeNumber) -> Result<RawInode, SfsError> {
        if inumber.0 as usize >= self.inodes {
            return Err(SfsError::InvalidInode(inumber.0));
        }
        let (block, slot) = self.inode_address(inumber.0);
        let mut buf = vec![0u8; D::BLOCK_SIZE];
        self.device.read_block(block, &mut buf)?;
        let off = slot * INODE_ENCODED_SIZE;
        Ok(RawInode::decode(&buf[off..off + INODE_ENCODED_SIZE]))
    }

    /// Persists `inode` as inode number `inumber`, read-modify-writing its inode-table block.
    fn save_inode(&mut self, inumber: InodeNumber, inode: &RawInode) -> Result<(), SfsError> {
        if inumber.0 as usize >= self.inodes {
            return Err(SfsError::InvalidInode(inumber.0));
        }
        let (block, slot) = self.inode_address(inumber.0);
        let mut buf = vec![0u8; D::BLOCK_SIZE];
        self.device.read_block(block, &mut buf)?;
        let off = slot * INODE_ENCODED_SIZE;
        inode.encode(&mut buf[off..off + INODE_ENCODED_SIZE]);
        self.device.write_block(block, &buf)?;
        Ok(())
    }

    /// Scans the bitmap for the lowest free block, marks it used, zeroes its on-disk contents
    /// and returns it. Worst case O(block count): the bitmap is rebuilt from scratch at every
    /// mount, so there is nothing a free-list would save.
    fn allocate_free_block(&mut self) -> Result<Option<u32>, SfsError> {
        let Some(index) = self.bitmap.allocate_first_free() else {
            return Ok(None);
        };
        let zero = vec![0u8; D::BLOCK_SIZE];
        self.device.write_block(index, &zero)?;
        Ok(Some(index as u32))
    }

    /// Allocates an inode, scanning the table in ascending `(block, slot)` order for the first
    /// slot with `valid == 0`.
    pub fn create(&mut self) -> Result<InodeNumber, SfsError> {
        let mut buf = vec![0u8; D::BLOCK_SIZE];
        for inode_block in 0..self.inode_blocks {
            self.device.read_block(1 + inode_block, &mut buf)?;
            for slot in 0..self.inodes_per_block {
                let off = slot * INODE_ENCODED_SIZE;
                let existing = RawInode::decode(&buf[off..off + INODE_ENCODED_SIZE]);
                if existing.valid {
                    continue;
                }
                let fresh = RawInode {
                    valid: true,
                    size: 0,
                    direct: [0; POINTERS_PER_INODE],
                    indirect: 0,
                };
                fresh.encode(&mut buf[off..off + INODE_ENCODED_SIZE]);
                self.device.write_block(1 + inode_block, &buf)?;
                return Ok(InodeNumber((inode_block * self.inodes_per_block + slot) as u32));
            }
        }
        Err(SfsError::NoFreeInode)
    }

    /// Frees inode `inumber`'s direct and indirect blocks and clears its record.
    pub fn remove(&mut self, inumber: InodeNumber) -> Result<(), SfsError> {
        let mut inode = self.load_inode(inumber)?;
        if !inode.valid {
            return Err(SfsError::InvalidInode(inumber.0));
        }

        for pointer in inode.direct.iter_mut() {
            if *pointer != 0 {
                self.bitmap.mark_free(*pointer as usize);
                *pointer = 0;
            }
        }
        if inode.indirect != 0 {
            let mut buf = vec![0u8; D::BLOCK_SIZE];
            self.device.read_block(inode.indirect as usize, &mut buf)?;
            let indirect = IndirectBlock::decode(&buf);
            for pointer in indirect.iter_non_zero() {
                self.bitmap.mark_free(pointer as usize);
            }
            self.bitmap.mark_free(inode.indirect as usize);
        }

        inode.indirect = 0;
        inode.valid = false;
        inode.size = 0;
        self.save_inode(inumber, &inode)
    }

    /// Returns inode `inumber`'s size in bytes.
    pub fn stat(&mut self, inumber: InodeNumber) -> Result<u32, SfsError> {
        let inode = self.load_inode(inumber)?;
        if !inode.valid {
            return Err(SfsError::InvalidInode(inumber.0));
        }
        Ok(inode.size)
    }

    /// Reads up to `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// The read is clamped to the file's current size; reading exactly at end-of-file returns
    /// `Ok(0)`, and `offset` past the current size fails with [`SfsError::OffsetPastEnd`].
    pub fn read(
        &mut self,
        inumber: InodeNumber,
        buf: &mut [u8],
        offset: u32,
    ) -> Result<usize, SfsError> {
        let inode = self.load_inode(inumber)?;
        if !inode.valid {
            return Err(SfsError::InvalidInode(inumber.0));
        }
        if offset > inode.size {
            return Err(SfsError::OffsetPastEnd {
                offset,
                size: inode.size,
            });
        }

        let length = buf.len().min((inode.size - offset) as usize);
        if length == 0 {
            return Ok(0);
        }

        let block_size = D::BLOCK_SIZE;
        let mut indirect: Option<IndirectBlock> = None;
        let mut block_buf = vec![0u8; block_size];
        let mut copied = 0usize;
        let mut block_num = offset as usize / block_size;

        while copied < length {
            let data_block = if block_num < POINTERS_PER_INODE {
                inode.direct[block_num]
            } else {
                if indirect.is_none() {
                    if inode.indirect == 0 {
                        return Err(SfsError::MissingBlock {
                            inumber: inumber.0,
                            position: block_num,
                        });
                    }
                    let mut ibuf = vec![0u8; block_size];
                    self.device.read_block(inode.indirect as usize, &mut ibuf)?;
                    indirect = Some(IndirectBlock::decode(&ibuf));
                }
                indirect.as_ref().unwrap().get(block_num - POINTERS_PER_INODE)
            };
            if data_block == 0 {
                return Err(SfsError::MissingBlock {
                    inumber: inumber.0,
                    position: block_num,
                });
            }

            self.device.read_block(data_block as usize, &mut block_buf)?;
            let (read_offset, read_len) = if copied == 0 {
                let read_offset = offset as usize % block_size;
                (read_offset, (block_size - read_offset).min(length))
            } else {
                (0, block_size.min(length - copied))
            };
            buf[copied..copied + read_len]
                .copy_from_slice(&block_buf[read_offset..read_offset + read_len]);
            copied += read_len;
            block_num += 1;
        }

        Ok(copied)
    }

    /// Writes `buf` starting at `offset`, allocating direct and indirect blocks on demand.
    ///
    /// Writing past the current size extends it (appending); `offset > size` fails since
    /// writes may not create holes. The write is clamped to [`Self::max_file_size`]. If the
    /// device runs out of free blocks partway through, the bytes written so far are persisted
    /// and the short count is returned; this is not an error.
    pub fn write(
        &mut self,
        inumber: InodeNumber,
        buf: &[u8],
        offset: u32,
    ) -> Result<usize, SfsError> {
        let mut inode = self.load_inode(inumber)?;
        if offset > inode.size {
            return Err(SfsError::OffsetPastEnd {
                offset,
                size: inode.size,
            });
        }

        let max_file_size = self.max_file_size();
        let length = buf.len().min(max_file_size - offset as usize);

        let block_size = D::BLOCK_SIZE;
        let mut indirect: Option<IndirectBlock> = None;
        let mut modified_inode = false;
        let mut modified_indirect = false;

        let mut written = 0usize;
        let mut block_num = offset as usize / block_size;
        let last_block = POINTERS_PER_INODE + self.pointers_per_block;

        while written < length && block_num < last_block {
            let block_to_write = if block_num < POINTERS_PER_INODE {
                if inode.direct[block_num] == 0 {
                    let Some(allocated) = self.allocate_free_block()? else {
                        break;
                    };
                    inode.direct[block_num] = allocated;
                    modified_inode = true;
                }
                inode.direct[block_num]
            } else {
                if inode.indirect == 0 {
                    let Some(allocated) = self.allocate_free_block()? else {
                        break;
                    };
                    inode.indirect = allocated;
                    modified_indirect = true;
                }
                if indirect.is_none() {
                    let mut ibuf = vec![0u8; block_size];
                    self.device.read_block(inode.indirect as usize, &mut ibuf)?;
                    indirect = Some(IndirectBlock::decode(&ibuf));
                }
                let slot = block_num - POINTERS_PER_INODE;
                let indirect = indirect.as_mut().unwrap();
                if indirect.get(slot) == 0 {
                    let Some(allocated) = self.allocate_free_block()? else {
                        break;
                    };
                    indirect.set(slot, allocated);
                    modified_indirect = true;
                }
                indirect.get(slot)
            };

            let (write_offset, write_len) = if written == 0 {
                let write_offset = offset as usize % block_size;
                (write_offset, (block_size - write_offset).min(length))
            } else {
                (0, block_size.min(length - written))
            };

            let mut scratch = vec![0u8; block_size];
            if write_len < block_size {
                self.device.read_block(block_to_write as usize, &mut scratch)?;
            }
            scratch[write_offset..write_offset + write_len]
                .copy_from_slice(&buf[written..written + write_len]);
            self.device.write_block(block_to_write as usize, &scratch)?;

            written += write_len;
            block_num += 1;
        }

        let new_size = inode.size.max(offset + written as u32);
        if new_size != inode.size {
            inode.size = new_size;
            modified_inode = true;
        }

        if modified_inode {
            self.save_inode(inumber, &inode)?;
        }
        if modified_indirect {
            let mut buf = vec![0u8; block_size];
            indirect.as_ref().unwrap().encode(&mut buf);
            self.device.write_block(inode.indirect as usize, &buf)?;
        }

        Ok(written)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ramdisk::RamDisk;

    /// A 200-block disk: `inode_blocks = ceil(200 * 0.10) = 20`, `inodes = 20 * 128 = 2560`,
    /// matching the worked example in the data model.
    fn formatted_disk() -> RamDisk {
        let mut device = RamDisk::new(200);
        format(&mut device).unwrap();
        device
    }

    /// Deterministic fill pattern, avoiding an all-zero buffer that would pass even if a read
    /// or write silently did nothing.
    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn mount_reports_worked_example_counts() {
        let fs = Filesystem::mount(formatted_disk()).unwrap();
        assert_eq!(fs.inode_blocks, 20);
        assert_eq!(fs.inodes, 2560);
    }

    #[test]
    fn freshly_formatted_inodes_are_all_invalid() {
        let mut fs = Filesystem::mount(formatted_disk()).unwrap();
        for i in 0..fs.inodes as u32 {
            assert!(matches!(
                fs.stat(InodeNumber(i)),
                Err(SfsError::InvalidInode(n)) if n == i
            ));
        }
    }

    #[test]
    fn format_rejects_a_device_too_small_to_hold_an_inode_table() {
        let mut device = RamDisk::new(1);
        assert!(matches!(format(&mut device), Err(SfsError::DeviceTooSmall)));
    }

    #[test]
    fn mount_rejects_unformatted_disk() {
        let device = RamDisk::new(50);
        assert!(matches!(
            Filesystem::mount(device),
            Err(SfsError::CorruptSuperblock)
        ));
    }

    #[test]
    fn create_then_mount_first_inode_is_zero() {
        let mut fs = Filesystem::mount(formatted_disk()).unwrap();
        assert_eq!(fs.create().unwrap(), InodeNumber(0));
    }

    #[test]
    fn create_returns_ascending_numbers_then_exhausts() {
        let mut device = RamDisk::new(20);
        format(&mut device).unwrap();
        let mut fs = Filesystem::mount(device).unwrap();
        let total = fs.inodes;
        for expected in 0..total as u32 {
            assert_eq!(fs.create().unwrap(), InodeNumber(expected));
        }
        assert!(matches!(fs.create(), Err(SfsError::NoFreeInode)));
    }

    #[test]
    fn remove_then_create_reuses_inode_number() {
        let mut fs = Filesystem::mount(formatted_disk()).unwrap();
        let a = fs.create().unwrap();
        let _b = fs.create().unwrap();
        fs.remove(a).unwrap();
        assert_eq!(fs.create().unwrap(), a);
    }

    #[test]
    fn out_of_range_inode_number_fails_every_operation() {
        let mut fs = Filesystem::mount(formatted_disk()).unwrap();
        let past_end = InodeNumber(fs.inodes as u32);
        assert!(matches!(fs.stat(past_end), Err(SfsError::InvalidInode(_))));
        assert!(matches!(fs.remove(past_end), Err(SfsError::InvalidInode(_))));
        assert!(matches!(fs.read(past_end, &mut [0u8; 1], 0), Err(SfsError::InvalidInode(_))));
        assert!(matches!(fs.write(past_end, b"x", 0), Err(SfsError::InvalidInode(_))));
    }

    #[test]
    fn remove_twice_fails_the_second_time() {
        let mut fs = Filesystem::mount(formatted_disk()).unwrap();
        let i = fs.create().unwrap();
        assert!(fs.remove(i).is_ok());
        assert!(matches!(fs.remove(i), Err(SfsError::InvalidInode(_))));
    }

    #[test]
    fn read_at_eof_is_empty_past_eof_is_an_error() {
        let mut fs = Filesystem::mount(formatted_disk()).unwrap();
        let i = fs.create().unwrap();
        fs.write(i, b"hello", 0).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(fs.read(i, &mut buf, 5).unwrap(), 0);
        assert!(matches!(
            fs.read(i, &mut buf, 6),
            Err(SfsError::OffsetPastEnd { offset: 6, size: 5 })
        ));
    }

    #[test]
    fn write_past_size_fails_without_creating_a_hole() {
        let mut fs = Filesystem::mount(formatted_disk()).unwrap();
        let i = fs.create().unwrap();
        assert!(matches!(
            fs.write(i, b"x", 10),
            Err(SfsError::OffsetPastEnd { offset: 10, size: 0 })
        ));
    }

    #[test]
    fn small_write_then_read_round_trips() {
        let mut fs = Filesystem::mount(formatted_disk()).unwrap();
        let i = fs.create().unwrap();
        assert_eq!(fs.write(i, b"hello", 0).unwrap(), 5);
        assert_eq!(fs.stat(i).unwrap(), 5);
        let mut buf = [0u8; 5];
        assert_eq!(fs.read(i, &mut buf, 0).unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn write_spanning_two_direct_blocks_stays_off_the_indirect_block() {
        let mut fs = Filesystem::mount(formatted_disk()).unwrap();
        let i = fs.create().unwrap();
        let data = pattern(8192);
        assert_eq!(fs.write(i, &data, 0).unwrap(), 8192);
        assert_eq!(fs.stat(i).unwrap(), 8192);

        let inode = fs.load_inode(i).unwrap();
        assert_ne!(inode.direct[0], 0);
        assert_ne!(inode.direct[1], 0);
        assert_eq!(inode.direct[2], 0);
        assert_eq!(inode.indirect, 0);

        let mut buf = vec![0u8; 8192];
        assert_eq!(fs.read(i, &mut buf, 0).unwrap(), 8192);
        assert_eq!(buf, data);
    }

    #[test]
    fn write_past_direct_region_allocates_an_indirect_block() {
        let mut fs = Filesystem::mount(formatted_disk()).unwrap();
        let i = fs.create().unwrap();
        let data = pattern(32768);
        assert_eq!(fs.write(i, &data, 0).unwrap(), 32768);

        let inode = fs.load_inode(i).unwrap();
        assert!(inode.direct.iter().all(|&p| p != 0));
        assert_ne!(inode.indirect, 0);

        let mut indirect_buf = vec![0u8; 4096];
        fs.device.read_block(inode.indirect as usize, &mut indirect_buf).unwrap();
        let indirect = IndirectBlock::decode(&indirect_buf);
        assert_eq!(indirect.iter_non_zero().count(), 3);

        let mut buf = vec![0u8; 32768];
        assert_eq!(fs.read(i, &mut buf, 0).unwrap(), 32768);
        assert_eq!(buf, data);
    }

    #[test]
    fn remove_frees_direct_and_indirect_blocks_for_reuse() {
        // blocks=11 -> inode_blocks=ceil(1.1)=2 -> exactly 8 data blocks: just enough for one
        // 32768-byte file (5 direct + 1 indirect block + 3 indirect entries) and not one more.
        // If `remove` failed to release them, the second write below would run out mid-stream.
        let mut device = RamDisk::new(11);
        format(&mut device).unwrap();
        let mut fs = Filesystem::mount(device).unwrap();

        let i = fs.create().unwrap();
        assert_eq!(fs.write(i, &pattern(32768), 0).unwrap(), 32768);
        assert!(fs.remove(i).is_ok());

        let reused = fs.create().unwrap();
        assert_eq!(reused, i);
        assert_eq!(fs.write(reused, &pattern(32768), 0).unwrap(), 32768);
    }

    #[test]
    fn write_exactly_max_file_size_then_second_write_returns_zero() {
        // Large enough to hold one file of MAX_FILE_SIZE bytes: 5 direct + 1 indirect block +
        // 1024 indirect entries = 1030 data blocks, plus its own inode table.
        let mut device = RamDisk::new(1150);
        format(&mut device).unwrap();
        let mut fs = Filesystem::mount(device).unwrap();
        let max = fs.max_file_size();

        let i = fs.create().unwrap();
        let data = pattern(max);
        assert_eq!(fs.write(i, &data, 0).unwrap(), max);
        assert_eq!(fs.stat(i).unwrap() as usize, max);

        assert_eq!(fs.write(i, b"overflow", max as u32).unwrap(), 0);
        assert_eq!(fs.stat(i).unwrap() as usize, max);
    }

    #[test]
    fn allocator_exhaustion_persists_the_partial_write() {
        // A disk barely bigger than its own inode table: only a handful of data blocks exist,
        // so a single large write must run out of free blocks mid-stream. One of those free
        // blocks is spent on the indirect block itself once the write crosses the direct
        // region, so the usable data capacity is `free_blocks - 1` blocks, not `free_blocks`.
        let mut device = RamDisk::new(20);
        format(&mut device).unwrap();
        let mut fs = Filesystem::mount(device).unwrap();
        let free_blocks = 20 - 1 - fs.inode_blocks;
        assert!(free_blocks > POINTERS_PER_INODE, "test assumes the write reaches the indirect region");
        let expected_written = (free_blocks - 1) * 4096;

        let i = fs.create().unwrap();
        let data = pattern(free_blocks * 4096 + 4096);
        let written = fs.write(i, &data, 0).unwrap();
        assert_eq!(written, expected_written);
        assert_eq!(fs.stat(i).unwrap() as usize, written);

        let mut buf = vec![0u8; written];
        fs.read(i, &mut buf, 0).unwrap();
        assert_eq!(buf, data[..written]);

        // No free blocks remain: even a fresh inode can't get a single byte written.
        let j = fs.create().unwrap();
        assert_eq!(fs.write(j, b"x", 0).unwrap(), 0);
    }

    #[test]
    fn unmount_then_remount_preserves_stat_and_data() {
        let mut device = RamDisk::new(200);
        format(&mut device).unwrap();
        let mut fs = Filesystem::mount(device).unwrap();
        let i = fs.create().unwrap();
        let data = pattern(32768);
        fs.write(i, &data, 0).unwrap();
        let device = fs.unmount();

        let mut fs = Filesystem::mount(device).unwrap();
        assert_eq!(fs.stat(i).unwrap(), 32768);
        let mut buf = vec![0u8; 32768];
        fs.read(i, &mut buf, 0).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn append_at_current_size_extends_the_file() {
        let mut fs = Filesystem::mount(formatted_disk()).unwrap();
        let i = fs.create().unwrap();
        fs.write(i, b"abc", 0).unwrap();
        fs.write(i, b"def", 3).unwrap();
        assert_eq!(fs.stat(i).unwrap(), 6);
        let mut buf = [0u8; 6];
        fs.read(i, &mut buf, 0).unwrap();
        assert_eq!(&buf, b"abcdef");
    }

    #[test]
    fn random_sequence_of_appends_reads_back_correctly() {
        use rand::Rng;
        use rand::SeedableRng;

        let mut rng = rand::rngs::StdRng::seed_from_u64(0xf0f03410);
        let mut fs = Filesystem::mount(formatted_disk()).unwrap();
        let i = fs.create().unwrap();

        let mut expected = Vec::new();
        for _ in 0..20 {
            let chunk_len = rng.gen_range(1..=6000);
            let mut chunk = vec![0u8; chunk_len];
            rng.fill(chunk.as_mut_slice());
            let offset = expected.len() as u32;
            assert_eq!(fs.write(i, &chunk, offset).unwrap(), chunk_len);
            expected.extend_from_slice(&chunk);
        }

        assert_eq!(fs.stat(i).unwrap() as usize, expected.len());
        let mut buf = vec![0u8; expected.len()];
        fs.read(i, &mut buf, 0).unwrap();
        assert_eq!(buf, expected);
    }

    #[test]
    fn partial_block_write_preserves_surrounding_bytes() {
        let mut fs = Filesystem::mount(formatted_disk()).unwrap();
        let i = fs.create().unwrap();
        fs.write(i, &pattern(4096), 0).unwrap();
        fs.write(i, &[0xaa; 10], 100).unwrap();

        let mut buf = vec![0u8; 4096];
        fs.read(i, &mut buf, 0).unwrap();
        assert_eq!(&buf[100..110], &[0xaa; 10]);
        assert_eq!(&buf[0..100], &pattern(4096)[0..100]);
        assert_eq!(&buf[110..], &pattern(4096)[110..]);
    }
}
