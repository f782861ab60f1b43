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

//! The unmounted inspector: prints a device's superblock and inode table without mounting it.

use crate::device::BlockDevice;
use crate::error::SfsError;
use crate::inode::IndirectBlock;
use crate::inode::RawInode;
use crate::inode::INODE_ENCODED_SIZE;
use crate::inode::inodes_per_block;
use crate::superblock::MAGIC;
use crate::superblock::Superblock;

/// Prints `device`'s superblock and every valid inode's size and block pointers to stdout.
///
/// Never requires a mount and never modifies the device; an invalid magic number is reported,
/// not treated as a failure, since diagnostic output is not part of the correctness contract.
pub fn debug<D: BlockDevice>(device: &mut D) -> Result<(), SfsError> {
    let mut block = vec![0u8; D::BLOCK_SIZE];
    device.read_block(0, &mut block)?;
    let superblock = Superblock::decode(&block);

    println!("SuperBlock:");
    if superblock.magic == MAGIC {
        println!("    magic number is valid");
    } else {
        println!("    magic number is invalid");
    }
    println!("    {} blocks", superblock.blocks);
    println!("    {} inode blocks", superblock.inode_blocks);
    println!("    {} inodes", superblock.inodes);

    let inodes_per_block = inodes_per_block(D::BLOCK_SIZE);
    for inode_block in 0..superblock.inode_blocks as usize {
        device.read_block(1 + inode_block, &mut block)?;
        for slot in 0..inodes_per_block {
            let off = slot * INODE_ENCODED_SIZE;
            let node = RawInode::decode(&block[off..off + INODE_ENCODED_SIZE]);
            if !node.valid {
                continue;
            }

            println!("Inode {}:", inode_block * inodes_per_block + slot);
            println!("    size: {} bytes", node.size);
            print!("    direct blocks:");
            for &pointer in node.direct.iter() {
                if pointer != 0 {
                    print!(" {pointer}");
                }
            }
            println!();

            if node.indirect != 0 {
                let mut indirect_buf = vec![0u8; D::BLOCK_SIZE];
                device.read_block(node.indirect as usize, &mut indirect_buf)?;
                let indirect = IndirectBlock::decode(&indirect_buf);
                println!("    indirect block: {}", node.indirect);
                print!("    indirect data blocks:");
                for pointer in indirect.iter_non_zero() {
                    print!(" {pointer}");
                }
                println!();
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fs::format;
    use crate::fs::Filesystem;
    use crate::ramdisk::RamDisk;

    #[test]
    fn runs_on_a_freshly_formatted_disk_with_no_inodes() {
        let mut device = RamDisk::new(200);
        format(&mut device).unwrap();
        assert!(debug(&mut device).is_ok());
    }

    #[test]
    fn runs_on_a_disk_with_valid_inodes_without_mounting() {
        let mut device = RamDisk::new(200);
        format(&mut device).unwrap();
        let mut fs = Filesystem::mount(device).unwrap();
        let i = fs.create().unwrap();
        fs.write(i, b"hello", 0).unwrap();
        let mut device = fs.unmount();
        assert!(debug(&mut device).is_ok());
    }

    #[test]
    fn reports_an_invalid_magic_number_instead_of_failing() {
        let mut device = RamDisk::new(200);
        assert!(debug(&mut device).is_ok());
    }
}
