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

//! SFS: a block-addressed filesystem laid out over a fixed-size [`BlockDevice`].
//!
//! A disk is a flat array of fixed-size blocks. Block 0 holds the [`superblock::Superblock`];
//! the next `inode_blocks` blocks hold the inode table; everything past that is data, handed out
//! to inodes as direct pointers and, once an inode outgrows its five direct pointers, through a
//! single indirect block. Files are identified by an [`inode::InodeNumber`] alone. There is no
//! naming, no directories, no permissions and no concurrent access from more than one caller.
//!
//! Typical use:
//!
//! ```
//! use sfs::{format, Filesystem};
//! use sfs::device::FileBlockDevice;
//! # fn demo(path: &str) -> Result<(), sfs::SfsError> {
//! let mut device = FileBlockDevice::open(path, 200)?;
//! format(&mut device)?;
//! let mut fs = Filesystem::mount(device)?;
//! let inumber = fs.create()?;
//! fs.write(inumber, b"hello", 0)?;
//! let mut buf = [0u8; 5];
//! fs.read(inumber, &mut buf, 0)?;
//! assert_eq!(&buf, b"hello");
//! # Ok(())
//! # }
//! ```

mod bitmap;
pub mod debug;
pub mod device;
pub mod error;
pub mod fs;
pub mod inode;
#[cfg(test)]
mod ramdisk;
pub mod superblock;

pub use debug::debug;
pub use error::SfsError;
pub use fs::format;
pub use fs::Filesystem;
pub use inode::InodeNumber;
