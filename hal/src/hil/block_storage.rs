// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Interface for block-addressed storage such as SD cards, eMMC and serial
//! NOR flash.
//!
//! Blocks are the unit a filesystem sees (its "sector"). Devices that must be
//! erased in larger units report that through [`BlockDevice::erase_block_size`]
//! and handle the erase themselves inside [`BlockDevice::write_blocks`].

use crate::ErrorCode;

pub trait BlockDevice {
    /// Bring the device to a state where it can serve reads and writes.
    /// Calling this on an already initialized device re-runs identification.
    fn initialize(&self) -> Result<(), ErrorCode>;

    /// Whether [`BlockDevice::initialize`] has completed successfully.
    fn is_ready(&self) -> bool;

    /// Whether writes are refused by the medium.
    fn is_write_protected(&self) -> bool {
        false
    }

    /// Size of one block in bytes.
    fn block_size(&self) -> usize;

    /// Total number of blocks on the device.
    fn block_count(&self) -> u32;

    /// Erase granularity, in blocks.
    fn erase_block_size(&self) -> u32 {
        1
    }

    /// Read `buffer.len() / block_size()` blocks starting at `block`.
    ///
    /// `buffer` must be a whole number of blocks long, otherwise
    /// `Err(ErrorCode::SIZE)` is returned. Reading past the end of the device
    /// is `Err(ErrorCode::INVAL)`.
    fn read_blocks(&self, block: u32, buffer: &mut [u8]) -> Result<(), ErrorCode>;

    /// Write `data.len() / block_size()` blocks starting at `block`.
    fn write_blocks(&self, block: u32, data: &[u8]) -> Result<(), ErrorCode>;

    /// Wait until every previously accepted write has reached the medium.
    fn sync(&self) -> Result<(), ErrorCode> {
        Ok(())
    }

    /// Tell the device the blocks in `first..=last` no longer hold data.
    fn trim(&self, _first: u32, _last: u32) -> Result<(), ErrorCode> {
        Err(ErrorCode::NOSUPPORT)
    }
}

/// Number of whole blocks in `len` bytes, or `Err(ErrorCode::SIZE)` if `len`
/// is not a multiple of `block_size` or is zero.
pub fn blocks_in(len: usize, block_size: usize) -> Result<u32, ErrorCode> {
    if len == 0 || block_size == 0 || len % block_size != 0 {
        return Err(ErrorCode::SIZE);
    }
    u32::try_from(len / block_size).map_err(|_| ErrorCode::SIZE)
}

/// Check that `count` blocks starting at `block` fit in a device of `total`
/// blocks.
pub fn check_range(block: u32, count: u32, total: u32) -> Result<(), ErrorCode> {
    match block.checked_add(count) {
        Some(end) if end <= total => Ok(()),
        _ => Err(ErrorCode::INVAL),
    }
}

#[cfg(test)]
mod tests {
    use super::{blocks_in, check_range};
    use crate::ErrorCode;

    #[test]
    fn whole_blocks() {
        assert_eq!(blocks_in(512, 512), Ok(1));
        assert_eq!(blocks_in(4096, 512), Ok(8));
        assert_eq!(blocks_in(0, 512), Err(ErrorCode::SIZE));
        assert_eq!(blocks_in(513, 512), Err(ErrorCode::SIZE));
    }

    #[test]
    fn ranges() {
        assert_eq!(check_range(0, 8, 8), Ok(()));
        assert_eq!(check_range(7, 1, 8), Ok(()));
        assert_eq!(check_range(7, 2, 8), Err(ErrorCode::INVAL));
        assert_eq!(check_range(u32::MAX, 2, u32::MAX), Err(ErrorCode::INVAL));
    }
}
