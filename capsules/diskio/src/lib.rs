// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Disk I/O layer for a FAT filesystem.
//!
//! A FAT library addresses storage as numbered physical drives made of
//! sectors. [`DiskIo`] maps each drive number onto a [`BlockDevice`] and
//! turns driver errors into the small set of results the filesystem
//! understands.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let disks = DiskIo::new();
//! disks.attach(0, &peripherals.sdio)?;
//! disks.attach(1, &spi_flash)?;
//! disks.disk_initialize(0);
//! disks.disk_read(0, &mut buffer, 0, 1)?;
//! ```

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

use core::cell::Cell;
use core::ops::BitOr;

use rvsdk_hal::hil::block_storage::BlockDevice;
use rvsdk_hal::ErrorCode;

/// Number of physical drives that can be attached.
pub const MAX_DRIVES: usize = 4;

/// Drive status bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct DiskStatus(u8);

impl DiskStatus {
    pub const OK: DiskStatus = DiskStatus(0);
    /// The drive has not been initialized.
    pub const NOINIT: DiskStatus = DiskStatus(0x01);
    /// No medium behind this drive number.
    pub const NODISK: DiskStatus = DiskStatus(0x02);
    /// The medium is write protected.
    pub const PROTECT: DiskStatus = DiskStatus(0x04);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: DiskStatus) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DiskStatus {
    type Output = DiskStatus;

    fn bitor(self, rhs: DiskStatus) -> DiskStatus {
        DiskStatus(self.0 | rhs.0)
    }
}

/// Failure of a disk operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DiskResult {
    /// The device reported an error.
    Error,
    WriteProtected,
    NotReady,
    ParameterError,
}

impl From<ErrorCode> for DiskResult {
    fn from(err: ErrorCode) -> DiskResult {
        match err {
            ErrorCode::INVAL | ErrorCode::SIZE => DiskResult::ParameterError,
            ErrorCode::OFF | ErrorCode::NODEVICE | ErrorCode::NOACK => DiskResult::NotReady,
            _ => DiskResult::Error,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IoctlCommand {
    /// Flush pending writes to the medium.
    Sync,
    GetSectorCount,
    GetSectorSize,
    /// Erase block size, in sectors.
    GetBlockSize,
    /// Sectors `first..=last` no longer hold data.
    Trim { first: u32, last: u32 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IoctlResponse {
    Done,
    SectorCount(u32),
    SectorSize(u16),
    BlockSize(u32),
}

pub struct DiskIo<'a> {
    drives: [Cell<Option<&'a dyn BlockDevice>>; MAX_DRIVES],
}

impl<'a> DiskIo<'a> {
    pub const fn new() -> DiskIo<'a> {
        DiskIo {
            drives: [
                Cell::new(None),
                Cell::new(None),
                Cell::new(None),
                Cell::new(None),
            ],
        }
    }

    /// Serve drive number `pdrv` from `device`, replacing any previous one.
    pub fn attach(&self, pdrv: u8, device: &'a dyn BlockDevice) -> Result<(), ErrorCode> {
        let slot = self.drives.get(pdrv as usize).ok_or(ErrorCode::INVAL)?;
        slot.set(Some(device));
        Ok(())
    }

    fn drive(&self, pdrv: u8) -> Option<&'a dyn BlockDevice> {
        self.drives.get(pdrv as usize).and_then(Cell::get)
    }

    fn ready_drive(&self, pdrv: u8) -> Result<&'a dyn BlockDevice, DiskResult> {
        let device = self.drive(pdrv).ok_or(DiskResult::ParameterError)?;
        if !device.is_ready() {
            return Err(DiskResult::NotReady);
        }
        Ok(device)
    }

    pub fn disk_status(&self, pdrv: u8) -> DiskStatus {
        match self.drive(pdrv) {
            None => DiskStatus::NOINIT | DiskStatus::NODISK,
            Some(device) => {
                let mut status = DiskStatus::OK;
                if !device.is_ready() {
                    status = status | DiskStatus::NOINIT;
                }
                if device.is_write_protected() {
                    status = status | DiskStatus::PROTECT;
                }
                status
            }
        }
    }

    pub fn disk_initialize(&self, pdrv: u8) -> DiskStatus {
        if let Some(device) = self.drive(pdrv) {
            if let Err(err) = device.initialize() {
                log::warn!("diskio: drive {} failed to initialize: {:?}", pdrv, err);
            }
        }
        self.disk_status(pdrv)
    }

    /// Byte length of `count` sectors on `device`, checked against `available`.
    fn span(device: &dyn BlockDevice, count: u32, available: usize) -> Result<usize, DiskResult> {
        let len = (count as usize)
            .checked_mul(device.block_size())
            .ok_or(DiskResult::ParameterError)?;
        if count == 0 || len > available {
            return Err(DiskResult::ParameterError);
        }
        Ok(len)
    }

    /// Read `count` sectors starting at `sector` into the front of `buffer`.
    pub fn disk_read(
        &self,
        pdrv: u8,
        buffer: &mut [u8],
        sector: u32,
        count: u32,
    ) -> Result<(), DiskResult> {
        let device = self.ready_drive(pdrv)?;
        let len = Self::span(device, count, buffer.len())?;
        log::trace!("diskio: read {} sectors at {} from drive {}", count, sector, pdrv);
        device.read_blocks(sector, &mut buffer[..len])?;
        Ok(())
    }

    /// Write `count` sectors from the front of `data` starting at `sector`.
    pub fn disk_write(&self, pdrv: u8, data: &[u8], sector: u32, count: u32) -> Result<(), DiskResult> {
        let device = self.ready_drive(pdrv)?;
        if device.is_write_protected() {
            return Err(DiskResult::WriteProtected);
        }
        let len = Self::span(device, count, data.len())?;
        log::trace!("diskio: write {} sectors at {} to drive {}", count, sector, pdrv);
        device.write_blocks(sector, &data[..len])?;
        Ok(())
    }

    pub fn disk_ioctl(&self, pdrv: u8, command: IoctlCommand) -> Result<IoctlResponse, DiskResult> {
        let device = self.ready_drive(pdrv)?;
        match command {
            IoctlCommand::Sync => {
                device.sync()?;
                Ok(IoctlResponse::Done)
            }
            IoctlCommand::GetSectorCount => Ok(IoctlResponse::SectorCount(device.block_count())),
            IoctlCommand::GetSectorSize => u16::try_from(device.block_size())
                .map(IoctlResponse::SectorSize)
                .map_err(|_| DiskResult::Error),
            IoctlCommand::GetBlockSize => Ok(IoctlResponse::BlockSize(device.erase_block_size())),
            IoctlCommand::Trim { first, last } => {
                if first > last {
                    return Err(DiskResult::ParameterError);
                }
                match device.trim(first, last) {
                    // Trim is a hint; devices without it have nothing to do.
                    Ok(()) | Err(ErrorCode::NOSUPPORT) => Ok(IoctlResponse::Done),
                    Err(err) => Err(err.into()),
                }
            }
        }
    }
}

impl Default for DiskIo<'_> {
    fn default() -> Self {
        Self::new()
    }
}
