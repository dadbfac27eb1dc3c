// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Serial NOR flash on the QSPI controller.
//!
//! Uses the common JEDEC command set: `READ` (0x03), `PP` (0x02), `SE`
//! (0x20, 4 KiB), `WREN` (0x06), `RDSR` (0x05) and `RDID` (0x9F). Programs
//! are limited to one 256-byte page and erases to one 4 KiB sector; both
//! must be preceded by `WREN` and followed by polling the status register
//! until `WIP` clears.
//!
//! As a [`BlockDevice`] the flash exposes 4 KiB blocks. Writing a block
//! erases it first, so callers never see NOR's "bits only go from 1 to 0"
//! behaviour.

use core::cell::Cell;

use rvsdk_hal::hil::block_storage::{self, BlockDevice};
use rvsdk_hal::utilities::poll::poll_until;
use rvsdk_hal::ErrorCode;

use crate::qspi::{Qspi, QspiCommand};

pub const SECTOR_SIZE: usize = 4096;
pub const PAGE_SIZE: usize = 256;

const CMD_READ: u8 = 0x03;
const CMD_PAGE_PROGRAM: u8 = 0x02;
const CMD_SECTOR_ERASE: u8 = 0x20;
const CMD_WRITE_ENABLE: u8 = 0x06;
const CMD_READ_STATUS: u8 = 0x05;
const CMD_READ_ID: u8 = 0x9F;

const STATUS_WIP: u8 = 1 << 0;
const STATUS_WEL: u8 = 1 << 1;

/// Largest capacity addressable with 24-bit addresses.
const MAX_CAPACITY: u32 = 1 << 24;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct JedecId {
    pub manufacturer: u8,
    pub memory_type: u8,
    /// log2 of the capacity in bytes.
    pub capacity: u8,
}

impl JedecId {
    pub fn capacity_bytes(&self) -> Option<u32> {
        1u32.checked_shl(self.capacity as u32)
    }
}

pub struct SpiFlash<'a> {
    qspi: &'a Qspi,
    poll_budget: u32,
    capacity: Cell<u32>,
    ready: Cell<bool>,
}

impl<'a> SpiFlash<'a> {
    pub const fn new(qspi: &'a Qspi, poll_budget: u32) -> SpiFlash<'a> {
        SpiFlash {
            qspi,
            poll_budget,
            capacity: Cell::new(0),
            ready: Cell::new(false),
        }
    }

    pub fn read_jedec_id(&self) -> Result<JedecId, ErrorCode> {
        let mut id = [0u8; 3];
        self.qspi
            .transfer_read(&QspiCommand::instruction(CMD_READ_ID), &mut id)?;
        Ok(JedecId {
            manufacturer: id[0],
            memory_type: id[1],
            capacity: id[2],
        })
    }

    pub fn read_status(&self) -> Result<u8, ErrorCode> {
        let mut status = [0u8; 1];
        self.qspi
            .transfer_read(&QspiCommand::instruction(CMD_READ_STATUS), &mut status)?;
        Ok(status[0])
    }

    pub fn write_enable(&self) -> Result<(), ErrorCode> {
        self.qspi.command(CMD_WRITE_ENABLE)
    }

    /// Poll the status register until no program or erase is in progress.
    /// `WREN`, then confirm the device set its write enable latch.
    fn latch_write_enable(&self) -> Result<(), ErrorCode> {
        self.write_enable()?;
        if self.read_status()? & STATUS_WEL == 0 {
            log::warn!("spi-flash: write enable latch not set");
            return Err(ErrorCode::FAIL);
        }
        Ok(())
    }

    pub fn wait_ready(&self) -> Result<(), ErrorCode> {
        poll_until(self.poll_budget, || {
            matches!(self.read_status(), Ok(status) if status & STATUS_WIP == 0)
        })
        .map_err(|timeout| {
            log::warn!("spi-flash: still busy after {} polls", self.poll_budget);
            ErrorCode::from(timeout)
        })
    }

    fn check(&self, address: u32, len: usize) -> Result<(), ErrorCode> {
        let len = u32::try_from(len).map_err(|_| ErrorCode::SIZE)?;
        match address.checked_add(len) {
            Some(end) if end <= self.capacity.get() => Ok(()),
            _ => Err(ErrorCode::INVAL),
        }
    }

    pub fn read(&self, address: u32, buffer: &mut [u8]) -> Result<(), ErrorCode> {
        self.check(address, buffer.len())?;
        if buffer.is_empty() {
            return Ok(());
        }
        self.qspi
            .read_dma(&QspiCommand::addressed(CMD_READ, address), buffer)
    }

    /// Program up to one page. `data` must not cross a page boundary.
    pub fn page_program(&self, address: u32, data: &[u8]) -> Result<(), ErrorCode> {
        self.check(address, data.len())?;
        let page_offset = address as usize % PAGE_SIZE;
        if data.is_empty() || page_offset + data.len() > PAGE_SIZE {
            return Err(ErrorCode::SIZE);
        }
        self.latch_write_enable()?;
        self.qspi
            .write_dma(&QspiCommand::addressed(CMD_PAGE_PROGRAM, address), data)?;
        self.wait_ready()
    }

    /// Erase the 4 KiB sector containing `address`.
    pub fn sector_erase(&self, address: u32) -> Result<(), ErrorCode> {
        self.check(address, 1)?;
        let sector = address & !(SECTOR_SIZE as u32 - 1);
        self.latch_write_enable()?;
        self.qspi.transfer_write(
            &QspiCommand::addressed(CMD_SECTOR_ERASE, sector),
            &[],
        )?;
        self.wait_ready()
    }

    fn write_sector(&self, sector: u32, data: &[u8]) -> Result<(), ErrorCode> {
        let address = sector * SECTOR_SIZE as u32;
        self.sector_erase(address)?;
        for (i, page) in data.chunks(PAGE_SIZE).enumerate() {
            self.page_program(address + (i * PAGE_SIZE) as u32, page)?;
        }
        Ok(())
    }
}

impl BlockDevice for SpiFlash<'_> {
    fn initialize(&self) -> Result<(), ErrorCode> {
        self.ready.set(false);
        let id = self.read_jedec_id()?;
        if id.manufacturer == 0x00 || id.manufacturer == 0xFF {
            log::warn!("spi-flash: no device answered");
            return Err(ErrorCode::NODEVICE);
        }
        let capacity = id
            .capacity_bytes()
            .filter(|&bytes| bytes as usize >= SECTOR_SIZE)
            .ok_or(ErrorCode::NODEVICE)?;
        self.capacity.set(capacity.min(MAX_CAPACITY));
        self.ready.set(true);
        log::debug!(
            "spi-flash: jedec {:02x} {:02x} {:02x}, {} KiB",
            id.manufacturer,
            id.memory_type,
            id.capacity,
            self.capacity.get() / 1024
        );
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.get()
    }

    fn block_size(&self) -> usize {
        SECTOR_SIZE
    }

    fn block_count(&self) -> u32 {
        self.capacity.get() / SECTOR_SIZE as u32
    }

    fn read_blocks(&self, block: u32, buffer: &mut [u8]) -> Result<(), ErrorCode> {
        if !self.ready.get() {
            return Err(ErrorCode::OFF);
        }
        let count = block_storage::blocks_in(buffer.len(), SECTOR_SIZE)?;
        block_storage::check_range(block, count, self.block_count())?;
        // Reads are split to stay within one UDMA descriptor.
        for (i, chunk) in buffer.chunks_mut(SECTOR_SIZE).enumerate() {
            self.read((block + i as u32) * SECTOR_SIZE as u32, chunk)?;
        }
        Ok(())
    }

    fn write_blocks(&self, block: u32, data: &[u8]) -> Result<(), ErrorCode> {
        if !self.ready.get() {
            return Err(ErrorCode::OFF);
        }
        let count = block_storage::blocks_in(data.len(), SECTOR_SIZE)?;
        block_storage::check_range(block, count, self.block_count())?;
        for (i, sector) in data.chunks(SECTOR_SIZE).enumerate() {
            self.write_sector(block + i as u32, sector)?;
        }
        Ok(())
    }

    fn sync(&self) -> Result<(), ErrorCode> {
        self.wait_ready()
    }

    fn trim(&self, first: u32, last: u32) -> Result<(), ErrorCode> {
        if first > last {
            return Err(ErrorCode::INVAL);
        }
        block_storage::check_range(first, last - first + 1, self.block_count())?;
        (first..=last).try_for_each(|block| self.sector_erase(block * SECTOR_SIZE as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qspi::QspiRegisters;
    use crate::testing::FakeRegisters;
    use std::boxed::Box;
    use std::vec;

    const CMD_OFF: usize = 0x0C;
    const ADDR: usize = 0x10;
    const LEN: usize = 0x14;
    const DATA: usize = 0x18;
    const STATUS_OFF: usize = 0x1C;
    const UDMA_RX: usize = 0x80;
    const UDMA_TX: usize = 0x90;

    const DONE: u32 = 1 << 3;

    fn setup(data: u32) -> (FakeRegisters<QspiRegisters>, &'static Qspi) {
        let fake = FakeRegisters::<QspiRegisters>::new();
        fake.poke(STATUS_OFF, DONE);
        fake.poke(DATA, data);
        let qspi = Box::leak(Box::new(Qspi::new(fake.regs(), 25_000_000, 8)));
        (fake, qspi)
    }

    #[test]
    fn identifies_device() {
        let (_fake, qspi) = setup(0x16);
        let flash = SpiFlash::new(qspi, 8);
        assert_eq!(flash.initialize(), Ok(()));
        assert!(flash.is_ready());
        assert_eq!(flash.block_count(), (1 << 22) / 4096);
        assert_eq!(flash.block_size(), 4096);
    }

    #[test]
    fn missing_device() {
        let (_fake, qspi) = setup(0xFF);
        let flash = SpiFlash::new(qspi, 8);
        assert_eq!(flash.initialize(), Err(ErrorCode::NODEVICE));
        assert!(!flash.is_ready());
        let mut buffer = vec![0u8; 4096];
        assert_eq!(flash.read_blocks(0, &mut buffer), Err(ErrorCode::OFF));
    }

    #[test]
    fn busy_device_times_out() {
        let (_fake, qspi) = setup(0x17);
        let flash = SpiFlash::new(qspi, 4);
        assert_eq!(flash.read_status(), Ok(0x17));
        assert_eq!(flash.wait_ready(), Err(ErrorCode::BUSY));
    }

    #[test]
    fn reads_go_through_dma() {
        let (fake, qspi) = setup(0x14);
        let flash = SpiFlash::new(qspi, 8);
        flash.initialize().unwrap();

        let mut buffer = vec![0u8; 2 * 4096];
        assert_eq!(flash.read_blocks(3, &mut buffer), Ok(()));
        assert_eq!(fake.peek(ADDR), 4 * 4096);
        assert_eq!(fake.peek(CMD_OFF) & 0xFF, 0x03);
        assert_eq!(fake.peek(UDMA_RX), buffer[4096..].as_ptr() as usize as u32);
        assert_eq!(fake.peek(UDMA_RX + 4), 4096);

        assert_eq!(flash.read_blocks(255, &mut buffer), Err(ErrorCode::INVAL));
        assert_eq!(flash.read_blocks(0, &mut buffer[..100]), Err(ErrorCode::SIZE));
    }

    #[test]
    fn write_erases_then_programs_pages() {
        // Status reads return 0x02: WEL set, not busy.
        let (fake, qspi) = setup(0x02);
        let flash = SpiFlash::new(qspi, 8);
        flash.capacity.set(1 << 20);
        flash.ready.set(true);

        let data = vec![0x5Au8; 4096];
        assert_eq!(flash.write_blocks(2, &data), Ok(()));
        assert_eq!(fake.peek(UDMA_TX), data[15 * 256..].as_ptr() as usize as u32);
        assert_eq!(fake.peek(UDMA_TX + 4), 256);
        // The last command is the status poll after the final page.
        assert_eq!(fake.peek(CMD_OFF) & 0xFF, 0x05);
    }

    #[test]
    fn erase_requires_write_enable_latch() {
        let (fake, qspi) = setup(0x00);
        let flash = SpiFlash::new(qspi, 8);
        flash.capacity.set(1 << 20);
        assert_eq!(flash.sector_erase(0x1234), Err(ErrorCode::FAIL));

        fake.poke(DATA, 0x02);
        assert_eq!(flash.sector_erase(0x1234), Ok(()));
        // The last command is the status poll after the erase.
        assert_eq!(fake.peek(CMD_OFF) & 0xFF, 0x05);
        assert_eq!(fake.peek(LEN), 1);
    }

    #[test]
    fn program_requires_write_enable_latch() {
        let (fake, qspi) = setup(0x00);
        let flash = SpiFlash::new(qspi, 8);
        flash.capacity.set(1 << 20);
        assert_eq!(flash.page_program(0x100, &[0xA5; 16]), Err(ErrorCode::FAIL));
        assert_eq!(fake.peek(UDMA_TX + 4), 0);
        assert_eq!(fake.peek(CMD_OFF) & 0xFF, 0x05);

        fake.poke(DATA, 0x02);
        assert_eq!(flash.page_program(0x100, &[0xA5; 16]), Ok(()));
        assert_eq!(fake.peek(UDMA_TX + 4), 16);
    }

    #[test]
    fn page_program_bounds() {
        let (_fake, qspi) = setup(0x02);
        let flash = SpiFlash::new(qspi, 8);
        flash.capacity.set(1 << 20);
        assert_eq!(flash.page_program(0x80, &[0u8; 128]), Ok(()));
        assert_eq!(flash.page_program(0x81, &[0u8; 128]), Err(ErrorCode::SIZE));
        assert_eq!(flash.page_program(0, &[]), Err(ErrorCode::SIZE));
        assert_eq!(flash.page_program(1 << 20, &[0]), Err(ErrorCode::INVAL));
    }

    #[test]
    fn trim_range() {
        let (_fake, qspi) = setup(0x02);
        let flash = SpiFlash::new(qspi, 8);
        flash.capacity.set(8 * 4096);
        assert_eq!(flash.trim(2, 4), Ok(()));
        assert_eq!(flash.trim(4, 2), Err(ErrorCode::INVAL));
        assert_eq!(flash.trim(7, 8), Err(ErrorCode::INVAL));
    }
}
