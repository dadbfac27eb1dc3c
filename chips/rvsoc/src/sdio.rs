// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! SD/eMMC host controller.
//!
//! A command is issued by programming `CMD_OP` (index and expected response
//! type), `CMD_ARG` and, for data commands, `DATA_SETUP`, then writing
//! `START`. The controller sets `STATUS.EOT` once the command (and its data
//! phase) finished, or `STATUS.ERROR` with a code in `CMD_ERR`/`DATA_ERR`.
//! Data always moves through the UDMA RX/TX channels, up to 256 blocks per
//! command.
//!
//! The driver identifies SD cards (SDSC and SDHC/SDXC) and eMMC devices and
//! exposes them as a 512-byte-block [`BlockDevice`].

use core::cell::Cell;

use rvsdk_hal::hil::block_storage::{self, BlockDevice};
use rvsdk_hal::utilities::cells::MapCell;
use rvsdk_hal::utilities::poll::poll_until;
use rvsdk_hal::utilities::registers::interfaces::{Readable, Writeable};
use rvsdk_hal::utilities::registers::{
    register_bitfields, register_structs, FieldValue, ReadOnly, ReadWrite, WriteOnly,
};
use rvsdk_hal::utilities::StaticRef;
use rvsdk_hal::ErrorCode;

use crate::chip_config::clock_divider;
use crate::udma::{Channel, ChannelLayout, UdmaPeriphRegisters, UdmaPeripheral, DMA_ENABLE};

register_structs! {
    pub SdioRegisters {
        (0x00 => cmd_op: ReadWrite<u32, CMD_OP::Register>),
        (0x04 => cmd_arg: ReadWrite<u32>),
        (0x08 => data_setup: ReadWrite<u32, DATA_SETUP::Register>),
        (0x0C => start: WriteOnly<u32>),
        (0x10 => rsp: [ReadOnly<u32>; 4]),
        (0x20 => clk_div: ReadWrite<u32, CLK_DIV::Register>),
        (0x24 => status: ReadOnly<u32, STATUS::Register>),
        (0x28 => status_clr: WriteOnly<u32, STATUS::Register>),
        (0x2C => _reserved0),
        (0x80 => udma: UdmaPeriphRegisters),
        (0xC0 => @END),
    }
}

register_bitfields![u32,
    CMD_OP [
        RSP_TYPE OFFSET(0) NUMBITS(3) [
            None = 0,
            R1 = 1,
            R1b = 2,
            R2 = 3,
            R3 = 4,
            R6 = 5,
            R7 = 6
        ],
        CMD_IDX OFFSET(8) NUMBITS(6) []
    ],
    DATA_SETUP [
        EN OFFSET(0) NUMBITS(1) [],
        /// 1 = card to host
        RWN OFFSET(1) NUMBITS(1) [],
        QUAD OFFSET(2) NUMBITS(1) [],
        /// Number of blocks minus one
        BLOCK_NUM OFFSET(8) NUMBITS(8) [],
        /// Block size in bytes minus one
        BLOCK_SIZE OFFSET(16) NUMBITS(10) []
    ],
    CLK_DIV [
        DIV OFFSET(0) NUMBITS(8) [],
        VALID OFFSET(8) NUMBITS(1) []
    ],
    STATUS [
        EOT OFFSET(0) NUMBITS(1) [],
        ERROR OFFSET(1) NUMBITS(1) [],
        CMD_ERR OFFSET(16) NUMBITS(4) [
            NoError = 0,
            Timeout = 1,
            Crc = 2,
            Index = 3
        ],
        DATA_ERR OFFSET(20) NUMBITS(4) [
            NoError = 0,
            Timeout = 1,
            Crc = 2
        ]
    ]
];

pub const SDIO0_BASE: StaticRef<SdioRegisters> =
    unsafe { StaticRef::new(0x1018_0000 as *const SdioRegisters) };

pub const BLOCK_SIZE: usize = 512;

/// Blocks a single data command can move.
pub const MAX_BLOCKS_PER_TRANSFER: usize = 256;

const CMD_GO_IDLE_STATE: u8 = 0;
const CMD_SEND_OP_COND: u8 = 1;
const CMD_ALL_SEND_CID: u8 = 2;
const CMD_SEND_RELATIVE_ADDR: u8 = 3;
const CMD_SWITCH: u8 = 6;
const CMD_SELECT_CARD: u8 = 7;
const CMD_SEND_IF_COND: u8 = 8;
const CMD_SEND_EXT_CSD: u8 = 8;
const CMD_SEND_CSD: u8 = 9;
const CMD_STOP_TRANSMISSION: u8 = 12;
const CMD_SET_BLOCKLEN: u8 = 16;
const CMD_READ_SINGLE_BLOCK: u8 = 17;
const CMD_READ_MULTIPLE_BLOCK: u8 = 18;
const CMD_WRITE_BLOCK: u8 = 24;
const CMD_WRITE_MULTIPLE_BLOCK: u8 = 25;
const CMD_APP_CMD: u8 = 55;
const ACMD_SET_BUS_WIDTH: u8 = 6;
const ACMD_SD_SEND_OP_COND: u8 = 41;

const IF_COND_CHECK: u32 = 0x1AA;
const SD_OCR_HCS: u32 = 0x40FF_8000;
const SD_OCR_SDSC: u32 = 0x00FF_8000;
const MMC_OCR_SECTOR_MODE: u32 = 0x40FF_8080;
/// CMD6 argument writing 1 (4-bit bus) to EXT_CSD[183] BUS_WIDTH.
const MMC_SWITCH_BUS_WIDTH_4: u32 = 0x03B7_0100;
const OCR_POWER_UP: u32 = 1 << 31;
const OCR_CCS: u32 = 1 << 30;
const EXT_CSD_SEC_COUNT: usize = 212;

/// Response format the controller should expect.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResponseType {
    None,
    R1,
    R1b,
    R2,
    R3,
    R6,
    R7,
}

impl ResponseType {
    fn field(self) -> FieldValue<u32, CMD_OP::Register> {
        match self {
            ResponseType::None => CMD_OP::RSP_TYPE::None,
            ResponseType::R1 => CMD_OP::RSP_TYPE::R1,
            ResponseType::R1b => CMD_OP::RSP_TYPE::R1b,
            ResponseType::R2 => CMD_OP::RSP_TYPE::R2,
            ResponseType::R3 => CMD_OP::RSP_TYPE::R3,
            ResponseType::R6 => CMD_OP::RSP_TYPE::R6,
            ResponseType::R7 => CMD_OP::RSP_TYPE::R7,
        }
    }
}

/// Response words, `RSP0` first. For R2 `RSP0` holds bits 31:0 of the
/// 128-bit register and `RSP3` bits 127:96.
pub type Response = [u32; 4];

/// What [`BlockDevice::initialize`] found on the bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CardType {
    /// Standard capacity SD, byte addressed.
    SdSc,
    /// High or extended capacity SD, block addressed.
    SdHc,
    /// eMMC in sector mode.
    Mmc,
}

#[derive(Copy, Clone)]
enum Direction {
    Read,
    Write,
}

/// Bits `hi..=lo` of a 128-bit R2 register.
fn r2_bits(rsp: &Response, hi: u32, lo: u32) -> u32 {
    let wide = (rsp[3] as u128) << 96 | (rsp[2] as u128) << 64 | (rsp[1] as u128) << 32 | rsp[0] as u128;
    let width = hi - lo + 1;
    ((wide >> lo) & ((1u128 << width) - 1)) as u32
}

/// Capacity in 512-byte blocks described by an SD CSD register.
pub fn sd_csd_blocks(csd: &Response) -> Option<u32> {
    match r2_bits(csd, 127, 126) {
        0 => {
            let c_size = r2_bits(csd, 73, 62) as u64;
            let c_size_mult = r2_bits(csd, 49, 47);
            let read_bl_len = r2_bits(csd, 83, 80);
            let bytes = (c_size + 1) << (c_size_mult + 2 + read_bl_len);
            u32::try_from(bytes / BLOCK_SIZE as u64).ok()
        }
        1 => {
            let c_size = r2_bits(csd, 69, 48) as u64;
            u32::try_from((c_size + 1) * 1024).ok()
        }
        _ => None,
    }
}

/// `SEC_COUNT` field of an eMMC EXT_CSD register.
pub fn ext_csd_sectors(ext_csd: &[u8; BLOCK_SIZE]) -> u32 {
    u32::from_le_bytes([
        ext_csd[EXT_CSD_SEC_COUNT],
        ext_csd[EXT_CSD_SEC_COUNT + 1],
        ext_csd[EXT_CSD_SEC_COUNT + 2],
        ext_csd[EXT_CSD_SEC_COUNT + 3],
    ])
}

pub struct Sdio {
    registers: StaticRef<SdioRegisters>,
    peripheral_freq: u32,
    init_freq: u32,
    freq: u32,
    poll_budget: u32,
    card: Cell<Option<CardType>>,
    rca: Cell<u16>,
    blocks: Cell<u32>,
    quad: Cell<bool>,
    ext_csd: MapCell<[u8; BLOCK_SIZE]>,
}

impl Sdio {
    pub const fn new(
        base: StaticRef<SdioRegisters>,
        peripheral_freq: u32,
        init_freq: u32,
        freq: u32,
        poll_budget: u32,
    ) -> Sdio {
        Sdio {
            registers: base,
            peripheral_freq,
            init_freq,
            freq,
            poll_budget,
            card: Cell::new(None),
            rca: Cell::new(0),
            blocks: Cell::new(0),
            quad: Cell::new(false),
            ext_csd: MapCell::new([0; BLOCK_SIZE]),
        }
    }

    fn udma(&self) -> UdmaPeripheral<'_> {
        UdmaPeripheral::new(&self.registers.udma, ChannelLayout::P2m)
    }

    /// Put the host in its reset state at the identification clock.
    pub fn init(&self) {
        self.card.set(None);
        self.quad.set(false);
        self.registers.data_setup.set(0);
        self.registers
            .status_clr
            .write(STATUS::EOT::SET + STATUS::ERROR::SET);
        self.set_clock(self.init_freq);
    }

    pub fn set_clock(&self, freq: u32) {
        let div = clock_divider(self.peripheral_freq, freq, 0xFF);
        self.registers
            .clk_div
            .write(CLK_DIV::DIV.val(div) + CLK_DIV::VALID::SET);
        log::debug!("sdio: clock {} Hz, div {}", freq, div);
    }

    pub fn card_type(&self) -> Option<CardType> {
        self.card.get()
    }

    pub fn rca(&self) -> u16 {
        self.rca.get()
    }

    fn wait_command(&self, cmd: u8) -> Result<Response, ErrorCode> {
        poll_until(self.poll_budget, || {
            let status = self.registers.status.extract();
            status.is_set(STATUS::EOT) || status.is_set(STATUS::ERROR)
        })
        .map_err(|timeout| {
            log::warn!("sdio: CMD{} never completed", cmd);
            ErrorCode::from(timeout)
        })?;

        let status = self.registers.status.extract();
        self.registers
            .status_clr
            .write(STATUS::EOT::SET + STATUS::ERROR::SET);
        if status.is_set(STATUS::ERROR) {
            let cmd_err = status.read(STATUS::CMD_ERR);
            let data_err = status.read(STATUS::DATA_ERR);
            log::warn!("sdio: CMD{} failed, cmd err {} data err {}", cmd, cmd_err, data_err);
            return Err(match status.read_as_enum(STATUS::CMD_ERR) {
                Some(STATUS::CMD_ERR::Value::Timeout) => ErrorCode::NOACK,
                _ => ErrorCode::FAIL,
            });
        }

        Ok([
            self.registers.rsp[0].get(),
            self.registers.rsp[1].get(),
            self.registers.rsp[2].get(),
            self.registers.rsp[3].get(),
        ])
    }

    fn issue(&self, cmd: u8, rsp: ResponseType, arg: u32) {
        self.registers
            .cmd_op
            .write(CMD_OP::CMD_IDX.val(cmd as u32) + rsp.field());
        self.registers.cmd_arg.set(arg);
        self.registers.start.set(1);
    }

    /// Send a command without a data phase.
    pub fn send_command(&self, cmd: u8, rsp: ResponseType, arg: u32) -> Result<Response, ErrorCode> {
        debug_assert!(cmd < 64);
        self.registers.data_setup.set(0);
        self.issue(cmd, rsp, arg);
        self.wait_command(cmd)
    }

    /// Send `CMD55` followed by the application command `acmd`.
    pub fn send_app_command(
        &self,
        acmd: u8,
        rsp: ResponseType,
        arg: u32,
    ) -> Result<Response, ErrorCode> {
        self.send_command(CMD_APP_CMD, ResponseType::R1, (self.rca.get() as u32) << 16)?;
        self.send_command(acmd, rsp, arg)
    }

    /// Send a data command moving `blocks` blocks of `block_size` bytes
    /// between the card and `address`.
    fn data_command(
        &self,
        cmd: u8,
        arg: u32,
        address: usize,
        blocks: usize,
        block_size: usize,
        direction: Direction,
    ) -> Result<Response, ErrorCode> {
        debug_assert!((1..=MAX_BLOCKS_PER_TRANSFER).contains(&blocks));
        let len = (blocks * block_size) as u32;
        let (channel, rwn) = match direction {
            Direction::Read => (Channel::Rx, DATA_SETUP::RWN::SET),
            Direction::Write => (Channel::Tx, DATA_SETUP::RWN::CLEAR),
        };

        self.udma().enqueue_channel(address, len, DMA_ENABLE, channel);
        self.registers.data_setup.write(
            DATA_SETUP::EN::SET
                + rwn
                + DATA_SETUP::QUAD.val(self.quad.get() as u32)
                + DATA_SETUP::BLOCK_NUM.val(blocks as u32 - 1)
                + DATA_SETUP::BLOCK_SIZE.val(block_size as u32 - 1),
        );
        self.issue(cmd, ResponseType::R1, arg);

        let result = self.wait_command(cmd);
        self.registers.data_setup.set(0);
        if result.is_err() {
            self.udma().clear_channel(channel);
        }
        result
    }

    /// Run `ACMD41` (or `CMD1` for eMMC) until the card reports power-up
    /// complete, returning the final OCR.
    fn wait_power_up<F>(&self, op_cond: F) -> Result<u32, ErrorCode>
    where
        F: Fn() -> Result<Response, ErrorCode>,
    {
        let ocr = Cell::new(0);
        let failure = Cell::new(None);
        poll_until(self.poll_budget, || match op_cond() {
            Ok(rsp) => {
                ocr.set(rsp[0]);
                rsp[0] & OCR_POWER_UP != 0
            }
            Err(e) => {
                failure.set(Some(e));
                true
            }
        })
        .map_err(|timeout| {
            log::warn!("sdio: card never left power-up");
            ErrorCode::from(timeout)
        })?;
        match failure.get() {
            Some(e) => Err(e),
            None => Ok(ocr.get()),
        }
    }

    /// Identify and select an SD card, leaving it in 4-bit mode at the data
    /// transfer clock.
    pub fn identify_sd(&self) -> Result<CardType, ErrorCode> {
        self.rca.set(0);
        self.send_command(CMD_GO_IDLE_STATE, ResponseType::None, 0)?;

        let v2 = match self.send_command(CMD_SEND_IF_COND, ResponseType::R7, IF_COND_CHECK) {
            Ok(rsp) if rsp[0] & 0xFFF == IF_COND_CHECK => true,
            Ok(_) => return Err(ErrorCode::NOSUPPORT),
            Err(ErrorCode::NOACK) => false,
            Err(e) => return Err(e),
        };
        let hcs = if v2 { SD_OCR_HCS } else { SD_OCR_SDSC };
        let ocr = self.wait_power_up(|| {
            self.send_app_command(ACMD_SD_SEND_OP_COND, ResponseType::R3, hcs)
        })?;
        let card = if ocr & OCR_CCS != 0 {
            CardType::SdHc
        } else {
            CardType::SdSc
        };

        self.send_command(CMD_ALL_SEND_CID, ResponseType::R2, 0)?;
        let rsp = self.send_command(CMD_SEND_RELATIVE_ADDR, ResponseType::R6, 0)?;
        self.rca.set((rsp[0] >> 16) as u16);
        let rca_arg = (self.rca.get() as u32) << 16;

        let csd = self.send_command(CMD_SEND_CSD, ResponseType::R2, rca_arg)?;
        let blocks = sd_csd_blocks(&csd).ok_or(ErrorCode::NOSUPPORT)?;

        self.send_command(CMD_SELECT_CARD, ResponseType::R1b, rca_arg)?;
        self.send_app_command(ACMD_SET_BUS_WIDTH, ResponseType::R1, 2)?;
        self.quad.set(true);
        self.send_command(CMD_SET_BLOCKLEN, ResponseType::R1, BLOCK_SIZE as u32)?;

        self.blocks.set(blocks);
        self.set_clock(self.freq);
        log::debug!("sdio: {:?} rca {:#06x}, {} blocks", card, self.rca.get(), blocks);
        Ok(card)
    }

    /// Identify and select an eMMC device in sector mode, 4-bit bus.
    pub fn identify_mmc(&self) -> Result<CardType, ErrorCode> {
        self.rca.set(1);
        self.send_command(CMD_GO_IDLE_STATE, ResponseType::None, 0)?;
        let ocr = self.wait_power_up(|| {
            self.send_command(CMD_SEND_OP_COND, ResponseType::R3, MMC_OCR_SECTOR_MODE)
        })?;
        if ocr & OCR_CCS == 0 {
            // Byte-addressed eMMC (<= 2 GiB) is not supported.
            return Err(ErrorCode::NOSUPPORT);
        }

        let rca_arg = 1 << 16;
        self.send_command(CMD_ALL_SEND_CID, ResponseType::R2, 0)?;
        self.send_command(CMD_SEND_RELATIVE_ADDR, ResponseType::R1, rca_arg)?;
        self.send_command(CMD_SEND_CSD, ResponseType::R2, rca_arg)?;
        self.send_command(CMD_SELECT_CARD, ResponseType::R1b, rca_arg)?;
        self.send_command(CMD_SWITCH, ResponseType::R1b, MMC_SWITCH_BUS_WIDTH_4)?;
        self.quad.set(true);

        let blocks = self
            .ext_csd
            .map(|ext_csd| {
                self.data_command(
                    CMD_SEND_EXT_CSD,
                    0,
                    ext_csd.as_mut_ptr() as usize,
                    1,
                    BLOCK_SIZE,
                    Direction::Read,
                )
                .map(|_| ext_csd_sectors(ext_csd))
            })
            .ok_or(ErrorCode::BUSY)??;
        if blocks == 0 {
            return Err(ErrorCode::NODEVICE);
        }
        self.send_command(CMD_SET_BLOCKLEN, ResponseType::R1, BLOCK_SIZE as u32)?;

        self.blocks.set(blocks);
        self.set_clock(self.freq);
        log::debug!("sdio: eMMC, {} blocks", blocks);
        Ok(CardType::Mmc)
    }

    fn block_arg(&self, block: u32) -> u32 {
        match self.card.get() {
            Some(CardType::SdSc) => block * BLOCK_SIZE as u32,
            _ => block,
        }
    }

    fn transfer(
        &self,
        block: u32,
        address: usize,
        len: usize,
        direction: Direction,
    ) -> Result<(), ErrorCode> {
        if self.card.get().is_none() {
            return Err(ErrorCode::OFF);
        }
        let count = block_storage::blocks_in(len, BLOCK_SIZE)?;
        block_storage::check_range(block, count, self.blocks.get())?;

        let mut block = block;
        let mut offset = 0;
        while offset < len {
            let blocks = ((len - offset) / BLOCK_SIZE).min(MAX_BLOCKS_PER_TRANSFER);
            let cmd = match (direction, blocks) {
                (Direction::Read, 1) => CMD_READ_SINGLE_BLOCK,
                (Direction::Read, _) => CMD_READ_MULTIPLE_BLOCK,
                (Direction::Write, 1) => CMD_WRITE_BLOCK,
                (Direction::Write, _) => CMD_WRITE_MULTIPLE_BLOCK,
            };
            log::trace!("sdio: CMD{} block {} x{}", cmd, block, blocks);
            let result = self.data_command(
                cmd,
                self.block_arg(block),
                address + offset,
                blocks,
                BLOCK_SIZE,
                direction,
            );
            if blocks > 1 {
                let stopped =
                    self.send_command(CMD_STOP_TRANSMISSION, ResponseType::R1b, 0);
                result.and(stopped)?;
            } else {
                result?;
            }
            block += blocks as u32;
            offset += blocks * BLOCK_SIZE;
        }
        Ok(())
    }
}

impl BlockDevice for Sdio {
    fn initialize(&self) -> Result<(), ErrorCode> {
        self.init();
        let card = match self.identify_sd() {
            Err(ErrorCode::NOACK) => {
                log::debug!("sdio: no SD card, trying eMMC");
                self.init();
                self.identify_mmc()
            }
            other => other,
        }?;
        self.card.set(Some(card));
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.card.get().is_some()
    }

    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn block_count(&self) -> u32 {
        self.blocks.get()
    }

    fn read_blocks(&self, block: u32, buffer: &mut [u8]) -> Result<(), ErrorCode> {
        self.transfer(
            block,
            buffer.as_mut_ptr() as usize,
            buffer.len(),
            Direction::Read,
        )
    }

    fn write_blocks(&self, block: u32, data: &[u8]) -> Result<(), ErrorCode> {
        self.transfer(block, data.as_ptr() as usize, data.len(), Direction::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRegisters;
    use std::vec;

    const CMD_OP_OFF: usize = 0x00;
    const CMD_ARG: usize = 0x04;
    const DATA_SETUP_OFF: usize = 0x08;
    const START: usize = 0x0C;
    const RSP0: usize = 0x10;
    const RSP1: usize = 0x14;
    const RSP3: usize = 0x1C;
    const CLK_DIV_OFF: usize = 0x20;
    const STATUS_OFF: usize = 0x24;
    const UDMA_RX: usize = 0x80;
    const UDMA_TX: usize = 0x90;

    const EOT: u32 = 1;

    fn setup() -> (FakeRegisters<SdioRegisters>, Sdio) {
        let fake = FakeRegisters::<SdioRegisters>::new();
        let sdio = Sdio::new(fake.regs(), 25_000_000, 390_625, 12_500_000, 8);
        (fake, sdio)
    }

    /// Every command completes immediately with the same response words:
    /// an OCR with power-up and CCS set that also echoes the CMD8 check
    /// pattern, and a version 2 CSD with C_SIZE = 0x1DFF.
    fn sd_card(fake: &FakeRegisters<SdioRegisters>) {
        fake.poke(STATUS_OFF, EOT);
        fake.poke(RSP0, 0xC0FF_81AA);
        fake.poke(RSP1, 0x1DFF_0000);
        fake.poke(RSP3, 0x4000_0000);
    }

    fn ready_card(card: CardType) -> (FakeRegisters<SdioRegisters>, Sdio) {
        let (fake, sdio) = setup();
        fake.poke(STATUS_OFF, EOT);
        sdio.card.set(Some(card));
        sdio.blocks.set(1024);
        (fake, sdio)
    }

    #[test]
    fn command_registers() {
        let (fake, sdio) = setup();
        fake.poke(STATUS_OFF, EOT);
        fake.poke(RSP0, 0x900);

        let rsp = sdio.send_command(17, ResponseType::R1, 0x1234).unwrap();
        assert_eq!(rsp[0], 0x900);
        assert_eq!(fake.peek(CMD_OP_OFF), (17 << 8) | 1);
        assert_eq!(fake.peek(CMD_ARG), 0x1234);
        assert_eq!(fake.peek(START), 1);
        assert_eq!(fake.peek(DATA_SETUP_OFF), 0);
    }

    #[test]
    fn command_errors() {
        let (fake, sdio) = setup();
        assert_eq!(sdio.send_command(0, ResponseType::None, 0), Err(ErrorCode::BUSY));

        fake.poke(STATUS_OFF, 0b10 | (1 << 16));
        assert_eq!(sdio.send_command(8, ResponseType::R7, 0x1AA), Err(ErrorCode::NOACK));

        fake.poke(STATUS_OFF, 0b10 | (2 << 16));
        assert_eq!(sdio.send_command(2, ResponseType::R2, 0), Err(ErrorCode::FAIL));
    }

    #[test]
    fn clock_divider_register() {
        let (fake, sdio) = setup();
        sdio.init();
        assert_eq!(fake.peek(CLK_DIV_OFF), (1 << 8) | 31);
        sdio.set_clock(12_500_000);
        assert_eq!(fake.peek(CLK_DIV_OFF), 1 << 8);
    }

    #[test]
    fn csd_capacity() {
        let v2 = [0, 0x1DFF_0000, 0, 0x4000_0000];
        assert_eq!(sd_csd_blocks(&v2), Some(7680 * 1024));

        // READ_BL_LEN = 10, C_SIZE = 0xFFF, C_SIZE_MULT = 7: 2 GiB.
        let mut v1 = [0u32; 4];
        v1[2] = (10 << 16) | 0x3FF;
        v1[1] = 0xC000_0000 | (7 << 15);
        assert_eq!(sd_csd_blocks(&v1), Some(4096 * 512 * 2));

        assert_eq!(sd_csd_blocks(&[0, 0, 0, 0xC000_0000]), None);
    }

    #[test]
    fn ext_csd_sector_count() {
        let mut ext_csd = [0u8; BLOCK_SIZE];
        ext_csd[212..216].copy_from_slice(&0x0074_0000u32.to_le_bytes());
        assert_eq!(ext_csd_sectors(&ext_csd), 0x0074_0000);
    }

    #[test]
    fn sd_identification() {
        let (fake, sdio) = setup();
        sd_card(&fake);

        assert_eq!(sdio.initialize(), Ok(()));
        assert_eq!(sdio.card_type(), Some(CardType::SdHc));
        assert_eq!(sdio.rca(), 0xC0FF);
        assert_eq!(sdio.block_count(), 7680 * 1024);
        assert!(sdio.is_ready());
        // Last command: CMD16 with the block length, then the fast clock.
        assert_eq!(fake.peek(CMD_OP_OFF), (16 << 8) | 1);
        assert_eq!(fake.peek(CMD_ARG), 512);
        assert_eq!(fake.peek(CLK_DIV_OFF), 1 << 8);
    }

    #[test]
    fn sd_rejects_bad_echo() {
        let (fake, sdio) = setup();
        sd_card(&fake);
        fake.poke(RSP0, 0xC0FF_81AB);
        assert_eq!(sdio.identify_sd(), Err(ErrorCode::NOSUPPORT));
    }

    #[test]
    fn sd_power_up_times_out() {
        let (fake, sdio) = setup();
        sd_card(&fake);
        fake.poke(RSP0, 0x0000_01AA);
        assert_eq!(sdio.identify_sd(), Err(ErrorCode::BUSY));
    }

    #[test]
    fn mmc_identification() {
        let (fake, sdio) = setup();
        sd_card(&fake);
        sdio.ext_csd
            .map(|ext_csd| ext_csd[212..216].copy_from_slice(&0x0074_0000u32.to_le_bytes()));

        assert_eq!(sdio.identify_mmc(), Ok(CardType::Mmc));
        assert_eq!(sdio.rca(), 1);
        assert_eq!(sdio.block_count(), 0x0074_0000);
        assert_eq!(fake.peek(UDMA_RX + 4), 512);
        assert_eq!(fake.peek(CMD_OP_OFF), (16 << 8) | 1);
    }

    #[test]
    fn mmc_without_capacity() {
        let (fake, sdio) = setup();
        sd_card(&fake);
        assert_eq!(sdio.identify_mmc(), Err(ErrorCode::NODEVICE));
    }

    #[test]
    fn single_block_read() {
        let (fake, sdio) = ready_card(CardType::SdHc);
        let mut buffer = vec![0u8; 512];

        assert_eq!(sdio.read_blocks(7, &mut buffer), Ok(()));
        assert_eq!(fake.peek(CMD_OP_OFF), (17 << 8) | 1);
        assert_eq!(fake.peek(CMD_ARG), 7);
        assert_eq!(fake.peek(UDMA_RX), buffer.as_ptr() as usize as u32);
        assert_eq!(fake.peek(UDMA_RX + 4), 512);
        // DATA_SETUP is cleared once the command completes.
        assert_eq!(fake.peek(DATA_SETUP_OFF), 0);
    }

    #[test]
    fn multi_block_write_is_split_and_stopped() {
        let (fake, sdio) = ready_card(CardType::SdSc);
        let data = vec![0u8; 300 * 512];

        assert_eq!(sdio.write_blocks(10, &data), Ok(()));
        // Second chunk: 44 blocks starting at block 266, byte addressed.
        assert_eq!(fake.peek(UDMA_TX), data[256 * 512..].as_ptr() as usize as u32);
        assert_eq!(fake.peek(UDMA_TX + 4), 44 * 512);
        assert_eq!(fake.peek(CMD_OP_OFF), (12 << 8) | 2);
    }

    #[test]
    fn transfer_checks() {
        let (_fake, sdio) = setup();
        let mut buffer = vec![0u8; 512];
        assert_eq!(sdio.read_blocks(0, &mut buffer), Err(ErrorCode::OFF));

        let (_fake, sdio) = ready_card(CardType::SdHc);
        assert_eq!(sdio.read_blocks(1024, &mut buffer), Err(ErrorCode::INVAL));
        assert_eq!(sdio.read_blocks(0, &mut buffer[..511]), Err(ErrorCode::SIZE));
    }

    #[test]
    fn data_error_clears_channel() {
        let (fake, sdio) = ready_card(CardType::SdHc);
        fake.poke(STATUS_OFF, 0b10 | (1 << 20));
        let mut buffer = vec![0u8; 1024];

        assert_eq!(sdio.read_blocks(0, &mut buffer), Err(ErrorCode::FAIL));
        assert_eq!(fake.peek(UDMA_RX + 8), 0x8);
    }
}
