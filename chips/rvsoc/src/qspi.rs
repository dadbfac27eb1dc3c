// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! QSPI controller in command mode.
//!
//! Each transfer is described by one write to `CMD`: the instruction byte,
//! how many address bytes and dummy cycles follow it, how many data lines
//! carry the data phase and its direction. Writing `CMD.START` asserts chip
//! select and runs the instruction and address phases; the data phase then
//! streams `LEN` bytes through `DATA` or through the UDMA channels. Chip
//! select is released and `STATUS.DONE` set once `LEN` bytes have moved.

use core::cell::Cell;

use rvsdk_hal::utilities::poll::poll_until;
use rvsdk_hal::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use rvsdk_hal::utilities::registers::{
    register_bitfields, register_structs, FieldValue, ReadOnly, ReadWrite, WriteOnly,
};
use rvsdk_hal::utilities::StaticRef;
use rvsdk_hal::ErrorCode;

use crate::chip_config::clock_divider;
use crate::udma::{
    Channel, ChannelLayout, UdmaPeriphRegisters, UdmaPeripheral, DMA_ENABLE, MAX_TRANSFER_SIZE,
};

register_structs! {
    pub QspiRegisters {
        (0x00 => ctrl: ReadWrite<u32, CTRL::Register>),
        (0x04 => clk_div: ReadWrite<u32, CLK_DIV::Register>),
        (0x08 => cs: ReadWrite<u32, CS::Register>),
        (0x0C => cmd: ReadWrite<u32, CMD::Register>),
        (0x10 => addr: ReadWrite<u32>),
        (0x14 => len: ReadWrite<u32>),
        (0x18 => data: ReadWrite<u32>),
        (0x1C => status: ReadOnly<u32, STATUS::Register>),
        (0x20 => status_clr: WriteOnly<u32, STATUS::Register>),
        (0x24 => _reserved0),
        (0x80 => udma: UdmaPeriphRegisters),
        (0xC0 => @END),
    }
}

register_bitfields![u32,
    CTRL [
        EN OFFSET(0) NUMBITS(1) [],
        CPOL OFFSET(1) NUMBITS(1) [],
        CPHA OFFSET(2) NUMBITS(1) [],
        LINES OFFSET(3) NUMBITS(2) [
            Single = 0,
            Dual = 1,
            Quad = 2
        ],
        DMA_EN OFFSET(5) NUMBITS(1) []
    ],
    CLK_DIV [
        DIV OFFSET(0) NUMBITS(16) []
    ],
    CS [
        /// Chip select line driven by the next command
        SEL OFFSET(0) NUMBITS(2) []
    ],
    CMD [
        OPCODE OFFSET(0) NUMBITS(8) [],
        ADDR_BYTES OFFSET(8) NUMBITS(3) [],
        DUMMY OFFSET(11) NUMBITS(5) [],
        LINES OFFSET(16) NUMBITS(2) [
            Single = 0,
            Dual = 1,
            Quad = 2
        ],
        DIR OFFSET(18) NUMBITS(1) [
            Read = 0,
            Write = 1
        ],
        START OFFSET(31) NUMBITS(1) []
    ],
    STATUS [
        BUSY OFFSET(0) NUMBITS(1) [],
        TX_FULL OFFSET(1) NUMBITS(1) [],
        RX_EMPTY OFFSET(2) NUMBITS(1) [],
        DONE OFFSET(3) NUMBITS(1) []
    ]
];

pub const QSPI0_BASE: StaticRef<QspiRegisters> =
    unsafe { StaticRef::new(0x1014_0000 as *const QspiRegisters) };

/// Data lines used by a phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Lines {
    Single,
    Dual,
    Quad,
}

impl Lines {
    fn ctrl(self) -> FieldValue<u32, CTRL::Register> {
        match self {
            Lines::Single => CTRL::LINES::Single,
            Lines::Dual => CTRL::LINES::Dual,
            Lines::Quad => CTRL::LINES::Quad,
        }
    }

    fn cmd(self) -> FieldValue<u32, CMD::Register> {
        match self {
            Lines::Single => CMD::LINES::Single,
            Lines::Dual => CMD::LINES::Dual,
            Lines::Quad => CMD::LINES::Quad,
        }
    }

    pub(crate) fn bits(self) -> u32 {
        match self {
            Lines::Single => 0,
            Lines::Dual => 1,
            Lines::Quad => 2,
        }
    }
}

/// Clock polarity and phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpiMode {
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QspiConfig {
    /// Serial clock in Hz.
    pub freq: u32,
    pub mode: SpiMode,
    /// Default width of the data phase.
    pub lines: Lines,
}

/// Instruction, address and dummy phases of one transfer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QspiCommand {
    pub opcode: u8,
    pub address: u32,
    /// 0 for instructions without an address phase, otherwise 1 to 4.
    pub address_bytes: u8,
    pub dummy_cycles: u8,
    pub lines: Lines,
}

impl QspiCommand {
    /// Instruction without address or dummy phase, single line.
    pub const fn instruction(opcode: u8) -> QspiCommand {
        QspiCommand {
            opcode,
            address: 0,
            address_bytes: 0,
            dummy_cycles: 0,
            lines: Lines::Single,
        }
    }

    /// Instruction followed by a 24-bit address, single line.
    pub const fn addressed(opcode: u8, address: u32) -> QspiCommand {
        QspiCommand {
            opcode,
            address,
            address_bytes: 3,
            dummy_cycles: 0,
            lines: Lines::Single,
        }
    }
}

pub struct Qspi {
    registers: StaticRef<QspiRegisters>,
    peripheral_freq: u32,
    poll_budget: u32,
    lines: Cell<Lines>,
}

impl Qspi {
    pub const fn new(base: StaticRef<QspiRegisters>, peripheral_freq: u32, poll_budget: u32) -> Qspi {
        Qspi {
            registers: base,
            peripheral_freq,
            poll_budget,
            lines: Cell::new(Lines::Single),
        }
    }

    fn udma(&self) -> UdmaPeripheral<'_> {
        UdmaPeripheral::new(&self.registers.udma, ChannelLayout::P2m)
    }

    pub fn init(&self, config: QspiConfig) {
        let div = clock_divider(self.peripheral_freq, config.freq, 0xFFFF);
        let (cpol, cpha) = match config.mode {
            SpiMode::Mode0 => (0, 0),
            SpiMode::Mode1 => (0, 1),
            SpiMode::Mode2 => (1, 0),
            SpiMode::Mode3 => (1, 1),
        };
        self.lines.set(config.lines);

        self.registers.ctrl.write(CTRL::EN::CLEAR);
        self.registers.clk_div.write(CLK_DIV::DIV.val(div));
        self.registers.ctrl.write(
            CTRL::EN::SET + CTRL::CPOL.val(cpol) + CTRL::CPHA.val(cpha) + config.lines.ctrl(),
        );
        log::debug!("qspi: {} Hz, div {}, {:?}", config.freq, div, config.mode);
    }

    /// Default data-phase width set by [`Qspi::init`].
    pub fn lines(&self) -> Lines {
        self.lines.get()
    }

    pub fn set_chip_select(&self, line: u8) {
        self.registers.cs.write(CS::SEL.val(line as u32 & 0x3));
    }

    pub fn is_busy(&self) -> bool {
        self.registers.status.is_set(STATUS::BUSY)
    }

    fn issue(&self, command: &QspiCommand, len: usize, write: bool) {
        debug_assert!(command.address_bytes <= 4);
        debug_assert!(command.dummy_cycles < 32);
        let dir = if write { CMD::DIR::Write } else { CMD::DIR::Read };

        self.registers
            .status_clr
            .write(STATUS::DONE::SET);
        self.registers.addr.set(command.address);
        self.registers.len.set(len as u32);
        self.registers.cmd.write(
            CMD::OPCODE.val(command.opcode as u32)
                + CMD::ADDR_BYTES.val(command.address_bytes as u32)
                + CMD::DUMMY.val(command.dummy_cycles as u32)
                + command.lines.cmd()
                + dir
                + CMD::START::SET,
        );
    }

    fn wait_done(&self) -> Result<(), ErrorCode> {
        poll_until(self.poll_budget, || self.registers.status.is_set(STATUS::DONE)).map_err(
            |timeout| {
                log::warn!("qspi: transfer timed out");
                ErrorCode::from(timeout)
            },
        )?;
        self.registers.status_clr.write(STATUS::DONE::SET);
        Ok(())
    }

    /// Send a bare instruction byte.
    pub fn command(&self, opcode: u8) -> Result<(), ErrorCode> {
        self.issue(&QspiCommand::instruction(opcode), 0, true);
        self.wait_done()
    }

    /// Run `command` and read `buffer.len()` bytes through the RX FIFO.
    pub fn transfer_read(&self, command: &QspiCommand, buffer: &mut [u8]) -> Result<(), ErrorCode> {
        self.issue(command, buffer.len(), false);
        for byte in buffer.iter_mut() {
            poll_until(self.poll_budget, || {
                !self.registers.status.is_set(STATUS::RX_EMPTY)
            })?;
            *byte = self.registers.data.get() as u8;
        }
        self.wait_done()
    }

    /// Run `command` and write `data` through the TX FIFO.
    pub fn transfer_write(&self, command: &QspiCommand, data: &[u8]) -> Result<(), ErrorCode> {
        self.issue(command, data.len(), true);
        for &byte in data {
            poll_until(self.poll_budget, || {
                !self.registers.status.is_set(STATUS::TX_FULL)
            })?;
            self.registers.data.set(byte as u32);
        }
        self.wait_done()
    }

    fn dma(&self, channel: Channel) -> Result<(), ErrorCode> {
        let result = self.wait_done();
        self.registers.ctrl.modify(CTRL::DMA_EN::CLEAR);
        if result.is_err() {
            self.udma().clear_channel(channel);
        }
        result
    }

    /// Run `command` and read the data phase into `buffer` through the UDMA
    /// RX channel.
    pub fn read_dma(&self, command: &QspiCommand, buffer: &mut [u8]) -> Result<(), ErrorCode> {
        if buffer.is_empty() || buffer.len() > MAX_TRANSFER_SIZE as usize {
            return Err(ErrorCode::SIZE);
        }
        self.registers.ctrl.modify(CTRL::DMA_EN::SET);
        self.udma().enqueue_channel(
            buffer.as_mut_ptr() as usize,
            buffer.len() as u32,
            DMA_ENABLE,
            Channel::Rx,
        );
        self.issue(command, buffer.len(), false);
        self.dma(Channel::Rx)
    }

    /// Run `command` and send `data` as the data phase through the UDMA TX
    /// channel.
    pub fn write_dma(&self, command: &QspiCommand, data: &[u8]) -> Result<(), ErrorCode> {
        if data.is_empty() || data.len() > MAX_TRANSFER_SIZE as usize {
            return Err(ErrorCode::SIZE);
        }
        self.registers.ctrl.modify(CTRL::DMA_EN::SET);
        self.udma().enqueue_channel(
            data.as_ptr() as usize,
            data.len() as u32,
            DMA_ENABLE,
            Channel::Tx,
        );
        self.issue(command, data.len(), true);
        self.dma(Channel::Tx)
    }
}
