// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! I3C controller, master mode.
//!
//! The controller can be driven byte by byte from the CPU or handed a command
//! stream (see [`crate::i3c_cmd`]) over its UDMA CMD channel. Only the legacy
//! I2C-compatible subset of the protocol is used: 7-bit addressing, open-drain
//! timing, no dynamic address assignment.
//!
//! DMA transfers use a three phase handshake with the controller. Once the
//! channels are armed, the driver waits for `DMA_STATUS` to report that the
//! command stream (and the data channel) were loaded, acknowledges through
//! `DMA_CLR`, then waits for the controller to leave DMA mode. If any phase
//! runs out of poll budget the channels are cleared before returning, so no
//! transfer outlives the buffers it was given.

use core::cell::Cell;

use rvsdk_hal::hil;
use rvsdk_hal::utilities::cells::MapCell;
use rvsdk_hal::utilities::poll::poll_until;
use rvsdk_hal::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use rvsdk_hal::utilities::registers::{
    register_bitfields, register_structs, Field, LocalRegisterCopy, ReadOnly, ReadWrite, WriteOnly,
};
use rvsdk_hal::utilities::StaticRef;
use rvsdk_hal::ErrorCode;

use crate::chip_config::clock_divider;
use crate::i3c_cmd::{self, CommandStream, I3C_CMD_SLV_ADDR};
use crate::udma::{Channel, ChannelLayout, UdmaPeriphRegisters, UdmaPeripheral, DMA_ENABLE};

register_structs! {
    pub I3cRegisters {
        (0x00 => ctrl: ReadWrite<u32, CTRL::Register>),
        (0x04 => clk_div: ReadWrite<u32, CLK_DIV::Register>),
        (0x08 => cmd: WriteOnly<u32, CMD::Register>),
        (0x0C => txdata: WriteOnly<u32>),
        (0x10 => rxdata: ReadOnly<u32>),
        (0x14 => status: ReadOnly<u32, STATUS::Register>),
        (0x18 => int_en: ReadWrite<u32, INT::Register>),
        (0x1C => int_stat: ReadOnly<u32, INT::Register>),
        (0x20 => int_clr: WriteOnly<u32, INT::Register>),
        (0x24 => dma_status: ReadOnly<u32, DMA_STATUS::Register>),
        (0x28 => dma_clr: WriteOnly<u32, DMA_CLR::Register>),
        (0x2C => _reserved0),
        (0x80 => udma: UdmaPeriphRegisters),
        (0xC0 => @END),
    }
}

register_bitfields![u32,
    CTRL [
        EN OFFSET(0) NUMBITS(1) [],
        MASTER OFFSET(1) NUMBITS(1) [],
        DMA_EN OFFSET(2) NUMBITS(1) [],
        FIFO_RST OFFSET(3) NUMBITS(1) []
    ],
    CLK_DIV [
        DIV OFFSET(0) NUMBITS(16) []
    ],
    CMD [
        START OFFSET(0) NUMBITS(1) [],
        STOP OFFSET(1) NUMBITS(1) [],
        WRITE OFFSET(2) NUMBITS(1) [],
        READ OFFSET(3) NUMBITS(1) [],
        ACK OFFSET(4) NUMBITS(1) []
    ],
    pub STATUS [
        BUSY OFFSET(0) NUMBITS(1) [],
        BYTE_ON_GOING OFFSET(1) NUMBITS(1) [],
        NACK OFFSET(2) NUMBITS(1) [],
        ARB_LOST OFFSET(3) NUMBITS(1) [],
        RX_VALID OFFSET(4) NUMBITS(1) [],
        PARITY_ERR OFFSET(5) NUMBITS(1) []
    ],
    INT [
        DONE OFFSET(0) NUMBITS(1) [],
        NACK OFFSET(1) NUMBITS(1) [],
        ARB_LOST OFFSET(2) NUMBITS(1) [],
        EOT OFFSET(3) NUMBITS(1) []
    ],
    DMA_STATUS [
        CMD_LOAD OFFSET(0) NUMBITS(1) [],
        TX_LOAD OFFSET(1) NUMBITS(1) [],
        RX_LOAD OFFSET(2) NUMBITS(1) [],
        MODE OFFSET(3) NUMBITS(1) []
    ],
    DMA_CLR [
        CMD OFFSET(0) NUMBITS(1) [],
        TX OFFSET(1) NUMBITS(1) [],
        RX OFFSET(2) NUMBITS(1) []
    ]
];

pub const I3C0_BASE: StaticRef<I3cRegisters> =
    unsafe { StaticRef::new(0x1016_0000 as *const I3cRegisters) };
pub const I3C1_BASE: StaticRef<I3cRegisters> =
    unsafe { StaticRef::new(0x1016_1000 as *const I3cRegisters) };

/// Snapshot of the `STATUS` register.
pub type I3cStatus = LocalRegisterCopy<u32, STATUS::Register>;

/// Bus settings applied by [`I3c::init`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct I3cConfig {
    /// SCL frequency in Hz.
    pub scl_freq: u32,
    /// Target used by the register-addressed transfers.
    pub slave_addr: u8,
    /// SCL cycles to idle after a stop before the stream ends.
    pub bus_free_cycles: u16,
}

impl I3cConfig {
    pub const fn new(scl_freq: u32) -> I3cConfig {
        I3cConfig {
            scl_freq,
            slave_addr: I3C_CMD_SLV_ADDR,
            bus_free_cycles: 20,
        }
    }
}

/// Controller interrupt sources.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum I3cInterrupt {
    Done,
    Nack,
    ArbLost,
    Eot,
}

impl I3cInterrupt {
    fn field(self) -> Field<u32, INT::Register> {
        match self {
            I3cInterrupt::Done => INT::DONE,
            I3cInterrupt::Nack => INT::NACK,
            I3cInterrupt::ArbLost => INT::ARB_LOST,
            I3cInterrupt::Eot => INT::EOT,
        }
    }
}

pub struct I3c {
    registers: StaticRef<I3cRegisters>,
    peripheral_freq: u32,
    poll_budget: u32,
    slave_addr: Cell<u8>,
    clk_div: Cell<u16>,
    bus_free: Cell<u16>,
    cmd_stream: MapCell<CommandStream>,
}

impl I3c {
    pub const fn new(
        base: StaticRef<I3cRegisters>,
        peripheral_freq: u32,
        poll_budget: u32,
    ) -> I3c {
        I3c {
            registers: base,
            peripheral_freq,
            poll_budget,
            slave_addr: Cell::new(I3C_CMD_SLV_ADDR),
            clk_div: Cell::new(0),
            bus_free: Cell::new(20),
            cmd_stream: MapCell::new(CommandStream::new()),
        }
    }

    fn udma(&self) -> UdmaPeripheral<'_> {
        UdmaPeripheral::new(&self.registers.udma, ChannelLayout::P2m)
    }

    /// Reset the FIFOs, program the SCL divider and enable the controller in
    /// master mode.
    pub fn init(&self, config: I3cConfig) {
        let div = clock_divider(self.peripheral_freq, config.scl_freq, 0xFFFF) as u16;
        self.slave_addr.set(config.slave_addr);
        self.clk_div.set(div);
        self.bus_free.set(config.bus_free_cycles);

        self.registers.ctrl.write(CTRL::FIFO_RST::SET);
        self.registers.clk_div.write(CLK_DIV::DIV.val(div as u32));
        self.registers.ctrl.write(CTRL::EN::SET + CTRL::MASTER::SET);
        log::debug!(
            "i3c: scl {} Hz, div {}, target {:#x}",
            config.scl_freq,
            div,
            config.slave_addr
        );
    }

    pub fn get_status(&self) -> I3cStatus {
        self.registers.status.extract()
    }

    fn check_bus_errors(&self) -> Result<(), ErrorCode> {
        let status = self.get_status();
        if status.is_set(STATUS::ARB_LOST) {
            log::warn!("i3c: arbitration lost");
            Err(ErrorCode::FAIL)
        } else if status.is_set(STATUS::NACK) {
            log::warn!("i3c: target did not acknowledge");
            Err(ErrorCode::NOACK)
        } else {
            Ok(())
        }
    }

    fn wait_byte(&self) -> Result<(), ErrorCode> {
        poll_until(self.poll_budget, || {
            !self.registers.status.is_set(STATUS::BYTE_ON_GOING)
        })
        .map_err(|timeout| {
            log::warn!("i3c: byte transfer timed out");
            ErrorCode::from(timeout)
        })?;
        self.check_bus_errors()
    }

    /// Generate a (repeated) start condition.
    pub fn start(&self) -> Result<(), ErrorCode> {
        self.registers
            .int_clr
            .write(INT::NACK::SET + INT::ARB_LOST::SET);
        self.registers.cmd.write(CMD::START::SET);
        self.wait_byte()
    }

    /// Generate a stop condition and wait for the bus to go idle.
    pub fn stop(&self) -> Result<(), ErrorCode> {
        self.registers.cmd.write(CMD::STOP::SET);
        poll_until(self.poll_budget, || !self.registers.status.is_set(STATUS::BUSY))?;
        Ok(())
    }

    /// Send one byte and wait for the target's acknowledge.
    pub fn write_byte(&self, byte: u8) -> Result<(), ErrorCode> {
        self.registers.txdata.set(byte as u32);
        self.registers.cmd.write(CMD::WRITE::SET);
        self.wait_byte()
    }

    /// Clock in one byte, acknowledging it if `ack`.
    pub fn read_byte(&self, ack: bool) -> Result<u8, ErrorCode> {
        self.registers
            .cmd
            .write(CMD::READ::SET + CMD::ACK.val(ack as u32));
        poll_until(self.poll_budget, || {
            self.registers.status.is_set(STATUS::RX_VALID)
        })
        .map_err(|timeout| {
            log::warn!("i3c: read timed out");
            ErrorCode::from(timeout)
        })?;
        self.check_bus_errors()?;
        Ok(self.registers.rxdata.get() as u8)
    }

    fn address(&self, addr: u8, direction: i3c_cmd::Direction) -> Result<(), ErrorCode> {
        self.write_byte((addr << 1) | direction as u8)
    }

    fn send_all(&self, data: &[u8]) -> Result<(), ErrorCode> {
        data.iter().try_for_each(|&byte| self.write_byte(byte))
    }

    fn receive_all(&self, buffer: &mut [u8]) -> Result<(), ErrorCode> {
        let last = buffer.len().saturating_sub(1);
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = self.read_byte(i != last)?;
        }
        Ok(())
    }

    /// Run `transfer` after a start condition and always finish with a stop,
    /// reporting the first error.
    fn framed<F>(&self, transfer: F) -> Result<(), ErrorCode>
    where
        F: FnOnce() -> Result<(), ErrorCode>,
    {
        let result = self.start().and_then(|()| transfer());
        let stopped = self.stop();
        result.and(stopped)
    }

    /// Write `data` to register `reg` of the configured target, CPU-polled.
    pub fn master_write_bytes(&self, reg: u8, data: &[u8]) -> Result<(), ErrorCode> {
        let slave = self.slave_addr.get();
        self.framed(|| {
            self.address(slave, i3c_cmd::Direction::Write)?;
            self.write_byte(reg)?;
            self.send_all(data)
        })
    }

    /// Fill `buffer` from the configured target, CPU-polled.
    pub fn master_read_bytes(&self, buffer: &mut [u8]) -> Result<(), ErrorCode> {
        let slave = self.slave_addr.get();
        self.framed(|| {
            self.address(slave, i3c_cmd::Direction::Read)?;
            self.receive_all(buffer)
        })
    }

    /// Write `data` to register `reg` of the configured target through the
    /// UDMA TX and CMD channels.
    pub fn master_write_bytes_dma(&self, reg: u8, data: &[u8]) -> Result<(), ErrorCode> {
        let stream = i3c_cmd::write_stream(
            self.slave_addr.get(),
            reg,
            data.len(),
            self.bus_free.get(),
        )?;
        log::trace!("i3c: dma write {} bytes to reg {:#x}", data.len(), reg);

        self.registers.ctrl.modify(CTRL::DMA_EN::SET);
        self.udma()
            .enqueue_channel(data.as_ptr() as usize, data.len() as u32, DMA_ENABLE, Channel::Tx);
        self.run_stream(stream, Channel::Tx)
    }

    /// Fill `buffer` from the configured target through the UDMA RX and CMD
    /// channels.
    pub fn master_read_bytes_dma(&self, buffer: &mut [u8]) -> Result<(), ErrorCode> {
        let stream = i3c_cmd::read_stream(
            self.slave_addr.get(),
            buffer.len(),
            self.clk_div.get(),
            self.bus_free.get(),
        )?;
        log::trace!("i3c: dma read {} bytes", buffer.len());

        self.registers.ctrl.modify(CTRL::DMA_EN::SET);
        self.udma().enqueue_channel(
            buffer.as_mut_ptr() as usize,
            buffer.len() as u32,
            DMA_ENABLE,
            Channel::Rx,
        );
        self.run_stream(stream, Channel::Rx)
    }

    /// The stream most recently handed to the CMD channel.
    pub fn command_stream(&self) -> Option<CommandStream> {
        self.cmd_stream.map(|stream| stream.clone())
    }

    fn run_stream(&self, stream: CommandStream, data: Channel) -> Result<(), ErrorCode> {
        self.cmd_stream.replace(stream);
        let queued = self.cmd_stream.map(|stream| {
            self.udma().enqueue_channel(
                stream.as_slice().as_ptr() as usize,
                stream.byte_len(),
                DMA_ENABLE,
                Channel::Cmd,
            );
        });
        if queued.is_none() {
            self.udma().clear_channel(data);
            return Err(ErrorCode::BUSY);
        }

        let result = self.dma_handshake(data);
        self.registers.ctrl.modify(CTRL::DMA_EN::CLEAR);
        if result.is_err() {
            let udma = self.udma();
            udma.clear_channel(Channel::Cmd);
            udma.clear_channel(data);
        }
        result
    }

    fn dma_handshake(&self, data: Channel) -> Result<(), ErrorCode> {
        let (loaded, clear) = match data {
            Channel::Rx => (
                DMA_STATUS::CMD_LOAD::SET + DMA_STATUS::RX_LOAD::SET,
                DMA_CLR::CMD::SET + DMA_CLR::RX::SET,
            ),
            _ => (
                DMA_STATUS::CMD_LOAD::SET + DMA_STATUS::TX_LOAD::SET,
                DMA_CLR::CMD::SET + DMA_CLR::TX::SET,
            ),
        };

        poll_until(self.poll_budget, || {
            self.registers.dma_status.matches_all(loaded)
        })
        .map_err(|timeout| {
            log::warn!("i3c: dma channels never loaded");
            ErrorCode::from(timeout)
        })?;

        self.registers.dma_clr.write(clear);

        poll_until(self.poll_budget, || {
            !self.registers.dma_status.is_set(DMA_STATUS::MODE)
        })
        .map_err(|timeout| {
            log::warn!("i3c: controller stuck in dma mode");
            ErrorCode::from(timeout)
        })?;

        self.check_bus_errors()
    }

    pub fn it_config(&self, interrupt: I3cInterrupt, enable: bool) {
        self.registers
            .int_en
            .modify(interrupt.field().val(enable as u32));
    }

    pub fn get_it_status(&self, interrupt: I3cInterrupt) -> bool {
        self.registers.int_stat.is_set(interrupt.field())
    }

    pub fn clear_it_status(&self, interrupt: I3cInterrupt) {
        self.registers.int_clr.write(interrupt.field().val(1));
    }
}

impl hil::i2c::I2CMaster for I3c {
    fn enable(&self) {
        self.registers
            .ctrl
            .modify(CTRL::EN::SET + CTRL::MASTER::SET);
    }

    fn disable(&self) {
        self.registers.ctrl.modify(CTRL::EN::CLEAR);
    }

    fn write(&self, addr: u8, data: &[u8]) -> Result<(), ErrorCode> {
        self.framed(|| {
            self.address(addr, i3c_cmd::Direction::Write)?;
            self.send_all(data)
        })
    }

    fn read(&self, addr: u8, buffer: &mut [u8]) -> Result<(), ErrorCode> {
        self.framed(|| {
            self.address(addr, i3c_cmd::Direction::Read)?;
            self.receive_all(buffer)
        })
    }

    fn write_read(&self, addr: u8, data: &[u8], buffer: &mut [u8]) -> Result<(), ErrorCode> {
        self.framed(|| {
            self.address(addr, i3c_cmd::Direction::Write)?;
            self.send_all(data)?;
            self.start()?;
            self.address(addr, i3c_cmd::Direction::Read)?;
            self.receive_all(buffer)
        })
    }
}
