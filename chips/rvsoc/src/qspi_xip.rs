// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Execute-in-place window over the QSPI flash.
//!
//! With XIP enabled, loads from the 16 MiB window at `0x2000_0000` are
//! turned into flash read commands by hardware. The read instruction, its
//! address width, dummy cycles and data lines are programmed once; `XIP_BASE`
//! selects the flash offset that appears at the start of the window.

use core::cell::Cell;

use rvsdk_hal::utilities::poll::poll_until;
use rvsdk_hal::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use rvsdk_hal::utilities::registers::{
    register_bitfields, register_structs, ReadOnly, ReadWrite,
};
use rvsdk_hal::utilities::StaticRef;
use rvsdk_hal::ErrorCode;

use crate::chip_config::clock_divider;
use crate::qspi::Lines;

register_structs! {
    pub QspiXipRegisters {
        (0x00 => xip_ctrl: ReadWrite<u32, XIP_CTRL::Register>),
        (0x04 => xip_cmd: ReadWrite<u32>),
        (0x08 => xip_base: ReadWrite<u32>),
        (0x0C => xip_status: ReadOnly<u32, XIP_STATUS::Register>),
        (0x10 => xip_clk_div: ReadWrite<u32>),
        (0x14 => @END),
    }
}

register_bitfields![u32,
    XIP_CTRL [
        EN OFFSET(0) NUMBITS(1) [],
        LINES OFFSET(1) NUMBITS(2) [],
        ADDR_BYTES OFFSET(3) NUMBITS(3) [],
        DUMMY OFFSET(6) NUMBITS(5) []
    ],
    XIP_STATUS [
        READY OFFSET(0) NUMBITS(1) [],
        BUSY OFFSET(1) NUMBITS(1) []
    ]
];

pub const QSPI_XIP_BASE: StaticRef<QspiXipRegisters> =
    unsafe { StaticRef::new(0x1014_1000 as *const QspiXipRegisters) };

pub const XIP_WINDOW_BASE: usize = 0x2000_0000;
pub const XIP_WINDOW_SIZE: usize = 16 * 1024 * 1024;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct XipConfig {
    /// Read instruction, e.g. `0x03` or `0xEB`.
    pub opcode: u8,
    pub address_bytes: u8,
    pub dummy_cycles: u8,
    pub lines: Lines,
    /// Serial clock in Hz.
    pub freq: u32,
    /// Flash offset mapped at the start of the window.
    pub flash_offset: u32,
}

impl XipConfig {
    /// Plain `READ` (0x03), 24-bit address, single line.
    pub const fn standard(freq: u32) -> XipConfig {
        XipConfig {
            opcode: 0x03,
            address_bytes: 3,
            dummy_cycles: 0,
            lines: Lines::Single,
            freq,
            flash_offset: 0,
        }
    }
}

pub struct QspiXip {
    registers: StaticRef<QspiXipRegisters>,
    window: *const u8,
    window_size: usize,
    peripheral_freq: u32,
    poll_budget: u32,
    enabled: Cell<bool>,
}

impl QspiXip {
    /// # Safety
    ///
    /// `window` must be the start of `window_size` bytes that are readable
    /// for the life of the driver whenever XIP is enabled.
    pub const unsafe fn new(
        base: StaticRef<QspiXipRegisters>,
        window: *const u8,
        window_size: usize,
        peripheral_freq: u32,
        poll_budget: u32,
    ) -> QspiXip {
        QspiXip {
            registers: base,
            window,
            window_size,
            peripheral_freq,
            poll_budget,
            enabled: Cell::new(false),
        }
    }

    /// Program the read command and enable the window. Fails with
    /// `ErrorCode::BUSY` if the controller never reports ready.
    pub fn qspi_xip_init(&self, config: XipConfig) -> Result<(), ErrorCode> {
        debug_assert!((1..=4).contains(&config.address_bytes));
        debug_assert!(config.dummy_cycles < 32);

        self.registers.xip_ctrl.modify(XIP_CTRL::EN::CLEAR);
        self.registers
            .xip_clk_div
            .set(clock_divider(self.peripheral_freq, config.freq, 0xFFFF));
        self.registers.xip_cmd.set(config.opcode as u32);
        self.registers.xip_base.set(config.flash_offset);
        self.registers.xip_ctrl.write(
            XIP_CTRL::EN::SET
                + XIP_CTRL::LINES.val(config.lines.bits())
                + XIP_CTRL::ADDR_BYTES.val(config.address_bytes as u32)
                + XIP_CTRL::DUMMY.val(config.dummy_cycles as u32),
        );

        poll_until(self.poll_budget, || {
            self.registers.xip_status.is_set(XIP_STATUS::READY)
        })
        .map_err(|timeout| {
            log::warn!("qspi-xip: controller never became ready");
            self.registers.xip_ctrl.modify(XIP_CTRL::EN::CLEAR);
            ErrorCode::from(timeout)
        })?;

        self.enabled.set(true);
        log::debug!(
            "qspi-xip: opcode {:#04x}, flash offset {:#x}",
            config.opcode,
            config.flash_offset
        );
        Ok(())
    }

    /// Close the window once any in-flight fetch has finished.
    pub fn disable(&self) -> Result<(), ErrorCode> {
        poll_until(self.poll_budget, || {
            !self.registers.xip_status.is_set(XIP_STATUS::BUSY)
        })?;
        self.registers.xip_ctrl.modify(XIP_CTRL::EN::CLEAR);
        self.enabled.set(false);
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Copy `buffer.len()` bytes starting `offset` bytes into the window.
    pub fn read(&self, offset: usize, buffer: &mut [u8]) -> Result<(), ErrorCode> {
        if !self.enabled.get() {
            return Err(ErrorCode::OFF);
        }
        match offset.checked_add(buffer.len()) {
            Some(end) if end <= self.window_size => {}
            _ => return Err(ErrorCode::INVAL),
        }
        for (i, byte) in buffer.iter_mut().enumerate() {
            // Bounds were checked against `window_size` above.
            *byte = unsafe { core::ptr::read_volatile(self.window.add(offset + i)) };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRegisters;
    use std::boxed::Box;
    use std::vec::Vec;

    fn setup(window: &'static [u8]) -> (FakeRegisters<QspiXipRegisters>, QspiXip) {
        let fake = FakeRegisters::<QspiXipRegisters>::new();
        let xip = unsafe { QspiXip::new(fake.regs(), window.as_ptr(), window.len(), 25_000_000, 8) };
        (fake, xip)
    }

    fn window() -> &'static [u8] {
        Box::leak((0..=255u8).collect::<Vec<u8>>().into_boxed_slice())
    }

    #[test]
    fn init_programs_read_command() {
        let (fake, xip) = setup(window());
        fake.poke(0x0C, 0b01);
        let config = XipConfig {
            opcode: 0xEB,
            address_bytes: 3,
            dummy_cycles: 6,
            lines: Lines::Quad,
            freq: 12_500_000,
            flash_offset: 0x10_0000,
        };

        assert_eq!(xip.qspi_xip_init(config), Ok(()));
        assert_eq!(fake.peek(0x00), 1 | (2 << 1) | (3 << 3) | (6 << 6));
        assert_eq!(fake.peek(0x04), 0xEB);
        assert_eq!(fake.peek(0x08), 0x10_0000);
        assert_eq!(fake.peek(0x10), 0);
        assert!(xip.is_enabled());
    }

    #[test]
    fn init_times_out_disabled() {
        let (fake, xip) = setup(window());
        assert_eq!(
            xip.qspi_xip_init(XipConfig::standard(1_000_000)),
            Err(ErrorCode::BUSY)
        );
        assert_eq!(fake.peek(0x00) & 1, 0);
        assert!(!xip.is_enabled());
    }

    #[test]
    fn reads_through_window() {
        let (fake, xip) = setup(window());
        let mut buffer = [0u8; 4];
        assert_eq!(xip.read(0, &mut buffer), Err(ErrorCode::OFF));

        fake.poke(0x0C, 0b01);
        xip.qspi_xip_init(XipConfig::standard(1_000_000)).unwrap();
        assert_eq!(xip.read(16, &mut buffer), Ok(()));
        assert_eq!(buffer, [16, 17, 18, 19]);
        assert_eq!(xip.read(252, &mut buffer), Ok(()));
        assert_eq!(xip.read(253, &mut buffer), Err(ErrorCode::INVAL));
        assert_eq!(xip.read(usize::MAX, &mut buffer), Err(ErrorCode::INVAL));

        assert_eq!(xip.disable(), Ok(()));
        assert_eq!(xip.read(0, &mut buffer), Err(ErrorCode::OFF));
    }

    #[test]
    fn disable_waits_for_fetch() {
        let (fake, xip) = setup(window());
        fake.poke(0x0C, 0b11);
        xip.qspi_xip_init(XipConfig::standard(1_000_000)).unwrap();
        assert_eq!(xip.disable(), Err(ErrorCode::BUSY));
        assert!(xip.is_enabled());
    }
}
