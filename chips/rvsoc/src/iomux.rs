// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Pad multiplexer.
//!
//! Each of the 64 pads has one configuration register selecting which
//! peripheral drives it, its pull resistor, drive strength and input
//! Schmitt trigger. Pads come out of reset as GPIO with no pull.

use rvsdk_hal::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use rvsdk_hal::utilities::registers::{register_bitfields, register_structs, ReadWrite};
use rvsdk_hal::utilities::StaticRef;
use rvsdk_hal::ErrorCode;

pub const NUM_PADS: usize = 64;

register_structs! {
    pub IomuxRegisters {
        (0x000 => pad: [ReadWrite<u32, PAD::Register>; NUM_PADS]),
        (0x100 => @END),
    }
}

register_bitfields![u32,
    PAD [
        FUNC OFFSET(0) NUMBITS(2) [
            Gpio = 0,
            Alt1 = 1,
            Alt2 = 2,
            Alt3 = 3
        ],
        PULL OFFSET(2) NUMBITS(2) [
            None = 0,
            Up = 1,
            Down = 2
        ],
        DRIVE OFFSET(4) NUMBITS(2) [],
        SCHMITT OFFSET(6) NUMBITS(1) []
    ]
];

pub const IOMUX_BASE: StaticRef<IomuxRegisters> =
    unsafe { StaticRef::new(0x1001_0000 as *const IomuxRegisters) };

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Function {
    Gpio,
    Alt1,
    Alt2,
    Alt3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pull {
    None,
    Up,
    Down,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DriveStrength {
    Ma2,
    Ma4,
    Ma8,
    Ma12,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PadConfig {
    pub function: Function,
    pub pull: Pull,
    pub drive: DriveStrength,
    pub schmitt: bool,
}

impl PadConfig {
    pub const fn new(function: Function) -> PadConfig {
        PadConfig {
            function,
            pull: Pull::None,
            drive: DriveStrength::Ma4,
            schmitt: false,
        }
    }

    pub const fn pull(self, pull: Pull) -> PadConfig {
        PadConfig { pull, ..self }
    }

    pub const fn drive(self, drive: DriveStrength) -> PadConfig {
        PadConfig { drive, ..self }
    }

    pub const fn schmitt(self, schmitt: bool) -> PadConfig {
        PadConfig { schmitt, ..self }
    }
}

/// Pads used by the on-chip peripherals.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PinGroup {
    /// TX on pad 0, RX on pad 1.
    Usart0,
    /// SCL on pad 4, SDA on pad 5.
    I3c0,
    /// SCK, CS, then IO0 to IO3 on pads 8 to 13.
    Qspi0,
    /// CLK, CMD, then D0 to D3 on pads 16 to 21.
    Sdio0,
}

const OUT: PadConfig = PadConfig::new(Function::Alt1);
const IN: PadConfig = PadConfig::new(Function::Alt1).schmitt(true);
const OPEN_DRAIN: PadConfig = PadConfig::new(Function::Alt1).pull(Pull::Up).schmitt(true);
const FAST_IO: PadConfig = PadConfig::new(Function::Alt1).drive(DriveStrength::Ma8);
const FAST_IO_PULLED: PadConfig = FAST_IO.pull(Pull::Up);

const USART0_PADS: [(usize, PadConfig); 2] = [(0, OUT), (1, IN.pull(Pull::Up))];
const I3C0_PADS: [(usize, PadConfig); 2] = [(4, OPEN_DRAIN), (5, OPEN_DRAIN)];
const QSPI0_PADS: [(usize, PadConfig); 6] = [
    (8, FAST_IO),
    (9, FAST_IO_PULLED),
    (10, FAST_IO),
    (11, FAST_IO),
    (12, FAST_IO_PULLED),
    (13, FAST_IO_PULLED),
];
const SDIO0_PADS: [(usize, PadConfig); 6] = [
    (16, FAST_IO),
    (17, FAST_IO_PULLED),
    (18, FAST_IO_PULLED),
    (19, FAST_IO_PULLED),
    (20, FAST_IO_PULLED),
    (21, FAST_IO_PULLED),
];

impl PinGroup {
    pub fn pads(self) -> &'static [(usize, PadConfig)] {
        match self {
            PinGroup::Usart0 => &USART0_PADS,
            PinGroup::I3c0 => &I3C0_PADS,
            PinGroup::Qspi0 => &QSPI0_PADS,
            PinGroup::Sdio0 => &SDIO0_PADS,
        }
    }
}

pub struct Iomux {
    registers: StaticRef<IomuxRegisters>,
}

impl Iomux {
    pub const fn new(base: StaticRef<IomuxRegisters>) -> Iomux {
        Iomux { registers: base }
    }

    fn pad(&self, pin: usize) -> Result<&ReadWrite<u32, PAD::Register>, ErrorCode> {
        self.registers.pad.get(pin).ok_or(ErrorCode::INVAL)
    }

    pub fn set_function(&self, pin: usize, function: Function) -> Result<(), ErrorCode> {
        let func = match function {
            Function::Gpio => PAD::FUNC::Gpio,
            Function::Alt1 => PAD::FUNC::Alt1,
            Function::Alt2 => PAD::FUNC::Alt2,
            Function::Alt3 => PAD::FUNC::Alt3,
        };
        self.pad(pin)?.modify(func);
        Ok(())
    }

    pub fn function(&self, pin: usize) -> Result<Function, ErrorCode> {
        let function = match self.pad(pin)?.read(PAD::FUNC) {
            0 => Function::Gpio,
            1 => Function::Alt1,
            2 => Function::Alt2,
            _ => Function::Alt3,
        };
        Ok(function)
    }

    pub fn set_pull(&self, pin: usize, pull: Pull) -> Result<(), ErrorCode> {
        let pull = match pull {
            Pull::None => PAD::PULL::None,
            Pull::Up => PAD::PULL::Up,
            Pull::Down => PAD::PULL::Down,
        };
        self.pad(pin)?.modify(pull);
        Ok(())
    }

    pub fn set_drive(&self, pin: usize, drive: DriveStrength) -> Result<(), ErrorCode> {
        self.pad(pin)?.modify(PAD::DRIVE.val(drive as u32));
        Ok(())
    }

    /// Write the whole pad configuration at once.
    pub fn configure(&self, pin: usize, config: PadConfig) -> Result<(), ErrorCode> {
        let pad = self.pad(pin)?;
        pad.set(0);
        self.set_function(pin, config.function)?;
        self.set_pull(pin, config.pull)?;
        self.set_drive(pin, config.drive)?;
        pad.modify(PAD::SCHMITT.val(config.schmitt as u32));
        Ok(())
    }

    pub fn configure_group(&self, group: PinGroup) {
        log::debug!("iomux: routing {:?}", group);
        for &(pin, config) in group.pads() {
            // Group tables only name pads below NUM_PADS.
            let _ = self.configure(pin, config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRegisters;

    fn setup() -> (FakeRegisters<IomuxRegisters>, Iomux) {
        let fake = FakeRegisters::<IomuxRegisters>::new();
        let iomux = Iomux::new(fake.regs());
        (fake, iomux)
    }

    #[test]
    fn single_fields() {
        let (fake, iomux) = setup();
        assert_eq!(iomux.set_function(3, Function::Alt2), Ok(()));
        assert_eq!(iomux.set_pull(3, Pull::Down), Ok(()));
        assert_eq!(iomux.set_drive(3, DriveStrength::Ma12), Ok(()));
        assert_eq!(fake.peek(3 * 4), 0b11_10_10);
        assert_eq!(iomux.function(3), Ok(Function::Alt2));
        assert_eq!(fake.peek(2 * 4), 0);
        assert_eq!(fake.peek(4 * 4), 0);
    }

    #[test]
    fn configure_replaces_pad() {
        let (fake, iomux) = setup();
        fake.poke(63 * 4, 0x7F);
        let config = PadConfig::new(Function::Alt1).pull(Pull::Up);
        assert_eq!(iomux.configure(63, config), Ok(()));
        assert_eq!(fake.peek(63 * 4), 0b01_01_01);
    }

    #[test]
    fn pad_out_of_range() {
        let (_fake, iomux) = setup();
        assert_eq!(iomux.set_function(64, Function::Gpio), Err(ErrorCode::INVAL));
        assert_eq!(iomux.function(100), Err(ErrorCode::INVAL));
    }

    #[test]
    fn groups() {
        let (fake, iomux) = setup();
        iomux.configure_group(PinGroup::I3c0);
        assert_eq!(fake.peek(4 * 4), 0b1_01_01_01);
        assert_eq!(fake.peek(5 * 4), 0b1_01_01_01);

        iomux.configure_group(PinGroup::Sdio0);
        for pin in 16..22 {
            assert_eq!(iomux.function(pin), Ok(Function::Alt1));
        }
        assert_eq!(fake.peek(16 * 4), 0b10_00_01);
        assert_eq!(fake.peek(22 * 4), 0);

        for group in [PinGroup::Usart0, PinGroup::I3c0, PinGroup::Qspi0, PinGroup::Sdio0] {
            assert!(group.pads().iter().all(|&(pin, _)| pin < NUM_PADS));
        }
    }
}
