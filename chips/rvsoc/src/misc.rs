// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! MISC block: submodule clock gates, resets and clock dividers.
//!
//! Every peripheral owns one bit in a clock-gate register and the same bit in
//! the matching reset register. A set reset bit holds the submodule in reset.
//! Peripherals must be clocked before they are released from reset, which is
//! what [`Misc::bring_up`] does.

use rvsdk_hal::platform::chip::ClockInterface;
use rvsdk_hal::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use rvsdk_hal::utilities::registers::{
    register_bitfields, register_structs, Field, ReadWrite, RegisterLongName,
};
use rvsdk_hal::utilities::StaticRef;

register_structs! {
    pub MiscRegisters {
        (0x00 => subm_clk_ctrl0: ReadWrite<u32, SUBM0::Register>),
        (0x04 => subm_clk_ctrl1: ReadWrite<u32, SUBM1::Register>),
        (0x08 => subm_reset_ctrl0: ReadWrite<u32, SUBM0::Register>),
        (0x0C => subm_reset_ctrl1: ReadWrite<u32, SUBM1::Register>),
        (0x10 => usart_clk_div: ReadWrite<u32, CLK_DIV::Register>),
        (0x14 => qspi_clk_div: ReadWrite<u32, CLK_DIV::Register>),
        (0x18 => sdio_clk_div: ReadWrite<u32, CLK_DIV::Register>),
        (0x1C => i3c_clk_div: ReadWrite<u32, CLK_DIV::Register>),
        (0x20 => @END),
    }
}

register_bitfields![u32,
    SUBM0 [
        UDMA0 OFFSET(0) NUMBITS(1) [],
        USART0 OFFSET(1) NUMBITS(1) [],
        USART1 OFFSET(2) NUMBITS(1) [],
        QSPI0 OFFSET(3) NUMBITS(1) [],
        QSPI_XIP OFFSET(4) NUMBITS(1) [],
        I3C0 OFFSET(5) NUMBITS(1) [],
        I3C1 OFFSET(6) NUMBITS(1) [],
        SDIO0 OFFSET(7) NUMBITS(1) [],
        IOMUX OFFSET(8) NUMBITS(1) []
    ],
    SUBM1 [
        GPIO0 OFFSET(0) NUMBITS(1) [],
        TIMER0 OFFSET(1) NUMBITS(1) [],
        WDT OFFSET(2) NUMBITS(1) []
    ],
    CLK_DIV [
        DIV OFFSET(0) NUMBITS(8) [],
        /// Latch `DIV` into the clock generator. Self-clearing.
        UPDATE OFFSET(31) NUMBITS(1) []
    ]
];

pub const MISC_BASE: StaticRef<MiscRegisters> =
    unsafe { StaticRef::new(0x1000_0000 as *const MiscRegisters) };

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Peripheral {
    Udma0,
    Usart0,
    Usart1,
    Qspi0,
    QspiXip,
    I3c0,
    I3c1,
    Sdio0,
    Iomux,
    Gpio0,
    Timer0,
    Wdt,
}

/// Where a peripheral's clock-gate and reset bit lives.
enum Gate {
    Ctrl0(Field<u32, SUBM0::Register>),
    Ctrl1(Field<u32, SUBM1::Register>),
}

impl Peripheral {
    fn gate(self) -> Gate {
        match self {
            Peripheral::Udma0 => Gate::Ctrl0(SUBM0::UDMA0),
            Peripheral::Usart0 => Gate::Ctrl0(SUBM0::USART0),
            Peripheral::Usart1 => Gate::Ctrl0(SUBM0::USART1),
            Peripheral::Qspi0 => Gate::Ctrl0(SUBM0::QSPI0),
            Peripheral::QspiXip => Gate::Ctrl0(SUBM0::QSPI_XIP),
            Peripheral::I3c0 => Gate::Ctrl0(SUBM0::I3C0),
            Peripheral::I3c1 => Gate::Ctrl0(SUBM0::I3C1),
            Peripheral::Sdio0 => Gate::Ctrl0(SUBM0::SDIO0),
            Peripheral::Iomux => Gate::Ctrl0(SUBM0::IOMUX),
            Peripheral::Gpio0 => Gate::Ctrl1(SUBM1::GPIO0),
            Peripheral::Timer0 => Gate::Ctrl1(SUBM1::TIMER0),
            Peripheral::Wdt => Gate::Ctrl1(SUBM1::WDT),
        }
    }
}

/// Peripherals with their own programmable clock divider.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DividedClock {
    Usart,
    Qspi,
    Sdio,
    I3c,
}

fn write_bit<R: RegisterLongName>(register: &ReadWrite<u32, R>, field: Field<u32, R>, set: bool) {
    register.modify(field.val(set as u32));
}

pub struct Misc {
    registers: StaticRef<MiscRegisters>,
}

impl Misc {
    pub const fn new(base: StaticRef<MiscRegisters>) -> Misc {
        Misc { registers: base }
    }

    fn set_clock(&self, peripheral: Peripheral, enabled: bool) {
        match peripheral.gate() {
            Gate::Ctrl0(field) => write_bit(&self.registers.subm_clk_ctrl0, field, enabled),
            Gate::Ctrl1(field) => write_bit(&self.registers.subm_clk_ctrl1, field, enabled),
        }
    }

    fn set_reset(&self, peripheral: Peripheral, held: bool) {
        match peripheral.gate() {
            Gate::Ctrl0(field) => write_bit(&self.registers.subm_reset_ctrl0, field, held),
            Gate::Ctrl1(field) => write_bit(&self.registers.subm_reset_ctrl1, field, held),
        }
    }

    pub fn enable_clock(&self, peripheral: Peripheral) {
        self.set_clock(peripheral, true);
    }

    pub fn disable_clock(&self, peripheral: Peripheral) {
        self.set_clock(peripheral, false);
    }

    pub fn is_clock_enabled(&self, peripheral: Peripheral) -> bool {
        match peripheral.gate() {
            Gate::Ctrl0(field) => self.registers.subm_clk_ctrl0.is_set(field),
            Gate::Ctrl1(field) => self.registers.subm_clk_ctrl1.is_set(field),
        }
    }

    pub fn assert_reset(&self, peripheral: Peripheral) {
        self.set_reset(peripheral, true);
    }

    pub fn deassert_reset(&self, peripheral: Peripheral) {
        self.set_reset(peripheral, false);
    }

    pub fn is_in_reset(&self, peripheral: Peripheral) -> bool {
        match peripheral.gate() {
            Gate::Ctrl0(field) => self.registers.subm_reset_ctrl0.is_set(field),
            Gate::Ctrl1(field) => self.registers.subm_reset_ctrl1.is_set(field),
        }
    }

    /// Clock the peripheral, then release it from reset.
    pub fn bring_up(&self, peripheral: Peripheral) {
        self.enable_clock(peripheral);
        self.deassert_reset(peripheral);
        log::debug!("misc: {:?} up", peripheral);
    }

    /// Hold the peripheral in reset, then gate its clock.
    pub fn shut_down(&self, peripheral: Peripheral) {
        self.assert_reset(peripheral);
        self.disable_clock(peripheral);
    }

    fn divider_register(&self, clock: DividedClock) -> &ReadWrite<u32, CLK_DIV::Register> {
        match clock {
            DividedClock::Usart => &self.registers.usart_clk_div,
            DividedClock::Qspi => &self.registers.qspi_clk_div,
            DividedClock::Sdio => &self.registers.sdio_clk_div,
            DividedClock::I3c => &self.registers.i3c_clk_div,
        }
    }

    pub fn set_divider(&self, clock: DividedClock, div: u8) {
        self.divider_register(clock)
            .write(CLK_DIV::DIV.val(div as u32) + CLK_DIV::UPDATE::SET);
    }

    pub fn divider(&self, clock: DividedClock) -> u8 {
        self.divider_register(clock).read(CLK_DIV::DIV) as u8
    }
}

macro_rules! named_gates {
    ($($peripheral:ident => $clk_en:ident, $clk_dis:ident, $set_rst:ident, $clr_rst:ident;)*) => {
        impl Misc {
            $(
                pub fn $clk_en(&self) {
                    self.enable_clock(Peripheral::$peripheral)
                }

                pub fn $clk_dis(&self) {
                    self.disable_clock(Peripheral::$peripheral)
                }

                pub fn $set_rst(&self) {
                    self.assert_reset(Peripheral::$peripheral)
                }

                pub fn $clr_rst(&self) {
                    self.deassert_reset(Peripheral::$peripheral)
                }
            )*
        }
    };
}

named_gates! {
    Udma0 => udma0_clk_en, udma0_clk_dis, udma0_set_rst, udma0_clr_rst;
    Usart0 => usart0_clk_en, usart0_clk_dis, usart0_set_rst, usart0_clr_rst;
    Usart1 => usart1_clk_en, usart1_clk_dis, usart1_set_rst, usart1_clr_rst;
    Qspi0 => qspi0_clk_en, qspi0_clk_dis, qspi0_set_rst, qspi0_clr_rst;
    QspiXip => qspi_xip_clk_en, qspi_xip_clk_dis, qspi_xip_set_rst, qspi_xip_clr_rst;
    I3c0 => i3c0_clk_en, i3c0_clk_dis, i3c0_set_rst, i3c0_clr_rst;
    I3c1 => i3c1_clk_en, i3c1_clk_dis, i3c1_set_rst, i3c1_clr_rst;
    Sdio0 => sdio0_clk_en, sdio0_clk_dis, sdio0_set_rst, sdio0_clr_rst;
    Iomux => iomux_clk_en, iomux_clk_dis, iomux_set_rst, iomux_clr_rst;
    Gpio0 => gpio0_clk_en, gpio0_clk_dis, gpio0_set_rst, gpio0_clr_rst;
    Timer0 => timer0_clk_en, timer0_clk_dis, timer0_set_rst, timer0_clr_rst;
    Wdt => wdt_clk_en, wdt_clk_dis, wdt_set_rst, wdt_clr_rst;
}

/// One peripheral's clock gate, for drivers that take a `ClockInterface`.
pub struct PeripheralClock<'a> {
    misc: &'a Misc,
    peripheral: Peripheral,
}

impl<'a> PeripheralClock<'a> {
    pub const fn new(misc: &'a Misc, peripheral: Peripheral) -> Self {
        PeripheralClock { misc, peripheral }
    }
}

impl ClockInterface for PeripheralClock<'_> {
    fn is_enabled(&self) -> bool {
        self.misc.is_clock_enabled(self.peripheral)
    }

    fn enable(&self) {
        self.misc.enable_clock(self.peripheral);
    }

    fn disable(&self) {
        self.misc.disable_clock(self.peripheral);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRegisters;

    fn setup() -> (FakeRegisters<MiscRegisters>, Misc) {
        let fake = FakeRegisters::<MiscRegisters>::new();
        let misc = Misc::new(fake.regs());
        (fake, misc)
    }

    #[test]
    fn gates_touch_only_their_bit() {
        let (fake, misc) = setup();
        fake.poke(0x00, 0b1_0000_0001);
        misc.enable_clock(Peripheral::Sdio0);
        assert_eq!(fake.peek(0x00), 0b1_1000_0001);
        misc.disable_clock(Peripheral::Udma0);
        assert_eq!(fake.peek(0x00), 0b1_1000_0000);
        assert!(misc.is_clock_enabled(Peripheral::Iomux));
        assert!(!misc.is_clock_enabled(Peripheral::Udma0));
        assert_eq!(fake.peek(0x04), 0);
    }

    #[test]
    fn second_bank() {
        let (fake, misc) = setup();
        misc.enable_clock(Peripheral::Wdt);
        misc.assert_reset(Peripheral::Timer0);
        assert_eq!(fake.peek(0x04), 0b100);
        assert_eq!(fake.peek(0x0C), 0b010);
        assert_eq!(fake.peek(0x00), 0);
        assert_eq!(fake.peek(0x08), 0);
        assert!(misc.is_in_reset(Peripheral::Timer0));
        assert!(!misc.is_in_reset(Peripheral::Gpio0));
    }

    #[test]
    fn bring_up_from_reset() {
        let (fake, misc) = setup();
        // Out of power-on reset everything is gated and held.
        fake.poke(0x08, 0x1FF);
        fake.poke(0x0C, 0x7);

        misc.bring_up(Peripheral::I3c0);
        assert!(misc.is_clock_enabled(Peripheral::I3c0));
        assert!(!misc.is_in_reset(Peripheral::I3c0));
        assert_eq!(fake.peek(0x00), 1 << 5);
        assert_eq!(fake.peek(0x08), 0x1FF & !(1 << 5));

        misc.shut_down(Peripheral::I3c0);
        assert_eq!(fake.peek(0x00), 0);
        assert_eq!(fake.peek(0x08), 0x1FF);
    }

    #[test]
    fn named_accessors() {
        let (fake, misc) = setup();
        misc.udma0_clk_en();
        misc.usart1_clk_en();
        misc.gpio0_clk_en();
        misc.sdio0_set_rst();
        assert_eq!(fake.peek(0x00), 0b101);
        assert_eq!(fake.peek(0x04), 0b1);
        assert_eq!(fake.peek(0x08), 1 << 7);

        misc.sdio0_clr_rst();
        misc.udma0_clk_dis();
        assert_eq!(fake.peek(0x08), 0);
        assert_eq!(fake.peek(0x00), 0b100);
    }

    #[test]
    fn dividers() {
        let (fake, misc) = setup();
        misc.set_divider(DividedClock::Qspi, 3);
        misc.set_divider(DividedClock::I3c, 0xFF);
        assert_eq!(fake.peek(0x14), (1 << 31) | 3);
        assert_eq!(fake.peek(0x1C), (1 << 31) | 0xFF);
        assert_eq!(fake.peek(0x10), 0);
        assert_eq!(misc.divider(DividedClock::Qspi), 3);
        assert_eq!(misc.divider(DividedClock::I3c), 0xFF);
        assert_eq!(misc.divider(DividedClock::Sdio), 0);
    }

    #[test]
    fn peripheral_clock() {
        let (fake, misc) = setup();
        let clock = PeripheralClock::new(&misc, Peripheral::Qspi0);
        assert!(!clock.is_enabled());
        clock.enable();
        assert!(clock.is_enabled());
        assert_eq!(fake.peek(0x00), 1 << 3);
        clock.disable();
        assert!(!clock.is_enabled());
    }
}
