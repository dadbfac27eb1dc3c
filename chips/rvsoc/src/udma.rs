// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Micro-DMA (UDMA) channels.
//!
//! Every DMA-capable peripheral on the SoC carries its own UDMA config block:
//! three channel descriptors (RX, TX and CMD) followed by an interrupt
//! enable/status/clear triad. A transfer is started by writing the buffer
//! address, then the length, then the channel configuration word. The
//! configuration write arms the channel, so address and length must already
//! be valid when it happens.
//!
//! | Offset | Register      | Description                                    |
//! |--------|---------------|------------------------------------------------|
//! | 0x00   | RX descriptor | `SADDR`, `SIZE`, `CFG`, `SADDR_HI`             |
//! | 0x10   | TX descriptor |                                                |
//! | 0x20   | CMD descriptor|                                                |
//! | 0x30   | `CH_IRQ_EN`   | one bit per channel event                      |
//! | 0x34   | `CH_IRQ_STAT` | pending events, read only                      |
//! | 0x38   | `CH_IRQ_CLR`  | write 1 to acknowledge an event                |
//!
//! The driver does not track buffer ownership. Callers must keep a buffer
//! alive and untouched until the channel reports completion or has been
//! cleared with [`UdmaPeripheral::clear_channel`].
//!
//! The UDMA engine itself (`UDMA0`) gates and resets the channel logic of each
//! peripheral; see [`UdmaCtrl`].

use rvsdk_hal::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use rvsdk_hal::utilities::registers::{
    register_bitfields, register_structs, Field, FieldValue, ReadOnly, ReadWrite, WriteOnly,
};
use rvsdk_hal::utilities::StaticRef;

/// Largest transfer a single descriptor can describe, in bytes.
pub const MAX_TRANSFER_SIZE: u32 = (1 << 20) - 1;

register_structs! {
    /// One channel descriptor.
    pub UdmaChannelRegisters {
        /// Buffer start address
        (0x00 => saddr: ReadWrite<u32>),
        /// Transfer length in bytes
        (0x04 => size: ReadWrite<u32, SIZE::Register>),
        /// Channel configuration
        (0x08 => cfg: ReadWrite<u32, CFG::Register>),
        /// Upper address bits, PA2M-generation peripherals only
        (0x0C => saddr_hi: ReadWrite<u32>),
        (0x10 => @END),
    },

    /// UDMA config block embedded in each DMA-capable peripheral.
    pub UdmaPeriphRegisters {
        (0x00 => rx: UdmaChannelRegisters),
        (0x10 => tx: UdmaChannelRegisters),
        (0x20 => cmd: UdmaChannelRegisters),
        /// Channel interrupt enable
        (0x30 => irq_en: ReadWrite<u32, CH_IRQ::Register>),
        /// Channel interrupt status
        (0x34 => irq_stat: ReadOnly<u32, CH_IRQ::Register>),
        /// Channel interrupt clear
        (0x38 => irq_clr: WriteOnly<u32, CH_IRQ::Register>),
        (0x3C => _reserved0),
        (0x40 => @END),
    },

    /// UDMA engine control.
    pub UdmaCtrlRegisters {
        /// Per-peripheral channel clock gate, 1 = running
        (0x00 => cg: ReadWrite<u32, PERIPH::Register>),
        /// Per-peripheral channel reset, 1 = held in reset
        (0x04 => rst: ReadWrite<u32, PERIPH::Register>),
        /// Event selectors routed to the event unit
        (0x08 => evt_sel: ReadWrite<u32, EVT_SEL::Register>),
        (0x0C => @END),
    }
}

register_bitfields![u32,
    pub SIZE [
        SIZE OFFSET(0) NUMBITS(20) []
    ],
    pub CFG [
        /// Restart from the start address when the transfer completes
        CONTINUOUS OFFSET(0) NUMBITS(1) [],
        /// Channel enable; cleared by hardware on completion in normal mode
        EN OFFSET(1) NUMBITS(1) [],
        /// A transfer is queued behind the current one
        PENDING OFFSET(2) NUMBITS(1) [],
        /// Abort the transfer and reset the channel counters
        CLR OFFSET(3) NUMBITS(1) []
    ],
    CH_IRQ [
        RX_FULL OFFSET(0) NUMBITS(1) [],
        RX_HALF OFFSET(1) NUMBITS(1) [],
        RX_ERR OFFSET(2) NUMBITS(1) [],
        TX_FULL OFFSET(4) NUMBITS(1) [],
        TX_HALF OFFSET(5) NUMBITS(1) [],
        TX_ERR OFFSET(6) NUMBITS(1) [],
        CMD_FULL OFFSET(8) NUMBITS(1) [],
        CMD_HALF OFFSET(9) NUMBITS(1) [],
        CMD_ERR OFFSET(10) NUMBITS(1) []
    ],
    PERIPH [
        USART0 OFFSET(0) NUMBITS(1) [],
        USART1 OFFSET(1) NUMBITS(1) [],
        QSPI0 OFFSET(2) NUMBITS(1) [],
        I3C0 OFFSET(3) NUMBITS(1) [],
        I3C1 OFFSET(4) NUMBITS(1) [],
        SDIO0 OFFSET(5) NUMBITS(1) []
    ],
    EVT_SEL [
        EVT0 OFFSET(0) NUMBITS(8) [],
        EVT1 OFFSET(8) NUMBITS(8) [],
        EVT2 OFFSET(16) NUMBITS(8) [],
        EVT3 OFFSET(24) NUMBITS(8) []
    ]
];

/// Channel configuration word written to `CFG`.
pub type ChannelConfig = FieldValue<u32, CFG::Register>;

/// Start a single transfer.
pub const DMA_ENABLE: ChannelConfig = CFG::EN::SET;

pub const UDMA0_BASE: StaticRef<UdmaCtrlRegisters> =
    unsafe { StaticRef::new(0x1010_0000 as *const UdmaCtrlRegisters) };

/// The three channels of a peripheral's UDMA config block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Channel {
    /// Peripheral to memory
    Rx,
    /// Memory to peripheral
    Tx,
    /// Command stream, memory to peripheral
    Cmd,
}

/// Events each channel can raise.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IrqEvent {
    /// The whole buffer was transferred.
    TransferComplete,
    /// Half of the buffer was transferred.
    HalfTransfer,
    /// The bus returned an error response.
    ResponseError,
}

/// Descriptor layout generations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChannelLayout {
    /// 32-bit addresses; `SADDR_HI` is reserved and never written.
    P2m,
    /// `SADDR_HI` carries the address bits above 32.
    Pa2m,
}

fn irq_field(channel: Channel, event: IrqEvent) -> Field<u32, CH_IRQ::Register> {
    match (channel, event) {
        (Channel::Rx, IrqEvent::TransferComplete) => CH_IRQ::RX_FULL,
        (Channel::Rx, IrqEvent::HalfTransfer) => CH_IRQ::RX_HALF,
        (Channel::Rx, IrqEvent::ResponseError) => CH_IRQ::RX_ERR,
        (Channel::Tx, IrqEvent::TransferComplete) => CH_IRQ::TX_FULL,
        (Channel::Tx, IrqEvent::HalfTransfer) => CH_IRQ::TX_HALF,
        (Channel::Tx, IrqEvent::ResponseError) => CH_IRQ::TX_ERR,
        (Channel::Cmd, IrqEvent::TransferComplete) => CH_IRQ::CMD_FULL,
        (Channel::Cmd, IrqEvent::HalfTransfer) => CH_IRQ::CMD_HALF,
        (Channel::Cmd, IrqEvent::ResponseError) => CH_IRQ::CMD_ERR,
    }
}

/// Write a descriptor. `cfg` goes last since it arms the channel.
fn arm<A, S, C>(saddr: &A, size: &S, cfg: &C, address: u32, len: u32, config: u32)
where
    A: Writeable<T = u32>,
    S: Writeable<T = u32>,
    C: Writeable<T = u32>,
{
    saddr.set(address);
    size.set(len);
    cfg.set(config);
}

/// Write a PA2M descriptor: the high address word, then the 32-bit
/// descriptor.
fn arm_wide<H, A, S, C>(
    saddr_hi: &H,
    saddr: &A,
    size: &S,
    cfg: &C,
    address: u64,
    len: u32,
    config: u32,
) where
    H: Writeable<T = u32>,
    A: Writeable<T = u32>,
    S: Writeable<T = u32>,
    C: Writeable<T = u32>,
{
    saddr_hi.set((address >> 32) as u32);
    arm(saddr, size, cfg, address as u32, len, config);
}

/// Handle on one peripheral's UDMA config block.
pub struct UdmaPeripheral<'a> {
    registers: &'a UdmaPeriphRegisters,
    layout: ChannelLayout,
}

impl<'a> UdmaPeripheral<'a> {
    pub const fn new(registers: &'a UdmaPeriphRegisters, layout: ChannelLayout) -> Self {
        UdmaPeripheral { registers, layout }
    }

    fn channel(&self, channel: Channel) -> &UdmaChannelRegisters {
        match channel {
            Channel::Rx => &self.registers.rx,
            Channel::Tx => &self.registers.tx,
            Channel::Cmd => &self.registers.cmd,
        }
    }

    /// Queue `size` bytes at `address` on `channel`.
    ///
    /// The hardware starts as soon as `config` is written if it contains
    /// `CFG::EN`.
    pub fn enqueue_channel(
        &self,
        address: usize,
        size: u32,
        config: ChannelConfig,
        channel: Channel,
    ) {
        self.enqueue_channel_wide(address as u64, size, config, channel);
    }

    /// Like [`enqueue_channel`](Self::enqueue_channel), for bus addresses
    /// wider than the CPU's pointers. Only a PA2M block can reach above
    /// 4 GiB; a P2M block drops the high word.
    pub fn enqueue_channel_wide(
        &self,
        address: u64,
        size: u32,
        config: ChannelConfig,
        channel: Channel,
    ) {
        debug_assert!(size <= MAX_TRANSFER_SIZE);
        let regs = self.channel(channel);
        match self.layout {
            ChannelLayout::Pa2m => arm_wide(
                &regs.saddr_hi,
                &regs.saddr,
                &regs.size,
                &regs.cfg,
                address,
                size,
                config.value,
            ),
            ChannelLayout::P2m => arm(
                &regs.saddr,
                &regs.size,
                &regs.cfg,
                address as u32,
                size,
                config.value,
            ),
        }
    }

    /// Abort whatever `channel` is doing and reset its counters. The
    /// descriptor's address and size are left as they were.
    pub fn clear_channel(&self, channel: Channel) {
        self.channel(channel).cfg.write(CFG::CLR::SET);
    }

    /// Whether `channel` is still moving data or has a transfer queued.
    pub fn is_busy(&self, channel: Channel) -> bool {
        let cfg = self.channel(channel).cfg.extract();
        cfg.is_set(CFG::EN) || cfg.is_set(CFG::PENDING)
    }

    /// Bytes the channel still has to move.
    pub fn remaining(&self, channel: Channel) -> u32 {
        self.channel(channel).size.read(SIZE::SIZE)
    }

    /// Enable or disable the interrupt for `event` on `channel`. Pending
    /// status is not affected.
    pub fn it_config(&self, channel: Channel, event: IrqEvent, enable: bool) {
        let field = irq_field(channel, event);
        self.registers.irq_en.modify(field.val(enable as u32));
    }

    pub fn is_it_enabled(&self, channel: Channel, event: IrqEvent) -> bool {
        self.registers.irq_en.is_set(irq_field(channel, event))
    }

    pub fn get_it_status(&self, channel: Channel, event: IrqEvent) -> bool {
        self.registers.irq_stat.is_set(irq_field(channel, event))
    }

    /// Acknowledge `event` on `channel`.
    pub fn clear_it_status(&self, channel: Channel, event: IrqEvent) {
        self.registers
            .irq_clr
            .write(irq_field(channel, event).val(1));
    }
}

/// Peripherals whose channel logic the UDMA engine gates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UdmaPeriphId {
    Usart0,
    Usart1,
    Qspi0,
    I3c0,
    I3c1,
    Sdio0,
}

impl UdmaPeriphId {
    fn field(self) -> Field<u32, PERIPH::Register> {
        match self {
            UdmaPeriphId::Usart0 => PERIPH::USART0,
            UdmaPeriphId::Usart1 => PERIPH::USART1,
            UdmaPeriphId::Qspi0 => PERIPH::QSPI0,
            UdmaPeriphId::I3c0 => PERIPH::I3C0,
            UdmaPeriphId::I3c1 => PERIPH::I3C1,
            UdmaPeriphId::Sdio0 => PERIPH::SDIO0,
        }
    }
}

/// The UDMA engine.
pub struct UdmaCtrl {
    registers: StaticRef<UdmaCtrlRegisters>,
}

impl UdmaCtrl {
    pub const fn new(base: StaticRef<UdmaCtrlRegisters>) -> UdmaCtrl {
        UdmaCtrl { registers: base }
    }

    /// Ungate the channel logic of `periph` and release it from reset.
    pub fn enable_peripheral(&self, periph: UdmaPeriphId) {
        self.registers.cg.modify(periph.field().val(1));
        self.registers.rst.modify(periph.field().val(0));
    }

    pub fn disable_peripheral(&self, periph: UdmaPeriphId) {
        self.registers.cg.modify(periph.field().val(0));
    }

    pub fn is_enabled(&self, periph: UdmaPeriphId) -> bool {
        self.registers.cg.is_set(periph.field())
    }

    /// Pulse the channel reset of `periph`.
    pub fn reset_peripheral(&self, periph: UdmaPeriphId) {
        self.registers.rst.modify(periph.field().val(1));
        self.registers.rst.modify(periph.field().val(0));
    }

    /// Route `event` to event selector `slot` (0 to 3).
    pub fn set_event(&self, slot: usize, event: u8) {
        let event = event as u32;
        match slot {
            0 => self.registers.evt_sel.modify(EVT_SEL::EVT0.val(event)),
            1 => self.registers.evt_sel.modify(EVT_SEL::EVT1.val(event)),
            2 => self.registers.evt_sel.modify(EVT_SEL::EVT2.val(event)),
            3 => self.registers.evt_sel.modify(EVT_SEL::EVT3.val(event)),
            _ => debug_assert!(false, "udma: no event selector {}", slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRegisters;
    use core::cell::RefCell;
    use rvsdk_hal::utilities::registers::interfaces::Writeable;
    use std::vec::Vec;

    const RX: usize = 0x00;
    const TX: usize = 0x10;
    const CMD: usize = 0x20;
    const SADDR: usize = 0x0;
    const SIZE_OFF: usize = 0x4;
    const CFG_OFF: usize = 0x8;
    const SADDR_HI: usize = 0xC;
    const IRQ_EN: usize = 0x30;
    const IRQ_STAT: usize = 0x34;
    const IRQ_CLR: usize = 0x38;

    const SENTINEL: u32 = 0xA5A5_5A5A;

    fn fill(fake: &FakeRegisters<UdmaPeriphRegisters>) {
        for offset in (0..0x40).step_by(4) {
            fake.poke(offset, SENTINEL);
        }
    }

    struct Recorder<'a> {
        name: &'static str,
        log: &'a RefCell<Vec<(&'static str, u32)>>,
    }

    impl Writeable for Recorder<'_> {
        type T = u32;
        type R = ();

        fn set(&self, value: u32) {
            self.log.borrow_mut().push((self.name, value));
        }
    }

    #[test]
    fn descriptor_is_written_address_size_config() {
        let log = RefCell::new(Vec::new());
        let saddr = Recorder { name: "saddr", log: &log };
        let size = Recorder { name: "size", log: &log };
        let cfg = Recorder { name: "cfg", log: &log };

        arm(&saddr, &size, &cfg, 0x3000_0000, 64, 0x2);

        assert_eq!(
            *log.borrow(),
            [("saddr", 0x3000_0000), ("size", 64), ("cfg", 0x2)]
        );
    }

    #[test]
    fn enqueue_tx_channel() {
        let fake = FakeRegisters::<UdmaPeriphRegisters>::new();
        let udma = UdmaPeripheral::new(fake.get(), ChannelLayout::P2m);

        udma.enqueue_channel(0x3000_0000, 64, DMA_ENABLE, Channel::Tx);

        assert_eq!(fake.peek(TX + SADDR), 0x3000_0000);
        assert_eq!(fake.peek(TX + SIZE_OFF), 64);
        assert_eq!(fake.peek(TX + CFG_OFF), 0x2);
    }

    #[test]
    fn enqueue_touches_only_the_selected_channel() {
        for (channel, base) in [(Channel::Rx, RX), (Channel::Tx, TX), (Channel::Cmd, CMD)] {
            for (address, size) in [(0x0, 0), (0x1000_0004, 1), (0xFFFF_FFFC, MAX_TRANSFER_SIZE)] {
                let fake = FakeRegisters::<UdmaPeriphRegisters>::new();
                fill(&fake);
                let udma = UdmaPeripheral::new(fake.get(), ChannelLayout::P2m);

                udma.enqueue_channel(address, size, DMA_ENABLE, channel);

                for offset in (0..0x40usize).step_by(4) {
                    let expected = match offset.checked_sub(base) {
                        Some(SADDR) => address as u32,
                        Some(SIZE_OFF) => size,
                        Some(CFG_OFF) => 0x2,
                        _ => SENTINEL,
                    };
                    assert_eq!(fake.peek(offset), expected, "offset {:#x}", offset);
                }
            }
        }
    }

    #[test]
    fn pa2m_layout_writes_high_address() {
        let fake = FakeRegisters::<UdmaPeriphRegisters>::new();
        fill(&fake);
        let udma = UdmaPeripheral::new(fake.get(), ChannelLayout::Pa2m);

        udma.enqueue_channel_wide(0x1_2345_6000, 16, DMA_ENABLE, Channel::Rx);

        assert_eq!(fake.peek(RX + SADDR_HI), 1);
        assert_eq!(fake.peek(RX + SADDR), 0x2345_6000);
        assert_eq!(fake.peek(RX + SIZE_OFF), 16);
        assert_eq!(fake.peek(RX + CFG_OFF), 0x2);
        assert_eq!(fake.peek(TX + SADDR_HI), SENTINEL);

        // A 32-bit address still clears a stale high word.
        udma.enqueue_channel(0x8000_1000, 16, DMA_ENABLE, Channel::Rx);
        assert_eq!(fake.peek(RX + SADDR_HI), 0);
        assert_eq!(fake.peek(RX + SADDR), 0x8000_1000);
    }

    #[test]
    fn p2m_layout_leaves_high_word_alone() {
        let fake = FakeRegisters::<UdmaPeriphRegisters>::new();
        fill(&fake);
        let udma = UdmaPeripheral::new(fake.get(), ChannelLayout::P2m);

        udma.enqueue_channel(0x8000_1000, 16, DMA_ENABLE, Channel::Rx);

        assert_eq!(fake.peek(RX + SADDR_HI), SENTINEL);
        assert_eq!(fake.peek(RX + SADDR), 0x8000_1000);
    }

    #[test]
    fn wide_descriptor_writes_high_word_first() {
        let log = RefCell::new(Vec::new());
        let saddr_hi = Recorder { name: "saddr_hi", log: &log };
        let saddr = Recorder { name: "saddr", log: &log };
        let size = Recorder { name: "size", log: &log };
        let cfg = Recorder { name: "cfg", log: &log };

        arm_wide(&saddr_hi, &saddr, &size, &cfg, 0x1_2345_6000, 16, 0x2);

        assert_eq!(
            *log.borrow(),
            [
                ("saddr_hi", 1),
                ("saddr", 0x2345_6000),
                ("size", 16),
                ("cfg", 0x2)
            ]
        );
    }

    #[test]
    fn clear_channel_only_sets_clr() {
        for (channel, base) in [(Channel::Rx, RX), (Channel::Tx, TX), (Channel::Cmd, CMD)] {
            let fake = FakeRegisters::<UdmaPeriphRegisters>::new();
            let udma = UdmaPeripheral::new(fake.get(), ChannelLayout::P2m);
            udma.enqueue_channel(0x2000_0000, 128, DMA_ENABLE, channel);

            udma.clear_channel(channel);

            assert_eq!(fake.peek(base + CFG_OFF), 0x8);
            assert_eq!(fake.peek(base + SADDR), 0x2000_0000);
            assert_eq!(fake.peek(base + SIZE_OFF), 128);
        }
    }

    #[test]
    fn busy_follows_enable_and_pending() {
        let fake = FakeRegisters::<UdmaPeriphRegisters>::new();
        let udma = UdmaPeripheral::new(fake.get(), ChannelLayout::P2m);
        assert!(!udma.is_busy(Channel::Rx));

        fake.poke(RX + CFG_OFF, 0x2);
        assert!(udma.is_busy(Channel::Rx));
        fake.poke(RX + CFG_OFF, 0x4);
        assert!(udma.is_busy(Channel::Rx));
        fake.poke(RX + CFG_OFF, 0x0);
        fake.poke(RX + SIZE_OFF, 12);
        assert!(!udma.is_busy(Channel::Rx));
        assert_eq!(udma.remaining(Channel::Rx), 12);
    }

    #[test]
    fn irq_enable_bits() {
        let fake = FakeRegisters::<UdmaPeriphRegisters>::new();
        let udma = UdmaPeripheral::new(fake.get(), ChannelLayout::P2m);

        udma.it_config(Channel::Rx, IrqEvent::TransferComplete, true);
        udma.it_config(Channel::Tx, IrqEvent::HalfTransfer, true);
        udma.it_config(Channel::Cmd, IrqEvent::ResponseError, true);
        assert_eq!(fake.peek(IRQ_EN), 0b100_0010_0001);
        assert!(udma.is_it_enabled(Channel::Tx, IrqEvent::HalfTransfer));
        assert!(!udma.is_it_enabled(Channel::Tx, IrqEvent::TransferComplete));

        udma.it_config(Channel::Tx, IrqEvent::HalfTransfer, false);
        assert_eq!(fake.peek(IRQ_EN), 0b100_0000_0001);
    }

    #[test]
    fn irq_disable_is_idempotent() {
        let fake = FakeRegisters::<UdmaPeriphRegisters>::new();
        let udma = UdmaPeripheral::new(fake.get(), ChannelLayout::P2m);
        udma.it_config(Channel::Rx, IrqEvent::TransferComplete, true);
        udma.it_config(Channel::Cmd, IrqEvent::TransferComplete, true);

        udma.it_config(Channel::Rx, IrqEvent::TransferComplete, false);
        let once = fake.peek(IRQ_EN);
        udma.it_config(Channel::Rx, IrqEvent::TransferComplete, false);

        assert_eq!(fake.peek(IRQ_EN), once);
        assert_eq!(once, 1 << 8);
    }

    #[test]
    fn enabling_does_not_clear_status() {
        let fake = FakeRegisters::<UdmaPeriphRegisters>::new();
        let udma = UdmaPeripheral::new(fake.get(), ChannelLayout::P2m);
        fake.poke(IRQ_STAT, 1 << 4);

        udma.it_config(Channel::Tx, IrqEvent::TransferComplete, true);

        assert!(udma.get_it_status(Channel::Tx, IrqEvent::TransferComplete));
        assert!(!udma.get_it_status(Channel::Rx, IrqEvent::TransferComplete));
    }

    #[test]
    fn clear_status_writes_one_bit() {
        let fake = FakeRegisters::<UdmaPeriphRegisters>::new();
        let udma = UdmaPeripheral::new(fake.get(), ChannelLayout::P2m);

        udma.clear_it_status(Channel::Cmd, IrqEvent::HalfTransfer);
        assert_eq!(fake.peek(IRQ_CLR), 1 << 9);
        udma.clear_it_status(Channel::Rx, IrqEvent::ResponseError);
        assert_eq!(fake.peek(IRQ_CLR), 1 << 2);
    }

    #[test]
    fn engine_gates_and_resets() {
        let fake = FakeRegisters::<UdmaCtrlRegisters>::new();
        let ctrl = UdmaCtrl::new(fake.regs());
        fake.poke(0x04, 0x3F);

        ctrl.enable_peripheral(UdmaPeriphId::I3c0);
        ctrl.enable_peripheral(UdmaPeriphId::Sdio0);
        assert_eq!(fake.peek(0x00), (1 << 3) | (1 << 5));
        assert_eq!(fake.peek(0x04), 0x3F & !((1 << 3) | (1 << 5)));
        assert!(ctrl.is_enabled(UdmaPeriphId::I3c0));
        assert!(!ctrl.is_enabled(UdmaPeriphId::Usart0));

        ctrl.disable_peripheral(UdmaPeriphId::I3c0);
        assert_eq!(fake.peek(0x00), 1 << 5);

        ctrl.reset_peripheral(UdmaPeriphId::Usart1);
        assert_eq!(fake.peek(0x04) & (1 << 1), 0);

        ctrl.set_event(2, 0x7E);
        assert_eq!(fake.peek(0x08), 0x7E << 16);
    }
}
