// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! USART driver.
//!
//! Bytes can be moved either through the `DR` register, polled, or in bulk
//! through the UDMA RX and TX channels. DMA transfers started through the
//! `hil::uart` buffer traits complete in [`Usart::handle_interrupt`], which the
//! board calls from the USART interrupt vector.

use core::cell::Cell;

use rvsdk_hal::hil;
use rvsdk_hal::utilities::cells::{OptionalCell, TakeCell};
use rvsdk_hal::utilities::poll::poll_until;
use rvsdk_hal::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use rvsdk_hal::utilities::registers::{
    register_bitfields, register_structs, Field, ReadOnly, ReadWrite, WriteOnly,
};
use rvsdk_hal::utilities::StaticRef;
use rvsdk_hal::ErrorCode;

use crate::udma::{
    Channel, ChannelLayout, IrqEvent, UdmaPeriphRegisters, UdmaPeripheral, DMA_ENABLE,
    MAX_TRANSFER_SIZE,
};

register_structs! {
    pub UsartRegisters {
        (0x00 => dr: ReadWrite<u32>),
        (0x04 => sr: ReadOnly<u32, SR::Register>),
        (0x08 => sr_clr: WriteOnly<u32, SR::Register>),
        (0x0C => brr: ReadWrite<u32, BRR::Register>),
        (0x10 => cr1: ReadWrite<u32, CR1::Register>),
        (0x14 => cr2: ReadWrite<u32, CR2::Register>),
        (0x18 => cr3: ReadWrite<u32, CR3::Register>),
        (0x1C => _reserved0),
        (0x80 => udma: UdmaPeriphRegisters),
        (0xC0 => @END),
    }
}

register_bitfields![u32,
    SR [
        TXE OFFSET(0) NUMBITS(1) [],
        RXNE OFFSET(1) NUMBITS(1) [],
        TC OFFSET(2) NUMBITS(1) [],
        PE OFFSET(3) NUMBITS(1) [],
        FE OFFSET(4) NUMBITS(1) [],
        ORE OFFSET(5) NUMBITS(1) [],
        BUSY OFFSET(6) NUMBITS(1) []
    ],
    BRR [
        DIV OFFSET(0) NUMBITS(20) []
    ],
    CR1 [
        UE OFFSET(0) NUMBITS(1) [],
        TE OFFSET(1) NUMBITS(1) [],
        RE OFFSET(2) NUMBITS(1) [],
        M OFFSET(3) NUMBITS(2) [
            Seven = 0,
            Eight = 1,
            Nine = 2
        ],
        PCE OFFSET(5) NUMBITS(1) [],
        PS OFFSET(6) NUMBITS(1) [
            Even = 0,
            Odd = 1
        ],
        STOP OFFSET(7) NUMBITS(1) [
            One = 0,
            Two = 1
        ]
    ],
    CR2 [
        RXNEIE OFFSET(0) NUMBITS(1) [],
        TCIE OFFSET(1) NUMBITS(1) [],
        PEIE OFFSET(2) NUMBITS(1) [],
        ERRIE OFFSET(3) NUMBITS(1) []
    ],
    CR3 [
        DMAT OFFSET(0) NUMBITS(1) [],
        DMAR OFFSET(1) NUMBITS(1) []
    ]
];

pub const USART0_BASE: StaticRef<UsartRegisters> =
    unsafe { StaticRef::new(0x1012_0000 as *const UsartRegisters) };
pub const USART1_BASE: StaticRef<UsartRegisters> =
    unsafe { StaticRef::new(0x1012_1000 as *const UsartRegisters) };

/// Status flags in `SR`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flag {
    TxEmpty,
    RxNotEmpty,
    TransmitComplete,
    ParityError,
    FramingError,
    Overrun,
    Busy,
}

impl Flag {
    fn field(self) -> Field<u32, SR::Register> {
        match self {
            Flag::TxEmpty => SR::TXE,
            Flag::RxNotEmpty => SR::RXNE,
            Flag::TransmitComplete => SR::TC,
            Flag::ParityError => SR::PE,
            Flag::FramingError => SR::FE,
            Flag::Overrun => SR::ORE,
            Flag::Busy => SR::BUSY,
        }
    }
}

/// Interrupt sources in `CR2`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Interrupt {
    RxNotEmpty,
    TransmitComplete,
    ParityError,
    /// Framing and overrun errors.
    Error,
}

impl Interrupt {
    fn field(self) -> Field<u32, CR2::Register> {
        match self {
            Interrupt::RxNotEmpty => CR2::RXNEIE,
            Interrupt::TransmitComplete => CR2::TCIE,
            Interrupt::ParityError => CR2::PEIE,
            Interrupt::Error => CR2::ERRIE,
        }
    }
}

/// Baud divider for `baud_rate` from `clock`, rounded to nearest.
fn baud_divider(clock: u32, baud_rate: u32) -> Result<u32, ErrorCode> {
    if baud_rate == 0 {
        return Err(ErrorCode::INVAL);
    }
    let div = (clock as u64 + baud_rate as u64 / 2) / baud_rate as u64;
    if div == 0 || div > BRR::DIV.mask as u64 {
        return Err(ErrorCode::INVAL);
    }
    Ok(div as u32)
}

pub struct Usart<'a> {
    registers: StaticRef<UsartRegisters>,
    peripheral_freq: u32,
    poll_budget: u32,
    tx_client: OptionalCell<&'a dyn hil::uart::TransmitClient>,
    rx_client: OptionalCell<&'a dyn hil::uart::ReceiveClient>,
    tx_buffer: TakeCell<'static, [u8]>,
    tx_len: Cell<usize>,
    rx_buffer: TakeCell<'static, [u8]>,
    rx_len: Cell<usize>,
}

impl<'a> Usart<'a> {
    pub const fn new(
        base: StaticRef<UsartRegisters>,
        peripheral_freq: u32,
        poll_budget: u32,
    ) -> Usart<'a> {
        Usart {
            registers: base,
            peripheral_freq,
            poll_budget,
            tx_client: OptionalCell::empty(),
            rx_client: OptionalCell::empty(),
            tx_buffer: TakeCell::empty(),
            tx_len: Cell::new(0),
            rx_buffer: TakeCell::empty(),
            rx_len: Cell::new(0),
        }
    }

    fn udma(&self) -> UdmaPeripheral<'_> {
        UdmaPeripheral::new(&self.registers.udma, ChannelLayout::P2m)
    }

    /// Program frame format and baud rate, then enable the transmitter and
    /// the receiver.
    pub fn init(&self, params: hil::uart::Parameters) -> Result<(), ErrorCode> {
        if params.hw_flow_control {
            return Err(ErrorCode::NOSUPPORT);
        }
        let div = baud_divider(self.peripheral_freq, params.baud_rate)?;

        let width = match params.width {
            hil::uart::Width::Seven => CR1::M::Seven,
            hil::uart::Width::Eight => CR1::M::Eight,
            hil::uart::Width::Nine => CR1::M::Nine,
        };
        let parity = match params.parity {
            hil::uart::Parity::None => CR1::PCE::CLEAR,
            hil::uart::Parity::Even => CR1::PCE::SET + CR1::PS::Even,
            hil::uart::Parity::Odd => CR1::PCE::SET + CR1::PS::Odd,
        };
        let stop = match params.stop_bits {
            hil::uart::StopBits::One => CR1::STOP::One,
            hil::uart::StopBits::Two => CR1::STOP::Two,
        };

        self.registers.cr1.modify(CR1::UE::CLEAR);
        self.registers.brr.write(BRR::DIV.val(div));
        self.registers
            .cr1
            .write(CR1::UE::SET + CR1::TE::SET + CR1::RE::SET + width + parity + stop);
        log::debug!("usart: {} baud, div {}", params.baud_rate, div);
        Ok(())
    }

    pub fn get_flag(&self, flag: Flag) -> bool {
        self.registers.sr.is_set(flag.field())
    }

    pub fn clear_flag(&self, flag: Flag) {
        self.registers.sr_clr.write(flag.field().val(1));
    }

    pub fn it_config(&self, interrupt: Interrupt, enable: bool) {
        self.registers
            .cr2
            .modify(interrupt.field().val(enable as u32));
    }

    pub fn send_byte(&self, byte: u8) -> Result<(), ErrorCode> {
        poll_until(self.poll_budget, || self.get_flag(Flag::TxEmpty))?;
        self.registers.dr.set(byte as u32);
        Ok(())
    }

    fn line_error(&self) -> Option<hil::uart::Error> {
        let sr = self.registers.sr.extract();
        if sr.is_set(SR::PE) {
            Some(hil::uart::Error::ParityError)
        } else if sr.is_set(SR::FE) {
            Some(hil::uart::Error::FramingError)
        } else if sr.is_set(SR::ORE) {
            Some(hil::uart::Error::OverrunError)
        } else {
            None
        }
    }

    fn clear_line_errors(&self) {
        self.registers
            .sr_clr
            .write(SR::PE::SET + SR::FE::SET + SR::ORE::SET);
    }

    /// Wait for a byte. A parity, framing or overrun error is reported as
    /// `Err(ErrorCode::FAIL)` and the error flags are cleared.
    pub fn receive_byte(&self) -> Result<u8, ErrorCode> {
        poll_until(self.poll_budget, || self.get_flag(Flag::RxNotEmpty))?;
        if let Some(error) = self.line_error() {
            log::warn!("usart: receive error {:?}", error);
            self.clear_line_errors();
            return Err(ErrorCode::FAIL);
        }
        Ok(self.registers.dr.get() as u8)
    }

    fn start_tx_dma(&self, address: usize, len: usize) {
        let udma = self.udma();
        udma.clear_it_status(Channel::Tx, IrqEvent::TransferComplete);
        self.registers.cr3.modify(CR3::DMAT::SET);
        udma.enqueue_channel(address, len as u32, DMA_ENABLE, Channel::Tx);
    }

    fn start_rx_dma(&self, address: usize, len: usize) {
        let udma = self.udma();
        udma.clear_it_status(Channel::Rx, IrqEvent::TransferComplete);
        self.registers.cr3.modify(CR3::DMAR::SET);
        udma.enqueue_channel(address, len as u32, DMA_ENABLE, Channel::Rx);
    }

    fn wait_dma(&self, channel: Channel) -> Result<(), ErrorCode> {
        let udma = self.udma();
        let result = poll_until(self.poll_budget, || {
            udma.get_it_status(channel, IrqEvent::TransferComplete)
        });
        match channel {
            Channel::Rx => self.registers.cr3.modify(CR3::DMAR::CLEAR),
            _ => self.registers.cr3.modify(CR3::DMAT::CLEAR),
        }
        match result {
            Ok(()) => {
                udma.clear_it_status(channel, IrqEvent::TransferComplete);
                Ok(())
            }
            Err(timeout) => {
                log::warn!("usart: dma {:?} timed out", channel);
                udma.clear_channel(channel);
                Err(timeout.into())
            }
        }
    }

    /// Send `data` through the TX channel and wait for completion.
    pub fn transmit_dma(&self, data: &[u8]) -> Result<(), ErrorCode> {
        if data.is_empty() || data.len() > MAX_TRANSFER_SIZE as usize {
            return Err(ErrorCode::SIZE);
        }
        if self.tx_buffer.is_some() {
            return Err(ErrorCode::BUSY);
        }
        self.start_tx_dma(data.as_ptr() as usize, data.len());
        self.wait_dma(Channel::Tx)
    }

    /// Fill `buffer` through the RX channel and wait for completion.
    pub fn receive_dma(&self, buffer: &mut [u8]) -> Result<(), ErrorCode> {
        if buffer.is_empty() || buffer.len() > MAX_TRANSFER_SIZE as usize {
            return Err(ErrorCode::SIZE);
        }
        if self.rx_buffer.is_some() {
            return Err(ErrorCode::BUSY);
        }
        self.start_rx_dma(buffer.as_mut_ptr() as usize, buffer.len());
        self.wait_dma(Channel::Rx)?;
        if let Some(error) = self.line_error() {
            log::warn!("usart: receive error {:?}", error);
            self.clear_line_errors();
            return Err(ErrorCode::FAIL);
        }
        Ok(())
    }

    fn finish_rx(&self, rval: Result<(), ErrorCode>, error: hil::uart::Error) {
        let udma = self.udma();
        udma.it_config(Channel::Rx, IrqEvent::TransferComplete, false);
        udma.it_config(Channel::Rx, IrqEvent::ResponseError, false);
        self.it_config(Interrupt::ParityError, false);
        self.it_config(Interrupt::Error, false);
        self.registers.cr3.modify(CR3::DMAR::CLEAR);
        let received = self
            .rx_len
            .get()
            .saturating_sub(udma.remaining(Channel::Rx) as usize);
        let len = if rval.is_ok() {
            self.rx_len.get()
        } else {
            received
        };
        if let Some(buf) = self.rx_buffer.take() {
            self.rx_client
                .map(move |client| client.received_buffer(buf, len, rval, error));
        }
    }

    fn finish_tx(&self, rval: Result<(), ErrorCode>) {
        let udma = self.udma();
        udma.it_config(Channel::Tx, IrqEvent::TransferComplete, false);
        udma.it_config(Channel::Tx, IrqEvent::ResponseError, false);
        self.registers.cr3.modify(CR3::DMAT::CLEAR);
        let len = self.tx_len.get();
        if let Some(buf) = self.tx_buffer.take() {
            self.tx_client
                .map(move |client| client.transmitted_buffer(buf, len, rval));
        }
    }

    /// Service the USART interrupt: complete DMA transfers and report line
    /// errors to the receive client.
    pub fn handle_interrupt(&self) {
        let udma = self.udma();

        // Blocking transfers own the channel status when nothing is buffered.
        if self.tx_buffer.is_some() {
            if udma.get_it_status(Channel::Tx, IrqEvent::ResponseError) {
                udma.clear_it_status(Channel::Tx, IrqEvent::ResponseError);
                udma.clear_channel(Channel::Tx);
                self.finish_tx(Err(ErrorCode::FAIL));
            } else if udma.get_it_status(Channel::Tx, IrqEvent::TransferComplete) {
                udma.clear_it_status(Channel::Tx, IrqEvent::TransferComplete);
                self.finish_tx(Ok(()));
            }
        }

        if self.rx_buffer.is_none() {
            return;
        }
        if let Some(error) = self.line_error() {
            self.clear_line_errors();
            udma.clear_channel(Channel::Rx);
            self.finish_rx(Err(ErrorCode::FAIL), error);
        } else if udma.get_it_status(Channel::Rx, IrqEvent::ResponseError) {
            udma.clear_it_status(Channel::Rx, IrqEvent::ResponseError);
            udma.clear_channel(Channel::Rx);
            self.finish_rx(Err(ErrorCode::FAIL), hil::uart::Error::None);
        } else if udma.get_it_status(Channel::Rx, IrqEvent::TransferComplete) {
            udma.clear_it_status(Channel::Rx, IrqEvent::TransferComplete);
            self.finish_rx(Ok(()), hil::uart::Error::None);
        }
    }
}

impl hil::uart::Configure for Usart<'_> {
    fn configure(&self, params: hil::uart::Parameters) -> Result<(), ErrorCode> {
        self.init(params)
    }
}

impl hil::uart::Transmit for Usart<'_> {
    fn transmit(&self, data: &[u8]) -> Result<(), ErrorCode> {
        data.iter().try_for_each(|&byte| self.send_byte(byte))
    }
}

impl hil::uart::Receive for Usart<'_> {
    fn receive(&self, buffer: &mut [u8]) -> Result<usize, ErrorCode> {
        for (count, slot) in buffer.iter_mut().enumerate() {
            match self.receive_byte() {
                Ok(byte) => *slot = byte,
                Err(ErrorCode::BUSY) => return Ok(count),
                Err(e) => return Err(e),
            }
        }
        Ok(buffer.len())
    }
}

impl<'a> hil::uart::TransmitBuffer<'a> for Usart<'a> {
    fn set_transmit_client(&self, client: &'a dyn hil::uart::TransmitClient) {
        self.tx_client.set(client);
    }

    fn transmit_buffer(
        &self,
        tx_buffer: &'static mut [u8],
        tx_len: usize,
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        if tx_len == 0 || tx_len > tx_buffer.len() || tx_len > MAX_TRANSFER_SIZE as usize {
            return Err((ErrorCode::SIZE, tx_buffer));
        }
        if self.tx_buffer.is_some() {
            return Err((ErrorCode::BUSY, tx_buffer));
        }
        let udma = self.udma();
        udma.it_config(Channel::Tx, IrqEvent::TransferComplete, true);
        udma.it_config(Channel::Tx, IrqEvent::ResponseError, true);
        self.start_tx_dma(tx_buffer.as_ptr() as usize, tx_len);
        self.tx_len.set(tx_len);
        self.tx_buffer.replace(tx_buffer);
        Ok(())
    }

    fn transmit_abort(&self) -> Result<(), ErrorCode> {
        if self.tx_buffer.is_some() {
            self.udma().clear_channel(Channel::Tx);
            self.finish_tx(Err(ErrorCode::CANCEL));
        }
        Ok(())
    }
}

impl<'a> hil::uart::ReceiveBuffer<'a> for Usart<'a> {
    fn set_receive_client(&self, client: &'a dyn hil::uart::ReceiveClient) {
        self.rx_client.set(client);
    }

    fn receive_buffer(
        &self,
        rx_buffer: &'static mut [u8],
        rx_len: usize,
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        if rx_len == 0 || rx_len > rx_buffer.len() || rx_len > MAX_TRANSFER_SIZE as usize {
            return Err((ErrorCode::SIZE, rx_buffer));
        }
        if self.rx_buffer.is_some() {
            return Err((ErrorCode::BUSY, rx_buffer));
        }
        let udma = self.udma();
        udma.it_config(Channel::Rx, IrqEvent::TransferComplete, true);
        udma.it_config(Channel::Rx, IrqEvent::ResponseError, true);
        self.it_config(Interrupt::ParityError, true);
        self.it_config(Interrupt::Error, true);
        self.start_rx_dma(rx_buffer.as_mut_ptr() as usize, rx_len);
        self.rx_len.set(rx_len);
        self.rx_buffer.replace(rx_buffer);
        Ok(())
    }

    fn receive_abort(&self) -> Result<(), ErrorCode> {
        if self.rx_buffer.is_some() {
            self.udma().clear_channel(Channel::Rx);
            self.finish_rx(Err(ErrorCode::CANCEL), hil::uart::Error::Aborted);
        }
        Ok(())
    }
}
