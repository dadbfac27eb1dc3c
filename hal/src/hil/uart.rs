// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Hardware interface layer (HIL) traits for UART communication.
//!
//! Two styles of transfer are offered. The blocking traits ([`Transmit`] and
//! [`Receive`]) spin on the peripheral with a bounded budget. The buffer
//! traits ([`TransmitBuffer`] and [`ReceiveBuffer`]) hand a `'static` buffer
//! to the DMA engine and return it through a client callback once the
//! peripheral interrupt reports completion.

use crate::ErrorCode;

/// Number of stop bits to send after each word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopBits {
    /// Include a single stop bit.
    One = 1,
    /// Include two stop bits.
    Two = 2,
}

/// Parity bit configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parity {
    /// No parity bit.
    None = 0,
    /// Add a parity bit to ensure an odd number of 1 bits in the word.
    Odd = 1,
    /// Add a parity bit to ensure an even number of 1 bits in the word.
    Even = 2,
}

/// Number of bits in each word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Width {
    /// Seven bits per word.
    Seven = 7,
    /// Eight bits per word.
    Eight = 8,
    /// Nine bits per word.
    Nine = 9,
}

/// UART parameters for configuring the bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Parameters {
    /// Baud rate in bit/s.
    pub baud_rate: u32,
    /// Number of bits per word.
    pub width: Width,
    /// Parity bit configuration.
    pub parity: Parity,
    /// Number of stop bits per word.
    pub stop_bits: StopBits,
    /// Whether UART flow control is enabled.
    pub hw_flow_control: bool,
}

/// The type of error encountered during UART receive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// No error occurred and the command completed successfully
    None,
    /// Parity error during receive
    ParityError,
    /// Framing error during receive
    FramingError,
    /// Overrun error during receive
    OverrunError,
    /// Repeat call of transmit or receive before initial command complete
    RepeatCallError,
    /// UART hardware was reset
    ResetError,
    /// Read or write was aborted early
    Aborted,
}

/// Configure a UART peripheral.
pub trait Configure {
    /// Returns `Err(ErrorCode::OFF)` if the peripheral is not clocked,
    /// `Err(ErrorCode::INVAL)` if the baud rate cannot be reached from the
    /// peripheral clock and `Err(ErrorCode::NOSUPPORT)` for unsupported
    /// combinations of width, parity or flow control.
    fn configure(&self, params: Parameters) -> Result<(), ErrorCode>;
}

/// Blocking transmission.
pub trait Transmit {
    /// Send every byte of `data`, waiting for room in the transmitter between
    /// bytes. Returns `Err(ErrorCode::BUSY)` if the transmitter stalls.
    fn transmit(&self, data: &[u8]) -> Result<(), ErrorCode>;
}

/// Blocking reception.
pub trait Receive {
    /// Fill `buffer`, waiting a bounded time for each byte. Returns the number
    /// of bytes received before a stall, or an error if a line error was
    /// detected.
    fn receive(&self, buffer: &mut [u8]) -> Result<usize, ErrorCode>;
}

/// DMA-driven transmission of a `'static` buffer.
pub trait TransmitBuffer<'a> {
    /// Set the client that is told when a transmission completes.
    fn set_transmit_client(&self, client: &'a dyn TransmitClient);

    /// Start transmitting the first `tx_len` bytes of `tx_buffer`.
    ///
    /// On error the buffer is handed straight back. `ErrorCode::BUSY` means a
    /// transmission is already in progress, `ErrorCode::SIZE` that `tx_len`
    /// exceeds the buffer or the DMA transfer limit.
    fn transmit_buffer(
        &self,
        tx_buffer: &'static mut [u8],
        tx_len: usize,
    ) -> Result<(), (ErrorCode, &'static mut [u8])>;

    /// Abort an in-flight transmission. The client is called back with
    /// `ErrorCode::CANCEL`.
    fn transmit_abort(&self) -> Result<(), ErrorCode>;
}

/// DMA-driven reception into a `'static` buffer.
pub trait ReceiveBuffer<'a> {
    /// Set the client that is told when a reception completes.
    fn set_receive_client(&self, client: &'a dyn ReceiveClient);

    /// Start receiving `rx_len` bytes into `rx_buffer`.
    fn receive_buffer(
        &self,
        rx_buffer: &'static mut [u8],
        rx_len: usize,
    ) -> Result<(), (ErrorCode, &'static mut [u8])>;

    /// Abort an in-flight reception. The client is called back with
    /// `ErrorCode::CANCEL` and the number of bytes already received.
    fn receive_abort(&self) -> Result<(), ErrorCode>;
}

/// Trait implemented by a UART transmitter to receive callbacks.
pub trait TransmitClient {
    /// A call to [`TransmitBuffer::transmit_buffer`] completed.
    fn transmitted_buffer(
        &self,
        tx_buffer: &'static mut [u8],
        tx_len: usize,
        rval: Result<(), ErrorCode>,
    );
}

/// Trait implemented by a UART receiver to receive callbacks.
pub trait ReceiveClient {
    /// A call to [`ReceiveBuffer::receive_buffer`] completed.
    fn received_buffer(
        &self,
        rx_buffer: &'static mut [u8],
        rx_len: usize,
        rval: Result<(), ErrorCode>,
        error: Error,
    );
}

/// Trait that isn't required for basic UART operation, but provides useful
/// abstractions that capsules may want to be able to leverage.
pub trait Uart: Configure + Transmit + Receive {}
impl<T: Configure + Transmit + Receive> Uart for T {}
