// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! I3C controller command streams.
//!
//! In DMA mode the I3C controller executes 32-bit command words fetched over
//! its UDMA CMD channel. The top nibble of a word selects the operation and
//! the low bits carry its operand. `RPT(n)` makes the controller run the
//! following word `n` times, which is how a single `WR` or `RD_ACK` covers a
//! whole buffer: the bytes themselves come from the TX channel or land in the
//! RX channel. Every stream ends with `EOT`.

use rvsdk_hal::ErrorCode;

/// Default 7-bit target address used by the I3C drivers.
pub const I3C_CMD_SLV_ADDR: u8 = 0x50;

/// Longest stream the builders produce.
pub const CMD_STREAM_CAPACITY: usize = 16;

const OP_SHIFT: u32 = 28;
const OP_MASK: u32 = 0xF << OP_SHIFT;
const EOT_FLAG: u32 = 1 << 27;

const OP_START: u32 = 0x0;
const OP_STOP: u32 = 0x1;
const OP_RD_ACK: u32 = 0x2;
const OP_RD_NACK: u32 = 0x3;
const OP_WR: u32 = 0x4;
const OP_WAIT: u32 = 0x5;
const OP_RPT: u32 = 0x6;
const OP_CFG: u32 = 0x7;
const OP_WAIT_EV: u32 = 0x8;
const OP_WRB: u32 = 0x9;
const OP_SETUP_ADDR: u32 = 0xA;
const OP_SETUP_SIZE: u32 = 0xB;

const SETUP_ADDR_MASK: u32 = (1 << 27) - 1;
const SETUP_SIZE_MASK: u32 = (1 << 20) - 1;

/// One controller command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Generate a (repeated) start condition.
    Start,
    /// Generate a stop condition.
    Stop,
    /// Read a byte into the RX channel and acknowledge it.
    RdAck,
    /// Read a byte into the RX channel and do not acknowledge it.
    RdNack,
    /// Write the next byte from the TX channel and wait for the acknowledge.
    Wr,
    /// End of transfer.
    Eot,
    /// Idle for the given number of SCL cycles.
    Wait(u16),
    /// Run the next command this many times.
    Rpt(u16),
    /// Load the SCL clock divider.
    Cfg(u16),
    /// Block until event line 0 to 3 fires.
    WaitEv(u8),
    /// Write an immediate byte and wait for the acknowledge.
    Wrb(u8),
    /// Point the controller's internal buffer pointer at an address.
    SetupAddr(u32),
    /// Set the controller's internal buffer size.
    SetupSize(u32),
}

impl Command {
    pub const fn encode(self) -> u32 {
        match self {
            Command::Start => OP_START << OP_SHIFT,
            Command::Stop => OP_STOP << OP_SHIFT,
            Command::RdAck => OP_RD_ACK << OP_SHIFT,
            Command::RdNack => OP_RD_NACK << OP_SHIFT,
            Command::Wr => OP_WR << OP_SHIFT,
            Command::Eot => (OP_WR << OP_SHIFT) | EOT_FLAG,
            Command::Wait(cycles) => (OP_WAIT << OP_SHIFT) | cycles as u32,
            Command::Rpt(count) => (OP_RPT << OP_SHIFT) | count as u32,
            Command::Cfg(div) => (OP_CFG << OP_SHIFT) | div as u32,
            Command::WaitEv(event) => (OP_WAIT_EV << OP_SHIFT) | (event as u32 & 0x3),
            Command::Wrb(byte) => (OP_WRB << OP_SHIFT) | byte as u32,
            Command::SetupAddr(addr) => (OP_SETUP_ADDR << OP_SHIFT) | (addr & SETUP_ADDR_MASK),
            Command::SetupSize(size) => (OP_SETUP_SIZE << OP_SHIFT) | (size & SETUP_SIZE_MASK),
        }
    }

    /// Parse a command word. Unknown opcodes yield `None`.
    pub fn decode(word: u32) -> Option<Command> {
        let operand = word & !OP_MASK;
        let command = match (word & OP_MASK) >> OP_SHIFT {
            OP_START => Command::Start,
            OP_STOP => Command::Stop,
            OP_RD_ACK => Command::RdAck,
            OP_RD_NACK => Command::RdNack,
            OP_WR if operand & EOT_FLAG != 0 => Command::Eot,
            OP_WR => Command::Wr,
            OP_WAIT => Command::Wait(operand as u16),
            OP_RPT => Command::Rpt(operand as u16),
            OP_CFG => Command::Cfg(operand as u16),
            OP_WAIT_EV => Command::WaitEv((operand & 0x3) as u8),
            OP_WRB => Command::Wrb(operand as u8),
            OP_SETUP_ADDR => Command::SetupAddr(operand & SETUP_ADDR_MASK),
            OP_SETUP_SIZE => Command::SetupSize(operand & SETUP_SIZE_MASK),
            _ => return None,
        };
        Some(command)
    }
}

/// Direction bit appended to the target address.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Write = 0,
    Read = 1,
}

/// Fixed-capacity buffer of encoded command words.
///
/// The buffer is handed to the CMD channel as-is, so it has to stay alive and
/// unmodified until the controller reports that the stream was loaded.
#[derive(Clone, Debug)]
pub struct CommandStream {
    words: [u32; CMD_STREAM_CAPACITY],
    len: usize,
}

impl CommandStream {
    pub const fn new() -> CommandStream {
        CommandStream {
            words: [0; CMD_STREAM_CAPACITY],
            len: 0,
        }
    }

    /// Append a command. Returns `Err(ErrorCode::SIZE)` when the stream is
    /// full.
    pub fn push(&mut self, command: Command) -> Result<(), ErrorCode> {
        let slot = self.words.get_mut(self.len).ok_or(ErrorCode::SIZE)?;
        *slot = command.encode();
        self.len += 1;
        Ok(())
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.words[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the stream in bytes, as programmed into the CMD channel.
    pub fn byte_len(&self) -> u32 {
        (self.len * core::mem::size_of::<u32>()) as u32
    }

    /// Whether the last word is `EOT`.
    pub fn is_terminated(&self) -> bool {
        self.as_slice().last() == Some(&Command::Eot.encode())
    }
}

impl Default for CommandStream {
    fn default() -> Self {
        CommandStream::new()
    }
}

fn address_byte(slave: u8, direction: Direction) -> u8 {
    (slave << 1) | direction as u8
}

fn repeat_count(n: usize) -> Result<u16, ErrorCode> {
    u16::try_from(n).map_err(|_| ErrorCode::SIZE)
}

/// Stream writing `len` bytes from the TX channel to register `reg` of
/// `slave`:
///
/// `START, WRB(slave<<1|W), WRB(reg), RPT(len), WR, STOP, WAIT(bus_free), EOT`
pub fn write_stream(
    slave: u8,
    reg: u8,
    len: usize,
    bus_free: u16,
) -> Result<CommandStream, ErrorCode> {
    debug_assert!(slave <= 0x7F);
    if len == 0 {
        return Err(ErrorCode::SIZE);
    }
    let count = repeat_count(len)?;

    let mut stream = CommandStream::new();
    stream.push(Command::Start)?;
    stream.push(Command::Wrb(address_byte(slave, Direction::Write)))?;
    stream.push(Command::Wrb(reg))?;
    stream.push(Command::Rpt(count))?;
    stream.push(Command::Wr)?;
    stream.push(Command::Stop)?;
    stream.push(Command::Wait(bus_free))?;
    stream.push(Command::Eot)?;
    Ok(stream)
}

/// Stream reading `len` bytes from `slave` into the RX channel. Every byte
/// but the last is acknowledged:
///
/// `CFG(div), START, WRB(slave<<1|R), [RPT(len-1), RD_ACK,] RD_NACK, STOP,
/// WAIT(bus_free), EOT`
///
/// The bracketed pair is left out for a single byte read.
pub fn read_stream(
    slave: u8,
    len: usize,
    div: u16,
    bus_free: u16,
) -> Result<CommandStream, ErrorCode> {
    debug_assert!(slave <= 0x7F);
    if len == 0 {
        return Err(ErrorCode::SIZE);
    }

    let mut stream = CommandStream::new();
    stream.push(Command::Cfg(div))?;
    stream.push(Command::Start)?;
    stream.push(Command::Wrb(address_byte(slave, Direction::Read)))?;
    if len > 1 {
        stream.push(Command::Rpt(repeat_count(len - 1)?))?;
        stream.push(Command::RdAck)?;
    }
    stream.push(Command::RdNack)?;
    stream.push(Command::Stop)?;
    stream.push(Command::Wait(bus_free))?;
    stream.push(Command::Eot)?;
    Ok(stream)
}

/// What a command stream does on the bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// 7-bit target address.
    pub address: u8,
    pub direction: Direction,
    /// First immediate byte after the address of a write.
    pub register: Option<u8>,
    /// Bytes moved through the TX or RX channel.
    pub len: u32,
}

/// Recover the transaction a stream performs.
///
/// Only the first addressed transfer is reported. A stream without `START`,
/// without an address byte or without `EOT` is `Err(ErrorCode::INVAL)`.
pub fn decode_transaction(words: &[u32]) -> Result<Transaction, ErrorCode> {
    let mut started = false;
    let mut address = None;
    let mut register = None;
    let mut len: u32 = 0;
    let mut repeat: u32 = 1;

    for &word in words {
        let command = Command::decode(word).ok_or(ErrorCode::INVAL)?;
        let times = core::mem::replace(&mut repeat, 1);
        match command {
            Command::Eot => {
                let (address, direction) = address.ok_or(ErrorCode::INVAL)?;
                return Ok(Transaction {
                    address,
                    direction,
                    register,
                    len,
                });
            }
            Command::Start => started = true,
            Command::Rpt(count) => repeat = count as u32,
            Command::Wrb(byte) if started && address.is_none() => {
                let direction = if byte & 1 == 0 {
                    Direction::Write
                } else {
                    Direction::Read
                };
                address = Some((byte >> 1, direction));
            }
            Command::Wrb(byte) if register.is_none() => register = Some(byte),
            Command::Wr | Command::RdAck | Command::RdNack => {
                len = len.saturating_add(times);
            }
            _ => {}
        }
    }
    Err(ErrorCode::INVAL)
}
