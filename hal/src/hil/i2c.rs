// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Interface for I2C/I3C master hardware drivers.

use crate::ErrorCode;

/// Blocking I2C bus master.
///
/// Every transaction is bounded: a target that holds the bus longer than the
/// driver's poll budget yields `Err(ErrorCode::BUSY)`. A missing acknowledge
/// is `Err(ErrorCode::NOACK)` and a lost arbitration `Err(ErrorCode::FAIL)`.
pub trait I2CMaster {
    /// Turn the bus master on.
    fn enable(&self);

    /// Turn the bus master off.
    fn disable(&self);

    /// Address the 7-bit target `addr` and write `data` to it.
    fn write(&self, addr: u8, data: &[u8]) -> Result<(), ErrorCode>;

    /// Address the 7-bit target `addr` and fill `buffer` from it. The final
    /// byte is not acknowledged, telling the target the read is over.
    fn read(&self, addr: u8, buffer: &mut [u8]) -> Result<(), ErrorCode>;

    /// Write `data`, then issue a repeated start and read into `buffer`.
    fn write_read(&self, addr: u8, data: &[u8], buffer: &mut [u8]) -> Result<(), ErrorCode>;
}
