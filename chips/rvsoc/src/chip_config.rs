// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Chip specific configuration.
//!
//! The same rvsoc netlist runs on an FPGA prototype and in an RTL simulator.
//! The two differ in clock speeds and in how long a peripheral may take to
//! answer, so those values live in a configuration trait chosen by the board.

/// rvsoc configuration based on the target device.
pub trait RvSocConfig {
    /// Identifier for the platform. Logged at start-up to confirm which
    /// configuration was built in.
    const NAME: &'static str;

    /// The clock speed of the CPU in Hz.
    const CPU_FREQ: u32;

    /// The clock feeding the peripheral dividers in Hz.
    const PERIPHERAL_FREQ: u32;

    /// Console baud rate.
    const UART_BAUDRATE: u32;

    /// I3C SCL frequency in Hz.
    const I3C_SCL_FREQ: u32;

    /// QSPI serial clock in Hz, for both command and XIP mode.
    const QSPI_FREQ: u32;

    /// SD/eMMC clock during card identification. Cards must be identified
    /// at 400 kHz or less.
    const SDIO_INIT_FREQ: u32;

    /// SD/eMMC clock once the card is selected.
    const SDIO_FREQ: u32;

    /// Iterations a driver spins on a status bit before giving up with
    /// `ErrorCode::BUSY`.
    const POLL_BUDGET: u32;
}

pub enum Fpga {}

impl RvSocConfig for Fpga {
    const NAME: &'static str = "fpga";
    const CPU_FREQ: u32 = 50_000_000;
    const PERIPHERAL_FREQ: u32 = 25_000_000;
    const UART_BAUDRATE: u32 = 115_200;
    const I3C_SCL_FREQ: u32 = 400_000;
    const QSPI_FREQ: u32 = 12_500_000;
    const SDIO_INIT_FREQ: u32 = 390_625;
    const SDIO_FREQ: u32 = 12_500_000;
    const POLL_BUDGET: u32 = 1_000_000;
}

/// RTL simulation. Clocks are nominal and every peripheral answers within a
/// few cycles, so the budget is kept small to fail fast.
pub enum Simulation {}

impl RvSocConfig for Simulation {
    const NAME: &'static str = "sim";
    const CPU_FREQ: u32 = 100_000_000;
    const PERIPHERAL_FREQ: u32 = 100_000_000;
    const UART_BAUDRATE: u32 = 1_000_000;
    const I3C_SCL_FREQ: u32 = 1_000_000;
    const QSPI_FREQ: u32 = 25_000_000;
    const SDIO_INIT_FREQ: u32 = 390_625;
    const SDIO_FREQ: u32 = 25_000_000;
    const POLL_BUDGET: u32 = 10_000;
}

/// Divider that brings `input` down to at most `target`, rounding up so the
/// output never exceeds the requested frequency. The hardware divides by
/// `2 * (div + 1)`; the result saturates at `max`.
pub(crate) const fn clock_divider(input: u32, target: u32, max: u32) -> u32 {
    if target == 0 {
        return max;
    }
    let half_periods = (input + 2 * target - 1) / (2 * target);
    let div = if half_periods == 0 { 0 } else { half_periods - 1 };
    if div > max {
        max
    } else {
        div
    }
}
