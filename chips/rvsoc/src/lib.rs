// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Drivers for the rvsoc RISC-V SoC.
//!
//! Most peripherals on this chip move data through a per-peripheral micro-DMA
//! (UDMA) config block, described in [`udma`]. The I3C controller goes one
//! step further and is driven by a stream of 32-bit command words fetched
//! over its CMD channel; [`i3c_cmd`] builds those streams.

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod chip;
pub mod chip_config;
pub mod i3c;
pub mod i3c_cmd;
pub mod iomux;
pub mod misc;
pub mod qspi;
pub mod qspi_xip;
pub mod sdio;
pub mod spi_flash;
pub mod udma;
pub mod usart;

#[cfg(test)]
mod testing;
