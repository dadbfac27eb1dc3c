// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Chip-independent support for the rvsdk peripheral drivers.
//!
//! This crate holds the pieces every chip driver shares: the standard
//! [`ErrorCode`], the [`StaticRef`](utilities::StaticRef) handle used to name
//! memory-mapped register blocks, the bounded polling helper, and the
//! Hardware Interface Layer (HIL) traits that capsules program against.

#![no_std]

pub mod errorcode;
pub mod hil;
pub mod platform;
pub mod utilities;

pub use crate::errorcode::ErrorCode;
