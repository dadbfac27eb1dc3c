// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Public traits for interfaces between chip drivers and capsules.

pub mod block_storage;
pub mod i2c;
pub mod uart;
