// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Host-side stand-ins for memory-mapped register blocks.
//!
//! A `FakeRegisters<T>` is a zeroed, leaked heap allocation the size of `T`.
//! Drivers under test get a `StaticRef<T>` into it while the test pokes
//! status bits and peeks at what the driver wrote, by documented byte offset.

use core::marker::PhantomData;
use core::mem::MaybeUninit;
use rvsdk_hal::utilities::StaticRef;
use std::boxed::Box;

pub struct FakeRegisters<T> {
    base: *mut u8,
    _regs: PhantomData<T>,
}

impl<T: 'static> FakeRegisters<T> {
    pub fn new() -> FakeRegisters<T> {
        let block: &'static mut MaybeUninit<T> = Box::leak(Box::new(MaybeUninit::zeroed()));
        FakeRegisters {
            base: block.as_mut_ptr() as *mut u8,
            _regs: PhantomData,
        }
    }

    pub fn regs(&self) -> StaticRef<T> {
        unsafe { StaticRef::new(self.base as *const T) }
    }

    pub fn get(&self) -> &'static T {
        unsafe { &*(self.base as *const T) }
    }

    fn word(&self, offset: usize) -> *mut u32 {
        assert!(offset % 4 == 0 && offset + 4 <= core::mem::size_of::<T>());
        unsafe { self.base.add(offset) as *mut u32 }
    }

    pub fn peek(&self, offset: usize) -> u32 {
        unsafe { core::ptr::read_volatile(self.word(offset)) }
    }

    pub fn poke(&self, offset: usize, value: u32) {
        unsafe { core::ptr::write_volatile(self.word(offset), value) }
    }
}
