// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Bounded busy polling.
//!
//! Drivers in this SDK wait for hardware by spinning on a status register.
//! Every such wait goes through [`poll_until`] so that the iteration budget
//! is explicit at the call site and a stalled peripheral turns into an error
//! instead of a hang. The budget counts loop iterations, not wall-clock time.

/// The predicate never became true within the iteration budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeout;

/// Spin until `ready` returns `true`.
///
/// `ready` is evaluated once, then up to `max_iterations` more times. A budget
/// of zero therefore checks the condition exactly once.
pub fn poll_until<F>(max_iterations: u32, mut ready: F) -> Result<(), Timeout>
where
    F: FnMut() -> bool,
{
    let mut remaining = max_iterations;
    loop {
        if ready() {
            return Ok(());
        }
        if remaining == 0 {
            return Err(Timeout);
        }
        remaining -= 1;
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::{poll_until, Timeout};
    use core::cell::Cell;

    #[test]
    fn ready_immediately() {
        let calls = Cell::new(0);
        let result = poll_until(0, || {
            calls.set(calls.get() + 1);
            true
        });
        assert_eq!(result, Ok(()));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn ready_after_a_few_iterations() {
        let calls = Cell::new(0u32);
        let result = poll_until(10, || {
            calls.set(calls.get() + 1);
            calls.get() == 4
        });
        assert_eq!(result, Ok(()));
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn budget_exhausted() {
        let calls = Cell::new(0u32);
        let result = poll_until(5, || {
            calls.set(calls.get() + 1);
            false
        });
        assert_eq!(result, Err(Timeout));
        assert_eq!(calls.get(), 6);
    }

    #[test]
    fn ready_on_last_check() {
        let calls = Cell::new(0u32);
        let result = poll_until(3, || {
            calls.set(calls.get() + 1);
            calls.get() == 4
        });
        assert_eq!(result, Ok(()));
    }
}
