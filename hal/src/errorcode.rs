// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Standard error enum for invoking driver operations

use crate::utilities::poll::Timeout;

/// Standard errors returned by rvsdk drivers.
///
/// Drivers never retry on their own. Every failure is reported to the
/// immediate caller, which decides whether to try again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum ErrorCode {
    /// Generic failure condition
    FAIL = 0,
    /// Underlying system is busy; retry
    BUSY = 1,
    /// The state requested is already set
    ALREADY = 2,
    /// The component is powered down
    OFF = 3,
    /// An invalid parameter was passed
    INVAL = 5,
    /// Parameter passed was too large
    SIZE = 6,
    /// Operation canceled by a call
    CANCEL = 7,
    /// Operation or command is unsupported
    NOSUPPORT = 9,
    /// Device does not exist
    NODEVICE = 10,
    /// Packet transmission not acknowledged
    NOACK = 12,
}

impl From<ErrorCode> for usize {
    fn from(err: ErrorCode) -> usize {
        err as usize
    }
}

/// A bounded poll that ran out of iterations means the hardware never left
/// its busy state.
impl From<Timeout> for ErrorCode {
    fn from(_: Timeout) -> ErrorCode {
        ErrorCode::BUSY
    }
}

impl TryFrom<usize> for ErrorCode {
    type Error = ();

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::FAIL),
            1 => Ok(ErrorCode::BUSY),
            2 => Ok(ErrorCode::ALREADY),
            3 => Ok(ErrorCode::OFF),
            5 => Ok(ErrorCode::INVAL),
            6 => Ok(ErrorCode::SIZE),
            7 => Ok(ErrorCode::CANCEL),
            9 => Ok(ErrorCode::NOSUPPORT),
            10 => Ok(ErrorCode::NODEVICE),
            12 => Ok(ErrorCode::NOACK),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use crate::utilities::poll::Timeout;

    #[test]
    fn timeout_is_busy() {
        assert_eq!(ErrorCode::from(Timeout), ErrorCode::BUSY);
    }

    #[test]
    fn usize_conversion() {
        for code in [
            ErrorCode::FAIL,
            ErrorCode::BUSY,
            ErrorCode::INVAL,
            ErrorCode::SIZE,
            ErrorCode::NOACK,
        ] {
            assert_eq!(ErrorCode::try_from(usize::from(code)), Ok(code));
        }
        assert_eq!(ErrorCode::try_from(4), Err(()));
        assert_eq!(ErrorCode::try_from(99), Err(()));
    }
}
