// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! The set of peripherals a board gets by default.

use core::marker::PhantomData;

use rvsdk_hal::hil;
use rvsdk_hal::utilities::StaticRef;
use rvsdk_hal::ErrorCode;

use crate::chip_config::RvSocConfig;
use crate::i3c::{I3c, I3cConfig, I3cRegisters};
use crate::iomux::{Iomux, IomuxRegisters, PinGroup};
use crate::misc::{Misc, MiscRegisters, Peripheral};
use crate::qspi::{Lines, Qspi, QspiConfig, QspiRegisters, SpiMode};
use crate::qspi_xip::{QspiXip, QspiXipRegisters, XIP_WINDOW_BASE, XIP_WINDOW_SIZE};
use crate::sdio::{Sdio, SdioRegisters};
use crate::udma::{UdmaCtrl, UdmaCtrlRegisters, UdmaPeriphId};
use crate::usart::{Usart, UsartRegisters};

/// Register block addresses of every default peripheral.
pub struct PeripheralBases {
    pub misc: StaticRef<MiscRegisters>,
    pub iomux: StaticRef<IomuxRegisters>,
    pub udma: StaticRef<UdmaCtrlRegisters>,
    pub usart0: StaticRef<UsartRegisters>,
    pub usart1: StaticRef<UsartRegisters>,
    pub qspi: StaticRef<QspiRegisters>,
    pub qspi_xip: StaticRef<QspiXipRegisters>,
    pub i3c0: StaticRef<I3cRegisters>,
    pub i3c1: StaticRef<I3cRegisters>,
    pub sdio: StaticRef<SdioRegisters>,
}

impl PeripheralBases {
    pub const RVSOC: PeripheralBases = PeripheralBases {
        misc: crate::misc::MISC_BASE,
        iomux: crate::iomux::IOMUX_BASE,
        udma: crate::udma::UDMA0_BASE,
        usart0: crate::usart::USART0_BASE,
        usart1: crate::usart::USART1_BASE,
        qspi: crate::qspi::QSPI0_BASE,
        qspi_xip: crate::qspi_xip::QSPI_XIP_BASE,
        i3c0: crate::i3c::I3C0_BASE,
        i3c1: crate::i3c::I3C1_BASE,
        sdio: crate::sdio::SDIO0_BASE,
    };
}

/// Peripherals clocked out of reset by [`RvSocDefaultPeripherals::bring_up`].
const CLOCKED: [Peripheral; 9] = [
    Peripheral::Udma0,
    Peripheral::Iomux,
    Peripheral::Usart0,
    Peripheral::Usart1,
    Peripheral::Qspi0,
    Peripheral::QspiXip,
    Peripheral::I3c0,
    Peripheral::I3c1,
    Peripheral::Sdio0,
];

const UDMA_CHANNELS: [UdmaPeriphId; 6] = [
    UdmaPeriphId::Usart0,
    UdmaPeriphId::Usart1,
    UdmaPeriphId::Qspi0,
    UdmaPeriphId::I3c0,
    UdmaPeriphId::I3c1,
    UdmaPeriphId::Sdio0,
];

const PIN_GROUPS: [PinGroup; 4] = [
    PinGroup::Usart0,
    PinGroup::I3c0,
    PinGroup::Qspi0,
    PinGroup::Sdio0,
];

pub struct RvSocDefaultPeripherals<'a, C: RvSocConfig> {
    pub misc: Misc,
    pub iomux: Iomux,
    pub udma: UdmaCtrl,
    pub usart0: Usart<'a>,
    pub usart1: Usart<'a>,
    pub qspi: Qspi,
    pub qspi_xip: QspiXip,
    pub i3c0: I3c,
    pub i3c1: I3c,
    pub sdio: Sdio,
    _config: PhantomData<C>,
}

impl<'a, C: RvSocConfig> RvSocDefaultPeripherals<'a, C> {
    /// # Safety
    ///
    /// Must be called at most once, on the rvsoc itself.
    pub unsafe fn new() -> Self {
        Self::with_bases(
            PeripheralBases::RVSOC,
            XIP_WINDOW_BASE as *const u8,
            XIP_WINDOW_SIZE,
        )
    }

    /// # Safety
    ///
    /// Every base must name its register block and `xip_window` must be
    /// readable for `xip_window_size` bytes while XIP is enabled.
    pub unsafe fn with_bases(
        bases: PeripheralBases,
        xip_window: *const u8,
        xip_window_size: usize,
    ) -> Self {
        let freq = C::PERIPHERAL_FREQ;
        let budget = C::POLL_BUDGET;
        Self {
            misc: Misc::new(bases.misc),
            iomux: Iomux::new(bases.iomux),
            udma: UdmaCtrl::new(bases.udma),
            usart0: Usart::new(bases.usart0, freq, budget),
            usart1: Usart::new(bases.usart1, freq, budget),
            qspi: Qspi::new(bases.qspi, freq, budget),
            qspi_xip: QspiXip::new(bases.qspi_xip, xip_window, xip_window_size, freq, budget),
            i3c0: I3c::new(bases.i3c0, freq, budget),
            i3c1: I3c::new(bases.i3c1, freq, budget),
            sdio: Sdio::new(bases.sdio, freq, C::SDIO_INIT_FREQ, C::SDIO_FREQ, budget),
            _config: PhantomData,
        }
    }

    /// Clock every peripheral, release it from reset, start its UDMA channels
    /// and route its pads.
    pub fn bring_up(&self) {
        for peripheral in CLOCKED {
            self.misc.bring_up(peripheral);
        }
        for channel in UDMA_CHANNELS {
            self.udma.enable_peripheral(channel);
        }
        for group in PIN_GROUPS {
            self.iomux.configure_group(group);
        }
    }

    /// Program the controllers with the platform's default rates. The card
    /// and the flash are left for the board to identify.
    pub fn init(&self) -> Result<(), ErrorCode> {
        let console = hil::uart::Parameters {
            baud_rate: C::UART_BAUDRATE,
            width: hil::uart::Width::Eight,
            parity: hil::uart::Parity::None,
            stop_bits: hil::uart::StopBits::One,
            hw_flow_control: false,
        };
        self.usart0.init(console)?;
        self.usart1.init(console)?;
        self.qspi.init(QspiConfig {
            freq: C::QSPI_FREQ,
            mode: SpiMode::Mode0,
            lines: Lines::Single,
        });
        self.i3c0.init(I3cConfig::new(C::I3C_SCL_FREQ));
        self.i3c1.init(I3cConfig::new(C::I3C_SCL_FREQ));
        self.sdio.init();
        log::debug!(
            "rvsoc: {} platform, cpu {} Hz, peripherals {} Hz",
            C::NAME,
            C::CPU_FREQ,
            C::PERIPHERAL_FREQ
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip_config::{Fpga, Simulation};
    use crate::testing::FakeRegisters;

    struct Fakes {
        misc: FakeRegisters<MiscRegisters>,
        iomux: FakeRegisters<IomuxRegisters>,
        udma: FakeRegisters<UdmaCtrlRegisters>,
        usart0: FakeRegisters<UsartRegisters>,
        usart1: FakeRegisters<UsartRegisters>,
        qspi: FakeRegisters<QspiRegisters>,
        qspi_xip: FakeRegisters<QspiXipRegisters>,
        i3c0: FakeRegisters<I3cRegisters>,
        i3c1: FakeRegisters<I3cRegisters>,
        sdio: FakeRegisters<SdioRegisters>,
    }

    impl Fakes {
        fn new() -> Fakes {
            Fakes {
                misc: FakeRegisters::new(),
                iomux: FakeRegisters::new(),
                udma: FakeRegisters::new(),
                usart0: FakeRegisters::new(),
                usart1: FakeRegisters::new(),
                qspi: FakeRegisters::new(),
                qspi_xip: FakeRegisters::new(),
                i3c0: FakeRegisters::new(),
                i3c1: FakeRegisters::new(),
                sdio: FakeRegisters::new(),
            }
        }

        fn bases(&self) -> PeripheralBases {
            PeripheralBases {
                misc: self.misc.regs(),
                iomux: self.iomux.regs(),
                udma: self.udma.regs(),
                usart0: self.usart0.regs(),
                usart1: self.usart1.regs(),
                qspi: self.qspi.regs(),
                qspi_xip: self.qspi_xip.regs(),
                i3c0: self.i3c0.regs(),
                i3c1: self.i3c1.regs(),
                sdio: self.sdio.regs(),
            }
        }
    }

    static WINDOW: [u8; 16] = [0; 16];

    fn peripherals<C: RvSocConfig>(fakes: &Fakes) -> RvSocDefaultPeripherals<'static, C> {
        unsafe { RvSocDefaultPeripherals::with_bases(fakes.bases(), WINDOW.as_ptr(), WINDOW.len()) }
    }

    #[test]
    fn bring_up_releases_everything() {
        let fakes = Fakes::new();
        fakes.misc.poke(0x08, 0x1FF);
        fakes.udma.poke(0x04, 0x3F);
        let chip = peripherals::<Fpga>(&fakes);

        chip.bring_up();
        for peripheral in CLOCKED {
            assert!(chip.misc.is_clock_enabled(peripheral));
            assert!(!chip.misc.is_in_reset(peripheral));
        }
        assert!(!chip.misc.is_clock_enabled(Peripheral::Wdt));
        assert_eq!(fakes.misc.peek(0x00), 0x1FF);
        assert_eq!(fakes.udma.peek(0x00), 0x3F);
        assert_eq!(fakes.udma.peek(0x04), 0);
        for group in PIN_GROUPS {
            for &(pin, _) in group.pads() {
                assert_ne!(fakes.iomux.peek(pin * 4) & 0b11, 0);
            }
        }
    }

    #[test]
    fn init_uses_platform_rates() {
        let fakes = Fakes::new();
        let chip = peripherals::<Simulation>(&fakes);
        assert_eq!(chip.init(), Ok(()));
        assert!(!chip.qspi_xip.is_enabled());
        // 100 MHz down to a 1 MHz SCL.
        assert_eq!(fakes.i3c0.peek(0x04), 49);
        assert_eq!(fakes.i3c1.peek(0x04), 49);
    }
}
