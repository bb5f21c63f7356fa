//! Board assembly and device clients for the Pavlova expansion board
//!
//! [`Board`] owns the two bus peripherals and hands out thin per-device
//! clients; each client call maps one unit of I/O onto exactly one
//! expander or LCD operation. Clients never hold the transports
//! themselves, only references through the board, so every exclusion
//! rule lives in one place.
//!
//! The platform side (bus setup, device-file plumbing, scheduling) is
//! the caller's concern; this crate starts where a configured
//! `SpiBus`/`I2c`/`DelayNs` triple ends.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

mod lcd;
mod led;
mod switches;

pub use lcd::{Lcd, Line};
pub use led::Led;
pub use switches::{DipSwitch, PushSwitch};

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiBus;

use pavlova_core::pins::PinRole;
use pavlova_drivers::mcp23s08::Mcp23s08;
use pavlova_drivers::st7032::{self, InitPolicy, St7032, St7032Config};

/// Push switches on the front panel
pub const PUSH_SWITCH_COUNT: u8 = 4;
/// DIP switch positions
pub const DIP_SWITCH_COUNT: u8 = 2;

/// Board-level configuration
#[derive(Debug, Clone, Default)]
pub struct BoardConfig {
    /// Expander address straps (A1, A0)
    pub expander_addr: (bool, bool),
    /// LCD controller settings, including the init failure policy
    pub lcd: St7032Config,
}

/// Startup failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError<SE, IE> {
    /// Expander direction configuration failed; the board is unusable
    Expander(SE),
    /// LCD startup failed under the fail-fast policy
    Lcd(st7032::Error<IE>),
}

/// The assembled expansion board
pub struct Board<M, SPI, I2C, D> {
    expander: Mcp23s08<M, SPI>,
    lcd: Mutex<M, RefCell<St7032<I2C, D>>>,
}

impl<M, SPI, I2C, D> Board<M, SPI, I2C, D>
where
    M: RawMutex,
    SPI: SpiBus,
    I2C: I2c,
    D: DelayNs,
{
    /// Bring the board up: configure the expander pin directions, then
    /// run the LCD startup sequence.
    ///
    /// An expander failure is always fatal. An LCD failure is fatal
    /// only under [`InitPolicy::FailFast`]; with `BestEffort` the board
    /// comes up with the panel in whatever state the failed sequence
    /// left it, and the switch and LED paths still work.
    pub fn new(
        spi: SPI,
        i2c: I2C,
        delay: D,
        config: BoardConfig,
    ) -> Result<Self, InitError<SPI::Error, I2C::Error>> {
        let (a1, a0) = config.expander_addr;
        let expander = Mcp23s08::new(spi, a1, a0);
        expander.init().map_err(InitError::Expander)?;

        let policy = config.lcd.init_policy;
        let mut lcd = St7032::new(i2c, delay, config.lcd);
        if let Err(e) = lcd.init() {
            match policy {
                InitPolicy::FailFast => return Err(InitError::Lcd(e)),
                InitPolicy::BestEffort => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("LCD init failed, continuing without a usable panel");
                    let _ = e;
                }
            }
        }

        Ok(Self {
            expander,
            lcd: Mutex::new(RefCell::new(lcd)),
        })
    }

    /// The front-panel LED
    pub fn led(&self) -> Led<'_, M, SPI> {
        Led::new(&self.expander)
    }

    /// Push switch `n` (0-3)
    pub fn push_switch(&self, n: u8) -> Option<PushSwitch<'_, M, SPI>> {
        PinRole::push_switch(n).map(|role| PushSwitch::new(&self.expander, role))
    }

    /// DIP switch `n` (0-1)
    pub fn dip_switch(&self, n: u8) -> Option<DipSwitch<'_, M, SPI>> {
        PinRole::dip_switch(n).map(|role| DipSwitch::new(&self.expander, role))
    }

    /// The character LCD
    pub fn lcd(&self) -> Lcd<'_, M, I2C, D> {
        Lcd::new(&self.lcd)
    }

    /// Raw expander access, for diagnostics that want register-level
    /// visibility
    pub fn expander(&self) -> &Mcp23s08<M, SPI> {
        &self.expander
    }
}
