//! LED writer client

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::spi::SpiBus;

use pavlova_core::pins::PinRole;
use pavlova_drivers::mcp23s08::Mcp23s08;

/// Front-panel LED, driven through the expander.
///
/// One `set` call is one GPIO update; unrelated expander lines are never
/// disturbed.
pub struct Led<'a, M, SPI> {
    expander: &'a Mcp23s08<M, SPI>,
}

impl<'a, M: RawMutex, SPI: SpiBus> Led<'a, M, SPI> {
    pub(crate) fn new(expander: &'a Mcp23s08<M, SPI>) -> Self {
        Self { expander }
    }

    /// Drive the LED on or off
    pub fn set(&self, on: bool) -> Result<(), SPI::Error> {
        self.expander.write_pin(PinRole::Led, on)
    }

    /// Turn the LED on
    pub fn on(&self) -> Result<(), SPI::Error> {
        self.set(true)
    }

    /// Turn the LED off
    pub fn off(&self) -> Result<(), SPI::Error> {
        self.set(false)
    }

    /// State last written to the LED line
    pub fn is_on(&self) -> Result<bool, SPI::Error> {
        self.expander.read_pin(PinRole::Led)
    }
}
