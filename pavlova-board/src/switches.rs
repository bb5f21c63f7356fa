//! Switch reader clients
//!
//! Both switch banks are wired active-low: an external pull-up holds
//! each line high and closing the switch pulls it to ground. The
//! drivers report raw levels; the polarity knowledge lives here, with
//! the rest of the board wiring facts.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::spi::SpiBus;

use pavlova_core::pins::PinRole;
use pavlova_drivers::mcp23s08::Mcp23s08;

/// One momentary push switch
pub struct PushSwitch<'a, M, SPI> {
    expander: &'a Mcp23s08<M, SPI>,
    role: PinRole,
}

impl<'a, M: RawMutex, SPI: SpiBus> PushSwitch<'a, M, SPI> {
    pub(crate) fn new(expander: &'a Mcp23s08<M, SPI>, role: PinRole) -> Self {
        Self { expander, role }
    }

    /// Raw line level (high = released)
    pub fn read_level(&self) -> Result<bool, SPI::Error> {
        self.expander.read_pin(self.role)
    }

    /// Whether the switch is currently held down
    pub fn is_pressed(&self) -> Result<bool, SPI::Error> {
        Ok(!self.read_level()?)
    }
}

/// One DIP switch position
pub struct DipSwitch<'a, M, SPI> {
    expander: &'a Mcp23s08<M, SPI>,
    role: PinRole,
}

impl<'a, M: RawMutex, SPI: SpiBus> DipSwitch<'a, M, SPI> {
    pub(crate) fn new(expander: &'a Mcp23s08<M, SPI>, role: PinRole) -> Self {
        Self { expander, role }
    }

    /// Raw line level (high = off)
    pub fn read_level(&self) -> Result<bool, SPI::Error> {
        self.expander.read_pin(self.role)
    }

    /// Whether the switch is set to on
    pub fn is_on(&self) -> Result<bool, SPI::Error> {
        Ok(!self.read_level()?)
    }
}
