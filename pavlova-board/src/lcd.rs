//! LCD line-writer client

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use pavlova_core::text::{Encoder, Token};
use pavlova_drivers::st7032::{Error, St7032, LINE1_ADDR, LINE2_ADDR};

/// Display line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// Top line
    First,
    /// Bottom line
    Second,
}

impl Line {
    /// Display RAM start address of this line
    pub const fn address(self) -> u8 {
        match self {
            Line::First => LINE1_ADDR,
            Line::Second => LINE2_ADDR,
        }
    }
}

/// Character LCD client.
///
/// Every operation holds the panel's mutex across the whole command and
/// data sequence, so a second caller cannot interleave bytes and derail
/// the controller's state machine.
pub struct Lcd<'a, M, I2C, D> {
    channel: &'a Mutex<M, RefCell<St7032<I2C, D>>>,
}

impl<'a, M: RawMutex, I2C: I2c, D: DelayNs> Lcd<'a, M, I2C, D> {
    pub(crate) fn new(channel: &'a Mutex<M, RefCell<St7032<I2C, D>>>) -> Self {
        Self { channel }
    }

    /// Write `text` starting at the head of `line`.
    ///
    /// The text is converted byte by byte (ASCII plus half-width
    /// Katakana; anything else renders blank); a newline jumps to the
    /// second line.
    pub fn write_line(&self, line: Line, text: &[u8]) -> Result<(), Error<I2C::Error>> {
        self.channel.lock(|lcd| {
            let mut lcd = lcd.borrow_mut();
            lcd.set_address(line.address())?;
            stream(&mut lcd, text)
        })
    }

    /// Clear the panel and rewrite it whole: the first line from the
    /// start of `text`, the second after a newline.
    pub fn write_text(&self, text: &[u8]) -> Result<(), Error<I2C::Error>> {
        self.channel.lock(|lcd| {
            let mut lcd = lcd.borrow_mut();
            lcd.clear()?;
            lcd.set_address(LINE1_ADDR)?;
            stream(&mut lcd, text)
        })
    }

    /// Blank the panel
    pub fn clear(&self) -> Result<(), Error<I2C::Error>> {
        self.channel.lock(|lcd| lcd.borrow_mut().clear())
    }
}

fn stream<I2C: I2c, D: DelayNs>(
    lcd: &mut St7032<I2C, D>,
    text: &[u8],
) -> Result<(), Error<I2C::Error>> {
    for token in Encoder::new(text) {
        match token {
            Token::Put(code) => lcd.send_data(code)?,
            Token::LineBreak => lcd.set_address(LINE2_ADDR)?,
        }
    }
    Ok(())
}
