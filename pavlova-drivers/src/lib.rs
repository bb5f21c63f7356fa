//! Chip drivers for the Pavlova expansion board
//!
//! Concrete drivers for the board's two bus peripherals:
//!
//! - MCP23S08 GPIO expander (SPI): carries the LED and both switch banks
//! - ST7032 LCD controller (I2C): the 8x2 character panel
//!
//! Both drivers are generic over the `embedded-hal` 1.0 bus traits; the
//! platform supplies the concrete SPI/I2C/delay implementations.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod mcp23s08;
pub mod st7032;
