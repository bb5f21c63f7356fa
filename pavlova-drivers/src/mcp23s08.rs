//! MCP23S08 8-bit GPIO expander driver (SPI)
//!
//! Every transaction with the chip is one fixed 3-byte full-duplex
//! exchange:
//!
//! - Opcode: `0b0100_0 A1 A0 RW` (RW: 1 = read, 0 = write; A1/A0 are the
//!   chip's address straps)
//! - Register address
//! - Data byte (the write value going out; for reads, the register value
//!   arrives in this position of the receive frame)
//!
//! The driver owns the bus handle, a pair of frame buffers reused for
//! every exchange, and the single blocking mutex that serializes all
//! callers on the shared bus. `write_pin` holds that mutex across its
//! whole read/modify/write pair, so two clients updating different bits
//! of the same register cannot lose each other's update.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::spi::SpiBus;

use pavlova_core::pins::{self, PinRole};

/// Register addresses (the chip's fixed 8-bit map)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// I/O direction (1 = input, 0 = output)
    Iodir = 0x00,
    /// Input polarity inversion
    Ipol = 0x01,
    /// Interrupt-on-change enable
    Gpinten = 0x02,
    /// Default compare value for interrupts
    Defval = 0x03,
    /// Interrupt control
    Intcon = 0x04,
    /// Expander configuration
    Iocon = 0x05,
    /// Pull-up enable
    Gppu = 0x06,
    /// Interrupt flags
    Intf = 0x07,
    /// Port state captured at interrupt time
    Intcap = 0x08,
    /// Live port state
    Gpio = 0x09,
    /// Output latches
    Olat = 0x0A,
}

/// Fixed bits of the opcode byte
const OPCODE_BASE: u8 = 0x40;
/// Read flag within the opcode byte; writes leave it clear
const OPCODE_READ: u8 = 0x01;
/// Every exchange is exactly this long
const FRAME_LEN: usize = 3;

/// Bus side of the driver: the SPI handle plus the frame buffers,
/// allocated once at attach time and reused for every transaction.
struct Transport<SPI> {
    spi: SPI,
    tx: [u8; FRAME_LEN],
    rx: [u8; FRAME_LEN],
}

impl<SPI: SpiBus> Transport<SPI> {
    /// One full-duplex register exchange. Returns the third received
    /// byte: the register value for reads, an echo for writes.
    fn exchange(&mut self, opcode: u8, register: Register, data: u8) -> Result<u8, SPI::Error> {
        self.tx = [opcode, register as u8, data];
        self.spi.transfer(&mut self.rx, &self.tx)?;
        self.spi.flush()?;
        Ok(self.rx[2])
    }
}

/// MCP23S08 GPIO expander
///
/// All operations take `&self`; the internal mutex serializes bus access
/// across callers, so one instance can be shared by every client on the
/// board. The bus implementation is expected to frame each `transfer`
/// call with chip select (one call, one electrical transaction) and to
/// fail with an error rather than block forever on a dead bus.
pub struct Mcp23s08<M, SPI> {
    transport: Mutex<M, RefCell<Transport<SPI>>>,
    /// Opcode with the address straps folded in; OR in the read flag per use
    opcode: u8,
}

impl<M: RawMutex, SPI: SpiBus> Mcp23s08<M, SPI> {
    /// Take ownership of the bus. `a1`/`a0` mirror the chip's address
    /// strap pins.
    pub fn new(spi: SPI, a1: bool, a0: bool) -> Self {
        Self {
            transport: Mutex::new(RefCell::new(Transport {
                spi,
                tx: [0; FRAME_LEN],
                rx: [0; FRAME_LEN],
            })),
            opcode: OPCODE_BASE | (a1 as u8) << 2 | (a0 as u8) << 1,
        }
    }

    /// Configure pin directions: LED out, every other used line in.
    ///
    /// Must complete before the first pin access. A failure here leaves
    /// the expander unusable (the LED line stays an input), so callers
    /// are expected to treat it as fatal.
    pub fn init(&self) -> Result<(), SPI::Error> {
        self.write_register(Register::Iodir, pins::input_direction_mask())
    }

    /// Read one register
    pub fn read_register(&self, register: Register) -> Result<u8, SPI::Error> {
        self.transport
            .lock(|t| t.borrow_mut().exchange(self.opcode | OPCODE_READ, register, 0))
    }

    /// Write one register
    pub fn write_register(&self, register: Register, value: u8) -> Result<(), SPI::Error> {
        self.transport
            .lock(|t| t.borrow_mut().exchange(self.opcode, register, value))
            .map(|_| ())
    }

    /// Current level of one GPIO line.
    ///
    /// Meant for the input roles; reading the LED role is allowed and
    /// returns its last-written state.
    pub fn read_pin(&self, role: PinRole) -> Result<bool, SPI::Error> {
        Ok(self.read_register(Register::Gpio)? & role.mask() != 0)
    }

    /// Set one GPIO line, leaving every other bit untouched.
    ///
    /// The register is byte-wide, so this is a read/modify/write. The
    /// mutex is held across both exchanges; the pair is indivisible with
    /// respect to every other caller, and the lock is released on the
    /// error path as well.
    pub fn write_pin(&self, role: PinRole, value: bool) -> Result<(), SPI::Error> {
        self.transport.lock(|t| {
            let mut t = t.borrow_mut();
            let current = t.exchange(self.opcode | OPCODE_READ, Register::Gpio, 0)?;
            let next = if value {
                current | role.mask()
            } else {
                current & !role.mask()
            };
            t.exchange(self.opcode, Register::Gpio, next)?;
            Ok(())
        })
    }
}
