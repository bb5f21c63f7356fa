//! ST7032 character LCD controller driver (I2C)
//!
//! Drives the 8x2 AQM0802A panel. Every transfer writes a control byte
//! (0x00 = command, 0x40 = data) followed by one payload byte, then
//! waits the controller's settle time before the next transfer may
//! start. The follower-control command additionally waits for the
//! internal supply to stabilize.
//!
//! The controller keeps its own cursor; the driver mirrors no display
//! state. Display RAM addresses outside the two visible line windows
//! are rejected before any bus traffic.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// I2C address of the controller
pub const DEFAULT_ADDRESS: u8 = 0x3E;

/// Display RAM start address of the first line
pub const LINE1_ADDR: u8 = 0x00;
/// Display RAM start address of the second line
pub const LINE2_ADDR: u8 = 0x40;
/// Visible columns per line
pub const COLUMNS: u8 = 8;

/// Minimum settle time after any command or data transfer
const SETTLE_TIME_US: u32 = 27;
/// Extra settle after follower control while the supply ramps up
const FOLLOWER_SETTLE_MS: u32 = 200;

/// Control byte tagging the next byte as a command
const CONTROL_COMMAND: u8 = 0x00;
/// Control byte tagging the next byte as display data
const CONTROL_DATA: u8 = 0x40;

/// Command bytes (basic and extended instruction tables)
mod cmd {
    pub const CLEAR_DISPLAY: u8 = 0x01;
    pub const DISPLAY_CONTROL: u8 = 0x08;
    pub const FUNCTION_SET: u8 = 0x20;
    pub const SET_DDRAM_ADDR: u8 = 0x80;
    // Extended instruction table only
    pub const OSC_FREQUENCY: u8 = 0x10;
    pub const POWER_ICON_CONTRAST: u8 = 0x50;
    pub const FOLLOWER_CONTROL: u8 = 0x60;
    pub const CONTRAST_LOW: u8 = 0x70;
}

/// LCD channel errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The underlying I2C transfer failed
    Bus(E),
    /// Display RAM address outside the two visible line windows
    InvalidAddress(u8),
}

/// Failure policy for the startup sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitPolicy {
    /// Stop at the first failed step
    FailFast,
    /// Attempt every step, then report the first failure; the caller
    /// decides whether a partially configured panel is acceptable
    BestEffort,
}

/// Controller configuration
#[derive(Debug, Clone)]
pub struct St7032Config {
    /// Contrast, 6 bits (0-63)
    pub contrast: u8,
    /// Show the icon row
    pub icon: bool,
    /// Run the internal booster
    pub booster: bool,
    /// Voltage-follower gain ratio, 3 bits (0-7)
    pub follower_gain: u8,
    /// Startup failure policy
    pub init_policy: InitPolicy,
}

impl Default for St7032Config {
    /// Values the AQM0802A panel is specified for
    fn default() -> Self {
        Self {
            contrast: 0x20,
            icon: false,
            booster: true,
            follower_gain: 0b100,
            init_policy: InitPolicy::FailFast,
        }
    }
}

/// Function set: 8-bit bus, 2-line display, normal-height font
fn function_set(extended_table: bool) -> u8 {
    cmd::FUNCTION_SET | 0x10 | 0x08 | (extended_table as u8)
}

/// Internal oscillator: 1/5 bias, mid-range frequency
fn osc_frequency() -> u8 {
    cmd::OSC_FREQUENCY | 0b100
}

/// Low four contrast bits
fn contrast_low(contrast: u8) -> u8 {
    cmd::CONTRAST_LOW | (contrast & 0x0F)
}

/// Icon enable, booster enable, high two contrast bits
fn power_icon_contrast(icon: bool, booster: bool, contrast: u8) -> u8 {
    cmd::POWER_ICON_CONTRAST | (icon as u8) << 3 | (booster as u8) << 2 | ((contrast >> 4) & 0x03)
}

/// Voltage follower enable and gain ratio
fn follower_control(on: bool, gain: u8) -> u8 {
    cmd::FOLLOWER_CONTROL | (on as u8) << 3 | (gain & 0x07)
}

/// Display, cursor and blink enables
fn display_control(display_on: bool, cursor_on: bool, blink_on: bool) -> u8 {
    cmd::DISPLAY_CONTROL | (display_on as u8) << 2 | (cursor_on as u8) << 1 | (blink_on as u8)
}

const fn is_valid_address(address: u8) -> bool {
    matches!(address, 0x00..=0x07 | 0x40..=0x47)
}

/// ST7032 command/data channel
///
/// Callers sharing one panel across threads wrap the driver in a mutex
/// and hold it across whole command/data sequences; an interleaved byte
/// from a second caller would derail the controller's state machine.
pub struct St7032<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    config: St7032Config,
}

impl<I2C, D> St7032<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    /// Take ownership of the bus and delay source
    pub fn new(i2c: I2C, delay: D, config: St7032Config) -> Self {
        Self {
            i2c,
            delay,
            address: DEFAULT_ADDRESS,
            config,
        }
    }

    /// Run the fixed startup sequence.
    ///
    /// Basic function set, extended function set, oscillator, contrast,
    /// power/icon/booster, follower (with its long supply settle), back
    /// to the basic table, display on, clear. Step failures follow the
    /// configured [`InitPolicy`]; after a partial failure the panel is
    /// in the chip's default, not-yet-configured state.
    pub fn init(&mut self) -> Result<(), Error<I2C::Error>> {
        let follower = follower_control(true, self.config.follower_gain);
        let sequence = [
            function_set(false),
            function_set(true),
            osc_frequency(),
            contrast_low(self.config.contrast),
            power_icon_contrast(self.config.icon, self.config.booster, self.config.contrast),
            follower,
            function_set(false),
            display_control(true, false, false),
            cmd::CLEAR_DISPLAY,
        ];

        let mut first_failure = Ok(());
        for command in sequence {
            match self.send_command(command) {
                Ok(()) => {
                    // The follower drives the LCD supply rails
                    if command == follower {
                        self.delay.delay_ms(FOLLOWER_SETTLE_MS);
                    }
                }
                Err(e) => match self.config.init_policy {
                    InitPolicy::FailFast => return Err(e),
                    InitPolicy::BestEffort => {
                        if first_failure.is_ok() {
                            first_failure = Err(e);
                        }
                    }
                },
            }
        }
        first_failure
    }

    /// Send one command byte, then wait the settle time
    pub fn send_command(&mut self, command: u8) -> Result<(), Error<I2C::Error>> {
        self.write_tagged(CONTROL_COMMAND, command)
    }

    /// Send one character-code byte, then wait the settle time
    pub fn send_data(&mut self, data: u8) -> Result<(), Error<I2C::Error>> {
        self.write_tagged(CONTROL_DATA, data)
    }

    /// Move the cursor to a display RAM address.
    ///
    /// Valid addresses are 0x00-0x07 (line 1) and 0x40-0x47 (line 2);
    /// anything else fails without touching the bus.
    pub fn set_address(&mut self, address: u8) -> Result<(), Error<I2C::Error>> {
        if !is_valid_address(address) {
            return Err(Error::InvalidAddress(address));
        }
        self.send_command(cmd::SET_DDRAM_ADDR | address)
    }

    /// Wipe the display RAM and return the cursor home
    pub fn clear(&mut self) -> Result<(), Error<I2C::Error>> {
        self.send_command(cmd::CLEAR_DISPLAY)
    }

    fn write_tagged(&mut self, control: u8, payload: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write(self.address, &[control, payload])
            .map_err(Error::Bus)?;
        self.delay.delay_us(SETTLE_TIME_US);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    use embedded_hal::i2c::{ErrorType, Operation};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Nack;

    impl embedded_hal::i2c::Error for Nack {
        fn kind(&self) -> embedded_hal::i2c::ErrorKind {
            embedded_hal::i2c::ErrorKind::NoAcknowledge(
                embedded_hal::i2c::NoAcknowledgeSource::Unknown,
            )
        }
    }

    /// Recording I2C endpoint; optionally NACKs one specific command
    #[derive(Clone, Default)]
    struct FakeI2c(Arc<I2cState>);

    #[derive(Default)]
    struct I2cState {
        writes: StdMutex<Vec<[u8; 2]>>,
        nack_command: StdMutex<Option<u8>>,
    }

    impl FakeI2c {
        fn nack_on(command: u8) -> Self {
            let bus = Self::default();
            *bus.0.nack_command.lock().unwrap() = Some(command);
            bus
        }

        fn writes(&self) -> Vec<[u8; 2]> {
            self.0.writes.lock().unwrap().clone()
        }

        fn commands(&self) -> Vec<u8> {
            self.writes()
                .iter()
                .filter(|w| w[0] == CONTROL_COMMAND)
                .map(|w| w[1])
                .collect()
        }
    }

    impl ErrorType for FakeI2c {
        type Error = Nack;
    }

    impl I2c for FakeI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Nack> {
            assert_eq!(address, DEFAULT_ADDRESS);
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        assert_eq!(bytes.len(), 2, "one control byte, one payload byte");
                        if bytes[0] == CONTROL_COMMAND
                            && *self.0.nack_command.lock().unwrap() == Some(bytes[1])
                        {
                            return Err(Nack);
                        }
                        self.0.writes.lock().unwrap().push([bytes[0], bytes[1]]);
                    }
                    Operation::Read(_) => panic!("driver never reads"),
                }
            }
            Ok(())
        }
    }

    /// Recording delay source (nanoseconds per call)
    #[derive(Clone, Default)]
    struct FakeDelay(Arc<StdMutex<Vec<u32>>>);

    impl FakeDelay {
        fn delays(&self) -> Vec<u32> {
            self.0.lock().unwrap().clone()
        }
    }

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.lock().unwrap().push(ns);
        }
    }

    const DEFAULT_SEQUENCE: [u8; 9] = [0x38, 0x39, 0x14, 0x70, 0x56, 0x6C, 0x38, 0x0C, 0x01];

    fn panel(i2c: &FakeI2c, delay: &FakeDelay, config: St7032Config) -> St7032<FakeI2c, FakeDelay> {
        St7032::new(i2c.clone(), delay.clone(), config)
    }

    #[test]
    fn test_init_sends_fixed_sequence() {
        let (i2c, delay) = (FakeI2c::default(), FakeDelay::default());
        let mut lcd = panel(&i2c, &delay, St7032Config::default());

        lcd.init().unwrap();
        assert_eq!(i2c.commands(), DEFAULT_SEQUENCE);
    }

    #[test]
    fn test_init_settle_times() {
        let (i2c, delay) = (FakeI2c::default(), FakeDelay::default());
        let mut lcd = panel(&i2c, &delay, St7032Config::default());

        lcd.init().unwrap();
        let delays = delay.delays();
        // One short settle per transfer plus the follower's long one
        assert_eq!(delays.len(), DEFAULT_SEQUENCE.len() + 1);
        assert_eq!(delays.iter().filter(|&&ns| ns == 27_000).count(), 9);
        // 200 ms supply settle directly after the follower command
        assert_eq!(delays[6], 200_000_000);
    }

    #[test]
    fn test_init_respects_contrast_config() {
        let (i2c, delay) = (FakeI2c::default(), FakeDelay::default());
        let config = St7032Config {
            contrast: 0x3A,
            ..Default::default()
        };
        let mut lcd = panel(&i2c, &delay, config);

        lcd.init().unwrap();
        let commands = i2c.commands();
        assert_eq!(commands[3], 0x7A); // low bits 0b1010
        assert_eq!(commands[4], 0x57); // booster on, high bits 0b11
    }

    #[test]
    fn test_init_fail_fast_stops_at_first_failure() {
        let (i2c, delay) = (FakeI2c::nack_on(0x14), FakeDelay::default());
        let mut lcd = panel(&i2c, &delay, St7032Config::default());

        assert_eq!(lcd.init(), Err(Error::Bus(Nack)));
        // Only the two function-set commands made it out
        assert_eq!(i2c.commands(), [0x38, 0x39]);
    }

    #[test]
    fn test_init_best_effort_attempts_every_step() {
        let (i2c, delay) = (FakeI2c::nack_on(0x14), FakeDelay::default());
        let config = St7032Config {
            init_policy: InitPolicy::BestEffort,
            ..Default::default()
        };
        let mut lcd = panel(&i2c, &delay, config);

        // The failure is still reported, after the remaining steps ran
        assert_eq!(lcd.init(), Err(Error::Bus(Nack)));
        assert_eq!(i2c.commands(), [0x38, 0x39, 0x70, 0x56, 0x6C, 0x38, 0x0C, 0x01]);
    }

    #[test]
    fn test_send_data_tags_payload() {
        let (i2c, delay) = (FakeI2c::default(), FakeDelay::default());
        let mut lcd = panel(&i2c, &delay, St7032Config::default());

        lcd.send_data(0x41).unwrap();
        assert_eq!(i2c.writes(), [[CONTROL_DATA, 0x41]]);
    }

    #[test]
    fn test_set_address_accepts_line_windows() {
        let (i2c, delay) = (FakeI2c::default(), FakeDelay::default());
        let mut lcd = panel(&i2c, &delay, St7032Config::default());

        for address in [0x00, 0x07, 0x40, 0x47] {
            lcd.set_address(address).unwrap();
        }
        assert_eq!(i2c.commands(), [0x80, 0x87, 0xC0, 0xC7]);
    }

    #[test]
    fn test_set_address_rejects_before_transmitting() {
        let (i2c, delay) = (FakeI2c::default(), FakeDelay::default());
        let mut lcd = panel(&i2c, &delay, St7032Config::default());

        for address in [0x08, 0x39, 0x48, 0xFF] {
            assert_eq!(lcd.set_address(address), Err(Error::InvalidAddress(address)));
        }
        assert!(i2c.writes().is_empty(), "invalid address reached the bus");
        assert!(delay.delays().is_empty());
    }

    #[test]
    fn test_clear() {
        let (i2c, delay) = (FakeI2c::default(), FakeDelay::default());
        let mut lcd = panel(&i2c, &delay, St7032Config::default());

        lcd.clear().unwrap();
        assert_eq!(i2c.writes(), [[CONTROL_COMMAND, 0x01]]);
    }
}
