//! ZIF socket on Linux GPIO lines
//!
//! Every socket pin is wired to one GPIO line of a single chip. Lines are
//! requested as inputs and switched to outputs as the profile requires.
//! Driving an input high turns its pull-up bias on, driving it low turns
//! the bias off again.

use crate::error::{LinuxGpioError, Result};

use gpiocdev::line::{Bias, Offset, Value};
use gpiocdev::request::{Config, Request};

use zifprom_core::programmer::ZifSocket;
use zifprom_core::socket::{Direction, SocketPin, SOCKET_PINS};

const PINS: usize = SOCKET_PINS as usize;

/// Configuration for opening a socket on a GPIO chip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxGpioSocketConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// GPIO line offset for each socket pin, socket pin 1 first
    pub lines: [Offset; PINS],
}

impl LinuxGpioSocketConfig {
    /// Socket pin k on line `base + k - 1`
    pub fn contiguous(device: impl Into<String>, base: Offset) -> Self {
        let mut lines = [0; PINS];
        for (offset, line) in (base..).zip(lines.iter_mut()) {
            *line = offset;
        }
        Self {
            device: device.into(),
            lines,
        }
    }

    /// Explicit wiring
    pub fn with_lines(device: impl Into<String>, lines: &[Offset]) -> Result<Self> {
        let lines: [Offset; PINS] = lines
            .try_into()
            .map_err(|_| LinuxGpioError::LineCount(lines.len()))?;
        for (i, line) in lines.iter().enumerate() {
            if lines[..i].contains(line) {
                return Err(LinuxGpioError::DuplicateLine(*line));
            }
        }
        Ok(Self {
            device: device.into(),
            lines,
        })
    }

    /// Line wired to a socket pin
    pub fn line(&self, pin: SocketPin) -> Offset {
        self.lines[pin.index()]
    }
}

/// A ZIF socket whose pins are Linux GPIO lines
pub struct LinuxGpioSocket {
    request: Request,
    config: Config,
    offsets: [Offset; PINS],
    directions: [Direction; PINS],
    levels: [bool; PINS],
}

impl LinuxGpioSocket {
    /// Request all 40 lines as unbiased inputs
    pub fn open(config: &LinuxGpioSocketConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }

        log::debug!("linux_gpio: Opening device {}", config.device);

        let mut req_config = Config::default();
        for &line in &config.lines {
            req_config
                .with_line(line)
                .as_input()
                .with_bias(Bias::Disabled);
        }

        let request = Request::from_config(req_config.clone())
            .on_chip(&config.device)
            .with_consumer("zifprom")
            .request()
            .map_err(LinuxGpioError::LineRequestFailed)?;

        log::info!(
            "linux_gpio: Opened {} (socket pin 1 = line {}, pin 40 = line {})",
            config.device,
            config.lines[0],
            config.lines[PINS - 1]
        );

        Ok(Self {
            request,
            config: req_config,
            offsets: config.lines,
            directions: [Direction::Input; PINS],
            levels: [false; PINS],
        })
    }

    fn value(high: bool) -> Value {
        if high {
            Value::Active
        } else {
            Value::Inactive
        }
    }

    /// Push the line settings for `pin` to the kernel
    fn apply(&mut self, pin: SocketPin) -> Result<()> {
        let index = pin.index();
        let line = self.config.with_line(self.offsets[index]);
        match self.directions[index] {
            Direction::Output => {
                line.as_output(Self::value(self.levels[index]));
            }
            Direction::Input => {
                let bias = if self.levels[index] {
                    Bias::PullUp
                } else {
                    Bias::Disabled
                };
                line.as_input().with_bias(bias);
            }
        }
        self.request
            .reconfigure(&self.config)
            .map(|_| ())
            .map_err(LinuxGpioError::ReconfigureFailed)
    }

    fn set_value(&mut self, pin: SocketPin, high: bool) -> Result<()> {
        self.request
            .set_value(self.offsets[pin.index()], Self::value(high))
            .map(|_| ())
            .map_err(LinuxGpioError::SetValueFailed)
    }

    fn get_value(&self, pin: SocketPin) -> Result<bool> {
        self.request
            .value(self.offsets[pin.index()])
            .map(|value| value == Value::Active)
            .map_err(LinuxGpioError::GetValueFailed)
    }
}

impl ZifSocket for LinuxGpioSocket {
    fn set_direction(&mut self, pin: SocketPin, direction: Direction) {
        if self.directions[pin.index()] == direction {
            return;
        }
        self.directions[pin.index()] = direction;
        if let Err(e) = self.apply(pin) {
            log::error!("linux_gpio: Failed to set direction of {}: {}", pin, e);
        }
    }

    fn drive(&mut self, pin: SocketPin, high: bool) {
        let index = pin.index();
        let changed = self.levels[index] != high;
        self.levels[index] = high;

        let result = match self.directions[index] {
            Direction::Output => self.set_value(pin, high),
            Direction::Input if changed => self.apply(pin),
            Direction::Input => Ok(()),
        };
        if let Err(e) = result {
            log::error!("linux_gpio: Failed to drive {}: {}", pin, e);
        }
    }

    fn sample(&mut self, pin: SocketPin) -> bool {
        match self.get_value(pin) {
            Ok(level) => level,
            Err(e) => {
                log::error!("linux_gpio: Failed to sample {}: {}", pin, e);
                false
            }
        }
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }
}

/// Parse socket options from a list of key-value pairs
///
/// # Supported Options
///
/// - `dev=/dev/gpiochipN` - GPIO chip device path (required, or use gpiochip)
/// - `gpiochip=N` - GPIO chip number (alternative to dev)
/// - `base=N` - socket pin k is wired to line N+k-1
/// - `lines=A:B:...` - 40 line offsets, socket pin 1 first
///
/// Exactly one of `base` and `lines` must be given.
pub fn parse_options(
    options: &[(&str, &str)],
) -> std::result::Result<LinuxGpioSocketConfig, String> {
    let mut device = String::new();
    let mut gpiochip: Option<u32> = None;
    let mut base: Option<Offset> = None;
    let mut lines: Option<Vec<Offset>> = None;

    for (key, value) in options {
        match *key {
            "dev" => {
                device = value.to_string();
            }
            "gpiochip" => {
                gpiochip = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid gpiochip value: {}", value))?,
                );
            }
            "base" => {
                base = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid base value: {}", value))?,
                );
            }
            "lines" => {
                lines = Some(
                    value
                        .split(':')
                        .map(|line| {
                            line.trim()
                                .parse()
                                .map_err(|_| format!("Invalid line offset: {}", line))
                        })
                        .collect::<std::result::Result<_, _>>()?,
                );
            }
            _ => {
                log::warn!("linux_gpio: Unknown option: {}={}", key, value);
            }
        }
    }

    // Handle dev vs gpiochip
    if device.is_empty() {
        if let Some(n) = gpiochip {
            device = format!("/dev/gpiochip{}", n);
        } else {
            return Err("Either 'dev' or 'gpiochip' must be specified.\n\
                 e.g. dev=/dev/gpiochip0,base=0"
                .to_string());
        }
    } else if gpiochip.is_some() {
        return Err("Only one of 'dev' or 'gpiochip' can be specified".to_string());
    }

    match (base, lines) {
        (Some(base), None) => Ok(LinuxGpioSocketConfig::contiguous(device, base)),
        (None, Some(lines)) => {
            LinuxGpioSocketConfig::with_lines(device, &lines).map_err(|e| e.to_string())
        }
        (Some(_), Some(_)) => Err("Only one of 'base' or 'lines' can be specified".to_string()),
        (None, None) => Err("Missing required parameter: base or lines".to_string()),
    }
}
