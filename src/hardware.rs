//! Hardware collaborator interfaces.
//!
//! The control core never talks to GPIO, serial ports or BlueZ directly. Each
//! device is reached through one of these traits so the state machines can be
//! driven by mocks in tests and by real drivers on the instrument.

use crate::bitmap::Bitmap;
use crate::error::{Error, HardwareError};
use crate::vision::TestOutcome;

// =============================================================================
// Value Types
// =============================================================================

/// A Bluetooth audio device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Human readable name, also used as the menu title.
    pub name: String,
    /// Bluetooth MAC address.
    pub address: String,
}

impl Device {
    /// Create a device entry.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// A physical button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Move the selection up.
    Up,
    /// Move the selection down.
    Down,
    /// Activate the selected entry.
    Confirm,
}

impl Button {
    /// Raw code reported by the GPIO reader for [`Button::Up`].
    pub const CODE_UP: u8 = 0;
    /// Raw code for [`Button::Down`].
    pub const CODE_DOWN: u8 = 1;
    /// Raw code for [`Button::Confirm`].
    pub const CODE_CONFIRM: u8 = 2;

    /// Decode a raw button code.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownButton`] for any other code.
    pub fn from_code(code: u8) -> Result<Self, Error> {
        match code {
            Self::CODE_UP => Ok(Self::Up),
            Self::CODE_DOWN => Ok(Self::Down),
            Self::CODE_CONFIRM => Ok(Self::Confirm),
            other => Err(Error::UnknownButton(other)),
        }
    }
}

/// Language chosen by the test subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// English prompts.
    English,
    /// Mandarin Chinese prompts.
    Mandarin,
}

impl Language {
    /// Language code used to pick audio clips.
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Mandarin => "zh",
        }
    }
}

// =============================================================================
// Menu Collaborators
// =============================================================================

/// The OLED panel.
pub trait OledDisplay: Send {
    /// Clear the framebuffer.
    fn clear(&mut self);

    /// Draw an image into the framebuffer.
    fn set_image(&mut self, image: &Bitmap);

    /// Flush the framebuffer to the panel.
    fn display(&mut self) -> Result<(), HardwareError>;
}

/// The three front-panel buttons.
pub trait ButtonInput: Send {
    /// Block until the next button press.
    fn read_button(&mut self) -> Result<Button, Error>;
}

/// Bluetooth discovery and pairing.
pub trait BluetoothManager: Send + Sync {
    /// Devices currently visible, in display order.
    fn list_devices(&self) -> Result<Vec<Device>, HardwareError>;

    /// Connect audio output to `device`. Returns whether the connection succeeded.
    fn connect(&self, device: &Device) -> Result<bool, HardwareError>;
}

/// System output volume.
pub trait VolumeControl: Send + Sync {
    /// Current volume in percent (0-100).
    fn get_volume(&self) -> Result<u8, HardwareError>;

    /// Set the volume in percent (0-100).
    fn set_volume(&self, percent: u8) -> Result<(), HardwareError>;
}

// =============================================================================
// Test Collaborators
// =============================================================================

/// Stepper motor moving the display carriage.
pub trait Motor: Send {
    /// Open the serial control channel.
    fn open(&mut self) -> Result<(), HardwareError>;

    /// Close the serial control channel.
    fn close(&mut self) -> Result<(), HardwareError>;

    /// Move the carriage; negative values move it closer to the subject.
    fn move_by(&mut self, millimeters: i32) -> Result<(), HardwareError>;
}

/// Ultrasonic range finder.
pub trait DistanceSensor: Send {
    /// Distance in meters, or a negative value when no reading is available yet.
    fn get_distance(&mut self) -> Result<f64, HardwareError>;
}

/// Subject input during a test.
pub trait Responder: Send {
    /// The language the subject picked, if any yet.
    fn detect_language(&mut self) -> Result<Option<Language>, HardwareError>;

    /// Block until the subject answers whether the optotype is visible.
    fn await_yes_no(&mut self) -> Result<bool, HardwareError>;
}

/// Audio playback.
pub trait AudioPlayer: Send + Sync {
    /// Start playing `clip` in `language` without waiting for it to finish.
    fn play_async(&self, clip: &str, language: Language) -> Result<(), HardwareError>;
}

/// Receives the final test result.
pub trait ResultReporter: Send {
    /// Report an outcome. `end` is set when the session stops after this report.
    fn report(&mut self, outcome: TestOutcome, end: bool) -> Result<(), HardwareError>;
}
