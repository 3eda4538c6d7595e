//! Device control core for a Raspberry Pi visual-acuity testing instrument.
//!
//! The instrument has a button-driven OLED menu, a Bluetooth audio output
//! selector, and an adaptive acuity test that moves the display with a stepper
//! motor until the optotype subtends the degree under test.
//!
//! Two control loops live here:
//!
//! - [`MainMenu`]: the menu state machine. The host calls [`MainMenu::tick`]
//!   once per frame; Bluetooth discovery and the loading animation run on
//!   background threads that share the display through [`SharedDisplay`].
//! - [`TestDriver`]: runs one test session, feeding sensor and subject input
//!   into the pure [`step`] function and carrying out each [`Directive`].
//!
//! Hardware is reached only through the traits in [`hardware`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use acuity_core::{
//!     Language, MockAudio, MockDisplay, MockMotor, MockReporter, MockResponder, MockSensor,
//!     SessionOutcome, SharedDisplay, TestConfig, TestDriver, TestOutcome, TestRig,
//! };
//!
//! let rig = TestRig {
//!     motor: Box::new(MockMotor::new()),
//!     sensor: Box::new(MockSensor::new([1.0])),
//!     display: SharedDisplay::new(MockDisplay::new()),
//!     responder: Box::new(MockResponder::new(Language::English, [true, false])),
//!     audio: Arc::new(MockAudio::new()),
//!     reporter: Box::new(MockReporter::new()),
//! };
//! let config = TestConfig { tick_interval: Duration::ZERO, ..TestConfig::default() };
//!
//! let outcome = TestDriver::new(rig, config).run()?;
//! assert_eq!(outcome, SessionOutcome::Completed(TestOutcome::Threshold(0.5)));
//! # Ok::<(), acuity_core::Error>(())
//! ```

#![warn(missing_docs)]

pub mod bitmap;
pub mod config;
mod error;
pub mod graphics;
pub mod hardware;
pub mod menu;
mod mock;
mod state;
pub mod sync;
pub mod vision;

// Re-export public API
pub use bitmap::Bitmap;
pub use config::{MenuConfig, TestConfig};
pub use error::{Error, HardwareError};
pub use hardware::{
    AudioPlayer, BluetoothManager, Button, ButtonInput, Device, DistanceSensor, Language, Motor,
    OledDisplay, Responder, ResultReporter, VolumeControl,
};
pub use menu::{MainMenu, Menu, MenuAction, MenuElement, MenuHardware, MenuStateId, RenderPayload};
pub use mock::{
    ManualClock, MockAudio, MockBluetooth, MockButtons, MockDisplay, MockMotor, MockReporter,
    MockResponder, MockSensor, MockVolume, MotorLog,
};
pub use state::MenuSnapshot;
pub use sync::{BackgroundTask, Clock, NavigationWindow, SharedDisplay, StopFlag, SystemClock};
pub use vision::{
    Directive, DistanceTable, Instruction, SessionOutcome, TestDriver, TestOutcome, TestRig,
    TestState, VisionTest, step,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_codes() {
        assert_eq!(Button::from_code(Button::CODE_UP).unwrap(), Button::Up);
        assert_eq!(Button::from_code(Button::CODE_DOWN).unwrap(), Button::Down);
        assert_eq!(Button::from_code(Button::CODE_CONFIRM).unwrap(), Button::Confirm);
        assert!(matches!(Button::from_code(9), Err(Error::UnknownButton(9))));
    }

    #[test]
    fn test_default_config() {
        let menu = MenuConfig::default();
        assert_eq!(menu.discovery_interval.as_secs(), 3);
        assert_eq!(menu.navigation_quiet.as_secs(), 3);
        assert_eq!(menu.animation_frame_interval.as_millis(), 50);

        let test = TestConfig::default();
        assert_eq!(test.start_degree, config::TEST_START_DEGREE);
        assert_eq!(test.distance_table.len(), 15);
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::English.code(), "en");
        assert_eq!(Language::Mandarin.code(), "zh");
    }

    #[test]
    fn test_shared_display_serializes_writes() {
        let mock = MockDisplay::new();
        let display = SharedDisplay::new(mock.clone());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let display = display.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        display.show(&graphics::optotype()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(mock.flush_count(), 100);
        let ring = graphics::optotype();
        assert!(mock.frames().iter().all(|f| *f == ring));
    }
}
