//! Instrument-wide constants and runtime configuration.
//!
//! Timing parameters, screen geometry and test protocol bounds live here so they
//! can be tuned in one place.

use std::time::Duration;

use crate::vision::DistanceTable;

// Display

/// OLED width in pixels.
pub const SCREEN_WIDTH: u32 = 128;

/// OLED height in pixels. Icon menus show one entry per screen.
pub const SCREEN_HEIGHT: u32 = 64;

/// Height of one row in a text menu.
pub const MENU_TEXT_HEIGHT: u32 = 16;

// Menu

/// Interval between background Bluetooth list refreshes.
pub const DISCOVERY_INTERVAL_MS: u64 = 3000;

/// Quiet period after the last Up/Down press before refreshes resume.
pub const NAVIGATION_QUIET_MS: u64 = 3000;

/// Loading animation frame period.
pub const ANIMATION_FRAME_MS: u64 = 50;

/// Volume menu step in percent.
pub const VOLUME_STEP: u8 = 5;

/// Address used for the startup connection attempt when none is configured.
pub const DEFAULT_HEADPHONE_MAC: &str = "none";

/// Environment variable overriding [`DEFAULT_HEADPHONE_MAC`].
pub const HEADPHONE_MAC_ENV: &str = "HEADPHONE_DEVICE_MAC";

// Test protocol

/// Smallest optotype size under test, in degrees.
pub const MIN_DEGREE: f64 = 0.1;

/// Largest optotype size under test, in degrees.
pub const MAX_DEGREE: f64 = 1.5;

/// Staircase step, in degrees.
pub const DEGREE_STEP: f64 = 0.1;

/// Starting optotype size, in degrees.
pub const TEST_START_DEGREE: f64 = 0.5;

/// Positioning tolerance in meters.
pub const POSITION_TOLERANCE_M: f64 = 0.001;

/// Driver loop period.
pub const TEST_TICK_MS: u64 = 100;

/// Spacing between distance sensor polls during setup.
pub const SENSOR_RETRY_MS: u64 = 50;

/// Spacing between language detection polls during setup.
pub const LANGUAGE_RETRY_MS: u64 = 1000;

/// Audio clip played once the language is known.
pub const TEST_INTRO_CLIP: &str = "intro";

/// Runtime configuration for the menu controller.
#[derive(Debug, Clone)]
pub struct MenuConfig {
    /// Address of the headphone tried at startup.
    pub default_headphone: String,
    /// Period of the background discovery loop.
    pub discovery_interval: Duration,
    /// How long refreshes stay suppressed after Up/Down.
    pub navigation_quiet: Duration,
    /// Loading animation frame period.
    pub animation_frame_interval: Duration,
}

impl MenuConfig {
    /// Defaults, with the headphone address taken from `HEADPHONE_DEVICE_MAC` if set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(mac) = std::env::var(HEADPHONE_MAC_ENV) {
            if !mac.trim().is_empty() {
                config.default_headphone = mac.trim().to_string();
            }
        }
        config
    }
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            default_headphone: DEFAULT_HEADPHONE_MAC.to_string(),
            discovery_interval: Duration::from_millis(DISCOVERY_INTERVAL_MS),
            navigation_quiet: Duration::from_millis(NAVIGATION_QUIET_MS),
            animation_frame_interval: Duration::from_millis(ANIMATION_FRAME_MS),
        }
    }
}

/// Runtime configuration for a test session.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Degree the staircase starts from.
    pub start_degree: f64,
    /// Pause between driver iterations.
    pub tick_interval: Duration,
    /// Pause between distance polls while waiting for a reading.
    pub sensor_retry_interval: Duration,
    /// Pause between language polls.
    pub language_retry_interval: Duration,
    /// Clip played after the language is chosen.
    pub intro_clip: String,
    /// Target screen distance per degree.
    pub distance_table: DistanceTable,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            start_degree: TEST_START_DEGREE,
            tick_interval: Duration::from_millis(TEST_TICK_MS),
            sensor_retry_interval: Duration::from_millis(SENSOR_RETRY_MS),
            language_retry_interval: Duration::from_millis(LANGUAGE_RETRY_MS),
            intro_clip: TEST_INTRO_CLIP.to_string(),
            distance_table: DistanceTable::default(),
        }
    }
}
