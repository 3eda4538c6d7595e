//! Mock collaborators for testing.
//!
//! Every mock is cheap to clone and clones share state, so a test can hand one
//! copy to the code under test and keep another to inspect what happened.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::bitmap::Bitmap;
use crate::error::{Error, HardwareError};
use crate::hardware::{
    AudioPlayer, BluetoothManager, Button, ButtonInput, Device, DistanceSensor, Language, Motor,
    OledDisplay, Responder, ResultReporter, VolumeControl,
};
use crate::sync::Clock;
use crate::vision::TestOutcome;

// =============================================================================
// Display
// =============================================================================

#[derive(Default)]
struct DisplayState {
    buffer: Option<Bitmap>,
    frames: Vec<Bitmap>,
}

/// A display that records every flushed frame.
///
/// # Example
///
/// ```
/// use acuity_core::{Bitmap, MockDisplay, SharedDisplay};
///
/// let mock = MockDisplay::new();
/// let display = SharedDisplay::new(mock.clone());
/// display.blank().unwrap();
/// assert!(mock.last_frame().unwrap().is_blank());
/// ```
#[derive(Clone, Default)]
pub struct MockDisplay {
    state: Arc<Mutex<DisplayState>>,
}

impl MockDisplay {
    /// An empty display.
    pub fn new() -> Self {
        Self::default()
    }

    /// All frames flushed so far, oldest first.
    pub fn frames(&self) -> Vec<Bitmap> {
        self.state.lock().unwrap().frames.clone()
    }

    /// The most recent frame.
    pub fn last_frame(&self) -> Option<Bitmap> {
        self.state.lock().unwrap().frames.last().cloned()
    }

    /// Number of flushes.
    pub fn flush_count(&self) -> usize {
        self.state.lock().unwrap().frames.len()
    }
}

impl OledDisplay for MockDisplay {
    fn clear(&mut self) {
        self.state.lock().unwrap().buffer = Some(Bitmap::screen());
    }

    fn set_image(&mut self, image: &Bitmap) {
        let mut state = self.state.lock().unwrap();
        let buffer = state.buffer.get_or_insert_with(Bitmap::screen);
        buffer.blit(image, 0, 0);
    }

    fn display(&mut self) -> Result<(), HardwareError> {
        let mut state = self.state.lock().unwrap();
        let frame = state.buffer.clone().unwrap_or_else(Bitmap::screen);
        state.frames.push(frame);
        Ok(())
    }
}

// =============================================================================
// Buttons
// =============================================================================

/// Replays a scripted sequence of presses, then reports the input as closed.
#[derive(Clone, Default)]
pub struct MockButtons {
    presses: Arc<Mutex<VecDeque<Button>>>,
}

impl MockButtons {
    /// Buttons that replay `presses` in order.
    pub fn new(presses: impl IntoIterator<Item = Button>) -> Self {
        Self {
            presses: Arc::new(Mutex::new(presses.into_iter().collect())),
        }
    }

    /// Queue another press.
    pub fn push(&self, button: Button) {
        self.presses.lock().unwrap().push_back(button);
    }
}

impl ButtonInput for MockButtons {
    fn read_button(&mut self) -> Result<Button, Error> {
        self.presses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(Error::Hardware(HardwareError::InputClosed))
    }
}

// =============================================================================
// Bluetooth
// =============================================================================

#[derive(Default)]
struct BluetoothState {
    devices: Mutex<Vec<Device>>,
    reachable: Mutex<Vec<String>>,
    attempts: Mutex<Vec<Device>>,
    connect_delay: Mutex<Duration>,
    list_delay: Mutex<Duration>,
    list_calls: AtomicUsize,
}

/// Bluetooth stack with a settable device list.
///
/// Only devices whose address was passed to [`MockBluetooth::set_reachable`]
/// connect successfully.
#[derive(Clone, Default)]
pub struct MockBluetooth {
    state: Arc<BluetoothState>,
}

impl MockBluetooth {
    /// A stack that lists `devices`.
    pub fn new(devices: Vec<Device>) -> Self {
        let mock = Self::default();
        mock.set_devices(devices);
        mock
    }

    /// Replace the listed devices.
    pub fn set_devices(&self, devices: Vec<Device>) {
        *self.state.devices.lock().unwrap() = devices;
    }

    /// Addresses that connect successfully.
    pub fn set_reachable(&self, addresses: &[&str]) {
        *self.state.reachable.lock().unwrap() = addresses.iter().map(|a| a.to_string()).collect();
    }

    /// Make every connection attempt block for `delay`.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.state.connect_delay.lock().unwrap() = delay;
    }

    /// Make every device listing block for `delay`.
    pub fn set_list_delay(&self, delay: Duration) {
        *self.state.list_delay.lock().unwrap() = delay;
    }

    /// Number of `list_devices` calls.
    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    /// Every device passed to `connect`, oldest first.
    pub fn connect_attempts(&self) -> Vec<Device> {
        self.state.attempts.lock().unwrap().clone()
    }
}

impl BluetoothManager for MockBluetooth {
    fn list_devices(&self) -> Result<Vec<Device>, HardwareError> {
        self.state.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.list_delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(self.state.devices.lock().unwrap().clone())
    }

    fn connect(&self, device: &Device) -> Result<bool, HardwareError> {
        self.state.attempts.lock().unwrap().push(device.clone());
        let delay = *self.state.connect_delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(self
            .state
            .reachable
            .lock()
            .unwrap()
            .iter()
            .any(|a| *a == device.address))
    }
}

// =============================================================================
// Volume
// =============================================================================

/// Volume control holding a single percentage.
#[derive(Clone)]
pub struct MockVolume {
    percent: Arc<Mutex<u8>>,
}

impl MockVolume {
    /// Volume starting at `percent`.
    pub fn new(percent: u8) -> Self {
        Self {
            percent: Arc::new(Mutex::new(percent)),
        }
    }

    /// Current volume.
    pub fn percent(&self) -> u8 {
        *self.percent.lock().unwrap()
    }
}

impl VolumeControl for MockVolume {
    fn get_volume(&self) -> Result<u8, HardwareError> {
        Ok(self.percent())
    }

    fn set_volume(&self, percent: u8) -> Result<(), HardwareError> {
        *self.percent.lock().unwrap() = percent;
        Ok(())
    }
}

// =============================================================================
// Motor and Sensor
// =============================================================================

/// Calls observed by a [`MockMotor`].
#[derive(Debug, Clone, Default)]
pub struct MotorLog {
    /// Whether the channel is open.
    pub is_open: bool,
    /// Number of `open` calls.
    pub opened: usize,
    /// Number of `close` calls.
    pub closed: usize,
    /// Accepted moves in millimeters.
    pub moves: Vec<i32>,
}

/// Motor that records moves and rejects them while the channel is closed.
#[derive(Clone, Default)]
pub struct MockMotor {
    log: Arc<Mutex<MotorLog>>,
}

impl MockMotor {
    /// A closed motor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the calls observed so far.
    pub fn log(&self) -> MotorLog {
        self.log.lock().unwrap().clone()
    }
}

impl Motor for MockMotor {
    fn open(&mut self) -> Result<(), HardwareError> {
        let mut log = self.log.lock().unwrap();
        log.is_open = true;
        log.opened += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), HardwareError> {
        let mut log = self.log.lock().unwrap();
        log.is_open = false;
        log.closed += 1;
        Ok(())
    }

    fn move_by(&mut self, millimeters: i32) -> Result<(), HardwareError> {
        let mut log = self.log.lock().unwrap();
        if !log.is_open {
            return Err(HardwareError::NotOpen("motor"));
        }
        log.moves.push(millimeters);
        Ok(())
    }
}

/// Distance sensor replaying scripted readings, repeating the last one.
#[derive(Clone)]
pub struct MockSensor {
    readings: Arc<Mutex<VecDeque<f64>>>,
    last: Arc<Mutex<f64>>,
    polls: Arc<AtomicUsize>,
}

impl MockSensor {
    /// Sensor replaying `readings`.
    pub fn new(readings: impl IntoIterator<Item = f64>) -> Self {
        Self {
            readings: Arc::new(Mutex::new(readings.into_iter().collect())),
            last: Arc::new(Mutex::new(-1.0)),
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `get_distance` calls.
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl DistanceSensor for MockSensor {
    fn get_distance(&mut self) -> Result<f64, HardwareError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.readings.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(*last)
    }
}

// =============================================================================
// Subject Input, Audio, Results
// =============================================================================

/// Scripted subject: language polls, then yes/no answers.
///
/// Once the language script runs out every poll returns `fallback_language`.
/// Running out of answers reports the input as closed.
#[derive(Clone)]
pub struct MockResponder {
    languages: Arc<Mutex<VecDeque<Option<Language>>>>,
    fallback_language: Option<Language>,
    answers: Arc<Mutex<VecDeque<bool>>>,
    asked: Arc<AtomicUsize>,
}

impl MockResponder {
    /// Subject who picks `language` at once and gives `answers`.
    pub fn new(language: Language, answers: impl IntoIterator<Item = bool>) -> Self {
        Self::with_language_polls(Vec::new(), Some(language), answers)
    }

    /// Subject whose language polls return `polls` first.
    pub fn with_language_polls(
        polls: Vec<Option<Language>>,
        fallback_language: Option<Language>,
        answers: impl IntoIterator<Item = bool>,
    ) -> Self {
        Self {
            languages: Arc::new(Mutex::new(polls.into())),
            fallback_language,
            answers: Arc::new(Mutex::new(answers.into_iter().collect())),
            asked: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of yes/no questions asked.
    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl Responder for MockResponder {
    fn detect_language(&mut self) -> Result<Option<Language>, HardwareError> {
        Ok(self
            .languages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback_language))
    }

    fn await_yes_no(&mut self) -> Result<bool, HardwareError> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(HardwareError::InputClosed)
    }
}

/// Audio player that records what it was asked to play.
#[derive(Clone, Default)]
pub struct MockAudio {
    played: Arc<Mutex<Vec<(String, Language)>>>,
}

impl MockAudio {
    /// Player with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clips played, oldest first.
    pub fn played(&self) -> Vec<(String, Language)> {
        self.played.lock().unwrap().clone()
    }
}

impl AudioPlayer for MockAudio {
    fn play_async(&self, clip: &str, language: Language) -> Result<(), HardwareError> {
        self.played.lock().unwrap().push((clip.to_string(), language));
        Ok(())
    }
}

/// Reporter that records every outcome.
#[derive(Clone, Default)]
pub struct MockReporter {
    reports: Arc<Mutex<Vec<(TestOutcome, bool)>>>,
}

impl MockReporter {
    /// Reporter with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcomes reported, oldest first.
    pub fn reports(&self) -> Vec<(TestOutcome, bool)> {
        self.reports.lock().unwrap().clone()
    }
}

impl ResultReporter for MockReporter {
    fn report(&mut self, outcome: TestOutcome, end: bool) -> Result<(), HardwareError> {
        self.reports.lock().unwrap().push((outcome, end));
        Ok(())
    }
}

// =============================================================================
// Clock
// =============================================================================

/// A clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// A clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }
}
