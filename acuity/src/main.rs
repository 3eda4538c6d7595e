//! Terminal simulator for the acuity instrument.
//!
//! Frames are printed as ASCII art. Keys: `w`/`k` up, `s`/`j` down, empty line
//! to confirm, `q` to quit. During a test the subject answers with `y`/`n`.
//! Set `HEADPHONE_DEVICE_MAC` to connect a default device at startup; the
//! simulated devices use addresses `00:00:00:00:00:01` to `:03`.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use acuity_core::{
    Bitmap, Button, ButtonInput, Device, Error, HardwareError, Language, MainMenu, MenuConfig,
    MenuHardware, MenuStateId, MockAudio, MockBluetooth, MockMotor, MockSensor, MockVolume,
    OledDisplay, Responder, ResultReporter, SessionOutcome, SharedDisplay, SystemClock,
    TestConfig, TestDriver, TestOutcome, TestRig,
};
use log::{error, info, warn};

/// Display that prints every flushed frame to stdout.
struct TerminalDisplay {
    buffer: Bitmap,
}

impl OledDisplay for TerminalDisplay {
    fn clear(&mut self) {
        self.buffer.clear();
    }

    fn set_image(&mut self, image: &Bitmap) {
        self.buffer.blit(image, 0, 0);
    }

    fn display(&mut self) -> Result<(), HardwareError> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", self.buffer.to_ascii())?;
        out.flush()?;
        Ok(())
    }
}

/// Read one trimmed line from stdin; `InputClosed` at end of input.
fn read_line(prompt: &str) -> Result<String, HardwareError> {
    print!("{prompt} ");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(HardwareError::InputClosed);
    }
    Ok(line.trim().to_lowercase())
}

struct StdinButtons;

impl ButtonInput for StdinButtons {
    fn read_button(&mut self) -> Result<Button, Error> {
        loop {
            let code = match read_line("[w/s/enter/q]>")?.as_str() {
                "w" | "k" => Button::CODE_UP,
                "s" | "j" => Button::CODE_DOWN,
                "" => Button::CODE_CONFIRM,
                "q" => return Err(HardwareError::InputClosed.into()),
                other => {
                    warn!("unknown key {other:?}");
                    continue;
                }
            };
            return Button::from_code(code);
        }
    }
}

struct StdinResponder;

impl Responder for StdinResponder {
    fn detect_language(&mut self) -> Result<Option<Language>, HardwareError> {
        Ok(match read_line("language [en/zh]>")?.as_str() {
            "en" | "" => Some(Language::English),
            "zh" => Some(Language::Mandarin),
            _ => None,
        })
    }

    fn await_yes_no(&mut self) -> Result<bool, HardwareError> {
        loop {
            match read_line("can you see the gap? [y/n]>")?.as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => continue,
            }
        }
    }
}

struct TerminalReporter;

impl ResultReporter for TerminalReporter {
    fn report(&mut self, outcome: TestOutcome, end: bool) -> Result<(), HardwareError> {
        let text = match outcome {
            TestOutcome::Threshold(degree) => format!("smallest visible degree: {degree:.1}"),
            TestOutcome::BelowMinimum => "nothing visible at the smallest degree".to_string(),
            TestOutcome::AboveMaximum => "everything visible up to the largest degree".to_string(),
        };
        println!("result: {text}{}", if end { "" } else { " (partial)" });
        Ok(())
    }
}

fn simulated_bluetooth() -> MockBluetooth {
    let bluetooth = MockBluetooth::new(vec![
        Device::new("Living Room Speaker", "00:00:00:00:00:01"),
        Device::new("Headphones", "00:00:00:00:00:02"),
        Device::new("Out Of Range", "00:00:00:00:00:03"),
    ]);
    bluetooth.set_reachable(&["00:00:00:00:00:01", "00:00:00:00:00:02"]);
    bluetooth.set_connect_delay(Duration::from_secs(1));
    bluetooth
}

fn run() -> Result<(), Error> {
    let display = SharedDisplay::new(TerminalDisplay {
        buffer: Bitmap::screen(),
    });

    let rig = TestRig {
        motor: Box::new(MockMotor::new()),
        sensor: Box::new(MockSensor::new([1.2])),
        display: display.clone(),
        responder: Box::new(StdinResponder),
        audio: Arc::new(MockAudio::new()),
        reporter: Box::new(TerminalReporter),
    };
    let mut driver = TestDriver::new(rig, TestConfig::default());
    let tester = move || {
        match driver.run() {
            Ok(SessionOutcome::Completed(outcome)) => info!("session completed: {outcome:?}"),
            Ok(SessionOutcome::Aborted) => info!("session aborted"),
            Err(e) => error!("session failed: {e}"),
        }
        MenuStateId::Root
    };

    let hardware = MenuHardware {
        display,
        buttons: Box::new(StdinButtons),
        bluetooth: Arc::new(simulated_bluetooth()),
        volume: Arc::new(MockVolume::new(50)),
        clock: Arc::new(SystemClock),
    };
    let config = MenuConfig {
        animation_frame_interval: Duration::from_millis(250),
        ..MenuConfig::from_env()
    };
    let mut menu = MainMenu::new(hardware, tester, config)?;

    loop {
        match menu.tick() {
            Ok(()) => {}
            Err(Error::Hardware(HardwareError::InputClosed)) => {
                info!("input closed, exiting");
                break;
            }
            Err(e @ Error::UnknownButton(_)) => warn!("{e}"),
            Err(e) => {
                menu.shutdown();
                return Err(e);
            }
        }
    }
    menu.shutdown();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
