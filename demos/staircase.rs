//! Example: run one acuity test session against mock hardware.
//!
//! Run with: `RUST_LOG=debug cargo run --example staircase`

use std::sync::Arc;
use std::time::Duration;

use acuity_core::{
    Error, Language, MockAudio, MockDisplay, MockMotor, MockReporter, MockResponder, MockSensor,
    SharedDisplay, TestConfig, TestDriver, TestRig,
};

fn main() -> Result<(), Error> {
    env_logger::init();

    let motor = MockMotor::new();
    let reporter = MockReporter::new();
    let display = MockDisplay::new();

    // The subject sees 0.5 and 0.6 degrees but not 0.7.
    let rig = TestRig {
        motor: Box::new(motor.clone()),
        sensor: Box::new(MockSensor::new([-1.0, -1.0, 1.0])),
        display: SharedDisplay::new(display.clone()),
        responder: Box::new(MockResponder::new(Language::English, [true, true, false])),
        audio: Arc::new(MockAudio::new()),
        reporter: Box::new(reporter.clone()),
    };
    let config = TestConfig {
        tick_interval: Duration::from_millis(10),
        ..TestConfig::default()
    };

    let outcome = TestDriver::new(rig, config).run()?;
    println!("Outcome: {:?}", outcome);
    println!("Motor moves (mm): {:?}", motor.log().moves);
    println!("Frames drawn: {}", display.flush_count());
    println!("Reports: {:?}", reporter.reports());

    if let Some(frame) = display.frames().iter().rev().find(|f| !f.is_blank()) {
        println!("Last optotype frame:\n{}", frame.to_ascii());
    }
    Ok(())
}
