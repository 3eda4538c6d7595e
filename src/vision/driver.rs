//! Host loop carrying out test directives on the hardware.

use std::sync::Arc;

use log::{debug, info, trace, warn};

use crate::bitmap::Bitmap;
use crate::config::TestConfig;
use crate::error::{Error, HardwareError};
use crate::graphics;
use crate::hardware::{AudioPlayer, DistanceSensor, Language, Motor, Responder, ResultReporter};
use crate::sync::{SharedDisplay, StopFlag};
use crate::vision::machine::{Directive, Instruction, TestOutcome, VisionTest, step};

/// Collaborators used during a test session.
pub struct TestRig {
    /// Screen carriage.
    pub motor: Box<dyn Motor>,
    /// Screen distance sensor.
    pub sensor: Box<dyn DistanceSensor>,
    /// Display shared with the menu.
    pub display: SharedDisplay,
    /// Language choice and yes/no answers.
    pub responder: Box<dyn Responder>,
    /// Spoken instructions.
    pub audio: Arc<dyn AudioPlayer>,
    /// Receives the result.
    pub reporter: Box<dyn ResultReporter>,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionOutcome {
    /// The staircase reached a result.
    Completed(TestOutcome),
    /// The operator aborted the session.
    Aborted,
}

/// Runs one test session at a time.
///
/// The motor channel is closed at the end of every [`TestDriver::run`], whether
/// the session completed, was aborted, or failed.
pub struct TestDriver {
    rig: TestRig,
    config: TestConfig,
    abort: StopFlag,
    optotype: Bitmap,
}

impl TestDriver {
    /// A driver for sessions on `rig`.
    pub fn new(rig: TestRig, config: TestConfig) -> Self {
        Self {
            rig,
            config,
            abort: StopFlag::new(),
            optotype: graphics::optotype(),
        }
    }

    /// A handle that aborts the session from another thread.
    ///
    /// The abort is sticky: once raised, later runs end immediately.
    pub fn abort_handle(&self) -> StopFlag {
        self.abort.clone()
    }

    /// Run a full session: setup, the directive loop, then teardown.
    ///
    /// # Errors
    ///
    /// Hardware failures and invariant violations. An operator abort is not an
    /// error and yields [`SessionOutcome::Aborted`].
    pub fn run(&mut self) -> Result<SessionOutcome, Error> {
        info!("starting vision test");
        let mut test = VisionTest::new(self.config.start_degree);

        let result = self
            .setup(&mut test)
            .and_then(|()| self.main_loop(&mut test));
        let closed = self.teardown();

        match result {
            Ok(outcome) => {
                closed?;
                info!("vision test finished: {:?}", outcome);
                Ok(SessionOutcome::Completed(outcome))
            }
            Err(Error::Aborted) => {
                info!("vision test aborted by operator");
                closed?;
                Ok(SessionOutcome::Aborted)
            }
            Err(e) => {
                if let Err(close_err) = closed {
                    warn!("failed to close motor after error: {close_err}");
                }
                Err(e)
            }
        }
    }

    fn setup(&mut self, test: &mut VisionTest) -> Result<(), Error> {
        info!("setup section");

        self.rig.motor.open()?;
        self.rig.display.blank()?;

        test.cur_degree = self.config.start_degree;
        test.cur_distance = self.wait_for_distance()?;
        info!("set cur_distance to {}", test.cur_distance);

        debug!("choose language");
        let language = self.wait_for_language()?;
        test.lang = Some(language);
        info!("set language to: {}", language.code());

        if let Err(e) = self.rig.audio.play_async(&self.config.intro_clip, language) {
            warn!("failed to start intro audio: {e}");
        }
        Ok(())
    }

    fn wait_for_distance(&mut self) -> Result<f64, Error> {
        loop {
            if self.abort.is_stopped() {
                return Err(Error::Aborted);
            }
            let distance = self.rig.sensor.get_distance()?;
            if distance >= 0.0 {
                return Ok(distance);
            }
            trace!("no distance reading yet");
            if self.abort.sleep(self.config.sensor_retry_interval) {
                return Err(Error::Aborted);
            }
        }
    }

    fn wait_for_language(&mut self) -> Result<Language, Error> {
        loop {
            if self.abort.is_stopped() {
                return Err(Error::Aborted);
            }
            if let Some(language) = self.rig.responder.detect_language()? {
                return Ok(language);
            }
            trace!("no language chosen yet");
            if self.abort.sleep(self.config.language_retry_interval) {
                return Err(Error::Aborted);
            }
        }
    }

    fn main_loop(&mut self, test: &mut VisionTest) -> Result<TestOutcome, Error> {
        loop {
            if self.abort.is_stopped() {
                return Err(Error::Aborted);
            }

            if let Some(directive) = step(test, &self.config.distance_table)? {
                debug!("directive: {:?}, end: {}", directive.instruction, directive.end);
                if let Some(outcome) = self.dispatch(test, directive)? {
                    return Ok(outcome);
                }
            }

            if self.abort.sleep(self.config.tick_interval) {
                return Err(Error::Aborted);
            }
        }
    }

    /// Carry out one directive. Returns the outcome when the session ends.
    fn dispatch(
        &mut self,
        test: &mut VisionTest,
        directive: Directive,
    ) -> Result<Option<TestOutcome>, Error> {
        match directive.instruction {
            Instruction::StartMove { millimeters } => {
                self.rig.motor.move_by(millimeters)?;
                test.cur_distance += f64::from(millimeters) / 1000.0;
                debug!("moved {millimeters} mm, now at {} m", test.cur_distance);
            }
            Instruction::ShowImage => {
                self.rig.display.show(&self.optotype)?;
            }
            Instruction::AwaitUserResponse => {
                let visible = self.rig.responder.await_yes_no()?;
                info!("subject answered: {}", if visible { "visible" } else { "not visible" });
                test.got_resp = Some(visible);
            }
            Instruction::ShowResult(outcome) => {
                self.rig.display.blank()?;
                self.rig.reporter.report(outcome, directive.end)?;
                if directive.end {
                    return Ok(Some(outcome));
                }
            }
        }
        Ok(None)
    }

    fn teardown(&mut self) -> Result<(), HardwareError> {
        info!("end section");
        self.rig.motor.close()
    }
}
