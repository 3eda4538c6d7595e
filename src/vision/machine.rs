//! Test state machine.

use log::{debug, info};

use crate::config::{DEGREE_STEP, MAX_DEGREE, MIN_DEGREE, POSITION_TOLERANCE_M};
use crate::error::Error;
use crate::hardware::Language;
use crate::vision::table::DistanceTable;

/// Phase of the staircase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestState {
    /// Check the degree is testable.
    #[default]
    Setup,
    /// Position the screen and show the optotype.
    ShowImage,
    /// Wait for the subject's answer.
    Input,
}

/// Final result of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TestOutcome {
    /// Smallest degree the subject could still see.
    Threshold(f64),
    /// Nothing was visible down to the smallest degree.
    BelowMinimum,
    /// Everything was visible up to the largest degree.
    AboveMaximum,
}

/// Physical action requested by [`step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    /// Report the result.
    ShowResult(TestOutcome),
    /// Display the optotype; the screen is in position.
    ShowImage,
    /// Move the screen by a signed displacement; negative is closer.
    StartMove {
        /// Signed displacement.
        millimeters: i32,
    },
    /// Collect a yes/no answer into [`VisionTest::got_resp`].
    AwaitUserResponse,
}

/// An [`Instruction`] plus whether the session ends after it is carried out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Directive {
    /// What to do.
    pub instruction: Instruction,
    /// Whether the session ends afterwards.
    pub end: bool,
}

impl Directive {
    fn proceed(instruction: Instruction) -> Self {
        Self {
            instruction,
            end: false,
        }
    }

    fn finish(outcome: TestOutcome) -> Self {
        Self {
            instruction: Instruction::ShowResult(outcome),
            end: true,
        }
    }
}

/// Context of one test session.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionTest {
    /// Current phase.
    pub state: TestState,
    /// Optotype size under test, in degrees.
    pub cur_degree: f64,
    /// Measured screen distance in meters; negative until measured.
    pub cur_distance: f64,
    /// Largest degree confirmed visible; negative until the first success.
    pub max_degree: f64,
    /// The subject's last answer, `None` while waiting.
    pub got_resp: Option<bool>,
    /// Language chosen during setup.
    pub lang: Option<Language>,
}

impl VisionTest {
    /// A fresh session starting at `start_degree`.
    pub fn new(start_degree: f64) -> Self {
        Self {
            state: TestState::Setup,
            cur_degree: start_degree,
            cur_distance: -1.0,
            max_degree: -1.0,
            got_resp: None,
            lang: None,
        }
    }

    /// Whether any degree has been confirmed visible.
    pub fn has_visible_degree(&self) -> bool {
        self.max_degree >= 0.0
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Advance the staircase by one tick.
///
/// Returns `Ok(None)` when the tick only changed state. A degree that passes the
/// range check but has no table entry is an invariant violation.
///
/// # Errors
///
/// [`Error::DistanceTableIndex`] if `table` does not cover the degree under test.
pub fn step(test: &mut VisionTest, table: &DistanceTable) -> Result<Option<Directive>, Error> {
    info!("--- step with state: {:?} ---", test.state);
    debug!(
        "cur_degree: {}, cur_distance: {}",
        test.cur_degree, test.cur_distance
    );

    match test.state {
        TestState::Setup => {
            if (MIN_DEGREE..=MAX_DEGREE).contains(&test.cur_degree) {
                test.state = TestState::ShowImage;
                test.got_resp = None;
                Ok(None)
            } else if test.has_visible_degree() {
                Ok(Some(Directive::finish(TestOutcome::AboveMaximum)))
            } else {
                Ok(Some(Directive::finish(TestOutcome::BelowMinimum)))
            }
        }

        TestState::ShowImage => {
            let target = table.target_for(test.cur_degree)?;
            let offset = target - test.cur_distance;
            debug!("{} m to target", offset.abs());

            if offset.abs() < POSITION_TOLERANCE_M {
                test.state = TestState::Input;
                Ok(Some(Directive::proceed(Instruction::ShowImage)))
            } else {
                let millimeters = (offset * 1000.0).round() as i32;
                Ok(Some(Directive::proceed(Instruction::StartMove { millimeters })))
            }
        }

        TestState::Input => match test.got_resp {
            None => Ok(Some(Directive::proceed(Instruction::AwaitUserResponse))),
            Some(visible) => {
                test.state = TestState::Setup;
                if visible {
                    test.max_degree = test.cur_degree;
                    test.cur_degree = round_tenth(test.cur_degree + DEGREE_STEP);
                    Ok(None)
                } else if !test.has_visible_degree() {
                    test.cur_degree = round_tenth(test.cur_degree - DEGREE_STEP);
                    Ok(None)
                } else {
                    Ok(Some(Directive::finish(TestOutcome::Threshold(
                        test.max_degree,
                    ))))
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Step until a directive appears, answering and positioning along the way.
    fn run_until_result(
        test: &mut VisionTest,
        table: &DistanceTable,
        answers: &[bool],
    ) -> (Directive, Vec<f64>) {
        let mut answers = answers.iter().copied();
        let mut shown = Vec::new();
        for _ in 0..1000 {
            let Some(directive) = step(test, table).unwrap() else {
                continue;
            };
            match directive.instruction {
                Instruction::StartMove { millimeters } => {
                    test.cur_distance += f64::from(millimeters) / 1000.0;
                }
                Instruction::ShowImage => shown.push(test.cur_degree),
                Instruction::AwaitUserResponse => test.got_resp = answers.next(),
                Instruction::ShowResult(_) => return (directive, shown),
            }
        }
        panic!("staircase did not terminate");
    }

    #[test]
    fn test_setup_in_range_emits_nothing() {
        let table = DistanceTable::default();
        let mut test = VisionTest::new(0.5);
        test.got_resp = Some(true);

        assert_eq!(step(&mut test, &table).unwrap(), None);
        assert_eq!(test.state, TestState::ShowImage);
        assert_eq!(test.got_resp, None);
    }

    #[test]
    fn test_start_move_is_signed_millimeters() {
        let table = DistanceTable::new(vec![1.234]);
        let mut test = VisionTest::new(0.1);
        test.state = TestState::ShowImage;
        test.cur_distance = 1.0;

        let directive = step(&mut test, &table).unwrap().unwrap();
        assert_eq!(
            directive.instruction,
            Instruction::StartMove { millimeters: 234 }
        );
        assert!(!directive.end);
        assert_eq!(test.state, TestState::ShowImage);

        test.cur_distance = 1.5;
        let directive = step(&mut test, &table).unwrap().unwrap();
        assert_eq!(
            directive.instruction,
            Instruction::StartMove { millimeters: -266 }
        );
    }

    #[test]
    fn test_in_position_shows_image() {
        let table = DistanceTable::new(vec![1.234]);
        let mut test = VisionTest::new(0.1);
        test.state = TestState::ShowImage;
        test.cur_distance = 1.2345;

        let directive = step(&mut test, &table).unwrap().unwrap();
        assert_eq!(directive.instruction, Instruction::ShowImage);
        assert_eq!(test.state, TestState::Input);
    }

    #[test]
    fn test_input_waits_until_answered() {
        let table = DistanceTable::default();
        let mut test = VisionTest::new(0.5);
        test.state = TestState::Input;

        for _ in 0..3 {
            let directive = step(&mut test, &table).unwrap().unwrap();
            assert_eq!(directive.instruction, Instruction::AwaitUserResponse);
            assert_eq!(test.state, TestState::Input);
        }

        test.got_resp = Some(true);
        assert_eq!(step(&mut test, &table).unwrap(), None);
        assert_eq!(test.state, TestState::Setup);
        assert_eq!(test.max_degree, 0.5);
        assert_eq!(test.cur_degree, 0.6);
    }

    #[test]
    fn test_failures_from_minimum_report_below_minimum() {
        let table = DistanceTable::default();
        let mut test = VisionTest::new(0.1);
        test.cur_distance = 0.0;

        let (directive, shown) = run_until_result(&mut test, &table, &[false]);
        assert_eq!(shown, vec![0.1]);
        assert_eq!(test.cur_degree, 0.0);
        assert_eq!(
            directive,
            Directive {
                instruction: Instruction::ShowResult(TestOutcome::BelowMinimum),
                end: true,
            }
        );
    }

    #[test]
    fn test_failures_step_down_by_tenths() {
        let table = DistanceTable::default();
        let mut test = VisionTest::new(0.4);
        test.cur_distance = 0.0;

        let (directive, shown) = run_until_result(&mut test, &table, &[false; 4]);
        assert_eq!(shown, vec![0.4, 0.3, 0.2, 0.1]);
        assert_eq!(
            directive.instruction,
            Instruction::ShowResult(TestOutcome::BelowMinimum)
        );
    }

    #[test]
    fn test_single_reversal_ends_with_threshold() {
        let table = DistanceTable::default();
        let mut test = VisionTest::new(0.5);
        test.cur_distance = 0.0;

        let (directive, shown) = run_until_result(&mut test, &table, &[true, false]);
        assert_eq!(shown, vec![0.5, 0.6]);
        assert_eq!(test.max_degree, 0.5);
        assert_eq!(
            directive,
            Directive {
                instruction: Instruction::ShowResult(TestOutcome::Threshold(0.5)),
                end: true,
            }
        );
    }

    #[test]
    fn test_failure_then_success_keeps_climbing() {
        let table = DistanceTable::default();
        let mut test = VisionTest::new(0.5);
        test.cur_distance = 0.0;

        let (directive, shown) = run_until_result(&mut test, &table, &[false, true, true, false]);
        assert_eq!(shown, vec![0.5, 0.4, 0.5, 0.6]);
        assert_eq!(
            directive.instruction,
            Instruction::ShowResult(TestOutcome::Threshold(0.5))
        );
    }

    #[test]
    fn test_all_visible_reports_above_maximum() {
        let table = DistanceTable::default();
        let mut test = VisionTest::new(1.4);
        test.cur_distance = 0.0;

        let (directive, _) = run_until_result(&mut test, &table, &[true, true]);
        assert_eq!(test.max_degree, 1.5);
        assert_eq!(
            directive.instruction,
            Instruction::ShowResult(TestOutcome::AboveMaximum)
        );
        assert!(directive.end);
    }

    #[test]
    fn test_short_table_is_an_error() {
        let table = DistanceTable::new(vec![0.5; 3]);
        let mut test = VisionTest::new(0.9);
        assert_eq!(step(&mut test, &table).unwrap(), None);
        assert!(matches!(
            step(&mut test, &table),
            Err(Error::DistanceTableIndex { index: 8, .. })
        ));
    }
}
