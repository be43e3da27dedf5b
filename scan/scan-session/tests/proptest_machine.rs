//! Property-based tests for the scan state machine.
//!
//! Run with: cargo test -p scan-session -- proptest

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use scan_session::{
    Command, EngineEvent, FrameMetadata, FrameResult, Input, ReconstructionStats, ScanState,
    ScanStateMachine, SessionConfig,
};
use sensor_types::{CameraCalibration, ColorFrame, DepthMap, FrameSample, Timestamp};

#[derive(Debug, Clone, Copy)]
enum Step {
    Frame,
    Trigger,
    Confirmed,
    Lost,
    Tick,
    Safety,
    Failed(u32),
    Thermal,
    Background,
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => Just(Step::Frame),
        2 => Just(Step::Trigger),
        1 => Just(Step::Confirmed),
        1 => Just(Step::Lost),
        4 => Just(Step::Tick),
        1 => Just(Step::Safety),
        1 => (0u32..100).prop_map(Step::Failed),
        1 => Just(Step::Thermal),
        1 => Just(Step::Background),
    ]
}

fn sample(ms: u64) -> FrameSample {
    let ts = Timestamp::from_millis(ms);
    FrameSample::new(
        ColorFrame::filled(ts, 2, 2, [0, 0, 0, 255]),
        DepthMap::filled(ts, 2, 2, 0.2),
        CameraCalibration::default(),
        0.0,
    )
}

fn to_input(step: Step, machine: &ScanStateMachine, clock: &mut u64) -> Input {
    match step {
        Step::Frame => {
            *clock += 33;
            Input::Frame(sample(*clock))
        }
        Step::Trigger => Input::Trigger,
        Step::Confirmed => Input::SubjectConfirmed,
        Step::Lost => Input::SubjectLost,
        Step::Tick => Input::CountdownTick {
            epoch: machine.epoch(),
        },
        Step::Safety => Input::SafetyDelayElapsed {
            epoch: machine.epoch(),
        },
        Step::Failed(succeeded) => Input::Engine(EngineEvent::FrameProcessed {
            metadata: FrameMetadata {
                result: FrameResult::Failed,
                view_matrix: [[0.0; 4]; 4],
                projection_matrix: [[0.0; 4]; 4],
                color: None,
            },
            stats: ReconstructionStats {
                succeeded_count: succeeded,
            },
        }),
        Step::Thermal => Input::ThermalCritical,
        Step::Background => Input::Backgrounded,
    }
}

proptest! {
    /// Every frame that arrives while scanning is accumulated exactly once,
    /// in arrival order, and no other frame is.
    #[test]
    fn proptest_accumulates_scanning_frames_in_order(
        steps in prop::collection::vec(arb_step(), 1..200),
    ) {
        let mut machine = ScanStateMachine::new(SessionConfig::default());
        machine.handle(Input::CaptureRunning(true));
        let mut clock = 0;
        let mut expected = Vec::new();
        let mut accumulated = Vec::new();

        for step in steps {
            let scanning = machine.state() == ScanState::Scanning && !machine.is_finalizing();
            let input = to_input(step, &machine, &mut clock);
            if scanning {
                if let Input::Frame(sample) = &input {
                    expected.push(sample.timestamp);
                }
            }
            for command in machine.handle(input) {
                if let Command::Accumulate(sample) = command {
                    accumulated.push(sample.timestamp);
                }
            }
        }
        prop_assert_eq!(accumulated, expected);
    }

    /// Leaving idle requires a trigger or a confirmation; thermal always
    /// lands in idle.
    #[test]
    fn proptest_transitions_respect_entry_rules(
        steps in prop::collection::vec(arb_step(), 1..200),
    ) {
        let mut machine = ScanStateMachine::new(SessionConfig::default());
        machine.handle(Input::CaptureRunning(true));
        let mut clock = 0;

        for step in steps {
            let before = machine.state();
            let input = to_input(step, &machine, &mut clock);
            machine.handle(input);
            let after = machine.state();

            if before == ScanState::Idle && after != ScanState::Idle {
                prop_assert!(matches!(step, Step::Trigger | Step::Confirmed));
                prop_assert_eq!(after, ScanState::Countdown(3));
            }
            if matches!(step, Step::Thermal | Step::Background) {
                prop_assert_eq!(after, ScanState::Idle);
                prop_assert!(!machine.is_finalizing());
            }
        }
    }
}
