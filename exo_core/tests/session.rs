use std::sync::Arc;
use std::time::{Duration, Instant};

use exo_core::mocks::{ScriptedSensor, SpyActuator};
use exo_core::{
    ControlLoop, LoopCfg, NullSink, ParameterStore, RunState, SampleSink, StartOutcome, Supervisor,
};
use exo_traits::MonotonicClock;

fn quick_loop(torque: f64) -> ControlLoop<SpyActuator, ScriptedSensor> {
    quick_loop_with(torque, LoopCfg {
        zero_settle: Duration::ZERO,
        calibration_samples: 2,
        calibration_interval: Duration::ZERO,
        sensor_timeout: Duration::from_millis(10),
        ..LoopCfg::default()
    })
}

fn quick_loop_with(torque: f64, cfg: LoopCfg) -> ControlLoop<SpyActuator, ScriptedSensor> {
    ControlLoop::new(
        SpyActuator::new(),
        ScriptedSensor::after_calibration(0.0, cfg.calibration_samples as usize, torque),
        cfg,
        ParameterStore::default(),
        Arc::new(NullSink) as Arc<dyn SampleSink>,
        Arc::new(MonotonicClock::new()),
    )
    .expect("valid loop config")
}

fn wait_for(state: RunState, sup: &Supervisor, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if sup.state() == state {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn second_start_is_refused_and_leaves_the_session_untouched() {
    let mut sup = Supervisor::new();
    assert_eq!(sup.start(quick_loop(0.2)).unwrap(), StartOutcome::Started);
    assert!(wait_for(RunState::Running, &sup, Duration::from_secs(1)));

    let before = sup.handle().unwrap().ticks();
    assert_eq!(
        sup.start(quick_loop(0.2)).unwrap(),
        StartOutcome::AlreadyRunning
    );
    std::thread::sleep(Duration::from_millis(20));
    let after = sup.handle().unwrap().ticks();
    assert!(
        after > before,
        "refused start must not disturb the session ({before} -> {after})"
    );

    sup.stop();
    let report = sup.join_active().unwrap();
    assert_eq!(report.state, RunState::Stopped);
    assert!(report.error.is_none());
}

#[test]
fn stop_is_idempotent_from_the_operator_side() {
    let mut sup = Supervisor::new();
    sup.start(quick_loop(0.1)).unwrap();
    std::thread::sleep(Duration::from_millis(10));
    sup.stop();
    sup.stop();
    let report = sup.join_active().unwrap();
    assert_eq!(report.state, RunState::Stopped);
    assert!(report.error.is_none());
}

#[test]
fn a_new_session_may_start_once_the_previous_one_finished() {
    let mut sup = Supervisor::new();
    sup.start(quick_loop(0.1)).unwrap();
    sup.stop();
    sup.join_active().unwrap();
    assert_eq!(sup.state(), RunState::Idle);
    assert_eq!(sup.start(quick_loop(0.1)).unwrap(), StartOutcome::Started);
    sup.stop();
    let report = sup.join_active().unwrap();
    assert_eq!(report.state, RunState::Stopped);
}

#[test]
fn stop_during_calibration_ends_the_session_without_ticks() {
    // A long tare window; the stop lands before the loop reaches Running.
    let cfg = LoopCfg {
        zero_settle: Duration::ZERO,
        calibration_samples: 50,
        calibration_interval: Duration::from_millis(2),
        sensor_timeout: Duration::from_millis(10),
        ..LoopCfg::default()
    };
    let handle = quick_loop_with(0.0, cfg).spawn().unwrap();
    handle.request_stop();
    let report = handle.join();
    assert_eq!(report.state, RunState::Stopped);
    assert_eq!(report.ticks, 0);
    assert!(report.error.is_none());
}

#[test]
fn dropping_a_handle_stops_and_joins_the_session() {
    let handle = quick_loop(0.1).spawn().unwrap();
    let token = handle.stop_token();
    drop(handle);
    assert!(token.is_stop_requested());
}

#[test]
fn stop_token_is_shareable_across_threads() {
    let handle = quick_loop(0.1).spawn().unwrap();
    let token = handle.stop_token();
    let stopper = std::thread::spawn(move || token.request_stop());
    stopper.join().unwrap();
    let report = handle.join();
    assert_eq!(report.state, RunState::Stopped);
}
