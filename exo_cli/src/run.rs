//! Session wiring: device assembly, record logging, operator console.

use crate::rt::setup_rt_once;
use exo_core::{
    AdmittanceGains, ChannelSink, ControlLoop, GainField, LoopCfg, ParameterStore, RecordReceiver,
    SampleSink, StopToken, Supervisor,
};
use exo_hardware::{LineTorqueSensor, SimulatedJoint, SimulatedLoadCell, SpinClock};
use exo_traits::{Actuator, Clock, MonotonicClock, TorqueSensor};
use eyre::WrapErr;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct RunOpts {
    pub sim: bool,
    pub json: bool,
    pub duration: Option<f64>,
    pub log_csv: Option<PathBuf>,
    pub no_console: bool,
    pub rt: bool,
    pub rt_prio: Option<i32>,
    pub rt_cpu: Option<usize>,
    pub spin: bool,
}

pub fn run_session(cfg: &exo_config::Config, opts: &RunOpts) -> eyre::Result<()> {
    setup_rt_once(opts.rt, opts.rt_prio, opts.rt_cpu);

    if opts.sim {
        // A quiet bias for tare plus a slow push, so the demo joint moves.
        let sensor = SimulatedLoadCell::new(0.2, 2.0, Duration::from_secs(2));
        run_with(cfg, opts, SimulatedJoint::new(), sensor)
    } else {
        let _sensor = open_serial_sensor(cfg)?;
        // The CAN motor driver is an external component; nothing to drive
        // the real joint with from this binary yet.
        eyre::bail!(
            "no motor driver is built into exoctl; run with --sim, or wire an Actuator implementation"
        );
    }
}

fn open_serial_sensor(
    cfg: &exo_config::Config,
) -> eyre::Result<LineTorqueSensor<std::io::BufReader<std::fs::File>>> {
    let file = std::fs::File::open(&cfg.device.serial_port)
        .wrap_err_with(|| format!("opening sensor port {}", cfg.device.serial_port))?;
    Ok(LineTorqueSensor::new(
        std::io::BufReader::new(file),
        cfg.sensor.arm_length_m,
    ))
}

fn run_with<A, S>(
    cfg: &exo_config::Config,
    opts: &RunOpts,
    actuator: A,
    sensor: S,
) -> eyre::Result<()>
where
    A: Actuator + Send + 'static,
    S: TorqueSensor + Send + 'static,
{
    let gains = AdmittanceGains::try_from(&cfg.admittance)?;
    let params = ParameterStore::new(gains);
    let loop_cfg = LoopCfg::from(cfg);

    let clock: Arc<dyn Clock + Send + Sync> = if opts.spin {
        Arc::new(SpinClock::new())
    } else {
        Arc::new(MonotonicClock::new())
    };

    let (sink, records) = ChannelSink::bounded(4096);
    let sink = Arc::new(sink);
    let writer = spawn_record_writer(records, opts.log_csv.clone(), cfg.control.frequency_hz)?;

    let control = ControlLoop::new(
        actuator,
        sensor,
        loop_cfg,
        params.clone(),
        sink.clone() as Arc<dyn SampleSink>,
        clock,
    )?;

    let mut supervisor = Supervisor::new();
    supervisor.start(control)?;
    let token = supervisor
        .handle()
        .map(|h| h.stop_token())
        .ok_or_else(|| eyre::eyre!("session did not start"))?;

    {
        let token = token.clone();
        ctrlc::set_handler(move || token.request_stop()).wrap_err("installing Ctrl-C handler")?;
    }
    if !opts.no_console {
        spawn_console(params.clone(), token.clone());
        tracing::info!("operator console ready: set <field> <value> | status | stop");
    }

    let started = Instant::now();
    while supervisor.handle().is_some_and(|h| !h.is_finished()) {
        if let Some(limit) = opts.duration {
            if started.elapsed().as_secs_f64() >= limit {
                supervisor.stop();
            }
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    let report = supervisor
        .join_active()
        .ok_or_else(|| eyre::eyre!("no session to join"))?;
    let dropped = sink.dropped();
    drop(sink); // disconnect the writer so it can flush and exit
    let rows = writer.join().unwrap_or(0);

    tracing::info!(
        ticks = report.ticks,
        state = %report.state,
        rows,
        dropped,
        "session finished"
    );
    if opts.json {
        println!(
            "{}",
            serde_json::json!({
                "ticks": report.ticks,
                "state": report.state.to_string(),
                "rows": rows,
                "dropped": dropped,
                "error": report.error.as_ref().map(std::string::ToString::to_string),
            })
        );
    }
    match report.error {
        Some(e) => Err(eyre::Report::new(e)),
        None => Ok(()),
    }
}

/// Drain records off the control thread: optionally append them to a CSV
/// (the columns the classic log used) and keep a low-rate progress pulse.
fn spawn_record_writer(
    records: RecordReceiver,
    log_csv: Option<PathBuf>,
    frequency_hz: u32,
) -> eyre::Result<std::thread::JoinHandle<u64>> {
    let mut csv_writer = match &log_csv {
        Some(path) => {
            let mut w = csv::Writer::from_path(path)
                .wrap_err_with(|| format!("creating {}", path.display()))?;
            w.write_record([
                "time_s",
                "theta_rad",
                "omega_rad_s",
                "torque_Nm",
                "desired_velocity_rad_s",
            ])?;
            Some(w)
        }
        None => None,
    };
    let pulse_every = u64::from(frequency_hz.max(1));
    std::thread::Builder::new()
        .name("exo-records".into())
        .spawn(move || {
            let mut rows: u64 = 0;
            for r in records {
                let mut write_failed = false;
                if let Some(w) = csv_writer.as_mut() {
                    if let Err(e) = w.write_record(&[
                        r.t.to_string(),
                        r.position.to_string(),
                        r.velocity.to_string(),
                        r.filtered_torque.to_string(),
                        r.commanded_velocity.to_string(),
                    ]) {
                        tracing::warn!(error = %e, "csv write failed; stopping record log");
                        write_failed = true;
                    }
                }
                if write_failed {
                    csv_writer = None;
                }
                rows += 1;
                if rows % pulse_every == 0 {
                    tracing::debug!(
                        t = r.t,
                        torque = r.filtered_torque,
                        command = r.commanded_velocity,
                        "control running"
                    );
                }
            }
            if let Some(mut w) = csv_writer {
                let _ = w.flush();
            }
            rows
        })
        .map_err(|e| eyre::eyre!("failed to spawn record writer: {e}"))
}

fn spawn_console(params: ParameterStore, token: StopToken) {
    let spawned = std::thread::Builder::new()
        .name("exo-console".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_console_line(&line) {
                    Some(ConsoleCmd::Stop) => {
                        token.request_stop();
                        break;
                    }
                    Some(ConsoleCmd::Status) => {
                        let g = params.snapshot();
                        println!(
                            "gains: M={} B={} K={} alpha={} | stop_requested={}",
                            g.mass,
                            g.damping,
                            g.stiffness,
                            g.filter_alpha,
                            token.is_stop_requested()
                        );
                    }
                    Some(ConsoleCmd::Set(field, value)) => match params.set(field, value) {
                        Ok(()) => println!("ok"),
                        Err(e) => println!("rejected: {e}"),
                    },
                    None => {
                        if !line.trim().is_empty() {
                            println!(
                                "commands: set <mass|damping|stiffness|alpha> <value> | status | stop"
                            );
                        }
                    }
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "operator console unavailable");
    }
}

#[derive(Debug, PartialEq)]
enum ConsoleCmd {
    Set(GainField, f64),
    Status,
    Stop,
}

fn parse_console_line(line: &str) -> Option<ConsoleCmd> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "stop" | "quit" => Some(ConsoleCmd::Stop),
        "status" => Some(ConsoleCmd::Status),
        "set" => {
            let field: GainField = parts.next()?.parse().ok()?;
            let value: f64 = parts.next()?.parse().ok()?;
            Some(ConsoleCmd::Set(field, value))
        }
        _ => None,
    }
}

pub fn run_tare(cfg: &exo_config::Config, sim: bool) -> eyre::Result<()> {
    let clock = MonotonicClock::new();
    let samples = cfg.calibration.samples;
    let interval = Duration::from_millis(cfg.calibration.interval_ms);
    let timeout = Duration::from_millis(cfg.sensor.read_timeout_ms);
    let offset = if sim {
        let mut sensor = SimulatedLoadCell::at_rest(0.1);
        exo_core::calibrate::tare(&mut sensor, &clock, samples, interval, timeout)?
    } else {
        let mut sensor = open_serial_sensor(cfg)?;
        exo_core::calibrate::tare(&mut sensor, &clock, samples, interval, timeout)?
    };
    println!("offset: {offset:.4} Nm");
    Ok(())
}

pub fn self_check(cfg: &exo_config::Config, sim: bool) -> eyre::Result<()> {
    cfg.validate()?;
    if sim {
        let mut sensor = SimulatedLoadCell::at_rest(0.0);
        sensor
            .read_raw(Duration::from_millis(cfg.sensor.read_timeout_ms))
            .map_err(|e| eyre::eyre!("simulated sensor: {e}"))?;
        let mut joint = SimulatedJoint::new();
        let responding = joint
            .connect()
            .map_err(|e| eyre::eyre!("simulated joint: {e}"))?;
        if !responding {
            eyre::bail!("simulated joint did not respond");
        }
        joint.disconnect().ok();
    } else {
        let mut sensor = open_serial_sensor(cfg)?;
        sensor
            .read_raw(Duration::from_millis(cfg.sensor.read_timeout_ms))
            .map_err(|e| eyre::eyre!("sensor port {}: {e}", cfg.device.serial_port))?;
    }
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_lines_parse() {
        assert_eq!(parse_console_line("stop"), Some(ConsoleCmd::Stop));
        assert_eq!(parse_console_line("status"), Some(ConsoleCmd::Status));
        assert_eq!(
            parse_console_line("set mass 0.002"),
            Some(ConsoleCmd::Set(GainField::Mass, 0.002))
        );
        assert_eq!(
            parse_console_line("set alpha 0.3"),
            Some(ConsoleCmd::Set(GainField::FilterAlpha, 0.3))
        );
        assert_eq!(parse_console_line("set mass"), None);
        assert_eq!(parse_console_line("set mass x"), None);
        assert_eq!(parse_console_line("bogus"), None);
        assert_eq!(parse_console_line("   "), None);
    }
}
