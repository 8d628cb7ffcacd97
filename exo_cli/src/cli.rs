//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Keeps the non-blocking file appender alive for the process lifetime.
pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "exoctl", version, about = "Hip exoskeleton admittance controller")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/exo.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides the
    /// config's [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an admittance control session until stopped
    Run {
        /// Use the simulated joint and load cell instead of real devices
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
        /// Stop automatically after this many seconds
        #[arg(long, value_name = "SECS")]
        duration: Option<f64>,
        /// Append per-tick records to a CSV file
        #[arg(long, value_name = "FILE")]
        log_csv: Option<PathBuf>,
        /// Disable the interactive operator console on stdin
        #[arg(long, action = ArgAction::SetTrue)]
        no_console: bool,
        /// Enable real-time mode (SCHED_FIFO, CPU pinning, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on Linux: SCHED_FIFO priority, pinning to one CPU, and mlockall to keep the control loop out of the pager. May require elevated privileges (CAP_SYS_NICE, memlock ulimit)."
        )]
        rt: bool,
        /// SCHED_FIFO priority when --rt is enabled (Linux only)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// CPU index to pin to when --rt is enabled (Linux only)
        #[arg(long, value_name = "CPU")]
        rt_cpu: Option<usize>,
        /// Pace ticks with a spin-sleep clock for lower jitter
        #[arg(long, action = ArgAction::SetTrue)]
        spin: bool,
    },
    /// Tare the load cell and print the measured offset
    Tare {
        /// Use the simulated load cell
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
    },
    /// Quick health check (config parses, devices respond)
    SelfCheck {
        /// Check against the simulated devices
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
    },
}
