mod cli;
mod run;
mod rt;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD};
use eyre::WrapErr;
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let cfg = load_config(&cli.config)?;
    init_tracing(&cli, &cfg.logging);

    match cli.cmd {
        Commands::Run {
            sim,
            duration,
            log_csv,
            no_console,
            rt,
            rt_prio,
            rt_cpu,
            spin,
        } => run::run_session(
            &cfg,
            &run::RunOpts {
                sim,
                json: cli.json,
                duration,
                log_csv,
                no_console,
                rt,
                rt_prio,
                rt_cpu,
                spin,
            },
        ),
        Commands::Tare { sim } => run::run_tare(&cfg, sim),
        Commands::SelfCheck { sim } => run::self_check(&cfg, sim),
    }
}

fn load_config(path: &Path) -> eyre::Result<exo_config::Config> {
    let cfg = if path.exists() {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading config {}", path.display()))?;
        exo_config::load_toml(&text)
            .wrap_err_with(|| format!("parsing config {}", path.display()))?
    } else {
        // Missing file means documented defaults, not an error; keeps the
        // simulated quick-start zero-setup.
        exo_config::Config::default()
    };
    cfg.validate()?;
    Ok(cfg)
}

fn init_tracing(cli: &Cli, logging: &exo_config::Logging) {
    let level = cli
        .log_level
        .as_deref()
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (pretty, json) = if cli.json {
        (None, Some(fmt::layer().json()))
    } else {
        (Some(fmt::layer()), None)
    };

    let file_layer = logging.file.as_deref().map(|file| {
        let path = Path::new(file);
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "exo.log".into());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer().json().with_ansi(false).with_writer(non_blocking)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty)
        .with(json)
        .with(file_layer)
        .init();
}
