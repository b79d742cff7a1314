//! glintd entrypoint: CLI parsing, logging, startup, and handoff to the
//! runtime loop.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use glintd::{build_state, serve, Overrides};

/// Character-cell display server.
#[derive(Parser, Debug)]
#[command(name = "glintd", version, about = "Character-cell display server")]
struct Args {
    /// Configuration file path (default: glintd.toml, then the platform
    /// config dir).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
    /// Display driver to load (repeatable; overrides the config file).
    #[arg(short = 'd', long = "driver")]
    driver: Vec<String>,
    /// Stay in the foreground (never daemonize).
    #[arg(short = 'f', long = "foreground")]
    foreground: bool,
    /// Bind address.
    #[arg(short = 'a', long = "addr")]
    addr: Option<String>,
    /// TCP port.
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,
    /// User to run as.
    #[arg(short = 'u', long = "user")]
    user: Option<String>,
    /// Default per-screen display time in seconds.
    #[arg(short = 'w', long = "waittime")]
    waittime: Option<u64>,
    /// Log to a file instead of stderr.
    #[arg(short = 's', long = "syslog")]
    syslog: Option<bool>,
    /// Log verbosity, 0 (errors only) to 5 (trace).
    #[arg(short = 'r', long = "reportlevel", value_parser = clap::value_parser!(u8).range(0..=5))]
    reportlevel: Option<u8>,
    /// Rotate screens automatically.
    #[arg(short = 'i', long = "rotate")]
    rotate: Option<bool>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            drivers: self.driver.clone(),
            addr: self.addr.clone(),
            port: self.port,
            user: self.user.clone(),
            foreground: self.foreground,
            waittime: self.waittime,
            syslog: self.syslog,
            report_level: self.reportlevel,
            rotate: self.rotate,
        }
    }
}

fn level_for(report_level: u8) -> &'static str {
    match report_level {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "info",
        4 => "debug",
        _ => "trace",
    }
}

fn init_logging(report_level: u8, to_file: bool) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(report_level)));
    if to_file {
        let appender = tracing_appender::rolling::never(".", "glintd.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(None)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let overrides = args.overrides();
    let settings = glintd::runtime::effective_settings(&overrides)?;

    let _log_guard = init_logging(settings.report_level, settings.report_to_syslog)?;
    tracing::info!(target: "runtime", version = env!("CARGO_PKG_VERSION"), "glintd starting");

    // privilege dropping and detaching are host-integration concerns
    // handled by the service manager; the flags are accepted and logged
    if !settings.foreground {
        tracing::info!(target: "runtime", "running attached; use a service manager to background glintd");
    }
    if settings.user != core_config::DEFAULT_USER {
        tracing::info!(target: "runtime", user = %settings.user, "user switching is delegated to the service manager");
    }

    let state = build_state(settings.clone())?;
    if state.drivers.needs_foreground() && !settings.foreground {
        tracing::info!(target: "runtime", "a loaded driver requires the foreground");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("tokio runtime")?;
    runtime.block_on(async move {
        let addr = format!("{}:{}", settings.bind, settings.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("cannot bind {addr}"))?;
        tracing::info!(target: "net", %addr, "listening");
        serve(state, listener, overrides).await
    })
}
