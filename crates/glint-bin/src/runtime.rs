//! Startup, the two-tick main loop, reload, and the shutdown sequence.
//!
//! All server state lives on the loop task. Async sources (listener,
//! client readers, tick timers, signals) only push [`Event`]s; every
//! mutation of the data graph happens here, in arrival order per client.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use core_commands::dispatch_line;
use core_config::{ConfigFile, Settings, PROCESS_TICK};
use core_driver::{DriverConfig, DriverRegistry, DriverSet};
use core_events::{
    client_channel, spawn_client_io, Event, EventSourceRegistry, ListenerSource, TickSource,
    TickKind, EVENT_CHANNEL_CAP,
};
use core_input::route_key;
use core_model::ClientKey;
use core_proto::response;
use core_render::render_frame;
use core_state::{serverscreen, ServerState, Visibility};

/// Command lines one client may have dispatched per process tick; the
/// rest stay queued (cross-client fairness).
pub const MAX_LINES_PER_TICK: usize = 40;

/// CLI overrides layered over the config file, kept around so a reload
/// re-applies them.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub drivers: Vec<String>,
    pub addr: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub foreground: bool,
    pub waittime: Option<u64>,
    pub syslog: Option<bool>,
    pub report_level: Option<u8>,
    pub rotate: Option<bool>,
}

impl Overrides {
    pub fn apply(&self, file: &ConfigFile) -> Settings {
        let mut settings = Settings::from_file(file);
        if !self.drivers.is_empty() {
            settings.drivers = self.drivers.clone();
        }
        if let Some(addr) = &self.addr {
            settings.bind = addr.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(user) = &self.user {
            settings.user = user.clone();
        }
        if self.foreground {
            settings.foreground = true;
        }
        if let Some(secs) = self.waittime {
            settings.wait_time = Duration::from_secs(secs.max(1));
        }
        if let Some(syslog) = self.syslog {
            settings.report_to_syslog = syslog;
        }
        if let Some(level) = self.report_level {
            settings.report_level = level.min(5);
        }
        if let Some(rotate) = self.rotate {
            settings.auto_rotate = rotate;
        }
        settings
    }
}

/// Load the config file and merge the CLI on top.
pub fn effective_settings(overrides: &Overrides) -> Result<Settings> {
    let file = core_config::load_from(overrides.config.as_deref())
        .context("configuration rejected")?;
    Ok(overrides.apply(&file))
}

/// Instantiate and initialize the configured driver modules.
pub fn build_drivers(settings: &Settings) -> Result<DriverSet> {
    if settings.drivers.is_empty() {
        bail!("no display driver configured (use Driver= or -d)");
    }
    let registry = DriverRegistry::builtin();
    let mut loaded = Vec::new();
    for name in &settings.drivers {
        let mut cfg = DriverConfig::new();
        if let Some(table) = settings.driver_tables.get(name) {
            for (key, value) in table {
                cfg.set(key, value.clone());
            }
        }
        let driver = registry
            .load(name, &cfg)
            .with_context(|| format!("driver \"{name}\" failed to load"))?;
        loaded.push(driver);
    }
    DriverSet::assemble(loaded).context("no output driver among the loaded modules")
}

pub fn build_state(settings: Settings) -> Result<ServerState> {
    let drivers = build_drivers(&settings)?;
    Ok(ServerState::new(drivers, settings))
}

/// Run the server on an already-bound listener until shutdown.
pub async fn serve(mut state: ServerState, listener: TcpListener, overrides: Overrides) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);

    let mut sources = EventSourceRegistry::new();
    sources.register(ListenerSource::new(listener));
    sources.register(TickSource::new(PROCESS_TICK, TickKind::Process));
    sources.register(TickSource::new(
        state.settings.frame_interval,
        TickKind::Render,
    ));
    #[cfg(unix)]
    sources.register(core_events::SignalSource);
    let _handles = sources.spawn_all(&tx);

    tracing::info!(
        target: "runtime",
        drivers = state.drivers.len(),
        width = state.props.width,
        height = state.props.height,
        "server running"
    );

    while let Some(event) = rx.recv().await {
        match event {
            Event::Connected { stream, peer } => {
                let (outbox, out_rx) = client_channel();
                let client = state.client_connected(outbox);
                spawn_client_io(stream, client, tx.clone(), out_rx);
                tracing::info!(target: "net", %peer, "connection accepted");
            }
            Event::Line { client, line } => {
                // a line for an already-reaped key is simply dropped
                if let Some(c) = state.store.client_mut(client) {
                    c.enqueue_line(line);
                }
            }
            Event::Disconnected { client } => {
                state.mark_gone(client);
            }
            Event::ProcessTick => process_tick(&mut state),
            Event::RenderTick => {
                let visibility = render_frame(&mut state);
                deliver_visibility(&state, visibility);
            }
            Event::Reload => {
                if let Err(e) = reload(&mut state, &overrides) {
                    tracing::error!(target: "runtime", error = %e, "reload failed, keeping previous configuration");
                }
            }
            Event::Shutdown => {
                shutdown(&mut state).await;
                break;
            }
        }
    }
    Ok(())
}

/// One process tick: drain a bounded slice of every client's inbox, then
/// poll drivers for keys and route them.
fn process_tick(state: &mut ServerState) {
    let clients: Vec<ClientKey> = state.store.clients.keys().collect();
    for client in clients {
        for _ in 0..MAX_LINES_PER_TICK {
            let Some(line) = state.store.client_mut(client).and_then(|c| c.next_line()) else {
                break;
            };
            dispatch_line(state, client, &line);
        }
    }
    for key in state.drivers.poll_keys() {
        route_key(state, &key);
    }
    state.reap_gone_clients();
}

fn deliver_visibility(state: &ServerState, events: Vec<Visibility>) {
    for event in events {
        match event {
            Visibility::Listen(client, sid) => state.send_to(client, response::listen(&sid)),
            Visibility::Ignore(client, sid) => state.send_to(client, response::ignore(&sid)),
        }
    }
}

/// SIGHUP: re-read the config, re-merge the CLI, and re-link drivers.
/// A geometry change cannot be applied live; the new driver set is
/// discarded in that case and only the settings take effect.
fn reload(state: &mut ServerState, overrides: &Overrides) -> Result<()> {
    tracing::info!(target: "runtime", "reloading configuration");
    let settings = effective_settings(overrides)?;
    let new_drivers = build_drivers(&settings)?;
    if new_drivers.props() == state.props {
        state.drivers.unload();
        state.drivers = new_drivers;
    } else {
        tracing::warn!(
            target: "runtime",
            "display geometry changed in config; keeping current drivers until restart"
        );
    }
    state.settings = settings;
    serverscreen::refresh(state);
    state.mark_menu_dirty();
    state.sync_menu_screen();
    Ok(())
}

/// Deterministic teardown: goodbye screen, one last frame, then drivers,
/// clients, menu, screens, sockets.
async fn shutdown(state: &mut ServerState) {
    tracing::info!(target: "runtime", "shutting down");
    serverscreen::show_goodbye(state);
    let _ = render_frame(state);
    tokio::time::sleep(Duration::from_millis(400)).await;

    let clients: Vec<ClientKey> = state.store.clients.keys().collect();
    for client in clients {
        state.mark_gone(client);
    }
    state.reap_gone_clients();
    state.menu.close();
    state.drivers.unload();
}
