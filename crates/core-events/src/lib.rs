//! Runtime event types and the async sources that feed the main loop.
//!
//! The loop task owns all server state; everything else (the TCP
//! listener, per-client readers, the two tick timers, the signal watcher)
//! runs as a detached task pushing [`Event`]s into one bounded channel.
//! The bound provides backpressure: a flooding client parks its reader
//! task rather than growing server memory. Per-client outbound lines
//! travel the other way through an unbounded channel drained by a writer
//! task (responses are small and self-limiting).

use std::net::SocketAddr;

use core_model::{ClientKey, Outbox};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

pub mod lines;

pub use lines::LineSplitter;

/// Bounded capacity of the main event channel.
pub const EVENT_CHANNEL_CAP: usize = 8192;

/// Read chunk size for client sockets.
const READ_CHUNK: usize = 1024;

#[derive(Debug)]
pub enum Event {
    /// A new TCP connection was accepted.
    Connected { stream: TcpStream, peer: SocketAddr },
    /// One complete command line arrived from a client.
    Line { client: ClientKey, line: String },
    /// A client socket reached EOF or errored.
    Disconnected { client: ClientKey },
    /// ~8 Hz: drain inboxes, dispatch commands, poll and route keys.
    ProcessTick,
    /// Frame cadence: scheduler, render walk, flush.
    RenderTick,
    /// SIGHUP: re-read configuration and re-link drivers.
    Reload,
    /// SIGINT/SIGTERM: run the shutdown sequence.
    Shutdown,
}

/// An async event producer. Implementors spawn one background task that
/// pushes events until the channel closes.
pub trait EventSource: Send + 'static {
    /// Stable name for logging.
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of sources spawned together at startup.
#[derive(Default)]
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn EventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: EventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    /// Spawn every registered source. Sources observe channel closure and
    /// exit on their own during shutdown.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            tracing::info!(target: "runtime", source = src.name(), "spawning event source");
            handles.push(src.spawn(tx.clone()));
        }
        handles
    }
}

/// Fixed-interval tick producer.
pub struct TickSource {
    interval: std::time::Duration,
    kind: TickKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    Process,
    Render,
}

impl TickSource {
    pub fn new(interval: std::time::Duration, kind: TickKind) -> Self {
        Self { interval, kind }
    }
}

impl EventSource for TickSource {
    fn name(&self) -> &'static str {
        match self.kind {
            TickKind::Process => "process-tick",
            TickKind::Render => "render-tick",
        }
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let kind = self.kind;
        let period = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // late ticks collapse instead of bursting to catch up
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let event = match kind {
                    TickKind::Process => Event::ProcessTick,
                    TickKind::Render => Event::RenderTick,
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        })
    }
}

/// TCP accept loop.
pub struct ListenerSource {
    listener: tokio::net::TcpListener,
}

impl ListenerSource {
    pub fn new(listener: tokio::net::TcpListener) -> Self {
        Self { listener }
    }
}

impl EventSource for ListenerSource {
    fn name(&self) -> &'static str {
        "tcp-listener"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.listener.accept().await {
                    Ok((stream, peer)) => {
                        if tx.send(Event::Connected { stream, peer }).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        // transient accept failures must not kill the daemon
                        tracing::warn!(target: "net", error = %e, "accept failed");
                    }
                }
            }
        })
    }
}

/// Unix signal watcher: SIGHUP reloads, SIGINT/SIGTERM shut down.
#[cfg(unix)]
pub struct SignalSource;

#[cfg(unix)]
impl EventSource for SignalSource {
    fn name(&self) -> &'static str {
        "signals"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        use tokio::signal::unix::{signal, SignalKind};
        tokio::spawn(async move {
            let mut hup = match signal(SignalKind::hangup()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(target: "runtime", error = %e, "cannot watch SIGHUP");
                    return;
                }
            };
            let mut term = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(target: "runtime", error = %e, "cannot watch SIGTERM");
                    return;
                }
            };
            loop {
                let event = tokio::select! {
                    _ = hup.recv() => Event::Reload,
                    _ = term.recv() => Event::Shutdown,
                    _ = tokio::signal::ctrl_c() => Event::Shutdown,
                };
                let stop = matches!(event, Event::Shutdown);
                if tx.send(event).await.is_err() || stop {
                    break;
                }
            }
        })
    }
}

/// Create the outbound channel for one client. The sender goes into the
/// client entity, the receiver into [`spawn_client_io`].
pub fn client_channel() -> (Outbox, tokio::sync::mpsc::UnboundedReceiver<String>) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Split an accepted stream into a reader task (producing `Line` /
/// `Disconnected` events) and a writer task draining `out_rx`.
pub fn spawn_client_io(
    stream: TcpStream,
    client: ClientKey,
    tx: Sender<Event>,
    mut out_rx: tokio::sync::mpsc::UnboundedReceiver<String>,
) {
    let (mut read_half, mut write_half) = stream.into_split();

    tokio::spawn(async move {
        let mut splitter = LineSplitter::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match read_half.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    for line in splitter.push(&chunk[..n]) {
                        if tx.send(Event::Line { client, line }).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!(target: "net", error = %e, "client read failed");
                    break;
                }
            }
        }
        let _ = tx.send(Event::Disconnected { client }).await;
    });

    tokio::spawn(async move {
        while let Some(line) = out_rx.recv().await {
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });
}
