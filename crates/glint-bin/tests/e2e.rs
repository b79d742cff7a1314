//! Socket-level scenarios against a real in-process server.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use core_config::Settings;
use glintd::{build_state, serve, Overrides};

async fn start_server() -> SocketAddr {
    let mut settings = Settings::default();
    settings.drivers = vec!["debug".to_string()];
    settings.frame_interval = Duration::from_millis(20);
    let state = build_state(settings).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = serve(state, listener, Overrides::default()).await;
    });
    addr
}

struct Proto {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Proto {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }

    /// Next line from the server, without the newline. Panics after two
    /// seconds of silence.
    async fn recv(&mut self) -> String {
        let mut line = String::new();
        let n = tokio::time::timeout(Duration::from_secs(2), self.reader.read_line(&mut line))
            .await
            .expect("server went silent")
            .unwrap();
        assert!(n > 0, "connection closed unexpectedly");
        line.trim_end_matches('\n').to_string()
    }

    /// Read until a line starts with `prefix`, returning it. Other lines
    /// (rotation notifications and the like) are skipped.
    async fn recv_until(&mut self, prefix: &str) -> String {
        for _ in 0..50 {
            let line = self.recv().await;
            if line.starts_with(prefix) {
                return line;
            }
        }
        panic!("no line starting with {prefix:?} arrived");
    }

    /// Next solicited reply, skipping unsolicited listen/ignore traffic.
    async fn recv_reply(&mut self) -> String {
        loop {
            let line = self.recv().await;
            if !line.starts_with("listen ") && !line.starts_with("ignore ") {
                return line;
            }
        }
    }

    async fn expect(&mut self, exact: &str) {
        assert_eq!(self.recv().await, exact);
    }

    async fn hello(&mut self) {
        self.send("hello").await;
        let greeting = self.recv().await;
        assert!(greeting.starts_with("connect LCDproc "));
    }
}

#[tokio::test]
async fn hello_handshake_reports_geometry() {
    let addr = start_server().await;
    let mut c = Proto::connect(addr).await;
    c.send("hello").await;
    let greeting = c.recv().await;
    assert!(greeting.starts_with("connect LCDproc "));
    assert!(greeting.contains(" protocol "));
    assert!(greeting.ends_with("lcd wid 20 hgt 4 cellwid 5 cellhgt 8"));
}

#[tokio::test]
async fn status_screen_setup_succeeds_end_to_end() {
    let addr = start_server().await;
    let mut c = Proto::connect(addr).await;
    c.hello().await;
    for cmd in [
        "client_set -name \"cpu\"",
        "screen_add s1",
        "screen_set s1 -name \"CPU\" -priority foreground -duration 8",
        "widget_add s1 t title",
        "widget_set s1 t \"CPU Usage\"",
        "widget_add s1 b hbar",
        "widget_set s1 b 1 2 500",
    ] {
        c.send(cmd).await;
        assert_eq!(c.recv_reply().await, "success", "command: {cmd}");
    }
}

#[tokio::test]
async fn exclusive_key_reservation_conflicts_and_recovers() {
    let addr = start_server().await;
    let mut a = Proto::connect(addr).await;
    let mut b = Proto::connect(addr).await;
    a.hello().await;
    b.hello().await;

    a.send("client_add_key -exclusively Enter").await;
    a.expect("success").await;

    b.send("client_add_key Enter").await;
    b.expect("huh? Could not reserve key \"Enter\"").await;
    b.send("client_add_key -exclusively Enter").await;
    b.expect("huh? Could not reserve key \"Enter\"").await;

    // closing A's connection releases its reservations at the next tick
    drop(a);
    tokio::time::sleep(Duration::from_millis(500)).await;
    b.send("client_add_key -exclusively Enter").await;
    b.expect("success").await;
}

#[tokio::test]
async fn foreground_screen_earns_a_listen_notification() {
    let addr = start_server().await;
    let mut c = Proto::connect(addr).await;
    c.hello().await;
    c.send("screen_add s1").await;
    c.send("screen_set s1 -priority foreground").await;
    // two successes plus, once the scheduler picks the screen, a listen
    let listen = c.recv_until("listen").await;
    assert_eq!(listen, "listen s1");
}

#[tokio::test]
async fn menu_goto_emits_enter_and_leave_events() {
    let addr = start_server().await;
    let mut c = Proto::connect(addr).await;
    c.hello().await;
    c.send("client_set -name tester").await;
    c.expect("success").await;
    c.send("menu_add_item \"\" n1 numeric \"Port\" -minvalue 1 -maxvalue 65535 -value 8080")
        .await;
    c.expect("success").await;
    c.send("menu_goto n1").await;
    c.expect("menuevent enter n1").await;
    c.expect("success").await;
    c.send("menu_goto _quit_").await;
    c.expect("menuevent leave n1").await;
    c.expect("success").await;
}

#[tokio::test]
async fn bye_tears_the_session_down() {
    let addr = start_server().await;
    let mut c = Proto::connect(addr).await;
    c.hello().await;
    c.send("screen_add s1").await;
    c.expect("success").await;
    c.send("bye").await;
    // the server closes the socket once the client is reaped; pending
    // rotation notifications may still drain first
    loop {
        let mut line = String::new();
        let n = tokio::time::timeout(Duration::from_secs(2), c.reader.read_line(&mut line))
            .await
            .expect("server kept the connection open")
            .unwrap();
        if n == 0 {
            break;
        }
        assert!(
            line.starts_with("listen ") || line.starts_with("ignore "),
            "unexpected reply after bye: {line:?}"
        );
    }
}

#[tokio::test]
async fn malformed_input_never_kills_the_server() {
    let addr = start_server().await;
    let mut c = Proto::connect(addr).await;
    c.hello().await;
    c.send("widget_set").await;
    assert!(c.recv().await.starts_with("huh?"));
    c.send("\"unterminated").await;
    assert!(c.recv().await.starts_with("huh?"));
    let long = "x".repeat(20_000);
    c.send(&long).await;
    assert!(c.recv().await.starts_with("huh?"));
    // still alive
    c.send("noop").await;
    c.expect("noop complete").await;
}
