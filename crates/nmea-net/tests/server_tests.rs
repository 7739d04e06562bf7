//! Integration tests for the transport servers
//!
//! Every test binds real sockets on `127.0.0.1:0` and talks to the server the
//! way a chart plotter or browser would:
//! - TCP clients read CRLF-terminated lines
//! - WebSocket clients read text frames through tokio-tungstenite
//! - Lifecycle checks cover stop, parent cancellation and bind failure

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use nmea_net::{
    BaudRate, NetError, Server, ServerConfig, ServerState, StaticAssets, Tcp2000Server,
    TcpServer, WebSocket2000Server, WebSocketServer,
};
use nmea_protocol::{parse_pgn_frame, verify_checksum, EncodePgn, Message, WaterDepth};
use nmea_sim::{PgnSink, SentenceOptions, Simulator};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Fast ticking loopback config with only position sentences
    pub fn position_config() -> ServerConfig {
        ServerConfig {
            update_interval: Duration::from_millis(200),
            sentences: SentenceOptions::position_only(),
            baud_rate: BaudRate::new(38400).unwrap(),
            ..ServerConfig::local()
        }
    }

    /// Poll until the server reports `expected` clients
    pub async fn wait_for_clients(server: &dyn Server, expected: usize) {
        timeout(WAIT, async {
            while server.client_count().await != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("{} never reached {expected} client(s)", server.name()));
    }

    pub async fn wait_for_state(server: &dyn Server, expected: ServerState) {
        timeout(WAIT, async {
            while server.state() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("{} never reached {expected:?}", server.name()));
    }

    pub async fn read_line(reader: &mut BufReader<TcpStream>) -> String {
        let mut line = String::new();
        let n = timeout(WAIT, reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap();
        assert!(n > 0, "connection closed");
        line
    }

    pub async fn next_text<S>(ws: &mut S) -> String
    where
        S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        loop {
            let frame = timeout(WAIT, ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("stream ended")
                .unwrap();
            if let WsMessage::Text(text) = frame {
                return text;
            }
        }
    }

    pub fn depth_message() -> Message {
        WaterDepth {
            depth: 10.5,
            offset: -1.5,
            max_range: 100.0,
        }
        .to_message()
    }

    /// Minimal HTTP/1.1 GET returning the raw response
    pub async fn http_get(addr: std::net::SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        timeout(WAIT, stream.read_to_string(&mut response))
            .await
            .unwrap()
            .unwrap();
        response
    }
}

use helpers::*;

// ============================================================================
// NMEA 0183 over TCP
// ============================================================================

#[tokio::test]
async fn test_tcp_position_only_tick_delivers_gga_then_gll() {
    let server = TcpServer::new(position_config());
    let addr = server.start(CancellationToken::new()).await.unwrap();
    assert_eq!(server.state(), ServerState::Serving);

    let stream = TcpStream::connect(addr).await.unwrap();
    wait_for_clients(&server, 1).await;
    let mut reader = BufReader::new(stream);

    let gga = read_line(&mut reader).await;
    let gll = read_line(&mut reader).await;
    assert!(gga.starts_with("$GPGGA,"), "{gga}");
    assert!(gll.starts_with("$GPGLL,"), "{gll}");
    assert!(gga.ends_with("\r\n"));
    verify_checksum(&gga).unwrap();
    verify_checksum(&gll).unwrap();

    // The next tick starts over with GGA
    assert!(read_line(&mut reader).await.starts_with("$GPGGA,"));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_tcp_budget_limits_each_tick() {
    // 4800 baud over 100 ms leaves 60 bytes: too small for a GGA sentence
    let config = ServerConfig {
        update_interval: Duration::from_millis(100),
        sentences: SentenceOptions::position_only(),
        ..ServerConfig::local()
    };
    let server = TcpServer::new(config);
    let addr = server.start(CancellationToken::new()).await.unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    wait_for_clients(&server, 1).await;
    tokio::time::sleep(Duration::from_millis(350)).await;

    let mut buf = [0u8; 256];
    let read = timeout(Duration::from_millis(100), stream.read(&mut buf)).await;
    assert!(read.is_err(), "expected no bytes, got {read:?}");
    assert_eq!(server.client_count().await, 1);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_disconnected_client_is_removed() {
    let server = TcpServer::new(position_config());
    let addr = server.start(CancellationToken::new()).await.unwrap();

    let first = TcpStream::connect(addr).await.unwrap();
    let _second = TcpStream::connect(addr).await.unwrap();
    wait_for_clients(&server, 2).await;

    drop(first);
    wait_for_clients(&server, 1).await;

    server.stop().await.unwrap();
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_stop_twice_closes_listener_and_clients() {
    let server = TcpServer::new(position_config());
    let addr = server.start(CancellationToken::new()).await.unwrap();

    let mut client = TcpStream::connect(addr).await.unwrap();
    wait_for_clients(&server, 1).await;

    server.stop().await.unwrap();
    server.stop().await.unwrap();

    assert_eq!(server.state(), ServerState::Stopped);
    assert_eq!(server.client_count().await, 0);
    assert!(TcpStream::connect(addr).await.is_err());

    // The client sees EOF once any in-flight tick has drained
    let mut buf = Vec::new();
    timeout(WAIT, client.read_to_end(&mut buf))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_parent_cancellation_stops_server() {
    let server = TcpServer::new(position_config());
    let cancel = CancellationToken::new();
    let addr = server.start(cancel.clone()).await.unwrap();

    cancel.cancel();
    wait_for_state(&server, ServerState::Stopped).await;
    assert!(TcpStream::connect(addr).await.is_err());

    // Explicit stop after cancellation is a no-op
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_start_twice_rejected() {
    let server = TcpServer::new(position_config());
    server.start(CancellationToken::new()).await.unwrap();

    let err = server.start(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, NetError::AlreadyStarted(ServerState::Serving)), "{err}");

    server.stop().await.unwrap();
    assert!(matches!(
        server.start(CancellationToken::new()).await,
        Err(NetError::AlreadyStarted(ServerState::Stopped))
    ));
}

#[tokio::test]
async fn test_bind_failure_is_returned() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let server = TcpServer::new(ServerConfig::local().with_port(port));
    let err = server.start(CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, NetError::Bind { .. }), "{err}");
    assert_eq!(server.state(), ServerState::Stopped);
    assert!(server.local_addr().is_none());
    server.stop().await.unwrap();
}

// ============================================================================
// NMEA 2000 over TCP
// ============================================================================

#[tokio::test]
async fn test_tcp2000_send_pgn_reaches_client() {
    let server = Tcp2000Server::new(ServerConfig::local());
    let addr = server.start(CancellationToken::new()).await.unwrap();

    let stream = TcpStream::connect(addr).await.unwrap();
    wait_for_clients(&server, 1).await;
    let mut reader = BufReader::new(stream);

    let msg = depth_message();
    server.send_pgn(&msg).await.unwrap();

    let line = read_line(&mut reader).await;
    assert!(line.starts_with("$PNMEA2K,128267,8,1A0400006AFF1027*"), "{line}");
    assert_eq!(parse_pgn_frame(&line).unwrap(), msg);

    server.stop().await.unwrap();
    // Sends after stop are dropped without error
    server.send_pgn(&msg).await.unwrap();
}

#[tokio::test]
async fn test_simulator_drives_tcp2000_in_batch_order() {
    let server = Arc::new(Tcp2000Server::new(ServerConfig::local()));
    let sim = Simulator::new(
        vec![Arc::clone(&server) as Arc<dyn PgnSink>],
        Duration::from_millis(100),
    );
    let cancel = CancellationToken::new();
    sim.start(cancel.clone()).await.unwrap();
    assert_eq!(server.state(), ServerState::Serving);

    let addr = server.local_addr().unwrap();
    let stream = TcpStream::connect(addr).await.unwrap();
    wait_for_clients(server.as_ref(), 1).await;
    let mut reader = BufReader::new(stream);

    // Skip the tail of a batch that may have started before we joined
    let mut pgns = Vec::new();
    while pgns.is_empty() {
        let msg = parse_pgn_frame(&read_line(&mut reader).await).unwrap();
        if msg.pgn == 127250 {
            pgns.push(msg.pgn);
        }
    }
    for _ in 0..4 {
        pgns.push(parse_pgn_frame(&read_line(&mut reader).await).unwrap().pgn);
    }
    assert_eq!(pgns, [127250, 128259, 128267, 129025, 130306]);

    sim.stop().await.unwrap();
    assert_eq!(server.state(), ServerState::Stopped);
}

// ============================================================================
// WebSocket
// ============================================================================

#[tokio::test]
async fn test_websocket_streams_sentences() {
    let server = WebSocketServer::new(position_config(), StaticAssets::new());
    let addr = server.start(CancellationToken::new()).await.unwrap();

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    wait_for_clients(&server, 1).await;

    let gga = next_text(&mut ws).await;
    let gll = next_text(&mut ws).await;
    assert!(gga.starts_with("$GPGGA,"), "{gga}");
    assert!(gll.starts_with("$GPGLL,"), "{gll}");
    verify_checksum(&gga).unwrap();

    server.stop().await.unwrap();
    assert_eq!(server.client_count().await, 0);

    // The server closes the socket on stop
    let ended = timeout(WAIT, async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(WsMessage::Close(_))) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok());
}

#[tokio::test]
async fn test_websocket_stop_twice_closes_listener() {
    let server = WebSocketServer::new(position_config(), StaticAssets::new());
    let addr = server.start(CancellationToken::new()).await.unwrap();

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    wait_for_clients(&server, 1).await;

    timeout(WAIT, server.stop()).await.unwrap().unwrap();
    timeout(WAIT, server.stop()).await.unwrap().unwrap();

    assert_eq!(server.state(), ServerState::Stopped);
    assert_eq!(server.client_count().await, 0);
    assert!(TcpStream::connect(addr).await.is_err());

    let ended = timeout(WAIT, async {
        while let Some(Ok(frame)) = ws.next().await {
            if let WsMessage::Close(_) = frame {
                break;
            }
        }
    })
    .await;
    assert!(ended.is_ok());
}

#[tokio::test]
async fn test_websocket2000_parent_cancellation_stops_server() {
    let server = WebSocket2000Server::new(ServerConfig::local(), StaticAssets::new());
    let cancel = CancellationToken::new();
    let addr = server.start(cancel.clone()).await.unwrap();

    cancel.cancel();
    wait_for_state(&server, ServerState::Stopped).await;
    assert!(TcpStream::connect(addr).await.is_err());

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_websocket2000_send_pgn() {
    let server = WebSocket2000Server::new(ServerConfig::local(), StaticAssets::new());
    let addr = server.start(CancellationToken::new()).await.unwrap();

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/nmea2000"))
        .await
        .unwrap();
    wait_for_clients(&server, 1).await;

    let msg = depth_message();
    server.send_pgn(&msg).await.unwrap();
    let text = next_text(&mut ws).await;
    assert_eq!(parse_pgn_frame(&text).unwrap(), msg);

    drop(ws);
    wait_for_clients(&server, 0).await;
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_websocket_wrong_path_is_not_upgraded() {
    let server = WebSocket2000Server::new(ServerConfig::local(), StaticAssets::new());
    let addr = server.start(CancellationToken::new()).await.unwrap();

    assert!(tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .is_err());
    assert_eq!(server.client_count().await, 0);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_monitoring_page_served_at_root() {
    let assets = StaticAssets::new().with_index("<h1>NMEA monitor</h1>");
    let server = WebSocketServer::new(ServerConfig::local(), assets);
    let addr = server.start(CancellationToken::new()).await.unwrap();

    let page = http_get(addr, "/").await;
    assert!(page.starts_with("HTTP/1.1 200"), "{page}");
    assert!(page.contains("NMEA monitor"));

    let missing = http_get(addr, "/nope.js").await;
    assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");

    server.stop().await.unwrap();
}
