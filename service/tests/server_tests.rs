//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Acceptor and session lifecycle over real sockets

use bulletin_protocol::{Request, ResponseCodec};
use bulletin_service::{BulletinServer, ServerConfig, SessionState};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_util::codec::Framed;

const WAIT: Duration = Duration::from_secs(5);

type Conn = Framed<TcpStream, ResponseCodec>;

async fn server(config: ServerConfig) -> BulletinServer {
    let server = BulletinServer::new(config).await.unwrap();
    server.start().unwrap();
    server
}

fn local() -> ServerConfig {
    ServerConfig::new("127.0.0.1:0".parse().unwrap())
}

async fn connect(server: &BulletinServer) -> (Conn, Conn) {
    let command = TcpStream::connect(server.command_address()).await.unwrap();
    let notification = TcpStream::connect(server.notification_address())
        .await
        .unwrap();
    (
        Framed::new(command, ResponseCodec::new()),
        Framed::new(notification, ResponseCodec::new()),
    )
}

async fn request(conn: &mut Conn, line: &str) -> String {
    conn.send(Request::decode(line)).await.unwrap();
    timeout(WAIT, conn.next()).await.unwrap().unwrap().unwrap()
}

async fn next_event(conn: &mut Conn) -> String {
    timeout(WAIT, conn.next()).await.unwrap().unwrap().unwrap()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_join_and_notify_over_sockets() {
    let server = server(local()).await;
    let (mut alice, _alice_events) = connect(&server).await;
    let (mut bob, mut bob_events) = connect(&server).await;

    assert_eq!(
        request(&mut bob, "join bob").await,
        "bob has joined the bulletin board.\nMembers: bob"
    );
    assert_eq!(
        request(&mut alice, "join alice").await,
        "alice has joined the bulletin board.\nMembers: bob, alice"
    );
    assert_eq!(next_event(&mut bob_events).await, "JOIN alice");

    assert_eq!(
        request(&mut alice, "post alice 2024-10-28 Hi | there").await,
        "Message posted with ID 1."
    );
    assert_eq!(
        next_event(&mut bob_events).await,
        "POST 1,alice,2024-10-28,Hi"
    );

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_abrupt_disconnect_runs_cleanup() {
    let server = server(local()).await;
    let (mut alice, alice_events) = connect(&server).await;
    let (mut bob, mut bob_events) = connect(&server).await;
    request(&mut bob, "join bob").await;
    request(&mut alice, "join alice").await;
    assert_eq!(next_event(&mut bob_events).await, "JOIN alice");

    drop(alice);
    drop(alice_events);

    assert_eq!(next_event(&mut bob_events).await, "LEAVE alice");
    let registry = server.registry();
    wait_until(|| registry.len() == 1).await;
    assert!(!server.store().is_user("alice"));
    assert_eq!(request(&mut bob, "users").await, "bob");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_exit_closes_both_connections() {
    let server = server(local()).await;
    let (mut alice, mut alice_events) = connect(&server).await;
    request(&mut alice, "join alice").await;

    assert_eq!(request(&mut alice, "exit").await, "Goodbye!");
    assert!(timeout(WAIT, alice.next()).await.unwrap().is_none());
    assert!(timeout(WAIT, alice_events.next()).await.unwrap().is_none());

    let registry = server.registry();
    wait_until(|| registry.is_empty()).await;
    assert_eq!(server.store().user_count(), 0);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_server_full_is_reported() {
    let server = server(local().with_max_connections(1)).await;
    let (mut first, _first_events) = connect(&server).await;
    request(&mut first, "join alice").await;

    let (mut second, _second_events) = connect(&server).await;
    assert_eq!(next_event(&mut second).await, "Error: server is full");
    assert!(timeout(WAIT, second.next()).await.unwrap().is_none());
    assert_eq!(server.session_count(), 1);
    assert_eq!(server.metrics().snapshot().rejected_connections, 1);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unpaired_command_connection_is_dropped() {
    let server = server(local().with_pairing_timeout(Duration::from_millis(100))).await;
    let command = TcpStream::connect(server.command_address()).await.unwrap();
    let mut command = Framed::new(command, ResponseCodec::new());

    assert!(timeout(WAIT, command.next()).await.unwrap().is_none());
    assert_eq!(server.session_count(), 0);

    let (mut alice, _events) = connect(&server).await;
    assert!(request(&mut alice, "join alice").await.starts_with("alice has joined"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unpaired_command_connection_does_not_delay_others() {
    let server = server(local().with_pairing_timeout(Duration::from_secs(30))).await;
    let _stale = TcpStream::connect(server.command_address()).await.unwrap();
    sleep(Duration::from_millis(50)).await;

    let (mut bob, mut bob_events) = connect(&server).await;
    let reply = timeout(Duration::from_secs(2), request(&mut bob, "join bob"))
        .await
        .unwrap();
    assert!(reply.starts_with("bob has joined"));

    let (mut carol, _carol_events) = connect(&server).await;
    request(&mut carol, "join carol").await;
    assert_eq!(next_event(&mut bob_events).await, "JOIN carol");
    assert_eq!(server.session_count(), 2);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_overlong_line_ends_session() {
    let server = server(local().with_max_line_length(64)).await;
    let (mut alice, _events) = connect(&server).await;
    request(&mut alice, "join alice").await;

    let long = format!("post alice 2024-10-28 {} | x\n", "s".repeat(200));
    alice.get_mut().write_all(long.as_bytes()).await.unwrap();

    assert_eq!(
        next_event(&mut alice).await,
        "Error: line exceeds maximum length of 64 bytes"
    );
    assert!(timeout(WAIT, alice.next()).await.unwrap().is_none());
    let registry = server.registry();
    wait_until(|| registry.is_empty()).await;
    assert!(!server.store().is_user("alice"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_malformed_input_keeps_session_alive() {
    let server = server(local()).await;
    let (mut alice, _events) = connect(&server).await;

    alice
        .get_mut()
        .write_all(b"\xff\xfe garbage\r\n\n\0\0\n")
        .await
        .unwrap();
    assert!(next_event(&mut alice).await.starts_with("Error: unknown command"));
    assert!(next_event(&mut alice).await.starts_with("Error: unknown command"));

    assert_eq!(
        request(&mut alice, "%connect localhost 5000 alice").await,
        "Connected to the bulletin board server as alice."
    );
    assert!(request(&mut alice, "%join").await.starts_with("alice has joined"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_disconnects_sessions() {
    let server = server(local()).await;
    let (mut alice, mut alice_events) = connect(&server).await;
    request(&mut alice, "join alice").await;
    let session = server.registry().find_by_username("alice").unwrap();

    server.shutdown().await.unwrap();

    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(server.registry().is_empty());
    assert_eq!(server.store().user_count(), 0);
    assert!(timeout(WAIT, alice.next()).await.unwrap().is_none());
    assert!(timeout(WAIT, alice_events.next()).await.unwrap().is_none());
    assert_eq!(server.metrics().snapshot().active_sessions(), 0);
}
