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

//! Session workers
//!
//! Every session runs two workers joined by the session's cancellation
//! token:
//! - [`CommandWorker`] reads requests, dispatches them and writes replies
//! - [`NotificationWorker`] drains the session's notification queue onto
//!   the paired connection
//!
//! Each worker holds a drop guard on the token, so whichever ends first,
//! for whatever reason, stops the other. [`supervise`] owns the
//! [`SessionCleanup`] guard that releases the session's board state.

use crate::config::ServerConfig;
use crate::dispatcher::CommandDispatcher;
use crate::error::{Result, ServiceError};
use crate::session::Session;
use bulletin_protocol::{CodecError, CommandCodec, Notification};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, error, trace, warn};

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Max time for one write to a client socket
    pub write_timeout: Duration,
    /// Longest accepted request line
    pub max_line_length: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for WorkerConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            write_timeout: config.write_timeout,
            max_line_length: config.max_line_length,
        }
    }
}

/// Runs [`CommandDispatcher::disconnect`] when dropped.
///
/// Held by the session supervisor so cleanup happens on every exit path,
/// including a panic in a worker or the supervisor task being aborted.
#[derive(Debug)]
pub struct SessionCleanup {
    dispatcher: CommandDispatcher,
    session: Arc<Session>,
}

impl SessionCleanup {
    /// Arm cleanup for `session`
    pub fn new(dispatcher: CommandDispatcher, session: Arc<Session>) -> Self {
        Self {
            dispatcher,
            session,
        }
    }
}

impl Drop for SessionCleanup {
    fn drop(&mut self) {
        self.dispatcher.disconnect(&self.session);
        debug!(session_id = %self.session.id(), "session cleaned up");
    }
}

/// Reads requests from the command connection and answers them in order
pub struct CommandWorker {
    session: Arc<Session>,
    framed: Framed<TcpStream, CommandCodec>,
    dispatcher: CommandDispatcher,
    config: WorkerConfig,
}

impl CommandWorker {
    /// Create a worker for the command connection of `session`
    pub fn new(
        session: Arc<Session>,
        stream: TcpStream,
        dispatcher: CommandDispatcher,
        config: WorkerConfig,
    ) -> Self {
        let codec = CommandCodec::with_max_length(config.max_line_length);
        Self {
            session,
            framed: Framed::new(stream, codec),
            dispatcher,
            config,
        }
    }

    /// Run until `exit`, peer close, a transport error or cancellation
    pub async fn run(mut self) {
        let _guard = self.session.cancel_token().clone().drop_guard();
        match self.event_loop().await {
            Ok(()) => debug!(session_id = %self.session.id(), "command loop finished"),
            Err(err) => warn!(
                session_id = %self.session.id(),
                peer = %self.session.peer_addr(),
                error = %err,
                "command connection failed"
            ),
        }
    }

    async fn event_loop(&mut self) -> Result<()> {
        let cancel = self.session.cancel_token().clone();
        loop {
            select! {
                _ = cancel.cancelled() => return Ok(()),

                frame = self.framed.next() => match frame {
                    Some(Ok(request)) => {
                        let Some(reply) = self.dispatcher.dispatch(&self.session, &request) else {
                            continue;
                        };
                        self.write(reply.text).await?;
                        if reply.close {
                            return Ok(());
                        }
                    }
                    Some(Err(err @ CodecError::LineTooLong { .. })) => {
                        // Best effort; the connection is dropped either way.
                        let _ = self.write(format!("Error: {err}")).await;
                        return Err(err.into());
                    }
                    Some(Err(err)) => return Err(err.into()),
                    None => return Ok(()),
                },
            }
        }
    }

    async fn write(&mut self, text: String) -> Result<()> {
        timeout(self.config.write_timeout, self.framed.send(text))
            .await
            .map_err(|_| ServiceError::Timeout)??;
        Ok(())
    }
}

impl std::fmt::Debug for CommandWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandWorker")
            .field("session", &self.session.id())
            .field("config", &self.config)
            .finish()
    }
}

/// Writes queued notifications to the notification connection
pub struct NotificationWorker {
    session: Arc<Session>,
    framed: Framed<TcpStream, CommandCodec>,
    queue: mpsc::Receiver<Notification>,
    config: WorkerConfig,
}

impl NotificationWorker {
    /// Create a worker draining `queue` onto `stream`
    pub fn new(
        session: Arc<Session>,
        stream: TcpStream,
        queue: mpsc::Receiver<Notification>,
        config: WorkerConfig,
    ) -> Self {
        let codec = CommandCodec::with_max_length(config.max_line_length);
        Self {
            session,
            framed: Framed::new(stream, codec),
            queue,
            config,
        }
    }

    /// Run until cancellation, peer close or a failed or slow write
    pub async fn run(mut self) {
        let _guard = self.session.cancel_token().clone().drop_guard();
        match self.event_loop().await {
            Ok(()) => debug!(session_id = %self.session.id(), "notification loop finished"),
            Err(err) => warn!(
                session_id = %self.session.id(),
                peer = %self.session.peer_addr(),
                error = %err,
                "notification connection failed"
            ),
        }
    }

    async fn event_loop(&mut self) -> Result<()> {
        let cancel = self.session.cancel_token().clone();
        loop {
            select! {
                _ = cancel.cancelled() => return Ok(()),

                notification = self.queue.recv() => match notification {
                    Some(notification) => {
                        trace!(session_id = %self.session.id(), %notification, "delivering");
                        timeout(self.config.write_timeout, self.framed.send(notification))
                            .await
                            .map_err(|_| ServiceError::Timeout)??;
                    }
                    None => return Ok(()),
                },

                // Clients never send on this connection; reading only detects closure.
                frame = self.framed.next() => match frame {
                    Some(Ok(stray)) => {
                        if !stray.is_empty() {
                            debug!(session_id = %self.session.id(), line = %stray, "ignoring input on notification connection");
                        }
                    }
                    Some(Err(err)) => return Err(err.into()),
                    None => return Ok(()),
                },
            }
        }
    }
}

impl std::fmt::Debug for NotificationWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationWorker")
            .field("session", &self.session.id())
            .field("config", &self.config)
            .finish()
    }
}

/// Run both workers of a session and clean up once they are done
pub async fn supervise(
    session: Arc<Session>,
    command: TcpStream,
    notification: TcpStream,
    queue: mpsc::Receiver<Notification>,
    dispatcher: CommandDispatcher,
    config: WorkerConfig,
) {
    let _cleanup = SessionCleanup::new(dispatcher.clone(), session.clone());

    let commands = tokio::spawn(
        CommandWorker::new(session.clone(), command, dispatcher, config.clone()).run(),
    );
    let notifications =
        tokio::spawn(NotificationWorker::new(session.clone(), notification, queue, config).run());

    let (commands, notifications) = tokio::join!(commands, notifications);
    for (worker, result) in [("command", commands), ("notification", notifications)] {
        if let Err(err) = result {
            error!(session_id = %session.id(), worker, error = %err, "session worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ServerMetrics;
    use crate::registry::SessionRegistry;
    use crate::types::SessionState;
    use bulletin_board::BoardStore;
    use bulletin_protocol::{Request, ResponseCodec};
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    async fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (server, client)
    }

    fn dispatcher() -> CommandDispatcher {
        CommandDispatcher::new(
            Arc::new(BoardStore::new(["General"])),
            Arc::new(SessionRegistry::new()),
            Arc::new(ServerMetrics::new()),
        )
    }

    #[tokio::test]
    async fn test_command_worker_replies_and_exits() {
        let dispatcher = dispatcher();
        let token = CancellationToken::new();
        let (tx, _rx) = mpsc::channel(4);
        let (server, client) = socket_pair().await;
        let session = dispatcher
            .registry()
            .create(server.peer_addr().unwrap(), tx, &token);

        let worker = CommandWorker::new(
            session.clone(),
            server,
            dispatcher.clone(),
            WorkerConfig::default(),
        );
        let task = tokio::spawn(worker.run());

        let mut client = Framed::new(client, ResponseCodec::new());
        client.send(Request::new("join", ["alice"])).await.unwrap();
        let reply = client.next().await.unwrap().unwrap();
        assert_eq!(reply, "alice has joined the bulletin board.\nMembers: alice");

        client.send(Request::new("exit", Vec::<String>::new())).await.unwrap();
        assert_eq!(client.next().await.unwrap().unwrap(), "Goodbye!");

        task.await.unwrap();
        assert!(session.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_supervisor_cleans_up_on_peer_close() {
        let dispatcher = dispatcher();
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel(4);
        let (command_server, command_client) = socket_pair().await;
        let (notify_server, notify_client) = socket_pair().await;
        let session = dispatcher
            .registry()
            .create(command_server.peer_addr().unwrap(), tx, &token);

        let task = tokio::spawn(supervise(
            session.clone(),
            command_server,
            notify_server,
            rx,
            dispatcher.clone(),
            WorkerConfig::default(),
        ));

        let mut client = Framed::new(command_client, ResponseCodec::new());
        client.send(Request::new("join", ["alice"])).await.unwrap();
        client.next().await.unwrap().unwrap();
        assert!(dispatcher.store().is_user("alice"));

        drop(notify_client);
        task.await.unwrap();

        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!dispatcher.store().is_user("alice"));
        assert!(dispatcher.registry().is_empty());
    }

    #[tokio::test]
    async fn test_notification_worker_writes_queue() {
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel(4);
        let (server, client) = socket_pair().await;
        let session = Arc::new(Session::new(
            crate::types::SessionId::new(1),
            server.peer_addr().unwrap(),
            tx.clone(),
            token.clone(),
        ));
        let task = tokio::spawn(
            NotificationWorker::new(session, server, rx, WorkerConfig::default()).run(),
        );

        tx.send(Notification::Join {
            user: "bob".to_string(),
        })
        .await
        .unwrap();
        let mut client = Framed::new(client, ResponseCodec::new());
        assert_eq!(client.next().await.unwrap().unwrap(), "JOIN bob");

        token.cancel();
        task.await.unwrap();
    }
}
