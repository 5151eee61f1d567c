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

//! Connection acceptor
//!
//! The BulletinServer owns both listeners, accepts on them together,
//! pairs each command connection with a notification connection and hands
//! the pair to a session supervisor.

use crate::config::ServerConfig;
use crate::dispatcher::CommandDispatcher;
use crate::error::{Result, ServiceError};
use crate::metrics::ServerMetrics;
use crate::pairing::{Offer, Pair, Pairing};
use crate::registry::SessionRegistry;
use crate::types::ServerSnapshot;
use crate::worker::{WorkerConfig, supervise};
use bulletin_board::BoardStore;
use bulletin_protocol::CommandCodec;
use futures_util::SinkExt;
use metrics::counter;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self as time, sleep, sleep_until, timeout};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Reply sent on a command connection refused at the session limit
const SERVER_FULL: &str = "Error: server is full";

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

struct Listeners {
    command: TcpListener,
    notification: TcpListener,
}

/// Everything the accept loop needs, cloned out of the server
struct AcceptContext {
    config: ServerConfig,
    worker_config: WorkerConfig,
    registry: Arc<SessionRegistry>,
    dispatcher: CommandDispatcher,
    metrics: Arc<ServerMetrics>,
    shutdown: CancellationToken,
    sessions: TaskTracker,
}

/// Bulletin board server
///
/// # Example
///
/// ```no_run
/// use bulletin_service::{BulletinServer, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = BulletinServer::new(ServerConfig::default()).await?;
///     server.start()?;
///
///     tokio::signal::ctrl_c().await?;
///     server.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct BulletinServer {
    /// Server configuration
    config: ServerConfig,
    /// Board state shared by every session
    store: Arc<BoardStore>,
    /// Live sessions
    registry: Arc<SessionRegistry>,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// Command execution
    dispatcher: CommandDispatcher,
    /// Listeners, taken by the accept loop on start
    listeners: Mutex<Option<Listeners>>,
    /// Actual command listener address
    command_address: SocketAddr,
    /// Actual notification listener address
    notification_address: SocketAddr,
    /// Server start time
    started_at: Instant,
    /// Running flag
    running: AtomicBool,
    /// Parent of every session token
    shutdown: CancellationToken,
    /// Session supervisor tasks
    sessions: TaskTracker,
    /// Accept loop task handle
    accept_handle: Mutex<Option<JoinHandle<()>>>,
}

impl BulletinServer {
    /// Create a new server with the given configuration
    ///
    /// This provisions the board store and binds both listeners but does not
    /// accept connections until `start()` is called.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        config.validate().map_err(ServiceError::InvalidConfig)?;

        let command = TcpListener::bind(config.bind_address).await?;
        let notification = TcpListener::bind(config.resolved_notification_address()).await?;
        let command_address = command.local_addr()?;
        let notification_address = notification.local_addr()?;

        let store = Arc::new(BoardStore::new(config.groups.iter().cloned()));
        let registry = Arc::new(SessionRegistry::new());
        let metrics = Arc::new(ServerMetrics::new());
        let dispatcher = CommandDispatcher::new(store.clone(), registry.clone(), metrics.clone());

        info!(
            command = %command_address,
            notification = %notification_address,
            groups = config.groups.len(),
            "bulletin server bound"
        );

        Ok(Self {
            config,
            store,
            registry,
            metrics,
            dispatcher,
            listeners: Mutex::new(Some(Listeners {
                command,
                notification,
            })),
            command_address,
            notification_address,
            started_at: Instant::now(),
            running: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            sessions: TaskTracker::new(),
            accept_handle: Mutex::new(None),
        })
    }

    /// Start accepting connections
    ///
    /// The accept loop runs on its own task until `shutdown()` is called. A
    /// server can be started once.
    pub fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServiceError::AlreadyRunning);
        }
        let Some(listeners) = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            self.running.store(false, Ordering::SeqCst);
            return Err(ServiceError::Stopped);
        };

        info!(command = %self.command_address, "starting bulletin server");

        let context = AcceptContext {
            config: self.config.clone(),
            worker_config: WorkerConfig::from(&self.config),
            registry: self.registry.clone(),
            dispatcher: self.dispatcher.clone(),
            metrics: self.metrics.clone(),
            shutdown: self.shutdown.clone(),
            sessions: self.sessions.clone(),
        };
        let handle = tokio::spawn(accept_loop(listeners, context));
        *self
            .accept_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Shutdown the server gracefully
    ///
    /// Stops accepting, cancels every session and waits for their cleanup
    /// up to the configured shutdown timeout.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::ServerNotRunning);
        }

        info!("shutting down bulletin server");
        self.shutdown.cancel();

        let accept_handle = self
            .accept_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = accept_handle {
            let _ = timeout(self.config.shutdown_timeout, handle).await;
        }

        self.sessions.close();
        if timeout(self.config.shutdown_timeout, self.sessions.wait())
            .await
            .is_err()
        {
            warn!(
                remaining = self.registry.len(),
                "sessions still running after shutdown timeout"
            );
        }

        info!("bulletin server shutdown complete");
        Ok(())
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address of the command listener
    pub fn command_address(&self) -> SocketAddr {
        self.command_address
    }

    /// Address of the notification listener
    pub fn notification_address(&self) -> SocketAddr {
        self.notification_address
    }

    /// Get the number of live sessions
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            active_sessions: self.registry.len(),
            total_sessions: self.registry.total_created(),
            joined_users: self.store.user_count(),
            command_address: self.command_address,
            notification_address: self.notification_address,
            uptime: self.started_at.elapsed(),
        }
    }

    /// The board store, for in-process collaborators
    pub fn store(&self) -> Arc<BoardStore> {
        self.store.clone()
    }

    /// The session registry
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl std::fmt::Debug for BulletinServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulletinServer")
            .field("command_address", &self.command_address)
            .field("notification_address", &self.notification_address)
            .field("running", &self.is_running())
            .field("session_count", &self.session_count())
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

impl Drop for BulletinServer {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            warn!("BulletinServer dropped while still running");
            self.running.store(false, Ordering::SeqCst);
            self.shutdown.cancel();
        }
    }
}

async fn accept_loop(listeners: Listeners, context: AcceptContext) {
    let mut pairing = Pairing::new(context.config.pairing_timeout, context.config.max_connections);

    loop {
        let deadline = pairing.next_deadline();
        // Command accepts go first so a client's command connection is
        // queued before its notification connection.
        let offer = select! {
            biased;
            _ = context.shutdown.cancelled() => break,
            accepted = listeners.command.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "command connection accepted");
                    pairing.offer_command(stream, peer, time::Instant::now())
                }
                Err(err) => {
                    error!(error = %err, "failed to accept command connection");
                    sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
            accepted = listeners.notification.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "notification connection accepted");
                    pairing.offer_notification(stream, peer, time::Instant::now())
                }
                Err(err) => {
                    error!(error = %err, "failed to accept notification connection");
                    sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(time::Instant::now)), if deadline.is_some() => {
                let expired = pairing.expire(time::Instant::now());
                for peer in expired.commands {
                    warn!(peer = %peer, "no notification connection within pairing timeout");
                    context.metrics.connection_rejected();
                }
                for peer in expired.notifications {
                    warn!(peer = %peer, "no command connection within pairing timeout");
                }
                continue;
            }
        };

        match offer {
            Offer::Paired(pair) => {
                debug!(peer = %pair.peer, "connections paired");
                admit(&context, pair);
            }
            Offer::Waiting => {}
            Offer::Overflow => {
                warn!(
                    waiting_commands = pairing.waiting_commands(),
                    waiting_notifications = pairing.waiting_notifications(),
                    "too many unpaired connections, dropping"
                );
                context.metrics.connection_rejected();
            }
        }
    }

    info!("accept loop terminated");
}

fn admit(context: &AcceptContext, pair: Pair<TcpStream>) {
    if context.registry.len() >= context.config.max_connections {
        warn!(
            peer = %pair.peer,
            limit = context.config.max_connections,
            "connection limit reached, rejecting"
        );
        context.metrics.connection_rejected();
        counter!("bulletin.connections.rejected").increment(1);
        tokio::spawn(reject(pair.command, context.worker_config.write_timeout));
        return;
    }

    start_session(context, pair.command, pair.notification, pair.peer);
}

fn start_session(context: &AcceptContext, command: TcpStream, notification: TcpStream, peer: SocketAddr) {
    let (notifier, queue) = mpsc::channel(context.config.notification_buffer);
    let session = context.registry.create(peer, notifier, &context.shutdown);
    context.metrics.session_opened();
    counter!("bulletin.sessions.opened").increment(1);
    info!(session_id = %session.id(), peer = %peer, "session established");

    context.sessions.spawn(supervise(
        session,
        command,
        notification,
        queue,
        context.dispatcher.clone(),
        context.worker_config.clone(),
    ));
}

async fn reject(stream: TcpStream, write_timeout: Duration) {
    let mut framed = FramedWrite::new(stream, CommandCodec::new());
    if let Ok(Err(err)) = timeout(write_timeout, framed.send(SERVER_FULL)).await {
        debug!(error = %err, "failed to send rejection");
    }
}
