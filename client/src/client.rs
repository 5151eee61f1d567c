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

//! Paired-connection bulletin board client

use crate::{ClientConfig, ClientError, Result};
use bulletin_protocol::{Notification, Request, ResponseCodec};
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace};

type Connection = Framed<TcpStream, ResponseCodec>;

/// A client holding the command connection and its paired notification
/// connection.
///
/// Requests are strictly sequential: each [`request`](Self::request) waits
/// for exactly one reply record. Notifications queue up on the second
/// connection until read with [`next_notification`](Self::next_notification).
#[derive(Debug)]
pub struct BulletinClient {
    config: ClientConfig,
    command: Connection,
    notifications: Connection,
    username: Option<String>,
}

impl BulletinClient {
    /// Open the command connection, then the notification connection.
    ///
    /// The server pairs a notification connection with the newest waiting
    /// command connection, so the notification connection is only opened
    /// once the command connection is up.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let command_addr = format!("{}:{}", config.host, config.port);
        let notification_addr = format!("{}:{}", config.host, config.resolved_notification_port());

        info!(address = %command_addr, "Connecting to bulletin board");
        let command = open(&command_addr, &config).await?;
        let notifications = open(&notification_addr, &config).await?;
        debug!(
            command = %command_addr,
            notification = %notification_addr,
            "Connection pair established"
        );

        Ok(Self {
            command: Framed::new(command, ResponseCodec::with_max_length(config.max_record_length)),
            notifications: Framed::new(
                notifications,
                ResponseCodec::with_max_length(config.max_record_length),
            ),
            config,
            username: None,
        })
    }

    /// Connect to a server whose listener addresses are already known
    pub async fn connect_to(command: SocketAddr, notification: SocketAddr) -> Result<Self> {
        Self::connect(ClientConfig::for_addresses(command, notification)).await
    }

    /// The configuration this client was built from
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The name the server last accepted for this client, if any
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Send a command with parameters and wait for its reply.
    ///
    /// `Error: ...` replies are returned as text; use
    /// [`request_ok`](Self::request_ok) to turn them into errors.
    pub async fn request<S: AsRef<str>>(&mut self, command: &str, params: &[S]) -> Result<String> {
        self.send_line(&Request::encode(command, params)).await
    }

    /// Like [`request`](Self::request), but fails on `Error: ...` replies
    pub async fn request_ok<S: AsRef<str>>(&mut self, command: &str, params: &[S]) -> Result<String> {
        let reply = self.request(command, params).await?;
        if reply.starts_with("Error:") {
            return Err(ClientError::Rejected(reply));
        }
        Ok(reply)
    }

    /// Send a raw command line and wait for its reply
    pub async fn send_line(&mut self, line: &str) -> Result<String> {
        trace!(line, "Sending request");
        self.command.send(Request::decode(line)).await?;
        let reply = read(&mut self.command, self.config.read_timeout).await?;
        trace!(reply = %reply, "Received reply");
        Ok(reply)
    }

    /// Join the public board under `username`
    pub async fn join(&mut self, username: &str) -> Result<String> {
        let reply = self.request_ok("join", &[username]).await?;
        self.username = Some(username.to_string());
        Ok(reply)
    }

    /// Post to the public board as the joined user
    pub async fn post(&mut self, date: &str, subject: &str, content: &str) -> Result<String> {
        let sender = self.joined_name()?;
        self.request_ok("post", &[sender.as_str(), date, subject, "|", content])
            .await
    }

    /// Post to a private board as the joined user
    pub async fn group_post(
        &mut self,
        group: u32,
        date: &str,
        subject: &str,
        content: &str,
    ) -> Result<String> {
        let sender = self.joined_name()?;
        let group = group.to_string();
        self.request_ok(
            "grouppost",
            &[sender.as_str(), date, group.as_str(), subject, "|", content],
        )
        .await
    }

    /// Join a private board
    pub async fn group_join(&mut self, group: u32) -> Result<String> {
        self.request_ok("groupjoin", &[group.to_string()]).await
    }

    /// Leave a private board
    pub async fn group_leave(&mut self, group: u32) -> Result<String> {
        self.request_ok("groupleave", &[group.to_string()]).await
    }

    /// Leave the public board and every private board
    pub async fn leave(&mut self) -> Result<String> {
        let reply = self.request_ok::<&str>("leave", &[]).await?;
        self.username = None;
        Ok(reply)
    }

    /// End the session; the server closes both connections after replying
    pub async fn exit(mut self) -> Result<String> {
        let reply = self.request::<&str>("exit", &[]).await?;
        debug!(reply = %reply, "Session ended");
        Ok(reply)
    }

    /// Wait for the next notification, honoring the read timeout
    pub async fn next_notification(&mut self) -> Result<Notification> {
        let record = read(&mut self.notifications, self.config.read_timeout).await?;
        Ok(record.parse()?)
    }

    /// Wait up to `wait` for a notification; `None` if nothing arrived
    pub async fn try_next_notification(&mut self, wait: Duration) -> Result<Option<Notification>> {
        match read(&mut self.notifications, Some(wait)).await {
            Ok(record) => Ok(Some(record.parse()?)),
            Err(ClientError::ReadTimeout) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Close both connections without sending `exit`
    pub async fn close(mut self) -> Result<()> {
        SinkExt::<Request>::close(&mut self.command).await?;
        SinkExt::<Request>::close(&mut self.notifications).await?;
        debug!("Connection pair closed");
        Ok(())
    }

    fn joined_name(&self) -> Result<String> {
        self.username
            .clone()
            .ok_or_else(|| ClientError::Rejected("Error: not joined".to_string()))
    }
}

async fn open(address: &str, config: &ClientConfig) -> Result<TcpStream> {
    match timeout(config.connect_timeout, TcpStream::connect(address)).await {
        Ok(stream) => {
            let stream = stream?;
            stream.set_nodelay(true)?;
            Ok(stream)
        }
        Err(_) => Err(ClientError::ConnectionTimeout),
    }
}

async fn read(conn: &mut Connection, limit: Option<Duration>) -> Result<String> {
    match within(limit, conn.next()).await? {
        Some(record) => Ok(record?),
        None => Err(ClientError::ConnectionClosed),
    }
}

async fn within<F: Future>(limit: Option<Duration>, future: F) -> Result<F::Output> {
    match limit {
        Some(limit) => timeout(limit, future)
            .await
            .map_err(|_| ClientError::ReadTimeout),
        None => Ok(future.await),
    }
}
