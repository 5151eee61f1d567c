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

//! Client configuration

use bulletin_protocol::DEFAULT_MAX_LENGTH;
use std::net::SocketAddr;
use std::time::Duration;

/// Bulletin board client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server hostname or IP address
    pub host: String,

    /// Server command port
    pub port: u16,

    /// Server notification port; `None` means `port + 1`
    pub notification_port: Option<u16>,

    /// Timeout for establishing each connection
    pub connect_timeout: Duration,

    /// How long to wait for a reply or notification (None for no timeout)
    pub read_timeout: Option<Duration>,

    /// Longest record accepted from the server, in bytes
    pub max_record_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5000,
            notification_port: None,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Some(Duration::from_secs(30)),
            max_record_length: DEFAULT_MAX_LENGTH,
        }
    }
}

impl ClientConfig {
    /// Create a new client configuration with the given host and command port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Configuration for a server whose listener addresses are known
    pub fn for_addresses(command: SocketAddr, notification: SocketAddr) -> Self {
        Self::new(command.ip().to_string(), command.port())
            .with_notification_port(notification.port())
    }

    /// Set an explicit notification port
    pub fn with_notification_port(mut self, port: u16) -> Self {
        self.notification_port = Some(port);
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read timeout
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the longest accepted record
    pub fn with_max_record_length(mut self, length: usize) -> Self {
        self.max_record_length = length;
        self
    }

    /// The port the notification connection goes to
    pub fn resolved_notification_port(&self) -> u16 {
        self.notification_port
            .unwrap_or_else(|| self.port.saturating_add(1))
    }
}
