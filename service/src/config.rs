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

//! Server configuration

use bulletin_protocol::DEFAULT_MAX_LENGTH;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Names of the private boards provisioned when none are configured
pub const DEFAULT_GROUPS: [&str; 5] = ["General", "Projects", "Events", "Support", "Random"];

/// Server configuration
///
/// Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use bulletin_service::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::default()
///     .with_max_connections(64)
///     .with_write_timeout(Duration::from_secs(2))
///     .with_groups(["Ops", "Dev"]);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address of the command listener
    pub bind_address: SocketAddr,

    /// Address of the notification listener
    ///
    /// When `None` the command address is used with the port incremented by
    /// one. A command port of 0 makes both listeners ephemeral.
    pub notification_address: Option<SocketAddr>,

    /// Maximum number of concurrent sessions
    pub max_connections: usize,

    /// Timeout for writing one notification to a client
    ///
    /// A client that cannot absorb a notification within this window is
    /// disconnected.
    pub write_timeout: Duration,

    /// How long a command connection waits for its notification connection
    pub pairing_timeout: Duration,

    /// Timeout for graceful shutdown
    pub shutdown_timeout: Duration,

    /// Capacity of each session's pending notification queue
    pub notification_buffer: usize,

    /// Longest request line accepted, in bytes
    pub max_line_length: usize,

    /// Private board names, numbered from 1 in order
    pub groups: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 5000)),
            notification_address: None,
            max_connections: 1000,
            write_timeout: Duration::from_secs(10),
            pairing_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(30),
            notification_buffer: 64,
            max_line_length: DEFAULT_MAX_LENGTH,
            groups: DEFAULT_GROUPS.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given command address
    ///
    /// All other settings will use their default values.
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Set an explicit notification listener address
    pub fn with_notification_address(mut self, address: SocketAddr) -> Self {
        self.notification_address = Some(address);
        self
    }

    /// Set the maximum number of concurrent sessions
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the notification write timeout
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the connection pairing timeout
    pub fn with_pairing_timeout(mut self, timeout: Duration) -> Self {
        self.pairing_timeout = timeout;
        self
    }

    /// Set the shutdown timeout duration
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the per-session notification queue capacity
    pub fn with_notification_buffer(mut self, capacity: usize) -> Self {
        self.notification_buffer = capacity;
        self
    }

    /// Set the longest accepted request line
    pub fn with_max_line_length(mut self, length: usize) -> Self {
        self.max_line_length = length;
        self
    }

    /// Replace the private board names
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// The address the notification listener binds to
    pub fn resolved_notification_address(&self) -> SocketAddr {
        self.notification_address.unwrap_or_else(|| {
            let mut address = self.bind_address;
            if address.port() != 0 {
                address.set_port(address.port().saturating_add(1));
            }
            address
        })
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }

        if self.write_timeout.is_zero() {
            return Err("write_timeout must be greater than 0".to_string());
        }

        if self.pairing_timeout.is_zero() {
            return Err("pairing_timeout must be greater than 0".to_string());
        }

        if self.shutdown_timeout.is_zero() {
            return Err("shutdown_timeout must be greater than 0".to_string());
        }

        if self.notification_buffer == 0 {
            return Err("notification_buffer must be greater than 0".to_string());
        }

        if self.max_line_length == 0 {
            return Err("max_line_length must be greater than 0".to_string());
        }

        if self.bind_address.port() == u16::MAX && self.notification_address.is_none() {
            return Err("no port left for the notification listener".to_string());
        }

        if self.bind_address.port() != 0
            && self.resolved_notification_address() == self.bind_address
        {
            return Err("notification_address must differ from bind_address".to_string());
        }

        if let Some(name) = self.groups.iter().find(|name| name.trim().is_empty()) {
            return Err(format!("group name '{name}' must not be blank"));
        }

        Ok(())
    }
}
