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

//! Command-line arguments

use bulletin_service::ServerConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Concurrent in-memory bulletin board server
#[derive(Debug, Parser)]
#[command(name = "bulletin-server")]
#[command(version, about)]
pub struct Args {
    /// Address for command connections
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Address for notification connections (defaults to the command port + 1)
    #[arg(short, long)]
    pub notify: Option<SocketAddr>,

    /// Maximum number of concurrent sessions
    #[arg(short = 'm', long, default_value_t = 1000)]
    pub max_connections: usize,

    /// Seconds to wait for a client's notification connection
    #[arg(long, default_value_t = 5)]
    pub pairing_timeout: u64,

    /// Seconds a single write may take before the session is dropped
    #[arg(long, default_value_t = 10)]
    pub write_timeout: u64,

    /// Seconds to wait for sessions to drain on shutdown
    #[arg(long, default_value_t = 30)]
    pub shutdown_timeout: u64,

    /// Private board names, in id order (repeat or comma separate)
    #[arg(short, long = "group", value_delimiter = ',')]
    pub groups: Vec<String>,

    /// Verbose logging (-v for debug, -vv for trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Build the server configuration these arguments describe
    pub fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::new(self.bind)
            .with_max_connections(self.max_connections)
            .with_pairing_timeout(Duration::from_secs(self.pairing_timeout))
            .with_write_timeout(Duration::from_secs(self.write_timeout))
            .with_shutdown_timeout(Duration::from_secs(self.shutdown_timeout));
        if let Some(notify) = self.notify {
            config = config.with_notification_address(notify);
        }
        if !self.groups.is_empty() {
            config = config.with_groups(&self.groups);
        }
        config
    }

    /// Default filter directive for the chosen verbosity
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "bulletin=info",
            1 => "bulletin=debug",
            _ => "bulletin=trace",
        }
    }
}
