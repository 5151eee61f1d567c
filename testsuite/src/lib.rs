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

//! Harness for end-to-end tests: a live server on ephemeral ports plus
//! helpers that connect real clients to it.

use bulletin_client::{BulletinClient, ClientConfig, ClientError};
use bulletin_service::{BulletinServer, ServerConfig, ServiceError};
use std::time::Duration;

/// How long tests wait for a notification that must arrive
pub const EVENT_WAIT: Duration = Duration::from_secs(5);

/// How long tests wait before concluding that nothing will arrive
pub const QUIET_WAIT: Duration = Duration::from_millis(200);

/// A running server bound to 127.0.0.1 on ephemeral ports
pub struct TestBoard {
    server: BulletinServer,
}

impl TestBoard {
    /// Start a server with the default groups
    pub async fn start() -> Result<Self, ServiceError> {
        Self::with_config(ServerConfig::new(([127, 0, 0, 1], 0).into())).await
    }

    /// Start a server from an explicit configuration
    pub async fn with_config(config: ServerConfig) -> Result<Self, ServiceError> {
        let server = BulletinServer::new(config).await?;
        server.start()?;
        Ok(Self { server })
    }

    /// The running server
    pub fn server(&self) -> &BulletinServer {
        &self.server
    }

    /// Client configuration pointing at this server
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::for_addresses(
            self.server.command_address(),
            self.server.notification_address(),
        )
        .with_read_timeout(Some(EVENT_WAIT))
    }

    /// Connect a client that has not joined yet
    pub async fn client(&self) -> Result<BulletinClient, ClientError> {
        BulletinClient::connect(self.client_config()).await
    }

    /// Connect a client and join the public board as `username`
    pub async fn joined(&self, username: &str) -> Result<BulletinClient, ClientError> {
        let mut client = self.client().await?;
        client.join(username).await?;
        Ok(client)
    }

    /// Stop the server and wait for its sessions
    pub async fn stop(self) -> Result<(), ServiceError> {
        self.server.shutdown().await
    }
}
