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

//! Bulletin Board Service
//!
//! Networked front of the bulletin board: sessions, command dispatch,
//! membership-scoped notifications and the paired-connection acceptor.
//!
//! # Architecture
//!
//! ```text
//! BulletinServer (accepts command + notification pairs)
//!     ↓
//! supervise → CommandWorker → CommandDispatcher → BoardStore
//!           → NotificationWorker ← Broadcaster ← SessionRegistry
//! ```
//!
//! Each client holds two TCP connections. Requests and their replies travel
//! on the command connection; events caused by other clients arrive on the
//! notification connection, which the server pairs with the command
//! connection by acceptance order.
//!
//! # Example
//!
//! ```no_run
//! use bulletin_service::{BulletinServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("0.0.0.0:5000".parse()?)
//!         .with_groups(["General", "Projects"]);
//!     let server = BulletinServer::new(config).await?;
//!     server.start()?;
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod broadcast;
mod config;
mod dispatcher;
mod error;
mod metrics;
mod pairing;
mod registry;
mod server;
mod session;
mod types;
mod worker;

pub use broadcast::{BroadcastResult, Broadcaster};
pub use config::{DEFAULT_GROUPS, ServerConfig};
pub use dispatcher::{CommandDispatcher, Reply};
pub use error::{CommandError, Result, ServiceError};
pub use self::metrics::{MetricsSnapshot, ServerMetrics};
pub use registry::SessionRegistry;
pub use server::BulletinServer;
pub use session::Session;
pub use types::{ServerSnapshot, SessionId, SessionInfo, SessionState};
pub use worker::{CommandWorker, NotificationWorker, SessionCleanup, WorkerConfig, supervise};
