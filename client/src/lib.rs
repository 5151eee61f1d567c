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

//! # Bulletin Board Client
//!
//! Async client for the bulletin board service. A client holds two TCP
//! connections: the command connection carries request/reply pairs and the
//! notification connection carries events pushed by the server.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bulletin_client::{BulletinClient, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = BulletinClient::connect(ClientConfig::new("localhost", 5000)).await?;
//!
//!     println!("{}", client.join("alice").await?);
//!     println!("{}", client.post("2024-10-28", "Hello", "First post").await?);
//!
//!     while let Some(event) = client
//!         .try_next_notification(std::time::Duration::from_secs(1))
//!         .await?
//!     {
//!         println!("event: {event}");
//!     }
//!
//!     client.exit().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod client;
mod config;
mod error;

pub use client::BulletinClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};

// Re-export the wire types callers match on
pub use bulletin_protocol::{Notification, PostSummary};
