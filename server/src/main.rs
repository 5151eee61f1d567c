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

//! Bulletin board server entry point

mod args;

use anyhow::{Context, Result};
use args::Args;
use bulletin_service::BulletinServer;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let server = BulletinServer::new(args.server_config())
        .await
        .context("failed to bind listeners")?;
    server.start().context("failed to start server")?;
    info!(
        command = %server.command_address(),
        notification = %server.notification_address(),
        "Bulletin board server running; press Ctrl+C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("Shutdown requested");

    server.shutdown().await.context("shutdown failed")?;
    info!(snapshot = %server.snapshot(), "Server stopped");
    Ok(())
}
