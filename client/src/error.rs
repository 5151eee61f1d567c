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

//! Client error types

use bulletin_protocol::{CodecError, InvalidNotification};
use std::io;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(io::Error),

    /// Connection refused
    #[error("Connection refused")]
    ConnectionRefused,

    /// Connection timeout
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// No reply or notification within the read timeout
    #[error("Read timeout")]
    ReadTimeout,

    /// Connection closed by server
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// Framing error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// A record on the notification connection was not a notification
    #[error(transparent)]
    InvalidNotification(#[from] InvalidNotification),

    /// The server answered with an `Error: ...` reply
    #[error("Server rejected request: {0}")]
    Rejected(String),
}

impl ClientError {
    /// Check if the error means the connection is gone
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::ConnectionRefused | Self::Io(_)
        )
    }
}

impl From<io::Error> for ClientError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::TimedOut => Self::ReadTimeout,
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused,
            io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe => Self::ConnectionClosed,
            _ => Self::Io(error),
        }
    }
}
