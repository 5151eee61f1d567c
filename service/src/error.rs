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

//! Error types for the bulletin board service

use crate::types::SessionId;
use bulletin_board::{BoardError, GroupId, MessageId};
use bulletin_protocol::CodecError;
use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Server and transport level errors
#[derive(Debug, Error)]
pub enum ServiceError {
    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error from the codec layer
    #[error("Protocol error: {0}")]
    Protocol(#[from] CodecError),

    /// Session with the given ID was not found
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    /// Connection has been closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// Server is not running
    #[error("Server not running")]
    ServerNotRunning,

    /// Server was already started
    #[error("Server already running")]
    AlreadyRunning,

    /// Server was shut down and cannot be started again
    #[error("Server has been shut down")]
    Stopped,

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ServiceError {
    /// Check if the error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ServiceError::SessionNotFound(_) | ServiceError::ConnectionClosed | ServiceError::Io(_)
        )
    }

    /// Check if the error came from framing
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, ServiceError::Protocol(_))
    }
}

/// Why a single command was rejected.
///
/// These never end the session; the dispatcher turns them into an
/// `Error: ...` response line and leaves all state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The command name is not part of the grammar
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Wrong number of parameters
    #[error("usage: {0}")]
    Usage(&'static str),

    /// A parameter that must be an integer was not
    #[error("{what} must be a number, got '{value}'")]
    NotANumber {
        /// Which parameter
        what: &'static str,
        /// The offending text
        value: String,
    },

    /// The command needs a joined session
    #[error("you must join the bulletin board first")]
    NotJoined,

    /// `join` or `connect` on a session that already joined
    #[error("already joined as {0}")]
    AlreadyJoined(String),

    /// `join` without a username and no prior `connect`
    #[error("no username given; use connect or join <username>")]
    NoUsername,

    /// Another session holds the username
    #[error("username {0} is already in use")]
    UsernameTaken(String),

    /// Posting under a name other than the session's own
    #[error("cannot post as {sender} while joined as {user}")]
    ForeignSender {
        /// Claimed sender
        sender: String,
        /// Session's user
        user: String,
    },

    /// `leave <name>` naming someone else
    #[error("cannot leave on behalf of {0}")]
    ForeignLeave(String),

    /// No public message with the id
    #[error("message {0} not found on the public board")]
    MessageNotFound(MessageId),

    /// No message with the id on the private board
    #[error("message {id} not found on group {group}")]
    GroupMessageNotFound {
        /// Board searched
        group: GroupId,
        /// Requested id
        id: MessageId,
    },

    /// The session was torn down while the command ran
    #[error("session is closed")]
    SessionClosed,

    /// Rejected by the board store
    #[error(transparent)]
    Board(#[from] BoardError),
}

impl CommandError {
    /// Malformed requests, as opposed to well-formed requests the current
    /// state does not allow
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            CommandError::UnknownCommand(_) | CommandError::Usage(_) | CommandError::NotANumber { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_connection_error() {
        assert!(ServiceError::SessionNotFound(SessionId::new(1)).is_connection_error());
        assert!(ServiceError::ConnectionClosed.is_connection_error());
        assert!(!ServiceError::Timeout.is_connection_error());
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::SessionNotFound(SessionId::new(42));
        assert_eq!(err.to_string(), "Session sess-42 not found");

        let err = CommandError::Board(BoardError::GroupNotFound(GroupId::new(7)));
        assert_eq!(err.to_string(), "group 7 does not exist");

        let err = CommandError::MessageNotFound(MessageId::new(3));
        assert_eq!(err.to_string(), "message 3 not found on the public board");

        let err = CommandError::GroupMessageNotFound {
            group: GroupId::new(2),
            id: MessageId::new(9),
        };
        assert_eq!(err.to_string(), "message 9 not found on group 2");
    }

    #[test]
    fn test_command_error_kinds() {
        assert!(CommandError::Usage("exit").is_protocol_error());
        assert!(
            CommandError::NotANumber {
                what: "message ID",
                value: "x".to_string()
            }
            .is_protocol_error()
        );
        assert!(!CommandError::NotJoined.is_protocol_error());
        assert!(!CommandError::Board(BoardError::UserNotFound("a".to_string())).is_protocol_error());
    }
}
