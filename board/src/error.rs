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

//! Error types for board store operations

use crate::{BoardId, GroupId};
use thiserror::Error;

/// Result type for board store operations
pub type BoardResult<T> = std::result::Result<T, BoardError>;

/// Domain errors returned by the board store.
///
/// None of these leave partial state behind: an operation that fails has
/// performed no mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// The username is already on the public board
    #[error("{0} is already a member")]
    AlreadyMember(String),

    /// No user record exists for the name
    #[error("user {0} not found")]
    UserNotFound(String),

    /// No private board with the id exists
    #[error("group {0} does not exist")]
    GroupNotFound(GroupId),

    /// The user is already a member of the private board
    #[error("{user} is already a member of group {group}")]
    AlreadyInGroup {
        /// The user
        user: String,
        /// The private board
        group: GroupId,
    },

    /// The user is not a member of the private board
    #[error("{user} is not in group {group}")]
    NotInGroup {
        /// The user
        user: String,
        /// The private board
        group: GroupId,
    },

    /// The user may not act on a board they do not belong to
    #[error("{user} is not a member of the {board}")]
    NotAMember {
        /// The user
        user: String,
        /// The board acted on
        board: BoardId,
    },

    /// Usernames must be a single non-empty token without commas
    #[error("invalid username '{0}'")]
    InvalidUsername(String),

    /// Post dates may not contain commas
    #[error("invalid date '{0}'")]
    InvalidDate(String),
}
