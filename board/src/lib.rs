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

//! # Bulletin Board Store
//!
//! In-memory state for the bulletin board service: one public board, a
//! fixed set of private boards, the user table and every posted message.
//! Nothing here performs I/O; the network layer and any in-process
//! front-end drive the store through the same [`BoardStore`] operations.
//!
//! ```rust
//! use bulletin_board::{BoardStore, GroupId};
//!
//! let store = BoardStore::new(["General", "Projects"]);
//! store.add_user("alice").unwrap();
//! store.join_group("alice", GroupId::new(2)).unwrap();
//!
//! let id = store.add_post("alice", "2024-10-28", "Hi", "World").unwrap();
//! assert_eq!(store.get_message(id).unwrap().summary(), "1,alice,2024-10-28,Hi");
//! assert_eq!(store.list_group_users(GroupId::new(2)).unwrap(), vec!["alice"]);
//! ```

mod board;
mod error;
mod message;
mod store;
mod types;

pub use board::Board;
pub use error::{BoardError, BoardResult};
pub use message::Message;
pub use store::{BoardStore, GroupInfo};
pub use types::{BoardId, BoardKind, GroupId, MessageId};
