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

//! The board store
//!
//! The store owns the public board, the fixed set of private boards and the
//! user table. It is the single source of truth for membership and messages
//! and is safe to share between threads behind an `Arc`.
//!
//! # Locking
//!
//! The user table has one mutex and every board has its own. Operations that
//! touch membership take the user table first and then the board, never the
//! other way round. Posting and reads only take the board lock, so posts to
//! different boards never contend.

use crate::{Board, BoardError, BoardId, BoardResult, GroupId, Message, MessageId};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// A user on the public board and the private boards they joined
#[derive(Debug, Clone, Default)]
struct User {
    groups: BTreeSet<GroupId>,
}

/// Id and name of a private board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// Board id
    pub id: GroupId,
    /// Board name
    pub name: String,
}

/// Owner of all board, user and message state
#[derive(Debug)]
pub struct BoardStore {
    public: Board,
    /// Indexed by `GroupId - 1`
    groups: Vec<Board>,
    users: Mutex<HashMap<String, User>>,
}

impl BoardStore {
    /// Create a store with one private board per name, numbered from 1
    pub fn new<I, S>(group_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let groups: Vec<Board> = group_names
            .into_iter()
            .zip(1u32..)
            .map(|(name, id)| Board::private(GroupId::new(id), name))
            .collect();
        info!(groups = groups.len(), "board store provisioned");
        Self {
            public: Board::public(),
            groups,
            users: Mutex::new(HashMap::new()),
        }
    }

    fn users(&self) -> MutexGuard<'_, HashMap<String, User>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn group(&self, id: GroupId) -> BoardResult<&Board> {
        (id.as_u32() as usize)
            .checked_sub(1)
            .and_then(|index| self.groups.get(index))
            .ok_or(BoardError::GroupNotFound(id))
    }

    /// The public board
    pub fn public_board(&self) -> &Board {
        &self.public
    }

    /// Resolve either kind of board through the same interface
    pub fn board(&self, id: BoardId) -> BoardResult<&Board> {
        match id {
            BoardId::Public => Ok(&self.public),
            BoardId::Group(group) => self.group(group),
        }
    }

    /// Create a user and put them on the public board.
    ///
    /// Returns [`BoardError::AlreadyMember`] if the name is taken; the
    /// existing entry is left untouched.
    pub fn add_user(&self, name: &str) -> BoardResult<()> {
        if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == ',') {
            return Err(BoardError::InvalidUsername(name.to_string()));
        }
        let mut users = self.users();
        if users.contains_key(name) {
            return Err(BoardError::AlreadyMember(name.to_string()));
        }
        users.insert(name.to_string(), User::default());
        self.public.add_member(name);
        debug!(user = name, "user added");
        Ok(())
    }

    /// Remove a user from every board they belong to, then delete them.
    ///
    /// Returns the private boards the user was removed from, in id order.
    pub fn remove_user(&self, name: &str) -> BoardResult<Vec<GroupId>> {
        let mut users = self.users();
        let user = users
            .remove(name)
            .ok_or_else(|| BoardError::UserNotFound(name.to_string()))?;
        for group in &user.groups {
            if let Ok(board) = self.group(*group) {
                board.remove_member(name);
            }
        }
        self.public.remove_member(name);
        debug!(user = name, groups = user.groups.len(), "user removed");
        Ok(user.groups.into_iter().collect())
    }

    /// Post to the public board. The sender must be a member.
    pub fn add_post(
        &self,
        sender: &str,
        date: &str,
        subject: &str,
        content: &str,
    ) -> BoardResult<MessageId> {
        self.public.post(sender, date, subject, content)
    }

    /// Post to a private board. The sender must be a member of that board.
    pub fn post_to_group(
        &self,
        group: GroupId,
        sender: &str,
        date: &str,
        subject: &str,
        content: &str,
    ) -> BoardResult<MessageId> {
        self.group(group)?.post(sender, date, subject, content)
    }

    /// Public message by id; `None` when absent
    pub fn get_message(&self, id: MessageId) -> Option<Message> {
        self.public.message(id)
    }

    /// Private message by id; `Ok(None)` when the board exists but the message does not
    pub fn get_group_message(&self, group: GroupId, id: MessageId) -> BoardResult<Option<Message>> {
        Ok(self.group(group)?.message(id))
    }

    /// Public board members in join order
    pub fn list_users(&self) -> Vec<String> {
        self.public.members()
    }

    /// Private board members in join order
    pub fn list_group_users(&self, group: GroupId) -> BoardResult<Vec<String>> {
        Ok(self.group(group)?.members())
    }

    /// All private boards in id order
    pub fn list_groups(&self) -> Vec<GroupInfo> {
        self.groups
            .iter()
            .filter_map(|board| match board.id() {
                BoardId::Group(id) => Some(GroupInfo {
                    id,
                    name: board.name().to_string(),
                }),
                BoardId::Public => None,
            })
            .collect()
    }

    /// Add `user` to a private board, updating both sides of the membership
    pub fn join_group(&self, user: &str, group: GroupId) -> BoardResult<()> {
        let mut users = self.users();
        let record = users
            .get_mut(user)
            .ok_or_else(|| BoardError::UserNotFound(user.to_string()))?;
        let board = self.group(group)?;
        if !board.add_member(user) {
            return Err(BoardError::AlreadyInGroup {
                user: user.to_string(),
                group,
            });
        }
        record.groups.insert(group);
        debug!(user, %group, "joined group");
        Ok(())
    }

    /// Remove `user` from a private board, updating both sides of the membership
    pub fn leave_group(&self, user: &str, group: GroupId) -> BoardResult<()> {
        let mut users = self.users();
        let record = users
            .get_mut(user)
            .ok_or_else(|| BoardError::UserNotFound(user.to_string()))?;
        let board = self.group(group)?;
        if !board.remove_member(user) {
            return Err(BoardError::NotInGroup {
                user: user.to_string(),
                group,
            });
        }
        record.groups.remove(&group);
        debug!(user, %group, "left group");
        Ok(())
    }

    /// Check whether a user record exists
    pub fn is_user(&self, name: &str) -> bool {
        self.users().contains_key(name)
    }

    /// Check whether `user` belongs to the board
    pub fn is_member(&self, board: BoardId, user: &str) -> bool {
        self.board(board).is_ok_and(|board| board.is_member(user))
    }

    /// Check both sides of a private board membership
    pub fn is_group_member(&self, user: &str, group: GroupId) -> bool {
        let users = self.users();
        users.get(user).is_some_and(|record| record.groups.contains(&group))
            && self.group(group).is_ok_and(|board| board.is_member(user))
    }

    /// Private boards `user` belongs to, or `None` if there is no such user
    pub fn user_groups(&self, name: &str) -> Option<Vec<GroupId>> {
        self.users()
            .get(name)
            .map(|user| user.groups.iter().copied().collect())
    }

    /// The `count` most recent public messages, oldest first
    pub fn last_messages(&self, count: usize) -> Vec<Message> {
        self.public.latest(count)
    }

    /// Number of user records
    pub fn user_count(&self) -> usize {
        self.users().len()
    }
}
