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

//! A single board: members plus an append-only message list

use crate::{BoardError, BoardId, BoardKind, BoardResult, GroupId, Message, MessageId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

#[derive(Debug, Default)]
struct BoardState {
    messages: Vec<Message>,
    /// Insertion ordered; boards are small so a Vec beats a set here
    members: Vec<String>,
}

/// A public or private board.
///
/// Membership and the message list are guarded by one mutex. Message ids
/// come from the board's own counter and are only drawn while that mutex is
/// held, so ids are gap free and appear in the list in increasing order.
#[derive(Debug)]
pub struct Board {
    id: BoardId,
    name: String,
    state: Mutex<BoardState>,
    last_id: AtomicU64,
}

impl Board {
    pub(crate) fn public() -> Self {
        Self::new(BoardId::Public, "public")
    }

    pub(crate) fn private(id: GroupId, name: impl Into<String>) -> Self {
        Self::new(BoardId::Group(id), name)
    }

    fn new(id: BoardId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            state: Mutex::new(BoardState::default()),
            last_id: AtomicU64::new(0),
        }
    }

    // A panic while holding the lock cannot leave a half-applied mutation
    // behind (every mutation is a single push or remove), so poisoning is ignored.
    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Board address
    pub fn id(&self) -> BoardId {
        self.id
    }

    /// Board kind
    pub fn kind(&self) -> BoardKind {
        self.id.kind()
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in the order they joined
    pub fn members(&self) -> Vec<String> {
        self.state().members.clone()
    }

    /// Check whether `user` belongs to the board
    pub fn is_member(&self, user: &str) -> bool {
        self.state().members.iter().any(|member| member == user)
    }

    /// Number of members
    pub fn member_count(&self) -> usize {
        self.state().members.len()
    }

    /// Look a message up by id
    pub fn message(&self, id: MessageId) -> Option<Message> {
        self.state()
            .messages
            .iter()
            .find(|message| message.id == id)
            .cloned()
    }

    /// The `count` most recent messages, oldest first
    pub fn latest(&self, count: usize) -> Vec<Message> {
        let state = self.state();
        let skip = state.messages.len().saturating_sub(count);
        state.messages[skip..].to_vec()
    }

    /// Number of messages posted so far
    pub fn message_count(&self) -> usize {
        self.state().messages.len()
    }

    /// Append a message from a current member and return its id
    pub(crate) fn post(
        &self,
        sender: &str,
        date: &str,
        subject: &str,
        content: &str,
    ) -> BoardResult<MessageId> {
        if date.contains(',') {
            return Err(BoardError::InvalidDate(date.to_string()));
        }
        let mut state = self.state();
        if !state.members.iter().any(|member| member == sender) {
            return Err(BoardError::NotAMember {
                user: sender.to_string(),
                board: self.id,
            });
        }
        let id = MessageId::new(self.last_id.fetch_add(1, Ordering::SeqCst) + 1);
        state.messages.push(Message {
            id,
            sender: sender.to_string(),
            date: date.to_string(),
            subject: subject.to_string(),
            content: content.to_string(),
        });
        trace!(board = %self.id, message_id = %id, sender, "message appended");
        Ok(id)
    }

    /// Returns false if `user` was already a member
    pub(crate) fn add_member(&self, user: &str) -> bool {
        let mut state = self.state();
        if state.members.iter().any(|member| member == user) {
            return false;
        }
        state.members.push(user.to_string());
        true
    }

    /// Returns false if `user` was not a member
    pub(crate) fn remove_member(&self, user: &str) -> bool {
        let mut state = self.state();
        let before = state.members.len();
        state.members.retain(|member| member != user);
        state.members.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_requires_membership() {
        let board = Board::public();
        let err = board.post("alice", "today", "Hi", "World").unwrap_err();
        assert!(matches!(err, BoardError::NotAMember { .. }));
        assert_eq!(board.message_count(), 0);
    }

    #[test]
    fn test_ids_start_at_one() {
        let board = Board::private(GroupId::new(1), "General");
        board.add_member("alice");
        assert_eq!(board.post("alice", "d", "s", "c").unwrap(), MessageId::new(1));
        assert_eq!(board.post("alice", "d", "s", "c").unwrap(), MessageId::new(2));
        assert_eq!(board.kind(), BoardKind::Private);
    }

    #[test]
    fn test_failed_post_does_not_consume_id() {
        let board = Board::public();
        board.add_member("alice");
        assert!(board.post("mallory", "d", "s", "c").is_err());
        assert_eq!(board.post("alice", "d", "s", "c").unwrap(), MessageId::new(1));
    }

    #[test]
    fn test_date_with_comma_is_rejected() {
        let board = Board::public();
        board.add_member("alice");
        assert_eq!(
            board.post("alice", "2024,10,28", "s", "c"),
            Err(BoardError::InvalidDate("2024,10,28".to_string()))
        );
        assert_eq!(board.message_count(), 0);
        assert_eq!(board.post("alice", "d", "s, with commas", "c").unwrap(), MessageId::new(1));
    }

    #[test]
    fn test_members_keep_insertion_order() {
        let board = Board::public();
        assert!(board.add_member("carol"));
        assert!(board.add_member("alice"));
        assert!(!board.add_member("carol"));
        assert_eq!(board.members(), vec!["carol", "alice"]);
        assert!(board.remove_member("carol"));
        assert!(!board.remove_member("carol"));
        assert_eq!(board.members(), vec!["alice"]);
    }

    #[test]
    fn test_latest() {
        let board = Board::public();
        board.add_member("alice");
        for subject in ["one", "two", "three"] {
            board.post("alice", "d", subject, "c").unwrap();
        }
        let latest: Vec<_> = board.latest(2).into_iter().map(|m| m.subject).collect();
        assert_eq!(latest, vec!["two", "three"]);
        assert_eq!(board.latest(10).len(), 3);
    }
}
