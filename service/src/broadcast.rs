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

//! Membership-scoped notification fan-out

use crate::metrics::ServerMetrics;
use crate::registry::SessionRegistry;
use crate::types::SessionId;
use bulletin_board::{BoardId, BoardStore, GroupId};
use bulletin_protocol::{BoardTarget, Notification};
use metrics::counter;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{trace, warn};

/// Result of a broadcast operation
#[derive(Debug, Clone, Default)]
pub struct BroadcastResult {
    /// Number of recipients attempted
    pub total: usize,
    /// Number of notifications queued
    pub succeeded: usize,
    /// Number of notifications dropped
    pub failed: usize,
    /// Recipients that missed the notification, and why
    pub errors: Vec<(SessionId, String)>,
}

impl BroadcastResult {
    /// Check if all broadcasts succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Get the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }
}

/// Pushes notifications to the members of a board
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<SessionRegistry>,
    store: Arc<BoardStore>,
    metrics: Arc<ServerMetrics>,
}

impl Broadcaster {
    /// Create a broadcaster over the given registry and store
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<BoardStore>,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            registry,
            store,
            metrics,
        }
    }

    /// Queue `notification` for every other joined session whose user
    /// belongs to the notification's board.
    ///
    /// Never waits: a recipient whose queue is full or closed is counted as
    /// a failure and skipped.
    pub fn broadcast(&self, source: Option<SessionId>, notification: &Notification) -> BroadcastResult {
        let board = match notification.target() {
            BoardTarget::Public => BoardId::Public,
            BoardTarget::Group(group) => BoardId::Group(GroupId::new(group)),
        };

        let mut result = BroadcastResult::default();
        for session in self.registry.snapshot() {
            if Some(session.id()) == source {
                continue;
            }
            let Some(username) = session.username() else {
                continue;
            };
            if !self.store.is_member(board, &username) {
                continue;
            }

            result.total += 1;
            match session.notify(notification.clone()) {
                Ok(()) => result.succeeded += 1,
                Err(err) => {
                    let reason = match err {
                        TrySendError::Full(_) => "notification queue full",
                        TrySendError::Closed(_) => "notification channel closed",
                    };
                    warn!(
                        session_id = %session.id(),
                        username = %username,
                        kind = notification.kind(),
                        reason,
                        "notification dropped"
                    );
                    result.failed += 1;
                    result.errors.push((session.id(), reason.to_string()));
                }
            }
        }

        trace!(
            kind = notification.kind(),
            %board,
            recipients = result.total,
            dropped = result.failed,
            "broadcast"
        );
        counter!("bulletin.notifications.delivered").increment(result.succeeded as u64);
        counter!("bulletin.notifications.dropped").increment(result.failed as u64);
        self.metrics.notifications(result.succeeded, result.failed);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    struct Fixture {
        registry: Arc<SessionRegistry>,
        store: Arc<BoardStore>,
        broadcaster: Broadcaster,
        token: CancellationToken,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(SessionRegistry::new());
            let store = Arc::new(BoardStore::new(["General", "Projects"]));
            let broadcaster =
                Broadcaster::new(registry.clone(), store.clone(), Arc::new(ServerMetrics::new()));
            Self {
                registry,
                store,
                broadcaster,
                token: CancellationToken::new(),
            }
        }

        fn joined(&self, name: &str, capacity: usize) -> (Arc<Session>, mpsc::Receiver<Notification>) {
            let (tx, rx) = mpsc::channel(capacity);
            let session = self
                .registry
                .create("127.0.0.1:4000".parse().unwrap(), tx, &self.token);
            self.store.add_user(name).unwrap();
            assert!(session.bind(name));
            (session, rx)
        }
    }

    fn join(user: &str) -> Notification {
        Notification::Join {
            user: user.to_string(),
        }
    }

    #[test]
    fn test_public_broadcast_skips_source_and_unjoined() {
        let fixture = Fixture::new();
        let (alice, mut alice_rx) = fixture.joined("alice", 4);
        let (_bob, mut bob_rx) = fixture.joined("bob", 4);
        let (tx, mut anon_rx) = mpsc::channel(4);
        fixture
            .registry
            .create("127.0.0.1:4001".parse().unwrap(), tx, &fixture.token);

        let result = fixture.broadcaster.broadcast(Some(alice.id()), &join("alice"));
        assert_eq!(result.total, 1);
        assert!(result.all_succeeded());
        assert_eq!(bob_rx.try_recv().unwrap(), join("alice"));
        assert!(alice_rx.try_recv().is_err());
        assert!(anon_rx.try_recv().is_err());
    }

    #[test]
    fn test_group_broadcast_reaches_members_only() {
        let fixture = Fixture::new();
        let (alice, _alice_rx) = fixture.joined("alice", 4);
        let (_bob, mut bob_rx) = fixture.joined("bob", 4);
        let (_carol, mut carol_rx) = fixture.joined("carol", 4);
        fixture.store.join_group("alice", GroupId::new(1)).unwrap();
        fixture.store.join_group("bob", GroupId::new(1)).unwrap();

        let event = Notification::GroupJoin {
            group: 1,
            user: "alice".to_string(),
        };
        let result = fixture.broadcaster.broadcast(Some(alice.id()), &event);
        assert_eq!(result.total, 1);
        assert_eq!(bob_rx.try_recv().unwrap(), event);
        assert!(carol_rx.try_recv().is_err());
    }

    #[test]
    #[traced_test]
    fn test_full_queue_does_not_block_others() {
        let fixture = Fixture::new();
        let (slow, _slow_rx) = fixture.joined("slow", 1);
        let (_fast, mut fast_rx) = fixture.joined("fast", 8);

        slow.notify(join("x")).unwrap();
        let result = fixture.broadcaster.broadcast(None, &join("y"));

        assert_eq!(result.total, 2);
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].0, slow.id());
        assert_eq!(result.success_rate(), 50.0);
        assert_eq!(fast_rx.try_recv().unwrap(), join("y"));
        assert!(logs_contain("notification dropped"));
    }
}
