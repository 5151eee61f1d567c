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

//! Session registry
//!
//! The registry is responsible for:
//! - Allocating session IDs
//! - Tracking every live session
//! - Handing out point-in-time snapshots for broadcast fan-out

use crate::session::Session;
use crate::types::{SessionId, SessionInfo};
use bulletin_protocol::Notification;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Registry of live sessions
#[derive(Debug)]
pub struct SessionRegistry {
    /// Live sessions (lock-free concurrent map)
    sessions: DashMap<SessionId, Arc<Session>>,
    /// Next session ID (monotonically increasing)
    next_id: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_session_id(&self) -> SessionId {
        SessionId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Create and register a session.
    ///
    /// The session's cancellation token is a child of `parent`, so cancelling
    /// the server token stops every session.
    pub fn create(
        &self,
        peer_addr: SocketAddr,
        notifier: mpsc::Sender<Notification>,
        parent: &CancellationToken,
    ) -> Arc<Session> {
        let id = self.next_session_id();
        let session = Arc::new(Session::new(id, peer_addr, notifier, parent.child_token()));
        self.sessions.insert(id, session.clone());
        debug!(session_id = %id, peer = %peer_addr, "session registered");
        session
    }

    /// Remove a session, returning it if it was present
    pub fn deregister(&self, id: SessionId) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(&id).map(|(_, session)| session);
        if removed.is_some() {
            debug!(session_id = %id, "session deregistered");
        }
        removed
    }

    /// Look up a session by ID
    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// Find the session a username is bound to
    pub fn find_by_username(&self, username: &str) -> Option<Arc<Session>> {
        self.sessions
            .iter()
            .find(|entry| entry.value().username().as_deref() == Some(username))
            .map(|entry| entry.value().clone())
    }

    /// Every session registered at this moment.
    ///
    /// Sessions registered or removed after the call do not affect the
    /// returned list.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Diagnostic view of every session, ordered by ID
    pub fn infos(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<_> = self.sessions.iter().map(|entry| entry.value().info()).collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// Cancel every registered session
    pub fn cancel_all(&self) {
        for entry in self.sessions.iter() {
            entry.value().cancel_token().cancel();
        }
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no sessions are registered
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions created since the registry was built
    pub fn total_created(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(registry: &SessionRegistry, token: &CancellationToken) -> Arc<Session> {
        let (tx, _rx) = mpsc::channel(4);
        registry.create("127.0.0.1:4000".parse().unwrap(), tx, token)
    }

    #[test]
    fn test_ids_are_monotonic() {
        let registry = SessionRegistry::new();
        let token = CancellationToken::new();
        let first = register(&registry, &token);
        let second = register(&registry, &token);
        assert!(first.id() < second.id());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.total_created(), 2);

        registry.deregister(first.id());
        let third = register(&registry, &token);
        assert!(third.id() > second.id());
        assert_eq!(registry.total_created(), 3);
    }

    #[test]
    fn test_deregister_and_lookup() {
        let registry = SessionRegistry::new();
        let token = CancellationToken::new();
        let session = register(&registry, &token);

        assert!(registry.get(session.id()).is_some());
        assert!(registry.deregister(session.id()).is_some());
        assert!(registry.deregister(session.id()).is_none());
        assert!(registry.get(session.id()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_find_by_username() {
        let registry = SessionRegistry::new();
        let token = CancellationToken::new();
        let alice = register(&registry, &token);
        let _other = register(&registry, &token);
        alice.bind("alice");

        let found = registry.find_by_username("alice").unwrap();
        assert_eq!(found.id(), alice.id());
        assert!(registry.find_by_username("bob").is_none());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let registry = SessionRegistry::new();
        let token = CancellationToken::new();
        let session = register(&registry, &token);
        let snapshot = registry.snapshot();
        registry.deregister(session.id());
        register(&registry, &token);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id(), session.id());
    }

    #[test]
    fn test_child_tokens_follow_parent() {
        let registry = SessionRegistry::new();
        let token = CancellationToken::new();
        let session = register(&registry, &token);
        assert!(!session.cancel_token().is_cancelled());
        token.cancel();
        assert!(session.cancel_token().is_cancelled());
    }
}
