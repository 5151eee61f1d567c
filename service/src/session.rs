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

//! Per-client session state
//!
//! A [`Session`] is shared between the command worker, the notification
//! worker and every broadcaster holding a registry snapshot. All phase
//! changes are single check-and-set operations under the phase mutex, so
//! exactly one of `leave`, `exit` or a transport failure ever takes the
//! bound username back.

use crate::error::CommandError;
use crate::types::{SessionId, SessionInfo, SessionState};
use bulletin_protocol::Notification;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Unauthenticated { claimed: Option<String> },
    Joined { username: String },
    Disconnected,
}

/// Server-side state for one command/notification connection pair
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    peer_addr: SocketAddr,
    phase: Mutex<Phase>,
    notifier: mpsc::Sender<Notification>,
    cancel: CancellationToken,
    created_at: Instant,
}

impl Session {
    /// Create an unauthenticated session.
    ///
    /// `notifier` feeds the session's notification worker and `cancel` is
    /// shared by both of its workers.
    pub fn new(
        id: SessionId,
        peer_addr: SocketAddr,
        notifier: mpsc::Sender<Notification>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            peer_addr,
            phase: Mutex::new(Phase::Unauthenticated { claimed: None }),
            notifier,
            cancel,
            created_at: Instant::now(),
        }
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Peer address of the command connection
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// When the session was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Token cancelled when the session must stop
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Current top level state
    pub fn state(&self) -> SessionState {
        match *self.phase() {
            Phase::Unauthenticated { .. } => SessionState::Unauthenticated,
            Phase::Joined { .. } => SessionState::Joined,
            Phase::Disconnected => SessionState::Disconnected,
        }
    }

    /// The username bound to the public board, if joined
    pub fn username(&self) -> Option<String> {
        match &*self.phase() {
            Phase::Joined { username } => Some(username.clone()),
            _ => None,
        }
    }

    /// The username announced by `connect` or kept after `leave`
    pub fn claimed(&self) -> Option<String> {
        match &*self.phase() {
            Phase::Unauthenticated { claimed } => claimed.clone(),
            _ => None,
        }
    }

    /// Record the username a later `join` will use
    pub fn claim(&self, username: &str) -> Result<(), CommandError> {
        match &mut *self.phase() {
            Phase::Unauthenticated { claimed } => {
                *claimed = Some(username.to_string());
                Ok(())
            }
            Phase::Joined { username } => Err(CommandError::AlreadyJoined(username.clone())),
            Phase::Disconnected => Err(CommandError::SessionClosed),
        }
    }

    /// Move to `Joined` under `username`.
    ///
    /// Returns `false` when the session is no longer unauthenticated; the
    /// caller then owns undoing whatever it reserved for the name.
    pub fn bind(&self, username: &str) -> bool {
        let mut phase = self.phase();
        match *phase {
            Phase::Unauthenticated { .. } => {
                *phase = Phase::Joined {
                    username: username.to_string(),
                };
                true
            }
            _ => false,
        }
    }

    /// Move from `Joined` back to `Unauthenticated`, returning the released name.
    ///
    /// The name stays claimed so a bare `join` can rejoin with it.
    pub fn unbind(&self) -> Option<String> {
        let mut phase = self.phase();
        match &*phase {
            Phase::Joined { username } => {
                let username = username.clone();
                *phase = Phase::Unauthenticated {
                    claimed: Some(username.clone()),
                };
                Some(username)
            }
            _ => None,
        }
    }

    /// Move to `Disconnected` and cancel both workers.
    ///
    /// Returns the bound username the first time a joined session closes and
    /// `None` on every later call.
    pub fn close(&self) -> Option<String> {
        let previous = std::mem::replace(&mut *self.phase(), Phase::Disconnected);
        self.cancel.cancel();
        match previous {
            Phase::Joined { username } => Some(username),
            _ => None,
        }
    }

    /// Queue a notification without waiting
    pub fn notify(&self, notification: Notification) -> Result<(), TrySendError<Notification>> {
        self.notifier.try_send(notification)
    }

    /// Snapshot for diagnostics
    pub fn info(&self) -> SessionInfo {
        let (state, username) = match &*self.phase() {
            Phase::Unauthenticated { .. } => (SessionState::Unauthenticated, None),
            Phase::Joined { username } => (SessionState::Joined, Some(username.clone())),
            Phase::Disconnected => (SessionState::Disconnected, None),
        };
        SessionInfo {
            id: self.id,
            state,
            username,
            peer_addr: self.peer_addr,
            created_at: self.created_at,
        }
    }
}
