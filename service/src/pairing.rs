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

//! Matching command connections with notification connections
//!
//! Both listeners feed one `Pairing`. A connection that arrives with no
//! partner waits in its queue until a partner arrives or its deadline
//! passes; the accept loop never blocks on a single client.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;

/// A connection waiting for its partner
#[derive(Debug)]
struct Waiting<S> {
    stream: S,
    peer: SocketAddr,
    deadline: Instant,
}

/// A command connection matched with its notification connection
#[derive(Debug)]
pub(crate) struct Pair<S> {
    pub command: S,
    pub notification: S,
    /// Peer of the command connection
    pub peer: SocketAddr,
}

/// Result of offering a newly accepted connection
#[derive(Debug)]
pub(crate) enum Offer<S> {
    /// A waiting partner was found
    Paired(Pair<S>),
    /// Queued until a partner arrives or the deadline passes
    Waiting,
    /// Too many connections already waiting; the stream was dropped
    Overflow,
}

/// Connections dropped by `expire`, by peer
#[derive(Debug, Default)]
pub(crate) struct Expired {
    pub commands: Vec<SocketAddr>,
    pub notifications: Vec<SocketAddr>,
}

/// Unmatched connections from both listeners.
///
/// A new connection takes the newest waiting partner from the same host,
/// or the newest waiting partner from any host. A client opens its
/// notification connection right after its command connection, so an
/// abandoned half-pair is always older than a live client's.
#[derive(Debug)]
pub(crate) struct Pairing<S> {
    commands: VecDeque<Waiting<S>>,
    notifications: VecDeque<Waiting<S>>,
    timeout: Duration,
    capacity: usize,
}

impl<S> Pairing<S> {
    /// `capacity` bounds each queue separately
    pub fn new(timeout: Duration, capacity: usize) -> Self {
        Self {
            commands: VecDeque::new(),
            notifications: VecDeque::new(),
            timeout,
            capacity,
        }
    }

    pub fn offer_command(&mut self, stream: S, peer: SocketAddr, now: Instant) -> Offer<S> {
        match take_partner(&mut self.notifications, peer) {
            Some(notification) => Offer::Paired(Pair {
                command: stream,
                notification: notification.stream,
                peer,
            }),
            None => self.enqueue(Side::Command, stream, peer, now),
        }
    }

    pub fn offer_notification(&mut self, stream: S, peer: SocketAddr, now: Instant) -> Offer<S> {
        match take_partner(&mut self.commands, peer) {
            Some(command) => Offer::Paired(Pair {
                command: command.stream,
                notification: stream,
                peer: command.peer,
            }),
            None => self.enqueue(Side::Notification, stream, peer, now),
        }
    }

    /// Earliest deadline among waiting connections
    pub fn next_deadline(&self) -> Option<Instant> {
        // Every entry gets the same timeout, so each queue's front expires first.
        let fronts = [self.commands.front(), self.notifications.front()];
        fronts.into_iter().flatten().map(|waiting| waiting.deadline).min()
    }

    /// Drop every connection whose deadline is at or before `now`
    pub fn expire(&mut self, now: Instant) -> Expired {
        Expired {
            commands: drain_expired(&mut self.commands, now),
            notifications: drain_expired(&mut self.notifications, now),
        }
    }

    pub fn waiting_commands(&self) -> usize {
        self.commands.len()
    }

    pub fn waiting_notifications(&self) -> usize {
        self.notifications.len()
    }

    fn enqueue(&mut self, side: Side, stream: S, peer: SocketAddr, now: Instant) -> Offer<S> {
        let queue = match side {
            Side::Command => &mut self.commands,
            Side::Notification => &mut self.notifications,
        };
        if queue.len() >= self.capacity {
            return Offer::Overflow;
        }
        queue.push_back(Waiting {
            stream,
            peer,
            deadline: now + self.timeout,
        });
        Offer::Waiting
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Command,
    Notification,
}

fn take_partner<S>(queue: &mut VecDeque<Waiting<S>>, peer: SocketAddr) -> Option<Waiting<S>> {
    let index = queue
        .iter()
        .rposition(|waiting| waiting.peer.ip() == peer.ip())
        .or_else(|| queue.len().checked_sub(1))?;
    queue.remove(index)
}

fn drain_expired<S>(queue: &mut VecDeque<Waiting<S>>, now: Instant) -> Vec<SocketAddr> {
    let mut expired = Vec::new();
    while let Some(front) = queue.front() {
        if front.deadline > now {
            break;
        }
        if let Some(waiting) = queue.pop_front() {
            expired.push(waiting.peer);
        }
    }
    expired
}
