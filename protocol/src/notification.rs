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

//! Out-of-band notifications pushed on the notification connection

use std::fmt;
use std::str::FromStr;

/// The board a notification is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardTarget {
    /// The shared public board
    Public,
    /// A private board by numeric id
    Group(u32),
}

/// Summary of a posted message as carried in POST notifications.
///
/// Text form is `<id>,<sender>,<date>,<subject>`. The subject is last so it
/// may itself contain commas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSummary {
    /// Message id within its board
    pub id: u64,
    /// Posting user
    pub sender: String,
    /// Date as supplied by the poster
    pub date: String,
    /// Subject line
    pub subject: String,
}

impl fmt::Display for PostSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.id, self.sender, self.date, self.subject)
    }
}

impl FromStr for PostSummary {
    type Err = InvalidNotification;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(4, ',');
        let (Some(id), Some(sender), Some(date), Some(subject)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(InvalidNotification(s.to_string()));
        };
        let id = id
            .trim()
            .parse()
            .map_err(|_| InvalidNotification(s.to_string()))?;
        Ok(Self {
            id,
            sender: sender.trim().to_string(),
            date: date.trim().to_string(),
            subject: subject.trim().to_string(),
        })
    }
}

/// An event pushed to other sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A user joined the public board
    Join {
        /// Joining user
        user: String,
    },
    /// A user left the public board
    Leave {
        /// Departing user
        user: String,
    },
    /// A message was posted to the public board
    Post(PostSummary),
    /// A user joined a private board
    GroupJoin {
        /// Board id
        group: u32,
        /// Joining user
        user: String,
    },
    /// A user left a private board
    GroupLeave {
        /// Board id
        group: u32,
        /// Departing user
        user: String,
    },
    /// A message was posted to a private board
    GroupPost {
        /// Board id
        group: u32,
        /// Posted message
        post: PostSummary,
    },
}

impl Notification {
    /// The board whose members should receive this notification
    pub fn target(&self) -> BoardTarget {
        match self {
            Notification::Join { .. } | Notification::Leave { .. } | Notification::Post(_) => {
                BoardTarget::Public
            }
            Notification::GroupJoin { group, .. }
            | Notification::GroupLeave { group, .. }
            | Notification::GroupPost { group, .. } => BoardTarget::Group(*group),
        }
    }

    /// Wire keyword of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Join { .. } => "JOIN",
            Notification::Leave { .. } => "LEAVE",
            Notification::Post(_) => "POST",
            Notification::GroupJoin { .. } => "GROUP_JOIN",
            Notification::GroupLeave { .. } => "GROUP_LEAVE",
            Notification::GroupPost { .. } => "GROUP_POST",
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        match self {
            Notification::Join { user } | Notification::Leave { user } => {
                write!(f, "{kind} {user}")
            }
            Notification::Post(post) => write!(f, "{kind} {post}"),
            Notification::GroupJoin { group, user } | Notification::GroupLeave { group, user } => {
                write!(f, "{kind} {group} {user}")
            }
            Notification::GroupPost { group, post } => write!(f, "{kind} {group} {post}"),
        }
    }
}

/// A notification record that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid notification '{0}'")]
pub struct InvalidNotification(pub String);

impl FromStr for Notification {
    type Err = InvalidNotification;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidNotification(s.to_string());
        let (kind, rest) = s.trim().split_once(' ').ok_or_else(invalid)?;
        let rest = rest.trim();
        let group_and = |rest: &str| -> Result<(u32, String), InvalidNotification> {
            let (group, tail) = rest.split_once(' ').ok_or_else(invalid)?;
            let group = group.parse().map_err(|_| invalid())?;
            Ok((group, tail.trim().to_string()))
        };
        match kind {
            "JOIN" => Ok(Notification::Join {
                user: rest.to_string(),
            }),
            "LEAVE" => Ok(Notification::Leave {
                user: rest.to_string(),
            }),
            "POST" => Ok(Notification::Post(rest.parse()?)),
            "GROUP_JOIN" => {
                let (group, user) = group_and(rest)?;
                Ok(Notification::GroupJoin { group, user })
            }
            "GROUP_LEAVE" => {
                let (group, user) = group_and(rest)?;
                Ok(Notification::GroupLeave { group, user })
            }
            "GROUP_POST" => {
                let (group, post) = group_and(rest)?;
                Ok(Notification::GroupPost {
                    group,
                    post: post.parse()?,
                })
            }
            _ => Err(invalid()),
        }
    }
}
