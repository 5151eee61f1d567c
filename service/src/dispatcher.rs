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

//! Command dispatcher
//!
//! Validates and executes one [`Request`] on behalf of a [`Session`].
//! Every command is checked in the same order: arity, then whether the
//! session has joined, then the board rules. A rejected command produces an
//! `Error: ...` reply and leaves the store and every session untouched.
//!
//! Dispatch is synchronous. The only side effects besides store mutation are
//! broadcasts, which enqueue without waiting.

use crate::broadcast::Broadcaster;
use crate::error::CommandError;
use crate::metrics::ServerMetrics;
use crate::registry::SessionRegistry;
use crate::session::Session;
use bulletin_board::{BoardError, BoardId, BoardStore, GroupId, MessageId};
use bulletin_protocol::{Command, Notification, PostSummary, Request, UnknownCommand};
use metrics::{counter, histogram};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Number of recent public messages shown after `join`
const JOIN_PREVIEW: usize = 2;

/// Response to one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Response record, possibly spanning several lines
    pub text: String,
    /// Whether the session ends after this reply is written
    pub close: bool,
}

impl Reply {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            close: false,
        }
    }

    fn error(err: &CommandError) -> Self {
        Self::ok(format!("Error: {err}"))
    }

    fn goodbye() -> Self {
        Self {
            text: "Goodbye!".to_string(),
            close: true,
        }
    }

    /// True for `Error: ...` replies
    pub fn is_error(&self) -> bool {
        self.text.starts_with("Error:")
    }
}

/// Post parameters after the free-form tail is split
#[derive(Debug, Clone, PartialEq, Eq)]
struct PostArgs {
    sender: String,
    date: String,
    group: Option<GroupId>,
    subject: String,
    content: String,
}

/// Executes commands against the board store
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    store: Arc<BoardStore>,
    registry: Arc<SessionRegistry>,
    broadcaster: Broadcaster,
    metrics: Arc<ServerMetrics>,
}

impl CommandDispatcher {
    /// Create a dispatcher sharing the given store, registry and metrics
    pub fn new(
        store: Arc<BoardStore>,
        registry: Arc<SessionRegistry>,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        let broadcaster = Broadcaster::new(registry.clone(), store.clone(), metrics.clone());
        Self {
            store,
            registry,
            broadcaster,
            metrics,
        }
    }

    /// The board store commands run against
    pub fn store(&self) -> &Arc<BoardStore> {
        &self.store
    }

    /// The registry broadcasts are resolved through
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Execute one request. Blank lines produce no reply.
    pub fn dispatch(&self, session: &Session, request: &Request) -> Option<Reply> {
        if request.is_empty() {
            return None;
        }

        let started = Instant::now();
        let result = self.execute(session, request);
        histogram!("bulletin.command.duration").record(started.elapsed().as_secs_f64());
        counter!("bulletin.commands.total").increment(1);
        self.metrics.command();

        Some(match result {
            Ok(reply) => reply,
            Err(err) => {
                if err.is_protocol_error() {
                    counter!("bulletin.errors.protocol").increment(1);
                    self.metrics.protocol_error();
                } else {
                    counter!("bulletin.errors.domain").increment(1);
                    self.metrics.domain_error();
                }
                debug!(
                    session_id = %session.id(),
                    command = %request.command,
                    error = %err,
                    "command rejected"
                );
                Reply::error(&err)
            }
        })
    }

    /// Tear a session down: release its username, tell the boards it was on
    /// and drop it from the registry.
    ///
    /// Safe to call any number of times from any exit path; only the first
    /// call for a joined session removes and announces the user.
    pub fn disconnect(&self, session: &Session) {
        if let Some(username) = session.close() {
            self.release(session, &username);
            info!(session_id = %session.id(), username = %username, "user disconnected");
        }
        if self.registry.deregister(session.id()).is_some() {
            self.metrics.session_closed(session.created_at().elapsed());
            counter!("bulletin.sessions.closed").increment(1);
        }
    }

    fn execute(&self, session: &Session, request: &Request) -> Result<Reply, CommandError> {
        let command = request
            .kind()
            .map_err(|UnknownCommand(name)| CommandError::UnknownCommand(name))?;
        let params = request.params.as_slice();
        if !command.arity().contains(&params.len()) {
            return Err(CommandError::Usage(command.usage()));
        }

        let user = if command.requires_join() {
            session.username().ok_or(CommandError::NotJoined)?
        } else {
            String::new()
        };

        match command {
            Command::Connect => self.connect(session, params),
            Command::Join => self.join(session, params),
            Command::Post => self.post(session, &user, params),
            Command::Users => Ok(self.users()),
            Command::Leave => self.leave(session, &user, params),
            Command::Message => self.message(params),
            Command::Exit => Ok(Reply::goodbye()),
            Command::Groups => Ok(self.groups()),
            Command::GroupJoin => self.group_join(session, &user, params),
            Command::GroupPost => self.group_post(session, &user, params),
            Command::GroupUsers => self.group_users(&user, params),
            Command::GroupLeave => self.group_leave(session, &user, params),
            Command::GroupMessage => self.group_message(&user, params),
        }
    }

    fn connect(&self, session: &Session, params: &[String]) -> Result<Reply, CommandError> {
        let username = &params[2];
        session.claim(username)?;
        debug!(
            session_id = %session.id(),
            address = %params[0],
            port = %params[1],
            username = %username,
            "connect handshake"
        );
        Ok(Reply::ok(format!(
            "Connected to the bulletin board server as {username}."
        )))
    }

    fn join(&self, session: &Session, params: &[String]) -> Result<Reply, CommandError> {
        if let Some(current) = session.username() {
            return Err(CommandError::AlreadyJoined(current));
        }
        let username = params
            .first()
            .cloned()
            .or_else(|| session.claimed())
            .ok_or(CommandError::NoUsername)?;

        self.store.add_user(&username).map_err(|err| match err {
            BoardError::AlreadyMember(name) => CommandError::UsernameTaken(name),
            other => CommandError::Board(other),
        })?;
        if !session.bind(&username) {
            // Closed while the name was being reserved; the cleanup path has
            // already run and will not see this name.
            let _ = self.store.remove_user(&username);
            return Err(CommandError::SessionClosed);
        }

        info!(session_id = %session.id(), username = %username, "user joined");
        self.broadcaster.broadcast(
            Some(session.id()),
            &Notification::Join {
                user: username.clone(),
            },
        );

        let mut text = format!(
            "{username} has joined the bulletin board.\nMembers: {}",
            self.store.list_users().join(", ")
        );
        for message in self.store.last_messages(JOIN_PREVIEW) {
            text.push('\n');
            text.push_str(&message.summary());
        }
        Ok(Reply::ok(text))
    }

    fn post(&self, session: &Session, user: &str, params: &[String]) -> Result<Reply, CommandError> {
        let args = parse_post(params, false)?;
        check_sender(&args.sender, user)?;

        let id = self
            .store
            .add_post(user, &args.date, &args.subject, &args.content)?;
        self.broadcaster.broadcast(
            Some(session.id()),
            &Notification::Post(summary(id, args)),
        );
        Ok(Reply::ok(format!("Message posted with ID {id}.")))
    }

    fn users(&self) -> Reply {
        let users = self.store.list_users();
        if users.is_empty() {
            Reply::ok("No users on the board.")
        } else {
            Reply::ok(users.join("\n"))
        }
    }

    fn leave(&self, session: &Session, user: &str, params: &[String]) -> Result<Reply, CommandError> {
        if let Some(named) = params.first()
            && named != user
        {
            return Err(CommandError::ForeignLeave(named.clone()));
        }
        let username = session.unbind().ok_or(CommandError::NotJoined)?;
        self.release(session, &username);
        info!(session_id = %session.id(), username = %username, "user left");
        Ok(Reply::ok(format!("{username} has left the bulletin board.")))
    }

    fn message(&self, params: &[String]) -> Result<Reply, CommandError> {
        let id: MessageId = parse_number("message ID", &params[0])?;
        self.store
            .get_message(id)
            .map(|message| Reply::ok(message.summary()))
            .ok_or(CommandError::MessageNotFound(id))
    }

    fn groups(&self) -> Reply {
        let groups = self.store.list_groups();
        if groups.is_empty() {
            return Reply::ok("No groups available.");
        }
        let lines: Vec<String> = groups
            .iter()
            .map(|group| format!("{},{}", group.id, group.name))
            .collect();
        Reply::ok(lines.join("\n"))
    }

    fn group_join(&self, session: &Session, user: &str, params: &[String]) -> Result<Reply, CommandError> {
        let group: GroupId = parse_number("group ID", &params[0])?;
        self.store.join_group(user, group)?;
        self.broadcaster.broadcast(
            Some(session.id()),
            &Notification::GroupJoin {
                group: group.as_u32(),
                user: user.to_string(),
            },
        );
        Ok(Reply::ok(format!("{user} joined group {group}.")))
    }

    fn group_post(&self, session: &Session, user: &str, params: &[String]) -> Result<Reply, CommandError> {
        let args = parse_post(params, true)?;
        check_sender(&args.sender, user)?;
        let group = match args.group {
            Some(group) => group,
            None => return Err(CommandError::Usage(Command::GroupPost.usage())),
        };

        let id = self
            .store
            .post_to_group(group, user, &args.date, &args.subject, &args.content)?;
        self.broadcaster.broadcast(
            Some(session.id()),
            &Notification::GroupPost {
                group: group.as_u32(),
                post: summary(id, args),
            },
        );
        Ok(Reply::ok(format!(
            "Message posted to group {group} with ID {id}."
        )))
    }

    fn group_users(&self, user: &str, params: &[String]) -> Result<Reply, CommandError> {
        let group: GroupId = parse_number("group ID", &params[0])?;
        self.check_member(group, user)?;
        let users = self.store.list_group_users(group)?;
        if users.is_empty() {
            Ok(Reply::ok(format!("No users in group {group}.")))
        } else {
            Ok(Reply::ok(users.join("\n")))
        }
    }

    fn group_leave(&self, session: &Session, user: &str, params: &[String]) -> Result<Reply, CommandError> {
        let group: GroupId = parse_number("group ID", &params[0])?;
        self.store.leave_group(user, group)?;
        self.broadcaster.broadcast(
            Some(session.id()),
            &Notification::GroupLeave {
                group: group.as_u32(),
                user: user.to_string(),
            },
        );
        Ok(Reply::ok(format!("{user} left group {group}.")))
    }

    fn group_message(&self, user: &str, params: &[String]) -> Result<Reply, CommandError> {
        let group: GroupId = parse_number("group ID", &params[0])?;
        let id: MessageId = parse_number("message ID", &params[1])?;
        self.check_member(group, user)?;
        self.store
            .get_group_message(group, id)?
            .map(|message| Reply::ok(message.detail()))
            .ok_or(CommandError::GroupMessageNotFound { group, id })
    }

    /// Private boards are readable by members only
    fn check_member(&self, group: GroupId, user: &str) -> Result<(), CommandError> {
        let board = self.store.board(BoardId::Group(group))?;
        if self.store.is_group_member(user, group) {
            Ok(())
        } else {
            Err(BoardError::NotAMember {
                user: user.to_string(),
                board: board.id(),
            }
            .into())
        }
    }

    /// Remove `username` from the store and announce it: one GROUP_LEAVE per
    /// private board, then LEAVE.
    fn release(&self, session: &Session, username: &str) {
        let groups = match self.store.remove_user(username) {
            Ok(groups) => groups,
            Err(err) => {
                debug!(session_id = %session.id(), username, error = %err, "user already removed");
                return;
            }
        };
        for group in groups {
            self.broadcaster.broadcast(
                Some(session.id()),
                &Notification::GroupLeave {
                    group: group.as_u32(),
                    user: username.to_string(),
                },
            );
        }
        self.broadcaster.broadcast(
            Some(session.id()),
            &Notification::Leave {
                user: username.to_string(),
            },
        );
    }
}

fn parse_number<T: FromStr>(what: &'static str, value: &str) -> Result<T, CommandError> {
    value.parse().map_err(|_| CommandError::NotANumber {
        what,
        value: value.to_string(),
    })
}

fn check_sender(sender: &str, user: &str) -> Result<(), CommandError> {
    if sender == user {
        Ok(())
    } else {
        Err(CommandError::ForeignSender {
            sender: sender.to_string(),
            user: user.to_string(),
        })
    }
}

fn summary(id: MessageId, args: PostArgs) -> PostSummary {
    PostSummary {
        id: id.as_u64(),
        sender: args.sender,
        date: args.date,
        subject: args.subject,
    }
}

fn is_time(token: &str) -> bool {
    token.contains(':') && token.chars().all(|c| c.is_ascii_digit() || c == ':')
}

/// Split `<sender> <date> [<time>] [<group_id>] <subject> | <content>`.
///
/// Fails with the usage text when no subject remains, and with
/// `NotANumber` when a group post's id is not numeric.
fn parse_post(params: &[String], grouped: bool) -> Result<PostArgs, CommandError> {
    let usage = || {
        let command = if grouped { Command::GroupPost } else { Command::Post };
        CommandError::Usage(command.usage())
    };
    let (Some(sender), Some(date)) = (params.first(), params.get(1)) else {
        return Err(usage());
    };
    let (sender, date) = (sender.clone(), date.clone());
    let mut rest = &params[2..];

    let date = match rest.first() {
        Some(time) if is_time(time) => {
            rest = &rest[1..];
            format!("{date} {time}")
        }
        _ => date,
    };

    let group = if grouped {
        let (first, tail) = rest.split_first().ok_or_else(usage)?;
        rest = tail;
        Some(parse_number::<GroupId>("group ID", first)?)
    } else {
        None
    };

    let tail = rest.join(" ");
    let (subject, content) = match tail.split_once('|') {
        Some((subject, content)) => (subject.trim().to_string(), content.trim().to_string()),
        None => {
            let (subject, content) = rest.split_first().ok_or_else(usage)?;
            (subject.clone(), content.join(" "))
        }
    };
    if subject.is_empty() {
        return Err(usage());
    }

    Ok(PostArgs {
        sender,
        date,
        group,
        subject,
        content,
    })
}
