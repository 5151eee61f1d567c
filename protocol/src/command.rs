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

//! Command names and their grammar

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// A command understood by the bulletin board server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Informational handshake carrying address, port and username
    Connect,
    /// Join the public board
    Join,
    /// Post to the public board
    Post,
    /// List public board members
    Users,
    /// Leave the public board
    Leave,
    /// Fetch a public message
    Message,
    /// End the session
    Exit,
    /// List private boards
    Groups,
    /// Join a private board
    GroupJoin,
    /// Post to a private board
    GroupPost,
    /// List members of a private board
    GroupUsers,
    /// Leave a private board
    GroupLeave,
    /// Fetch a message from a private board
    GroupMessage,
}

impl Command {
    /// Every command, in grammar order.
    pub const ALL: [Command; 13] = [
        Command::Connect,
        Command::Join,
        Command::Post,
        Command::Users,
        Command::Leave,
        Command::Message,
        Command::Exit,
        Command::Groups,
        Command::GroupJoin,
        Command::GroupPost,
        Command::GroupUsers,
        Command::GroupLeave,
        Command::GroupMessage,
    ];

    /// Wire name of the command
    pub fn name(self) -> &'static str {
        match self {
            Command::Connect => "connect",
            Command::Join => "join",
            Command::Post => "post",
            Command::Users => "users",
            Command::Leave => "leave",
            Command::Message => "message",
            Command::Exit => "exit",
            Command::Groups => "groups",
            Command::GroupJoin => "groupjoin",
            Command::GroupPost => "grouppost",
            Command::GroupUsers => "groupusers",
            Command::GroupLeave => "groupleave",
            Command::GroupMessage => "groupmessage",
        }
    }

    /// Number of whitespace separated parameter tokens the command accepts.
    ///
    /// Posts take a free-form tail, so only their minimum is meaningful; the
    /// tail itself is split by the dispatcher.
    pub fn arity(self) -> RangeInclusive<usize> {
        match self {
            Command::Connect => 3..=3,
            Command::Join => 0..=1,
            Command::Post => 3..=usize::MAX,
            Command::Users => 0..=0,
            Command::Leave => 0..=1,
            Command::Message => 1..=1,
            Command::Exit => 0..=0,
            Command::Groups => 0..=0,
            Command::GroupJoin => 1..=1,
            Command::GroupPost => 4..=usize::MAX,
            Command::GroupUsers => 1..=1,
            Command::GroupLeave => 1..=1,
            Command::GroupMessage => 2..=2,
        }
    }

    /// Human readable parameter synopsis, used in arity errors
    pub fn usage(self) -> &'static str {
        match self {
            Command::Connect => "connect <address> <port> <username>",
            Command::Join => "join [<username>]",
            Command::Post => "post <sender> <date> <subject> | <content>",
            Command::Users => "users",
            Command::Leave => "leave",
            Command::Message => "message <message_id>",
            Command::Exit => "exit",
            Command::Groups => "groups",
            Command::GroupJoin => "groupjoin <group_id>",
            Command::GroupPost => "grouppost <sender> <date> <group_id> <subject> | <content>",
            Command::GroupUsers => "groupusers <group_id>",
            Command::GroupLeave => "groupleave <group_id>",
            Command::GroupMessage => "groupmessage <group_id> <message_id>",
        }
    }

    /// Whether the session must have joined the public board first
    pub fn requires_join(self) -> bool {
        !matches!(
            self,
            Command::Connect | Command::Join | Command::Users | Command::Exit | Command::Groups
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The command name did not match any known command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command '{0}'")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    /// Parses a command name. Leading `%` markers used by older clients
    /// (`%join`, `%%groups`) are ignored, as is letter case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.trim_start_matches('%');
        Command::ALL
            .into_iter()
            .find(|command| command.name().eq_ignore_ascii_case(bare))
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}
