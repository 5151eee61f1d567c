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

//! Request lines

use crate::{Command, UnknownCommand};
use std::fmt;

/// A decoded request line: a command name followed by its parameters.
///
/// Decoding is purely lexical. The command name is kept as sent so the
/// dispatcher can report unknown commands verbatim, and arity is never
/// checked here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// The first token of the line
    pub command: String,
    /// Remaining tokens, in order
    pub params: Vec<String>,
}

impl Request {
    /// Build a request from a command name and parameters
    pub fn new<S: Into<String>>(command: impl Into<String>, params: impl IntoIterator<Item = S>) -> Self {
        Self {
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a line into a command and whitespace delimited parameters.
    ///
    /// Never fails. A blank line produces an empty command with no parameters.
    pub fn decode(line: &str) -> Self {
        let mut tokens = line.split_whitespace();
        let command = tokens.next().unwrap_or_default().to_string();
        let params = tokens.map(str::to_string).collect();
        Self { command, params }
    }

    /// Join a command and parameters with single spaces
    pub fn encode<S: AsRef<str>>(command: &str, params: &[S]) -> String {
        let mut line = String::from(command);
        for param in params {
            line.push(' ');
            line.push_str(param.as_ref());
        }
        line
    }

    /// Resolve the command name
    pub fn kind(&self) -> Result<Command, UnknownCommand> {
        self.command.parse()
    }

    /// True when the line carried no tokens at all
    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }

    /// Parameters re-joined with single spaces, starting at `from`
    pub fn tail(&self, from: usize) -> String {
        self.params.get(from..).map(|rest| rest.join(" ")).unwrap_or_default()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Request::encode(&self.command, &self.params))
    }
}
