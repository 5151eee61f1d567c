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

//! Posted messages

use crate::MessageId;

/// An immutable message on a board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Id within the owning board
    pub id: MessageId,
    /// Posting user
    pub sender: String,
    /// Date as supplied by the poster
    pub date: String,
    /// Subject line
    pub subject: String,
    /// Body
    pub content: String,
}

impl Message {
    /// Bulletin line: `<id>,<sender>,<date>,<subject>`.
    ///
    /// Used for public board reads and post notifications. The content is
    /// deliberately omitted.
    pub fn summary(&self) -> String {
        format!("{},{},{},{}", self.id, self.sender, self.date, self.subject)
    }

    /// Full rendering including the content: `<sender> on <date>: [<subject>] <content>`
    pub fn detail(&self) -> String {
        format!(
            "{} on {}: [{}] {}",
            self.sender, self.date, self.subject, self.content
        )
    }
}
