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

//! # Bulletin Board Protocol
//!
//! Text protocol spoken between bulletin board clients and the server.
//!
//! ## Overview
//!
//! Every client holds two TCP connections: a command connection carrying
//! request/response pairs, and a notification connection on which the
//! server pushes asynchronous events. Both carry UTF-8 text:
//!
//! - **Requests** are single lines, terminated by `\n` (`\r\n` is accepted).
//!   The first whitespace delimited token names the [`Command`], the rest are
//!   parameters.
//! - **Responses** and **notifications** are records terminated by the
//!   two-byte separator `\r\n`. A response may span several `\n` separated
//!   lines inside one record.
//!
//! ## Core Components
//!
//! - [`Request`]: lexical decoding and encoding of request lines. Decoding
//!   never fails; arity checking belongs to the server's dispatcher.
//! - [`Command`]: the command grammar (names, arity, join requirement).
//! - [`Notification`]: JOIN, LEAVE, POST and their group counterparts.
//! - [`CommandCodec`] / [`ResponseCodec`]: `tokio_util` codecs for the
//!   server and client ends of a connection.
//!
//! ## Usage Example
//!
//! ```rust
//! use bulletin_protocol::{CommandCodec, Command, Request};
//! use bytes::BytesMut;
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let mut codec = CommandCodec::new();
//! let mut input = BytesMut::from("groupjoin 2\r\n");
//! let request = codec.decode(&mut input).unwrap().unwrap();
//! assert_eq!(request.kind(), Ok(Command::GroupJoin));
//! assert_eq!(request.params, vec!["2"]);
//!
//! let mut output = BytesMut::new();
//! codec.encode("alice joined group 2.", &mut output).unwrap();
//! assert_eq!(&output[..], b"alice joined group 2.\r\n");
//! ```

mod codec;
mod command;
mod notification;
mod request;
mod result;

pub use codec::{CommandCodec, DEFAULT_MAX_LENGTH, RECORD_SEPARATOR, ResponseCodec};
pub use command::{Command, UnknownCommand};
pub use notification::{BoardTarget, InvalidNotification, Notification, PostSummary};
pub use request::Request;
pub use result::{CodecError, CodecResult};
