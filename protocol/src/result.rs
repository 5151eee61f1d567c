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

//! Error types for the framing codecs

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while framing records on a byte stream.
///
/// Decoding text never fails on its own: malformed UTF-8 is replaced and
/// empty lines decode to empty requests. The only failures are transport
/// failures and records that exceed the configured size limit.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An I/O error occurred while reading from or writing to the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record grew past the maximum length without a terminator.
    #[error("line exceeds maximum length of {limit} bytes")]
    LineTooLong {
        /// The configured limit in bytes
        limit: usize,
    },
}

impl CodecError {
    /// Check if the error came from the underlying transport
    pub fn is_io(&self) -> bool {
        matches!(self, CodecError::Io(_))
    }
}
