// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Error taxonomy for the engine.
//!
//! The taxonomy separates recoverable codec failures (`ParseError`),
//! construction/lookup failures (`ValidationError`, `FieldMapError`), per-message
//! stage outcomes (`StageError`), and fatal session conditions (`SessionError`)
//! which tear the pipeline down and surface as a non-zero exit.

use thiserror::Error;

/// Failures raised by the wire codec while decoding a frame.
///
/// These are recovered locally: the frame is dropped and the session continues.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("could not find BeginString (8) in frame")]
    MissingBeginString,

    #[error("could not find Checksum (10) in frame")]
    MissingChecksum,

    #[error("no repeating group template for duplicate tag {0}")]
    DuplicateTag(u32),

    #[error("no group template for identifier tag {tag} and message type '{msg_type}'")]
    UnknownGroupTemplate { tag: u32, msg_type: String },

    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("declared body length {declared} does not match actual {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("declared checksum {declared} does not match computed {computed}")]
    ChecksumMismatch { declared: u32, computed: u32 },
}

/// Failures raised when constructing or validating a message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no MsgType (35) specified")]
    MissingMsgType,

    #[error("bad group template: {0}")]
    BadGroupTemplate(String),

    #[error("tag {0} not found in any supported FIX specification")]
    UnknownTag(u32),

    #[error("message type '{0}' not found in any supported FIX specification")]
    UnknownType(String),

    #[error("invalid value for tag {tag}: {reason}")]
    InvalidValue { tag: u32, reason: String },
}

/// Field-lookup failures on a field map or message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldMapError {
    #[error("tag {0} not found")]
    TagNotFound(u32),

    #[error("tag {0} repeated")]
    DuplicateTag(u32),

    #[error("tag {0} is not a repeating group")]
    InvalidGroup(u32),
}

/// Failures raised by a message store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Fatal session conditions from which no recovery is possible.
///
/// A `SessionError` tears the pipeline down and propagates to the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("logon confirmation for {field} was '{received}', expected '{expected}'")]
    LogonMismatch {
        field: &'static str,
        expected: String,
        received: String,
    },

    #[error("no logon acknowledgement received within the startup timeout")]
    LogonTimeout,

    #[error("unexpected sequence number {received}, expected {expected}")]
    UnexpectedSeqNum { received: u64, expected: u64 },

    #[error("counterparty stopped responding to test requests")]
    HeartbeatTimeout,

    #[error("transport read buffer exceeded {limit} bytes")]
    BufferOverrun { limit: usize },

    #[error("unexpected EOF on transport")]
    TransportEof,

    #[error("stage '{stage}' exceeded the {phase} timeout")]
    StageTimeout {
        stage: &'static str,
        phase: &'static str,
    },

    #[error("stage '{stage}' failed during {phase}: {source}")]
    StageFailed {
        stage: &'static str,
        phase: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The outcome of a stage invocation that did not pass the message on.
#[derive(Debug, Error)]
pub enum StageError {
    /// Benign signal: halts propagation of the current message, not an error.
    #[error("message processing stopped")]
    Stop,

    /// The stage failed for reasons not indicating session corruption; the
    /// message is dropped and the session continues.
    #[error("processing error: {0}")]
    Processing(#[source] anyhow::Error),

    /// The session is corrupt; the pipeline is torn down.
    #[error(transparent)]
    Fatal(#[from] SessionError),
}

impl From<ParseError> for StageError {
    fn from(error: ParseError) -> Self {
        Self::Processing(error.into())
    }
}

impl From<ValidationError> for StageError {
    fn from(error: ValidationError) -> Self {
        Self::Processing(error.into())
    }
}

impl From<FieldMapError> for StageError {
    fn from(error: FieldMapError) -> Self {
        Self::Processing(error.into())
    }
}

impl From<StoreError> for StageError {
    fn from(error: StoreError) -> Self {
        Self::Processing(error.into())
    }
}

/// Configuration failures detected at load time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration '{0}'")]
    Missing(String),

    #[error("invalid configuration '{key}': {reason}")]
    Invalid { key: String, reason: String },

    #[error("session id file error: {0}")]
    SessionIdFile(String),
}
