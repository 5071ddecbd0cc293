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

//! Factories for session-level administrative messages.
//!
//! Header fields (34, 49, 52, 56) are stamped further down the pipeline; the
//! factories only populate the message-type-specific body.

use crate::{
    dictionary::{MsgType, Tag},
    message::Message,
};

/// Creates a Logon (35=A) message.
#[must_use]
pub fn logon(
    heartbeat_interval: u64,
    username: &str,
    password: &str,
    reset_seq_nums: bool,
    test_mode: bool,
) -> Message {
    let mut message = Message::of_type(MsgType::Logon);
    message.set(Tag::EncryptMethod.code(), "0");
    message.set(Tag::HeartBtInt.code(), heartbeat_interval);
    message.set(Tag::Username.code(), username);
    message.set(Tag::Password.code(), password);
    message.set(Tag::ResetSeqNumFlag.code(), reset_seq_nums);
    if test_mode {
        message.set(Tag::TestMessageIndicator.code(), "Y");
    }
    message
}

/// Creates a Logout (35=5) message.
#[must_use]
pub fn logout(text: Option<&str>) -> Message {
    let mut message = Message::of_type(MsgType::Logout);
    if let Some(text) = text {
        message.set(Tag::Text.code(), text);
    }
    message
}

/// Creates a Heartbeat (35=0) message, echoing a `TestReqID` when responding
/// to a test request.
#[must_use]
pub fn heartbeat(test_req_id: Option<&str>) -> Message {
    let mut message = Message::of_type(MsgType::Heartbeat);
    if let Some(id) = test_req_id {
        message.set(Tag::TestReqID.code(), id);
    }
    message
}

/// Creates a TestRequest (35=1) message.
#[must_use]
pub fn test_request(test_req_id: &str) -> Message {
    let mut message = Message::of_type(MsgType::TestRequest);
    message.set(Tag::TestReqID.code(), test_req_id);
    message
}

/// Creates a ResendRequest (35=2) covering `[begin, end]`.
///
/// Per the protocol, `end = 0` requests everything from `begin` onwards.
#[must_use]
pub fn resend_request(begin: u64, end: u64) -> Message {
    let mut message = Message::of_type(MsgType::ResendRequest);
    message.set(Tag::BeginSeqNo.code(), begin);
    message.set(Tag::EndSeqNo.code(), end);
    message
}

/// Creates a SequenceReset-GapFill (35=4, 123=Y) standing in for the
/// administrative messages archived at `[seq, new_seq_no)`.
///
/// The message carries its own sequence number and `PossDupFlag=Y` so that
/// downstream stamping leaves it untouched.
#[must_use]
pub fn gap_fill(seq: u64, new_seq_no: u64) -> Message {
    let mut message = Message::of_type(MsgType::SequenceReset);
    message.set(Tag::MsgSeqNum.code(), seq);
    message.set(Tag::GapFillFlag.code(), "Y");
    message.set(Tag::PossDupFlag.code(), "Y");
    message.set(Tag::NewSeqNo.code(), new_seq_no);
    message
}
