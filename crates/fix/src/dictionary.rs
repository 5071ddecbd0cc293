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

//! The FIX 4.4 protocol dictionary.
//!
//! A compile-time table of tag numbers and message types with name ⇄ code
//! conversions in both directions. Lookups for codes outside the table fail
//! with [`ValidationError::UnknownTag`] / [`ValidationError::UnknownType`].

use std::str::FromStr;

use strum::{EnumIter, EnumString, FromRepr, IntoStaticStr};

use crate::error::ValidationError;

/// FIX 4.4 tag numbers used by the engine and its session layer.
#[repr(u32)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, FromRepr, IntoStaticStr,
)]
pub enum Tag {
    Account = 1,
    AvgPx = 6,
    BeginSeqNo = 7,
    BeginString = 8,
    BodyLength = 9,
    CheckSum = 10,
    ClOrdID = 11,
    CumQty = 14,
    Currency = 15,
    EndSeqNo = 16,
    ExecID = 17,
    ExecInst = 18,
    HandlInst = 21,
    SecurityIDSource = 22,
    LastPx = 31,
    LastQty = 32,
    MsgSeqNum = 34,
    MsgType = 35,
    NewSeqNo = 36,
    OrderID = 37,
    OrderQty = 38,
    OrdStatus = 39,
    OrdType = 40,
    OrigClOrdID = 41,
    PossDupFlag = 43,
    Price = 44,
    RefSeqNum = 45,
    SecurityID = 48,
    SenderCompID = 49,
    SendingTime = 52,
    Side = 54,
    Symbol = 55,
    TargetCompID = 56,
    Text = 58,
    TimeInForce = 59,
    TransactTime = 60,
    RawDataLength = 95,
    RawData = 96,
    PossResend = 97,
    EncryptMethod = 98,
    StopPx = 99,
    CxlRejReason = 102,
    OrdRejReason = 103,
    HeartBtInt = 108,
    TestReqID = 112,
    OnBehalfOfCompID = 115,
    OrigSendingTime = 122,
    GapFillFlag = 123,
    ExpireTime = 126,
    DeliverToCompID = 128,
    NoMiscFees = 136,
    MiscFeeAmt = 137,
    MiscFeeCurr = 138,
    MiscFeeType = 139,
    ResetSeqNumFlag = 141,
    ExecType = 150,
    LeavesQty = 151,
    MDReqID = 262,
    SubscriptionRequestType = 263,
    MarketDepth = 264,
    NoMDEntryTypes = 267,
    NoMDEntries = 268,
    MDEntryType = 269,
    MDEntryPx = 270,
    MDEntrySize = 271,
    MDUpdateAction = 279,
    RefTagID = 371,
    RefMsgType = 372,
    SessionRejectReason = 373,
    MaxMessageSize = 383,
    NoMsgTypes = 384,
    MsgDirection = 385,
    PartyIDSource = 447,
    PartyID = 448,
    PartyRole = 452,
    NoPartyIDs = 453,
    TestMessageIndicator = 464,
    SecondaryExecID = 527,
    NestedPartyID = 524,
    NestedPartyIDSource = 525,
    NestedPartyRole = 538,
    NoNestedPartyIDs = 539,
    NestedPartySubID = 545,
    Username = 553,
    Password = 554,
    NoPartySubIDs = 802,
    PartySubIDType = 803,
    NoNestedPartySubIDs = 804,
    NestedPartySubIDType = 805,
    LastLiquidityInd = 851,
    TrdMatchID = 880,
    NextExpectedMsgSeqNum = 789,
}

impl Tag {
    /// Looks up a tag by its wire code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is not in the FIX 4.4 table.
    pub fn from_code(code: u32) -> Result<Self, ValidationError> {
        Self::from_repr(code).ok_or(ValidationError::UnknownTag(code))
    }

    /// Looks up a tag by its specification name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    /// Returns the wire code for this tag.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Returns the specification name for this tag.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Returns the specification name for `code`, if known.
#[must_use]
pub fn tag_name(code: u32) -> Option<&'static str> {
    Tag::from_repr(code).map(|t| t.name())
}

/// FIX 4.4 message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
pub enum MsgType {
    Heartbeat,
    TestRequest,
    ResendRequest,
    Reject,
    SequenceReset,
    Logout,
    ExecutionReport,
    OrderCancelReject,
    Logon,
    News,
    Email,
    NewOrderSingle,
    OrderCancelRequest,
    OrderCancelReplaceRequest,
    OrderStatusRequest,
    QuoteRequest,
    Quote,
    MarketDataRequest,
    MarketDataSnapshotFullRefresh,
    MarketDataIncrementalRefresh,
    MarketDataRequestReject,
    BusinessMessageReject,
    TradeCaptureReport,
}

impl MsgType {
    /// Returns the wire code (tag 35 value) for this message type.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Heartbeat => "0",
            Self::TestRequest => "1",
            Self::ResendRequest => "2",
            Self::Reject => "3",
            Self::SequenceReset => "4",
            Self::Logout => "5",
            Self::ExecutionReport => "8",
            Self::OrderCancelReject => "9",
            Self::Logon => "A",
            Self::News => "B",
            Self::Email => "C",
            Self::NewOrderSingle => "D",
            Self::OrderCancelRequest => "F",
            Self::OrderCancelReplaceRequest => "G",
            Self::OrderStatusRequest => "H",
            Self::QuoteRequest => "R",
            Self::Quote => "S",
            Self::MarketDataRequest => "V",
            Self::MarketDataSnapshotFullRefresh => "W",
            Self::MarketDataIncrementalRefresh => "X",
            Self::MarketDataRequestReject => "Y",
            Self::BusinessMessageReject => "j",
            Self::TradeCaptureReport => "AE",
        }
    }

    /// Looks up a message type by its wire code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is not in the FIX 4.4 table.
    pub fn from_code(code: &str) -> Result<Self, ValidationError> {
        match code {
            "0" => Ok(Self::Heartbeat),
            "1" => Ok(Self::TestRequest),
            "2" => Ok(Self::ResendRequest),
            "3" => Ok(Self::Reject),
            "4" => Ok(Self::SequenceReset),
            "5" => Ok(Self::Logout),
            "8" => Ok(Self::ExecutionReport),
            "9" => Ok(Self::OrderCancelReject),
            "A" => Ok(Self::Logon),
            "B" => Ok(Self::News),
            "C" => Ok(Self::Email),
            "D" => Ok(Self::NewOrderSingle),
            "F" => Ok(Self::OrderCancelRequest),
            "G" => Ok(Self::OrderCancelReplaceRequest),
            "H" => Ok(Self::OrderStatusRequest),
            "R" => Ok(Self::QuoteRequest),
            "S" => Ok(Self::Quote),
            "V" => Ok(Self::MarketDataRequest),
            "W" => Ok(Self::MarketDataSnapshotFullRefresh),
            "X" => Ok(Self::MarketDataIncrementalRefresh),
            "Y" => Ok(Self::MarketDataRequestReject),
            "j" => Ok(Self::BusinessMessageReject),
            "AE" => Ok(Self::TradeCaptureReport),
            other => Err(ValidationError::UnknownType(other.to_string())),
        }
    }

    /// Returns the human friendly name for this message type.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Whether this is a session-level administrative message.
    ///
    /// Administrative messages are never retransmitted in response to a
    /// resend request; their sequence numbers are gap-filled instead.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::TestRequest
                | Self::ResendRequest
                | Self::Reject
                | Self::SequenceReset
                | Self::Logout
                | Self::Logon
        )
    }
}

/// Whether the given tag 35 value denotes an administrative message.
///
/// Unknown message types are treated as application-level.
#[must_use]
pub fn is_admin_msg_type(code: &str) -> bool {
    MsgType::from_code(code).is_ok_and(MsgType::is_admin)
}
