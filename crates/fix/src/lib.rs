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

//! A client-side engine for the FIX 4.4 wire protocol.
//!
//! The `marlin-fix` crate maintains a persistent, authenticated, sequenced
//! session with a FIX counterparty: it decodes inbound frames into structured
//! messages, encodes outbound messages with correct framing and checksums,
//! enforces ordered delivery with gap-fill recovery, and keeps the session
//! alive through heartbeats and test-request probes.
//!
//! # Architecture
//!
//! Every message passes through a linear pipeline of processing stages.
//! Inbound bytes enter at the transport (lowest) stage, are framed and
//! decoded, and propagate upward through the store, sequence, auth, and
//! heartbeat stages to the application boundary; outbound messages travel
//! the reverse path, where they are stamped, persisted, encoded, and written
//! to the socket. All dispatch happens on one task, so no two sends can
//! interleave between sequence stamping and the socket write.
//!
//! # Feature flags
//!
//! - `redis`: Enables the durable Redis-backed message store.

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod auth;
pub mod codec;
pub mod config;
pub mod consts;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod heartbeat;
pub mod logging;
pub mod message;
pub mod pipeline;
pub mod sequence;
pub mod serialization;
pub mod session;
pub mod store;
pub mod transport;

pub use crate::{
    config::FixConfig,
    engine::FixEngine,
    error::{
        ConfigError, FieldMapError, ParseError, SessionError, StageError, StoreError,
        ValidationError,
    },
    message::Message,
    pipeline::{Payload, PipelineHandle, Stage},
    session::SessionId,
};
