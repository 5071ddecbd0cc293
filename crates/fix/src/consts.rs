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

//! Wire-level and session-level constants.

/// The FIX field delimiter (start of header).
pub const SOH: u8 = 0x01;

/// The default begin string for this engine.
pub const DEFAULT_BEGIN_STRING: &str = "FIX.4.4";

/// The FIX null sentinel for numeric fields.
pub const NULL_SENTINEL: &[u8] = b"-2147483648";

/// UTC timestamp format for `SendingTime` (52) and `OrigSendingTime` (122),
/// truncated to milliseconds.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H:%M:%S%.3f";

/// Maximum bytes buffered by the transport reader before a frame completes (64 MiB).
pub const MAX_READ_BUFFER: usize = 1 << 26;

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Default settling delay after the transport reader starts, so that no
/// logon rejection frame is missed.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;

/// Default per-stage timeout for the initialize phase in seconds.
pub const DEFAULT_INIT_TIMEOUT_SECS: u64 = 10;

/// Default per-stage timeout for the start phase (and the logon wait) in seconds.
pub const DEFAULT_START_TIMEOUT_SECS: u64 = 10;

/// Default per-stage timeout for the stop phase (and the logout wait) in seconds.
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 5;
