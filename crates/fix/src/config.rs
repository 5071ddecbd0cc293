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

//! Engine configuration.
//!
//! Configuration is a plain value passed into the pipeline constructor;
//! stages receive their slice at construction time. `from_env` reads the
//! `FIX_*` environment variables (typically populated via a dotenv file).

use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::{
    codec::GroupTemplates,
    consts::{
        DEFAULT_BEGIN_STRING, DEFAULT_HEARTBEAT_SECS, DEFAULT_INIT_TIMEOUT_SECS,
        DEFAULT_SETTLE_DELAY_MS, DEFAULT_START_TIMEOUT_SECS, DEFAULT_STOP_TIMEOUT_SECS,
    },
    error::ConfigError,
    pipeline::PipelineTimeouts,
};

/// The character encoding accepted for field values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Strict ASCII (the FIX standard).
    #[default]
    Ascii,
    /// Lenient single-byte interop for counterparties that emit CP1252.
    Cp1252,
}

/// The message store backend selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    /// Transient in-memory store (the default).
    Memory,
    /// Durable key/value store addressed by a Redis URI.
    Redis(String),
}

/// Identifiers for the processing stages, in their configured order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageId {
    Transport,
    Codec,
    Logging,
    Store,
    Sequence,
    Auth,
    Heartbeat,
}

impl StageId {
    /// The default stage chain, bottom (transport) to top.
    pub const DEFAULT: [Self; 7] = [
        Self::Transport,
        Self::Codec,
        Self::Logging,
        Self::Store,
        Self::Sequence,
        Self::Auth,
        Self::Heartbeat,
    ];
}

impl FromStr for StageId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "transport" => Ok(Self::Transport),
            "codec" => Ok(Self::Codec),
            "logging" => Ok(Self::Logging),
            "store" => Ok(Self::Store),
            "sequence" => Ok(Self::Sequence),
            "auth" => Ok(Self::Auth),
            "heartbeat" => Ok(Self::Heartbeat),
            other => Err(ConfigError::Invalid {
                key: "stages".to_string(),
                reason: format!("unknown stage identifier '{other}'"),
            }),
        }
    }
}

/// The engine configuration surface.
#[derive(Clone, Debug)]
pub struct FixConfig {
    /// Counterparty TCP host.
    pub host: String,
    /// Counterparty TCP port.
    pub port: u16,
    /// Value of tag 49 on outbound messages.
    pub sender_comp_id: String,
    /// Value of tag 56 on outbound messages.
    pub target_comp_id: String,
    /// Logon credential (tag 553).
    pub username: String,
    /// Logon credential (tag 554).
    pub password: String,
    /// Negotiated `HeartBtInt` (tag 108) in seconds.
    pub heartbeat_interval: u64,
    /// Send `ResetSeqNumFlag=Y` on logon.
    pub reset_seq_nums: bool,
    /// Send `TestMessageIndicator=Y` on logon.
    pub test_mode: bool,
    /// Value of tag 8.
    pub begin_string: String,
    /// Field value encoding.
    pub encoding: Encoding,
    /// Enforce declared body length and checksum at decode time.
    pub strict_decode: bool,
    /// Declared repeating-group templates.
    pub group_templates: GroupTemplates,
    /// Message store backend.
    pub store_backend: StoreBackend,
    /// Ordered processing stage chain, bottom to top.
    pub stages: Vec<StageId>,
    /// Location of the persisted session id file.
    pub session_id_path: PathBuf,
    /// Settling delay after the transport reader starts.
    pub settle_delay: Duration,
    /// Per-stage initialize timeout.
    pub init_timeout: Duration,
    /// Per-stage start timeout (also bounds the logon wait).
    pub start_timeout: Duration,
    /// Per-stage stop timeout (also bounds the logout wait).
    pub stop_timeout: Duration,
}

impl FixConfig {
    /// Creates a configuration for the given counterparty endpoint and comp
    /// ids, with defaults for everything else.
    #[must_use]
    pub fn new(host: &str, port: u16, sender_comp_id: &str, target_comp_id: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            sender_comp_id: sender_comp_id.to_string(),
            target_comp_id: target_comp_id.to_string(),
            username: String::new(),
            password: String::new(),
            heartbeat_interval: DEFAULT_HEARTBEAT_SECS,
            reset_seq_nums: true,
            test_mode: false,
            begin_string: DEFAULT_BEGIN_STRING.to_string(),
            encoding: Encoding::default(),
            strict_decode: false,
            group_templates: GroupTemplates::new(),
            store_backend: StoreBackend::Memory,
            stages: StageId::DEFAULT.to_vec(),
            session_id_path: PathBuf::from(".fix-session-id"),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            init_timeout: Duration::from_secs(DEFAULT_INIT_TIMEOUT_SECS),
            start_timeout: Duration::from_secs(DEFAULT_START_TIMEOUT_SECS),
            stop_timeout: Duration::from_secs(DEFAULT_STOP_TIMEOUT_SECS),
        }
    }

    /// Loads configuration from `FIX_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value cannot
    /// be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a required key is missing or a value cannot be
    /// parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
        };
        let invalid = |key: &str, reason: String| ConfigError::Invalid {
            key: key.to_string(),
            reason,
        };

        let host = required("FIX_HOST")?;
        let port = required("FIX_PORT")?
            .parse()
            .map_err(|e| invalid("FIX_PORT", format!("{e}")))?;
        let sender_comp_id = required("FIX_SENDER_COMP_ID")?;
        let target_comp_id = required("FIX_TARGET_COMP_ID")?;

        let mut config = Self::new(&host, port, &sender_comp_id, &target_comp_id);

        config.username = lookup("FIX_USERNAME").unwrap_or_else(|| sender_comp_id.clone());
        config.password = required("FIX_PASSWORD")?;

        if let Some(value) = lookup("FIX_HEARTBEAT_INTERVAL") {
            config.heartbeat_interval = value
                .parse()
                .map_err(|e| invalid("FIX_HEARTBEAT_INTERVAL", format!("{e}")))?;
        }
        if let Some(value) = lookup("FIX_RESET_SEQ_NUMS") {
            config.reset_seq_nums = parse_bool("FIX_RESET_SEQ_NUMS", &value)?;
        }
        if let Some(value) = lookup("FIX_TEST_MODE") {
            config.test_mode = parse_bool("FIX_TEST_MODE", &value)?;
        }
        if let Some(value) = lookup("FIX_BEGIN_STRING") {
            config.begin_string = value;
        }
        if let Some(value) = lookup("FIX_ENCODING") {
            config.encoding = match value.to_ascii_lowercase().as_str() {
                "ascii" => Encoding::Ascii,
                "cp1252" => Encoding::Cp1252,
                other => {
                    return Err(invalid(
                        "FIX_ENCODING",
                        format!("unknown encoding '{other}' (expected 'ascii' or 'cp1252')"),
                    ));
                }
            };
        }
        if let Some(value) = lookup("FIX_STRICT_DECODE") {
            config.strict_decode = parse_bool("FIX_STRICT_DECODE", &value)?;
        }
        if let Some(value) = lookup("FIX_GROUP_TEMPLATES") {
            config.group_templates = GroupTemplates::from_json(&value)?;
        }
        if let Some(value) = lookup("FIX_MESSAGE_STORE") {
            config.store_backend = parse_store_backend(&value)?;
        }
        if let Some(value) = lookup("FIX_STAGES") {
            config.stages = value
                .split(',')
                .map(StageId::from_str)
                .collect::<Result<Vec<_>, _>>()?;
        }
        if let Some(value) = lookup("FIX_SESSION_ID_PATH") {
            config.session_id_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("FIX_SETTLE_DELAY_MS") {
            let millis: u64 = value
                .parse()
                .map_err(|e| invalid("FIX_SETTLE_DELAY_MS", format!("{e}")))?;
            config.settle_delay = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// The per-phase pipeline timeouts.
    #[must_use]
    pub const fn timeouts(&self) -> PipelineTimeouts {
        PipelineTimeouts {
            init: self.init_timeout,
            start: self.start_timeout,
            stop: self.stop_timeout,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Ok(false),
        other => Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: format!("'{other}' is not a boolean"),
        }),
    }
}

fn parse_store_backend(value: &str) -> Result<StoreBackend, ConfigError> {
    if value == "memory" {
        return Ok(StoreBackend::Memory);
    }
    if value.starts_with("redis://") || value.starts_with("rediss://") {
        return Ok(StoreBackend::Redis(value.to_string()));
    }
    Err(ConfigError::Invalid {
        key: "message_store".to_string(),
        reason: format!("unknown store backend '{value}' (expected 'memory' or a redis:// URI)"),
    })
}
